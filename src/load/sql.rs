use crate::load::values::ColumnKind;
use std::ops::Range;

/// SQL flavour a sink speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    /// Most bind parameters one statement may carry.
    pub fn max_params(self) -> usize {
        match self {
            Dialect::Sqlite => 32_766,
            Dialect::Postgres => 65_535,
        }
    }

    pub fn column_type(self, kind: ColumnKind) -> &'static str {
        match (self, kind) {
            (Dialect::Postgres, ColumnKind::Bool) => "BOOLEAN",
            (Dialect::Postgres, ColumnKind::Int) => "BIGINT",
            (Dialect::Postgres, ColumnKind::Float) => "DOUBLE PRECISION",
            (Dialect::Postgres, ColumnKind::Date) => "DATE",
            (Dialect::Postgres, ColumnKind::Timestamp) => "TIMESTAMP",
            (Dialect::Postgres, ColumnKind::Text) => "TEXT",
            (Dialect::Sqlite, ColumnKind::Bool | ColumnKind::Int) => "INTEGER",
            (Dialect::Sqlite, ColumnKind::Float) => "REAL",
            (Dialect::Sqlite, _) => "TEXT",
        }
    }

    /// 1-based placeholder for the `n`th parameter.
    fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Sqlite => format!("?{}", n),
            Dialect::Postgres => format!("${}", n),
        }
    }
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn create_table_sql(
    dialect: Dialect,
    table: &str,
    columns: &[String],
    kinds: &[ColumnKind],
) -> String {
    let defs: Vec<String> = columns
        .iter()
        .zip(kinds)
        .map(|(c, k)| format!("{} {}", quote_ident(c), dialect.column_type(*k)))
        .collect();
    format!("CREATE TABLE {} ({})", quote_ident(table), defs.join(", "))
}

/// `INSERT … VALUES (…), (…)` for `rows` rows of `columns`.
pub fn insert_sql(dialect: Dialect, table: &str, columns: &[String], rows: usize) -> String {
    let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ",
        quote_ident(table),
        names.join(", ")
    );
    let ncols = columns.len();
    for r in 0..rows {
        if r > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for c in 0..ncols {
            if c > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&dialect.placeholder(r * ncols + c + 1));
        }
        sql.push(')');
    }
    sql
}

/// Rows one insert statement may hold without passing the parameter limit
/// or the chunk size.
pub fn rows_per_statement(dialect: Dialect, ncols: usize, chunk_size: usize) -> usize {
    let by_params = dialect.max_params() / ncols.max(1);
    by_params.min(chunk_size).max(1)
}

/// Split `0..total` into consecutive ranges of at most `size` rows.
pub fn ranges(total: usize, size: usize) -> impl Iterator<Item = Range<usize>> {
    let size = size.max(1);
    (0..total)
        .step_by(size)
        .map(move |start| start..(start + size).min(total))
}

/// Statement-sized row ranges: chunks of `chunk_size`, each split so no
/// statement binds more than the dialect allows.
pub fn statement_ranges(
    dialect: Dialect,
    total: usize,
    ncols: usize,
    chunk_size: usize,
) -> Vec<Vec<Range<usize>>> {
    let per_stmt = rows_per_statement(dialect, ncols, chunk_size);
    ranges(total, chunk_size)
        .map(|chunk| {
            ranges(chunk.len(), per_stmt)
                .map(|r| (chunk.start + r.start)..(chunk.start + r.end))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("order_id"), "\"order_id\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_create_table() {
        let c = cols(&["order_id", "order_date", "sales", "city"]);
        let k = [
            ColumnKind::Int,
            ColumnKind::Date,
            ColumnKind::Float,
            ColumnKind::Text,
        ];
        assert_eq!(
            create_table_sql(Dialect::Postgres, "df_orders", &c, &k),
            "CREATE TABLE \"df_orders\" (\"order_id\" BIGINT, \"order_date\" DATE, \
             \"sales\" DOUBLE PRECISION, \"city\" TEXT)"
        );
        assert_eq!(
            create_table_sql(Dialect::Sqlite, "df_orders", &c, &k),
            "CREATE TABLE \"df_orders\" (\"order_id\" INTEGER, \"order_date\" TEXT, \
             \"sales\" REAL, \"city\" TEXT)"
        );
    }

    #[test]
    fn test_insert_placeholders() {
        let c = cols(&["a", "b"]);
        assert_eq!(
            insert_sql(Dialect::Postgres, "t", &c, 2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(
            insert_sql(Dialect::Sqlite, "t", &c, 1),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_rows_per_statement_respects_limits() {
        // 16 columns: 65_535 / 16 = 4_095 rows
        assert_eq!(rows_per_statement(Dialect::Postgres, 16, 50_000), 4_095);
        assert_eq!(rows_per_statement(Dialect::Sqlite, 16, 50_000), 2_047);
        // chunk size is the cap when smaller
        assert_eq!(rows_per_statement(Dialect::Sqlite, 2, 10), 10);
        // never zero
        assert_eq!(rows_per_statement(Dialect::Sqlite, 40_000, 10), 1);
    }

    #[test]
    fn test_statement_ranges_cover_everything_once() {
        let plan = statement_ranges(Dialect::Sqlite, 25, 4_000, 10);
        // 4_000 columns: 8 rows per statement; chunks of 10
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], vec![0..8, 8..10]);
        assert_eq!(plan[1], vec![10..18, 18..20]);
        assert_eq!(plan[2], vec![20..25]);

        let covered: Vec<usize> = plan.into_iter().flatten().flatten().collect();
        assert_eq!(covered, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_input_has_no_statements() {
        assert!(statement_ranges(Dialect::Postgres, 0, 3, 50_000).is_empty());
    }
}
