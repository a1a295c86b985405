use anyhow::{Context, Result};
use postgres::{types::ToSql, Client, NoTls};
use std::ops::Range;
use tracing::debug;

use crate::load::{
    sql::{self, Dialect},
    values::{ColumnKind, TableData, Value},
    TableSink,
};

type Param = Box<dyn ToSql + Sync>;

/// Postgres needs typed nulls; the column kind picks the type.
fn to_param(kind: ColumnKind, value: Value) -> Param {
    match (kind, value) {
        (_, Value::Bool(b)) => Box::new(b),
        (_, Value::Int(i)) => Box::new(i),
        (_, Value::Float(f)) => Box::new(f),
        (_, Value::Text(s)) => Box::new(s),
        (_, Value::Date(d)) => Box::new(d),
        (_, Value::Timestamp(t)) => Box::new(t),
        (ColumnKind::Bool, Value::Null) => Box::new(None::<bool>),
        (ColumnKind::Int, Value::Null) => Box::new(None::<i64>),
        (ColumnKind::Float, Value::Null) => Box::new(None::<f64>),
        (ColumnKind::Date, Value::Null) => Box::new(None::<chrono::NaiveDate>),
        (ColumnKind::Timestamp, Value::Null) => Box::new(None::<chrono::NaiveDateTime>),
        (ColumnKind::Text, Value::Null) => Box::new(None::<String>),
    }
}

/// Which prepared INSERT a statement range runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// The shared statement sized for `rows_per_statement` rows.
    Full,
    /// A shorter statement for the tail of a chunk.
    Tail(usize),
}

fn shape_of(rows: &Range<usize>, full_rows: usize) -> Shape {
    if rows.len() == full_rows {
        Shape::Full
    } else {
        Shape::Tail(rows.len())
    }
}

/// Typed parameters for `rows`, row-major, one per column per row.
fn bind_params(data: &TableData, rows: Range<usize>) -> Result<Vec<Param>> {
    let ncols = data.num_columns();
    Ok(data
        .row_values(rows)?
        .into_iter()
        .enumerate()
        .map(|(j, v)| to_param(data.kinds[j % ncols], v))
        .collect())
}

/// Table sink backed by a Postgres server.
pub struct PostgresSink {
    client: Client,
}

impl PostgresSink {
    /// Connect with an already-normalised URI (see [`super::normalize_pg_uri`]).
    pub fn connect(uri: &str) -> Result<Self> {
        let client = Client::connect(uri, NoTls)
            .with_context(|| format!("connecting to postgres at {}", super::redact_uri(uri)))?;
        Ok(Self { client })
    }
}

impl TableSink for PostgresSink {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn existing_columns(&mut self, table: &str) -> Result<Option<Vec<String>>> {
        let rows = self.client.query(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
            &[&table],
        )?;
        let names: Vec<String> = rows.iter().map(|r| r.get(0)).collect();
        Ok(if names.is_empty() { None } else { Some(names) })
    }

    fn replace_table(&mut self, table: &str, data: &TableData, chunk_size: usize) -> Result<u64> {
        let dialect = self.dialect();
        let mut tx = self.client.transaction()?;
        tx.batch_execute(&format!(
            "{};\n{};",
            sql::drop_table_sql(table),
            sql::create_table_sql(dialect, table, &data.columns, &data.kinds)
        ))
        .with_context(|| format!("recreating table {}", table))?;

        let ncols = data.num_columns();
        let full_rows = sql::rows_per_statement(dialect, ncols, chunk_size);
        let full = tx.prepare(&sql::insert_sql(dialect, table, &data.columns, full_rows))?;

        let mut written = 0u64;
        for (i, chunk) in sql::statement_ranges(dialect, data.num_rows(), ncols, chunk_size)
            .into_iter()
            .enumerate()
        {
            for rows in chunk {
                let stmt = match shape_of(&rows, full_rows) {
                    Shape::Full => full.clone(),
                    Shape::Tail(n) => {
                        tx.prepare(&sql::insert_sql(dialect, table, &data.columns, n))?
                    }
                };

                let params = bind_params(data, rows)?;
                let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
                written += tx.execute(&stmt, &refs)?;
            }
            debug!(table, chunk = i, written, "inserted chunk");
        }

        tx.commit()?;
        Ok(written)
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        let row = self.client.query_one(
            &format!("SELECT COUNT(*) FROM {}", sql::quote_ident(table)),
            &[],
        )?;
        let n: i64 = row.get(0);
        Ok(n as u64)
    }
}
