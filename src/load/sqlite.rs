use anyhow::{Context, Result};
use rusqlite::{
    params_from_iter,
    types::{ToSqlOutput, Value as SqlValue},
    Connection, ToSql,
};
use std::path::Path;
use tracing::debug;

use crate::load::{
    sql::{self, Dialect},
    values::{TableData, Value},
    TableSink,
};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            // ISO text via rusqlite's chrono support
            Value::Date(d) => d.to_sql()?,
            Value::Timestamp(t) => t.to_sql()?,
        })
    }
}

/// Table sink backed by a SQLite database file.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite database {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl TableSink for SqliteSink {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn existing_columns(&mut self, table: &str) -> Result<Option<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", sql::quote_ident(table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(if names.is_empty() { None } else { Some(names) })
    }

    fn replace_table(&mut self, table: &str, data: &TableData, chunk_size: usize) -> Result<u64> {
        let dialect = self.dialect();
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "{};\n{};",
            sql::drop_table_sql(table),
            sql::create_table_sql(dialect, table, &data.columns, &data.kinds)
        ))
        .with_context(|| format!("recreating table {}", table))?;

        let mut written = 0u64;
        for (i, chunk) in
            sql::statement_ranges(dialect, data.num_rows(), data.num_columns(), chunk_size)
                .into_iter()
                .enumerate()
        {
            for rows in chunk {
                let n = rows.len();
                let values = data.row_values(rows)?;
                let mut stmt =
                    tx.prepare_cached(&sql::insert_sql(dialect, table, &data.columns, n))?;
                written += stmt.execute(params_from_iter(values.iter()))? as u64;
            }
            debug!(table, chunk = i, written, "inserted chunk");
        }

        tx.commit()?;
        Ok(written)
    }

    fn row_count(&mut self, table: &str) -> Result<u64> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", sql::quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}
