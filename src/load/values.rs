use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::cast,
    datatypes::{DataType, Date32Type, Float64Type, Int64Type, TimeUnit, TimestampMicrosecondType},
    record_batch::RecordBatch,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Storage class a column is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int,
    Float,
    Date,
    Timestamp,
    Text,
}

impl ColumnKind {
    pub fn of(dt: &DataType) -> Self {
        match dt {
            DataType::Boolean => ColumnKind::Bool,
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => ColumnKind::Int,
            DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnKind::Float,
            DataType::Date32 | DataType::Date64 => ColumnKind::Date,
            DataType::Timestamp(_, _) => ColumnKind::Timestamp,
            _ => ColumnKind::Text,
        }
    }

    /// The single Arrow type every column of this kind is cast to.
    fn canonical_type(self) -> DataType {
        match self {
            ColumnKind::Bool => DataType::Boolean,
            ColumnKind::Int => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Date => DataType::Date32,
            ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            ColumnKind::Text => DataType::Utf8,
        }
    }
}

/// One cell on its way into the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// Column-major table ready to insert: names, kinds, and arrays already cast
/// to the canonical type of their kind.
#[derive(Debug, Clone)]
pub struct TableData {
    pub columns: Vec<String>,
    pub kinds: Vec<ColumnKind>,
    arrays: Vec<ArrayRef>,
    num_rows: usize,
}

impl TableData {
    pub fn from_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let mut columns = Vec::with_capacity(batch.num_columns());
        let mut kinds = Vec::with_capacity(batch.num_columns());
        let mut arrays = Vec::with_capacity(batch.num_columns());

        for (field, arr) in schema.fields().iter().zip(batch.columns()) {
            let kind = ColumnKind::of(field.data_type());
            let target = kind.canonical_type();
            let arr = if arr.data_type() == &target {
                arr.clone()
            } else {
                cast(arr, &target).with_context(|| {
                    format!("casting column {} from {}", field.name(), field.data_type())
                })?
            };
            columns.push(field.name().clone());
            kinds.push(kind);
            arrays.push(arr);
        }

        Ok(Self {
            columns,
            kinds,
            arrays,
            num_rows: batch.num_rows(),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, col: usize, row: usize) -> Result<Value> {
        let arr = &self.arrays[col];
        if arr.is_null(row) {
            return Ok(Value::Null);
        }
        Ok(match self.kinds[col] {
            ColumnKind::Bool => Value::Bool(arr.as_boolean().value(row)),
            ColumnKind::Int => Value::Int(arr.as_primitive::<Int64Type>().value(row)),
            ColumnKind::Float => Value::Float(arr.as_primitive::<Float64Type>().value(row)),
            ColumnKind::Date => Value::Date(
                arr.as_primitive::<Date32Type>()
                    .value_as_date(row)
                    .ok_or_else(|| anyhow!("date out of range in {}", self.columns[col]))?,
            ),
            ColumnKind::Timestamp => Value::Timestamp(
                arr.as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row)
                    .ok_or_else(|| anyhow!("timestamp out of range in {}", self.columns[col]))?,
            ),
            ColumnKind::Text => Value::Text(arr.as_string::<i32>().value(row).to_string()),
        })
    }

    /// All values of `rows`, row-major, ready to bind.
    pub fn row_values(&self, rows: std::ops::Range<usize>) -> Result<Vec<Value>> {
        if rows.end > self.num_rows {
            bail!("row range {:?} past end of {} rows", rows, self.num_rows);
        }
        let mut out = Vec::with_capacity(rows.len() * self.num_columns());
        for row in rows {
            for col in 0..self.num_columns() {
                out.push(self.value(col, row)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{BooleanArray, Date32Array, Int32Array, NullArray, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_kinds() {
        assert_eq!(ColumnKind::of(&DataType::Int32), ColumnKind::Int);
        assert_eq!(ColumnKind::of(&DataType::Float32), ColumnKind::Float);
        assert_eq!(ColumnKind::of(&DataType::Date32), ColumnKind::Date);
        assert_eq!(
            ColumnKind::of(&DataType::Timestamp(TimeUnit::Second, None)),
            ColumnKind::Timestamp
        );
        assert_eq!(ColumnKind::of(&DataType::Null), ColumnKind::Text);
        assert_eq!(ColumnKind::of(&DataType::UInt64), ColumnKind::Text);
    }

    #[test]
    fn test_values_are_widened_and_typed() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("qty", DataType::Int32, true),
            Field::new("ok", DataType::Boolean, true),
            Field::new("day", DataType::Date32, true),
            Field::new("city", DataType::Utf8, true),
            Field::new("blank", DataType::Null, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![Some(3), None])),
                Arc::new(BooleanArray::from(vec![Some(true), Some(false)])),
                Arc::new(Date32Array::from(vec![Some(19417), None])),
                Arc::new(StringArray::from(vec![Some("Henderson"), None])),
                Arc::new(NullArray::new(2)),
            ],
        )?;

        let data = TableData::from_batch(&batch)?;
        assert_eq!(data.num_rows(), 2);
        assert_eq!(data.num_columns(), 5);
        assert_eq!(data.kinds[4], ColumnKind::Text);

        let row0 = data.row_values(0..1)?;
        assert_eq!(
            row0,
            vec![
                Value::Int(3),
                Value::Bool(true),
                Value::Date(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()),
                Value::Text("Henderson".into()),
                Value::Null,
            ]
        );
        let row1 = data.row_values(1..2)?;
        assert_eq!(row1[0], Value::Null);
        assert_eq!(row1[1], Value::Bool(false));
        assert_eq!(row1[2], Value::Null);

        assert!(data.row_values(1..3).is_err());
        Ok(())
    }
}
