//! Column access helpers for Arrow record batches
//!
//! The cached Parquet files are written by a mix of pandas and polars, so
//! the same logical column can arrive as `Utf8` or `LargeUtf8`, `Int32` or
//! `Int64`, `List` or `LargeList`. These helpers normalize the handful of
//! shapes this crate reads and fail with the column name (and the columns
//! the table actually has) when a required one is absent.

use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, LargeStringArray, ListArray, RecordBatch, StringArray,
};
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use std::sync::Arc;

/// Whether the table carries a column named `name`.
#[must_use]
pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.column_by_name(name).is_some()
}

/// Look up a column by name.
///
/// # Errors
///
/// Returns [`Error::MissingColumn`] listing the available columns.
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            available: batch
                .schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect(),
        })
}

fn unsupported(name: &str, data_type: &DataType) -> Error {
    Error::UnsupportedColumnType {
        column: name.to_string(),
        data_type: format!("{data_type:?}"),
    }
}

/// Read a column as strings, rendering integer columns on the fly.
///
/// # Errors
///
/// Fails when the column is missing or not string/integer typed.
pub fn utf8_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let array = column(batch, name)?;
    let values = match array.data_type() {
        DataType::Utf8 => array
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect(),
        DataType::LargeUtf8 => array
            .as_any()
            .downcast_ref::<LargeStringArray>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(str::to_string))
            .collect(),
        DataType::Int32 => array
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(|i| i.to_string()))
            .collect(),
        DataType::Int64 => array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(|i| i.to_string()))
            .collect(),
        dt => return Err(unsupported(name, dt)),
    };
    Ok(values)
}

/// Read a numeric column as `f64`.
///
/// # Errors
///
/// Fails when the column is missing or not numeric.
pub fn f64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let array = column(batch, name)?;
    let values = match array.data_type() {
        DataType::Float64 => array
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .collect(),
        DataType::Float32 => array
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(f64::from))
            .collect(),
        DataType::Int64 => array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(|i| i as f64))
            .collect(),
        DataType::Int32 => array
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(f64::from))
            .collect(),
        dt => return Err(unsupported(name, dt)),
    };
    Ok(values)
}

/// Read an integer column as `i64`.
///
/// # Errors
///
/// Fails when the column is missing or not integer typed.
pub fn i64_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<i64>>> {
    let array = column(batch, name)?;
    let values = match array.data_type() {
        DataType::Int64 => array
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .collect(),
        DataType::Int32 => array
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .map(|v| v.map(i64::from))
            .collect(),
        dt => return Err(unsupported(name, dt)),
    };
    Ok(values)
}

/// Read a boolean column.
///
/// # Errors
///
/// Fails when the column is missing or not boolean.
pub fn bool_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<bool>>> {
    let array = column(batch, name)?;
    match array.data_type() {
        DataType::Boolean => Ok(array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| unsupported(name, array.data_type()))?
            .iter()
            .collect()),
        dt => Err(unsupported(name, dt)),
    }
}

/// Read a `List<Utf8>`-style column as one `Vec<String>` per row.
///
/// Null rows collapse to an empty vec.
///
/// # Errors
///
/// Fails when the column is missing or not a list of strings.
pub fn string_list_values(batch: &RecordBatch, name: &str) -> Result<Vec<Vec<String>>> {
    let array = column(batch, name)?;
    let mut rows = Vec::with_capacity(array.len());
    match array.data_type() {
        DataType::List(_) => {
            let list = array
                .as_any()
                .downcast_ref::<ListArray>()
                .ok_or_else(|| unsupported(name, array.data_type()))?;
            for row in 0..list.len() {
                if list.is_null(row) {
                    rows.push(Vec::new());
                } else {
                    rows.push(string_values_of(&list.value(row), name)?);
                }
            }
        }
        DataType::LargeList(_) => {
            let list = array
                .as_any()
                .downcast_ref::<LargeListArray>()
                .ok_or_else(|| unsupported(name, array.data_type()))?;
            for row in 0..list.len() {
                if list.is_null(row) {
                    rows.push(Vec::new());
                } else {
                    rows.push(string_values_of(&list.value(row), name)?);
                }
            }
        }
        dt => return Err(unsupported(name, dt)),
    }
    Ok(rows)
}

fn string_values_of(values: &ArrayRef, name: &str) -> Result<Vec<String>> {
    if let Some(strings) = values.as_any().downcast_ref::<StringArray>() {
        Ok(strings.iter().flatten().map(str::to_string).collect())
    } else if let Some(strings) = values.as_any().downcast_ref::<LargeStringArray>() {
        Ok(strings.iter().flatten().map(str::to_string).collect())
    } else {
        Err(unsupported(name, values.data_type()))
    }
}

/// Return a new batch with `array` appended as a nullable column `name`.
///
/// The input batch is not mutated.
///
/// # Errors
///
/// Fails when the array length does not match the batch row count.
pub fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let mut fields: Vec<FieldRef> = batch.schema().fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(name, array.data_type().clone(), true)));
    let mut columns = batch.columns().to_vec();
    columns.push(array);
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("subject_id", DataType::Utf8, false),
            Field::new("session_idx", DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["660023", "660024"])),
                Arc::new(Int64Array::from(vec![0, 1])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_column_names_available() {
        let batch = sample_batch();
        let err = column(&batch, "date").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("date"));
        assert!(msg.contains("subject_id"));
    }

    #[test]
    fn test_utf8_values_renders_integers() {
        let batch = sample_batch();
        let values = utf8_values(&batch, "session_idx").unwrap();
        assert_eq!(values, vec![Some("0".to_string()), Some("1".to_string())]);
    }

    #[test]
    fn test_with_column_preserves_input() {
        let batch = sample_batch();
        let flags: ArrayRef = Arc::new(BooleanArray::from(vec![true, false]));
        let extended = with_column(&batch, "is_ephys", flags).unwrap();

        assert_eq!(batch.num_columns(), 2);
        assert_eq!(extended.num_columns(), 3);
        assert_eq!(extended.num_rows(), batch.num_rows());
        assert_eq!(
            bool_values(&extended, "is_ephys").unwrap(),
            vec![Some(true), Some(false)]
        );
    }
}
