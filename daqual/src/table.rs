//! In-memory tabular objects.
//!
//! A [`Table`] wraps an Arrow [`RecordBatch`] with unique column names.
//! Scorers never read Arrow arrays directly; they go through [`CellValue`]
//! so integer, float and string columns compare uniformly.

use crate::prelude::*;
use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A single cell read from a table column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value (Arrow null or a NaN float)
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Returns the hashable identity of this cell.
    pub fn key(&self) -> CellKey {
        match self {
            CellValue::Null => CellKey::Null,
            CellValue::Int(v) => CellKey::Int(*v),
            CellValue::Float(v) => {
                if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
                    CellKey::Int(*v as i64)
                } else {
                    CellKey::Float(v.to_bits())
                }
            }
            CellValue::Str(s) => CellKey::Str(s.clone()),
        }
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Str(s) => s.trim().parse().ok(),
            CellValue::Null => None,
        }
    }

    /// Renders the cell as text; nulls render as the empty string.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => format!("{v:?}"),
            CellValue::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "null"),
            other => write!(f, "{}", other.render()),
        }
    }
}

/// Hashable identity of a cell.
///
/// Integral finite floats share the integer key, so `1` and `1.0` are the
/// same value. Nulls are equal to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKey {
    Null,
    Int(i64),
    Float(u64),
    Str(String),
}

/// The inferred type of a column, derived from its Arrow data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Date,
    Text,
    Other,
}

impl ColumnKind {
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => ColumnKind::Integer,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => ColumnKind::Float,
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => ColumnKind::Date,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ColumnKind::Text,
            _ => ColumnKind::Other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// An ordered collection of uniquely named, equal-length columns.
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
}

impl Table {
    /// Wraps a record batch, rejecting duplicate column names.
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        let mut seen = HashSet::new();
        for field in batch.schema().fields() {
            if !seen.insert(field.name().clone()) {
                return Err(DaqualError::Format(format!(
                    "duplicate column name '{}'",
                    field.name()
                )));
            }
        }
        Ok(Self { batch })
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.batch.column_by_name(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    /// Inferred type of a column, if it exists.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|a| ColumnKind::of(a.data_type()))
    }

    /// Reads every cell of a column, or `None` if the column is missing.
    pub fn cells(&self, name: &str) -> Result<Option<Vec<CellValue>>> {
        match self.column(name) {
            Some(array) => cells_of(array).map(Some),
            None => Ok(None),
        }
    }

    /// SHA-256 digest over column names and cell renderings.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for (field, array) in self.batch.schema().fields().iter().zip(self.batch.columns()) {
            hasher.update(field.name().as_bytes());
            hasher.update([0u8]);
            for cell in cells_of(array)? {
                match cell {
                    CellValue::Null => hasher.update([1u8]),
                    other => hasher.update(other.render().as_bytes()),
                }
                hasher.update([0u8]);
            }
            hasher.update([0xffu8]);
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

fn cells_of(array: &ArrayRef) -> Result<Vec<CellValue>> {
    match ColumnKind::of(array.data_type()) {
        ColumnKind::Integer => {
            let ints = cast(array.as_ref(), &DataType::Int64)?;
            Ok(ints
                .as_primitive::<Int64Type>()
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Int))
                .collect())
        }
        ColumnKind::Float => {
            let floats = cast(array.as_ref(), &DataType::Float64)?;
            Ok(floats
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| match v {
                    Some(f) if !f.is_nan() => CellValue::Float(f),
                    _ => CellValue::Null,
                })
                .collect())
        }
        _ => {
            let strings = cast(array.as_ref(), &DataType::Utf8)?;
            Ok(strings
                .as_string::<i32>()
                .iter()
                .map(|v| v.map_or(CellValue::Null, |s| CellValue::Str(s.to_string())))
                .collect())
        }
    }
}

/// Column-by-column construction of a [`Table`].
#[derive(Debug, Default)]
pub struct TableBuilder {
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
}

impl TableBuilder {
    pub fn int_column(mut self, name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        self.fields.push(Field::new(name, DataType::Int64, true));
        self.columns.push(Arc::new(Int64Array::from(values)));
        self
    }

    pub fn float_column(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.fields.push(Field::new(name, DataType::Float64, true));
        self.columns.push(Arc::new(Float64Array::from(values)));
        self
    }

    pub fn string_column(mut self, name: impl Into<String>, values: Vec<Option<&str>>) -> Self {
        self.fields.push(Field::new(name, DataType::Utf8, true));
        self.columns.push(Arc::new(StringArray::from(values)));
        self
    }

    /// Adds an arbitrary Arrow array as a column.
    pub fn array_column(mut self, name: impl Into<String>, array: ArrayRef) -> Self {
        self.fields
            .push(Field::new(name, array.data_type().clone(), true));
        self.columns.push(array);
        self
    }

    pub fn build(self) -> Result<Table> {
        let row_count = self.columns.first().map_or(0, |c| c.len());
        let options = RecordBatchOptions::new().with_row_count(Some(row_count));
        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::new(self.fields)),
            self.columns,
            &options,
        )?;
        Table::try_new(batch)
    }
}
