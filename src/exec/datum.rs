// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
//! Scalar value bridge between Arrow columns and per-row aggregate calls.
//!
//! Responsibilities:
//! - `Datum` is the owned scalar used for group-key components and aggregate
//!   arguments. Equality and hashing are defined for every variant so tuples
//!   of datums can key a hash table; floats compare by bit pattern.
//! - `datum_at` extracts one row from an Arrow array; `DatumColumnBuilder`
//!   builds output arrays from finalized datums.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, StringArray, StringBuilder, TimestampNanosecondArray,
    TimestampNanosecondBuilder,
};
use arrow::datatypes::{DataType, TimeUnit};

use crate::exec::error::{ExecError, ExecResult};

#[derive(Clone, Debug)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Nanoseconds since the UNIX epoch.
    TimestampNs(i64),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Boolean(a), Datum::Boolean(b)) => a == b,
            (Datum::Int64(a), Datum::Int64(b)) => a == b,
            // Bit equality keeps NaN keys well defined and groupable.
            (Datum::Float64(a), Datum::Float64(b)) => a.to_bits() == b.to_bits(),
            (Datum::Utf8(a), Datum::Utf8(b)) => a == b,
            (Datum::TimestampNs(a), Datum::TimestampNs(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Datum {}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Datum::Null => {}
            Datum::Boolean(v) => v.hash(state),
            Datum::Int64(v) => v.hash(state),
            Datum::Float64(v) => v.to_bits().hash(state),
            Datum::Utf8(v) => v.hash(state),
            Datum::TimestampNs(v) => v.hash(state),
        }
    }
}

/// Column types the execution core understands.
pub fn is_supported_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int64
            | DataType::Float64
            | DataType::Utf8
            | DataType::Timestamp(TimeUnit::Nanosecond, None)
    )
}

/// Extract the value at `row` as an owned scalar. `row` must be in range.
pub fn datum_at(array: &ArrayRef, row: usize) -> ExecResult<Datum> {
    if row >= array.len() {
        return Err(ExecError::internal(format!(
            "row {} out of range for array of length {}",
            row,
            array.len()
        )));
    }
    if array.is_null(row) {
        return Ok(Datum::Null);
    }
    match array.data_type() {
        DataType::Boolean => {
            let arr = downcast::<BooleanArray>(array, "boolean")?;
            Ok(Datum::Boolean(arr.value(row)))
        }
        DataType::Int64 => {
            let arr = downcast::<Int64Array>(array, "int64")?;
            Ok(Datum::Int64(arr.value(row)))
        }
        DataType::Float64 => {
            let arr = downcast::<Float64Array>(array, "float64")?;
            Ok(Datum::Float64(arr.value(row)))
        }
        DataType::Utf8 => {
            let arr = downcast::<StringArray>(array, "utf8")?;
            Ok(Datum::Utf8(arr.value(row).to_string()))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, None) => {
            let arr = downcast::<TimestampNanosecondArray>(array, "timestamp[ns]")?;
            Ok(Datum::TimestampNs(arr.value(row)))
        }
        other => Err(ExecError::internal(format!(
            "unsupported column type {:?}",
            other
        ))),
    }
}

fn downcast<'a, T: 'static>(array: &'a ArrayRef, expected: &str) -> ExecResult<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ExecError::internal(format!(
            "array downcast to {} failed for type {:?}",
            expected,
            array.data_type()
        ))
    })
}

/// Typed output-column builder fed with finalized datums.
pub enum DatumColumnBuilder {
    Boolean(BooleanBuilder),
    Int64(Int64Builder),
    Float64(Float64Builder),
    Utf8(StringBuilder),
    TimestampNs(TimestampNanosecondBuilder),
}

impl DatumColumnBuilder {
    pub fn for_type(data_type: &DataType) -> ExecResult<Self> {
        match data_type {
            DataType::Boolean => Ok(Self::Boolean(BooleanBuilder::new())),
            DataType::Int64 => Ok(Self::Int64(Int64Builder::new())),
            DataType::Float64 => Ok(Self::Float64(Float64Builder::new())),
            DataType::Utf8 => Ok(Self::Utf8(StringBuilder::new())),
            DataType::Timestamp(TimeUnit::Nanosecond, None) => {
                Ok(Self::TimestampNs(TimestampNanosecondBuilder::new()))
            }
            other => Err(ExecError::internal(format!(
                "unsupported output column type {:?}",
                other
            ))),
        }
    }

    pub fn append(&mut self, datum: &Datum) -> ExecResult<()> {
        match (self, datum) {
            (Self::Boolean(b), Datum::Null) => b.append_null(),
            (Self::Boolean(b), Datum::Boolean(v)) => b.append_value(*v),
            (Self::Int64(b), Datum::Null) => b.append_null(),
            (Self::Int64(b), Datum::Int64(v)) => b.append_value(*v),
            (Self::Float64(b), Datum::Null) => b.append_null(),
            (Self::Float64(b), Datum::Float64(v)) => b.append_value(*v),
            (Self::Utf8(b), Datum::Null) => b.append_null(),
            (Self::Utf8(b), Datum::Utf8(v)) => b.append_value(v),
            (Self::TimestampNs(b), Datum::Null) => b.append_null(),
            (Self::TimestampNs(b), Datum::TimestampNs(v)) => b.append_value(*v),
            (_, other) => {
                return Err(ExecError::internal(format!(
                    "datum {:?} does not match output column type",
                    other
                )));
            }
        }
        Ok(())
    }

    pub fn finish(self) -> ArrayRef {
        match self {
            Self::Boolean(mut b) => Arc::new(b.finish()),
            Self::Int64(mut b) => Arc::new(b.finish()),
            Self::Float64(mut b) => Arc::new(b.finish()),
            Self::Utf8(mut b) => Arc::new(b.finish()),
            Self::TimestampNs(mut b) => Arc::new(b.finish()),
        }
    }
}
