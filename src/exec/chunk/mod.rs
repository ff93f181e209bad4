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
//! Columnar batch flowing between operators.
//!
//! Responsibilities:
//! - Wraps an Arrow RecordBatch together with the stream flow flags set by the
//!   upstream producer.
//! - Provides bounds-checked column access for positional plan references.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Schema, SchemaRef};

use crate::exec::error::{ExecError, ExecResult};

/// A chunk of data, consisting of multiple rows.
///
/// Every chunk carries the upstream-assigned `end_of_window` / `end_of_stream`
/// flags. `end_of_stream` implies `end_of_window`; readers should go through
/// [`Chunk::end_of_window`], which applies that normalization. Zero-row chunks
/// are valid and still carry meaningful flags.
#[derive(Debug, Clone)]
pub struct Chunk {
    batch: RecordBatch,
    end_of_window: bool,
    end_of_stream: bool,
}

impl Chunk {
    pub fn new(batch: RecordBatch, end_of_window: bool, end_of_stream: bool) -> Self {
        Self {
            batch,
            end_of_window,
            end_of_stream,
        }
    }

    pub fn empty(schema: SchemaRef, end_of_window: bool, end_of_stream: bool) -> Self {
        Self {
            batch: RecordBatch::new_empty(schema),
            end_of_window,
            end_of_stream,
        }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    pub fn columns(&self) -> &[ArrayRef] {
        self.batch.columns()
    }

    pub fn column(&self, index: usize) -> ExecResult<&ArrayRef> {
        self.batch.columns().get(index).ok_or_else(|| {
            ExecError::internal(format!(
                "column index {} out of range for chunk with {} columns",
                index,
                self.batch.num_columns()
            ))
        })
    }

    /// Whether this chunk closes the current window. `end_of_stream` closes
    /// the final window even if the producer left the window flag unset.
    pub fn end_of_window(&self) -> bool {
        self.end_of_window || self.end_of_stream
    }

    pub fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }

    /// The window flag exactly as the producer set it, for verbatim
    /// propagation to downstream chunks.
    pub fn raw_end_of_window(&self) -> bool {
        self.end_of_window
    }

    /// Logical value bytes held by this chunk, counting fixed-width slots and
    /// string payload, not Arrow buffer capacity.
    pub fn value_bytes(&self) -> usize {
        let mut total = 0usize;
        for column in self.batch.columns() {
            total = total.saturating_add(column_value_bytes(column));
        }
        total
    }
}

impl Default for Chunk {
    fn default() -> Self {
        Self {
            batch: RecordBatch::new_empty(Arc::new(Schema::empty())),
            end_of_window: false,
            end_of_stream: false,
        }
    }
}

fn column_value_bytes(array: &ArrayRef) -> usize {
    match array.data_type() {
        DataType::Boolean => array.len(),
        DataType::Int64 | DataType::Float64 | DataType::Timestamp(_, _) => {
            array.len().saturating_mul(8)
        }
        DataType::Utf8 => {
            use arrow::array::StringArray;
            match array.as_any().downcast_ref::<StringArray>() {
                Some(strings) => (0..strings.len())
                    .filter(|&i| !strings.is_null(i))
                    .map(|i| strings.value(i).len())
                    .sum(),
                None => 0,
            }
        }
        _ => 0,
    }
}
