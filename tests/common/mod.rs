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
//! Common utilities and helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use novastream::common::types::UniqueId;
use novastream::exec::chunk::Chunk;
use novastream::exec::datum::{self, Datum};
use novastream::runtime::runtime_state::RuntimeState;

/// Generate a test query ID.
pub fn test_query_id() -> UniqueId {
    UniqueId {
        hi: 1234567890,
        lo: 9876543210,
    }
}

pub fn test_runtime_state() -> RuntimeState {
    RuntimeState::new(test_query_id())
}

/// Builds a chunk column by column against a fixed schema.
pub struct ChunkBuilder {
    schema: SchemaRef,
    columns: Vec<ArrayRef>,
}

impl ChunkBuilder {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            columns: Vec::new(),
        }
    }

    pub fn int64(mut self, values: Vec<Option<i64>>) -> Self {
        self.columns.push(Arc::new(Int64Array::from(values)));
        self
    }

    pub fn float64(mut self, values: Vec<Option<f64>>) -> Self {
        self.columns.push(Arc::new(Float64Array::from(values)));
        self
    }

    pub fn utf8(mut self, values: Vec<Option<&str>>) -> Self {
        self.columns.push(Arc::new(StringArray::from(values)));
        self
    }

    pub fn build(self, end_of_window: bool, end_of_stream: bool) -> Chunk {
        let batch = RecordBatch::try_new(self.schema, self.columns).expect("test record batch");
        Chunk::new(batch, end_of_window, end_of_stream)
    }

    pub fn build_empty(self, end_of_window: bool, end_of_stream: bool) -> Chunk {
        assert!(self.columns.is_empty(), "build_empty takes no columns");
        Chunk::empty(self.schema, end_of_window, end_of_stream)
    }
}

pub fn int64_schema(names: &[&str]) -> SchemaRef {
    Arc::new(Schema::new(
        names
            .iter()
            .map(|n| Field::new(*n, DataType::Int64, true))
            .collect::<Vec<_>>(),
    ))
}

/// Materializes a chunk as one `Vec<Datum>` per row.
pub fn chunk_rows(chunk: &Chunk) -> Vec<Vec<Datum>> {
    let mut rows = Vec::with_capacity(chunk.len());
    for row in 0..chunk.len() {
        let mut values = Vec::with_capacity(chunk.num_columns());
        for column in chunk.columns() {
            values.push(datum::datum_at(column, row).expect("datum"));
        }
        rows.push(values);
    }
    rows
}

/// Asserts two row sets are equal as multisets. Aggregation output order is
/// implementation defined, so tests must never compare it as a sequence.
pub fn assert_rows_eq_unordered(actual: &[Vec<Datum>], expected: &[Vec<Datum>]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "row count mismatch: actual {:?}, expected {:?}",
        actual,
        expected
    );
    let mut remaining: Vec<&Vec<Datum>> = expected.iter().collect();
    for row in actual {
        let found = remaining.iter().position(|candidate| *candidate == row);
        match found {
            Some(idx) => {
                remaining.swap_remove(idx);
            }
            None => panic!(
                "unexpected output row {:?}; remaining expected rows {:?}",
                row, remaining
            ),
        }
    }
}

pub fn assert_chunk_rows_eq_unordered(chunk: &Chunk, expected: &[Vec<Datum>]) {
    assert_rows_eq_unordered(&chunk_rows(chunk), expected);
}
