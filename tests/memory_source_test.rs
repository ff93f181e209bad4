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
use std::sync::Arc;

use arrow::array::{Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use novastream::exec::agg::registry::Registry;
use novastream::exec::datum::Datum;
use novastream::exec::error::ExecErrorKind;
use novastream::exec::node::aggregate::{AggExpr, AggNode, AggregateOperator, GroupColumn};
use novastream::exec::node::memory_source::{MemorySourceNode, MemorySourceOperator};
use novastream::exec::node::{ExecNode, SourceNode};

mod common;
use common::{assert_chunk_rows_eq_unordered, test_runtime_state};

fn two_column_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("name", DataType::Utf8, true),
    ]))
}

fn batch(schema: &SchemaRef, ids: Vec<Option<i64>>, names: Vec<Option<&str>>) -> RecordBatch {
    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .expect("test batch")
}

#[test]
fn test_replays_batches_in_order_with_terminal_flags() {
    let schema = two_column_schema();
    let op = MemorySourceOperator {
        schema: schema.clone(),
        batches: vec![
            batch(&schema, vec![Some(1), Some(2)], vec![Some("a"), Some("b")]),
            batch(&schema, vec![Some(3)], vec![Some("c")]),
        ],
    };
    let mut source = MemorySourceNode::try_new(op).expect("source");
    let state = test_runtime_state();
    source.prepare(&state).expect("prepare");

    let first = source.generate_next(&state).expect("first");
    assert_eq!(first.len(), 2);
    assert!(!first.end_of_stream());
    assert!(source.has_batches_remaining());

    let second = source.generate_next(&state).expect("second");
    assert_eq!(second.len(), 1);
    assert!(second.end_of_window());
    assert!(second.end_of_stream());
    assert!(!source.has_batches_remaining());

    assert_eq!(source.rows_processed(), 3);
    // 3 int64 slots plus "a" + "b" + "c".
    assert_eq!(source.bytes_processed(), 3 * 8 + 3);
}

#[test]
fn test_empty_table_emits_one_zero_row_terminal_chunk() {
    let schema = two_column_schema();
    let op = MemorySourceOperator {
        schema,
        batches: vec![],
    };
    let mut source = MemorySourceNode::try_new(op).expect("source");
    let state = test_runtime_state();
    source.prepare(&state).expect("prepare");

    assert!(source.has_batches_remaining());
    let only = source.generate_next(&state).expect("terminal");
    assert_eq!(only.len(), 0);
    assert!(only.end_of_window());
    assert!(only.end_of_stream());
    assert!(!source.has_batches_remaining());
    assert_eq!(source.rows_processed(), 0);
    assert_eq!(source.bytes_processed(), 0);
}

#[test]
fn test_large_batch_is_resliced_to_the_runtime_batch_size() {
    let schema = two_column_schema();
    let ids: Vec<Option<i64>> = (0..10).map(Some).collect();
    let names: Vec<Option<&str>> = (0..10).map(|_| Some("x")).collect();
    let op = MemorySourceOperator {
        schema: schema.clone(),
        batches: vec![batch(&schema, ids, names)],
    };
    let mut source = MemorySourceNode::try_new(op).expect("source");
    let state = test_runtime_state().with_batch_size(4);
    source.prepare(&state).expect("prepare");

    let mut lengths = Vec::new();
    while source.has_batches_remaining() {
        let chunk = source.generate_next(&state).expect("chunk");
        lengths.push(chunk.len());
        if !source.has_batches_remaining() {
            assert!(chunk.end_of_stream());
        } else {
            assert!(!chunk.end_of_stream());
        }
    }
    assert_eq!(lengths, vec![4, 4, 2]);
    assert_eq!(source.rows_processed(), 10);
}

#[test]
fn test_interior_empty_batches_are_skipped() {
    let schema = two_column_schema();
    let empty = RecordBatch::new_empty(schema.clone());
    let op = MemorySourceOperator {
        schema: schema.clone(),
        batches: vec![
            empty.clone(),
            batch(&schema, vec![Some(1)], vec![Some("a")]),
            empty,
        ],
    };
    let mut source = MemorySourceNode::try_new(op).expect("source");
    let state = test_runtime_state();
    source.prepare(&state).expect("prepare");

    let only = source.generate_next(&state).expect("chunk");
    assert_eq!(only.len(), 1);
    assert!(only.end_of_stream());
    assert!(!source.has_batches_remaining());
}

#[test]
fn test_mismatched_batch_schema_is_invalid_plan() {
    let schema = two_column_schema();
    let other_schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, true)]));
    let other = RecordBatch::try_new(
        other_schema,
        vec![Arc::new(Int64Array::from(vec![Some(1)]))],
    )
    .expect("batch");
    let op = MemorySourceOperator {
        schema,
        batches: vec![other],
    };
    let err = MemorySourceNode::try_new(op).expect_err("schema mismatch");
    assert_eq!(err.kind(), ExecErrorKind::InvalidPlan);
}

#[test]
fn test_source_drives_aggregation_end_to_end() {
    let schema = two_column_schema();
    let op = MemorySourceOperator {
        schema: schema.clone(),
        batches: vec![
            batch(
                &schema,
                vec![Some(1), Some(2), Some(1)],
                vec![Some("a"), Some("b"), Some("c")],
            ),
            batch(&schema, vec![Some(2), Some(2)], vec![Some("d"), None]),
        ],
    };
    let mut source = MemorySourceNode::try_new(op).expect("source");

    let registry = Registry::with_builtins("memory_source_test");
    let agg_op = AggregateOperator {
        windowed: false,
        group_by: vec![GroupColumn {
            input_column: 0,
            output_name: "id".to_string(),
        }],
        aggregates: vec![AggExpr {
            func: "count".to_string(),
            args: vec![1],
            result_name: "names".to_string(),
        }],
    };
    let mut agg = AggNode::try_new(&agg_op, schema, &registry).expect("agg node");

    let state = test_runtime_state();
    source.prepare(&state).expect("prepare source");
    agg.prepare(&state).expect("prepare agg");

    let mut flushes = Vec::new();
    while source.has_batches_remaining() {
        let chunk = source.generate_next(&state).expect("chunk");
        if let Some(out) = agg.consume(&state, 0, chunk).expect("consume") {
            flushes.push(out);
        }
    }

    assert_eq!(flushes.len(), 1);
    assert_chunk_rows_eq_unordered(
        &flushes[0],
        &[
            vec![Datum::Int64(1), Datum::Int64(2)],
            vec![Datum::Int64(2), Datum::Int64(2)],
        ],
    );
    assert!(agg.is_closed());
}
