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
//! Grouped aggregation node for blocking and windowed execution.
//!
//! Responsibilities:
//! - Validates an aggregate operator descriptor against the input schema and
//!   resolves every aggregate expression in the injected function registry at
//!   construction time.
//! - Accumulates per-group state over streaming input chunks and flushes it
//!   into one output chunk at stream end (blocking) or at every window
//!   boundary (windowed).
//!
//! Key exported interfaces:
//! - Types: `AggregateOperator`, `AggExpr`, `GroupColumn`, `AggNode`.
//!
//! Current limitations:
//! - A surfaced plugin error leaves the node closed; there is no partial
//!   flush or retry.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, RecordBatchOptions};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use tracing::debug;

use crate::exec::agg::registry::{AggFunctionEntry, Registry};
use crate::exec::agg::table::{GroupKey, GroupedAggTable};
use crate::exec::agg::FunctionContext;
use crate::exec::chunk::Chunk;
use crate::exec::datum::{self, DatumColumnBuilder};
use crate::exec::error::{ExecError, ExecResult};
use crate::exec::node::ExecNode;
use crate::runtime::runtime_state::RuntimeState;

/// One aggregate expression: function name, ordered argument column
/// references into the input schema, and the output column name.
#[derive(Clone, Debug)]
pub struct AggExpr {
    pub func: String,
    pub args: Vec<usize>,
    pub result_name: String,
}

/// One grouping column: input column reference plus its output name.
#[derive(Clone, Debug)]
pub struct GroupColumn {
    pub input_column: usize,
    pub output_name: String,
}

/// Validated-on-construction descriptor of one aggregation operator, produced
/// externally from a serialized plan. The node re-validates it against the
/// input schema and registry; the producer is never trusted.
///
/// Zero aggregate expressions is legal (distinct-key emission); zero grouping
/// columns is legal (a single implicit whole-stream group).
#[derive(Clone, Debug, Default)]
pub struct AggregateOperator {
    pub windowed: bool,
    pub group_by: Vec<GroupColumn>,
    pub aggregates: Vec<AggExpr>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AggPhase {
    Accumulating,
    Closed,
}

/// Streaming grouped-aggregation operator.
pub struct AggNode {
    name: String,
    windowed: bool,
    input_schema: SchemaRef,
    output_schema: SchemaRef,
    group_indices: Vec<usize>,
    group_types: Vec<DataType>,
    agg_args: Vec<Vec<usize>>,
    entries: Vec<AggFunctionEntry>,
    table: GroupedAggTable,
    phase: AggPhase,
}

impl std::fmt::Debug for AggNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggNode")
            .field("name", &self.name)
            .field("windowed", &self.windowed)
            .field("input_schema", &self.input_schema)
            .field("output_schema", &self.output_schema)
            .field("group_indices", &self.group_indices)
            .field("group_types", &self.group_types)
            .field("agg_args", &self.agg_args)
            .field("entries", &self.entries)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl AggNode {
    /// Builds a node from a descriptor, the declared input schema, and the
    /// function registry. All validation and registry resolution happens
    /// here; a failed construction yields no partially usable node, and the
    /// registry is never consulted again per row.
    pub fn try_new(
        op: &AggregateOperator,
        input_schema: SchemaRef,
        registry: &Registry,
    ) -> ExecResult<Self> {
        let mut group_indices = Vec::with_capacity(op.group_by.len());
        let mut group_types = Vec::with_capacity(op.group_by.len());
        let mut output_fields = Vec::with_capacity(op.group_by.len() + op.aggregates.len());
        let mut seen_names = Vec::new();

        for group in &op.group_by {
            let field = input_field(&input_schema, group.input_column, "group by")?;
            check_output_name(&group.output_name, &mut seen_names)?;
            group_indices.push(group.input_column);
            group_types.push(field.data_type().clone());
            output_fields.push(Field::new(
                &group.output_name,
                field.data_type().clone(),
                true,
            ));
        }

        let mut agg_args = Vec::with_capacity(op.aggregates.len());
        let mut entries = Vec::with_capacity(op.aggregates.len());
        for agg in &op.aggregates {
            let mut arg_types = Vec::with_capacity(agg.args.len());
            for &column in &agg.args {
                let field = input_field(&input_schema, column, &agg.func)?;
                arg_types.push(field.data_type().clone());
            }
            check_output_name(&agg.result_name, &mut seen_names)?;
            let entry = registry.resolve(&agg.func, &arg_types)?.clone();
            output_fields.push(Field::new(&agg.result_name, entry.result_type().clone(), true));
            agg_args.push(agg.args.clone());
            entries.push(entry);
        }

        let output_schema = Arc::new(Schema::new(output_fields));
        let table = GroupedAggTable::new(entries.clone());
        Ok(Self {
            name: "AGGREGATE".to_string(),
            windowed: op.windowed,
            input_schema,
            output_schema,
            group_indices,
            group_types,
            agg_args,
            entries,
            table,
            phase: AggPhase::Accumulating,
        })
    }

    pub fn output_schema(&self) -> SchemaRef {
        Arc::clone(&self.output_schema)
    }

    pub fn windowed(&self) -> bool {
        self.windowed
    }

    fn check_input_chunk(&self, chunk: &Chunk) -> ExecResult<()> {
        if chunk.num_columns() != self.input_schema.fields().len() {
            return Err(ExecError::internal(format!(
                "input chunk has {} columns, declared schema has {}",
                chunk.num_columns(),
                self.input_schema.fields().len()
            )));
        }
        for (idx, (field, column)) in self
            .input_schema
            .fields()
            .iter()
            .zip(chunk.columns().iter())
            .enumerate()
        {
            if field.data_type() != column.data_type() {
                return Err(ExecError::internal(format!(
                    "input chunk type mismatch at column {}: expected {:?}, got {:?}",
                    idx,
                    field.data_type(),
                    column.data_type()
                )));
            }
        }
        Ok(())
    }

    fn accumulate(&mut self, ctx: &FunctionContext, chunk: &Chunk) -> ExecResult<()> {
        let mut group_arrays: Vec<ArrayRef> = Vec::with_capacity(self.group_indices.len());
        for &index in &self.group_indices {
            group_arrays.push(Arc::clone(chunk.column(index)?));
        }
        let mut agg_arrays: Vec<Vec<ArrayRef>> = Vec::with_capacity(self.agg_args.len());
        for args in &self.agg_args {
            let mut arrays = Vec::with_capacity(args.len());
            for &index in args {
                arrays.push(Arc::clone(chunk.column(index)?));
            }
            agg_arrays.push(arrays);
        }

        let mut args = Vec::new();
        for row in 0..chunk.len() {
            let mut key_values = Vec::with_capacity(group_arrays.len());
            for array in &group_arrays {
                key_values.push(datum::datum_at(array, row)?);
            }
            let set = self.table.get_or_create(GroupKey::new(key_values), ctx)?;
            for (agg_index, arrays) in agg_arrays.iter().enumerate() {
                args.clear();
                for array in arrays {
                    args.push(datum::datum_at(array, row)?);
                }
                set.accumulator_mut(agg_index).update(ctx, &args)?;
            }
        }
        Ok(())
    }

    /// Finalizes every live group into one output chunk, in table order. The
    /// flow flags of the triggering input chunk are copied verbatim.
    fn flush(&mut self, ctx: &FunctionContext, trigger: &Chunk) -> ExecResult<Chunk> {
        // With no grouping columns the whole stream is one implicit group, so
        // a flush emits exactly one row even over an empty window.
        if self.group_indices.is_empty() {
            self.table.get_or_create(GroupKey::empty(), ctx)?;
        }

        let mut group_builders = Vec::with_capacity(self.group_types.len());
        for data_type in &self.group_types {
            group_builders.push(DatumColumnBuilder::for_type(data_type)?);
        }
        let mut agg_builders = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            agg_builders.push(DatumColumnBuilder::for_type(entry.result_type())?);
        }

        let mut row_count = 0usize;
        for (key, mut set) in self.table.drain() {
            for (builder, value) in group_builders.iter_mut().zip(key.values()) {
                builder.append(value)?;
            }
            for (builder, accumulator) in agg_builders.iter_mut().zip(set.iter_mut()) {
                let value = accumulator.finalize(ctx)?;
                builder.append(&value)?;
            }
            row_count += 1;
        }

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(group_builders.len() + agg_builders.len());
        for builder in group_builders {
            arrays.push(builder.finish());
        }
        for builder in agg_builders {
            arrays.push(builder.finish());
        }

        let batch = if arrays.is_empty() {
            let options = RecordBatchOptions::new().with_row_count(Some(row_count));
            RecordBatch::try_new_with_options(Arc::clone(&self.output_schema), arrays, &options)
        } else {
            RecordBatch::try_new(Arc::clone(&self.output_schema), arrays)
        }
        .map_err(|e| ExecError::internal(format!("build aggregate output batch: {}", e)))?;

        debug!(
            groups = row_count,
            windowed = self.windowed,
            end_of_stream = trigger.end_of_stream(),
            "aggregate flush"
        );
        Ok(Chunk::new(
            batch,
            trigger.raw_end_of_window(),
            trigger.end_of_stream(),
        ))
    }

    fn process(&mut self, state: &RuntimeState, chunk: Chunk) -> ExecResult<Option<Chunk>> {
        self.check_input_chunk(&chunk)?;
        let ctx = FunctionContext::new(state.query_id());

        if !chunk.is_empty() {
            self.accumulate(&ctx, &chunk)?;
        }

        let should_flush = if self.windowed {
            chunk.end_of_window()
        } else {
            chunk.end_of_stream()
        };
        if !should_flush {
            return Ok(None);
        }

        let out = self.flush(&ctx, &chunk)?;
        if !self.windowed || chunk.end_of_stream() {
            self.phase = AggPhase::Closed;
        }
        Ok(Some(out))
    }
}

impl ExecNode for AggNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, state: &RuntimeState) -> ExecResult<()> {
        self.table.reserve(state.agg_table_reserve());
        debug!(
            grouping_columns = self.group_indices.len(),
            aggregate_functions = self.entries.len(),
            windowed = self.windowed,
            "aggregate node prepared"
        );
        Ok(())
    }

    fn consume(
        &mut self,
        state: &RuntimeState,
        input_index: usize,
        chunk: Chunk,
    ) -> ExecResult<Option<Chunk>> {
        if input_index != 0 {
            return Err(ExecError::internal(format!(
                "aggregate node has a single input stream, got input_index {}",
                input_index
            )));
        }
        if self.phase == AggPhase::Closed {
            return Err(ExecError::internal(
                "aggregate node is closed and cannot accept input",
            ));
        }
        let result = self.process(state, chunk);
        if result.is_err() {
            // State is undefined after a surfaced error; refuse further input.
            self.phase = AggPhase::Closed;
        }
        result
    }

    fn is_closed(&self) -> bool {
        self.phase == AggPhase::Closed
    }
}

fn input_field<'a>(
    schema: &'a SchemaRef,
    index: usize,
    what: &str,
) -> ExecResult<&'a Field> {
    let field = schema.fields().get(index).map(|f| f.as_ref()).ok_or_else(|| {
        ExecError::invalid_plan(format!(
            "{} column {} out of range for input schema with {} columns",
            what,
            index,
            schema.fields().len()
        ))
    })?;
    if !datum::is_supported_type(field.data_type()) {
        return Err(ExecError::invalid_plan(format!(
            "{} column {} has unsupported type {:?}",
            what,
            index,
            field.data_type()
        )));
    }
    Ok(field)
}

fn check_output_name(name: &str, seen: &mut Vec<String>) -> ExecResult<()> {
    if name.is_empty() {
        return Err(ExecError::invalid_plan("empty output column name"));
    }
    if seen.iter().any(|n| n == name) {
        return Err(ExecError::invalid_plan(format!(
            "duplicate output column name '{}'",
            name
        )));
    }
    seen.push(name.to_string());
    Ok(())
}
