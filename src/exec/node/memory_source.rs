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
//! Source node replaying an in-memory table.
//!
//! Responsibilities:
//! - Emits preloaded record batches in order, re-sliced to the runtime batch
//!   size, flagging the final chunk as end of window and end of stream.
//! - Tracks rows and logical value bytes handed downstream.

use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use tracing::debug;

use crate::exec::chunk::Chunk;
use crate::exec::error::{ExecError, ExecResult};
use crate::exec::node::SourceNode;
use crate::runtime::runtime_state::RuntimeState;

/// Descriptor of one memory source: the declared output schema plus the
/// stored batches of the backing in-memory table.
#[derive(Clone, Debug)]
pub struct MemorySourceOperator {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

#[derive(Debug)]
pub struct MemorySourceNode {
    name: String,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    next_batch: usize,
    offset: usize,
    exhausted: bool,
    rows_processed: usize,
    bytes_processed: usize,
}

impl MemorySourceNode {
    pub fn try_new(op: MemorySourceOperator) -> ExecResult<Self> {
        for (idx, batch) in op.batches.iter().enumerate() {
            if batch.schema().as_ref() != op.schema.as_ref() {
                return Err(ExecError::invalid_plan(format!(
                    "memory source batch {} schema does not match declared schema",
                    idx
                )));
            }
        }
        Ok(Self {
            name: "MEMORY_SOURCE".to_string(),
            schema: op.schema,
            batches: op.batches,
            next_batch: 0,
            offset: 0,
            exhausted: false,
            rows_processed: 0,
            bytes_processed: 0,
        })
    }

    pub fn rows_processed(&self) -> usize {
        self.rows_processed
    }

    pub fn bytes_processed(&self) -> usize {
        self.bytes_processed
    }

    fn skip_empty_batches(&mut self) {
        while self
            .batches
            .get(self.next_batch)
            .is_some_and(|b| b.num_rows() == 0)
        {
            self.next_batch += 1;
        }
    }
}

impl SourceNode for MemorySourceNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn prepare(&mut self, _state: &RuntimeState) -> ExecResult<()> {
        debug!(batches = self.batches.len(), "memory source prepared");
        Ok(())
    }

    fn has_batches_remaining(&self) -> bool {
        !self.exhausted
    }

    fn generate_next(&mut self, state: &RuntimeState) -> ExecResult<Chunk> {
        if self.exhausted {
            return Err(ExecError::internal("memory source is exhausted"));
        }
        self.skip_empty_batches();

        let Some(batch) = self.batches.get(self.next_batch) else {
            // Empty table: a single zero-row chunk still closes the stream.
            self.exhausted = true;
            return Ok(Chunk::empty(self.schema.clone(), true, true));
        };

        let limit = state.batch_size().max(1);
        let remaining = batch.num_rows() - self.offset;
        let take = remaining.min(limit);
        let slice = batch.slice(self.offset, take);
        self.offset += take;
        if self.offset >= batch.num_rows() {
            self.next_batch += 1;
            self.offset = 0;
            self.skip_empty_batches();
        }

        let last = self.next_batch >= self.batches.len();
        if last {
            self.exhausted = true;
        }
        let chunk = Chunk::new(slice, last, last);
        self.rows_processed += chunk.len();
        self.bytes_processed += chunk.value_bytes();
        Ok(chunk)
    }
}
