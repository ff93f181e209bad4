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
//! Execution node contracts.
//!
//! Responsibilities:
//! - Defines the push-based processor contract (`ExecNode`) and the source
//!   contract (`SourceNode`) the surrounding graph drives.
//!
//! Key exported interfaces:
//! - Types: `ExecNode`, `SourceNode`.

pub mod aggregate;
pub mod memory_source;

use crate::exec::chunk::Chunk;
use crate::exec::error::ExecResult;
use crate::runtime::runtime_state::RuntimeState;

/// Push-based processor node.
///
/// The graph runs a node on a single evaluating thread: one `consume` call
/// delivers one chunk, which is fully processed — including any flush it
/// triggers — before the call returns. A flush output chunk is handed back to
/// the caller for downstream forwarding; termination travels in-band via the
/// chunk flow flags, so there is no separate finish call.
pub trait ExecNode: Send {
    fn name(&self) -> &str;

    fn prepare(&mut self, _state: &RuntimeState) -> ExecResult<()> {
        Ok(())
    }

    /// Processes one chunk from input stream `input_index` and returns the
    /// flush output if this chunk triggered one. Must not be called again
    /// once the node is closed or an error has surfaced.
    fn consume(
        &mut self,
        state: &RuntimeState,
        input_index: usize,
        chunk: Chunk,
    ) -> ExecResult<Option<Chunk>>;

    fn is_closed(&self) -> bool {
        false
    }

    fn close(&mut self, _state: &RuntimeState) -> ExecResult<()> {
        Ok(())
    }
}

/// Pull-based source node feeding a plan from outside the graph.
pub trait SourceNode: Send {
    fn name(&self) -> &str;

    fn prepare(&mut self, _state: &RuntimeState) -> ExecResult<()> {
        Ok(())
    }

    fn has_batches_remaining(&self) -> bool;

    /// Produces the next chunk. Must only be called while
    /// `has_batches_remaining` is true; the final chunk carries the terminal
    /// flow flags.
    fn generate_next(&mut self, state: &RuntimeState) -> ExecResult<Chunk>;

    fn close(&mut self, _state: &RuntimeState) -> ExecResult<()> {
        Ok(())
    }
}
