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
//! Pluggable aggregate function contract and its supporting pieces.
//!
//! Responsibilities:
//! - Defines the `Aggregate` capability trait implemented by every aggregate
//!   function (built-in or user-supplied).
//! - Submodules provide the signature-keyed registry, the built-in function
//!   set, and the group-key accumulator table.
//!
//! Key exported interfaces:
//! - Types: `Aggregate`, `FunctionContext`, `Registry`, `GroupedAggTable`.

pub mod functions;
pub mod registry;
pub mod table;

use std::any::Any;

use crate::common::types::UniqueId;
use crate::exec::datum::Datum;
use crate::exec::error::ExecResult;

pub use registry::{AggFunctionEntry, AggregateFactory, Registry};
pub use table::{AccumulatorSet, GroupKey, GroupedAggTable};

/// Per-plan-instance context handed to every aggregate capability call.
#[derive(Clone, Debug, Default)]
pub struct FunctionContext {
    query_id: Option<UniqueId>,
}

impl FunctionContext {
    pub fn new(query_id: Option<UniqueId>) -> Self {
        Self { query_id }
    }

    pub fn query_id(&self) -> Option<UniqueId> {
        self.query_id
    }
}

/// One incrementally computed aggregate result.
///
/// An instance accumulates the rows of exactly one group within one window.
/// `update` must be order independent: combined with `merge`, any partition
/// and interleaving of the same row set yields the same `finalize` result.
/// The operator discards an accumulator right after `finalize`, so an
/// implementation may destructively consume its state there.
pub trait Aggregate: Send {
    /// Runs once before any `update`. The default leaves the
    /// factory-constructed zero value in place.
    fn init(&mut self, _ctx: &FunctionContext) -> ExecResult<()> {
        Ok(())
    }

    /// Folds one row into the accumulator. Arguments arrive already typed per
    /// the registered signature, in declared order; a null argument is a
    /// `Datum::Null`.
    fn update(&mut self, ctx: &FunctionContext, args: &[Datum]) -> ExecResult<()>;

    /// Folds `other`'s state into `self` without mutating `other`. `other`
    /// is always an accumulator produced by the same factory; a different
    /// concrete type is an error, never a silent no-op.
    fn merge(&mut self, ctx: &FunctionContext, other: &dyn Aggregate) -> ExecResult<()>;

    /// Produces the externally visible result.
    fn finalize(&mut self, ctx: &FunctionContext) -> ExecResult<Datum>;

    /// Concrete-type access for `merge`.
    fn as_any(&self) -> &dyn Any;
}
