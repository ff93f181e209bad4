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
//! Group-key accumulator table for one aggregation window.
//!
//! Responsibilities:
//! - Maps each distinct grouping-column value tuple to its set of live
//!   accumulators, creating the set lazily from the node's resolved function
//!   entries on first sight of the key.
//! - Iteration order is whatever the hash table yields; no output ordering is
//!   promised anywhere downstream.

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;

use crate::exec::agg::registry::AggFunctionEntry;
use crate::exec::agg::{Aggregate, FunctionContext};
use crate::exec::datum::Datum;
use crate::exec::error::ExecResult;

/// Composite grouping key: one datum per grouping column, in descriptor
/// order. Immutable once inserted.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<Datum>);

impl GroupKey {
    pub fn new(values: Vec<Datum>) -> Self {
        Self(values)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn values(&self) -> &[Datum] {
        &self.0
    }
}

/// The live accumulators of one group, one per aggregate expression, in
/// descriptor order.
pub struct AccumulatorSet {
    accumulators: Vec<Box<dyn Aggregate>>,
}

impl AccumulatorSet {
    fn create(entries: &[AggFunctionEntry], ctx: &FunctionContext) -> ExecResult<Self> {
        let mut accumulators = Vec::with_capacity(entries.len());
        for entry in entries {
            let mut acc = entry.make();
            acc.init(ctx)?;
            accumulators.push(acc);
        }
        Ok(Self { accumulators })
    }

    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    pub fn accumulator_mut(&mut self, index: usize) -> &mut Box<dyn Aggregate> {
        &mut self.accumulators[index]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Aggregate>> {
        self.accumulators.iter_mut()
    }
}

/// Window-scoped map from group key to accumulator set.
pub struct GroupedAggTable {
    entries: Vec<AggFunctionEntry>,
    groups: HashMap<GroupKey, AccumulatorSet>,
}

impl GroupedAggTable {
    pub fn new(entries: Vec<AggFunctionEntry>) -> Self {
        Self {
            entries,
            groups: HashMap::new(),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.groups.reserve(additional);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the key's accumulator set, constructing and inserting it on
    /// first sight (each accumulator freshly made and `init`-ed). Amortized
    /// O(1) in the number of live groups.
    pub fn get_or_create(
        &mut self,
        key: GroupKey,
        ctx: &FunctionContext,
    ) -> ExecResult<&mut AccumulatorSet> {
        match self.groups.entry(key) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let set = AccumulatorSet::create(&self.entries, ctx)?;
                Ok(slot.insert(set))
            }
        }
    }

    /// Removes and yields every live entry, in table order.
    pub fn drain(&mut self) -> impl Iterator<Item = (GroupKey, AccumulatorSet)> + '_ {
        self.groups.drain()
    }

    /// Discards all entries; the table is ready for the next window.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::agg::functions::register_builtins;
    use crate::exec::agg::registry::Registry;
    use arrow::datatypes::DataType;

    fn sum_table() -> GroupedAggTable {
        let mut registry = Registry::new("table_test");
        register_builtins(&mut registry).expect("builtins");
        let entry = registry
            .resolve("sum", &[DataType::Int64])
            .expect("sum entry")
            .clone();
        GroupedAggTable::new(vec![entry])
    }

    #[test]
    fn get_or_create_reuses_existing_entries() {
        let ctx = FunctionContext::default();
        let mut table = sum_table();

        let key = GroupKey::new(vec![Datum::Int64(7)]);
        {
            let set = table.get_or_create(key.clone(), &ctx).expect("create");
            set.accumulator_mut(0)
                .update(&ctx, &[Datum::Int64(5)])
                .expect("update");
        }
        {
            let set = table.get_or_create(key, &ctx).expect("lookup");
            set.accumulator_mut(0)
                .update(&ctx, &[Datum::Int64(3)])
                .expect("update");
        }
        assert_eq!(table.len(), 1);

        let (_, mut set) = table.drain().next().expect("one entry");
        let out = set
            .accumulator_mut(0)
            .finalize(&ctx)
            .expect("finalize");
        assert_eq!(out, Datum::Int64(8));
    }

    #[test]
    fn empty_tuple_key_is_a_single_group() {
        let ctx = FunctionContext::default();
        let mut table = sum_table();
        table
            .get_or_create(GroupKey::empty(), &ctx)
            .expect("create");
        table
            .get_or_create(GroupKey::empty(), &ctx)
            .expect("lookup");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn clear_resets_the_window() {
        let ctx = FunctionContext::default();
        let mut table = sum_table();
        table
            .get_or_create(GroupKey::new(vec![Datum::Int64(1)]), &ctx)
            .expect("create");
        table
            .get_or_create(GroupKey::new(vec![Datum::Int64(2)]), &ctx)
            .expect("create");
        assert_eq!(table.len(), 2);
        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn zero_expression_sets_are_empty() {
        let ctx = FunctionContext::default();
        let mut table = GroupedAggTable::new(Vec::new());
        let set = table
            .get_or_create(GroupKey::new(vec![Datum::Utf8("k".into())]), &ctx)
            .expect("create");
        assert!(set.is_empty());
    }
}
