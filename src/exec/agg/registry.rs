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
//! Signature-keyed aggregate function registry.
//!
//! Resolution is exact-match on lowercased name plus the ordered argument
//! type list. There is no coercion and no overload ranking: the plan producer
//! is expected to hand the node already-typed column references, and the node
//! resolves once at construction, never per row.

use std::fmt::Write as _;
use std::sync::Arc;

use arrow::datatypes::DataType;
use hashbrown::HashMap;

use crate::exec::agg::Aggregate;
use crate::exec::error::{ExecError, ExecResult};

/// Produces a fresh accumulator holding the function's zero value.
pub type AggregateFactory = Arc<dyn Fn() -> Box<dyn Aggregate> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SignatureKey {
    name: String,
    arg_types: Vec<DataType>,
}

/// A resolved registry entry: the declared result type plus the instance
/// factory the accumulator table clones per group.
#[derive(Clone)]
pub struct AggFunctionEntry {
    name: String,
    result_type: DataType,
    factory: AggregateFactory,
}

impl AggFunctionEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn result_type(&self) -> &DataType {
        &self.result_type
    }

    pub fn make(&self) -> Box<dyn Aggregate> {
        (self.factory)()
    }
}

impl std::fmt::Debug for AggFunctionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggFunctionEntry")
            .field("name", &self.name)
            .field("result_type", &self.result_type)
            .finish()
    }
}

/// A scoped collection of aggregate functions, injected into nodes at
/// construction rather than living as process-global state.
pub struct Registry {
    name: String,
    entries: HashMap<SignatureKey, AggFunctionEntry>,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// A registry preloaded with the built-in aggregate functions.
    pub fn with_builtins(name: impl Into<String>) -> Self {
        let mut registry = Self::new(name);
        crate::exec::agg::functions::register_builtins(&mut registry)
            .expect("built-in signatures are disjoint");
        registry
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register(
        &mut self,
        name: &str,
        arg_types: &[DataType],
        result_type: DataType,
        factory: AggregateFactory,
    ) -> ExecResult<()> {
        let key = SignatureKey {
            name: name.to_ascii_lowercase(),
            arg_types: arg_types.to_vec(),
        };
        if self.entries.contains_key(&key) {
            return Err(ExecError::duplicate_registration(format!(
                "aggregate function {} already registered in registry '{}'",
                format_signature(&key.name, arg_types),
                self.name
            )));
        }
        let entry = AggFunctionEntry {
            name: key.name.clone(),
            result_type,
            factory,
        };
        self.entries.insert(key, entry);
        Ok(())
    }

    pub fn resolve(&self, name: &str, arg_types: &[DataType]) -> ExecResult<&AggFunctionEntry> {
        let key = SignatureKey {
            name: name.to_ascii_lowercase(),
            arg_types: arg_types.to_vec(),
        };
        self.entries.get(&key).ok_or_else(|| {
            ExecError::unresolved_function(format!(
                "no aggregate function {} in registry '{}'",
                format_signature(&key.name, arg_types),
                self.name
            ))
        })
    }
}

fn format_signature(name: &str, arg_types: &[DataType]) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}(", name);
    for (idx, t) in arg_types.iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", t);
    }
    out.push(')');
    out
}
