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
use crate::common::app_config::NovaStreamConfig;
use crate::common::types::UniqueId;

const DEFAULT_BATCH_SIZE: usize = 4096;
const DEFAULT_AGG_TABLE_RESERVE: usize = 64;

/// RuntimeState is a per-plan-instance execution context.
///
/// Today it mainly provides the query id and frequently used runtime options
/// (preferred batch size, aggregation table reserve). More execution-time
/// parameters can be migrated here over time.
#[derive(Clone, Debug)]
pub struct RuntimeState {
    query_id: Option<UniqueId>,
    batch_size: usize,
    agg_table_reserve: usize,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            query_id: None,
            batch_size: DEFAULT_BATCH_SIZE,
            agg_table_reserve: DEFAULT_AGG_TABLE_RESERVE,
        }
    }
}

impl RuntimeState {
    pub fn new(query_id: UniqueId) -> Self {
        Self {
            query_id: Some(query_id),
            ..Self::default()
        }
    }

    pub fn from_config(cfg: &NovaStreamConfig) -> Self {
        Self {
            query_id: None,
            batch_size: cfg.runtime.batch_size,
            agg_table_reserve: cfg.runtime.agg_table_reserve,
        }
    }

    pub fn with_query_id(mut self, query_id: UniqueId) -> Self {
        self.query_id = Some(query_id);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn query_id(&self) -> Option<UniqueId> {
        self.query_id
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn agg_table_reserve(&self) -> usize {
        self.agg_table_reserve
    }
}
