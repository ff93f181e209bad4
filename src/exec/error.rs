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
//! Execution-layer error values.
//!
//! Everything in the execution layer reports upward; there are no internally
//! recoverable errors. Construction-time kinds (`InvalidPlan`,
//! `UnresolvedFunction`, `DuplicateRegistration`) mean no usable node was
//! produced. A `Function` error surfaced from an aggregate plugin leaves the
//! originating node unusable.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecErrorKind {
    /// The operator descriptor failed validation against the input schema.
    InvalidPlan,
    /// No registered function matches the requested name + argument types.
    UnresolvedFunction,
    /// A function was registered twice under the same name + argument types.
    DuplicateRegistration,
    /// Raised by an aggregate plugin from init/update/merge/finalize.
    Function,
    /// Invariant violation inside the execution engine itself.
    Internal,
}

#[derive(Clone, Debug)]
pub struct ExecError {
    kind: ExecErrorKind,
    message: String,
}

impl ExecError {
    pub fn new(kind: ExecErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::InvalidPlan, message)
    }

    pub fn unresolved_function(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::UnresolvedFunction, message)
    }

    pub fn duplicate_registration(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::DuplicateRegistration, message)
    }

    pub fn function(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::Function, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ExecErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ExecErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExecError {}

pub type ExecResult<T> = Result<T, ExecError>;
