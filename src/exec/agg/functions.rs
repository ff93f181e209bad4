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
//! Built-in aggregate functions: count, sum, min, max, avg.
//!
//! Null arguments are skipped. An accumulator that never saw a value
//! finalizes to null, except count which finalizes to 0.

use std::any::Any;
use std::sync::Arc;

use arrow::datatypes::{DataType, TimeUnit};

use crate::exec::agg::registry::Registry;
use crate::exec::agg::{Aggregate, FunctionContext};
use crate::exec::datum::Datum;
use crate::exec::error::{ExecError, ExecResult};

fn one_arg<'a>(name: &str, args: &'a [Datum]) -> ExecResult<&'a Datum> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ExecError::internal(format!(
            "{} expects 1 argument, got {}",
            name,
            args.len()
        ))),
    }
}

fn merge_mismatch(name: &str) -> ExecError {
    ExecError::function(format!(
        "merge requires matching accumulator types for {}",
        name
    ))
}

/// Scalar types the built-in numeric/ordered aggregates run over.
trait AggScalar: Clone + Send + 'static {
    const TYPE_NAME: &'static str;

    fn from_datum(datum: &Datum) -> ExecResult<Option<Self>>;
    fn into_datum(value: Self) -> Datum;
}

impl AggScalar for i64 {
    const TYPE_NAME: &'static str = "int64";

    fn from_datum(datum: &Datum) -> ExecResult<Option<Self>> {
        match datum {
            Datum::Null => Ok(None),
            Datum::Int64(v) => Ok(Some(*v)),
            other => Err(ExecError::internal(format!(
                "aggregate argument type mismatch: expected int64, got {:?}",
                other
            ))),
        }
    }

    fn into_datum(value: Self) -> Datum {
        Datum::Int64(value)
    }
}

impl AggScalar for f64 {
    const TYPE_NAME: &'static str = "float64";

    fn from_datum(datum: &Datum) -> ExecResult<Option<Self>> {
        match datum {
            Datum::Null => Ok(None),
            Datum::Float64(v) => Ok(Some(*v)),
            other => Err(ExecError::internal(format!(
                "aggregate argument type mismatch: expected float64, got {:?}",
                other
            ))),
        }
    }

    fn into_datum(value: Self) -> Datum {
        Datum::Float64(value)
    }
}

impl AggScalar for String {
    const TYPE_NAME: &'static str = "utf8";

    fn from_datum(datum: &Datum) -> ExecResult<Option<Self>> {
        match datum {
            Datum::Null => Ok(None),
            Datum::Utf8(v) => Ok(Some(v.clone())),
            other => Err(ExecError::internal(format!(
                "aggregate argument type mismatch: expected utf8, got {:?}",
                other
            ))),
        }
    }

    fn into_datum(value: Self) -> Datum {
        Datum::Utf8(value)
    }
}

/// Scalar types that can be summed.
trait AggSum: AggScalar {
    fn zero() -> Self;
    fn checked_sum(acc: Self, value: Self) -> ExecResult<Self>;
    fn as_f64(&self) -> f64;
}

impl AggSum for i64 {
    fn zero() -> Self {
        0
    }

    fn checked_sum(acc: Self, value: Self) -> ExecResult<Self> {
        acc.checked_add(value)
            .ok_or_else(|| ExecError::function("int64 sum overflow"))
    }

    fn as_f64(&self) -> f64 {
        *self as f64
    }
}

impl AggSum for f64 {
    fn zero() -> Self {
        0.0
    }

    fn checked_sum(acc: Self, value: Self) -> ExecResult<Self> {
        Ok(acc + value)
    }

    fn as_f64(&self) -> f64 {
        *self
    }
}

/// count(x): number of non-null values.
#[derive(Default)]
pub struct CountAgg {
    count: i64,
}

impl Aggregate for CountAgg {
    fn update(&mut self, _ctx: &FunctionContext, args: &[Datum]) -> ExecResult<()> {
        if !one_arg("count", args)?.is_null() {
            self.count += 1;
        }
        Ok(())
    }

    fn merge(&mut self, _ctx: &FunctionContext, other: &dyn Aggregate) -> ExecResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| merge_mismatch("count"))?;
        self.count += other.count;
        Ok(())
    }

    fn finalize(&mut self, _ctx: &FunctionContext) -> ExecResult<Datum> {
        Ok(Datum::Int64(self.count))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// sum(x): sum of non-null values, null over an empty value set.
pub struct SumAgg<T: AggSum> {
    sum: Option<T>,
}

impl<T: AggSum> Default for SumAgg<T> {
    fn default() -> Self {
        Self { sum: None }
    }
}

impl<T: AggSum> Aggregate for SumAgg<T> {
    fn update(&mut self, _ctx: &FunctionContext, args: &[Datum]) -> ExecResult<()> {
        if let Some(value) = T::from_datum(one_arg("sum", args)?)? {
            let acc = self.sum.take().unwrap_or_else(T::zero);
            self.sum = Some(T::checked_sum(acc, value)?);
        }
        Ok(())
    }

    fn merge(&mut self, _ctx: &FunctionContext, other: &dyn Aggregate) -> ExecResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| merge_mismatch("sum"))?;
        if let Some(value) = other.sum.clone() {
            let acc = self.sum.take().unwrap_or_else(T::zero);
            self.sum = Some(T::checked_sum(acc, value)?);
        }
        Ok(())
    }

    fn finalize(&mut self, _ctx: &FunctionContext) -> ExecResult<Datum> {
        Ok(match self.sum.take() {
            Some(v) => T::into_datum(v),
            None => Datum::Null,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// min(x) / max(x) over any ordered scalar, null over an empty value set.
pub struct ExtremeAgg<T: AggScalar + PartialOrd> {
    value: Option<T>,
    pick_min: bool,
}

impl<T: AggScalar + PartialOrd> ExtremeAgg<T> {
    pub fn min() -> Self {
        Self {
            value: None,
            pick_min: true,
        }
    }

    pub fn max() -> Self {
        Self {
            value: None,
            pick_min: false,
        }
    }

    fn fold(&mut self, value: T) {
        match &self.value {
            None => self.value = Some(value),
            Some(best) => {
                let replace = if self.pick_min {
                    value < *best
                } else {
                    value > *best
                };
                if replace {
                    self.value = Some(value);
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        if self.pick_min { "min" } else { "max" }
    }
}

impl<T: AggScalar + PartialOrd> Aggregate for ExtremeAgg<T> {
    fn update(&mut self, _ctx: &FunctionContext, args: &[Datum]) -> ExecResult<()> {
        if let Some(value) = T::from_datum(one_arg(self.name(), args)?)? {
            self.fold(value);
        }
        Ok(())
    }

    fn merge(&mut self, _ctx: &FunctionContext, other: &dyn Aggregate) -> ExecResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| merge_mismatch(self.name()))?;
        if other.pick_min != self.pick_min {
            return Err(merge_mismatch(self.name()));
        }
        if let Some(value) = other.value.clone() {
            self.fold(value);
        }
        Ok(())
    }

    fn finalize(&mut self, _ctx: &FunctionContext) -> ExecResult<Datum> {
        Ok(match self.value.take() {
            Some(v) => T::into_datum(v),
            None => Datum::Null,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// avg(x): arithmetic mean of non-null values as float64, null over an empty
/// value set.
pub struct AvgAgg<T: AggSum> {
    sum: T,
    count: i64,
}

impl<T: AggSum> Default for AvgAgg<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            count: 0,
        }
    }
}

impl<T: AggSum> Aggregate for AvgAgg<T> {
    fn update(&mut self, _ctx: &FunctionContext, args: &[Datum]) -> ExecResult<()> {
        if let Some(value) = T::from_datum(one_arg("avg", args)?)? {
            self.sum = T::checked_sum(self.sum.clone(), value)?;
            self.count += 1;
        }
        Ok(())
    }

    fn merge(&mut self, _ctx: &FunctionContext, other: &dyn Aggregate) -> ExecResult<()> {
        let other = other
            .as_any()
            .downcast_ref::<Self>()
            .ok_or_else(|| merge_mismatch("avg"))?;
        self.sum = T::checked_sum(self.sum.clone(), other.sum.clone())?;
        self.count += other.count;
        Ok(())
    }

    fn finalize(&mut self, _ctx: &FunctionContext) -> ExecResult<Datum> {
        if self.count == 0 {
            return Ok(Datum::Null);
        }
        Ok(Datum::Float64(self.sum.as_f64() / self.count as f64))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Install the built-in functions into `registry` under every supported
/// signature.
pub fn register_builtins(registry: &mut Registry) -> ExecResult<()> {
    let ts = DataType::Timestamp(TimeUnit::Nanosecond, None);

    for arg in [
        DataType::Boolean,
        DataType::Int64,
        DataType::Float64,
        DataType::Utf8,
        ts.clone(),
    ] {
        registry.register(
            "count",
            &[arg],
            DataType::Int64,
            Arc::new(|| Box::new(CountAgg::default())),
        )?;
    }

    registry.register(
        "sum",
        &[DataType::Int64],
        DataType::Int64,
        Arc::new(|| Box::new(SumAgg::<i64>::default())),
    )?;
    registry.register(
        "sum",
        &[DataType::Float64],
        DataType::Float64,
        Arc::new(|| Box::new(SumAgg::<f64>::default())),
    )?;

    registry.register(
        "min",
        &[DataType::Int64],
        DataType::Int64,
        Arc::new(|| Box::new(ExtremeAgg::<i64>::min())),
    )?;
    registry.register(
        "min",
        &[DataType::Float64],
        DataType::Float64,
        Arc::new(|| Box::new(ExtremeAgg::<f64>::min())),
    )?;
    registry.register(
        "min",
        &[DataType::Utf8],
        DataType::Utf8,
        Arc::new(|| Box::new(ExtremeAgg::<String>::min())),
    )?;
    registry.register(
        "max",
        &[DataType::Int64],
        DataType::Int64,
        Arc::new(|| Box::new(ExtremeAgg::<i64>::max())),
    )?;
    registry.register(
        "max",
        &[DataType::Float64],
        DataType::Float64,
        Arc::new(|| Box::new(ExtremeAgg::<f64>::max())),
    )?;
    registry.register(
        "max",
        &[DataType::Utf8],
        DataType::Utf8,
        Arc::new(|| Box::new(ExtremeAgg::<String>::max())),
    )?;

    registry.register(
        "avg",
        &[DataType::Int64],
        DataType::Float64,
        Arc::new(|| Box::new(AvgAgg::<i64>::default())),
    )?;
    registry.register(
        "avg",
        &[DataType::Float64],
        DataType::Float64,
        Arc::new(|| Box::new(AvgAgg::<f64>::default())),
    )?;

    Ok(())
}
