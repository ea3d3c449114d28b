//! Eagerly materialized frames and aggregation.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Local};

use super::EngineError;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Long(i64),
    Double(f64),
    Str(String),
    Timestamp(DateTime<Local>),
    Null,
}

impl Value {
    /// Numeric view of the cell, `None` for non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric division that fails on a zero divisor. Non-numeric operands give null.
    pub fn checked_div(&self, divisor: &Value) -> Result<Value, EngineError> {
        match (self.as_f64(), divisor.as_f64()) {
            (_, Some(d)) if d == 0.0 => Err(EngineError::DivideByZero),
            (Some(n), Some(d)) => Ok(Value::Double(n / d)),
            _ => Ok(Value::Null),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Rough in-memory footprint used for cache accounting.
    pub fn estimated_size(&self) -> u64 {
        match self {
            Value::Long(_) | Value::Double(_) => 8,
            Value::Timestamp(_) => 12,
            Value::Str(s) => 24 + s.len() as u64,
            Value::Null => 1,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Long(_) | Value::Double(_) => 1,
            Value::Timestamp(_) => 2,
            Value::Str(_) => 3,
        }
    }

    /// Total ordering used to sort grouped output.
    fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// Hashable projection of a value for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Long(i64),
    Double(u64),
    Str(String),
    Timestamp(i64),
    Null,
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Long(v) => GroupKey::Long(*v),
            Value::Double(v) => GroupKey::Double(v.to_bits()),
            Value::Str(s) => GroupKey::Str(s.clone()),
            Value::Timestamp(ts) => GroupKey::Timestamp(ts.timestamp_micros()),
            Value::Null => GroupKey::Null,
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Sum,
    Avg,
    Max,
    Count,
}

impl AggFunc {
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
        }
    }
}

/// An aggregate over one column; its output column is named `func(column)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agg {
    pub func: AggFunc,
    pub column: String,
}

impl Agg {
    pub fn sum(column: &str) -> Self {
        Self::new(AggFunc::Sum, column)
    }

    pub fn avg(column: &str) -> Self {
        Self::new(AggFunc::Avg, column)
    }

    pub fn max(column: &str) -> Self {
        Self::new(AggFunc::Max, column)
    }

    pub fn count(column: &str) -> Self {
        Self::new(AggFunc::Count, column)
    }

    fn new(func: AggFunc, column: &str) -> Self {
        Self {
            func,
            column: column.to_string(),
        }
    }

    pub fn output_name(&self) -> String {
        format!("{}({})", self.func.name(), self.column)
    }
}

/// Running state for one aggregate.
#[derive(Debug, Clone)]
struct Accumulator {
    func: AggFunc,
    sum: f64,
    count: i64,
    max: Option<Value>,
    integral: bool,
}

impl Accumulator {
    fn new(func: AggFunc) -> Self {
        Self {
            func,
            sum: 0.0,
            count: 0,
            max: None,
            integral: true,
        }
    }

    fn update(&mut self, value: &Value, column: &str) -> Result<(), EngineError> {
        if value.is_null() {
            return Ok(());
        }
        if self.func == AggFunc::Count {
            self.count += 1;
            return Ok(());
        }

        let numeric = value.as_f64().ok_or_else(|| EngineError::TypeMismatch {
            column: column.to_string(),
            expected: "numeric",
        })?;
        if matches!(value, Value::Double(_)) {
            self.integral = false;
        }
        self.sum += numeric;
        self.count += 1;
        if self.func == AggFunc::Max {
            let replace = match &self.max {
                Some(current) => value.total_cmp(current) == Ordering::Greater,
                None => true,
            };
            if replace {
                self.max = Some(value.clone());
            }
        }
        Ok(())
    }

    fn finish(self) -> Value {
        match self.func {
            AggFunc::Count => Value::Long(self.count),
            _ if self.count == 0 => Value::Null,
            AggFunc::Sum if self.integral => Value::Long(self.sum as i64),
            AggFunc::Sum => Value::Double(self.sum),
            AggFunc::Avg => Value::Double(self.sum / self.count as f64),
            AggFunc::Max => self.max.unwrap_or(Value::Null),
        }
    }
}

/// Rows with named columns. Every operation produces a new, fully evaluated frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Single `id` column holding `0..n`.
    pub fn range(n: u64) -> Self {
        Self {
            columns: vec!["id".to_string()],
            rows: (0..n).map(|i| vec![Value::Long(i as i64)]).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, EngineError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EngineError::UnknownColumn(name.to_string()))
    }

    /// Values of one column in row order.
    pub fn column_values(&self, name: &str) -> Result<Vec<&Value>, EngineError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Add (or replace) a column computed from each row.
    pub fn with_column<F>(mut self, name: &str, mut expr: F) -> Self
    where
        F: FnMut(&[Value]) -> Value,
    {
        let existing = self.columns.iter().position(|c| c == name);
        for row in self.rows.iter_mut() {
            let value = expr(row.as_slice());
            match existing {
                Some(idx) => row[idx] = value,
                None => row.push(value),
            }
        }
        if existing.is_none() {
            self.columns.push(name.to_string());
        }
        self
    }

    /// Add (or replace) a column whose expression may fail; the first failure aborts.
    pub fn try_with_column<F>(mut self, name: &str, mut expr: F) -> Result<Self, EngineError>
    where
        F: FnMut(&[Value]) -> Result<Value, EngineError>,
    {
        let existing = self.columns.iter().position(|c| c == name);
        for row in self.rows.iter_mut() {
            let value = expr(row.as_slice())?;
            match existing {
                Some(idx) => row[idx] = value,
                None => row.push(value),
            }
        }
        if existing.is_none() {
            self.columns.push(name.to_string());
        }
        Ok(self)
    }

    /// Global aggregation into a single row.
    pub fn agg(&self, aggs: &[Agg]) -> Result<Frame, EngineError> {
        let indices = self.agg_indices(aggs)?;
        let mut accs: Vec<Accumulator> = aggs.iter().map(|a| Accumulator::new(a.func)).collect();
        for row in &self.rows {
            for ((acc, idx), agg) in accs.iter_mut().zip(&indices).zip(aggs) {
                acc.update(&row[*idx], &agg.column)?;
            }
        }

        Ok(Frame {
            columns: aggs.iter().map(Agg::output_name).collect(),
            rows: vec![accs.into_iter().map(Accumulator::finish).collect()],
        })
    }

    pub fn group_by(&self, key: &str) -> Result<GroupedFrame<'_>, EngineError> {
        let key_idx = self.column_index(key)?;
        Ok(GroupedFrame {
            frame: self,
            key: key.to_string(),
            key_idx,
        })
    }

    /// Rough in-memory footprint used for cache accounting.
    pub fn estimated_size(&self) -> u64 {
        self.rows.iter().flatten().map(Value::estimated_size).sum()
    }

    fn agg_indices(&self, aggs: &[Agg]) -> Result<Vec<usize>, EngineError> {
        aggs.iter().map(|a| self.column_index(&a.column)).collect()
    }
}

/// A frame grouped by one key column.
#[derive(Debug)]
pub struct GroupedFrame<'a> {
    frame: &'a Frame,
    key: String,
    key_idx: usize,
}

impl GroupedFrame<'_> {
    /// One row per distinct key, sorted by key, followed by one column per aggregate.
    pub fn agg(&self, aggs: &[Agg]) -> Result<Frame, EngineError> {
        let indices = self.frame.agg_indices(aggs)?;
        let mut slots: HashMap<GroupKey, usize> = HashMap::new();
        let mut groups: Vec<(Value, Vec<Accumulator>)> = Vec::new();

        for row in &self.frame.rows {
            let key_value = &row[self.key_idx];
            let slot = *slots.entry(GroupKey::from(key_value)).or_insert_with(|| {
                groups.push((
                    key_value.clone(),
                    aggs.iter().map(|a| Accumulator::new(a.func)).collect(),
                ));
                groups.len() - 1
            });
            let accs = &mut groups[slot].1;
            for ((acc, idx), agg) in accs.iter_mut().zip(&indices).zip(aggs) {
                acc.update(&row[*idx], &agg.column)?;
            }
        }

        groups.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut columns = vec![self.key.clone()];
        columns.extend(aggs.iter().map(Agg::output_name));
        let rows = groups
            .into_iter()
            .map(|(key, accs)| {
                let mut row = vec![key];
                row.extend(accs.into_iter().map(Accumulator::finish));
                row
            })
            .collect();

        Ok(Frame { columns, rows })
    }
}
