//! Verdict accumulation.
//!
//! A [`Verdict`] is the single outcome of one evaluation run: satisfied
//! until a violation is recorded, violated forever after. Every violation is
//! kept, not just the first, so a full scan can report all of them.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the reference date a record fell on.
///
/// The `<=` / `>` comparison pair puts every record in exactly one branch;
/// a date equal to the reference date is `OnOrBefore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    OnOrBefore,
    After,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::OnOrBefore => write!(f, "on-or-before"),
            Branch::After => write!(f, "after"),
        }
    }
}

/// One rule violation found during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// ID of the violated rule
    pub rule_id: String,

    /// 1-based input line of the offending record
    pub line: u64,

    /// The status value that was not permitted
    pub status: String,

    /// The record's parsed date
    pub date: NaiveDate,

    /// Which partition the record fell in
    pub branch: Branch,
}

/// The outcome of one evaluation run.
///
/// Monotone: transitions from satisfied to violated and never back. Owned
/// by the evaluator for the duration of a run and returned as a value, so
/// runs stay referentially transparent and shards can be combined with
/// [`Verdict::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    violations: Vec<Violation>,
    records_scanned: u64,
}

impl Verdict {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any violation has been recorded.
    pub fn is_violated(&self) -> bool {
        !self.violations.is_empty()
    }

    /// All violations found, in scan order.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Number of records inspected during the run.
    pub fn records_scanned(&self) -> u64 {
        self.records_scanned
    }

    pub(crate) fn record_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub(crate) fn record_scanned(&mut self) {
        self.records_scanned += 1;
    }

    /// Combine two shard verdicts: a logical OR on violation, a sum on the
    /// scan count. Shard boundaries must fall on record boundaries; each
    /// shard owns its own accumulator until this reduction.
    pub fn merge(&mut self, other: Verdict) {
        self.violations.extend(other.violations);
        self.records_scanned += other.records_scanned;
    }
}
