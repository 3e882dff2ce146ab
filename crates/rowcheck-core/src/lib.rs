//! # rowcheck-core
//!
//! Deterministic temporal invariant validation for delimited record streams.
//!
//! A rule binds a date field, a status field, a reference date, and two
//! permitted-status sets. Records whose date is on or before the reference
//! must carry a status from the first set; records dated after it, from the
//! second. The canonical instance is the TPC-H lineitem rule: on or before
//! `1995-06-17` the return flag must be `R` or `A`, after it `N`.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input and rule set always produce the same verdict
//! 2. **Streaming**: one record resident at a time, any input size
//! 3. **Monotone**: a violated verdict never reverts within a run
//! 4. **Loud on corruption**: malformed records fail the run, they are never
//!    masked as satisfied
//!
//! ## Example
//!
//! ```rust,ignore
//! use rowcheck_core::{check_file, RuleSet};
//!
//! let ruleset = RuleSet::tpch();
//! let verdict = check_file("lineitem.tbl", &ruleset)?;
//!
//! if verdict.is_violated() {
//!     println!("{} constraint violated", ruleset.name);
//! } else {
//!     println!("{} constraint satisfied", ruleset.name);
//! }
//! ```

pub mod evaluator;
pub mod record;
pub mod ruleset;
pub mod verdict;

// Re-export main types at crate root
pub use evaluator::{evaluate, evaluate_with_cancel, CancelToken, EvaluateError, DATE_FORMAT};
pub use record::{Record, RecordSource, SourceError};
pub use ruleset::{Rule, RuleSet, RuleSetError};
pub use verdict::{Branch, Verdict, Violation};

use std::path::Path;

/// Validate one input file against a rule set.
///
/// Opens the file, streams it through [`evaluate`], and returns the verdict.
/// The file handle is scoped to the scan and released on every exit path.
pub fn check_file(path: impl AsRef<Path>, ruleset: &RuleSet) -> Result<Verdict, EvaluateError> {
    let source = RecordSource::open(path, ruleset.delimiter).map_err(SourceError::Io)?;
    evaluate(source, ruleset)
}
