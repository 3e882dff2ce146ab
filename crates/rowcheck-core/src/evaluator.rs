//! Record evaluation.
//!
//! The evaluator pulls records from a source one at a time, applies every
//! rule in the set, and accumulates a [`Verdict`]. The scan always runs to
//! end-of-stream: finding a violation does not stop it, so every violation
//! in the input is reported. Memory use is bounded by one record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info};

use crate::record::{Record, SourceError};
use crate::ruleset::{Rule, RuleSet};
use crate::verdict::{Branch, Verdict, Violation};

/// Strict date literal format for record date fields. No locale variation,
/// no timezone.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors that abort an evaluation run. No verdict is reported on any of
/// these paths: a corrupt dataset must never be read as satisfied.
#[derive(Error, Debug)]
pub enum EvaluateError {
    #[error("line {line}: record has {width} fields but rule {rule_id} reads field {field}")]
    MissingField {
        line: u64,
        width: usize,
        field: usize,
        rule_id: String,
    },

    #[error("line {line}: field {field} is not a YYYY-MM-DD date: {value:?}")]
    MalformedDate {
        line: u64,
        field: usize,
        value: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("evaluation cancelled after {records} records")]
    Cancelled { records: u64 },
}

/// Cooperative cancellation signal, checked between records.
///
/// Cloning shares the flag, so a caller can hand one clone to the scan and
/// trigger the other from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the scan stop before the next record.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Evaluate every rule in `ruleset` against every record from `source`.
///
/// Single pass: both branches of each rule are handled per record, so one
/// scan covers what the two-direction formulation needs two for. Rule order
/// never affects the outcome; violation is monotone and commutative.
pub fn evaluate<I>(source: I, ruleset: &RuleSet) -> Result<Verdict, EvaluateError>
where
    I: IntoIterator<Item = Result<Record, SourceError>>,
{
    evaluate_with_cancel(source, ruleset, &CancelToken::new())
}

/// [`evaluate`], aborting with [`EvaluateError::Cancelled`] once `cancel`
/// is triggered. The token is checked between records, so a scan of an
/// unbounded or corrupt stream can be stopped cooperatively.
pub fn evaluate_with_cancel<I>(
    source: I,
    ruleset: &RuleSet,
    cancel: &CancelToken,
) -> Result<Verdict, EvaluateError>
where
    I: IntoIterator<Item = Result<Record, SourceError>>,
{
    let mut verdict = Verdict::new();

    for result in source {
        if cancel.is_cancelled() {
            return Err(EvaluateError::Cancelled {
                records: verdict.records_scanned(),
            });
        }

        let record = result?;
        verdict.record_scanned();

        for rule in &ruleset.rules {
            apply_rule(rule, &record, &mut verdict)?;
        }
    }

    info!(
        ruleset = %ruleset.name,
        records = verdict.records_scanned(),
        violations = verdict.violations().len(),
        "scan complete"
    );

    Ok(verdict)
}

/// Apply one rule to one record, recording a violation if the status value
/// is not permitted for the record's side of the reference date.
fn apply_rule(rule: &Rule, record: &Record, verdict: &mut Verdict) -> Result<(), EvaluateError> {
    let date_text = record
        .field(rule.date_field)
        .ok_or_else(|| EvaluateError::MissingField {
            line: record.line(),
            width: record.width(),
            field: rule.date_field,
            rule_id: rule.id.clone(),
        })?;

    let status = record
        .field(rule.status_field)
        .ok_or_else(|| EvaluateError::MissingField {
            line: record.line(),
            width: record.width(),
            field: rule.status_field,
            rule_id: rule.id.clone(),
        })?;

    let date = NaiveDate::parse_from_str(date_text, DATE_FORMAT).map_err(|_| {
        EvaluateError::MalformedDate {
            line: record.line(),
            field: rule.date_field,
            value: date_text.to_string(),
        }
    })?;

    // Equality lands on the on-or-before side; the <= / > pair partitions
    // every record into exactly one branch.
    let (branch, allowed) = if date <= rule.reference_date {
        (Branch::OnOrBefore, &rule.allowed_on_or_before)
    } else {
        (Branch::After, &rule.allowed_after)
    };

    // Exact, case-sensitive membership. No normalization.
    if !allowed.contains(status) {
        debug!(
            rule = %rule.id,
            line = record.line(),
            status,
            date = %date,
            branch = %branch,
            "rule violated"
        );
        verdict.record_violation(Violation {
            rule_id: rule.id.clone(),
            line: record.line(),
            status: status.to_string(),
            date,
            branch,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSource;
    use std::io::Cursor;

    /// A 16-field TPC-H lineitem-shaped row; only the return flag (8) and
    /// receipt date (12) matter to the canonical rule.
    fn lineitem(status: &str, date: &str) -> String {
        let mut fields = vec!["0"; 16];
        fields[8] = status;
        fields[12] = date;
        fields.join("|")
    }

    fn run(lines: &[String]) -> Result<Verdict, EvaluateError> {
        let input = lines.join("\n");
        let source = RecordSource::new(Cursor::new(input), '|');
        evaluate(source, &RuleSet::tpch())
    }

    #[test]
    fn test_past_date_with_permitted_status_is_satisfied() {
        let verdict = run(&[lineitem("R", "1994-01-01")]).unwrap();
        assert!(!verdict.is_violated());
        assert_eq!(verdict.records_scanned(), 1);
    }

    #[test]
    fn test_reference_date_itself_is_on_or_before() {
        // Equal to the reference date: on-or-before branch, so N violates.
        let verdict = run(&[lineitem("N", "1995-06-17")]).unwrap();
        assert!(verdict.is_violated());
        assert_eq!(verdict.violations()[0].branch, Branch::OnOrBefore);
    }

    #[test]
    fn test_future_date_with_permitted_status_is_satisfied() {
        let verdict = run(&[lineitem("N", "1996-01-01")]).unwrap();
        assert!(!verdict.is_violated());
    }

    #[test]
    fn test_future_date_with_past_status_is_violated() {
        let verdict = run(&[lineitem("A", "1996-01-01")]).unwrap();
        assert!(verdict.is_violated());
        let violation = &verdict.violations()[0];
        assert_eq!(violation.rule_id, "L1");
        assert_eq!(violation.status, "A");
        assert_eq!(violation.branch, Branch::After);
    }

    #[test]
    fn test_empty_input_is_vacuously_satisfied() {
        let verdict = run(&[]).unwrap();
        assert!(!verdict.is_violated());
        assert_eq!(verdict.records_scanned(), 0);
    }

    #[test]
    fn test_narrow_record_fails_the_run() {
        let result = run(&["a|b|c".to_string()]);
        assert!(matches!(
            result,
            Err(EvaluateError::MissingField { line: 1, width: 3, .. })
        ));
    }

    #[test]
    fn test_malformed_date_fails_loudly() {
        let result = run(&[lineitem("R", "17-06-1995")]);
        assert!(matches!(
            result,
            Err(EvaluateError::MalformedDate { line: 1, field: 12, .. })
        ));
    }

    #[test]
    fn test_status_comparison_is_case_sensitive() {
        let verdict = run(&[lineitem("r", "1994-01-01")]).unwrap();
        assert!(verdict.is_violated());
    }

    #[test]
    fn test_scan_continues_past_first_violation() {
        let verdict = run(&[
            lineitem("N", "1994-01-01"),
            lineitem("R", "1994-02-01"),
            lineitem("A", "1996-01-01"),
        ])
        .unwrap();
        assert_eq!(verdict.violations().len(), 2);
        assert_eq!(verdict.records_scanned(), 3);
        assert_eq!(verdict.violations()[0].line, 1);
        assert_eq!(verdict.violations()[1].line, 3);
    }

    #[test]
    fn test_cancelled_token_aborts_before_next_record() {
        let input = [lineitem("R", "1994-01-01"), lineitem("R", "1994-01-02")].join("\n");
        let source = RecordSource::new(Cursor::new(input), '|');
        let token = CancelToken::new();
        token.cancel();
        let result = evaluate_with_cancel(source, &RuleSet::tpch(), &token);
        assert!(matches!(result, Err(EvaluateError::Cancelled { records: 0 })));
    }

    #[test]
    fn test_source_error_aborts_without_verdict() {
        let source = RecordSource::new(Cursor::new(&b"\xff\xfe\n"[..]), '|');
        let result = evaluate(source, &RuleSet::tpch());
        assert!(matches!(result, Err(EvaluateError::Source(_))));
    }
}
