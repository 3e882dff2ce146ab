//! Rule set parsing from YAML/JSON.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing rule sets.
#[derive(Error, Debug)]
pub enum RuleSetError {
    #[error("Failed to read rule set file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rule set validation failed: {0}")]
    ValidationError(String),
}

/// A single temporal invariant.
///
/// Partitions every record by comparing its date field against
/// `reference_date`, then requires the status field to take one of the
/// values permitted for that partition. A date equal to the reference date
/// falls in the on-or-before partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier (e.g., "L1")
    pub id: String,

    /// 0-indexed field holding the record's date
    pub date_field: usize,

    /// 0-indexed field holding the record's status code
    pub status_field: usize,

    /// Snapshot date the record's date is compared against (`YYYY-MM-DD`)
    pub reference_date: NaiveDate,

    /// Status values permitted when the date is on or before the reference
    pub allowed_on_or_before: BTreeSet<String>,

    /// Status values permitted when the date is strictly after the reference
    pub allowed_after: BTreeSet<String>,
}

impl Rule {
    /// Minimum record width this rule can be applied to.
    pub fn min_fields(&self) -> usize {
        self.date_field.max(self.status_field) + 1
    }
}

fn default_delimiter() -> char {
    '|'
}

/// An ordered collection of validated rules, plus the stream parameters
/// they apply under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Human-readable name; labels the verdict line (e.g., "TPC-H")
    pub name: String,

    /// Field delimiter for the input stream
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Invariants to check, each applied to every record
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Parse a rule set from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleSetError> {
        let ruleset: RuleSet = serde_yaml::from_str(yaml)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Parse a rule set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RuleSetError> {
        let ruleset: RuleSet = serde_json::from_str(json)?;
        ruleset.validate()?;
        Ok(ruleset)
    }

    /// Parse a rule set from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a rule set from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RuleSetError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// The canonical TPC-H lineitem invariant: on or before 1995-06-17 the
    /// return flag (field 8) must be `R` or `A`; after it, `N`. The receipt
    /// date is field 12.
    pub fn tpch() -> Self {
        Self {
            name: "TPC-H".to_string(),
            delimiter: '|',
            rules: vec![Rule {
                id: "L1".to_string(),
                date_field: 12,
                status_field: 8,
                reference_date: NaiveDate::from_ymd_opt(1995, 6, 17).expect("static date"),
                allowed_on_or_before: ["R", "A"].into_iter().map(String::from).collect(),
                allowed_after: ["N"].into_iter().map(String::from).collect(),
            }],
        }
    }

    /// Minimum record width any rule in this set requires; a narrower
    /// record is malformed.
    pub fn min_fields(&self) -> usize {
        self.rules.iter().map(Rule::min_fields).max().unwrap_or(0)
    }

    /// Validate the rule set structure.
    fn validate(&self) -> Result<(), RuleSetError> {
        if self.name.is_empty() {
            return Err(RuleSetError::ValidationError(
                "rule set name must not be empty".to_string(),
            ));
        }

        if self.rules.is_empty() {
            return Err(RuleSetError::ValidationError(
                "rule set must contain at least one rule".to_string(),
            ));
        }

        self.validate_unique_rule_ids()?;

        for rule in &self.rules {
            if rule.allowed_on_or_before.is_empty() {
                return Err(RuleSetError::ValidationError(format!(
                    "rule {}: allowed_on_or_before must not be empty",
                    rule.id
                )));
            }
            if rule.allowed_after.is_empty() {
                return Err(RuleSetError::ValidationError(format!(
                    "rule {}: allowed_after must not be empty",
                    rule.id
                )));
            }
        }

        Ok(())
    }

    /// Ensure rule IDs are unique within the set.
    fn validate_unique_rule_ids(&self) -> Result<(), RuleSetError> {
        let mut seen = std::collections::HashSet::new();

        for rule in &self.rules {
            if !seen.insert(&rule.id) {
                return Err(RuleSetError::ValidationError(format!(
                    "Duplicate rule ID: {}",
                    rule.id
                )));
            }
        }

        Ok(())
    }
}
