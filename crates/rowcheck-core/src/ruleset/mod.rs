//! Rule set parsing and validation.
//!
//! Rule sets are declarative data, parsed from YAML/JSON and validated
//! eagerly at construction. No invalid rule is ever evaluated.

mod parser;

pub use parser::{Rule, RuleSet, RuleSetError};
