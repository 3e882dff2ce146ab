//! rowcheck: validate a delimited record stream against a temporal
//! invariant rule set.
//!
//! Prints exactly one verdict line on stdout, e.g. `TPC-H constraint
//! satisfied`. Diagnostics and violation details go to stderr. Exit codes:
//! 0 satisfied, 1 violated, 2 configuration or input error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rowcheck_core::{check_file, RuleSet, Verdict};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Validate a delimited input file against a temporal invariant rule set.
#[derive(Parser, Debug)]
#[command(name = "rowcheck", version, about)]
struct Cli {
    /// Input file to validate
    input: PathBuf,

    /// Rule set file (YAML, or JSON by extension); defaults to the built-in
    /// TPC-H lineitem rule set
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(violated) => {
            if violated {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("rowcheck: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let ruleset = load_ruleset(cli.rules.as_deref())?;
    let verdict = check_file(&cli.input, &ruleset)
        .with_context(|| format!("failed to validate {}", cli.input.display()))?;

    for violation in verdict.violations() {
        warn!(
            rule = %violation.rule_id,
            line = violation.line,
            status = %violation.status,
            date = %violation.date,
            branch = %violation.branch,
            "rule violated"
        );
    }

    println!("{}", verdict_line(&ruleset, &verdict));
    Ok(verdict.is_violated())
}

/// The single stdout line this tool is contracted to emit.
fn verdict_line(ruleset: &RuleSet, verdict: &Verdict) -> String {
    if verdict.is_violated() {
        format!("{} constraint violated", ruleset.name)
    } else {
        format!("{} constraint satisfied", ruleset.name)
    }
}

fn load_ruleset(path: Option<&Path>) -> anyhow::Result<RuleSet> {
    let Some(path) = path else {
        return Ok(RuleSet::tpch());
    };

    let ruleset = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => RuleSet::from_json_file(path),
        _ => RuleSet::from_yaml_file(path),
    };
    ruleset.with_context(|| format!("failed to load rule set {}", path.display()))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_ruleset_is_tpch() {
        let ruleset = load_ruleset(None).unwrap();
        assert_eq!(ruleset.name, "TPC-H");
    }

    #[test]
    fn test_load_yaml_ruleset_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            r#"
name: "Orders"
rules:
  - id: "O1"
    date_field: 1
    status_field: 0
    reference_date: "2020-01-01"
    allowed_on_or_before: ["shipped"]
    allowed_after: ["pending"]
"#
        )
        .unwrap();

        let ruleset = load_ruleset(Some(file.path())).unwrap();
        assert_eq!(ruleset.name, "Orders");
        assert_eq!(ruleset.rules.len(), 1);
    }

    #[test]
    fn test_invalid_ruleset_file_is_an_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "name: \"Broken\"\nrules: []\n").unwrap();
        assert!(load_ruleset(Some(file.path())).is_err());
    }

    #[test]
    fn test_verdict_lines_match_contract() {
        let ruleset = RuleSet::tpch();
        let satisfied = Verdict::new();
        assert_eq!(
            verdict_line(&ruleset, &satisfied),
            "TPC-H constraint satisfied"
        );
    }

    #[test]
    fn test_violated_line_end_to_end() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        let mut fields = vec!["0"; 16];
        fields[8] = "N";
        fields[12] = "1995-06-17";
        writeln!(input, "{}", fields.join("|")).unwrap();

        let ruleset = RuleSet::tpch();
        let verdict = check_file(input.path(), &ruleset).unwrap();
        assert_eq!(
            verdict_line(&ruleset, &verdict),
            "TPC-H constraint violated"
        );
    }
}
