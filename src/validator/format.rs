//! Output rendering for validation reports.
//!
//! Two formats: human-readable colored text (default) and machine-readable
//! JSON matching the report's serde shape.

use colored::Colorize;

use crate::validator::report::{Report, Verdict};
use crate::validator::types::Severity;

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Render a report in the requested format.
pub fn render(report: &Report, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(report),
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

fn render_text(report: &Report) -> String {
    let mut output = String::new();

    if let Some(context) = &report.context {
        output.push_str(&format!("{}\n", context.bold()));
    }

    for finding in report.failures() {
        let severity = match finding.severity {
            Severity::Critical => finding.severity.as_str().red().bold().to_string(),
            Severity::Warning => finding.severity.as_str().yellow().to_string(),
            Severity::Info => finding.severity.as_str().cyan().to_string(),
        };
        let scope = finding.service_name.as_deref().unwrap_or("<document>");
        output.push_str(&format!(
            "  {:<10} {:<18} {:<14} {}\n",
            severity,
            finding.rule_id.as_str(),
            scope,
            finding.message
        ));
    }

    let accepted = report
        .findings
        .iter()
        .filter(|f| f.accepted_exception)
        .count();
    if accepted > 0 {
        output.push_str(&format!(
            "  {} accepted documented exception{}\n",
            accepted,
            if accepted == 1 { "" } else { "s" }
        ));
    }

    let verdict = match report.verdict {
        Verdict::Pass => "PASS".green().bold().to_string(),
        Verdict::Fail => "FAIL".red().bold().to_string(),
    };
    output.push_str(&format!(
        "\n{}  {} critical, {} warning, {} info\n",
        verdict, report.summary.critical, report.summary.warning, report.summary.info
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::report::aggregate;
    use crate::validator::types::{Finding, RuleId};

    fn sample_report() -> Report {
        aggregate(
            vec![
                Finding::fail(
                    RuleId::CapDropAll,
                    Severity::Critical,
                    Some("web"),
                    "cap_drop missing",
                ),
                Finding::pass(RuleId::Healthcheck, Some("web"), "healthcheck present"),
            ],
            Some("docker-compose.yml".into()),
        )
    }

    #[test]
    fn test_text_render_includes_verdict_and_counts() {
        colored::control::set_override(false);
        let output = render(&sample_report(), OutputFormat::Text);
        assert!(output.contains("FAIL"));
        assert!(output.contains("CAP-DROP-ALL"));
        assert!(output.contains("1 critical"));
        assert!(output.contains("docker-compose.yml"));
    }

    #[test]
    fn test_text_render_hides_passed_checks() {
        colored::control::set_override(false);
        let output = render(&sample_report(), OutputFormat::Text);
        assert!(!output.contains("healthcheck present"));
    }

    #[test]
    fn test_accepted_exceptions_counted_by_flag() {
        colored::control::set_override(false);
        let report = aggregate(
            vec![
                Finding::accepted_exception(
                    RuleId::ReadOnlyFs,
                    "legacy",
                    "root filesystem is writable",
                ),
                // A pass whose message happens to mention an exception must
                // not inflate the count.
                Finding::pass(
                    RuleId::Healthcheck,
                    Some("legacy"),
                    "healthcheck present, no documented exception needed",
                ),
            ],
            None,
        );
        let output = render(&report, OutputFormat::Text);
        assert!(output.contains("1 accepted documented exception"));
    }

    #[test]
    fn test_json_render_is_valid_json() {
        let output = render(&sample_report(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["verdict"], "fail");
        assert_eq!(parsed["summary"]["critical"], 1);
        assert_eq!(parsed["findings"][0]["ruleId"], "CAP-DROP-ALL");
    }
}
