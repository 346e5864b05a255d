//! Transform of raw backend results into the display model.
//!
//! [`build_report`] is a pure function: the same raw payload always
//! produces an identical [`AnalysisReport`]. It runs exactly once per
//! completed job (and again, wholesale, on an explicit refresh) — raw
//! backend records never reach a view.

use chrono::{DateTime, Utc};
use scrutiny_client::types::{RawFileResult, RawIssue, ResultsResponse};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Issue urgency bucket. Wire values are matched case-insensitively and
/// anything unrecognized lands in the lowest bucket rather than faulting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("critical") {
            Self::Critical
        } else if s.eq_ignore_ascii_case("high") {
            Self::High
        } else if s.eq_ignore_ascii_case("medium") {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Sort weight: critical=4, high=3, medium=2, low=1.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

/// One issue, tagged with the file it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub agent: String,
    pub file: String,
    pub line: Option<u64>,
    pub fix: Option<String>,
}

/// Per-file slice of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub language: String,
    pub line_count: u64,
    pub issue_count: u64,
    pub issues: Vec<Issue>,
}

/// Issue totals by severity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityBreakdown {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Job-level totals shown at the top of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_files: u64,
    pub total_issues: u64,
    pub severity: SeverityBreakdown,
    /// Issue counts per analysis agent, keys normalized to lowercase.
    pub agent_breakdown: BTreeMap<String, u64>,
    pub overall_score: u8,
}

/// The four 0–100 sub-scores. Fixed linear penalties, kept bit-compatible
/// with what the dashboard has always displayed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QualityMetrics {
    pub security: u8,
    pub performance: u8,
    pub code_quality: u8,
    pub documentation: u8,
}

/// The display-oriented aggregate for one completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub job_id: String,
    pub summary: ReportSummary,
    pub metrics: QualityMetrics,
    pub files: Vec<FileReport>,
    /// All issues across files, severity-descending, stable within a rank.
    pub top_issues: Vec<Issue>,
    pub total_analysis_time: Option<f64>,
    pub completed_at: Option<DateTime<Utc>>,
}

fn linear_score(penalty: u64, count: u64) -> u8 {
    100u64.saturating_sub(penalty.saturating_mul(count)) as u8
}

fn issue_from_raw(raw: &RawIssue, owning_file: &str) -> Issue {
    Issue {
        title: raw.title.clone(),
        description: raw.description.clone(),
        severity: Severity::parse(&raw.severity),
        agent: raw.agent.clone(),
        // An issue-level path, when present, overrides the owning file's.
        file: raw
            .file
            .clone()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| owning_file.to_string()),
        line: raw.line,
        fix: raw.fix.clone(),
    }
}

/// Lowercase the agent-breakdown keys, merging duplicates. The backend
/// has shipped both `Security` and `security` over time; this is the one
/// place that difference is allowed to exist.
fn normalize_breakdown(raw: &RawFileResult) -> BTreeMap<String, u64> {
    let mut normalized = BTreeMap::new();
    for (agent, count) in &raw.agent_breakdown {
        *normalized.entry(agent.to_lowercase()).or_insert(0) += count;
    }
    normalized
}

/// Build the display report from one raw results payload.
pub fn build_report(job_id: &str, raw: ResultsResponse) -> AnalysisReport {
    let total_files = raw.results.len() as u64;
    let total_issues: u64 = raw.results.iter().map(|f| f.total_issues).sum();

    // The backend reports high/medium/low subtotals per file but has no
    // critical subtotal, so critical is recomputed from the detailed
    // issue lists.
    let critical = raw
        .results
        .iter()
        .flat_map(|f| &f.detailed_issues)
        .filter(|i| i.severity.eq_ignore_ascii_case("critical"))
        .count() as u64;
    let severity = SeverityBreakdown {
        critical,
        high: raw.results.iter().map(|f| f.high_issues).sum(),
        medium: raw.results.iter().map(|f| f.medium_issues).sum(),
        low: raw.results.iter().map(|f| f.low_issues).sum(),
    };

    // Agent totals come from the first file's record, treated as
    // representative of the whole job (see DESIGN.md).
    let agent_breakdown = raw
        .results
        .first()
        .map(normalize_breakdown)
        .unwrap_or_default();

    let agent_count = |agent: &str| agent_breakdown.get(agent).copied().unwrap_or(0);
    let metrics = QualityMetrics {
        security: linear_score(5, agent_count("security")),
        performance: linear_score(4, agent_count("performance")),
        code_quality: linear_score(3, agent_count("complexity")),
        documentation: linear_score(2, agent_count("documentation")),
    };

    let files: Vec<FileReport> = raw
        .results
        .iter()
        .map(|f| FileReport {
            path: f.file.clone(),
            language: f.language.clone(),
            line_count: f.lines,
            issue_count: f.total_issues,
            issues: f
                .detailed_issues
                .iter()
                .map(|i| issue_from_raw(i, &f.file))
                .collect(),
        })
        .collect();

    let mut top_issues: Vec<Issue> = files.iter().flat_map(|f| f.issues.clone()).collect();
    // Stable sort: equal severities keep their encounter order.
    top_issues.sort_by_key(|i| std::cmp::Reverse(i.severity.rank()));

    let completed_at = raw
        .timestamp
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));

    AnalysisReport {
        job_id: job_id.to_string(),
        summary: ReportSummary {
            total_files,
            total_issues,
            severity,
            agent_breakdown,
            overall_score: linear_score(2, total_issues),
        },
        metrics,
        files,
        top_issues,
        total_analysis_time: raw.total_analysis_time,
        completed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrutiny_client::types::RawIssue;

    fn raw_issue(title: &str, severity: &str) -> RawIssue {
        RawIssue {
            title: title.to_string(),
            severity: severity.to_string(),
            agent: "security".to_string(),
            description: String::new(),
            ..RawIssue::default()
        }
    }

    fn one_file(file: &str, issues: Vec<RawIssue>) -> RawFileResult {
        RawFileResult {
            file: file.to_string(),
            total_issues: issues.len() as u64,
            detailed_issues: issues,
            ..RawFileResult::default()
        }
    }

    #[test]
    fn test_severity_parse_case_insensitive_with_low_fallback() {
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("High"), Severity::High);
        assert_eq!(Severity::parse("medium"), Severity::Medium);
        assert_eq!(Severity::parse("low"), Severity::Low);
        assert_eq!(Severity::parse("catastrophic"), Severity::Low);
        assert_eq!(Severity::parse(""), Severity::Low);
    }

    #[test]
    fn test_critical_count_recomputed_from_detailed_issues() {
        let raw = ResultsResponse {
            results: vec![
                one_file(
                    "a.py",
                    vec![raw_issue("x", "Critical"), raw_issue("y", "high")],
                ),
                one_file("b.py", vec![raw_issue("z", "CRITICAL")]),
            ],
            ..ResultsResponse::default()
        };

        let report = build_report("j1", raw);
        assert_eq!(report.summary.severity.critical, 2);
        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_issues, 3);
    }

    #[test]
    fn test_subtotals_trusted_from_per_file_fields() {
        let mut file = one_file("a.py", vec![]);
        file.high_issues = 3;
        file.medium_issues = 2;
        file.low_issues = 1;
        let mut other = one_file("b.py", vec![]);
        other.high_issues = 1;

        let report = build_report(
            "j1",
            ResultsResponse {
                results: vec![file, other],
                ..ResultsResponse::default()
            },
        );
        assert_eq!(report.summary.severity.high, 4);
        assert_eq!(report.summary.severity.medium, 2);
        assert_eq!(report.summary.severity.low, 1);
    }

    #[test]
    fn test_score_formulas_and_clamping() {
        // 10 total issues → overall 80.
        let mut file = one_file("a.py", vec![]);
        file.total_issues = 10;
        file.agent_breakdown = [
            ("security".to_string(), 25),
            ("performance".to_string(), 3),
            ("complexity".to_string(), 4),
            ("documentation".to_string(), 5),
        ]
        .into_iter()
        .collect();

        let report = build_report(
            "j1",
            ResultsResponse {
                results: vec![file],
                ..ResultsResponse::default()
            },
        );
        assert_eq!(report.summary.overall_score, 80);
        // 25 security issues → clamped to 0, not negative.
        assert_eq!(report.metrics.security, 0);
        assert_eq!(report.metrics.performance, 100 - 4 * 3);
        assert_eq!(report.metrics.code_quality, 100 - 3 * 4);
        assert_eq!(report.metrics.documentation, 100 - 2 * 5);
    }

    #[test]
    fn test_agent_breakdown_normalized_and_taken_from_first_file() {
        let mut first = one_file("a.py", vec![]);
        first.agent_breakdown = [
            ("Security".to_string(), 2),
            ("security".to_string(), 1),
            ("Performance".to_string(), 4),
        ]
        .into_iter()
        .collect();
        let mut second = one_file("b.py", vec![]);
        second.agent_breakdown = [("documentation".to_string(), 9)].into_iter().collect();

        let report = build_report(
            "j1",
            ResultsResponse {
                results: vec![first, second],
                ..ResultsResponse::default()
            },
        );
        // Mixed-case keys merge; the second file's map is not consulted.
        assert_eq!(report.summary.agent_breakdown["security"], 3);
        assert_eq!(report.summary.agent_breakdown["performance"], 4);
        assert!(!report.summary.agent_breakdown.contains_key("documentation"));
    }

    #[test]
    fn test_top_issues_sorted_by_severity_stable() {
        let raw = ResultsResponse {
            results: vec![
                one_file(
                    "a.py",
                    vec![
                        raw_issue("first-low", "low"),
                        raw_issue("first-high", "high"),
                    ],
                ),
                one_file(
                    "b.py",
                    vec![
                        raw_issue("crit", "critical"),
                        raw_issue("second-high", "high"),
                        raw_issue("second-low", "unknown-severity"),
                    ],
                ),
            ],
            ..ResultsResponse::default()
        };

        let report = build_report("j1", raw);
        let titles: Vec<&str> = report.top_issues.iter().map(|i| i.title.as_str()).collect();
        // critical > high > low; equal ranks keep encounter order, and the
        // unrecognized severity sorts with the lows.
        assert_eq!(
            titles,
            vec!["crit", "first-high", "second-high", "first-low", "second-low"]
        );
    }

    #[test]
    fn test_issue_file_override_wins() {
        let mut issue = raw_issue("moved", "high");
        issue.file = Some("other/place.py".to_string());
        let raw = ResultsResponse {
            results: vec![one_file("a.py", vec![issue, raw_issue("stays", "low")])],
            ..ResultsResponse::default()
        };

        let report = build_report("j1", raw);
        assert_eq!(report.top_issues[0].file, "other/place.py");
        assert_eq!(report.top_issues[1].file, "a.py");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let raw = || ResultsResponse {
            results: vec![one_file(
                "a.py",
                vec![raw_issue("x", "critical"), raw_issue("y", "low")],
            )],
            total_analysis_time: Some(12.5),
            timestamp: Some("2026-03-01T10:00:00Z".to_string()),
            ..ResultsResponse::default()
        };

        let a = serde_json::to_string(&build_report("j1", raw())).unwrap();
        let b = serde_json::to_string(&build_report("j1", raw())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_results_give_perfect_scores() {
        let report = build_report("j1", ResultsResponse::default());
        assert_eq!(report.summary.total_files, 0);
        assert_eq!(report.summary.overall_score, 100);
        assert_eq!(report.metrics.security, 100);
        assert!(report.top_issues.is_empty());
    }
}
