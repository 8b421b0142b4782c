//! Run-wide report built from every package in an event stream.
//!
//! One [`PackageSummary`] is produced per package-level conclusion, in stream
//! order. The report serializes to JSON and renders a plain-text summary.
use crate::events::{Conclusion, TestEvent};
use crate::results::{ConclusionTally, PackageResult, TestResults};
use serde::Serialize;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Which packages to leave out of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub omit_untested_packages: bool,
    pub omit_successful_packages: bool,
}

#[derive(Debug, Serialize, Clone)]
pub struct PackageSummary {
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    pub test_count: usize,
    pub conclusions: ConclusionTally,
    pub points_possible: u64,
    pub points_earned: u64,
    pub tests: TestResults,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub incomplete_tests: Vec<String>,
}

impl From<&PackageResult> for PackageSummary {
    fn from(result: &PackageResult) -> Self {
        Self {
            package: result.package().to_string(),
            conclusion: result.conclusion(),
            elapsed: result.elapsed(),
            test_count: result.test_count(),
            conclusions: *result.conclusions(),
            points_possible: result.points_possible(),
            points_earned: result.points_earned(),
            tests: result.tests().clone(),
            incomplete_tests: result
                .incomplete_tests()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub packages: usize,
    pub test_count: usize,
    pub conclusions: ConclusionTally,
    pub points_possible: u64,
    pub points_earned: u64,
}

#[derive(Debug, Serialize, Clone)]
pub struct RunReport {
    pub schema_version: u32,
    pub packages: Vec<PackageSummary>,
    pub totals: RunTotals,
}

/// Reduce every package that reported a conclusion.
pub fn package_results(events: &[TestEvent]) -> Vec<PackageResult> {
    events
        .iter()
        .filter(|event| event.is_package_level() && event.is_conclusive())
        .map(|package_event| PackageResult::new(package_event, events))
        .collect()
}

/// Reduce a single package, if the stream contains its conclusion.
pub fn find_package_result(events: &[TestEvent], package: &str) -> Option<PackageResult> {
    events
        .iter()
        .find(|event| {
            event.package == package && event.is_package_level() && event.is_conclusive()
        })
        .map(|package_event| PackageResult::new(package_event, events))
}

fn include_package(result: &PackageResult, options: &ReportOptions) -> bool {
    if options.omit_untested_packages && !result.has_tests() {
        return false;
    }
    if options.omit_successful_packages && result.conclusion() == Some(Conclusion::Pass) {
        return false;
    }
    true
}

impl RunReport {
    pub fn build(events: &[TestEvent], options: &ReportOptions) -> Self {
        let mut totals = RunTotals::default();
        let mut packages = Vec::new();
        for result in package_results(events) {
            if !include_package(&result, options) {
                tracing::debug!(package = %result.package(), "omitting package from report");
                continue;
            }
            totals.packages += 1;
            totals.test_count += result.test_count();
            totals.conclusions.merge(result.conclusions());
            totals.points_possible = totals
                .points_possible
                .saturating_add(result.points_possible());
            totals.points_earned = totals.points_earned.saturating_add(result.points_earned());
            packages.push(PackageSummary::from(&result));
        }
        tracing::info!(
            packages = totals.packages,
            tests = totals.test_count,
            failed = totals.conclusions.fail,
            "built run report"
        );
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            packages,
            totals,
        }
    }

    /// Plain-text summary: one line per package plus a totals line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let width = self
            .packages
            .iter()
            .map(|summary| summary.package.len())
            .max()
            .unwrap_or(0);
        for summary in &self.packages {
            let label = conclusion_label(summary.conclusion);
            let detail = if summary.test_count == 0 {
                "no tests".to_string()
            } else {
                format_tally(&summary.conclusions)
            };
            let mut line = format!("{label:<5} {:<width$}  {detail}", summary.package);
            if summary.points_possible > 0 {
                line.push_str(&format!(
                    "  points {}/{}",
                    summary.points_earned, summary.points_possible
                ));
            }
            push_line(&mut out, line.trim_end());
            for name in &summary.incomplete_tests {
                push_line(&mut out, &format!("      incomplete: {name}"));
            }
        }

        let mut totals = format!(
            "{} packages, {} tests ({})",
            self.totals.packages,
            self.totals.test_count,
            format_tally(&self.totals.conclusions)
        );
        if self.totals.points_possible > 0 {
            totals.push_str(&format!(
                ", points {}/{}",
                self.totals.points_earned, self.totals.points_possible
            ));
        }
        push_line(&mut out, &totals);
        out
    }
}

fn conclusion_label(conclusion: Option<Conclusion>) -> &'static str {
    match conclusion {
        Some(Conclusion::Pass) => "ok",
        Some(Conclusion::Fail) => "FAIL",
        Some(Conclusion::Skip) => "skip",
        None => "?",
    }
}

fn format_tally(tally: &ConclusionTally) -> String {
    format!(
        "{} passed, {} failed, {} skipped",
        tally.get(Conclusion::Pass),
        tally.get(Conclusion::Fail),
        tally.get(Conclusion::Skip)
    )
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
