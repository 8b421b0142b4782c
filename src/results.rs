//! Per-package reduction of test events into a result tree.
//!
//! A [`PackageResult`] is built once from a package-level conclusion event and
//! the full event stream. Construction scopes the stream to that package and
//! folds it in a single pass; afterwards the result is read-only.
use crate::events::{Conclusion, TestEvent};
use indexmap::IndexMap;
use serde::Serialize;

/// Results keyed by test name, in the order tests concluded.
pub type TestResults = IndexMap<String, TestResult>;

/// Outcome of one top-level test or subtest.
#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct TestResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    /// Full subtest path to its result. Always empty on subtests themselves.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub subtests: TestResults,
    /// Points earned; set once the test's own conclusion is folded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

impl TestResult {
    fn concluded(conclusion: Conclusion) -> Self {
        Self {
            conclusion: Some(conclusion),
            ..Self::default()
        }
    }

    /// True for a parent that only exists because its subtests concluded.
    pub fn is_incomplete(&self) -> bool {
        self.conclusion.is_none()
    }
}

/// Count of conclusive events per outcome.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConclusionTally {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
}

impl ConclusionTally {
    pub fn get(&self, conclusion: Conclusion) -> usize {
        match conclusion {
            Conclusion::Pass => self.pass,
            Conclusion::Fail => self.fail,
            Conclusion::Skip => self.skip,
        }
    }

    fn record(&mut self, conclusion: Conclusion) {
        match conclusion {
            Conclusion::Pass => self.pass += 1,
            Conclusion::Fail => self.fail += 1,
            Conclusion::Skip => self.skip += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pass + self.fail + self.skip
    }

    pub fn merge(&mut self, other: &ConclusionTally) {
        self.pass += other.pass;
        self.fail += other.fail;
        self.skip += other.skip;
    }
}

/// Running state of the fold; becomes the body of a [`PackageResult`].
#[derive(Debug, Default)]
struct Fold {
    tests: TestResults,
    points_possible: u64,
    points_earned: u64,
    conclusions: ConclusionTally,
}

impl Fold {
    fn step(mut self, event: &TestEvent) -> Self {
        // run/output/pause events only matter for the transcript.
        let Some(conclusion) = event.conclusion() else {
            return self;
        };
        self.conclusions.record(conclusion);
        if event.is_subtest() {
            self.record_subtest(event, conclusion);
        } else {
            self.record_test(event, conclusion);
        }
        self
    }

    fn record_subtest(&mut self, event: &TestEvent, conclusion: Conclusion) {
        self.tests
            .entry(event.parent_name().to_string())
            .or_default()
            .subtests
            .insert(event.test.clone(), TestResult::concluded(conclusion));
    }

    fn record_test(&mut self, event: &TestEvent, conclusion: Conclusion) {
        let declared = event.points_possible.unwrap_or(0);
        let earned = if conclusion == Conclusion::Pass {
            declared
        } else {
            0
        };
        self.points_possible = self.points_possible.saturating_add(u64::from(declared));
        self.points_earned = self.points_earned.saturating_add(u64::from(earned));

        let concluded_before = self
            .tests
            .get(&event.test)
            .is_some_and(|existing| existing.conclusion.is_some());
        if concluded_before {
            if let Some(existing) = self.tests.get_mut(&event.test) {
                existing.conclusion = Some(conclusion);
                existing.points = Some(earned);
            }
            return;
        }

        // A parent created by its subtests moves to where it concluded.
        let subtests = self
            .tests
            .shift_remove(&event.test)
            .map(|existing| existing.subtests)
            .unwrap_or_default();
        self.tests.insert(
            event.test.clone(),
            TestResult {
                conclusion: Some(conclusion),
                subtests,
                points: Some(earned),
            },
        );
    }
}

/// Reduced results for a single package.
#[derive(Debug, Clone)]
pub struct PackageResult {
    package_event: TestEvent,
    events: Vec<TestEvent>,
    tests: TestResults,
    points_possible: u64,
    points_earned: u64,
    conclusions: ConclusionTally,
}

impl PackageResult {
    /// Reduce `all_events` for the package `package_event` concludes.
    ///
    /// `package_event` must be a package-level conclusion (`pass`, `fail`, or
    /// `skip` with an empty test id). Events for other packages and all
    /// package-level events are ignored.
    pub fn new(package_event: &TestEvent, all_events: &[TestEvent]) -> Self {
        debug_assert!(
            package_event.is_package_level() && package_event.is_conclusive(),
            "package result requires a package-level conclusion event"
        );
        let events: Vec<TestEvent> = all_events
            .iter()
            .filter(|event| event.package == package_event.package && !event.is_package_level())
            .cloned()
            .collect();
        let fold = events.iter().fold(Fold::default(), Fold::step);
        tracing::debug!(
            package = %package_event.package,
            events = events.len(),
            tests = fold.conclusions.total(),
            "reduced package events"
        );

        Self {
            package_event: package_event.clone(),
            events,
            tests: fold.tests,
            points_possible: fold.points_possible,
            points_earned: fold.points_earned,
            conclusions: fold.conclusions,
        }
    }

    pub fn package(&self) -> &str {
        &self.package_event.package
    }

    /// Outcome the toolchain reported for the package as a whole.
    pub fn conclusion(&self) -> Option<Conclusion> {
        self.package_event.conclusion()
    }

    pub fn elapsed(&self) -> Option<f64> {
        self.package_event.elapsed
    }

    /// Test-level events for this package, in stream order.
    pub fn events(&self) -> &[TestEvent] {
        &self.events
    }

    pub fn tests(&self) -> &TestResults {
        &self.tests
    }

    /// Sum of points declared by top-level tests.
    pub fn points_possible(&self) -> u64 {
        self.points_possible
    }

    pub fn points_earned(&self) -> u64 {
        self.points_earned
    }

    pub fn conclusions(&self) -> &ConclusionTally {
        &self.conclusions
    }

    /// Number of conclusive events folded, subtests included.
    pub fn test_count(&self) -> usize {
        self.conclusions.total()
    }

    pub fn has_tests(&self) -> bool {
        self.test_count() != 0
    }

    /// The package's test transcript, verbatim.
    pub fn output(&self) -> String {
        self.events.iter().map(|event| event.output.as_str()).collect()
    }

    /// Top-level tests that never reported their own conclusion.
    pub fn incomplete_tests(&self) -> Vec<&str> {
        self.tests
            .iter()
            .filter(|(_, result)| result.is_incomplete())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
