//! Typed `go test -json` events.
//!
//! Each line the Go toolchain emits under `-json` is one event object. This
//! module parses those lines, classifies them, and attaches any points a
//! top-level test declares so the reducer never has to look at raw JSON.
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Input path that selects stdin instead of a file.
pub const STDIN_PATH: &str = "-";

/// Actions emitted by `go test -json` (see `go doc test2json`).
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Start,
    Run,
    Pause,
    Cont,
    Output,
    Bench,
    Pass,
    Fail,
    Skip,
    /// Anything newer toolchains add; never conclusive.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Map an action to its conclusion, if it is one.
    pub fn conclusion(self) -> Option<Conclusion> {
        match self {
            Action::Pass => Some(Conclusion::Pass),
            Action::Fail => Some(Conclusion::Fail),
            Action::Skip => Some(Conclusion::Skip),
            _ => None,
        }
    }
}

/// Final outcome of a test or package.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    Pass,
    Fail,
    Skip,
}

impl Conclusion {
    /// Return the stable string identifier used in JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Pass => "pass",
            Conclusion::Fail => "fail",
            Conclusion::Skip => "skip",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event line from `go test -json`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TestEvent {
    /// RFC 3339 timestamp, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub action: Action,
    #[serde(default)]
    pub package: String,
    /// Empty for package-level events; subtests are `Parent/Child`.
    #[serde(default)]
    pub test: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
    #[serde(default)]
    pub output: String,
    /// Only meaningful on top-level tests.
    #[serde(
        default,
        deserialize_with = "lenient_points",
        skip_serializing_if = "Option::is_none"
    )]
    pub points_possible: Option<u32>,
}

/// A `PointsPossible` that is not a whole number in `u32` range is dropped
/// with a warning; the rest of the event is still used.
fn lenient_points<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<serde_json::Value>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let points = whole_points(&value);
    if points.is_none() {
        tracing::warn!(%value, "ignoring PointsPossible that is not a nonnegative integer");
    }
    Ok(points)
}

fn whole_points(value: &serde_json::Value) -> Option<u32> {
    if let Some(points) = value.as_u64() {
        return u32::try_from(points).ok();
    }
    let points = value.as_f64()?;
    if points.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&points) {
        Some(points as u32)
    } else {
        None
    }
}

impl TestEvent {
    /// True when the event describes the whole package rather than a test.
    pub fn is_package_level(&self) -> bool {
        self.test.is_empty()
    }

    /// True for `pass`, `fail`, and `skip`.
    pub fn is_conclusive(&self) -> bool {
        self.conclusion().is_some()
    }

    /// True when the test id carries a parent path.
    pub fn is_subtest(&self) -> bool {
        self.test.contains('/')
    }

    pub fn conclusion(&self) -> Option<Conclusion> {
        self.action.conclusion()
    }

    /// Name of the top-level test this event belongs to.
    ///
    /// Ancestry is encoded only in the id, so the parent is everything before
    /// the first `/`.
    pub fn parent_name(&self) -> &str {
        match self.test.split_once('/') {
            Some((parent, _)) => parent,
            None => &self.test,
        }
    }

    fn with_declared_points(mut self, policy: &PointsPolicy) -> Self {
        if self.is_package_level() || self.is_subtest() {
            self.points_possible = None;
        } else if self.points_possible.is_none() {
            self.points_possible = policy.declared_points(&self.test);
        }
        self
    }
}

/// How top-level tests declare the points they are worth.
///
/// An explicit `PointsPossible` field always wins; otherwise a configured
/// name pattern is matched against the test name and its first capture group
/// is read as the point value.
#[derive(Debug, Clone, Default)]
pub struct PointsPolicy {
    pattern: Option<Regex>,
}

impl PointsPolicy {
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("compile points pattern {pattern:?}"))?;
        if regex.captures_len() < 2 {
            return Err(anyhow!(
                "points pattern must contain a capture group for the point value (got {pattern:?})"
            ));
        }
        Ok(Self {
            pattern: Some(regex),
        })
    }

    /// Points declared by a top-level test name, if the pattern matches.
    pub fn declared_points(&self, test: &str) -> Option<u32> {
        let captures = self.pattern.as_ref()?.captures(test)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

/// Parse line-delimited `go test -json` output into typed events.
///
/// The stream may interleave build output (`# pkg`, compiler errors) with
/// event lines; anything that is not an event object is skipped.
pub fn parse_test_events(stdout: &str, policy: &PointsPolicy) -> Vec<TestEvent> {
    let mut events = Vec::new();
    let mut skipped = 0usize;
    for (index, line) in stdout.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TestEvent>(line) {
            Ok(event) => events.push(event.with_declared_points(policy)),
            Err(err) => {
                skipped += 1;
                tracing::debug!(line = index + 1, error = %err, "skipping non-event line");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "ignored lines that are not test events");
    }
    tracing::debug!(events = events.len(), "parsed test events");
    events
}

/// Read raw `go test -json` output from a file, or stdin for `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN_PATH {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read test events from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read test events {}", path.display()))
}
