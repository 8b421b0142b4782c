//! Report configuration.
//!
//! Config lives in a small JSON file so graded runs can pin their points
//! convention next to the test suite. CLI flags are merged on top by the
//! binary.
use crate::events::PointsPolicy;
use crate::report::ReportOptions;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub schema_version: u32,
    /// Regex matched against top-level test names; capture group 1 is the
    /// point value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_pattern: Option<String>,
    #[serde(default)]
    pub omit_untested_packages: bool,
    #[serde(default)]
    pub omit_successful_packages: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        default_config()
    }
}

/// Config used when no file is given: no points, every package reported.
pub fn default_config() -> ReportConfig {
    ReportConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        points_pattern: None,
        omit_untested_packages: false,
        omit_successful_packages: false,
    }
}

pub fn load_config(path: &Path) -> Result<ReportConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ReportConfig =
        serde_json::from_slice(&bytes).context("parse report config JSON")?;
    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "loaded report config");
    Ok(config)
}

pub fn validate_config(config: &ReportConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported report config schema_version {}",
            config.schema_version
        ));
    }
    points_policy(config)?;
    Ok(())
}

pub fn points_policy(config: &ReportConfig) -> Result<PointsPolicy> {
    match config.points_pattern.as_deref() {
        Some(pattern) if !pattern.trim().is_empty() => PointsPolicy::from_pattern(pattern),
        Some(_) => Err(anyhow!("points_pattern must be non-empty when set")),
        None => Ok(PointsPolicy::default()),
    }
}

pub fn report_options(config: &ReportConfig) -> ReportOptions {
    ReportOptions {
        omit_untested_packages: config.omit_untested_packages,
        omit_successful_packages: config.omit_successful_packages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, contents: &str) -> std::path::PathBuf {
        let path = dir.join("gotest-report.json");
        fs::write(&path, contents.as_bytes()).expect("write config");
        path
    }

    #[test]
    fn load_config_fills_optional_fields() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_config(dir.path(), r#"{"schema_version":1}"#);
        let config = load_config(&path).expect("load config");
        assert_eq!(config, default_config());
    }

    #[test]
    fn load_config_reads_points_and_filters() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_config(
            dir.path(),
            r#"{"schema_version":1,"points_pattern":"_(\\d+)$","omit_untested_packages":true}"#,
        );
        let config = load_config(&path).expect("load config");
        assert_eq!(config.points_pattern.as_deref(), Some(r"_(\d+)$"));
        let options = report_options(&config);
        assert!(options.omit_untested_packages);
        assert!(!options.omit_successful_packages);
        let policy = points_policy(&config).expect("policy");
        assert_eq!(policy.declared_points("TestSum_15"), Some(15));
    }

    #[test]
    fn validate_config_rejects_schema_mismatch() {
        let mut config = default_config();
        config.schema_version = 99;
        let err = validate_config(&config).expect_err("schema mismatch");
        assert!(err.to_string().contains("schema_version 99"));
    }

    #[test]
    fn validate_config_rejects_bad_points_pattern() {
        let mut config = default_config();
        config.points_pattern = Some("_\\d+$".to_string());
        assert!(validate_config(&config).is_err());
        config.points_pattern = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn load_config_reports_invalid_json() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = write_config(dir.path(), "{not-json");
        let err = load_config(&path).expect_err("invalid json");
        assert!(format!("{err:#}").contains("parse report config JSON"));
    }

    #[test]
    fn serialized_default_config_round_trips_through_load() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let text = serde_json::to_string_pretty(&default_config()).expect("serialize");
        let path = write_config(dir.path(), &text);
        assert_eq!(load_config(&path).expect("load"), ReportConfig::default());
    }
}
