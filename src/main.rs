use anyhow::{anyhow, Context, Result};
use clap::Parser;
use gotest_report::config::{self, ReportConfig};
use gotest_report::events::{parse_test_events, read_input, PointsPolicy};
use gotest_report::report::{find_package_result, RunReport};
use std::io::Write;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{Command, RootArgs, SummaryArgs, TranscriptArgs};

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.log_level.as_deref())?;

    match args.command {
        Command::Summary(args) => cmd_summary(args),
        Command::Transcript(args) => cmd_transcript(args),
    }
}

fn init_tracing(log_level: Option<&str>) -> Result<()> {
    tracing_subscriber::registry()
        .with(log_filter(log_level)?)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
    Ok(())
}

/// `--log-level` must parse; without it `RUST_LOG` is used, falling back to
/// `warn`.
fn log_filter(log_level: Option<&str>) -> Result<EnvFilter> {
    match log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid --log-level filter {level:?}")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))),
    }
}

fn cmd_summary(args: SummaryArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let policy = config::points_policy(&config)?;
    let stdout = read_input(&args.input)?;
    let events = parse_test_events(&stdout, &policy);
    let report = RunReport::build(&events, &config::report_options(&config));

    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&report).context("serialize run report")?;
        json.push('\n');
        json
    } else {
        report.render_text()
    };
    match &args.out {
        Some(path) => {
            write_output(path, &rendered)?;
            tracing::info!(path = %path.display(), "wrote report");
        }
        None => print_stdout(&rendered)?,
    }
    Ok(())
}

fn cmd_transcript(args: TranscriptArgs) -> Result<()> {
    let stdout = read_input(&args.input)?;
    let events = parse_test_events(&stdout, &PointsPolicy::default());
    let result = find_package_result(&events, &args.package)
        .ok_or_else(|| anyhow!("no package-level result for {}", args.package))?;
    print_stdout(&result.output())
}

/// Config file first, then CLI flags on top.
fn resolve_config(args: &SummaryArgs) -> Result<ReportConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::default_config(),
    };
    if let Some(pattern) = &args.points_pattern {
        config.points_pattern = Some(pattern.clone());
    }
    config.omit_untested_packages |= args.omit_untested;
    config.omit_successful_packages |= args.omit_successful;
    config::validate_config(&config)?;
    Ok(config)
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir {}", parent.display()))?;
    }
    std::fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .context("write to stdout")?;
    stdout.flush().context("flush stdout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary_args() -> SummaryArgs {
        SummaryArgs {
            input: PathBuf::from("-"),
            config: None,
            points_pattern: None,
            omit_untested: false,
            omit_successful: false,
            json: false,
            out: None,
        }
    }

    #[test]
    fn resolve_config_applies_cli_overrides_on_top_of_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            br#"{"schema_version":1,"points_pattern":"^Test(\\d+)","omit_successful_packages":true}"#,
        )
        .expect("write config");

        let mut args = summary_args();
        args.config = Some(path);
        args.points_pattern = Some(r"_(\d+)$".to_string());
        args.omit_untested = true;
        let config = resolve_config(&args).expect("resolve config");
        assert_eq!(config.points_pattern.as_deref(), Some(r"_(\d+)$"));
        assert!(config.omit_untested_packages);
        assert!(config.omit_successful_packages);
    }

    #[test]
    fn resolve_config_rejects_invalid_cli_pattern() {
        let mut args = summary_args();
        args.points_pattern = Some("no-group".to_string());
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn log_filter_rejects_invalid_level() {
        let err = log_filter(Some("gotest_report=bogus")).expect_err("invalid level");
        assert!(format!("{err:#}").contains("invalid --log-level filter"));
        assert!(log_filter(Some("debug")).is_ok());
        assert!(log_filter(Some("gotest_report=trace,warn")).is_ok());
        assert!(log_filter(None).is_ok());
    }

    #[test]
    fn write_output_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("nested").join("report.txt");
        write_output(&path, "ok\n").expect("write output");
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "ok\n");
    }
}
