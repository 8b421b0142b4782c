//! Summaries of `go test -json` runs.
//!
//! [`events`] turns the raw stream into typed events, [`results`] reduces one
//! package's events into a result tree with conclusion tallies and points, and
//! [`report`] rolls every package of a run into a single report.
pub mod config;
pub mod events;
pub mod report;
pub mod results;
