//! Telemetry for RagBuddy
//!
//! Structured logging setup and per-request stage timings.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::cli::Verbosity;

/// Default filter directive for a verbosity level
pub fn filter_directive(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "info",
        Verbosity::VeryVerbose => "debug,hyper=info,reqwest=info,h2=info",
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for answers and `--json` output. `RUST_LOG` overrides the verbosity.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing(verbosity: Verbosity, json: bool) {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)))
    };

    let registry = tracing_subscriber::registry();
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(filter()),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(filter()),
            )
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retrieval,
    Composition,
    Generation,
    Citation,
    Evaluation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retrieval => "retrieval",
            Stage::Composition => "composition",
            Stage::Generation => "generation",
            Stage::Citation => "citation",
            Stage::Evaluation => "evaluation",
        }
    }
}

/// Wall-clock time spent in each stage of one request
#[derive(Debug, Clone)]
pub struct StageTimings {
    started: Instant,
    last: Instant,
    stages: Vec<(Stage, Duration)>,
}

impl StageTimings {
    /// Start the clock
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            stages: Vec::new(),
        }
    }

    /// Close `stage`, attributing the time since the previous mark to it
    pub fn mark(&mut self, stage: Stage) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        self.stages.push((stage, elapsed));
        elapsed
    }

    /// Time recorded for a stage, if it ran
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, d)| *d)
    }

    pub fn stages(&self) -> &[(Stage, Duration)] {
        &self.stages
    }

    /// Time from start to the last mark
    pub fn total(&self) -> Duration {
        self.last.duration_since(self.started)
    }

    fn millis(&self, stage: Stage) -> u64 {
        self.get(stage).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    /// Emit one structured event with every stage duration
    pub fn log_summary(&self) {
        info!(
            retrieval_ms = self.millis(Stage::Retrieval),
            composition_ms = self.millis(Stage::Composition),
            generation_ms = self.millis(Stage::Generation),
            citation_ms = self.millis(Stage::Citation),
            evaluation_ms = self.millis(Stage::Evaluation),
            total_ms = self.total().as_millis() as u64,
            "request finished"
        );
    }

    /// Print a human-readable table
    pub fn display_summary(&self) {
        println!("\n📊 Request Timings");
        println!("─────────────────────────────────────");
        for (stage, duration) in &self.stages {
            println!("{:<18} {:?}", format!("{}:", stage.as_str()), duration);
        }
        println!("{:<18} {:?}", "total:", self.total());
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_start_empty() {
        let timings = StageTimings::start();
        assert!(timings.stages().is_empty());
        assert_eq!(timings.total(), Duration::ZERO);
        assert!(timings.get(Stage::Retrieval).is_none());
    }

    #[test]
    fn test_marks_accumulate_to_total() {
        let mut timings = StageTimings::start();
        timings.mark(Stage::Retrieval);
        std::thread::sleep(Duration::from_millis(5));
        let generation = timings.mark(Stage::Generation);

        assert!(generation >= Duration::from_millis(5));
        assert_eq!(timings.stages().len(), 2);
        let sum: Duration = timings.stages().iter().map(|(_, d)| *d).sum();
        assert_eq!(sum, timings.total());
    }

    #[test]
    fn test_filter_directive_levels() {
        assert_eq!(filter_directive(Verbosity::Quiet), "error");
        assert_eq!(filter_directive(Verbosity::Normal), "warn");
        assert_eq!(filter_directive(Verbosity::Verbose), "info");
        assert!(filter_directive(Verbosity::VeryVerbose).starts_with("debug"));
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(Verbosity::Quiet, false);
        init_tracing(Verbosity::Verbose, true);
    }

    #[test]
    fn test_stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::Evaluation).unwrap(),
            "\"evaluation\""
        );
    }
}
