//! Schema-versioned, structured diagnostic records.
//!
//! `RunRecording` and `Timeline` are pure in-memory builders over a
//! [`RunResult`] — `serde::Serialize` so the embedding application can hand
//! them to whatever export path it owns, but this crate never writes a
//! file, opens a socket, or exposes a CLI for them.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::Graph;
use crate::options::{ExecutionMode, Options, Policy};
use crate::result::{CoordinatorState, RunResult, SignalResult, StageResult};
use crate::types::SignalStatus;

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// A snapshot of the effective options, echoed into a [`RunRecording`].
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationSnapshot {
    policy: &'static str,
    execution_mode: &'static str,
    global_timeout_ms: u64,
    cancel_on_global_timeout: bool,
    cancel_individual_on_timeout: bool,
    cancel_dependents_on_failure: bool,
    max_degree_of_parallelism: Option<usize>,
}

impl From<&Options> for ConfigurationSnapshot {
    fn from(options: &Options) -> Self {
        Self {
            policy: match options.policy {
                Policy::FailFast => "fail_fast",
                Policy::BestEffort => "best_effort",
                Policy::ContinueOnTimeout => "continue_on_timeout",
            },
            execution_mode: match options.execution_mode {
                ExecutionMode::Parallel => "parallel",
                ExecutionMode::Sequential => "sequential",
                ExecutionMode::DependencyAware => "dependency_aware",
                ExecutionMode::Staged => "staged",
            },
            global_timeout_ms: millis(options.global_timeout),
            cancel_on_global_timeout: options.cancel_on_global_timeout,
            cancel_individual_on_timeout: options.cancel_individual_on_timeout,
            cancel_dependents_on_failure: options.cancel_dependents_on_failure,
            max_degree_of_parallelism: options.max_degree_of_parallelism,
        }
    }
}

/// One signal's entry within a [`RunRecording`].
#[derive(Debug, Clone, Serialize)]
pub struct RecordedSignal {
    name: String,
    status: &'static str,
    start_ms: u64,
    end_ms: u64,
    duration_ms: u64,
    stage: Option<u32>,
    /// Names this signal declared as dependencies. Empty when the run had
    /// no dependency graph.
    dependencies: Vec<String>,
    failed_dependencies: Vec<String>,
}

impl RecordedSignal {
    fn new(result: &SignalResult, dependencies: Vec<String>) -> Self {
        Self {
            name: result.name.clone(),
            status: status_str(result.status),
            start_ms: millis(result.started_at),
            end_ms: millis(result.completed_at),
            duration_ms: millis(result.duration),
            stage: result.stage,
            dependencies,
            failed_dependencies: result.failed_dependencies.clone(),
        }
    }
}

/// One stage's aggregate entry within a [`RunRecording`]. Empty when the run
/// had no stage table.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedStage {
    stage: u32,
    signals: Vec<String>,
    status: &'static str,
}

impl From<&StageResult> for RecordedStage {
    fn from(result: &StageResult) -> Self {
        Self {
            stage: result.stage,
            signals: result.signals.clone(),
            status: match result.status {
                crate::result::StageStatus::Succeeded => "succeeded",
                crate::result::StageStatus::Failed => "failed",
                crate::result::StageStatus::TimedOut => "timed_out",
                crate::result::StageStatus::PartiallyCompleted => "partially_completed",
            },
        }
    }
}

fn status_str(status: SignalStatus) -> &'static str {
    match status {
        SignalStatus::Pending => "pending",
        SignalStatus::Running => "running",
        SignalStatus::Succeeded => "succeeded",
        SignalStatus::Failed => "failed",
        SignalStatus::TimedOut => "timed_out",
        SignalStatus::Skipped => "skipped",
        SignalStatus::Cancelled => "cancelled",
    }
}

fn state_str(state: CoordinatorState) -> &'static str {
    match state {
        CoordinatorState::NotStarted => "not_started",
        CoordinatorState::Running => "running",
        CoordinatorState::Completed => "completed",
        CoordinatorState::TimedOut => "timed_out",
        CoordinatorState::Faulted => "faulted",
    }
}

/// Per-status counts, slowest/fastest signal, average duration, and the
/// maximum concurrency observed during the run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    total: usize,
    by_status: HashMap<&'static str, usize>,
    slowest: Option<(String, u64)>,
    fastest: Option<(String, u64)>,
    average_ms: f64,
    max_concurrency_observed: usize,
}

impl Summary {
    fn from_results(results: &[SignalResult], max_concurrency_observed: usize) -> Self {
        let mut by_status: HashMap<&'static str, usize> = HashMap::new();
        for result in results {
            *by_status.entry(status_str(result.status)).or_insert(0) += 1;
        }
        let timed: Vec<(&str, u64)> = results
            .iter()
            .filter(|r| r.status != SignalStatus::Skipped)
            .map(|r| (r.name.as_str(), millis(r.duration)))
            .collect();
        let slowest = timed.iter().max_by_key(|(_, ms)| *ms).map(|(n, ms)| ((*n).to_string(), *ms));
        let fastest = timed.iter().min_by_key(|(_, ms)| *ms).map(|(n, ms)| ((*n).to_string(), *ms));
        let average_ms = if timed.is_empty() {
            0.0
        } else {
            timed.iter().map(|(_, ms)| *ms as f64).sum::<f64>() / timed.len() as f64
        };
        Self {
            total: results.len(),
            by_status,
            slowest,
            fastest,
            average_ms,
            max_concurrency_observed,
        }
    }
}

/// A schema-versioned, structured recording of a completed run, suitable
/// for the embedding application to serialize and ship wherever it likes.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecording {
    schema_version: &'static str,
    recording_id: String,
    recorded_at: DateTime<Utc>,
    total_duration_ms: u64,
    timed_out: bool,
    final_state: &'static str,
    configuration: ConfigurationSnapshot,
    signals: Vec<RecordedSignal>,
    stages: Vec<RecordedStage>,
    summary: Summary,
}

impl RunRecording {
    /// Builds a recording from a completed run's result and the options
    /// that produced it.
    ///
    /// `recording_id` is an opaque caller-supplied identifier (e.g. a
    /// UUID); `recorded_at` is wall-clock, diagnostic only, and never
    /// consulted for classification. `graph`, when the run used
    /// `DependencyAware` mode, supplies each signal's declared dependency
    /// names; pass `None` for every other mode.
    #[must_use]
    pub fn from_result(
        result: &RunResult,
        options: &Options,
        graph: Option<&Graph>,
        recording_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
        max_concurrency_observed: usize,
    ) -> Self {
        Self {
            schema_version: "1.0",
            recording_id: recording_id.into(),
            recorded_at,
            total_duration_ms: millis(result.total_duration),
            timed_out: result.timed_out,
            final_state: state_str(result.final_state),
            configuration: ConfigurationSnapshot::from(options),
            signals: result
                .signal_results
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    let dependencies = graph.map_or_else(Vec::new, |g| g.dependency_names_of(i));
                    RecordedSignal::new(r, dependencies)
                })
                .collect(),
            stages: result.stage_results.iter().map(RecordedStage::from).collect(),
            summary: Summary::from_results(&result.signal_results, max_concurrency_observed),
        }
    }
}

/// One start/end interval in a [`Timeline`].
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    name: String,
    start_ms: u64,
    end_ms: u64,
    /// Identifier shared by every event whose interval overlaps this one.
    concurrent_group: usize,
}

/// A schema-versioned view of a run as overlapping start/end intervals,
/// grouped by concurrency.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    schema_version: &'static str,
    events: Vec<TimelineEvent>,
}

impl Timeline {
    /// Derives a timeline from a completed run's result. Signals that never
    /// ran (`Skipped`) contribute no event.
    #[must_use]
    pub fn from_result(result: &RunResult) -> Self {
        let mut intervals: Vec<&SignalResult> = result
            .signal_results
            .iter()
            .filter(|r| r.status != SignalStatus::Skipped)
            .collect();
        intervals.sort_by_key(|r| r.started_at);

        let mut groups: Vec<(Duration, Duration)> = Vec::new();
        let mut events = Vec::with_capacity(intervals.len());
        for result in intervals {
            let group = groups
                .iter()
                .position(|&(start, end)| result.started_at < end && result.completed_at > start)
                .unwrap_or_else(|| {
                    groups.push((result.started_at, result.completed_at));
                    groups.len() - 1
                });
            let (start, end) = groups[group];
            groups[group] = (start.min(result.started_at), end.max(result.completed_at));
            events.push(TimelineEvent {
                name: result.name.clone(),
                start_ms: millis(result.started_at),
                end_ms: millis(result.completed_at),
                concurrent_group: group,
            });
        }

        Self {
            schema_version: "1.0",
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancellationReason;

    fn signal(name: &str, start_ms: u64, end_ms: u64, status: SignalStatus) -> SignalResult {
        SignalResult {
            name: name.to_string(),
            status,
            started_at: Duration::from_millis(start_ms),
            completed_at: Duration::from_millis(end_ms),
            duration: Duration::from_millis(end_ms - start_ms),
            error: None,
            cancellation_reason: CancellationReason::None,
            failed_dependencies: Vec::new(),
            stage: None,
        }
    }

    fn sample_result() -> RunResult {
        RunResult {
            signal_results: vec![
                signal("a", 0, 20, SignalStatus::Succeeded),
                signal("b", 0, 10, SignalStatus::Failed),
                signal("c", 10, 40, SignalStatus::Succeeded),
            ],
            stage_results: Vec::new(),
            total_duration: Duration::from_millis(40),
            timed_out: false,
            final_state: CoordinatorState::Completed,
        }
    }

    #[test]
    fn recording_carries_schema_version_and_counts() {
        let options = Options::builder().build().unwrap();
        let recording = RunRecording::from_result(
            &sample_result(),
            &options,
            None,
            "run-1",
            DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            2,
        );
        assert_eq!(recording.schema_version, "1.0");
        assert_eq!(recording.signals.len(), 3);
        assert_eq!(*recording.summary.by_status.get("succeeded").unwrap(), 2);
    }

    #[test]
    fn timeline_groups_overlapping_intervals() {
        let timeline = Timeline::from_result(&sample_result());
        assert_eq!(timeline.events.len(), 3);
        let group_of = |name: &str| {
            timeline
                .events
                .iter()
                .find(|e| e.name == name)
                .unwrap()
                .concurrent_group
        };
        assert_eq!(group_of("a"), group_of("b"));
        assert_eq!(group_of("a"), group_of("c"));
    }
}
