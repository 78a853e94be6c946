//! Run Lifecycle Orchestration
//!
//! One measurement run walks an explicit state machine:
//!
//! ```text
//! Idle → Cleaning → Configuring → Running → Draining → Idle
//! ```
//!
//! Cleaning removes the previous run's timestamp logs. Configuring creates
//! the settings queue before any stage can look for it, spawns the three
//! stage processes, then publishes the settings records. Running waits for
//! all three stages to exit. Draining unlinks the well-known queue objects
//! so the next run starts from a clean system-queue namespace.

use crate::settings::distribute_settings;
use pipebench_core::{RunConfig, Stage};
use pipebench_ipc::{
    unlink_queue, QueueError, SettingsQueue, SETTINGS_MSG_SIZE, SETTINGS_QUEUE_CAPACITY,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Where the external pipeline lives: stage programs, their timestamp logs
/// and the shared queue names.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    /// Capture stage program
    pub capture_program: PathBuf,
    /// Filter stage program
    pub filter_program: PathBuf,
    /// Playback stage program
    pub playback_program: PathBuf,
    /// Timestamp log written by the capture stage
    pub capture_log: PathBuf,
    /// Timestamp log written by the filter stage
    pub filter_log: PathBuf,
    /// Timestamp log written by the playback stage
    pub playback_log: PathBuf,
    /// Capture→filter transport queue name (created by the stages)
    pub input_queue: String,
    /// Filter→playback transport queue name (created by the stages)
    pub output_queue: String,
    /// Settings queue name (created and populated by the harness)
    pub settings_queue: String,
}

impl PipelineSpec {
    /// Program invoked for `stage`.
    pub fn program(&self, stage: Stage) -> &Path {
        match stage {
            Stage::Capture => &self.capture_program,
            Stage::Filter => &self.filter_program,
            Stage::Playback => &self.playback_program,
        }
    }

    /// Timestamp log written by `stage`.
    pub fn log(&self, stage: Stage) -> &Path {
        match stage {
            Stage::Capture => &self.capture_log,
            Stage::Filter => &self.filter_log,
            Stage::Playback => &self.playback_log,
        }
    }
}

/// Phases of one measurement run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress
    Idle,
    /// Removing the previous run's artifacts
    Cleaning,
    /// Creating the settings queue, spawning stages, publishing settings
    Configuring,
    /// Waiting for the stage processes to exit
    Running,
    /// Removing the queue objects
    Draining,
}

/// Errors from one run of the external pipeline
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A stale artifact exists but could not be removed
    #[error("failed to remove stale artifact {path}: {source}")]
    Cleanup {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Settings queue creation, publish or removal failed
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A stage process failed to start
    #[error("failed to start the {stage} stage ({program}): {source}")]
    Spawn {
        /// Which stage
        stage: Stage,
        /// Program that could not be started
        program: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Waiting on a stage process failed
    #[error("failed waiting for the {stage} stage: {source}")]
    Wait {
        /// Which stage
        stage: Stage,
        /// Underlying I/O error
        source: io::Error,
    },
}

/// Drives one run of the external pipeline.
pub struct RunOrchestrator<'a> {
    spec: &'a PipelineSpec,
    state: RunState,
}

impl<'a> RunOrchestrator<'a> {
    /// Orchestrator for the pipeline described by `spec`.
    pub fn new(spec: &'a PipelineSpec) -> Self {
        Self {
            spec,
            state: RunState::Idle,
        }
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> RunState {
        self.state
    }

    fn enter(&mut self, state: RunState) {
        debug!(from = ?self.state, to = ?state, "run state transition");
        self.state = state;
    }

    /// Execute one full run.
    ///
    /// Queue objects are drained even when configuring or waiting failed,
    /// so the next run never sees a stale namespace; when both fail, the
    /// run error wins and the drain failure is logged.
    pub fn execute(&mut self, config: &RunConfig) -> Result<(), OrchestratorError> {
        self.enter(RunState::Cleaning);
        self.remove_stale_logs()?;

        self.enter(RunState::Configuring);
        let outcome = self.configure_and_run(config);

        self.enter(RunState::Draining);
        let drained = self.drain_queues();

        self.enter(RunState::Idle);
        match (outcome, drained) {
            (Err(run_err), Err(drain_err)) => {
                warn!(error = %drain_err, "queue drain also failed");
                Err(run_err)
            }
            (Err(run_err), Ok(())) => Err(run_err),
            (Ok(()), drained) => drained,
        }
    }

    fn configure_and_run(&mut self, config: &RunConfig) -> Result<(), OrchestratorError> {
        // The queue must exist before any stage starts looking for it.
        let queue = SettingsQueue::create(
            &self.spec.settings_queue,
            SETTINGS_QUEUE_CAPACITY,
            SETTINGS_MSG_SIZE,
        )?;

        let mut children = self.spawn_stages(config.periods)?;

        // Published after spawning: the queue holds at most
        // SETTINGS_QUEUE_CAPACITY records at a time, and the filter stage
        // drains it while starting up.
        distribute_settings(&queue, config.filter_count)?;
        queue.close()?;

        self.enter(RunState::Running);
        self.await_stages(&mut children)
    }

    fn spawn_stage(&self, stage: Stage, periods: u32) -> Result<Child, OrchestratorError> {
        let program = self.spec.program(stage);
        debug!(stage = %stage, program = %program.display(), periods, "spawning stage");
        Command::new(program)
            .arg(periods.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| OrchestratorError::Spawn {
                stage,
                program: program.to_path_buf(),
                source: e,
            })
    }

    fn spawn_stages(&self, periods: u32) -> Result<Vec<(Stage, Child)>, OrchestratorError> {
        let mut children = Vec::with_capacity(3);
        for stage in [Stage::Capture, Stage::Filter, Stage::Playback] {
            match self.spawn_stage(stage, periods) {
                Ok(child) => children.push((stage, child)),
                Err(e) => {
                    // A stage that never started leaves the others waiting
                    // on a pipeline that will never complete.
                    for (started, child) in &mut children {
                        if let Err(kill_err) = child.kill() {
                            warn!(stage = %started, error = %kill_err, "failed to kill stage after spawn failure");
                        }
                        let _ = child.wait();
                    }
                    return Err(e);
                }
            }
        }
        Ok(children)
    }

    fn await_stages(&self, children: &mut [(Stage, Child)]) -> Result<(), OrchestratorError> {
        for (stage, child) in children {
            let status = child.wait().map_err(|e| OrchestratorError::Wait {
                stage: *stage,
                source: e,
            })?;
            // Exit status is deliberately not inspected; a failing stage
            // surfaces as a correlation failure over its log.
            debug!(stage = %stage, code = ?status.code(), "stage exited");
        }
        Ok(())
    }

    fn remove_stale_logs(&self) -> Result<(), OrchestratorError> {
        for stage in [Stage::Capture, Stage::Filter, Stage::Playback] {
            let path = self.spec.log(stage);
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed stale log"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(OrchestratorError::Cleanup {
                        path: path.to_path_buf(),
                        source: e,
                    })
                }
            }
        }
        Ok(())
    }

    fn drain_queues(&self) -> Result<(), OrchestratorError> {
        for name in [
            &self.spec.input_queue,
            &self.spec.output_queue,
            &self.spec.settings_queue,
        ] {
            if unlink_queue(name)? {
                debug!(queue = %name, "removed queue object");
            }
        }
        Ok(())
    }
}
