//! External job execution.
//!
//! Training and export are performed by the TensorFlow object detection
//! scripts. This module writes the task's `pipeline.config`, builds the
//! script command lines, runs them, and forwards their output line by line.

mod pipeline_config;
mod tasks;

#[cfg(feature = "fuzzing")]
pub use pipeline_config::fuzz_rewrite_pipeline_config;
pub use pipeline_config::{
    rewrite_pipeline_config, training_overrides, write_pipeline_config, ConfigOverride,
    ConfigValue,
};
pub use tasks::{
    export_job, finish_export, run_export, run_train, train_job, JobOptions, TrainPlan,
};

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::error::RecordError;

/// A command line to run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSpec {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl JobSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The command line as one string, for logging.
    pub fn display(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One line of job output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobEvent {
    Stdout(String),
    Stderr(String),
}

/// How a finished job exited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    pub code: Option<i32>,
    pub status: String,
}

impl From<ExitStatus> for JobOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
            status: status.to_string(),
        }
    }
}

/// A job that has been started.
///
/// Iterating yields output lines until both streams are closed; [`wait`]
/// then reports the exit status.
///
/// [`wait`]: RunningJob::wait
pub struct RunningJob {
    program: String,
    events: Receiver<JobEvent>,
    finish: Box<dyn FnOnce() -> Result<JobOutcome, RecordError> + Send>,
}

impl RunningJob {
    /// Builds a job from an event source and a completion callback.
    pub fn new(
        program: impl Into<String>,
        events: Receiver<JobEvent>,
        finish: impl FnOnce() -> Result<JobOutcome, RecordError> + Send + 'static,
    ) -> Self {
        Self {
            program: program.into(),
            events,
            finish: Box::new(finish),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Waits for the job to exit. Output not yet consumed is discarded.
    pub fn wait(self) -> Result<JobOutcome, RecordError> {
        drop(self.events);
        (self.finish)()
    }
}

impl Iterator for RunningJob {
    type Item = JobEvent;

    fn next(&mut self) -> Option<JobEvent> {
        self.events.recv().ok()
    }
}

/// Starts jobs.
pub trait JobRunner {
    fn submit(&self, spec: &JobSpec) -> Result<RunningJob, RecordError>;
}

/// Runs jobs as local child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessRunner;

impl JobRunner for ProcessRunner {
    fn submit(&self, spec: &JobSpec) -> Result<RunningJob, RecordError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        debug!("spawning {}", spec.display());
        let mut child = command.spawn().map_err(|source| RecordError::JobSpawn {
            program: spec.program.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone(), JobEvent::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx, JobEvent::Stderr));
        }

        let program = spec.program.clone();
        Ok(RunningJob::new(spec.program.clone(), rx, move || {
            wait_child(child, readers, &program)
        }))
    }
}

fn forward_lines<R>(
    stream: R,
    tx: Sender<JobEvent>,
    wrap: fn(String) -> JobEvent,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else { break };
            // Keep draining the pipe after the receiver is gone.
            let _ = tx.send(wrap(line));
        }
    })
}

fn wait_child(
    mut child: Child,
    readers: Vec<JoinHandle<()>>,
    program: &str,
) -> Result<JobOutcome, RecordError> {
    let status = child.wait().map_err(|source| RecordError::JobSpawn {
        program: program.to_string(),
        source,
    })?;
    for reader in readers {
        let _ = reader.join();
    }
    Ok(status.into())
}

/// Streams every event of `job` to `on_event`, then waits for it.
///
/// A non-zero exit is [`RecordError::JobFailed`].
pub fn drive(
    mut job: RunningJob,
    on_event: &mut dyn FnMut(&JobEvent),
) -> Result<JobOutcome, RecordError> {
    let program = job.program().to_string();
    for event in job.by_ref() {
        on_event(&event);
    }

    let outcome = job.wait()?;
    if !outcome.success {
        return Err(RecordError::JobFailed {
            program,
            status: outcome.status,
        });
    }
    Ok(outcome)
}
