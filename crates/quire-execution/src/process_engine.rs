//! Subprocess-backed execution engine.
//!
//! Each execution pipes the source into a fresh interpreter process
//! (`python3 -` by default) and turns what it prints into output records.
//! No interpreter state survives between executions; `restart` therefore only
//! resets the execution counter.

use async_trait::async_trait;
use quire_core::config::EngineConfig;
use quire_core::engine::{EngineFactory, ExecutionEngine, ExecutionOutcome};
use quire_core::error::{QuireError, Result};
use quire_core::item::OutputRecord;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Error name recorded when an execution is stopped.
pub const INTERRUPTED: &str = "Interrupted";

/// Runs each source through the configured interpreter.
///
/// At most one execution is tracked for `stop`; concurrent calls are allowed
/// but `stop` interrupts only the most recent one.
pub struct ProcessEngine {
    session: String,
    config: EngineConfig,
    executions: AtomicU64,
    /// Counter value and stop token of the tracked execution
    running: Mutex<Option<(u64, CancellationToken)>>,
    closed: AtomicBool,
}

impl ProcessEngine {
    pub fn new(session: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            session: session.into(),
            config,
            executions: AtomicU64::new(0),
            running: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    /// Replaces the tracked execution, returning the previous one.
    fn track(
        &self,
        execution: Option<(u64, CancellationToken)>,
    ) -> Option<(u64, CancellationToken)> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *running, execution)
    }

    /// Stops tracking `execution_count` unless a newer execution replaced it.
    fn untrack(&self, execution_count: u64) {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|(count, _)| *count == execution_count) {
            *running = None;
        }
    }

    fn interrupt(&self) -> bool {
        match self.track(None) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ExecutionEngine for ProcessEngine {
    async fn execute(&self, source: &str, timeout: Duration) -> Result<ExecutionOutcome> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QuireError::Execution(format!(
                "engine for '{}' has been shut down",
                self.session
            )));
        }

        let mut child = self.command().spawn().map_err(|err| {
            QuireError::Execution(format!("Failed to spawn '{}': {}", self.config.program, err))
        })?;
        let execution_count = self.executions.fetch_add(1, Ordering::SeqCst) + 1;

        // Feed stdin from a task so a chatty child cannot block on a full
        // stdout pipe while we are still writing.
        if let Some(mut stdin) = child.stdin.take() {
            let source = source.to_string();
            tokio::spawn(async move {
                let _ = stdin.write_all(source.as_bytes()).await;
            });
        }

        let token = CancellationToken::new();
        self.track(Some((execution_count, token.clone())));
        tracing::debug!(session = %self.session, execution_count, "Started execution");

        // Dropping the pending `wait_with_output` future kills the child.
        let result = tokio::select! {
            output = child.wait_with_output() => Ok(output),
            _ = token.cancelled() => Err(None),
            _ = tokio::time::sleep(timeout) => Err(Some(timeout)),
        };
        self.untrack(execution_count);

        match result {
            Ok(output) => {
                let output = output?;
                let mut records = Vec::new();
                if !output.stdout.is_empty() {
                    records.push(OutputRecord::stream(
                        "stdout",
                        String::from_utf8_lossy(&output.stdout),
                    ));
                }
                if !output.stderr.is_empty() {
                    records.push(OutputRecord::stream(
                        "stderr",
                        String::from_utf8_lossy(&output.stderr),
                    ));
                }
                if !output.status.success() {
                    records.push(OutputRecord::Error {
                        ename: "ProcessExit".to_string(),
                        evalue: output.status.to_string(),
                        traceback: Vec::new(),
                    });
                }
                Ok(ExecutionOutcome {
                    records,
                    execution_count,
                })
            }
            Err(None) => {
                tracing::warn!(session = %self.session, execution_count, "Execution stopped");
                Ok(ExecutionOutcome {
                    records: vec![OutputRecord::Error {
                        ename: INTERRUPTED.to_string(),
                        evalue: "execution was stopped".to_string(),
                        traceback: Vec::new(),
                    }],
                    execution_count,
                })
            }
            Err(Some(budget)) => Err(QuireError::Timeout {
                seconds: budget.as_secs_f64(),
            }),
        }
    }

    async fn stop(&self) -> Result<()> {
        if self.interrupt() {
            tracing::debug!(session = %self.session, "Interrupted running execution");
        }
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        self.interrupt();
        self.executions.store(0, Ordering::SeqCst);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.interrupt();
        Ok(())
    }
}

/// Creates one [`ProcessEngine`] per session from a shared [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct ProcessEngineFactory {
    config: EngineConfig,
}

impl ProcessEngineFactory {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for ProcessEngineFactory {
    fn create(&self, session: &str) -> Arc<dyn ExecutionEngine> {
        Arc::new(ProcessEngine::new(session, self.config.clone()))
    }
}
