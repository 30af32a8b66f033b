//! Single-consumer command queue
//!
//! The orchestrator lives inside one worker task. Clients submit commands
//! through a [`SessionHandle`]; the worker runs them strictly one after
//! another, so a command (including `reset`) never starts while another is
//! in flight. The orchestrator publishes a fresh [`SessionSnapshot`] on every
//! phase change and after each command, for readers that must not wait on the
//! queue.

use pagepilot_core::{PilotError, Result};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::command::Command;
use crate::events::ProgressEvent;
use crate::orchestrator::Orchestrator;
use crate::session::SessionSnapshot;

const QUEUE_CAPACITY: usize = 32;

/// One queued command and where its events go
pub struct SessionRequest {
    pub command: Command,
    pub events: mpsc::UnboundedSender<ProgressEvent>,
}

#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionRequest>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Move the orchestrator into a worker task
    ///
    /// The worker exits once every handle is dropped.
    pub fn spawn(mut orchestrator: Orchestrator) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<SessionRequest>(QUEUE_CAPACITY);
        let snapshot = orchestrator.subscribe();

        let worker = tokio::spawn(async move {
            info!("Session worker started");
            while let Some(request) = rx.recv().await {
                debug!("Dequeued command: {}", request.command.name());
                orchestrator.dispatch(request.command, &request.events).await;
                orchestrator.publish();
            }
            orchestrator.reset().await;
            info!("Session worker stopped");
        });

        (Self { tx, snapshot }, worker)
    }

    /// Queue a command; its events are sent on `events`
    pub async fn submit(&self, command: Command, events: mpsc::UnboundedSender<ProgressEvent>) -> Result<()> {
        self.tx
            .send(SessionRequest { command, events })
            .await
            .map_err(|_| PilotError::Transport("Session worker is not running".to_string()))
    }

    /// Queue a command and collect every event it produces
    pub async fn execute(&self, command: Command) -> Result<Vec<ProgressEvent>> {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        self.submit(command, events_tx).await?;

        let mut events = Vec::new();
        while let Some(event) = events_rx.recv().await {
            events.push(event);
        }
        Ok(events)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Collaborators;
    use crate::runner::{MockRunner, RunOutput, TestRunner};
    use async_trait::async_trait;
    use pagepilot_agent::MockProvider;
    use pagepilot_browser::{MockBrowser, MockLauncher};
    use pagepilot_core::config::PilotConfig;
    use pagepilot_core::Phase;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::{sleep, timeout};

    fn handle(provider: &MockProvider) -> (SessionHandle, JoinHandle<()>) {
        let collaborators = Collaborators {
            provider: Arc::new(provider.clone()),
            launcher: Arc::new(MockLauncher::new(MockBrowser::new("Home", "https://example.com"))),
            runner: Arc::new(MockRunner::new()),
        };
        SessionHandle::spawn(Orchestrator::in_memory(collaborators, &PilotConfig::default()))
    }

    #[tokio::test]
    async fn test_commands_run_in_order() {
        let provider = MockProvider::new();
        provider.push_text(r#"{"elements": [], "interactions": [], "structure": {}}"#, 100);
        let (handle, _worker) = handle(&provider);

        let (tx, mut rx) = mpsc::unbounded_channel();
        handle
            .submit(Command::Explore { url: "https://example.com".to_string() }, tx.clone())
            .await
            .unwrap();
        handle.submit(Command::Reset, tx).await.unwrap();

        let mut terminal = Vec::new();
        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                terminal.push(event);
            }
        }

        assert!(matches!(terminal[0], ProgressEvent::PhaseComplete { .. }));
        assert!(matches!(terminal[1], ProgressEvent::Info { .. }));
        assert_eq!(terminal.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_published_after_command() {
        let provider = MockProvider::new();
        provider.push_text(r#"{"elements": [], "interactions": [], "structure": {}}"#, 100);
        let (handle, _worker) = handle(&provider);

        assert!(!handle.snapshot().has_page_knowledge);

        let events = handle
            .execute(Command::Explore { url: "https://example.com".to_string() })
            .await
            .unwrap();
        assert!(events.last().unwrap().is_terminal());

        let snapshot = handle.snapshot();
        assert!(snapshot.has_page_knowledge);
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.metrics.total_tokens, 100);
    }

    /// Holds every run until the test opens the gate
    struct GatedRunner {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TestRunner for GatedRunner {
        async fn run(&self, _code: &str) -> Result<RunOutput> {
            self.gate.notified().await;
            Ok(RunOutput {
                output: "test_a.py::test_a PASSED\n1 passed in 0.01s\n".to_string(),
                exit_code: Some(0),
                elapsed_seconds: 0.01,
            })
        }
    }

    #[tokio::test]
    async fn test_snapshot_shows_phase_while_command_runs() {
        let provider = MockProvider::new();
        provider.push_text(r#"{"elements": [], "interactions": [], "structure": {}}"#, 100);
        provider.push_text(r#"{"test_cases": [{"id": "TC001"}]}"#, 100);
        provider.push_text("```python\ndef test_a(): pass\n```", 100);
        let gate = Arc::new(Notify::new());
        let collaborators = Collaborators {
            provider: Arc::new(provider.clone()),
            launcher: Arc::new(MockLauncher::new(MockBrowser::new("Home", "https://example.com"))),
            runner: Arc::new(GatedRunner { gate: gate.clone() }),
        };
        let (handle, _worker) =
            SessionHandle::spawn(Orchestrator::in_memory(collaborators, &PilotConfig::default()));

        handle
            .execute(Command::Explore { url: "https://example.com".to_string() })
            .await
            .unwrap();
        handle.execute(Command::Design).await.unwrap();

        let generating = tokio::spawn({
            let handle = handle.clone();
            async move { handle.execute(Command::Generate { max_rounds: Some(1) }).await }
        });

        timeout(Duration::from_secs(5), async {
            while handle.snapshot().phase != Phase::Generating {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        gate.notify_one();
        let events = generating.await.unwrap().unwrap();
        assert!(matches!(events.last(), Some(ProgressEvent::PhaseComplete { .. })));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert!(snapshot.has_generated_code);
        assert_eq!(snapshot.last_success, Some(true));
    }

    #[tokio::test]
    async fn test_worker_stops_when_handles_drop() {
        let provider = MockProvider::new();
        let (handle, worker) = handle(&provider);

        drop(handle);
        worker.await.unwrap();
    }
}
