//! Session orchestrator
//!
//! Owns the session, the lazily launched browser and the phase operations.
//! Every operation follows the same shape: ask the state machine whether it
//! may start, enter the in-progress phase, run, settle back to `Idle`, and
//! only then store the artifact. A rejected operation leaves the session
//! untouched.

use pagepilot_agent::CompletionProvider;
use pagepilot_browser::{BrowserDriver, BrowserLauncher, ScreenshotStore};
use pagepilot_core::config::{BrowserSettings, PilotConfig};
use pagepilot_core::fail_open::fail_open;
use pagepilot_core::{PageKnowledge, PilotError, Result, TestCases, VerificationReport};
use pagepilot_metrics::{MetricsRecorder, MetricsStorage, ReportStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::command::Command;
use crate::error::{CommandError, CommandResult};
use crate::events::{ProgressEvent, ProgressSink};
use crate::loop_engine::{CodeRefiner, CorrectionLoop};
use crate::phases::{Designer, Explorer, Generator, Verifier};
use crate::runner::TestRunner;
use crate::session::{Session, SessionSnapshot};
use crate::state_machine::{begin, settle, Operation};

/// External collaborators the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn CompletionProvider>,
    pub launcher: Arc<dyn BrowserLauncher>,
    pub runner: Arc<dyn TestRunner>,
}

/// Artifact of a `generate` command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub code: String,
    pub verification: VerificationReport,
    pub attempts: usize,
}

pub struct Orchestrator {
    session: Session,
    launcher: Arc<dyn BrowserLauncher>,
    browser: Option<Box<dyn BrowserDriver>>,
    browser_settings: BrowserSettings,
    explorer: Explorer,
    designer: Designer,
    generator: Generator,
    verifier: Verifier,
    report_store: Option<ReportStore>,
    max_rounds: usize,
    round_limit: usize,
    published: watch::Sender<SessionSnapshot>,
}

impl Orchestrator {
    /// Orchestrator persisting metrics, screenshots and the latest report
    /// under the configured data directory
    pub fn new(collaborators: Collaborators, config: &PilotConfig) -> Self {
        let storage = &config.storage;
        let metrics = MetricsRecorder::with_storage(MetricsStorage::append_file(storage.metrics_path()));
        let mut orchestrator = Self::build(collaborators, config, metrics);

        if config.browser.capture_screenshots {
            orchestrator.explorer = orchestrator
                .explorer
                .with_screenshots(ScreenshotStore::new(storage.artifacts_path()));
        }
        orchestrator.report_store = Some(ReportStore::new(storage.report_path()));
        orchestrator
    }

    /// Orchestrator that writes nothing to disk
    pub fn in_memory(collaborators: Collaborators, config: &PilotConfig) -> Self {
        Self::build(collaborators, config, MetricsRecorder::new())
    }

    fn build(collaborators: Collaborators, config: &PilotConfig, metrics: MetricsRecorder) -> Self {
        let provider = &config.provider;
        let session = Session::new(metrics);
        let (published, _) = watch::channel(session.snapshot());
        Self {
            session,
            launcher: collaborators.launcher,
            browser: None,
            browser_settings: config.browser.clone(),
            explorer: Explorer::new(collaborators.provider.clone(), provider.max_output_tokens),
            designer: Designer::new(collaborators.provider.clone(), provider.max_output_tokens),
            generator: Generator::new(collaborators.provider, provider.code_max_tokens),
            verifier: Verifier::new(collaborators.runner),
            report_store: None,
            max_rounds: config.loop_defaults.max_rounds,
            round_limit: config.loop_defaults.max_rounds_limit.max(1),
            published,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    pub fn report_store(&self) -> Option<&ReportStore> {
        self.report_store.as_ref()
    }

    /// Snapshots published on every phase change and after every command
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.published.subscribe()
    }

    /// Publish the current session state to subscribers
    pub fn publish(&self) {
        self.published.send_replace(self.session.snapshot());
    }

    /// Run one command and emit its terminal event
    pub async fn dispatch(&mut self, command: Command, sink: &dyn ProgressSink) {
        debug!("Dispatching command: {}", command.name());
        match command {
            Command::Explore { url } => {
                let result = self.explore(&url, sink).await;
                self.complete(Operation::Explore, result, sink);
            }
            Command::Design => {
                let result = self.design(sink).await;
                self.complete(Operation::Design, result, sink);
            }
            Command::RefineDesign { feedback } => {
                let result = self.refine_design(&feedback, sink).await;
                self.complete(Operation::RefineDesign, result, sink);
            }
            Command::Generate { max_rounds } => {
                let result = self.generate(max_rounds, sink).await;
                self.complete(Operation::Generate, result, sink);
            }
            Command::RefineCode { issue } => {
                let result = self.refine_code(&issue, sink).await;
                self.complete(Operation::RefineCode, result, sink);
            }
            Command::Verify => {
                let result = self.verify(sink).await;
                self.complete(Operation::Verify, result, sink);
            }
            Command::Reset => {
                self.reset().await;
                sink.emit(ProgressEvent::Info {
                    message: "Session reset successfully".to_string(),
                });
            }
            Command::Chat { message } => {
                sink.emit(ProgressEvent::ChatResponse {
                    message: format!(
                        "Received: {}. How can I help you test your application?",
                        message
                    ),
                });
            }
            Command::Unknown(name) => {
                warn!("Unknown command received: {}", name);
                let error = CommandError::Failed(format!("Unknown command: {}", name));
                sink.emit(ProgressEvent::error(None, &error));
            }
        }
    }

    #[instrument(skip(self, sink))]
    pub async fn explore(&mut self, url: &str, sink: &dyn ProgressSink) -> CommandResult<PageKnowledge> {
        let url = url.trim();
        if url.is_empty() {
            return Err(CommandError::Precondition("URL is required".to_string()));
        }

        self.enter(Operation::Explore, "Starting page exploration...", sink)?;
        let result = self.run_explore(url, sink).await;
        self.leave();

        let knowledge = result?;
        self.session.page_knowledge = Some(knowledge.clone());
        Ok(knowledge)
    }

    async fn run_explore(&mut self, url: &str, sink: &dyn ProgressSink) -> Result<PageKnowledge> {
        if self.browser.is_none() {
            info!("Launching browser (headless: {})", self.browser_settings.headless);
            self.browser = Some(self.launcher.launch(&self.browser_settings).await?);
        }
        let driver = self
            .browser
            .as_deref()
            .ok_or_else(|| PilotError::Browser("Browser not available".to_string()))?;

        self.explorer
            .explore(driver, url, sink, &mut self.session.metrics)
            .await
    }

    pub async fn design(&mut self, sink: &dyn ProgressSink) -> CommandResult<TestCases> {
        self.enter(Operation::Design, "Designing test cases...", sink)?;
        let result = match self.session.page_knowledge.as_ref() {
            Some(knowledge) => {
                self.designer
                    .design(knowledge, sink, &mut self.session.metrics)
                    .await
            }
            None => Err(missing("page knowledge")),
        };
        self.leave();

        let cases = result?;
        self.session.test_cases = Some(cases.clone());
        Ok(cases)
    }

    pub async fn refine_design(&mut self, feedback: &str, sink: &dyn ProgressSink) -> CommandResult<TestCases> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(CommandError::Precondition("Feedback is required".to_string()));
        }

        self.enter(Operation::RefineDesign, "Refining test cases...", sink)?;
        let result = match self.session.test_cases.as_ref() {
            Some(current) => {
                self.designer
                    .refine(current, feedback, sink, &mut self.session.metrics)
                    .await
            }
            None => Err(missing("test cases")),
        };
        self.leave();

        let cases = result?;
        self.session.test_cases = Some(cases.clone());
        Ok(cases)
    }

    /// Generate code and run it through the correction loop
    ///
    /// The stored code is the loop's final artifact, whether or not it passed.
    #[instrument(skip(self, sink))]
    pub async fn generate(
        &mut self,
        max_rounds: Option<usize>,
        sink: &dyn ProgressSink,
    ) -> CommandResult<GenerationResult> {
        self.enter(Operation::Generate, "Generating test code...", sink)?;
        let rounds = self.rounds(max_rounds);
        let result = self.run_generate(rounds, sink).await;
        self.leave();

        let generated = result?;
        self.session.generated_code = Some(generated.code.clone());
        self.store_report(&generated.verification).await;
        Ok(generated)
    }

    async fn run_generate(&mut self, max_rounds: usize, sink: &dyn ProgressSink) -> Result<GenerationResult> {
        let (Some(knowledge), Some(cases)) = (
            self.session.page_knowledge.as_ref(),
            self.session.test_cases.as_ref(),
        ) else {
            return Err(missing("page knowledge or test cases"));
        };

        let code = self
            .generator
            .generate(knowledge, cases, sink, &mut self.session.metrics)
            .await?;

        let outcome = CorrectionLoop::new(self.verifier.runner(), &self.generator, sink, max_rounds)
            .run(code, &mut self.session.metrics)
            .await?;

        info!(
            "Generation finished after {} attempt(s): {}",
            outcome.attempts,
            outcome.report.summary()
        );
        Ok(GenerationResult {
            code: outcome.code,
            verification: outcome.report,
            attempts: outcome.attempts,
        })
    }

    pub async fn refine_code(&mut self, issue: &str, sink: &dyn ProgressSink) -> CommandResult<String> {
        let issue = issue.trim();
        if issue.is_empty() {
            return Err(CommandError::Precondition("Issue description is required".to_string()));
        }

        self.enter(Operation::RefineCode, "Refining test code...", sink)?;
        let result = match self.session.generated_code.as_deref() {
            Some(code) => {
                self.generator
                    .refine_code(code, issue, sink, &mut self.session.metrics)
                    .await
            }
            None => Err(missing("generated code")),
        };
        self.leave();

        let code = result?;
        self.session.generated_code = Some(code.clone());
        Ok(code)
    }

    pub async fn verify(&mut self, sink: &dyn ProgressSink) -> CommandResult<VerificationReport> {
        self.enter(Operation::Verify, "Running verification...", sink)?;
        let result = match self.session.generated_code.as_deref() {
            Some(code) => Ok(self.verifier.verify(code, sink, &mut self.session.metrics).await),
            None => Err(missing("generated code")),
        };
        self.leave();

        let report = result?;
        self.store_report(&report).await;
        Ok(report)
    }

    /// Clear the session and release the browser
    pub async fn reset(&mut self) {
        self.session.clear();
        if let Some(browser) = self.browser.take() {
            fail_open("browser close", || browser.close()).await;
        }
        self.publish();
        info!("Session reset");
    }

    fn enter(&mut self, operation: Operation, message: &str, sink: &dyn ProgressSink) -> CommandResult<()> {
        let phase = begin(self.session.phase, operation, self.session.presence())?;
        debug!("Phase {} -> {}", self.session.phase, phase);
        self.session.phase = phase;
        self.publish();
        sink.emit(ProgressEvent::PhaseStart {
            phase: operation.label().to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    fn leave(&mut self) {
        self.session.phase = settle(self.session.phase);
        self.publish();
    }

    /// Requested round budget, capped by the configured limit
    fn rounds(&self, requested: Option<usize>) -> usize {
        let rounds = requested.unwrap_or(self.max_rounds);
        if rounds > self.round_limit {
            warn!("Requested {} rounds, capping at {}", rounds, self.round_limit);
        }
        rounds.min(self.round_limit)
    }

    async fn store_report(&mut self, report: &VerificationReport) {
        self.session.last_verification = Some(report.clone());
        if let Some(store) = &self.report_store {
            fail_open("latest report write", || store.save(report)).await;
        }
    }

    fn complete<T: Serialize>(&self, operation: Operation, result: CommandResult<T>, sink: &dyn ProgressSink) {
        let phase = operation.label();
        let event = match result.and_then(|artifact| {
            serde_json::to_value(&artifact)
                .map_err(|e| CommandError::Failed(format!("Failed to encode {} result: {}", phase, e)))
        }) {
            Ok(data) => ProgressEvent::PhaseComplete {
                phase: phase.to_string(),
                data,
                metrics: self.session.metrics.current(),
            },
            Err(error) => {
                warn!("{} failed: {}", phase, error);
                ProgressEvent::error(Some(phase), &error)
            }
        };
        sink.emit(event);
    }
}

fn missing(what: &str) -> PilotError {
    PilotError::Precondition(format!("Session has no {}", what))
}
