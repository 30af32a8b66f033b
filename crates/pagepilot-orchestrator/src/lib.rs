//! Session orchestration for pagepilot
//!
//! Drives a web page through exploration, test design and test generation,
//! and verifies generated suites by running them until they pass or the
//! refinement budget runs out.
//!
//! # Architecture
//!
//! ```text
//! Command -> SessionHandle (queue) -> Orchestrator
//!                                        |
//!                   state machine gate --+-- phases (explore/design/generate/verify)
//!                                        |
//!                               generate -> CorrectionLoop
//!                                             |-> TestRunner -> parse_report
//!                                             '-> CodeRefiner (model rewrite)
//! ```
//!
//! Collaborators sit behind traits: `CompletionProvider` (pagepilot-agent),
//! `BrowserLauncher`/`BrowserDriver` (pagepilot-browser) and [`TestRunner`].
//! Each has a scripted mock for tests.

pub mod command;
pub mod error;
pub mod events;
pub mod loop_engine;
pub mod orchestrator;
pub mod phases;
pub mod prompt;
pub mod queue;
pub mod report;
pub mod runner;
pub mod session;
pub mod state_machine;

pub use command::{Command, CommandMessage};
pub use error::{CommandError, CommandResult, ErrorKind};
pub use events::{ProgressEvent, ProgressSink, RecordingSink};
pub use loop_engine::{CodeRefiner, CorrectionLoop, CorrectionOutcome, StopReason};
pub use orchestrator::{Collaborators, GenerationResult, Orchestrator};
pub use queue::{SessionHandle, SessionRequest};
pub use report::parse_report;
pub use runner::{execute_attempt, MockRunner, PytestRunner, RunOutput, TestRunner};
pub use session::{Session, SessionSnapshot};
pub use state_machine::{begin, settle, Operation, Presence, Rejection};
