//! Pure phase state machine for the session
//!
//! No I/O and no async. The orchestrator asks [`begin`] whether an operation
//! may start from the current phase given which artifacts exist, applies the
//! returned in-progress phase, runs the operation, and applies [`settle`]
//! whatever the outcome.

use pagepilot_core::Phase;

/// A phase operation the session can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Explore,
    Design,
    RefineDesign,
    Generate,
    RefineCode,
    Verify,
}

impl Operation {
    /// Phase held while the operation runs
    pub fn active_phase(&self) -> Phase {
        match self {
            Self::Explore => Phase::Exploring,
            Self::Design => Phase::Designing,
            Self::RefineDesign | Self::RefineCode => Phase::Refining,
            Self::Generate => Phase::Generating,
            Self::Verify => Phase::Verifying,
        }
    }

    /// Name used in `phase_start`, `phase_complete` and `error` events
    pub fn label(&self) -> &'static str {
        match self {
            Self::Explore => "exploration",
            Self::Design => "design",
            Self::RefineDesign => "design_refinement",
            Self::Generate => "generation",
            Self::RefineCode => "code_refinement",
            Self::Verify => "verification",
        }
    }
}

/// Which session artifacts currently exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    pub page_knowledge: bool,
    pub test_cases: bool,
    pub generated_code: bool,
}

/// Why an operation may not start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Another operation holds the session
    Busy(Phase),
    MissingPageKnowledge,
    MissingTestCases,
    MissingCode,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy(phase) => write!(f, "Session is busy ({})", phase),
            Self::MissingPageKnowledge => write!(f, "Must explore page first"),
            Self::MissingTestCases => write!(f, "Must design test cases first"),
            Self::MissingCode => write!(f, "Must generate code first"),
        }
    }
}

/// Decide whether `operation` may start
///
/// Returns the in-progress phase to enter, or the reason for rejection. On
/// rejection the caller leaves the phase untouched.
pub fn begin(current: Phase, operation: Operation, presence: Presence) -> Result<Phase, Rejection> {
    if !current.is_resting() {
        return Err(Rejection::Busy(current));
    }

    let satisfied = match operation {
        Operation::Explore => Ok(()),
        Operation::Design => require(presence.page_knowledge, Rejection::MissingPageKnowledge),
        Operation::RefineDesign | Operation::Generate => {
            require(presence.test_cases, Rejection::MissingTestCases)
        }
        Operation::RefineCode | Operation::Verify => {
            require(presence.generated_code, Rejection::MissingCode)
        }
    };

    satisfied.map(|()| operation.active_phase())
}

/// Phase to return to once an operation has finished, successfully or not
pub fn settle(_finished: Phase) -> Phase {
    Phase::Idle
}

fn require(present: bool, missing: Rejection) -> Result<(), Rejection> {
    if present {
        Ok(())
    } else {
        Err(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTHING: Presence = Presence {
        page_knowledge: false,
        test_cases: false,
        generated_code: false,
    };

    const EVERYTHING: Presence = Presence {
        page_knowledge: true,
        test_cases: true,
        generated_code: true,
    };

    #[test]
    fn test_explore_needs_nothing() {
        assert_eq!(begin(Phase::Idle, Operation::Explore, NOTHING), Ok(Phase::Exploring));
    }

    #[test]
    fn test_preconditions() {
        assert_eq!(
            begin(Phase::Idle, Operation::Design, NOTHING),
            Err(Rejection::MissingPageKnowledge)
        );
        assert_eq!(
            begin(Phase::Idle, Operation::Generate, Presence { page_knowledge: true, ..NOTHING }),
            Err(Rejection::MissingTestCases)
        );
        assert_eq!(
            begin(Phase::Idle, Operation::RefineDesign, NOTHING),
            Err(Rejection::MissingTestCases)
        );
        assert_eq!(
            begin(Phase::Idle, Operation::Verify, Presence { test_cases: true, ..NOTHING }),
            Err(Rejection::MissingCode)
        );
        assert_eq!(begin(Phase::Idle, Operation::RefineCode, NOTHING), Err(Rejection::MissingCode));
    }

    #[test]
    fn test_happy_path_phases() {
        assert_eq!(begin(Phase::Idle, Operation::Design, EVERYTHING), Ok(Phase::Designing));
        assert_eq!(begin(Phase::Idle, Operation::RefineDesign, EVERYTHING), Ok(Phase::Refining));
        assert_eq!(begin(Phase::Idle, Operation::Generate, EVERYTHING), Ok(Phase::Generating));
        assert_eq!(begin(Phase::Idle, Operation::RefineCode, EVERYTHING), Ok(Phase::Refining));
        assert_eq!(begin(Phase::Idle, Operation::Verify, EVERYTHING), Ok(Phase::Verifying));
    }

    #[test]
    fn test_busy_rejects_everything() {
        for op in [
            Operation::Explore,
            Operation::Design,
            Operation::RefineDesign,
            Operation::Generate,
            Operation::RefineCode,
            Operation::Verify,
        ] {
            assert_eq!(
                begin(Phase::Generating, op, EVERYTHING),
                Err(Rejection::Busy(Phase::Generating))
            );
        }
    }

    #[test]
    fn test_settle_always_rests() {
        for phase in [Phase::Exploring, Phase::Designing, Phase::Generating, Phase::Verifying, Phase::Refining] {
            assert!(settle(phase).is_resting());
        }
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(Rejection::MissingTestCases.to_string(), "Must design test cases first");
        assert_eq!(Rejection::Busy(Phase::Verifying).to_string(), "Session is busy (verifying)");
    }
}
