//! Exit code logic for the harvester process.

use std::process::ExitCode;

use harvester_core::pipeline::RunSummary;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    /// Every URL downloaded, or there was nothing to download.
    Success,
    /// Nothing downloaded and at least one URL failed, or setup failed.
    Failure,
    /// Some URLs downloaded and some failed.
    Partial,
    /// Stopped by Ctrl-C.
    Interrupted,
}

impl ProcessExit {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
            Self::Interrupted => 130,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Determines the process exit outcome from completed and failed download counts.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

pub(crate) fn exit_for_summary(summary: &RunSummary) -> ProcessExit {
    if summary.cancelled {
        return ProcessExit::Interrupted;
    }
    determine_exit_outcome(summary.succeeded, summary.unsuccessful())
}
