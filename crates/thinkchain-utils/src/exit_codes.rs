//! Exit code constants and error mapping for thinkchain.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Every phase completed |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 5 | `FRAMEWORK_REJECTED` | Framework response missing or invalid |
//! | 6 | `PHASE_FAILED` | A phase exhausted its attempts |
//! | 10 | `PHASE_TIMEOUT` | A model call timed out |
//! | 70 | `LLM_FAILURE` | Model client failed (auth, quota, outage, transport) |

use crate::error::{ChainError, LlmError};

/// Exit codes matching the documented exit code table.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the numeric
/// value for `std::process::exit()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - every phase of the run completed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// The framework response could not be extracted or validated
    pub const FRAMEWORK_REJECTED: ExitCode = ExitCode(5);

    /// A phase ended in the failed state and the run stopped early
    pub const PHASE_FAILED: ExitCode = ExitCode(6);

    /// A model call exceeded the configured timeout
    pub const PHASE_TIMEOUT: ExitCode = ExitCode(10);

    /// The model client failed
    pub const LLM_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ChainError {
    /// Map this error onto the CLI exit code table.
    ///
    /// Extraction and schema errors only surface at this level when the
    /// framework response was rejected; phase-level failures are recorded on
    /// the phase instead.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Extraction(_) | Self::Schema(_) => ExitCode::FRAMEWORK_REJECTED,
            Self::Llm(llm_err) => match llm_err {
                LlmError::Timeout { .. } => ExitCode::PHASE_TIMEOUT,
                LlmError::Misconfiguration(_) | LlmError::Unsupported(_) => ExitCode::CLI_ARGS,
                LlmError::Transport(_)
                | LlmError::ProviderAuth(_)
                | LlmError::ProviderQuota(_)
                | LlmError::ProviderOutage(_)
                | LlmError::BudgetExceeded { .. } => ExitCode::LLM_FAILURE,
            },
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ExtractionError, SchemaError};
    use std::time::Duration;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::FRAMEWORK_REJECTED.as_i32(), 5);
        assert_eq!(ExitCode::PHASE_FAILED.as_i32(), 6);
        assert_eq!(ExitCode::PHASE_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::LLM_FAILURE.as_i32(), 70);
        assert_eq!(ExitCode::from_i32(6), ExitCode::PHASE_FAILED);
        assert_eq!(i32::from(ExitCode::from(70)), 70);
    }

    #[test]
    fn test_error_mapping() {
        let cases: Vec<(ChainError, ExitCode)> = vec![
            (
                ConfigError::MissingRequired("x".into()).into(),
                ExitCode::CLI_ARGS,
            ),
            (
                ExtractionError::MissingOpenMarker {
                    marker: "<framework>".into(),
                }
                .into(),
                ExitCode::FRAMEWORK_REJECTED,
            ),
            (SchemaError::EmptyFramework.into(), ExitCode::FRAMEWORK_REJECTED),
            (
                LlmError::Timeout {
                    duration: Duration::from_secs(5),
                }
                .into(),
                ExitCode::PHASE_TIMEOUT,
            ),
            (
                LlmError::ProviderAuth("401".into()).into(),
                ExitCode::LLM_FAILURE,
            ),
            (
                LlmError::Misconfiguration("no key".into()).into(),
                ExitCode::CLI_ARGS,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_exit_code(), expected, "for {err}");
        }
    }
}
