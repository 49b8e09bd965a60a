use thiserror::Error;

macro_rules! analysis_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Analysis {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Analysis {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

pub(crate) use analysis_error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Only configuration problems and hard input errors surface as an [`Error`]. Structural
/// problems inside an IL function or its control flow graph are reported as
/// [`crate::analysis::AnalysisIssue`] values inside the analysis results instead, and
/// internal faults inside the timing validator or quality engine are converted into
/// invalid results at the component boundary.
///
/// # Error Categories
///
/// ## Configuration Errors
/// - [`Error::UnsupportedVariant`] - Unknown or unregistered processor variant
/// - [`Error::UnsupportedPlatform`] - Unknown target platform
/// - [`Error::VariantPlatformMismatch`] - Variant not available on the platform
/// - [`Error::InvalidConfiguration`] - Inconsistent option values
///
/// ## Input Errors
/// - [`Error::MissingInput`] - No function was supplied to an entry point
///
/// ## Analysis Errors
/// - [`Error::Analysis`] - Internal analysis fault, with source location
/// - [`Error::GraphError`] - Graph construction error
///
/// # Examples
///
/// ```rust
/// use ilscope::{timing::TimingOptions, Error};
///
/// match TimingOptions::for_target("c64", "z80") {
///     Err(Error::UnsupportedVariant(name)) => assert_eq!(name, "z80"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The requested processor variant is unknown or has no registered analyzer.
    ///
    /// Raised before any per-instruction work starts; the validator never silently
    /// falls back to a different variant.
    #[error("Unsupported processor variant - {0}")]
    UnsupportedVariant(String),

    /// The requested target platform is unknown.
    #[error("Unsupported target platform - {0}")]
    UnsupportedPlatform(String),

    /// The processor variant exists, but the platform does not ship with it.
    #[error("Processor variant {variant} is not available on platform {platform}")]
    VariantPlatformMismatch {
        /// The requested platform identifier
        platform: String,
        /// The requested variant identifier
        variant: String,
    },

    /// Option values contradict each other (e.g. zero stack size, negative weights).
    #[error("Invalid configuration - {0}")]
    InvalidConfiguration(String),

    /// A required input was not supplied.
    ///
    /// This is the hard input error of the orchestrator: asking it to analyse a program
    /// that holds no function yields this error and no partial result.
    #[error("Missing input - {0}")]
    MissingInput(String),

    /// An internal analysis fault.
    ///
    /// Raised by sub-analyses when their inputs are inconsistent with each other (for
    /// example, a control flow result that does not belong to the analysed function).
    /// The timing validator and the quality engine catch this error at their boundary.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the fault
    /// * `file` - Source file where the fault was detected
    /// * `line` - Source line where the fault was detected
    #[error("Analysis fault - {file}:{line}: {message}")]
    Analysis {
        /// The message to be printed for the fault
        message: String,
        /// The source file in which this fault occured
        file: &'static str,
        /// The source line in which this fault occured
        line: u32,
    },

    /// Graph construction error.
    ///
    /// Raised by the graph utilities when an edge references a node that does not exist.
    #[error("{0}")]
    GraphError(String),
}

impl Error {
    /// Returns `true` for errors caused by the supplied configuration.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedVariant(_)
                | Error::UnsupportedPlatform(_)
                | Error::VariantPlatformMismatch { .. }
                | Error::InvalidConfiguration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_error_macro_records_location() {
        let err = analysis_error!("block {} out of range", 7);
        match err {
            Error::Analysis {
                message,
                file,
                line,
            } => {
                assert_eq!(message, "block 7 out of range");
                assert!(file.ends_with("error.rs"));
                assert!(line > 0);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_configuration_classification() {
        assert!(Error::UnsupportedVariant("z80".into()).is_configuration());
        assert!(Error::VariantPlatformMismatch {
            platform: "c64".into(),
            variant: "65c02".into()
        }
        .is_configuration());
        assert!(!Error::MissingInput("function".into()).is_configuration());
        assert!(!Error::GraphError("x".into()).is_configuration());
    }
}
