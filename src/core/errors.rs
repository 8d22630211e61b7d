/*!
# Error System for the Blocks Decompiler

Failures that abort the decompilation of a whole file. Node-level
"unsupported syntax" never escapes the builder: it becomes a grey block.
*/

use crate::core::position::TextSpan;
use crate::diagnostics::codes;
use thiserror::Error;

/// Fatal or recoverable decompilation error
#[derive(Debug, Error)]
pub enum DecompileError {
    /// Syntax with no block representation. Caught per statement and
    /// turned into a grey block.
    #[error("unsupported syntax: {reason}")]
    Unsupported { reason: String, span: TextSpan },

    /// A construct that must decompile (enum, kind namespace) is malformed.
    #[error("{message}")]
    Structural { message: String, span: TextSpan },

    #[error("program too large to decompile: more than {limit} blocks")]
    TooLarge { limit: usize },

    /// Grey block produced while `errorOnGreyBlocks` is set.
    #[error("code cannot be represented as blocks: {reason}")]
    GreyBlock { reason: String, span: TextSpan },

    #[error("internal decompiler error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to write block markup: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl DecompileError {
    pub fn unsupported(reason: impl Into<String>, span: TextSpan) -> Self {
        Self::Unsupported {
            reason: reason.into(),
            span,
        }
    }

    pub fn structural(message: impl Into<String>, span: TextSpan) -> Self {
        Self::Structural {
            message: message.into(),
            span,
        }
    }

    /// Diagnostic code reported for this error
    pub fn code(&self) -> &'static str {
        match self {
            DecompileError::Unsupported { .. } => codes::UNSUPPORTED_SYNTAX,
            DecompileError::Structural { .. } => codes::STRUCTURAL_FAILURE,
            DecompileError::TooLarge { .. } => codes::PROGRAM_TOO_LARGE,
            DecompileError::GreyBlock { .. } => codes::GREY_BLOCK_IN_STRICT_MODE,
            DecompileError::Config(_) => codes::INVALID_CONFIGURATION,
            DecompileError::Internal(_) | DecompileError::Xml(_) => {
                codes::INTERNAL_ERROR
            }
        }
    }

    pub fn span(&self) -> Option<TextSpan> {
        match self {
            DecompileError::Unsupported { span, .. }
            | DecompileError::Structural { span, .. }
            | DecompileError::GreyBlock { span, .. } => Some(*span),
            _ => None,
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, DecompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let too_large = DecompileError::TooLarge { limit: 10 };
        let internal = DecompileError::Internal("boom".to_string());
        assert_eq!(too_large.code(), codes::PROGRAM_TOO_LARGE);
        assert_ne!(too_large.code(), internal.code());
        assert!(too_large.span().is_none());
    }

    #[test]
    fn test_structural_error_display() {
        let err = DecompileError::structural("Enum members must be literals", TextSpan::new(4, 9));
        assert_eq!(err.to_string(), "Enum members must be literals");
        assert_eq!(err.span(), Some(TextSpan::new(4, 9)));
    }
}
