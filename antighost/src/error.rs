//! Error types for anti-ghosting operations.
//!
//! Only structural problems are errors. Per-pixel numeric trouble (zeros,
//! negative or non-finite values) is sanitized where it is produced, and "no
//! ghosting found" is reported through [`crate::Outcome`], not through here.

use thiserror::Error;

use crate::frame::Dimensions;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Exposure stack is empty")]
    EmptyStack,

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: Dimensions,
        actual: Dimensions,
    },

    #[error("Degenerate input: {width}x{height} image has no area")]
    DegenerateInput { width: usize, height: usize },

    #[error("Unsupported channel count {channels}, expected 1 or 3")]
    UnsupportedChannelCount { channels: usize },

    #[error("Frame index {index} out of range for stack of {len}")]
    FrameIndexOutOfRange { index: usize, len: usize },

    #[error("Donor frame {index} is also the reference frame")]
    DonorIsReference { index: usize },

    #[error("Stack has no candidate donor for reference frame {reference}")]
    NoDonorCandidate { reference: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_error_message() {
        let err = Error::DimensionMismatch {
            what: "donor".to_string(),
            expected: Dimensions::new(640, 480, 3),
            actual: Dimensions::new(640, 400, 3),
        };
        let msg = err.to_string();
        assert!(msg.contains("donor"));
        assert!(msg.contains("640x480x3"));
        assert!(msg.contains("640x400x3"));
    }

    #[test]
    fn test_degenerate_input_error_message() {
        let err = Error::DegenerateInput {
            width: 0,
            height: 12,
        };
        assert_eq!(err.to_string(), "Degenerate input: 0x12 image has no area");
    }

    #[test]
    fn test_frame_index_error_message() {
        let err = Error::FrameIndexOutOfRange { index: 5, len: 3 };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_config_parse_keeps_source() {
        use std::error::Error as StdError;

        let yaml_err = serde_yml::from_str::<u32>("not a number").unwrap_err();
        let err = Error::from(yaml_err);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Failed to parse configuration"));
    }
}
