//! Error types for ledger-runtime

use ledger_store::StoreError;
use thiserror::Error;

/// Why the caller's identity was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    /// No identity record matches the caller
    NotRegistered,
    Revoked,
    /// ISSUED or BOUND; only `activateIdentity` is permitted
    ActivationRequired,
    /// The mapped participant does not exist
    ParticipantMissing,
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Invalid arguments \"{args}\" to function \"{function}\", expecting \"{expected}\"")]
    InvalidArguments {
        function: String,
        /// JSON rendering of the supplied arguments
        args: String,
        /// JSON rendering of the expected argument names
        expected: String,
    },

    #[error("Unsupported function \"{function}\" with arguments \"{args}\"")]
    UnsupportedFunction { function: String, args: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Could not determine the participant for identity '{identifier}'. The identity may be invalid or may have been revoked.")]
    IdentityInvalid {
        identifier: String,
        reason: IdentityRejection,
    },

    #[error("{0}")]
    Identity(String),

    #[error("{0}")]
    Resource(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Invalid business network archive: {0}")]
    Archive(String),

    #[error("Could not find any functions to execute for transaction {0}")]
    NoProcessors(String),

    #[error("Transaction processor '{function}' failed: {source}")]
    Processor {
        function: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Must call initialize before calling this function")]
    NotInitialized,

    #[error("The business network has been undeployed")]
    Undeployed,

    #[error("Call cancelled")]
    Cancelled,

    #[error("Call timed out after {0}ms")]
    TimedOut(u64),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RuntimeError {
    pub(crate) fn invalid_arguments(function: &str, args: &[String], expected: &[&str]) -> Self {
        Self::InvalidArguments {
            function: function.to_string(),
            args: render_json(args),
            expected: render_json(expected),
        }
    }

    pub(crate) fn unsupported_function(function: &str, args: &[String]) -> Self {
        Self::UnsupportedFunction {
            function: function.to_string(),
            args: render_json(args),
        }
    }

    /// True when the error is a storage "does not exist" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// True when the error is a storage "already exists" error.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_duplicate())
    }
}

fn render_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
