//! Error taxonomy for manifest translation.
//!
//! Every error aborts the whole translation; no partial pipeline or
//! manifest is ever returned. The engine has no I/O, so there are no
//! transient failures and nothing is retried.

use thiserror::Error;

/// Errors produced while translating an image description into a manifest.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested output format is not present in the catalog.
    #[error("invalid output format: {0}")]
    InvalidOutputFormat(String),

    /// The requested architecture is not present in the catalog.
    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),

    /// Hashing a user's plaintext password failed.
    #[error("failed to hash password for user '{user}'")]
    CredentialHashing { user: String },

    /// A build pipeline may not carry an assembler: a build environment
    /// is not an artifact producer.
    #[error("build pipeline must not produce an artifact")]
    BuildPipelineProducesArtifact,

    /// A stage that requires a non-empty input was constructed with an
    /// empty one.
    #[error("stage '{stage}' requires a non-empty '{field}'")]
    EmptyStageInput {
        stage: &'static str,
        field: &'static str,
    },

    /// A pipeline name was inserted into a manifest twice.
    #[error("duplicate pipeline name: {0}")]
    DuplicatePipeline(String),

    /// A blueprint file could not be read.
    #[error("failed to read blueprint")]
    BlueprintRead(#[from] std::io::Error),

    /// A blueprint document could not be parsed.
    #[error("failed to parse blueprint")]
    BlueprintParse(#[from] toml::de::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
