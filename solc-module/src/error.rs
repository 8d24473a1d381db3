use thiserror::Error;

/// Errors arising while linking or normalizing compiler output.
#[derive(Debug, Error)]
pub enum Error {
    /// A library address was not `0x`-prefixed, was longer than 20 bytes, or was not hex.
    #[error("Invalid address specified for {name}")]
    InvalidLibraryAddress { name: String },
    /// A library mapping entry had a shape other than `name: address` or
    /// `file: { name: address }`.
    #[error("Invalid library mapping for {name}")]
    InvalidLibraryMapping { name: String },
    #[error("Parse json error: {0}")]
    ParseJsonError(#[from] serde_json::error::Error),
    #[error("Top-level json must be an object")]
    ParseJsonObjError,
    #[error("Invalid version `{version}`")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },
}
