//! Error taxonomy shared across the client library.

use thiserror::Error;

/// Failures surfaced by the client library. Persistence corruption is not a
/// variant: a corrupt stored chat log is discarded and recovered from
/// silently at the controller.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable credentials/config. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or HTTP failure while talking to the hosted API. Recoverable;
    /// shown to the user, session state is preserved.
    #[error("failed to reach the AI service: {0}")]
    Transport(String),

    /// The structured-generation call itself failed. Recoverable.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The structured response was not valid JSON of the declared shape.
    #[error("could not parse the AI response: {0}")]
    SchemaParse(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
