//! Error types for the console host binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and demo playback.

/// Top-level error for the console host binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: duality_core::config::ConfigError,
    },

    /// A demo script failed validation.
    #[error("script error: {source}")]
    Script {
        /// The underlying script error.
        #[from]
        source: duality_core::script::ScriptError,
    },

    /// Playback construction failed.
    #[error("playback error: {source}")]
    Playback {
        /// The underlying playback error.
        #[from]
        source: duality_core::playback::PlaybackError,
    },
}
