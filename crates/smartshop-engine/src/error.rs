//! Error types for the SmartShop engine binary.
//!
//! [`EngineError`] is the top-level error that `main` propagates with `?`.
//! [`SinkError`] covers a single record that could not be encoded or
//! delivered; the sink logs it and moves on, it never reaches `main`.

use smartshop_types::Topic;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: smartshop_core::config::ConfigError,
    },

    /// NATS connection or flush failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },
}

/// Why one record was not published.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The payload body does not belong on the topic it was emitted to.
    #[error("payload shape does not match topic {topic}")]
    ShapeMismatch {
        /// Topic the payload was emitted to.
        topic: Topic,
    },

    /// JSON encoding failed.
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The transport rejected a publish or flush.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}
