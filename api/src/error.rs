//! Error type of the device and type layer.
//!
//! The engine crate wraps this type in its own error enum (with a `#[from]`
//! conversion), so `?` moves errors up from the controller without
//! boilerplate. See [`thiserror`](https://docs.rs/thiserror) for how the
//! annotations below expand.

use std::io;
use thiserror::Error;

/// Error type used by the controller and buffer layers.
/// The `#[error]` tag generates the `Display` implementation; `#[from]`
/// generates the `From` conversions that make `?` work on `io::Error` and
/// `bincode::Error` inside this crate.
#[derive(Error, Debug)]
pub enum APIError {
    /// Error caused when performing IO on the backing image
    #[error("Issue using IO in the controller layer")]
    APIO(#[from] io::Error),
    /// Error caused when (de)serializing an on-disk record
    #[error("Issue with serialization in the controller layer")]
    APISerialize(#[from] bincode::Error),
    /// Invalid input to the controller layer
    #[error("Invalid controller input: {0}")]
    ControllerInput(&'static str),
    /// Invalid input to a buffer or block
    #[error("Invalid block input: {0}")]
    BlockInput(&'static str),

    /// Catch-all for errors that do not fit the variants above.
    /// Kept for client code that wants to funnel an `anyhow` context chain
    /// through the API result type; the library itself only produces the
    /// specific variants.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Generic alias for a `Result` with the error type `APIError`.
pub type Result<T> = std::result::Result<T, APIError>;
