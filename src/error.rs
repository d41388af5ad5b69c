// src/error.rs
//! Error taxonomy for the image pane engine.
//!
//! All failures surface synchronously as `Result`s to the immediate caller;
//! nothing in this crate unwinds across the engine boundary. Retry policy,
//! if any, belongs to the caller.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A synchronization or startup resource could not be obtained.
    /// The pane is unusable when this is returned from construction or the
    /// startup handshake.
    #[error("resource unavailable: {0}")]
    Resource(String),

    /// A buffer or palette allocation failed. The operation aborts; if the
    /// image geometry was unchanged the previous buffer remains valid,
    /// otherwise the buffer is left unset.
    #[error("allocation of {requested} bytes failed")]
    Allocation { requested: usize },

    /// File open, short read, or short write while loading or saving the
    /// bitmap container. The in-memory image is untouched.
    #[error("bitmap i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// The operation needs an image buffer but none is set.
    #[error("no image buffer is set")]
    NoImage,
}

impl Error {
    /// Maps a failed `try_reserve` into the allocation error class.
    pub(crate) fn allocation(requested: usize) -> Self {
        Error::Allocation { requested }
    }
}
