//! Error types shared by the template compiler, the input openers and the
//! coordinator.

use std::io;
use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

/// Raised before startup, when the format string or the kill-set
/// list cannot be understood.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("marker `{marker}` is not a valid stream index: {source}")]
    Marker {
        marker: String,
        #[source]
        source: ParseIntError,
    },

    #[error("kill set entry `{token}` is not a stream index: {source}")]
    KillSet {
        token: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write rendered line: {0}")]
    Output(#[from] io::Error),
}
