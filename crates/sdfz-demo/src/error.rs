//! Error types for demo reading.

use std::io;

/// Errors that can occur while reading a demo file.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// An I/O error other than running out of data.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The bytes are not a valid demo container: bad magic, unsupported
    /// version, impossible sizes or broken compression.
    #[error("corrupt demo: {detail}")]
    Corrupt {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The data ends before the point the header promised. The file is
    /// still being written or was truncated.
    #[error("incomplete demo: {detail}")]
    Incomplete {
        /// Human-readable description of what was being read.
        detail: String,
    },
    /// A single packet inside the stream could not be decoded. The stream
    /// reader counts these and carries on.
    #[error("malformed packet {packet_id}: {detail}")]
    MalformedPacket {
        /// First byte of the packet.
        packet_id: u8,
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The engine never assigned a game id (all sixteen bytes are zero).
    #[error("demo has no game id")]
    SentinelGameId,
}

impl DemoError {
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }

    pub(crate) fn incomplete(detail: impl Into<String>) -> Self {
        Self::Incomplete {
            detail: detail.into(),
        }
    }

    /// Classify an I/O error raised while reading `what`.
    ///
    /// Running out of bytes means the file is incomplete; decompression
    /// failures surface as invalid data and mean the container is corrupt.
    pub(crate) fn from_read(e: io::Error, what: &str) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Self::incomplete(format!("eof while reading {what}")),
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                Self::corrupt(format!("{what}: {e}"))
            }
            _ => Self::Io(e),
        }
    }

    /// Whether the error means the file may become readable later.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}
