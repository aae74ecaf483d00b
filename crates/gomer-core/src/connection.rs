//! Connection lifecycle states.

use std::fmt;

/// State of the duplex connection. `Closed` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Handshake in progress.
    #[default]
    Connecting,
    /// Frames may be sent.
    Open,
    /// Closed by either side or by a socket error.
    Closed,
}

impl ConnectionState {
    /// Whether `send` is allowed.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether no further transition can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Short label for logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
