use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// No API key was configured; no network I/O was attempted.
    #[error("Error: OBSIDIAN_API_KEY not configured.")]
    Configuration,

    /// The companion app never answered the liveness probe and the request failed.
    #[error("Error: Obsidian is not reachable after {attempts} attempt(s): {message}")]
    Unreachable { attempts: u32, message: String },

    #[error("Error making request to Obsidian: {0}")]
    Transport(String),

    #[error("Error: Unauthorized. Check your OBSIDIAN_API_KEY.")]
    Unauthorized,

    #[error("Error: Resource not found.")]
    NotFound,

    /// Any other non-2xx response; the body is passed through verbatim.
    #[error("{body}")]
    Remote { status: u16, body: String },

    #[error("Error: invalid arguments: {0}")]
    InvalidArguments(String),
}

impl BridgeError {
    pub fn remote(status: u16, body: String) -> Self {
        let body = if body.trim().is_empty() {
            format!("Error: Obsidian returned HTTP {}", status)
        } else {
            body
        };
        Self::Remote { status, body }
    }

    /// HTTP status behind the error, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::NotFound => Some(404),
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
