use thiserror::Error;

/// Generic message shown when a request fails below the protocol layer.
pub const TRANSPORT_FAILURE_MESSAGE: &str = "网络请求失败，请稍后重试";

pub type UiResult<T> = Result<T, UiError>;

/// Failures of the backend round-trips. Grammar and expression problems are
/// never reported through this type.
#[derive(Debug, Error)]
pub enum UiError {
    /// Envelope with `code != 0`.
    #[error("request rejected (code {code}): {msg}")]
    Protocol { code: i64, msg: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UiError {
    pub fn transport(reason: impl Into<String>) -> Self {
        UiError::Transport(reason.into())
    }

    /// Text for the end user: the server's message for protocol failures,
    /// a generic notice otherwise.
    pub fn user_message(&self) -> &str {
        match self {
            UiError::Protocol { msg, .. } if !msg.is_empty() => msg,
            UiError::Protocol { .. } => "请求失败",
            UiError::Transport(_) | UiError::Decode(_) => TRANSPORT_FAILURE_MESSAGE,
        }
    }
}
