use thiserror::Error;

/// Shown in the error panel when the room service cannot hand out a room.
pub const PROVISION_ERROR_MESSAGE: &str = "Error creating room";

/// Shown in the error panel when the widget refuses to join.
pub const JOIN_ERROR_MESSAGE: &str = "Incorrect room URL. Please check the link and try again.";

#[derive(Debug, Error)]
pub enum CallError {
    #[error("room provisioning failed: {0}")]
    Provision(String),
    #[error("join failed: {0}")]
    Join(JoinFailure),
    #[error("widget error: {0}")]
    Widget(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("no room available")]
    NoRoom,
}

/// Why a join attempt did not reach the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinFailure {
    #[error("no room url given")]
    MissingUrl,
    #[error("malformed room url: {0}")]
    MalformedUrl(String),
    #[error("widget rejected join: {0}")]
    Rejected(String),
}

impl CallError {
    /// Text for the error panel.
    pub fn user_message(&self) -> String {
        match self {
            CallError::Provision(_) | CallError::NoRoom => {
                PROVISION_ERROR_MESSAGE.to_string()
            }
            CallError::Join(_) | CallError::InvalidUrl(_) => JOIN_ERROR_MESSAGE.to_string(),
            CallError::Widget(msg) | CallError::Config(msg) => msg.clone(),
        }
    }
}

impl From<JoinFailure> for CallError {
    fn from(failure: JoinFailure) -> Self {
        CallError::Join(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provisioning_errors_map_to_fixed_message() {
        let err = CallError::Provision("status 500".into());
        assert_eq!(err.user_message(), "Error creating room");
        assert_eq!(CallError::NoRoom.user_message(), "Error creating room");
    }

    #[test]
    fn join_errors_map_to_join_message() {
        let err: CallError = JoinFailure::Rejected("room does not exist".into()).into();
        assert_eq!(err.user_message(), JOIN_ERROR_MESSAGE);
        assert!(err.to_string().contains("room does not exist"));
    }
}
