use std::sync::Arc;

use thiserror::Error;
use vapi_client::{ClientError, ConnectionState};

/// Errors that end a demo session
#[derive(Debug, Error)]
pub enum SessionError {
    /// The connection never reached [`ConnectionState::Connected`]
    #[error(
        "connecting to VPP failed ({state}){}",
        .source.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
    )]
    Connect {
        state: ConnectionState,
        #[source]
        source: Option<Arc<ClientError>>,
    },

    #[error("creating channel failed: {0}")]
    Channel(#[source] ClientError),

    #[error("checking compatibility failed: {0}")]
    Compatibility(#[source] ClientError),

    /// A request was rejected or went unanswered
    #[error("{operation}: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    /// A dump was aborted part way
    #[error("{operation}, err: {source}")]
    Dump {
        operation: &'static str,
        #[source]
        source: ClientError,
    },

    #[error("writing output failed: {0}")]
    Output(#[from] std::io::Error),

    #[error("encoding JSON failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn request(operation: &'static str) -> impl Fn(ClientError) -> Self {
        move |source| Self::Request { operation, source }
    }

    pub(crate) fn dump(operation: &'static str) -> impl Fn(ClientError) -> Self {
        move |source| Self::Dump { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use vapi_binapi::ApiError;

    use super::*;

    #[test]
    fn request_errors_name_the_operation() {
        let err = SessionError::request("creating loopback")(ClientError::Api(ApiError(-7)));
        assert_eq!(
            err.to_string(),
            "creating loopback: VPPApiError: Invalid value (-7)"
        );
    }

    #[test]
    fn connect_error_keeps_its_cause() {
        let err = SessionError::Connect {
            state: ConnectionState::Failed,
            source: Some(Arc::new(ClientError::NotConnected)),
        };
        assert_eq!(err.to_string(), "connecting to VPP failed (Failed): Not connected");
        assert!(std::error::Error::source(&err).is_some());
    }
}
