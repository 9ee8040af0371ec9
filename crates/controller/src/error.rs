//! Domain error taxonomy (§7), mapped to the wire-level `error.code` values
//! the message port renders (`trade_agg_port::ErrorCode`).

use thiserror::Error;
use trade_agg_port::ErrorCode;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),
    #[error("unknown command: {0}")]
    UnknownCmd(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("bad payload: {0}")]
    BadPayload(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ControllerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ControllerError::InvalidArg(_) => ErrorCode::InvalidArg,
            ControllerError::UnknownCmd(_) => ErrorCode::UnknownCmd,
            ControllerError::Unavailable(_) => ErrorCode::Unavailable,
            ControllerError::BadPayload(_) => ErrorCode::BadPayload,
            ControllerError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_arg_maps_to_invalid_arg_code() {
        let err = ControllerError::InvalidArg("bad timeframe".to_string());
        assert!(matches!(err.code(), ErrorCode::InvalidArg));
    }
}
