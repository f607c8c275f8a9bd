//! Network errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("inbound channel closed")]
    ChannelClosed,
}
