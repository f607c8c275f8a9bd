//! Node errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Store(#[from] vela_store::StoreError),

    #[error(transparent)]
    Ledger(#[from] vela_ledger::LedgerError),

    #[error(transparent)]
    Consensus(#[from] vela_consensus::ConsensusError),

    #[error(transparent)]
    Network(#[from] vela_network::NetworkError),

    #[error("wire error: {0}")]
    Message(#[from] vela_messages::MessageError),

    #[error("block codec: {0}")]
    Block(#[from] vela_blocks::BlockError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote peer closed or misbehaved: {0}")]
    RemotePeer(String),
}
