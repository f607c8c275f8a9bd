//! Node-to-node wire protocol.
//!
//! Every message starts with an 8-byte header: two network magic bytes,
//! three protocol version bytes, a message type, and 16 extension bits.
//! Bits [11:8] of the extensions name the block variant for block-bearing
//! messages, so block payloads carry no inline tag. Gossip messages travel
//! over UDP; the frontier/bulk messages frame TCP streams.

pub mod error;
pub mod header;
pub mod message;
pub mod parser;

pub use error::MessageError;
pub use header::{MessageHeader, MessageType, HEADER_SIZE, VERSION_MAX, VERSION_MIN, VERSION_USING};
pub use message::{Message, KEEPALIVE_PEERS};
pub use parser::MessageParser;
