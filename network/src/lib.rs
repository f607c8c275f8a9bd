//! Peer-to-peer networking: the peer set, the UDP gossip socket, and
//! broadcast fan-out policies.

pub mod broadcast;
pub mod error;
pub mod peers;
pub mod udp;

pub use broadcast::Gossip;
pub use error::NetworkError;
pub use peers::{map_to_v6, PeerContainer, PeerInfo};
pub use udp::{InboundMessage, UdpService};
