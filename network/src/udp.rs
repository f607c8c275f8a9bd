//! The UDP gossip socket.
//!
//! One dedicated task owns the receive loop; datagrams are parsed inline
//! and handed to the node through a bounded channel. Parse failures bump a
//! counter and drop the datagram; the node never stops for bad input.

use crate::peers::map_to_v6;
use crate::NetworkError;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use vela_messages::{Message, MessageParser};
use vela_types::Network;
use vela_utils::Stats;

/// Largest datagram we accept; anything bigger than the widest message is
/// garbage.
const RECEIVE_BUFFER: usize = 512;

/// A parsed message plus its origin.
#[derive(Debug)]
pub struct InboundMessage {
    pub message: Message,
    pub from: SocketAddrV6,
}

/// The bound UDP socket and its parsing state.
pub struct UdpService {
    socket: UdpSocket,
    parser: MessageParser,
    stats: Arc<Stats>,
    network: Network,
}

impl UdpService {
    /// Bind on `[::]:port` (port 0 picks an ephemeral port, used by tests).
    pub async fn bind(network: Network, port: u16, stats: Arc<Stats>) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, port)).await?;
        Ok(Self {
            socket,
            parser: MessageParser::new(network),
            stats,
            network,
        })
    }

    pub fn local_endpoint(&self) -> Result<SocketAddrV6, NetworkError> {
        Ok(map_to_v6(self.socket.local_addr()?))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Serialize and send one message.
    pub async fn send(&self, message: &Message, to: SocketAddrV6) -> Result<(), NetworkError> {
        let bytes = message.serialize(self.network);
        self.socket.send_to(&bytes, to).await?;
        Ok(())
    }

    /// Receive until `stop` flips. Every inbound datagram either reaches the
    /// channel or increments a failure counter.
    pub async fn run(
        &self,
        inbound: mpsc::Sender<InboundMessage>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), NetworkError> {
        let mut buffer = [0u8; RECEIVE_BUFFER];
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    // A dropped sender means shutdown as well.
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }
                received = self.socket.recv_from(&mut buffer) => {
                    let (length, from) = received?;
                    let from = map_to_v6(from);
                    match self.parser.parse(&buffer[..length]) {
                        Ok(message) => {
                            if inbound
                                .send(InboundMessage { message, from })
                                .await
                                .is_err()
                            {
                                return Err(NetworkError::ChannelClosed);
                            }
                        }
                        Err(error) => {
                            self.stats.increment(error.counter());
                            tracing::debug!(%from, %error, "dropped datagram");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_flow_between_two_sockets() {
        let a = UdpService::bind(Network::Test, 0, Arc::new(Stats::default()))
            .await
            .unwrap();
        let b = UdpService::bind(Network::Test, 0, Arc::new(Stats::default()))
            .await
            .unwrap();

        let b_port = b.local_endpoint().unwrap().port();
        let to = SocketAddrV6::new(Ipv6Addr::LOCALHOST, b_port, 0, 0);

        let (tx, mut rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let receiver = tokio::spawn(async move { b.run(tx, stop_rx).await });

        a.send(&Message::Keepalive(Vec::new()), to).await.unwrap();

        let inbound = rx.recv().await.unwrap();
        assert!(matches!(inbound.message, Message::Keepalive(_)));
        assert_eq!(inbound.from.port(), a.local_endpoint().unwrap().port());
        receiver.abort();
    }

    #[tokio::test]
    async fn malformed_datagrams_are_counted_and_dropped() {
        let stats = Arc::new(Stats::default());
        let service = UdpService::bind(Network::Test, 0, stats.clone())
            .await
            .unwrap();
        let port = service.local_endpoint().unwrap().port();
        let to = SocketAddrV6::new(Ipv6Addr::LOCALHOST, port, 0, 0);

        let (tx, mut rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let service = Arc::new(service);
        let runner = service.clone();
        let receiver = tokio::spawn(async move { runner.run(tx, stop_rx).await });

        let raw = UdpSocket::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
        raw.send_to(&[0xDE, 0xAD], to).await.unwrap();
        // A valid message after the garbage proves the loop survived.
        service
            .send(&Message::Keepalive(Vec::new()), to)
            .await
            .unwrap();

        let inbound = rx.recv().await.unwrap();
        assert!(matches!(inbound.message, Message::Keepalive(_)));
        assert_eq!(stats.get("malformed_message"), 1);
        receiver.abort();
    }
}
