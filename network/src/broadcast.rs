//! Broadcast fan-out policies.
//!
//! Ordinary publication reaches a √n sample of peers; freshly confirmed or
//! newly arrived blocks additionally reach the heaviest known
//! representatives so quorum forms quickly. Send failures are transient:
//! logged, counted against nothing, and skipped.

use crate::peers::PeerContainer;
use crate::udp::UdpService;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;
use vela_blocks::Block;
use vela_consensus::Vote;
use vela_messages::{Message, KEEPALIVE_PEERS};

/// How many top representatives get the extra rebroadcast.
const REBROADCAST_REPRESENTATIVES: usize = 8;

/// Fan-out policies bound to one socket and peer set.
pub struct Gossip {
    service: Arc<UdpService>,
    peers: Arc<PeerContainer>,
}

impl Gossip {
    pub fn new(service: Arc<UdpService>, peers: Arc<PeerContainer>) -> Self {
        Self { service, peers }
    }

    async fn send_to_many(&self, message: &Message, targets: &[SocketAddrV6]) {
        for target in targets {
            if let Err(error) = self.service.send(message, *target).await {
                tracing::debug!(%target, %error, "send failed");
            }
        }
    }

    /// Publish a block to a √n sample of peers.
    pub async fn flood_block(&self, block: &Block) {
        let targets = self.peers.list_sqrt();
        self.send_to_many(&Message::Publish(block.clone()), &targets).await;
    }

    /// Publish to the √n sample plus the heaviest representatives.
    pub async fn rebroadcast_block(&self, block: &Block) {
        let mut targets = self.peers.list_sqrt();
        for rep in self.peers.representatives(REBROADCAST_REPRESENTATIVES) {
            if !targets.contains(&rep.endpoint) {
                targets.push(rep.endpoint);
            }
        }
        self.send_to_many(&Message::Publish(block.clone()), &targets).await;
    }

    /// Solicit votes on a contested block from a √n sample.
    pub async fn confirm_req(&self, block: &Block) {
        let targets = self.peers.list_sqrt();
        for target in &targets {
            self.peers.rep_request(target);
        }
        self.send_to_many(&Message::ConfirmReq(block.clone()), &targets).await;
    }

    /// Broadcast this node's vote to a √n sample.
    pub async fn confirm_ack(&self, vote: &Vote) {
        let targets = self.peers.list_sqrt();
        self.send_to_many(&Message::ConfirmAck(vote.clone()), &targets).await;
    }

    /// One keepalive round: every known peer gets a random peer sample.
    pub async fn keepalive_round(&self) {
        let targets = self.peers.list();
        let mut slots = [SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0); KEEPALIVE_PEERS];
        self.peers.random_fill(&mut slots);
        let sample: Vec<SocketAddrV6> = slots
            .iter()
            .filter(|slot| !slot.ip().is_unspecified())
            .copied()
            .collect();
        self.send_to_many(&Message::Keepalive(sample), &targets).await;
    }

    /// Greet a newly learned endpoint, at most once per `period`.
    pub async fn reachout(&self, endpoint: SocketAddrV6, period: std::time::Duration) {
        if self.peers.reachout(endpoint, period) {
            let mut slots = [SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0); KEEPALIVE_PEERS];
            self.peers.random_fill(&mut slots);
            let sample: Vec<SocketAddrV6> = slots
                .iter()
                .filter(|slot| !slot.ip().is_unspecified())
                .copied()
                .collect();
            self.send_to_many(&Message::Keepalive(sample), &[endpoint]).await;
        }
    }
}
