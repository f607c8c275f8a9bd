//! The peer set.
//!
//! Endpoints are always IPv6; IPv4 peers are stored v6-mapped. One mutex
//! guards the whole container and is never held across I/O; callers take
//! snapshots (`list`, `list_sqrt`, `representatives`) and send outside the
//! lock.

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use vela_types::Amount;

/// Everything tracked per peer.
#[derive(Clone, Debug)]
pub struct PeerInfo {
    pub endpoint: SocketAddrV6,
    pub last_contact: Instant,
    pub last_attempt: Instant,
    pub last_bootstrap_attempt: Option<Instant>,
    pub last_rep_request: Option<Instant>,
    pub last_rep_response: Option<Instant>,
    pub rep_weight: Amount,
    pub network_version: u8,
}

struct Inner {
    peers: HashMap<SocketAddrV6, PeerInfo>,
    /// Endpoints recently reached out to, for the once-per-period guard.
    attempts: HashMap<SocketAddrV6, Instant>,
}

/// Mutex-guarded container of known peers.
pub struct PeerContainer {
    inner: Mutex<Inner>,
    self_endpoint: SocketAddrV6,
}

/// Normalize any socket address to IPv6 (IPv4 becomes v6-mapped).
pub fn map_to_v6(address: SocketAddr) -> SocketAddrV6 {
    match address {
        SocketAddr::V6(v6) => v6,
        SocketAddr::V4(v4) => SocketAddrV6::new(v4.ip().to_ipv6_mapped(), v4.port(), 0, 0),
    }
}

impl PeerContainer {
    pub fn new(self_endpoint: SocketAddrV6) -> Self {
        Self {
            inner: Mutex::new(Inner {
                peers: HashMap::new(),
                attempts: HashMap::new(),
            }),
            self_endpoint,
        }
    }

    /// Addresses never stored: unspecified, multicast, documentation
    /// ranges, port zero, and the node's own endpoint.
    pub fn not_a_peer(&self, endpoint: &SocketAddrV6) -> bool {
        if endpoint.port() == 0 {
            return true;
        }
        let ip = *endpoint.ip();
        if ip.is_unspecified() || ip.is_multicast() {
            return true;
        }
        // 2001:db8::/32, the documentation range.
        let segments = ip.segments();
        if segments[0] == 0x2001 && segments[1] == 0x0db8 {
            return true;
        }
        if let Some(v4) = ip.to_ipv4_mapped() {
            // Documentation ranges: 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24.
            let octets = v4.octets();
            if matches!(
                (octets[0], octets[1], octets[2]),
                (192, 0, 2) | (198, 51, 100) | (203, 0, 113)
            ) {
                return true;
            }
            if v4.is_broadcast() || v4.is_multicast() || v4.is_unspecified() {
                return true;
            }
        }
        *endpoint == self.self_endpoint
    }

    /// Record traffic from a peer, inserting it if new. Returns whether the
    /// peer was newly added.
    pub fn contacted(&self, endpoint: SocketAddrV6, version: u8) -> bool {
        if self.not_a_peer(&endpoint) {
            return false;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.peers.get_mut(&endpoint) {
            Some(info) => {
                info.last_contact = now;
                info.network_version = version;
                false
            }
            None => {
                inner.peers.insert(
                    endpoint,
                    PeerInfo {
                        endpoint,
                        last_contact: now,
                        last_attempt: now,
                        last_bootstrap_attempt: None,
                        last_rep_request: None,
                        last_rep_response: None,
                        rep_weight: Amount::ZERO,
                        network_version: version,
                    },
                );
                true
            }
        }
    }

    /// Insert without marking contact. Returns whether the peer was new.
    pub fn insert(&self, endpoint: SocketAddrV6, version: u8) -> bool {
        self.contacted(endpoint, version)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn known(&self, endpoint: &SocketAddrV6) -> bool {
        self.inner.lock().unwrap().peers.contains_key(endpoint)
    }

    /// All peer endpoints in unspecified order.
    pub fn list(&self) -> Vec<SocketAddrV6> {
        self.inner.lock().unwrap().peers.keys().copied().collect()
    }

    /// Fill the keepalive slots with a uniform random sample.
    pub fn random_fill(&self, slots: &mut [SocketAddrV6]) {
        let mut endpoints = self.list();
        let mut rng = rand::thread_rng();
        endpoints.shuffle(&mut rng);
        let unspecified = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0);
        for (slot, endpoint) in slots
            .iter_mut()
            .zip(endpoints.into_iter().chain(std::iter::repeat(unspecified)))
        {
            *slot = endpoint;
        }
    }

    /// ⌈√n⌉ random peers, the gossip fan-out set.
    pub fn list_sqrt(&self) -> Vec<SocketAddrV6> {
        let endpoints = self.list();
        let count = (endpoints.len() as f64).sqrt().ceil() as usize;
        let mut rng = rand::thread_rng();
        endpoints
            .choose_multiple(&mut rng, count.max(1).min(endpoints.len()))
            .copied()
            .collect()
    }

    /// The top `count` peers by reported representative weight.
    pub fn representatives(&self, count: usize) -> Vec<PeerInfo> {
        let mut reps: Vec<PeerInfo> = self
            .inner
            .lock()
            .unwrap()
            .peers
            .values()
            .filter(|info| !info.rep_weight.is_zero())
            .cloned()
            .collect();
        reps.sort_by(|a, b| b.rep_weight.cmp(&a.rep_weight));
        reps.truncate(count);
        reps
    }

    pub fn rep_request(&self, endpoint: &SocketAddrV6) {
        if let Some(info) = self.inner.lock().unwrap().peers.get_mut(endpoint) {
            info.last_rep_request = Some(Instant::now());
        }
    }

    /// Record a voting response and the weight behind it.
    pub fn rep_response(&self, endpoint: &SocketAddrV6, weight: Amount) {
        if let Some(info) = self.inner.lock().unwrap().peers.get_mut(endpoint) {
            info.last_rep_response = Some(Instant::now());
            info.rep_weight = weight;
        }
    }

    /// The least recently bootstrapped peer, marking the attempt.
    pub fn bootstrap_peer(&self) -> Option<SocketAddrV6> {
        let mut inner = self.inner.lock().unwrap();
        let endpoint = inner
            .peers
            .values()
            .min_by_key(|info| info.last_bootstrap_attempt)
            .map(|info| info.endpoint)?;
        if let Some(info) = inner.peers.get_mut(&endpoint) {
            info.last_bootstrap_attempt = Some(Instant::now());
        }
        Some(endpoint)
    }

    /// Whether we should proactively contact `endpoint` now. At most one
    /// reachout per endpoint per `period`.
    pub fn reachout(&self, endpoint: SocketAddrV6, period: Duration) -> bool {
        if self.not_a_peer(&endpoint) {
            return false;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.attempts.get(&endpoint) {
            Some(last) if now.duration_since(*last) < period => false,
            _ => {
                inner.attempts.insert(endpoint, now);
                true
            }
        }
    }

    /// Evict peers silent for longer than `cutoff`, returning them.
    pub fn purge(&self, cutoff: Duration) -> Vec<PeerInfo> {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        let stale: Vec<SocketAddrV6> = inner
            .peers
            .values()
            .filter(|info| now.duration_since(info.last_contact) > cutoff)
            .map(|info| info.endpoint)
            .collect();
        let mut evicted = Vec::with_capacity(stale.len());
        for endpoint in stale {
            if let Some(info) = inner.peers.remove(&endpoint) {
                evicted.push(info);
            }
        }
        inner
            .attempts
            .retain(|_, last| now.duration_since(*last) <= cutoff);
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn endpoint(last: u8, port: u16) -> SocketAddrV6 {
        SocketAddrV6::new(Ipv6Addr::new(0xfc00, 0, 0, 0, 0, 0, 0, last as u16), port, 0, 0)
    }

    fn container() -> PeerContainer {
        PeerContainer::new(endpoint(0xFF, 40000))
    }

    #[test]
    fn v4_addresses_are_mapped() {
        let v4 = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 7000));
        let mapped = map_to_v6(v4);
        assert_eq!(mapped.port(), 7000);
        assert!(mapped.ip().to_ipv4_mapped().is_some());
    }

    #[test]
    fn reserved_addresses_rejected() {
        let peers = container();
        assert!(peers.not_a_peer(&SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 100, 0, 0)));
        assert!(peers.not_a_peer(&endpoint(1, 0))); // port 0
        assert!(peers.not_a_peer(&SocketAddrV6::new(
            Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1),
            100,
            0,
            0
        )));
        assert!(peers.not_a_peer(&SocketAddrV6::new(
            Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 1),
            100,
            0,
            0
        )));
        // The node's own endpoint.
        assert!(peers.not_a_peer(&endpoint(0xFF, 40000)));
        assert!(!peers.not_a_peer(&endpoint(1, 100)));
    }

    #[test]
    fn contacted_inserts_once() {
        let peers = container();
        assert!(peers.contacted(endpoint(1, 100), 4));
        assert!(!peers.contacted(endpoint(1, 100), 4));
        assert_eq!(peers.len(), 1);
    }

    #[test]
    fn random_fill_pads_with_unspecified() {
        let peers = container();
        peers.contacted(endpoint(1, 100), 4);
        peers.contacted(endpoint(2, 100), 4);

        let mut slots = [SocketAddrV6::new(Ipv6Addr::LOCALHOST, 1, 0, 0); 8];
        peers.random_fill(&mut slots);
        let real = slots.iter().filter(|s| !s.ip().is_unspecified()).count();
        assert_eq!(real, 2);
    }

    #[test]
    fn list_sqrt_size() {
        let peers = container();
        for n in 1..=16u8 {
            peers.contacted(endpoint(n, 100), 4);
        }
        assert_eq!(peers.list_sqrt().len(), 4);
    }

    #[test]
    fn representatives_ranked_by_weight() {
        let peers = container();
        for n in 1..=3u8 {
            peers.contacted(endpoint(n, 100), 4);
        }
        peers.rep_response(&endpoint(1, 100), Amount::new(10));
        peers.rep_response(&endpoint(2, 100), Amount::new(30));
        peers.rep_response(&endpoint(3, 100), Amount::new(20));

        let reps = peers.representatives(2);
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].endpoint, endpoint(2, 100));
        assert_eq!(reps[1].endpoint, endpoint(3, 100));
    }

    #[test]
    fn reachout_guard_is_per_period() {
        let peers = container();
        let target = endpoint(9, 100);
        assert!(peers.reachout(target, Duration::from_secs(60)));
        assert!(!peers.reachout(target, Duration::from_secs(60)));
        // A zero period always allows another attempt.
        assert!(peers.reachout(target, Duration::ZERO));
    }

    #[test]
    fn purge_evicts_silent_peers() {
        let peers = container();
        peers.contacted(endpoint(1, 100), 4);
        assert!(peers.purge(Duration::from_secs(60)).is_empty());
        std::thread::sleep(Duration::from_millis(2));
        let evicted = peers.purge(Duration::ZERO);
        assert_eq!(evicted.len(), 1);
        assert!(peers.is_empty());
    }

    #[test]
    fn bootstrap_peer_rotates() {
        let peers = container();
        peers.contacted(endpoint(1, 100), 4);
        peers.contacted(endpoint(2, 100), 4);
        let first = peers.bootstrap_peer().unwrap();
        let second = peers.bootstrap_peer().unwrap();
        assert_ne!(first, second);
    }
}
