//! Node wiring: constructs every subsystem and drives the timers.

use crate::block_processor::{BlockOrigin, BlockProcessor};
use crate::bootstrap::{BootstrapAttempt, BootstrapServer};
use crate::config::NodeConfig;
use crate::NodeError;
use std::net::{Ipv6Addr, SocketAddrV6, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use vela_consensus::{ActiveElections, GapCache, Vote, VoteCode, VoteProcessor};
use vela_crypto::derive_public_key;
use vela_ledger::{Genesis, Ledger, ProcessResult};
use vela_messages::{Message, VERSION_USING};
use vela_network::{map_to_v6, Gossip, InboundMessage, PeerContainer, UdpService};
use vela_store::Store;
use vela_types::{Account, Amount, RawKey};
use vela_utils::Stats;

/// Capacity of the inbound network channel.
const INBOUND_CAPACITY: usize = 4096;

/// A running vela node.
pub struct Node {
    pub config: NodeConfig,
    pub store: Arc<Store>,
    pub ledger: Arc<Ledger>,
    pub active: Arc<ActiveElections>,
    pub gap_cache: Arc<GapCache>,
    pub vote_processor: Arc<VoteProcessor>,
    pub processor: Arc<BlockProcessor>,
    pub peers: Arc<PeerContainer>,
    pub udp: Arc<UdpService>,
    pub gossip: Arc<Gossip>,
    pub stats: Arc<Stats>,
    bootstrap_server: Arc<BootstrapServer>,
    tcp_listener: Mutex<Option<TcpListener>>,
    tcp_port: u16,
    representative: Option<(Account, RawKey)>,
    online_weight: Amount,
    stop: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    /// Open the store, initialize genesis, and bind the sockets. Nothing
    /// runs until [`Node::start`].
    pub async fn new(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        let stats = Arc::new(Stats::default());
        let store = Arc::new(Store::open(&config.data_dir)?);
        let ledger = Arc::new(Ledger::new(store.clone(), config.network));

        {
            let mut txn = store.begin_write()?;
            Genesis::new(config.network).initialize(&store, &mut txn)?;
            txn.commit()?;
        }
        {
            let txn = store.begin_read()?;
            if !ledger.genesis_present(&txn)? {
                return Err(vela_ledger::LedgerError::MissingGenesis.into());
            }
        }

        let udp = Arc::new(UdpService::bind(config.network, config.port, stats.clone()).await?);
        let local = udp.local_endpoint()?;
        let tcp_listener = TcpListener::bind((Ipv6Addr::UNSPECIFIED, local.port())).await?;
        let tcp_port = tcp_listener.local_addr()?.port();

        let peers = Arc::new(PeerContainer::new(local));
        let gossip = Arc::new(Gossip::new(udp.clone(), peers.clone()));

        let active = Arc::new(ActiveElections::new(ledger.clone()));
        let online_weight = Amount::new(config.online_weight_raw as u128);
        active.set_online_weight(online_weight);

        let gap_cache = Arc::new(GapCache::new());
        let vote_processor = Arc::new(VoteProcessor::new(store.clone()));
        let processor = BlockProcessor::new(
            ledger.clone(),
            active.clone(),
            gap_cache.clone(),
            stats.clone(),
        );
        let bootstrap_server =
            BootstrapServer::new(ledger.clone(), processor.clone(), config.network);

        let representative = match &config.representative_key {
            Some(hex) => {
                let key = RawKey::decode_hex(hex)
                    .ok_or_else(|| NodeError::Config("bad representative key hex".into()))?;
                let account = derive_public_key(&key);
                Some((account, key))
            }
            None => None,
        };

        let (stop, _) = watch::channel(false);
        Ok(Arc::new(Self {
            config,
            store,
            ledger,
            active,
            gap_cache,
            vote_processor,
            processor,
            peers,
            udp,
            gossip,
            stats,
            bootstrap_server,
            tcp_listener: Mutex::new(Some(tcp_listener)),
            tcp_port,
            representative,
            online_weight,
            stop,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    pub fn local_endpoint(&self) -> Result<SocketAddrV6, NodeError> {
        Ok(self.udp.local_endpoint()?)
    }

    /// The TCP port the bootstrap server listens on.
    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    /// Spawn every long-lived task: the processor loop, the UDP receive and
    /// dispatch loops, the bootstrap server, and the timers.
    pub async fn start(self: &Arc<Self>) -> Result<(), NodeError> {
        let mut tasks = self.tasks.lock().unwrap();

        // Block processor consumer.
        {
            let processor = self.processor.clone();
            let stop = self.stop.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(error) = processor.run(stop).await {
                    tracing::error!(%error, "block processor stopped");
                }
            }));
        }

        // Rebroadcast freshly accepted live blocks.
        {
            let (tx, mut rx) = mpsc::unbounded_channel();
            self.processor.add_observer(move |block, outcome, origin| {
                if outcome.code == ProcessResult::Progress && origin == BlockOrigin::Live {
                    let _ = tx.send(block.clone());
                }
            });
            let gossip = self.gossip.clone();
            tasks.push(tokio::spawn(async move {
                while let Some(block) = rx.recv().await {
                    gossip.rebroadcast_block(&block).await;
                }
            }));
        }

        // UDP receive loop feeding the dispatcher.
        {
            let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
            let udp = self.udp.clone();
            let stop = self.stop.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(error) = udp.run(tx, stop).await {
                    tracing::error!(%error, "udp receive loop stopped");
                }
            }));
            let node = self.clone();
            tasks.push(tokio::spawn(node.dispatch_loop(rx)));
        }

        // Bootstrap server.
        {
            let listener = self
                .tcp_listener
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| NodeError::Config("node already started".into()))?;
            let server = self.bootstrap_server.clone();
            let stop = self.stop.subscribe();
            tasks.push(tokio::spawn(async move {
                if let Err(error) = server.run(listener, stop).await {
                    tracing::error!(%error, "bootstrap server stopped");
                }
            }));
        }

        // Election announcements.
        {
            let node = self.clone();
            let mut stop = self.stop.subscribe();
            let period = self.config.network.announcement_interval();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    tokio::select! {
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            match node.active.announce_round() {
                                Ok(round) => {
                                    for block in &round.announce {
                                        node.gossip.confirm_req(block).await;
                                    }
                                    for block in &round.confirmed {
                                        node.gossip.rebroadcast_block(block).await;
                                    }
                                }
                                Err(error) => tracing::warn!(%error, "announcement round failed"),
                            }
                        }
                    }
                }
            }));
        }

        // Keepalive, peer purge, and gap cache maintenance.
        {
            let node = self.clone();
            let mut stop = self.stop.subscribe();
            let period = self.config.network.keepalive_period();
            tasks.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                loop {
                    tokio::select! {
                        changed = stop.changed() => {
                            if changed.is_err() || *stop.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            node.gossip.keepalive_round().await;
                            let evicted = node.peers.purge(period * 5);
                            if !evicted.is_empty() {
                                tracing::debug!(count = evicted.len(), "purged silent peers");
                            }
                            node.gap_cache.purge_old();
                        }
                    }
                }
            }));
        }

        drop(tasks);

        // Greet preconfigured peers.
        for target in &self.config.preconfigured_peers {
            match target.to_socket_addrs() {
                Ok(resolved) => {
                    for address in resolved {
                        let endpoint = map_to_v6(address);
                        self.gossip
                            .reachout(endpoint, self.config.network.keepalive_period())
                            .await;
                    }
                }
                Err(error) => {
                    tracing::warn!(%target, %error, "could not resolve preconfigured peer")
                }
            }
        }

        tracing::info!(
            endpoint = %self.local_endpoint()?,
            network = self.config.network.as_str(),
            "node started"
        );
        Ok(())
    }

    /// Signal every loop to exit and wait for them.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        tracing::info!("node stopped");
    }

    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) {
        while let Some(inbound) = rx.recv().await {
            if let Err(error) = self.dispatch(inbound).await {
                tracing::debug!(%error, "dispatch failed");
            }
        }
    }

    /// Route one parsed message to the right subsystem.
    async fn dispatch(self: &Arc<Self>, inbound: InboundMessage) -> Result<(), NodeError> {
        let from = inbound.from;
        // Traffic claiming a reserved source (or our own endpoint) is
        // dropped before any subsystem sees it.
        if self.peers.not_a_peer(&from) {
            self.stats.increment("bad_sender");
            tracing::debug!(%from, "dropped message from invalid sender");
            return Ok(());
        }
        self.peers.contacted(from, VERSION_USING);
        match inbound.message {
            Message::Keepalive(endpoints) => {
                self.stats.increment("keepalives_received");
                for endpoint in endpoints {
                    self.gossip
                        .reachout(endpoint, self.config.network.keepalive_period())
                        .await;
                }
            }
            Message::Publish(block) => {
                self.processor
                    .enqueue(block, false, BlockOrigin::Live)
                    .await;
            }
            Message::ConfirmReq(block) => {
                self.processor
                    .enqueue(block.clone(), false, BlockOrigin::Live)
                    .await;
                if let Some((account, key)) = &self.representative {
                    let vote = {
                        let mut txn = self.store.begin_write()?;
                        let vote = self
                            .vote_processor
                            .generate(&mut txn, *account, key, block)?;
                        txn.commit()?;
                        vote
                    };
                    self.udp.send(&Message::ConfirmAck(vote.clone()), from).await?;
                    self.gossip.confirm_ack(&vote).await;
                }
            }
            Message::ConfirmAck(vote) => {
                self.handle_vote(vote, from).await?;
            }
            // Bulk transfers belong on TCP; over UDP they are noise.
            Message::FrontierReq { .. } | Message::BulkPull { .. } | Message::BulkPush => {
                self.stats.increment("malformed_message");
            }
        }
        Ok(())
    }

    async fn handle_vote(self: &Arc<Self>, vote: Vote, from: SocketAddrV6) -> Result<(), NodeError> {
        let result = {
            let mut txn = self.store.begin_write()?;
            let result = self.vote_processor.validate(&mut txn, &vote)?;
            txn.commit()?;
            result
        };
        match result.code {
            VoteCode::Invalid => {
                self.stats.increment("bad_signature");
                return Ok(());
            }
            VoteCode::Replay => {
                self.stats.increment("vote_replays");
            }
            VoteCode::Vote => {
                self.stats.increment("votes_processed");
            }
        }

        {
            let txn = self.store.begin_read()?;
            let weight = self.ledger.weight(&txn, &vote.account)?;
            self.peers.rep_response(&from, weight);
        }

        if let Some(winner) = self.active.vote(&vote)? {
            tracing::info!(winner = %winner.hash(), "election confirmed by vote");
        }

        if let Some(gap_hash) = self.gap_cache.vote(&self.ledger, self.online_weight, &vote)? {
            tracing::info!(block = %gap_hash, "bootstrapping toward voted gap block");
            self.spawn_bootstrap(Some(from));
        }
        Ok(())
    }

    /// Launch a bootstrap attempt toward `preferred` or the least recently
    /// tried peer. Frontier failures cycle to other peers.
    pub fn spawn_bootstrap(self: &Arc<Self>, preferred: Option<SocketAddrV6>) {
        let node = self.clone();
        let stop = self.stop.subscribe();
        tokio::spawn(async move {
            let mut candidates: Vec<SocketAddrV6> = preferred.into_iter().collect();
            candidates.extend(node.peers.bootstrap_peer());
            candidates.extend(node.peers.bootstrap_peer());
            for peer in candidates {
                // Bootstrap talks to the peer's TCP side on the same port.
                let attempt = BootstrapAttempt::new(
                    node.ledger.clone(),
                    node.processor.clone(),
                    node.config.network,
                    node.config.bootstrap_connections,
                    node.stats.clone(),
                );
                match attempt.run(peer, stop.clone()).await {
                    Ok(()) => return,
                    Err(error) => {
                        tracing::warn!(%peer, %error, "bootstrap attempt failed; trying next peer")
                    }
                }
            }
        });
    }
}
