//! Bootstrap: the catch-up protocol for lagging nodes.
//!
//! A client attempt runs three phases over TCP: compare frontiers, pull
//! divergent account chains (bounded concurrency, back-to-front streams),
//! then push chains the peer lacks. The server side answers frontier_req,
//! bulk_pull, and bulk_push on the same framing: an 8-byte message header,
//! then raw fixed-width records, with `not_a_block` terminating block
//! streams and an all-zero pair terminating frontier streams.

use crate::block_processor::{BlockOrigin, BlockProcessor};
use crate::NodeError;
use std::collections::VecDeque;
use std::net::SocketAddrV6;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use vela_blocks::{Block, BlockType};
use vela_ledger::Ledger;
use vela_messages::{Message, MessageHeader, MessageType, HEADER_SIZE};
use vela_types::{Account, BlockHash, Network, Timestamp};
use vela_utils::Stats;

/// Establishing a TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// A silent connection mid-stream is dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(15);
/// A hanging frontier stream restarts the attempt with a new peer.
const FRONTIER_TIMEOUT: Duration = Duration::from_secs(30);
/// A pull is retried this many times before being abandoned.
const MAX_PULL_ATTEMPTS: u32 = 3;
/// One pull connection is opened per this many queued pulls.
const PULLS_PER_CONNECTION: usize = 16;

/// One account chain to fetch.
#[derive(Clone, Debug)]
struct PullInfo {
    head: BlockHash,
    end: BlockHash,
    attempts: u32,
}

/// Progress of a bootstrap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapPhase {
    Idle,
    Frontier,
    Pulling,
    Pushing,
    Done,
}

async fn read_exact_timeout(
    stream: &mut TcpStream,
    buffer: &mut [u8],
    timeout: Duration,
) -> Result<(), NodeError> {
    tokio::time::timeout(timeout, stream.read_exact(buffer))
        .await
        .map_err(|_| NodeError::RemotePeer("read timed out".into()))??;
    Ok(())
}

/// Read one `{type, block}` stream element; `None` is the terminator.
async fn read_stream_block(stream: &mut TcpStream) -> Result<Option<Block>, NodeError> {
    let mut tag = [0u8; 1];
    read_exact_timeout(stream, &mut tag, IDLE_TIMEOUT).await?;
    let block_type = BlockType::from_u8(tag[0])
        .ok_or_else(|| NodeError::RemotePeer(format!("bad stream tag {}", tag[0])))?;
    if block_type == BlockType::NotABlock {
        return Ok(None);
    }
    let size = block_type
        .size()
        .ok_or_else(|| NodeError::RemotePeer("invalid block type in stream".into()))?;
    let mut payload = vec![0u8; size];
    read_exact_timeout(stream, &mut payload, IDLE_TIMEOUT).await?;
    let block = Block::deserialize(block_type, &payload)?;
    Ok(Some(block))
}

async fn write_stream_block(stream: &mut TcpStream, block: &Block) -> Result<(), NodeError> {
    stream.write_all(&block.serialize_with_type()).await?;
    Ok(())
}

async fn write_stream_terminator(stream: &mut TcpStream) -> Result<(), NodeError> {
    stream.write_all(&[BlockType::NotABlock.as_u8()]).await?;
    Ok(())
}

// ── Client ──────────────────────────────────────────────────────────────

/// One bootstrap run against one peer.
pub struct BootstrapAttempt {
    ledger: Arc<Ledger>,
    processor: Arc<BlockProcessor>,
    network: Network,
    connections: usize,
    stats: Arc<Stats>,
    phase: Mutex<BootstrapPhase>,
    pulls: Mutex<VecDeque<PullInfo>>,
}

impl BootstrapAttempt {
    pub fn new(
        ledger: Arc<Ledger>,
        processor: Arc<BlockProcessor>,
        network: Network,
        connections: usize,
        stats: Arc<Stats>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            processor,
            network,
            connections: connections.max(1),
            stats,
            phase: Mutex::new(BootstrapPhase::Idle),
            pulls: Mutex::new(VecDeque::new()),
        })
    }

    pub fn phase(&self) -> BootstrapPhase {
        *self.phase.lock().unwrap()
    }

    fn set_phase(&self, phase: BootstrapPhase) {
        *self.phase.lock().unwrap() = phase;
        tracing::info!(?phase, "bootstrap phase");
    }

    /// Run frontier → pull → push against `peer`. Any error leaves the
    /// attempt restartable with another peer.
    pub async fn run(
        self: Arc<Self>,
        peer: SocketAddrV6,
        stop: watch::Receiver<bool>,
    ) -> Result<(), NodeError> {
        self.set_phase(BootstrapPhase::Frontier);
        let (pulls, to_push) = self.frontier_phase(peer).await?;

        if !to_push.is_empty() {
            let mut txn = self.ledger.store.begin_write()?;
            for head in &to_push {
                self.ledger.store.unsynced_put(&mut txn, head)?;
            }
            txn.commit()?;
        }

        self.set_phase(BootstrapPhase::Pulling);
        self.clone().pull_phase(peer, pulls, stop.clone()).await;
        self.processor.flush().await;

        self.set_phase(BootstrapPhase::Pushing);
        self.push_phase(peer).await?;

        self.set_phase(BootstrapPhase::Done);
        Ok(())
    }

    async fn connect(&self, peer: SocketAddrV6) -> Result<TcpStream, NodeError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(peer))
            .await
            .map_err(|_| NodeError::RemotePeer("connect timed out".into()))??;
        Ok(stream)
    }

    /// Phase 1: stream the peer's frontiers and diff them against ours.
    async fn frontier_phase(
        &self,
        peer: SocketAddrV6,
    ) -> Result<(VecDeque<PullInfo>, Vec<BlockHash>), NodeError> {
        let mut stream = self.connect(peer).await?;
        let request = Message::FrontierReq {
            start: Account::ZERO,
            age: u32::MAX,
            count: u32::MAX,
        };
        stream.write_all(&request.serialize(self.network)).await?;

        // Sorted local snapshot for the two-pointer diff.
        let local: Vec<(Account, BlockHash)> = {
            let txn = self.ledger.store.begin_read()?;
            let mut out = Vec::new();
            for entry in self.ledger.store.accounts_iter(&txn)? {
                let (account, info) = entry?;
                out.push((account, info.head));
            }
            out
        };
        let mut local_index = 0;

        let mut pulls = VecDeque::new();
        let mut to_push = Vec::new();

        loop {
            let mut pair = [0u8; 64];
            read_exact_timeout(&mut stream, &mut pair, FRONTIER_TIMEOUT).await?;
            if pair.iter().all(|&byte| byte == 0) {
                break;
            }
            let mut account = [0u8; 32];
            account.copy_from_slice(&pair[0..32]);
            let account = Account::new(account);
            let mut head = [0u8; 32];
            head.copy_from_slice(&pair[32..64]);
            let head = BlockHash::new(head);

            // Accounts only we know about are push candidates.
            while local_index < local.len() && local[local_index].0 < account {
                to_push.push(local[local_index].1);
                local_index += 1;
            }

            if local_index < local.len() && local[local_index].0 == account {
                let local_head = local[local_index].1;
                local_index += 1;
                if local_head == head {
                    continue;
                }
                // Short-lived transaction: holding one across socket reads
                // would pin the snapshot for the whole stream.
                let have_remote_head = {
                    let txn = self.ledger.store.begin_read()?;
                    self.ledger.store.block_exists(&txn, &head)?
                };
                if have_remote_head {
                    // We are ahead of the peer on this chain.
                    to_push.push(local_head);
                } else {
                    pulls.push_back(PullInfo {
                        head,
                        end: local_head,
                        attempts: 0,
                    });
                }
            } else {
                pulls.push_back(PullInfo {
                    head,
                    end: BlockHash::ZERO,
                    attempts: 0,
                });
            }
        }
        while local_index < local.len() {
            to_push.push(local[local_index].1);
            local_index += 1;
        }

        tracing::info!(
            pulls = pulls.len(),
            pushes = to_push.len(),
            "frontier comparison complete"
        );
        Ok((pulls, to_push))
    }

    /// Phase 2: one task per pull, gated by a counting semaphore so only
    /// the targeted number of TCP connections is open at once.
    async fn pull_phase(
        self: Arc<Self>,
        peer: SocketAddrV6,
        pulls: VecDeque<PullInfo>,
        stop: watch::Receiver<bool>,
    ) {
        let queued = pulls.len();
        if queued == 0 {
            return;
        }
        *self.pulls.lock().unwrap() = pulls;

        // One connection per PULLS_PER_CONNECTION queued pulls, capped by
        // the configured limit.
        let permits = (queued / PULLS_PER_CONNECTION + 1).min(self.connections);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut tasks = JoinSet::new();
        loop {
            if *stop.borrow() {
                break;
            }
            let next = self.pulls.lock().unwrap().pop_front();
            let Some(pull) = next else {
                // The queue is dry, but an in-flight task may still requeue
                // a failed pull; wait for one before declaring the phase
                // finished.
                if tasks.join_next().await.is_none() {
                    break;
                }
                continue;
            };
            let attempt = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                match attempt.pull_one(peer, &pull).await {
                    Ok(count) => {
                        attempt.stats.increment("bootstrap_pulls");
                        tracing::debug!(head = %pull.head, blocks = count, "pull complete");
                    }
                    Err(error) => {
                        let mut retry = pull.clone();
                        retry.attempts += 1;
                        if retry.attempts < MAX_PULL_ATTEMPTS {
                            attempt.pulls.lock().unwrap().push_back(retry);
                        } else {
                            tracing::warn!(head = %pull.head, %error, "pull abandoned");
                        }
                    }
                }
            });
        }
        while tasks.join_next().await.is_some() {}
    }

    /// Pull one chain segment back-to-front and feed the processor.
    async fn pull_one(&self, peer: SocketAddrV6, pull: &PullInfo) -> Result<usize, NodeError> {
        let mut stream = self.connect(peer).await?;
        let request = Message::BulkPull {
            start: pull.head,
            end: pull.end,
        };
        stream.write_all(&request.serialize(self.network)).await?;

        let mut expected = pull.head;
        let mut count = 0;
        while let Some(block) = read_stream_block(&mut stream).await? {
            if block.hash() != expected {
                return Err(NodeError::RemotePeer("pull stream out of order".into()));
            }
            expected = block.previous();
            self.processor
                .enqueue(block, false, BlockOrigin::Bootstrap)
                .await;
            count += 1;
        }
        // A short stream means the peer stopped early; retry elsewhere.
        if expected != pull.end && !expected.is_zero() {
            return Err(NodeError::RemotePeer("pull ended before the target".into()));
        }
        Ok(count)
    }

    /// Phase 3: push every unsynced chain to the peer.
    async fn push_phase(&self, peer: SocketAddrV6) -> Result<(), NodeError> {
        let heads: Vec<BlockHash> = {
            let txn = self.ledger.store.begin_read()?;
            let mut out = Vec::new();
            for entry in self.ledger.store.unsynced_iter(&txn)? {
                out.push(entry?);
            }
            out
        };
        if heads.is_empty() {
            return Ok(());
        }

        // Collect every chain under one snapshot, then stream without a
        // transaction in scope.
        let blocks: Vec<Block> = {
            let txn = self.ledger.store.begin_read()?;
            let mut out = Vec::new();
            for head in &heads {
                let mut current = *head;
                while !current.is_zero() {
                    let Some(block) = self.ledger.store.block_get(&txn, &current)? else {
                        break;
                    };
                    current = block.previous();
                    out.push(block);
                }
            }
            out
        };

        let mut stream = self.connect(peer).await?;
        stream
            .write_all(&Message::BulkPush.serialize(self.network))
            .await?;
        for block in &blocks {
            write_stream_block(&mut stream, block).await?;
            self.stats.increment("bootstrap_pushes");
        }
        write_stream_terminator(&mut stream).await?;
        stream.flush().await?;

        let mut txn = self.ledger.store.begin_write()?;
        for head in &heads {
            self.ledger.store.unsynced_del(&mut txn, head)?;
        }
        txn.commit()?;
        Ok(())
    }
}

// ── Server ──────────────────────────────────────────────────────────────

/// Serves frontier_req, bulk_pull, and bulk_push to bootstrapping peers.
pub struct BootstrapServer {
    ledger: Arc<Ledger>,
    processor: Arc<BlockProcessor>,
    network: Network,
}

impl BootstrapServer {
    pub fn new(ledger: Arc<Ledger>, processor: Arc<BlockProcessor>, network: Network) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            processor,
            network,
        })
    }

    /// Accept loop; one task per connection.
    pub async fn run(
        self: Arc<Self>,
        listener: TcpListener,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), NodeError> {
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                }
                accepted = listener.accept() => {
                    let (stream, remote) = accepted?;
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(error) = server.handle_connection(stream).await {
                            tracing::debug!(%remote, %error, "bootstrap connection ended");
                        }
                    });
                }
            }
        }
    }

    /// Serve requests on one connection until the peer closes or idles out.
    async fn handle_connection(&self, mut stream: TcpStream) -> Result<(), NodeError> {
        loop {
            let mut header_bytes = [0u8; HEADER_SIZE];
            match tokio::time::timeout(IDLE_TIMEOUT, stream.read_exact(&mut header_bytes)).await {
                Err(_) => return Ok(()), // idle; drop quietly
                Ok(Err(_)) => return Ok(()), // closed
                Ok(Ok(_)) => {}
            }
            let header = MessageHeader::deserialize(self.network, &header_bytes)?;
            let payload_size = match header.message_type {
                MessageType::FrontierReq => 40,
                MessageType::BulkPull => 64,
                MessageType::BulkPush => 0,
                other => {
                    return Err(NodeError::RemotePeer(format!(
                        "unexpected {other:?} on a bootstrap connection"
                    )))
                }
            };
            let mut payload = vec![0u8; payload_size];
            if payload_size > 0 {
                read_exact_timeout(&mut stream, &mut payload, IDLE_TIMEOUT).await?;
            }
            let mut full = header_bytes.to_vec();
            full.extend_from_slice(&payload);
            match Message::deserialize(self.network, &full)? {
                Message::FrontierReq { start, age, count } => {
                    self.serve_frontiers(&mut stream, start, age, count).await?;
                }
                Message::BulkPull { start, end } => {
                    self.serve_bulk_pull(&mut stream, start, end).await?;
                }
                Message::BulkPush => {
                    self.receive_push(&mut stream).await?;
                }
                _ => unreachable!("type gated above"),
            }
        }
    }

    /// Stream `{account, head}` pairs in ascending account order.
    async fn serve_frontiers(
        &self,
        stream: &mut TcpStream,
        start: Account,
        age: u32,
        count: u32,
    ) -> Result<(), NodeError> {
        let now = Timestamp::now().as_secs();
        let mut sent: u32 = 0;
        // Collect under the read transaction, send outside it.
        let frontiers: Vec<(Account, BlockHash)> = {
            let txn = self.ledger.store.begin_read()?;
            let mut out = Vec::new();
            for entry in self.ledger.store.accounts_begin(&txn, &start)? {
                let (account, info) = entry?;
                if age != u32::MAX && now.saturating_sub(info.modified) > age as u64 {
                    continue;
                }
                out.push((account, info.head));
                if out.len() as u32 >= count {
                    break;
                }
            }
            out
        };
        for (account, head) in frontiers {
            stream.write_all(account.as_bytes()).await?;
            stream.write_all(head.as_bytes()).await?;
            sent += 1;
        }
        stream.write_all(&[0u8; 64]).await?;
        stream.flush().await?;
        tracing::debug!(frontiers = sent, "served frontier request");
        Ok(())
    }

    /// Stream a chain back-to-front from `start` until `end` (exclusive).
    async fn serve_bulk_pull(
        &self,
        stream: &mut TcpStream,
        start: BlockHash,
        end: BlockHash,
    ) -> Result<(), NodeError> {
        let blocks: Vec<Block> = {
            let txn = self.ledger.store.begin_read()?;
            let mut out = Vec::new();
            let mut current = start;
            while !current.is_zero() && current != end {
                match self.ledger.store.block_get(&txn, &current)? {
                    Some(block) => {
                        current = block.previous();
                        out.push(block);
                    }
                    None => break,
                }
            }
            out
        };
        for block in &blocks {
            write_stream_block(stream, block).await?;
        }
        write_stream_terminator(stream).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Accept a pushed stream of blocks into the processor.
    async fn receive_push(&self, stream: &mut TcpStream) -> Result<(), NodeError> {
        while let Some(block) = read_stream_block(stream).await? {
            self.processor
                .enqueue(block, false, BlockOrigin::Bootstrap)
                .await;
        }
        Ok(())
    }
}
