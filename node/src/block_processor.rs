//! The block processing pipeline.
//!
//! A single-consumer queue sits between the network/bootstrap producers and
//! the ledger. The consumer drains the queue in batches, applying every
//! block of a batch under one write transaction, the only write
//! transaction in the process. Gap results are parked in the persistent
//! unchecked table and remembered by the gap cache; forks open elections.

use crate::NodeError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch, Notify};
use vela_blocks::Block;
use vela_consensus::{ActiveElections, GapCache};
use vela_ledger::{Ledger, ProcessResult, ProcessReturn};
use vela_store::WriteTransaction;
use vela_utils::Stats;

/// Queue capacity; producers feel back-pressure beyond this.
const QUEUE_CAPACITY: usize = 8192;

/// Most blocks applied under one write transaction.
const BATCH_LIMIT: usize = 256;

/// Where a block entered the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOrigin {
    /// Live traffic (gossip or local submission): eligible for elections
    /// and rebroadcast.
    Live,
    /// Bootstrap replay: applied quietly.
    Bootstrap,
}

struct QueueItem {
    block: Block,
    force: bool,
    origin: BlockOrigin,
}

type Observer = Box<dyn Fn(&Block, &ProcessReturn, BlockOrigin) + Send + Sync>;

/// The serialized insertion pipeline between network and ledger.
pub struct BlockProcessor {
    ledger: Arc<Ledger>,
    active: Arc<ActiveElections>,
    gap_cache: Arc<GapCache>,
    stats: Arc<Stats>,
    sender: mpsc::Sender<QueueItem>,
    receiver: Mutex<Option<mpsc::Receiver<QueueItem>>>,
    /// Items enqueued but not yet fully processed; zero means idle.
    pending: AtomicUsize,
    idle: Notify,
    observers: Mutex<Vec<Observer>>,
}

impl BlockProcessor {
    pub fn new(
        ledger: Arc<Ledger>,
        active: Arc<ActiveElections>,
        gap_cache: Arc<GapCache>,
        stats: Arc<Stats>,
    ) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        Arc::new(Self {
            ledger,
            active,
            gap_cache,
            stats,
            sender,
            receiver: Mutex::new(Some(receiver)),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Observe every processed block after its transaction commits.
    pub fn add_observer(
        &self,
        observer: impl Fn(&Block, &ProcessReturn, BlockOrigin) + Send + Sync + 'static,
    ) {
        self.observers.lock().unwrap().push(Box::new(observer));
    }

    /// Queue a block; waits when the pipeline is saturated.
    pub async fn enqueue(&self, block: Block, force: bool, origin: BlockOrigin) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self
            .sender
            .send(QueueItem {
                block,
                force,
                origin,
            })
            .await
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Wait until the queue is empty and the consumer is idle.
    pub async fn flush(&self) {
        loop {
            // Register for the wakeup before checking, so a notification
            // between the check and the await is not lost.
            let notified = self.idle.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// The single consumer loop. Exactly one caller may run this.
    pub async fn run(self: Arc<Self>, mut stop: watch::Receiver<bool>) -> Result<(), NodeError> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| NodeError::Config("block processor already running".into()))?;

        loop {
            let first = tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return Ok(());
                    }
                    continue;
                }
                item = receiver.recv() => match item {
                    Some(item) => item,
                    None => return Ok(()),
                },
            };

            let mut batch = vec![first];
            while batch.len() < BATCH_LIMIT {
                match receiver.try_recv() {
                    Ok(item) => batch.push(item),
                    Err(_) => break,
                }
            }

            let drained = batch.len();
            let outcomes = self.process_batch(batch)?;
            for (block, outcome, origin) in &outcomes {
                for observer in self.observers.lock().unwrap().iter() {
                    observer(block, outcome, *origin);
                }
            }
            if self.pending.fetch_sub(drained, Ordering::SeqCst) == drained {
                self.idle.notify_waiters();
            }
        }
    }

    /// Apply one batch under a single write transaction.
    fn process_batch(
        &self,
        batch: Vec<QueueItem>,
    ) -> Result<Vec<(Block, ProcessReturn, BlockOrigin)>, NodeError> {
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut txn = self.ledger.store.begin_write()?;
        for item in batch {
            self.process_one(&mut txn, item.block, item.force, item.origin, &mut outcomes)?;
        }
        txn.commit()?;
        Ok(outcomes)
    }

    fn process_one(
        &self,
        txn: &mut WriteTransaction,
        block: Block,
        force: bool,
        origin: BlockOrigin,
        outcomes: &mut Vec<(Block, ProcessReturn, BlockOrigin)>,
    ) -> Result<(), NodeError> {
        let hash = block.hash();
        let outcome = self.ledger.process(txn, &block)?;
        match outcome.code {
            ProcessResult::Progress => {
                self.stats.increment("blocks_processed");
                if origin == BlockOrigin::Live {
                    self.active.start(block.clone(), |_| {});
                }
                outcomes.push((block.clone(), outcome, origin));
                // Anything parked behind this hash can now be applied.
                let children = self.ledger.store.unchecked_get(txn, &hash)?;
                if !children.is_empty() {
                    self.ledger.store.unchecked_del_all(txn, &hash)?;
                    for child in children {
                        self.process_one(txn, child, false, origin, outcomes)?;
                    }
                }
            }
            ProcessResult::GapPrevious => {
                self.stats.increment("blocks_gapped");
                self.ledger
                    .store
                    .unchecked_put(txn, &block.previous(), &block)?;
                self.gap_cache.add(&block);
                outcomes.push((block, outcome, origin));
            }
            ProcessResult::GapSource => {
                self.stats.increment("blocks_gapped");
                let source = block
                    .source()
                    .expect("gap_source only arises for source-bearing blocks");
                self.ledger.store.unchecked_put(txn, &source, &block)?;
                self.gap_cache.add(&block);
                outcomes.push((block, outcome, origin));
            }
            ProcessResult::Fork => {
                self.stats.increment("forks_observed");
                if force {
                    // A forced item evicts the incumbent chain segment.
                    if let Some(existing) = self.ledger.block_at_root(txn, &block.root())? {
                        self.ledger.rollback(txn, &existing.hash())?;
                    }
                    self.process_one(txn, block, false, origin, outcomes)?;
                } else if let Some(existing) = self.ledger.block_at_root(txn, &block.root())? {
                    tracing::info!(root = %block.root(), incumbent = %existing.hash(), challenger = %hash, "fork observed");
                    self.active.start(existing, |_| {});
                    outcomes.push((block, outcome, origin));
                }
            }
            ProcessResult::Old => {
                // Silently dropped; replays are routine.
            }
            ProcessResult::BadSignature => {
                self.stats.increment("bad_signature");
            }
            ProcessResult::NegativeSpend
            | ProcessResult::Unreceivable
            | ProcessResult::NotReceiveFromSend
            | ProcessResult::AccountMismatch
            | ProcessResult::OpenedBurnAccount => {
                tracing::debug!(block = %hash, code = ?outcome.code, "block rejected");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vela_blocks::{OpenBlock, ReceiveBlock, SendBlock};
    use vela_crypto::KeyPair;
    use vela_ledger::Genesis;
    use vela_store::Store;
    use vela_types::{Amount, Network, RawKey};

    struct Fixture {
        _dir: TempDir,
        store: Arc<Store>,
        ledger: Arc<Ledger>,
        processor: Arc<BlockProcessor>,
        genesis: Genesis,
        genesis_keys: KeyPair,
        stop: watch::Sender<bool>,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let ledger = Arc::new(Ledger::new(store.clone(), Network::Test));
        let genesis = Genesis::new(Network::Test);
        let mut txn = store.begin_write().unwrap();
        genesis.initialize(&store, &mut txn).unwrap();
        txn.commit().unwrap();

        let active = Arc::new(ActiveElections::new(ledger.clone()));
        let processor = BlockProcessor::new(
            ledger.clone(),
            active,
            Arc::new(GapCache::new()),
            Arc::new(Stats::default()),
        );
        let (stop, stop_rx) = watch::channel(false);
        tokio::spawn(processor.clone().run(stop_rx));

        Fixture {
            _dir: dir,
            store,
            ledger,
            processor,
            genesis,
            genesis_keys: KeyPair::from_private(Network::Test.genesis_key()),
            stop,
        }
    }

    #[tokio::test]
    async fn accepts_a_simple_chain() {
        let fx = fixture();
        let receiver = KeyPair::from_private(RawKey::new([40u8; 32]));
        let send = SendBlock::new(
            fx.genesis.hash(),
            receiver.public,
            Amount::new(u128::MAX - 12),
            &fx.genesis_keys.private,
            &fx.genesis_keys.public,
            0,
        );
        let open = OpenBlock::new(
            send.hash(),
            receiver.public,
            receiver.public,
            &receiver.private,
            &receiver.public,
            0,
        );

        fx.processor
            .enqueue(Block::Send(send), false, BlockOrigin::Live)
            .await;
        fx.processor
            .enqueue(Block::Open(open), false, BlockOrigin::Live)
            .await;
        fx.processor.flush().await;

        let txn = fx.store.begin_read().unwrap();
        assert_eq!(
            fx.ledger.account_balance(&txn, &receiver.public).unwrap(),
            Amount::new(12)
        );
        let _ = fx.stop.send(true);
    }

    /// Scenario: a receive arrives before its send. It parks under the
    /// missing source hash and is replayed when the send lands.
    #[tokio::test]
    async fn receive_before_send_waits_in_unchecked() {
        let fx = fixture();
        let receiver = KeyPair::from_private(RawKey::new([41u8; 32]));

        let fund = SendBlock::new(
            fx.genesis.hash(),
            receiver.public,
            Amount::new(u128::MAX - 50),
            &fx.genesis_keys.private,
            &fx.genesis_keys.public,
            0,
        );
        let open = OpenBlock::new(
            fund.hash(),
            receiver.public,
            receiver.public,
            &receiver.private,
            &receiver.public,
            0,
        );
        let second_send = SendBlock::new(
            fund.hash(),
            receiver.public,
            Amount::new(u128::MAX - 80),
            &fx.genesis_keys.private,
            &fx.genesis_keys.public,
            0,
        );
        let receive = ReceiveBlock::new(
            open.hash(),
            second_send.hash(),
            &receiver.private,
            &receiver.public,
            0,
        );

        fx.processor
            .enqueue(Block::Send(fund), false, BlockOrigin::Live)
            .await;
        fx.processor
            .enqueue(Block::Open(open), false, BlockOrigin::Live)
            .await;
        // The receive names a send the node has not seen yet.
        fx.processor
            .enqueue(Block::Receive(receive.clone()), false, BlockOrigin::Live)
            .await;
        fx.processor.flush().await;

        {
            let txn = fx.store.begin_read().unwrap();
            let waiting = fx.store.unchecked_get(&txn, &second_send.hash()).unwrap();
            assert_eq!(waiting.len(), 1);
            assert!(!fx.store.block_exists(&txn, &receive.hash()).unwrap());
        }

        // The missing send arrives; the parked receive replays.
        fx.processor
            .enqueue(Block::Send(second_send.clone()), false, BlockOrigin::Live)
            .await;
        fx.processor.flush().await;

        let txn = fx.store.begin_read().unwrap();
        assert!(fx.store.block_exists(&txn, &receive.hash()).unwrap());
        assert!(fx
            .store
            .unchecked_get(&txn, &second_send.hash())
            .unwrap()
            .is_empty());
        assert_eq!(
            fx.ledger.account_balance(&txn, &receiver.public).unwrap(),
            Amount::new(80)
        );
        let _ = fx.stop.send(true);
    }

    #[tokio::test]
    async fn forced_fork_replaces_incumbent() {
        let fx = fixture();
        let a = KeyPair::from_private(RawKey::new([42u8; 32]));
        let b = KeyPair::from_private(RawKey::new([43u8; 32]));

        let send_a = SendBlock::new(
            fx.genesis.hash(),
            a.public,
            Amount::new(u128::MAX - 10),
            &fx.genesis_keys.private,
            &fx.genesis_keys.public,
            0,
        );
        let send_b = SendBlock::new(
            fx.genesis.hash(),
            b.public,
            Amount::new(u128::MAX - 20),
            &fx.genesis_keys.private,
            &fx.genesis_keys.public,
            0,
        );

        fx.processor
            .enqueue(Block::Send(send_a.clone()), false, BlockOrigin::Live)
            .await;
        fx.processor.flush().await;
        fx.processor
            .enqueue(Block::Send(send_b.clone()), true, BlockOrigin::Live)
            .await;
        fx.processor.flush().await;

        let txn = fx.store.begin_read().unwrap();
        assert!(!fx.store.block_exists(&txn, &send_a.hash()).unwrap());
        assert!(fx.store.block_exists(&txn, &send_b.hash()).unwrap());
        let _ = fx.stop.send(true);
    }
}
