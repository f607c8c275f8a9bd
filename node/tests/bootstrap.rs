//! Bootstrap convergence tests over real TCP sockets.

use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;
use vela_blocks::{Block, OpenBlock, SendBlock};
use vela_consensus::{ActiveElections, GapCache};
use vela_crypto::KeyPair;
use vela_ledger::{Genesis, Ledger};
use vela_node::{BlockProcessor, BootstrapAttempt, BootstrapServer};
use vela_store::Store;
use vela_types::{Amount, Network, RawKey};
use vela_utils::Stats;

struct Stack {
    _dir: TempDir,
    store: Arc<Store>,
    ledger: Arc<Ledger>,
    processor: Arc<BlockProcessor>,
    stats: Arc<Stats>,
    stop: watch::Sender<bool>,
}

async fn stack() -> Stack {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::open(dir.path()).unwrap());
    let ledger = Arc::new(Ledger::new(store.clone(), Network::Test));
    let mut txn = store.begin_write().unwrap();
    Genesis::new(Network::Test).initialize(&store, &mut txn).unwrap();
    txn.commit().unwrap();

    let active = Arc::new(ActiveElections::new(ledger.clone()));
    let stats = Arc::new(Stats::default());
    let processor = BlockProcessor::new(
        ledger.clone(),
        active,
        Arc::new(GapCache::new()),
        stats.clone(),
    );
    let (stop, stop_rx) = watch::channel(false);
    tokio::spawn(processor.clone().run(stop_rx));

    Stack {
        _dir: dir,
        store,
        ledger,
        processor,
        stats,
        stop,
    }
}

async fn serve(stack: &Stack) -> (SocketAddrV6, watch::Sender<bool>) {
    let listener = TcpListener::bind((Ipv6Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = BootstrapServer::new(
        stack.ledger.clone(),
        stack.processor.clone(),
        Network::Test,
    );
    let (stop, stop_rx) = watch::channel(false);
    tokio::spawn(server.run(listener, stop_rx));
    (SocketAddrV6::new(Ipv6Addr::LOCALHOST, port, 0, 0), stop)
}

/// Scenario: node 1 holds genesis → send → open; a fresh node 2 runs
/// frontier → pull and ends up byte-equivalent on accounts, counts, and
/// representation.
#[tokio::test]
async fn fresh_node_converges_via_pull() {
    let n1 = stack().await;
    let n2 = stack().await;
    let genesis_keys = KeyPair::from_private(Network::Test.genesis_key());
    let genesis = Genesis::new(Network::Test);
    let receiver = KeyPair::from_private(RawKey::new([100u8; 32]));

    let send = SendBlock::new(
        genesis.hash(),
        receiver.public,
        Amount::new(u128::MAX - 100),
        &genesis_keys.private,
        &genesis_keys.public,
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
    {
        let mut txn = n1.store.begin_write().unwrap();
        n1.ledger.process(&mut txn, &Block::Send(send)).unwrap();
        n1.ledger.process(&mut txn, &Block::Open(open)).unwrap();
        txn.commit().unwrap();
    }

    let (peer, _server_stop) = serve(&n1).await;
    let attempt = BootstrapAttempt::new(
        n2.ledger.clone(),
        n2.processor.clone(),
        Network::Test,
        4,
        n2.stats.clone(),
    );
    let (_stop, stop_rx) = watch::channel(false);
    attempt.run(peer, stop_rx).await.unwrap();
    n2.processor.flush().await;

    let txn1 = n1.store.begin_read().unwrap();
    let txn2 = n2.store.begin_read().unwrap();

    for account in [genesis_keys.public, receiver.public] {
        let info1 = n1.store.account_get(&txn1, &account).unwrap().unwrap();
        let info2 = n2.store.account_get(&txn2, &account).unwrap().unwrap();
        assert_eq!(info1.head, info2.head);
        assert_eq!(info1.open_block, info2.open_block);
        assert_eq!(info1.rep_block, info2.rep_block);
        assert_eq!(info1.balance, info2.balance);
        assert_eq!(info1.block_count, info2.block_count);
    }
    assert_eq!(
        n1.ledger.weight(&txn1, &receiver.public).unwrap(),
        n2.ledger.weight(&txn2, &receiver.public).unwrap()
    );
    assert_eq!(
        n2.ledger.weight(&txn2, &receiver.public).unwrap(),
        Amount::new(100)
    );
    assert_eq!(
        n1.store.block_count_total(&txn1).unwrap(),
        n2.store.block_count_total(&txn2).unwrap()
    );

    let _ = n1.stop.send(true);
    let _ = n2.stop.send(true);
}

/// A node that is ahead pushes its novel chains during the push phase, so
/// the stale server catches up too.
#[tokio::test]
async fn push_phase_uploads_local_novelties() {
    let ahead = stack().await;
    let behind = stack().await;
    let genesis_keys = KeyPair::from_private(Network::Test.genesis_key());
    let genesis = Genesis::new(Network::Test);
    let receiver = KeyPair::from_private(RawKey::new([101u8; 32]));

    // Only the "ahead" node knows this chain extension.
    let send = SendBlock::new(
        genesis.hash(),
        receiver.public,
        Amount::new(u128::MAX - 7),
        &genesis_keys.private,
        &genesis_keys.public,
        0,
    );
    let send_hash = send.hash();
    {
        let mut txn = ahead.store.begin_write().unwrap();
        ahead.ledger.process(&mut txn, &Block::Send(send)).unwrap();
        txn.commit().unwrap();
    }

    let (peer, _server_stop) = serve(&behind).await;
    let attempt = BootstrapAttempt::new(
        ahead.ledger.clone(),
        ahead.processor.clone(),
        Network::Test,
        2,
        ahead.stats.clone(),
    );
    let (_stop, stop_rx) = watch::channel(false);
    attempt.run(peer, stop_rx).await.unwrap();

    // Give the receiving processor a moment to drain the pushed stream.
    for _ in 0..50 {
        behind.processor.flush().await;
        let txn = behind.store.begin_read().unwrap();
        if behind.store.block_exists(&txn, &send_hash).unwrap() {
            break;
        }
        drop(txn);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let txn = behind.store.begin_read().unwrap();
    assert!(behind.store.block_exists(&txn, &send_hash).unwrap());

    // The unsynced queue drained.
    let txn = ahead.store.begin_read().unwrap();
    assert!(ahead
        .store
        .unsynced_iter(&txn)
        .unwrap()
        .next()
        .is_none());

    let _ = ahead.stop.send(true);
    let _ = behind.stop.send(true);
}
