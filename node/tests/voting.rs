//! A representative node answers confirm_req with its vote over live UDP.

use std::time::Duration;
use tempfile::TempDir;
use vela_blocks::{Block, SendBlock};
use vela_crypto::KeyPair;
use vela_ledger::Genesis;
use vela_node::{Node, NodeConfig};
use vela_types::{Account, Amount, Network, GENESIS_AMOUNT};

#[tokio::test]
async fn confirm_req_is_answered_with_a_vote() {
    let rep_dir = TempDir::new().unwrap();
    let observer_dir = TempDir::new().unwrap();

    // The representative node votes with the genesis key, so its vote
    // carries the full supply's weight.
    let mut rep_config = NodeConfig::test(rep_dir.path());
    rep_config.representative_key = Some(hex::encode_upper(
        Network::Test.genesis_key().as_bytes(),
    ));
    let rep = Node::new(rep_config).await.unwrap();
    let observer = Node::new(NodeConfig::test(observer_dir.path())).await.unwrap();
    rep.start().await.unwrap();
    observer.start().await.unwrap();

    let mut rep_endpoint = rep.local_endpoint().unwrap();
    rep_endpoint.set_ip(std::net::Ipv6Addr::LOCALHOST);
    observer.peers.insert(rep_endpoint, 4);

    let genesis_keys = KeyPair::from_private(Network::Test.genesis_key());
    let genesis = Genesis::new(Network::Test);
    let block = Block::Send(SendBlock::new(
        genesis.hash(),
        Account::new([0x99; 32]),
        Amount::new(u128::MAX - 1),
        &genesis_keys.private,
        &genesis_keys.public,
        0,
    ));

    // Ask the network (i.e. the representative) to confirm the block.
    observer.gossip.confirm_req(&block).await;

    let mut voted = false;
    for _ in 0..250 {
        if observer.stats.get("votes_processed") > 0 {
            voted = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(voted, "no vote arrived from the representative");

    // The vote carried the representative's identity and full weight.
    let reps = observer.peers.representatives(1);
    assert_eq!(reps.len(), 1);
    assert_eq!(reps[0].rep_weight, GENESIS_AMOUNT);

    // The stored vote is the representative's sequence 1.
    let txn = observer.store.begin_read().unwrap();
    let stored = observer
        .store
        .vote_get(&txn, &genesis_keys.public)
        .unwrap()
        .expect("vote should be persisted");
    let vote = vela_consensus::Vote::deserialize(&stored).unwrap();
    assert_eq!(vote.account, genesis_keys.public);
    assert!(vote.verify());
    drop(txn);

    rep.stop().await;
    observer.stop().await;
}
