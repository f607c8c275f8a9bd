//! Genesis construction and store initialization.

use crate::LedgerError;
use vela_blocks::{Block, OpenBlock};
use vela_crypto::KeyPair;
use vela_store::{AccountInfo, Store, WriteTransaction};
use vela_types::{Account, BlockHash, Network, Timestamp, GENESIS_AMOUNT};

/// The per-network genesis open block.
///
/// The block is derived from the network's genesis key rather than embedded
/// as serialized bytes. Its `source` is the genesis public key itself, a
/// hash that never exists in the store, and it carries no work nonce: it is
/// written directly at initialization and never crosses the network ingress
/// where work is checked.
pub struct Genesis {
    pub block: OpenBlock,
    pub account: Account,
}

impl Genesis {
    pub fn new(network: Network) -> Self {
        let keys = KeyPair::from_private(network.genesis_key());
        let block = OpenBlock::new(
            BlockHash::new(*keys.public.as_bytes()),
            keys.public,
            keys.public,
            &keys.private,
            &keys.public,
            0,
        );
        Self {
            block,
            account: keys.public,
        }
    }

    pub fn hash(&self) -> BlockHash {
        self.block.hash()
    }

    /// Write the genesis state: the open block, its account record, the
    /// frontier entry, full-supply representation, and the head checksum.
    /// A store that already holds the genesis account is left untouched.
    pub fn initialize(&self, store: &Store, txn: &mut WriteTransaction) -> Result<(), LedgerError> {
        if store.account_exists(txn, &self.account)? {
            return Ok(());
        }
        let hash = self.hash();
        store.block_put(txn, &hash, &Block::Open(self.block.clone()), BlockHash::ZERO)?;
        store.account_put(
            txn,
            &self.account,
            &AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: GENESIS_AMOUNT,
                modified: Timestamp::now().as_secs(),
                block_count: 1,
            },
        )?;
        store.frontier_put(txn, &hash, &self.account)?;
        store.representation_put(txn, &self.account, GENESIS_AMOUNT)?;
        store.checksum_put(txn, 0, 0, &hash)?;
        tracing::info!(genesis = %hash, "initialized genesis state");
        Ok(())
    }
}
