//! Schema migrations.
//!
//! The schema version lives at meta key 1 and defaults to 1 when absent.
//! Upgrades run as sequential fall-through steps, one write transaction
//! each, with the version cell written before the data rewrite so a crash
//! re-runs only the unfinished step. Every step is idempotent: it inspects
//! record shapes and skips anything already in the new form, which also
//! makes a fresh (empty) database race through all steps to the current
//! version.

use crate::account::ACCOUNT_INFO_SIZE;
use crate::blocks_info::{BlockInfo, BLOCK_INFO_INTERVAL};
use crate::pending::{PendingInfo, PendingKey};
use crate::transaction::{Readable, WriteTransaction};
use crate::{Store, StoreError};
use vela_blocks::Block;
use vela_types::{Account, Amount, BlockHash, GENESIS_AMOUNT};

/// The live schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 10;

/// Account record size before v2 added `open_block`.
const ACCOUNT_INFO_V1_SIZE: usize = 88;
/// Account record size before v6 added `block_count`.
const ACCOUNT_INFO_V5_SIZE: usize = 120;

/// Legacy pending value: source(32) ‖ amount(16) ‖ destination(32), keyed by
/// send hash alone.
const PENDING_V3_VALUE_SIZE: usize = 80;

pub(crate) fn migrate(store: &Store) -> Result<(), StoreError> {
    loop {
        let mut txn = store.begin_write()?;
        let version = store.version_get(&txn)?.unwrap_or(1);
        if version == CURRENT_SCHEMA_VERSION {
            txn.abort();
            return Ok(());
        }
        if version > CURRENT_SCHEMA_VERSION {
            txn.abort();
            return Err(StoreError::VersionFromFuture(version));
        }

        tracing::info!(from = version, to = version + 1, "upgrading database schema");
        store.version_put(&mut txn, version + 1)?;
        match version {
            1 => upgrade_v1_to_v2(store, &mut txn)?,
            2 => upgrade_v2_to_v3(store, &mut txn)?,
            3 => upgrade_v3_to_v4(store, &mut txn)?,
            4 => upgrade_v4_to_v5(store, &mut txn)?,
            5 => upgrade_v5_to_v6(store, &mut txn)?,
            6 | 7 => upgrade_recreate_unchecked(store, &mut txn)?,
            8 => upgrade_v8_to_v9(store, &mut txn)?,
            9 => upgrade_v9_to_v10(store, &mut txn)?,
            _ => unreachable!("version bounds checked above"),
        }
        txn.commit()?;
    }
}

fn raw_accounts(store: &Store, txn: &impl Readable) -> Result<Vec<(Account, Vec<u8>)>, StoreError> {
    let mut out = Vec::new();
    for entry in store.accounts.iter(txn.ro())? {
        let (key, value) = entry?;
        let mut account = [0u8; 32];
        account.copy_from_slice(key);
        out.push((Account::new(account), value.to_vec()));
    }
    Ok(out)
}

fn record_head(value: &[u8]) -> BlockHash {
    let mut head = [0u8; 32];
    head.copy_from_slice(&value[0..32]);
    BlockHash::new(head)
}

/// Walk `previous` links from `head` down to the chain's first block.
fn chain_origin(
    store: &Store,
    txn: &impl Readable,
    head: &BlockHash,
) -> Result<BlockHash, StoreError> {
    let mut current = *head;
    loop {
        let block = store
            .block_get(txn, &current)?
            .ok_or_else(|| StoreError::corrupt("accounts", "chain walk hit a missing block"))?;
        let previous = block.previous();
        if previous.is_zero() {
            return Ok(current);
        }
        current = previous;
    }
}

/// Walk back from `head` to the most recent block carrying a representative.
fn representative_block(
    store: &Store,
    txn: &impl Readable,
    head: &BlockHash,
) -> Result<BlockHash, StoreError> {
    let mut current = *head;
    loop {
        let block = store
            .block_get(txn, &current)?
            .ok_or_else(|| StoreError::corrupt("accounts", "chain walk hit a missing block"))?;
        if block.representative().is_some() {
            return Ok(current);
        }
        current = block.previous();
    }
}

/// Balance after the block at `hash`: walk back accumulating receive
/// amounts until a block with an explicit balance (send) or the chain
/// origin (open).
fn balance_at(store: &Store, txn: &impl Readable, hash: &BlockHash) -> Result<Amount, StoreError> {
    let mut received = Amount::ZERO;
    let mut current = *hash;
    loop {
        let block = store
            .block_get(txn, &current)?
            .ok_or_else(|| StoreError::corrupt("blocks", "balance walk hit a missing block"))?;
        match block {
            Block::Send(b) => return Ok(received.saturating_add(b.balance)),
            Block::Receive(b) => {
                received = received.saturating_add(source_amount(store, txn, &b.source)?);
                current = b.previous;
            }
            Block::Open(b) => {
                return Ok(received.saturating_add(source_amount(store, txn, &b.source)?))
            }
            Block::Change(b) => current = b.previous,
        }
    }
}

/// Amount carried by the send at `source`. The genesis open references a
/// source that predates the store; that resolves to the full supply.
fn source_amount(
    store: &Store,
    txn: &impl Readable,
    source: &BlockHash,
) -> Result<Amount, StoreError> {
    match store.block_get(txn, source)? {
        None => Ok(GENESIS_AMOUNT),
        Some(Block::Send(send)) => {
            let before = balance_at(store, txn, &send.previous)?;
            Ok(before.saturating_sub(send.balance))
        }
        Some(_) => Err(StoreError::corrupt("blocks", "source is not a send")),
    }
}

/// v1→v2: compute and store `open_block` for each account by walking back
/// from `head`.
fn upgrade_v1_to_v2(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    for (account, value) in raw_accounts(store, txn)? {
        if value.len() != ACCOUNT_INFO_V1_SIZE {
            continue;
        }
        let head = record_head(&value);
        let open_block = chain_origin(store, txn, &head)?;
        let mut new_value = Vec::with_capacity(ACCOUNT_INFO_V5_SIZE);
        new_value.extend_from_slice(&value[0..64]); // head, rep_block
        new_value.extend_from_slice(open_block.as_bytes());
        new_value.extend_from_slice(&value[64..88]); // balance, modified
        store.accounts.put(&mut txn.0, account.as_bytes(), &new_value)?;
    }
    Ok(())
}

/// v2→v3: recompute `rep_block` for every account and rebuild the
/// representation table from scratch.
fn upgrade_v2_to_v3(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    store.representation_clear(txn)?;
    for (account, mut value) in raw_accounts(store, txn)? {
        if value.len() < ACCOUNT_INFO_V5_SIZE {
            continue;
        }
        let head = record_head(&value);
        let rep_block = representative_block(store, txn, &head)?;
        value[32..64].copy_from_slice(rep_block.as_bytes());
        store.accounts.put(&mut txn.0, account.as_bytes(), &value)?;

        let mut balance = [0u8; 16];
        balance.copy_from_slice(&value[96..112]);
        let balance = Amount::from_be_bytes(balance);
        let rep = store
            .block_get(txn, &rep_block)?
            .and_then(|b| b.representative())
            .ok_or_else(|| StoreError::corrupt("accounts", "rep_block has no representative"))?;
        store.representation_add(txn, &rep, balance)?;
    }
    Ok(())
}

/// v3→v4: re-key pending from `send-hash → {source, amount, destination}`
/// to `{destination, send-hash} → {source, amount}`.
fn upgrade_v3_to_v4(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    let mut legacy = Vec::new();
    for entry in store.pending.iter(txn.ro())? {
        let (key, value) = entry?;
        if key.len() == 32 && value.len() == PENDING_V3_VALUE_SIZE {
            legacy.push((key.to_vec(), value.to_vec()));
        }
    }
    for (key, value) in legacy {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&key);
        let mut source = [0u8; 32];
        source.copy_from_slice(&value[0..32]);
        let mut amount = [0u8; 16];
        amount.copy_from_slice(&value[32..48]);
        let mut destination = [0u8; 32];
        destination.copy_from_slice(&value[48..80]);

        store.pending.delete(&mut txn.0, &key)?;
        store.pending_put(
            txn,
            &PendingKey::new(Account::new(destination), BlockHash::new(hash)),
            &PendingInfo {
                source: Account::new(source),
                amount: Amount::from_be_bytes(amount),
            },
        )?;
    }
    Ok(())
}

/// v4→v5: fill missing successor links on each chain.
fn upgrade_v4_to_v5(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    for (_, value) in raw_accounts(store, txn)? {
        if value.len() < 32 {
            continue;
        }
        let mut current = record_head(&value);
        loop {
            let block = store
                .block_get(txn, &current)?
                .ok_or_else(|| StoreError::corrupt("blocks", "successor walk hit a missing block"))?;
            let previous = block.previous();
            if previous.is_zero() {
                break;
            }
            store.block_successor_set(txn, &previous, &current)?;
            current = previous;
        }
    }
    Ok(())
}

/// v5→v6: add `block_count` to every account record by walking its chain.
fn upgrade_v5_to_v6(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    for (account, value) in raw_accounts(store, txn)? {
        if value.len() != ACCOUNT_INFO_V5_SIZE {
            continue;
        }
        let head = record_head(&value);
        let mut count: u64 = 0;
        let mut current = head;
        while !current.is_zero() {
            let block = store
                .block_get(txn, &current)?
                .ok_or_else(|| StoreError::corrupt("blocks", "count walk hit a missing block"))?;
            count += 1;
            current = block.previous();
        }
        let mut new_value = Vec::with_capacity(ACCOUNT_INFO_SIZE);
        new_value.extend_from_slice(&value);
        new_value.extend_from_slice(&count.to_be_bytes());
        store.accounts.put(&mut txn.0, account.as_bytes(), &new_value)?;
    }
    Ok(())
}

/// v6→v7 and v7→v8: the unchecked table changed format (and later gained
/// the duplicate flag); the content is expendable, so drop and recreate.
fn upgrade_recreate_unchecked(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    store.unchecked_clear(txn)
}

/// v8→v9: the plain per-account sequence table became the vote table
/// holding full serialized votes; old entries carry no recoverable vote.
fn upgrade_v8_to_v9(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    store.vote_clear(txn)
}

/// v9→v10: materialize blocks_info snapshots every 32 blocks on every
/// chain.
fn upgrade_v9_to_v10(store: &Store, txn: &mut WriteTransaction) -> Result<(), StoreError> {
    store.block_info_clear(txn)?;
    for (account, value) in raw_accounts(store, txn)? {
        if value.len() != ACCOUNT_INFO_SIZE {
            continue;
        }
        let head = record_head(&value);

        let mut chain = Vec::new();
        let mut current = head;
        while !current.is_zero() {
            let block = store
                .block_get(txn, &current)?
                .ok_or_else(|| StoreError::corrupt("blocks", "snapshot walk hit a missing block"))?;
            let previous = block.previous();
            chain.push(current);
            current = previous;
        }
        chain.reverse();

        for (index, hash) in chain.iter().enumerate() {
            let height = index as u64 + 1;
            if height % BLOCK_INFO_INTERVAL == 0 {
                let balance = balance_at(store, txn, hash)?;
                store.block_info_put(txn, hash, &BlockInfo { account, balance })?;
            }
        }
    }
    Ok(())
}
