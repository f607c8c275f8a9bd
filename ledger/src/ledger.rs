//! The ledger state machine.

use crate::error::LedgerError;
use crate::result::{ProcessResult, ProcessReturn};
use std::collections::HashMap;
use std::sync::Arc;
use vela_blocks::{Block, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock};
use vela_crypto::{derive_public_key, verify_message};
use vela_store::blocks_info::BLOCK_INFO_INTERVAL;
use vela_store::{
    AccountInfo, BlockInfo, PendingInfo, PendingKey, Readable, Store, WriteTransaction,
};
use vela_types::{Account, Amount, BlockHash, Network, Timestamp, GENESIS_AMOUNT};

fn xor_hash(a: &BlockHash, b: &BlockHash) -> BlockHash {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a.as_bytes()[i] ^ b.as_bytes()[i];
    }
    BlockHash::new(out)
}

/// Validation, application, and rollback over a shared [`Store`].
///
/// All mutations run inside the caller's write transaction; nothing is
/// visible until that transaction commits.
pub struct Ledger {
    pub store: Arc<Store>,
    genesis_account: Account,
    inactive_supply: Amount,
}

impl Ledger {
    pub fn new(store: Arc<Store>, network: Network) -> Self {
        Self::with_inactive_supply(store, network, Amount::ZERO)
    }

    pub fn with_inactive_supply(
        store: Arc<Store>,
        network: Network,
        inactive_supply: Amount,
    ) -> Self {
        let genesis_account = derive_public_key(&network.genesis_key());
        Self {
            store,
            genesis_account,
            inactive_supply,
        }
    }

    pub fn genesis_account(&self) -> Account {
        self.genesis_account
    }

    /// Whether the genesis account chain exists in the store.
    pub fn genesis_present(&self, txn: &impl Readable) -> Result<bool, LedgerError> {
        Ok(self.store.account_exists(txn, &self.genesis_account)?)
    }

    // ── Processing ──────────────────────────────────────────────────────

    /// Validate and apply one block. Expected rejections are reported via
    /// [`ProcessResult`]; only store failures become errors.
    pub fn process(
        &self,
        txn: &mut WriteTransaction,
        block: &Block,
    ) -> Result<ProcessReturn, LedgerError> {
        match block {
            Block::Send(b) => self.process_send(txn, block, b),
            Block::Receive(b) => self.process_receive(txn, block, b),
            Block::Open(b) => self.process_open(txn, block, b),
            Block::Change(b) => self.process_change(txn, block, b),
        }
    }

    fn process_send(
        &self,
        txn: &mut WriteTransaction,
        block: &Block,
        b: &SendBlock,
    ) -> Result<ProcessReturn, LedgerError> {
        let hash = b.hash();
        if self.store.block_exists(txn, &hash)? {
            return Ok(ProcessReturn::code(ProcessResult::Old));
        }
        if !self.store.block_exists(txn, &b.previous)? {
            return Ok(ProcessReturn::code(ProcessResult::GapPrevious));
        }
        // A previous that exists but is no longer a head means its slot is
        // already taken: a fork on root = previous.
        let account = match self.store.frontier_get(txn, &b.previous)? {
            Some(account) => account,
            None => return Ok(ProcessReturn::code(ProcessResult::Fork)),
        };
        if !verify_message(&account, hash.as_bytes(), &b.signature) {
            return Ok(ProcessReturn::code(ProcessResult::BadSignature));
        }
        let info = self.account_info(txn, &account)?;
        if b.balance > info.balance {
            return Ok(ProcessReturn::code(ProcessResult::NegativeSpend));
        }
        let amount = info.balance - b.balance;

        self.store.block_put(txn, &hash, block, BlockHash::ZERO)?;
        let rep = self.representative_of(txn, &info.rep_block)?;
        self.store.representation_subtract(txn, &rep, amount)?;
        self.store.pending_put(
            txn,
            &PendingKey::new(b.destination, hash),
            &PendingInfo {
                source: account,
                amount,
            },
        )?;
        self.advance_head(txn, &account, &info, hash, b.balance, info.rep_block)?;

        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount,
            pending_account: b.destination,
        })
    }

    fn process_receive(
        &self,
        txn: &mut WriteTransaction,
        block: &Block,
        b: &ReceiveBlock,
    ) -> Result<ProcessReturn, LedgerError> {
        let hash = b.hash();
        if self.store.block_exists(txn, &hash)? {
            return Ok(ProcessReturn::code(ProcessResult::Old));
        }
        match self.store.block_get(txn, &b.source)? {
            None => return Ok(ProcessReturn::code(ProcessResult::GapSource)),
            Some(Block::Send(_)) => {}
            Some(_) => return Ok(ProcessReturn::code(ProcessResult::NotReceiveFromSend)),
        }
        if !self.store.block_exists(txn, &b.previous)? {
            return Ok(ProcessReturn::code(ProcessResult::GapPrevious));
        }
        let account = match self.store.frontier_get(txn, &b.previous)? {
            Some(account) => account,
            None => return Ok(ProcessReturn::code(ProcessResult::Fork)),
        };
        if !verify_message(&account, hash.as_bytes(), &b.signature) {
            return Ok(ProcessReturn::code(ProcessResult::BadSignature));
        }
        let key = PendingKey::new(account, b.source);
        let pending = match self.store.pending_get(txn, &key)? {
            Some(pending) => pending,
            None => return Ok(ProcessReturn::code(ProcessResult::Unreceivable)),
        };
        let info = self.account_info(txn, &account)?;
        let amount = pending.amount;
        let balance = info
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Inconsistent("receive overflows balance".into()))?;

        self.store.block_put(txn, &hash, block, BlockHash::ZERO)?;
        self.store.pending_del(txn, &key)?;
        let rep = self.representative_of(txn, &info.rep_block)?;
        self.store.representation_add(txn, &rep, amount)?;
        self.advance_head(txn, &account, &info, hash, balance, info.rep_block)?;

        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount,
            pending_account: Account::ZERO,
        })
    }

    fn process_open(
        &self,
        txn: &mut WriteTransaction,
        block: &Block,
        b: &OpenBlock,
    ) -> Result<ProcessReturn, LedgerError> {
        let hash = b.hash();
        if self.store.block_exists(txn, &hash)? {
            return Ok(ProcessReturn::code(ProcessResult::Old));
        }
        if b.account.is_zero() {
            return Ok(ProcessReturn::code(ProcessResult::OpenedBurnAccount));
        }
        let send = match self.store.block_get(txn, &b.source)? {
            None => return Ok(ProcessReturn::code(ProcessResult::GapSource)),
            Some(Block::Send(send)) => send,
            Some(_) => return Ok(ProcessReturn::code(ProcessResult::NotReceiveFromSend)),
        };
        if !verify_message(&b.account, hash.as_bytes(), &b.signature) {
            return Ok(ProcessReturn::code(ProcessResult::BadSignature));
        }
        // A second open for the same account forks on root = account.
        if self.store.account_exists(txn, &b.account)? {
            return Ok(ProcessReturn::code(ProcessResult::Fork));
        }
        if send.destination != b.account {
            return Ok(ProcessReturn::code(ProcessResult::AccountMismatch));
        }
        let key = PendingKey::new(b.account, b.source);
        let pending = match self.store.pending_get(txn, &key)? {
            Some(pending) => pending,
            None => return Ok(ProcessReturn::code(ProcessResult::Unreceivable)),
        };
        let amount = pending.amount;

        self.store.block_put(txn, &hash, block, BlockHash::ZERO)?;
        self.store.pending_del(txn, &key)?;
        self.store.account_put(
            txn,
            &b.account,
            &AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: amount,
                modified: Timestamp::now().as_secs(),
                block_count: 1,
            },
        )?;
        self.store.frontier_put(txn, &hash, &b.account)?;
        self.checksum_toggle(txn, &hash)?;
        self.store.representation_add(txn, &b.representative, amount)?;

        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account: b.account,
            amount,
            pending_account: Account::ZERO,
        })
    }

    fn process_change(
        &self,
        txn: &mut WriteTransaction,
        block: &Block,
        b: &ChangeBlock,
    ) -> Result<ProcessReturn, LedgerError> {
        let hash = b.hash();
        if self.store.block_exists(txn, &hash)? {
            return Ok(ProcessReturn::code(ProcessResult::Old));
        }
        if !self.store.block_exists(txn, &b.previous)? {
            return Ok(ProcessReturn::code(ProcessResult::GapPrevious));
        }
        let account = match self.store.frontier_get(txn, &b.previous)? {
            Some(account) => account,
            None => return Ok(ProcessReturn::code(ProcessResult::Fork)),
        };
        if !verify_message(&account, hash.as_bytes(), &b.signature) {
            return Ok(ProcessReturn::code(ProcessResult::BadSignature));
        }
        let info = self.account_info(txn, &account)?;

        self.store.block_put(txn, &hash, block, BlockHash::ZERO)?;
        let old_rep = self.representative_of(txn, &info.rep_block)?;
        self.store.representation_subtract(txn, &old_rep, info.balance)?;
        self.store
            .representation_add(txn, &b.representative, info.balance)?;
        self.advance_head(txn, &account, &info, hash, info.balance, hash)?;

        Ok(ProcessReturn {
            code: ProcessResult::Progress,
            account,
            amount: Amount::ZERO,
            pending_account: Account::ZERO,
        })
    }

    /// Move an account's head forward: frontier swap, account record,
    /// checksum maintenance, and the periodic blocks_info snapshot.
    fn advance_head(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        old: &AccountInfo,
        new_head: BlockHash,
        balance: Amount,
        rep_block: BlockHash,
    ) -> Result<(), LedgerError> {
        self.store.frontier_del(txn, &old.head)?;
        self.checksum_toggle(txn, &old.head)?;
        self.store.frontier_put(txn, &new_head, account)?;
        self.checksum_toggle(txn, &new_head)?;

        let block_count = old.block_count + 1;
        self.store.account_put(
            txn,
            account,
            &AccountInfo {
                head: new_head,
                rep_block,
                open_block: old.open_block,
                balance,
                modified: Timestamp::now().as_secs(),
                block_count,
            },
        )?;
        if block_count % BLOCK_INFO_INTERVAL == 0 {
            self.store.block_info_put(
                txn,
                &new_head,
                &BlockInfo {
                    account: *account,
                    balance,
                },
            )?;
        }
        Ok(())
    }

    /// XOR a head hash into checksum slot (0, 0). Applying twice removes it.
    fn checksum_toggle(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), LedgerError> {
        let current = self
            .store
            .checksum_get(txn, 0, 0)?
            .unwrap_or(BlockHash::ZERO);
        self.store
            .checksum_put(txn, 0, 0, &xor_hash(&current, hash))?;
        Ok(())
    }

    // ── Rollback ────────────────────────────────────────────────────────

    /// Undo the owning account's head blocks until `hash` is no longer in
    /// the store. Receives that already consumed a rolled-back send are
    /// rolled back first, recursively.
    pub fn rollback(&self, txn: &mut WriteTransaction, hash: &BlockHash) -> Result<(), LedgerError> {
        while self.store.block_exists(txn, hash)? {
            let account = self.account(txn, hash)?;
            let info = self.account_info(txn, &account)?;
            let head_block = self
                .store
                .block_get(txn, &info.head)?
                .ok_or(LedgerError::MissingBlock(info.head))?;
            tracing::debug!(block = %info.head, account = %account, "rolling back head");
            match &head_block {
                Block::Send(b) => self.rollback_send(txn, &account, &info, b)?,
                Block::Receive(b) => self.rollback_receive(txn, &account, &info, b)?,
                Block::Open(b) => self.rollback_open(txn, &account, &info, b)?,
                Block::Change(b) => self.rollback_change(txn, &account, &info, b)?,
            }
        }
        Ok(())
    }

    fn rollback_send(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        info: &AccountInfo,
        b: &SendBlock,
    ) -> Result<(), LedgerError> {
        let hash = info.head;
        let key = PendingKey::new(b.destination, hash);
        // If the destination already received this send, its chain must be
        // unwound first so the pending entry reappears.
        while !self.store.pending_exists(txn, &key)? {
            let receiver_head = self
                .latest(txn, &b.destination)?
                .ok_or_else(|| LedgerError::Inconsistent("consumed send with no receiver chain".into()))?;
            self.rollback(txn, &receiver_head)?;
        }
        let pending = self
            .store
            .pending_get(txn, &key)?
            .ok_or_else(|| LedgerError::Inconsistent("pending entry vanished during rollback".into()))?;
        let amount = pending.amount;
        self.store.pending_del(txn, &key)?;

        let rep = self.representative_of(txn, &info.rep_block)?;
        self.store.representation_add(txn, &rep, amount)?;
        let balance = info
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Inconsistent("rollback overflows balance".into()))?;
        self.retreat_head(txn, account, info, b.previous, balance, info.rep_block)?;
        Ok(())
    }

    fn rollback_receive(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        info: &AccountInfo,
        b: &ReceiveBlock,
    ) -> Result<(), LedgerError> {
        let amount = self.amount(txn, &info.head)?;
        let source_account = self.account(txn, &b.source)?;
        self.store.pending_put(
            txn,
            &PendingKey::new(*account, b.source),
            &PendingInfo {
                source: source_account,
                amount,
            },
        )?;
        let rep = self.representative_of(txn, &info.rep_block)?;
        self.store.representation_subtract(txn, &rep, amount)?;
        let balance = info.balance.saturating_sub(amount);
        self.retreat_head(txn, account, info, b.previous, balance, info.rep_block)?;
        Ok(())
    }

    fn rollback_open(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        info: &AccountInfo,
        b: &OpenBlock,
    ) -> Result<(), LedgerError> {
        let hash = info.head;
        let amount = info.balance;
        let source_account = self.account(txn, &b.source)?;
        self.store.pending_put(
            txn,
            &PendingKey::new(*account, b.source),
            &PendingInfo {
                source: source_account,
                amount,
            },
        )?;
        self.store
            .representation_subtract(txn, &b.representative, amount)?;
        self.store.frontier_del(txn, &hash)?;
        self.checksum_toggle(txn, &hash)?;
        self.store.block_info_del(txn, &hash)?;
        self.store.account_del(txn, account)?;
        self.store.block_del(txn, &hash)?;
        Ok(())
    }

    fn rollback_change(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        info: &AccountInfo,
        b: &ChangeBlock,
    ) -> Result<(), LedgerError> {
        let restored_rep_block = self.representative_block(txn, &b.previous)?;
        let restored_rep = self.representative_of(txn, &restored_rep_block)?;
        self.store
            .representation_subtract(txn, &b.representative, info.balance)?;
        self.store
            .representation_add(txn, &restored_rep, info.balance)?;
        self.retreat_head(txn, account, info, b.previous, info.balance, restored_rep_block)?;
        Ok(())
    }

    /// Move an account's head backward, removing the old head block.
    fn retreat_head(
        &self,
        txn: &mut WriteTransaction,
        account: &Account,
        old: &AccountInfo,
        new_head: BlockHash,
        balance: Amount,
        rep_block: BlockHash,
    ) -> Result<(), LedgerError> {
        let removed = old.head;
        self.store.frontier_del(txn, &removed)?;
        self.checksum_toggle(txn, &removed)?;
        self.store.block_info_del(txn, &removed)?;
        self.store.frontier_put(txn, &new_head, account)?;
        self.checksum_toggle(txn, &new_head)?;
        self.store.account_put(
            txn,
            account,
            &AccountInfo {
                head: new_head,
                rep_block,
                open_block: old.open_block,
                balance,
                modified: Timestamp::now().as_secs(),
                block_count: old.block_count.saturating_sub(1),
            },
        )?;
        self.store.block_del(txn, &removed)?;
        self.store.block_successor_clear(txn, &new_head)?;
        Ok(())
    }

    // ── Derived reads ───────────────────────────────────────────────────

    /// The account owning `hash`, resolved by walking successors until a
    /// snapshot or frontier entry is met, O(snapshot interval) amortized.
    pub fn account(&self, txn: &impl Readable, hash: &BlockHash) -> Result<Account, LedgerError> {
        let mut current = *hash;
        loop {
            if let Some(info) = self.store.block_info_get(txn, &current)? {
                return Ok(info.account);
            }
            if let Some(account) = self.store.frontier_get(txn, &current)? {
                return Ok(account);
            }
            current = self
                .store
                .block_successor(txn, &current)?
                .ok_or(LedgerError::MissingBlock(current))?;
        }
    }

    /// Balance after the block at `hash`.
    pub fn balance(&self, txn: &impl Readable, hash: &BlockHash) -> Result<Amount, LedgerError> {
        let mut received = Amount::ZERO;
        let mut current = *hash;
        loop {
            let block = self
                .store
                .block_get(txn, &current)?
                .ok_or(LedgerError::MissingBlock(current))?;
            match block {
                Block::Send(b) => return Ok(received.saturating_add(b.balance)),
                Block::Receive(b) => {
                    received = received.saturating_add(self.source_amount(txn, &b.source)?);
                    current = b.previous;
                }
                Block::Open(b) => {
                    return Ok(received.saturating_add(self.source_amount(txn, &b.source)?))
                }
                Block::Change(b) => current = b.previous,
            }
        }
    }

    /// The amount moved by the block at `hash` (zero for change blocks).
    pub fn amount(&self, txn: &impl Readable, hash: &BlockHash) -> Result<Amount, LedgerError> {
        let block = self
            .store
            .block_get(txn, hash)?
            .ok_or(LedgerError::MissingBlock(*hash))?;
        match block {
            Block::Send(b) => {
                let before = self.balance(txn, &b.previous)?;
                Ok(before.saturating_sub(b.balance))
            }
            Block::Receive(b) => self.source_amount(txn, &b.source),
            Block::Open(b) => self.source_amount(txn, &b.source),
            Block::Change(_) => Ok(Amount::ZERO),
        }
    }

    /// The amount carried by the send at `source`. The genesis open names a
    /// source that predates the store; it resolves to the full supply.
    fn source_amount(&self, txn: &impl Readable, source: &BlockHash) -> Result<Amount, LedgerError> {
        match self.store.block_get(txn, source)? {
            None => Ok(GENESIS_AMOUNT),
            Some(Block::Send(send)) => {
                let before = self.balance(txn, &send.previous)?;
                Ok(before.saturating_sub(send.balance))
            }
            Some(_) => Err(LedgerError::Inconsistent("source is not a send".into())),
        }
    }

    /// A representative's voting weight. The genesis representative also
    /// carries the configured inactive supply.
    pub fn weight(&self, txn: &impl Readable, account: &Account) -> Result<Amount, LedgerError> {
        let weight = self.store.representation_get(txn, account)?;
        if *account == self.genesis_account {
            Ok(weight.saturating_add(self.inactive_supply))
        } else {
            Ok(weight)
        }
    }

    pub fn account_balance(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Amount, LedgerError> {
        Ok(self
            .store
            .account_get(txn, account)?
            .map(|info| info.balance)
            .unwrap_or(Amount::ZERO))
    }

    /// Total amount pending for `account` across all unclaimed sends.
    pub fn account_pending(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Amount, LedgerError> {
        let mut total = Amount::ZERO;
        for entry in self.store.pending_for_account(txn, account)? {
            let (_, info) = entry?;
            total = total.saturating_add(info.amount);
        }
        Ok(total)
    }

    /// The account's head hash, if the chain exists.
    pub fn latest(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<Option<BlockHash>, LedgerError> {
        Ok(self.store.account_get(txn, account)?.map(|info| info.head))
    }

    /// The root for the account's next block: its head, or the account key
    /// itself when no chain exists yet (the open block's root).
    pub fn latest_root(&self, txn: &impl Readable, account: &Account) -> Result<BlockHash, LedgerError> {
        Ok(match self.latest(txn, account)? {
            Some(head) => head,
            None => BlockHash::new(*account.as_bytes()),
        })
    }

    /// Circulating supply: everything not resting on the burn account.
    pub fn supply(&self, txn: &impl Readable) -> Result<Amount, LedgerError> {
        let burned = self
            .account_balance(txn, &Account::ZERO)?
            .saturating_add(self.account_pending(txn, &Account::ZERO)?);
        Ok(GENESIS_AMOUNT.saturating_sub(burned))
    }

    /// Resolve the representative designated by a rep-carrying block.
    pub fn representative_of(
        &self,
        txn: &impl Readable,
        rep_block: &BlockHash,
    ) -> Result<Account, LedgerError> {
        self.store
            .block_get(txn, rep_block)?
            .and_then(|block| block.representative())
            .ok_or_else(|| LedgerError::Inconsistent("rep_block carries no representative".into()))
    }

    /// The most recent rep-carrying block at or before `hash` on its chain.
    pub fn representative_block(
        &self,
        txn: &impl Readable,
        hash: &BlockHash,
    ) -> Result<BlockHash, LedgerError> {
        let mut current = *hash;
        loop {
            let block = self
                .store
                .block_get(txn, &current)?
                .ok_or(LedgerError::MissingBlock(current))?;
            if block.representative().is_some() {
                return Ok(current);
            }
            current = block.previous();
        }
    }

    // ── Vote weighing ───────────────────────────────────────────────────

    /// Sum each candidate block's weight across the representatives
    /// currently voting for it; heaviest first.
    pub fn tally(
        &self,
        txn: &impl Readable,
        rep_votes: &HashMap<Account, Block>,
    ) -> Result<Vec<(Amount, Block)>, LedgerError> {
        let mut totals: HashMap<BlockHash, (Amount, Block)> = HashMap::new();
        for (rep, block) in rep_votes {
            let weight = self.weight(txn, rep)?;
            let entry = totals
                .entry(block.hash())
                .or_insert_with(|| (Amount::ZERO, block.clone()));
            entry.0 = entry.0.saturating_add(weight);
        }
        let mut out: Vec<(Amount, Block)> = totals.into_values().collect();
        out.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(out)
    }

    /// The heaviest candidate, if any votes exist.
    pub fn winner(
        &self,
        txn: &impl Readable,
        rep_votes: &HashMap<Account, Block>,
    ) -> Result<Option<(Amount, Block)>, LedgerError> {
        Ok(self.tally(txn, rep_votes)?.into_iter().next())
    }

    /// The block currently occupying a root's slot: the successor of the
    /// root block, or the open block when the root is an account key. This
    /// is the competitor an incoming fork is fighting.
    pub fn block_at_root(
        &self,
        txn: &impl Readable,
        root: &BlockHash,
    ) -> Result<Option<Block>, LedgerError> {
        if self.store.block_exists(txn, root)? {
            match self.store.block_successor(txn, root)? {
                Some(successor) => Ok(self.store.block_get(txn, &successor)?),
                None => Ok(None),
            }
        } else {
            let account = Account::new(*root.as_bytes());
            match self.store.account_get(txn, &account)? {
                Some(info) => Ok(self.store.block_get(txn, &info.open_block)?),
                None => Ok(None),
            }
        }
    }

    /// XOR of account heads over the key range `[begin, end)`.
    pub fn checksum(
        &self,
        txn: &impl Readable,
        begin: &Account,
        end: &Account,
    ) -> Result<BlockHash, LedgerError> {
        let mut digest = BlockHash::ZERO;
        for entry in self.store.accounts_begin(txn, begin)? {
            let (account, info) = entry?;
            if account >= *end {
                break;
            }
            digest = xor_hash(&digest, &info.head);
        }
        Ok(digest)
    }

    fn account_info(
        &self,
        txn: &impl Readable,
        account: &Account,
    ) -> Result<AccountInfo, LedgerError> {
        self.store
            .account_get(txn, account)?
            .ok_or_else(|| LedgerError::Inconsistent("frontier names an unknown account".into()))
    }
}
