//! Whole-ledger invariant checking.
//!
//! Walks every account chain and cross-checks the derived tables: chain
//! continuity, successor links, cached balances and counts, frontier
//! entries, representation sums, pending consistency, and conservation of
//! the total supply. Used by the diagnostics CLI and by tests after
//! scenario runs.

use crate::ledger::Ledger;
use crate::LedgerError;
use std::collections::HashMap;
use vela_store::Readable;
use vela_types::{Account, Amount, GENESIS_AMOUNT};

/// Outcome of a full invariant sweep.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub accounts_checked: u64,
    pub blocks_checked: u64,
    pub pending_checked: u64,
    pub violations: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Verify every ledger invariant that holds after a committed transaction.
pub fn check_integrity(
    ledger: &Ledger,
    txn: &impl Readable,
) -> Result<IntegrityReport, LedgerError> {
    let store = &ledger.store;
    let mut report = IntegrityReport::default();
    let mut computed_weights: HashMap<Account, Amount> = HashMap::new();
    let mut total = Amount::ZERO;

    for entry in store.accounts_iter(txn)? {
        let (account, info) = entry?;
        report.accounts_checked += 1;

        // The frontier reverse index names this account at its head.
        match store.frontier_get(txn, &info.head)? {
            Some(owner) if owner == account => {}
            Some(owner) => report.violations.push(format!(
                "frontier for head {} names {owner}, expected {account}",
                info.head
            )),
            None => report
                .violations
                .push(format!("head {} of {account} has no frontier entry", info.head)),
        }

        // Walk previous links from head to the chain origin, checking each
        // parent's successor slot along the way.
        let mut length: u64 = 0;
        let mut current = info.head;
        let mut child = None;
        loop {
            let Some(block) = store.block_get(txn, &current)? else {
                report
                    .violations
                    .push(format!("chain of {account} is missing block {current}"));
                break;
            };
            report.blocks_checked += 1;
            length += 1;
            if let Some(child_hash) = child {
                match store.block_successor(txn, &current)? {
                    Some(successor) if successor == child_hash => {}
                    other => report.violations.push(format!(
                        "successor of {current} is {other:?}, expected {child_hash}"
                    )),
                }
            }
            let previous = block.previous();
            if previous.is_zero() {
                if current != info.open_block {
                    report.violations.push(format!(
                        "chain of {account} ends at {current}, open_block says {}",
                        info.open_block
                    ));
                }
                break;
            }
            child = Some(current);
            current = previous;
        }
        if length != info.block_count {
            report.violations.push(format!(
                "{account} has block_count {} but chain length {length}",
                info.block_count
            ));
        }

        // Cached balance agrees with the balance derived from the chain.
        let derived = ledger.balance(txn, &info.head)?;
        if derived != info.balance {
            report.violations.push(format!(
                "{account} caches balance {} but the chain derives {derived}",
                info.balance
            ));
        }
        total = total.saturating_add(info.balance);

        // Accumulate the expected representation table.
        let representative = ledger.representative_of(txn, &info.rep_block)?;
        let weight = computed_weights.entry(representative).or_insert(Amount::ZERO);
        *weight = weight.saturating_add(info.balance);
    }

    // The representation table holds exactly the computed sums.
    for entry in store.representation_iter(txn)? {
        let (representative, stored) = entry?;
        let expected = computed_weights
            .remove(&representative)
            .unwrap_or(Amount::ZERO);
        if stored != expected {
            report.violations.push(format!(
                "representation for {representative} is {stored}, expected {expected}"
            ));
        }
    }
    for (representative, expected) in computed_weights {
        report.violations.push(format!(
            "representation for {representative} is missing, expected {expected}"
        ));
    }

    // Every pending entry names a stored send paying its destination, and
    // no claimed send retains one.
    for entry in store.pending_iter(txn)? {
        let (key, pending) = entry?;
        report.pending_checked += 1;
        match store.block_get(txn, &key.hash)? {
            Some(block) => match block.destination() {
                Some(destination) if destination == key.destination => {}
                _ => report.violations.push(format!(
                    "pending entry {} does not match its send's destination",
                    key.hash
                )),
            },
            None => report
                .violations
                .push(format!("pending entry {} names a missing send", key.hash)),
        }
        total = total.saturating_add(pending.amount);
    }

    // Conservation: balances plus pending equal the genesis supply.
    if report.accounts_checked > 0 && total != GENESIS_AMOUNT {
        report.violations.push(format!(
            "supply is {total}, expected the genesis amount {GENESIS_AMOUNT}"
        ));
    }

    // The frontier table has exactly one entry per account.
    let frontier_count = store.frontier_count(txn)?;
    if frontier_count != report.accounts_checked {
        report.violations.push(format!(
            "{frontier_count} frontier entries for {} accounts",
            report.accounts_checked
        ));
    }

    Ok(report)
}
