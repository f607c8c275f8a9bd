//! The LMDB environment and database handles.

use crate::migration::migrate;
use crate::transaction::{ReadTransaction, WriteTransaction};
use crate::StoreError;
use heed::types::Bytes;
use heed::{Database, DatabaseFlags, Env, EnvFlags, EnvOpenOptions};
use std::path::Path;

/// Default environment map size: 16 GiB. LMDB only materializes pages that
/// are actually written.
pub const DEFAULT_MAP_SIZE: usize = 16 * 1024 * 1024 * 1024;

const MAX_DBS: u32 = 16;

/// All tables of the ledger database under one transactional scope.
///
/// `Store` is `Sync`; every mutation path goes through a
/// [`WriteTransaction`], of which LMDB permits one at a time.
pub struct Store {
    pub(crate) env: Env,
    /// block hash -> account owning that head
    pub(crate) frontiers: Database<Bytes, Bytes>,
    /// account -> AccountInfo
    pub(crate) accounts: Database<Bytes, Bytes>,
    /// block hash -> serialized send ‖ successor
    pub(crate) send_blocks: Database<Bytes, Bytes>,
    /// block hash -> serialized receive ‖ successor
    pub(crate) receive_blocks: Database<Bytes, Bytes>,
    /// block hash -> serialized open ‖ successor
    pub(crate) open_blocks: Database<Bytes, Bytes>,
    /// block hash -> serialized change ‖ successor
    pub(crate) change_blocks: Database<Bytes, Bytes>,
    /// (destination, send hash) -> PendingInfo
    pub(crate) pending: Database<Bytes, Bytes>,
    /// block hash -> BlockInfo snapshot
    pub(crate) blocks_info: Database<Bytes, Bytes>,
    /// account -> 128-bit voting weight
    pub(crate) representation: Database<Bytes, Bytes>,
    /// missing predecessor hash -> serialized block (duplicates allowed)
    pub(crate) unchecked: Database<Bytes, Bytes>,
    /// block hash -> () ; local blocks peers may lack
    pub(crate) unsynced: Database<Bytes, Bytes>,
    /// (56-bit prefix, 8-bit mask) -> 256-bit XOR of account heads
    pub(crate) checksum: Database<Bytes, Bytes>,
    /// representative account -> serialized latest vote
    pub(crate) vote: Database<Bytes, Bytes>,
    /// well-known keys -> metadata (schema version at key 1)
    pub(crate) meta: Database<Bytes, Bytes>,
}

impl Store {
    /// Open (or create) the environment at `<data_dir>/data.ldb` and bring
    /// the schema up to the current version.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Self::open_with_map_size(data_dir, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(data_dir: &Path, map_size: usize) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let file = data_dir.join("data.ldb");

        let mut options = EnvOpenOptions::new();
        options.map_size(map_size).max_dbs(MAX_DBS);
        // NO_SUB_DIR keeps the on-disk layout to exactly `data.ldb` plus
        // `data.ldb-lock`.
        unsafe {
            options.flags(EnvFlags::NO_SUB_DIR);
        }
        let env = unsafe { options.open(&file)? };

        let mut wtxn = env.write_txn()?;
        let frontiers = env.create_database(&mut wtxn, Some("frontiers"))?;
        let accounts = env.create_database(&mut wtxn, Some("accounts"))?;
        let send_blocks = env.create_database(&mut wtxn, Some("send"))?;
        let receive_blocks = env.create_database(&mut wtxn, Some("receive"))?;
        let open_blocks = env.create_database(&mut wtxn, Some("open"))?;
        let change_blocks = env.create_database(&mut wtxn, Some("change"))?;
        let pending = env.create_database(&mut wtxn, Some("pending"))?;
        let blocks_info = env.create_database(&mut wtxn, Some("blocks_info"))?;
        let representation = env.create_database(&mut wtxn, Some("representation"))?;
        let unchecked = env
            .database_options()
            .types::<Bytes, Bytes>()
            .flags(DatabaseFlags::DUP_SORT)
            .name("unchecked")
            .create(&mut wtxn)?;
        let unsynced = env.create_database(&mut wtxn, Some("unsynced"))?;
        let checksum = env.create_database(&mut wtxn, Some("checksum"))?;
        let vote = env.create_database(&mut wtxn, Some("vote"))?;
        let meta = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        let store = Self {
            env,
            frontiers,
            accounts,
            send_blocks,
            receive_blocks,
            open_blocks,
            change_blocks,
            pending,
            blocks_info,
            representation,
            unchecked,
            unsynced,
            checksum,
            vote,
            meta,
        };

        migrate(&store)?;
        Ok(store)
    }

    /// Begin a snapshot-isolated read transaction.
    pub fn begin_read(&self) -> Result<ReadTransaction<'_>, StoreError> {
        Ok(ReadTransaction(self.env.read_txn()?))
    }

    /// Begin the (single) write transaction; blocks if another is open.
    pub fn begin_write(&self) -> Result<WriteTransaction<'_>, StoreError> {
        Ok(WriteTransaction(self.env.write_txn()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CURRENT_SCHEMA_VERSION;
    use tempfile::TempDir;

    #[test]
    fn open_creates_single_file_layout() {
        let dir = TempDir::new().unwrap();
        let _store = Store::open(dir.path()).unwrap();
        assert!(dir.path().join("data.ldb").exists());
    }

    #[test]
    fn fresh_store_is_at_current_version() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let txn = store.begin_read().unwrap();
        assert_eq!(
            store.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = TempDir::new().unwrap();
        {
            let store = Store::open(dir.path()).unwrap();
            let mut txn = store.begin_write().unwrap();
            store.version_put(&mut txn, CURRENT_SCHEMA_VERSION).unwrap();
            txn.commit().unwrap();
        }
        let store = Store::open(dir.path()).unwrap();
        let txn = store.begin_read().unwrap();
        assert_eq!(
            store.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }

    #[test]
    fn uncommitted_writes_are_dropped() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        {
            let mut txn = store.begin_write().unwrap();
            store.version_put(&mut txn, 99).unwrap();
            txn.abort();
        }
        let txn = store.begin_read().unwrap();
        assert_eq!(
            store.version_get(&txn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
