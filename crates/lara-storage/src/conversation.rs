//! Conversation storage - byte-level API for per-user conversation documents.

use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const CONVERSATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("conversations");

/// Low-level conversation storage keyed by user id
#[derive(Debug, Clone)]
pub struct ConversationStorage {
    db: Arc<Database>,
}

impl ConversationStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CONVERSATIONS_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store raw document data, overwriting any previous value
    pub fn put_raw(&self, user_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            table.insert(user_id, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw document data by user id
    pub fn get_raw(&self, user_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONVERSATIONS_TABLE)?;

        if let Some(data) = table.get(user_id)? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Return the stored document, inserting `initial` first when none exists.
    ///
    /// Lookup and insert share one write transaction, so two first-time loads
    /// for the same user always end up with a single record.
    pub fn get_or_insert_raw(&self, user_id: &str, initial: &[u8]) -> Result<Vec<u8>> {
        let write_txn = self.db.begin_write()?;
        let data = {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            let existing = table.get(user_id)?.map(|data| data.value().to_vec());
            match existing {
                Some(data) => data,
                None => {
                    table.insert(user_id, initial)?;
                    initial.to_vec()
                }
            }
        };
        write_txn.commit()?;
        Ok(data)
    }

    /// Read-modify-write a document inside a single write transaction.
    ///
    /// `update` receives the current bytes (if any) and returns the new value.
    /// When it fails the transaction is dropped and nothing is written.
    pub fn update_raw<F>(&self, user_id: &str, update: F) -> Result<()>
    where
        F: FnOnce(Option<Vec<u8>>) -> Result<Vec<u8>>,
    {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            let current = table.get(user_id)?.map(|data| data.value().to_vec());
            let next = update(current)?;
            table.insert(user_id, next.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// List the user ids that have a stored document
    pub fn list_keys(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONVERSATIONS_TABLE)?;

        let mut keys = Vec::new();
        for item in table.iter()? {
            let (key, _) = item?;
            keys.push(key.value().to_string());
        }

        Ok(keys)
    }

    /// Delete the user's document
    pub fn delete(&self, user_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(CONVERSATIONS_TABLE)?;
            table.remove(user_id)?.is_some()
        };
        write_txn.commit()?;
        if existed {
            tracing::debug!(user_id, "Deleted conversation document");
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup() -> (ConversationStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Arc::new(Database::create(db_path).unwrap());
        let storage = ConversationStorage::new(db).unwrap();
        (storage, temp_dir)
    }

    #[test]
    fn test_put_and_get_raw() {
        let (storage, _temp_dir) = setup();

        storage.put_raw("user-001", b"conversation").unwrap();

        let retrieved = storage.get_raw("user-001").unwrap();
        assert_eq!(retrieved.as_deref(), Some(&b"conversation"[..]));
        assert!(storage.get_raw("user-002").unwrap().is_none());
    }

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let (storage, _temp_dir) = setup();

        let first = storage.get_or_insert_raw("user-001", b"initial").unwrap();
        assert_eq!(first, b"initial");

        // A second first-load with different defaults must not clobber the record
        let second = storage.get_or_insert_raw("user-001", b"other").unwrap();
        assert_eq!(second, b"initial");
        assert_eq!(storage.list_keys().unwrap(), vec!["user-001".to_string()]);
    }

    #[test]
    fn test_update_raw_sees_current_value() {
        let (storage, _temp_dir) = setup();

        storage
            .update_raw("user-001", |current| {
                assert!(current.is_none());
                Ok(b"one".to_vec())
            })
            .unwrap();
        storage
            .update_raw("user-001", |current| {
                let mut data = current.unwrap();
                data.extend_from_slice(b",two");
                Ok(data)
            })
            .unwrap();

        assert_eq!(storage.get_raw("user-001").unwrap().unwrap(), b"one,two");
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let (storage, _temp_dir) = setup();
        storage.put_raw("user-001", b"kept").unwrap();

        let result = storage.update_raw("user-001", |_| Err(anyhow::anyhow!("corrupt document")));
        assert!(result.is_err());
        assert_eq!(storage.get_raw("user-001").unwrap().unwrap(), b"kept");
    }

    #[test]
    fn test_delete() {
        let (storage, _temp_dir) = setup();

        storage.put_raw("user-001", b"data").unwrap();

        assert!(storage.delete("user-001").unwrap());
        assert!(storage.get_raw("user-001").unwrap().is_none());
        assert!(!storage.delete("user-001").unwrap());
    }
}
