use super::user::insert_user_if_missing;
use super::Storage;
use crate::error::Error;
use crate::user::User;

impl Storage {
    /// Hash of the last block seen by a completed crawl
    pub async fn read_last_block_hash(&self) -> Result<Option<String>, Error> {
        self.with_db(|db| {
            let mut stmt = db.prepare("SELECT last_block_hash FROM ledger_state WHERE id = 1")?;
            let mut rows = stmt.query([])?;
            match rows.next()? {
                Some(row) => Ok(row.get(0)?),
                None => Ok(None),
            }
        })
        .await
    }

    /// Record the outcome of a completed crawl: the head block hash and a
    /// blank record for every username seen for the first time. Both land in
    /// one transaction.
    pub async fn record_crawl(&self, last_block_hash: &str, new_users: Vec<User>) -> Result<(), Error> {
        let hash = last_block_hash.to_owned();
        self.with_db(move |db| {
            let txn = db.transaction()?;
            txn.execute(
                "INSERT OR REPLACE INTO ledger_state (id, last_block_hash) VALUES (1, ?)",
                [&hash],
            )?;
            for user in new_users.iter() {
                insert_user_if_missing(&txn, user)?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_record_crawl() {
        let storage = Storage::open_in_memory().unwrap();
        assert_eq!(storage.read_last_block_hash().await.unwrap(), None);

        let ttl = Duration::from_secs(60);
        storage
            .record_crawl("00ab", vec![User::blank("alice", ttl), User::blank("bob", ttl)])
            .await
            .unwrap();
        storage.record_crawl("00cd", vec![]).await.unwrap();

        assert_eq!(
            storage.read_last_block_hash().await.unwrap(),
            Some("00cd".to_owned())
        );
        assert_eq!(storage.count_users().await.unwrap(), 2);
        let alice = storage.read_user("alice").await.unwrap().unwrap();
        assert_eq!(alice.last_update.0, -60);
    }
}
