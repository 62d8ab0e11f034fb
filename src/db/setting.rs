use super::Storage;
use crate::error::Error;
use std::str::FromStr;

impl Storage {
    pub async fn fetch_setting(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_owned();
        self.with_db(move |db| {
            let mut stmt = db.prepare("SELECT value FROM settings WHERE key = ?")?;
            let mut rows = stmt.query([key])?;
            match rows.next()? {
                Some(row) => Ok(Some(row.get(0)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Fetch a setting, falling back to `default` if it is missing or does
    /// not parse
    pub async fn fetch_setting_or_default<T: FromStr>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, Error> {
        match self.fetch_setting(key).await? {
            Some(s) => match s.parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!("Ignoring unparsable setting {}={}", key, s);
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    pub async fn write_settings(&self, pairs: Vec<(&'static str, String)>) -> Result<(), Error> {
        self.with_db(move |db| {
            let txn = db.transaction()?;
            for (key, value) in pairs.iter() {
                txn.execute(
                    "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                    (key, value),
                )?;
            }
            txn.commit()?;
            Ok(())
        })
        .await
    }
}
