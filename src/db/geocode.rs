use super::Storage;
use crate::error::Error;
use crate::geo::Coordinates;
use std::collections::HashMap;

impl Storage {
    /// Load every resolved location
    pub async fn read_geocache(&self) -> Result<HashMap<String, Coordinates>, Error> {
        self.with_db(|db| {
            let mut stmt = db.prepare("SELECT location, lat, lon FROM geocode")?;
            let mut rows = stmt.query([])?;
            let mut output: HashMap<String, Coordinates> = HashMap::new();
            while let Some(row) = rows.next()? {
                output.insert(
                    row.get(0)?,
                    Coordinates {
                        lat: row.get(1)?,
                        lon: row.get(2)?,
                    },
                );
            }
            Ok(output)
        })
        .await
    }

    /// Remember a resolved location. Resolutions are permanent, so an
    /// existing row is left alone.
    pub async fn write_geocode(&self, location: &str, coords: Coordinates) -> Result<(), Error> {
        let location = location.to_owned();
        self.with_db(move |db| {
            db.execute(
                "INSERT OR IGNORE INTO geocode (location, lat, lon) VALUES (?, ?, ?)",
                (&location, coords.lat, coords.lon),
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_geocode_is_write_once() {
        let storage = Storage::open_in_memory().unwrap();
        let rome = Coordinates {
            lat: 41.8933203,
            lon: 12.4829321,
        };
        storage.write_geocode("Rome", rome).await.unwrap();
        storage
            .write_geocode("Rome", Coordinates { lat: 0.0, lon: 0.0 })
            .await
            .unwrap();

        let cache = storage.read_geocache().await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("Rome"), Some(&rome));
    }
}
