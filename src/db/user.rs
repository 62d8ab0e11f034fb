use super::Storage;
use crate::error::Error;
use crate::geo::Coordinates;
use crate::unixtime::Unixtime;
use crate::user::User;
use rusqlite::{Connection, Row};
use std::collections::BTreeMap;

const USER_COLUMNS: &str =
    "username, avatar, fullname, location, lat, lon, bio, url, last_update, following";

fn user_from_row(row: &Row<'_>) -> Result<User, Error> {
    let lat: Option<f64> = row.get(4)?;
    let lon: Option<f64> = row.get(5)?;
    let following: String = row.get(9)?;
    Ok(User {
        username: row.get(0)?,
        avatar: row.get(1)?,
        fullname: row.get(2)?,
        location: row.get(3)?,
        coords: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        },
        bio: row.get(6)?,
        url: row.get(7)?,
        last_update: Unixtime(row.get(8)?),
        following: serde_json::from_str(&following)?,
    })
}

/// Upsert, without committing. Callers wrap this in a transaction.
pub(super) fn upsert_user(db: &Connection, user: &User) -> Result<(), Error> {
    write_user(db, user, "INSERT OR REPLACE")
}

/// Insert unless the username is already stored, without committing.
pub(super) fn insert_user_if_missing(db: &Connection, user: &User) -> Result<(), Error> {
    write_user(db, user, "INSERT OR IGNORE")
}

fn write_user(db: &Connection, user: &User, verb: &str) -> Result<(), Error> {
    let sql = format!(
        "{} INTO user ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        verb, USER_COLUMNS
    );
    let mut stmt = db.prepare_cached(&sql)?;
    stmt.execute((
        &user.username,
        &user.avatar,
        &user.fullname,
        &user.location,
        user.coords.map(|c| c.lat),
        user.coords.map(|c| c.lon),
        &user.bio,
        &user.url,
        user.last_update.0,
        serde_json::to_string(&user.following)?,
    ))?;
    Ok(())
}

impl Storage {
    /// Look up a single user
    pub async fn read_user(&self, username: &str) -> Result<Option<User>, Error> {
        let sql = format!("SELECT {} FROM user WHERE username = ?", USER_COLUMNS);
        let username = username.to_owned();
        self.with_db(move |db| {
            let mut stmt = db.prepare(&sql)?;
            let mut rows = stmt.query([username])?;
            match rows.next()? {
                Some(row) => Ok(Some(user_from_row(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Load the whole user store, keyed by username
    pub async fn read_all_users(&self) -> Result<BTreeMap<String, User>, Error> {
        let sql = format!("SELECT {} FROM user", USER_COLUMNS);
        self.with_db(move |db| {
            let mut stmt = db.prepare(&sql)?;
            let mut rows = stmt.query([])?;
            let mut output: BTreeMap<String, User> = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let user = user_from_row(row)?;
                output.insert(user.username.clone(), user);
            }
            Ok(output)
        })
        .await
    }

    /// Write these users in a single transaction. Either all of them land or
    /// the previously saved versions stay in place.
    pub async fn write_users(&self, users: Vec<User>) -> Result<(), Error> {
        if users.is_empty() {
            return Ok(());
        }
        let count = users.len();
        self.with_db(move |db| {
            let txn = db.transaction()?;
            for user in users.iter() {
                upsert_user(&txn, user)?;
            }
            txn.commit()?;
            Ok(())
        })
        .await?;
        tracing::debug!("Saved {} users", count);
        Ok(())
    }

    pub async fn count_users(&self) -> Result<usize, Error> {
        self.with_db(|db| {
            let count: i64 = db.query_row("SELECT count(*) FROM user", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
