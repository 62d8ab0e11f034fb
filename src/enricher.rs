use crate::error::Error;
use crate::ledger::{DhtMode, DhtRecord, LedgerRpc};
use crate::unixtime::Unixtime;
use crate::user::User;
use serde_json::Value;
use std::sync::Arc;

/// Profile fields copied out of the "profile" DHT record
const PROFILE_FIELDS: [&str; 4] = ["location", "url", "bio", "fullname"];

/// Fills in a user's profile from the DHT and the node's following list
pub struct ProfileEnricher {
    rpc: Arc<dyn LedgerRpc>,
}

impl ProfileEnricher {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> ProfileEnricher {
        ProfileEnricher { rpc }
    }

    /// Fetch a fresh copy of `prior`.
    ///
    /// Profile fields are merged: a field missing from the DHT keeps its
    /// prior value. The following list is replaced. If the location text
    /// changes the old coordinates are dropped. `last_update` is set on
    /// success. On error nothing is returned and `prior` is untouched.
    pub async fn enrich(&self, prior: &User) -> Result<User, Error> {
        let mut user = prior.clone();
        let username = prior.username.as_str();

        let avatar = self.rpc.dht_get(username, "avatar", DhtMode::Single).await?;
        if let Some(v) = single_value(username, "avatar", &avatar) {
            if let Some(s) = value_to_text(v) {
                user.avatar = s;
            }
        }

        let profile = self.rpc.dht_get(username, "profile", DhtMode::Single).await?;
        if let Some(Value::Object(map)) = single_value(username, "profile", &profile) {
            for key in PROFILE_FIELDS {
                let Some(text) = map.get(key).and_then(value_to_text) else {
                    continue;
                };
                match key {
                    "location" => user.location = text,
                    "url" => user.url = text,
                    "bio" => user.bio = text,
                    "fullname" => user.fullname = text,
                    _ => {}
                }
            }
        }

        user.following = self.rpc.get_following(username).await?;

        if user.location != prior.location {
            user.coords = None;
        }

        user.last_update = Unixtime::now();
        Ok(user)
    }
}

/// The value of a single-valued DHT key. We expect zero or one records;
/// anything else is treated as absent.
fn single_value<'a>(username: &str, key: &str, records: &'a [DhtRecord]) -> Option<&'a Value> {
    match records {
        [record] => record.value(),
        [] => None,
        _ => {
            tracing::debug!(
                "Ignoring {} records for {}/{}, expected one",
                records.len(),
                username,
                key
            );
            None
        }
    }
}

fn value_to_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
