mod crawler;
mod posts;
mod rpc;

pub use crawler::{CrawlResult, LedgerCrawler};
pub use posts::{posts_since, DEFAULT_MAX_POSTS};
pub use rpc::JsonRpcClient;

use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A block as reported by `getblock`. Only the parts we walk are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,

    /// Usernames registered in this block
    #[serde(default)]
    pub usernames: Vec<String>,

    /// Absent on the head of the chain
    #[serde(rename = "nextblockhash", default, skip_serializing_if = "Option::is_none")]
    pub next_block_hash: Option<String>,
}

/// How a DHT key is stored: a single value, or multiple values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtMode {
    Single,
    Multi,
}

impl DhtMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DhtMode::Single => "s",
            DhtMode::Multi => "m",
        }
    }
}

/// One signed record returned by `dhtget`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DhtRecord {
    #[serde(default)]
    pub p: Option<DhtPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DhtPayload {
    #[serde(default)]
    pub v: Option<Value>,
}

impl DhtRecord {
    pub fn with_value(v: Value) -> DhtRecord {
        DhtRecord {
            p: Some(DhtPayload { v: Some(v) }),
        }
    }

    /// The nested value, if the record carries one
    pub fn value(&self) -> Option<&Value> {
        self.p.as_ref().and_then(|p| p.v.as_ref())
    }
}

/// A post as returned by `getposts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub userpost: UserPost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPost {
    /// Author
    #[serde(rename = "n")]
    pub username: String,

    /// Per-author sequence number
    #[serde(rename = "k")]
    pub seq: i64,

    pub time: i64,

    #[serde(default)]
    pub msg: String,
}

/// The calls we make against a twister node
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn get_block_hash(&self, height: u64) -> Result<String, Error>;

    async fn get_block(&self, hash: &str) -> Result<Block, Error>;

    async fn get_following(&self, username: &str) -> Result<Vec<String>, Error>;

    async fn dht_get(
        &self,
        username: &str,
        key: &str,
        mode: DhtMode,
    ) -> Result<Vec<DhtRecord>, Error>;

    /// The `count` most recent posts of `username`
    async fn get_posts(&self, count: usize, username: &str) -> Result<Vec<Post>, Error>;
}
