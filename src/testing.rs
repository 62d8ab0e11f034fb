//! In-memory stand-ins for the twister node and the geocoding provider

use crate::error::{Error, ErrorKind};
use crate::geo::{Coordinates, GeoCandidate, Geocoder};
use crate::ledger::{Block, DhtMode, DhtRecord, LedgerRpc, Post, UserPost};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// A ledger held in memory. Block `i` has hash `FakeLedger::block_hash(i)`
/// and links to block `i + 1`.
#[derive(Default)]
pub(crate) struct FakeLedger {
    blocks: Vec<Block>,
    failing_blocks: HashSet<String>,
    failing_users: HashSet<String>,
    hanging_users: HashSet<String>,
    dht: HashMap<(String, String), Vec<DhtRecord>>,
    following: HashMap<String, Vec<String>>,
    posts: Vec<Post>,
}

impl FakeLedger {
    pub fn block_hash(i: usize) -> String {
        format!("{:064x}", i)
    }

    pub fn with_chain(chain: &[&[&str]]) -> FakeLedger {
        let count = chain.len();
        let blocks = chain
            .iter()
            .enumerate()
            .map(|(i, usernames)| Block {
                hash: FakeLedger::block_hash(i),
                usernames: usernames.iter().map(|u| u.to_string()).collect(),
                next_block_hash: if i + 1 < count {
                    Some(FakeLedger::block_hash(i + 1))
                } else {
                    None
                },
            })
            .collect();
        FakeLedger {
            blocks,
            ..Default::default()
        }
    }

    /// Point block `from` at block `to`
    pub fn link(&mut self, from: usize, to: usize) {
        self.blocks[from].next_block_hash = Some(FakeLedger::block_hash(to));
    }

    pub fn fail_block(&mut self, i: usize) {
        self.failing_blocks.insert(FakeLedger::block_hash(i));
    }

    /// Every per-user call for `username` fails
    pub fn fail_user(&mut self, username: &str) {
        self.failing_users.insert(username.to_owned());
    }

    /// Every per-user call for `username` never returns
    pub fn hang_user(&mut self, username: &str) {
        self.hanging_users.insert(username.to_owned());
    }

    pub fn set_dht(&mut self, username: &str, key: &str, records: Vec<DhtRecord>) {
        self.dht
            .insert((username.to_owned(), key.to_owned()), records);
    }

    pub fn set_following(&mut self, username: &str, following: &[&str]) {
        self.following.insert(
            username.to_owned(),
            following.iter().map(|u| u.to_string()).collect(),
        );
    }

    pub fn add_post(&mut self, username: &str, seq: i64, time: i64) {
        self.posts.push(Post {
            userpost: UserPost {
                username: username.to_owned(),
                seq,
                time,
                msg: format!("post {} by {}", seq, username),
            },
        });
    }

    async fn check_user(&self, username: &str) -> Result<(), Error> {
        if self.hanging_users.contains(username) {
            std::future::pending::<()>().await;
        }
        if self.failing_users.contains(username) {
            return Err(ErrorKind::General(format!("node unavailable for {}", username)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for FakeLedger {
    async fn get_block_hash(&self, height: u64) -> Result<String, Error> {
        match self.blocks.get(height as usize) {
            Some(block) => Ok(block.hash.clone()),
            None => Err(ErrorKind::Rpc {
                code: -8,
                message: "getblockhash: Block height out of range".to_owned(),
            }
            .into()),
        }
    }

    async fn get_block(&self, hash: &str) -> Result<Block, Error> {
        if self.failing_blocks.contains(hash) {
            return Err(ErrorKind::General(format!("block {} unavailable", hash)).into());
        }
        match self.blocks.iter().find(|b| b.hash == hash) {
            Some(block) => Ok(block.clone()),
            None => Err(ErrorKind::Rpc {
                code: -5,
                message: "getblock: Block not found".to_owned(),
            }
            .into()),
        }
    }

    async fn get_following(&self, username: &str) -> Result<Vec<String>, Error> {
        self.check_user(username).await?;
        Ok(self.following.get(username).cloned().unwrap_or_default())
    }

    async fn dht_get(
        &self,
        username: &str,
        key: &str,
        _mode: DhtMode,
    ) -> Result<Vec<DhtRecord>, Error> {
        self.check_user(username).await?;
        Ok(self
            .dht
            .get(&(username.to_owned(), key.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_posts(&self, count: usize, username: &str) -> Result<Vec<Post>, Error> {
        self.check_user(username).await?;
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.userpost.username == username)
            .cloned()
            .collect();
        // newest first, like the node
        posts.sort_by_key(|p| std::cmp::Reverse(p.userpost.time));
        posts.truncate(count);
        Ok(posts)
    }
}

/// Resolves "<lat>,<lon>" strings, answers nothing for "nowhere" and
/// fails for "broken". Counts every call.
#[derive(Default)]
pub(crate) struct FakeGeocoder {
    pub calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<GeoCandidate>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query == "broken" {
            return Err(ErrorKind::General("provider unavailable".to_owned()).into());
        }
        if query == "Main Street" {
            return Ok(vec![
                GeoCandidate {
                    coords: Coordinates { lat: 1.0, lon: 1.0 },
                    tags: vec!["route".to_owned()],
                },
                GeoCandidate {
                    coords: Coordinates { lat: 2.0, lon: 2.0 },
                    tags: vec!["town".to_owned()],
                },
            ]);
        }
        let parts: Vec<f64> = query
            .split(',')
            .filter_map(|p| p.trim().parse::<f64>().ok())
            .collect();
        if parts.len() == 2 {
            Ok(vec![GeoCandidate {
                coords: Coordinates {
                    lat: parts[0],
                    lon: parts[1],
                },
                tags: vec!["city".to_owned()],
            }])
        } else {
            Ok(vec![])
        }
    }
}
