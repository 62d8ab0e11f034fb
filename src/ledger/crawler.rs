use super::LedgerRpc;
use crate::error::{Error, ErrorKind};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Everything a complete walk of the ledger found
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlResult {
    pub usernames: BTreeSet<String>,
    pub last_block_hash: String,
    pub blocks: u64,
}

/// Walks the ledger from genesis to head, collecting usernames
pub struct LedgerCrawler {
    rpc: Arc<dyn LedgerRpc>,
}

impl LedgerCrawler {
    pub fn new(rpc: Arc<dyn LedgerRpc>) -> LedgerCrawler {
        LedgerCrawler { rpc }
    }

    /// Walk the whole chain. Any RPC failure aborts the walk; there is no
    /// partial result.
    pub async fn crawl(&self) -> Result<CrawlResult, Error> {
        let mut next_hash = self.rpc.get_block_hash(0).await?;
        let mut usernames: BTreeSet<String> = BTreeSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut reported = 0;

        loop {
            let block = self.rpc.get_block(&next_hash).await?;
            if !seen.insert(block.hash.clone()) {
                return Err(ErrorKind::BadRpcResponse(format!(
                    "block {} visited twice, the chain loops",
                    block.hash
                ))
                .into());
            }

            usernames.extend(block.usernames);
            if usernames.len() > reported {
                reported = usernames.len();
                tracing::info!("Found {} usernames", reported);
            }

            match block.next_block_hash {
                Some(hash) => next_hash = hash,
                None => {
                    tracing::debug!("Reached ledger head {} after {} blocks", block.hash, seen.len());
                    return Ok(CrawlResult {
                        usernames,
                        last_block_hash: block.hash,
                        blocks: seen.len() as u64,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeLedger;

    #[tokio::test]
    async fn test_crawl_unions_all_blocks() {
        let ledger = FakeLedger::with_chain(&[
            &["alice", "bob"],
            &[],
            &["bob", "carol"],
            &["dave"],
        ]);
        let result = LedgerCrawler::new(Arc::new(ledger)).crawl().await.unwrap();

        let expected: BTreeSet<String> = ["alice", "bob", "carol", "dave"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(result.usernames, expected);
        assert_eq!(result.blocks, 4);
        assert_eq!(result.last_block_hash, FakeLedger::block_hash(3));
    }

    #[tokio::test]
    async fn test_crawl_empty_ledger() {
        let ledger = FakeLedger::with_chain(&[&[]]);
        let result = LedgerCrawler::new(Arc::new(ledger)).crawl().await.unwrap();
        assert!(result.usernames.is_empty());
        assert_eq!(result.blocks, 1);
    }

    #[tokio::test]
    async fn test_crawl_fails_on_block_error() {
        let mut ledger = FakeLedger::with_chain(&[&["alice"], &["bob"], &["carol"]]);
        ledger.fail_block(1);
        assert!(LedgerCrawler::new(Arc::new(ledger)).crawl().await.is_err());
    }

    #[tokio::test]
    async fn test_crawl_detects_loops() {
        let mut ledger = FakeLedger::with_chain(&[&["alice"], &["bob"]]);
        ledger.link(1, 0);
        let err = LedgerCrawler::new(Arc::new(ledger)).crawl().await.err().unwrap();
        assert!(matches!(err.kind, ErrorKind::BadRpcResponse(_)));
    }
}
