use super::{LedgerRpc, Post};
use crate::error::Error;
use crate::unixtime::Unixtime;

pub const DEFAULT_MAX_POSTS: usize = 1000;

/// Fetch up to `max` of the most recent posts by `username` and keep the
/// ones made at or after `since`, oldest first.
pub async fn posts_since(
    rpc: &dyn LedgerRpc,
    username: &str,
    since: Unixtime,
    max: usize,
) -> Result<Vec<Post>, Error> {
    let mut posts = rpc.get_posts(max, username).await?;
    posts.sort_by_key(|p| (p.userpost.time, p.userpost.seq));

    // posts are sorted by time, so everything from here on is new enough
    let first = posts.partition_point(|p| p.userpost.time < since.0);
    Ok(posts.split_off(first))
}
