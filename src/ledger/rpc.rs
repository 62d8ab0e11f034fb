use super::{Block, DhtMode, DhtRecord, LedgerRpc, Post};
use crate::error::{Error, ErrorKind};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcReply {
    fn into_result<T: DeserializeOwned>(self, method: &str) -> Result<T, Error> {
        if let Some(e) = self.error {
            return Err(ErrorKind::Rpc {
                code: e.code,
                message: format!("{method}: {}", e.message),
            }
            .into());
        }
        Ok(serde_json::from_value(self.result)?)
    }
}

/// JSON-RPC 1.0 client for a twisterd node (HTTP POST with basic auth)
pub struct JsonRpcClient {
    client: Client,
    url: Url,
    user: String,
    password: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str, user: &str, password: &str) -> Result<JsonRpcClient, Error> {
        let client = Client::builder()
            .connect_timeout(Duration::new(10, 0))
            .timeout(Duration::new(60, 0))
            .build()?;

        Ok(JsonRpcClient {
            client,
            url: Url::parse(url)?,
            user: user.to_owned(),
            password: password.to_owned(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("RPC {} {}", method, params);
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        // The node answers RPC-level errors with a 500 and a JSON body, so
        // only give up on the status if the body does not parse.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ErrorKind::BadRpcResponse(format!(
                "{method}: {status}, check rpc_user and rpc_password"
            ))
            .into());
        }
        let text = response.text().await?;
        let reply: RpcReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(e) => {
                if status.is_success() {
                    return Err(e.into());
                }
                return Err(ErrorKind::BadRpcResponse(format!("{method}: {status}")).into());
            }
        };
        reply.into_result(method)
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcClient {
    async fn get_block_hash(&self, height: u64) -> Result<String, Error> {
        self.call("getblockhash", json!([height])).await
    }

    async fn get_block(&self, hash: &str) -> Result<Block, Error> {
        self.call("getblock", json!([hash])).await
    }

    async fn get_following(&self, username: &str) -> Result<Vec<String>, Error> {
        self.call("getfollowing", json!([username])).await
    }

    async fn dht_get(
        &self,
        username: &str,
        key: &str,
        mode: DhtMode,
    ) -> Result<Vec<DhtRecord>, Error> {
        self.call("dhtget", json!([username, key, mode.as_str()]))
            .await
    }

    async fn get_posts(&self, count: usize, username: &str) -> Result<Vec<Post>, Error> {
        self.call("getposts", json!([count, [{ "username": username }]]))
            .await
    }
}
