//! JSON-RPC over the node's IPC socket
//!
//! Each request opens its own connection, so an [`IpcNode`] can be shared by
//! any number of in-flight deployments.

use crate::chain::rpc::{parse_quantity, NodeRpc, RpcError, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::UnixStream;
use tokio_util::codec::{Decoder, Encoder, Framed};

/// Codec for a stream of JSON values.
///
/// Outgoing values are newline terminated. Incoming values are split by
/// parsing, so responses do not need a delimiter.
pub struct JsonCodec;

impl Encoder<Value> for JsonCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serde_json::to_vec(&item)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

        dst.reserve(data.len() + 1);
        dst.put_slice(&data);
        dst.put_u8(b'\n');

        Ok(())
    }
}

impl Decoder for JsonCodec {
    type Item = Value;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Drop whitespace between values
        let leading = src
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        src.advance(leading);

        if src.is_empty() {
            return Ok(None);
        }

        let (value, consumed) = {
            let mut values = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(value)) => (value, values.byte_offset()),
                // Partial value, wait for more bytes
                Some(Err(e)) if e.is_eof() => return Ok(None),
                Some(Err(e)) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    ))
                }
                None => return Ok(None),
            }
        };

        src.advance(consumed);
        Ok(Some(value))
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Longest wait for the node to answer one call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Node client speaking JSON-RPC 2.0 over a Unix domain socket
pub struct IpcNode {
    path: PathBuf,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl IpcNode {
    /// Create a client for the socket at `path` (no connection is made yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_id: AtomicU64::new(1),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound each call, connection included, by `timeout`
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Client for `<datadir>/geth.ipc`
    pub fn from_datadir(datadir: &Path) -> Self {
        Self::new(datadir.join("geth.ipc"))
    }

    /// Socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Issue a single call and decode its result
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        tokio::time::timeout(self.request_timeout, self.exchange(method, params))
            .await
            .map_err(|_| {
                log::warn!("rpc {} got no answer within {:?}", method, self.request_timeout);
                RpcError::TimedOut(self.request_timeout)
            })?
    }

    async fn exchange<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stream = UnixStream::connect(&self.path).await?;
        let mut framed = Framed::new(stream, JsonCodec);

        log::debug!("rpc -> {} #{}", method, id);
        framed
            .send(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .await?;

        while let Some(frame) = framed.next().await {
            let response: RpcResponse = serde_json::from_value(frame?)?;

            // Skip anything that is not ours (e.g. subscription notifications)
            if response.id != Some(id) {
                continue;
            }

            if let Some(err) = response.error {
                return Err(RpcError::Node {
                    code: err.code,
                    message: err.message,
                });
            }

            let result = response.result.unwrap_or(Value::Null);
            return Ok(serde_json::from_value(result)?);
        }

        Err(RpcError::Disconnected)
    }
}

#[async_trait]
impl NodeRpc for IpcNode {
    async fn coinbase(&self) -> Result<String, RpcError> {
        self.request("eth_coinbase", json!([])).await
    }

    async fn unlock_account(&self, account: &str, passphrase: &str) -> Result<bool, RpcError> {
        self.request("personal_unlockAccount", json!([account, passphrase]))
            .await
    }

    async fn balance(&self, address: &str) -> Result<u128, RpcError> {
        let raw: String = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&raw)
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, RpcError> {
        self.request("eth_sendTransaction", json!([tx])).await
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainClient;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;

    #[test]
    fn test_decode_split_and_concatenated_values() {
        let mut codec = JsonCodec;
        let mut buf = BytesMut::from(&b"{\"id\":1,\"res"[..]);

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"ult\":\"0x1\"}\n{\"id\":2}");
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(first["result"], "0x1");

        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second["id"], 2);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut codec = JsonCodec;
        let mut buf = BytesMut::from(&b"}{"[..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = JsonCodec;
        let mut buf = BytesMut::new();
        codec.encode(json!({"a": 1}), &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"a\":1}\n");
    }

    /// Accept one connection, read one request and answer with `reply(id)`
    async fn serve_once(listener: UnixListener, reply: impl Fn(u64) -> Value) -> Value {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let request: Value = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Ok(v) = serde_json::from_slice::<Value>(&buf) {
                break v;
            }
        };
        let id = request["id"].as_u64().unwrap();
        let body = serde_json::to_vec(&reply(id)).unwrap();
        stream.write_all(&body).await.unwrap();
        request
    }

    #[tokio::test]
    async fn test_balance_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path());
        let listener = UnixListener::bind(node.path()).unwrap();

        let server = tokio::spawn(serve_once(listener, |id| {
            json!({"jsonrpc": "2.0", "id": id, "result": "0xde0b6b3a7640000"})
        }));

        let balance = node.balance("0x1234").await.unwrap();
        assert_eq!(balance, 1_000_000_000_000_000_000);

        let request = server.await.unwrap();
        assert_eq!(request["method"], "eth_getBalance");
        assert_eq!(request["params"][0], "0x1234");
        assert_eq!(request["params"][1], "latest");
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path());
        let listener = UnixListener::bind(node.path()).unwrap();

        let server = tokio::spawn(serve_once(listener, |id| {
            json!({"jsonrpc": "2.0", "id": id, "result": null})
        }));

        let receipt = node.transaction_receipt("0xfeed").await.unwrap();
        assert!(receipt.is_none());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_node_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path());
        let listener = UnixListener::bind(node.path()).unwrap();

        let server = tokio::spawn(serve_once(listener, |id| {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": "authentication needed"}})
        }));

        let err = node.coinbase().await.unwrap_err();
        match err {
            RpcError::Node { code, message } => {
                assert_eq!(code, -32000);
                assert_eq!(message, "authentication needed");
            }
            other => panic!("unexpected error: {}", other),
        }
        server.await.unwrap();
    }

    /// Accept connections and never answer them
    fn silent_node(listener: UnixListener) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        })
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path()).with_request_timeout(Duration::from_millis(100));
        let server = silent_node(UnixListener::bind(node.path()).unwrap());

        assert!(matches!(
            node.balance("0x1234").await,
            Err(RpcError::TimedOut(_))
        ));
        server.abort();
    }

    #[tokio::test]
    async fn test_receipt_wait_ends_at_deadline_on_silent_node() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path());
        let server = silent_node(UnixListener::bind(node.path()).unwrap());
        let client = ChainClient::new(std::sync::Arc::new(node))
            .with_poll_interval(Duration::from_millis(20));

        let deadline = Duration::from_millis(300);
        let start = std::time::Instant::now();
        let address = client
            .wait_for_contract_address("0x1", deadline)
            .await
            .unwrap();

        assert!(address.is_none());
        assert!(start.elapsed() < deadline + Duration::from_secs(1));
        server.abort();
    }

    #[tokio::test]
    async fn test_missing_socket_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let node = IpcNode::from_datadir(dir.path());
        assert!(matches!(
            node.coinbase().await,
            Err(RpcError::IoError(_))
        ));
    }
}
