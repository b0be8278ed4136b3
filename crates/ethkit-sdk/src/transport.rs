//! Transport layer for JSON-RPC communication

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::SdkError;

/// Transport trait for RPC communication (object-safe)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an RPC request and return the `result` member of the response
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        (**self).request_json(method, params).await
    }
}

/// Deserialize a `result` value into `T`
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

#[derive(Debug, Clone)]
enum Scripted {
    Result(Value),
    Rpc(i64, String),
    Unreachable(String),
}

#[derive(Default)]
struct MockState {
    queued: HashMap<String, VecDeque<Scripted>>,
    sticky: HashMap<String, Value>,
    defaults: HashMap<String, Value>,
    requests: Vec<(String, Vec<Value>)>,
}

/// Scriptable in-memory transport for tests.
///
/// Lookup order per request: queued one-shot responses, then sticky responses,
/// then built-in defaults. Clones share state.
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Mock with defaults for the common `eth_` methods
    pub fn new() -> Self {
        let defaults = [
            ("eth_chainId", Value::from("0x1")),
            ("eth_gasPrice", Value::from("0x3b9aca00")),
            ("eth_blockNumber", Value::from("0x100")),
            ("eth_getBalance", Value::from("0xde0b6b3a7640000")),
            ("eth_getTransactionCount", Value::from("0x0")),
            ("eth_estimateGas", Value::from("0x5208")),
            ("eth_call", Value::from("0x")),
            ("eth_getCode", Value::from("0x")),
            ("eth_getLogs", Value::Array(vec![])),
            ("eth_getTransactionReceipt", Value::Null),
            ("eth_getBlockByNumber", Value::Null),
        ]
        .into_iter()
        .map(|(method, value)| (method.to_string(), value))
        .collect();

        Self {
            state: Arc::new(Mutex::new(MockState {
                defaults,
                ..Default::default()
            })),
        }
    }

    /// Answer every call to `method` with `response`
    pub fn set_response(&self, method: &str, response: Value) {
        self.state.lock().sticky.insert(method.to_string(), response);
    }

    /// Answer the next call to `method` with `response`
    pub fn push_response(&self, method: &str, response: Value) {
        self.push(method, Scripted::Result(response));
    }

    /// Fail the next call to `method` with a JSON-RPC error
    pub fn push_error(&self, method: &str, code: i64, message: &str) {
        self.push(method, Scripted::Rpc(code, message.to_string()));
    }

    /// Fail the next call to `method` as if the node were unreachable
    pub fn push_unreachable(&self, method: &str) {
        self.push(method, Scripted::Unreachable(format!("{method}: connection refused")));
    }

    fn push(&self, method: &str, scripted: Scripted) {
        self.state
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(scripted);
    }

    /// Drop scripted and sticky responses and the request log
    pub fn clear_responses(&self) {
        let mut state = self.state.lock();
        state.queued.clear();
        state.sticky.clear();
        state.requests.clear();
    }

    /// Every request seen so far, in order
    pub fn requests(&self) -> Vec<(String, Vec<Value>)> {
        self.state.lock().requests.clone()
    }

    /// Number of requests made for `method`
    pub fn request_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let mut state = self.state.lock();
        state.requests.push((method.to_string(), params));

        let scripted = state.queued.get_mut(method).and_then(VecDeque::pop_front);
        match scripted {
            Some(Scripted::Result(value)) => return Ok(value),
            Some(Scripted::Rpc(code, message)) => return Err(SdkError::Rpc { code, message }),
            Some(Scripted::Unreachable(reason)) => return Err(SdkError::Connectivity(reason)),
            None => {}
        }

        if let Some(value) = state.sticky.get(method).or_else(|| state.defaults.get(method)) {
            return Ok(value.clone());
        }

        Err(SdkError::Rpc {
            code: -32601,
            message: format!("Method not found: {}", method),
        })
    }
}

/// HTTP transport for a real node
#[cfg(feature = "http")]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    request_id: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "http")]
impl HttpTransport {
    /// Transport with the default request timeout
    pub fn new(url: &str) -> Result<Self, SdkError> {
        Self::with_timeout(url, std::time::Duration::from_secs(30))
    }

    /// Transport whose requests fail with [`SdkError::Connectivity`] after `timeout`
    pub fn with_timeout(url: &str, timeout: std::time::Duration) -> Result<Self, SdkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Connectivity(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            request_id: std::sync::atomic::AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl Transport for HttpTransport {
    async fn request_json(&self, method: &str, params: Vec<Value>) -> Result<Value, SdkError> {
        let id = self.next_id();
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(id, method, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SdkError::Connectivity(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            return Err(SdkError::Connectivity(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }

        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| SdkError::Serialization(format!("{method}: {e}")))?;

        if let Some(error) = response.error {
            return Err(SdkError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[cfg(feature = "http")]
#[derive(serde::Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_defaults() {
        let transport = MockTransport::new();
        let result = transport.request_json("eth_chainId", vec![]).await.unwrap();
        assert_eq!(result, Value::from("0x1"));
    }

    #[tokio::test]
    async fn test_mock_queue_before_sticky() {
        let transport = MockTransport::new();
        transport.set_response("eth_blockNumber", Value::from("0x5"));
        transport.push_response("eth_blockNumber", Value::from("0x4"));

        let first = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        let second = transport.request_json("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(first, Value::from("0x4"));
        assert_eq!(second, Value::from("0x5"));
    }

    #[tokio::test]
    async fn test_mock_scripted_errors() {
        let transport = MockTransport::new();
        transport.push_error("eth_sendRawTransaction", -32000, "nonce too low");
        transport.push_unreachable("eth_gasPrice");

        assert!(matches!(
            transport.request_json("eth_sendRawTransaction", vec![]).await,
            Err(SdkError::Rpc { code: -32000, .. })
        ));
        assert!(matches!(
            transport.request_json("eth_gasPrice", vec![]).await,
            Err(SdkError::Connectivity(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_unknown_method() {
        let transport = MockTransport::new();
        let err = transport.request_json("eth_unknown", vec![]).await.unwrap_err();
        assert!(matches!(err, SdkError::Rpc { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let transport = MockTransport::new();
        let shared = transport.clone();
        transport
            .request_json("eth_getBalance", vec![Value::from("0xabc")])
            .await
            .unwrap();
        assert_eq!(shared.request_count("eth_getBalance"), 1);
        assert_eq!(shared.requests()[0].1, vec![Value::from("0xabc")]);
    }
}
