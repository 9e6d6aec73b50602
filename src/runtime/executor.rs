/// Call Executor
///
/// Invokes a node's primary endpoint and, when that fails, its fallback
/// endpoint, each under a timeout and the run's cancellation token.
/// The network itself sits behind [`ServiceTransport`] so the scheduler can be
/// driven by the real HTTP client or by in-memory stubs.

use crate::error::CallError;
use crate::graph::Node;
use futures::future::BoxFuture;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Request/response boundary to remote services
///
/// One call posts a JSON body to an endpoint and yields the decoded JSON
/// response. Implementations report transport, status and decode failures;
/// timeouts and cancellation are applied by [`CallExecutor`].
pub trait ServiceTransport: Send + Sync + std::fmt::Debug {
    fn post<'a>(&'a self, endpoint: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, CallError>>;
}

/// HTTP transport over a shared reqwest connection pool
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, TLS roots, default headers)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ServiceTransport for HttpTransport {
    fn post<'a>(&'a self, endpoint: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, CallError>> {
        Box::pin(async move {
            tracing::debug!("🌍 POST {}", endpoint);
            tracing::debug!("📦 Request body: {}", body);

            let response = self
                .client
                .post(endpoint)
                .json(body)
                .send()
                .await
                .map_err(|e| CallError::Transport {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

            let status = response.status();
            tracing::debug!("📡 Response status from {}: {}", endpoint, status);
            if !status.is_success() {
                return Err(CallError::Status {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                });
            }

            let bytes = response.bytes().await.map_err(|e| CallError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("failed to read response body: {}", e),
            })?;

            // 204-style empty bodies decode to null
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }

            serde_json::from_slice(&bytes).map_err(|e| CallError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
        })
    }
}

/// Outcome of dispatching one node (primary call plus optional fallback)
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome {
    /// Primary call succeeded
    Succeeded { output: Value },
    /// Primary call failed, fallback succeeded
    Recovered {
        output: Value,
        primary: CallError,
        fallback: String,
    },
    /// No output: primary failed and the fallback was absent or failed too
    Failed {
        primary: CallError,
        fallback: Option<(String, CallError)>,
    },
}

impl NodeOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, NodeOutcome::Failed { .. })
    }

    /// Failed with no fallback to try and not merely cut short by cancellation
    pub fn is_unguarded_failure(&self) -> bool {
        matches!(
            self,
            NodeOutcome::Failed { primary, fallback: None } if !primary.is_cancelled()
        )
    }

    /// Error text recorded for the node, if any
    pub fn error_message(&self) -> Option<String> {
        match self {
            NodeOutcome::Succeeded { .. } => None,
            NodeOutcome::Recovered { primary, fallback, .. } => {
                Some(format!("{}; recovered by fallback {}", primary, fallback))
            }
            NodeOutcome::Failed { primary, fallback: None } => Some(primary.to_string()),
            NodeOutcome::Failed {
                primary,
                fallback: Some((_, fallback_error)),
            } => Some(format!("{}; fallback failed: {}", primary, fallback_error)),
        }
    }
}

/// Issues bounded, cancellable calls through a shared transport
#[derive(Debug, Clone)]
pub struct CallExecutor {
    transport: Arc<dyn ServiceTransport>,
    default_timeout: Duration,
}

impl CallExecutor {
    pub fn new(transport: Arc<dyn ServiceTransport>, default_timeout: Duration) -> Self {
        Self {
            transport,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// One request to `endpoint`, bounded by `timeout` and `cancel`
    pub async fn call(
        &self,
        endpoint: &str,
        input: &Value,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Value, CallError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CallError::Cancelled {
                endpoint: endpoint.to_string(),
            }),
            result = tokio::time::timeout(timeout, self.transport.post(endpoint, input)) => match result {
                Ok(response) => response,
                Err(_) => Err(CallError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        }
    }

    /// Call a node's primary endpoint, then its fallback once if needed
    ///
    /// The fallback receives the same input. A cancelled primary call is not
    /// retried.
    pub async fn call_node(
        &self,
        node: &Node,
        input: &Value,
        fallback: Option<&str>,
        cancel: &CancellationToken,
    ) -> NodeOutcome {
        let timeout = node.timeout.unwrap_or(self.default_timeout);
        let start_time = std::time::Instant::now();
        tracing::info!("🚀 Calling '{}' at {} (timeout {:?})", node.name, node.endpoint, timeout);

        let primary = match self.call(&node.endpoint, input, timeout, cancel).await {
            Ok(output) => {
                tracing::info!("✅ Node '{}' completed in {:?}", node.name, start_time.elapsed());
                return NodeOutcome::Succeeded { output };
            }
            Err(primary) => primary,
        };
        tracing::error!("❌ Service {} failed: {}", node.name, primary);

        let fallback = match fallback {
            Some(fallback) if !primary.is_cancelled() => fallback,
            _ => return NodeOutcome::Failed { primary, fallback: None },
        };

        tracing::info!("🔁 Attempting fallback {} for {}", fallback, node.name);
        match self.call(fallback, input, timeout, cancel).await {
            Ok(output) => {
                tracing::info!("✅ Node '{}' recovered via fallback in {:?}", node.name, start_time.elapsed());
                NodeOutcome::Recovered {
                    output,
                    primary,
                    fallback: fallback.to_string(),
                }
            }
            Err(fallback_error) => {
                tracing::error!("❌ Fallback {} failed: {}", fallback, fallback_error);
                NodeOutcome::Failed {
                    primary,
                    fallback: Some((fallback.to_string(), fallback_error)),
                }
            }
        }
    }
}
