//! Network request log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ring::RingBuffer;
use crate::action::{ApiClient, ApiResult, Method};
use crate::error::ExportError;

/// One completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    pub id: u64,
    pub method: Method,
    pub path: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub ok: bool,
    /// HTTP status of a failed request, when the server sent one.
    pub status: Option<u16>,
    pub request_body: Option<Value>,
    pub response_body: Option<Value>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct NetworkLog {
    requests: Mutex<RingBuffer<NetworkRequest>>,
    next_id: AtomicU64,
}

impl NetworkLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            requests: Mutex::new(RingBuffer::new(capacity)),
            next_id: AtomicU64::new(1),
        }
    }

    fn record(
        &self,
        method: Method,
        path: String,
        request_body: Option<Value>,
        started_at: DateTime<Utc>,
        elapsed: Instant,
        result: &ApiResult,
    ) {
        let (ok, status, response_body, error) = match result {
            Ok(body) => (true, None, Some(body.clone()), None),
            Err(err) => (false, err.status(), None, Some(err.to_string())),
        };
        let request = NetworkRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            path,
            started_at,
            duration_ms: u64::try_from(elapsed.elapsed().as_millis()).unwrap_or(u64::MAX),
            ok,
            status,
            request_body,
            response_body,
            error,
        };
        tracing::trace!(id = request.id, method = %request.method, path = %request.path, ok, "recorded request");
        self.requests.lock().push(request);
    }

    /// Recorded requests, oldest first.
    pub fn snapshot(&self) -> Vec<NetworkRequest> {
        self.requests.lock().to_vec()
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }

    /// MessagePack encoding of [`snapshot`](Self::snapshot).
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        Ok(rmp_serde::to_vec_named(&self.snapshot())?)
    }
}

/// An [`ApiClient`] that records every call into a [`NetworkLog`].
pub struct RecordingApiClient<C> {
    inner: C,
    log: Arc<NetworkLog>,
}

impl<C: ApiClient> RecordingApiClient<C> {
    pub fn new(inner: C, log: Arc<NetworkLog>) -> Self {
        Self { inner, log }
    }

    pub fn log(&self) -> &Arc<NetworkLog> {
        &self.log
    }

    fn recorded<'a>(
        &'a self,
        method: Method,
        path: String,
        body: Option<Value>,
        call: BoxFuture<'a, ApiResult>,
    ) -> BoxFuture<'a, ApiResult> {
        Box::pin(async move {
            let started_at = Utc::now();
            let elapsed = Instant::now();
            let result = call.await;
            self.log.record(method, path, body, started_at, elapsed, &result);
            result
        })
    }
}

impl<C: ApiClient> ApiClient for RecordingApiClient<C> {
    fn request(&self, method: Method, path: String, body: Option<Value>) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.request(method, path.clone(), body.clone());
        self.recorded(method, path, body, call)
    }

    // The helpers delegate to the inner client's helpers, so its own
    // overrides still apply. Paths are recorded in REST form.

    fn list(&self, entity: &str, params: Option<Value>) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.list(entity, params.clone());
        self.recorded(Method::Get, format!("/{entity}"), params, call)
    }

    fn read(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.read(entity, id);
        self.recorded(Method::Get, item_path(entity, id), None, call)
    }

    fn create(&self, entity: &str, body: Value) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.create(entity, body.clone());
        self.recorded(Method::Post, format!("/{entity}"), Some(body), call)
    }

    fn update(&self, entity: &str, id: &Value, body: Value) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.update(entity, id, body.clone());
        self.recorded(Method::Put, item_path(entity, id), Some(body), call)
    }

    fn remove(&self, entity: &str, id: &Value) -> BoxFuture<'_, ApiResult> {
        let call = self.inner.remove(entity, id);
        self.recorded(Method::Delete, item_path(entity, id), None, call)
    }
}

fn item_path(entity: &str, id: &Value) -> String {
    format!("/{}/{}", entity, crate::action::encode_component(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::json;

    struct Backend;

    impl ApiClient for Backend {
        fn request(&self, method: Method, path: String, _body: Option<Value>) -> BoxFuture<'_, ApiResult> {
            Box::pin(async move {
                match method {
                    Method::Delete => Err(ApiError::Status {
                        status: 403,
                        message: format!("cannot delete {path}"),
                    }),
                    _ => Ok(json!({"path": path})),
                }
            })
        }
    }

    #[tokio::test]
    async fn records_success_and_failure() {
        let log = Arc::new(NetworkLog::new(10));
        let client = RecordingApiClient::new(Backend, log.clone());

        client.create("tasks", json!({"title": "a"})).await.unwrap();
        assert!(client.remove("tasks", &json!(3)).await.is_err());

        let requests = log.snapshot();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::Post);
        assert!(requests[0].ok);
        assert_eq!(requests[0].request_body, Some(json!({"title": "a"})));
        assert_eq!(requests[0].response_body, Some(json!({"path": "/tasks"})));
        assert_eq!(requests[1].path, "/tasks/3");
        assert_eq!(requests[1].status, Some(403));
        assert!(requests[1].error.is_some());
        assert!(requests[0].id < requests[1].id);
    }

    #[tokio::test]
    async fn bounded() {
        let log = Arc::new(NetworkLog::new(2));
        let client = RecordingApiClient::new(Backend, log.clone());
        for id in 0..5 {
            client.read("tasks", &json!(id)).await.unwrap();
        }
        let paths: Vec<String> = log.snapshot().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/tasks/3", "/tasks/4"]);
    }

    #[test]
    fn export_is_messagepack() {
        let log = NetworkLog::new(4);
        let bytes = log.export().unwrap();
        let decoded: Vec<NetworkRequest> = rmp_serde::from_slice(&bytes).unwrap();
        assert!(decoded.is_empty());
    }
}
