//! Scriptable `RemoteApi` that records every call

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_core::RemoteApi;
use fieldsync_domain::{DatasetKind, FieldSyncError, Result as DomainResult};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Succeeds by default. Endpoints can be scripted to fail a number of times,
/// fail forever, or respond slowly.
#[derive(Default)]
pub struct ScriptedApi {
    calls: Mutex<Vec<RecordedCall>>,
    scripted_failures: Mutex<HashMap<String, VecDeque<FieldSyncError>>>,
    always_fail: Mutex<HashMap<String, FieldSyncError>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedApi {
    /// Fail the next `times` calls to `endpoint` with `error`.
    pub fn fail_times(&self, endpoint: &str, times: usize, error: FieldSyncError) {
        let mut failures = self.scripted_failures.lock().unwrap();
        let queue = failures.entry(endpoint.to_string()).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    pub fn fail_always(&self, endpoint: &str, error: FieldSyncError) {
        self.always_fail.lock().unwrap().insert(endpoint.to_string(), error);
    }

    /// Every call sleeps this long before answering.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|call| call.method != "GET").collect()
    }

    pub fn dataset_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == "GET")
            .map(|call| call.endpoint)
            .collect()
    }

    async fn respond(
        &self,
        method: &'static str,
        endpoint: &str,
        body: Option<&Value>,
    ) -> DomainResult<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            body: body.cloned(),
        });

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.always_fail.lock().unwrap().get(endpoint) {
            return Err(err.clone());
        }
        let scripted = self
            .scripted_failures
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        Ok(json!({"ok": true, "endpoint": endpoint}))
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn post(&self, endpoint: &str, body: &Value) -> DomainResult<Value> {
        self.respond("POST", endpoint, Some(body)).await
    }

    async fn put(&self, endpoint: &str, body: &Value) -> DomainResult<Value> {
        self.respond("PUT", endpoint, Some(body)).await
    }

    async fn patch(&self, endpoint: &str, body: &Value) -> DomainResult<Value> {
        self.respond("PATCH", endpoint, Some(body)).await
    }

    async fn delete(&self, endpoint: &str) -> DomainResult<Value> {
        self.respond("DELETE", endpoint, None).await
    }

    async fn fetch_dataset(&self, kind: DatasetKind) -> DomainResult<Value> {
        self.respond("GET", kind.endpoint(), None).await.map(|_| json!([{"kind": kind.to_string()}]))
    }
}
