//! Client for the remote task API
//!
//! The remote service accepts `POST {base}/api/task` with a form-encoded
//! `task_name` and answers with a JSON object. Calls never outlive the
//! configured timeout.

use bastion_assets::QueuedTask;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Task that synchronizes the inventory from the cloud provider
pub const ASSETS_SYNC_TASK: &str = "apps.tasks.assets_sync";

/// Default timeout of task API calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum TaskApiError {
    #[error("task API URL is not configured")]
    NotConfigured,

    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("task API answered with a non-object body")]
    InvalidBody,
}

/// HTTP client for the remote task API
#[derive(Debug, Clone)]
pub struct TaskApiClient {
    base_url: Option<String>,
    client: reqwest::Client,
}

impl TaskApiClient {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, TaskApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.map(|u| u.trim_end_matches('/').to_string()),
            client,
        })
    }

    /// A client that fails every submission
    pub fn disabled() -> Self {
        Self {
            base_url: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// Submits a task and returns the remote JSON object
    ///
    /// Non-2xx statuses and bodies that are not JSON objects are errors.
    pub async fn submit(
        &self,
        task_name: &str,
        params: &[(&str, String)],
    ) -> Result<Map<String, Value>, TaskApiError> {
        let base = self.base_url.as_deref().ok_or(TaskApiError::NotConfigured)?;

        let mut form: Vec<(&str, String)> = vec![("task_name", task_name.to_string())];
        form.extend(params.iter().cloned());

        let response = self
            .client
            .post(format!("{}/api/task", base))
            .form(&form)
            .send()
            .await?
            .error_for_status()?;

        match response.json::<Value>().await? {
            Value::Object(body) => Ok(body),
            _ => Err(TaskApiError::InvalidBody),
        }
    }

    /// Triggers the inventory sync and reports the outcome
    ///
    /// Always yields an object with a `status` key, `false` unless the
    /// remote body says otherwise. Failures are reported under `msg`.
    pub async fn sync(&self) -> Value {
        let mut response = Map::new();
        response.insert("status".to_string(), json!(false));

        match self.submit(ASSETS_SYNC_TASK, &[]).await {
            Ok(body) => response.extend(body),
            Err(e) => {
                warn!(error = %e, "Inventory sync submission failed");
                response.insert("msg".to_string(), json!(e.to_string()));
            }
        }

        Value::Object(response)
    }
}

/// Forwards dispatched jobs to the task API until the queue closes
pub fn spawn_forwarder(client: TaskApiClient, mut rx: mpsc::UnboundedReceiver<QueuedTask>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            let params = [
                ("task_id", task.handle.id().to_string()),
                ("asset_id", task.job.asset_id().to_string()),
            ];
            match client.submit(task.job.task_name(), &params).await {
                Ok(_) => info!(task = %task.handle.id(), task_name = task.job.task_name(), "Forwarded task"),
                Err(e) => warn!(
                    task = %task.handle.id(),
                    task_name = task.job.task_name(),
                    error = %e,
                    "Failed to forward task"
                ),
            }
        }
        info!("Task queue closed, forwarder stopping");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Form, http::StatusCode, routing::post, Json, Router};
    use bastion_assets::{AssetJob, ChannelDispatcher, TaskDispatcher};
    use std::collections::HashMap;
    use tokio::net::TcpListener;

    /// Serves `router` on an ephemeral port and returns its base URL
    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: Option<String>) -> TaskApiClient {
        TaskApiClient::new(base, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_sync_merges_remote_body() {
        let router = Router::new().route(
            "/api/task",
            post(|Form(form): Form<HashMap<String, String>>| async move {
                Json(json!({"status": true, "task": form["task_name"]}))
            }),
        );
        let base = serve(router).await;

        let body = client(Some(format!("{}/", base))).sync().await;
        assert_eq!(body, json!({"status": true, "task": ASSETS_SYNC_TASK}));
    }

    #[tokio::test]
    async fn test_sync_reports_http_errors() {
        let router = Router::new().route("/api/task", post(|| async { StatusCode::BAD_GATEWAY }));
        let base = serve(router).await;

        let body = client(Some(base)).sync().await;
        assert_eq!(body["status"], false);
        assert!(body["msg"].as_str().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn test_sync_rejects_non_object_body() {
        let router = Router::new().route("/api/task", post(|| async { Json(json!([1, 2])) }));
        let base = serve(router).await;

        let body = client(Some(base)).sync().await;
        assert_eq!(body["status"], false);
        assert_eq!(body["msg"], "task API answered with a non-object body");
    }

    #[tokio::test]
    async fn test_sync_times_out() {
        let router = Router::new().route(
            "/api/task",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"status": true}))
            }),
        );
        let base = serve(router).await;

        let body = client(Some(base)).sync().await;
        assert_eq!(body["status"], false);
        assert!(body.get("msg").is_some());
    }

    #[tokio::test]
    async fn test_sync_without_configuration() {
        let body = TaskApiClient::disabled().sync().await;
        assert_eq!(body, json!({"status": false, "msg": "task API URL is not configured"}));
    }

    #[tokio::test]
    async fn test_forwarder_posts_jobs() {
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<HashMap<String, String>>();
        let router = Router::new().route(
            "/api/task",
            post(move |Form(form): Form<HashMap<String, String>>| {
                let seen_tx = seen_tx.clone();
                async move {
                    let _ = seen_tx.send(form);
                    Json(json!({"status": true}))
                }
            }),
        );
        let base = serve(router).await;

        let (dispatcher, rx) = ChannelDispatcher::new();
        let forwarder = spawn_forwarder(client(Some(base)), rx);
        let handle = dispatcher
            .dispatch(AssetJob::RefreshHardware { asset_id: 7 })
            .unwrap();

        let form = seen_rx.recv().await.unwrap();
        assert_eq!(form["task_name"], "assets.tasks.update_asset_hardware_info_manual");
        assert_eq!(form["asset_id"], "7");
        assert_eq!(form["task_id"], handle.id().to_string());

        drop(dispatcher);
        forwarder.await.unwrap();
    }
}
