//! MLflow tracking server client (REST API 2.0, blocking)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::config::TrackingConfig;
use super::{ExperimentSink, RunStatus};
use crate::error::{Result, TrainerError};

const ARTIFACT_SCHEME: &str = "mlflow-artifacts:/";

#[derive(Debug, Deserialize)]
struct ExperimentEnvelope {
    experiment: ExperimentInfo,
}

#[derive(Debug, Deserialize)]
struct ExperimentInfo {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    run: RunBody,
}

#[derive(Debug, Deserialize)]
struct RunBody {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

/// Remote tracker talking to an MLflow server. The experiment is resolved
/// (and created if missing) on construction.
pub struct MlflowTracker {
    config: TrackingConfig,
    client: Client,
    experiment_id: String,
    /// run id -> artifact root reported by the server
    artifact_uris: Mutex<HashMap<String, String>>,
}

impl MlflowTracker {
    pub fn new(config: TrackingConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("netsec-trainer/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut tracker = Self {
            config,
            client,
            experiment_id: String::new(),
            artifact_uris: Mutex::new(HashMap::new()),
        };
        tracker.experiment_id = tracker.resolve_experiment()?;

        info!(
            uri = %tracker.config.tracking_uri,
            experiment = %tracker.config.experiment_name,
            experiment_id = %tracker.experiment_id,
            "MLflow tracking initialized"
        );
        Ok(tracker)
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/api/2.0/mlflow/{}",
            self.config.tracking_uri.trim_end_matches('/'),
            endpoint
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    fn post<T: DeserializeOwned>(&self, endpoint: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .authorize(self.client.post(self.api_url(endpoint)))
            .json(&body)
            .send()?;
        parse_response(endpoint, response)
    }

    fn resolve_experiment(&self) -> Result<String> {
        let endpoint = "experiments/get-by-name";
        let response = self
            .authorize(self.client.get(self.api_url(endpoint)))
            .query(&[("experiment_name", self.config.experiment_name.as_str())])
            .send()?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            let created: CreateExperimentResponse = self.post(
                "experiments/create",
                json!({ "name": self.config.experiment_name }),
            )?;
            return Ok(created.experiment_id);
        }

        let found: ExperimentEnvelope = parse_response(endpoint, response)?;
        Ok(found.experiment.experiment_id)
    }
}

fn parse_response<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text()?;
    if !status.is_success() {
        let detail = serde_json::from_str::<ApiError>(&text)
            .map(|e| format!("{} {}", e.error_code, e.message))
            .unwrap_or(text);
        return Err(TrainerError::TrackingError(format!(
            "{} failed with {}: {}",
            endpoint, status, detail
        )));
    }
    serde_json::from_str(&text).map_err(|e| {
        TrainerError::TrackingError(format!("unexpected response from {}: {}", endpoint, e))
    })
}

/// Upload URL for a file under a run's `mlflow-artifacts:/` root
fn artifact_upload_url(
    tracking_uri: &str,
    artifact_uri: &str,
    category: &str,
    file_name: &str,
) -> Result<String> {
    let root = artifact_uri.strip_prefix(ARTIFACT_SCHEME).ok_or_else(|| {
        TrainerError::TrackingError(format!(
            "artifact root '{}' is not served by the tracking server",
            artifact_uri
        ))
    })?;
    let mut segments: Vec<&str> = root.split('/').filter(|s| !s.is_empty()).collect();
    segments.extend(category.split('/').filter(|s| !s.is_empty()));
    segments.push(file_name);

    Ok(format!(
        "{}/api/2.0/mlflow-artifacts/artifacts/{}",
        tracking_uri.trim_end_matches('/'),
        segments.join("/")
    ))
}

impl ExperimentSink for MlflowTracker {
    fn start_run(&self, run_name: &str) -> Result<String> {
        let created: RunEnvelope = self.post(
            "runs/create",
            json!({
                "experiment_id": self.experiment_id,
                "run_name": run_name,
                "start_time": Utc::now().timestamp_millis(),
            }),
        )?;
        let info = created.run.info;
        self.artifact_uris
            .lock()
            .insert(info.run_id.clone(), info.artifact_uri);
        debug!(run_id = %info.run_id, run_name, "MLflow run started");
        Ok(info.run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let _: serde_json::Value = self.post(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        let _: serde_json::Value = self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": 0,
            }),
        )?;
        Ok(())
    }

    fn log_artifact(&self, run_id: &str, local_path: &Path, category: &str) -> Result<()> {
        let artifact_uri = self
            .artifact_uris
            .lock()
            .get(run_id)
            .cloned()
            .ok_or_else(|| TrainerError::TrackingError(format!("no active run with id {}", run_id)))?;
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TrainerError::TrackingError(format!(
                    "artifact path {} has no file name",
                    local_path.display()
                ))
            })?;

        let url = artifact_upload_url(&self.config.tracking_uri, &artifact_uri, category, file_name)?;
        let bytes = fs::read(local_path)?;
        let response = self.authorize(self.client.put(&url)).body(bytes).send()?;
        let _: serde_json::Value = parse_response("mlflow-artifacts/artifacts", response)?;

        debug!(run_id, url = %url, "Artifact uploaded");
        Ok(())
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let _: serde_json::Value = self.post(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": status.as_str(),
                "end_time": Utc::now().timestamp_millis(),
            }),
        )?;
        self.artifact_uris.lock().remove(run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_upload_url() {
        let url = artifact_upload_url(
            "https://tracking.example.com/",
            "mlflow-artifacts:/1/abc123/artifacts",
            "model",
            "best_model.pkl",
        )
        .unwrap();
        assert_eq!(
            url,
            "https://tracking.example.com/api/2.0/mlflow-artifacts/artifacts/1/abc123/artifacts/model/best_model.pkl"
        );
    }

    #[test]
    fn test_foreign_artifact_root_is_rejected() {
        let err = artifact_upload_url("http://localhost:5000", "s3://bucket/1/abc", "model", "m.pkl")
            .unwrap_err();
        assert!(matches!(err, TrainerError::TrackingError(_)));
    }

    #[test]
    fn test_run_response_shape() {
        let body = r#"{"run":{"info":{"run_id":"r1","experiment_id":"0","artifact_uri":"mlflow-artifacts:/0/r1/artifacts","status":"RUNNING"},"data":{}}}"#;
        let parsed: RunEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.run.info.run_id, "r1");
        assert_eq!(parsed.run.info.artifact_uri, "mlflow-artifacts:/0/r1/artifacts");
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(RunStatus::Finished.as_str(), "FINISHED");
        assert_eq!(RunStatus::Failed.as_str(), "FAILED");
    }
}
