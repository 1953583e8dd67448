use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

use crate::model::{ListPage, ListQuery, LogLine, ResourceKind, ResourceRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Async client for the sandbox platform's REST API.
#[derive(Clone)]
pub struct RunloopGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RunloopGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent("runloop-tui")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<ListPage> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if query.limit > 0 {
            params.push(("limit", query.limit.to_string()));
        }
        if let Some(cursor) = &query.starting_after {
            params.push(("starting_after", cursor.clone()));
        }
        if let Some(search) = query.search.as_deref().filter(|search| !search.is_empty()) {
            params.push(("search", search.to_string()));
        }

        debug!("list {} {:?}", kind.api_path(), params);
        let response = self
            .authorized(self.client.get(self.url(kind.api_path())))
            .query(&params)
            .send()
            .await
            .with_context(|| format!("failed to list {}", kind.title()))?;
        let body: Value = ensure_ok(response, &format!("list {}", kind.title()))
            .await?
            .json()
            .await
            .with_context(|| format!("failed to decode {} list", kind.title()))?;
        Ok(parse_list_page(kind, body))
    }

    pub async fn retrieve(&self, kind: ResourceKind, id: &str) -> Result<ResourceRecord> {
        let path = format!("{}/{id}", kind.api_path());
        let response = self
            .authorized(self.client.get(self.url(&path)))
            .send()
            .await
            .with_context(|| format!("failed to fetch {} {id}", kind.singular()))?;
        let body: Value = ensure_ok(response, &format!("get {} {id}", kind.singular()))
            .await?
            .json()
            .await
            .with_context(|| format!("failed to decode {} {id}", kind.singular()))?;
        ResourceRecord::from_value(body)
            .with_context(|| format!("{} {id} response has no id", kind.singular()))
    }

    /// Runs a mutating operation and returns a human readable summary.
    pub async fn perform(
        &self,
        kind: ResourceKind,
        id: &str,
        operation: &str,
        extra: Option<&str>,
    ) -> Result<String> {
        let (suffix, body) = match (kind, operation) {
            (ResourceKind::Devboxes, "shutdown" | "suspend" | "resume") => (operation, json!({})),
            (ResourceKind::Devboxes, "snapshot") => ("snapshot_disk", json!({})),
            (ResourceKind::Devboxes, "exec") => {
                let command = extra
                    .map(str::trim)
                    .filter(|command| !command.is_empty())
                    .context("exec requires a command")?;
                ("execute_sync", json!({ "command": command }))
            }
            (_, "delete") => ("delete", json!({})),
            _ => anyhow::bail!(
                "operation '{operation}' is not supported for {}",
                kind.singular()
            ),
        };

        let path = format!("{}/{id}/{suffix}", kind.api_path());
        debug!("perform {operation} via {path}");
        let response = self
            .authorized(self.client.post(self.url(&path)))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to {operation} {} {id}", kind.singular()))?;
        let response = ensure_ok(response, &format!("{operation} {} {id}", kind.singular())).await?;
        let text = response.text().await.unwrap_or_default();
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(summarize_operation(kind, id, operation, &value))
    }

    pub async fn create(
        &self,
        kind: ResourceKind,
        fields: &[(String, String)],
    ) -> Result<ResourceRecord> {
        let body = create_body(kind, fields)?;
        let response = self
            .authorized(self.client.post(self.url(kind.api_path())))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to create {}", kind.singular()))?;
        let value: Value = ensure_ok(response, &format!("create {}", kind.singular()))
            .await?
            .json()
            .await
            .with_context(|| format!("failed to decode created {}", kind.singular()))?;
        ResourceRecord::from_value(value)
            .with_context(|| format!("created {} has no id", kind.singular()))
    }

    pub async fn logs(&self, kind: ResourceKind, id: &str) -> Result<Vec<LogLine>> {
        if !kind.supports_logs() {
            anyhow::bail!("{} has no logs", kind.singular());
        }
        let path = format!("{}/{id}/logs", kind.api_path());
        let response = self
            .authorized(self.client.get(self.url(&path)))
            .send()
            .await
            .with_context(|| format!("failed to fetch logs for {id}"))?;
        let value: Value = ensure_ok(response, &format!("logs {id}"))
            .await?
            .json()
            .await
            .with_context(|| format!("failed to decode logs for {id}"))?;
        Ok(parse_log_lines(value))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }
}

async fn ensure_ok(response: Response, label: &str) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED => {
            anyhow::bail!("unauthorized (check RUNLOOP_API_KEY)")
        }
        StatusCode::FORBIDDEN => anyhow::bail!("forbidden ({label})"),
        StatusCode::NOT_FOUND => anyhow::bail!("not found ({label})"),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            anyhow::bail!("{label} failed with {status}: {}", message.trim())
        }
        _ => Ok(response),
    }
}

fn parse_list_page(kind: ResourceKind, body: Value) -> ListPage {
    let Value::Object(mut object) = body else {
        return ListPage::default();
    };
    let total_count = object
        .get("total_count")
        .and_then(Value::as_u64)
        .and_then(|count| usize::try_from(count).ok());
    let has_more = object.get("has_more").and_then(Value::as_bool);
    let items = object
        .remove(kind.list_key())
        .or_else(|| take_first_array(&mut object))
        .and_then(|value| match value {
            Value::Array(values) => Some(values),
            _ => None,
        })
        .unwrap_or_default()
        .into_iter()
        .filter_map(ResourceRecord::from_value)
        .collect();

    ListPage {
        items,
        total_count,
        has_more,
    }
}

fn take_first_array(object: &mut Map<String, Value>) -> Option<Value> {
    let key = object
        .iter()
        .find(|(_, value)| value.is_array())
        .map(|(key, _)| key.clone())?;
    object.remove(&key)
}

fn parse_log_lines(value: Value) -> Vec<LogLine> {
    value
        .get("logs")
        .cloned()
        .and_then(|logs| serde_json::from_value::<Vec<LogLine>>(logs).ok())
        .unwrap_or_default()
}

fn create_body(kind: ResourceKind, fields: &[(String, String)]) -> Result<Value> {
    if !kind.supports_create() {
        anyhow::bail!("creating a {} is not supported", kind.singular());
    }

    let mut body = Map::new();
    let mut launch = Map::new();
    for (key, value) in fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match (kind, key.as_str()) {
            (ResourceKind::Blueprints, "system_setup_commands") => {
                let commands = value
                    .split(';')
                    .map(str::trim)
                    .filter(|command| !command.is_empty())
                    .map(|command| Value::String(command.to_string()))
                    .collect();
                body.insert(key.clone(), Value::Array(commands));
            }
            (ResourceKind::Blueprints, "resource_size_request") => {
                launch.insert(key.clone(), Value::String(value.to_ascii_uppercase()));
            }
            (ResourceKind::Blueprints, "architecture") => {
                launch.insert(key.clone(), Value::String(value.to_ascii_lowercase()));
            }
            (ResourceKind::Blueprints, "available_ports") => {
                let ports = value
                    .split(',')
                    .map(str::trim)
                    .filter(|port| !port.is_empty())
                    .map(|port| {
                        port.parse::<u16>()
                            .map(Value::from)
                            .with_context(|| format!("invalid port {port:?}"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                launch.insert(key.clone(), Value::Array(ports));
            }
            _ => {
                body.insert(key.clone(), Value::String(value.to_string()));
            }
        }
    }

    if kind == ResourceKind::Blueprints && !body.contains_key("name") {
        anyhow::bail!("blueprint name is required");
    }
    if !launch.is_empty() {
        body.insert("launch_parameters".to_string(), Value::Object(launch));
    }
    Ok(Value::Object(body))
}

fn summarize_operation(kind: ResourceKind, id: &str, operation: &str, value: &Value) -> String {
    if operation == "exec" {
        let exit = value
            .get("exit_status")
            .map(Value::to_string)
            .unwrap_or_else(|| "?".to_string());
        let stdout = value.get("stdout").and_then(Value::as_str).unwrap_or("");
        let stderr = value.get("stderr").and_then(Value::as_str).unwrap_or("");
        let mut summary = format!("exit_status={exit}");
        if !stdout.trim().is_empty() {
            summary.push_str(&format!("\n{}", stdout.trim_end()));
        }
        if !stderr.trim().is_empty() {
            summary.push_str(&format!("\nstderr:\n{}", stderr.trim_end()));
        }
        return summary;
    }

    let status = value
        .get("status")
        .and_then(Value::as_str)
        .map(|status| format!(" (status: {status})"))
        .unwrap_or_default();
    let new_id = value
        .get("id")
        .and_then(Value::as_str)
        .filter(|new_id| *new_id != id)
        .map(|new_id| format!(" -> {new_id}"))
        .unwrap_or_default();
    format!("{operation} {} {id}{new_id}{status}", kind.singular())
}
