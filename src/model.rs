use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Devboxes,
    Blueprints,
    Snapshots,
    Objects,
    NetworkPolicies,
    McpConfigs,
    GatewayConfigs,
    BenchmarkJobs,
    Secrets,
}

impl ResourceKind {
    pub const ALL: [Self; 9] = [
        Self::Devboxes,
        Self::Blueprints,
        Self::Snapshots,
        Self::Objects,
        Self::NetworkPolicies,
        Self::McpConfigs,
        Self::GatewayConfigs,
        Self::BenchmarkJobs,
        Self::Secrets,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Devboxes => "Devboxes",
            Self::Blueprints => "Blueprints",
            Self::Snapshots => "Snapshots",
            Self::Objects => "Storage Objects",
            Self::NetworkPolicies => "Network Policies",
            Self::McpConfigs => "MCP Configs",
            Self::GatewayConfigs => "Gateway Configs",
            Self::BenchmarkJobs => "Benchmark Jobs",
            Self::Secrets => "Secrets",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Self::Devboxes => "devbox",
            Self::Blueprints => "blueprint",
            Self::Snapshots => "snapshot",
            Self::Objects => "object",
            Self::NetworkPolicies => "network policy",
            Self::McpConfigs => "MCP config",
            Self::GatewayConfigs => "gateway config",
            Self::BenchmarkJobs => "benchmark job",
            Self::Secrets => "secret",
        }
    }

    pub fn screen_prefix(self) -> &'static str {
        match self {
            Self::Devboxes => "devbox",
            Self::Blueprints => "blueprint",
            Self::Snapshots => "snapshot",
            Self::Objects => "object",
            Self::NetworkPolicies => "network-policy",
            Self::McpConfigs => "mcp-config",
            Self::GatewayConfigs => "gateway-config",
            Self::BenchmarkJobs => "benchmark-job",
            Self::Secrets => "secret",
        }
    }

    pub fn from_screen_prefix(prefix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.screen_prefix() == prefix)
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "dbx" | "devbox" | "devboxes" => Some(Self::Devboxes),
            "bp" | "blueprint" | "blueprints" => Some(Self::Blueprints),
            "snap" | "snapshot" | "snapshots" | "disk-snapshots" => Some(Self::Snapshots),
            "obj" | "object" | "objects" | "storage" => Some(Self::Objects),
            "np" | "network-policy" | "network-policies" | "networkpolicies" => {
                Some(Self::NetworkPolicies)
            }
            "mcp" | "mcp-config" | "mcp-configs" => Some(Self::McpConfigs),
            "gw" | "gateway" | "gateway-config" | "gateway-configs" => Some(Self::GatewayConfigs),
            "bench" | "benchmark" | "benchmark-job" | "benchmark-jobs" => {
                Some(Self::BenchmarkJobs)
            }
            "secret" | "secrets" => Some(Self::Secrets),
            _ => None,
        }
    }

    /// Path below `/v1` for list/retrieve calls.
    pub fn api_path(self) -> &'static str {
        match self {
            Self::Devboxes => "devboxes",
            Self::Blueprints => "blueprints",
            Self::Snapshots => "devboxes/disk_snapshots",
            Self::Objects => "objects",
            Self::NetworkPolicies => "network_policies",
            Self::McpConfigs => "mcp_configs",
            Self::GatewayConfigs => "gateway_configs",
            Self::BenchmarkJobs => "benchmarks/jobs",
            Self::Secrets => "secrets",
        }
    }

    pub fn list_key(self) -> &'static str {
        match self {
            Self::Devboxes => "devboxes",
            Self::Blueprints => "blueprints",
            Self::Snapshots => "snapshots",
            Self::Objects => "objects",
            Self::NetworkPolicies => "network_policies",
            Self::McpConfigs => "mcp_configs",
            Self::GatewayConfigs => "gateway_configs",
            Self::BenchmarkJobs => "jobs",
            Self::Secrets => "secrets",
        }
    }

    /// Statuses in which a detail screen keeps re-fetching the resource.
    pub fn transitional_statuses(self) -> &'static [&'static str] {
        match self {
            Self::Devboxes => &[
                "provisioning",
                "initializing",
                "resuming",
                "suspending",
                "shutting_down",
            ],
            Self::Blueprints => &["queued", "provisioning", "building"],
            Self::Snapshots => &["in_progress"],
            Self::BenchmarkJobs => &["running"],
            _ => &[],
        }
    }

    pub fn supports_create(self) -> bool {
        matches!(self, Self::Devboxes | Self::Blueprints)
    }

    pub fn supports_logs(self) -> bool {
        matches!(self, Self::Devboxes | Self::Blueprints)
    }

    pub fn list_headers(self) -> Vec<&'static str> {
        match self {
            Self::Devboxes => vec!["ID", "NAME", "STATUS", "BLUEPRINT", "CREATED"],
            Self::Blueprints => vec!["ID", "NAME", "STATUS", "CREATED"],
            Self::Snapshots => vec!["ID", "NAME", "DEVBOX", "CREATED"],
            Self::Objects => vec!["ID", "NAME", "CONTENT TYPE", "SIZE", "CREATED"],
            Self::BenchmarkJobs => vec!["ID", "NAME", "STATUS", "CREATED"],
            _ => vec!["ID", "NAME", "CREATED"],
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

/// Plain-data view of a server resource. The raw payload is kept as JSON so
/// every resource kind shares one store type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: Option<String>,
    pub status: Option<String>,
    pub create_time_ms: Option<i64>,
    pub raw: Value,
}

impl ResourceRecord {
    pub fn from_value(raw: Value) -> Option<Self> {
        let id = raw.get("id")?.as_str()?.to_string();
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string);
        let create_time_ms = raw.get("create_time_ms").and_then(Value::as_i64);
        Some(Self {
            id,
            name,
            status,
            create_time_ms,
            raw,
        })
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_transitional(&self, kind: ResourceKind) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| kind.transitional_statuses().contains(&status))
    }

    pub fn field(&self, key: &str) -> String {
        match self.raw.get(key) {
            Some(Value::String(value)) => value.clone(),
            Some(Value::Null) | None => "-".to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn created_label(&self) -> String {
        self.create_time_ms
            .and_then(format_timestamp_ms)
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn columns(&self, kind: ResourceKind) -> Vec<String> {
        let name = self.name.clone().unwrap_or_else(|| "-".to_string());
        let status = self.status.clone().unwrap_or_else(|| "-".to_string());
        match kind {
            ResourceKind::Devboxes => vec![
                self.id.clone(),
                name,
                status,
                self.field("blueprint_id"),
                self.created_label(),
            ],
            ResourceKind::Blueprints | ResourceKind::BenchmarkJobs => {
                vec![self.id.clone(), name, status, self.created_label()]
            }
            ResourceKind::Snapshots => vec![
                self.id.clone(),
                name,
                self.field("source_devbox_id"),
                self.created_label(),
            ],
            ResourceKind::Objects => vec![
                self.id.clone(),
                name,
                self.field("content_type"),
                self.field("size_bytes"),
                self.created_label(),
            ],
            _ => vec![self.id.clone(), name, self.created_label()],
        }
    }

    pub fn detail_text(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ListQuery {
    pub limit: usize,
    pub starting_after: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<ResourceRecord>,
    pub total_count: Option<usize>,
    pub has_more: Option<bool>,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub timestamp_ms: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub exit_code: Option<i64>,
    #[serde(default)]
    pub level: Option<String>,
}

impl LogLine {
    pub fn render(&self) -> String {
        let time = self
            .timestamp_ms
            .and_then(format_timestamp_ms)
            .unwrap_or_default();
        let source = self
            .source
            .as_deref()
            .map(|source| format!(" [{source}]"))
            .unwrap_or_default();
        let level = self
            .level
            .as_deref()
            .map(|level| format!(" {level}"))
            .unwrap_or_default();
        if let Some(cmd) = &self.cmd {
            format!("{time}{source} -> {cmd}")
        } else if let Some(message) = &self.message {
            format!("{time}{source}{level}  {message}")
        } else if let Some(exit_code) = self.exit_code {
            format!("{time}{source} -> exit_code={exit_code}")
        } else {
            format!("{time}{source}")
        }
    }
}

pub fn format_timestamp_ms(timestamp_ms: i64) -> Option<String> {
    let time: DateTime<Local> = Local.timestamp_millis_opt(timestamp_ms).single()?;
    Some(time.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}
