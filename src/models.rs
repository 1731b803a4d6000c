use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Deployment environment tag for a server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ambiente {
    PRD,
    NPRD,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Active,
    Inactive,
}

/// One row of the server inventory. Ids are assigned by the dashboard
/// client; the service only stores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: String,
    pub servico: String,
    pub hostname: String,
    pub ip_address: String,
    pub os: String,
    pub location: String,
    pub projeto: String,
    pub ambiente: Ambiente,
    pub status: ServerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observacao: Option<String>,
}

/// One entry of the shell command catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: String,
    pub command: String,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl CommandRecord {
    pub fn new(id: String, command: String, description: String) -> Self {
        Self {
            id,
            command,
            description,
            created_at: now_iso(),
            updated_at: None,
        }
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Next command id: the current epoch-millisecond count, bumped past any id
/// already present so two entries created in the same millisecond never
/// collide.
pub fn next_command_id(existing: &[CommandRecord]) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while existing.iter().any(|c| c.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
