use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Upload,
}

/// Audit trail entry written after admin mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub admin_id: Uuid,
    pub action_type: ActionType,
    pub target_table: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub details: Value,
}
