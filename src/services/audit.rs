use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{to_row, ActionType, AdminAction};
use crate::database::TableStore;

/// Record an admin mutation in `admin_actions`.
///
/// Failures are logged and swallowed; the mutation itself already happened.
pub async fn record_action(
    store: &dyn TableStore,
    admin_id: Uuid,
    action_type: ActionType,
    target_table: &str,
    target_id: Option<&str>,
    details: Value,
) {
    let entry = AdminAction {
        id: None,
        admin_id,
        action_type,
        target_table: target_table.to_string(),
        target_id: target_id.map(str::to_string),
        details,
    };

    let result = match to_row(&entry) {
        Ok(row) => store.insert("admin_actions", row).await.map(|_| ()),
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        tracing::warn!(
            "Failed to record admin action {:?} on {} by {}: {}",
            action_type,
            target_table,
            admin_id,
            e
        );
    }
}
