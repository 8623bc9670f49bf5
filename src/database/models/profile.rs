use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `profiles` row; `id` matches the auth user id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_role() -> String {
    "user".to_string()
}

impl Profile {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::from_row;
    use serde_json::json;

    #[test]
    fn missing_role_defaults_to_user() {
        let row = json!({ "id": "6f1c3c1e-7a8e-4a52-9a53-0c2b1f9f3d10", "email": "ana@example.com" });
        let profile: Profile = from_row(row.as_object().cloned().unwrap()).unwrap();
        assert_eq!(profile.role, "user");
        assert!(!profile.has_role("admin"));
    }
}
