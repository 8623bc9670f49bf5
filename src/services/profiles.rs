use std::time::Duration;

use uuid::Uuid;

use crate::database::models::{from_row, Profile};
use crate::database::{DatabaseError, TableStore};

#[derive(Debug)]
pub enum ProfileLookup {
    Found(Profile),
    Missing,
    TimedOut,
}

/// Fetch a user's profile, giving up after `timeout`
pub async fn lookup_profile(
    store: &dyn TableStore,
    user_id: Uuid,
    timeout: Duration,
) -> Result<ProfileLookup, DatabaseError> {
    match tokio::time::timeout(timeout, store.find("profiles", &user_id.to_string())).await {
        Err(_) => {
            tracing::warn!("Profile lookup for {} timed out after {:?}", user_id, timeout);
            Ok(ProfileLookup::TimedOut)
        }
        Ok(result) => match result? {
            Some(row) => Ok(ProfileLookup::Found(from_row(row)?)),
            None => Ok(ProfileLookup::Missing),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn finds_existing_profiles() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let row = json!({ "id": id.to_string(), "email": "ana@example.com", "role": "admin" });
        store.insert("profiles", row.as_object().cloned().unwrap()).await.unwrap();

        match lookup_profile(&store, id, Duration::from_secs(1)).await.unwrap() {
            ProfileLookup::Found(profile) => assert!(profile.has_role("admin")),
            other => panic!("expected profile, got {:?}", other),
        }
        assert!(matches!(
            lookup_profile(&store, Uuid::new_v4(), Duration::from_secs(1)).await.unwrap(),
            ProfileLookup::Missing
        ));
    }
}
