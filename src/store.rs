use crate::config::Config;
use crate::session::Turn;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

mod sqlite;

pub use sqlite::SqliteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Builds a profile keyed by the normalized email. The id is a stable
    /// storage key and proves nothing about who is typing.
    pub fn from_email(email: &str, name: Option<&str>) -> Self {
        let email = email.trim().to_lowercase();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or_else(|| email.split('@').next().unwrap_or("User").to_string());
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, email.as_bytes()).to_string();
        let avatar_url = Some(format!(
            "https://ui-avatars.com/api/?name={}&background=667eea&color=fff",
            name.replace(' ', "+")
        ));

        Self {
            id,
            email,
            name,
            avatar_url,
        }
    }
}

/// A stored chat as shown in the history list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: String,
    pub preview: String,
    pub turns: Vec<Turn>,
    pub created_at_us: i64,
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;
    async fn save_session(&self, user_id: &str, turns: &[Turn]) -> Result<String>;
    async fn update_session(&self, user_id: &str, record_id: &str, turns: &[Turn]) -> Result<()>;
    /// Most recently updated first.
    async fn list_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<ChatSummary>>;
}

pub async fn create_store(config: &Config) -> Result<Option<Arc<dyn ChatStore>>> {
    if !config.storage_enabled {
        info!("Chat storage disabled");
        return Ok(None);
    }
    let store = SqliteStore::new(&config.data_dir).await?;
    Ok(Some(store as Arc<dyn ChatStore>))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_id_is_stable_across_case_and_whitespace() {
        let a = UserProfile::from_email("Sam@Example.com", None);
        let b = UserProfile::from_email("  sam@example.com ", Some("Sam"));
        assert_eq!(a.id, b.id);
        assert_eq!(a.email, "sam@example.com");
    }

    #[test]
    fn profile_name_defaults_to_mailbox() {
        let profile = UserProfile::from_email("river@example.com", None);
        assert_eq!(profile.name, "river");

        let named = UserProfile::from_email("river@example.com", Some("River Song"));
        assert_eq!(named.name, "River Song");
        assert_eq!(
            named.avatar_url.as_deref(),
            Some("https://ui-avatars.com/api/?name=River+Song&background=667eea&color=fff")
        );
    }
}
