use super::{ChatStore, ChatSummary, UserProfile};
use crate::entity::{chats, users};
use crate::session::Turn;
use crate::utils::chat_preview;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const DB_FILE: &str = "chat.db";

pub struct SqliteStore {
    db_url: String,
}

impl SqliteStore {
    pub async fn new(data_dir: &Path) -> Result<Arc<Self>> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;
        let db_path = data_dir.join(DB_FILE);
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        tokio::task::spawn_blocking({
            let db_url = db_url.clone();
            move || -> Result<()> {
                let db = Database::connect(&db_url)?;

                db.get_schema_builder()
                    .register(users::Entity)
                    .register(chats::Entity)
                    .apply(&db)?;

                Ok(())
            }
        })
        .await??;

        info!("Chat store ready ({})", db_path.display());
        Ok(Arc::new(Self { db_url }))
    }
}

fn encode_turns(turns: &[Turn]) -> Result<String> {
    serde_json::to_string(turns).context("Failed to encode turns")
}

impl From<chats::Model> for ChatSummary {
    fn from(r: chats::Model) -> Self {
        let turns: Vec<Turn> = serde_json::from_str(&r.messages).unwrap_or_else(|e| {
            warn!("Chat {} has unreadable messages: {}", r.id, e);
            Vec::new()
        });
        Self {
            id: r.id,
            preview: chat_preview(&turns),
            turns,
            created_at_us: r.created_at_us,
        }
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        let now = chrono::Utc::now().timestamp_micros();
        let profile = profile.clone();
        let db_url = self.db_url.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let db = Database::connect(&db_url)?;
            let existing = users::Entity::find()
                .filter(users::Column::Id.eq(&profile.id))
                .one(&db)?;

            if existing.is_some() {
                users::Entity::update_many()
                    .col_expr(users::Column::Email, Expr::value(profile.email))
                    .col_expr(users::Column::Name, Expr::value(profile.name))
                    .col_expr(users::Column::AvatarUrl, Expr::value(profile.avatar_url))
                    .col_expr(users::Column::LastLoginUs, Expr::value(now))
                    .filter(users::Column::Id.eq(&profile.id))
                    .exec(&db)?;
            } else {
                let record = users::ActiveModel {
                    rowid: NotSet,
                    id: Set(profile.id),
                    email: Set(profile.email),
                    name: Set(profile.name),
                    avatar_url: Set(profile.avatar_url),
                    created_at_us: Set(now),
                    last_login_us: Set(now),
                };
                users::Entity::insert(record).exec(&db)?;
            }
            Ok(())
        })
        .await??;

        Ok(())
    }

    async fn save_session(&self, user_id: &str, turns: &[Turn]) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_micros();

        let record = chats::ActiveModel {
            rowid: NotSet,
            id: Set(id.clone()),
            user_id: Set(user_id.to_string()),
            messages: Set(encode_turns(turns)?),
            message_count: Set(turns.len() as i64),
            created_at_us: Set(now),
            updated_at_us: Set(now),
        };

        let db_url = self.db_url.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let db = Database::connect(&db_url)?;
            chats::Entity::insert(record).exec(&db)?;
            Ok(())
        })
        .await??;

        info!("Saved chat {} ({} messages)", id, turns.len());
        Ok(id)
    }

    async fn update_session(&self, user_id: &str, record_id: &str, turns: &[Turn]) -> Result<()> {
        let now = chrono::Utc::now().timestamp_micros();
        let messages = encode_turns(turns)?;
        let count = turns.len() as i64;
        let user_id = user_id.to_string();
        let record_id = record_id.to_string();
        let db_url = self.db_url.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let db = Database::connect(&db_url)?;
            let result = chats::Entity::update_many()
                .col_expr(chats::Column::Messages, Expr::value(messages))
                .col_expr(chats::Column::MessageCount, Expr::value(count))
                .col_expr(chats::Column::UpdatedAtUs, Expr::value(now))
                .filter(chats::Column::Id.eq(&record_id))
                .filter(chats::Column::UserId.eq(&user_id))
                .exec(&db)?;

            if result.rows_affected == 0 {
                bail!("Chat {} not found for user {}", record_id, user_id);
            }
            Ok(())
        })
        .await??;

        Ok(())
    }

    async fn list_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<ChatSummary>> {
        let user_id = user_id.to_string();
        let db_url = self.db_url.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<ChatSummary>> {
            let db = Database::connect(&db_url)?;
            let rows = chats::Entity::find()
                .filter(chats::Column::UserId.eq(&user_id))
                .order_by_desc(chats::Column::UpdatedAtUs)
                .order_by_desc(chats::Column::Rowid)
                .limit(limit as u64)
                .all(&db)?;

            Ok(rows.into_iter().map(ChatSummary::from).collect())
        })
        .await?
    }
}
