use crate::agent::{CompletionProvider, assemble};
use crate::intent;
use crate::session::{Role, Session, Turn};
use crate::store::{ChatStore, ChatSummary, UserProfile};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// No chat record was written.
    Skipped,
    /// A new chat record was created with this id.
    Saved(String),
    Updated(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The input asked to start over; it was not sent to the model.
    Reset,
    Answer {
        text: String,
        structured: Option<Value>,
        persisted: PersistOutcome,
    },
    Failed {
        message: String,
        debug: String,
    },
}

/// One conversation's handler. Owns the session and the signed-in user and
/// runs every turn through the model and the store.
pub struct ChatService {
    provider: Arc<dyn CompletionProvider>,
    store: Option<Arc<dyn ChatStore>>,
    system: String,
    session: Session,
    user: Option<UserProfile>,
}

impl ChatService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Option<Arc<dyn ChatStore>>,
        system: String,
    ) -> Self {
        Self {
            provider,
            store,
            system,
            session: Session::new(),
            user: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub async fn handle_input(&mut self, input: &str) -> Reply {
        if intent::should_reset(input) {
            info!("Reset phrase detected, clearing {} turns", self.session.len());
            self.session.reset();
            return Reply::Reset;
        }

        self.session.append_turn(Role::User, input);
        let request = assemble(&self.system, &self.session);

        match self.provider.complete(&request).await {
            Ok(text) => {
                self.session.append_turn(Role::Assistant, text.clone());
                let persisted = self.persist().await;
                Reply::Answer {
                    structured: intent::extract_json(&text),
                    text,
                    persisted,
                }
            }
            Err(e) => {
                error!("Completion via {} failed: {}", self.provider.name(), e);
                Reply::Failed {
                    message: FALLBACK_REPLY.to_string(),
                    debug: e.to_string(),
                }
            }
        }
    }

    /// Saves the current chat, if any, and starts an empty one.
    pub async fn new_conversation(&mut self) -> PersistOutcome {
        let outcome = self.persist().await;
        self.session.reset();
        outcome
    }

    /// Anonymous turns are dropped, never claimed by the new user.
    pub async fn sign_in(&mut self, profile: UserProfile) -> PersistOutcome {
        if self.user.is_none() && !self.session.is_empty() {
            info!("Dropping {} anonymous turns on sign-in", self.session.len());
            self.session.reset();
        }
        let outcome = match &self.store {
            Some(store) => match store.upsert_user(&profile).await {
                Ok(()) => PersistOutcome::Skipped,
                Err(e) => {
                    warn!("Failed to store user {}: {}", profile.id, e);
                    PersistOutcome::Failed(e.to_string())
                }
            },
            None => PersistOutcome::Skipped,
        };
        info!("Signed in {}", profile.email);
        self.user = Some(profile);
        outcome
    }

    pub async fn sign_out(&mut self) -> PersistOutcome {
        let outcome = self.persist().await;
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.email);
        }
        self.session.reset();
        outcome
    }

    pub async fn history(&self, limit: usize) -> anyhow::Result<Vec<ChatSummary>> {
        match (&self.store, &self.user) {
            (Some(store), Some(user)) => store.list_recent_sessions(&user.id, limit).await,
            _ => Ok(Vec::new()),
        }
    }

    /// Continues a stored chat; later turns update that record.
    pub fn open(&mut self, chat: &ChatSummary) {
        self.session.restore(chat.id.clone(), chat.turns.clone());
    }

    async fn persist(&mut self) -> PersistOutcome {
        if self.session.is_empty() {
            return PersistOutcome::Skipped;
        }
        let (Some(store), Some(user)) = (&self.store, &self.user) else {
            return PersistOutcome::Skipped;
        };

        let turns: &[Turn] = self.session.turns();
        match self.session.record_id() {
            Some(record_id) => match store.update_session(&user.id, record_id, turns).await {
                Ok(()) => PersistOutcome::Updated(record_id.to_string()),
                Err(e) => {
                    warn!("Failed to update chat {}: {}", record_id, e);
                    PersistOutcome::Failed(e.to_string())
                }
            },
            None => match store.save_session(&user.id, turns).await {
                Ok(record_id) => {
                    self.session.link_record(record_id.clone());
                    PersistOutcome::Saved(record_id)
                }
                Err(e) => {
                    warn!("Failed to save chat: {}", e);
                    PersistOutcome::Failed(e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{CompletionError, CompletionRequest};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        replies: Mutex<Vec<Result<String, String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeProvider {
        fn replying(replies: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.iter().rev().map(|r| Ok(r.to_string())).collect()),
                ..Default::default()
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(vec![Err("connection refused".into())]),
                ..Default::default()
            })
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.requests.lock().unwrap().push(request.clone());
            match self.replies.lock().unwrap().pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(CompletionError::Request(e)),
                None => Ok("ok".into()),
            }
        }
    }

    #[derive(Default)]
    struct FakeStore {
        chats: Mutex<Vec<(String, String, Vec<Turn>)>>,
        users: Mutex<Vec<UserProfile>>,
        broken: bool,
    }

    #[async_trait]
    impl ChatStore for FakeStore {
        async fn upsert_user(&self, profile: &UserProfile) -> anyhow::Result<()> {
            if self.broken {
                bail!("store offline");
            }
            self.users.lock().unwrap().push(profile.clone());
            Ok(())
        }

        async fn save_session(&self, user_id: &str, turns: &[Turn]) -> anyhow::Result<String> {
            if self.broken {
                bail!("store offline");
            }
            let mut chats = self.chats.lock().unwrap();
            let id = format!("chat-{}", chats.len() + 1);
            chats.push((id.clone(), user_id.to_string(), turns.to_vec()));
            Ok(id)
        }

        async fn update_session(
            &self,
            user_id: &str,
            record_id: &str,
            turns: &[Turn],
        ) -> anyhow::Result<()> {
            if self.broken {
                bail!("store offline");
            }
            let mut chats = self.chats.lock().unwrap();
            match chats
                .iter_mut()
                .find(|(id, owner, _)| id == record_id && owner == user_id)
            {
                Some(chat) => {
                    chat.2 = turns.to_vec();
                    Ok(())
                }
                None => bail!("no such chat"),
            }
        }

        async fn list_recent_sessions(
            &self,
            user_id: &str,
            limit: usize,
        ) -> anyhow::Result<Vec<ChatSummary>> {
            let chats = self.chats.lock().unwrap();
            Ok(chats
                .iter()
                .rev()
                .filter(|(_, owner, _)| owner == user_id)
                .take(limit)
                .map(|(id, _, turns)| ChatSummary {
                    id: id.clone(),
                    preview: crate::utils::chat_preview(turns),
                    turns: turns.clone(),
                    created_at_us: 0,
                })
                .collect())
        }
    }

    fn signed_in_service(
        provider: Arc<FakeProvider>,
        store: Arc<FakeStore>,
    ) -> (ChatService, UserProfile) {
        let user = UserProfile::from_email("sam@example.com", Some("Sam"));
        let mut service = ChatService::new(provider, Some(store), "SYSTEM".into());
        service.user = Some(user.clone());
        (service, user)
    }

    #[tokio::test]
    async fn round_trip_sends_full_history_with_system_instruction() {
        let provider = FakeProvider::replying(&["Hi, how are you feeling?", "I hear you."]);
        let mut service = ChatService::new(provider.clone(), None, "SYSTEM".into());

        service.handle_input("I'm tired").await;
        let reply = service.handle_input("hello").await;

        let request = provider.last_request();
        assert_eq!(request.system, "SYSTEM");
        assert_eq!(
            request.turns,
            vec![
                Turn::user("I'm tired"),
                Turn::assistant("Hi, how are you feeling?"),
                Turn::user("hello"),
            ]
        );
        assert_eq!(
            reply,
            Reply::Answer {
                text: "I hear you.".into(),
                structured: None,
                persisted: PersistOutcome::Skipped,
            }
        );
        assert_eq!(service.session().len(), 4);
    }

    #[tokio::test]
    async fn model_failure_adds_no_assistant_turn() {
        let mut service = ChatService::new(FakeProvider::failing(), None, "SYSTEM".into());

        let reply = service.handle_input("hello").await;

        assert_eq!(
            reply,
            Reply::Failed {
                message: FALLBACK_REPLY.into(),
                debug: "Completion request failed: connection refused".into(),
            }
        );
        assert_eq!(service.session().turns(), &[Turn::user("hello")]);
    }

    #[tokio::test]
    async fn reset_phrase_clears_session_without_calling_model() {
        let provider = FakeProvider::replying(&["one", "two"]);
        let mut service = ChatService::new(provider.clone(), None, "SYSTEM".into());
        service.handle_input("first").await;

        let reply = service.handle_input("Let's start over please").await;

        assert_eq!(reply, Reply::Reset);
        assert!(service.session().is_empty());
        assert_eq!(provider.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn structured_reply_is_extracted() {
        let provider = FakeProvider::replying(&[r#"{"tool_call": "start_meditation", "duration": 5}"#]);
        let mut service = ChatService::new(provider, None, "SYSTEM".into());

        let Reply::Answer { structured, .. } = service.handle_input("Start meditation").await else {
            panic!("expected an answer");
        };
        assert_eq!(
            structured,
            Some(serde_json::json!({"tool_call": "start_meditation", "duration": 5}))
        );
    }

    #[tokio::test]
    async fn first_answer_saves_and_later_answers_update() {
        let store = Arc::new(FakeStore::default());
        let (mut service, user) = signed_in_service(FakeProvider::replying(&[]), store.clone());

        let first = service.handle_input("hello").await;
        let second = service.handle_input("again").await;

        assert!(matches!(first, Reply::Answer { persisted: PersistOutcome::Saved(ref id), .. } if id == "chat-1"));
        assert!(matches!(second, Reply::Answer { persisted: PersistOutcome::Updated(ref id), .. } if id == "chat-1"));
        let chats = store.chats.lock().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].1, user.id);
        assert_eq!(chats[0].2.len(), 4);
    }

    #[tokio::test]
    async fn reset_starts_a_new_record() {
        let store = Arc::new(FakeStore::default());
        let (mut service, _) = signed_in_service(FakeProvider::replying(&[]), store.clone());

        service.handle_input("hello").await;
        service.handle_input("how are you").await;
        assert_eq!(service.session().record_id(), Some("chat-1"));

        assert_eq!(service.handle_input("reset").await, Reply::Reset);
        assert!(service.session().is_empty());
        assert_eq!(service.session().record_id(), None);

        service.handle_input("fresh start").await;
        assert_eq!(service.session().record_id(), Some("chat-2"));
        let chats = store.chats.lock().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].2.len(), 4);
        assert_eq!(chats[1].2, vec![Turn::user("fresh start"), Turn::assistant("ok")]);
    }

    #[tokio::test]
    async fn storage_failure_degrades_without_losing_the_answer() {
        let store = Arc::new(FakeStore {
            broken: true,
            ..Default::default()
        });
        let (mut service, _) = signed_in_service(FakeProvider::replying(&["still here"]), store);

        let reply = service.handle_input("hello").await;

        let Reply::Answer { text, persisted, .. } = reply else {
            panic!("expected an answer");
        };
        assert_eq!(text, "still here");
        assert!(matches!(persisted, PersistOutcome::Failed(_)));
        assert_eq!(service.session().len(), 2);
        assert_eq!(service.session().record_id(), None);
    }

    #[tokio::test]
    async fn new_conversation_updates_linked_record_then_clears() {
        let store = Arc::new(FakeStore::default());
        let (mut service, _) = signed_in_service(FakeProvider::replying(&[]), store.clone());
        service.handle_input("hello").await;

        let outcome = service.new_conversation().await;

        assert_eq!(outcome, PersistOutcome::Updated("chat-1".into()));
        assert!(service.session().is_empty());
        assert_eq!(service.session().record_id(), None);
    }

    #[tokio::test]
    async fn new_conversation_on_empty_session_saves_nothing() {
        let store = Arc::new(FakeStore::default());
        let (mut service, _) = signed_in_service(FakeProvider::replying(&[]), store.clone());

        assert_eq!(service.new_conversation().await, PersistOutcome::Skipped);
        assert!(store.chats.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn opened_chat_continues_its_record() {
        let store = Arc::new(FakeStore::default());
        let (mut service, _) = signed_in_service(FakeProvider::replying(&[]), store.clone());
        service.handle_input("first chat").await;
        service.new_conversation().await;
        service.handle_input("second chat").await;

        let history = service.history(HISTORY_LIMIT).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].preview, "first chat...");

        service.open(&history[1]);
        service.handle_input("back again").await;

        let chats = store.chats.lock().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].2.len(), 4);
        assert_eq!(chats[0].2[2], Turn::user("back again"));
    }

    #[tokio::test]
    async fn sign_in_survives_store_failure() {
        let store = Arc::new(FakeStore {
            broken: true,
            ..Default::default()
        });
        let mut service = ChatService::new(FakeProvider::replying(&[]), Some(store), "S".into());

        let outcome = service
            .sign_in(UserProfile::from_email("sam@example.com", None))
            .await;

        assert!(matches!(outcome, PersistOutcome::Failed(_)));
        assert!(service.user().is_some());
    }

    #[tokio::test]
    async fn sign_in_stores_user_without_reporting_a_chat_record() {
        let store = Arc::new(FakeStore::default());
        let mut service =
            ChatService::new(FakeProvider::replying(&[]), Some(store.clone()), "S".into());

        let outcome = service
            .sign_in(UserProfile::from_email("sam@example.com", None))
            .await;

        assert_eq!(outcome, PersistOutcome::Skipped);
        assert_eq!(store.users.lock().unwrap().len(), 1);
        assert!(store.chats.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn turns_typed_before_sign_in_are_not_saved_for_the_user() {
        let store = Arc::new(FakeStore::default());
        let provider = FakeProvider::replying(&[]);
        let mut service = ChatService::new(provider.clone(), Some(store.clone()), "S".into());
        service.handle_input("secret anonymous message").await;

        service
            .sign_in(UserProfile::from_email("sam@example.com", None))
            .await;
        assert!(service.session().is_empty());
        service.handle_input("hi").await;

        assert_eq!(provider.last_request().turns, vec![Turn::user("hi")]);
        let chats = store.chats.lock().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].2, vec![Turn::user("hi"), Turn::assistant("ok")]);
    }

    #[tokio::test]
    async fn sign_out_saves_and_forgets_everything() {
        let store = Arc::new(FakeStore::default());
        let mut service =
            ChatService::new(FakeProvider::replying(&[]), Some(store.clone()), "S".into());
        service
            .sign_in(UserProfile::from_email("sam@example.com", None))
            .await;
        service.handle_input("hello").await;

        service.sign_out().await;

        assert!(service.user().is_none());
        assert!(service.session().is_empty());
        assert_eq!(store.users.lock().unwrap().len(), 1);
        assert!(service.history(HISTORY_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn anonymous_sessions_are_not_persisted() {
        let store = Arc::new(FakeStore::default());
        let mut service =
            ChatService::new(FakeProvider::replying(&[]), Some(store.clone()), "S".into());

        let reply = service.handle_input("hello").await;

        assert!(matches!(reply, Reply::Answer { persisted: PersistOutcome::Skipped, .. }));
        assert!(store.chats.lock().unwrap().is_empty());
    }
}
