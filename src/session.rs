use crate::{
    cycle::{CyclePhase, DailyCycle},
    domain::{self, KeyValueStore, StorageKey},
    errors::{AppError, StorageError},
    models::{Meme, MemeId, User, UserId},
    store::{DomainStore, RolloverReport, Submission},
    tournament::Bracket,
    validation,
    views::{self, MemeMetric, UserMetric},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing;

const SUBMIT_KEYS: &[StorageKey] = &[
    StorageKey::Memes,
    StorageKey::Users,
    StorageKey::CurrentUser,
    StorageKey::SubmittedMemes,
];
const LIKE_KEYS: &[StorageKey] = &[
    StorageKey::Memes,
    StorageKey::Users,
    StorageKey::CurrentUser,
    StorageKey::UserLikes,
];
const PROFILE_KEYS: &[StorageKey] = &[StorageKey::Users, StorageKey::CurrentUser];
const ROLLOVER_KEYS: &[StorageKey] = &[
    StorageKey::Memes,
    StorageKey::Users,
    StorageKey::CurrentUser,
    StorageKey::SubmittedMemes,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatus {
    pub submitted_memes: Vec<String>,
    pub user_submitted_today: bool,
    pub user_likes: Vec<MemeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub seconds_remaining: i64,
    pub next_reset: DateTime<Utc>,
}

struct SessionState {
    domain: DomainStore,
    cycle: DailyCycle,
}

/// The one live session: domain state, its daily clock, and write-through
/// to the persistence adapter. Operations are serialized by an async mutex
/// held until the affected keys have been written.
pub struct Session {
    kv: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Loads persisted state, seeding and saving the example data when any
    /// of the core collections is missing.
    pub async fn open(kv: Arc<dyn KeyValueStore>, now: DateTime<Utc>) -> Result<Self, StorageError> {
        let memes: Option<Vec<Meme>> = domain::load(kv.as_ref(), StorageKey::Memes).await?;
        let users: Option<Vec<User>> = domain::load(kv.as_ref(), StorageKey::Users).await?;
        let current: Option<User> = domain::load(kv.as_ref(), StorageKey::CurrentUser).await?;

        let (domain, seeded) = match (memes, users, current) {
            (Some(memes), Some(users), Some(current)) => {
                tracing::info!(memes = memes.len(), users = users.len(), "Session: restored persisted state");
                (DomainStore::new(memes, users, current), false)
            }
            _ => {
                tracing::info!("Session: no complete persisted state, seeding example data");
                (DomainStore::seeded(now), true)
            }
        };

        let submitted: Vec<String> = domain::load(kv.as_ref(), StorageKey::SubmittedMemes)
            .await?
            .unwrap_or_default();
        let likes: Vec<MemeId> = domain::load(kv.as_ref(), StorageKey::UserLikes)
            .await?
            .unwrap_or_default();
        let domain = domain.with_today(submitted, likes);

        let session = Self {
            kv,
            state: Mutex::new(SessionState { domain, cycle: DailyCycle::starting_at(now) }),
        };
        if seeded {
            let state = session.state.lock().await;
            session
                .persist(&state.domain, &[StorageKey::Memes, StorageKey::Users, StorageKey::CurrentUser])
                .await?;
        }
        Ok(session)
    }

    async fn persist(&self, domain: &DomainStore, keys: &[StorageKey]) -> Result<(), StorageError> {
        for &key in keys {
            let value = domain
                .value_for(key)
                .map_err(|source| StorageError::Serialization { key: key.to_string(), source })?;
            self.kv.set(key.as_str(), value).await?;
        }
        tracing::debug!(?keys, "Session: state written through");
        Ok(())
    }

    // --- Reads ---

    pub async fn list_memes(&self) -> Vec<Meme> {
        self.state.lock().await.domain.list_memes().to_vec()
    }

    pub async fn list_users(&self) -> Vec<User> {
        self.state.lock().await.domain.list_users().to_vec()
    }

    pub async fn current_user(&self) -> User {
        self.state.lock().await.domain.current_user().clone()
    }

    pub async fn user(&self, id: UserId) -> Option<User> {
        self.state.lock().await.domain.user(id).cloned()
    }

    pub async fn today(&self) -> TodayStatus {
        let state = self.state.lock().await;
        TodayStatus {
            submitted_memes: state.domain.submitted_today().to_vec(),
            user_submitted_today: state.domain.current_user().has_submitted_today(),
            user_likes: state.domain.session_likes().to_vec(),
        }
    }

    pub async fn countdown(&self, now: DateTime<Utc>) -> Countdown {
        let state = self.state.lock().await;
        Countdown {
            seconds_remaining: state.cycle.seconds_remaining(now),
            next_reset: state.cycle.next_reset(),
        }
    }

    pub async fn shillers_pick(&self) -> Option<Meme> {
        let state = self.state.lock().await;
        views::shillers_pick(state.domain.list_memes()).cloned()
    }

    pub async fn meme_leaderboard(&self, metric: MemeMetric, limit: Option<usize>) -> Vec<Meme> {
        let state = self.state.lock().await;
        views::rank_memes(state.domain.list_memes(), metric, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn user_leaderboard(&self, metric: UserMetric, limit: Option<usize>) -> Vec<User> {
        let state = self.state.lock().await;
        views::rank_users(state.domain.list_users(), metric, limit)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn tournament(&self) -> Bracket {
        Bracket::seed(self.state.lock().await.domain.list_memes())
    }

    // --- Mutations ---

    /// Applies `change` to a copy of the domain state and writes `keys` from
    /// that copy. The copy replaces the live state only once every key is
    /// stored, so a failed write leaves the session as it was.
    async fn commit<R>(
        &self,
        state: &mut SessionState,
        keys: &[StorageKey],
        change: impl FnOnce(&mut DomainStore) -> R,
    ) -> Result<R, StorageError> {
        let mut next = state.domain.clone();
        let outcome = change(&mut next);
        self.persist(&next, keys).await?;
        state.domain = next;
        Ok(outcome)
    }

    pub async fn submit_meme(&self, name: &str, chain: &str, now: DateTime<Utc>) -> Result<(Submission, Meme), AppError> {
        let mut state = self.state.lock().await;
        validation::validate_submission(state.domain.current_user(), name, chain)?;

        let submission = self
            .commit(&mut state, SUBMIT_KEYS, |domain| domain.submit_meme(name, chain.trim(), now))
            .await?;

        let meme = state
            .domain
            .meme(submission.meme_id)
            .cloned()
            .ok_or_else(|| AppError::InternalServerError(format!("meme {} vanished after submit", submission.meme_id)))?;
        tracing::info!(meme_id = %meme.id, created = submission.created, name = %meme.name, "Meme submitted");
        Ok((submission, meme))
    }

    pub async fn like_meme(&self, meme_id: MemeId) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        if !state.domain.can_like(meme_id) {
            return Ok(false);
        }
        self.commit(&mut state, LIKE_KEYS, |domain| domain.like_meme(meme_id)).await?;
        tracing::info!(%meme_id, "Meme liked");
        Ok(true)
    }

    pub async fn follow_user(&self, target: UserId) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        if !state.domain.can_follow(target) {
            return Ok(false);
        }
        self.commit(&mut state, PROFILE_KEYS, |domain| domain.follow_user(target)).await?;
        tracing::info!(%target, "User followed");
        Ok(true)
    }

    pub async fn unfollow_user(&self, target: UserId) -> Result<bool, StorageError> {
        let mut state = self.state.lock().await;
        if !state.domain.current_user().is_following(target) {
            return Ok(false);
        }
        self.commit(&mut state, PROFILE_KEYS, |domain| domain.unfollow_user(target)).await?;
        tracing::info!(%target, "User unfollowed");
        Ok(true)
    }

    pub async fn rename_user(&self, new_name: &str) -> Result<(bool, User), AppError> {
        let new_name = validation::normalize_username(new_name)?;
        let mut state = self.state.lock().await;
        let applied = state.domain.current_user().name != new_name;
        if applied {
            self.commit(&mut state, PROFILE_KEYS, |domain| domain.rename_user(new_name)).await?;
            tracing::info!(%new_name, "User renamed");
        }
        Ok((applied, state.domain.current_user().clone()))
    }

    /// Advances the daily clock; applies and persists a rollover when due.
    /// If the rollover cannot be stored the clock is not advanced, so the
    /// next tick tries again.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<RolloverReport>, StorageError> {
        let mut state = self.state.lock().await;
        let mut cycle = state.cycle.clone();
        if cycle.tick(now) == CyclePhase::Counting {
            return Ok(None);
        }
        let report = self.commit(&mut state, ROLLOVER_KEYS, DomainStore::rollover).await?;
        state.cycle = cycle;
        tracing::info!(next_reset = %state.cycle.next_reset(), "Daily rollover complete");
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory store whose `users` writes can be switched off.
    #[derive(Default)]
    struct FlakyUsersStore {
        inner: InMemoryStore,
        users_down: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyUsersStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
            if key == StorageKey::Users.as_str() && self.users_down.load(Ordering::SeqCst) {
                return Err(StorageError::BackendError(anyhow::anyhow!("users unavailable")));
            }
            self.inner.set(key, value).await
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    async fn fresh_session() -> (Arc<InMemoryStore>, Session) {
        let kv = Arc::new(InMemoryStore::new());
        let session = Session::open(kv.clone(), at("2024-06-03T12:00:00Z")).await.unwrap();
        (kv, session)
    }

    #[tokio::test]
    async fn first_open_seeds_and_persists_examples() {
        let (kv, session) = fresh_session().await;

        assert_eq!(session.list_memes().await.len(), 2);
        assert_eq!(session.current_user().await.name, "CryptoEnthusiast");
        let stored = kv.get("users").await.unwrap().unwrap();
        assert_eq!(stored.as_array().map(Vec::len), Some(2));
        assert_eq!(kv.get("currentUser").await.unwrap().unwrap()["id"], 1);
    }

    #[tokio::test]
    async fn reopening_restores_mutations() {
        let (kv, session) = fresh_session().await;
        assert!(session.follow_user(UserId(2)).await.unwrap());
        drop(session);

        let reopened = Session::open(kv, at("2024-06-03T13:00:00Z")).await.unwrap();
        assert_eq!(reopened.current_user().await.following, vec![UserId(2)]);
        assert_eq!(reopened.user(UserId(2)).await.unwrap().followers, vec![UserId(1)]);
    }

    #[tokio::test]
    async fn seeded_user_must_wait_for_rollover_to_submit() {
        let (_kv, session) = fresh_session().await;

        let err = session.submit_meme("$WIF", "Solana", at("2024-06-03T12:00:01Z")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::AlreadySubmittedToday)));

        let report = session.tick(at("2024-06-03T23:00:00Z")).await.unwrap().unwrap();
        assert_eq!(report.streak_advanced_to, Some(4));

        let (submission, meme) = session.submit_meme("$WIF", "Solana", at("2024-06-03T23:00:05Z")).await.unwrap();
        assert!(submission.created);
        assert_eq!(meme.id, MemeId(3));
        assert_eq!(meme.first_submitter, "CryptoEnthusiast");
        assert_eq!(session.today().await.submitted_memes, vec!["$WIF".to_string()]);
    }

    #[tokio::test]
    async fn rejected_submission_changes_nothing() {
        let (kv, session) = fresh_session().await;
        session.tick(at("2024-06-03T23:00:00Z")).await.unwrap();
        let memes_before = kv.get("memes").await.unwrap();

        let err = session.submit_meme("$ DOGE", "Dogecoin", at("2024-06-03T23:01:00Z")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::NotSingleWord)));
        assert_eq!(kv.get("memes").await.unwrap(), memes_before);
        assert_eq!(session.current_user().await.total_submissions, 0);
    }

    #[tokio::test]
    async fn likes_write_through_including_client_likes() {
        let (kv, session) = fresh_session().await;

        assert!(session.like_meme(MemeId(1)).await.unwrap());
        assert!(!session.like_meme(MemeId(1)).await.unwrap());
        // Seeded user already liked $DOGE
        assert!(!session.like_meme(MemeId(2)).await.unwrap());

        assert_eq!(kv.get("userLikes").await.unwrap(), Some(serde_json::json!([1])));
        assert_eq!(session.list_memes().await[0].likes, 11);
    }

    #[tokio::test]
    async fn tick_before_reset_does_nothing() {
        let (_kv, session) = fresh_session().await;
        assert_eq!(session.tick(at("2024-06-03T22:59:59Z")).await.unwrap(), None);
        assert_eq!(session.current_user().await.streak, 3);
        assert_eq!(
            session.countdown(at("2024-06-03T22:59:59Z")).await.seconds_remaining,
            1
        );
    }

    #[tokio::test]
    async fn rename_trims_and_keeps_history() {
        let (_kv, session) = fresh_session().await;
        let (applied, user) = session.rename_user("  Degen ").await.unwrap();
        assert!(applied);
        assert_eq!(user.name, "Degen");
        assert_eq!(session.list_memes().await[0].first_submitter, "CryptoEnthusiast");
        assert!(session.rename_user(" ").await.is_err());
    }

    #[tokio::test]
    async fn failed_write_leaves_session_unchanged_and_retry_succeeds() {
        let kv = Arc::new(FlakyUsersStore::default());
        let session = Session::open(kv.clone(), at("2024-06-03T12:00:00Z")).await.unwrap();
        session.tick(at("2024-06-03T23:00:00Z")).await.unwrap();

        kv.users_down.store(true, Ordering::SeqCst);
        let err = session.submit_meme("$MOG", "Ethereum", at("2024-06-03T23:05:00Z")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(session.list_memes().await.len(), 2);
        assert_eq!(session.current_user().await.total_submissions, 0);
        assert!(session.today().await.submitted_memes.is_empty());

        kv.users_down.store(false, Ordering::SeqCst);
        let (submission, meme) = session.submit_meme("$MOG", "Ethereum", at("2024-06-03T23:06:00Z")).await.unwrap();
        assert!(submission.created);
        assert_eq!(meme.id, MemeId(3));
        let stored_users = kv.get("users").await.unwrap().unwrap();
        assert_eq!(stored_users[0]["totalSubmissions"], 1);
        let stored_memes = kv.get("memes").await.unwrap().unwrap();
        assert_eq!(stored_memes.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn failed_rollover_is_retried_on_the_next_tick() {
        let kv = Arc::new(FlakyUsersStore::default());
        let session = Session::open(kv.clone(), at("2024-06-03T12:00:00Z")).await.unwrap();

        kv.users_down.store(true, Ordering::SeqCst);
        assert!(session.tick(at("2024-06-03T23:00:00Z")).await.is_err());
        assert_eq!(session.current_user().await.streak, 3);
        assert_eq!(
            session.countdown(at("2024-06-03T23:00:00Z")).await.next_reset,
            at("2024-06-03T23:00:00Z")
        );

        kv.users_down.store(false, Ordering::SeqCst);
        let report = session.tick(at("2024-06-03T23:00:01Z")).await.unwrap().unwrap();
        assert_eq!(report.streak_advanced_to, Some(4));
        assert_eq!(session.current_user().await.streak, 4);
    }

    #[tokio::test]
    async fn failed_like_is_not_counted() {
        let kv = Arc::new(FlakyUsersStore::default());
        let session = Session::open(kv.clone(), at("2024-06-03T12:00:00Z")).await.unwrap();

        kv.users_down.store(true, Ordering::SeqCst);
        assert!(session.like_meme(MemeId(1)).await.is_err());
        assert_eq!(session.list_memes().await[0].likes, 10);
        assert!(!session.current_user().await.has_liked(MemeId(1)));

        kv.users_down.store(false, Ordering::SeqCst);
        assert!(session.like_meme(MemeId(1)).await.unwrap());
        assert_eq!(session.list_memes().await[0].likes, 11);
    }
}
