use crate::{
    domain::StorageKey,
    models::{Meme, MemeId, PopularityHistory, User, UserId},
    views,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing;

/// What `submit_meme` did to the meme collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub meme_id: MemeId,
    /// False when an existing meme of the same name was bumped instead.
    pub created: bool,
}

/// Effects of a daily rollover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolloverReport {
    /// Meme awarded shiller's pick for the day that just ended.
    pub shillers_pick: Option<MemeId>,
    /// New streak of the active user if it advanced.
    pub streak_advanced_to: Option<u32>,
    /// Names that had been submitted during the day.
    pub cleared_submissions: usize,
}

/// Authoritative in-memory state of one session.
///
/// The active user is always present in `users`; `current` indexes into it.
/// Users and memes are never removed, so the index stays valid.
#[derive(Debug, Clone)]
pub struct DomainStore {
    memes: Vec<Meme>,
    users: Vec<User>,
    current: usize,
    submitted_today: Vec<String>,
    session_likes: Vec<MemeId>,
}

impl DomainStore {
    /// Assembles a store from loaded collections. `users` wins over the
    /// separately stored `current_user` record; an active user missing from
    /// `users` is appended.
    pub fn new(memes: Vec<Meme>, mut users: Vec<User>, current_user: User) -> Self {
        let current = match users.iter().position(|u| u.id == current_user.id) {
            Some(index) => index,
            None => {
                tracing::warn!(user_id = %current_user.id, "Active user missing from user list, restoring it");
                users.push(current_user);
                users.len() - 1
            }
        };
        Self {
            memes,
            users,
            current,
            submitted_today: Vec::new(),
            session_likes: Vec::new(),
        }
    }

    pub fn with_today(mut self, submitted_today: Vec<String>, session_likes: Vec<MemeId>) -> Self {
        self.submitted_today = submitted_today;
        self.session_likes = session_likes;
        self
    }

    /// First-run contents: two memes and their submitters.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let memes = vec![
            Meme {
                id: MemeId(1),
                name: "$PEPE".into(),
                chain: "Ethereum".into(),
                submission_count: 4,
                likes: 10,
                first_submitter: "CryptoEnthusiast".into(),
                shillers_pick_count: 2,
                popularity_history: PopularityHistory([1, 2, 3, 2, 4, 3, 4, 4]),
                submission_date: now,
            },
            Meme {
                id: MemeId(2),
                name: "$DOGE".into(),
                chain: "Dogecoin".into(),
                submission_count: 2,
                likes: 5,
                first_submitter: "MemeQueen".into(),
                shillers_pick_count: 1,
                popularity_history: PopularityHistory([0, 1, 1, 2, 1, 2, 2, 2]),
                submission_date: now,
            },
        ];

        let crypto = User {
            streak: 3,
            total_submissions: 1,
            liked_memes: vec![MemeId(2)],
            submitted_memes: vec!["$PEPE".into()],
            shillers_picks: vec!["$PEPE".into()],
            followers: vec![UserId(2)],
            ..User::new(UserId(1), "CryptoEnthusiast")
        };
        let queen = User {
            streak: 1,
            total_submissions: 1,
            liked_memes: vec![MemeId(1)],
            submitted_memes: vec!["$DOGE".into()],
            following: vec![UserId(1)],
            ..User::new(UserId(2), "MemeQueen")
        };

        let current = crypto.clone();
        Self::new(memes, vec![crypto, queen], current)
    }

    pub fn list_memes(&self) -> &[Meme] {
        &self.memes
    }

    pub fn list_users(&self) -> &[User] {
        &self.users
    }

    pub fn current_user(&self) -> &User {
        &self.users[self.current]
    }

    pub fn meme(&self, id: MemeId) -> Option<&Meme> {
        self.memes.iter().find(|m| m.id == id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn submitted_today(&self) -> &[String] {
        &self.submitted_today
    }

    pub fn session_likes(&self) -> &[MemeId] {
        &self.session_likes
    }

    /// JSON image of the collection stored under `key`.
    pub fn value_for(&self, key: StorageKey) -> Result<Value, serde_json::Error> {
        match key {
            StorageKey::Memes => serde_json::to_value(&self.memes),
            StorageKey::Users => serde_json::to_value(&self.users),
            StorageKey::CurrentUser => serde_json::to_value(self.current_user()),
            StorageKey::SubmittedMemes => serde_json::to_value(&self.submitted_today),
            StorageKey::UserLikes => serde_json::to_value(&self.session_likes),
        }
    }

    fn current_mut(&mut self) -> &mut User {
        &mut self.users[self.current]
    }

    fn user_index(&self, id: UserId) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    fn next_meme_id(&self) -> MemeId {
        MemeId(self.memes.iter().map(|m| m.id.0).max().unwrap_or(0) + 1)
    }

    /// Records a submission by the active user. Input is assumed validated.
    pub fn submit_meme(&mut self, name: &str, chain: &str, now: DateTime<Utc>) -> Submission {
        let submission = match self.memes.iter().position(|m| m.name == name) {
            Some(index) => {
                let meme = &mut self.memes[index];
                meme.submission_count = meme.submission_count.saturating_add(1);
                meme.popularity_history.bump_today();
                Submission { meme_id: meme.id, created: false }
            }
            None => {
                let meme = Meme {
                    id: self.next_meme_id(),
                    name: name.to_string(),
                    chain: chain.to_string(),
                    submission_count: 1,
                    likes: 0,
                    first_submitter: self.current_user().name.clone(),
                    shillers_pick_count: 0,
                    popularity_history: PopularityHistory::fresh(),
                    submission_date: now,
                };
                let meme_id = meme.id;
                self.memes.push(meme);
                Submission { meme_id, created: true }
            }
        };

        if !self.submitted_today.iter().any(|n| n == name) {
            self.submitted_today.push(name.to_string());
        }

        let user = self.current_mut();
        user.total_submissions = user.total_submissions.saturating_add(1);
        user.submitted_memes.push(name.to_string());

        tracing::debug!(meme_id = %submission.meme_id, created = submission.created, %name, "Store: meme submitted");
        submission
    }

    /// True when `like_meme` would change anything.
    pub fn can_like(&self, meme_id: MemeId) -> bool {
        !self.current_user().has_liked(meme_id) && self.meme(meme_id).is_some()
    }

    /// Returns false when the meme is unknown or already liked by the active user.
    pub fn like_meme(&mut self, meme_id: MemeId) -> bool {
        if self.current_user().has_liked(meme_id) {
            return false;
        }
        let Some(meme) = self.memes.iter_mut().find(|m| m.id == meme_id) else {
            tracing::debug!(%meme_id, "Store: like for unknown meme ignored");
            return false;
        };
        meme.likes = meme.likes.saturating_add(1);

        self.current_mut().liked_memes.push(meme_id);
        if !self.session_likes.contains(&meme_id) {
            self.session_likes.push(meme_id);
        }
        true
    }

    pub fn can_follow(&self, target: UserId) -> bool {
        let me = self.current_user();
        target != me.id && !me.is_following(target) && self.user(target).is_some()
    }

    /// Returns false when the relation already holds or the target is unknown or oneself.
    pub fn follow_user(&mut self, target: UserId) -> bool {
        let me = self.current_user().id;
        if target == me || self.current_user().is_following(target) {
            return false;
        }
        let Some(target_index) = self.user_index(target) else {
            tracing::debug!(%target, "Store: follow of unknown user ignored");
            return false;
        };

        self.current_mut().following.push(target);
        let followers = &mut self.users[target_index].followers;
        if !followers.contains(&me) {
            followers.push(me);
        }
        true
    }

    /// Returns false when the active user was not following `target`.
    pub fn unfollow_user(&mut self, target: UserId) -> bool {
        let me = self.current_user().id;
        if !self.current_user().is_following(target) {
            return false;
        }

        self.current_mut().following.retain(|id| *id != target);
        if let Some(target_index) = self.user_index(target) {
            self.users[target_index].followers.retain(|id| *id != me);
        }
        true
    }

    /// Past `first_submitter` values keep the old name.
    pub fn rename_user(&mut self, new_name: &str) -> bool {
        let user = self.current_mut();
        if user.name == new_name {
            return false;
        }
        user.name = new_name.to_string();
        true
    }

    /// User credited with a shiller's pick: the user named as first submitter
    /// if they did submit that name, otherwise the first user who submitted it.
    /// Names can change after submission, so the name alone is not trusted.
    fn pick_owner(&self, pick: &Meme) -> Option<usize> {
        let submitted = |u: &User| u.submitted_memes.iter().any(|n| *n == pick.name);
        self.users
            .iter()
            .position(|u| u.name == pick.first_submitter && submitted(u))
            .or_else(|| self.users.iter().position(submitted))
    }

    /// Closes the current day. A top meme without likes earns no pick.
    pub fn rollover(&mut self) -> RolloverReport {
        let mut report = RolloverReport::default();

        let award = views::shillers_pick(&self.memes)
            .filter(|m| m.likes > 0)
            .map(|m| (m.id, m.name.clone(), self.pick_owner(m)));
        if let Some((pick_id, name, owner)) = award {
            if let Some(pick) = self.memes.iter_mut().find(|m| m.id == pick_id) {
                pick.shillers_pick_count = pick.shillers_pick_count.saturating_add(1);
            }
            if let Some(owner) = owner {
                self.users[owner].shillers_picks.push(name);
            }
            report.shillers_pick = Some(pick_id);
        }

        for meme in &mut self.memes {
            meme.popularity_history.roll();
        }

        report.cleared_submissions = self.submitted_today.len();
        self.submitted_today.clear();

        let user = self.current_mut();
        if user.has_submitted_today() {
            user.streak = user.streak.saturating_add(1);
            user.total_submissions = 0;
            report.streak_advanced_to = Some(user.streak);
        }

        tracing::info!(?report, "Store: daily rollover applied");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-06-03T12:00:00Z".parse().unwrap()
    }

    fn two_strangers() -> DomainStore {
        let a = User::new(UserId(1), "A");
        let b = User::new(UserId(2), "B");
        DomainStore::new(Vec::new(), vec![a.clone(), b], a)
    }

    #[test]
    fn new_submission_creates_meme_with_fresh_counters() {
        let mut store = two_strangers();
        let outcome = store.submit_meme("$PEPE", "Ethereum", now());

        assert_eq!(outcome, Submission { meme_id: MemeId(1), created: true });
        let meme = store.meme(MemeId(1)).unwrap();
        assert_eq!(meme.submission_count, 1);
        assert_eq!(meme.likes, 0);
        assert_eq!(meme.first_submitter, "A");
        assert_eq!(meme.popularity_history, PopularityHistory::fresh());
        assert_eq!(store.current_user().total_submissions, 1);
        assert_eq!(store.current_user().submitted_memes, vec!["$PEPE".to_string()]);
        assert_eq!(store.submitted_today(), ["$PEPE".to_string()]);
    }

    #[test]
    fn resubmitting_a_name_bumps_count_without_new_record() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());
        let again = store.submit_meme("$PEPE", "Ethereum", now());

        assert!(!again.created);
        assert_eq!(store.list_memes().len(), 1);
        assert_eq!(store.list_memes()[0].submission_count, 2);
        assert_eq!(store.list_memes()[0].popularity_history.0[7], 2);
        assert_eq!(store.submitted_today().len(), 1);
        assert_eq!(store.current_user().submitted_memes.len(), 2);
    }

    #[test]
    fn meme_ids_continue_after_the_highest_existing_id() {
        let mut store = DomainStore::seeded(now());
        let outcome = store.submit_meme("$WIF", "Solana", now());
        assert_eq!(outcome.meme_id, MemeId(3));
    }

    #[test]
    fn like_is_counted_once_per_user() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());

        assert!(store.like_meme(MemeId(1)));
        assert!(!store.like_meme(MemeId(1)));
        assert_eq!(store.meme(MemeId(1)).unwrap().likes, 1);
        assert_eq!(store.current_user().liked_memes, vec![MemeId(1)]);
        assert_eq!(store.session_likes(), [MemeId(1)]);
    }

    #[test]
    fn like_of_unknown_meme_is_a_no_op() {
        let mut store = two_strangers();
        assert!(!store.like_meme(MemeId(42)));
        assert!(store.current_user().liked_memes.is_empty());
        assert!(store.session_likes().is_empty());
    }

    #[test]
    fn follow_and_unfollow_stay_symmetric() {
        let mut store = two_strangers();

        assert!(store.follow_user(UserId(2)));
        assert_eq!(store.current_user().following, vec![UserId(2)]);
        assert_eq!(store.user(UserId(2)).unwrap().followers, vec![UserId(1)]);

        let before_repeat = store.list_users().to_vec();
        assert!(!store.follow_user(UserId(2)));
        assert_eq!(store.list_users(), before_repeat.as_slice());

        assert!(store.unfollow_user(UserId(2)));
        assert!(store.current_user().following.is_empty());
        assert!(store.user(UserId(2)).unwrap().followers.is_empty());
        assert!(!store.unfollow_user(UserId(2)));
    }

    #[test]
    fn follow_ignores_self_and_unknown_users() {
        let mut store = two_strangers();
        assert!(!store.follow_user(UserId(1)));
        assert!(!store.follow_user(UserId(9)));
        assert!(store.current_user().following.is_empty());
    }

    #[test]
    fn rename_does_not_rewrite_history() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());

        assert!(store.rename_user("Degen"));
        assert_eq!(store.current_user().name, "Degen");
        assert_eq!(store.meme(MemeId(1)).unwrap().first_submitter, "A");
        assert!(!store.rename_user("Degen"));
    }

    #[test]
    fn rollover_advances_streak_only_after_a_submission() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());
        store.submit_meme("$BONK", "Solana", now());
        assert_eq!(store.current_user().total_submissions, 2);

        let report = store.rollover();
        assert_eq!(report.streak_advanced_to, Some(1));
        assert_eq!(report.cleared_submissions, 2);
        assert_eq!(store.current_user().streak, 1);
        assert_eq!(store.current_user().total_submissions, 0);
        assert!(store.submitted_today().is_empty());

        let idle = store.rollover();
        assert_eq!(idle.streak_advanced_to, None);
        assert_eq!(store.current_user().streak, 1);
    }

    #[test]
    fn rollover_awards_shillers_pick_and_rolls_history() {
        let mut store = DomainStore::seeded(now());
        let report = store.rollover();

        assert_eq!(report.shillers_pick, Some(MemeId(1)));
        let pepe = store.meme(MemeId(1)).unwrap();
        assert_eq!(pepe.shillers_pick_count, 3);
        assert_eq!(pepe.popularity_history.0, [2, 3, 2, 4, 3, 4, 4, 0]);
        assert_eq!(
            store.current_user().shillers_picks,
            vec!["$PEPE".to_string(), "$PEPE".to_string()]
        );
        assert_eq!(store.current_user().streak, 4);
    }

    #[test]
    fn shillers_pick_follows_the_submitter_across_renames() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());
        store.like_meme(MemeId(1));
        store.rename_user("B");

        let report = store.rollover();
        assert_eq!(report.shillers_pick, Some(MemeId(1)));
        assert_eq!(store.current_user().shillers_picks, vec!["$PEPE".to_string()]);
        assert!(store.user(UserId(2)).unwrap().shillers_picks.is_empty());
    }

    #[test]
    fn unliked_top_meme_earns_no_pick() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());

        let report = store.rollover();
        assert_eq!(report.shillers_pick, None);
        assert_eq!(store.meme(MemeId(1)).unwrap().shillers_pick_count, 0);
        assert!(store.current_user().shillers_picks.is_empty());
    }

    #[test]
    fn can_like_and_can_follow_predict_mutations() {
        let mut store = two_strangers();
        store.submit_meme("$PEPE", "Ethereum", now());

        assert!(store.can_like(MemeId(1)));
        assert!(!store.can_like(MemeId(9)));
        store.like_meme(MemeId(1));
        assert!(!store.can_like(MemeId(1)));

        assert!(store.can_follow(UserId(2)));
        assert!(!store.can_follow(UserId(1)));
        assert!(!store.can_follow(UserId(9)));
        store.follow_user(UserId(2));
        assert!(!store.can_follow(UserId(2)));
    }

    #[test]
    fn missing_active_user_is_restored_into_user_list() {
        let stray = User::new(UserId(7), "Stray");
        let store = DomainStore::new(Vec::new(), vec![User::new(UserId(1), "A")], stray);
        assert_eq!(store.current_user().id, UserId(7));
        assert_eq!(store.list_users().len(), 2);
    }
}
