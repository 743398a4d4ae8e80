use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of daily slots kept in a meme's popularity window.
pub const POPULARITY_WINDOW: usize = 8;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct MemeId(pub u64);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for MemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Daily submission counts, oldest first. The last slot is today.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct PopularityHistory(pub [u32; POPULARITY_WINDOW]);

impl PopularityHistory {
    /// Window for a meme submitted for the first time today.
    pub fn fresh() -> Self {
        let mut slots = [0; POPULARITY_WINDOW];
        slots[POPULARITY_WINDOW - 1] = 1;
        Self(slots)
    }

    pub fn bump_today(&mut self) {
        let today = &mut self.0[POPULARITY_WINDOW - 1];
        *today = today.saturating_add(1);
    }

    /// Drops the oldest day and opens an empty slot for the new one.
    pub fn roll(&mut self) {
        self.0.rotate_left(1);
        self.0[POPULARITY_WINDOW - 1] = 0;
    }
}

fn unknown_submitter() -> String {
    "Unknown".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meme {
    pub id: MemeId,
    pub name: String,
    pub chain: String,
    pub submission_count: u32,
    pub likes: u32,
    #[serde(default = "unknown_submitter")]
    pub first_submitter: String,
    #[serde(default)]
    pub shillers_pick_count: u32,
    #[serde(default)]
    pub popularity_history: PopularityHistory,
    pub submission_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub streak: u32,
    /// Submissions made today; cleared at rollover.
    pub total_submissions: u32,
    pub liked_memes: Vec<MemeId>,
    pub submitted_memes: Vec<String>,
    pub shillers_picks: Vec<String>,
    pub followers: Vec<UserId>,
    pub following: Vec<UserId>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            streak: 0,
            total_submissions: 0,
            liked_memes: Vec::new(),
            submitted_memes: Vec::new(),
            shillers_picks: Vec::new(),
            followers: Vec::new(),
            following: Vec::new(),
        }
    }

    pub fn has_submitted_today(&self) -> bool {
        self.total_submissions > 0
    }

    pub fn has_liked(&self, meme_id: MemeId) -> bool {
        self.liked_memes.contains(&meme_id)
    }

    pub fn is_following(&self, user_id: UserId) -> bool {
        self.following.contains(&user_id)
    }
}
