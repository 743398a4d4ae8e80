//! Read-only projections over the store's collections.
//!
//! Every ranking is descending and stable: entries with equal scores keep the
//! order they have in the underlying collection.

use crate::models::{Meme, User};
use serde::Deserialize;

/// The most-liked meme; the earliest one wins a tie.
pub fn shillers_pick(memes: &[Meme]) -> Option<&Meme> {
    memes
        .iter()
        .reduce(|best, meme| if meme.likes > best.likes { meme } else { best })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemeMetric {
    #[default]
    Likes,
    SubmissionCount,
    ShillersPicks,
}

impl MemeMetric {
    fn score(self, meme: &Meme) -> u64 {
        match self {
            MemeMetric::Likes => u64::from(meme.likes),
            MemeMetric::SubmissionCount => u64::from(meme.submission_count),
            MemeMetric::ShillersPicks => u64::from(meme.shillers_pick_count),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserMetric {
    #[default]
    Streak,
    TotalSubmissions,
    Followers,
    ShillersPicks,
}

impl UserMetric {
    fn score(self, user: &User) -> u64 {
        match self {
            UserMetric::Streak => u64::from(user.streak),
            UserMetric::TotalSubmissions => u64::from(user.total_submissions),
            UserMetric::Followers => user.followers.len() as u64,
            UserMetric::ShillersPicks => user.shillers_picks.len() as u64,
        }
    }
}

pub fn rank_memes(memes: &[Meme], metric: MemeMetric, limit: Option<usize>) -> Vec<&Meme> {
    let mut ranked: Vec<&Meme> = memes.iter().collect();
    // sort_by is stable, which gives the insertion-order tie-break
    ranked.sort_by(|a, b| metric.score(b).cmp(&metric.score(a)));
    ranked.truncate(limit.unwrap_or(ranked.len()));
    ranked
}

pub fn rank_users(users: &[User], metric: UserMetric, limit: Option<usize>) -> Vec<&User> {
    let mut ranked: Vec<&User> = users.iter().collect();
    ranked.sort_by(|a, b| metric.score(b).cmp(&metric.score(a)));
    ranked.truncate(limit.unwrap_or(ranked.len()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MemeId, PopularityHistory, UserId};

    fn meme(id: u64, likes: u32, submissions: u32) -> Meme {
        Meme {
            id: MemeId(id),
            name: format!("$M{}", id),
            chain: "Ethereum".into(),
            submission_count: submissions,
            likes,
            first_submitter: "someone".into(),
            shillers_pick_count: 0,
            popularity_history: PopularityHistory::default(),
            submission_date: "2024-06-03T12:00:00Z".parse().unwrap(),
        }
    }

    fn ids(memes: &[&Meme]) -> Vec<u64> {
        memes.iter().map(|m| m.id.0).collect()
    }

    #[test]
    fn shillers_pick_is_absent_without_memes() {
        assert!(shillers_pick(&[]).is_none());
    }

    #[test]
    fn shillers_pick_prefers_first_on_ties() {
        let memes = vec![meme(1, 3, 1), meme(2, 7, 1), meme(3, 7, 1)];
        assert_eq!(shillers_pick(&memes).map(|m| m.id), Some(MemeId(2)));
    }

    #[test]
    fn meme_ranking_is_descending_and_stable() {
        let memes = vec![meme(1, 2, 5), meme(2, 9, 1), meme(3, 2, 3), meme(4, 9, 0)];
        assert_eq!(ids(&rank_memes(&memes, MemeMetric::Likes, None)), vec![2, 4, 1, 3]);
        assert_eq!(
            ids(&rank_memes(&memes, MemeMetric::SubmissionCount, Some(2))),
            vec![1, 3]
        );
    }

    #[test]
    fn user_ranking_counts_followers() {
        let mut a = User::new(UserId(1), "A");
        let mut b = User::new(UserId(2), "B");
        a.streak = 5;
        b.followers = vec![UserId(1), UserId(3)];

        let by_streak: Vec<UserId> = rank_users(&[a.clone(), b.clone()], UserMetric::Streak, None)
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(by_streak, vec![UserId(1), UserId(2)]);

        let users = [a, b];
        let by_followers = rank_users(&users, UserMetric::Followers, Some(1));
        assert_eq!(by_followers.len(), 1);
        assert_eq!(by_followers[0].id, UserId(2));
    }

    #[test]
    fn metrics_parse_from_camel_case() {
        let metric: MemeMetric = serde_json::from_str("\"submissionCount\"").unwrap();
        assert_eq!(metric, MemeMetric::SubmissionCount);
        let metric: UserMetric = serde_json::from_str("\"shillersPicks\"").unwrap();
        assert_eq!(metric, UserMetric::ShillersPicks);
    }
}
