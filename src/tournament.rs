//! Weekly single-elimination bracket over the most-liked memes.

use crate::{
    models::Meme,
    views::{rank_memes, MemeMetric},
};
use rand::Rng;
use serde::Serialize;

pub const BRACKET_SIZE: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BracketSlot {
    Entry(Meme),
    /// Placeholder filling a bracket short of entrants.
    Bye,
}

impl BracketSlot {
    pub fn meme(&self) -> Option<&Meme> {
        match self {
            BracketSlot::Entry(meme) => Some(meme),
            BracketSlot::Bye => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Decides a matchup between two real entrants.
pub trait WinnerPicker {
    fn pick(&mut self, left: &Meme, right: &Meme) -> Side;
}

/// Unweighted coin flip, ignoring likes.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoinFlip;

impl WinnerPicker for CoinFlip {
    fn pick(&mut self, _left: &Meme, _right: &Meme) -> Side {
        if rand::rng().random_bool(0.5) { Side::Left } else { Side::Right }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bracket {
    rounds: Vec<Vec<BracketSlot>>,
}

impl Bracket {
    /// First round: top entrants by likes, padded with byes.
    pub fn seed(memes: &[Meme]) -> Self {
        let mut first_round: Vec<BracketSlot> = rank_memes(memes, MemeMetric::Likes, Some(BRACKET_SIZE))
            .into_iter()
            .cloned()
            .map(BracketSlot::Entry)
            .collect();
        first_round.resize(BRACKET_SIZE, BracketSlot::Bye);
        Self { rounds: vec![first_round] }
    }

    pub fn rounds(&self) -> &[Vec<BracketSlot>] {
        &self.rounds
    }

    pub fn current_round(&self) -> &[BracketSlot] {
        self.rounds.last().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pairs still to be played in the current round.
    pub fn matchups(&self) -> impl Iterator<Item = (&BracketSlot, &BracketSlot)> {
        self.current_round()
            .chunks_exact(2)
            .map(|pair| (&pair[0], &pair[1]))
    }

    pub fn is_finished(&self) -> bool {
        self.current_round().len() <= 1
    }

    /// The last slot standing, once every round has been played.
    pub fn champion(&self) -> Option<&BracketSlot> {
        if self.is_finished() { self.current_round().first() } else { None }
    }

    /// Plays the current round. Returns false if the bracket is already decided.
    pub fn advance(&mut self, picker: &mut dyn WinnerPicker) -> bool {
        if self.is_finished() {
            return false;
        }
        let next_round: Vec<BracketSlot> = self
            .matchups()
            .map(|(left, right)| match (left, right) {
                (BracketSlot::Entry(a), BracketSlot::Entry(b)) => match picker.pick(a, b) {
                    Side::Left => left.clone(),
                    Side::Right => right.clone(),
                },
                (BracketSlot::Entry(_), BracketSlot::Bye) => left.clone(),
                (BracketSlot::Bye, _) => right.clone(),
            })
            .collect();
        self.rounds.push(next_round);
        true
    }

    /// Plays rounds until a champion remains.
    pub fn resolve(&mut self, picker: &mut dyn WinnerPicker) {
        while self.advance(picker) {}
    }
}
