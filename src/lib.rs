//! Daily memecoin picks: submissions, likes, follows, leaderboards and a
//! weekly bracket, kept in a key-value store and served as a JSON API.

pub mod aws_clients;
pub mod config;
pub mod cycle;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod startup;
pub mod storage;
pub mod store;
pub mod tournament;
pub mod validation;
pub mod views;

use std::sync::Arc;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub session: Arc<session::Session>,
}
