use crate::{handlers, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/memes", get(handlers::list_memes).post(handlers::submit_meme))
        .route("/memes/{id}/like", post(handlers::like_meme))
        .route("/users", get(handlers::list_users))
        .route("/users/{id}", get(handlers::get_user))
        .route(
            "/users/{id}/follow",
            post(handlers::follow_user).delete(handlers::unfollow_user),
        )
        .route("/me", get(handlers::current_user))
        .route("/me/name", put(handlers::rename_user))
        .route("/today", get(handlers::today))
        .route("/cycle", get(handlers::countdown))
        .route("/shillers-pick", get(handlers::shillers_pick))
        .route("/leaderboard/memes", get(handlers::meme_leaderboard))
        .route("/leaderboard/users", get(handlers::user_leaderboard))
        .route("/tournament", get(handlers::tournament))
        .route("/chains", get(handlers::chains))
        // Middleware Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state) // Pass the application state
}
