pub mod auth;
pub mod bookmarks;
pub mod communities;
pub mod compose;
pub mod error;
pub mod explore;
pub mod fallback;
pub mod jobs;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use crate::auth::AppState;
use crate::middleware::{optional_auth, require_auth};

/// Every JSON route. The websocket gateway and the outer layers are added
/// by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/posts/{id}", get(posts::get_post))
        .route("/users/{user}/posts", get(users::posts))
        .route("/jobs", get(jobs::list))
        .route("/trending/topics", get(explore::trending))
        .route("/search", get(explore::search))
        .route("/search/typeahead", get(explore::typeahead))
        .route("/media/url", get(media::url))
        .route("/health", get(media::health));

    // Readable anonymously, personalised when a token is present.
    let viewer_routes = Router::new()
        .route("/feed", get(posts::feed))
        .route("/compose", post(compose::create_post))
        .route("/users/{user}", get(users::profile))
        .route("/users/{user}/followers", get(users::followers))
        .route("/users/{user}/following", get(users::following))
        .route("/communities", get(communities::list))
        .route("/explore", get(explore::explore))
        .route("/suggestions", get(explore::suggestions))
        .route_layer(from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        .route("/posts/{id}/like", post(posts::like).delete(posts::unlike))
        .route("/posts/{id}/repost", post(posts::repost))
        .route("/posts/{id}/comments", post(posts::comment))
        .route(
            "/posts/{id}/bookmark",
            post(posts::bookmark).delete(posts::remove_bookmark),
        )
        .route("/users/{user}/follow", post(users::follow).delete(users::unfollow))
        .route("/settings/profile", put(users::update_settings))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/messages", get(messages::conversations))
        .route("/messages/{user_id}", get(messages::thread).post(messages::send))
        .route("/bookmarks", get(bookmarks::list))
        .route("/bookmarks/collections", post(bookmarks::create_collection))
        .route("/bookmarks/{id}/collection", put(bookmarks::assign))
        .route(
            "/communities/{id}/membership",
            post(communities::join).delete(communities::leave),
        )
        .route("/media/auth", get(media::upload_auth))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .with_state(state)
}
