use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use rand::seq::SliceRandom;
use tracing::warn;

use flock_types::api::{ExploreResponse, FollowState, SearchQuery, SearchResponse, SearchResult};
use flock_types::models::{Post, TrendingTopic, User};

use crate::auth::AppState;
use crate::fallback;
use crate::middleware::AuthUser;

const TRENDING_PANEL_SIZE: u32 = 5;
const SUGGESTION_COUNT: usize = 3;

/// Side-panel topics. A failed or empty read serves the fixed list.
pub async fn trending(State(state): State<AppState>) -> Json<Vec<TrendingTopic>> {
    match state.backend.trending_topics(TRENDING_PANEL_SIZE).await {
        Ok(topics) if !topics.is_empty() => Json(topics),
        Ok(_) => {
            warn!("trending_topics returned nothing, serving fixed topics");
            Json(fallback::trending_topics())
        }
        Err(e) => {
            warn!("trending_topics failed, serving fixed topics: {}", e);
            Json(fallback::trending_topics())
        }
    }
}

pub async fn explore(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Json<ExploreResponse> {
    let backend = &state.backend;
    let (topics, users, posts) = tokio::join!(
        backend.trending_topics(10),
        backend.top_users(5),
        backend.trending_posts(10),
    );

    let topics = match topics {
        Ok(topics) if !topics.is_empty() => topics,
        Ok(_) => fallback::explore_topics(),
        Err(e) => {
            warn!("explore topics failed, serving fixed topics: {}", e);
            fallback::explore_topics()
        }
    };
    let users: Vec<User> = users.unwrap_or_else(|e| {
        warn!("top_users failed: {}", e);
        Vec::new()
    });
    let posts: Vec<Post> = posts.unwrap_or_else(|e| {
        warn!("trending_posts failed: {}", e);
        Vec::new()
    });

    let following = match user {
        Some(Extension(viewer)) => {
            let ids: Vec<String> = users
                .iter()
                .filter(|u| u.id != viewer.id_str())
                .map(|u| u.id.clone())
                .collect();
            viewer
                .backend(&state)
                .follow_status(&viewer.id_str(), &ids)
                .await
                .unwrap_or_else(|e| {
                    warn!("follow_status for {} failed: {}", viewer.id, e);
                    HashMap::new()
                })
        }
        None => HashMap::new(),
    };

    Json(ExploreResponse {
        topics,
        users,
        posts,
        following,
    })
}

/// "Who to follow": sample users the caller does not follow yet, shuffled.
pub async fn suggestions(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
) -> Json<Vec<FollowState>> {
    let candidates = fallback::users();

    let followed = match user {
        Some(Extension(viewer)) => {
            let ids: Vec<String> = candidates.iter().map(|u| u.id.clone()).collect();
            match viewer
                .backend(&state)
                .follow_status(&viewer.id_str(), &ids)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    warn!("follow_status for suggestions failed: {}", e);
                    return Json(
                        fallback::suggested_users()
                            .iter()
                            .map(|u| FollowState {
                                user: u.summary(),
                                is_following: false,
                            })
                            .collect(),
                    );
                }
            }
        }
        None => HashMap::new(),
    };

    let mut picks: Vec<FollowState> = candidates
        .iter()
        .filter(|u| !followed.get(&u.id).copied().unwrap_or(false))
        .map(|u| FollowState {
            user: u.summary(),
            is_following: false,
        })
        .collect();
    picks.shuffle(&mut rand::rng());
    picks.truncate(SUGGESTION_COUNT);
    Json(picks)
}

/// Post search. When the backend is unreachable a hashtag query still
/// searches the sample timeline.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<SearchResponse> {
    let q = query.q.trim().to_string();
    if q.is_empty() {
        return Json(SearchResponse {
            query: q,
            posts: Vec::new(),
        });
    }

    let posts = match state.backend.search_posts(&q, 20).await {
        Ok(posts) => posts,
        Err(e) => {
            warn!("search_posts for {:?} failed: {}", q, e);
            if q.starts_with('#') {
                fallback::filter_by_hashtag(fallback::posts(), &q)
            } else {
                Vec::new()
            }
        }
    };
    Json(SearchResponse { query: q, posts })
}

/// Search-box suggestions: up to three users, plus up to two hashtags when
/// the query starts with `#`.
pub async fn typeahead(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Json<Vec<SearchResult>> {
    let q = query.q.trim();
    if q.chars().count() <= 1 {
        return Json(Vec::new());
    }

    let mut results: Vec<SearchResult> = match state.backend.search_users(q, 3).await {
        Ok(users) => users
            .into_iter()
            .map(|u| SearchResult::User {
                id: u.id.unwrap_or_default(),
                username: u.username,
                name: u.name,
                avatar_url: u.avatar_url,
            })
            .collect(),
        Err(e) => {
            warn!("search_users for {:?} failed: {}", q, e);
            Vec::new()
        }
    };

    if q.starts_with('#') {
        match state.backend.search_hashtags(q, 2).await {
            Ok(tags) => results.extend(
                tags.into_iter()
                    .map(|t| SearchResult::Hashtag { id: t.id, tag: t.tag }),
            ),
            Err(e) => warn!("search_hashtags for {:?} failed: {}", q, e),
        }
    }

    Json(results)
}
