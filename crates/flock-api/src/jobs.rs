use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, Utc};
use tracing::warn;

use flock_types::api::{JobListing, JobsQuery, JobsResponse};
use flock_types::models::Job;

use crate::auth::AppState;

/// Short relative label for when a job was posted.
pub fn posted_label(posted: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - posted).num_days();
    match days {
        ..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=29 => {
            let weeks = days / 7;
            format!("{weeks} {} ago", if weeks == 1 { "week" } else { "weeks" })
        }
        _ => posted.format("%b %-d").to_string(),
    }
}

/// Newest job is featured; the rest are filtered by `type` (`All` keeps
/// everything).
pub async fn list(State(state): State<AppState>, Query(query): Query<JobsQuery>) -> Json<JobsResponse> {
    let jobs = state.backend.jobs().await.unwrap_or_else(|e| {
        warn!("jobs failed, serving empty board: {}", e);
        Vec::new()
    });
    Json(build_board(jobs, &query.kind, Utc::now()))
}

fn build_board(jobs: Vec<Job>, kind: &str, now: DateTime<Utc>) -> JobsResponse {
    let listing = |job: Job| JobListing {
        posted: posted_label(job.created_at, now),
        job,
    };

    let mut jobs = jobs.into_iter();
    let featured = jobs.next().map(listing);
    let jobs = jobs
        .filter(|job| kind == "All" || job.kind == kind)
        .map(listing)
        .collect();
    JobsResponse { featured, jobs }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        "2024-06-20T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn labels_follow_age() {
        let now = now();
        assert_eq!(posted_label(now - Duration::hours(3), now), "Today");
        assert_eq!(posted_label(now - Duration::hours(30), now), "Yesterday");
        assert_eq!(posted_label(now - Duration::days(4), now), "4 days ago");
        assert_eq!(posted_label(now - Duration::days(7), now), "1 week ago");
        assert_eq!(posted_label(now - Duration::days(20), now), "2 weeks ago");
        assert_eq!(posted_label(now - Duration::days(45), now), "May 6");
    }

    fn job(id: &str, kind: &str) -> Job {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Job {id}"),
            "type": kind,
            "created_at": "2024-06-19T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn first_job_is_featured_and_excluded_from_list() {
        let board = build_board(
            vec![job("1", "Full-time"), job("2", "Contract"), job("3", "Full-time")],
            "Full-time",
            now(),
        );
        let featured = board.featured.unwrap();
        assert_eq!(featured.job.id, "1");
        assert_eq!(featured.posted, "Yesterday");
        assert_eq!(board.jobs.len(), 1);
        assert_eq!(board.jobs[0].job.id, "3");
    }

    #[test]
    fn all_keeps_every_remaining_job() {
        let board = build_board(vec![job("1", "Remote"), job("2", "Contract")], "All", now());
        assert_eq!(board.jobs.len(), 1);
        assert!(build_board(Vec::new(), "All", now()).featured.is_none());
    }
}
