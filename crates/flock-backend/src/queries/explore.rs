use flock_types::models::{Job, TrendingTopic};

use crate::error::Result;
use crate::Backend;

impl Backend {
    pub async fn jobs(&self) -> Result<Vec<Job>> {
        self.from("jobs")
            .select("*")
            .order("created_at", false)
            .fetch()
            .await
    }

    pub async fn trending_topics(&self, limit: u32) -> Result<Vec<TrendingTopic>> {
        self.from("trending_topics")
            .select("*")
            .order("posts_count", false)
            .limit(u64::from(limit))
            .fetch()
            .await
    }

    /// Topics whose tag contains `q` (leading `#` ignored).
    pub async fn search_hashtags(&self, q: &str, limit: u32) -> Result<Vec<TrendingTopic>> {
        let term = q.trim().trim_start_matches('#');
        self.from("trending_topics")
            .select("id,tag")
            .ilike("tag", &format!("%{term}%"))
            .limit(u64::from(limit))
            .fetch()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::backend;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn hashtag_search_drops_leading_hash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/trending_topics"))
            .and(query_param("tag", "ilike.*web*"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 3, "tag": "#WebDevelopment" }
            ])))
            .mount(&server)
            .await;

        let tags = backend(&server).search_hashtags("#web", 2).await.unwrap();
        assert_eq!(tags[0].id, "3");
        assert_eq!(tags[0].posts_count, 0);
    }
}
