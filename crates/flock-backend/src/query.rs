//! A small builder over the PostgREST table API.
//!
//! Filters become query parameters (`column=eq.value`), ordering and paging
//! map to `order`, `offset` and `limit`. Terminal methods issue exactly one
//! request.

use std::fmt::Display;

use reqwest::{Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::Backend;
use crate::error::{BackendError, Result, check};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

pub struct Query<'a> {
    backend: &'a Backend,
    table: String,
    params: Vec<(String, String)>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(backend: &'a Backend, table: &str) -> Self {
        Self {
            backend,
            table: table.to_string(),
            params: Vec::new(),
        }
    }

    /// Column list, embeds included. Whitespace is stripped so multi-line
    /// select strings can be written readably.
    pub fn select(mut self, columns: &str) -> Self {
        let compact: String = columns.chars().filter(|c| !c.is_whitespace()).collect();
        self.params.push(("select".into(), compact));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    /// Case-insensitive LIKE. `%` in the pattern is the wildcard.
    pub fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(column, "ilike", pattern.replace('%', "*"))
    }

    pub fn is_in<S: AsRef<str>>(self, column: &str, values: &[S]) -> Self {
        let list = values
            .iter()
            .map(|v| quote(v.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "in", format!("({list})"))
    }

    /// Raw PostgREST `or` group, e.g. `sender_id.eq.a,receiver_id.eq.a`.
    /// Build values with [`quote`] when they come from user input.
    pub fn or(mut self, filters: &str) -> Self {
        self.params.push(("or".into(), format!("({filters})")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let dir = if ascending { "asc" } else { "desc" };
        self.params.push(("order".into(), format!("{column}.{dir}")));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.params.push(("limit".into(), n.to_string()));
        self
    }

    /// Inclusive row range, as in `range(0, 9)` for the first ten rows.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.params.push(("offset".into(), from.to_string()));
        self.params
            .push(("limit".into(), (to.saturating_sub(from) + 1).to_string()));
        self
    }

    fn filter(mut self, column: &str, op: &str, value: impl Display) -> Self {
        self.params.push((column.to_string(), format!("{op}.{value}")));
        self
    }

    fn url(&self) -> String {
        self.backend.endpoint(&format!("/rest/v1/{}", self.table))
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        trace!(table = %self.table, params = ?self.params, "{} rest query", method);
        self.backend
            .request(method, &self.url())
            .query(&self.params)
    }

    // -- Reads --

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let resp = check(self.request(Method::GET).send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Exactly one row; zero rows is [`BackendError::NotFound`].
    pub async fn single<T: DeserializeOwned>(self) -> Result<T> {
        let resp = self
            .request(Method::GET)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// First row if any.
    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Exact row count without transferring rows.
    pub async fn count(self) -> Result<u64> {
        let resp = self
            .request(Method::HEAD)
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let resp = check(resp).await?;
        let range = resp
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BackendError::Api {
                status: resp.status().as_u16(),
                code: None,
                message: "missing Content-Range on count".into(),
                details: None,
                hint: None,
            })?;
        parse_total(range)
    }

    // -- Writes --

    /// Insert one row and return it as stored.
    pub async fn insert<T: DeserializeOwned>(self, row: &impl Serialize) -> Result<T> {
        let resp = self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
            .json(row)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn insert_silent(self, row: &impl Serialize) -> Result<()> {
        let resp = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Insert, or merge into the row that collides on `on_conflict`.
    pub async fn upsert(mut self, row: &impl Serialize, on_conflict: &str) -> Result<()> {
        self.params.push(("on_conflict".into(), on_conflict.to_string()));
        let resp = self
            .request(Method::POST)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Patch every row matching the filters and return the updated rows.
    pub async fn update<T: DeserializeOwned>(self, patch: &impl Serialize) -> Result<Vec<T>> {
        let resp = self
            .request(Method::PATCH)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn update_silent(self, patch: &impl Serialize) -> Result<()> {
        let resp = self
            .request(Method::PATCH)
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn delete(self) -> Result<()> {
        let resp = self.request(Method::DELETE).send().await?;
        check(resp).await?;
        Ok(())
    }
}

/// Double-quote a value for use inside `in.(...)` and `or=(...)` lists,
/// where commas, dots and parentheses are reserved.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `0-9/42` or `*/0` -> total after the slash.
fn parse_total(content_range: &str) -> Result<u64> {
    content_range
        .rsplit('/')
        .next()
        .and_then(|total| total.parse().ok())
        .ok_or_else(|| BackendError::Api {
            status: 200,
            code: None,
            message: format!("unparseable Content-Range: {content_range}"),
            details: None,
            hint: None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BackendConfig;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> Backend {
        Backend::new(BackendConfig {
            url: server.uri(),
            anon_key: "anon-key".into(),
        })
        .unwrap()
    }

    #[test]
    fn quote_escapes_reserved_characters() {
        assert_eq!(quote("a,b"), "\"a,b\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn content_range_totals() {
        assert_eq!(parse_total("0-9/42").unwrap(), 42);
        assert_eq!(parse_total("*/0").unwrap(), 0);
        assert!(parse_total("0-9/*").is_err());
    }

    #[tokio::test]
    async fn fetch_sends_filters_order_and_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/posts"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .and(query_param("select", "*,users:user_id(id,username)"))
            .and(query_param("user_id", "eq.u1"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("offset", "10"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "p1" }])))
            .mount(&server)
            .await;

        let rows: Vec<Value> = backend(&server)
            .from("posts")
            .select("*, users:user_id(id, username)")
            .eq("user_id", "u1")
            .order("created_at", false)
            .range(10, 19)
            .fetch()
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn scoped_token_replaces_anon_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/bookmarks"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let rows: Vec<Value> = backend(&server)
            .with_token("user-jwt")
            .from("bookmarks")
            .fetch()
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn single_maps_no_rows_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(header("accept", SINGLE_OBJECT))
            .respond_with(ResponseTemplate::new(406).set_body_json(json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned",
                "details": "The result contains 0 rows",
                "hint": null
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .from("users")
            .eq("username", "ghost")
            .single::<Value>()
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound));
    }

    #[tokio::test]
    async fn count_reads_content_range() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/notifications"))
            .and(header("prefer", "count=exact"))
            .and(query_param("seen", "eq.false"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-range", "0-2/3"))
            .mount(&server)
            .await;

        let count = backend(&server)
            .from("notifications")
            .select("id")
            .eq("seen", false)
            .count()
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn insert_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/likes"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({ "user_id": "u1", "post_id": "p1" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({ "id": "l1", "user_id": "u1", "post_id": "p1" })),
            )
            .mount(&server)
            .await;

        let row: Value = backend(&server)
            .from("likes")
            .insert(&json!({ "user_id": "u1", "post_id": "p1" }))
            .await
            .unwrap();
        assert_eq!(row["id"], "l1");
    }

    #[tokio::test]
    async fn in_and_ilike_filters_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/trending_topics"))
            .and(query_param("tag", "ilike.*web*"))
            .and(query_param("id", "in.(\"1\",\"2\")"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let _: Vec<Value> = backend(&server)
            .from("trending_topics")
            .ilike("tag", "%web%")
            .is_in("id", &["1", "2"])
            .fetch()
            .await
            .unwrap();
    }
}
