use crate::api::dto::{
    AnswerRequest, CommitSessionRequest, CreateCourseRequest, CreateUserRequest, ErrorBody,
    InsertRankingRequest, StartSessionRequest,
};
use crate::core::engine::{CommitReceipt, NextComparison, OwnerProfile, RankedCourse};
use crate::core::session::{ComparisonSession, Preference};
use crate::domain::model::{Course, ItemId, OwnerId};
use crate::utils::error::{RankError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Typed client for the ranking HTTP API.
#[derive(Debug, Clone)]
pub struct RankClient {
    base_url: String,
    client: Client,
}

impl RankClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(10))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        validate_url("server", base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn create_user(&self, name: &str, email: &str) -> Result<OwnerProfile> {
        let body = CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
        };
        let response = self.client.post(self.url("/api/users")).json(&body).send().await?;
        decode(response).await
    }

    pub async fn user(&self, owner_id: OwnerId) -> Result<OwnerProfile> {
        let response = self
            .client
            .get(self.url(&format!("/api/users/{}", owner_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn create_course(&self, title: &str, code: &str) -> Result<Course> {
        let body = CreateCourseRequest {
            title: title.to_string(),
            code: code.to_string(),
        };
        let response = self.client.post(self.url("/api/courses")).json(&body).send().await?;
        decode(response).await
    }

    pub async fn course(&self, item_id: ItemId) -> Result<Course> {
        let response = self
            .client
            .get(self.url(&format!("/api/courses/{}", item_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn courses(&self) -> Result<Vec<Course>> {
        let response = self.client.get(self.url("/api/courses")).send().await?;
        decode(response).await
    }

    pub async fn search_courses(&self, query: &str) -> Result<Vec<Course>> {
        let response = self
            .client
            .get(self.url("/api/courses"))
            .query(&[("search", query)])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn rankings(&self, owner_id: OwnerId) -> Result<Vec<RankedCourse>> {
        let response = self
            .client
            .get(self.url(&format!("/api/users/{}/rankings", owner_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn next_comparison(
        &self,
        owner_id: OwnerId,
        low: usize,
        high: usize,
    ) -> Result<NextComparison> {
        let response = self
            .client
            .get(self.url(&format!("/api/users/{}/next-comparison", owner_id)))
            .query(&[("low", low), ("high", high)])
            .send()
            .await?;
        decode(response).await
    }

    pub async fn insert_ranking(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
        position: usize,
        expected_version: Option<u64>,
    ) -> Result<CommitReceipt> {
        let body = InsertRankingRequest {
            item_id,
            position,
            expected_version,
        };
        let response = self
            .client
            .post(self.url(&format!("/api/users/{}/insert-ranking", owner_id)))
            .json(&body)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn start_session(
        &self,
        owner_id: OwnerId,
        item_id: ItemId,
    ) -> Result<ComparisonSession> {
        let response = self
            .client
            .post(self.url(&format!("/api/users/{}/sessions", owner_id)))
            .json(&StartSessionRequest { item_id })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn answer(
        &self,
        session: ComparisonSession,
        preference: Preference,
    ) -> Result<ComparisonSession> {
        let owner_id = session.owner_id;
        let response = self
            .client
            .post(self.url(&format!("/api/users/{}/sessions/answer", owner_id)))
            .json(&AnswerRequest { session, preference })
            .send()
            .await?;
        decode(response).await
    }

    pub async fn commit(&self, session: ComparisonSession) -> Result<CommitReceipt> {
        let owner_id = session.owner_id;
        let response = self
            .client
            .post(self.url(&format!("/api/users/{}/sessions/commit", owner_id)))
            .json(&CommitSessionRequest { session })
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    tracing::debug!("API response status: {}", status);

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let text = response.text().await.unwrap_or_default();
    // 伺服器的 JSON 錯誤會帶 code, 其他代理回傳的純文字則沒有
    let (message, code) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.error, Some(body.code)),
        Err(_) if text.is_empty() => (status.to_string(), None),
        Err(_) => (text, None),
    };
    Err(RankError::RemoteError {
        status: status.as_u16(),
        code,
        message,
    })
}
