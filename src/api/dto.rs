use crate::core::session::{ComparisonSession, Preference};
use crate::domain::model::ItemId;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_email, validate_max_length, validate_non_empty_string, Validate,
};
use serde::{Deserialize, Serialize};

const MAX_NAME_LENGTH: usize = 120;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_CODE_LENGTH: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("name", &self.name)?;
        validate_max_length("name", &self.name, MAX_NAME_LENGTH)?;
        validate_email("email", &self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub code: String,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("title", &self.title)?;
        validate_max_length("title", &self.title, MAX_TITLE_LENGTH)?;
        validate_non_empty_string("code", &self.code)?;
        validate_max_length("code", &self.code, MAX_CODE_LENGTH)
    }
}

/// Query for `GET next-comparison`. `left`/`right` are accepted for older clients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextComparisonQuery {
    #[serde(default, alias = "left")]
    pub low: Option<usize>,
    #[serde(default, alias = "right")]
    pub high: Option<usize>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub item_id: Option<ItemId>,
}

/// Query for `GET /api/courses`. `q` is accepted as a short form of `search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourseQuery {
    #[serde(default, alias = "q")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertRankingRequest {
    pub item_id: ItemId,
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub item_id: ItemId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub session: ComparisonSession,
    pub preference: Preference,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSessionRequest {
    pub session: ComparisonSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
