use crate::api::dto::{
    AnswerRequest, CommitSessionRequest, CourseQuery, CreateCourseRequest, CreateUserRequest,
    HealthResponse, InsertRankingRequest, NextComparisonQuery, StartSessionRequest,
};
use crate::api::AppState;
use crate::core::engine::{CommitReceipt, NextComparison, OwnerProfile, RankedCourse};
use crate::core::session::ComparisonSession;
use crate::domain::model::{Course, ItemId, OwnerId};
use crate::utils::error::RankError;
use crate::utils::validation::Validate;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use axum::{extract::State, http::StatusCode, Json};

type ApiResult<T> = Result<T, RankError>;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<OwnerProfile>)> {
    body.validate()?;
    let profile = state.engine.create_owner(&body.name, &body.email).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// GET /api/users/{owner_id}
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
) -> ApiResult<Json<OwnerProfile>> {
    Ok(Json(state.engine.owner_profile(owner_id).await?))
}

/// GET /api/users/{owner_id}/rankings
pub async fn get_rankings(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
) -> ApiResult<Json<Vec<RankedCourse>>> {
    Ok(Json(state.engine.rankings(owner_id).await?))
}

/// DELETE /api/users/{owner_id}/rankings/{item_id}
pub async fn remove_ranking(
    State(state): State<AppState>,
    ApiPath((owner_id, item_id)): ApiPath<(OwnerId, ItemId)>,
) -> ApiResult<Json<OwnerProfile>> {
    Ok(Json(state.engine.remove_ranking(owner_id, item_id).await?))
}

/// GET /api/users/{owner_id}/next-comparison?low=&high=
pub async fn next_comparison(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
    ApiQuery(query): ApiQuery<NextComparisonQuery>,
) -> ApiResult<Json<NextComparison>> {
    let next = state
        .engine
        .next_comparison(owner_id, query.low, query.high, query.version, query.item_id)
        .await?;
    Ok(Json(next))
}

/// POST /api/users/{owner_id}/insert-ranking
pub async fn insert_ranking(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
    ApiJson(body): ApiJson<InsertRankingRequest>,
) -> ApiResult<Json<CommitReceipt>> {
    let receipt = state
        .engine
        .insert_ranking(owner_id, body.item_id, body.position, body.expected_version)
        .await?;
    Ok(Json(receipt))
}

/// POST /api/users/{owner_id}/sessions
pub async fn start_session(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
    ApiJson(body): ApiJson<StartSessionRequest>,
) -> ApiResult<(StatusCode, Json<ComparisonSession>)> {
    let session = state.engine.start_session(owner_id, body.item_id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/users/{owner_id}/sessions/answer
pub async fn answer_session(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
    ApiJson(body): ApiJson<AnswerRequest>,
) -> ApiResult<Json<ComparisonSession>> {
    let session = state
        .engine
        .answer(owner_id, body.session, body.preference)
        .await?;
    Ok(Json(session))
}

/// POST /api/users/{owner_id}/sessions/commit
pub async fn commit_session(
    State(state): State<AppState>,
    ApiPath(owner_id): ApiPath<OwnerId>,
    ApiJson(body): ApiJson<CommitSessionRequest>,
) -> ApiResult<Json<CommitReceipt>> {
    Ok(Json(state.engine.commit_session(owner_id, &body.session).await?))
}

/// GET /api/courses?search=
pub async fn list_courses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CourseQuery>,
) -> ApiResult<Json<Vec<Course>>> {
    let courses = match query.search {
        Some(search) => state.engine.search_courses(&search).await?,
        None => state.engine.list_courses().await?,
    };
    Ok(Json(courses))
}

/// POST /api/courses
pub async fn create_course(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    body.validate()?;
    let course = state.engine.create_course(&body.title, &body.code).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// GET /api/courses/{course_id}
pub async fn get_course(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<ItemId>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.engine.get_course(item_id).await?))
}

/// DELETE /api/courses/{course_id}
pub async fn delete_course(
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<ItemId>,
) -> ApiResult<Json<Course>> {
    Ok(Json(state.engine.delete_course(item_id).await?))
}
