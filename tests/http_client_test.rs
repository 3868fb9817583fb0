use anyhow::Result;
use classi_rank::adapters::csv_export::rankings_to_csv_string;
use classi_rank::domain::model::{ItemId, OwnerId};
use classi_rank::{ComparisonSession, Preference, RankClient, RankError};
use httpmock::prelude::*;
use serde_json::json;

fn course_json(id: ItemId, code: &str, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "code": code,
        "title": title,
        "created_at": "2024-09-01T08:00:00Z"
    })
}

/// 測試建立使用者的請求與回應解析
#[tokio::test]
async fn test_create_user() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/users")
                .header("content-type", "application/json")
                .json_body(json!({ "name": "Test User", "email": "test@test.com" }));
            then.status(201).json_body(json!({
                "id": owner_id,
                "name": "Test User",
                "email": "test@test.com",
                "stats": { "total_rankings": 0, "achievement_count": 0 },
                "achievements": [],
                "ranked_count": 0,
                "version": 0,
                "created_at": "2024-09-01T08:00:00Z"
            }));
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let profile = client.create_user("Test User", "test@test.com").await?;

    mock.assert_async().await;
    assert_eq!(profile.id, owner_id);
    assert_eq!(profile.ranked_count, 0);
    Ok(())
}

/// 測試取得排名並匯出 CSV
#[tokio::test]
async fn test_rankings_export_to_csv() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();
    let (first, second) = (ItemId::new(), ItemId::new());

    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/users/{}/rankings", owner_id));
            then.status(200).json_body(json!([
                {
                    "rank": 0,
                    "course": course_json(first, "CS101", "Introduction to Computer Science")
                },
                { "rank": 1, "course": course_json(second, "MATH101", "Calculus I") }
            ]));
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let rankings = client.rankings(owner_id).await?;
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[1].course.id, second);

    let csv = rankings_to_csv_string(&rankings)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "rank,code,title,course_id");
    assert_eq!(lines[1], format!("0,CS101,Introduction to Computer Science,{}", first));
    assert_eq!(lines[2], format!("1,MATH101,Calculus I,{}", second));
    Ok(())
}

/// 測試 next-comparison 的查詢參數
#[tokio::test]
async fn test_next_comparison_sends_bounds() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();
    let existing = ItemId::new();

    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/api/users/{}/next-comparison", owner_id))
                .query_param("low", "0")
                .query_param("high", "3");
            then.status(200).json_body(json!({
                "done": false,
                "position": 1,
                "compare_against": course_json(existing, "B101", "Course B"),
                "low": 0,
                "high": 3,
                "version": 3
            }));
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let next = client.next_comparison(owner_id, 0, 3).await?;

    mock.assert_async().await;
    assert!(!next.done);
    assert_eq!(next.position, 1);
    assert_eq!(next.compare_against.map(|c| c.id), Some(existing));
    Ok(())
}

/// 測試回答時 session 原樣送回伺服器
#[tokio::test]
async fn test_answer_round_trips_session() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();
    let session = ComparisonSession::new(owner_id, ItemId::new(), 0, 0);
    let mut finished = session.clone();
    finished.comparisons = 1;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/api/users/{}/sessions/answer", owner_id))
                .json_body(json!({ "session": session, "preference": "existing" }));
            then.status(200).json_body(serde_json::to_value(&finished).unwrap());
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let returned = client.answer(session.clone(), Preference::Existing).await?;

    mock.assert_async().await;
    assert_eq!(returned, finished);
    Ok(())
}

/// 測試伺服器錯誤轉換為 RemoteError
#[tokio::test]
async fn test_error_responses_become_remote_errors() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();

    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/users/{}/sessions/commit", owner_id));
            then.status(409).json_body(json!({
                "error": "Ranking was modified concurrently (expected version 3, found 4)",
                "code": "VERSION_CONFLICT",
                "retryable": true
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/users/{}", owner_id));
            then.status(404).body("no such user");
        })
        .await;

    let client = RankClient::new(&server.base_url())?;

    let session = ComparisonSession::new(owner_id, ItemId::new(), 0, 3);
    let err = client.commit(session).await.unwrap_err();
    match &err {
        RankError::RemoteError { status, message, .. } => {
            assert_eq!(*status, 409);
            assert!(message.contains("expected version 3"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_retryable());
    assert_eq!(err.remote_code(), Some("VERSION_CONFLICT"));

    let err = client.user(owner_id).await.unwrap_err();
    assert!(matches!(
        err,
        RankError::RemoteError { status: 404, code: None, ref message } if message == "no such user"
    ));
    assert!(!err.is_retryable());
    assert_eq!(err.remote_code(), None);
    Ok(())
}

/// 測試同為 409 的錯誤可以由 code 區分
#[tokio::test]
async fn test_conflict_codes_are_kept_apart() -> Result<()> {
    let server = MockServer::start_async().await;
    let owner_id = OwnerId::new();

    server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/api/users/{}/sessions/answer", owner_id));
            then.status(409).json_body(json!({
                "error": "Comparison session is already complete",
                "code": "SESSION_COMPLETE",
                "retryable": false
            }));
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let session = ComparisonSession::new(owner_id, ItemId::new(), 0, 0);
    let err = client.answer(session, Preference::New).await.unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert_eq!(err.remote_code(), Some("SESSION_COMPLETE"));
    assert!(!err.is_retryable());
    Ok(())
}

/// 測試課程搜尋的查詢參數
#[tokio::test]
async fn test_search_courses_sends_query() -> Result<()> {
    let server = MockServer::start_async().await;
    let course = ItemId::new();

    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/courses").query_param("search", "calc");
            then.status(200)
                .json_body(json!([course_json(course, "MATH101", "Calculus I")]));
        })
        .await;

    let client = RankClient::new(&server.base_url())?;
    let courses = client.search_courses("calc").await?;

    mock.assert_async().await;
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].id, course);
    Ok(())
}

/// 測試無效的伺服器網址
#[test]
fn test_rejects_invalid_base_url() {
    assert!(RankClient::new("not a url").is_err());
    assert!(RankClient::new("").is_err());
}
