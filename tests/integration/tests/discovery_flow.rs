//! University selection and entity search.

use axum::http::StatusCode;

use proxy_discovery::EntityEntry;

use crate::common::{TestEnv, UNIVERSITY_ENTITY_ID};

fn entry(entity_id: &str, display_name: &str) -> EntityEntry {
    EntityEntry {
        entity_id: entity_id.to_string(),
        display_name: display_name.to_string(),
    }
}

#[tokio::test]
async fn discovery_page_renders_for_session() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;

    let response = env.get(&format!("/discovery?session={session_id}")).await?;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Select Your University"));
    assert!(response.body.contains(&session_id));
    assert!(response.body.contains("/static/discovery.js"));
    Ok(())
}

#[tokio::test]
async fn discovery_page_unknown_session_is_404() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/discovery?session=does-not-exist").await?;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body.contains("session not found"));
    Ok(())
}

#[tokio::test]
async fn selection_redirects_to_initiate() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;

    let response = env
        .post_form(
            "/discovery",
            &[
                ("session_id", session_id.as_str()),
                ("entity_id", UNIVERSITY_ENTITY_ID),
            ],
        )
        .await?;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location,
        Some(format!("/sp/initiate?session={session_id}"))
    );
    let session = env
        .state
        .sessions
        .get(&session_id)
        .ok_or_else(|| anyhow::anyhow!("session missing"))?;
    assert_eq!(
        session.selected_university.as_deref(),
        Some(UNIVERSITY_ENTITY_ID)
    );
    Ok(())
}

#[tokio::test]
async fn blank_selection_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;

    let response = env
        .post_form(
            "/discovery",
            &[("session_id", session_id.as_str()), ("entity_id", "  ")],
        )
        .await?;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn selection_for_unknown_session_is_404() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env
        .post_form(
            "/discovery",
            &[("session_id", "gone"), ("entity_id", UNIVERSITY_ENTITY_ID)],
        )
        .await?;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn search_on_empty_index_returns_empty_list() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/api/entities/search?q=state").await?;

    assert_eq!(response.status, StatusCode::OK);
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    assert!(results.is_empty());
    Ok(())
}

#[tokio::test]
async fn search_matches_display_names() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.state
        .federation_index
        .replace(vec![
            entry("https://idp.alpha.edu", "Alpha College"),
            entry("https://idp.state.edu", "State University"),
            entry("https://idp.tech.edu", "Tech University"),
        ])
        .await;

    let response = env.get("/api/entities/search?q=university").await?;
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    assert_eq!(
        results,
        vec![
            entry("https://idp.state.edu", "State University"),
            entry("https://idp.tech.edu", "Tech University"),
        ]
    );

    let response = env.get("/api/entities/search?q=nowhere").await?;
    assert_eq!(response.body, "[]");

    // A missing query matches everything.
    let response = env.get("/api/entities/search").await?;
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    assert_eq!(results.len(), 3);
    Ok(())
}

#[tokio::test]
async fn search_is_limited() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let entries = (0..50)
        .map(|i| entry(&format!("https://idp{i}.edu"), &format!("University {i:02}")))
        .collect();
    env.state.federation_index.replace(entries).await;

    let response = env.get("/api/entities/search?q=univ").await?;
    let results: Vec<EntityEntry> = serde_json::from_str(&response.body)?;
    assert_eq!(results.len(), proxy_discovery::SEARCH_RESULT_LIMIT);
    Ok(())
}

#[tokio::test]
async fn expired_session_is_404_on_discovery() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let session_id = env.start_session("_sp_req", None).await?;
    env.expire_session(&session_id)?;

    let page = env.get(&format!("/discovery?session={session_id}")).await?;
    assert_eq!(page.status, StatusCode::NOT_FOUND);

    let selection = env
        .post_form(
            "/discovery",
            &[("session_id", session_id.as_str()), ("entity_id", UNIVERSITY_ENTITY_ID)],
        )
        .await?;
    assert_eq!(selection.status, StatusCode::NOT_FOUND);
    Ok(())
}
