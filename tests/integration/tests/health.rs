//! Health endpoints.

use axum::http::StatusCode;

use crate::common::TestEnv;

#[tokio::test]
async fn health_reports_version() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let response = env.get("/health").await?;

    assert_eq!(response.status, StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&response.body)?;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
    Ok(())
}

#[tokio::test]
async fn liveness_and_readiness() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    assert_eq!(env.get("/health/live").await?.status, StatusCode::OK);
    assert_eq!(
        env.get("/health/ready").await?.status,
        StatusCode::SERVICE_UNAVAILABLE
    );

    env.state.federation_index.replace(Vec::new()).await;
    assert_eq!(env.get("/health/ready").await?.status, StatusCode::OK);
    Ok(())
}
