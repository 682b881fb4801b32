mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn root_describes_the_api() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.get(server.url("/")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = common::json_body(res).await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Bitácora API");
    assert!(body["data"]["endpoints"]["public"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "/api-bitacora/auth/login"));
    Ok(())
}

#[tokio::test]
async fn health_reports_unreachable_database() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = common::json_body(res).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["database"], "unavailable");
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_404_without_auth_check() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.get(server.api("/no-existe")).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn development_cors_is_permissive() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .request(reqwest::Method::OPTIONS, server.api("/bitacoras"))
        .header("Origin", "http://frontend.local")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await?;

    assert!(res.status().is_success(), "preflight failed: {}", res.status());
    assert!(res.headers().contains_key("access-control-allow-origin"));
    Ok(())
}

#[tokio::test]
async fn production_cors_only_allows_listed_origins() -> Result<()> {
    let config = common::test_config(&[
        ("APP_ENV", "production"),
        ("CORS_ORIGINS", "http://planta.local"),
    ])?;
    let server = common::spawn_with(config).await?;

    let allowed = server
        .client
        .get(server.url("/"))
        .header("Origin", "http://planta.local")
        .send()
        .await?;
    assert_eq!(
        allowed.headers().get("access-control-allow-origin").unwrap(),
        "http://planta.local"
    );

    let denied = server
        .client
        .get(server.url("/"))
        .header("Origin", "http://otro.local")
        .send()
        .await?;
    assert!(!denied.headers().contains_key("access-control-allow-origin"));
    Ok(())
}

#[tokio::test]
async fn router_answers_without_a_listener() -> Result<()> {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let config = common::test_config(&[])?;
    let db = bitacora_api::database::Database::connect_lazy(&config.database);
    let state = bitacora_api::state::AppState::new(config, db, std::sync::Arc::new(bitacora_api::services::LogMailer));
    let app = bitacora_api::app(state);

    let res = app
        .oneshot(Request::builder().uri(format!("{}/bitacoras", bitacora_api::API_PREFIX)).body(Body::empty())?)
        .await?;
    assert_eq!(res.status(), axum::http::StatusCode::UNAUTHORIZED);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}
