mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    let server = common::spawn_server().await?;

    for path in ["/bitacoras", "/usuarios", "/menus/user", "/resumen-sistema/usuarios/total"] {
        let res = server.client.get(server.api(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);

        let body = common::json_body(res).await?;
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn rejects_malformed_and_forged_tokens() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .get(server.api("/auth/profile"))
        .header("Authorization", "Token abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .client
        .get(server.api("/auth/profile"))
        .bearer_auth("not.a.jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let claims = bitacora_api::auth::Claims::new("ana".into(), "Ana".into(), 1, None, 1);
    let forged = bitacora_api::auth::generate_jwt(&claims, "some-other-secret")?;
    let res = server
        .client
        .get(server.api("/auth/profile"))
        .bearer_auth(forged)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn login_validates_body_before_querying() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .post(server.api("/auth/login"))
        .json(&json!({ "login": "ana" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = common::json_body(res).await?;
    assert!(body["message"].as_str().unwrap().contains("password"));

    let res = server
        .client
        .post(server.api("/auth/login"))
        .json(&json!({ "login": "ana", "password": "secreto1", "rol": "admin" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::json_body(res).await?["code"], "INVALID_JSON");

    let res = server
        .client
        .post(server.api("/auth/login"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn change_password_enforces_minimum_length() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .put(server.api("/auth/change-password"))
        .bearer_auth(common::token("ana", 4, Some(1)))
        .json(&json!({ "currentPassword": "viejo123", "newPassword": "abc" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
