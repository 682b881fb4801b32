mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

const OPERATOR: i32 = 4;

#[tokio::test]
async fn level_checks_run_before_any_query() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = common::token("oper", OPERATOR, Some(2));

    let cases = [
        (reqwest::Method::GET, "/menus", None),
        (reqwest::Method::GET, "/menus-usuarios", None),
        (reqwest::Method::GET, "/usuarios", None),
        (reqwest::Method::POST, "/areas", Some(json!({ "nombrearea": "Calderas" }))),
        (reqwest::Method::POST, "/sistemas-force", Some(json!({ "descripcion": "DCS" }))),
    ];
    for (method, path, body) in cases {
        let mut req = server.client.request(method.clone(), server.api(path)).bearer_auth(&token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{} {}", method, path);
        assert_eq!(common::json_body(res).await?["code"], "FORBIDDEN");
    }
    Ok(())
}

#[tokio::test]
async fn malformed_path_params_are_bad_requests() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = common::token("admin", 1, None);

    let res = server
        .client
        .get(server.api("/bitacoras/abc"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .client
        .get(server.api("/old-bitacoras/2024-13-40/10:00:00"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(common::json_body(res).await?["message"]
        .as_str()
        .unwrap()
        .contains("Fecha"));
    Ok(())
}

#[tokio::test]
async fn meeting_notification_is_accepted_and_queued() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = common::token("ana", OPERATOR, Some(1));

    let res = server
        .client
        .post(server.api("/notificaciones/reunion"))
        .bearer_auth(&token)
        .json(&json!({
            "reunionId": 7,
            "subject": "Reunión de seguridad",
            "recipients": ["jefe@planta.local"],
            "content": { "tema": "Seguridad", "fecha": "2025-06-10", "hora": "09:00" }
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body = common::json_body(res).await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["message"].as_str().is_some());

    let res = server
        .client
        .post(server.api("/notificaciones/reunion"))
        .bearer_auth(&token)
        .json(&json!({ "subject": "Sin destinatarios", "recipients": [] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_body_fields_are_rejected() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server
        .client
        .put(server.api("/auth/change-password"))
        .bearer_auth(common::token("ana", OPERATOR, Some(1)))
        .json(&json!({ "currentPassword": "a", "newPassword": "b", "login": "otro" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
