//! Store-backed flows. These run against the database in `DATABASE_URL`
//! and return early when it is unset.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use sqlx::MySqlPool;

const ADMIN: i32 = 1;
const OPERATOR: i32 = 5;

async fn bulletins_for(pool: &MySqlPool, idbitacora: i32) -> Result<i64> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM carteleras WHERE fkbitacora = ?")
        .bind(idbitacora)
        .fetch_one(pool)
        .await?)
}

async fn en_cartelera(pool: &MySqlPool, idbitacora: i32) -> Result<bool> {
    Ok(sqlx::query_scalar::<_, bool>("SELECT en_cartelera FROM bitacora WHERE idbitacora = ?")
        .bind(idbitacora)
        .fetch_one(pool)
        .await?)
}

#[tokio::test]
async fn board_toggle_keeps_one_bulletin_per_entry() -> Result<()> {
    let Some((server, pool)) = common::spawn_live().await? else {
        return Ok(());
    };
    let area = common::seed_area(&pool, &common::unique("Turbinas ")).await?;
    let login = common::unique("op");
    common::seed_user(&pool, &login, OPERATOR, Some(area)).await?;
    let id = common::seed_bitacora(&pool, &login, area).await?;
    let token = common::token(&login, OPERATOR, Some(area));
    let board = server.api(&format!("/bitacoras/{}/cartelera", id));

    for _ in 0..2 {
        let res = server.client.post(&board).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(common::json_body(res).await?["data"]["en_cartelera"], true);
    }
    assert_eq!(bulletins_for(&pool, id).await?, 1);
    assert!(en_cartelera(&pool, id).await?);

    let starts_today: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM carteleras WHERE fkbitacora = ? \
         AND fecha_inicio_publicacion = CURDATE() \
         AND fecha_fin_publicacion = DATE_ADD(CURDATE(), INTERVAL 30 DAY)",
    )
    .bind(id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(starts_today, 1, "derived window follows the database date");

    for (method, expected) in [
        (reqwest::Method::DELETE, false),
        (reqwest::Method::POST, true),
        (reqwest::Method::DELETE, false),
    ] {
        let res = server
            .client
            .request(method, &board)
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(common::json_body(res).await?["data"]["en_cartelera"], expected);
    }
    assert_eq!(bulletins_for(&pool, id).await?, 0);
    assert!(!en_cartelera(&pool, id).await?);
    Ok(())
}

#[tokio::test]
async fn private_entry_is_visible_to_owner_and_admin_only() -> Result<()> {
    let Some((server, pool)) = common::spawn_live().await? else {
        return Ok(());
    };
    let home = common::seed_area(&pool, &common::unique("Calderas ")).await?;
    let other = common::seed_area(&pool, &common::unique("Patio ")).await?;
    let owner = common::unique("a");
    common::seed_user(&pool, &owner, OPERATOR, Some(home)).await?;
    let id = common::seed_bitacora(&pool, &owner, home).await?;
    let url = server.api(&format!("/bitacoras/{}", id));

    let readers = [
        (common::token(&owner, OPERATOR, Some(home)), StatusCode::OK),
        (common::token("b", OPERATOR, Some(other)), StatusCode::FORBIDDEN),
        (common::token("c", ADMIN, None), StatusCode::OK),
    ];
    for (token, expected) in readers {
        let res = server.client.get(&url).bearer_auth(&token).send().await?;
        assert_eq!(res.status(), expected);
    }
    Ok(())
}

#[tokio::test]
async fn referenced_force_system_cannot_be_deleted() -> Result<()> {
    let Some((server, pool)) = common::spawn_live().await? else {
        return Ok(());
    };
    let admin = common::token("root", ADMIN, None);

    let mut ids = Vec::new();
    for name in ["DCS", "SIS"] {
        let result = sqlx::query("INSERT INTO sistemas_force (descripcion) VALUES (?)")
            .bind(common::unique(name))
            .execute(&pool)
            .await?;
        ids.push(i32::try_from(result.last_insert_id())?);
    }
    let (used, unused) = (ids[0], ids[1]);
    sqlx::query("INSERT INTO `force` (fksistema, causas, login_registrado) VALUES (?, 'Mantenimiento de lazo', 'root')")
        .bind(used)
        .execute(&pool)
        .await?;

    let res = server
        .client
        .delete(server.api(&format!("/sistemas-force/{}", used)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(common::json_body(res).await?["code"], "CONFLICT");

    let res = server
        .client
        .delete(server.api(&format!("/sistemas-force/{}", unused)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sistemas_force WHERE idsistema IN (?, ?)")
        .bind(used)
        .bind(unused)
        .fetch_one(&pool)
        .await?;
    assert_eq!(remaining, 1);
    Ok(())
}

#[tokio::test]
async fn rejected_menu_writes_leave_the_tree_alone() -> Result<()> {
    let Some((server, pool)) = common::spawn_live().await? else {
        return Ok(());
    };
    let admin = common::token("root", ADMIN, None);

    let parent = sqlx::query("INSERT INTO menus (name) VALUES (?)")
        .bind(common::unique("Operaciones "))
        .execute(&pool)
        .await?
        .last_insert_id();
    let parent = i32::try_from(parent)?;
    let child = sqlx::query("INSERT INTO menus (idpadre, name) VALUES (?, ?)")
        .bind(parent)
        .bind(common::unique("Bitácoras "))
        .execute(&pool)
        .await?
        .last_insert_id();
    let child = i32::try_from(child)?;

    let res = server
        .client
        .put(server.api(&format!("/menus/{}", parent)))
        .bearer_auth(&admin)
        .json(&json!({ "idpadre": child }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let idpadre: Option<i32> = sqlx::query_scalar("SELECT idpadre FROM menus WHERE idmenu = ?")
        .bind(parent)
        .fetch_one(&pool)
        .await?;
    assert_eq!(idpadre, None);

    let res = server
        .client
        .delete(server.api(&format!("/menus/{}", parent)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .client
        .delete(server.api(&format!("/menus/{}", child)))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menus WHERE idmenu IN (?, ?)")
        .bind(parent)
        .bind(child)
        .fetch_one(&pool)
        .await?;
    assert_eq!(left, 1);
    Ok(())
}
