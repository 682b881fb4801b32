// handlers/protected/board.rs - shared on/off board toggle for bitácoras and incidencias
//
// The origin row is locked, the derived bulletin is inserted or deleted, and the
// origin's `en_cartelera` flag follows, all inside one transaction.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::database::models::cartelera::DerivedBulletin;
use crate::database::query_builder::{execute_on, fetch_count_on};
use crate::database::IntoRecord;
use crate::error::ApiError;
use crate::filter::SqlResult;
use crate::policy::board::plan_toggle;
use crate::state::AppState;

/// Record a bulletin can be derived from.
#[derive(Debug, Clone, Copy)]
pub enum Origin {
    Bitacora(i32),
    Incidencia(i32),
}

impl Origin {
    fn table(&self) -> &'static str {
        match self {
            Origin::Bitacora(_) => "bitacora",
            Origin::Incidencia(_) => "incidencias",
        }
    }

    fn id_column(&self) -> &'static str {
        match self {
            Origin::Bitacora(_) => "idbitacora",
            Origin::Incidencia(_) => "idincidencia",
        }
    }

    /// Column in `carteleras` pointing back at the origin.
    fn link_column(&self) -> &'static str {
        match self {
            Origin::Bitacora(_) => "fkbitacora",
            Origin::Incidencia(_) => "fkincidencia",
        }
    }

    fn id(&self) -> i32 {
        match self {
            Origin::Bitacora(id) | Origin::Incidencia(id) => *id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BoardState {
    pub en_cartelera: bool,
    pub message: &'static str,
}

/// Bring `origin` to the requested board state. Repeating a request is a no-op.
pub async fn set_on_board(
    state: &AppState,
    origin: Origin,
    bulletin: DerivedBulletin,
    want_on: bool,
) -> Result<BoardState, ApiError> {
    let id = origin.id();
    let mut tx = state.db.begin().await?;

    let on_board: Option<bool> = sqlx::query_scalar(&format!(
        "SELECT en_cartelera FROM `{}` WHERE {} = ? FOR UPDATE",
        origin.table(),
        origin.id_column()
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let on_board = on_board.ok_or_else(|| ApiError::not_found("Registro no encontrado"))?;

    let existing = SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM carteleras WHERE {} = ?", origin.link_column()),
        params: vec![json!(id)],
    };
    let bulletin_exists = fetch_count_on(&mut tx, &existing).await? > 0;

    let plan = plan_toggle(on_board, bulletin_exists, want_on);
    if plan.insert_bulletin {
        let mut record = bulletin.into_record();
        record.set(origin.link_column(), id).set_now("fecha_registrado");
        execute_on(&mut tx, &record.insert_sql("carteleras")).await?;
    }
    if plan.delete_bulletin {
        let delete = SqlResult {
            query: format!("DELETE FROM carteleras WHERE {} = ?", origin.link_column()),
            params: vec![json!(id)],
        };
        execute_on(&mut tx, &delete).await?;
    }
    if let Some(flag) = plan.set_flag {
        let update = SqlResult {
            query: format!(
                "UPDATE `{}` SET en_cartelera = ? WHERE {} = ?",
                origin.table(),
                origin.id_column()
            ),
            params: vec![json!(flag), json!(id)],
        };
        execute_on(&mut tx, &update).await?;
    }
    tx.commit().await?;

    if !plan.is_noop() {
        info!(origin = ?origin, on = want_on, "board state changed");
    }

    Ok(BoardState {
        en_cartelera: want_on,
        message: if want_on {
            "Registro publicado en cartelera exitosamente"
        } else {
            "Registro quitado de cartelera exitosamente"
        },
    })
}
