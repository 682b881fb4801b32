// handlers/protected/notificaciones.rs - /api-bitacora/notificaciones

use axum::extract::{Extension, State};
use serde_json::Value;
use tracing::{error, info};

use crate::middleware::{message, ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::mailer::ReunionNotificacion;
use crate::state::AppState;

/// POST /reunion - validates, queues the mail and answers 202 right away.
pub async fn reunion(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(body): ApiJson<ReunionNotificacion>,
) -> ApiResult<Value> {
    let reunion_id = body.reunion_id;
    let mail = body.into_message()?;
    let recipients = mail.to.len();

    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send(mail).await {
            error!(reunion = ?reunion_id, error = %e, "meeting notification failed");
        }
    });

    info!(reunion = ?reunion_id, recipients, login = %user.login, "meeting notification queued");
    Ok(ApiResponse::accepted(message("Notificación en proceso de envío")))
}
