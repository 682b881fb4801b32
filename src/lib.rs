pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod services;
pub mod state;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::handlers::{protected, public};
use crate::middleware::{expose_error_details, jwt_auth_middleware};
use crate::state::AppState;

/// Prefix every resource is mounted under.
pub const API_PREFIX: &str = "/api-bitacora";

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/auth/login", post(public::auth::login))
        .route("/carteleras/active/:limit/:offset", get(public::carteleras::active))
        .nest("/archivos-publicos", archivos_publicos_routes());

    let protected_api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/areas", areas_routes())
        .nest("/usuarios", usuarios_routes())
        .nest("/bitacoras", bitacoras_routes())
        .nest("/archivos", archivos_routes(state.config.server.max_upload_bytes))
        .nest("/equipos", equipos_routes())
        .nest("/tiposbitacoras", tipos_bitacora_routes())
        .nest("/reuniones", reuniones_routes())
        .nest("/minutas", minutas_routes())
        .nest("/integrantes-reunion", integrantes_routes())
        .nest("/carteleras", carteleras_routes())
        .nest("/incidencias", incidencias_routes())
        .nest("/tareas", tareas_routes())
        .nest("/force", force_routes())
        .nest("/sistemas-force", catalog_routes::<protected::force_catalogos::Sistemas>())
        .nest("/senales-force", catalog_routes::<protected::force_catalogos::Senales>())
        .nest("/menus", menus_routes())
        .nest("/menus-usuarios", menus_usuarios_routes())
        .nest("/old-bitacoras", old_bitacoras_routes())
        .nest("/notificaciones", notificaciones_routes())
        .nest("/resumen-sistema", resumen_routes())
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest(API_PREFIX, public_api.merge(protected_api));

    if state.config.environment.exposes_error_details() {
        router = router.layer(axum::middleware::map_response(expose_error_details));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}

/// Permissive in development or when no origins are configured.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if config.environment == Environment::Development || origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/change-password", put(auth::change_password))
        .route("/profile", get(auth::profile))
}

fn areas_routes() -> Router<AppState> {
    use protected::areas;

    Router::new()
        .route("/", get(areas::list).post(areas::create))
        .route("/:id", get(areas::show).put(areas::update).delete(areas::remove))
}

fn usuarios_routes() -> Router<AppState> {
    use protected::usuarios;

    Router::new()
        .route("/", get(usuarios::list).post(usuarios::create))
        .route("/profile/update", put(usuarios::update_profile))
        .route(
            "/:login",
            get(usuarios::show).put(usuarios::update).delete(usuarios::remove),
        )
}

fn bitacoras_routes() -> Router<AppState> {
    use protected::bitacoras;

    Router::new()
        .route("/", get(bitacoras::list).post(bitacoras::create))
        .route("/search", get(bitacoras::list))
        .route(
            "/:id",
            get(bitacoras::show).put(bitacoras::update).delete(bitacoras::remove),
        )
        .route("/:id/estatus", patch(bitacoras::update_status))
        .route(
            "/:id/cartelera",
            post(bitacoras::board_on).delete(bitacoras::board_off),
        )
}

fn archivos_routes(max_upload_bytes: usize) -> Router<AppState> {
    use protected::archivos;

    Router::new()
        .route(
            "/:bitacora_id",
            get(archivos::list)
                .post(archivos::upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route(
            "/:bitacora_id/:archivo_id",
            get(archivos::download).delete(archivos::remove),
        )
}

fn archivos_publicos_routes() -> Router<AppState> {
    use public::archivos;

    Router::new()
        .route("/imagenes", get(archivos::list))
        .route("/imagenes/:archivo_id", get(archivos::show))
}

fn equipos_routes() -> Router<AppState> {
    use protected::equipos;

    Router::new()
        .route("/", get(equipos::list).post(equipos::create))
        .route("/area/:id", get(equipos::by_area))
        .route("/:id", get(equipos::show).put(equipos::update).delete(equipos::remove))
}

fn tipos_bitacora_routes() -> Router<AppState> {
    Router::new().route("/", get(protected::tipos_bitacora::list))
}

fn reuniones_routes() -> Router<AppState> {
    use protected::reuniones;

    Router::new()
        .route("/", get(reuniones::list).post(reuniones::create))
        .route("/search", get(reuniones::search))
        .route("/area/:id", get(reuniones::by_area))
        .route(
            "/:id",
            get(reuniones::show).put(reuniones::update).delete(reuniones::remove),
        )
}

fn minutas_routes() -> Router<AppState> {
    use protected::minutas;

    Router::new()
        .route("/", get(minutas::list).post(minutas::create))
        .route("/reunion/:id", get(minutas::by_reunion))
        .route("/:id", get(minutas::show).put(minutas::update).delete(minutas::remove))
}

fn integrantes_routes() -> Router<AppState> {
    use protected::integrantes;

    Router::new()
        .route("/", get(integrantes::list).post(integrantes::create))
        .route("/bulk", post(integrantes::bulk))
        .route("/reunion/:id", get(integrantes::by_reunion))
        .route(
            "/:id",
            get(integrantes::show).put(integrantes::update).delete(integrantes::remove),
        )
        .route("/:id/asistencia", put(integrantes::asistencia))
}

fn carteleras_routes() -> Router<AppState> {
    use protected::carteleras;

    Router::new()
        .route("/", get(carteleras::list).post(carteleras::create))
        .route("/search", get(carteleras::list))
        .route("/area/:id", get(carteleras::by_area))
        .route(
            "/:id",
            get(carteleras::show).put(carteleras::update).delete(carteleras::remove),
        )
        .route("/:id/estatus", patch(carteleras::update_status))
}

fn incidencias_routes() -> Router<AppState> {
    use protected::incidencias;

    Router::new()
        .route("/", get(incidencias::list).post(incidencias::create))
        .route("/:id", get(incidencias::show).put(incidencias::update))
        .route("/:id/status", patch(incidencias::update_status))
        .route(
            "/:id/cartelera",
            post(incidencias::board_on).delete(incidencias::board_off),
        )
}

fn tareas_routes() -> Router<AppState> {
    use protected::tareas;

    Router::new()
        .route("/", get(tareas::list).post(tareas::create))
        .route("/:id", get(tareas::show).put(tareas::update))
        .route("/:id/status", patch(tareas::update_status))
        .route(
            "/:id/detalles",
            get(tareas::list_detalles).post(tareas::create_detalle),
        )
        .route(
            "/detalles/:id",
            get(tareas::show_detalle).put(tareas::update_detalle),
        )
        .route("/detalles/:id/status", patch(tareas::update_detalle_status))
}

fn force_routes() -> Router<AppState> {
    use protected::force;

    Router::new()
        .route("/", get(force::list).post(force::create))
        .route("/search", get(force::list))
        .route("/sistema/:id", get(force::by_sistema))
        .route("/senal/:id", get(force::by_senal))
        .route("/:id", get(force::show).put(force::update).delete(force::remove))
        .route("/:id/estatus", patch(force::update_status))
}

fn catalog_routes<C: protected::force_catalogos::Catalog>() -> Router<AppState> {
    use protected::force_catalogos as catalog;

    Router::new()
        .route("/", get(catalog::list::<C>).post(catalog::create::<C>))
        .route("/search", get(catalog::list::<C>))
        .route(
            "/:id",
            get(catalog::show::<C>)
                .put(catalog::update::<C>)
                .delete(catalog::remove::<C>),
        )
}

fn menus_routes() -> Router<AppState> {
    use protected::menus;

    Router::new()
        .route("/", get(menus::list).post(menus::create))
        .route("/user", get(menus::user_tree))
        .route("/tree", get(menus::tree))
        .route("/parent/:parent_id/:user", get(menus::by_parent))
        .route("/:id", get(menus::show).put(menus::update).delete(menus::remove))
        .route("/:id/estatus", patch(menus::update_status))
}

fn menus_usuarios_routes() -> Router<AppState> {
    use protected::menus_usuarios as grants;

    Router::new()
        .route("/", get(grants::list).post(grants::create))
        .route("/my-menus", get(grants::my_menus))
        .route("/menu/:idmenu", get(grants::by_menu))
        .route("/menu/:idmenu/:login", get(grants::show))
        .route("/usuario/:login", get(grants::by_usuario))
        .route("/usuario/:login/details", get(grants::usuario_details))
        // `:key` is the login for bulk-assign and the menu id for the others
        .route("/:key/bulk-assign", post(grants::bulk_assign))
        .route("/:key/:login", put(grants::update).delete(grants::remove))
}

fn old_bitacoras_routes() -> Router<AppState> {
    use protected::old_bitacoras;

    Router::new()
        .route("/", get(old_bitacoras::list))
        .route("/catalogos", get(old_bitacoras::catalogos))
        .route("/:fecha/:hora", get(old_bitacoras::show))
}

fn notificaciones_routes() -> Router<AppState> {
    Router::new().route("/reunion", post(protected::notificaciones::reunion))
}

fn resumen_routes() -> Router<AppState> {
    use protected::resumen;

    Router::new()
        .route("/usuarios/total", get(resumen::total_usuarios))
        .route("/usuarios/actividad", get(resumen::actividad_usuarios))
        .route("/reuniones/pendientes", get(resumen::reuniones_pendientes))
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Bitácora API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Plant operations logbook backend",
            "endpoints": {
                "health": "/health",
                "public": [
                    "/api-bitacora/auth/login",
                    "/api-bitacora/carteleras/active/:limit/:offset",
                    "/api-bitacora/archivos-publicos/imagenes[/:archivo_id]"
                ],
                "protected": [
                    "/api-bitacora/auth", "/api-bitacora/areas", "/api-bitacora/usuarios",
                    "/api-bitacora/bitacoras", "/api-bitacora/archivos", "/api-bitacora/equipos",
                    "/api-bitacora/tiposbitacoras", "/api-bitacora/reuniones", "/api-bitacora/minutas",
                    "/api-bitacora/integrantes-reunion", "/api-bitacora/carteleras",
                    "/api-bitacora/incidencias", "/api-bitacora/tareas", "/api-bitacora/force",
                    "/api-bitacora/sistemas-force", "/api-bitacora/senales-force", "/api-bitacora/menus",
                    "/api-bitacora/menus-usuarios", "/api-bitacora/old-bitacoras",
                    "/api-bitacora/notificaciones", "/api-bitacora/resumen-sistema"
                ]
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": "unavailable"
                    }
                })),
            )
        }
    }
}
