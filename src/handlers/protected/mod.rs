// handlers/protected/mod.rs - bearer token required
//
// Every router built from these handlers sits behind `jwt_auth_middleware`,
// so handlers read the principal with `Extension<AuthUser>` and never see an
// anonymous request. Level checks (`user.require`) and row checks
// (`ensure_access` / `ensure_mutate`) are done inside each handler.

pub mod archivos;
pub mod areas;
pub mod auth;
pub mod bitacoras;
pub mod board;
pub mod carteleras;
pub mod equipos;
pub mod force;
pub mod force_catalogos;
pub mod incidencias;
pub mod integrantes;
pub mod menus;
pub mod menus_usuarios;
pub mod minutas;
pub mod notificaciones;
pub mod old_bitacoras;
pub mod resumen;
pub mod reuniones;
pub mod tareas;
pub mod tipos_bitacora;
pub mod usuarios;
