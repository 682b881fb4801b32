use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims};
use crate::error::ApiError;
use crate::policy::Level;
use crate::state::AppState;

/// Authenticated principal extracted from the bearer token
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub login: String,
    pub nombres: String,
    pub nivel: i32,
    pub fkarea: Option<i32>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            login: claims.login,
            nombres: claims.nombres,
            nivel: claims.nivel,
            fkarea: claims.fkarea,
        }
    }
}

impl AuthUser {
    /// Lower `nivel` means more privilege; a principal holds every level at or above its own.
    pub fn has_level(&self, level: Level) -> bool {
        self.nivel <= level.0
    }

    /// Fail with 403 unless the principal holds `level`.
    pub fn require(&self, level: Level) -> Result<(), ApiError> {
        if self.has_level(level) {
            Ok(())
        } else {
            tracing::warn!(login = %self.login, nivel = self.nivel, required = level.0, "insufficient level");
            Err(ApiError::forbidden("Acceso denegado. Nivel insuficiente."))
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts the principal
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token, state.jwt_secret())?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Token no proporcionado".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Formato de token inválido".to_string())?;

    let mut parts = auth_str.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token.to_string()),
        _ => Err("Formato de token inválido".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(extract_jwt_from_headers(&headers("bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        assert!(extract_jwt_from_headers(&HeaderMap::new()).is_err());
        assert!(extract_jwt_from_headers(&headers("Basic abc")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer a b")).is_err());
    }

    #[test]
    fn levels_follow_lower_is_stronger() {
        let admin = AuthUser { login: "root".into(), nombres: "Root".into(), nivel: 1, fkarea: None };
        let operator = AuthUser { login: "op".into(), nombres: "Op".into(), nivel: 5, fkarea: Some(10) };
        assert!(admin.has_level(Level::SYSTEM));
        assert!(admin.has_level(Level::SUPERVISOR));
        assert!(!operator.has_level(Level::SUPERVISOR));
        assert_eq!(operator.require(Level::MANAGER).unwrap_err().status_code(), 403);
    }
}
