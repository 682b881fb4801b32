use axum::{
    response::{IntoResponse, Json, Response},
};

use crate::error::ErrorDetails;

/// Development-only response mapper: swaps a database error body for the variant
/// carrying the driver message.
pub async fn expose_error_details(mut response: Response) -> Response {
    match response.extensions_mut().remove::<ErrorDetails>() {
        Some(ErrorDetails(body)) => (response.status(), Json(body)).into_response(),
        None => response,
    }
}
