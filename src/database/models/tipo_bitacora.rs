use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TipoBitacora {
    pub idtipo: i32,
    pub descripciontipo: String,
}
