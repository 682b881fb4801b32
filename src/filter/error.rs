use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Columna de ordenamiento no permitida: {0}")]
    InvalidOrderColumn(String),

    #[error("Dirección de ordenamiento inválida: {0}")]
    InvalidOrderDirection(String),

    #[error("Límite inválido: {0}")]
    InvalidLimit(String),
}
