use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

/// Extensions served by the public image gallery.
pub const PUBLIC_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Archivo {
    pub idarchivo: i32,
    pub fkbitacora: i32,
    pub nombre_archivo: String,
    #[serde(skip_serializing)]
    pub ruta_archivo: String,
    pub tipo_archivo: String,
    pub tamano: i64,
    pub login_carga: String,
    pub descripcion: Option<String>,
    pub fecha_carga: NaiveDateTime,
    pub activo: bool,
}

/// Public attachment joined with its bitácora.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ImagenPublica {
    pub idarchivo: i32,
    pub fkbitacora: i32,
    pub nombre_archivo: String,
    #[serde(skip_serializing)]
    pub ruta_archivo: String,
    pub tipo_archivo: String,
    pub tamano: i64,
    pub descripcion: Option<String>,
    pub fecha_carga: NaiveDateTime,
    pub tema: String,
    pub fecha_bitacora: chrono::NaiveDate,
    #[sqlx(skip)]
    pub url_imagen: String,
}

pub const IMAGEN_PUBLICA_SELECT: &str = "f.idarchivo, f.fkbitacora, f.nombre_archivo, f.ruta_archivo, \
    f.tipo_archivo, f.tamano, f.descripcion, f.fecha_carga, b.tema, b.fecha AS fecha_bitacora";

pub const IMAGEN_PUBLICA_FROM: &str = "archivos f INNER JOIN bitacora b ON b.idbitacora = f.fkbitacora";

/// WHERE clause selecting active image attachments of public, non-INACTIVO logs.
pub fn public_image_condition() -> String {
    let patterns: Vec<String> = PUBLIC_IMAGE_EXTENSIONS
        .iter()
        .map(|ext| format!("LOWER(f.nombre_archivo) LIKE '%.{}'", ext))
        .collect();
    format!(
        "b.publico = 1 AND b.estatus <> 'INACTIVO' AND f.activo = 1 AND ({})",
        patterns.join(" OR ")
    )
}

pub fn is_public_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| PUBLIC_IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_public_image_name("foto.JPG"));
        assert!(is_public_image_name("plano.v2.png"));
        assert!(!is_public_image_name("reporte.pdf"));
        assert!(!is_public_image_name("sin_extension"));
    }

    #[test]
    fn condition_lists_every_extension() {
        let sql = public_image_condition();
        assert!(sql.starts_with("b.publico = 1 AND b.estatus <> 'INACTIVO' AND f.activo = 1"));
        assert!(sql.contains("LIKE '%.jpeg'"));
    }
}
