//! Row types (`FromRow`) and allow-listed request bodies for every table.
//!
//! Request bodies are `#[serde(deny_unknown_fields)]` structs whose fields are all
//! optional; required fields are checked with [`Required`] so the client gets one
//! 400 naming every missing field. Each body maps to columns through
//! [`IntoRecord`](crate::database::record::IntoRecord).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ApiError;

/// Fixed string enumeration stored as VARCHAR.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl From<$name> for serde_json::Value {
            fn from(value: $name) -> Self {
                serde_json::Value::String(value.as_str().to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod archivo;
pub mod area;
pub mod bitacora;
pub mod cartelera;
pub mod equipo;
pub mod force;
pub mod incidencia;
pub mod menu;
pub mod menu_usuario;
pub mod old_bitacora;
pub mod reunion;
pub mod tarea;
pub mod tipo_bitacora;
pub mod usuario;

status_enum!(
    /// ACTIVO/INACTIVO flag used by areas, users and menu permissions.
    Activo {
        Activo => "ACTIVO",
        Inactivo => "INACTIVO",
    }
);

/// Body of the `PATCH .../estatus` endpoints.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusInput<S> {
    #[serde(alias = "estatusforce")]
    pub estatus: Option<S>,
}

impl<S: Copy> StatusInput<S> {
    pub fn require(&self) -> Result<S, ApiError> {
        self.estatus.ok_or_else(|| ApiError::missing_fields(&["estatus"]))
    }
}

/// Collects missing required fields into a single validation error.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T>(&mut self, name: &'static str, value: &Option<T>) -> &mut Self {
        if value.is_none() {
            self.missing.push(name);
        }
        self
    }

    /// Blank strings count as missing.
    pub fn text(&mut self, name: &'static str, value: &Option<String>) -> &mut Self {
        if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            self.missing.push(name);
        }
        self
    }

    pub fn finish(&self) -> Result<(), ApiError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::missing_fields(&self.missing))
        }
    }
}

/// Accepts `true`/`false`, `1`/`0` as JSON or query-string values.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(Some(n.as_i64().unwrap_or(0) != 0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" => Ok(Some(true)),
            "0" | "false" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!("invalid boolean '{}'", other))),
        },
        Some(other) => Err(serde::de::Error::custom(format!("invalid boolean {}", other))),
    }
}

/// `YYYY-MM-DD`, also accepting a full ISO timestamp and keeping its date part.
pub fn flexible_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    parse_date(text)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", text)))
}

/// `HH:MM:SS` or `HH:MM`.
pub fn flexible_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    parse_time(text)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}'", text)))
}

/// `YYYY-MM-DD HH:MM:SS`, ISO `T` separator, or a bare date at midnight.
pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    parse_datetime(text)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime '{}'", text)))
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let head = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

pub fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim_end_matches('Z');
    let trimmed = trimmed.split('.').next().unwrap_or(trimmed);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// MySQL literal for a date column.
pub fn sql_date(date: NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

pub fn sql_time(time: NaiveTime) -> Value {
    Value::String(time.format("%H:%M:%S").to_string())
}

pub fn sql_datetime(datetime: NaiveDateTime) -> Value {
    Value::String(datetime.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Trimmed text, `None` when blank.
pub fn clean(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct FlagHolder {
        #[serde(default, deserialize_with = "flag")]
        critico: Option<bool>,
        #[serde(default, deserialize_with = "flexible_date")]
        fecha: Option<NaiveDate>,
        #[serde(default, deserialize_with = "flexible_time")]
        hora: Option<NaiveTime>,
    }

    #[test]
    fn flags_accept_numbers_and_strings() {
        for (input, expected) in [(json!(1), true), (json!("0"), false), (json!("true"), true), (json!(false), false)] {
            let parsed: FlagHolder = serde_json::from_value(json!({ "critico": input })).unwrap();
            assert_eq!(parsed.critico, Some(expected));
        }
        let parsed: FlagHolder = serde_json::from_value(json!({})).unwrap();
        assert_eq!(parsed.critico, None);
        assert!(serde_json::from_value::<FlagHolder>(json!({ "critico": "tal vez" })).is_err());
    }

    #[test]
    fn dates_and_times_are_lenient() {
        let parsed: FlagHolder =
            serde_json::from_value(json!({ "fecha": "2025-06-10T00:00:00.000Z", "hora": "08:30" })).unwrap();
        assert_eq!(parsed.fecha, NaiveDate::from_ymd_opt(2025, 6, 10));
        assert_eq!(parsed.hora, NaiveTime::from_hms_opt(8, 30, 0));
        assert!(serde_json::from_value::<FlagHolder>(json!({ "fecha": "10/06/2025" })).is_err());
    }

    #[test]
    fn datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap().and_hms_opt(14, 5, 0);
        assert_eq!(parse_datetime("2025-06-10 14:05:00"), expected);
        assert_eq!(parse_datetime("2025-06-10T14:05:00.123Z"), expected);
        assert_eq!(
            parse_datetime("2025-06-10"),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn required_reports_every_missing_field() {
        let err = Required::new()
            .text("tema", &Some("  ".into()))
            .field("fecha", &None::<NaiveDate>)
            .text("descripcion", &Some("ok".into()))
            .finish()
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.message().contains("tema"));
        assert!(err.message().contains("fecha"));
        assert!(!err.message().contains("descripcion"));
    }

    #[test]
    fn status_body_accepts_force_alias() {
        let body: StatusInput<Activo> = serde_json::from_value(json!({ "estatusforce": "INACTIVO" })).unwrap();
        assert_eq!(body.require().unwrap(), Activo::Inactivo);
        assert!(serde_json::from_value::<StatusInput<Activo>>(json!({ "estatus": "BORRADO" })).is_err());
    }
}
