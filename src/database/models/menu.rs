use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{clean, flag, Required};
use crate::database::record::{IntoRecord, Record};
use crate::error::ApiError;
use crate::policy::menu_tree::TreeItem;

/// Menus the user holds an active permission for, in tree order.
pub const USER_MENUS_SQL: &str = "SELECT m.* FROM menus m \
    INNER JOIN menus_usuarios mu ON mu.idmenu = m.idmenu \
    WHERE mu.login = ? AND m.estatus = 1 AND mu.estatus = 'ACTIVO' \
    ORDER BY m.orden, m.idmenu";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Menu {
    pub idmenu: i32,
    pub idpadre: Option<i32>,
    pub name: String,
    pub url: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
    pub badge_text: Option<String>,
    pub badge_variant: Option<String>,
    pub badge_class: Option<String>,
    pub variant: Option<String>,
    pub attributes: Option<String>,
    pub attributes_element: Option<String>,
    pub divider: bool,
    pub class: Option<String>,
    pub label_class: Option<String>,
    pub label_variant: Option<String>,
    pub wrapper_attributes: Option<String>,
    pub wrapper_element: Option<String>,
    pub linkprops: Option<String>,
    pub title: bool,
    pub estatus: bool,
    pub orden: i32,
}

impl TreeItem for Menu {
    fn id(&self) -> i32 {
        self.idmenu
    }
    fn parent(&self) -> Option<i32> {
        self.idpadre
    }
    fn order(&self) -> i32 {
        self.orden
    }
}

/// `(idmenu, idpadre)` pair used for cycle checks.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct MenuParent {
    pub idmenu: i32,
    pub idpadre: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuInput {
    /// `Some(None)` clears the parent; absent leaves it unchanged.
    #[serde(default, with = "double_option")]
    pub idpadre: Option<Option<i32>>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
    pub badge_text: Option<String>,
    pub badge_variant: Option<String>,
    pub badge_class: Option<String>,
    pub variant: Option<String>,
    pub attributes: Option<String>,
    pub attributes_element: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub divider: Option<bool>,
    pub class: Option<String>,
    pub label_class: Option<String>,
    pub label_variant: Option<String>,
    pub wrapper_attributes: Option<String>,
    pub wrapper_element: Option<String>,
    pub linkprops: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub title: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub estatus: Option<bool>,
    pub orden: Option<i32>,
}

impl MenuInput {
    pub fn validate_create(&self) -> Result<(), ApiError> {
        Required::new().text("name", &self.name).finish()
    }

    /// Requested parent, with `0` meaning root.
    pub fn requested_parent(&self) -> Option<Option<i32>> {
        self.idpadre.map(|p| p.filter(|id| *id != 0))
    }
}

impl IntoRecord for MenuInput {
    fn into_record(self) -> Record {
        let parent = self.requested_parent();
        let mut record = Record::new();
        if let Some(parent) = parent {
            record.set("idpadre", parent);
        }
        record
            .set_opt("name", clean(self.name))
            .set_opt("url", self.url)
            .set_opt("href", self.href)
            .set_opt("icon", self.icon)
            .set_opt("badge_text", self.badge_text)
            .set_opt("badge_variant", self.badge_variant)
            .set_opt("badge_class", self.badge_class)
            .set_opt("variant", self.variant)
            .set_opt("attributes", self.attributes)
            .set_opt("attributes_element", self.attributes_element)
            .set_opt("divider", self.divider)
            .set_opt("class", self.class)
            .set_opt("label_class", self.label_class)
            .set_opt("label_variant", self.label_variant)
            .set_opt("wrapper_attributes", self.wrapper_attributes)
            .set_opt("wrapper_element", self.wrapper_element)
            .set_opt("linkprops", self.linkprops)
            .set_opt("title", self.title)
            .set_opt("estatus", self.estatus)
            .set_opt("orden", self.orden);
        record
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuStatusInput {
    #[serde(default, deserialize_with = "flag")]
    pub estatus: Option<bool>,
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<i32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<i32>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parent_absent_null_and_zero() {
        let absent: MenuInput = serde_json::from_value(json!({ "name": "Inicio" })).unwrap();
        assert_eq!(absent.requested_parent(), None);
        assert!(!absent.into_record().contains("idpadre"));

        let null: MenuInput = serde_json::from_value(json!({ "idpadre": null })).unwrap();
        assert_eq!(null.requested_parent(), Some(None));

        let zero: MenuInput = serde_json::from_value(json!({ "idpadre": 0 })).unwrap();
        assert_eq!(zero.requested_parent(), Some(None));
        assert_eq!(zero.into_record().get("idpadre"), Some(&serde_json::Value::Null));

        let five: MenuInput = serde_json::from_value(json!({ "idpadre": 5 })).unwrap();
        assert_eq!(five.requested_parent(), Some(Some(5)));
    }
}
