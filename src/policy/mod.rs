//! Row-level access policy.
//!
//! Every scoped record (bitácora, cartelera, incidencia, tarea, ...) exposes its
//! owner, area and public flag through [`Scoped`]. Reads are allowed for admins,
//! public records, same-area principals and owners; mutations only for admins and
//! owners. Listing pushes the same predicate into SQL through [`scope_filter`].

pub mod board;
pub mod menu_tree;

use crate::filter::FilterWhere;
use crate::middleware::AuthUser;

/// Privilege threshold. A principal holds a level when its `nivel` is at or below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level(pub i32);

impl Level {
    /// Areas, menus, menu permissions, force catalogs and user management.
    pub const SYSTEM: Level = Level(1);
    /// Equipment maintenance and user listings.
    pub const MANAGER: Level = Level(2);
    /// Record-level admin over logs, bulletins, incidents, tasks, meetings and forces.
    pub const SUPERVISOR: Level = Level(3);
}

/// Ownership facts of a record that the policy needs.
pub trait Scoped {
    fn owner_login(&self) -> &str;
    fn area(&self) -> Option<i32>;
    fn is_public(&self) -> bool {
        false
    }
}

/// Column names used when pushing the read predicate into a WHERE clause.
#[derive(Debug, Clone, Copy)]
pub struct ScopeColumns {
    pub owner: &'static str,
    pub area: &'static str,
    pub public: Option<&'static str>,
}

pub fn is_admin(user: &AuthUser, admin_level: Level) -> bool {
    user.has_level(admin_level)
}

pub fn can_access<R: Scoped + ?Sized>(user: &AuthUser, record: &R, admin_level: Level) -> bool {
    is_admin(user, admin_level)
        || record.is_public()
        || (record.area().is_some() && record.area() == user.fkarea)
        || record.owner_login() == user.login
}

pub fn can_mutate<R: Scoped + ?Sized>(user: &AuthUser, record: &R, admin_level: Level) -> bool {
    is_admin(user, admin_level) || record.owner_login() == user.login
}

/// Append the read predicate for non-admins: `(public = 1 OR area = ? OR owner = ?)`.
pub fn scope_filter(where_: &mut FilterWhere, user: &AuthUser, admin_level: Level, columns: ScopeColumns) {
    if is_admin(user, admin_level) {
        return;
    }

    let mut any = FilterWhere::any_of();
    if let Some(public) = columns.public {
        any.raw(format!("{} = 1", public));
    }
    if let Some(area) = user.fkarea {
        any.eq(columns.area, area);
    }
    any.eq(columns.owner, user.login.as_str());
    where_.group(any);
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub struct Row {
        pub owner: String,
        pub area: Option<i32>,
        pub public: bool,
    }

    impl Scoped for Row {
        fn owner_login(&self) -> &str {
            &self.owner
        }
        fn area(&self) -> Option<i32> {
            self.area
        }
        fn is_public(&self) -> bool {
            self.public
        }
    }

    pub fn user(login: &str, nivel: i32, area: Option<i32>) -> AuthUser {
        AuthUser {
            login: login.to_string(),
            nombres: login.to_uppercase(),
            nivel,
            fkarea: area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{user, Row};
    use super::*;

    #[test]
    fn non_admin_access_is_exactly_public_or_area_or_owner() {
        let u = user("ana", 5, Some(10));
        for public in [false, true] {
            for same_area in [false, true] {
                for owner in [false, true] {
                    let row = Row {
                        owner: if owner { "ana".into() } else { "otro".into() },
                        area: Some(if same_area { 10 } else { 20 }),
                        public,
                    };
                    assert_eq!(
                        can_access(&u, &row, Level::SUPERVISOR),
                        public || same_area || owner,
                        "public={} same_area={} owner={}",
                        public,
                        same_area,
                        owner
                    );
                }
            }
        }
    }

    #[test]
    fn private_log_scenario() {
        let a = user("a", 5, Some(10));
        let b = user("b", 5, Some(20));
        let c = user("c", 1, Some(99));
        let row = Row { owner: "a".into(), area: Some(10), public: false };

        assert!(can_access(&a, &row, Level::SUPERVISOR));
        assert!(!can_access(&b, &row, Level::SUPERVISOR));
        assert!(can_access(&c, &row, Level::SUPERVISOR));
    }

    #[test]
    fn area_membership_does_not_grant_mutation() {
        let colleague = user("colega", 5, Some(10));
        let row = Row { owner: "a".into(), area: Some(10), public: true };
        assert!(can_access(&colleague, &row, Level::SUPERVISOR));
        assert!(!can_mutate(&colleague, &row, Level::SUPERVISOR));

        let supervisor = user("sup", 3, Some(99));
        assert!(can_mutate(&supervisor, &row, Level::SUPERVISOR));
        assert!(!can_mutate(&supervisor, &row, Level::SYSTEM));
    }

    #[test]
    fn user_without_area_never_matches_on_area() {
        let u = user("x", 5, None);
        let row = Row { owner: "y".into(), area: None, public: false };
        assert!(!can_access(&u, &row, Level::SUPERVISOR));
    }

    #[test]
    fn scope_filter_only_applies_to_non_admins() {
        let cols = ScopeColumns { owner: "b.login", area: "b.fkarea", public: Some("b.publico") };

        let mut w = FilterWhere::new();
        scope_filter(&mut w, &user("root", 1, None), Level::SUPERVISOR, cols);
        assert!(w.is_empty());

        let mut w = FilterWhere::new();
        scope_filter(&mut w, &user("ana", 5, Some(10)), Level::SUPERVISOR, cols);
        let (sql, params) = w.build();
        assert_eq!(sql, "(b.publico = 1 OR b.fkarea = ? OR b.login = ?)");
        assert_eq!(params, vec![serde_json::json!(10), serde_json::json!("ana")]);
    }
}
