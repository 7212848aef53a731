//! Role and permission resolution
//!
//! Roles are a fixed enumerated set. Each role maps to a hand-maintained set of
//! `<module>.<action>` permission strings, and admin-capable roles carry the set
//! of roles they may grant to a new account. Nothing here is persisted: the
//! permission set of a user is recomputed from its role names every time it is
//! needed.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Permission string constants, grouped by module
pub mod permissions {
    pub const USERS_CREATE: &str = "users.create";
    pub const USERS_READ: &str = "users.read";
    pub const USERS_UPDATE: &str = "users.update";
    pub const USERS_DELETE: &str = "users.delete";

    pub const ROLES_READ: &str = "roles.read";
    pub const ROLES_ASSIGN: &str = "roles.assign";

    pub const ENTREPRENEURS_CREATE: &str = "entrepreneurs.create";
    pub const ENTREPRENEURS_READ: &str = "entrepreneurs.read";
    pub const ENTREPRENEURS_UPDATE: &str = "entrepreneurs.update";
    pub const ENTREPRENEURS_DELETE: &str = "entrepreneurs.delete";

    pub const FAIRS_CREATE: &str = "fairs.create";
    pub const FAIRS_READ: &str = "fairs.read";
    pub const FAIRS_UPDATE: &str = "fairs.update";
    pub const FAIRS_DELETE: &str = "fairs.delete";

    pub const STANDS_READ: &str = "stands.read";
    pub const STANDS_UPDATE: &str = "stands.update";

    pub const ENROLLMENTS_CREATE: &str = "enrollments.create";
    pub const ENROLLMENTS_READ: &str = "enrollments.read";
    pub const ENROLLMENTS_UPDATE: &str = "enrollments.update";
    pub const ENROLLMENTS_DELETE: &str = "enrollments.delete";

    pub const CONTENT_CREATE: &str = "content.create";
    pub const CONTENT_READ: &str = "content.read";
    pub const CONTENT_UPDATE: &str = "content.update";
    pub const CONTENT_DELETE: &str = "content.delete";

    pub const NEWS_CREATE: &str = "news.create";
    pub const NEWS_READ: &str = "news.read";
    pub const NEWS_UPDATE: &str = "news.update";
    pub const NEWS_DELETE: &str = "news.delete";

    pub const NEWSLETTERS_SEND: &str = "newsletters.send";
    pub const SUBSCRIBERS_READ: &str = "subscribers.read";

    pub const REPORTS_READ: &str = "reports.read";
    pub const REPORTS_EXPORT: &str = "reports.export";
}

use permissions::*;

/// Authorization category assigned to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    GeneralAdmin,
    FairAdmin,
    ContentAdmin,
    Auditor,
    Entrepreneur,
    Volunteer,
}

impl Role {
    /// Every role, most privileged first
    pub const PRECEDENCE: [Role; 7] = [
        Role::SuperAdmin,
        Role::GeneralAdmin,
        Role::FairAdmin,
        Role::ContentAdmin,
        Role::Auditor,
        Role::Entrepreneur,
        Role::Volunteer,
    ];

    /// Get the role name as stored and carried in tokens
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::GeneralAdmin => "general_admin",
            Role::FairAdmin => "fair_admin",
            Role::ContentAdmin => "content_admin",
            Role::Auditor => "auditor",
            Role::Entrepreneur => "entrepreneur",
            Role::Volunteer => "volunteer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role name outside the enumerated set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::PRECEDENCE
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Returned by guards when a required permission is absent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Missing permission: {permission}")]
pub struct PermissionDenied {
    pub permission: String,
}

/// Anything that carries a list of role names
pub trait HasRoles {
    fn role_names(&self) -> &[String];
}

impl HasRoles for Vec<String> {
    fn role_names(&self) -> &[String] {
        self
    }
}

impl HasRoles for [String] {
    fn role_names(&self) -> &[String] {
        self
    }
}

/// Static lookup tables consumed by [`PermissionResolver`]
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    permissions: HashMap<Role, BTreeSet<String>>,
    assignable: HashMap<Role, BTreeSet<Role>>,
}

impl RoleTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the permissions granted by a role
    pub fn with_permissions<I, S>(mut self, role: Role, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions
            .insert(role, permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Set the roles a granter role may assign
    pub fn with_assignable<I>(mut self, granter: Role, roles: I) -> Self
    where
        I: IntoIterator<Item = Role>,
    {
        self.assignable.insert(granter, roles.into_iter().collect());
        self
    }

    /// The hand-maintained production table
    pub fn builtin() -> Self {
        let all_reads = [
            USERS_READ,
            ROLES_READ,
            ENTREPRENEURS_READ,
            FAIRS_READ,
            STANDS_READ,
            ENROLLMENTS_READ,
            CONTENT_READ,
            NEWS_READ,
            SUBSCRIBERS_READ,
            REPORTS_READ,
        ];

        let fair_management = [
            FAIRS_CREATE,
            FAIRS_READ,
            FAIRS_UPDATE,
            STANDS_READ,
            STANDS_UPDATE,
            ENROLLMENTS_CREATE,
            ENROLLMENTS_READ,
            ENROLLMENTS_UPDATE,
            ENROLLMENTS_DELETE,
            ENTREPRENEURS_READ,
            ENTREPRENEURS_UPDATE,
        ];

        let content_management = [
            CONTENT_CREATE,
            CONTENT_READ,
            CONTENT_UPDATE,
            CONTENT_DELETE,
            NEWS_CREATE,
            NEWS_READ,
            NEWS_UPDATE,
            NEWS_DELETE,
            NEWSLETTERS_SEND,
            SUBSCRIBERS_READ,
        ];

        let general_admin: Vec<&str> = fair_management
            .iter()
            .chain(content_management.iter())
            .copied()
            .chain([
                USERS_CREATE,
                USERS_READ,
                USERS_UPDATE,
                ROLES_READ,
                ROLES_ASSIGN,
                ENTREPRENEURS_CREATE,
                ENTREPRENEURS_DELETE,
                FAIRS_DELETE,
                REPORTS_READ,
                REPORTS_EXPORT,
            ])
            .collect();

        let super_admin: Vec<&str> = general_admin
            .iter()
            .copied()
            .chain([USERS_DELETE])
            .collect();

        let fair_admin: Vec<&str> = fair_management
            .iter()
            .copied()
            .chain([USERS_CREATE, ROLES_ASSIGN, REPORTS_READ])
            .collect();

        let content_admin: Vec<&str> = content_management
            .iter()
            .copied()
            .chain([USERS_CREATE, ROLES_ASSIGN])
            .collect();

        let auditor: Vec<&str> = all_reads.iter().copied().chain([REPORTS_EXPORT]).collect();

        RoleTable::new()
            .with_permissions(Role::SuperAdmin, super_admin)
            .with_permissions(Role::GeneralAdmin, general_admin)
            .with_permissions(Role::FairAdmin, fair_admin)
            .with_permissions(Role::ContentAdmin, content_admin)
            .with_permissions(Role::Auditor, auditor)
            .with_permissions(
                Role::Entrepreneur,
                [
                    ENTREPRENEURS_READ,
                    ENTREPRENEURS_UPDATE,
                    FAIRS_READ,
                    STANDS_READ,
                    ENROLLMENTS_CREATE,
                    ENROLLMENTS_READ,
                    CONTENT_READ,
                    NEWS_READ,
                ],
            )
            .with_permissions(
                Role::Volunteer,
                [FAIRS_READ, STANDS_READ, CONTENT_READ, NEWS_READ],
            )
            .with_assignable(
                Role::SuperAdmin,
                Role::PRECEDENCE
                    .into_iter()
                    .filter(|role| *role != Role::SuperAdmin),
            )
            .with_assignable(
                Role::GeneralAdmin,
                [
                    Role::FairAdmin,
                    Role::ContentAdmin,
                    Role::Auditor,
                    Role::Entrepreneur,
                    Role::Volunteer,
                ],
            )
            .with_assignable(Role::FairAdmin, [Role::Entrepreneur, Role::Volunteer])
            .with_assignable(Role::ContentAdmin, [Role::Volunteer])
            .with_assignable(Role::Auditor, [])
    }
}

/// Pure resolver over an injected [`RoleTable`]
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    table: RoleTable,
}

impl Default for PermissionResolver {
    fn default() -> Self {
        Self::new(RoleTable::builtin())
    }
}

impl PermissionResolver {
    /// Create a resolver backed by the given table
    pub fn new(table: RoleTable) -> Self {
        Self { table }
    }

    /// Permissions granted by a single role name; empty for unknown roles
    pub fn permissions_for_role(&self, role: &str) -> BTreeSet<String> {
        role.parse::<Role>()
            .ok()
            .and_then(|role| self.table.permissions.get(&role))
            .cloned()
            .unwrap_or_default()
    }

    /// Sorted, de-duplicated union of the permissions of every role
    pub fn permissions_for_roles<S: AsRef<str>>(&self, roles: &[S]) -> Vec<String> {
        roles
            .iter()
            .flat_map(|role| self.permissions_for_role(role.as_ref()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_permission<U: HasRoles + ?Sized>(&self, user: &U, permission: &str) -> bool {
        self.permission_set(user).contains(permission)
    }

    pub fn has_any_permission<U: HasRoles + ?Sized>(&self, user: &U, permissions: &[&str]) -> bool {
        let granted = self.permission_set(user);
        permissions.iter().any(|p| granted.contains(*p))
    }

    pub fn has_all_permissions<U: HasRoles + ?Sized>(&self, user: &U, permissions: &[&str]) -> bool {
        let granted = self.permission_set(user);
        permissions.iter().all(|p| granted.contains(*p))
    }

    /// Exact membership; no hierarchy is implied
    pub fn has_role<U: HasRoles + ?Sized>(&self, user: &U, role: Role) -> bool {
        user.role_names().iter().any(|name| name == role.as_str())
    }

    /// Guard helper for handlers
    pub fn require_permission<U: HasRoles + ?Sized>(
        &self,
        user: &U,
        permission: &str,
    ) -> Result<(), PermissionDenied> {
        if self.has_permission(user, permission) {
            Ok(())
        } else {
            Err(PermissionDenied {
                permission: permission.to_string(),
            })
        }
    }

    /// Whether `granter` (a user's highest role) may assign `target` to an account
    pub fn can_assign_role(&self, granter: &str, target: &str) -> bool {
        let (Ok(granter), Ok(target)) = (granter.parse::<Role>(), target.parse::<Role>()) else {
            return false;
        };

        self.table
            .assignable
            .get(&granter)
            .is_some_and(|roles| roles.contains(&target))
    }

    fn permission_set<U: HasRoles + ?Sized>(&self, user: &U) -> BTreeSet<String> {
        user.role_names()
            .iter()
            .flat_map(|role| self.permissions_for_role(role))
            .collect()
    }
}

/// Most privileged role present, or [`Role::Volunteer`] when none is recognised
pub fn highest_role<S: AsRef<str>>(roles: &[S]) -> Role {
    Role::PRECEDENCE
        .into_iter()
        .find(|candidate| roles.iter().any(|r| r.as_ref() == candidate.as_str()))
        .unwrap_or(Role::Volunteer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(roles: &[&str]) -> Vec<String> {
        roles.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_role_round_trips_through_name() {
        for role in Role::PRECEDENCE {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert_eq!(
            "root".parse::<Role>(),
            Err(UnknownRole("root".to_string()))
        );
    }

    #[test]
    fn test_role_serde_uses_snake_case() {
        let json = serde_json::to_string(&Role::FairAdmin).unwrap();
        assert_eq!(json, "\"fair_admin\"");
        let role: Role = serde_json::from_str("\"content_admin\"").unwrap();
        assert_eq!(role, Role::ContentAdmin);
    }

    #[test]
    fn test_every_role_has_permissions() {
        let resolver = PermissionResolver::default();
        for role in Role::PRECEDENCE {
            assert!(
                !resolver.permissions_for_role(role.as_str()).is_empty(),
                "{role} has no permissions"
            );
        }
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        let resolver = PermissionResolver::default();
        assert!(resolver.permissions_for_role("janitor").is_empty());
        assert!(resolver.permissions_for_roles(&["janitor"]).is_empty());
    }

    #[test]
    fn test_permissions_for_roles_is_sorted_union() {
        let resolver = PermissionResolver::default();
        let merged = resolver.permissions_for_roles(&["auditor", "entrepreneur"]);

        let mut expected: BTreeSet<String> = resolver.permissions_for_role("auditor");
        expected.extend(resolver.permissions_for_role("entrepreneur"));
        let expected: Vec<String> = expected.into_iter().collect();

        assert_eq!(merged, expected);

        // Both roles grant fairs.read; it must appear once
        assert_eq!(merged.iter().filter(|p| *p == FAIRS_READ).count(), 1);

        let mut sorted = merged.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(merged, sorted);
    }

    #[test]
    fn test_permissions_for_roles_ignores_duplicate_roles() {
        let resolver = PermissionResolver::default();
        assert_eq!(
            resolver.permissions_for_roles(&["volunteer", "volunteer"]),
            resolver.permissions_for_roles(&["volunteer"])
        );
    }

    #[test]
    fn test_permission_queries() {
        let resolver = PermissionResolver::default();
        let user = names(&["volunteer"]);

        assert!(resolver.has_permission(&user, FAIRS_READ));
        assert!(!resolver.has_permission(&user, FAIRS_CREATE));

        assert!(resolver.has_any_permission(&user, &[FAIRS_CREATE, NEWS_READ]));
        assert!(!resolver.has_any_permission(&user, &[FAIRS_CREATE, USERS_DELETE]));
        assert!(!resolver.has_any_permission(&user, &[]));

        assert!(resolver.has_all_permissions(&user, &[FAIRS_READ, STANDS_READ]));
        assert!(!resolver.has_all_permissions(&user, &[FAIRS_READ, FAIRS_UPDATE]));
        assert!(resolver.has_all_permissions(&user, &[]));
    }

    #[test]
    fn test_user_without_roles_has_nothing() {
        let resolver = PermissionResolver::default();
        let user: Vec<String> = vec![];
        assert!(!resolver.has_permission(&user, FAIRS_READ));
        assert!(resolver.require_permission(&user, FAIRS_READ).is_err());
    }

    #[test]
    fn test_has_role_is_exact_membership() {
        let resolver = PermissionResolver::default();
        let user = names(&["super_admin"]);
        assert!(resolver.has_role(&user, Role::SuperAdmin));
        assert!(!resolver.has_role(&user, Role::Volunteer));
    }

    #[test]
    fn test_require_permission_reports_missing_permission() {
        let resolver = PermissionResolver::default();
        let user = names(&["auditor"]);
        assert!(resolver.require_permission(&user, FAIRS_READ).is_ok());
        assert_eq!(
            resolver.require_permission(&user, FAIRS_DELETE),
            Err(PermissionDenied {
                permission: FAIRS_DELETE.to_string()
            })
        );
    }

    #[test]
    fn test_can_assign_role_hierarchy() {
        let resolver = PermissionResolver::default();

        assert!(resolver.can_assign_role("fair_admin", "entrepreneur"));
        assert!(!resolver.can_assign_role("fair_admin", "general_admin"));

        for role in Role::PRECEDENCE {
            assert!(!resolver.can_assign_role("auditor", role.as_str()));
            assert!(!resolver.can_assign_role("volunteer", role.as_str()));
            assert!(!resolver.can_assign_role("unknown_role", role.as_str()));
        }

        for role in Role::PRECEDENCE {
            assert_eq!(
                resolver.can_assign_role("super_admin", role.as_str()),
                role != Role::SuperAdmin
            );
        }

        assert!(!resolver.can_assign_role("super_admin", "unknown_role"));
    }

    #[test]
    fn test_highest_role() {
        assert_eq!(highest_role(&["volunteer", "fair_admin"]), Role::FairAdmin);
        assert_eq!(
            highest_role(&["auditor", "super_admin", "entrepreneur"]),
            Role::SuperAdmin
        );
        assert_eq!(highest_role(&["content_admin", "auditor"]), Role::ContentAdmin);
    }

    #[test]
    fn test_highest_role_falls_back_to_volunteer() {
        let empty: [&str; 0] = [];
        assert_eq!(highest_role(&empty), Role::Volunteer);
        assert_eq!(highest_role(&["unknown_role"]), Role::Volunteer);
    }

    #[test]
    fn test_injected_table_replaces_builtin() {
        let table = RoleTable::new()
            .with_permissions(Role::Volunteer, ["fairs.read", "fairs.read", "news.read"])
            .with_assignable(Role::Auditor, [Role::Volunteer]);
        let resolver = PermissionResolver::new(table);

        assert_eq!(
            resolver.permissions_for_roles(&["volunteer", "super_admin"]),
            vec!["fairs.read".to_string(), "news.read".to_string()]
        );
        assert!(resolver.can_assign_role("auditor", "volunteer"));
        assert!(!resolver.can_assign_role("super_admin", "volunteer"));
    }
}
