//! Roles, permissions and the public route allowlist / 角色与权限

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routes reachable without a bearer token
pub const PUBLIC_ROUTES: [&str; 3] = [
    "/api/auth/admin/register",
    "/api/auth/admin/login",
    "/api/auth/admin/reset-password",
];

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    UserCreate,
    UserRead,
    UserUpdate,
    UserDelete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Fixed permission set of the role
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::Employee => &[Permission::UserRead],
            Role::Admin => &[Permission::UserCreate, Permission::UserRead, Permission::UserUpdate],
            Role::SuperAdmin => &[
                Permission::UserCreate,
                Permission::UserRead,
                Permission::UserUpdate,
                Permission::UserDelete,
            ],
        }
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Ok(Role::Employee),
            "ADMIN" => Ok(Role::Admin),
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            _ => Err(format!("Unknown role: {}", s.trim())),
        }
    }
}

/// Authority claims granted to a role: its permissions plus `ROLE_<name>`
pub fn authorities(role: Role) -> Vec<String> {
    let mut list: Vec<String> = role.permissions().iter().map(|p| p.as_str().to_string()).collect();
    list.push(format!("ROLE_{}", role.as_str()));
    list
}

pub fn is_public_route(path: &str) -> bool {
    let path = path.trim_end_matches('/');
    PUBLIC_ROUTES.iter().any(|route| *route == path)
}

/// Extract the token from an `Authorization` header value
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorities() {
        assert_eq!(authorities(Role::Employee), vec!["user:read", "ROLE_EMPLOYEE"]);
        let super_admin = authorities(Role::SuperAdmin);
        assert!(super_admin.contains(&"user:delete".to_string()));
        assert!(super_admin.contains(&"ROLE_SUPER_ADMIN".to_string()));
        assert!(!authorities(Role::Admin).contains(&"user:delete".to_string()));
    }

    #[test]
    fn test_role_round_trip_names() {
        assert_eq!("super_admin".parse::<Role>().unwrap(), Role::SuperAdmin);
        assert_eq!(serde_json::to_string(&Role::SuperAdmin).unwrap(), "\"SUPER_ADMIN\"");
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn test_public_routes() {
        assert!(is_public_route("/api/auth/admin/login"));
        assert!(is_public_route("/api/auth/admin/register/"));
        assert!(!is_public_route("/api/auth/admin/logout"));
        assert!(!is_public_route("/api/projects"));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("Bearer   "), None);
        assert_eq!(parse_bearer("Basic abc"), None);
    }
}
