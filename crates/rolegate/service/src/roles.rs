//! Role predicates over an optional principal

use rolegate_types::{Principal, RoleId};

/// Whether the principal holds `role`. No principal never has a role.
pub fn has_role(principal: Option<&Principal>, role: &str) -> bool {
    principal.map(|p| p.role.as_str() == role).unwrap_or(false)
}

/// Whether the principal holds any of `roles`
pub fn has_any_role(principal: Option<&Principal>, roles: &[RoleId]) -> bool {
    roles.iter().any(|role| has_role(principal, role.as_str()))
}
