//! Capability checks for catalog actions

use crate::models::{Identity, Permission};

/// Decides whether an identity may perform a gated action
#[cfg_attr(test, mockall::automock)]
pub trait Authorizer: Send + Sync {
    fn has_perm(&self, identity: &Identity, permission: Permission) -> bool;
}

/// Grants what the token claims: superusers hold everything, others hold their listed permissions
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsAuthorizer;

impl Authorizer for ClaimsAuthorizer {
    fn has_perm(&self, identity: &Identity, permission: Permission) -> bool {
        identity.is_superuser || identity.holds(permission)
    }
}
