pub mod billing;
pub mod loyalty;

use crate::middleware::auth::CurrentUser;

/// Tenant scope handle for every query that touches tenant-owned rows.
///
/// The only non-test constructor takes an authenticated [`CurrentUser`], so a
/// request without a valid token cannot build one and tenant-scoped reads fail
/// closed instead of widening to all rows. Create paths take the owner id from
/// here, never from a client payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant(i64);

impl Tenant {
    pub fn of(user: &CurrentUser) -> Self {
        Self(user.user_id)
    }

    pub fn user_id(self) -> i64 {
        self.0
    }

    #[cfg(test)]
    pub fn fixture(user_id: i64) -> Self {
        Self(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_is_bound_to_the_authenticated_user() {
        let user = CurrentUser {
            user_id: 7,
            email: "shop@example.com".to_string(),
        };
        assert_eq!(Tenant::of(&user).user_id(), 7);
        assert_eq!(Tenant::of(&user), Tenant::fixture(7));
    }
}
