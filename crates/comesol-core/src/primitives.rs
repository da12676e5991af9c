//! # Fixed Constants
//!
//! Route paths, backend table names and input limits.
//! These are compiled in and never change at runtime.

/// Number of digits in a CPF, check digits included.
pub const CPF_LENGTH: usize = 11;

/// Digits of a CPF covered by the first check digit.
pub const CPF_BASE_LENGTH: usize = 9;

/// The checksum modulus used by both CPF check digits.
pub const CPF_MODULUS: u32 = 11;

// =============================================================================
// CLIENT ROUTES
// =============================================================================

/// Root route; shows the login page.
pub const ROUTE_ROOT: &str = "/";

/// Login page.
pub const ROUTE_LOGIN: &str = "/login";

/// Registration entry form (group + members).
pub const ROUTE_CADASTRO: &str = "/cadastro";

/// View/edit page for an existing registration.
pub const ROUTE_VISUALIZACAO: &str = "/visualizacao";

// =============================================================================
// BACKEND TABLES
// =============================================================================

/// Table holding one row per registered group.
pub const GROUPS_TABLE: &str = "groups";

/// Table holding the members of every group.
pub const MEMBERS_TABLE: &str = "members";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for any free-text form field.
///
/// Longer values are rejected before reaching the backend.
pub const MAX_FIELD_LENGTH: usize = 512;

/// Maximum number of members accepted in a single registration.
pub const MAX_PENDING_MEMBERS: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_layout() {
        assert_eq!(CPF_BASE_LENGTH + 2, CPF_LENGTH);
    }
}
