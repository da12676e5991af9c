//! # comesol-core
//!
//! Domain rules for the COMESOL annual registration (cadastro) - THE RULES.
//!
//! Users authenticate against a hosted backend, register a group and its
//! members, and later view or edit what they saved. Storage, sessions and
//! queries all live in that backend. This crate holds the part that does
//! not depend on it:
//!
//! - `cpf`: CPF checksum validation (gates member submission)
//! - `routing`: the post-login decision between `/cadastro` and `/visualizacao`
//! - `validation`: group and member form checks
//! - `pending`: the local list of members awaiting submission
//! - `registration`: the cadastro page as a whole
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - No clocks, no randomness: local ids are counters
//! - Never displays anything; every failure is a `CadastroError` value

// =============================================================================
// MODULES
// =============================================================================

pub mod cpf;
pub mod pending;
pub mod primitives;
pub mod registration;
pub mod routing;
pub mod types;
pub mod validation;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Address, CadastroError, Education, Ethnicity, Gender, Group, GroupId, IncomeRange, Member,
    MemberDraft, MemberId, NewGroup, NewMember, UserId,
};

// =============================================================================
// RE-EXPORTS: Rules
// =============================================================================

pub use cpf::{Cpf, check_digit, cpf_digits, validate_cpf};
pub use pending::{PendingId, PendingMember, PendingMembers};
pub use registration::Registration;
pub use routing::{
    Destination, GroupLookup, RouteDecision, first_group, guard_protected, guard_view,
    route_after_auth, route_for_group,
};
pub use validation::{GroupForm, MemberForm, validate_cep, validate_email};
