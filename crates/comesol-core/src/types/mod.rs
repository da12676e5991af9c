//! # Core Type Definitions
//!
//! This module contains the records exchanged with the hosted backend and the
//! error type shared by the whole workspace:
//! - Identifiers (`UserId`, `GroupId`, `MemberId`)
//! - Group records (`Group`, `NewGroup`, `Address`)
//! - Member records (`Member`, `NewMember`, `MemberDraft`)
//! - Enumerated member attributes (`Gender`, `Ethnicity`, `Education`, `IncomeRange`)
//! - Error types (`CadastroError`)
//!
//! ## Field Naming
//!
//! All records use the snake_case column names of the `groups` and `members`
//! tables. There is exactly one spelling per field.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of an authenticated user, as issued by the auth backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identifier of a `groups` row, generated by the backend on insert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

/// Identifier of a `members` row, generated by the backend on insert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

macro_rules! string_id {
    ($name:ident) => {
        impl $name {
            /// Create an identifier from any string-like value.
            #[must_use]
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(UserId);
string_id!(GroupId);
string_id!(MemberId);

// =============================================================================
// ADDRESS
// =============================================================================

/// A postal address: free-form line plus CEP.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub address_line: Option<String>,
    pub cep: Option<String>,
}

impl Address {
    /// True when neither the line nor the CEP carries any text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        is_blank(self.address_line.as_deref()) && is_blank(self.cep.as_deref())
    }
}

pub(crate) fn is_blank(s: Option<&str>) -> bool {
    s.is_none_or(|v| v.trim().is_empty())
}

// =============================================================================
// GROUP
// =============================================================================

/// A stored `groups` row: the cooperative/enterprise owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub user_id: UserId,
    pub name: String,
    pub representative_name: String,
    pub contact_email: String,
    #[serde(default)]
    pub has_headquarters: bool,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Insert payload for a `groups` row. The backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub user_id: UserId,
    pub name: String,
    pub representative_name: String,
    pub contact_email: String,
    pub has_headquarters: bool,
    pub address: Option<Address>,
}

impl NewGroup {
    /// Materialize the row the backend would return for this payload.
    #[must_use]
    pub fn into_group(self, id: GroupId, created_at: Option<String>) -> Group {
        Group {
            id,
            user_id: self.user_id,
            name: self.name,
            representative_name: self.representative_name,
            contact_email: self.contact_email,
            has_headquarters: self.has_headquarters,
            address: self.address,
            created_at,
            updated_at: None,
        }
    }
}

// =============================================================================
// ENUMERATED MEMBER ATTRIBUTES
// =============================================================================

macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in the order the form lists them.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The label shown on the form and stored in the backend.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Parse a stored label back into the enum.
            #[must_use]
            pub fn from_label(label: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.label() == label)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

labelled_enum! {
    /// Gender identity of a member.
    Gender {
        CisMan => "Homem cisgênero",
        CisWoman => "Mulher cisgênero",
        TransMan => "Homem transgênero",
        TransWoman => "Mulher transgênero",
        NonBinary => "Não-Binário",
        Other => "Outro",
    }
}

labelled_enum! {
    /// Ethnicity / skin colour, following the IBGE categories.
    Ethnicity {
        White => "Branco",
        Black => "Preto",
        Brown => "Pardo",
        Yellow => "Amarelo",
        Indigenous => "Indígena",
    }
}

labelled_enum! {
    /// Highest education level reached.
    Education {
        Illiterate => "Não alfabetizado",
        ElementaryIncomplete => "Fundamental incompleto",
        ElementaryComplete => "Fundamental completo",
        HighSchoolIncomplete => "Médio incompleto",
        HighSchoolComplete => "Médio completo",
        HigherIncomplete => "Superior incompleto",
        HigherComplete => "Superior completo",
        Postgraduate => "Pós Graduação",
    }
}

labelled_enum! {
    /// Average monthly income, in minimum wages.
    IncomeRange {
        UpToOne => "até 1 salário mínimo",
        OneToTwo => "1 a 2 salários mínimos",
        TwoToThree => "2 a 3 salários mínimos",
        ThreeToFour => "3 a 4 salários mínimos",
        MoreThanFour => "mais de 4 salários mínimos",
    }
}

// =============================================================================
// MEMBER
// =============================================================================

/// A validated member awaiting submission.
///
/// Produced by `MemberForm::validate`; the CPF has already passed the
/// checksum and `other_occupation` is only set when the member declared
/// another economic activity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberDraft {
    pub full_name: String,
    pub birth_date: Option<String>,
    pub mother_name: Option<String>,
    pub address: Address,
    pub cpf: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rg: Option<String>,
    pub mei_cnpj: Option<String>,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub education: Option<Education>,
    pub household_count: Option<u32>,
    pub role_in_group: Option<String>,
    pub products_services: Option<String>,
    pub raw_materials: Option<String>,
    pub monthly_income_range: Option<IncomeRange>,
    pub solidarity_involvement: Option<String>,
    pub other_occupation: Option<String>,
}

impl MemberDraft {
    /// Attach the draft to a saved group, producing the insert payload.
    #[must_use]
    pub fn for_group(&self, group_id: &GroupId) -> NewMember {
        NewMember {
            group_id: group_id.clone(),
            data: self.clone(),
        }
    }
}

/// Insert payload for a `members` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub group_id: GroupId,
    #[serde(flatten)]
    pub data: MemberDraft,
}

impl NewMember {
    /// Materialize the row the backend would return for this payload.
    #[must_use]
    pub fn into_member(self, id: MemberId) -> Member {
        Member {
            id,
            group_id: self.group_id,
            data: self.data,
        }
    }
}

/// A stored `members` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub group_id: GroupId,
    #[serde(flatten)]
    pub data: MemberDraft,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur anywhere in the cadastro flow.
///
/// - No alerts: every failure is returned to the caller as a value
/// - The presentation layer decides how to display it
/// - The core never panics
#[derive(Debug, Error)]
pub enum CadastroError {
    /// A required form field was left empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A form field exceeds the maximum accepted length.
    #[error("Field too long: {0}")]
    FieldTooLong(&'static str),

    /// A select field holds a value that is not one of its options.
    #[error("Invalid option for {field}: {value}")]
    InvalidOption { field: &'static str, value: String },

    /// The CPF failed the modulo-11 checksum or has the wrong length.
    #[error("Invalid CPF: {0}")]
    InvalidCpf(String),

    /// The e-mail address does not look like `local@domain.tld`.
    #[error("Invalid e-mail: {0}")]
    InvalidEmail(String),

    /// The CEP is not in the `NNNNN-NNN` format.
    #[error("Invalid CEP: {0}")]
    InvalidCep(String),

    /// A registration cannot be saved without at least one member.
    #[error("At least one member is required")]
    NoMembers,

    /// The pending member list is full.
    #[error("Too many members: at most {0} per registration")]
    TooManyMembers(usize),

    /// No authenticated session was presented.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The backend rejected the credentials or the session token.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The authenticated user has no group registered yet.
    #[error("No group registered for user {0}")]
    GroupNotFound(UserId),

    /// The user already has a group; a second one is refused.
    #[error("Group already registered: {0}")]
    GroupExists(GroupId),

    /// The group was written but its members were not; the group was removed.
    #[error("Registration not saved: {0}")]
    SaveFailed(String),

    /// The addressed record does not exist or is not visible to this session.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The group lookup itself failed; the caller may retry.
    #[error("Group lookup failed: {0}")]
    LookupFailed(String),

    /// The backend cannot be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl CadastroError {
    /// True for errors caused by the submitted data rather than the system.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingField(_)
                | Self::FieldTooLong(_)
                | Self::InvalidOption { .. }
                | Self::InvalidCpf(_)
                | Self::InvalidEmail(_)
                | Self::InvalidCep(_)
                | Self::NoMembers
                | Self::TooManyMembers(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
