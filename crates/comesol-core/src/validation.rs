//! # Form Validation
//!
//! Raw form input for the group and member sections of the cadastro, and the
//! checks that turn it into backend payloads.
//!
//! Forms arrive as loosely typed text (every field optional, selects as their
//! labels). Validation trims, drops empty strings, enforces the required
//! fields and converts selects into their enums.

use crate::cpf::Cpf;
use crate::primitives::MAX_FIELD_LENGTH;
use crate::types::{
    Address, CadastroError, Education, Ethnicity, Gender, IncomeRange, MemberDraft, NewGroup,
    UserId,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// =============================================================================
// PATTERNS
// =============================================================================

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

fn cep_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{5}-?[0-9]{3}$").expect("CEP pattern compiles"))
}

/// Loose `local@domain.tld` check.
#[must_use]
pub fn validate_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// CEP in `NNNNN-NNN` or `NNNNNNNN` form.
#[must_use]
pub fn validate_cep(cep: &str) -> bool {
    cep_regex().is_match(cep)
}

// =============================================================================
// FIELD HELPERS
// =============================================================================

/// Trim a field, mapping blank to `None` and enforcing the length limit.
fn optional(field: &'static str, value: Option<&str>) -> Result<Option<String>, CadastroError> {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if v.len() > MAX_FIELD_LENGTH {
        return Err(CadastroError::FieldTooLong(field));
    }
    Ok(Some(v.to_string()))
}

fn required(field: &'static str, value: Option<&str>) -> Result<String, CadastroError> {
    optional(field, value)?.ok_or(CadastroError::MissingField(field))
}

fn checked_cep(value: Option<&str>) -> Result<Option<String>, CadastroError> {
    match optional("cep", value)? {
        Some(cep) if !validate_cep(&cep) => Err(CadastroError::InvalidCep(cep)),
        other => Ok(other),
    }
}

fn select<T>(
    field: &'static str,
    value: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, CadastroError> {
    match optional(field, value)? {
        None => Ok(None),
        Some(label) => parse(&label)
            .map(Some)
            .ok_or(CadastroError::InvalidOption {
                field,
                value: label,
            }),
    }
}

// =============================================================================
// GROUP FORM
// =============================================================================

/// The "Informações do Grupo" section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub representative_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub has_headquarters: bool,
    #[serde(default)]
    pub address_line: Option<String>,
    #[serde(default)]
    pub cep: Option<String>,
}

impl GroupForm {
    /// Validate the section and build the insert payload for `user_id`.
    ///
    /// The address is only kept when the group has its own headquarters and
    /// at least one of its fields is filled in.
    pub fn validate(&self, user_id: UserId) -> Result<NewGroup, CadastroError> {
        let name = required("name", self.name.as_deref())?;
        let representative_name =
            required("representative_name", self.representative_name.as_deref())?;
        let contact_email = required("contact_email", self.contact_email.as_deref())?;
        if !validate_email(&contact_email) {
            return Err(CadastroError::InvalidEmail(contact_email));
        }

        let address = if self.has_headquarters {
            Some(Address {
                address_line: optional("address_line", self.address_line.as_deref())?,
                cep: checked_cep(self.cep.as_deref())?,
            })
            .filter(|a| !a.is_blank())
        } else {
            None
        };

        Ok(NewGroup {
            user_id,
            name,
            representative_name,
            contact_email,
            has_headquarters: self.has_headquarters,
            address,
        })
    }
}

// =============================================================================
// MEMBER FORM
// =============================================================================

/// The "Cadastro dos Membros" section, one member at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberForm {
    pub full_name: Option<String>,
    pub birth_date: Option<String>,
    pub mother_name: Option<String>,
    pub address_line: Option<String>,
    pub cep: Option<String>,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub rg: Option<String>,
    pub mei_cnpj: Option<String>,
    pub gender: Option<String>,
    pub ethnicity: Option<String>,
    pub education: Option<String>,
    pub household_count: Option<u32>,
    pub role_in_group: Option<String>,
    pub products_services: Option<String>,
    pub raw_materials: Option<String>,
    pub monthly_income_range: Option<String>,
    pub solidarity_involvement: Option<String>,
    pub develops_other: bool,
    pub other_occupation: Option<String>,
}

impl MemberForm {
    /// Validate one member.
    ///
    /// Full name and a checksum-valid CPF are required; the CPF is stored as
    /// its bare digits. `other_occupation` is dropped unless `develops_other`
    /// is set.
    pub fn validate(&self) -> Result<MemberDraft, CadastroError> {
        let full_name = required("full_name", self.full_name.as_deref())?;
        let raw_cpf = required("cpf", self.cpf.as_deref())?;
        let cpf = Cpf::parse(&raw_cpf)?;

        let email = optional("email", self.email.as_deref())?;
        if let Some(e) = &email {
            if !validate_email(e) {
                return Err(CadastroError::InvalidEmail(e.clone()));
            }
        }

        let other_occupation = if self.develops_other {
            optional("other_occupation", self.other_occupation.as_deref())?
        } else {
            None
        };

        Ok(MemberDraft {
            full_name,
            birth_date: optional("birth_date", self.birth_date.as_deref())?,
            mother_name: optional("mother_name", self.mother_name.as_deref())?,
            address: Address {
                address_line: optional("address_line", self.address_line.as_deref())?,
                cep: checked_cep(self.cep.as_deref())?,
            },
            cpf: cpf.digits().to_string(),
            phone: optional("phone", self.phone.as_deref())?,
            email,
            rg: optional("rg", self.rg.as_deref())?,
            mei_cnpj: optional("mei_cnpj", self.mei_cnpj.as_deref())?,
            gender: select("gender", self.gender.as_deref(), Gender::from_label)?,
            ethnicity: select("ethnicity", self.ethnicity.as_deref(), Ethnicity::from_label)?,
            education: select("education", self.education.as_deref(), Education::from_label)?,
            household_count: self.household_count,
            role_in_group: optional("role_in_group", self.role_in_group.as_deref())?,
            products_services: optional("products_services", self.products_services.as_deref())?,
            raw_materials: optional("raw_materials", self.raw_materials.as_deref())?,
            monthly_income_range: select(
                "monthly_income_range",
                self.monthly_income_range.as_deref(),
                IncomeRange::from_label,
            )?,
            solidarity_involvement: optional(
                "solidarity_involvement",
                self.solidarity_involvement.as_deref(),
            )?,
            other_occupation,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn group_form() -> GroupForm {
        GroupForm {
            name: Some("Padaria Solidária".into()),
            representative_name: Some("Ana Souza".into()),
            contact_email: Some("ana@padaria.org".into()),
            ..GroupForm::default()
        }
    }

    fn member_form() -> MemberForm {
        MemberForm {
            full_name: Some("João da Silva".into()),
            cpf: Some("529.982.247-25".into()),
            ..MemberForm::default()
        }
    }

    #[test]
    fn email_pattern() {
        assert!(validate_email("a@b.co"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("a b@c.d"));
        assert!(!validate_email(""));
    }

    #[test]
    fn cep_pattern() {
        assert!(validate_cep("01310-100"));
        assert!(validate_cep("01310100"));
        assert!(!validate_cep("0131-0100"));
        assert!(!validate_cep("01310-10"));
    }

    #[test]
    fn group_requires_name() {
        let form = GroupForm {
            name: Some("   ".into()),
            ..group_form()
        };
        let err = form.validate(UserId::new("u1")).expect_err("blank name");
        assert!(matches!(err, CadastroError::MissingField("name")));
    }

    #[test]
    fn group_rejects_bad_email() {
        let form = GroupForm {
            contact_email: Some("not-an-email".into()),
            ..group_form()
        };
        assert!(matches!(
            form.validate(UserId::new("u1")),
            Err(CadastroError::InvalidEmail(_))
        ));
    }

    #[test]
    fn address_dropped_without_headquarters() {
        let form = GroupForm {
            address_line: Some("Rua A, 1".into()),
            cep: Some("01310-100".into()),
            ..group_form()
        };
        let group = form.validate(UserId::new("u1")).expect("valid");
        assert!(!group.has_headquarters);
        assert_eq!(group.address, None);
    }

    #[test]
    fn address_kept_with_headquarters() {
        let form = GroupForm {
            has_headquarters: true,
            address_line: Some("Rua A, 1".into()),
            cep: Some("01310-100".into()),
            ..group_form()
        };
        let group = form.validate(UserId::new("u1")).expect("valid");
        let address = group.address.expect("address");
        assert_eq!(address.cep.as_deref(), Some("01310-100"));
    }

    #[test]
    fn blank_headquarters_address_dropped() {
        let form = GroupForm {
            has_headquarters: true,
            address_line: Some("  ".into()),
            cep: None,
            ..group_form()
        };
        let group = form.validate(UserId::new("u1")).expect("valid");
        assert!(group.has_headquarters);
        assert_eq!(group.address, None);
    }

    #[test]
    fn member_email_checked_when_given() {
        let form = MemberForm {
            email: Some("joao@".into()),
            ..member_form()
        };
        assert!(matches!(form.validate(), Err(CadastroError::InvalidEmail(_))));

        let form = MemberForm {
            email: Some("   ".into()),
            ..member_form()
        };
        assert_eq!(form.validate().expect("blank is optional").email, None);
    }

    #[test]
    fn headquarters_cep_checked() {
        let form = GroupForm {
            has_headquarters: true,
            cep: Some("123".into()),
            ..group_form()
        };
        assert!(matches!(
            form.validate(UserId::new("u1")),
            Err(CadastroError::InvalidCep(_))
        ));
    }

    #[test]
    fn member_requires_valid_cpf() {
        let form = MemberForm {
            cpf: Some("529.982.247-24".into()),
            ..member_form()
        };
        assert!(matches!(form.validate(), Err(CadastroError::InvalidCpf(_))));

        let form = MemberForm {
            cpf: None,
            ..member_form()
        };
        assert!(matches!(
            form.validate(),
            Err(CadastroError::MissingField("cpf"))
        ));
    }

    #[test]
    fn member_requires_name() {
        let form = MemberForm {
            full_name: None,
            ..member_form()
        };
        assert!(matches!(
            form.validate(),
            Err(CadastroError::MissingField("full_name"))
        ));
    }

    #[test]
    fn member_cpf_stored_as_digits() {
        let draft = member_form().validate().expect("valid");
        assert_eq!(draft.cpf, "52998224725");
    }

    #[test]
    fn other_occupation_requires_flag() {
        let form = MemberForm {
            other_occupation: Some("Costureira".into()),
            ..member_form()
        };
        assert_eq!(form.validate().expect("valid").other_occupation, None);

        let form = MemberForm {
            develops_other: true,
            other_occupation: Some("Costureira".into()),
            ..member_form()
        };
        assert_eq!(
            form.validate().expect("valid").other_occupation.as_deref(),
            Some("Costureira")
        );
    }

    #[test]
    fn selects_parse_labels() {
        let form = MemberForm {
            gender: Some("Não-Binário".into()),
            monthly_income_range: Some("até 1 salário mínimo".into()),
            education: Some("".into()),
            ..member_form()
        };
        let draft = form.validate().expect("valid");
        assert_eq!(draft.gender, Some(Gender::NonBinary));
        assert_eq!(draft.monthly_income_range, Some(IncomeRange::UpToOne));
        assert_eq!(draft.education, None);

        let form = MemberForm {
            ethnicity: Some("Azul".into()),
            ..member_form()
        };
        assert!(matches!(
            form.validate(),
            Err(CadastroError::InvalidOption {
                field: "ethnicity",
                ..
            })
        ));
    }

    #[test]
    fn oversized_field_rejected() {
        let form = MemberForm {
            mother_name: Some("x".repeat(MAX_FIELD_LENGTH + 1)),
            ..member_form()
        };
        assert!(matches!(
            form.validate(),
            Err(CadastroError::FieldTooLong("mother_name"))
        ));
    }
}
