//! # CPF Validator
//!
//! Checksum validation for the Brazilian individual taxpayer identifier.
//!
//! A CPF has nine base digits followed by two check digits. Each check digit
//! is a weighted sum of the digits before it, taken modulo 11:
//!
//! ```text
//! d10 = 11 - (sum(d[i] * (10 - i)) for i in 0..9)  mod 11
//! d11 = 11 - (sum(d[i] * (11 - i)) for i in 0..10) mod 11
//! ```
//!
//! where a result of 10 or 11 becomes 0.
//!
//! Punctuation is ignored: `529.982.247-25` and `52998224725` are the same
//! CPF. Any input that does not leave exactly 11 digits is invalid.
//!
//! Sequences of one repeated digit (`111.111.111-11`) satisfy the checksum
//! and are accepted by [`validate_cpf`]. Callers that want to reject them can
//! check [`Cpf::is_repeated_sequence`].

use crate::primitives::{CPF_BASE_LENGTH, CPF_LENGTH, CPF_MODULUS};
use crate::types::CadastroError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip everything that is not an ASCII digit.
#[must_use]
pub fn cpf_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Compute one check digit over `digits`.
///
/// Weights run from `digits.len() + 1` down to 2, so nine digits give the
/// first check digit and ten digits (base + first check) give the second.
/// Any length and any byte values are accepted; the sum is reduced modulo 11
/// as it goes, so it cannot overflow.
#[must_use]
pub fn check_digit(digits: &[u8]) -> u8 {
    let modulus = u64::from(CPF_MODULUS);
    let rem = digits
        .iter()
        .rev()
        .zip(2u64..)
        .fold(0u64, |acc, (&d, weight)| {
            (acc + u64::from(d) * (weight % modulus)) % modulus
        });

    match modulus - rem {
        10 | 11 => 0,
        rev => rev as u8,
    }
}

/// Decode the digit characters of `input` into values, if exactly 11 remain.
fn digit_values(input: &str) -> Option<[u8; CPF_LENGTH]> {
    let mut out = [0u8; CPF_LENGTH];
    let mut count = 0usize;
    for c in input.chars() {
        // to_digit only accepts ASCII digits, matching cpf_digits.
        let Some(d) = c.to_digit(10) else { continue };
        if count == CPF_LENGTH {
            return None;
        }
        out[count] = d as u8;
        count += 1;
    }
    (count == CPF_LENGTH).then_some(out)
}

fn checksum_matches(d: &[u8; CPF_LENGTH]) -> bool {
    let first = check_digit(&d[..CPF_BASE_LENGTH]);
    if first != d[CPF_BASE_LENGTH] {
        return false;
    }
    check_digit(&d[..CPF_BASE_LENGTH + 1]) == d[CPF_BASE_LENGTH + 1]
}

/// Validate a CPF.
///
/// Returns `true` only if exactly 11 digits remain after stripping non-digit
/// characters and both check digits match. Never panics.
#[must_use]
pub fn validate_cpf(input: &str) -> bool {
    digit_values(input).is_some_and(|d| checksum_matches(&d))
}

// =============================================================================
// VALIDATED NEWTYPE
// =============================================================================

/// A CPF that has passed [`validate_cpf`], stored as its 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parse and validate a CPF in any punctuation.
    pub fn parse(input: &str) -> Result<Self, CadastroError> {
        if validate_cpf(input) {
            Ok(Self(cpf_digits(input)))
        } else {
            Err(CadastroError::InvalidCpf(input.to_string()))
        }
    }

    /// The bare 11 digits.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// The conventional `NNN.NNN.NNN-NN` rendering.
    #[must_use]
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }

    /// True when all 11 digits are the same (e.g. `000.000.000-00`).
    ///
    /// These pass the checksum but are never issued.
    #[must_use]
    pub fn is_repeated_sequence(&self) -> bool {
        let bytes = self.0.as_bytes();
        bytes.iter().all(|b| Some(b) == bytes.first())
    }
}

impl TryFrom<String> for Cpf {
    type Error = CadastroError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_valid_cpf() {
        assert!(validate_cpf("529.982.247-25"));
        assert!(validate_cpf("52998224725"));
    }

    #[test]
    fn wrong_check_digits() {
        assert!(!validate_cpf("529.982.247-24"));
        assert!(!validate_cpf("529.982.247-35"));
    }

    #[test]
    fn wrong_length() {
        assert!(!validate_cpf(""));
        assert!(!validate_cpf("5299822472"));
        assert!(!validate_cpf("529982247250"));
        assert!(!validate_cpf("abc.def.ghi-jk"));
    }

    #[test]
    fn check_digit_known_values() {
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7]), 2);
        assert_eq!(check_digit(&[5, 2, 9, 9, 8, 2, 2, 4, 7, 2]), 5);
        assert_eq!(check_digit(&[]), 0);
    }

    #[test]
    fn check_digit_handles_long_and_out_of_range_input() {
        let long = vec![u8::MAX; 100_000];
        assert!(check_digit(&long) <= 9);
        assert!(check_digit(&[200, 255, 10, 99]) <= 9);
    }

    #[test]
    fn repeated_digits_pass_checksum() {
        assert!(validate_cpf("111.111.111-11"));
        let cpf = Cpf::parse("111.111.111-11").expect("checksum holds");
        assert!(cpf.is_repeated_sequence());
    }

    #[test]
    fn non_ascii_digits_are_ignored() {
        // Arabic-Indic digits are not CPF digits.
        assert!(!validate_cpf("٥٢٩٩٨٢٢٤٧٢٥"));
        assert!(validate_cpf("CPF: 529 982 247 25 ٥"));
    }

    #[test]
    fn check_digit_maps_ten_and_eleven_to_zero() {
        // sum = 1*10 = 10 -> 11 - 10 = 1
        assert_eq!(check_digit(&[1, 0, 0, 0, 0, 0, 0, 0, 0]), 1);
        // all zeros: sum 0 -> 11 - 0 = 11 -> 0
        assert_eq!(check_digit(&[0; 9]), 0);
        // sum = 10 + 0 ... with 1 at weight 2: sum 2 -> 11 - 2 = 9
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 1]), 9);
        // sum = 1 at weight 10 and 1 at weight 2 -> 12 % 11 = 1 -> 10 -> 0
        assert_eq!(check_digit(&[1, 0, 0, 0, 0, 0, 0, 0, 1]), 0);
    }

    #[test]
    fn formatted_rendering() {
        let cpf = Cpf::parse("52998224725").expect("valid");
        assert_eq!(cpf.formatted(), "529.982.247-25");
        assert_eq!(cpf.digits(), "52998224725");
        assert!(!cpf.is_repeated_sequence());
    }

    #[test]
    fn parse_rejects_invalid() {
        let err = Cpf::parse("123.456.789-00").expect_err("invalid");
        assert!(matches!(err, CadastroError::InvalidCpf(_)));
    }
}
