//! Phone number validation and formatting.
//!
//! Two families of input are accepted:
//!
//! - **Domestic** (Russian-style): the cleaned input starts with `+7`, `7` or
//!   `8` and carries exactly 11 digits. These are rendered as
//!   `+7 (XXX) XXX-XX-XX`.
//! - **International**: the cleaned input starts with `+` followed by 10 to
//!   15 digits. These are kept exactly as typed; no pretty-printing is done.
//!
//! "Cleaned" means every character except ASCII digits and `+` is dropped,
//! so `8 (999) 123-45-67` and `+7-999-123-4567` are both domestic numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a domestic number, country code included.
const DOMESTIC_DIGITS: usize = 11;

/// Allowed digit count after the `+` of an international number.
const INTERNATIONAL_DIGITS: core::ops::RangeInclusive<usize> = 10..=15;

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty or whitespace only.
    #[error("phone number cannot be empty")]
    Empty,
    /// A `+7`/`7`/`8` number without exactly 11 digits.
    #[error("domestic phone number must have 11 digits (got {digits})")]
    DomesticLength {
        /// Digits found in the input.
        digits: usize,
    },
    /// A `+` number with too few or too many digits.
    #[error("international phone number must have 10 to 15 digits after '+' (got {digits})")]
    InternationalLength {
        /// Digits found after the `+`.
        digits: usize,
    },
    /// Neither a domestic nor an international number.
    #[error("phone number must start with +7, 7, 8 or an international '+' prefix")]
    UnrecognizedFormat,
}

/// Which accepted family a phone number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhoneFamily {
    Domestic,
    International,
}

/// A validated phone number.
///
/// Holds both the display form (formatted for domestic numbers, verbatim for
/// international ones) and the digits-only comparison key.
///
/// ## Examples
///
/// ```
/// use tablecrm_pos_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("8 999 123 45 67").unwrap();
/// assert_eq!(phone.as_str(), "+7 (999) 123-45-67");
/// assert_eq!(phone.digits(), "89991234567");
///
/// assert!(PhoneNumber::parse("+44 20 7946 0958").is_ok());
/// assert!(PhoneNumber::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PhoneNumber {
    display: String,
    digits: String,
    family: PhoneFamily,
}

impl PhoneNumber {
    /// Parse a `PhoneNumber` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or matches neither accepted
    /// family (see the module docs).
    pub fn parse(raw: &str) -> Result<Self, PhoneError> {
        let family = classify(raw)?;
        Ok(Self {
            display: format(raw),
            digits: digits(raw),
            family,
        })
    }

    /// The display form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// The digits-only comparison key.
    #[must_use]
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Which family the number was recognized as.
    #[must_use]
    pub const fn family(&self) -> PhoneFamily {
        self.family
    }

    /// Whether both values denote the same number, however they were typed.
    ///
    /// Domestic numbers ignore the `+7`/`7`/`8` trunk prefix; international
    /// numbers compare digits only, so spacing and punctuation do not matter.
    #[must_use]
    pub fn same_number(&self, other: &Self) -> bool {
        match (self.family, other.family) {
            (PhoneFamily::Domestic, PhoneFamily::Domestic) => {
                self.digits.get(1..) == other.digits.get(1..)
            }
            (PhoneFamily::International, PhoneFamily::International) => {
                self.digits == other.digits
            }
            _ => false,
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.display
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.display
    }
}

/// Returns `true` when `raw` is an acceptable phone number.
#[must_use]
pub fn validate(raw: &str) -> bool {
    classify(raw).is_ok()
}

/// Formats a domestic number as `+7 (XXX) XXX-XX-XX`.
///
/// Any other input is returned unchanged.
#[must_use]
pub fn format(raw: &str) -> String {
    format_domestic(&digits(raw)).unwrap_or_else(|| raw.to_owned())
}

/// Digits-only form of `raw`, used to compare numbers.
#[must_use]
pub fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn classify(raw: &str) -> Result<PhoneFamily, PhoneError> {
    if raw.trim().is_empty() {
        return Err(PhoneError::Empty);
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.starts_with("+7") || cleaned.starts_with('7') || cleaned.starts_with('8') {
        let count = digits(&cleaned).len();
        return if count == DOMESTIC_DIGITS {
            Ok(PhoneFamily::Domestic)
        } else {
            Err(PhoneError::DomesticLength { digits: count })
        };
    }

    if let Some(rest) = cleaned.strip_prefix('+') {
        let count = digits(rest).len();
        return if INTERNATIONAL_DIGITS.contains(&count) {
            Ok(PhoneFamily::International)
        } else {
            Err(PhoneError::InternationalLength { digits: count })
        };
    }

    Err(PhoneError::UnrecognizedFormat)
}

fn format_domestic(digits: &str) -> Option<String> {
    if digits.len() != DOMESTIC_DIGITS || !(digits.starts_with('7') || digits.starts_with('8')) {
        return None;
    }

    Some(format!(
        "+7 ({}) {}-{}-{}",
        digits.get(1..4)?,
        digits.get(4..7)?,
        digits.get(7..9)?,
        digits.get(9..11)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_domestic_prefixes() {
        assert!(validate("+79991234567"));
        assert!(validate("79991234567"));
        assert!(validate("89991234567"));
        assert!(validate("+7 (999) 123-45-67"));
        assert!(validate("8-999-123-45-67"));
    }

    #[test]
    fn test_validate_domestic_wrong_length() {
        assert!(!validate("+7999123456"));
        assert!(!validate("899912345678"));
        assert_eq!(
            classify("7999"),
            Err(PhoneError::DomesticLength { digits: 4 })
        );
    }

    #[test]
    fn test_validate_international() {
        assert!(validate("+44 20 7946 0958"));
        assert!(validate("+380501234567"));
        assert!(validate("+123456789012345"));
        assert!(!validate("+123456789"));
        assert!(!validate("+1234567890123456"));
    }

    #[test]
    fn test_validate_rejects_other_shapes() {
        assert!(!validate(""));
        assert!(!validate("   "));
        assert!(!validate("abc"));
        assert!(!validate("9991234567"));
        assert!(!validate("0 999 123 45 67"));
        assert_eq!(classify(""), Err(PhoneError::Empty));
        assert_eq!(classify("hello"), Err(PhoneError::UnrecognizedFormat));
    }

    #[test]
    fn test_plus_seven_with_extra_digits_is_not_international() {
        // A +7 number is always judged by the domestic rule.
        assert!(!validate("+799912345678"));
    }

    #[test]
    fn test_format_domestic() {
        assert_eq!(format("+79991234567"), "+7 (999) 123-45-67");
        assert_eq!(format("89991234567"), "+7 (999) 123-45-67");
        assert_eq!(format("7 999 123 45 67"), "+7 (999) 123-45-67");
    }

    #[test]
    fn test_format_passes_other_input_through() {
        assert_eq!(format("+44 20 7946 0958"), "+44 20 7946 0958");
        assert_eq!(format("12345"), "12345");
        assert_eq!(format(""), "");
    }

    #[test]
    fn test_digits() {
        assert_eq!(digits("+7 (999) 123-45-67"), "79991234567");
        assert_eq!(digits("no digits"), "");
    }

    #[test]
    fn test_phone_number_parse() {
        let phone = PhoneNumber::parse("+7 999 123 45 67").expect("valid phone");
        assert_eq!(phone.as_str(), "+7 (999) 123-45-67");
        assert_eq!(phone.digits(), "79991234567");
        assert_eq!(phone.family(), PhoneFamily::Domestic);

        let intl = PhoneNumber::parse("+44 20 7946 0958").expect("valid phone");
        assert_eq!(intl.as_str(), "+44 20 7946 0958");
        assert_eq!(intl.family(), PhoneFamily::International);
    }

    #[test]
    fn test_same_number_ignores_spelling() {
        let parse = |raw: &str| PhoneNumber::parse(raw).expect("valid phone");

        assert!(parse("+44 20 7946 0958").same_number(&parse("+442079460958")));
        assert!(parse("8 (999) 123-45-67").same_number(&parse("+79991234567")));
        assert!(!parse("+79991234567").same_number(&parse("+79991234568")));
        assert!(!parse("+442079460958").same_number(&parse("+442079460959")));
    }

    #[test]
    fn test_phone_number_serde() {
        let phone: PhoneNumber = serde_json::from_str("\"89991234567\"").expect("deserialize");
        assert_eq!(
            serde_json::to_string(&phone).expect("serialize"),
            "\"+7 (999) 123-45-67\""
        );
        assert!(serde_json::from_str::<PhoneNumber>("\"123\"").is_err());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: every domestic number validates and formats canonically.
            #[test]
            fn domestic_numbers_validate_and_format(
                prefix in prop::sample::select(vec!["+7", "7", "8"]),
                body in "[0-9]{10}",
                separator in prop::sample::select(vec!["", " ", "-"]),
            ) {
                let raw = format!("{prefix}{separator}{body}");
                prop_assert!(validate(&raw));

                let expected = format!(
                    "+7 ({}) {}-{}-{}",
                    &body[0..3],
                    &body[3..6],
                    &body[6..8],
                    &body[8..10]
                );
                prop_assert_eq!(format(&raw), expected);
            }

            /// Property: digit strings outside both families never validate.
            #[test]
            fn numbers_without_known_prefix_are_invalid(raw in "[0-69][0-9]{0,20}") {
                prop_assert!(!validate(&raw));
            }

            /// Property: short international numbers never validate.
            #[test]
            fn short_international_numbers_are_invalid(raw in "\\+[0-689][0-9]{0,8}") {
                prop_assert!(!validate(&raw));
            }

            /// Property: input without any digit never validates.
            #[test]
            fn text_without_digits_is_invalid(raw in "[a-zA-Z +()-]{0,30}") {
                prop_assert!(!validate(&raw));
            }
        }
    }
}
