//! Filename identity parsing.
//!
//! Statement filenames carry patient identity on the wire:
//! `<lastname>_<YYYY>_<digits>.pdf`, e.g. `smith_1984_5550123456.pdf`.
//! [`parse_file_name`] turns one into a normalized [`Identity`] or a
//! structured rejection. Parsing is a pure function of the filename and
//! the [`IdentityPolicy`]; the current year is injected through the
//! policy, never read from a clock here.

use thiserror::Error;

use crate::models::Identity;

/// Digit count and year bounds applied when parsing and validating.
///
/// The same policy is shared by the ingestion parser and the search
/// validator so both sides of the system agree on what an identity is.
#[derive(Debug, Clone, Copy)]
pub struct IdentityPolicy {
    /// Exact length of the contact segment.
    pub contact_digits: usize,
    /// Lowest accepted birth year.
    pub min_year: i32,
    /// Highest accepted birth year, supplied by the caller.
    pub current_year: i32,
}

impl IdentityPolicy {
    /// Default bounds (10 contact digits, years from 1900) for the given
    /// current year.
    pub fn for_year(current_year: i32) -> Self {
        Self {
            contact_digits: 10,
            min_year: 1900,
            current_year,
        }
    }
}

/// Why a filename was rejected.
///
/// Syntax errors and out-of-range years are distinct variants so callers
/// can report them separately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRejection {
    #[error("'{name}' does not match <lastname>_<year>_<contact>.pdf")]
    MalformedFileName { name: String },
    #[error("'{name}' has birth year {year} outside {min}..={max}")]
    YearOutOfRange {
        name: String,
        year: i32,
        min: i32,
        max: i32,
    },
}

/// Parse a statement filename into a normalized [`Identity`].
///
/// The grammar is `<letters>+ "_" <4 digits> "_" <N digits> ".pdf"` with
/// N taken from the policy. Letters and the extension are accepted in any
/// case; the last name comes out first-upper, rest-lower. Any structural
/// deviation yields [`ParseRejection::MalformedFileName`]; a well-formed
/// name whose year falls outside `[min_year, current_year]` yields
/// [`ParseRejection::YearOutOfRange`].
///
/// # Example
///
/// ```rust
/// use statement_vault::identity::{parse_file_name, IdentityPolicy};
///
/// let policy = IdentityPolicy::for_year(2026);
/// let identity = parse_file_name("sMITH_1984_5550123456.pdf", &policy).unwrap();
/// assert_eq!(identity.last_name, "Smith");
/// assert_eq!(identity.birth_year, 1984);
/// assert_eq!(identity.contact_digits, "5550123456");
/// ```
pub fn parse_file_name(name: &str, policy: &IdentityPolicy) -> Result<Identity, ParseRejection> {
    let malformed = || ParseRejection::MalformedFileName {
        name: name.to_string(),
    };

    let stem = strip_pdf_extension(name).ok_or_else(malformed)?;

    let mut segments = stem.split('_');
    let (raw_name, raw_year, raw_contact) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(n), Some(y), Some(c), None) => (n, y, c),
        _ => return Err(malformed()),
    };

    if raw_name.is_empty() || !raw_name.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(malformed());
    }
    if raw_year.len() != 4 || !raw_year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    if raw_contact.len() != policy.contact_digits
        || !raw_contact.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(malformed());
    }

    let year: i32 = raw_year.parse().map_err(|_| malformed())?;
    if year < policy.min_year || year > policy.current_year {
        return Err(ParseRejection::YearOutOfRange {
            name: name.to_string(),
            year,
            min: policy.min_year,
            max: policy.current_year,
        });
    }

    Ok(Identity {
        last_name: normalize_last_name(raw_name),
        birth_year: year,
        contact_digits: raw_contact.to_string(),
    })
}

/// Normalized filename reconstruction for an identity.
///
/// Parsing the reconstruction under the same policy yields the identity
/// back unchanged.
pub fn canonical_file_name(identity: &Identity) -> String {
    format!(
        "{}_{:04}_{}.pdf",
        identity.last_name, identity.birth_year, identity.contact_digits
    )
}

/// Strip a case-insensitive `.pdf` extension, if present.
fn strip_pdf_extension(name: &str) -> Option<&str> {
    let stem_len = name.len().checked_sub(4)?;
    if !name.is_char_boundary(stem_len) {
        return None;
    }
    let (stem, ext) = name.split_at(stem_len);
    ext.eq_ignore_ascii_case(".pdf").then_some(stem)
}

fn normalize_last_name(raw: &str) -> String {
    let mut normalized = raw.to_ascii_lowercase();
    if let Some(first) = normalized.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> IdentityPolicy {
        IdentityPolicy {
            contact_digits: 10,
            min_year: 1900,
            current_year: 2024,
        }
    }

    // Four contact digits keep the short fixtures readable.
    fn short_policy() -> IdentityPolicy {
        IdentityPolicy {
            contact_digits: 4,
            min_year: 1900,
            current_year: 2024,
        }
    }

    #[test]
    fn parses_well_formed_name() {
        let identity = parse_file_name("smith_1984_5550123456.pdf", &policy()).unwrap();
        assert_eq!(identity.last_name, "Smith");
        assert_eq!(identity.birth_year, 1984);
        assert_eq!(identity.contact_digits, "5550123456");
    }

    #[test]
    fn normalizes_mixed_case() {
        let upper = parse_file_name("Smith_1923_6778.pdf", &short_policy()).unwrap();
        let shouting = parse_file_name("sMITH_1923_6778.pdf", &short_policy()).unwrap();
        assert_eq!(upper, shouting);
        assert_eq!(upper.last_name, "Smith");
        assert_eq!(upper.birth_year, 1923);
        assert_eq!(upper.contact_digits, "6778");
    }

    #[test]
    fn accepts_uppercase_extension() {
        let identity = parse_file_name("VANDERBERG_1950_0123456789.PDF", &policy()).unwrap();
        assert_eq!(identity.last_name, "Vanderberg");
    }

    #[test]
    fn reconstruction_reparses_to_same_identity() {
        let identity = parse_file_name("mCdOwElL_1971_5550009999.pdf", &policy()).unwrap();
        let reconstructed = canonical_file_name(&identity);
        assert_eq!(reconstructed, "Mcdowell_1971_5550009999.pdf");
        let reparsed = parse_file_name(&reconstructed, &policy()).unwrap();
        assert_eq!(identity, reparsed);
    }

    #[test]
    fn rejects_year_before_minimum() {
        match parse_file_name("smith_1899_6778.pdf", &short_policy()) {
            Err(ParseRejection::YearOutOfRange {
                name,
                year,
                min,
                max,
            }) => {
                assert_eq!(name, "smith_1899_6778.pdf");
                assert_eq!(year, 1899);
                assert_eq!(min, 1900);
                assert_eq!(max, 2024);
            }
            other => panic!("expected YearOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn rejects_future_year() {
        assert!(matches!(
            parse_file_name("smith_2025_6778.pdf", &short_policy()),
            Err(ParseRejection::YearOutOfRange { year: 2025, .. })
        ));
    }

    #[test]
    fn accepts_boundary_years() {
        assert!(parse_file_name("smith_1900_6778.pdf", &short_policy()).is_ok());
        assert!(parse_file_name("smith_2024_6778.pdf", &short_policy()).is_ok());
    }

    #[test]
    fn rejects_malformed_names() {
        let cases = [
            "smith_23_6778.pdf",         // 2-digit year
            "smith_1923.pdf",            // missing contact segment
            "smith_jones_1923_6778.pdf", // extra separator
            "sm1th_1923_6778.pdf",       // digit in name
            "_1923_6778.pdf",            // empty name
            "smith_1923_677.pdf",        // contact too short
            "smith_1923_67789.pdf",      // contact too long
            "smith_1923_67a8.pdf",       // non-digit contact
            "smith_19a3_6778.pdf",       // non-digit year
            "smith-1923-6778.pdf",       // wrong separator
            "smith_1923_6778.txt",       // wrong extension
            "smith_1923_6778",           // no extension
            "smithé_1923_6778.pdf",      // non-ASCII name
            ".pdf",
            "",
        ];
        for case in cases {
            match parse_file_name(case, &short_policy()) {
                Err(ParseRejection::MalformedFileName { name }) => assert_eq!(name, case),
                other => panic!("{:?} should be malformed, got {:?}", case, other),
            }
        }
    }

    #[test]
    fn contact_digit_count_follows_policy() {
        assert!(parse_file_name("smith_1984_5550123456.pdf", &policy()).is_ok());
        assert!(matches!(
            parse_file_name("smith_1984_5550123456.pdf", &short_policy()),
            Err(ParseRejection::MalformedFileName { .. })
        ));
    }
}
