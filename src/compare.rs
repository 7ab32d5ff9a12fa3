//! Side-by-side comparison of two requests.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::csr::params::Subject;
use crate::csr::{SignatureAlgorithm, parse};
use crate::error::Result;
use crate::key::KeyAlgorithm;

/// A value that differs between the two requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difference<T> {
    pub csr1: T,
    pub csr2: T,
}

/// Differences outside the subject. Only differing fields are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OtherDifferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key_algorithm: Option<Difference<KeyAlgorithm>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<Difference<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<Difference<SignatureAlgorithm>>,
}

impl OtherDifferences {
    pub fn is_empty(&self) -> bool {
        self.public_key_algorithm.is_none()
            && self.key_size.is_none()
            && self.signature_algorithm.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrComparison {
    /// Keyed by attribute mnemonic; `None` where one side lacks the attribute.
    pub subject_differences: BTreeMap<String, Difference<Option<String>>>,
    pub other_differences: OtherDifferences,
    pub are_identical: bool,
}

fn differ<T: PartialEq>(csr1: T, csr2: T) -> Option<Difference<T>> {
    (csr1 != csr2).then_some(Difference { csr1, csr2 })
}

/// All values of `key`, comma separated; repeated RDNs compare as a whole.
fn joined(subject: &Subject, key: &str) -> Option<String> {
    let values = subject.get_all(key);
    (!values.is_empty()).then(|| values.join(", "))
}

/// Parses both requests and reports how they differ.
///
/// Either request failing to parse or verify fails the comparison.
pub fn compare(csr1: impl AsRef<[u8]>, csr2: impl AsRef<[u8]>) -> Result<CsrComparison> {
    let left = parse(csr1)?;
    let right = parse(csr2)?;

    let keys: BTreeSet<&str> = left
        .subject
        .iter()
        .chain(right.subject.iter())
        .map(|(k, _)| k)
        .collect();

    let subject_differences: BTreeMap<_, _> = keys
        .into_iter()
        .filter_map(|key| {
            differ(joined(&left.subject, key), joined(&right.subject, key))
            .map(|diff| (key.to_string(), diff))
        })
        .collect();

    let other_differences = OtherDifferences {
        public_key_algorithm: differ(left.public_key_algorithm, right.public_key_algorithm),
        key_size: differ(left.key_size_bits, right.key_size_bits),
        signature_algorithm: differ(left.signature_algorithm, right.signature_algorithm),
    };

    Ok(CsrComparison {
        are_identical: subject_differences.is_empty() && other_differences.is_empty(),
        subject_differences,
        other_differences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csr::build_request;
    use crate::csr::params::SubjectProfile;
    use crate::error::CsrKitError;
    use crate::key::KeyPair;

    fn profile(cn: &str) -> SubjectProfile {
        SubjectProfile::builder()
            .common_name(cn.to_string())
            .organization("Test Org".to_string())
            .country("US".to_string())
            .build()
    }

    #[test]
    fn same_subject_and_key_type_is_identical() {
        let a = build_request(&profile("a.example.com"), &KeyPair::generate_ecdsa_p256()).unwrap();
        let b = build_request(&profile("a.example.com"), &KeyPair::generate_ecdsa_p256()).unwrap();
        let result = compare(a.to_der().unwrap(), b.to_pem().unwrap()).unwrap();
        assert!(result.are_identical);
        assert!(result.subject_differences.is_empty());
    }

    #[test]
    fn reports_each_difference() {
        let mut with_ou = profile("b.example.com");
        with_ou.organizational_unit = Some("Ops".to_string());
        let a = build_request(&profile("a.example.com"), &KeyPair::generate_ecdsa_p256()).unwrap();
        let b = build_request(&with_ou, &KeyPair::generate_ed25519()).unwrap();

        let result = compare(a.to_der().unwrap(), b.to_der().unwrap()).unwrap();
        assert!(!result.are_identical);
        assert_eq!(
            result.subject_differences["CN"],
            Difference {
                csr1: Some("a.example.com".to_string()),
                csr2: Some("b.example.com".to_string())
            }
        );
        assert_eq!(result.subject_differences["OU"].csr1, None);
        assert!(!result.subject_differences.contains_key("O"));
        assert!(result.other_differences.key_size.is_none());
        assert_eq!(
            result.other_differences.signature_algorithm,
            Some(Difference {
                csr1: SignatureAlgorithm::Sha256WithECDSA,
                csr2: SignatureAlgorithm::Ed25519
            })
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["other_differences"]["signature_algorithm"]["csr2"], "ED25519");
        assert!(json["other_differences"].get("key_size").is_none());
    }

    #[test]
    fn parse_errors_propagate() {
        let a = build_request(&profile("a.example.com"), &KeyPair::generate_ed25519()).unwrap();
        assert!(matches!(
            compare(a.to_der().unwrap(), "not a csr"),
            Err(CsrKitError::MalformedInput(_))
        ));
    }
}
