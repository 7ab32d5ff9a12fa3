//! Strength ratings for a request's key and signature algorithm.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::csr::DigestAlgorithm;
use crate::key::KeyAlgorithm;

/// Coarse strength rating, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Insecure,
    Weak,
    Acceptable,
    Good,
    Strong,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rating::Insecure => "insecure",
            Rating::Weak => "weak",
            Rating::Acceptable => "acceptable",
            Rating::Good => "good",
            Rating::Strong => "strong",
        })
    }
}

/// Rating given to each signature digest.
///
/// `ed25519` covers schemes that hash internally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestRatings {
    pub md5: Rating,
    pub sha1: Rating,
    pub sha224: Rating,
    pub sha256: Rating,
    pub sha384: Rating,
    pub sha512: Rating,
    pub ed25519: Rating,
}

impl Default for DigestRatings {
    fn default() -> Self {
        Self {
            md5: Rating::Insecure,
            sha1: Rating::Weak,
            sha224: Rating::Acceptable,
            sha256: Rating::Strong,
            sha384: Rating::Strong,
            sha512: Rating::Strong,
            ed25519: Rating::Strong,
        }
    }
}

impl DigestRatings {
    pub fn get(&self, digest: DigestAlgorithm) -> Rating {
        match digest {
            DigestAlgorithm::Md5 => self.md5,
            DigestAlgorithm::Sha1 => self.sha1,
            DigestAlgorithm::Sha224 => self.sha224,
            DigestAlgorithm::Sha256 => self.sha256,
            DigestAlgorithm::Sha384 => self.sha384,
            DigestAlgorithm::Sha512 => self.sha512,
            DigestAlgorithm::Intrinsic => self.ed25519,
        }
    }

    /// A digest may not outrate a stronger one of the same family.
    fn validate(&self) -> Result<(), String> {
        let chain = [
            (DigestAlgorithm::Md5, self.md5),
            (DigestAlgorithm::Sha1, self.sha1),
            (DigestAlgorithm::Sha224, self.sha224),
            (DigestAlgorithm::Sha256, self.sha256),
            (DigestAlgorithm::Sha384, self.sha384),
            (DigestAlgorithm::Sha512, self.sha512),
        ];
        for pair in chain.windows(2) {
            let ((weaker, weaker_rating), (stronger, stronger_rating)) = (pair[0], pair[1]);
            if weaker_rating > stronger_rating {
                return Err(format!(
                    "{} is rated {weaker_rating} but the stronger {} only {stronger_rating}",
                    weaker.name(),
                    stronger.name()
                ));
            }
        }
        Ok(())
    }
}

/// Thresholds used to rate keys and signature digests.
///
/// RSA moduli are rated directly. Elliptic-curve keys are rated by their
/// RSA-equivalent strength so one set of thresholds covers every key type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingPolicy {
    pub rsa_weak_below: usize,
    pub rsa_good_from: usize,
    pub rsa_strong_from: usize,
    pub p256_equivalent_bits: usize,
    pub p384_equivalent_bits: usize,
    pub ed25519_equivalent_bits: usize,
    pub digests: DigestRatings,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            rsa_weak_below: 2048,
            rsa_good_from: 3072,
            rsa_strong_from: 4096,
            p256_equivalent_bits: 3072,
            p384_equivalent_bits: 7680,
            ed25519_equivalent_bits: 3072,
            digests: DigestRatings::default(),
        }
    }
}

impl RatingPolicy {
    /// Thresholds must be strictly increasing and digest ratings must not
    /// drop as the digest gets stronger.
    pub fn validate(&self) -> Result<(), String> {
        if self.rsa_weak_below == 0 {
            return Err("rsa_weak_below must be positive".to_string());
        }
        if !(self.rsa_weak_below < self.rsa_good_from && self.rsa_good_from < self.rsa_strong_from) {
            return Err(format!(
                "RSA thresholds must increase: weak below {}, good from {}, strong from {}",
                self.rsa_weak_below, self.rsa_good_from, self.rsa_strong_from
            ));
        }
        self.digests.validate()
    }

    /// Bits compared against the RSA thresholds for this key.
    pub fn equivalent_bits(&self, algorithm: KeyAlgorithm, size_bits: usize) -> usize {
        match algorithm {
            KeyAlgorithm::Rsa => size_bits,
            KeyAlgorithm::EcdsaP256 => self.p256_equivalent_bits,
            KeyAlgorithm::EcdsaP384 => self.p384_equivalent_bits,
            KeyAlgorithm::Ed25519 => self.ed25519_equivalent_bits,
        }
    }

    pub fn rate_key(&self, algorithm: KeyAlgorithm, size_bits: usize) -> Rating {
        let bits = self.equivalent_bits(algorithm, size_bits);
        if bits < self.rsa_weak_below {
            Rating::Weak
        } else if bits < self.rsa_good_from {
            Rating::Acceptable
        } else if bits < self.rsa_strong_from {
            Rating::Good
        } else {
            Rating::Strong
        }
    }

    pub fn rate_digest(&self, digest: DigestAlgorithm) -> Rating {
        self.digests.get(digest)
    }

    /// Rates a key and signature digest together.
    pub fn assess(
        &self,
        algorithm: KeyAlgorithm,
        size_bits: usize,
        digest: DigestAlgorithm,
    ) -> SecurityAssessment {
        let key_rating = self.rate_key(algorithm, size_bits);
        let signature_rating = self.rate_digest(digest);

        let mut findings = Vec::new();
        if key_rating <= Rating::Weak {
            findings.push(format!(
                "{size_bits}-bit {} key is below the {}-bit minimum",
                algorithm.name(),
                self.rsa_weak_below
            ));
        }
        match signature_rating {
            Rating::Insecure => findings.push(format!(
                "{} signatures are broken and must not be used",
                digest.name()
            )),
            Rating::Weak => findings.push(format!("{} signatures are deprecated", digest.name())),
            _ => {}
        }

        SecurityAssessment {
            key_rating,
            signature_rating,
            overall_rating: key_rating.min(signature_rating),
            findings,
        }
    }
}

/// Ratings attached to a validation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityAssessment {
    pub key_rating: Rating,
    pub signature_rating: Rating,
    pub overall_rating: Rating,
    pub findings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_thresholds() {
        let policy = RatingPolicy::default();
        let cases = [
            (1024, Rating::Weak),
            (2047, Rating::Weak),
            (2048, Rating::Acceptable),
            (3072, Rating::Good),
            (4095, Rating::Good),
            (4096, Rating::Strong),
            (8192, Rating::Strong),
        ];
        for (bits, rating) in cases {
            assert_eq!(policy.rate_key(KeyAlgorithm::Rsa, bits), rating, "{bits}");
        }
    }

    #[test]
    fn curve_equivalents() {
        let policy = RatingPolicy::default();
        assert_eq!(policy.rate_key(KeyAlgorithm::EcdsaP256, 256), Rating::Good);
        assert_eq!(policy.rate_key(KeyAlgorithm::EcdsaP384, 384), Rating::Strong);
        assert_eq!(policy.rate_key(KeyAlgorithm::Ed25519, 256), Rating::Good);
    }

    #[test]
    fn overall_is_the_worse_rating() {
        let policy = RatingPolicy::default();
        let assessment = policy.assess(KeyAlgorithm::Rsa, 4096, DigestAlgorithm::Sha1);
        assert_eq!(assessment.key_rating, Rating::Strong);
        assert_eq!(assessment.signature_rating, Rating::Weak);
        assert_eq!(assessment.overall_rating, Rating::Weak);
        assert_eq!(assessment.findings.len(), 1);

        let assessment = policy.assess(KeyAlgorithm::Rsa, 1024, DigestAlgorithm::Md5);
        assert_eq!(assessment.overall_rating, Rating::Insecure);
        assert_eq!(assessment.findings.len(), 2);
    }

    #[test]
    fn policy_validation() {
        assert!(RatingPolicy::default().validate().is_ok());
        let policy = RatingPolicy {
            rsa_good_from: 2048,
            ..RatingPolicy::default()
        };
        assert!(policy.validate().is_err());

        let policy = RatingPolicy {
            digests: DigestRatings {
                sha1: Rating::Strong,
                ..DigestRatings::default()
            },
            ..RatingPolicy::default()
        };
        assert!(policy.validate().unwrap_err().contains("SHA-1"));
    }

    #[test]
    fn digest_ratings_follow_policy() {
        let policy = RatingPolicy::default();
        assert_eq!(policy.rate_digest(DigestAlgorithm::Md5), Rating::Insecure);
        assert_eq!(policy.rate_digest(DigestAlgorithm::Sha224), Rating::Acceptable);
        assert_eq!(policy.rate_digest(DigestAlgorithm::Intrinsic), Rating::Strong);

        let strict = RatingPolicy {
            digests: DigestRatings {
                sha1: Rating::Insecure,
                sha224: Rating::Weak,
                ..DigestRatings::default()
            },
            ..RatingPolicy::default()
        };
        strict.validate().unwrap();
        let assessment = strict.assess(KeyAlgorithm::Rsa, 4096, DigestAlgorithm::Sha224);
        assert_eq!(assessment.signature_rating, Rating::Weak);
        assert_eq!(assessment.overall_rating, Rating::Weak);
        assert_eq!(assessment.findings, vec!["SHA-224 signatures are deprecated"]);
    }

    #[test]
    fn ratings_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Acceptable).unwrap(), "\"acceptable\"");
        let policy: RatingPolicy = toml::from_str("rsa_strong_from = 8192").unwrap();
        assert_eq!(policy.rsa_strong_from, 8192);
        assert_eq!(policy.rsa_weak_below, 2048);
    }
}
