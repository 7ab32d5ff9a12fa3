pub mod builder;
pub mod extensions;
pub mod params;
pub mod parser;
pub mod request_info;

use std::fmt;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode};
use serde::Serialize;
use x509_cert::request::CertReq;
use x509_cert::spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use crate::error::{CsrKitError, Result};

pub use builder::{build, build_request};
pub use parser::{ParsedCsr, ValidationReport, parse, parse_der, validate};

/// PEM label of a PKCS#10 request.
pub const CSR_PEM_LABEL: &str = "CERTIFICATE REQUEST";
/// Label some older tools (Netscape, early OpenSSL) still write.
pub const LEGACY_CSR_PEM_LABEL: &str = "NEW CERTIFICATE REQUEST";

/// PKCS#1 signature OIDs (RFC 8017, appendix C).
mod oids {
    use const_oid::ObjectIdentifier;

    pub const MD5_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.4");
    pub const SHA1_WITH_RSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
    pub const SHA384_WITH_RSA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
    pub const SHA512_WITH_RSA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
    pub const SHA224_WITH_RSA: ObjectIdentifier =
        ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");
}

/// How a signature algorithm produces its signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFamily {
    RsaPkcs1,
    Ecdsa,
    Ed25519,
}

/// The message digest behind a signature algorithm.
///
/// `Intrinsic` stands for schemes that hash internally (Ed25519).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Intrinsic,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha224 => "SHA-224",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Intrinsic => "intrinsic",
        }
    }
}

/// Represents the signature algorithms a request may be signed with.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
/// Only the SHA-2 and Ed25519 variants are ever produced by the builder; the
/// MD5 and SHA-1 variants exist so legacy requests can be verified and rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// MD5 with RSA encryption.
    Md5WithRSA,
    /// SHA-1 with RSA encryption.
    Sha1WithRSA,
    /// SHA-224 with RSA encryption.
    Sha224WithRSA,
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-384 with RSA encryption.
    Sha384WithRSA,
    /// SHA-512 with RSA encryption.
    Sha512WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
    /// SHA-512 with ECDSA.
    Sha512WithECDSA,
    /// EdDSA over Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Md5WithRSA => oids::MD5_WITH_RSA,
            SignatureAlgorithm::Sha1WithRSA => oids::SHA1_WITH_RSA,
            SignatureAlgorithm::Sha224WithRSA => oids::SHA224_WITH_RSA,
            SignatureAlgorithm::Sha256WithRSA => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRSA => oids::SHA384_WITH_RSA,
            SignatureAlgorithm::Sha512WithRSA => oids::SHA512_WITH_RSA,
            SignatureAlgorithm::Sha256WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::Sha384WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Sha512WithECDSA => const_oid::db::rfc5912::ECDSA_WITH_SHA_512,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            SignatureAlgorithm::Md5WithRSA,
            SignatureAlgorithm::Sha1WithRSA,
            SignatureAlgorithm::Sha224WithRSA,
            SignatureAlgorithm::Sha256WithRSA,
            SignatureAlgorithm::Sha384WithRSA,
            SignatureAlgorithm::Sha512WithRSA,
            SignatureAlgorithm::Sha256WithECDSA,
            SignatureAlgorithm::Sha384WithECDSA,
            SignatureAlgorithm::Sha512WithECDSA,
            SignatureAlgorithm::Ed25519,
        ]
        .into_iter()
        .find(|alg| alg.oid() == *oid)
    }

    /// OpenSSL's long name for the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Md5WithRSA => "md5WithRSAEncryption",
            SignatureAlgorithm::Sha1WithRSA => "sha1WithRSAEncryption",
            SignatureAlgorithm::Sha224WithRSA => "sha224WithRSAEncryption",
            SignatureAlgorithm::Sha256WithRSA => "sha256WithRSAEncryption",
            SignatureAlgorithm::Sha384WithRSA => "sha384WithRSAEncryption",
            SignatureAlgorithm::Sha512WithRSA => "sha512WithRSAEncryption",
            SignatureAlgorithm::Sha256WithECDSA => "ecdsa-with-SHA256",
            SignatureAlgorithm::Sha384WithECDSA => "ecdsa-with-SHA384",
            SignatureAlgorithm::Sha512WithECDSA => "ecdsa-with-SHA512",
            SignatureAlgorithm::Ed25519 => "ED25519",
        }
    }

    pub fn family(&self) -> SignatureFamily {
        match self {
            SignatureAlgorithm::Md5WithRSA
            | SignatureAlgorithm::Sha1WithRSA
            | SignatureAlgorithm::Sha224WithRSA
            | SignatureAlgorithm::Sha256WithRSA
            | SignatureAlgorithm::Sha384WithRSA
            | SignatureAlgorithm::Sha512WithRSA => SignatureFamily::RsaPkcs1,
            SignatureAlgorithm::Sha256WithECDSA
            | SignatureAlgorithm::Sha384WithECDSA
            | SignatureAlgorithm::Sha512WithECDSA => SignatureFamily::Ecdsa,
            SignatureAlgorithm::Ed25519 => SignatureFamily::Ed25519,
        }
    }

    pub fn digest(&self) -> DigestAlgorithm {
        match self {
            SignatureAlgorithm::Md5WithRSA => DigestAlgorithm::Md5,
            SignatureAlgorithm::Sha1WithRSA => DigestAlgorithm::Sha1,
            SignatureAlgorithm::Sha224WithRSA => DigestAlgorithm::Sha224,
            SignatureAlgorithm::Sha256WithRSA | SignatureAlgorithm::Sha256WithECDSA => {
                DigestAlgorithm::Sha256
            }
            SignatureAlgorithm::Sha384WithRSA | SignatureAlgorithm::Sha384WithECDSA => {
                DigestAlgorithm::Sha384
            }
            SignatureAlgorithm::Sha512WithRSA | SignatureAlgorithm::Sha512WithECDSA => {
                DigestAlgorithm::Sha512
            }
            SignatureAlgorithm::Ed25519 => DigestAlgorithm::Intrinsic,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SignatureAlgorithm {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA PKCS#1 identifiers carry an explicit NULL parameter (RFC 4055);
    /// ECDSA and Ed25519 identifiers carry none.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value.family() {
            SignatureFamily::RsaPkcs1 => Some(der::asn1::Any::null()),
            SignatureFamily::Ecdsa | SignatureFamily::Ed25519 => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// A signed PKCS#10 certification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificationRequest {
    /// The inner representation of the request.
    pub inner: CertReq,
}

impl CertificationRequest {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertReq::from_der(der)
            .map_err(|e| CsrKitError::MalformedInput(format!("invalid PKCS#10 structure: {e}")))?;
        Ok(Self { inner })
    }

    /// Encodes the request into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    /// Encodes the request into PEM format with "CERTIFICATE REQUEST" armor.
    pub fn to_pem(&self) -> Result<String> {
        Ok(crate::pem_utils::der_to_pem(&self.to_der()?, CSR_PEM_LABEL))
    }
}

/// Output of [`build`]: the request and the freshly generated private key.
///
/// The private key exists only here; the builder keeps no copy, and the
/// PEM text is wiped when this value is dropped.
pub struct GeneratedCredential {
    /// PEM text with "CERTIFICATE REQUEST" armor.
    pub csr: String,
    /// DER bytes of the same request.
    pub csr_der: Vec<u8>,
    /// PKCS#8 PEM text with "PRIVATE KEY" armor.
    pub private_key: Zeroizing<String>,
}

impl fmt::Debug for GeneratedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedCredential")
            .field("csr", &self.csr)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
