//! The CSR parser and assessor.
//!
//! Input is either PEM text or raw DER. A [`ParsedCsr`] is only ever produced
//! for a structurally valid request whose self-signature verifies against its
//! own public key; everything else is a typed error.

use const_oid::ObjectIdentifier;
use der::Encode;
use serde::Serialize;
use tracing::debug;
use x509_cert::request::{CertReq, ExtensionReq};

use super::extensions::{self, SubjectAltName, ToAndFromX509Extension};
use super::params::Subject;
use super::request_info::EXTENSION_REQUEST;
use super::{CSR_PEM_LABEL, CertificationRequest, LEGACY_CSR_PEM_LABEL, SignatureAlgorithm};
use crate::assessment::{RatingPolicy, SecurityAssessment};
use crate::error::{CsrKitError, Result};
use crate::key::{KeyAlgorithm, PublicKey};
use crate::pem_utils::pem_to_der;

/// PKCS#9 challengePassword.
const CHALLENGE_PASSWORD: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.7");
/// PKCS#9 unstructuredName.
const UNSTRUCTURED_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.2");

/// One extension from the request's extensionRequest attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestedExtension {
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    pub critical: bool,
    pub value_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A decoded, signature-verified certification request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCsr {
    pub subject: Subject,
    pub public_key_algorithm: KeyAlgorithm,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<&'static str>,
    #[serde(rename = "key_size")]
    pub key_size_bits: usize,
    pub signature_algorithm: SignatureAlgorithm,
    pub signature_valid: bool,
    pub requested_extensions: Vec<RequestedExtension>,
    pub subject_alt_names: Vec<String>,
    /// Attributes other than extensionRequest, by name or dotted OID.
    pub other_attributes: Vec<String>,
    #[serde(skip)]
    pub public_key: PublicKey,
}

/// Result of [`validate`]: the parsed request with its ratings.
///
/// `is_valid` is always true for a report that exists; invalid requests
/// are errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(flatten)]
    pub csr: ParsedCsr,
    #[serde(flatten)]
    pub assessment: SecurityAssessment,
}

/// Parses PEM text or DER bytes.
///
/// PEM input must be exactly one "CERTIFICATE REQUEST" (or legacy "NEW
/// CERTIFICATE REQUEST") block, optionally surrounded by whitespace.
pub fn parse(input: impl AsRef<[u8]>) -> Result<ParsedCsr> {
    let input = input.as_ref();
    match input.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'-') => {
            let text = std::str::from_utf8(input)
                .map_err(|_| CsrKitError::MalformedInput("PEM input is not UTF-8".to_string()))?;
            let der = pem_to_der(text, &[CSR_PEM_LABEL, LEGACY_CSR_PEM_LABEL])?;
            parse_der(&der)
        }
        Some(0x30) => parse_der(input),
        Some(_) => Err(CsrKitError::MalformedInput(
            "input is neither PEM text nor a DER SEQUENCE".to_string(),
        )),
        None => Err(CsrKitError::MalformedInput("empty input".to_string())),
    }
}

/// Parses and verifies a DER-encoded request.
pub fn parse_der(der: &[u8]) -> Result<ParsedCsr> {
    let request = CertificationRequest::from_der(der)?;
    let CertReq {
        info,
        algorithm,
        signature,
    } = &request.inner;

    let public_key = PublicKey::from_x509spki(&info.public_key)?;
    let signature_algorithm = SignatureAlgorithm::from_oid(&algorithm.oid).ok_or_else(|| {
        CsrKitError::SignatureVerification(format!(
            "unsupported signature algorithm {}",
            algorithm.oid
        ))
    })?;

    let signed = info
        .to_der()
        .map_err(|e| CsrKitError::EncodingError(e.to_string()))?;
    let signature = signature.as_bytes().ok_or_else(|| {
        CsrKitError::MalformedInput("signature bit string has unused bits".to_string())
    })?;
    public_key.verify(signature_algorithm, &signed, signature)?;

    let subject = Subject::from_x509_name(&info.subject)?;

    let mut requested_extensions = Vec::new();
    let mut subject_alt_names = Vec::new();
    let mut other_attributes = Vec::new();
    for attribute in info.attributes.iter() {
        if attribute.oid != EXTENSION_REQUEST {
            other_attributes.push(attribute_name(&attribute.oid));
            continue;
        }
        for value in attribute.values.iter() {
            let request: ExtensionReq = value.decode_as()?;
            for extension in request.0 {
                let value = extension.extn_value.as_bytes();
                if extension.extn_id == SubjectAltName::OID {
                    if let Ok(san) = SubjectAltName::from_x509_extension_value(value) {
                        subject_alt_names.extend(san.dns_names());
                    }
                }
                requested_extensions.push(RequestedExtension {
                    oid: extension.extn_id.to_string(),
                    name: extensions::extension_name(&extension.extn_id),
                    critical: extension.critical,
                    value_hex: hex::encode(value),
                    summary: extensions::summarize(&extension.extn_id, value),
                });
            }
        }
    }

    let algorithm_family = public_key.algorithm();
    debug!(
        key_algorithm = algorithm_family.name(),
        key_size = public_key.size_bits(),
        signature_algorithm = %signature_algorithm,
        "verified certification request"
    );

    Ok(ParsedCsr {
        subject,
        public_key_algorithm: algorithm_family,
        curve: algorithm_family.curve(),
        key_size_bits: public_key.size_bits(),
        signature_algorithm,
        signature_valid: true,
        requested_extensions,
        subject_alt_names,
        other_attributes,
        public_key,
    })
}

/// Parses, verifies and rates a request.
pub fn validate(input: impl AsRef<[u8]>, policy: &RatingPolicy) -> Result<ValidationReport> {
    let csr = parse(input)?;
    let assessment = policy.assess(
        csr.public_key_algorithm,
        csr.key_size_bits,
        csr.signature_algorithm.digest(),
    );
    Ok(ValidationReport {
        is_valid: csr.signature_valid,
        csr,
        assessment,
    })
}

fn attribute_name(oid: &ObjectIdentifier) -> String {
    match *oid {
        CHALLENGE_PASSWORD => "challengePassword".to_string(),
        UNSTRUCTURED_NAME => "unstructuredName".to_string(),
        other => other.to_string(),
    }
}
