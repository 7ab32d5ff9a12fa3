//! The CSR builder: key generation, DN encoding, self-signature.

use der::asn1::BitString;
use tracing::debug;
use x509_cert::request::CertReq;

use super::extensions::SubjectAltName;
use super::params::{ExtensionParam, SubjectProfile};
use super::request_info::RequestInfo;
use super::{CertificationRequest, GeneratedCredential};
use crate::error::{CsrKitError, Result};
use crate::key::{KeyPair, KeySpec, PublicKey};

/// Generates a fresh key pair and a request signed with it.
///
/// The profile and key spec are validated before any key material exists.
/// The returned credential is the only place the private key survives.
///
/// # Example
/// ```no_run
/// use csrkit::csr::{build, params::SubjectProfile};
/// use csrkit::key::KeySpec;
///
/// let profile = SubjectProfile::builder()
///     .common_name("test.example.com".to_string())
///     .organization("Test Org".to_string())
///     .country("US".to_string())
///     .build();
/// let credential = build(&profile, &KeySpec::default()).unwrap();
/// assert!(credential.csr.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
/// ```
pub fn build(profile: &SubjectProfile, key_spec: &KeySpec) -> Result<GeneratedCredential> {
    profile.validate()?;
    key_spec.validate()?;

    debug!(?key_spec, common_name = %profile.common_name, "generating key pair");
    let key_pair = KeyPair::generate(key_spec)?;

    let request = build_request(profile, &key_pair)?;
    let csr_der = request.to_der()?;
    let csr = request.to_pem()?;
    let private_key = key_pair.to_pkcs8_pem()?;

    Ok(GeneratedCredential {
        csr,
        csr_der,
        private_key,
    })
}

/// Builds and signs a request for an existing key pair.
pub fn build_request(profile: &SubjectProfile, key_pair: &KeyPair) -> Result<CertificationRequest> {
    profile.validate()?;

    let mut extensions = Vec::new();
    if !profile.subject_alt_names.is_empty() {
        let san = SubjectAltName::dns(profile.subject_alt_names.iter().cloned());
        extensions.push(ExtensionParam::from_extension(san, false)?);
    }

    let info = RequestInfo::new(
        profile.clone(),
        PublicKey::from_key_pair(key_pair),
        extensions,
    )
    .to_cert_req_info()?;

    let signature_algorithm = key_pair.signature_algorithm();
    let tbs = der::Encode::to_der(&info).map_err(|e| CsrKitError::EncodingError(e.to_string()))?;
    let signature = key_pair.sign_data(&tbs)?;
    debug!(algorithm = %signature_algorithm, "signed certification request info");

    Ok(CertificationRequest {
        inner: CertReq {
            info,
            algorithm: signature_algorithm.into(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
        },
    })
}
