use der::asn1::{OctetString, SetOfVec};
use der::{Any, Decode, Encode};
use x509_cert::attr::Attribute;
use x509_cert::ext::Extension;
use x509_cert::request::{CertReqInfo, ExtensionReq, Version};

use crate::csr::params::{ExtensionParam, SubjectProfile};
use crate::error::{CsrKitError, Result};
use crate::key::PublicKey;

/// PKCS#9 extensionRequest attribute type.
pub const EXTENSION_REQUEST: der::oid::ObjectIdentifier =
    der::oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");

/// The `CertificationRequestInfo` of a PKCS#10 request, the part covered by
/// the self-signature.
///
/// # Fields
/// * `subject` - The distinguished name of the requester.
/// * `subject_public_key` - The public key whose private half signs the request.
/// * `extensions` - Extensions asked of the issuing CA.
pub struct RequestInfo {
    pub subject: SubjectProfile,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl RequestInfo {
    pub fn new(
        subject: SubjectProfile,
        subject_public_key: PublicKey,
        extensions: Vec<ExtensionParam>,
    ) -> Self {
        Self {
            subject,
            subject_public_key,
            extensions,
        }
    }

    /// Converts into the x509-cert structure, ready for DER encoding.
    ///
    /// With no extensions the attributes field is the empty set; otherwise it
    /// holds a single extensionRequest attribute.
    pub fn to_cert_req_info(&self) -> Result<CertReqInfo> {
        let attributes = if self.extensions.is_empty() {
            SetOfVec::new()
        } else {
            SetOfVec::try_from(vec![extension_request(&self.extensions)?])
                .map_err(|e| CsrKitError::EncodingError(e.to_string()))?
        };

        Ok(CertReqInfo {
            version: Version::V1,
            subject: self.subject.as_x509_name()?,
            public_key: self.subject_public_key.to_spki()?,
            attributes,
        })
    }

    /// DER bytes of the structure that gets signed.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_cert_req_info()?
            .to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }
}

fn extension_request(extensions: &[ExtensionParam]) -> Result<Attribute> {
    let encoding = |e: der::Error| CsrKitError::EncodingError(e.to_string());

    let extensions = extensions
        .iter()
        .map(|ext| {
            Ok(Extension {
                extn_id: ext.oid,
                critical: ext.critical,
                extn_value: OctetString::new(ext.value.clone()).map_err(encoding)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let value = Any::from_der(&ExtensionReq(extensions).to_der().map_err(encoding)?)?;
    let values = SetOfVec::try_from(vec![value]).map_err(encoding)?;

    Ok(Attribute {
        oid: EXTENSION_REQUEST,
        values,
    })
}
