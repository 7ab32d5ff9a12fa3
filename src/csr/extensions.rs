use std::fmt;
use std::net::IpAddr;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::error::{CsrKitError, Result};

/// Trait for converting to and from the DER value of an X.509 extension.
///
/// # Example
/// ```
/// use csrkit::csr::extensions::{AltName, SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec![AltName::Dns("example.com".to_string())] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san, decoded);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

/// One entry of a SubjectAltName.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Email(String),
    Ip(IpAddr),
    Uri(String),
}

impl fmt::Display for AltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltName::Dns(name) => write!(f, "DNS:{name}"),
            AltName::Email(addr) => write!(f, "email:{addr}"),
            AltName::Ip(ip) => write!(f, "IP Address:{ip}"),
            AltName::Uri(uri) => write!(f, "URI:{uri}"),
        }
    }
}

fn ia5(value: &str) -> Result<Ia5String> {
    Ia5String::new(value).map_err(|e| CsrKitError::InvalidSubject(format!("'{value}': {e}")))
}

impl TryFrom<&AltName> for GeneralName {
    type Error = CsrKitError;

    fn try_from(name: &AltName) -> Result<Self> {
        Ok(match name {
            AltName::Dns(dns) => GeneralName::DnsName(ia5(dns)?),
            AltName::Email(addr) => GeneralName::Rfc822Name(ia5(addr)?),
            AltName::Uri(uri) => GeneralName::UniformResourceIdentifier(ia5(uri)?),
            AltName::Ip(ip) => {
                let octets = match ip {
                    IpAddr::V4(v4) => v4.octets().to_vec(),
                    IpAddr::V6(v6) => v6.octets().to_vec(),
                };
                GeneralName::IpAddress(
                    OctetString::new(octets).map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
                )
            }
        })
    }
}

impl TryFrom<&GeneralName> for AltName {
    type Error = CsrKitError;

    fn try_from(name: &GeneralName) -> Result<Self> {
        match name {
            GeneralName::DnsName(dns) => Ok(AltName::Dns(dns.to_string())),
            GeneralName::Rfc822Name(addr) => Ok(AltName::Email(addr.to_string())),
            GeneralName::UniformResourceIdentifier(uri) => Ok(AltName::Uri(uri.to_string())),
            GeneralName::IpAddress(octets) => {
                let bytes = octets.as_bytes();
                if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
                    Ok(AltName::Ip(IpAddr::from(v4)))
                } else if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
                    Ok(AltName::Ip(IpAddr::from(v6)))
                } else {
                    Err(CsrKitError::MalformedInput(format!(
                        "IP address entry of {} bytes",
                        bytes.len()
                    )))
                }
            }
            _ => Err(CsrKitError::MalformedInput(
                "Unsupported general name type".to_string(),
            )),
        }
    }
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// This extension specifies additional identities for the subject of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAltName {
    pub names: Vec<AltName>,
}

impl SubjectAltName {
    /// A SAN holding only DNS names.
    pub fn dns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(|n| AltName::Dns(n.into())).collect(),
        }
    }

    pub fn dns_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter_map(|name| match name {
                AltName::Dns(dns) => Some(dns.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(GeneralName::try_from)
                .collect::<Result<Vec<_>>>()?,
        );

        san.to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension)?;
        let names = san
            .0
            .iter()
            .map(AltName::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
///
/// # Fields
/// * `is_ca` - Indicates if the requested certificate is a CA.
/// * `max_path_length` - The maximum number of intermediate CAs allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        bc.to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        X509KeyUsage::from(self.0)
            .to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let ku = X509KeyUsage::from_der(extension)?;
        Ok(Self(ku.0))
    }
}

const KEY_USAGE_NAMES: [(KeyUsages, &str); 9] = [
    (KeyUsages::DigitalSignature, "Digital Signature"),
    (KeyUsages::NonRepudiation, "Non Repudiation"),
    (KeyUsages::KeyEncipherment, "Key Encipherment"),
    (KeyUsages::DataEncipherment, "Data Encipherment"),
    (KeyUsages::KeyAgreement, "Key Agreement"),
    (KeyUsages::KeyCertSign, "Certificate Sign"),
    (KeyUsages::CRLSign, "CRL Sign"),
    (KeyUsages::EncipherOnly, "Encipher Only"),
    (KeyUsages::DecipherOnly, "Decipher Only"),
];

impl fmt::Display for KeyUsage {
    /// OpenSSL's wording, e.g. "Digital Signature, Key Encipherment".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = KEY_USAGE_NAMES
            .iter()
            .filter(|(usage, _)| self.0.contains(*usage))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(", "))
    }
}

/// Represents the Extended Key Usage extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        x509_cert::ext::pkix::ExtendedKeyUsage(oids)
            .to_der()
            .map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension)?;
        Ok(Self {
            usage: eku.0.into_iter().map(ExtendedKeyUsageOption::from).collect(),
        })
    }
}

/// A purpose listed in an Extended Key Usage extension.
///
/// Purposes without a named variant keep their OID in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    Other(ObjectIdentifier),
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        use const_oid::db::rfc5912;
        match value {
            ExtendedKeyUsageOption::OcspSigning => rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => rfc5912::ID_KP_EMAIL_PROTECTION,
            ExtendedKeyUsageOption::TimeStamping => rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::Other(oid) => oid,
        }
    }
}

impl From<ObjectIdentifier> for ExtendedKeyUsageOption {
    fn from(oid: ObjectIdentifier) -> Self {
        use const_oid::db::rfc5912;
        match oid {
            rfc5912::ID_KP_OCSP_SIGNING => ExtendedKeyUsageOption::OcspSigning,
            rfc5912::ID_KP_SERVER_AUTH => ExtendedKeyUsageOption::ServerAuth,
            rfc5912::ID_KP_CLIENT_AUTH => ExtendedKeyUsageOption::ClientAuth,
            rfc5912::ID_KP_CODE_SIGNING => ExtendedKeyUsageOption::CodeSigning,
            rfc5912::ID_KP_EMAIL_PROTECTION => ExtendedKeyUsageOption::EmailProtection,
            rfc5912::ID_KP_TIME_STAMPING => ExtendedKeyUsageOption::TimeStamping,
            other => ExtendedKeyUsageOption::Other(other),
        }
    }
}

impl fmt::Display for ExtendedKeyUsageOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtendedKeyUsageOption::ServerAuth => f.write_str("serverAuth"),
            ExtendedKeyUsageOption::ClientAuth => f.write_str("clientAuth"),
            ExtendedKeyUsageOption::CodeSigning => f.write_str("codeSigning"),
            ExtendedKeyUsageOption::EmailProtection => f.write_str("emailProtection"),
            ExtendedKeyUsageOption::TimeStamping => f.write_str("timeStamping"),
            ExtendedKeyUsageOption::OcspSigning => f.write_str("OCSPSigning"),
            ExtendedKeyUsageOption::Other(oid) => write!(f, "{oid}"),
        }
    }
}

/// Short name of a well-known extension.
pub fn extension_name(oid: &ObjectIdentifier) -> Option<&'static str> {
    match *oid {
        SubjectAltName::OID => Some("subjectAltName"),
        BasicConstraints::OID => Some("basicConstraints"),
        KeyUsage::OID => Some("keyUsage"),
        ExtendedKeyUsage::OID => Some("extendedKeyUsage"),
        x509_cert::ext::pkix::SubjectKeyIdentifier::OID => Some("subjectKeyIdentifier"),
        _ => None,
    }
}

/// Human-readable rendering of an extension value, for the extensions this
/// module knows. `None` for anything else or a value that fails to decode.
pub fn summarize(oid: &ObjectIdentifier, value: &[u8]) -> Option<String> {
    match *oid {
        SubjectAltName::OID => SubjectAltName::from_x509_extension_value(value)
            .ok()
            .map(|san| {
                san.names
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
        BasicConstraints::OID => BasicConstraints::from_x509_extension_value(value)
            .ok()
            .map(|bc| match bc.max_path_length {
                Some(len) => format!("CA:{}, pathlen:{len}", bc.is_ca),
                None => format!("CA:{}", bc.is_ca),
            }),
        KeyUsage::OID => KeyUsage::from_x509_extension_value(value)
            .ok()
            .map(|ku| ku.to_string()),
        ExtendedKeyUsage::OID => ExtendedKeyUsage::from_x509_extension_value(value)
            .ok()
            .map(|eku| {
                eku.usage
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            }),
        _ => None,
    }
}
