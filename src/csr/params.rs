use std::fmt;
use std::sync::LazyLock;

use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, BmpString, Ia5StringRef, PrintableStringRef, SetOfVec, TeletexStringRef, Utf8StringRef};
use regex::Regex;
use serde::{Deserialize, Serialize};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use crate::error::{CsrKitError, Result};

/// PKCS#9 emailAddress.
const EMAIL_ADDRESS: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1");

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)+$").unwrap());

static DNS_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
        .unwrap()
});

/// The distinguished-name attributes a subject profile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DnAttribute {
    Country,
    State,
    Locality,
    Organization,
    OrganizationalUnit,
    CommonName,
    EmailAddress,
}

impl DnAttribute {
    /// Order in which RDNs are written. Verifiers compare the raw bytes, so
    /// this order is fixed: C, ST, L, O, OU, CN, emailAddress.
    pub const CANONICAL_ORDER: [DnAttribute; 7] = [
        DnAttribute::Country,
        DnAttribute::State,
        DnAttribute::Locality,
        DnAttribute::Organization,
        DnAttribute::OrganizationalUnit,
        DnAttribute::CommonName,
        DnAttribute::EmailAddress,
    ];

    pub fn oid(&self) -> ObjectIdentifier {
        use const_oid::db::rfc4519;
        match self {
            DnAttribute::Country => rfc4519::C,
            DnAttribute::State => rfc4519::ST,
            DnAttribute::Locality => rfc4519::L,
            DnAttribute::Organization => rfc4519::O,
            DnAttribute::OrganizationalUnit => rfc4519::OU,
            DnAttribute::CommonName => rfc4519::CN,
            DnAttribute::EmailAddress => EMAIL_ADDRESS,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        Self::CANONICAL_ORDER.into_iter().find(|attr| attr.oid() == *oid)
    }

    /// Short name used in reports and JSON.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            DnAttribute::Country => "C",
            DnAttribute::State => "ST",
            DnAttribute::Locality => "L",
            DnAttribute::Organization => "O",
            DnAttribute::OrganizationalUnit => "OU",
            DnAttribute::CommonName => "CN",
            DnAttribute::EmailAddress => "emailAddress",
        }
    }

    /// Upper bound on the value length in bytes (X.520 / PKCS#9).
    pub fn max_len(&self) -> usize {
        match self {
            DnAttribute::Country => 2,
            DnAttribute::State | DnAttribute::Locality => 128,
            DnAttribute::Organization
            | DnAttribute::OrganizationalUnit
            | DnAttribute::CommonName => 64,
            DnAttribute::EmailAddress => 255,
        }
    }

    fn encode_value(&self, value: &str) -> Result<Any> {
        let invalid = |e: der::Error| {
            CsrKitError::InvalidSubject(format!("{} cannot be encoded: {e}", self.mnemonic()))
        };
        let any = match self {
            DnAttribute::Country => {
                PrintableStringRef::new(value).map_err(invalid)?;
                Any::new(Tag::PrintableString, value.as_bytes())
            }
            DnAttribute::EmailAddress => {
                Ia5StringRef::new(value).map_err(invalid)?;
                Any::new(Tag::Ia5String, value.as_bytes())
            }
            _ => {
                Utf8StringRef::new(value).map_err(invalid)?;
                Any::new(Tag::Utf8String, value.as_bytes())
            }
        };
        any.map_err(|e| CsrKitError::EncodingError(e.to_string()))
    }
}

impl fmt::Display for DnAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Subject fields for a new certification request.
///
/// `common_name`, `organization` and `country` are required; the remaining
/// attributes are written only when present. `subject_alt_names` become a
/// SubjectAltName extension request.
///
/// # Example
/// ```
/// use csrkit::csr::params::SubjectProfile;
/// let profile = SubjectProfile::builder()
///     .common_name("test.example.com".to_string())
///     .organization("Test Org".to_string())
///     .country("US".to_string())
///     .build();
/// assert!(profile.validate().is_ok());
/// ```
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub common_name: String,
    pub organization: String,
    pub organizational_unit: Option<String>,
    pub locality: Option<String>,
    pub state: Option<String>,
    pub country: String,
    pub email: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub subject_alt_names: Vec<String>,
}

impl SubjectProfile {
    /// Present attributes in canonical RDN order.
    pub fn attributes(&self) -> Vec<(DnAttribute, &str)> {
        DnAttribute::CANONICAL_ORDER
            .into_iter()
            .filter_map(|attr| self.value(attr).map(|value| (attr, value)))
            .collect()
    }

    pub fn value(&self, attr: DnAttribute) -> Option<&str> {
        match attr {
            DnAttribute::Country => Some(self.country.as_str()),
            DnAttribute::State => self.state.as_deref(),
            DnAttribute::Locality => self.locality.as_deref(),
            DnAttribute::Organization => Some(self.organization.as_str()),
            DnAttribute::OrganizationalUnit => self.organizational_unit.as_deref(),
            DnAttribute::CommonName => Some(self.common_name.as_str()),
            DnAttribute::EmailAddress => self.email.as_deref(),
        }
    }

    /// Checks the profile before any key material is generated.
    pub fn validate(&self) -> Result<()> {
        for (attr, value) in self.attributes() {
            if value.trim().is_empty() {
                return Err(CsrKitError::InvalidSubject(format!(
                    "{} must not be empty",
                    attr.mnemonic()
                )));
            }
            if value.len() > attr.max_len() {
                return Err(CsrKitError::InvalidSubject(format!(
                    "{} exceeds {} bytes",
                    attr.mnemonic(),
                    attr.max_len()
                )));
            }
            if value.contains('\0') {
                return Err(CsrKitError::InvalidSubject(format!(
                    "{} contains a NUL character",
                    attr.mnemonic()
                )));
            }
        }

        if self.country.len() != 2 || !self.country.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(CsrKitError::InvalidSubject(format!(
                "C must be two uppercase letters, got '{}'",
                self.country
            )));
        }

        if let Some(email) = &self.email {
            if !EMAIL_RE.is_match(email) {
                return Err(CsrKitError::InvalidSubject(format!(
                    "emailAddress '{email}' is not a valid address"
                )));
            }
        }

        for name in &self.subject_alt_names {
            if name.len() > 253 || !DNS_NAME_RE.is_match(name) {
                return Err(CsrKitError::InvalidSubject(format!(
                    "subject alternative name '{name}' is not a DNS name"
                )));
            }
        }

        Ok(())
    }

    /// Encodes the profile as an X.509 Name, one attribute per RDN, in
    /// canonical order.
    pub fn as_x509_name(&self) -> Result<Name> {
        let rdns = self
            .attributes()
            .into_iter()
            .map(|(attr, value)| {
                let atv = AttributeTypeAndValue {
                    oid: attr.oid(),
                    value: attr.encode_value(value)?,
                };
                let set = SetOfVec::try_from(vec![atv])
                    .map_err(|e| CsrKitError::EncodingError(e.to_string()))?;
                Ok(RelativeDistinguishedName(set))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RdnSequence(rdns))
    }
}

/// A decoded subject: attribute name and value pairs in encounter order.
///
/// Known OIDs are reported by mnemonic; anything else passes through as its
/// dotted form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subject {
    entries: Vec<(String, String)>,
}

impl Subject {
    /// Decodes every attribute of `name`.
    pub fn from_x509_name(name: &Name) -> Result<Self> {
        let mut entries = Vec::new();
        for rdn in name.0.iter() {
            for atv in rdn.0.iter() {
                let key = match DnAttribute::from_oid(&atv.oid) {
                    Some(attr) => attr.mnemonic().to_string(),
                    None => atv.oid.to_string(),
                };
                entries.push((key, decode_directory_string(&atv.value)?));
            }
        }
        Ok(Self { entries })
    }

    /// First value recorded for `key` (a mnemonic or a dotted OID).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded for `key`, in encoding order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Attribute names in order of first appearance, without repeats.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for (k, _) in self.iter() {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Subject {
    /// RFC 4514-style rendering in encoding order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// One JSON key per attribute; a repeated attribute becomes an array.
impl Serialize for Subject {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let keys = self.keys();
        let mut map = serializer.serialize_map(Some(keys.len()))?;
        for k in keys {
            match self.get_all(k).as_slice() {
                [single] => map.serialize_entry(k, single)?,
                values => map.serialize_entry(k, values)?,
            }
        }
        map.end()
    }
}

fn decode_directory_string(value: &Any) -> Result<String> {
    let decoded = match value.tag() {
        Tag::Utf8String => value.decode_as::<String>()?,
        Tag::PrintableString => value.decode_as::<PrintableStringRef<'_>>()?.to_string(),
        Tag::Ia5String => value.decode_as::<Ia5StringRef<'_>>()?.to_string(),
        Tag::TeletexString => value.decode_as::<TeletexStringRef<'_>>()?.to_string(),
        Tag::BmpString => value.decode_as::<BmpString>()?.to_string(),
        other => {
            return Err(CsrKitError::MalformedInput(format!(
                "unsupported directory string type {other}"
            )));
        }
    };
    Ok(decoded)
}

/// Represents an extension placed in a request's extensionRequest attribute.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: super::extensions::ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::{Decode, Encode};

    fn profile() -> SubjectProfile {
        SubjectProfile::builder()
            .common_name("test.example.com".to_string())
            .organization("Test Org".to_string())
            .organizational_unit("IT".to_string())
            .locality("Provo".to_string())
            .state("Utah".to_string())
            .country("US".to_string())
            .email("admin@example.com".to_string())
            .build()
    }

    #[test]
    fn name_follows_canonical_order() {
        let name = profile().as_x509_name().unwrap();
        let oids: Vec<String> = name
            .0
            .iter()
            .map(|rdn| rdn.0.get(0).unwrap().oid.to_string())
            .collect();
        assert_eq!(
            oids,
            vec![
                "2.5.4.6",
                "2.5.4.8",
                "2.5.4.7",
                "2.5.4.10",
                "2.5.4.11",
                "2.5.4.3",
                "1.2.840.113549.1.9.1"
            ]
        );
    }

    #[test]
    fn name_encodes_string_types() {
        let name = profile().as_x509_name().unwrap();
        let tags: Vec<Tag> = name.0.iter().map(|rdn| rdn.0.get(0).unwrap().value.tag()).collect();
        assert_eq!(tags[0], Tag::PrintableString);
        assert_eq!(tags[5], Tag::Utf8String);
        assert_eq!(tags[6], Tag::Ia5String);
    }

    #[test]
    fn subject_decodes_after_der_round_trip() {
        let der = profile().as_x509_name().unwrap().to_der().unwrap();
        let subject = Subject::from_x509_name(&Name::from_der(&der).unwrap()).unwrap();
        assert_eq!(subject.get("CN"), Some("test.example.com"));
        assert_eq!(subject.get("emailAddress"), Some("admin@example.com"));
        assert_eq!(subject.len(), 7);
        assert_eq!(
            subject.to_string(),
            "C=US, ST=Utah, L=Provo, O=Test Org, OU=IT, CN=test.example.com, emailAddress=admin@example.com"
        );
    }

    #[test]
    fn unknown_oids_pass_through_dotted() {
        let serial = ObjectIdentifier::new_unwrap("2.5.4.5");
        let atv = AttributeTypeAndValue {
            oid: serial,
            value: Any::new(Tag::PrintableString, b"1234".as_slice()).unwrap(),
        };
        let name = RdnSequence(vec![RelativeDistinguishedName(
            SetOfVec::try_from(vec![atv]).unwrap(),
        )]);
        let subject = Subject::from_x509_name(&name).unwrap();
        assert_eq!(subject.get("2.5.4.5"), Some("1234"));
    }

    #[test]
    fn subject_serializes_in_order() {
        let name = profile().as_x509_name().unwrap();
        let json = serde_json::to_string(&Subject::from_x509_name(&name).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"C":"US","ST":"Utah""#));
    }

    #[test]
    fn repeated_attributes_serialize_as_array() {
        let atv = |oid: ObjectIdentifier, value: &str| {
            RelativeDistinguishedName(
                SetOfVec::try_from(vec![AttributeTypeAndValue {
                    oid,
                    value: Any::new(Tag::Utf8String, value.as_bytes()).unwrap(),
                }])
                .unwrap(),
            )
        };
        let name = RdnSequence(vec![
            atv(DnAttribute::OrganizationalUnit.oid(), "Payments"),
            atv(DnAttribute::OrganizationalUnit.oid(), "Platform"),
            atv(DnAttribute::CommonName.oid(), "multi.example.com"),
        ]);
        let subject = Subject::from_x509_name(&name).unwrap();
        assert_eq!(subject.get_all("OU"), vec!["Payments", "Platform"]);
        assert_eq!(subject.keys(), vec!["OU", "CN"]);

        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "OU": ["Payments", "Platform"], "CN": "multi.example.com" })
        );
    }

    #[test]
    fn validation_rejects_bad_profiles() {
        let mut p = profile();
        p.common_name = String::new();
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));

        let mut p = profile();
        p.organization = "   ".to_string();
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));

        for country in ["", "usa", "us", "U1"] {
            let mut p = profile();
            p.country = country.to_string();
            assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))), "{country}");
        }

        let mut p = profile();
        p.common_name = "a".repeat(65);
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));

        let mut p = profile();
        p.email = Some("not-an-address".to_string());
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));

        let mut p = profile();
        p.organizational_unit = Some(String::new());
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));

        let mut p = profile();
        p.subject_alt_names = vec!["bad name".to_string()];
        assert!(matches!(p.validate(), Err(CsrKitError::InvalidSubject(_))));
    }

    #[test]
    fn validation_accepts_minimal_and_wildcard_profiles() {
        let p = SubjectProfile::builder()
            .common_name("test.example.com".to_string())
            .organization("Test Org".to_string())
            .country("US".to_string())
            .subject_alt_names(vec!["*.example.com".to_string(), "example.com".to_string()])
            .build();
        p.validate().unwrap();
        assert_eq!(p.attributes().len(), 3);
    }
}
