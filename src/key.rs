//! Key generation, PKCS#8 export and signature verification.
//!
//! A [`KeyPair`] is created per request and dropped as soon as its PKCS#8
//! PEM has been handed to the caller. The key types zeroize their secret
//! material on drop.

use std::fmt;

use const_oid::ObjectIdentifier;
use der::Encode;
use ed25519_dalek::pkcs8::KeypairBytes;
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{EncodePrivateKey, LineEnding};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use zeroize::Zeroizing;

use crate::csr::{DigestAlgorithm, SignatureAlgorithm, SignatureFamily};
use crate::error::{CsrKitError, Result};

/// RSA modulus sizes the builder accepts.
pub const SUPPORTED_RSA_BITS: [usize; 2] = [2048, 4096];

/// DigestInfo prefix for MD5 (RFC 8017, section 9.2, note 1).
const MD5_DIGEST_INFO_PREFIX: [u8; 18] = [
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05, 0x05, 0x00,
    0x04, 0x10,
];

/// The algorithm and size of the key pair to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum KeySpec {
    Rsa { bits: usize },
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl Default for KeySpec {
    fn default() -> Self {
        KeySpec::Rsa { bits: 2048 }
    }
}

impl KeySpec {
    /// RSA key spec, rejecting sizes outside [`SUPPORTED_RSA_BITS`].
    pub fn rsa(bits: usize) -> Result<Self> {
        let spec = KeySpec::Rsa { bits };
        spec.validate()?;
        Ok(spec)
    }

    /// Builds a key spec from the loose `key_type` / `key_size` pair used on
    /// the wire. RSA with 2048 bits is the default; the size is ignored for
    /// curve-based types.
    pub fn from_parts(key_type: Option<&str>, key_size: Option<usize>) -> Result<Self> {
        let spec = match key_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("rsa") => KeySpec::Rsa {
                bits: key_size.unwrap_or(2048),
            },
            Some("ec-p256") | Some("p256") | Some("p-256") => KeySpec::EcdsaP256,
            Some("ec-p384") | Some("p384") | Some("p-384") => KeySpec::EcdsaP384,
            Some("ed25519") => KeySpec::Ed25519,
            Some(other) => return Err(CsrKitError::UnsupportedKeyType(other.to_string())),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            KeySpec::Rsa { bits } if !SUPPORTED_RSA_BITS.contains(bits) => {
                Err(CsrKitError::UnsupportedKeySize(*bits))
            }
            _ => Ok(()),
        }
    }

    /// The signature algorithm a key of this kind signs requests with.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeySpec::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeySpec::EcdsaP256 => SignatureAlgorithm::Sha256WithECDSA,
            KeySpec::EcdsaP384 => SignatureAlgorithm::Sha384WithECDSA,
            KeySpec::Ed25519 => SignatureAlgorithm::Ed25519,
        }
    }
}

/// Public key algorithm families understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl KeyAlgorithm {
    /// OpenSSL-style name of the SubjectPublicKeyInfo algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "rsaEncryption",
            KeyAlgorithm::EcdsaP256 | KeyAlgorithm::EcdsaP384 => "id-ecPublicKey",
            KeyAlgorithm::Ed25519 => "ED25519",
        }
    }

    /// Curve name for EC keys.
    pub fn curve(&self) -> Option<&'static str> {
        match self {
            KeyAlgorithm::EcdsaP256 => Some("P-256"),
            KeyAlgorithm::EcdsaP384 => Some("P-384"),
            _ => None,
        }
    }
}

impl Serialize for KeyAlgorithm {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Supported key types for request signing.
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPair::Rsa { public, .. } => write!(f, "KeyPair::Rsa({} bits)", public.n().bits()),
            KeyPair::EcdsaP256 { .. } => f.write_str("KeyPair::EcdsaP256"),
            KeyPair::EcdsaP384 { .. } => f.write_str("KeyPair::EcdsaP384"),
            KeyPair::Ed25519 { .. } => f.write_str("KeyPair::Ed25519"),
        }
    }
}

impl KeyPair {
    /// Generate a key pair for the given spec using the OS random source.
    pub fn generate(spec: &KeySpec) -> Result<Self> {
        spec.validate()?;
        match spec {
            KeySpec::Rsa { bits } => Self::generate_rsa(*bits),
            KeySpec::EcdsaP256 => Ok(Self::generate_ecdsa_p256()),
            KeySpec::EcdsaP384 => Ok(Self::generate_ecdsa_p384()),
            KeySpec::Ed25519 => Ok(Self::generate_ed25519()),
        }
    }

    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRSA,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
        }
    }

    /// Signs `data` with the key's default signature algorithm.
    ///
    /// ECDSA signatures are returned DER-encoded, as PKCS#10 carries them.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        use ecdsa::signature::Signer;

        match self {
            KeyPair::Rsa { private, .. } => {
                let hashed = Sha256::digest(data);
                private
                    .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
                    .map_err(|e| CsrKitError::EncodingError(format!("RSA signing failed: {e}")))
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CsrKitError::EncodingError(format!("ECDSA signing failed: {e}")))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CsrKitError::EncodingError(format!("ECDSA signing failed: {e}")))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = ed25519_dalek::Signer::sign(signing_key, data);
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// The public half as a SubjectPublicKeyInfo.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        PublicKey::from_key_pair(self).to_spki()
    }

    /// Exports the private key as PKCS#8 PEM ("PRIVATE KEY" armor).
    pub fn to_pkcs8_pem(&self) -> Result<Zeroizing<String>> {
        let pem = match self {
            KeyPair::Rsa { private, .. } => private.to_pkcs8_pem(LineEnding::LF)?,
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF)?,
            KeyPair::EcdsaP384 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF)?,
            // v1 PrivateKeyInfo: OpenSSL refuses a v2 "PRIVATE KEY" carrying the public key
            KeyPair::Ed25519 { signing_key } => KeypairBytes {
                secret_key: signing_key.to_bytes(),
                public_key: None,
            }
            .to_pkcs8_pem(LineEnding::LF)?,
        };
        Ok(pem)
    }
}

/// A public key extracted from a key pair or from a request's SPKI.
#[derive(Clone, Debug, PartialEq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
        }
    }

    /// Decodes a SubjectPublicKeyInfo.
    ///
    /// Structurally broken key material is `MalformedInput`; a well-formed
    /// key of an algorithm this crate cannot verify with is
    /// `SignatureVerification`, since the request can then never be verified.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let oid = spki.algorithm.oid;
        if oid == const_oid::db::rfc5912::RSA_ENCRYPTION {
            let der = spki.to_der()?;
            let public = RsaPublicKey::from_public_key_der(&der)
                .map_err(|e| CsrKitError::MalformedInput(format!("invalid RSA public key: {e}")))?;
            return Ok(PublicKey::Rsa(public));
        }

        let key_bytes = spki.subject_public_key.as_bytes().ok_or_else(|| {
            CsrKitError::MalformedInput("public key bit string has unused bits".to_string())
        })?;

        if oid == const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
            let curve: ObjectIdentifier = spki
                .algorithm
                .parameters
                .as_ref()
                .ok_or_else(|| {
                    CsrKitError::MalformedInput("EC public key without curve parameters".to_string())
                })?
                .decode_as()?;
            return match curve {
                const_oid::db::rfc5912::SECP_256_R_1 => P256VerifyingKey::from_sec1_bytes(key_bytes)
                    .map(PublicKey::EcdsaP256)
                    .map_err(|e| CsrKitError::MalformedInput(format!("invalid P-256 point: {e}"))),
                const_oid::db::rfc5912::SECP_384_R_1 => P384VerifyingKey::from_sec1_bytes(key_bytes)
                    .map(PublicKey::EcdsaP384)
                    .map_err(|e| CsrKitError::MalformedInput(format!("invalid P-384 point: {e}"))),
                other => Err(CsrKitError::SignatureVerification(format!(
                    "unsupported elliptic curve {other}"
                ))),
            };
        }

        if oid == const_oid::db::rfc8410::ID_ED_25519 {
            let bytes: [u8; 32] = key_bytes.try_into().map_err(|_| {
                CsrKitError::MalformedInput(format!(
                    "Ed25519 public key must be 32 bytes, got {}",
                    key_bytes.len()
                ))
            })?;
            return Ed25519VerifyingKey::from_bytes(&bytes)
                .map(PublicKey::Ed25519)
                .map_err(|e| CsrKitError::MalformedInput(format!("invalid Ed25519 key: {e}")));
        }

        Err(CsrKitError::SignatureVerification(format!(
            "unsupported public key algorithm {oid}"
        )))
    }

    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let spki = match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())
                .map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
            PublicKey::EcdsaP256(verifying_key) => SubjectPublicKeyInfoOwned::from_key(*verifying_key)
                .map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
            PublicKey::EcdsaP384(verifying_key) => SubjectPublicKeyInfoOwned::from_key(*verifying_key)
                .map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
            PublicKey::Ed25519(verifying_key) => SubjectPublicKeyInfoOwned {
                algorithm: AlgorithmIdentifierOwned {
                    oid: const_oid::db::rfc8410::ID_ED_25519,
                    parameters: None,
                },
                subject_public_key: der::asn1::BitString::from_bytes(verifying_key.as_bytes())
                    .map_err(|e| CsrKitError::EncodingError(e.to_string()))?,
            },
        };
        Ok(spki)
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Rsa(_) => KeyAlgorithm::Rsa,
            PublicKey::EcdsaP256(_) => KeyAlgorithm::EcdsaP256,
            PublicKey::EcdsaP384(_) => KeyAlgorithm::EcdsaP384,
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
        }
    }

    /// Bit length of the RSA modulus, or the curve size for EC and Ed25519 keys.
    pub fn size_bits(&self) -> usize {
        match self {
            PublicKey::Rsa(public) => public.n().bits(),
            PublicKey::EcdsaP256(_) => 256,
            PublicKey::EcdsaP384(_) => 384,
            PublicKey::Ed25519(_) => 256,
        }
    }

    /// Verifies `signature` over `message` under `algorithm`.
    pub fn verify(&self, algorithm: SignatureAlgorithm, message: &[u8], signature: &[u8]) -> Result<()> {
        use ecdsa::signature::hazmat::PrehashVerifier;

        match (self, algorithm.family()) {
            (PublicKey::Rsa(public), SignatureFamily::RsaPkcs1) => {
                let digest = algorithm.digest();
                let scheme = rsa_scheme(digest);
                public
                    .verify(scheme, &hash(digest, message), signature)
                    .map_err(|_| signature_mismatch(algorithm))
            }
            // ecdsa-with-SHAxxx names no curve, the key decides
            (PublicKey::EcdsaP256(verifying_key), SignatureFamily::Ecdsa) => {
                let signature = p256::ecdsa::Signature::from_der(signature).map_err(|e| {
                    CsrKitError::SignatureVerification(format!("malformed ECDSA signature: {e}"))
                })?;
                verifying_key
                    .verify_prehash(&hash(algorithm.digest(), message), &signature)
                    .map_err(|_| signature_mismatch(algorithm))
            }
            (PublicKey::EcdsaP384(verifying_key), SignatureFamily::Ecdsa) => {
                let signature = p384::ecdsa::Signature::from_der(signature).map_err(|e| {
                    CsrKitError::SignatureVerification(format!("malformed ECDSA signature: {e}"))
                })?;
                verifying_key
                    .verify_prehash(&hash(algorithm.digest(), message), &signature)
                    .map_err(|_| signature_mismatch(algorithm))
            }
            (PublicKey::Ed25519(verifying_key), SignatureFamily::Ed25519) => {
                let signature = ed25519_dalek::Signature::from_slice(signature).map_err(|e| {
                    CsrKitError::SignatureVerification(format!("malformed Ed25519 signature: {e}"))
                })?;
                verifying_key
                    .verify_strict(message, &signature)
                    .map_err(|_| signature_mismatch(algorithm))
            }
            (key, _) => Err(CsrKitError::SignatureVerification(format!(
                "signature algorithm {} cannot be used with a {} key",
                algorithm.name(),
                key.algorithm().name()
            ))),
        }
    }
}

fn signature_mismatch(algorithm: SignatureAlgorithm) -> CsrKitError {
    CsrKitError::SignatureVerification(format!(
        "{} signature does not match the request",
        algorithm.name()
    ))
}

fn rsa_scheme(digest: DigestAlgorithm) -> Pkcs1v15Sign {
    match digest {
        DigestAlgorithm::Md5 => Pkcs1v15Sign {
            hash_len: Some(16),
            prefix: MD5_DIGEST_INFO_PREFIX.to_vec().into_boxed_slice(),
        },
        DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        DigestAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        DigestAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        DigestAlgorithm::Sha256 | DigestAlgorithm::Intrinsic => Pkcs1v15Sign::new::<Sha256>(),
    }
}

fn hash(digest: DigestAlgorithm, message: &[u8]) -> Vec<u8> {
    match digest {
        DigestAlgorithm::Md5 => md5::compute(message).0.to_vec(),
        DigestAlgorithm::Sha1 => Sha1::digest(message).to_vec(),
        DigestAlgorithm::Sha224 => Sha224::digest(message).to_vec(),
        DigestAlgorithm::Sha256 => Sha256::digest(message).to_vec(),
        DigestAlgorithm::Sha384 => Sha384::digest(message).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(message).to_vec(),
        DigestAlgorithm::Intrinsic => message.to_vec(),
    }
}
