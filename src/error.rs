//! use csrkit::error::CsrKitError;

use thiserror::Error;

/// Represents errors that can occur in the CsrKit library.
///
/// Builder failures are `InvalidSubject`, `UnsupportedKeySize` and
/// `KeyGeneration`; parser failures are `MalformedInput` and
/// `SignatureVerification`. None of them is retried internally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CsrKitError {
    /// A required subject field is missing or a field fails validation.
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// The requested key size is not one of the accepted sizes.
    #[error("Unsupported key size: {0} bits")]
    UnsupportedKeySize(usize),

    /// The requested key type is not one this crate generates.
    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// The key pair could not be produced.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// The PEM armor or the DER structure could not be decoded.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The self-signature does not verify against the embedded public key.
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// Error while encoding an output structure.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),
}

pub type Result<T> = std::result::Result<T, CsrKitError>;

impl From<der::Error> for CsrKitError {
    /// Converts a `der::Error` into a `CsrKitError`.
    fn from(err: der::Error) -> Self {
        CsrKitError::MalformedInput(err.to_string())
    }
}

impl From<pem::PemError> for CsrKitError {
    fn from(err: pem::PemError) -> Self {
        CsrKitError::MalformedInput(err.to_string())
    }
}

impl From<rsa::Error> for CsrKitError {
    fn from(err: rsa::Error) -> Self {
        CsrKitError::KeyGeneration(err.to_string())
    }
}

impl From<pkcs8::Error> for CsrKitError {
    fn from(err: pkcs8::Error) -> Self {
        CsrKitError::EncodingError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CsrKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CsrKitError::MalformedInput(err.to_string())
    }
}
