//! # CsrKit - PKCS#10 Certificate Signing Requests in Pure Rust
//!
//! CsrKit generates and inspects PKCS#10 certificate signing requests (CSRs)
//! using the RustCrypto libraries. It creates a key pair and a self-signed
//! request in one call, and parses arbitrary requests back, verifying the
//! self-signature before reporting anything about them.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 and 4096-bit keys, signed with SHA-256
//! - **ECDSA**: P-256 (SHA-256) and P-384 (SHA-384)
//! - **Ed25519**
//!
//! The parser additionally verifies RSA requests signed with MD5, SHA-1,
//! SHA-224, SHA-384 and SHA-512 so that legacy requests can be rated.
//!
//! ## Quick Start
//!
//! ### Generating a Request
//!
//! ```rust,no_run
//! use csrkit::{csr::{self, params::SubjectProfile}, key::KeySpec};
//!
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! let profile = SubjectProfile::builder()
//!     .common_name("test.example.com".to_string())
//!     .organization("Test Org".to_string())
//!     .country("US".to_string())
//!     .build();
//!
//! let credential = csr::build(&profile, &KeySpec::rsa(2048)?)?;
//! println!("{}", credential.csr);
//! // credential.private_key is PKCS#8 PEM and is wiped on drop
//! # Ok(())
//! # }
//! ```
//!
//! ### Validating a Request
//!
//! ```rust,no_run
//! use csrkit::{assessment::RatingPolicy, csr};
//!
//! # fn main() -> Result<(), csrkit::error::CsrKitError> {
//! # let pem = "";
//! let report = csr::validate(pem, &RatingPolicy::default())?;
//! println!(
//!     "{} ({} bits, {}): {}",
//!     report.csr.subject,
//!     report.csr.key_size_bits,
//!     report.csr.signature_algorithm,
//!     report.assessment.overall_rating
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use csrkit::{csr, error::CsrKitError};
//!
//! match csr::parse("not a certificate request") {
//!     Ok(_) => unreachable!(),
//!     Err(CsrKitError::MalformedInput(msg)) => println!("Malformed: {}", msg),
//!     Err(CsrKitError::SignatureVerification(msg)) => println!("Bad signature: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, PKCS#8 export and signature verification
//! - [`csr`]: Request building, parsing and the subject / extension models
//! - [`assessment`]: Strength ratings and the thresholds behind them
//! - [`compare`]: Differences between two requests
//! - [`naming`]: Common-name suggestions per service and environment
//! - [`pem_utils`]: Strict PEM armor handling
//! - [`config`]: Layered server configuration
//! - [`server`]: The axum HTTP front
//! - [`error`]: Error types

pub mod assessment;
pub mod compare;
pub mod config;
pub mod csr;
pub mod error;
pub mod key;
pub mod naming;
pub mod pem_utils;
pub mod server;
