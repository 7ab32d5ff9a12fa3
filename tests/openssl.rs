mod util;

use std::fs;
use std::process::Command;

use csrkit::assessment::{Rating, RatingPolicy};
use csrkit::csr::{self, SignatureAlgorithm};
use csrkit::key::{KeyAlgorithm, KeySpec};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509NameBuilder, X509Req, X509ReqBuilder};

fn openssl_csr(pkey: &PKey<Private>, digest: MessageDigest) -> String {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("C", "US").unwrap();
    name.append_entry_by_text("O", "OpenSSL Org").unwrap();
    name.append_entry_by_text("CN", "openssl.example.com").unwrap();
    let name = name.build();

    let mut builder = X509ReqBuilder::new().unwrap();
    builder.set_pubkey(pkey).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.sign(pkey, digest).unwrap();
    String::from_utf8(builder.build().to_pem().unwrap()).unwrap()
}

fn cn_of(req: &X509Req) -> String {
    req.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_crate_verifies_generated_csr() {
    for spec in [
        KeySpec::rsa(2048).unwrap(),
        KeySpec::EcdsaP256,
        KeySpec::EcdsaP384,
        KeySpec::Ed25519,
    ] {
        let credential = csr::build(&util::full_profile(), &spec).unwrap();

        let req = X509Req::from_pem(credential.csr.as_bytes()).expect("Failed to parse PEM");
        let public_key = req.public_key().unwrap();
        assert!(req.verify(&public_key).unwrap(), "{spec:?} self-signature");
        assert_eq!(req.version(), 0);
        assert_eq!(cn_of(&req), "full.example.com");

        let email = req
            .subject_name()
            .entries_by_nid(Nid::PKCS9_EMAILADDRESS)
            .next()
            .unwrap()
            .data()
            .as_utf8()
            .unwrap();
        assert_eq!(email.to_string(), "pki@example.com");

        let private_key = PKey::private_key_from_pem(credential.private_key.as_bytes())
            .expect("PKCS#8 private key");
        assert!(private_key.public_eq(&public_key), "{spec:?} key pair mismatch");
    }
}

#[test]
fn test_openssl_cli_verifies_generated_csr() {
    let credential = csr::build(&util::test_profile(), &KeySpec::EcdsaP256).unwrap();

    let csr_path = std::env::temp_dir().join(format!("csrkit-{}.csr", std::process::id()));
    fs::write(&csr_path, &credential.csr).expect("Failed to write CSR");

    let output = Command::new("openssl")
        .arg("req")
        .arg("-in")
        .arg(&csr_path)
        .arg("-noout")
        .arg("-verify")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");
    fs::remove_file(&csr_path).ok();

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stdout.contains("verify OK") || stderr.contains("verify OK"),
        "signature not verified by openssl"
    );
    assert!(
        stdout.contains("Subject: C = US, O = Test Org, CN = test.example.com")
            || stdout.contains("Subject: C=US, O=Test Org, CN=test.example.com"),
        "Subject field is incorrect:\n{stdout}"
    );
    assert!(
        stdout.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );
}

#[test]
fn test_parser_accepts_openssl_csrs() {
    let rsa = PKey::from_rsa(openssl::rsa::Rsa::generate(2048).unwrap()).unwrap();
    let cases = [
        (
            openssl_csr(&rsa, MessageDigest::sha256()),
            SignatureAlgorithm::Sha256WithRSA,
            Rating::Acceptable,
        ),
        (
            openssl_csr(&rsa, MessageDigest::sha512()),
            SignatureAlgorithm::Sha512WithRSA,
            Rating::Acceptable,
        ),
        (
            openssl_csr(&rsa, MessageDigest::sha1()),
            SignatureAlgorithm::Sha1WithRSA,
            Rating::Weak,
        ),
        (
            openssl_csr(&rsa, MessageDigest::sha224()),
            SignatureAlgorithm::Sha224WithRSA,
            Rating::Acceptable,
        ),
        (
            openssl_csr(&rsa, MessageDigest::md5()),
            SignatureAlgorithm::Md5WithRSA,
            Rating::Insecure,
        ),
    ];

    for (pem, algorithm, overall) in cases {
        let report = csr::validate(&pem, &RatingPolicy::default()).unwrap();
        assert_eq!(report.csr.signature_algorithm, algorithm);
        assert_eq!(report.csr.key_size_bits, 2048);
        assert_eq!(report.csr.subject.get("CN"), Some("openssl.example.com"));
        assert_eq!(report.assessment.overall_rating, overall, "{algorithm}");
    }
}

#[test]
fn test_parser_accepts_openssl_ec_and_ed25519_csrs() {
    let group = openssl::ec::EcGroup::from_curve_name(Nid::SECP384R1).unwrap();
    let ec = PKey::from_ec_key(openssl::ec::EcKey::generate(&group).unwrap()).unwrap();
    let parsed = csr::parse(openssl_csr(&ec, MessageDigest::sha384())).unwrap();
    assert_eq!(parsed.public_key_algorithm, KeyAlgorithm::EcdsaP384);
    assert_eq!(parsed.signature_algorithm, SignatureAlgorithm::Sha384WithECDSA);

    // P-256 key with a SHA-512 digest
    let group = openssl::ec::EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let ec = PKey::from_ec_key(openssl::ec::EcKey::generate(&group).unwrap()).unwrap();
    let parsed = csr::parse(openssl_csr(&ec, MessageDigest::sha512())).unwrap();
    assert_eq!(parsed.curve, Some("P-256"));
    assert_eq!(parsed.signature_algorithm, SignatureAlgorithm::Sha512WithECDSA);

    let ed = PKey::generate_ed25519().unwrap();
    let parsed = csr::parse(openssl_csr(&ed, MessageDigest::null())).unwrap();
    assert_eq!(parsed.public_key_algorithm, KeyAlgorithm::Ed25519);
}

#[test]
#[ignore = "RSA-4096 generation is slow"]
fn test_openssl_rsa_4096_rates_strong() {
    let rsa = PKey::from_rsa(openssl::rsa::Rsa::generate(4096).unwrap()).unwrap();
    let report = csr::validate(openssl_csr(&rsa, MessageDigest::sha256()), &RatingPolicy::default())
        .unwrap();
    assert_eq!(report.csr.key_size_bits, 4096);
    assert_eq!(report.assessment.overall_rating, Rating::Strong);
}
