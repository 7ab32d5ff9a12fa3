#![allow(dead_code)]

use csrkit::csr::params::SubjectProfile;

pub fn test_profile() -> SubjectProfile {
    SubjectProfile::builder()
        .common_name("test.example.com".to_string())
        .organization("Test Org".to_string())
        .country("US".to_string())
        .build()
}

pub fn full_profile() -> SubjectProfile {
    SubjectProfile::builder()
        .common_name("full.example.com".to_string())
        .organization("Test Org".to_string())
        .organizational_unit("Platform".to_string())
        .locality("Riyadh".to_string())
        .state("Riyadh Province".to_string())
        .country("SA".to_string())
        .email("pki@example.com".to_string())
        .build()
}

/// Replaces the first occurrence of `needle` in `haystack`.
pub fn replace_once(haystack: &mut [u8], needle: &[u8], replacement: &[u8]) {
    assert_eq!(needle.len(), replacement.len());
    let at = haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .expect("needle present");
    haystack[at..at + needle.len()].copy_from_slice(replacement);
}
