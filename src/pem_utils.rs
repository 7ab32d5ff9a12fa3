use crate::error::{CsrKitError, Result};

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(
        &pem,
        pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF),
    )
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
///
/// Exactly one armored block is accepted and its label must be one of
/// `labels`. Whitespace around the block is ignored; anything else outside
/// it, a missing marker, or mismatched BEGIN/END labels is `MalformedInput`.
pub fn pem_to_der(pem_str: &str, labels: &[&str]) -> Result<Vec<u8>> {
    let trimmed = pem_str.trim();
    if !trimmed.starts_with("-----BEGIN ") {
        return Err(CsrKitError::MalformedInput(
            "missing PEM BEGIN marker".to_string(),
        ));
    }
    if !trimmed.ends_with("-----") || !trimmed.contains("-----END ") {
        return Err(CsrKitError::MalformedInput(
            "missing PEM END marker or trailing data after it".to_string(),
        ));
    }

    let mut blocks = pem::parse_many(trimmed)?;
    let block = match blocks.len() {
        0 => {
            return Err(CsrKitError::MalformedInput(
                "no complete PEM block found".to_string(),
            ));
        }
        1 => blocks.remove(0),
        n => {
            return Err(CsrKitError::MalformedInput(format!(
                "expected one PEM block, found {n}"
            )));
        }
    };

    if !labels.contains(&block.tag()) {
        return Err(CsrKitError::MalformedInput(format!(
            "unexpected PEM label '{}', expected '{}'",
            block.tag(),
            labels.first().copied().unwrap_or_default()
        )));
    }
    if block.contents().is_empty() {
        return Err(CsrKitError::MalformedInput("empty PEM body".to_string()));
    }

    Ok(block.into_contents())
}
