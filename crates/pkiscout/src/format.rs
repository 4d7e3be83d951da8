//! Format registry: map file extensions to decoders that split raw bytes
//! into tagged DER blocks.
//!
//! A decoder is a plain function, so new encodings can be registered without
//! touching the reader or the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use pkcs8::spki::SubjectPublicKeyInfoRef;
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::pkcs1;
use thiserror::Error;
use x509_parser::prelude::{parse_x509_certificate, parse_x509_crl, FromDer, X509CertificationRequest};

/// One decoded block: the encoding-type tag, its headers, and DER bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// PEM label, or the label DER sniffing assigned
    pub tag: String,
    /// Header lines in file order
    pub headers: Vec<(String, String)>,
    /// Decoded bytes
    pub der: Vec<u8>,
}

impl Block {
    /// A block without headers
    pub fn new(tag: impl Into<String>, der: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            headers: Vec::new(),
            der,
        }
    }
}

/// Why a decoder produced nothing.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// PEM envelope present but malformed
    #[error("malformed PEM: {0}")]
    Pem(#[from] pem::PemError),

    /// Bytes did not match any structure this decoder knows
    #[error("no recognizable content")]
    Unrecognized,
}

/// Pure decoding function: bytes in, tagged blocks out.
pub type Decoder = fn(&[u8]) -> Result<Vec<Block>, DecodeError>;

/// Built-in extension table. Extensions are lowercase without a dot.
const STANDARD: &[(&str, Decoder)] = &[
    ("pem", decode_pem),
    ("key", decode_pem),
    ("pub", decode_pem),
    ("crt", decode_pem_or_der),
    ("cer", decode_pem_or_der),
    ("cert", decode_pem_or_der),
    ("csr", decode_pem_or_der),
    ("req", decode_pem_or_der),
    ("crl", decode_pem_or_der),
    ("der", sniff_der),
    ("p8", sniff_der),
    ("pk8", sniff_der),
];

/// Extension to decoder mapping with a default for everything else.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    decoders: HashMap<String, Decoder>,
    fallback: Decoder,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FormatRegistry {
    /// Registry with the built-in table.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            decoders: STANDARD
                .iter()
                .map(|(ext, decoder)| ((*ext).to_string(), *decoder))
                .collect(),
            fallback: decode_any,
        }
    }

    /// Register (or replace) the decoder for an extension.
    #[must_use]
    pub fn register(mut self, extension: &str, decoder: Decoder) -> Self {
        self.decoders
            .insert(normalize_extension(extension), decoder);
        self
    }

    /// Replace the decoder used for unknown or missing extensions.
    #[must_use]
    pub fn with_fallback(mut self, decoder: Decoder) -> Self {
        self.fallback = decoder;
        self
    }

    /// Decoder that handles `extension`
    #[must_use]
    pub fn decoder_for(&self, extension: Option<&str>) -> Decoder {
        extension
            .and_then(|ext| self.decoders.get(&normalize_extension(ext)))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Decode `bytes` with the decoder registered for `extension`.
    pub fn decode(&self, extension: Option<&str>, bytes: &[u8]) -> Result<Vec<Block>, DecodeError> {
        (self.decoder_for(extension))(bytes)
    }

    /// Shared handle for reader tasks
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_ascii_lowercase()
}

/// PEM text, possibly several blocks.
pub fn decode_pem(bytes: &[u8]) -> Result<Vec<Block>, DecodeError> {
    let blocks: Vec<Block> = pem::parse_many(bytes)?
        .into_iter()
        .map(|p| Block {
            tag: p.tag().to_string(),
            headers: p
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            der: p.into_contents(),
        })
        .collect();

    if blocks.is_empty() {
        return Err(DecodeError::Unrecognized);
    }
    Ok(blocks)
}

/// PEM text, or a single DER structure when the file holds no PEM.
pub fn decode_pem_or_der(bytes: &[u8]) -> Result<Vec<Block>, DecodeError> {
    match decode_pem(bytes) {
        Ok(blocks) => Ok(blocks),
        Err(_) => sniff_der(bytes),
    }
}

/// Identify a single binary DER structure.
pub fn sniff_der(bytes: &[u8]) -> Result<Vec<Block>, DecodeError> {
    let tag = sniff_key(bytes)
        .or_else(|| sniff_x509(bytes))
        .ok_or(DecodeError::Unrecognized)?;
    Ok(vec![Block::new(tag, bytes.to_vec())])
}

/// Default chain: PEM, then key DER, then certificate, request, CRL.
pub fn decode_any(bytes: &[u8]) -> Result<Vec<Block>, DecodeError> {
    decode_pem(bytes).or_else(|_| sniff_der(bytes))
}

/// Key structures, most specific first.
fn sniff_key(der: &[u8]) -> Option<&'static str> {
    if PrivateKeyInfo::try_from(der).is_ok() {
        return Some("PRIVATE KEY");
    }
    if EncryptedPrivateKeyInfo::try_from(der).is_ok() {
        return Some("ENCRYPTED PRIVATE KEY");
    }
    if pkcs1::RsaPrivateKey::try_from(der).is_ok() {
        return Some("RSA PRIVATE KEY");
    }
    if p256::SecretKey::from_sec1_der(der).is_ok() || p384::SecretKey::from_sec1_der(der).is_ok() {
        return Some("EC PRIVATE KEY");
    }
    if SubjectPublicKeyInfoRef::try_from(der).is_ok() {
        return Some("PUBLIC KEY");
    }
    if pkcs1::RsaPublicKey::try_from(der).is_ok() {
        return Some("RSA PUBLIC KEY");
    }
    None
}

/// X.509 structures. Trailing bytes disqualify a match.
fn sniff_x509(der: &[u8]) -> Option<&'static str> {
    if matches!(parse_x509_certificate(der), Ok((rem, _)) if rem.is_empty()) {
        return Some("CERTIFICATE");
    }
    if matches!(X509CertificationRequest::from_der(der), Ok((rem, _)) if rem.is_empty()) {
        return Some("CERTIFICATE REQUEST");
    }
    if matches!(parse_x509_crl(der), Ok((rem, _)) if rem.is_empty()) {
        return Some("X509 CRL");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_CRT: &[u8] = include_bytes!("../testdata/rsa.crt");
    const RSA_CRT_DER: &[u8] = include_bytes!("../testdata/rsa.crt.der");
    const EC_KEY_DER: &[u8] = include_bytes!("../testdata/ec.key.der");
    const EC_SEC1_DER: &[u8] = include_bytes!("../testdata/ec_sec1.key.der");
    const EC_PUB_DER: &[u8] = include_bytes!("../testdata/ec.pub.der");
    const EC_CSR_DER: &[u8] = include_bytes!("../testdata/ec.csr.der");
    const BUNDLE: &[u8] = include_bytes!("../testdata/bundle.pem");
    const LEGACY: &[u8] = include_bytes!("../testdata/legacy_enc.key");

    fn tags(blocks: &[Block]) -> Vec<&str> {
        blocks.iter().map(|b| b.tag.as_str()).collect()
    }

    #[test]
    fn pem_bundle_keeps_block_order() {
        let blocks = decode_pem(BUNDLE).unwrap();
        assert_eq!(tags(&blocks), vec!["CERTIFICATE", "CERTIFICATE"]);
        assert_ne!(blocks[0].der, blocks[1].der);
    }

    #[test]
    fn pem_headers_are_kept() {
        let blocks = decode_pem(LEGACY).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag, "RSA PRIVATE KEY");
        assert!(blocks[0]
            .headers
            .iter()
            .any(|(k, v)| k == "Proc-Type" && v.contains("ENCRYPTED")));
    }

    #[test]
    fn der_sniffing_identifies_structures() {
        assert_eq!(tags(&sniff_der(RSA_CRT_DER).unwrap()), vec!["CERTIFICATE"]);
        assert_eq!(tags(&sniff_der(EC_KEY_DER).unwrap()), vec!["PRIVATE KEY"]);
        assert_eq!(tags(&sniff_der(EC_SEC1_DER).unwrap()), vec!["EC PRIVATE KEY"]);
        assert_eq!(tags(&sniff_der(EC_PUB_DER).unwrap()), vec!["PUBLIC KEY"]);
        assert_eq!(
            tags(&sniff_der(EC_CSR_DER).unwrap()),
            vec!["CERTIFICATE REQUEST"]
        );
    }

    #[test]
    fn pem_and_der_certificates_decode_to_same_bytes() {
        let from_pem = decode_pem(RSA_CRT).unwrap();
        let from_der = sniff_der(RSA_CRT_DER).unwrap();
        assert_eq!(from_pem[0].der, from_der[0].der);
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert!(matches!(
            decode_any(b"just some notes"),
            Err(DecodeError::Unrecognized)
        ));
        assert!(matches!(
            sniff_der(&[0x30, 0x03, 0x02, 0x01, 0x00]),
            Err(DecodeError::Unrecognized)
        ));
    }

    #[test]
    fn registry_dispatches_by_extension() {
        let registry = FormatRegistry::standard();

        // DER under a PEM-only extension is not accepted.
        assert!(registry.decode(Some("pem"), RSA_CRT_DER).is_err());
        assert!(registry.decode(Some("CRT"), RSA_CRT_DER).is_ok());
        assert!(registry.decode(Some("der"), EC_KEY_DER).is_ok());
        assert!(registry.decode(None, EC_PUB_DER).is_ok());
        assert!(registry.decode(Some("bin"), RSA_CRT).is_ok());
    }

    #[test]
    fn registered_decoder_wins() {
        fn always_empty(_: &[u8]) -> Result<Vec<Block>, DecodeError> {
            Ok(vec![Block::new("OPAQUE", vec![])])
        }

        let registry = FormatRegistry::standard().register(".blob", always_empty);
        let blocks = registry.decode(Some("blob"), b"whatever").unwrap();
        assert_eq!(tags(&blocks), vec!["OPAQUE"]);
    }
}
