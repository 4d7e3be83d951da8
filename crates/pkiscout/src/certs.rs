//! Certificate summaries for listings.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use pkiscout_core::{Resource, ResourceKind, Result, ScanError};

use crate::hash::sha256_bytes;

/// The fields of a certificate a listing shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateSummary {
    /// SHA-256 of the certificate DER
    pub fingerprint: String,
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Serial number, colon-separated hex
    pub serial: String,
    /// Start of validity
    pub not_before: DateTime<Utc>,
    /// End of validity
    pub not_after: DateTime<Utc>,
    /// True when `not_after` is in the past
    pub expired: bool,
    /// Subject equals issuer
    pub self_signed: bool,
}

/// Summarize a certificate resource.
///
/// # Errors
///
/// Returns `ScanError::Decode` if the resource is not a parseable certificate.
pub fn summarize(resource: &Resource) -> Result<CertificateSummary> {
    let path = resource.location.to_string();
    if resource.kind != ResourceKind::Certificate {
        return Err(ScanError::Decode {
            path,
            reason: format!("{} is not a certificate", resource.kind),
        });
    }

    let (_, cert) = x509_parser::parse_x509_certificate(&resource.payload).map_err(|e| {
        ScanError::Decode {
            path,
            reason: e.to_string(),
        }
    })?;

    let subject = cert.subject().to_string();
    let issuer = cert.issuer().to_string();
    let not_before = asn1_to_utc(cert.validity().not_before);
    let not_after = asn1_to_utc(cert.validity().not_after);

    Ok(CertificateSummary {
        fingerprint: sha256_bytes(&resource.payload),
        self_signed: subject == issuer,
        subject,
        issuer,
        serial: cert.raw_serial_as_string(),
        not_before,
        not_after,
        expired: Utc::now() > not_after,
    })
}

/// Convert an ASN.1 `GeneralizedTime` / `UTCTime` to `DateTime<Utc>`.
fn asn1_to_utc(t: x509_parser::time::ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}
