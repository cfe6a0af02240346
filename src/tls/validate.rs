//! Certificate pair validation.
//!
//! A pair on disk is usable when both files parse, the private key matches
//! the certificate's public key, the self-signature verifies, the current
//! time falls inside the validity window, and the certificate covers every
//! requested hostname. The provisioner logs the rejection reason and
//! regenerates on any failure.

use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::net::IpAddr;
use std::path::Path;

use rcgen::PublicKeyData;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use time::OffsetDateTime;
use x509_parser::extensions::GeneralName;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

/// Reason an on-disk pair was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("certificate does not parse: {0}")]
    CertParse(String),

    #[error("private key does not parse: {0}")]
    KeyParse(String),

    #[error("certificate is not yet valid")]
    NotYetValid,

    #[error("certificate is expired")]
    Expired,

    #[error("self-signature does not verify: {0}")]
    BadSignature(String),

    #[error("private key does not match certificate public key")]
    KeyMismatch,

    #[error("certificate does not cover hostname {0}")]
    MissingHostname(String),
}

/// Validate the pair at the given paths against the requested hostnames.
pub fn validate_pair(
    cert_path: &Path,
    key_path: &Path,
    hostnames: &[String],
) -> Result<(), ValidationError> {
    load_cert_chain(cert_path)?;
    load_private_key(key_path)?;

    let bytes = fs::read(cert_path)?;
    let (_, pem) =
        parse_x509_pem(&bytes).map_err(|e| ValidationError::CertParse(e.to_string()))?;
    let (_, cert) = X509Certificate::from_der(pem.contents.as_slice())
        .map_err(|e| ValidationError::CertParse(e.to_string()))?;

    let now = OffsetDateTime::now_utc();
    if now < cert.validity().not_before.to_datetime() {
        return Err(ValidationError::NotYetValid);
    }
    if now >= cert.validity().not_after.to_datetime() {
        return Err(ValidationError::Expired);
    }

    // Self-signed: the certificate's own key must verify its signature.
    cert.verify_signature(None)
        .map_err(|e| ValidationError::BadSignature(e.to_string()))?;

    // Pairing: the key's public half must equal the certificate's SPKI.
    let key_pem = fs::read_to_string(key_path)?;
    let key_pair = rcgen::KeyPair::from_pem(&key_pem)
        .map_err(|e| ValidationError::KeyParse(e.to_string()))?;
    if key_pair.subject_public_key_info().as_slice() != cert.public_key().raw {
        return Err(ValidationError::KeyMismatch);
    }

    let covered = cert_names(&cert);
    for host in hostnames {
        if !covered.contains(&normalize_host(host)) {
            return Err(ValidationError::MissingHostname(host.clone()));
        }
    }

    Ok(())
}

fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, ValidationError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let certs: Result<Vec<_>, _> = CertificateDer::pem_reader_iter(reader).collect();
    let certs = certs.map_err(|e| ValidationError::CertParse(e.to_string()))?;

    if certs.is_empty() {
        return Err(ValidationError::CertParse(format!(
            "no certificates in {}",
            path.display()
        )));
    }

    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ValidationError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let keys: Result<Vec<_>, _> = PrivateKeyDer::pem_reader_iter(reader).collect();
    let keys = keys.map_err(|e| ValidationError::KeyParse(e.to_string()))?;

    keys.into_iter().next().ok_or_else(|| {
        ValidationError::KeyParse(format!("no private keys in {}", path.display()))
    })
}

/// All names the certificate covers: SAN DNS names, SAN IP addresses, and
/// the subject common name, normalized for comparison.
fn cert_names(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut names = Vec::new();

    if let Ok(Some(san)) = cert.subject_alternative_name() {
        for name in san.value.general_names.iter() {
            match name {
                GeneralName::DNSName(dns) => names.push(normalize_host(dns)),
                GeneralName::IPAddress(bytes) => {
                    if let Some(ip) = ip_from_bytes(bytes) {
                        names.push(ip.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    for cn in cert.subject().iter_common_name() {
        if let Ok(value) = cn.as_str() {
            names.push(normalize_host(value));
        }
    }

    names
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        16 => {
            let octets: [u8; 16] = bytes.try_into().ok()?;
            Some(IpAddr::from(octets))
        }
        _ => None,
    }
}

/// Canonicalize a hostname for matching: IP addresses through their parsed
/// form (so "::1" and its long spelling compare equal), DNS names
/// lowercased with any trailing dot removed.
fn normalize_host(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => host.trim().trim_end_matches('.').to_lowercase(),
    }
}
