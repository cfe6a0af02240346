//! Certificate generation and persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use time::{Duration, OffsetDateTime};

use crate::config::{CERT_NOT_BEFORE_SKEW_DAYS, CERT_VALIDITY_DAYS};

use super::validate;

/// Certificate provisioning error. Fatal for startup: the server never
/// falls back to a placeholder certificate.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Failed to write certificate files: {0}")]
    Io(#[from] io::Error),

    #[error("Certificate generation failed: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("No hostnames configured for the certificate")]
    NoHostnames,
}

/// Paths of a validated private-key/certificate pair.
#[derive(Debug, Clone)]
pub struct CertificateBundle {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Ensure a usable key/certificate pair exists at the given paths.
///
/// An existing pair that parses, is correctly self-signed, matches
/// key-to-certificate, is currently within its validity window, and covers
/// every requested hostname is reused without touching the files. Anything
/// else - missing, expired, corrupt, mismatched, or short a hostname - is
/// replaced by a freshly generated self-signed pair with subject CN set to
/// the first hostname and SANs covering all of them.
pub fn ensure_certificate(
    key_path: &Path,
    cert_path: &Path,
    hostnames: &[String],
) -> Result<CertificateBundle, ProvisionError> {
    if hostnames.is_empty() {
        return Err(ProvisionError::NoHostnames);
    }

    let bundle = CertificateBundle {
        cert_path: cert_path.to_path_buf(),
        key_path: key_path.to_path_buf(),
    };

    if cert_path.exists() && key_path.exists() {
        match validate::validate_pair(cert_path, key_path, hostnames) {
            Ok(()) => {
                tracing::info!(
                    cert = %cert_path.display(),
                    key = %key_path.display(),
                    "Reusing existing certificate"
                );
                return Ok(bundle);
            }
            Err(reason) => {
                tracing::warn!(%reason, "Existing certificate unusable, regenerating");
            }
        }
    }

    generate_pair(key_path, cert_path, hostnames)?;
    tracing::info!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        hostnames = ?hostnames,
        "Generated self-signed certificate (development use only)"
    );

    Ok(bundle)
}

/// Generate a fresh ECDSA P-256 key pair and self-signed certificate and
/// persist both, replacing whatever was at the target paths.
fn generate_pair(
    key_path: &Path,
    cert_path: &Path,
    hostnames: &[String],
) -> Result<(), ProvisionError> {
    let key_pair = KeyPair::generate()?;

    let mut params = CertificateParams::new(hostnames.to_vec())?;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, hostnames[0].as_str());
    params.distinguished_name = dn;

    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(CERT_NOT_BEFORE_SKEW_DAYS);
    params.not_after = now + Duration::days(CERT_VALIDITY_DAYS);

    let cert = params.self_signed(&key_pair)?;

    // Both temp files are fully written before either rename, so a crash
    // mid-replacement never leaves a mixed-generation pair behind.
    let key_tmp = write_sibling(key_path, key_pair.serialize_pem().as_bytes(), true)?;
    let cert_tmp = write_sibling(cert_path, cert.pem().as_bytes(), false)?;
    fs::rename(&key_tmp, key_path)?;
    fs::rename(&cert_tmp, cert_path)?;

    Ok(())
}

/// Write contents to a temporary sibling of `path` and return the temp
/// path, optionally restricting permissions to owner-only first.
fn write_sibling(path: &Path, contents: &[u8], restrict: bool) -> io::Result<PathBuf> {
    let tmp = path.with_extension("pem.tmp");
    fs::write(&tmp, contents)?;
    if restrict {
        restrict_permissions(&tmp)?;
    }
    Ok(tmp)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
