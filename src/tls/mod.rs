//! Self-signed certificate provisioning.
//!
//! Makes sure a usable private-key/certificate pair exists on disk before
//! the server binds. An existing pair is validated (parse, key/cert
//! pairing, self-signature, validity window, hostname coverage) and reused
//! untouched; anything else is replaced by a freshly generated pair.

mod provision;
mod validate;

pub use provision::{ensure_certificate, CertificateBundle, ProvisionError};
