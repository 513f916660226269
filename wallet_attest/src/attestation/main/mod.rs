mod apple;
mod authdata;
mod chain;
mod core;
mod decode;
mod google;
mod root;
mod service_account;

#[cfg(test)]
pub(crate) mod test_utils;

pub use self::core::{AttestationVerifier, http_client};
pub use google::IntegrityTokenVerifier;
pub use root::{RootCertificateCache, TrustedRoot, fetch_trusted_root, load_trusted_root};
