pub mod keychain;
pub mod sha256;
pub mod signatures;
pub mod utils;

/// Identifier of the remote service node that clients address their calls to.
pub const DEFAULT_HOST_NODE_ID: &str = "openw-server";

/// Only signature scheme issued by this crate.
pub const CERTIFICATE_ALGORITHM: &str = "secp256k1";
