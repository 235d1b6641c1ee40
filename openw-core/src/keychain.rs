//! Node identity: the key pair a client registers with the remote service,
//! the node id derived from it and the certificate used to sign requests.

use std::fmt;
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::sha256::Hash;
use crate::signatures::{PrivateKey, PublicKey, Signature};
use crate::utils::Saveable;
use crate::CERTIFICATE_ALGORITHM;

/// Base58 SHA-256 of the compressed public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        NodeId(Hash::digest(&public_key.to_sec1_bytes()).to_base58())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Keychain {
    private_key: PrivateKey,
    public_key: PublicKey,
    node_id: NodeId,
}

impl Keychain {
    pub fn generate() -> Self {
        Self::from_private_key(PrivateKey::generate_keypair())
    }

    pub fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        let node_id = NodeId::from_public_key(&public_key);
        Keychain {
            private_key,
            public_key,
            node_id,
        }
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Builds the signing certificate. Fails if the stored public key or
    /// node id no longer match the private key.
    pub fn certificate(&self) -> Result<Certificate> {
        let public_key = self.private_key.public_key();
        if public_key != self.public_key {
            return Err(anyhow!("Keychain public key does not match its private key"));
        }
        let node_id = NodeId::from_public_key(&public_key);
        if node_id != self.node_id {
            return Err(anyhow!(
                "Keychain node id '{}' does not match its public key",
                self.node_id
            ));
        }
        Ok(Certificate {
            private_key: self.private_key.clone(),
            public_key,
            node_id,
        })
    }
}

impl Saveable for Keychain {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to deserialize Keychain: {}", e),
            )
        })
    }

    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to serialize Keychain: {}", e),
            )
        })
    }
}

#[derive(Clone, Debug)]
pub struct Certificate {
    private_key: PrivateKey,
    public_key: PublicKey,
    node_id: NodeId,
}

impl Certificate {
    pub fn algorithm(&self) -> &'static str {
        CERTIFICATE_ALGORITHM
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn sign(&self, hash: &Hash) -> Signature {
        Signature::sign_hash(hash, &self.private_key)
    }

    pub fn verify(&self, hash: &Hash, signature: &Signature) -> bool {
        signature.verify_hash(hash, &self.public_key)
    }
}
