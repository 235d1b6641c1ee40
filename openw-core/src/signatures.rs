use anyhow::anyhow;
use anyhow::Context;
use ecdsa::{
    signature::{Signer, Verifier},
    Signature as ECDSASignature, SigningKey, VerifyingKey,
};
use k256::Secp256k1;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use std::io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Write};
use std::str::FromStr;

use crate::sha256::Hash;
use crate::utils::Saveable;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Signature(pub ECDSASignature<Secp256k1>);

impl Signature {
    pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Self {
        Signature(private_key.0.sign(message))
    }

    pub fn sign_hash(hash: &Hash, private_key: &PrivateKey) -> Self {
        Self::sign_message(&hash.as_bytes()[..], private_key)
    }

    pub fn verify_message(&self, message: &[u8], public_key: &PublicKey) -> bool {
        public_key.0.verify(message, &self.0).is_ok()
    }

    pub fn verify_hash(&self, hash: &Hash, public_key: &PublicKey) -> bool {
        self.verify_message(&hash.as_bytes()[..], public_key)
    }

    /// DER encoding, hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_der().as_bytes())
    }
}

impl FromStr for Signature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).context("Failed to hex-decode signature string")?;
        ECDSASignature::<Secp256k1>::from_der(&bytes)
            .map(Signature)
            .map_err(|e| anyhow!("Failed to parse DER signature: {}", e))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PublicKey(pub VerifyingKey<Secp256k1>);

impl PublicKey {
    /// Compressed SEC1 point, hex.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.to_sec1_bytes())
    }

    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(true).as_bytes().to_vec()
    }
}

impl FromStr for PublicKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).context("Failed to hex-decode public key string")?;
        VerifyingKey::from_sec1_bytes(&bytes)
            .map(PublicKey)
            .map_err(|e| anyhow!("Failed to create VerifyingKey from bytes: {}", e))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PrivateKey(#[serde(with = "signkey_serde")] pub SigningKey<Secp256k1>);

impl PrivateKey {
    pub fn generate_keypair() -> Self {
        PrivateKey(SigningKey::random(&mut OsRng))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().clone())
    }

    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.to_bytes().to_vec())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes().as_slice())
    }

    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        SigningKey::from_slice(bytes)
            .map(PrivateKey)
            .map_err(|e| anyhow!("Failed to create SigningKey from bytes: {}", e))
    }
}

impl FromStr for PrivateKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = Zeroizing::new(
            hex::decode(s).context("Failed to hex-decode private key string")?,
        );
        Self::from_slice(&bytes)
    }
}

impl Saveable for PublicKey {
    fn load<I: Read>(reader: I) -> IoResult<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to deserialize PublicKey: {}", e),
            )
        })
    }

    fn save<O: Write>(&self, writer: O) -> IoResult<()> {
        serde_json::to_writer(writer, self).map_err(|e| {
            IoError::new(
                IoErrorKind::InvalidData,
                format!("Failed to serialize PublicKey: {}", e),
            )
        })
    }
}

mod signkey_serde {
    use serde::Deserialize;
    pub fn serialize<S>(
        key: &super::SigningKey<super::Secp256k1>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&key.to_bytes())
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<super::SigningKey<super::Secp256k1>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes: Vec<u8> = Vec::<u8>::deserialize(deserializer)?;
        super::SigningKey::from_slice(&bytes).map_err(|e| {
            serde::de::Error::custom(format!("Failed to create SigningKey from bytes: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_only_for_signer() {
        let alice = PrivateKey::generate_keypair();
        let bob = PrivateKey::generate_keypair();
        let hash = Hash::digest(b"register node");

        let signature = Signature::sign_hash(&hash, &alice);
        assert!(signature.verify_hash(&hash, &alice.public_key()));
        assert!(!signature.verify_hash(&hash, &bob.public_key()));
        assert!(!signature.verify_hash(&Hash::digest(b"other"), &alice.public_key()));
    }

    #[test]
    fn signature_survives_hex_encoding() {
        let key = PrivateKey::generate_keypair();
        let signature = Signature::sign_message(b"payload", &key);
        let parsed: Signature = signature.to_hex().parse().unwrap();
        assert!(parsed.verify_message(b"payload", &key.public_key()));
    }

    #[test]
    fn private_key_hex_restores_same_public_key() {
        let key = PrivateKey::generate_keypair();
        let restored: PrivateKey = key.to_hex().parse().unwrap();
        assert_eq!(restored.public_key(), key.public_key());

        let public: PublicKey = key.public_key().fingerprint().parse().unwrap();
        assert_eq!(public, key.public_key());
    }

    #[test]
    fn public_key_file_loads_back() {
        let key = PrivateKey::generate_keypair();
        let mut buffer = Vec::new();
        key.public_key().save(&mut buffer).unwrap();
        assert_eq!(PublicKey::load(buffer.as_slice()).unwrap(), key.public_key());
        assert!(PublicKey::load(&b"{}"[..]).is_err());
    }

    #[test]
    fn rejects_malformed_private_key() {
        assert!("zz".parse::<PrivateKey>().is_err());
        assert!(PrivateKey::from_slice(&[0u8; 32]).is_err());
    }
}
