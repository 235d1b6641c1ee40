// openw-cli/src/wallet/storage.rs
use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key as AesKey, Nonce,
};
use anyhow::{anyhow, bail};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use base64::{engine::general_purpose, Engine as Base64Engine};
use chrono::{DateTime, Utc};
use log::{debug, info};
use password_hash::SaltString;
use rand::{rngs::OsRng, RngCore};
use redb::{Database, DatabaseError, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::wallet::constants::*;
use crate::wallet::error::{Error, Result};
use openw_core::{
    keychain::Keychain,
    sha256::Hash,
    signatures::{PrivateKey, PublicKey},
};

type BytesTable = TableDefinition<'static, &'static str, &'static [u8]>;

const KEYCHAIN_TABLE: BytesTable = TableDefinition::new("keychain");
const WALLETS_TABLE: BytesTable = TableDefinition::new("wallets");
const CURRENT_KEYCHAIN: &str = "current";

/// Local key-value store backing one app id.
pub struct Store {
    db: Database,
    path: PathBuf,
}

impl Store {
    /// Opens (or creates) the database, waiting up to `timeout` for another
    /// handle to release the file lock.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        let storage_error = |source: redb::Error| Error::Storage {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| storage_error(redb::Error::Io(e)))?;
        }

        let started = Instant::now();
        let db = loop {
            match Database::create(path) {
                Ok(db) => break db,
                Err(DatabaseError::DatabaseAlreadyOpen) if started.elapsed() < timeout => {
                    debug!("Database {:?} is locked, retrying.", path);
                    thread::sleep(Duration::from_millis(DB_LOCK_RETRY_INTERVAL_MS));
                }
                Err(e) => return Err(storage_error(e.into())),
            }
        };

        Self::create_tables(&db).map_err(storage_error)?;
        info!("Opened database at {:?}", path);
        Ok(Store {
            db,
            path: path.to_path_buf(),
        })
    }

    fn create_tables(db: &Database) -> Result<(), redb::Error> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(KEYCHAIN_TABLE)?;
        write_txn.open_table(WALLETS_TABLE)?;
        write_txn.commit()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_keychain(&self) -> Result<Option<Keychain>> {
        match self.get(KEYCHAIN_TABLE, CURRENT_KEYCHAIN)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save_keychain(&self, keychain: &Keychain) -> Result<()> {
        let bytes = Zeroizing::new(serde_json::to_vec(keychain)?);
        self.put(KEYCHAIN_TABLE, CURRENT_KEYCHAIN, &bytes)?;
        debug!("Keychain for node {} saved.", keychain.node_id());
        Ok(())
    }

    pub fn save_wallet(&self, wallet: &WalletRecord) -> Result<()> {
        let bytes = serde_json::to_vec(wallet)?;
        self.put(WALLETS_TABLE, &wallet.wallet_id, &bytes)?;
        debug!("Wallet '{}' ({}) saved.", wallet.alias, wallet.wallet_id);
        Ok(())
    }

    pub fn load_wallet(&self, wallet_id: &str) -> Result<Option<WalletRecord>> {
        match self.get(WALLETS_TABLE, wallet_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list_wallets(&self) -> Result<Vec<WalletRecord>> {
        let entries = self.entries(WALLETS_TABLE)?;
        entries
            .iter()
            .map(|bytes| serde_json::from_slice(bytes).map_err(Error::from))
            .collect()
    }

    fn get(
        &self,
        table: BytesTable,
        key: &str,
    ) -> Result<Option<Vec<u8>>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let value = table.get(key)?.map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn put(
        &self,
        table: BytesTable,
        key: &str,
        value: &[u8],
    ) -> Result<(), redb::Error> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(table)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn entries(&self, table: BytesTable) -> Result<Vec<Vec<u8>>, redb::Error> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut values = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            values.push(value.value().to_vec());
        }
        Ok(values)
    }
}

/// A wallet created from this CLI. Its private key never leaves the local
/// store unencrypted.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WalletRecord {
    pub wallet_id: String,
    pub alias: String,
    pub public_key: PublicKey,
    /// base64(nonce || AES-256-GCM ciphertext)
    pub encrypted_private_key: String,
    pub salt: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl WalletRecord {
    pub fn generate(alias: &str, password: &str) -> anyhow::Result<Self> {
        let private_key = PrivateKey::generate_keypair();
        let public_key = private_key.public_key();
        let salt = random_bytes::<SALT_SIZE>()?.to_vec();

        let cipher = Self::cipher(password, &salt)?;
        let encrypted_private_key = Self::seal(&cipher, &private_key)?;

        Ok(WalletRecord {
            wallet_id: Self::id_for(&public_key),
            alias: alias.to_string(),
            public_key,
            encrypted_private_key,
            salt,
            created_at: Utc::now(),
        })
    }

    /// Base58 SHA-256 of the compressed public key.
    pub fn id_for(public_key: &PublicKey) -> String {
        Hash::digest(&public_key.to_sec1_bytes()).to_base58()
    }

    pub fn decrypt_private_key(&self, password: &str) -> anyhow::Result<PrivateKey> {
        let sealed = general_purpose::STANDARD_NO_PAD.decode(&self.encrypted_private_key)?;
        if sealed.len() <= ENCRYPTION_NONCE_SIZE {
            bail!("Wallet {} has a truncated private key", self.wallet_id);
        }
        let (nonce, ciphertext) = sealed.split_at(ENCRYPTION_NONCE_SIZE);

        let plain = Zeroizing::new(
            Self::cipher(password, &self.salt)?
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| anyhow!("Wrong password for wallet {}", self.wallet_id))?,
        );
        PrivateKey::from_slice(&plain)
    }

    fn seal(cipher: &Aes256Gcm, private_key: &PrivateKey) -> anyhow::Result<String> {
        let nonce = random_bytes::<ENCRYPTION_NONCE_SIZE>()?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), private_key.to_bytes().as_slice())
            .map_err(|e| anyhow!("Failed to encrypt wallet key: {}", e))?;

        let mut sealed = nonce.to_vec();
        sealed.extend(ciphertext);
        Ok(general_purpose::STANDARD_NO_PAD.encode(sealed))
    }

    /// AES-256-GCM keyed with Argon2id(password, salt).
    fn cipher(password: &str, salt: &[u8]) -> anyhow::Result<Aes256Gcm> {
        let params = Params::new(19_456, 2, 1, Some(32))
            .map_err(|e| anyhow!("Invalid Argon2 parameters: {}", e))?;
        let salt = SaltString::encode_b64(salt)
            .map_err(|e| anyhow!("Invalid wallet salt: {}", e))?;

        let derived = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Failed to derive wallet key: {}", e))?;
        let key = Zeroizing::new(
            derived
                .hash
                .ok_or_else(|| anyhow!("Argon2 returned no output"))?
                .as_bytes()
                .to_vec(),
        );
        Ok(Aes256Gcm::new(AesKey::<Aes256Gcm>::from_slice(&key)))
    }
}

fn random_bytes<const N: usize>() -> anyhow::Result<[u8; N]> {
    let mut bytes = [0u8; N];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| anyhow!("Failed to gather random bytes: {}", e))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &Path) -> Store {
        Store::open(&dir.join("abc.db"), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn empty_store_has_no_keychain() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        assert!(store.load_keychain().unwrap().is_none());
        assert!(store.list_wallets().unwrap().is_empty());
    }

    #[test]
    fn keychain_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let keychain = Keychain::generate();
        {
            let store = open_store(dir.path());
            store.save_keychain(&keychain).unwrap();
        }

        let store = open_store(dir.path());
        let loaded = store.load_keychain().unwrap().unwrap();
        assert_eq!(loaded.node_id(), keychain.node_id());
        assert_eq!(loaded.private_key().to_hex(), keychain.private_key().to_hex());
    }

    #[test]
    fn saving_a_keychain_replaces_the_previous_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.save_keychain(&Keychain::generate()).unwrap();
        let second = Keychain::generate();
        store.save_keychain(&second).unwrap();

        let loaded = store.load_keychain().unwrap().unwrap();
        assert_eq!(loaded.node_id(), second.node_id());
    }

    #[test]
    fn creates_missing_database_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db").join("abc.db");
        let store = Store::open(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn open_fails_when_directory_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"occupied").unwrap();

        let result = Store::open(&blocker.join("abc.db"), Duration::from_millis(100));
        assert!(matches!(result, Err(Error::Storage { .. })));
    }

    #[test]
    fn open_gives_up_on_a_locked_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc.db");
        let _held = Store::open(&path, Duration::from_secs(1)).unwrap();

        let started = Instant::now();
        let result = Store::open(&path, Duration::from_millis(200));
        assert!(matches!(result, Err(Error::Storage { .. })));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn wallet_key_decrypts_only_with_its_password() {
        let wallet = WalletRecord::generate("savings", "correct horse").unwrap();

        let private_key = wallet.decrypt_private_key("correct horse").unwrap();
        assert_eq!(private_key.public_key(), wallet.public_key);
        assert_eq!(wallet.wallet_id, WalletRecord::id_for(&wallet.public_key));
        assert!(wallet.decrypt_private_key("wrong horse").is_err());
    }

    #[test]
    fn wallets_are_listed_from_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let wallet = WalletRecord::generate("daily", "password123").unwrap();
        store.save_wallet(&wallet).unwrap();

        let loaded = store.load_wallet(&wallet.wallet_id).unwrap().unwrap();
        assert_eq!(loaded.alias, "daily");
        assert!(store.load_wallet("missing").unwrap().is_none());

        let listed = store.list_wallets().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].wallet_id, wallet.wallet_id);
    }
}
