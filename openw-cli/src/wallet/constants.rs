pub const APP_DIR_NAME: &str = "openwcli";
pub const DB_DIR_NAME: &str = "db";
pub const LOG_DIR_NAME: &str = "logs";
pub const LOG_FILE_NAME: &str = "openwcli.log";
pub const DB_FILE_EXTENSION: &str = "db";
pub const DB_LOCK_RETRY_INTERVAL_MS: u64 = 50;
pub const ENCRYPTION_NONCE_SIZE: usize = 12; // AES-GCM nonce size
pub const SALT_SIZE: usize = 16; // Size of salt for Argon2
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_ATTEMPTS: usize = 3;
