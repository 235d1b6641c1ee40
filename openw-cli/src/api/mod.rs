//! Client side of the hosted wallet service.
//!
//! The session talks to the service only through [`WalletApi`], and obtains
//! a client from an [`ApiConnector`] once a keychain is available. The HTTP
//! implementation lives in [`http`].

pub mod http;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wallet::config::Config;
use crate::wallet::storage::WalletRecord;
use openw_core::keychain::{Certificate, NodeId};

pub use http::{HttpApiClient, HttpConnector};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode or decode payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Server rejected {method} (status {status}): {message}")]
    Rejected {
        method: String,
        status: i64,
        message: String,
    },

    #[error("Unsupported connection type: {0}")]
    UnsupportedConnectType(ConnectType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectType {
    Http,
    Websocket,
}

impl fmt::Display for ConnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectType::Http => write!(f, "http"),
            ConnectType::Websocket => write!(f, "websocket"),
        }
    }
}

/// Everything needed to build an authenticated client.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    pub app_id: String,
    pub app_key: String,
    pub host_node_id: String,
    pub connect_type: ConnectType,
    pub address: String,
    pub enable_signature: bool,
    pub cert: Certificate,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(config: &Config, cert: Certificate) -> Self {
        ApiSettings {
            app_id: config.app_id.clone(),
            app_key: config.app_key.clone(),
            host_node_id: config.host_node_id.clone(),
            connect_type: config.connect_type,
            address: config.remote_server.clone(),
            enable_signature: true,
            cert,
            request_timeout: config.request_timeout(),
        }
    }
}

/// A wallet as known by the remote service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WalletInfo {
    pub wallet_id: String,
    pub alias: String,
    pub public_key: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CreateWalletRequest {
    pub wallet_id: String,
    pub alias: String,
    pub public_key: String,
}

impl From<&WalletRecord> for CreateWalletRequest {
    fn from(wallet: &WalletRecord) -> Self {
        CreateWalletRequest {
            wallet_id: wallet.wallet_id.clone(),
            alias: wallet.alias.clone(),
            public_key: wallet.public_key.fingerprint(),
        }
    }
}

pub trait WalletApi {
    /// Node id of the certificate this client signs with.
    fn node_id(&self) -> &NodeId;

    /// Binds this node's certificate to the app on the server.
    fn register_node(&self) -> Result<(), ApiError>;

    fn create_wallet(&self, wallet: &CreateWalletRequest) -> Result<WalletInfo, ApiError>;

    /// Wallets the server holds for this app and node.
    fn find_wallets(&self) -> Result<Vec<WalletInfo>, ApiError>;
}

pub trait ApiConnector {
    fn connect(&self, settings: ApiSettings) -> Result<Box<dyn WalletApi>, ApiError>;
}
