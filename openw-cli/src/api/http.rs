// openw-cli/src/api/http.rs
use chrono::Utc;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use openw_core::{keychain::NodeId, sha256::Hash};

use super::{
    ApiConnector, ApiError, ApiSettings, ConnectType, CreateWalletRequest, WalletApi, WalletInfo,
};

const API_PREFIX: &str = "api/v1";
const STATUS_OK: i64 = 0;

/// Builds [`HttpApiClient`]s.
pub struct HttpConnector;

impl ApiConnector for HttpConnector {
    fn connect(&self, settings: ApiSettings) -> Result<Box<dyn WalletApi>, ApiError> {
        match settings.connect_type {
            ConnectType::Http => Ok(Box::new(HttpApiClient::new(settings)?)),
            other => Err(ApiError::UnsupportedConnectType(other)),
        }
    }
}

/// Signed request body posted to `<address>/api/v1/<method>`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RequestEnvelope {
    pub app_id: String,
    pub node_id: String,
    pub host_node_id: String,
    pub method: String,
    pub timestamp: i64,
    pub nonce: Uuid,
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign: Option<String>,
}

impl RequestEnvelope {
    pub fn new(settings: &ApiSettings, method: &str, params: Value) -> Self {
        let mut envelope = RequestEnvelope {
            app_id: settings.app_id.clone(),
            node_id: settings.cert.node_id().to_string(),
            host_node_id: settings.host_node_id.clone(),
            method: method.to_string(),
            timestamp: Utc::now().timestamp(),
            nonce: Uuid::new_v4(),
            params,
            sign: None,
        };
        if settings.enable_signature {
            let digest = envelope.digest(&settings.app_key);
            envelope.sign = Some(settings.cert.sign(&digest).to_hex());
        }
        envelope
    }

    /// The app key is mixed into the digest but never sent.
    pub fn digest(&self, app_key: &str) -> Hash {
        let timestamp = self.timestamp.to_string();
        let nonce = self.nonce.to_string();
        let params = self.params.to_string();
        Hash::digest_parts(&[
            self.app_id.as_bytes(),
            app_key.as_bytes(),
            self.method.as_bytes(),
            timestamp.as_bytes(),
            nonce.as_bytes(),
            params.as_bytes(),
        ])
    }
}

#[derive(Deserialize, Debug)]
struct ResponseEnvelope {
    status: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    result: Value,
}

pub struct HttpApiClient {
    settings: ApiSettings,
    client: Client,
}

impl HttpApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        info!(
            "API client for node {} targets {} ({})",
            settings.cert.node_id(),
            settings.address,
            settings.connect_type
        );
        Ok(HttpApiClient { settings, client })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.address.trim_end_matches('/'),
            API_PREFIX,
            method
        )
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ApiError> {
        let envelope = RequestEnvelope::new(&self.settings, method, params);
        let url = self.endpoint(method);
        debug!("POST {} (nonce {})", url, envelope.nonce);

        let response: ResponseEnvelope = self
            .client
            .post(&url)
            .json(&envelope)
            .send()?
            .error_for_status()?
            .json()?;

        decode_response(method, response)
    }
}

fn decode_response<T: DeserializeOwned>(
    method: &str,
    response: ResponseEnvelope,
) -> Result<T, ApiError> {
    if response.status != STATUS_OK {
        return Err(ApiError::Rejected {
            method: method.to_string(),
            status: response.status,
            message: response.msg,
        });
    }
    Ok(serde_json::from_value(response.result)?)
}

impl WalletApi for HttpApiClient {
    fn node_id(&self) -> &NodeId {
        self.settings.cert.node_id()
    }

    fn register_node(&self) -> Result<(), ApiError> {
        let cert = &self.settings.cert;
        let _: Value = self.call(
            "bindAppDevice",
            json!({
                "public_key": cert.public_key().fingerprint(),
                "algorithm": cert.algorithm(),
            }),
        )?;
        Ok(())
    }

    fn create_wallet(&self, wallet: &CreateWalletRequest) -> Result<WalletInfo, ApiError> {
        self.call("createWallet", serde_json::to_value(wallet)?)
    }

    fn find_wallets(&self) -> Result<Vec<WalletInfo>, ApiError> {
        let wallets: Option<Vec<WalletInfo>> = self.call("findWallets", json!({}))?;
        Ok(wallets.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use openw_core::keychain::Keychain;
    use openw_core::signatures::Signature;

    use super::*;

    fn settings(keychain: &Keychain) -> ApiSettings {
        ApiSettings {
            app_id: "abc".to_string(),
            app_key: "xyz".to_string(),
            host_node_id: "openw-server".to_string(),
            connect_type: ConnectType::Http,
            address: "https://x/".to_string(),
            enable_signature: true,
            cert: keychain.certificate().unwrap(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn envelope_signature_verifies_against_node_key() {
        let keychain = Keychain::generate();
        let envelope = RequestEnvelope::new(&settings(&keychain), "findWallets", json!({}));

        let signature: Signature = envelope.sign.as_deref().unwrap().parse().unwrap();
        assert!(signature.verify_hash(&envelope.digest("xyz"), keychain.public_key()));
        assert_eq!(envelope.node_id, keychain.node_id().to_string());
        assert_eq!(envelope.host_node_id, "openw-server");
    }

    #[test]
    fn envelope_signature_covers_params_and_app_key() {
        let keychain = Keychain::generate();
        let mut envelope =
            RequestEnvelope::new(&settings(&keychain), "createWallet", json!({"alias": "a"}));
        let signature: Signature = envelope.sign.as_deref().unwrap().parse().unwrap();

        assert!(!signature.verify_hash(&envelope.digest("other-key"), keychain.public_key()));
        envelope.params = json!({"alias": "b"});
        assert!(!signature.verify_hash(&envelope.digest("xyz"), keychain.public_key()));
    }

    #[test]
    fn unsigned_envelope_omits_sign_field() {
        let keychain = Keychain::generate();
        let mut settings = settings(&keychain);
        settings.enable_signature = false;

        let envelope = RequestEnvelope::new(&settings, "findWallets", json!({}));
        assert!(envelope.sign.is_none());
        let encoded = serde_json::to_value(&envelope).unwrap();
        assert!(encoded.get("sign").is_none());
        assert!(encoded.get("app_key").is_none());
    }

    #[test]
    fn endpoint_joins_address_and_method() {
        let keychain = Keychain::generate();
        let client = HttpApiClient::new(settings(&keychain)).unwrap();
        assert_eq!(client.endpoint("bindAppDevice"), "https://x/api/v1/bindAppDevice");
        assert_eq!(client.node_id(), keychain.node_id());
    }

    #[test]
    fn non_zero_status_is_rejected() {
        let response = ResponseEnvelope {
            status: 3001,
            msg: "app not found".to_string(),
            result: Value::Null,
        };
        let result: Result<Value, ApiError> = decode_response("bindAppDevice", response);
        match result {
            Err(ApiError::Rejected {
                method,
                status,
                message,
            }) => {
                assert_eq!(method, "bindAppDevice");
                assert_eq!(status, 3001);
                assert_eq!(message, "app not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn successful_result_is_decoded() {
        let response: ResponseEnvelope = serde_json::from_value(json!({
            "status": 0,
            "result": [{"wallet_id": "W1", "alias": "daily", "public_key": "02ab"}]
        }))
        .unwrap();
        let wallets: Option<Vec<WalletInfo>> = decode_response("findWallets", response).unwrap();
        let wallets = wallets.unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].alias, "daily");
        assert!(wallets[0].created_at.is_none());
    }

    #[test]
    fn connector_only_speaks_http() {
        let keychain = Keychain::generate();
        let mut settings = settings(&keychain);
        settings.connect_type = ConnectType::Websocket;
        assert!(matches!(
            HttpConnector.connect(settings),
            Err(ApiError::UnsupportedConnectType(ConnectType::Websocket))
        ));
    }
}
