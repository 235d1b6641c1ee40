// openw-cli/src/wallet/session.rs
use log::{debug, info, warn};
use zeroize::Zeroizing;

use openw_core::keychain::Keychain;

use crate::api::{ApiConnector, ApiSettings, CreateWalletRequest, WalletApi, WalletInfo};
use crate::console::Console;
use crate::wallet::{
    config::Config,
    constants::PASSWORD_MAX_ATTEMPTS,
    error::{Error, Result},
    storage::{Store, WalletRecord},
};

/// API client slot. Only a registered (or previously registered) keychain
/// can fill it.
pub enum ApiState {
    Detached,
    Ready(Box<dyn WalletApi>),
}

impl ApiState {
    pub fn client(&self) -> Result<&dyn WalletApi> {
        match self {
            ApiState::Ready(api) => Ok(api.as_ref()),
            ApiState::Detached => Err(Error::NotReady(
                "no API client, register this node first",
            )),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ApiState::Ready(_))
    }
}

struct Loaded {
    config: Config,
    store: Store,
    api: ApiState,
}

enum SessionState {
    Uninitialized,
    Ready(Loaded),
}

/// Outcome of [`Session::register_flow`].
#[derive(Debug)]
pub enum Registration {
    Registered(Keychain),
    Declined,
}

pub struct Session {
    connector: Box<dyn ApiConnector>,
    state: SessionState,
}

impl Session {
    pub fn new(connector: Box<dyn ApiConnector>) -> Self {
        Session {
            connector,
            state: SessionState::Uninitialized,
        }
    }

    /// Validates the config, opens the local store and, when a keychain is
    /// already stored, attaches an authenticated API client.
    pub fn initialize(&mut self, config: Config) -> Result<()> {
        validate(&config)?;

        // release any previous store before reopening the same file
        self.state = SessionState::Uninitialized;

        let store = Store::open(&config.database_path(), config.db_timeout())?;
        let api = match store.load_keychain()? {
            Some(keychain) => {
                info!("Loaded keychain for node {}", keychain.node_id());
                ApiState::Ready(connect(self.connector.as_ref(), &config, &keychain)?)
            }
            None => {
                info!("No keychain stored yet, API client stays detached.");
                ApiState::Detached
            }
        };

        info!("Session ready, database {:?}", store.path());
        self.state = SessionState::Ready(Loaded { config, store, api });
        Ok(())
    }

    /// True once a keychain is stored and a client signs with it. Says
    /// nothing about whether the server accepted the node.
    pub fn has_client(&self) -> bool {
        match &self.state {
            SessionState::Ready(loaded) => loaded.api.is_ready(),
            SessionState::Uninitialized => false,
        }
    }

    pub fn config(&self) -> Option<&Config> {
        match &self.state {
            SessionState::Ready(loaded) => Some(&loaded.config),
            SessionState::Uninitialized => None,
        }
    }

    fn loaded(&self) -> Result<&Loaded> {
        match &self.state {
            SessionState::Ready(loaded) => Ok(loaded),
            SessionState::Uninitialized => Err(Error::NotReady("session is not initialized")),
        }
    }

    /// Generates a keychain (asking first if one exists), shows it and
    /// registers the node on the remote server.
    pub fn register_flow(&mut self, console: &mut dyn Console) -> Result<Registration> {
        let loaded = match &mut self.state {
            SessionState::Ready(loaded) => loaded,
            SessionState::Uninitialized => {
                return Err(Error::NotReady("session is not initialized"))
            }
        };

        if loaded.store.load_keychain()?.is_some() {
            let regenerate = console.confirm(
                "The keychain already exists, do you want to regenerate the current keychain?",
            )?;
            if !regenerate {
                info!("Keeping the existing keychain.");
                return Ok(Registration::Declined);
            }
        }

        let keychain = Keychain::generate();
        // a failed connect must leave the stored keychain and its client untouched
        let api = connect(self.connector.as_ref(), &loaded.config, &keychain)?;
        loaded.store.save_keychain(&keychain)?;
        loaded.api = ApiState::Ready(api);
        info!("Created keychain for node {}", keychain.node_id());
        print_keychain(console, &keychain);

        loaded.api.client()?.register_node()?;
        info!("Registered node {} on {}", keychain.node_id(), loaded.config.remote_server);

        Ok(Registration::Registered(keychain))
    }

    /// Shows the stored keychain.
    pub fn show_identity_flow(&self, console: &mut dyn Console) -> Result<Keychain> {
        let loaded = self.loaded()?;
        let keychain = loaded
            .store
            .load_keychain()?
            .ok_or(Error::KeychainNotFound)?;
        print_keychain(console, &keychain);
        Ok(keychain)
    }

    /// Asks for a name and password, keeps the encrypted wallet key locally
    /// and creates the wallet on the server.
    pub fn create_wallet_flow(&self, console: &mut dyn Console) -> Result<WalletRecord> {
        let loaded = self.loaded()?;
        let api = loaded.api.client()?;

        let alias = console.input_text("Enter wallet's name:", true)?;
        let password = Zeroizing::new(console.input_password(false, PASSWORD_MAX_ATTEMPTS)?);

        let wallet = WalletRecord::generate(&alias, &password)?;
        // local key first, a remote wallet without its key is unrecoverable
        loaded.store.save_wallet(&wallet)?;

        let created = api.create_wallet(&CreateWalletRequest::from(&wallet))?;
        info!(
            "Created wallet '{}' ({}) for node {} on {}",
            created.alias,
            created.wallet_id,
            api.node_id(),
            loaded.config.remote_server
        );
        console.notice(&format!(
            "Wallet '{}' created, id: {}",
            wallet.alias, wallet.wallet_id
        ));
        Ok(wallet)
    }

    /// Lists the wallets the server knows for this node.
    pub fn list_wallet_flow(&self, console: &mut dyn Console) -> Result<Vec<WalletInfo>> {
        let loaded = self.loaded()?;
        let wallets = loaded.api.client()?.find_wallets()?;
        debug!("Server returned {} wallets.", wallets.len());

        let local = loaded.store.list_wallets()?;
        print_wallet_list(console, &wallets, |wallet_id| {
            local.iter().any(|record| record.wallet_id == wallet_id)
        });

        for record in local
            .iter()
            .filter(|record| !wallets.iter().any(|w| w.wallet_id == record.wallet_id))
        {
            warn!(
                "Local wallet '{}' ({}) is not known to the server.",
                record.alias, record.wallet_id
            );
        }
        Ok(wallets)
    }

    pub fn new_account_flow(&self) -> Result<()> {
        unavailable("new account")
    }

    pub fn list_account_flow(&self) -> Result<()> {
        unavailable("list account")
    }

    pub fn new_address_flow(&self) -> Result<()> {
        unavailable("new address")
    }

    pub fn search_address_flow(&self) -> Result<()> {
        unavailable("search address")
    }

    pub fn transfer_flow(&self) -> Result<()> {
        unavailable("transfer")
    }

    pub fn set_sum_flow(&self) -> Result<()> {
        unavailable("set summary")
    }

    pub fn start_sum_flow(&self) -> Result<()> {
        unavailable("start summary")
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.app_id.is_empty() {
        return Err(Error::MissingSetting("app_id"));
    }
    if config.app_key.is_empty() {
        return Err(Error::MissingSetting("app_key"));
    }
    if config.remote_server.is_empty() {
        return Err(Error::MissingSetting("remote_server"));
    }
    Ok(())
}

fn connect(
    connector: &dyn ApiConnector,
    config: &Config,
    keychain: &Keychain,
) -> Result<Box<dyn WalletApi>> {
    let cert = keychain.certificate()?;
    Ok(connector.connect(ApiSettings::new(config, cert))?)
}

fn unavailable(flow: &str) -> Result<()> {
    warn!("The {} flow is not available yet.", flow);
    Ok(())
}

fn print_keychain(console: &mut dyn Console, keychain: &Keychain) {
    console.notice("--------------- PRIVATE KEY ---------------");
    console.notice(&keychain.private_key().to_hex());
    console.notice("--------------- PUBLIC KEY ---------------");
    console.notice(&keychain.public_key().fingerprint());
    console.notice("--------------- NODE ID ---------------");
    console.notice(keychain.node_id().as_str());
}

fn print_wallet_list<F>(console: &mut dyn Console, wallets: &[WalletInfo], has_local_key: F)
where
    F: Fn(&str) -> bool,
{
    if wallets.is_empty() {
        console.notice("No wallets found.");
        return;
    }
    console.notice(&format!(
        "{:<4} {:<20} {:<46} {:<10} {}",
        "No.", "Alias", "Wallet ID", "Local key", "Created"
    ));
    for (index, wallet) in wallets.iter().enumerate() {
        let created = wallet
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let local = if has_local_key(wallet.wallet_id.as_str()) { "yes" } else { "no" };
        console.notice(&format!(
            "{:<4} {:<20} {:<46} {:<10} {}",
            index + 1,
            wallet.alias,
            wallet.wallet_id,
            local,
            created
        ));
    }
}
