use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::{error::ConfigurationError, types::VariableName};

/// BIP-44 prefix HD wallets use for Ethereum accounts.
pub const ETHEREUM_DERIVATION_PREFIX: &str = "m/44'/60'/0'/0";

const VALID_WORD_COUNTS: &[usize] = &[12, 15, 18, 21, 24];

/// Seed phrase read from the environment. Never printed or serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Mnemonic(String);

impl Mnemonic {
    pub fn from_phrase(variable: &str, phrase: &str) -> Result<Self, ConfigurationError> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if !VALID_WORD_COUNTS.contains(&words.len()) {
            return Err(ConfigurationError::InvalidMnemonic {
                variable: variable.to_string(),
                words: words.len(),
            });
        }

        Ok(Mnemonic(words.join(" ")))
    }

    pub fn phrase(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mnemonic(<redacted>)")
    }
}

/// Deferred constructor for a signing connection to one network.
///
/// Resolving a profile captures the secrets here; nothing is built until
/// [`ProviderFactory::connect`] is called.
#[derive(Clone, Serialize)]
pub struct ProviderFactory {
    #[serde(skip)]
    network: String,
    #[serde(skip)]
    mnemonic: Mnemonic,
    #[serde(skip)]
    rpc_url: String,
    rpc_url_env: VariableName,
    address_index: u32,
}

impl ProviderFactory {
    pub fn new(
        network: &str,
        mnemonic: Mnemonic,
        rpc_url: &str,
        rpc_url_env: &str,
        address_index: u32,
    ) -> Self {
        Self {
            network: network.to_string(),
            mnemonic,
            rpc_url: rpc_url.to_string(),
            rpc_url_env: rpc_url_env.to_string(),
            address_index,
        }
    }

    pub fn address_index(&self) -> u32 {
        self.address_index
    }

    pub fn connect(&self) -> WalletProvider {
        let provider = WalletProvider {
            mnemonic: self.mnemonic.clone(),
            rpc_url: self.rpc_url.clone(),
            derivation_path: format!("{}/{}", ETHEREUM_DERIVATION_PREFIX, self.address_index),
        };

        info!(
            network = %self.network,
            derivation_path = %provider.derivation_path,
            "Provider constructed"
        );

        provider
    }
}

impl fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFactory")
            .field("network", &self.network)
            .field("rpc_url_env", &self.rpc_url_env)
            .field("address_index", &self.address_index)
            .finish_non_exhaustive()
    }
}

/// Everything the external HD wallet needs to sign for the selected account.
#[derive(Clone)]
pub struct WalletProvider {
    pub mnemonic: Mnemonic,
    pub rpc_url: String,
    pub derivation_path: String,
}

impl fmt::Debug for WalletProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletProvider")
            .field("derivation_path", &self.derivation_path)
            .finish_non_exhaustive()
    }
}
