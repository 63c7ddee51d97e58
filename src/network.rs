use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    env::Environment,
    error::ConfigurationError,
    provider::{Mnemonic, ProviderFactory},
    types::{Address, NetworkId, NetworkName, VariableName, Wei},
};

pub const DEFAULT_MNEMONIC_ENV: &str = "MNEMONIC";

/// Where the sender override comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    Literal(Address),
    /// Optional; an unset variable means "derive from the mnemonic".
    Env(VariableName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDeclaration {
    pub mnemonic_env: VariableName,
    pub rpc_url_env: VariableName,
    pub address_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointDeclaration {
    Local { host: String, port: u16 },
    Provider(ProviderDeclaration),
}

/// A network as declared, before any secret has been read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDeclaration {
    pub name: NetworkName,
    pub network_id: NetworkId,
    pub endpoint: EndpointDeclaration,
    pub gas_price: Option<Wei>,
    pub gas_limit: Option<u64>,
    pub timeout_blocks: Option<u64>,
    pub skip_dry_run: bool,
    pub from: Option<AddressSource>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    Local { host: String, port: u16 },
    Provider(ProviderFactory),
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkProfile {
    pub name: NetworkName,
    pub network_id: NetworkId,
    pub endpoint: Endpoint,
    #[serde(rename = "gasPrice", skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<Wei>,
    #[serde(rename = "gas", skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(rename = "timeoutBlocks", skip_serializing_if = "Option::is_none")]
    pub timeout_blocks: Option<u64>,
    #[serde(rename = "skipDryRun")]
    pub skip_dry_run: bool,
    #[serde(rename = "from", skip_serializing_if = "Option::is_none")]
    pub from_address: Option<Address>,
}

impl NetworkDeclaration {
    fn resolve(&self, environment: &Environment) -> Result<NetworkProfile, ConfigurationError> {
        let endpoint = match &self.endpoint {
            EndpointDeclaration::Local { host, port } => Endpoint::Local {
                host: host.clone(),
                port: *port,
            },
            EndpointDeclaration::Provider(provider) => {
                let phrase = environment.require(&self.name, &provider.mnemonic_env)?;
                let mnemonic = Mnemonic::from_phrase(&provider.mnemonic_env, phrase)?;
                let rpc_url = environment.require(&self.name, &provider.rpc_url_env)?;

                Endpoint::Provider(ProviderFactory::new(
                    &self.name,
                    mnemonic,
                    rpc_url,
                    &provider.rpc_url_env,
                    provider.address_index,
                ))
            }
        };

        let from_address = match &self.from {
            None => None,
            Some(AddressSource::Literal(address)) => Some(parse_address(&self.name, address)?),
            Some(AddressSource::Env(variable)) => match environment.get(variable) {
                Some(address) => Some(parse_address(&self.name, address)?),
                None => {
                    debug!(network = %self.name, variable = %variable, "Sender override not set");
                    None
                }
            },
        };

        Ok(NetworkProfile {
            name: self.name.clone(),
            network_id: self.network_id,
            endpoint,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            timeout_blocks: self.timeout_blocks,
            skip_dry_run: self.skip_dry_run,
            from_address,
        })
    }
}

fn parse_address(network: &str, address: &str) -> Result<Address, ConfigurationError> {
    let is_valid = address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));

    if !is_valid {
        return Err(ConfigurationError::InvalidAddress {
            network: network.to_string(),
            address: address.to_string(),
        });
    }

    Ok(address.to_string())
}

fn validate_declarations(declarations: &[NetworkDeclaration]) -> Result<(), ConfigurationError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for declaration in declarations {
        if declaration.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyNetworkName);
        }

        // The name becomes the plan's file name.
        let name = declaration.name.as_str();
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(ConfigurationError::InvalidNetworkName {
                name: name.to_string(),
            });
        }

        *seen.entry(declaration.name.as_str()).or_insert(0) += 1;

        let is_local = matches!(declaration.endpoint, EndpointDeclaration::Local { .. });
        if declaration.network_id == NetworkId::Any && !is_local {
            return Err(ConfigurationError::InvalidEndpoint {
                network: declaration.name.clone(),
                reason: "wildcard network_id is only allowed for a local host/port profile",
            });
        }
    }

    if let Some((name, _)) = seen.into_iter().find(|(_, count)| *count > 1) {
        return Err(ConfigurationError::DuplicateNetwork {
            name: name.to_string(),
        });
    }

    Ok(())
}

/// Network name to profile lookup.
///
/// Construction only checks the declarations. Secrets are read per network
/// in [`NetworkRegistry::resolve`], so a target with everything it needs is
/// never blocked by some other network's missing mnemonic or RPC URL.
#[derive(Debug)]
pub struct NetworkRegistry {
    declarations: Vec<NetworkDeclaration>,
    environment: Environment,
}

impl NetworkRegistry {
    pub fn new(
        declarations: Vec<NetworkDeclaration>,
        environment: Environment,
    ) -> Result<Self, ConfigurationError> {
        validate_declarations(&declarations)?;

        debug!(networks = declarations.len(), "Network declarations loaded");

        Ok(Self {
            declarations,
            environment,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.name.as_str())
    }

    pub fn declaration(&self, name: &str) -> Option<&NetworkDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn resolve(&self, name: &str) -> Result<NetworkProfile, ConfigurationError> {
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyNetworkName);
        }

        let Some(declaration) = self.declaration(name) else {
            debug!(
                network = %name,
                known = ?self.names().collect::<Vec<_>>(),
                "Network not declared"
            );
            return Err(ConfigurationError::UnknownNetwork {
                name: name.to_string(),
            });
        };

        let profile = declaration.resolve(&self.environment)?;

        info!(
            network = %profile.name,
            network_id = %profile.network_id,
            skip_dry_run = profile.skip_dry_run,
            "Network resolved"
        );

        Ok(profile)
    }
}
