use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};
use serde_json::Value;
use tracing::debug;

use crate::{
    compiler::{CompilerProfile, OptimizerSettings},
    env::Environment,
    error::ConfigurationError,
    network::{
        AddressSource, DEFAULT_MNEMONIC_ENV, EndpointDeclaration, NetworkDeclaration,
        NetworkRegistry, ProviderDeclaration,
    },
    plugins::{PluginDeclaration, PluginRegistry},
    types::NetworkId,
};

const BUILTIN_CONFIG: &str = include_str!("../config/truffle-config.json");

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(deserialize_with = "network_entries")]
    networks: Vec<(String, NetworkEntry)>,
    compilers: CompilersEntry,
    #[serde(default)]
    plugins: Vec<String>,
    #[serde(default)]
    api_keys: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct NetworkEntry {
    network_id: Value,
    host: Option<String>,
    port: Option<Value>,
    provider: Option<ProviderEntry>,
    #[serde(rename = "gasPrice")]
    gas_price: Option<Value>,
    gas: Option<Value>,
    #[serde(rename = "timeoutBlocks")]
    timeout_blocks: Option<Value>,
    #[serde(rename = "skipDryRun", default)]
    skip_dry_run: bool,
    from: Option<String>,
    from_env: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    mnemonic_env: Option<String>,
    rpc_url_env: Option<String>,
    address_index: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct CompilersEntry {
    solc: SolcEntry,
}

#[derive(Debug, Deserialize)]
struct SolcEntry {
    version: String,
    settings: SolcSettingsEntry,
}

#[derive(Debug, Deserialize)]
struct SolcSettingsEntry {
    optimizer: OptimizerEntry,
}

#[derive(Debug, Deserialize)]
struct OptimizerEntry {
    enabled: bool,
    runs: Value,
}

/// Keeps declaration order and repeated keys, which a map would collapse.
fn network_entries<'de, D>(deserializer: D) -> Result<Vec<(String, NetworkEntry)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, NetworkEntry)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of network names to declarations")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::new();
            while let Some(entry) = map.next_entry::<String, NetworkEntry>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

fn numeric_field(field: &str, value: &Value) -> Result<u64, ConfigurationError> {
    value
        .as_u64()
        .ok_or_else(|| ConfigurationError::InvalidNumericField {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn bounded_field<T: TryFrom<u64>>(field: &str, value: &Value) -> Result<T, ConfigurationError> {
    T::try_from(numeric_field(field, value)?).map_err(|_| ConfigurationError::InvalidNumericField {
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn optional_field(field: &str, value: &Option<Value>) -> Result<Option<u64>, ConfigurationError> {
    value.as_ref().map(|v| numeric_field(field, v)).transpose()
}

fn parse_network_id(network: &str, value: &Value) -> Result<NetworkId, ConfigurationError> {
    match value {
        Value::String(s) if s == "*" => Ok(NetworkId::Any),
        _ => Ok(NetworkId::Id(numeric_field(
            &format!("networks.{}.network_id", network),
            value,
        )?)),
    }
}

fn parse_endpoint(
    network: &str,
    entry: &NetworkEntry,
) -> Result<EndpointDeclaration, ConfigurationError> {
    match (&entry.host, &entry.port, &entry.provider) {
        (Some(host), Some(port), None) => Ok(EndpointDeclaration::Local {
            host: host.clone(),
            port: bounded_field(&format!("networks.{}.port", network), port)?,
        }),
        (None, None, Some(provider)) => {
            let address_index = match &provider.address_index {
                Some(value) => {
                    bounded_field(&format!("networks.{}.provider.address_index", network), value)?
                }
                None => 0,
            };

            Ok(EndpointDeclaration::Provider(ProviderDeclaration {
                mnemonic_env: provider
                    .mnemonic_env
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MNEMONIC_ENV.to_string()),
                rpc_url_env: provider
                    .rpc_url_env
                    .clone()
                    .unwrap_or_else(|| network.to_uppercase()),
                address_index,
            }))
        }
        (_, _, Some(_)) => Err(ConfigurationError::InvalidEndpoint {
            network: network.to_string(),
            reason: "host/port and provider are mutually exclusive",
        }),
        _ => Err(ConfigurationError::InvalidEndpoint {
            network: network.to_string(),
            reason: "either host and port or a provider is required",
        }),
    }
}

fn parse_network(
    name: &str,
    entry: &NetworkEntry,
) -> Result<NetworkDeclaration, ConfigurationError> {
    let field = |key: &str| format!("networks.{}.{}", name, key);

    let from = match (&entry.from, &entry.from_env) {
        (Some(_), Some(_)) => {
            return Err(ConfigurationError::InvalidEndpoint {
                network: name.to_string(),
                reason: "from and from_env are mutually exclusive",
            });
        }
        (Some(address), None) => Some(AddressSource::Literal(address.clone())),
        (None, Some(variable)) => Some(AddressSource::Env(variable.clone())),
        (None, None) => None,
    };

    Ok(NetworkDeclaration {
        name: name.to_string(),
        network_id: parse_network_id(name, &entry.network_id)?,
        endpoint: parse_endpoint(name, entry)?,
        gas_price: optional_field(&field("gasPrice"), &entry.gas_price)?,
        gas_limit: optional_field(&field("gas"), &entry.gas)?,
        timeout_blocks: optional_field(&field("timeoutBlocks"), &entry.timeout_blocks)?,
        skip_dry_run: entry.skip_dry_run,
        from,
    })
}

/// Declarations as loaded from disk, checked but not yet bound to an
/// environment.
#[derive(Debug, Clone)]
pub struct DeploymentSettings {
    pub networks: Vec<NetworkDeclaration>,
    pub compiler: CompilerProfile,
    pub plugins: PluginDeclaration,
}

impl DeploymentSettings {
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_json(BUILTIN_CONFIG)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigurationError> {
        let file = File::open(path)?;
        let config: ConfigFile = serde_json::from_reader(BufReader::new(file))?;

        Self::from_config_file(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        let config: ConfigFile = serde_json::from_str(content)?;

        Self::from_config_file(config)
    }

    fn from_config_file(config: ConfigFile) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::new();
        if let Some((name, _)) = config.networks.iter().find(|(name, _)| !seen.insert(name)) {
            return Err(ConfigurationError::DuplicateNetwork { name: name.clone() });
        }

        let networks = config
            .networks
            .iter()
            .map(|(name, entry)| parse_network(name, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let solc = config.compilers.solc;
        let compiler = CompilerProfile {
            version: solc.version,
            optimizer: OptimizerSettings {
                enabled: solc.settings.optimizer.enabled,
                runs: bounded_field(
                    "compilers.solc.settings.optimizer.runs",
                    &solc.settings.optimizer.runs,
                )?,
            },
        };

        debug!(
            networks = networks.len(),
            compiler = %compiler.version,
            plugins = config.plugins.len(),
            "Deployment settings parsed"
        );

        Ok(Self {
            networks,
            compiler,
            plugins: PluginDeclaration {
                plugins: config.plugins,
                api_keys: config.api_keys,
            },
        })
    }

    pub fn load(self, environment: Environment) -> Result<Deployment, ConfigurationError> {
        let plugins = PluginRegistry::load(&self.plugins, &environment);
        let networks = NetworkRegistry::new(self.networks, environment)?;

        Ok(Deployment {
            networks,
            compiler: self.compiler,
            plugins,
        })
    }
}

/// The three registries, built once per process and read-only afterwards.
#[derive(Debug)]
pub struct Deployment {
    networks: NetworkRegistry,
    compiler: CompilerProfile,
    plugins: PluginRegistry,
}

impl Deployment {
    pub fn networks(&self) -> &NetworkRegistry {
        &self.networks
    }

    pub fn compiler(&self) -> &CompilerProfile {
        &self.compiler
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Endpoint;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    const BUILTIN_NETWORKS: &[&str] = &[
        "development",
        "ropsten",
        "rinkeby",
        "goerli",
        "bsctestnet",
        "bscmainnet",
        "mainnet",
    ];

    fn minimal(network: &str) -> String {
        format!(
            r#"{{
                "networks": {{ {} }},
                "compilers": {{ "solc": {{ "version": "0.8.10", "settings": {{ "optimizer": {{ "enabled": false, "runs": 200 }} }} }} }}
            }}"#,
            network
        )
    }

    #[test]
    fn test_builtin_settings() {
        let settings = DeploymentSettings::builtin().unwrap();

        assert_eq!(settings.networks.len(), BUILTIN_NETWORKS.len());
        assert_eq!(settings.compiler.version, "0.8.10");
        assert!(settings.compiler.optimizer.enabled);
        assert_eq!(settings.compiler.optimizer.runs, 9999);
        assert_eq!(settings.plugins.plugins, vec!["truffle-plugin-verify"]);
        assert_eq!(settings.plugins.api_keys["etherscan"], "ETHERAPI");
        assert_eq!(settings.plugins.api_keys["bscscan"], "BSCSCAN");

        let bsctestnet = settings.networks.iter().find(|n| n.name == "bsctestnet").unwrap();
        assert_eq!(bsctestnet.network_id, NetworkId::Id(97));
        assert_eq!(bsctestnet.gas_limit, Some(15_000_000));
        assert_eq!(bsctestnet.gas_price, None);
        assert!(bsctestnet.skip_dry_run);

        let goerli = settings.networks.iter().find(|n| n.name == "goerli").unwrap();
        assert!(!goerli.skip_dry_run);
    }

    #[test]
    fn test_every_builtin_network_resolves_by_name() {
        let mut pairs = vec![("MNEMONIC".to_string(), PHRASE.to_string())];
        for name in BUILTIN_NETWORKS {
            pairs.push((name.to_uppercase(), format!("https://{}.rpc", name)));
        }

        let deployment = DeploymentSettings::builtin()
            .unwrap()
            .load(Environment::from_pairs(pairs))
            .unwrap();

        for name in BUILTIN_NETWORKS {
            let profile = deployment.networks().resolve(name).unwrap();
            assert_eq!(profile.name, *name);
        }
    }

    #[test]
    fn test_load_without_secrets() {
        let deployment = DeploymentSettings::builtin()
            .unwrap()
            .load(Environment::default())
            .unwrap();

        let profile = deployment.networks().resolve("development").unwrap();
        assert_eq!(profile.network_id, NetworkId::Any);
        assert!(matches!(profile.endpoint, Endpoint::Local { port: 8545, .. }));

        assert!(matches!(
            deployment.networks().resolve("mainnet"),
            Err(ConfigurationError::MissingSecret { .. })
        ));
        assert_eq!(deployment.plugins().api_key("etherscan"), None);
        assert_eq!(deployment.compiler().optimizer.runs, 9999);
    }

    #[test]
    fn test_etherscan_key_from_environment() {
        let deployment = DeploymentSettings::builtin()
            .unwrap()
            .load(Environment::from_pairs([("ETHERAPI", "KEY")]))
            .unwrap();

        assert_eq!(deployment.plugins().api_key("etherscan"), Some("KEY"));
        assert_eq!(deployment.plugins().api_key("bscscan"), None);
    }

    #[test]
    fn test_rpc_url_env_defaults_to_network_name() {
        let settings = DeploymentSettings::from_json(&minimal(
            r#""polygon": { "provider": {}, "network_id": 137 }"#,
        ))
        .unwrap();

        assert_eq!(
            settings.networks[0].endpoint,
            EndpointDeclaration::Provider(ProviderDeclaration {
                mnemonic_env: "MNEMONIC".to_string(),
                rpc_url_env: "POLYGON".to_string(),
                address_index: 0,
            })
        );
    }

    #[test]
    fn test_negative_numeric_fields_rejected() {
        let res = DeploymentSettings::from_json(&minimal(
            r#""goerli": { "provider": {}, "network_id": 5, "timeoutBlocks": -5 }"#,
        ));
        assert!(matches!(
            res,
            Err(ConfigurationError::InvalidNumericField { ref field, .. }) if field == "networks.goerli.timeoutBlocks"
        ));

        let res = DeploymentSettings::from_json(
            r#"{
                "networks": {},
                "compilers": { "solc": { "version": "0.8.10", "settings": { "optimizer": { "enabled": true, "runs": -1 } } } }
            }"#,
        );
        assert!(matches!(
            res,
            Err(ConfigurationError::InvalidNumericField { ref field, .. }) if field == "compilers.solc.settings.optimizer.runs"
        ));
    }

    #[test]
    fn test_non_numeric_fields_rejected() {
        let res = DeploymentSettings::from_json(&minimal(
            r#""goerli": { "provider": {}, "network_id": 5, "gasPrice": "fast" }"#,
        ));
        assert!(matches!(res, Err(ConfigurationError::InvalidNumericField { .. })));

        let res = DeploymentSettings::from_json(&minimal(
            r#""local": { "host": "127.0.0.1", "port": 70000, "network_id": "*" }"#,
        ));
        assert!(matches!(
            res,
            Err(ConfigurationError::InvalidNumericField { ref field, .. }) if field == "networks.local.port"
        ));
    }

    #[test]
    fn test_duplicate_network_keys_rejected() {
        let res = DeploymentSettings::from_json(&minimal(
            r#""goerli": { "provider": {}, "network_id": 5 },
               "goerli": { "provider": {}, "network_id": 420 }"#,
        ));

        assert!(matches!(
            res,
            Err(ConfigurationError::DuplicateNetwork { ref name }) if name == "goerli"
        ));
    }

    #[test]
    fn test_networks_keep_declaration_order() {
        let settings = DeploymentSettings::builtin().unwrap();
        let names: Vec<&str> = settings.networks.iter().map(|n| n.name.as_str()).collect();

        assert_eq!(names, BUILTIN_NETWORKS);
    }

    #[test]
    fn test_network_name_cannot_escape_output_folder() {
        let settings = DeploymentSettings::from_json(&minimal(
            r#""../outside": { "host": "127.0.0.1", "port": 8545, "network_id": "*" }"#,
        ))
        .unwrap();

        assert!(matches!(
            settings.load(Environment::default()),
            Err(ConfigurationError::InvalidNetworkName { ref name }) if name == "../outside"
        ));
    }

    #[test]
    fn test_from_path() {
        let file_name = format!("evm-deploy-profiles-settings-{}.json", std::process::id());
        let path = std::env::temp_dir().join(file_name);
        std::fs::write(
            &path,
            minimal(r#""polygon": { "provider": {}, "network_id": 137, "gas": 8000000 }"#),
        )
        .unwrap();

        let res = DeploymentSettings::from_path(&path);
        std::fs::remove_file(&path).unwrap();

        let settings = res.unwrap();
        assert_eq!(settings.networks.len(), 1);
        assert_eq!(settings.networks[0].name, "polygon");
        assert_eq!(settings.networks[0].gas_limit, Some(8_000_000));
        assert_eq!(settings.compiler.optimizer.runs, 200);
    }

    #[test]
    fn test_from_path_missing_file() {
        let path = std::env::temp_dir().join("evm-deploy-profiles-does-not-exist.json");

        assert!(matches!(
            DeploymentSettings::from_path(&path),
            Err(ConfigurationError::IoError(_))
        ));
    }

    #[test]
    fn test_endpoint_must_be_exclusive() {
        let res = DeploymentSettings::from_json(&minimal(
            r#""mixed": { "host": "127.0.0.1", "port": 8545, "provider": {}, "network_id": 1 }"#,
        ));
        assert!(matches!(res, Err(ConfigurationError::InvalidEndpoint { .. })));

        let res = DeploymentSettings::from_json(&minimal(r#""bare": { "network_id": 1 }"#));
        assert!(matches!(res, Err(ConfigurationError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_wildcard_on_public_network_fails_at_load() {
        let settings = DeploymentSettings::from_json(&minimal(
            r#""mainnet": { "provider": {}, "network_id": "*" }"#,
        ))
        .unwrap();

        assert!(matches!(
            settings.load(Environment::default()),
            Err(ConfigurationError::InvalidEndpoint { .. })
        ));
    }
}
