use std::{collections::BTreeMap, fmt};

use tracing::debug;

use crate::{env::Environment, types::VariableName};

type ServiceName = String;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDeclaration {
    pub plugins: Vec<String>,
    /// Service name to the variable holding its API key.
    pub api_keys: BTreeMap<ServiceName, VariableName>,
}

#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Vec<String>,
    api_keys: BTreeMap<ServiceName, Option<String>>,
}

impl PluginRegistry {
    /// Reads every API key now. An unset key disables that integration for
    /// the run; whether that matters is up to the plugin.
    pub fn load(declaration: &PluginDeclaration, environment: &Environment) -> Self {
        let api_keys = declaration
            .api_keys
            .iter()
            .map(|(service, variable)| {
                let key = environment.get(variable).map(str::to_string);
                if key.is_none() {
                    debug!(service = %service, variable = %variable, "API key not configured");
                }
                (service.clone(), key)
            })
            .collect();

        Self {
            plugins: declaration.plugins.clone(),
            api_keys,
        }
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn api_key(&self, service: &str) -> Option<&str> {
        self.api_keys.get(service).and_then(|key| key.as_deref())
    }

    pub fn services(&self) -> impl Iterator<Item = (&str, bool)> {
        self.api_keys
            .iter()
            .map(|(service, key)| (service.as_str(), key.is_some()))
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services: BTreeMap<&str, bool> = self.services().collect();
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins)
            .field("api_keys", &services)
            .finish()
    }
}
