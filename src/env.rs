use std::{collections::HashMap, ffi::OsString, fmt};

use tracing::debug;

use crate::error::ConfigurationError;

/// Snapshot of the variables secrets and API keys are read from.
///
/// Built once at start and passed down, so lookups never touch the live
/// process environment after that point.
#[derive(Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    pub fn from_os_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut vars = HashMap::new();

        for (name, value) in pairs {
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    vars.insert(name, value);
                }
                (Ok(name), Err(_)) => debug!(variable = %name, "Skipping non UTF-8 value"),
                (Err(name), _) => {
                    debug!(variable = %name.to_string_lossy(), "Skipping non UTF-8 name")
                }
            }
        }

        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Blank values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn require(&self, network: &str, name: &str) -> Result<&str, ConfigurationError> {
        self.get(name).ok_or_else(|| ConfigurationError::MissingSecret {
            network: network.to_string(),
            variable: name.to_string(),
        })
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Environment").field("vars", &names).finish()
    }
}
