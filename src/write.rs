use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{
    compiler::CompilerProfile, error::ConfigurationError, network::NetworkProfile,
    plugins::PluginRegistry,
};

/// What the deployment tool is about to use, with every secret left out.
#[derive(Debug, Serialize)]
pub struct DeploymentPlan<'a> {
    pub network: &'a NetworkProfile,
    pub compiler: &'a CompilerProfile,
    pub plugins: &'a [String],
    /// Service name to whether its API key is configured.
    pub verification: BTreeMap<&'a str, bool>,
}

impl<'a> DeploymentPlan<'a> {
    pub fn new(
        network: &'a NetworkProfile,
        compiler: &'a CompilerProfile,
        plugins: &'a PluginRegistry,
    ) -> Self {
        Self {
            network,
            compiler,
            plugins: plugins.plugins(),
            verification: plugins.services().collect(),
        }
    }
}

pub fn write(folder: &str, plan: &DeploymentPlan) -> Result<PathBuf, ConfigurationError> {
    if !Path::new(folder).exists() {
        fs::create_dir_all(folder)?;
    }

    let path = Path::new(folder).join(format!("{}.json", plan.network.name));
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, plan)?;

    Ok(path)
}
