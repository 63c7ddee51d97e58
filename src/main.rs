use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use evm_deploy_profiles::{
    env::Environment,
    error::ConfigurationError,
    network::Endpoint,
    settings::DeploymentSettings,
    write::{self, DeploymentPlan},
};
use tracing::{error, info, warn};

const TARGET_FOLDER: &str = "deployments";

/// Resolve the deployment profile for one network.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Network to deploy to.
    #[arg(default_value = "development")]
    network: String,

    /// JSON declarations to use instead of the built-in ones.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder the deployment plan is written to.
    #[arg(long, default_value = TARGET_FOLDER)]
    out: String,
}

fn run(args: Args) -> Result<(), ConfigurationError> {
    let settings = match &args.config {
        Some(path) => DeploymentSettings::from_path(path)?,
        None => DeploymentSettings::builtin()?,
    };

    let deployment = settings.load(Environment::from_process())?;
    let profile = deployment.networks().resolve(&args.network)?;

    if let Endpoint::Provider(factory) = &profile.endpoint {
        let provider = factory.connect();
        info!(derivation_path = %provider.derivation_path, "Signing provider ready");
    }

    let plugins = deployment.plugins();
    for (service, configured) in plugins.services() {
        if !configured {
            warn!(service, "No API key configured, contract verification disabled");
        }
    }

    let plan = DeploymentPlan::new(&profile, deployment.compiler(), plugins);
    let path = write::write(&args.out, &plan)?;

    info!(network = %profile.name, path = %path.display(), "Deployment plan written");

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let network = args.network.clone();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(network = %network, error = %err, "Failed to resolve deployment profile");
            ExitCode::FAILURE
        }
    }
}
