pub mod compiler;
pub mod env;
pub mod error;
pub mod network;
pub mod plugins;
pub mod provider;
pub mod settings;
pub mod types;
pub mod write;
