use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Clone, Parser, Serialize)]
#[command(author, version, about, long_about = None)]
pub struct ExportConfig {
    /// Chain ID selecting the Ignition deployment directory
    #[arg(long, env = "CHAIN_ID", default_value = "31337")]
    pub chain_id: String,

    /// Directory containing the ignition/ and artifacts/ trees;
    /// output files are written here as well
    #[arg(long, env = "EXPORT_ROOT", default_value = ".")]
    pub root: PathBuf,
}

impl ExportConfig {
    pub fn deployment_dir(&self) -> PathBuf {
        self.root
            .join("ignition")
            .join("deployments")
            .join(format!("chain-{}", self.chain_id))
    }
}
