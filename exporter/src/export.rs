use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tokio::fs;
use tracing::{info, warn};

use crate::cli::ExportConfig;
use crate::error::ExportError;

/// A contract registered for export. Ignition keys its deployment records
/// by `module#name`.
#[derive(Clone, Debug)]
pub struct ContractDescriptor {
    pub name: String,
    pub module: String,
    pub output_file: String,
    pub source_file: Option<String>,
}

impl ContractDescriptor {
    pub fn new(name: &str, module: &str, output_file: &str) -> Self {
        Self {
            name: name.to_owned(),
            module: module.to_owned(),
            output_file: output_file.to_owned(),
            source_file: None,
        }
    }

    /// Set the Solidity source file name when it differs from the contract name.
    pub fn with_source_file(mut self, source_file: &str) -> Self {
        self.source_file = Some(source_file.to_owned());
        self
    }

    pub fn lookup_key(&self) -> String {
        format!("{}#{}", self.module, self.name)
    }

    fn source_file(&self) -> &str {
        self.source_file.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug)]
pub struct ExportResult {
    pub abi: Value,
    pub address: Option<String>,
}

#[derive(Serialize)]
struct AddressRecord {
    address: String,
}

/// Filesystem layout of the Ignition deployment tree and the Hardhat
/// build artifacts under a common root.
struct Layout {
    root: PathBuf,
    deployment_dir: PathBuf,
}

impl Layout {
    fn new(config: &ExportConfig) -> Self {
        Self {
            root: config.root.clone(),
            deployment_dir: config.deployment_dir(),
        }
    }

    fn deployed_addresses(&self) -> PathBuf {
        self.deployment_dir.join("deployed_addresses.json")
    }

    fn ignition_artifact(&self, key: &str) -> PathBuf {
        self.deployment_dir
            .join("artifacts")
            .join(format!("{key}.json"))
    }

    fn build_artifact(&self, desc: &ContractDescriptor) -> PathBuf {
        self.root
            .join("artifacts")
            .join("contracts")
            .join(format!("{}.sol", desc.source_file()))
            .join(format!("{}.json", desc.name))
    }
}

/// ABI sources in priority order. Each is tried in sequence and the first
/// one that yields an `abi` field wins; sources are never blended.
#[derive(Clone, Copy, Debug)]
enum AbiSource {
    Ignition,
    Build,
}

impl AbiSource {
    const PRIORITY: [Self; 2] = [Self::Ignition, Self::Build];

    fn path(self, layout: &Layout, desc: &ContractDescriptor) -> PathBuf {
        match self {
            Self::Ignition => layout.ignition_artifact(&desc.lookup_key()),
            Self::Build => layout.build_artifact(desc),
        }
    }
}

impl fmt::Display for AbiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ignition => write!(f, "Ignition"),
            Self::Build => write!(f, "Hardhat build"),
        }
    }
}

async fn read_json(path: &Path) -> Result<Value, ExportError> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|source| ExportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&raw).map_err(|source| ExportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Look up the deployed address for `key` in the per-chain record file.
/// A missing or unreadable record file only degrades the export, so this
/// never fails.
async fn lookup_address(layout: &Layout, key: &str) -> Option<String> {
    let path = layout.deployed_addresses();
    match read_json(&path).await {
        Ok(deployed) => deployed.get(key).and_then(Value::as_str).map(str::to_owned),
        Err(e) => {
            warn!("Could not read deployed addresses at {}: {}", path.display(), e);
            None
        }
    }
}

async fn resolve_abi(layout: &Layout, desc: &ContractDescriptor) -> Result<Value, ExportError> {
    for source in AbiSource::PRIORITY {
        let path = source.path(layout, desc);
        match read_json(&path).await {
            Ok(artifact) => match artifact.get("abi") {
                Some(abi) if !abi.is_null() => {
                    info!("Loaded ABI from {source} artifact: {}", path.display());
                    return Ok(abi.clone());
                }
                _ => warn!("No abi field in {source} artifact at {}", path.display()),
            },
            Err(e) => warn!("{source} artifact unavailable for {}: {}", desc.name, e),
        }
    }
    Err(ExportError::AbiNotFound {
        contract: desc.name.clone(),
    })
}

fn address_output_file(output_file: &str) -> Result<String, ExportError> {
    let stem = output_file
        .strip_suffix(".json")
        .ok_or_else(|| ExportError::BadOutputName(output_file.to_owned()))?;
    Ok(format!("{stem}-address.json"))
}

async fn write_pretty<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    fs::write(path, out).await?;
    Ok(())
}

/// Export one contract's ABI, and its deployed address when the per-chain
/// record has one. A missing address is not an error; a missing ABI after
/// both sources have been tried is.
pub async fn export_contract(
    config: &ExportConfig,
    desc: &ContractDescriptor,
) -> anyhow::Result<ExportResult> {
    let layout = Layout::new(config);
    let address_file = address_output_file(&desc.output_file)?;

    let address = lookup_address(&layout, &desc.lookup_key()).await;
    let abi = resolve_abi(&layout, desc).await?;

    let abi_out = layout.root.join(&desc.output_file);
    write_pretty(&abi_out, &abi).await?;
    info!("Wrote {} ABI to {}", desc.name, abi_out.display());

    if let Some(address) = address.clone() {
        let address_out = layout.root.join(&address_file);
        write_pretty(&address_out, &AddressRecord { address }).await?;
        info!("Wrote {} address to {}", desc.name, address_out.display());
    }

    Ok(ExportResult { abi, address })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(root: &str, chain_id: &str) -> Layout {
        let config = ExportConfig {
            chain_id: chain_id.to_owned(),
            root: PathBuf::from(root),
        };
        Layout::new(&config)
    }

    #[test]
    fn lookup_key_joins_module_and_name() {
        let desc = ContractDescriptor::new("UserAccounts", "UserAccountsModule", "out.json");
        assert_eq!(desc.lookup_key(), "UserAccountsModule#UserAccounts");
    }

    #[test]
    fn address_file_replaces_json_suffix() {
        assert_eq!(
            address_output_file("user-accounts-abi.json").unwrap(),
            "user-accounts-abi-address.json"
        );
        assert!(address_output_file("abi.txt").is_err());
    }

    #[test]
    fn build_artifact_uses_source_file_override() {
        let desc = ContractDescriptor::new("Operations", "OperationsModule", "out.json")
            .with_source_file("Storage");
        let path = layout(".", "31337").build_artifact(&desc);
        assert_eq!(
            path,
            Path::new("./artifacts/contracts/Storage.sol/Operations.json")
        );
    }

    #[test]
    fn build_artifact_defaults_source_file_to_name() {
        let desc = ContractDescriptor::new("UserAccounts", "UserAccountsModule", "out.json");
        let path = layout(".", "31337").build_artifact(&desc);
        assert_eq!(
            path,
            Path::new("./artifacts/contracts/UserAccounts.sol/UserAccounts.json")
        );
    }

    #[test]
    fn deployment_paths_are_chain_scoped() {
        let layout = layout("/tmp/export", "11155111");
        assert_eq!(
            layout.deployed_addresses(),
            Path::new("/tmp/export/ignition/deployments/chain-11155111/deployed_addresses.json")
        );
        assert_eq!(
            layout.ignition_artifact("M#C"),
            Path::new("/tmp/export/ignition/deployments/chain-11155111/artifacts/M#C.json")
        );
    }
}
