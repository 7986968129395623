use anyhow::Result;
use clap::Parser;
use exporter::{
    cli::ExportConfig,
    env::init_console_subscriber,
    export::{export_contract, ContractDescriptor},
};
use tracing::info;

fn registered_contracts() -> Vec<ContractDescriptor> {
    vec![
        ContractDescriptor::new(
            "UserAccounts",
            "UserAccountsModule",
            "user-accounts-abi.json",
        ),
        // Operations lives in Storage.sol, so the build-artifact fallback
        // needs the source file override.
        ContractDescriptor::new("Operations", "OperationsModule", "operations-abi.json")
            .with_source_file("Storage"),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    init_console_subscriber();
    let config = ExportConfig::parse();
    info!("{}", serde_json::to_string_pretty(&config)?);

    for desc in registered_contracts() {
        info!("Exporting {} contract", desc.name);
        export_contract(&config, &desc).await?;
    }

    info!("All ABIs exported");
    Ok(())
}
