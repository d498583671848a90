use clap::{Parser, Subcommand};

use crate::adapters::JsonFilePersistence;
use crate::config::Config;
use crate::domain::{phone, Catalog};
use crate::ports::TransactionPersistence;

#[derive(Parser)]
#[command(name = "bundle-pay")]
#[command(about = "Bundle purchases over M-PESA STK push", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Print the package catalog
    Packages,

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Print persisted transactions
    List {
        /// Only show transactions for this phone number
        #[arg(short, long)]
        phone: Option<String>,
    },
}

pub async fn handle_tx_list(config: &Config, phone_filter: Option<&str>) -> anyhow::Result<()> {
    let ledger = JsonFilePersistence::new(config.data_file.clone())
        .load()
        .await?;

    let output = match phone_filter {
        Some(raw) => {
            let phone = phone::normalize_str(raw);
            let history = ledger.get(&phone).cloned().unwrap_or_default();
            tracing::info!("{} transactions for {}", history.len(), phone);
            serde_json::to_string_pretty(&history)?
        }
        None => serde_json::to_string_pretty(&ledger)?,
    };

    println!("{}", output);
    Ok(())
}

pub fn handle_packages(catalog: &Catalog) {
    for pkg in catalog.packages() {
        println!(
            "{:<10} {:>5}  {:<45} {}",
            pkg.id,
            pkg.price,
            pkg.name,
            if pkg.allow_multiple { "multiple/day" } else { "once/day" }
        );
    }
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Till Number: {}", config.till_number);
    println!("  Data File: {}", config.data_file.display());
    println!("  M-PESA Environment: {:?}", config.mpesa.environment);
    println!("  M-PESA Base URL: {}", config.mpesa.base_url);
    println!("  M-PESA Callback URL: {}", config.mpesa.callback_url);
    println!("  M-PESA Shortcode: {}", config.mpesa.shortcode);
    println!("  M-PESA Consumer Key: {}", mask_secret(&config.mpesa.consumer_key));
    println!("  M-PESA Passkey: {}", mask_secret(&config.mpesa.passkey));
    match &config.provisioning_url {
        Some(url) => println!(
            "  Provisioning: {} (timeout {}s)",
            url, config.provisioning_timeout_secs
        ),
        None => println!("  Provisioning: simulated"),
    }

    let warnings = config.validate()?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
        println!("  ! {}", warning);
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");
    Ok(())
}

fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        "(unset)".to_string()
    } else if value.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &value[..value.char_indices().nth(2).map(|(i, _)| i).unwrap_or(0)])
    }
}
