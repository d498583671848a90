use bundle_pay::cli::{self, Cli, Commands, TxCommands};
use bundle_pay::config::{Config, LogFormat};
use bundle_pay::domain::Catalog;
use bundle_pay::{cors_layer, create_app, AppState};
use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Tx(TxCommands::List { phone }) => {
            cli::handle_tx_list(&config, phone.as_deref()).await
        }
        Commands::Packages => {
            cli::handle_packages(&Catalog::default());
            Ok(())
        }
        Commands::Config => cli::handle_config_validate(&config),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    for warning in config.validate()? {
        tracing::warn!("{}", warning);
    }

    let state = AppState::from_config(&config).await?;
    tracing::info!(
        transactions = state.store.len().await,
        data_file = %config.data_file.display(),
        "Transaction store ready"
    );
    tracing::info!("M-PESA client initialized with URL: {}", config.mpesa.base_url);

    let mut app = create_app(state);
    if let Some(origins) = &config.cors_allowed_origins {
        app = app.layer(cors_layer(origins));
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
