use anyhow::Context;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";
const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpesaEnvironment {
    Sandbox,
    Production,
}

impl MpesaEnvironment {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("production") {
            MpesaEnvironment::Production
        } else {
            MpesaEnvironment::Sandbox
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            MpesaEnvironment::Sandbox => SANDBOX_BASE_URL,
            MpesaEnvironment::Production => PRODUCTION_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MpesaConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub shortcode: String,
    pub passkey: String,
    pub environment: MpesaEnvironment,
    pub base_url: String,
    /// Public URL the provider posts confirmations to.
    pub callback_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub till_number: String,
    pub mpesa: MpesaConfig,
    pub data_file: PathBuf,
    pub provisioning_url: Option<String>,
    pub provisioning_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_port = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a port number")?;

        let environment = MpesaEnvironment::parse(&var("MPESA_ENV", "sandbox"));
        let mpesa = MpesaConfig {
            consumer_key: var("MPESA_CONSUMER_KEY", ""),
            consumer_secret: var("MPESA_CONSUMER_SECRET", ""),
            shortcode: var("MPESA_SHORTCODE", ""),
            passkey: var("MPESA_PASSKEY", ""),
            environment,
            base_url: var("MPESA_BASE_URL", environment.base_url()),
            callback_url: var(
                "MPESA_CALLBACK_URL",
                "https://example.com/mpesa/confirmation",
            ),
            timeout_secs: var("MPESA_TIMEOUT_SECS", "30")
                .parse()
                .context("MPESA_TIMEOUT_SECS must be a number of seconds")?,
        };

        let provisioning_timeout_secs = var("PROVISIONING_TIMEOUT_SECS", "30")
            .parse()
            .context("PROVISIONING_TIMEOUT_SECS must be a number of seconds")?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        let log_format = if var("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        Ok(Config {
            server_port,
            till_number: var("TILL_NUMBER", "6311719"),
            mpesa,
            data_file: PathBuf::from(var("DATA_FILE", "transactions.json")),
            provisioning_url: lookup("PROVISIONING_URL").filter(|url| !url.trim().is_empty()),
            provisioning_timeout_secs,
            cors_allowed_origins,
            log_format,
        })
    }

    /// Checks URLs and returns warnings for settings that will make
    /// payments fail at runtime.
    pub fn validate(&self) -> anyhow::Result<Vec<String>> {
        if self.server_port == 0 {
            anyhow::bail!("SERVER_PORT must be greater than 0");
        }
        url::Url::parse(&self.mpesa.base_url).context("MPESA_BASE_URL is not a valid URL")?;
        url::Url::parse(&self.mpesa.callback_url)
            .context("MPESA_CALLBACK_URL is not a valid URL")?;
        if let Some(provisioning_url) = &self.provisioning_url {
            url::Url::parse(provisioning_url).context("PROVISIONING_URL is not a valid URL")?;
        }

        let mut warnings = Vec::new();
        for (name, value) in [
            ("MPESA_CONSUMER_KEY", &self.mpesa.consumer_key),
            ("MPESA_CONSUMER_SECRET", &self.mpesa.consumer_secret),
            ("MPESA_SHORTCODE", &self.mpesa.shortcode),
            ("MPESA_PASSKEY", &self.mpesa.passkey),
        ] {
            if value.is_empty() {
                warnings.push(format!("{} is not set", name));
            }
        }
        if self.mpesa.callback_url.starts_with("https://example.com") {
            warnings.push("MPESA_CALLBACK_URL is still the placeholder".to_string());
        }
        Ok(warnings)
    }
}
