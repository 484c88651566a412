//! MedLedger CLI
//!
//! Command-line client for the medical-records registry. Every signing
//! action prints a QR image URL for the wallet app and waits for the
//! approval to arrive on the real-time channel.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use medledger_core::{
    pending_registrations, FileRecordStore, Gender, GeneratedAccount, JsonRpcLedger,
    MedicalRecord, RecordStore, RegistrationDetails, SessionCipher, SessionContext,
};
use medledger_signing::{
    BackendConfig, FlowOutcome, HttpBackend, Initiator, WaitOptions, Workflows,
};
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "medledger")]
#[command(about = "MedLedger registry CLI", version)]
struct Cli {
    /// Bound every wallet wait, in seconds (waits forever by default)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a wallet-importable account without registering it
    GenerateAccount,

    /// Register a patient: generate an account and pay the registration fee
    Register {
        /// Patient name
        #[arg(short, long)]
        name: String,

        /// Registering hospital
        #[arg(long)]
        hospital: String,
    },

    /// Sign in with the wallet app
    Login,

    /// List registration requests from the oracle's transaction history
    Requests,

    /// Seal a medical record and mint its token for a subject
    AddRecord {
        /// Subject account address
        #[arg(short, long)]
        subject: String,

        /// Patient name
        #[arg(short, long)]
        name: String,

        /// Patient age in years
        #[arg(long)]
        age: u32,

        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        date_of_birth: String,

        /// Gender (male, female, other)
        #[arg(long)]
        gender: String,

        /// Blood type
        #[arg(long)]
        blood_type: String,

        /// Known allergies
        #[arg(long)]
        allergies: Option<String>,

        /// Path to an attached document
        #[arg(long)]
        attachment: Option<std::path::PathBuf>,

        /// Vault passcode sealing the record
        #[arg(short, long)]
        passcode: String,
    },

    /// Decrypt and print a stored record
    ViewRecord {
        /// Content id of the sealed record
        content_id: String,

        /// Vault passcode
        #[arg(short, long)]
        passcode: String,
    },

    /// Show the effective configuration
    Info,
}

/// Runtime configuration, read from the environment
struct Config {
    backend_url: String,
    ledger_url: String,
    oracle_address: String,
    service_key: String,
    vault_dir: String,
}

impl Config {
    fn from_env() -> Self {
        Self {
            backend_url: env_or("MEDLEDGER_BACKEND_URL", "http://localhost:3001"),
            ledger_url: env_or(
                "MEDLEDGER_XRPL_RPC_URL",
                "https://s.altnet.rippletest.net:51234",
            ),
            oracle_address: env_or("MEDLEDGER_ORACLE_ADDRESS", ""),
            service_key: env_or("MEDLEDGER_SERVICE_KEY", ""),
            vault_dir: env_or("MEDLEDGER_VAULT_DIR", "vault"),
        }
    }

    fn oracle(&self) -> Result<&str> {
        if self.oracle_address.is_empty() {
            bail!("MEDLEDGER_ORACLE_ADDRESS is not set");
        }
        Ok(&self.oracle_address)
    }

    fn cipher(&self) -> Result<SessionCipher> {
        if self.service_key.is_empty() {
            bail!("MEDLEDGER_SERVICE_KEY is not set");
        }
        Ok(SessionCipher::new(&self.service_key))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_gender(value: &str) -> Result<Gender> {
    match value.to_ascii_lowercase().as_str() {
        "male" => Ok(Gender::Male),
        "female" => Ok(Gender::Female),
        "other" => Ok(Gender::Other),
        _ => bail!("unknown gender {value:?}; expected male, female, or other"),
    }
}

fn workflows(config: &Config, timeout: Option<u64>) -> Result<Workflows<HttpBackend>> {
    let backend = HttpBackend::new(BackendConfig::new(&config.backend_url));
    let initiator = Initiator::new(backend, config.oracle()?);
    let mut options = WaitOptions::default();
    if let Some(secs) = timeout {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    Ok(Workflows::new(initiator).with_options(options))
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::GenerateAccount => generate_account(),
        Commands::Register { name, hospital } => {
            register(&config, cli.timeout, name, hospital).await?;
        }
        Commands::Login => login(&config, cli.timeout).await?,
        Commands::Requests => list_requests(&config).await?,
        Commands::AddRecord {
            subject,
            name,
            age,
            date_of_birth,
            gender,
            blood_type,
            allergies,
            attachment,
            passcode,
        } => {
            let record = MedicalRecord {
                name,
                age,
                date_of_birth,
                gender: parse_gender(&gender)?,
                blood_type,
                allergies,
                attachment: match attachment {
                    Some(path) => std::fs::read(&path)
                        .with_context(|| format!("reading attachment {}", path.display()))?,
                    None => Vec::new(),
                },
            };
            add_record(&config, cli.timeout, &subject, &record, &passcode).await?;
        }
        Commands::ViewRecord {
            content_id,
            passcode,
        } => view_record(&config, &content_id, &passcode).await?,
        Commands::Info => show_info(&config),
    }

    Ok(())
}

fn generate_account() {
    let account = GeneratedAccount::generate();
    println!("Address: {}", account.address);
    println!("Seed:    {}", account.seed);
    println!();
    println!("Import the seed into your wallet app and fund the account");
    println!("before approving any transaction from it.");
}

async fn register(config: &Config, timeout: Option<u64>, name: String, hospital: String) -> Result<()> {
    let flows = workflows(config, timeout)?;
    let details = RegistrationDetails::new(name, hospital);
    details.validate()?;

    info!("Starting registration; a QR code URL will be printed shortly");
    match flows.register(details).await? {
        FlowOutcome::Completed(registration) => {
            println!("Registration payment signed");
            println!("Account: {}", registration.account.address);
            println!("Seed:    {}", registration.account.seed);
            if let Some(tx) = registration.tx_id {
                println!("Payment: {tx}");
            }
            println!();
            println!("Keep the seed safe; it is the only copy.");
        }
        FlowOutcome::Declined => println!("Registration declined in the wallet app"),
        FlowOutcome::Failed { reason } => bail!("registration failed: {reason}"),
    }
    Ok(())
}

async fn login(config: &Config, timeout: Option<u64>) -> Result<()> {
    let flows = workflows(config, timeout)?;
    let cipher = config.cipher()?;
    let session = SessionContext::new();

    match flows.login(&cipher, &session).await? {
        FlowOutcome::Completed(claims) => {
            println!(
                "Signed in as {} ({})",
                claims.address.as_deref().unwrap_or("unknown"),
                claims.role.map(|r| r.to_string()).unwrap_or_default()
            );
            if let Some(active) = session.current().await {
                println!("Token: {}", active.token);
            }
        }
        FlowOutcome::Declined => println!("Sign-in declined in the wallet app"),
        FlowOutcome::Failed { reason } => bail!("sign-in failed: {reason}"),
    }
    Ok(())
}

async fn list_requests(config: &Config) -> Result<()> {
    let ledger = JsonRpcLedger::new(&config.ledger_url);
    let requests = pending_registrations(&ledger, config.oracle()?).await?;

    if requests.is_empty() {
        println!("No registration requests");
        return Ok(());
    }

    for request in requests {
        let status = if request.accepted { "accepted" } else { "pending" };
        let (name, hospital) = request
            .details
            .map(|d| (d.name, d.hospital))
            .unwrap_or_default();
        println!(
            "{:<36} {:<8} {:<20} {:<20} {}",
            request.account, status, name, hospital, request.tx_hash
        );
    }
    Ok(())
}

async fn add_record(
    config: &Config,
    timeout: Option<u64>,
    subject: &str,
    record: &MedicalRecord,
    passcode: &str,
) -> Result<()> {
    record.validate()?;
    let flows = workflows(config, timeout)?;
    let store = FileRecordStore::new(&config.vault_dir)?;

    match flows.mint_record(subject, record, passcode, &store).await? {
        FlowOutcome::Completed(reference) => {
            println!("Record sealed and minted");
            println!("Content id: {}", reference.content_id);
            if let Some(tx) = reference.mint_tx {
                println!("Mint tx:    {tx}");
            }
        }
        FlowOutcome::Declined => println!("Mint declined in the wallet app"),
        FlowOutcome::Failed { reason } => bail!("mint failed: {reason}"),
    }
    Ok(())
}

async fn view_record(config: &Config, content_id: &str, passcode: &str) -> Result<()> {
    let store = FileRecordStore::new(&config.vault_dir)?;
    let sealed = store.load(content_id).await?;
    let record = sealed.unseal(passcode)?;

    println!("Name:          {}", record.name);
    println!("Age:           {}", record.age);
    println!("Date of birth: {}", record.date_of_birth);
    println!("Blood type:    {}", record.blood_type);
    if let Some(allergies) = &record.allergies {
        println!("Allergies:     {allergies}");
    }
    if !record.attachment.is_empty() {
        println!("Attachment:    {} bytes", record.attachment.len());
    }
    Ok(())
}

fn show_info(config: &Config) {
    println!("medledger {}", medledger_core::VERSION);
    println!("Backend:  {}", config.backend_url);
    println!("Ledger:   {}", config.ledger_url);
    println!(
        "Oracle:   {}",
        if config.oracle_address.is_empty() {
            "(unset)"
        } else {
            &config.oracle_address
        }
    );
    println!("Vault:    {}", config.vault_dir);
}
