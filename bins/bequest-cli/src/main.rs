//! bequest-cli - Operator and owner command-line interface for Bequest.
//!
//! Signs instructions with a local key file and submits them to a
//! bequest-node over JSON-RPC. Amounts are in base units (1 coin = 10^9).

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, warn};

use bequest_core::accounts::{CustodialAccount, Record};
use bequest_core::activity::seconds_until_inactive;
use bequest_core::address::{custodial_address, single_heir_address};
use bequest_core::constants::{COIN, DEFAULT_RPC_PORT};
use bequest_core::crypto::KeyPair;
use bequest_core::instruction::{AccountTarget, Instruction, Receipt, Transaction};
use bequest_core::traits::Ledger;
use bequest_core::types::{HeirShare, Identity};
use bequest_keeper::load_keypair;
use bequest_ledger::RpcLedger;
use bequest_program::{decode_eligible, inheritance_state};

/// Bequest command-line interface.
#[derive(Parser)]
#[command(name = "bequest-cli")]
#[command(version, about = "Custodial inheritance: admin, owner and inspection commands")]
struct Cli {
    /// RPC server endpoint.
    #[arg(long, global = true, default_value_t = format!("http://127.0.0.1:{DEFAULT_RPC_PORT}"))]
    rpc_url: String,

    /// Signing key file (default: ~/.bequest/key).
    #[arg(long, global = true)]
    key: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new signing key.
    Keygen(KeygenArgs),
    /// Platform administration.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage your own inheritance accounts.
    Owner {
        #[command(subcommand)]
        action: OwnerAction,
    },
    /// Read-only queries.
    Inspect {
        #[command(subcommand)]
        action: InspectAction,
    },
    /// Fund an identity's wallet (development nodes only).
    Airdrop { identity: Identity, amount: u64 },
}

#[derive(Args)]
struct KeygenArgs {
    /// Where to write the key (default: ~/.bequest/key).
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Overwrite an existing key file.
    #[arg(long)]
    force: bool,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the platform config and treasury; the signer becomes admin.
    Init,
    /// Set the platform fee in basis points (max 200).
    SetFee { bps: u16 },
    Pause,
    Resume,
    /// Withdraw collected fees to the admin wallet.
    Withdraw { amount: u64 },
    TransferAdmin { new_admin: Identity },
    /// Show platform analytics.
    Analytics,
}

#[derive(Args)]
struct TargetArgs {
    /// Operate on the single-heir record for this heir instead of the
    /// multi-heir account.
    #[arg(long)]
    heir: Option<Identity>,
}

impl TargetArgs {
    fn target(&self) -> AccountTarget {
        match self.heir {
            Some(heir) => AccountTarget::SingleHeir(heir),
            None => AccountTarget::Custodial,
        }
    }
}

#[derive(Subcommand)]
enum OwnerAction {
    /// Create your user profile.
    CreateProfile {
        #[arg(long)]
        premium: bool,
    },
    Upgrade,
    /// Create the multi-heir custodial account.
    CreateAccount {
        /// Heir and allocation as `identity:percent`; repeat per heir.
        #[arg(long = "heir", required = true)]
        heirs: Vec<HeirShare>,
        /// Inactivity period in seconds (free tier: the default only).
        #[arg(long, default_value_t = bequest_core::constants::DEFAULT_INACTIVITY_PERIOD_SECS)]
        period: i64,
    },
    /// Create and fund a single-heir record.
    CreateSingleHeir {
        #[arg(long)]
        heir: Identity,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = bequest_core::constants::DEFAULT_INACTIVITY_PERIOD_SECS)]
        period: i64,
    },
    Deposit {
        amount: u64,
        #[command(flatten)]
        target: TargetArgs,
    },
    Withdraw {
        amount: u64,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Prove you are still active.
    Heartbeat {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Change the inactivity period (premium).
    SetPeriod {
        seconds: i64,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Replace the heir list of the multi-heir account (premium).
    SetHeirs {
        #[arg(long = "heir", required = true)]
        heirs: Vec<HeirShare>,
    },
}

#[derive(Subcommand)]
enum InspectAction {
    /// Show an owner's custodial account.
    Account {
        owner: Identity,
        #[arg(long)]
        heir: Option<Identity>,
    },
    /// List accounts eligible for execution right now.
    Eligible,
    /// Native balance of an identity's wallet.
    Balance { identity: Identity },
    /// Ledger clock.
    Time,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Admin { action } => {
            let ix = match action {
                AdminAction::Init => Instruction::Initialize,
                AdminAction::SetFee { bps } => Instruction::SetPlatformFee { bps: *bps },
                AdminAction::Pause => Instruction::Pause,
                AdminAction::Resume => Instruction::Resume,
                AdminAction::Withdraw { amount } => Instruction::WithdrawTreasury { amount: *amount },
                AdminAction::TransferAdmin { new_admin } => Instruction::TransferAdmin { new_admin: *new_admin },
                AdminAction::Analytics => return analytics(&cli).await,
            };
            submit(&cli, ix).await
        }
        Commands::Owner { action } => submit(&cli, owner_instruction(action)).await,
        Commands::Inspect { action } => inspect(&cli, action).await,
        Commands::Airdrop { identity, amount } => {
            let balance = connect(&cli)?
                .airdrop(&identity.wallet(), *amount)
                .await
                .context("airdrop failed (is the node running with --enable-airdrop?)")?;
            println!("Balance of {identity}: {}", format_amount(balance));
            Ok(())
        }
    }
}

fn owner_instruction(action: &OwnerAction) -> Instruction {
    match action {
        OwnerAction::CreateProfile { premium } => Instruction::CreateUserProfile { is_premium: *premium },
        OwnerAction::Upgrade => Instruction::UpgradeToPremium,
        OwnerAction::CreateAccount { heirs, period } => Instruction::CreateCustodialAccount {
            heirs: heirs.clone(),
            inactivity_period_seconds: *period,
        },
        OwnerAction::CreateSingleHeir { heir, amount, period } => Instruction::CreateSingleHeir {
            heir: *heir,
            amount: *amount,
            inactivity_period_seconds: *period,
        },
        OwnerAction::Deposit { amount, target } => Instruction::Deposit { target: target.target(), amount: *amount },
        OwnerAction::Withdraw { amount, target } => Instruction::Withdraw { target: target.target(), amount: *amount },
        OwnerAction::Heartbeat { target } => Instruction::Heartbeat { target: target.target() },
        OwnerAction::SetPeriod { seconds, target } => Instruction::UpdateInactivityPeriod {
            target: target.target(),
            seconds: *seconds,
        },
        OwnerAction::SetHeirs { heirs } => Instruction::UpdateHeirs { heirs: heirs.clone() },
    }
}

fn keygen(args: &KeygenArgs) -> Result<()> {
    let path = resolve_key_path(args.out.clone())?;
    if path.exists() && !args.force {
        bail!("Key file already exists: {} (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let keypair = KeyPair::generate();
    std::fs::write(&path, hex::encode(keypair.secret_bytes()))
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;

    println!("Identity: {}", keypair.identity());
    println!("Key file: {}", path.display());
    println!("\nWARNING: anyone with this file controls the identity and its funds.");
    Ok(())
}

fn connect(cli: &Cli) -> Result<RpcLedger> {
    RpcLedger::connect(&cli.rpc_url, Duration::from_secs(30)).context("Failed to connect to RPC")
}

async fn submit(cli: &Cli, instruction: Instruction) -> Result<()> {
    let path = resolve_key_path(cli.key.clone())?;
    let keypair = load_keypair(&path).with_context(|| format!("Failed to load key: {}", path.display()))?;
    let name = instruction.name();
    let tx = Transaction::new(instruction, keypair.identity(), fresh_nonce())
        .sign(&keypair)
        .context("Failed to sign transaction")?;
    debug!(instruction = name, signer = %keypair.identity(), nonce = tx.tx.nonce, "submitting transaction");
    let receipt = connect(cli)?
        .submit_and_confirm(&tx)
        .await
        .with_context(|| format!("{name} failed"))?;
    print_receipt(name, &receipt);
    Ok(())
}

fn print_receipt(name: &str, receipt: &Receipt) {
    println!("{name} confirmed");
    println!("  txid:      {}", receipt.txid);
    println!("  timestamp: {}", receipt.timestamp);
    for t in &receipt.transfers {
        println!("  transfer:  {} -> {}  {}", t.from, t.to, format_amount(t.amount));
    }
}

async fn analytics(cli: &Cli) -> Result<()> {
    let analytics = connect(cli)?.analytics().await.context("Failed to fetch analytics")?;
    println!("{}", serde_json::to_string_pretty(&analytics)?);
    Ok(())
}

async fn inspect(cli: &Cli, action: &InspectAction) -> Result<()> {
    let ledger = connect(cli)?;
    match action {
        InspectAction::Account { owner, heir } => {
            let address = match heir {
                Some(heir) => single_heir_address(owner, heir),
                None => custodial_address(owner),
            };
            let data = ledger
                .read_account(&address)
                .await?
                .with_context(|| format!("No account at {address}"))?;
            let account = CustodialAccount::from_bytes(&data).context("Failed to decode account")?;
            let now = ledger.unix_timestamp().await?;
            let balance = ledger.native_balance(&account.vault_address()).await?;

            println!("Address:  {address}");
            println!("Kind:     {}", account.kind);
            println!("State:    {:?}", inheritance_state(&account, now));
            println!("Balance:  {}", format_amount(balance));
            println!("Period:   {}s", account.inactivity_period_seconds);
            println!("Inactive in {}s", seconds_until_inactive(&account, now));
            for share in &account.heirs {
                println!("Heir:     {share}");
            }
        }
        InspectAction::Eligible => {
            let now = ledger.unix_timestamp().await?;
            let accounts = ledger.list_accounts(CustodialAccount::DISCRIMINATOR).await?;
            debug!(now, records = accounts.len(), "scanning custodial records");
            for (address, data) in accounts {
                match decode_eligible(&data, now) {
                    Ok(Some(account)) => println!("{address}  owner={}  kind={}", account.owner, account.kind),
                    Ok(None) => {}
                    Err(e) => warn!(%address, error = %e, "skipping undecodable custodial record"),
                }
            }
        }
        InspectAction::Balance { identity } => {
            let balance = ledger.native_balance(&identity.wallet()).await?;
            println!("{}", format_amount(balance));
        }
        InspectAction::Time => println!("{}", ledger.unix_timestamp().await?),
    }
    Ok(())
}

/// Nanosecond wall clock; distinct per invocation so identical instructions
/// get distinct transaction ids.
fn fresh_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn format_amount(amount: u64) -> String {
    format!("{}.{:09} ({amount} units)", amount / COIN, amount % COIN)
}

/// Resolve key file path, using default if not provided.
fn resolve_key_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".bequest").join("key"))
}
