// ============================================================================
// pointgate — CLI for the points-gated access ledger
// ============================================================================
// Usage:
//   pointgate status HANDLE                 Settled account status
//   pointgate checkin HANDLE                Claim the daily bonus
//   pointgate toggle HANDLE on|off          Switch access (1 point to turn on)
//   pointgate redeem HANDLE CODE            Spend a single-use code
//   pointgate gate [HANDLE]                 Access decision for the resource
//   pointgate codes mint --points N         Provision redeem codes
//   pointgate codes list                    List provisioned codes
//   pointgate profile set HANDLE NAME       Write an identity entry
//   pointgate stats                         Database statistics
// ============================================================================

use std::sync::Arc;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use pointgate_core::{
    AccountLedger, FsDataPurge, LedgerDb, Points, RedeemCode, SystemClock, UserProfile,
};

/// Points-gated access ledger tool
#[derive(Parser)]
#[command(name = "pointgate", version, about = "Inspect and drive the points ledger")]
struct Cli {
    /// Path to the database file (default: ~/.pointgate/ledger.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Root of per-user data directories (default: ~/.pointgate/users)
    #[arg(long, global = true)]
    data_root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the settled account status for a handle
    Status { handle: String },

    /// Claim the once-per-day check-in bonus
    Checkin { handle: String },

    /// Turn access on or off
    Toggle {
        handle: String,
        /// Desired state: on or off
        switch: String,
    },

    /// Redeem a single-use code
    Redeem { handle: String, code: String },

    /// Evaluate the access gate (omit the handle for the logged-out case)
    Gate { handle: Option<String> },

    /// Manage redeem codes
    Codes {
        #[command(subcommand)]
        command: CodeCommands,
    },

    /// Manage identity profile entries
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Show database statistics
    Stats,
}

#[derive(Subcommand)]
enum CodeCommands {
    /// Mint new redeem codes
    Mint {
        /// Point value of each code (half-point steps)
        #[arg(long)]
        points: f64,

        /// How many codes to mint
        #[arg(long, default_value = "1")]
        count: u32,

        /// Use this exact code instead of generating one (count must be 1)
        #[arg(long)]
        code: Option<String>,
    },

    /// List provisioned codes
    List,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Write the identity entry for a handle
    Set { handle: String, name: String },

    /// Show the identity entry for a handle
    Show { handle: String },
}

fn parse_switch(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        _ => anyhow::bail!("Unknown switch '{}'. Valid values: on, off", s),
    }
}

fn format_timestamp(ts_ms: i64) -> String {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts_ms))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pointgate_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let db = Arc::new(LedgerDb::open(cli.db_path.as_deref())?);

    let data_root = match &cli.data_root {
        Some(root) => root.into(),
        None => FsDataPurge::default_root()?,
    };
    let purger = Arc::new(FsDataPurge::new(db.clone(), data_root));
    let ledger = AccountLedger::new(db.clone(), Arc::new(SystemClock), purger);

    match cli.command {
        Commands::Status { handle } => cmd_status(&ledger, &handle).await,
        Commands::Checkin { handle } => cmd_checkin(&ledger, &handle).await,
        Commands::Toggle { handle, switch } => cmd_toggle(&ledger, &handle, &switch).await,
        Commands::Redeem { handle, code } => cmd_redeem(&ledger, &handle, &code).await,
        Commands::Gate { handle } => cmd_gate(&ledger, handle.as_deref()).await,
        Commands::Codes { command } => match command {
            CodeCommands::Mint {
                points,
                count,
                code,
            } => cmd_mint_codes(&db, points, count, code),
            CodeCommands::List => cmd_list_codes(&db),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set { handle, name } => cmd_profile_set(&db, &handle, &name),
            ProfileCommands::Show { handle } => cmd_profile_show(&db, &handle),
        },
        Commands::Stats => cmd_stats(&db),
    }
}

async fn cmd_status(ledger: &AccountLedger, handle: &str) -> Result<()> {
    let name = ledger
        .db()
        .get_profile(handle)?
        .map(|p| p.name)
        .unwrap_or_else(|| handle.to_string());

    let status = ledger.status(handle, &name).await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn cmd_checkin(ledger: &AccountLedger, handle: &str) -> Result<()> {
    let receipt = ledger.check_in(handle).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn cmd_toggle(ledger: &AccountLedger, handle: &str, switch: &str) -> Result<()> {
    let desired = parse_switch(switch)?;
    let receipt = ledger.toggle_access(handle, desired).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn cmd_redeem(ledger: &AccountLedger, handle: &str, code: &str) -> Result<()> {
    let receipt = ledger.redeem(handle, code).await?;
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

async fn cmd_gate(ledger: &AccountLedger, handle: Option<&str>) -> Result<()> {
    let decision = ledger.evaluate_access(handle).await?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn cmd_mint_codes(db: &LedgerDb, points: f64, count: u32, code: Option<String>) -> Result<()> {
    if code.is_some() && count != 1 {
        anyhow::bail!("--code only makes sense with --count 1");
    }
    let value = Points::from_f64_lossy(points);
    if value.is_zero() {
        anyhow::bail!("Code value must be at least 0.5 points");
    }

    let now_ms = Utc::now().timestamp_millis();
    for _ in 0..count {
        let code_str = match &code {
            Some(c) => c.trim().to_uppercase(),
            None => generate_code(),
        };
        db.store_code(&RedeemCode {
            code: code_str.clone(),
            points: value,
            used: false,
            used_by: None,
            used_at: None,
            created_at: now_ms,
        })?;
        println!("{}  ({} points)", code_str, value);
    }
    Ok(())
}

fn generate_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..12].to_uppercase()
}

fn cmd_list_codes(db: &LedgerDb) -> Result<()> {
    let codes = db.list_codes()?;

    if codes.is_empty() {
        println!("No redeem codes found.");
        return Ok(());
    }

    println!(
        "{:<16}  {:>8}  {:<6}  {:<16}  {}",
        "CODE", "POINTS", "USED", "USED BY", "USED AT"
    );
    println!("{}", "-".repeat(72));

    for code in &codes {
        println!(
            "{:<16}  {:>8}  {:<6}  {:<16}  {}",
            code.code,
            code.points.to_string(),
            if code.used { "yes" } else { "no" },
            code.used_by.as_deref().unwrap_or("-"),
            code.used_at.map(format_timestamp).unwrap_or_else(|| "-".to_string()),
        );
    }

    println!("\nTotal: {} codes", codes.len());
    Ok(())
}

fn cmd_profile_set(db: &LedgerDb, handle: &str, name: &str) -> Result<()> {
    db.store_profile(&UserProfile {
        handle: handle.to_string(),
        name: name.to_string(),
        created_at: Utc::now().timestamp_millis(),
    })?;
    println!("Profile stored for {}", handle);
    Ok(())
}

fn cmd_profile_show(db: &LedgerDb, handle: &str) -> Result<()> {
    match db.get_profile(handle)? {
        Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
        None => println!("No profile for {}", handle),
    }
    Ok(())
}

fn cmd_stats(db: &LedgerDb) -> Result<()> {
    let stats = db.stats()?;

    println!("=== Pointgate Ledger Stats ===");
    println!("Database: {}", db.path().display());
    println!();
    println!("Accounts: {} total, {} with access on", stats.total_accounts, stats.accounts_with_access_on);
    println!("Codes:    {} total, {} unused", stats.total_codes, stats.unused_codes);
    println!("Profiles: {}", stats.total_profiles);

    Ok(())
}
