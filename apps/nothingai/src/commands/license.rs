//! License key commands.
//!
//! `status`, `validate`, `activate` and `deactivate` act for this device.
//! `generate`, `list`, `revoke` and `delete` administer the configured
//! backend directly.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use nothing_license::LicenseRecord;

use crate::context::AppContext;

#[derive(Subcommand)]
pub enum LicenseCommands {
    /// Show this device's activation
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a key without activating it
    Validate {
        /// License key (NOTHING-XXXX-XXXX-XXXX)
        key: String,
    },

    /// Activate a key on this device
    Activate {
        /// License key (NOTHING-XXXX-XXXX-XXXX)
        key: String,
    },

    /// Remove this device's activation and free its slot
    Deactivate,

    /// Issue a new key
    Generate {
        /// Devices that may activate the key
        #[arg(long, default_value_t = 1)]
        max_usages: u32,

        /// Days until the key expires; never when omitted
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=36_500))]
        expires_in_days: Option<u32>,
    },

    /// List every key in the backend
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deactivate a key for every device
    Revoke {
        /// License key
        key: String,
    },

    /// Remove a key from the backend
    Delete {
        /// License key
        key: String,
    },
}

pub async fn execute(cmd: LicenseCommands) -> Result<()> {
    let ctx = AppContext::load()?;
    let gate = ctx.license_gate()?;
    tracing::debug!(backend = gate.backend_name(), "license backend selected");

    match cmd {
        LicenseCommands::Status { json } => {
            let status = gate.status().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }
            if status.active {
                println!("{} License active", "OK".green());
            } else {
                println!("{} No active license", "WARN".yellow());
            }
            if let Some(key) = &status.key {
                println!("  Key:       {key}");
            }
            if let Some(at) = status.activated_at {
                println!("  Activated: {}", at.to_rfc3339());
            }
            println!("  Device:    {}", status.device_id);
            println!("  Backend:   {}", status.backend);
        }
        LicenseCommands::Validate { key } => {
            let outcome = gate.validate(&key).await?;
            if !outcome.valid {
                anyhow::bail!("{}", outcome.reason);
            }
            println!("{} {}", "OK".green(), outcome.reason);
        }
        LicenseCommands::Activate { key } => {
            let outcome = gate.activate(&key).await?;
            if !outcome.success {
                anyhow::bail!("{}", outcome.message);
            }
            println!("{} {}", "OK".green(), outcome.message);
        }
        LicenseCommands::Deactivate => {
            if gate.deactivate().await? {
                println!("{} License removed from this device", "OK".green());
            } else {
                println!("{} No license was active on this device", "WARN".yellow());
            }
        }
        LicenseCommands::Generate {
            max_usages,
            expires_in_days,
        } => {
            let record = gate.generate(max_usages, expires_in_days).await?;
            println!("{}", record.key);
            eprintln!("{}", describe(&record).dimmed());
        }
        LicenseCommands::List { json } => {
            let records = gate.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No license keys");
            } else {
                for record in &records {
                    let state = if record.is_active {
                        "active".green()
                    } else {
                        "inactive".red()
                    };
                    println!("{}  {state}  {}", record.key, describe(record));
                }
            }
        }
        LicenseCommands::Revoke { key } => {
            let record = gate.revoke(&key).await?;
            println!("{} Revoked {}", "OK".green(), record.key);
        }
        LicenseCommands::Delete { key } => {
            gate.delete(&key).await?;
            println!("{} Deleted {}", "OK".green(), key.trim().to_ascii_uppercase());
        }
    }
    Ok(())
}

fn describe(record: &LicenseRecord) -> String {
    let expiry = record.expires_at.map_or_else(
        || "no expiry".to_string(),
        |at| format!("expires {}", at.format("%Y-%m-%d")),
    );
    format!(
        "{}/{} devices, {expiry}, created {}",
        record.usages,
        record.max_usages,
        record.created_at.format("%Y-%m-%d")
    )
}
