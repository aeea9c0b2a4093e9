use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use credit_gate::checkpoint::CheckpointStore;
use credit_gate::command::RechargeCommand;
use credit_gate::config::Config;
use credit_gate::ledger::Ledger;
use credit_gate::monitor::RechargeMonitor;
use credit_gate::notify::MailNotifier;
use credit_gate::source::MailApiSource;

/// Credit-gated search runtime - per-account ledger with mailbox recharge
#[derive(Parser, Debug)]
#[command(name = "credit-gate", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "credit-gate.toml")]
    config: String,

    /// Override the monitor check interval (seconds)
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();
    let mut config = Config::from_file(&args.config)?;
    if let Some(secs) = args.interval {
        config.monitor.check_interval_secs = secs;
    }
    config.validate()?;

    info!(
        service = %config.service_name,
        mailbox = %config.mail.address,
        interval_secs = config.monitor.check_interval_secs,
        "credit-gate starting"
    );

    let notifier = Arc::new(MailNotifier::new(
        &config.mail,
        &config.credits,
        &config.service_name,
    ));
    let ledger = Arc::new(Ledger::new(config.credits.initial, notifier.clone()));
    let source = Arc::new(MailApiSource::new(&config.mail));
    let checkpoint = CheckpointStore::open(&config.monitor.state_dir, Utc::now())?;
    let command = RechargeCommand::new(
        &config.credits.recharge_subject,
        config.credits.recharge_amount,
    );

    let monitor = RechargeMonitor::new(
        ledger,
        source,
        notifier,
        checkpoint,
        command,
        Duration::from_secs(config.monitor.check_interval_secs),
    );

    tokio::select! {
        _ = monitor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            // An abandoned tick never advanced the checkpoint; the processed
            // set makes the replayed window a no-op.
            info!("shutdown requested, abandoning in-flight tick");
        }
    }

    Ok(())
}
