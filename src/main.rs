//! erpboard main entry point

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use erpboard_api::{start_server, AppState};
use erpboard_client::ErpClient;
use erpboard_config::{Config, ExportFormat};
use erpboard_core::{Dashboard, Health, TycRequest};
use erpboard_export::{format_money, format_pct, tyc_table, write_to_dir, Dataset};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "erpboard")]
#[command(version = "0.1.0")]
#[command(about = "Sales and purchasing analytics over an ERP REST API", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the ERP data and serve the JSON API (default)
    Serve,
    /// Load the ERP data and print the dashboard totals
    Summary,
    /// Load the ERP data and write one dataset to a file
    Export {
        /// periods, vendors, clients, suppliers, payment_methods, invoices, purchases or tyc
        #[arg(short, long)]
        dataset: String,
        /// csv or xlsx; defaults to export.default_format
        #[arg(short, long)]
        format: Option<ExportFormat>,
        /// Output directory; defaults to export.output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a default configuration file
    Init,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::Init) = args.command {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        return init_config(&args.config);
    }

    let config = load_config(&args.config)?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    log::info!("Config loaded: ERP at {}", config.erp.base_url);

    let rt = Runtime::new()?;
    rt.block_on(async move {
        let client = ErpClient::from_config(&config).context("Failed to build the ERP client")?;
        let dashboard = Dashboard::new(client, &config);

        let report = dashboard.reload().await;
        for failed in report.failed() {
            log::warn!(
                "{} unavailable after {} attempt(s): {}",
                failed.resource,
                failed.attempts,
                failed.error.as_deref().unwrap_or("unknown error")
            );
        }

        match args.command.unwrap_or(Command::Serve) {
            Command::Serve | Command::Init => {
                start_server(AppState::new(dashboard, config)).await?;
            }
            Command::Summary => print_summary(&dashboard, &config).await?,
            Command::Export {
                dataset,
                format,
                output,
            } => {
                let dataset: Dataset = dataset.parse()?;
                let format = format.unwrap_or(config.export.default_format);
                let dir = output.unwrap_or_else(|| config.export.output_dir.clone());
                let today = chrono::Local::now().date_naive();

                let table = if dataset == Dataset::Tyc {
                    let matrix = dashboard.tyc().analyze(&TycRequest::default()).await?;
                    tyc_table(&matrix)
                } else {
                    let store = dashboard.store().await;
                    if let Some(err) = store.state().fatal_error() {
                        return Err(err.into());
                    }
                    dataset.build(store.state(), dashboard.settings())?
                };

                let path = write_to_dir(&table, dataset.name(), format, &dir, today)?;
                println!("{}", path.display());
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

async fn print_summary(dashboard: &Dashboard, config: &Config) -> anyhow::Result<()> {
    let report = dashboard.report(chrono::Local::now().date_naive()).await;
    if let Health::Fatal { failed_attempts } = &report.health {
        bail!(
            "Sales and purchases are both unavailable ({} failed attempts)",
            failed_attempts
        );
    }

    let money = |amount| format_money(amount, &config.currency);
    let totals = &report.totals;
    println!("Sales:          {} ({} invoices)", money(totals.sales_total), totals.sales_count);
    println!(
        "Purchases:      {} ({} deliveries)",
        money(totals.purchases_total),
        totals.purchases_count
    );
    println!("Balance:        {}", money(totals.balance));
    println!("Margin:         {}", format_pct(totals.margin_pct));
    println!("Average ticket: {}", money(totals.average_ticket));
    if let Some(trend) = &report.sales_trend {
        println!(
            "Sales trend:    {} vs {} {}",
            trend.latest,
            trend.previous,
            trend.variation_label()
        );
    }
    if !report.top_vendors.is_empty() {
        println!("Top vendors:");
        for entry in &report.top_vendors {
            println!("  {:<24} {}", entry.name, money(entry.total));
        }
    }
    Ok(())
}

/// Load the configuration, surfacing the error's suggestions
fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {}\n{}",
            path.display(),
            e.to_details()
        )
    })
}

fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::write(path, Config::generate_default())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Wrote default configuration to {}", path.display());
    Ok(())
}
