use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lounas_core::catalog::RestaurantEntry;
use lounas_core::dates::local_today;
use lounas_core::format::{date_and_time_line, menu_heading, split_component_suffix};
use lounas_core::{load_app_config, load_catalog, AppConfig};
use lounas_engine::{CacheStore, Engine, EngineCommand};
use lounas_providers::{normalize, parse, MenuClient, TimeoutClass};

#[derive(Debug, Parser)]
#[command(name = "lounas")]
#[command(about = "Lunch-menu ingestion and freshness engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the engine until interrupted, logging state transitions.
    Run,
    /// Fetch and print today's menu for one restaurant, then exit.
    Today {
        /// Restaurant code; defaults to the configured active restaurant.
        #[arg(long)]
        code: Option<String>,
        /// Print section headings without prices.
        #[arg(long)]
        hide_prices: bool,
        /// Print component lines without their allergen suffix.
        #[arg(long)]
        hide_allergens: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = load_catalog(&config.catalog_path)?;

    match Cli::parse().command {
        Commands::Run => run_engine(config, catalog).await,
        Commands::Today {
            code,
            hide_prices,
            hide_allergens,
        } => print_today(&config, &catalog, code.as_deref(), hide_prices, hide_allergens).await,
    }
}

async fn run_engine(config: AppConfig, catalog: Vec<RestaurantEntry>) -> anyhow::Result<()> {
    let client = MenuClient::new(
        &config.feed_base_url,
        &config.scrape_base_url,
        config.background_timeout_secs,
        config.manual_timeout_secs,
    )?;
    let cache = CacheStore::load(&config.cache_path);
    let (engine, mut snapshots) = Engine::new(catalog, &config, client, cache);

    let (commands, command_rx) = tokio::sync::mpsc::channel(8);
    let engine_task = tokio::spawn(engine.run(command_rx));

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                tracing::info!(
                    code = snapshot.code,
                    status = %snapshot.status,
                    fresh = snapshot.is_today_fresh,
                    version = snapshot.model_version,
                    "state changed"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                let _ = commands.send(EngineCommand::Shutdown).await;
                break;
            }
        }
    }

    engine_task.await?;
    Ok(())
}

async fn print_today(
    config: &AppConfig,
    catalog: &[RestaurantEntry],
    code: Option<&str>,
    hide_prices: bool,
    hide_allergens: bool,
) -> anyhow::Result<()> {
    let wanted = code
        .or(config.active_code.as_deref())
        .map(str::to_owned)
        .or_else(|| catalog.first().map(|e| e.code.clone()))
        .ok_or_else(|| anyhow::anyhow!("catalog is empty"))?;
    let entry = catalog
        .iter()
        .find(|e| e.code == wanted)
        .ok_or_else(|| anyhow::anyhow!("unknown restaurant code '{wanted}'"))?;

    let client = MenuClient::new(
        &config.feed_base_url,
        &config.scrape_base_url,
        config.background_timeout_secs,
        config.manual_timeout_secs,
    )?;
    let reference = local_today();
    let raw = client
        .fetch(entry, &config.language, reference, TimeoutClass::Manual)
        .await?;
    let payload = parse(entry, &raw, reference)?;

    let name = if payload.restaurant_name.is_empty() {
        &entry.name
    } else {
        &payload.restaurant_name
    };
    println!("{name}");

    let Some(menu) = normalize(&payload) else {
        println!("No lunch menu available for today.");
        return Ok(());
    };

    let header = date_and_time_line(Some(&menu), &config.language);
    if !header.is_empty() {
        println!("{header}");
    }
    if menu.menus.is_empty() {
        println!("No lunch menu available for today.");
        return Ok(());
    }

    for section in &menu.menus {
        println!("{}", menu_heading(section, !hide_prices));
        for component in &section.components {
            let (main, suffix) = split_component_suffix(component);
            if hide_allergens || suffix.is_empty() {
                println!("  - {main}");
            } else {
                println!("  - {main} {suffix}");
            }
        }
    }
    Ok(())
}
