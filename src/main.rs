use anyhow::Result;
use clap::{Parser, Subcommand};
use schemeflip::console::format_overrides;
use schemeflip::store::{KvOverrideStore, OverrideStore};
use schemeflip::util::DataDir;
use schemeflip::{app, App, Config, TabId};
use std::fs::OpenOptions;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schemeflip", version, about = "Force browser tabs into the opposite color scheme")]
struct Cli {
    /// Data directory (defaults to ~/.schemeflip)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the browser and toggle tabs from the console
    Run {
        /// DevTools endpoint, overriding the config file
        #[arg(long)]
        endpoint: Option<String>,
        /// Keep overrides in memory only
        #[arg(long)]
        ephemeral: bool,
    },
    /// Print persisted overrides
    Status,
    /// Drop the override of one tab, or of all tabs
    Clear {
        tab: Option<TabId>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let data_dir = DataDir::resolve(cli.data_dir);
    data_dir.create()?;

    // Initialize logging to file (<data dir>/logs/schemeflip.log)
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.log_file())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load(&data_dir);

    match cli.command {
        Command::Run {
            endpoint,
            ephemeral,
        } => {
            let config = match endpoint {
                Some(endpoint) => config.with_endpoint(endpoint),
                None => config,
            };
            let kv = app::open_kv(&data_dir, ephemeral)?;
            App::new(config, kv).run().await
        }
        Command::Status => {
            let store = KvOverrideStore::new(app::open_kv(&data_dir, false)?);
            println!("{}", format_overrides(&store.all().await?));
            Ok(())
        }
        Command::Clear { tab: Some(tab) } => {
            let store = KvOverrideStore::new(app::open_kv(&data_dir, false)?);
            if store.clear(tab).await? {
                println!("Cleared override of tab {}", tab);
            } else {
                println!("Tab {} has no override", tab);
            }
            Ok(())
        }
        Command::Clear { tab: None } => {
            let store = KvOverrideStore::new(app::open_kv(&data_dir, false)?);
            store.clear_all().await?;
            println!("Cleared all overrides");
            Ok(())
        }
    }
}
