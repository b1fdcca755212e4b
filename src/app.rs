//! Wires the DevTools adapter, the override controller and the console.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cdp::{
    discover_ws_url, CdpConnection, CdpEmulationSession, CdpSchemeProbe, CdpTransport,
    TabRegistry, TabWatcher,
};
use crate::config::Config;
use crate::console::{format_tabs, ConsoleCommand, HELP};
use crate::controller::OverrideController;
use crate::data::{AppStateStore, Database, KeyValueStore, MemoryKeyValueStore};
use crate::events::{BrowserEvent, EventDispatcher};
use crate::icon::TracingIconPresenter;
use crate::store::{KvOverrideStore, OverrideStore};
use crate::util::DataDir;

/// Open the durable key-value store of `data_dir`, or an in-memory one when
/// `ephemeral`
pub fn open_kv(data_dir: &DataDir, ephemeral: bool) -> Result<Arc<dyn KeyValueStore>> {
    if ephemeral {
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    }
    let db = Database::open_in(data_dir).context("Failed to open database")?;
    tracing::debug!(path = %db.path.display(), "Opened database");
    Ok(Arc::new(AppStateStore::new(db.connection())))
}

pub struct App {
    config: Config,
    kv: Arc<dyn KeyValueStore>,
}

impl App {
    pub fn new(config: Config, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { config, kv }
    }

    /// Connect to the browser and process events until the console quits
    pub async fn run(self) -> Result<()> {
        let ws_url = discover_ws_url(&self.config.endpoint)
            .await
            .with_context(|| format!("No DevTools endpoint at {}", self.config.endpoint))?;
        let connection = CdpConnection::connect(&ws_url, self.config.command_timeout).await?;
        tracing::info!(url = %ws_url, "Connected to browser");
        // Subscribe before discovery so no target event is missed
        let cdp_events = connection.subscribe();

        let transport: Arc<dyn CdpTransport> = connection;
        let registry = Arc::new(TabRegistry::load(self.kv.clone()).await?);
        let emulation = Arc::new(CdpEmulationSession::new(
            transport.clone(),
            registry.clone(),
        ));
        let store: Arc<dyn OverrideStore> = Arc::new(KvOverrideStore::new(self.kv.clone()));
        let controller = Arc::new(OverrideController::new(
            store.clone(),
            Arc::new(CdpSchemeProbe::new(transport.clone(), registry.clone())),
            emulation.clone(),
            Arc::new(TracingIconPresenter::new(self.config.icons.clone())),
        ));
        let dispatcher =
            EventDispatcher::new(controller).with_serialization(self.config.serialize_per_tab);

        let (events_tx, events_rx) = mpsc::channel(64);
        let watcher = Arc::new(TabWatcher::new(
            transport,
            registry,
            emulation,
            events_tx.clone(),
        ));
        let cancel = CancellationToken::new();

        let watcher_task = {
            let watcher = watcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { watcher.run(cdp_events, cancel).await })
        };
        let dispatch_task = {
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.run(events_rx, cancel).await })
        };

        let overrides = store.all().await?;
        watcher
            .start(&overrides)
            .await
            .context("Failed to discover tabs")?;
        println!("{}", HELP);

        let console_result = run_console(&watcher, store.as_ref(), &events_tx).await;

        cancel.cancel();
        drop(events_tx);
        let _ = watcher_task.await;
        let _ = dispatch_task.await;
        console_result
    }
}

async fn run_console(
    watcher: &TabWatcher,
    store: &dyn OverrideStore,
    events: &mpsc::Sender<BrowserEvent>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match ConsoleCommand::parse(&line) {
            Ok(Some(ConsoleCommand::Toggle(tab))) => {
                if events.send(BrowserEvent::ActionClicked(tab)).await.is_err() {
                    break;
                }
            }
            Ok(Some(ConsoleCommand::Tabs)) => {
                let overrides = store.all().await?;
                println!("{}", format_tabs(&watcher.tabs(), &overrides));
            }
            Ok(Some(ConsoleCommand::Help)) => println!("{}", HELP),
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(None) => {}
            Err(message) => println!("{}. {}", message, HELP),
        }
    }
    Ok(())
}
