//! Application state and the console host loop

use std::sync::Arc;

use tokio::io::{self, AsyncBufReadExt, BufReader};

use wagerbot::config::Config;
use wagerbot::persistence::PersistenceManager;
use wagerbot::{
    Action, ConsoleTransport, Directory, FilePointsLedger, FileSessionStore, GameContext,
    GameOrchestrator, Result, StaticDirectory, Transport,
};

/// Main WagerBot application
pub struct WagerBotApp {
    pub config: Config,
    pub persistence: PersistenceManager,
    pub store: Arc<FileSessionStore>,
    pub ledger: Arc<FilePointsLedger>,
    pub orchestrator: Arc<GameOrchestrator>,
}

impl WagerBotApp {
    /// Open the stores and wire the orchestrator to the console transport
    pub async fn new(config: Config) -> Result<Self> {
        let persistence = PersistenceManager::new(config.data_dir()).await?;
        let store = Arc::new(
            FileSessionStore::open(persistence.file(&config.bot.sessions_file)).await?,
        );

        let transport: Arc<dyn Transport> = Arc::new(ConsoleTransport::stdout());
        let directory: Arc<dyn Directory> = Arc::new(StaticDirectory::new(&config.moderation));
        let ledger = Arc::new(
            FilePointsLedger::open(
                persistence.file(&config.bot.points_file),
                config.moderation.clone(),
                transport.clone(),
                directory.clone(),
            )
            .await?,
        );

        let ctx = Arc::new(GameContext::new(
            store.clone(),
            ledger.clone(),
            transport,
            directory,
            config.game.clone(),
        ));
        let orchestrator = Arc::new(GameOrchestrator::new(ctx));

        log::info!("WagerBot ready, data in {}", persistence.data_dir().display());
        Ok(Self {
            config,
            persistence,
            store,
            ledger,
            orchestrator,
        })
    }

    /// Handle actions from stdin, one JSON object per line, until EOF
    pub async fn run(&self) -> Result<()> {
        self.orchestrator.start();

        let mut lines = BufReader::new(io::stdin()).lines();
        let mut handled = 0u64;
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let action: Action = match serde_json::from_str(line) {
                Ok(action) => action,
                Err(e) => {
                    log::warn!("Skipping malformed action: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.orchestrator.handle(action).await {
                log::error!("Action failed: {}", e);
            }
            handled += 1;
        }

        self.orchestrator.stop().await;
        let stats = self.orchestrator.payout().get_stats().await;
        log::info!(
            "Input closed after {} actions ({} settlements, {} refusals)",
            handled,
            stats.total_settlements,
            stats.total_refusals
        );
        Ok(())
    }
}
