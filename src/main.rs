use clap::Parser;

use wagerbot::{logging, Result};

mod app_config;
mod app_state;
mod commands;

use app_config::{Cli, Commands};
use app_state::WagerBotApp;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    logging::init(&config.bot.log_level, cli.verbose)?;
    log::debug!("Running command {}", cli.command.name());

    let app = WagerBotApp::new(config).await?;
    match cli.command {
        Commands::Run => app.run().await?,
        Commands::Sessions => commands::list_sessions(&app).await?,
        Commands::CleanGames => commands::clean_games(&app).await?,
        Commands::Balance { room, participant } => {
            commands::show_balance(&app, room, participant).await?
        }
    }

    Ok(())
}
