use clap::Parser;
use tracing::{debug, info, warn};

use studio::config::Config;

mod log;
mod utils;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg: Config = utils::load("onair".to_string(), args.config);

    log::set(&cfg.log.level);
    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    cfg.validate()?;

    let listener = tokio::net::TcpListener::bind(cfg.http.listen).await?;
    studio::serve(cfg, listener, utils::shutdown_signal()).await?;
    info!("Server shutdown");
    Ok(())
}
