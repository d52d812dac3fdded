use campus_vote::commands::{self, Cli};
use clap::Parser;
use log::error;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
