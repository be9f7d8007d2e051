use clap::{Arg, Command};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use birdsong::config::Config;
use birdsong::generator::{ClaudeGenerator, MockGenerator};
use birdsong::http_client::ReqwestHttpClient;
use birdsong::pipeline::Pipeline;
use birdsong::publisher::{MockPublisher, TwitterPublisher};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let matches = Command::new("chirp")
        .about("Compose a short status update with AI and post it after your approval")
        .long_about(
            "chirp asks for a prompt, generates a candidate post with the Anthropic API, \
             and publishes it to Twitter/X once you confirm",
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Show configuration information")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("config") {
        return match Config::show_config_info() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                ExitCode::from(1)
            }
        };
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("Run 'chirp --config' to see what is set.");
            return ExitCode::from(1);
        }
    };

    let pipeline = match config.credentials() {
        // Mock mode: the full flow with no network and no credentials.
        None => Pipeline::new(Box::new(MockGenerator::new()), Box::new(MockPublisher::new())),
        Some(creds) => {
            let http = Arc::new(ReqwestHttpClient::new());
            Pipeline::new(
                Box::new(ClaudeGenerator::new(
                    http.clone(),
                    creds.anthropic_api_key.clone(),
                )),
                Box::new(TwitterPublisher::new(http, creds.twitter.clone())),
            )
        }
    };

    info!("Starting run");
    match pipeline.run().await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("I/O error: {e}");
            ExitCode::FAILURE
        }
    }
}
