mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use miru_browser::{decode_data_url, SimulatedBrowser};
use miru_config::{config_dir, config_file_path, MiruConfig};
use miru_core::{Acknowledgement, MiruBus};
use miru_logging::{init_logger, redact_image_payloads};
use miru_popup::{Requester, View};
use miru_worker::Capturer;

/// How long the popup waits for an outcome before giving up.
const OUTCOME_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "miru")]
#[command(about = "Capture the active tab and hand it back to the popup")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $MIRU_CONFIG_DIR/config.yaml or ~/.miru/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one capture round trip against a simulated browser
    Capture {
        /// Host behaviour to simulate
        #[arg(long, value_enum, default_value_t = Scenario::Ok)]
        scenario: Scenario,
        /// Design frame reference (fileKey/node-id) for --compare
        #[arg(long)]
        frame: Option<String>,
        /// Press Compare after the capture
        #[arg(long)]
        compare: bool,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config
    Show,
    /// Validate the config file and list problems
    Validate,
    /// Write a config file with default values if none exists
    Init,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Active tab found, capture succeeds
    Ok,
    /// No window focused
    NoTab,
    /// The tab query itself fails
    QueryError,
    /// The capture call fails
    CaptureError,
    /// The capture call succeeds without data
    Empty,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command {
        Commands::Capture {
            scenario,
            frame,
            compare,
        } => {
            // The logger depends on the config, so the report is checked
            // once it is installed.
            let (config, report) = miru_config::load_with_report(&path).await?;
            let log_dir = config
                .logging
                .as_ref()
                .and_then(|l| l.dir.as_ref())
                .map(PathBuf::from);
            init_logger(log_dir.as_deref(), &settings::log_level(&config));
            miru_config::check_report(&report, &path)?;
            run_capture(&config, scenario, frame, compare).await?;
        }
        Commands::Config { action } => {
            init_logger(None, "warn");
            run_config(action, &path).await?;
        }
    }

    Ok(())
}

fn simulated_browser(scenario: Scenario) -> SimulatedBrowser {
    let browser = SimulatedBrowser::with_active_tab(1, 1, "https://example.com/");
    match scenario {
        Scenario::Ok => {}
        Scenario::NoTab => browser.blur_all(),
        Scenario::QueryError => browser.fail_tab_query("Tabs cannot be queried right now"),
        Scenario::CaptureError => {
            browser.fail_capture("Cannot access contents of the page")
        }
        Scenario::Empty => browser.return_empty_capture(),
    }
    browser
}

async fn run_capture(
    config: &MiruConfig,
    scenario: Scenario,
    frame: Option<String>,
    compare: bool,
) -> Result<()> {
    info!(?scenario, "Starting capture round trip");

    let bus = MiruBus::with_buffer_size(settings::bus_buffer(config));
    let browser = Arc::new(simulated_browser(scenario));
    let worker = Capturer::new(browser, bus.clone(), settings::capturer_settings(config)).spawn();

    let mut popup = Requester::mount(bus.clone(), settings::requester_settings(config));
    if let Some(frame) = frame {
        popup.set_frame_identifier(frame);
    }

    let (request_id, pending) = popup.submit_with_reply();
    let failure = {
        let view = tokio::time::timeout(OUTCOME_TIMEOUT, popup.wait_for_outcome())
            .await
            .context("No outcome received before the timeout")?
            .context("Bus closed before an outcome arrived")?;
        match view {
            View::Image(data_url) => {
                let (mime, bytes) = decode_data_url(data_url)?;
                println!("request {request_id}: captured {mime}, {} bytes", bytes.len());
                println!("  {}", redact_image_payloads(data_url));
                None
            }
            View::Error(message) => {
                println!("request {request_id}: error: {message}");
                Some(message.to_string())
            }
            View::Idle => None,
        }
    };

    match pending.recv_as::<Acknowledgement>().await {
        Ok(ack) => println!("acknowledgement: {}", serde_json::to_string(&ack)?),
        Err(e) => println!("acknowledgement: none ({e})"),
    }

    if compare {
        match popup.compare().await {
            Ok(report) => println!(
                "compare {}: {:.2}% mismatch, {}",
                report.frame,
                report.mismatch_ratio * 100.0,
                report.summary
            ),
            Err(e) => println!("compare: {e}"),
        }
    }

    popup.unmount();
    bus.close();
    worker.await.context("Capturer task panicked")??;

    if let Some(message) = failure {
        bail!("capture failed: {message}");
    }
    Ok(())
}

async fn run_config(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = miru_config::load_and_prepare(path).await?;
            print!("{}", serde_yaml::to_string(&config)?);
        }
        ConfigAction::Validate => {
            let (_, report) = miru_config::load_with_report(path).await?;
            for warning in &report.warnings {
                println!("warning: {}: {}", warning.path, warning.message);
            }
            for error in &report.errors {
                println!("error: {}: {}", error.path, error.message);
            }
            if !report.is_valid() {
                bail!("{} is invalid", path.display());
            }
            println!("{} is valid", path.display());
        }
        ConfigAction::Init => {
            if path.exists() {
                println!("{} already exists", path.display());
                return Ok(());
            }
            let config = miru_config::apply_all_defaults(MiruConfig::default());
            miru_config::write_config(&config, path).await?;
            println!("wrote {}", path.display());
        }
    }
    Ok(())
}
