use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use photonest::capabilities::model_server::ModelServer;
use photonest::capabilities::providers::{
    ConfiguredTimezone, HttpReverseGeocoder, HttpWeatherProvider,
};
use photonest::capabilities::Capabilities;
use photonest::config::Config;
use photonest::db::Database;
use photonest::probe::ExifProbe;
use photonest::{logging, process};

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photonest {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    println!(
        r#"photonest - personal photo/video library indexer

Scans the media directory, extracts and enriches metadata, analyzes
sampled frames through the configured model sidecar, and reclusters
face identities.

USAGE:
    photonest [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PHOTONEST_LOG       Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photonest/config.toml"#
    );
}

fn build_capabilities(config: &Config) -> Capabilities {
    let models = ModelServer::new(&config.providers.model_server_endpoint);
    Capabilities {
        embedder: Box::new(models.clone()),
        face_detector: Box::new(models.clone()),
        object_detector: Box::new(models.clone()),
        ocr: Box::new(models.clone()),
        classifier: Box::new(models.clone()),
        captioner: Box::new(models.clone()),
        visual_llm: Box::new(models),
        geocoder: Box::new(HttpReverseGeocoder::new(&config.providers.geocoder_endpoint)),
        weather: Box::new(HttpWeatherProvider::new(&config.providers.weather_endpoint)),
        timezone: Box::new(ConfiguredTimezone::new(config.providers.home_timezone.clone())),
    }
}

fn main() -> Result<()> {
    let config_path = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let mut db = Database::open(&config.db_path)?;
    let capabilities = build_capabilities(&config);
    let probe = ExifProbe;

    info!(media_dir = %config.media_dir.display(), "Starting library scan");
    let report = process::process_library(&config, &capabilities, &probe, &mut db)?;

    println!(
        "Processed {} of {} files ({} unchanged, {} failed, {} removed)",
        report.processed, report.discovered, report.skipped, report.failed, report.removed
    );
    println!(
        "Timezone backfill: {} filled of {} candidates",
        report.backfill.filled, report.backfill.candidates
    );
    println!(
        "Faces: {} in {} identities ({} noise, {} labels kept)",
        report.clustering.faces,
        report.clustering.clusters,
        report.clustering.noise,
        report.clustering.labels_carried
    );

    Ok(())
}
