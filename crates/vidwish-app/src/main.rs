use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::{error, info};
use vidwish_app::config::AppConfig;
use vidwish_app::{AppError, BoothSession, WebmProbe, app_version, load_gallery};
use vidwish_capture::{CaptureController, SyntheticMediaDevices, synthetic_chunk};
use vidwish_core::MediaBlob;
use vidwish_ui::{Notice, Route};
use vidwish_upload::local::LocalDirectoryBackend;
use vidwish_upload::{UploadReceipt, Uploader};

const SYNTHETIC_CHUNK_BYTES: usize = 4_096;

#[derive(Parser)]
#[command(name = "vidwish")]
#[command(version = app_version())]
#[command(about = "Record or upload a short video message and browse the gallery")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, env = "VIDWISH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload an existing video file.
    Submit {
        /// Display name stored with the video.
        #[arg(long)]
        name: String,
        /// WebM file to upload.
        #[arg(long)]
        file: PathBuf,
    },
    /// Run a synthetic camera session and upload the result.
    Record {
        /// Display name stored with the video.
        #[arg(long)]
        name: String,
        /// Seconds to record before pressing stop; the limit still applies.
        #[arg(long, default_value_t = 33)]
        seconds: u32,
    },
    /// List stored videos.
    Gallery,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("vidwish failed: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        "vidwish v{} data_dir={}",
        app_version(),
        config.storage.data_dir.display()
    );
    let backend = Arc::new(LocalDirectoryBackend::new(&config.storage.data_dir)?);

    match cli.command {
        Command::Submit { name, file } => {
            let mut session = booth_session(&config, backend)?;
            let blob = read_media(&file, &config.recording.mime_type)?;
            session.set_name(&name);
            let result = session
                .choose_file(blob)
                .and_then(|_| session.upload());
            report(&mut session, result)
        }
        Command::Record { name, seconds } => {
            let mut session = booth_session(&config, backend)?;
            session.set_name(&name);
            session.start_capture(0)?;
            for second in 0..u64::from(seconds) {
                session.on_chunk(synthetic_chunk(second, SYNTHETIC_CHUNK_BYTES));
                if session.on_tick((second + 1) * 1_000)?.is_some() {
                    break;
                }
            }
            session.stop_capture(u64::from(seconds) * 1_000)?;
            let result = session.upload();
            report(&mut session, result)
        }
        Command::Gallery => {
            let gallery = load_gallery(&*backend, &config)?;
            for player in gallery.players() {
                println!("{}\t{}", player.video().name, player.video().url);
            }
            info!("gallery listed {} video(s)", gallery.players().len());
            Ok(())
        }
    }
}

fn booth_session(
    config: &AppConfig,
    backend: Arc<LocalDirectoryBackend>,
) -> Result<BoothSession, AppError> {
    let capture = CaptureController::new(
        Arc::new(SyntheticMediaDevices::new()),
        config.capture_config()?,
    );
    let uploader = Uploader::new(backend.clone(), backend, config.upload_target());
    Ok(BoothSession::new(
        capture,
        uploader,
        Arc::new(WebmProbe),
        config.duration_band()?,
    )
    .with_routes(config.route_table()))
}

fn read_media(path: &Path, mime_type: &str) -> Result<MediaBlob, AppError> {
    let bytes = std::fs::read(path)?;
    Ok(MediaBlob::new(mime_type, bytes)?)
}

fn report(
    session: &mut BoothSession,
    result: Result<UploadReceipt, AppError>,
) -> Result<(), AppError> {
    while let Some(notice) = session.next_alert() {
        match notice {
            Notice::UploadSucceeded => println!("{}", notice.message()),
            _ => eprintln!("{}", notice.message()),
        }
    }
    let receipt = result?;
    println!("{}", receipt.url);
    info!(
        "booth page={} gallery={}",
        session.routes().path_of(session.ui().route),
        session.routes().path_of(Route::Gallery)
    );
    Ok(())
}
