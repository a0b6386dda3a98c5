use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use wrist_touch::camera::SyntheticCamera;
use wrist_touch::config::{Config, ModelKind};
use wrist_touch::detection::LoopOutcome;
use wrist_touch::logging;
use wrist_touch::pose::ReplayLoader;
use wrist_touch::render::PixelBuffer;
use wrist_touch::session::{self, DisplayInfo};

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Parser)]
#[command(name = "wrist_touch", about = "Touch an on-screen target with your right wrist")]
struct Args {
    /// Config file (TOML); defaults are used when it is missing
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// Play back recorded poses instead of running a model
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Stop after this many evaluated frames
    #[arg(long)]
    frames: Option<u64>,

    /// Treat the display as a mobile device
    #[arg(long)]
    mobile: bool,

    /// Display size as WIDTHxHEIGHT
    #[arg(long, value_parser = parse_display, default_value = "1920x1080")]
    display: (u32, u32),
}

fn parse_display(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w = w.trim().parse::<u32>().map_err(|e| e.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|e| e.to_string())?;
    Ok((w, h))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (mut config, load_error) = Config::load_or_default(&args.config);
    if let Some(path) = &args.replay {
        config.model.kind = ModelKind::Replay;
        config.model.path = path.display().to_string();
    }

    let log_path = logging::init(logging::parse_level(&config.logging.level), config.logging.file)?;
    log::info!("wrist_touch ({})", env!("WRIST_TOUCH_VERSION"));
    if let Some(e) = load_error {
        log::warn!("{e:#}; using defaults");
    }
    if let Some(path) = log_path {
        log::info!("log file: {}", path.display());
    }

    let display = DisplayInfo {
        width: args.display.0,
        height: args.display.1,
        mobile: args.mobile,
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("interrupted, stopping");
                cancel.cancel();
            }
        });
    }

    let outcome = match config.model.kind {
        ModelKind::Replay => run_replay(&config, display, args.frames, cancel).await?,
        ModelKind::MoveNet => run_movenet(&config, display, args.frames, cancel).await?,
    };

    let stats = &outcome.stats;
    log::info!(
        "stopped ({:?}): final status {:?}, {} frames, {} skipped, {} touches",
        outcome.reason,
        outcome.state.status(),
        stats.frames_evaluated,
        stats.frames_skipped,
        stats.touches
    );
    log::logger().flush();
    Ok(())
}

/// Headless run: synthetic frames, recorded poses, off-screen overlay.
async fn run_replay(
    config: &Config,
    display: DisplayInfo,
    frames: Option<u64>,
    cancel: CancellationToken,
) -> Result<LoopOutcome> {
    let camera = SyntheticCamera { paced: true };
    let session = session::initialize(&camera, &ReplayLoader, config, display)
        .await
        .context("session startup failed")?;

    let overlay = PixelBuffer::new(
        session.layout.video_width as usize,
        session.layout.video_height as usize,
    );
    let mut detection = session.into_loop(overlay, config);
    if let Some(limit) = frames {
        detection = detection.with_frame_limit(limit);
    }

    let handle = detection.spawn();
    let mut status = handle.subscribe();
    let reporter = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            println!("target: {current:?}");
        }
    });

    let stop = handle.cancel_token();
    let watcher = tokio::spawn(async move {
        cancel.cancelled().await;
        stop.cancel();
    });

    let outcome = handle.join().await.context("detection task failed")?;
    watcher.abort();
    let _ = reporter.await;
    Ok(outcome)
}

#[cfg(feature = "desktop")]
async fn run_movenet(
    config: &Config,
    display: DisplayInfo,
    frames: Option<u64>,
    cancel: CancellationToken,
) -> Result<LoopOutcome> {
    use wrist_touch::camera::OpenCvCamera;
    use wrist_touch::pose::MoveNetLoader;
    use wrist_touch::render::MinifbOverlay;

    let session = session::initialize(&OpenCvCamera, &MoveNetLoader, config, display)
        .await
        .context("session startup failed")?;
    let (width, height) = session.video.resolution();
    let overlay = MinifbOverlay::new("wrist_touch", width as usize, height as usize)?;

    // The preview window stays on this task; the loop is awaited, not spawned.
    let mut detection = session.into_loop(overlay, config);
    if let Some(limit) = frames {
        detection = detection.with_frame_limit(limit);
    }
    Ok(detection.run(cancel).await)
}

#[cfg(not(feature = "desktop"))]
async fn run_movenet(
    _config: &Config,
    _display: DisplayInfo,
    _frames: Option<u64>,
    _cancel: CancellationToken,
) -> Result<LoopOutcome> {
    anyhow::bail!("the movenet model needs a build with `--features desktop`")
}
