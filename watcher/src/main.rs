mod camera;
mod keys;
mod snapshot;

use camera::{Camera, CommandCamera, HttpCamera};
use chrono::{Local, Utc};
use motion_snap_common::config::{CameraSource, Config, DetectorSettings, Resolution};
use motion_snap_common::frame::CapturedFrame;
use motion_snap_detector::{DetectorConfig, MotionComparator, Region, Verdict};
use snapshot::SnapshotSink;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("motion-snap.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let test_res = config.camera.test_resolution();
    info!(
        source = ?config.camera.source,
        resolution = %test_res,
        threshold = config.detector.threshold,
        sensitivity = config.detector.sensitivity,
        regions = config.detector.regions.len(),
        diagnostics = config.detector.diagnostics,
        poll_interval_secs = config.camera.poll_interval_secs,
        "starting motion-snap"
    );
    if overlay_discarded(&config) {
        warn!("detector.diagnostics is on but debug.overlay_path is not set, overlays will be discarded");
    }

    let comparator = match MotionComparator::new(detector_config(&config.detector, test_res)) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid detector configuration");
            std::process::exit(1);
        }
    };
    info!(scanned_pixels = comparator.scanned_pixels(), "motion comparator ready");

    let sink = SnapshotSink::from_config(&config.snapshot);
    match &sink {
        Some(sink) => info!(
            resolution = %sink.resolution(),
            local_dir = ?config.snapshot.local_dir,
            remote_dir = ?config.snapshot.remote_dir,
            "motion snapshots enabled"
        ),
        None => info!("snapshot.full_width/full_height not set, motion snapshots disabled"),
    }

    match config.camera.source {
        CameraSource::Command => {
            let camera = CommandCamera::new(config.camera.program.clone(), config.camera.args.clone());
            run_watch_loop(camera, comparator, sink, &config).await;
        }
        CameraSource::Http => {
            let Some(url) = config.camera.url.clone() else {
                error!("camera.url is required for the http source");
                std::process::exit(1);
            };
            let camera = match HttpCamera::new(url) {
                Ok(c) => c,
                Err(e) => {
                    error!(error = %e, "failed to create HTTP camera client");
                    std::process::exit(1);
                }
            };
            run_watch_loop(camera, comparator, sink, &config).await;
        }
    }
}

fn detector_config(settings: &DetectorSettings, res: Resolution) -> DetectorConfig {
    DetectorConfig::new(res.width, res.height, settings.threshold, settings.sensitivity)
        .with_regions(settings.regions.iter().copied().map(Region::from).collect())
        .with_diagnostics(settings.diagnostics)
}

/// Poll the camera forever: capture, compare, then save the overlay and a
/// snapshot as configured. Per-frame failures are logged and skipped.
async fn run_watch_loop<C: Camera>(
    camera: C,
    mut comparator: MotionComparator,
    sink: Option<SnapshotSink>,
    config: &Config,
) {
    let test_res = config.camera.test_resolution();
    let mut ticker = tokio::time::interval(Duration::from_secs(config.camera.poll_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut seq: u64 = 0;

    info!("entering watch loop");
    loop {
        ticker.tick().await;

        let data = match camera.capture(test_res).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "failed to capture test frame");
                continue;
            }
        };

        let frame = match CapturedFrame::decode(&data, Utc::now().timestamp_millis(), seq) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "failed to decode test frame, skipping");
                continue;
            }
        };
        seq += 1;

        let verdict = match comparator.compare(frame.image) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, seq = frame.seq, "frame rejected by comparator");
                continue;
            }
        };

        report(&verdict, frame.seq, frame.captured_at_ms);

        if let (Some(overlay), Some(path)) = (&verdict.debug_overlay, &config.debug.overlay_path) {
            save_overlay(overlay, path);
        }

        if !verdict.changed {
            continue;
        }
        let Some(sink) = &sink else {
            continue;
        };
        match sink.trigger(&camera, Local::now().naive_local()).await {
            Ok(Some(path)) => info!(path = %path.display(), "snapshot saved"),
            Ok(None) => warn!("no writable snapshot directory, snapshot skipped"),
            // Not retried: the next motion event gets a fresh attempt.
            Err(e) => error!(error = %e, "snapshot failed"),
        }
    }
}

fn report(verdict: &Verdict, seq: u64, captured_at_ms: i64) {
    if verdict.changed {
        info!(seq, captured_at_ms, changed_pixels = verdict.changed_pixels, "motion detected");
    } else {
        debug!(seq, captured_at_ms, changed_pixels = verdict.changed_pixels, "no motion");
    }
}

/// Diagnostics paint an overlay for every frame; without a path it is thrown
/// away.
fn overlay_discarded(config: &Config) -> bool {
    config.detector.diagnostics && config.debug.overlay_path.is_none()
}

fn save_overlay(overlay: &image::RgbImage, path: &Path) {
    match overlay.save(path) {
        Ok(()) => debug!(path = %path.display(), "debug overlay saved"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to save debug overlay"),
    }
}
