//! ball_track - track a ball through a video file or live camera feed.
//!
//! This tool:
//! 1. Loads configuration (file named by --config / BALL_TRACKER_CONFIG, env, flags)
//! 2. Opens the frame source and detector backend
//! 3. Runs the tracking pipeline until the source ends, the frame limit is hit, or the user
//!    quits (Ctrl-C, or `q` on stdin; `p` pauses/resumes, `r` resets tracking)
//! 4. Prints the session summary and writes `<stem>_ball_data.json`

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;

use ball_tracker::config::{SourceMode, TrackerConfig};
use ball_tracker::output::{FanoutSink, FrameDirWriter, ObservationLog, ThreadedSink};
use ball_tracker::pipeline::{command_channel, Controller, Pipeline, SessionReport};
use ball_tracker::report::{report_stem, TrackingReport};

#[path = "../ui.rs"]
mod ui;

/// Frames the frame writer may fall behind before the pipeline waits for it.
const WRITER_BACKLOG: usize = 8;

#[derive(Parser, Debug)]
#[command(
    name = "ball_track",
    about = "Track a ball through video frames and export its trajectory"
)]
struct Args {
    /// Config file (TOML if it ends in .toml, JSON otherwise)
    #[arg(long, env = "BALL_TRACKER_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Video file, camera device, or stub://name
    #[arg(long, value_name = "URI")]
    source: Option<String>,

    /// Treat the source as a live camera (wall-clock timing)
    #[arg(long)]
    camera: bool,

    /// Video: override container frame rate. Camera: requested frame rate.
    #[arg(long)]
    fps: Option<f64>,

    /// Run detection on every Nth frame
    #[arg(long, value_name = "N")]
    skip: Option<u64>,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,

    /// Minimum detection confidence (0-1)
    #[arg(long, value_name = "CONF")]
    min_confidence: Option<f32>,

    /// Detector backend (color, tract)
    #[arg(long)]
    backend: Option<String>,

    /// Model file for model-based backends
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Output directory for the report and frames
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Write annotated frames as images
    #[arg(long)]
    save_frames: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = TrackerConfig::load_from(args.config.as_deref())?;
        apply_args(&mut cfg, &args);
        cfg.validate()?;
        cfg
    };

    let mut source = {
        let _stage = ui.stage("Open source");
        cfg.open_source()?
    };
    let detector = {
        let _stage = ui.stage("Load detector");
        cfg.build_detector()?
    };
    let detector_name = detector.name();
    let nominal_fps = source.nominal_fps();
    let mut pipeline = Pipeline::new(cfg.pipeline_config(nominal_fps), detector)?;

    let (controller, commands) = command_channel();
    {
        let controller = controller.clone();
        ctrlc::set_handler(move || controller.stop()).context("failed to install Ctrl-C handler")?;
    }
    spawn_keyboard_controls(controller);

    let stem = report_stem(&cfg.source.uri);
    let total = match (source.frame_count(), cfg.tracking.max_frames) {
        (Some(count), Some(limit)) => Some(count.min(limit)),
        (count, limit) => count.or(limit),
    };

    println!("ball_track: {} ({} mode)", cfg.source.uri, cfg.source.mode);
    println!("  detector: {}", detector_name);
    println!("  controls: p = pause/resume, r = reset, q = quit");

    let mut progress = ui.progress(total);
    let mut observations = ObservationLog::new();
    let mut frame_writer = if cfg.output.save_frames {
        let dir = cfg.output.dir.join(format!("{}_frames", stem));
        let writer = FrameDirWriter::new(dir, cfg.output.frame_format)?.with_total_frames(total);
        Some(ThreadedSink::spawn(writer, WRITER_BACKLOG)?)
    } else {
        None
    };

    let report = {
        let mut sinks = FanoutSink::new().with(&mut progress).with(&mut observations);
        if let Some(writer) = frame_writer.as_mut() {
            sinks.push(writer);
        }
        pipeline.run(&mut source, &mut sinks, &commands)?
    };

    print_summary(&report);

    if cfg.output.write_report {
        let tracking = TrackingReport::new(
            &cfg.source.uri,
            detector_name,
            nominal_fps,
            &report,
            observations.into_observations(),
        );
        let path = tracking.write_to_dir(&cfg.output.dir, &stem)?;
        println!();
        println!("Ball tracking JSON saved: {}", path.display());
        println!("  Total detections: {}", tracking.metadata.total_detections);
    }
    Ok(())
}

fn apply_args(cfg: &mut TrackerConfig, args: &Args) {
    if args.camera {
        cfg.switch_mode(SourceMode::Camera);
    }
    if let Some(source) = &args.source {
        cfg.source.uri = source.clone();
    }
    if let Some(fps) = args.fps {
        cfg.source.fps = Some(fps);
    }
    if let Some(skip) = args.skip {
        cfg.tracking.frame_skip = skip;
    }
    if let Some(max_frames) = args.max_frames {
        cfg.tracking.max_frames = Some(max_frames);
    }
    if let Some(min_confidence) = args.min_confidence {
        cfg.tracking.min_confidence = min_confidence;
    }
    if let Some(backend) = &args.backend {
        cfg.detector.backend = backend.clone();
    }
    if let Some(model) = &args.model {
        cfg.detector.model_path = Some(model.clone());
    }
    if let Some(out) = &args.out {
        cfg.output.dir = out.clone();
    }
    if args.save_frames {
        cfg.output.save_frames = true;
    }
}

/// Map stdin lines to commands: `p` toggles pause, `r` resets, `q` quits.
fn spawn_keyboard_controls(controller: Controller) {
    let spawned = std::thread::Builder::new()
        .name("keyboard".to_string())
        .spawn(move || {
            let mut paused = false;
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match line.trim() {
                    "p" => {
                        if paused {
                            controller.resume();
                            eprintln!("RESUMED");
                        } else {
                            controller.pause();
                            eprintln!("PAUSED");
                        }
                        paused = !paused;
                    }
                    "r" => controller.reset(),
                    "q" => {
                        eprintln!("Quitting early...");
                        controller.stop();
                        break;
                    }
                    "" => {}
                    other => log::debug!("unknown key command {:?}", other),
                }
            }
        });
    if let Err(err) = spawned {
        log::warn!("keyboard controls unavailable: {}", err);
    }
}

fn print_summary(report: &SessionReport) {
    let summary = &report.summary;
    println!();
    println!("{}", "=".repeat(60));
    println!("Processing Complete!");
    println!("{}", "=".repeat(60));
    println!("Stop reason:       {:?}", report.stop_reason);
    println!("Total frames:      {}", summary.total_frames);
    println!("Processed frames:  {}", summary.processed_frames);
    println!("Detections:        {}", summary.detections);
    println!("Detection rate:    {:.1}%", summary.detection_rate);
    println!(
        "Processing time:   {:.2}s ({:.1} fps)",
        report.elapsed.as_secs_f64(),
        report.processing_fps
    );
    if let Some(conf) = &summary.confidence {
        println!(
            "Confidence:        mean {:.2}, min {:.2}, max {:.2}",
            conf.mean, conf.min, conf.max
        );
    }
    if let Some(speed) = &summary.speed {
        println!(
            "Speed (px/s):      mean {:.0}, min {:.0}, max {:.0}",
            speed.mean, speed.min, speed.max
        );
    }
}
