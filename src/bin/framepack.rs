use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use colored::Colorize;
use framepack::{
    ExtractOptions, FrameCodec, PackStrategy, ProgressCallback, ProgressInfo, StorageLayout,
    VideoSource, build_jobs, load_manifest, pack_all,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framepack pack --input-dir videos --manifest clips.json --out dataset --yes\n  framepack pack --input-dir videos --manifest clips.json --out dataset --layout dir --strategy split\n  framepack frame dataset/clip-001.zip 120 --out frame.jpg\n  framepack probe input.mp4 --json";

#[derive(Debug, Parser)]
#[command(
    name = "framepack",
    version,
    about = "Turn videos into frame-indexed, randomly accessible compressed datasets",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Skip the interactive confirmation before batch processing.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Worker count override (default: available CPU cores).
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pack every video in a manifest into per-video frame stores.
    #[command(
        about = "Pack manifest videos into frame stores",
        after_help = "Examples:\n  framepack pack --input-dir videos --manifest clips.json --out dataset --progress\n  framepack pack --input-dir videos --manifest clips.json --out dataset --resolution 160x120"
    )]
    Pack {
        /// Directory containing the source video files.
        #[arg(long)]
        input_dir: PathBuf,
        /// Clip manifest: JSON array of clip ids, or object mapping id to
        /// relative path.
        #[arg(long)]
        manifest: PathBuf,
        /// Output directory; one store per clip is created inside.
        #[arg(long)]
        out: PathBuf,
        /// Store representation: container | dir.
        #[arg(long, default_value = "container")]
        layout: String,
        /// Concurrency strategy: per-video | split.
        #[arg(long, default_value = "per-video")]
        strategy: String,
        /// Target frame resolution as WIDTHxHEIGHT.
        #[arg(long, default_value = "224x224")]
        resolution: String,
        /// JPEG quality (1-100).
        #[arg(long, default_value_t = 90)]
        quality: u8,
    },

    /// Read one frame back out of a store and save it as an image.
    #[command(
        about = "Extract a single stored frame to an image file",
        after_help = "Examples:\n  framepack frame dataset/clip-001.zip 120 --out frame.png"
    )]
    Frame {
        /// Path of the frame store (zip container or image directory).
        store: PathBuf,
        /// Frame index to read.
        index: u64,
        /// Output image path; format inferred from the extension.
        #[arg(long)]
        out: PathBuf,
    },

    /// Print stream properties of a video file.
    #[command(about = "Probe video properties", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_layout(value: &str) -> Option<StorageLayout> {
    match value.to_ascii_lowercase().as_str() {
        "container" | "zip" => Some(StorageLayout::Container),
        "dir" | "directory" | "images" => Some(StorageLayout::ImageDirectory),
        _ => None,
    }
}

fn parse_strategy(value: &str) -> Option<PackStrategy> {
    match value.to_ascii_lowercase().as_str() {
        "per-video" | "inter" | "pool" => Some(PackStrategy::InterVideo),
        "split" | "intra" | "chunked" => Some(PackStrategy::IntraVideo),
        _ => None,
    }
}

fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.split_once(['x', 'X'])?;
    Some((width.trim().parse().ok()?, height.trim().parse().ok()?))
}

/// Guess a store's layout from its path: zip files are containers,
/// everything else is an image directory.
fn infer_layout(store: &Path) -> StorageLayout {
    match store.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("zip") => StorageLayout::Container,
        _ => StorageLayout::ImageDirectory,
    }
}

/// Pre-flight confirmation before a batch run; a CLI affordance, not part
/// of the pipeline.
fn confirm_batch(job_count: usize, workers: usize) -> Result<bool, Box<dyn std::error::Error>> {
    println!("About to pack {job_count} video(s) using {workers} worker(s).");
    print!("Continue? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for BatchProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.completed);
        if let Some(video) = &info.video {
            if info.failed > 0 {
                self.bar.set_message(format!("{video} ({} failed)", info.failed));
            } else {
                self.bar.set_message(video.clone());
            }
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            input_dir,
            manifest,
            out,
            layout,
            strategy,
            resolution,
            quality,
        } => {
            let layout = parse_layout(&layout).ok_or(format!("unsupported --layout: {layout}"))?;
            let strategy =
                parse_strategy(&strategy).ok_or(format!("unsupported --strategy: {strategy}"))?;
            let (width, height) = parse_resolution(&resolution)
                .ok_or(format!("invalid --resolution (expected WIDTHxHEIGHT): {resolution}"))?;

            let mut options = ExtractOptions::new()
                .with_layout(layout)
                .with_strategy(strategy)
                .with_resolution(width, height)
                .with_jpeg_quality(quality);
            if let Some(workers) = cli.global.workers {
                options = options.with_workers(workers);
            }

            let entries = load_manifest(&manifest)?;
            let jobs = build_jobs(&entries, &input_dir, &out, layout)?;
            if jobs.is_empty() {
                println!("{}", "Manifest names no clips; nothing to do.".yellow());
                return Ok(());
            }

            std::fs::create_dir_all(&out)?;

            if !cli.global.yes && !confirm_batch(jobs.len(), options.resolved_workers())? {
                println!("{}", "Aborted.".yellow());
                return Ok(());
            }

            let progress_bar = if cli.global.progress {
                let batch = Arc::new(BatchProgress::new(jobs.len() as u64)?);
                options = options.with_progress(batch.clone());
                Some(batch)
            } else {
                None
            };

            let report = pack_all(jobs, &options);

            if let Some(batch) = progress_bar {
                batch.bar.finish_with_message("done");
            }

            if cli.global.verbose {
                for (label, frames) in &report.succeeded {
                    eprintln!("packed {label}: {frames} frame(s)");
                }
            }

            if report.all_succeeded() {
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "{} video(s), {} frame(s) -> {}",
                        report.succeeded.len(),
                        report.frames_written(),
                        out.display(),
                    )
                    .green()
                );
            } else {
                for (label, error) in &report.failed {
                    eprintln!(
                        "{} {}",
                        "failed:".red().bold(),
                        format!("{label}: {error}").red()
                    );
                }
                for label in &report.skipped {
                    eprintln!("{} {}", "skipped:".yellow().bold(), label.yellow());
                }
                return Err(format!(
                    "{} of {} video(s) packed; {} did not complete",
                    report.succeeded.len(),
                    report.total(),
                    report.failed.len() + report.skipped.len(),
                )
                .into());
            }
        }

        Commands::Frame { store, index, out } => {
            let layout = infer_layout(&store);
            let payload = layout.read_frame(&store, index)?;
            let image = FrameCodec::decode(&payload)?;
            image.save(&out)?;
            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Saved frame {index} to {}", out.display()).green()
            );
        }

        Commands::Probe { input, json } => {
            let info = VideoSource::probe(&input)?;
            if json {
                let payload = json!({
                    "width": info.width,
                    "height": info.height,
                    "fps": info.frames_per_second,
                    "frame_count": info.frame_count,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "Video: {}x{} @ {:.2} fps, {} frame(s)",
                    info.width, info.height, info.frames_per_second, info.frame_count,
                );
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{infer_layout, parse_layout, parse_resolution, parse_strategy};
    use framepack::{PackStrategy, StorageLayout};
    use std::path::Path;

    #[test]
    fn parse_layout_aliases() {
        assert_eq!(parse_layout("container"), Some(StorageLayout::Container));
        assert_eq!(parse_layout("ZIP"), Some(StorageLayout::Container));
        assert_eq!(parse_layout("dir"), Some(StorageLayout::ImageDirectory));
        assert_eq!(parse_layout("images"), Some(StorageLayout::ImageDirectory));
        assert_eq!(parse_layout("tar"), None);
    }

    #[test]
    fn parse_strategy_aliases() {
        assert_eq!(parse_strategy("per-video"), Some(PackStrategy::InterVideo));
        assert_eq!(parse_strategy("pool"), Some(PackStrategy::InterVideo));
        assert_eq!(parse_strategy("split"), Some(PackStrategy::IntraVideo));
        assert_eq!(parse_strategy("batch"), None);
    }

    #[test]
    fn parse_resolution_formats() {
        assert_eq!(parse_resolution("224x224"), Some((224, 224)));
        assert_eq!(parse_resolution("1920X1080"), Some((1920, 1080)));
        assert_eq!(parse_resolution("640 x 480"), Some((640, 480)));
        assert_eq!(parse_resolution("224"), None);
        assert_eq!(parse_resolution("wxh"), None);
    }

    #[test]
    fn infer_layout_from_extension() {
        assert_eq!(
            infer_layout(Path::new("dataset/clip.zip")),
            StorageLayout::Container,
        );
        assert_eq!(
            infer_layout(Path::new("dataset/clip")),
            StorageLayout::ImageDirectory,
        );
    }
}
