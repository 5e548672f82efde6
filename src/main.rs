use clap::{Parser, Subcommand};
use media_variants::{config, input, manifest, output, pipeline};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "media-variants")]
#[command(about = "Batch-convert remote images into resized WebP/AVIF variants")]
#[command(long_about = "\
Batch-convert remote images into resized WebP/AVIF variants

Reads a JSON list of media items, downloads each image, writes one file per
configured variant width and records everything in converted_media.json.

Input (bare array or {\"data\": [...]} envelope):

  [
    {
      \"id\": \"17900\",
      \"media_url\": \"https://cdn.example.com/17900.jpg\",
      \"thumbnail_url\": null,
      \"timestamp\": \"2025-04-16T15:58:54+0000\"
    }
  ]

Output:

  output/
  ├── converted_media.json         # Manifest, newest first
  └── media/
      ├── 17900_1024w_large.webp   # <id>_<width>w_<name>.<ext>
      └── 17900_256w_thumb.webp

Videos are skipped. Items that fail are reported and left out of the manifest;
the rest of the batch carries on.

Logging goes to stderr; set RUST_LOG (e.g. RUST_LOG=media_variants=debug) for more.

Run 'media-variants gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "media-variants.toml", global = true)]
    config: PathBuf,

    /// Directory for variant files (overrides storage.media_dir)
    #[arg(long, global = true)]
    media_dir: Option<PathBuf>,

    /// Directory for converted_media.json (overrides storage.output_dir)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download, resize and encode every item, then write the manifest
    Process {
        /// JSON file with the media items
        #[arg(long)]
        items: PathBuf,

        /// Items processed at once (overrides processing.max_concurrency)
        #[arg(long)]
        max_concurrency: Option<usize>,
    },
    /// Print an existing manifest
    Show,
    /// Print a stock config file with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            items,
            max_concurrency,
        } => {
            let mut site_config = config::load_config(&cli.config)?;
            if let Some(dir) = cli.media_dir {
                site_config.storage.media_dir = dir;
            }
            if let Some(dir) = cli.output_dir {
                site_config.storage.output_dir = dir;
            }
            if max_concurrency.is_some() {
                site_config.processing.max_concurrency = max_concurrency;
            }
            site_config.validate()?;

            let media_items = input::load_media_items(&items)?;

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_process_event(&event);
                }
            });
            let result = pipeline::transcode(&media_items, &site_config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let report = result?;

            println!();
            output::print_summary(&report.outcome, Some(&report.manifest_path));
        }
        Command::Show => {
            let output_dir = match cli.output_dir {
                Some(dir) => dir,
                None => config::load_config(&cli.config)?.storage.output_dir,
            };
            let entries = manifest::read_manifest(&output_dir)?;
            output::print_manifest(&entries);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
