use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info};
use simplelog::{Config, LevelFilter, WriteLogger};

use pdfpager::settings::ViewerOptions;
use pdfpager::{DocumentSource, PdfViewer, Phase, Rgb, ViewerEvent};

/// Render a PDF in the background and optionally export its pages as PNG
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path or URL of the PDF to load
    source: String,

    /// Render quality in percent (30-500)
    #[arg(long)]
    quality: Option<u16>,

    /// Background fill as RRGGBB hex
    #[arg(long)]
    background: Option<String>,

    /// Export every rendered page into this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Optional TOML options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "pdfpager.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&args.log_file)?,
    )?;
    info!("Starting pdfpager");

    let options = match &args.config {
        Some(path) => ViewerOptions::load(path)?,
        None => ViewerOptions::default(),
    };

    let quality = args.quality.unwrap_or_else(|| options.clamped_quality());
    let background = args
        .background
        .as_deref()
        .map(|hex| Rgb::from_hex(hex).context("--background must be RRGGBB hex"))
        .transpose()?
        .unwrap_or_else(|| options.background_rgb());

    let mut viewer = PdfViewer::new();
    viewer.set_render_quality(quality);
    viewer.set_background_color(background);

    viewer.load_document(
        DocumentSource::parse(&args.source),
        options.orientation,
        options.snap_enabled,
    );

    let events = viewer.events().clone();
    loop {
        match events.recv_timeout(Duration::from_secs(120)) {
            Ok(ViewerEvent::DownloadProgress(pct)) => println!("download {pct}%"),

            Ok(ViewerEvent::PdfLoaded {
                total_pages,
                file_name,
            }) => {
                println!("loaded '{file_name}' ({total_pages} pages)");
                if total_pages == 0 {
                    break;
                }
            }

            Ok(ViewerEvent::RenderProgress(pct)) => {
                println!("render {pct}%");
                if pct >= 100 {
                    match &args.export_dir {
                        Some(dir) => {
                            std::fs::create_dir_all(dir)
                                .with_context(|| format!("Failed to create {dir:?}"))?;
                            viewer.save_all_pages(dir.clone());
                        }
                        None => break,
                    }
                }
            }

            Ok(ViewerEvent::PageSaved { page, path }) => {
                println!("saved page {page} -> {}", path.display());
            }

            Ok(ViewerEvent::AllPagesSaved(dir)) => {
                println!("all pages saved to {}", dir.display());
                break;
            }

            Ok(ViewerEvent::Error(message)) => {
                error!("{message}");
                eprintln!("error: {message}");
                if viewer.phase() == Phase::Idle {
                    bail!("failed to load document");
                }
            }

            Ok(_) => {}

            Err(_) => bail!("timed out waiting for render events"),
        }
    }

    viewer.close();
    info!("Shutting down pdfpager");
    Ok(())
}
