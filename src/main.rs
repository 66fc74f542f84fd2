//! pdf-core command line
//!
//! Inspects and renders PDF documents through the MuPDF backend.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_core::{
    Bookmark, Config, DocumentHandle, DocumentMeta, EngineLifecycle, Link, MupdfEngine, PdfCore,
};

#[derive(Parser)]
#[command(name = "pdf-core", about = "Inspect and render PDF documents", version)]
struct Cli {
    /// Document password
    #[arg(short, long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print page count, metadata and outline as JSON
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Print the links of a page as JSON
    Links {
        input: PathBuf,

        /// Zero-based page index
        #[arg(short = 'n', long, default_value_t = 0)]
        page: i32,
    },

    /// Print the text of a page
    Text {
        input: PathBuf,

        #[arg(short = 'n', long, default_value_t = 0)]
        page: i32,
    },

    /// Render a page to PNG
    Render {
        input: PathBuf,

        /// Output PNG path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short = 'n', long, default_value_t = 0)]
        page: i32,

        /// Resolution (defaults to PDF_CORE_DPI or 72)
        #[arg(short, long)]
        dpi: Option<i32>,

        /// Skip annotation appearances
        #[arg(long)]
        no_annotations: bool,
    },
}

#[derive(Serialize)]
struct InfoReport {
    page_count: i32,
    source_size: u64,
    meta: DocumentMeta,
    outline: Vec<Bookmark>,
}

#[derive(Serialize)]
struct LinksReport {
    page: i32,
    links: Vec<Link>,
}

fn open(
    core: &mut PdfCore<MupdfEngine>,
    input: &PathBuf,
    password: Option<&str>,
) -> Result<DocumentHandle> {
    let file = File::open(input).with_context(|| format!("cannot open {}", input.display()))?;
    core.open_file(file, password)
        .with_context(|| format!("cannot load {}", input.display()))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    if config.engine.backend != "mupdf" {
        tracing::warn!(
            "Backend {:?} is not available in this build, using mupdf",
            config.engine.backend
        );
    }

    let default_dpi = config.render.default_dpi;
    let render_annotations = config.render.render_annotations;
    let mut core = PdfCore::new(EngineLifecycle::shared(MupdfEngine::new()), config);
    let password = cli.password.as_deref();

    match cli.command {
        Commands::Info { input } => {
            let doc = open(&mut core, &input, password)?;
            let report = InfoReport {
                page_count: core.page_count(doc).unwrap_or(0),
                source_size: core.source_size(doc).unwrap_or(0),
                meta: core.document_meta(doc),
                outline: core.table_of_contents(doc),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Links { input, page } => {
            let doc = open(&mut core, &input, password)?;
            let handle = core.load_page(doc, page)?;
            let report = LinksReport {
                page,
                links: core.page_links(handle),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Text { input, page } => {
            let doc = open(&mut core, &input, password)?;
            let handle = core.load_page(doc, page)?;
            let text = core.load_text_page(doc, handle)?;
            let content = core
                .text_page(text)
                .map(|text| text.text())
                .ok_or_else(|| anyhow!("text page {} disappeared", page))?;
            println!("{}", content);
        }

        Commands::Render {
            input,
            output,
            page,
            dpi,
            no_annotations,
        } => {
            let dpi = dpi.unwrap_or(default_dpi);
            if dpi <= 0 {
                bail!("dpi must be positive, got {}", dpi);
            }
            let doc = open(&mut core, &input, password)?;
            let handle = core.load_page(doc, page)?;
            let annotations = render_annotations && !no_annotations;

            let image = core
                .render_to_image(handle, dpi, annotations)
                .ok_or_else(|| anyhow!("page {} could not be rendered", page))?;
            image
                .save(&output)
                .with_context(|| format!("cannot write {}", output.display()))?;
            tracing::info!(
                "Rendered page {} at {} dpi to {} ({}x{})",
                page,
                dpi,
                output.display(),
                image.width(),
                image.height()
            );
        }
    }

    Ok(())
}
