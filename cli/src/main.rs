//! pdf2docx CLI - PDF to DOCX conversion tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf2docx::parser::ObjectStore;
use pdf2docx::{
    convert_pdf_to_docx_with_diagnostics, convert_to_document, ConversionOptions, Diagnostic,
    JsonFormat, LayoutConfig, Metadata, RenderOptions,
};

#[derive(Parser)]
#[command(name = "pdf2docx")]
#[command(version)]
#[command(about = "Convert PDF documents to editable DOCX", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output DOCX file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert PDF to DOCX
    Convert {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (input name with .docx if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Dump the reconstructed document as JSON
    Json {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Options shared by the converting commands.
#[derive(clap::Args, Clone)]
struct Tuning {
    /// Fail on the first page that cannot be read instead of skipping it
    #[arg(long)]
    strict: bool,

    /// Process pages on a single thread
    #[arg(long)]
    sequential: bool,

    /// Maximum number of page workers
    #[arg(long, env = "PDF2DOCX_WORKERS")]
    workers: Option<usize>,

    /// Largest accepted input, in MiB
    #[arg(long, default_value = "20")]
    max_size_mb: usize,

    /// Default font of the output document
    #[arg(long, default_value = "Calibri")]
    font: String,

    /// Paragraph gap threshold, in multiples of the font size
    #[arg(long, default_value = "1.5")]
    paragraph_gap: f64,

    /// Read the page as one column even when a gutter is found
    #[arg(long)]
    no_columns: bool,
}

impl Tuning {
    fn options(&self) -> ConversionOptions {
        let layout = LayoutConfig::default()
            .with_paragraph_gap_ratio(self.paragraph_gap)
            .with_column_detection(!self.no_columns);
        let mut options = ConversionOptions::new()
            .with_max_input_bytes(self.max_size_mb.saturating_mul(1024 * 1024))
            .with_skip_unparsable_pages(!self.strict)
            .with_parallel(!self.sequential)
            .with_layout(layout)
            .with_render_options(RenderOptions::new().with_default_font(self.font.clone()));
        if let Some(workers) = self.workers {
            options = options.with_max_workers(workers);
        }
        options
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            strict: false,
            sequential: false,
            workers: None,
            max_size_mb: 20,
            font: "Calibri".to_string(),
            paragraph_gap: 1.5,
            no_columns: false,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert { input, output, tuning }) => cmd_convert(&input, output.as_deref(), &tuning),
        Some(Commands::Json {
            input,
            output,
            compact,
            tuning,
        }) => cmd_json(&input, output.as_deref(), compact, &tuning),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &Tuning::default())
            } else {
                println!("{}", "Usage: pdf2docx <FILE> [OUTPUT]".yellow());
                println!("       pdf2docx --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("docx")
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    eprintln!("{}", "Warnings:".yellow().bold());
    for diagnostic in diagnostics {
        eprintln!("  {} {}", "-".dimmed(), diagnostic);
    }
}

fn cmd_convert(input: &Path, output: Option<&Path>, tuning: &Tuning) -> Result<(), Box<dyn std::error::Error>> {
    let output = output.map(Path::to_path_buf).unwrap_or_else(|| default_output(input));
    log::debug!("converting {} to {}", input.display(), output.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("template is compile-time constant"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Reading PDF...");
    let data = fs::read(input)?;

    pb.set_message("Converting...");
    let result = convert_pdf_to_docx_with_diagnostics(&data, &tuning.options())?;

    pb.set_message("Writing DOCX...");
    fs::write(&output, &result.bytes)?;
    pb.finish_and_clear();

    print_diagnostics(&result.diagnostics);
    println!(
        "{} {} ({} pages, {} paragraphs)",
        "Saved to".green(),
        output.display(),
        result.page_count,
        result.paragraph_count
    );

    Ok(())
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
    tuning: &Tuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let (doc, diagnostics) = convert_to_document(&data, &tuning.options())?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = pdf2docx::render::to_json(&doc, format)?;

    print_diagnostics(&diagnostics);
    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let store = ObjectStore::load(&data)?;
    let pages = store.pages()?;
    let metadata = Metadata::from_store(&store, pages.len());

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), metadata.pdf_version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);
    println!(
        "{}: {}",
        "Encrypted".bold(),
        if store.is_encrypted() { "Yes" } else { "No" }
    );
    println!("{}: {}", "Objects".bold(), store.object_count());

    if let Some(first) = pages.first() {
        let (width, height) = first.display_size();
        println!("{}: {:.0} x {:.0} pt", "Page size".bold(), width, height);
    }
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    print_diagnostics(store.diagnostics());
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdf2docx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF to DOCX conversion tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output(Path::new("dir/report.pdf")), PathBuf::from("dir/report.docx"));
    }

    #[test]
    fn test_tuning_options() {
        let tuning = Tuning {
            strict: true,
            sequential: true,
            workers: Some(2),
            max_size_mb: 1,
            font: "Arial".to_string(),
            paragraph_gap: 2.0,
            no_columns: true,
        };
        let options = tuning.options();
        assert!(!options.skip_unparsable_pages);
        assert!(!options.parallel);
        assert_eq!(options.max_workers, Some(2));
        assert_eq!(options.max_input_bytes, 1024 * 1024);
        assert_eq!(options.render.default_font, "Arial");
        assert_eq!(options.layout.paragraph_gap_ratio, 2.0);
        assert!(!options.layout.detect_columns);
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["pdf2docx", "convert", "in.pdf", "-o", "out.docx", "--strict"]).unwrap();
        match cli.command {
            Some(Commands::Convert { input, output, tuning }) => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert_eq!(output, Some(PathBuf::from("out.docx")));
                assert!(tuning.strict);
            }
            _ => panic!("expected convert"),
        }
    }
}
