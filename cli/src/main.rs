//! surveypix CLI - survey image anchor resolution tool
//!
//! A command-line tool for mapping the images embedded in an exported
//! survey workbook back to the participants they belong to.

use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use surveypix::render::{to_json, to_summary, JsonFormat};
use surveypix::resolve::{export_media, load_media, ResolverConfig};
use surveypix::{Resolution, SpreadsheetArchive, Strategy, Warning};

/// Map embedded survey images to participants
#[derive(Parser)]
#[command(
    name = "surveypix",
    author = "iyulab",
    version,
    about = "Map embedded survey images to participants",
    long_about = "surveypix - Spreadsheet image anchor resolution.\n\n\
                  Reads the drawing anchors of an exported .xlsx survey and reports \
                  which media file belongs to which participant and question."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve participant images and print the mapping as JSON
    Resolve {
        /// Input .xlsx file
        input: PathBuf,

        /// Directory to extract media into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the JSON mapping to a file instead of stdout
        #[arg(long)]
        json: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,

        /// Print a summary table instead of JSON on stdout
        #[arg(short, long)]
        summary: bool,

        /// Also write {participant_id}_{role}.{ext} copies
        #[arg(long)]
        rename: bool,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Header of the participant identifier column
        #[arg(long)]
        id_column: Option<String>,

        /// Header of the participant name column
        #[arg(long)]
        name_column: Option<String>,

        /// Column role assignment such as AB=face_photo (repeatable)
        #[arg(long = "column", value_name = "COLUMN=ROLE")]
        columns: Vec<String>,
    },

    /// List every drawing anchor in a workbook
    Anchors {
        /// Input .xlsx file
        input: PathBuf,

        /// Output JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// List media files by pixel area, with duplicate counts
    Media {
        /// Input .xlsx file
        input: PathBuf,

        /// Output JSON instead of a listing
        #[arg(long)]
        json: bool,
    },

    /// Extract every media file from a workbook
    Extract {
        /// Input .xlsx file
        input: PathBuf,

        /// Output directory for media
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Resolve {
            input,
            output,
            json,
            compact,
            summary,
            rename,
            config,
            id_column,
            name_column,
            columns,
        } => {
            let mut config = match config {
                Some(path) => ResolverConfig::from_json_file(path)?,
                None => ResolverConfig::default(),
            }
            .with_archive(&input);

            if let Some(dir) = output {
                config = config.with_output_dir(dir);
            }
            if rename {
                config = config.with_rename(true);
            }
            if let Some(header) = id_column {
                config = config.with_id_column(header);
            }
            if let Some(header) = name_column {
                config = config.with_name_column(header);
            }
            for assignment in &columns {
                config.columns.apply_assignment(assignment)?;
            }

            let pb = create_spinner("Resolving images...");
            let resolution = surveypix::resolve_file(&config)?;
            pb.finish_and_clear();

            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            let rendered = to_json(&resolution, format)?;

            if let Some(path) = json.as_ref() {
                write_output(Some(path), &rendered)?;
            }
            if let Some(content) = stdout_content(&resolution, summary, json.is_some(), &rendered) {
                write_output(None, &content)?;
            }

            print_warnings(&resolution.warnings);
            for line in status_lines(&resolution, json.as_deref(), config.output_dir.as_deref()) {
                eprintln!("{}", line);
            }
        }

        Commands::Anchors { input, json } => {
            let pb = create_spinner("Reading drawings...");
            let scan = surveypix::list_anchors(&input)?;
            pb.finish_and_clear();

            if json {
                write_output(None, &serde_json::to_string_pretty(&scan)?)?;
            } else {
                println!("{}", "Drawing Anchors".cyan().bold());
                println!("{}", "─".repeat(60));
                for anchor in &scan.anchors {
                    println!(
                        "{:<8} {:<6} {:<8} {:<24} {}",
                        anchor.cell_ref(),
                        anchor.rel_id,
                        format!("{:?}", anchor.kind),
                        anchor.file,
                        anchor.drawing.dimmed()
                    );
                }
                println!("{}", "─".repeat(60));
                println!("{}: {}", "Anchors".bold(), scan.anchors.len());
            }
            print_warnings(&scan.warnings);
        }

        Commands::Media { input, json } => {
            let pb = create_spinner("Decoding media...");
            let survey = surveypix::list_media(&input)?;
            pb.finish_and_clear();

            if json {
                write_output(None, &serde_json::to_string_pretty(&survey)?)?;
            } else {
                println!("{}", "Media Files".cyan().bold());
                println!("{}", "─".repeat(60));
                for entry in &survey.entries {
                    let dims = match (entry.width, entry.height) {
                        (Some(w), Some(h)) => format!("{}x{}", w, h),
                        _ => "?".to_string(),
                    };
                    let copies = if entry.copies > 1 {
                        format!("x{}", entry.copies).yellow().to_string()
                    } else {
                        String::new()
                    };
                    println!(
                        "{:<20} {:>11} {:>10} B {}",
                        entry.filename, dims, entry.size, copies
                    );
                }
                println!("{}", "─".repeat(60));
                println!("{}: {}", "Media files".bold(), survey.entries.len());
                println!(
                    "{}: {}",
                    "Duplicated".bold(),
                    survey.duplicated().count()
                );
            }
            print_warnings(&survey.warnings);
        }

        Commands::Extract { input, output } => {
            let pb = create_spinner("Extracting media...");

            let archive = SpreadsheetArchive::open(&input)?;
            let mut warnings = Vec::new();
            let assets = load_media(&archive, &mut warnings);
            let count = export_media(&assets, &output)?;

            pb.finish_and_clear();
            print_warnings(&warnings);

            if count > 0 {
                println!(
                    "{} Extracted {} media files to {}",
                    "✓".green().bold(),
                    count,
                    output.display()
                );
            } else {
                println!("{} No media found in workbook", "!".yellow().bold());
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn print_version() {
    println!("{} {}", "surveypix".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Spreadsheet image anchor resolution for survey exports");
    println!();
    println!("Supported formats: XLSX");
}

/// What `resolve` prints on stdout: the summary table, or the JSON mapping
/// unless it went to a file.
fn stdout_content(
    resolution: &Resolution,
    summary: bool,
    json_to_file: bool,
    rendered: &str,
) -> Option<String> {
    if summary {
        Some(to_summary(resolution))
    } else if json_to_file {
        None
    } else {
        Some(rendered.to_string())
    }
}

/// Progress lines for `resolve`; these go to stderr so stdout stays parseable.
fn status_lines(
    resolution: &Resolution,
    json: Option<&Path>,
    output_dir: Option<&Path>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if resolution.strategy == Strategy::Heuristic {
        lines.push(format!(
            "{} No drawing anchors found; images were matched by size and row order",
            "!".yellow().bold()
        ));
    }
    if let Some(path) = json {
        lines.push(format!(
            "{} Wrote mapping for {} participants: {}",
            "✓".green().bold(),
            resolution.statistics.participants,
            path.display()
        ));
    }
    if let Some(dir) = output_dir {
        lines.push(format!(
            "{} Extracted {} media files to {}",
            "✓".green().bold(),
            resolution.statistics.exported_media,
            dir.display()
        ));
    }
    lines
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_output(path: Option<&PathBuf>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            write_file(p, content)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", content)?;
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format!("{}\n", content))
}
