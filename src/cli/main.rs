use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use exif_scrub::config::{self, StripMode};
use exif_scrub::exif::{self, MetadataReport};
use exif_scrub::pipeline::{self, ScrubResult};
use exif_scrub::session::Session;
use exif_scrub::shell;

#[derive(Parser, Debug)]
#[command(
    name = "exif-scrub",
    version,
    about = "Inspect and strip EXIF, XMP, IPTC and ICC metadata from images before sharing them"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Report what would be removed without writing files
    #[arg(long, conflicts_with = "shell")]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Display the embedded metadata and exit
    #[arg(long, visible_alias = "show-exif")]
    show: bool,

    /// Interactive session with undo/redo (opens the first PATH, if given)
    #[arg(long)]
    shell: bool,

    /// Strip mode: `reencode` (default) or `lossless`
    #[arg(long, value_name = "MODE")]
    mode: Option<StripMode>,

    /// Replace the originals instead of writing `<name>_clean.<ext>` copies
    #[arg(long)]
    in_place: bool,

    /// Directory for clean copies
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Keep the ICC colour profile
    #[arg(long)]
    keep_icc: bool,

    /// Number of images processed at once
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if let Some(mode) = cli.mode {
        config.strip.mode = mode;
    }
    if cli.in_place {
        config.output.in_place = true;
    }
    if let Some(ref dir) = cli.out_dir {
        config.output.output_dir = Some(dir.display().to_string());
    }
    if cli.keep_icc {
        config.strip.keep_icc = true;
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    config.validate()?;

    // Handle --shell
    if cli.shell {
        let mut session = Session::new(config);
        if let Some(first) = cli.paths.first() {
            match session.open(first) {
                Ok(report) => print!("{report}"),
                Err(e) => log::error!("Failed to open {}: {e:#}", first.display()),
            }
        }
        let stdin = std::io::stdin();
        let prompt = stdin.is_terminal();
        let mut stdout = std::io::stdout();
        return shell::run(&mut session, stdin.lock(), &mut stdout, prompt);
    }

    // Validate inputs
    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Collect images, leaving out clean copies from earlier runs
    let images = pipeline::collect_images(&cli.paths, &config.output);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --show
    if cli.show {
        let mut reports = Vec::new();
        for image_path in &images {
            match exif::inspect(image_path) {
                Ok(report) => reports.push(report),
                Err(e) => log::error!("Failed to inspect {}: {e:#}", image_path.display()),
            }
        }
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                print_report(report);
            }
        }
        return Ok(());
    }

    let total = images.len();
    log::info!("Found {total} image(s) to scrub ({} mode)", config.strip.mode);
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    let results = pipeline::process_batch(images, config).await;

    for result in &results {
        print_result(result);
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let success = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    log::info!("Done: {success} succeeded, {failed} failed out of {total} images");

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_result(result: &ScrubResult) {
    if let Some(ref err) = result.error {
        log::error!("{}: {err}", result.path.display());
        return;
    }

    let found = result.found.labels();
    let removed = if found.is_empty() {
        "no metadata found".to_string()
    } else {
        found.join(", ")
    };
    let target = result
        .output_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let mode = result.mode.map(|m| m.to_string()).unwrap_or_default();

    if result.dry_run {
        log::info!("{}: would remove {removed} ({mode}) → {target}", result.path.display());
    } else {
        log::info!(
            "{}: removed {removed} ({mode}, {} → {} bytes) → {target}",
            result.path.display(),
            result.bytes_before,
            result.bytes_after
        );
        let residual = result.residual.labels();
        if !residual.is_empty() {
            log::warn!("  Still present: {}", residual.join(", "));
        }
    }
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the metadata of a file, organized by section.
fn print_report(report: &MetadataReport) {
    let data = &report.exif;

    println!();
    println!("{BOLD}File:{RESET} {}", report.path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    // --- Container ---
    println!("  {BOLD}Container{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    print_row("Format", &format!("{:?} ({})", report.kind, report.kind.mime_type()));
    if let (Some(w), Some(h)) = (report.width, report.height) {
        print_row("ImageSize", &format!("{w} x {h}"));
    }
    print_row("FileSize", &format!("{} bytes", report.file_size));
    let labels = report.blocks.labels();
    if labels.is_empty() {
        print_row("Metadata", "none");
    } else {
        print_flagged("Metadata", &labels.join(", "));
    }
    println!();

    // --- Identifying fields ---
    let fields: Vec<(&str, Option<&str>)> = vec![
        ("Make", data.make.as_deref()),
        ("Model", data.model.as_deref()),
        ("LensModel", data.lens_model.as_deref()),
        ("SerialNumber", data.serial_number.as_deref()),
        ("Software", data.software.as_deref()),
        ("Artist", data.artist.as_deref()),
        ("Copyright", data.copyright.as_deref()),
        ("DateTimeOriginal", data.date_time.as_deref()),
        ("ImageDescription", data.description.as_deref()),
    ];
    if fields.iter().any(|(_, v)| v.is_some()) {
        println!("  {BOLD}Identifying{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, val) in &fields {
            if let Some(v) = val {
                print_flagged(tag, v);
            }
        }
        println!();
    }

    // --- GPS ---
    if data.has_gps {
        println!("  {BOLD}GPS{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        if let Some(lat) = data.gps_latitude {
            print_flagged("GPSLatitude", &format!("{lat:.6}"));
        }
        if let Some(lon) = data.gps_longitude {
            print_flagged("GPSLongitude", &format!("{lon:.6}"));
        }
        println!();
    }

    // --- Everything else the parser read ---
    if !data.entries.is_empty() {
        println!("  {BOLD}All EXIF entries{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for entry in &data.entries {
            print_row(&entry.tag, &entry.value);
        }
        println!();
    }

    if report.is_clean(false) {
        println!("  {DIM}(no metadata found){RESET}");
        println!();
    }
}

/// Print a single row in the metadata table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Print a row that would be removed by scrubbing (red with !).
fn print_flagged(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    let last = lines.len() - 1;
    for (i, line) in lines.iter().enumerate() {
        let marker = if i == last { " !" } else { "" };
        if i == 0 {
            println!("  {RED}{tag_col} : {line}{marker}{RESET}");
        } else {
            println!("  {RED}{INDENT}{line}{marker}{RESET}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
