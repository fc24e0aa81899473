//! CLI entry point for `mailsalvage`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsalvage::config::{Config, ResolutionPolicy};
use mailsalvage::pipeline::{self, RunOptions};
use mailsalvage::report::{self, ExportStats, RunReport};

#[derive(Parser)]
#[command(
    name = "mailsalvage",
    version,
    about = "Rebuild .eml files from a mail client message database export"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild every salvageable message as an .eml file
    Recover {
        /// Directory holding the exported JSON tables
        export_dir: PathBuf,
        /// Output root (default: config `output.root`, else ./output)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// What to do with messages that reference missing data
        #[arg(long, value_enum)]
        policy: Option<ResolutionPolicy>,
        /// Drop the server name from folder paths
        #[arg(long)]
        strip_host: bool,
        /// Write manifest.json with a SHA-256 digest per file
        #[arg(long)]
        manifest: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze an export without writing anything
    Stats {
        export_dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = mailsalvage::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Recover {
            export_dir,
            output,
            policy,
            strip_host,
            manifest,
            json,
        } => {
            let mut options = RunOptions::from_config(&config);
            if let Some(output) = output {
                options.output_root = output;
            }
            if let Some(policy) = policy {
                options.policy = policy;
            }
            options.strip_host |= strip_host;
            options.manifest = manifest;
            cmd_recover(&export_dir, &options, json)
        }
        Commands::Stats { export_dir, json } => cmd_stats(&export_dir, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailsalvage::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsalvage.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsalvage", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Recover all messages of an export.
fn cmd_recover(export_dir: &Path, options: &RunOptions, json: bool) -> anyhow::Result<()> {
    if !export_dir.is_dir() {
        anyhow::bail!("Export directory not found: {}", export_dir.display());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Rebuilding [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(pipeline::run(
        export_dir,
        options,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    ))?;
    pb.finish_and_clear();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report);
    }
    Ok(())
}

/// Analyze an export and print what a recovery would produce.
fn cmd_stats(export_dir: &Path, json: bool) -> anyhow::Result<()> {
    let export = mailsalvage::source::load_export(export_dir)?;
    let stats = report::analyze(&export);
    let top = report::top_senders(&export, 10);

    if json {
        let top_json: Vec<serde_json::Value> = top
            .iter()
            .map(|(sender, count)| serde_json::json!({ "sender": sender, "count": count }))
            .collect();
        let out = serde_json::json!({
            "export_dir": export_dir.to_string_lossy(),
            "stats": stats,
            "top_senders": top_json,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_stats_table(export_dir, &stats, &top);
    }
    Ok(())
}

/// Print a run report in a human-readable table.
fn print_run_report(report: &RunReport) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  {:<25} {}", "Output", report.output_root.display());
    println!("  {:<25} {}", "Folders", report.folders);
    println!("  {:<25} {}", "Messages read", report.messages_read);
    println!("  {:<25} {}", "Excluded (empty rows)", report.excluded);
    println!("  {:<25} {}", "Written", report.written);
    println!("  {:<25} {}", "Replies threaded", report.replies);
    println!("  {:<25} {}", "Conversations", report.conversations);
    if report.renamed > 0 {
        println!("  {:<25} {}", "Renamed (duplicate ids)", report.renamed);
    }
    println!(
        "  {:<25} {}",
        "Bytes written",
        format_size(report.bytes_written, BINARY)
    );
    println!("  {:<25} {} ms", "Elapsed", report.elapsed_ms);
    if let Some(ref manifest) = report.manifest {
        println!("  {:<25} {}", "Manifest", manifest.display());
    }

    if !report.skipped.is_empty() {
        println!();
        println!("  Skipped {} message(s):", report.skipped.len());
        for skipped in &report.skipped {
            println!("    #{:<6} {}", skipped.sequence, skipped.reason);
        }
    }
    println!();
}

/// Print export statistics in a human-readable table.
fn print_stats_table(export_dir: &Path, stats: &ExportStats, top: &[(String, usize)]) {
    println!();
    println!("  {:<28} {}", "Export", export_dir.display());
    println!("  {:<28} {}", "Messages", stats.tables.messages);
    println!("  {:<28} {}", "Salvageable", stats.salvageable);
    println!("  {:<28} {}", "Excluded (empty rows)", stats.excluded);
    println!("  {:<28} {}", "Contacts", stats.tables.contacts);
    println!("  {:<28} {}", "Folders", stats.tables.folders);
    println!("  {:<28} {}", "Conversations", stats.conversations);

    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!(
            "  {:<28} {} — {}",
            "Date range",
            oldest.format("%Y-%m-%d"),
            newest.format("%Y-%m-%d")
        );
    }

    println!("  {:<28} {}", "Without Message-ID", stats.without_message_id);
    println!("  {:<28} {}", "Without text content", stats.without_content);
    println!("  {:<28} {}", "Without folder", stats.without_folder);
    println!("  {:<28} {}", "Malformed attribute blobs", stats.malformed_attributes);
    println!(
        "  {:<28} {}",
        "Dangling contact ids",
        stats.dangling_contacts.len()
    );
    println!(
        "  {:<28} {}",
        "Dangling MIME type ids",
        stats.dangling_mime_types.len()
    );

    if !top.is_empty() {
        println!();
        println!("  Top senders:");
        for (sender, count) in top {
            println!("    {count:>6}  {sender}");
        }
    }
    println!();
}
