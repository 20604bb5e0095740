//! pkgstamp CLI - Write a provenance manifest for a git checkout

use clap::error::ErrorKind;
use clap::Parser;
use pkgstamp_core::{Config, ManifestSettings, RemoteKind, StampConfig, StampError, StampOutcome};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pkgstamp", version)]
#[command(about = "Write a JSON provenance manifest for a git checkout", long_about = None)]
struct Cli {
    /// Path to the Git repository
    #[arg(long)]
    path: Option<PathBuf>,

    /// Artifact file extension (e.g. tar.xz)
    #[arg(long)]
    ext: Option<String>,

    /// Preset for naming, extension, redaction and fields (default: standard)
    #[arg(long, value_parser = ["standard", "rfc3339", "minimal"])]
    profile: Option<String>,

    /// Artifact name prefix: repository directory name or literal "archive"
    #[arg(long, value_parser = ["dir", "archive"])]
    naming: Option<String>,

    /// How credentials are removed from the remote URL
    #[arg(long, value_parser = ["strip-userinfo", "host-path"])]
    redact: Option<String>,

    /// Key set of the manifest JSON
    #[arg(long, value_parser = ["minimal", "standard", "rfc3339"])]
    fields: Option<String>,

    /// Directory the manifest is written to (default: current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// TOML config file with a [manifest] section
    #[arg(long, env = "PKGSTAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            if std::env::args_os().any(|arg| arg == "--json") {
                let message = e.to_string().trim_end().to_string();
                report(&StampError::Configuration(message), true);
            } else {
                let _ = e.print();
            }
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);

    let json = cli.json;
    if let Err(e) = run(cli) {
        report(&e, json);
        std::process::exit(1);
    }
}

/// Print `e` to stderr, as a `{code,message,hint}` envelope under `--json`.
fn report(e: &StampError, json: bool) {
    if json {
        match serde_json::to_string_pretty(&e.to_envelope()) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("Error: {}", e),
        }
    } else {
        eprintln!("Error: {}", e);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> pkgstamp_core::Result<()> {
    let overrides = ManifestSettings {
        profile: cli.profile.map(|p| p.parse()).transpose()?,
        extension: cli.ext,
        naming: cli.naming.map(|n| n.parse()).transpose()?,
        redaction: cli.redact.map(|r| r.parse()).transpose()?,
        fields: cli.fields.map(|f| f.parse()).transpose()?,
        output_dir: cli.output_dir,
    };

    let file = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let config = StampConfig::resolve(cli.path, overrides.or(file.manifest))?;
    tracing::debug!(?config, "resolved configuration");
    let outcome = pkgstamp_core::stamp(&config)?;

    if cli.json {
        print_json(&outcome)
    } else {
        print_human(&config, &outcome);
        Ok(())
    }
}

fn print_human(config: &StampConfig, outcome: &StampOutcome) {
    use colored::Colorize;

    let manifest = &outcome.manifest;
    println!("{} {}", "Profile:".bold(), config.profile);
    println!(
        "{} {}",
        "Absolute path:".bold(),
        outcome.identity.abs_path.display()
    );
    println!("{} {}", "Directory name:".bold(), outcome.identity.dir_name);
    if let (Some(repo), Some(kind)) = (&manifest.repo, &outcome.remote_kind) {
        let label = match kind {
            RemoteKind::Origin => "Remote origin URL:".to_string(),
            RemoteKind::Fallback(name) => format!("Remote {} URL:", name),
            RemoteKind::Synthetic => "Remote (local directory):".to_string(),
        };
        println!("{} {}", label.bold(), repo);
    }
    println!("{} {}", "SHA:".bold(), manifest.sha);
    println!("{} {}", "Short SHA:".bold(), manifest.short_sha);
    println!("{} {}", "File name:".bold(), manifest.file_name);
    println!(
        "{} {}",
        "Wrote".green(),
        outcome.manifest_path.display()
    );
}

fn print_json(outcome: &StampOutcome) -> pkgstamp_core::Result<()> {
    let manifest = &outcome.manifest;
    let value = serde_json::json!({
        "manifest_path": outcome.manifest_path.display().to_string(),
        "abs_path": outcome.identity.abs_path.display().to_string(),
        "dir_name": outcome.identity.dir_name,
        "epoch_time": manifest.timestamp.epoch_time,
        "sha": manifest.sha,
        "short_sha": manifest.short_sha,
        "file_name": manifest.file_name,
        "repo": manifest.repo,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
