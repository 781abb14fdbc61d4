//! `trcbridge-cli` – command line front end.
//!
//! ```text
//! trcbridge convert --subject s1 [--data-dir D] [--output-dir O] [--suffix walking] …
//! trcbridge config show
//! trcbridge config init [--force]
//! ```
//!
//! Settings resolve as defaults < config file < `TRCBRIDGE_*` environment
//! variables < flags.  Diagnostics go through `tracing` on stderr; results
//! are printed to stdout.

mod config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use thiserror::Error;
use tracing::debug;

use trcbridge_ingest::ExportLayout;
use trcbridge_runtime::{ConversionReport, ConvertError, SubjectLayout, convert};
use trcbridge_transform::{AxisRemap, LengthUnit};
use trcbridge_writer::{AxisLabelStyle, EmptyMarkerPolicy, PresenceRule};

use config::{Config, ConfigError};

// ─────────────────────────────────────────────────────────────────────────────
// Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "trcbridge", version, about = "Convert marker trajectory exports to TRC files")]
struct Cli {
    /// Config file (default: ~/.trcbridge/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one subject's landmark and target exports into a TRC file.
    Convert(ConvertArgs),
    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration (file plus environment) as TOML.
    Show,
    /// Write the default configuration file.
    Init {
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Subject identifier; inputs are `{subject}_landmarks.tsv` and `{subject}_targets.tsv`.
    #[arg(long)]
    subject: String,
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Output file becomes `{subject}_{suffix}.trc`.
    #[arg(long)]
    suffix: Option<String>,
    /// Sampling rate in Hz.
    #[arg(long)]
    frame_rate: Option<f64>,
    /// Export header convention: grouped or tagged.
    #[arg(long)]
    layout: Option<ExportLayout>,
    /// Keep only columns with this origin tag (tagged layout).
    #[arg(long)]
    origin: Option<String>,
    /// indexed, plain or marker-suffixed.
    #[arg(long)]
    axis_labels: Option<AxisLabelStyle>,
    /// Explicit axis remap, e.g. `x,z,-y`.
    #[arg(long, conflicts_with_all = ["from", "to"])]
    remap: Option<AxisRemap>,
    /// Source coordinate convention.
    #[arg(long)]
    from: Option<String>,
    /// Target coordinate convention.
    #[arg(long)]
    to: Option<String>,
    /// Output unit: mm, cm or m.
    #[arg(long)]
    units: Option<LengthUnit>,
    /// blank or omit.
    #[arg(long)]
    empty_markers: Option<EmptyMarkerPolicy>,
    /// all-axes or any-axis.
    #[arg(long)]
    presence: Option<PresenceRule>,
    /// Print the conversion report as JSON.
    #[arg(long)]
    json: bool,
}

impl ConvertArgs {
    /// Layer the flags that were given on top of `cfg`.
    fn apply(&self, cfg: &mut Config) {
        if let Some(v) = &self.data_dir {
            cfg.data_dir = v.clone();
        }
        if let Some(v) = &self.output_dir {
            cfg.output_dir = v.clone();
        }
        if let Some(v) = &self.suffix {
            cfg.output_suffix = Some(v.clone());
        }
        if let Some(v) = self.frame_rate {
            cfg.frame_rate = v;
        }
        if let Some(v) = self.layout {
            cfg.layout = v;
        }
        if let Some(v) = &self.origin {
            cfg.origin = Some(v.clone());
        }
        if let Some(v) = self.axis_labels {
            cfg.axis_labels = v;
        }
        if let Some(v) = self.remap {
            cfg.remap = Some(v.to_string());
        }
        if self.from.is_some() || self.to.is_some() {
            cfg.remap = None;
        }
        if let Some(v) = &self.from {
            cfg.source_convention = v.clone();
        }
        if let Some(v) = &self.to {
            cfg.target_convention = v.clone();
        }
        if let Some(v) = self.units {
            cfg.units = v;
        }
        if let Some(v) = self.empty_markers {
            cfg.empty_markers = v;
        }
        if let Some(v) = self.presence {
            cfg.presence = v;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("failed to encode report: {0}")]
    Report(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    let guard = trcbridge_runtime::telemetry::init_tracing("trcbridge");
    if guard.is_exporting() {
        debug!("exporting spans over OTLP");
    }

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    debug!(path = %config_path.display(), "using config file");

    let result = match &cli.command {
        Command::Convert(args) => run_convert(args, &config_path),
        Command::Config { action: ConfigAction::Show } => show_config(&config_path),
        Command::Config { action: ConfigAction::Init { force } } => init_config(&config_path, *force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run_convert(args: &ConvertArgs, config_path: &Path) -> Result<(), CliError> {
    let mut cfg = config::load_effective(config_path)?;
    args.apply(&mut cfg);

    let mut layout = SubjectLayout::new(&args.subject, &cfg.data_dir, &cfg.output_dir);
    if let Some(suffix) = &cfg.output_suffix {
        layout = layout.with_suffix(suffix);
    }
    let job = layout.job(cfg.layout, cfg.origin.clone(), cfg.trc_options()?);

    let report = convert(&job)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn show_config(config_path: &Path) -> Result<(), CliError> {
    let cfg = config::load_effective(config_path)?;
    let source = if config_path.exists() {
        config_path.display().to_string()
    } else {
        "defaults (no config file)".to_string()
    };
    println!("{} {}", "# effective configuration from".dimmed(), source.dimmed());
    print!("{}", config::to_toml(&cfg)?);
    Ok(())
}

fn init_config(config_path: &Path, force: bool) -> Result<(), CliError> {
    config::save_to(&Config::default(), config_path, force)?;
    println!(
        "{} wrote default config to {}",
        "✓".green(),
        config_path.display().to_string().bold()
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_report(report: &ConversionReport) {
    println!(
        "{} {}",
        "✓".green().bold(),
        report.output.display().to_string().bold()
    );
    println!(
        "  {} frames from frame {}, {} landmark + {} target markers",
        report.frames,
        report.start_frame,
        report.landmark_markers.len(),
        report.target_markers.len()
    );
    if !report.origins.is_empty() {
        println!("  recorded in {}", join_names(&report.origins));
    }
    if report.filled_samples > 0 {
        println!("  {} missing samples interpolated", report.filled_samples);
    }
    if !report.blank_markers.is_empty() {
        println!(
            "  {} {}",
            "blank (no data):".yellow(),
            join_names(&report.blank_markers)
        );
    }
    if !report.omitted_markers.is_empty() {
        println!(
            "  {} {}",
            "omitted (no data):".yellow(),
            join_names(&report.omitted_markers)
        );
    }
}

fn join_names<T: std::fmt::Display>(names: &[T]) -> String {
    names
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_error(err: &CliError) {
    eprintln!("{} {err}", "error:".red().bold());
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("  {} {cause}", "caused by:".dimmed());
        source = cause.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("trcbridge").chain(args.iter().copied())).unwrap()
    }

    fn convert_args(cli: Cli) -> ConvertArgs {
        match cli.command {
            Command::Convert(args) => args,
            other => panic!("expected convert, got {other:?}"),
        }
    }

    #[test]
    fn flags_override_config() {
        let args = convert_args(parse(&[
            "convert",
            "--subject",
            "s1",
            "--frame-rate",
            "250",
            "--layout",
            "tagged",
            "--axis-labels",
            "marker-suffixed",
            "--units",
            "cm",
            "--empty-markers",
            "omit",
            "--suffix",
            "walking",
        ]));
        let mut cfg = Config::default();
        args.apply(&mut cfg);

        assert_eq!(cfg.frame_rate, 250.0);
        assert_eq!(cfg.layout, ExportLayout::Tagged);
        assert_eq!(cfg.axis_labels, AxisLabelStyle::MarkerSuffixed);
        assert_eq!(cfg.units, LengthUnit::Centimeters);
        assert_eq!(cfg.empty_markers, EmptyMarkerPolicy::Omit);
        assert_eq!(cfg.output_suffix.as_deref(), Some("walking"));
        assert_eq!(cfg.presence, PresenceRule::AllAxes);
    }

    #[test]
    fn remap_flag_sets_explicit_remap() {
        let args = convert_args(parse(&["convert", "--subject", "s1", "--remap", "x,y,z"]));
        let mut cfg = Config::default();
        args.apply(&mut cfg);
        assert_eq!(cfg.axis_remap().unwrap(), AxisRemap::IDENTITY);
    }

    #[test]
    fn convention_flags_clear_configured_remap() {
        let args = convert_args(parse(&[
            "convert", "--subject", "s1", "--from", "opensim", "--to", "visual3d",
        ]));
        let mut cfg = Config {
            remap: Some("x,y,z".to_string()),
            ..Config::default()
        };
        args.apply(&mut cfg);
        assert_eq!(cfg.axis_remap().unwrap(), AxisRemap::Z_UP_TO_Y_UP.inverse());
    }

    #[test]
    fn remap_conflicts_with_conventions() {
        let res = Cli::try_parse_from([
            "trcbridge", "convert", "--subject", "s1", "--remap", "x,y,z", "--from", "opensim",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn invalid_enum_value_is_rejected() {
        let res = Cli::try_parse_from(["trcbridge", "convert", "--subject", "s1", "--presence", "some"]);
        assert!(res.is_err());
    }

    #[test]
    fn config_init_parses_force() {
        let cli = parse(&["config", "init", "--force", "--config", "/tmp/c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Command::Config { action: ConfigAction::Init { force: true } }
        ));
    }

    #[test]
    fn convert_writes_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir_all(&data).unwrap();
        let header = "\ts1.c3d\ts1.c3d\ts1.c3d\n\tM\tM\tM\n\tLANDMARK\tLANDMARK\tLANDMARK\n\tPROCESSED\tPROCESSED\tPROCESSED\n";
        std::fs::write(data.join("s1_landmarks.tsv"), format!("{header}1\t0.1\t0.2\t0.3\n")).unwrap();
        let targets = header.replace("\tM", "\tT");
        std::fs::write(data.join("s1_targets.tsv"), format!("{targets}1\t1\t1\t1\n")).unwrap();

        let out = dir.path().join("out");
        let data_arg = data.to_string_lossy().into_owned();
        let out_arg = out.to_string_lossy().into_owned();
        let args = convert_args(parse(&[
            "convert", "--subject", "s1", "--data-dir", &data_arg, "--output-dir", &out_arg,
            "--suffix", "walking",
        ]));

        let missing_config = dir.path().join("absent.toml");
        run_convert(&args, &missing_config).unwrap();
        let text = std::fs::read_to_string(out.join("s1_walking.trc")).unwrap();
        assert!(text.lines().nth(3).unwrap().starts_with("Frame#\tTime\tM\t\t\tT"));
    }
}
