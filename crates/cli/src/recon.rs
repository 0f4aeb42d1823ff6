//! `crecon run|validate|rates`: config-driven courier charge reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use courier_recon::aggregate::{COL_DIFFERENCE, COL_WEIGHT_KG};
use courier_recon::config::{RateFormat, ReconConfig};
use courier_recon::engine::{load_rate_card, load_shipment_rows};
use courier_recon::money::{format_minor, MINOR_PER_MAJOR};
use courier_recon::{RateCard, ReconInput, ReconResult};

use crate::exit_codes::{
    recon_exit_code, EXIT_ERROR, EXIT_RECON_DISCREPANCY, EXIT_RECON_RUNTIME, EXIT_RECON_SKIPPED,
};
use crate::export::write_rows_csv;
use crate::CliError;

/// How many skipped rows the human summary lists before eliding.
const SKIPPED_PREVIEW: usize = 10;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile billed charges against the rate card
    #[command(after_help = "\
Examples:
  crecon run courier.recon.toml
  crecon run courier.recon.toml --json
  crecon run courier.recon.toml --output result.json --rows-csv rows.csv")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the JSON result to stdout (summary still goes to stderr)
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write priced rows (with slab, expected charge, difference) as CSV
        #[arg(long)]
        rows_csv: Option<PathBuf>,

        /// Suppress the human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Validate a recon config and its rate card without running
    #[command(after_help = "\
Examples:
  crecon validate courier.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// Print the rate table a config resolves to
    #[command(after_help = "\
Examples:
  crecon rates courier.recon.toml
  crecon rates courier.recon.toml --json")]
    Rates {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, output, rows_csv, quiet } => {
            cmd_recon_run(config, json, output, rows_csv, quiet)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
        ReconCommands::Rates { config, json } => cmd_recon_rates(config, json),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: courier_recon::ReconError) -> CliError {
    let cli_err = recon_err(recon_exit_code(&err), err.to_string());
    match err {
        courier_recon::ReconError::SchemaMismatch { ref source, .. } if source == "shipments" => {
            cli_err.with_hint("check [shipments.columns] against the CSV header row")
        }
        courier_recon::ReconError::SchemaMismatch { .. } => {
            cli_err.with_hint("check [rates] prefix against the rate card header row")
        }
        _ => cli_err,
    }
}

/// Parse and validate the config at `path`.
fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read config {}: {e}", path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(engine_err)
}

/// Directory config-relative paths resolve against.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn read_data_file(base: &Path, file: &str) -> Result<String, CliError> {
    let path = base.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

fn resolve_rate_card(config: &ReconConfig, base: &Path) -> Result<RateCard, CliError> {
    let csv_data = match (config.rates.format, &config.rates.file) {
        (RateFormat::Inline, _) | (_, None) => None,
        (_, Some(file)) => Some(read_data_file(base, file)?),
    };
    load_rate_card(&config.rates, csv_data.as_deref()).map_err(engine_err)
}

fn cmd_recon_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    rows_csv: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base = base_dir(&config_path);

    // Flags win over [output]; config paths are relative to the config file.
    let output_file = output_file.or_else(|| config.output.json.as_ref().map(|p| base.join(p)));
    let rows_csv = rows_csv.or_else(|| config.output.rows_csv.as_ref().map(|p| base.join(p)));
    if let (Some(a), Some(b)) = (&output_file, &rows_csv) {
        if a == b {
            return Err(CliError::args("--output and --rows-csv must be different files"));
        }
    }

    let rates = resolve_rate_card(&config, base)?;
    let shipments_path = base.join(&config.shipments.file);
    let shipments_file = std::fs::File::open(&shipments_path).map_err(|e| {
        recon_err(EXIT_RECON_RUNTIME, format!("cannot read {}: {e}", shipments_path.display()))
    })?;
    let shipments = load_shipment_rows(shipments_file, &config.shipments.columns).map_err(engine_err)?;

    let input = ReconInput { shipments, rates };
    let result = courier_recon::run(&config, &input).map_err(engine_err)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot write output: {e}")))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref path) = rows_csv {
        let file = std::fs::File::create(path)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("cannot create {}: {e}", path.display())))?;
        write_rows_csv(&result.rows, file).map_err(|e| recon_err(EXIT_RECON_RUNTIME, e))?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        println!("{json_str}");
    }

    if !quiet {
        print_summary(&result);
    }

    let s = &result.summary;
    if s.overcharged > 0 || s.undercharged > 0 {
        return Err(recon_err(EXIT_RECON_DISCREPANCY, "discrepancies found"));
    }
    if s.skipped > 0 {
        return Err(recon_err(EXIT_RECON_SKIPPED, format!("{} row(s) could not be priced", s.skipped)));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    eprintln!(
        "{}: {} orders: {} correct, {} overcharged, {} undercharged, {} skipped",
        result.meta.config_name, s.total_orders, s.correct, s.overcharged, s.undercharged, s.skipped,
    );
    eprintln!(
        "billed {} vs expected {} (over {}, under {}, net {})",
        format_minor(s.total_billed_minor),
        format_minor(s.total_expected_minor),
        format_minor(s.overcharged_minor),
        format_minor(s.undercharged_minor),
        format_minor(s.net_difference_minor),
    );

    for z in &result.aggregates.by_zone {
        eprintln!(
            "  zone {:<8} {:>6} orders, mean difference {:>10.2}",
            z.zone,
            z.count,
            z.mean_difference_minor / MINOR_PER_MAJOR as f64,
        );
    }

    if !result.aggregates.slab_distribution.is_empty() {
        let slabs: Vec<String> = result
            .aggregates
            .slab_distribution
            .iter()
            .map(|s| format!("{} x{}", s.slab, s.count))
            .collect();
        eprintln!("  slabs: {}", slabs.join(", "));
    }

    if let Some(r) = result
        .aggregates
        .correlation
        .as_ref()
        .and_then(|m| m.get(COL_WEIGHT_KG, COL_DIFFERENCE))
    {
        eprintln!("  correlation weight/difference: {r:.3}");
    }

    for skipped in result.skipped.iter().take(SKIPPED_PREVIEW) {
        eprintln!("  skipped line {} ({}): {}", skipped.line, skipped.order_id, skipped.error);
    }
    if result.skipped.len() > SKIPPED_PREVIEW {
        eprintln!("  ... and {} more skipped", result.skipped.len() - SKIPPED_PREVIEW);
    }
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let rates = resolve_rate_card(&config, base_dir(&config_path))?;

    let zones: Vec<&str> = rates.zones().map(|(z, _)| z).collect();
    eprintln!(
        "valid: \"{}\" ({} rate card, {} zone(s): {})",
        config.name,
        config.rates.format,
        zones.len(),
        zones.join(", "),
    );
    Ok(())
}

fn cmd_recon_rates(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let rates = resolve_rate_card(&config, base_dir(&config_path))?;

    if json_output {
        let json_str = serde_json::to_string_pretty(&rates)
            .map_err(|e| recon_err(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    println!("{:<12} {:>10} {:>12}", "zone", "fixed", "additional");
    for (zone, rate) in rates.zones() {
        println!(
            "{:<12} {:>10} {:>12}",
            zone,
            format_minor(rate.fixed_minor),
            format_minor(rate.additional_minor),
        );
    }
    Ok(())
}
