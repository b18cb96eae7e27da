use anyhow::Result;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use migratectl::config::{init_config, Config};
use migratectl::hooks::ExtensionRegistry;
use migratectl::orchestrator::{EstimateJob, Orchestrator};
use migratectl::report::BatchReport;
use migratectl::utils::format_usd;

#[derive(Parser)]
#[command(name = "migratectl")]
#[command(
    about = "VM inventory to AWS migration cost estimator",
    long_about = "migratectl reads a VM inventory workbook (RVTools vCPU/vDisk tabs),\nmatches every host to the smallest EC2 instance type that fits it, prices\non-demand and reserved terms plus EBS storage, and writes a CSV report and\na PDF quote.\n\nHost failures never abort a batch: each host succeeds or is listed in the\nfailure summary."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate migration costs for a VM inventory
    Estimate {
        /// Path to the inventory workbook (RVTools export)
        #[arg(long)]
        input_file: PathBuf,
        /// Path to the output CSV file
        #[arg(long)]
        output_file: PathBuf,
        /// Path to the output PDF quote
        #[arg(long, default_value = "aws_migration_quote.pdf")]
        pdf_output: PathBuf,
        /// Worker pool size (overrides config)
        #[arg(long)]
        threads: Option<usize>,
        /// AWS region to price against (overrides config)
        #[arg(long)]
        region: Option<String>,
    },
    /// Initialize estimation configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".migratectl.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Estimate {
            input_file,
            output_file,
            pdf_output,
            threads,
            region,
        } => {
            if let Some(threads) = threads {
                config.estimate.workers = threads;
            }
            if let Some(region) = region {
                config.aws.region = region;
            }

            let job = EstimateJob {
                input: input_file,
                output_csv: output_file,
                output_pdf: pdf_output,
            };

            let mut orchestrator = Orchestrator::new(config, ExtensionRegistry::new());
            let report = orchestrator.run(&job).await.map_err(anyhow::Error::from)?;
            print_summary(&report, &job);
        }
        Commands::Init { output } => {
            init_config(&output)?;
        }
    }

    Ok(())
}

fn print_summary(report: &BatchReport, job: &EstimateJob) {
    let totals = report.totals();

    println!();
    println!(
        "{} {} hosts estimated, {} failed",
        style("✓").green().bold(),
        report.estimates.len(),
        report.failures.len()
    );

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Projected monthly cost (USD)", "Amount"]);
    table.add_row(vec!["On-demand".to_string(), format_usd(totals.on_demand)]);
    table.add_row(vec![
        "1-year reserved".to_string(),
        format_usd(totals.reserved_1yr),
    ]);
    table.add_row(vec![
        "3-year reserved".to_string(),
        format_usd(totals.reserved_3yr),
    ]);
    table.add_row(vec![
        "Storage".to_string(),
        format_usd(report.total_storage_monthly()),
    ]);
    println!("{table}");

    if !report.failures.is_empty() {
        println!();
        println!("{} Failed hosts:", style("!").yellow().bold());
        let mut failures = Table::new();
        failures.load_preset(UTF8_FULL);
        failures.set_header(vec!["Host", "Reason"]);
        for f in &report.failures {
            failures.add_row(vec![f.host.clone(), f.reason.clone()]);
        }
        println!("{failures}");
    }

    if !report.unpriced_types.is_empty() {
        let mut counts: Vec<(&String, &u32)> = report.unpriced_types.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        println!();
        println!("Candidate types skipped (no price available):");
        for (itype, count) in counts {
            println!("  {}: {}", itype, count);
        }
    }

    println!();
    println!(
        "Reports written to {} and {}",
        job.output_csv.display(),
        job.output_pdf.display()
    );
}
