use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use channel_split::{
    CampaignFile, IntegerStrategy, Metric, OptimizationMode, SplitReport, UnitOutcome,
    optimize_split,
};

#[derive(Parser)]
#[command(author, version, about = "Split a TV campaign budget across channels")]
struct Cli {
    /// Campaign file (TOML)
    campaign: PathBuf,
    /// Total budget, overrides the file
    #[arg(long)]
    budget: Option<f64>,
    /// Objective metric: affinity | rating
    #[arg(long)]
    metric: Option<Metric>,
    /// Optimization mode: per_group | global
    #[arg(long)]
    mode: Option<OptimizationMode>,
    /// round | round_and_repair | branch_and_bound
    #[arg(long)]
    integer_strategy: Option<IntegerStrategy>,
    /// Solver time limit per unit, in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file = CampaignFile::load(&cli.campaign)?;
    let catalog = file.catalog()?;
    let mut params = file.params()?;

    if let Some(budget) = cli.budget {
        params.total_budget = budget;
    }
    if let Some(metric) = cli.metric {
        params.metric = metric;
    }
    if let Some(mode) = cli.mode {
        params.mode = mode;
    }
    if let Some(strategy) = cli.integer_strategy {
        params.integer_strategy = strategy;
    }
    if let Some(ms) = cli.time_limit_ms {
        params.solver.time_limit = Some(Duration::from_millis(ms));
    }

    let report = optimize_split(&catalog, &params)
        .with_context(|| format!("optimizing {}", cli.campaign.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SplitReport) {
    println!(
        "mode {}  metric {}  budget {:.2}  solver {}",
        report.mode, report.metric, report.total_budget, report.solver
    );

    for outcome in &report.units {
        match outcome {
            UnitOutcome::Solved(unit) => {
                println!();
                println!(
                    "[{}] budget {:.2}  spent {:.2}",
                    unit.unit, unit.budget, unit.realized_spend
                );
                println!(
                    "  {:<14} {:>10} {:>8} {:>8} {:>6} {:>12} {:>8} {:>8}",
                    "channel", "price", "rating", "aff", "slots", "spend", "std %", "opt %"
                );
                for row in &unit.rows {
                    println!(
                        "  {:<14} {:>10.2} {:>8.2} {:>8.2} {:>6} {:>12.2} {:>8.2} {:>8.2}",
                        row.channel_id,
                        row.price,
                        row.rating,
                        row.affinity,
                        row.slots,
                        row.realized_spend,
                        row.baseline_share_pct,
                        row.spend_share_pct
                    );
                }
                for v in &unit.violations {
                    println!(
                        "  ! {:?} {} by {:.2}",
                        v.kind,
                        v.channel_id.as_deref().unwrap_or("budget"),
                        v.amount
                    );
                }
            }
            UnitOutcome::Failed(failure) => {
                println!();
                println!("[{}] skipped: {}", failure.unit, failure.message);
            }
        }
    }

    let t = &report.totals;
    println!();
    println!(
        "total spend {:.2} ({:.1}% of budget)  {} {:.2}  rating {:.2}  affinity {:.2}  slots {}",
        t.realized_spend,
        report.budget_utilisation_pct,
        report.metric,
        t.objective_value,
        t.total_rating,
        t.total_affinity,
        t.slots
    );
}
