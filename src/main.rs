use std::process;

use anyhow::Context;
use clap::Parser;
use dxf2geo::cli::{Cli, Commands, ExtractArgs, PreviewArgs};
use dxf2geo::{extract_geometries, load_geometries, plot_geometries};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Extract(args) => extract(args, cli.log_level.as_deref()),
        Commands::Preview(args) => preview(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn extract(args: &ExtractArgs, log_level: Option<&str>) -> anyhow::Result<()> {
    let options = args.resolve(log_level).context("invalid export settings")?;
    let report = extract_geometries(&options)
        .with_context(|| format!("exporting {}", options.source.display()))?;

    for unit in &report.units {
        let failure = unit.failure.as_deref().unwrap_or("");
        println!(
            "{:<16} written {:>6}  skipped {:>6}  {}  {failure}",
            unit.name,
            unit.written,
            unit.skipped,
            unit.path.display()
        );
    }
    println!("log: {}", report.log_path.display());
    Ok(())
}

fn preview(args: &PreviewArgs) -> anyhow::Result<()> {
    let mut collection = load_geometries(&args.input, args.geometry_types.as_deref())
        .with_context(|| format!("loading {}", args.input.display()))?;
    if args.modelspace_only {
        collection = collection.modelspace_only();
    }
    plot_geometries(&collection, &args.output_html)
        .with_context(|| format!("writing {}", args.output_html.display()))?;
    println!("{} features -> {}", collection.len(), args.output_html.display());
    Ok(())
}
