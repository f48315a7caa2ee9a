use std::io::Write as _;
use std::process::ExitCode;

use anyhow::{Context, Result};
use busmap_cli::{busdef, component, emitter, Cli, Commands};
use busmap_core::{infer_bus_interfaces, BundleTree, EngineConfig};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Commands::Propose { component_json5, bus_def_dir, output, debug, no_progress } => {
            run_propose(component_json5, bus_def_dir, output.as_deref(), *debug, *no_progress)
        }
        Commands::Bundle { component_json5, output } => run_bundle(component_json5, output.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run_propose(
    component_json5: &std::path::Path,
    bus_def_dir: &std::path::Path,
    output: Option<&std::path::Path>,
    debug: bool,
    no_progress: bool,
) -> Result<()> {
    let ports = component::load_ports(component_json5)?;
    info!("loaded {} ports from {}", ports.len(), component_json5.display());

    let spec_paths = busdef::discover_spec_paths(bus_def_dir);
    if spec_paths.is_empty() {
        anyhow::bail!("no bus-def spec files found under {}", bus_def_dir.display());
    }

    let progress = (!no_progress).then(|| {
        let bar = ProgressBar::new(spec_paths.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} bus-def specs {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    });

    let mut bus_defs = Vec::new();
    for path in &spec_paths {
        match busdef::bus_defs_from_spec(path) {
            Ok(defs) => bus_defs.extend(defs),
            Err(err) => error!("skipping malformed bus-def `{}`: {err:?}", path.display()),
        }
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    info!("loaded {} bus definitions", bus_defs.len());

    let cfg = EngineConfig::default();
    let groups = infer_bus_interfaces(&ports, &bus_defs, &cfg);
    info!("inferred {} candidate bus interfaces", groups.len());

    if debug {
        for group in &groups {
            for mapping in &group.mappings {
                info!(
                    "{}: {} ({}) cost={:.3} fcost={:.3} lp_fallback={} degenerate={}",
                    group.interface.prefix,
                    mapping.bus_def.abstract_type.name,
                    mapping.bus_def.driver_type,
                    mapping.cost.value(&cfg),
                    mapping.fcost.value(&cfg),
                    mapping.used_lp_fallback,
                    mapping.degenerate,
                );
            }
        }
    }

    let candidate_file = emitter::build_candidate_file(&groups);
    write_json(&candidate_file, output)
}

fn run_bundle(component_json5: &std::path::Path, output: Option<&std::path::Path>) -> Result<()> {
    let ports = component::load_ports(component_json5)?;
    info!("loaded {} ports from {}", ports.len(), component_json5.display());
    let tree = BundleTree::new(ports);
    let value = emitter::bundle_tree_json(&tree);
    write_json(&value, output)
}

fn write_json<T: serde::Serialize>(value: &T, output: Option<&std::path::Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serializing output as JSON")?;
    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("writing output to {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            writeln!(lock, "{text}")?;
        }
    }
    Ok(())
}
