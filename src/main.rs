use anyhow::{bail, Context, Result};
use salesboard::{
    config::ReportConfig,
    dashboard::{Dashboard, ViewStatus},
    run_pipeline,
    schema::columns::TOTAL_SALES_FORMATTED,
};
use std::{env, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: salesboard [SOURCE] [--config <salesboard.yaml>]";

fn print_report(dash: &Dashboard) {
    println!("Sales Dashboard");
    match dash.last_updated {
        Some(d) => println!("Last updated: {}", d.format("%d %b %Y")),
        None => println!("Last updated: n/a"),
    }
    let or_na = |v: Option<String>| v.unwrap_or_else(|| "n/a".to_string());
    println!(
        "{} rows, {} units, total sales {}\n",
        dash.rows,
        or_na(dash.total_units.map(|u| u.to_string())),
        or_na(dash.total_sales.map(|a| a.to_string()))
    );

    for view in &dash.views {
        println!("== {} [{:?}]", view.kind.title(), view.status());
        let content = match &view.outcome {
            Ok(c) => c,
            Err(e) => {
                println!("   ! {}\n", e);
                continue;
            }
        };
        for w in &content.warnings {
            println!("   ! {}", w);
        }
        match &content.aggregation {
            Some(agg) => {
                let mut header = format!(
                    "   {:<32} {:>16}",
                    agg.spec.key_columns().join(" / "),
                    agg.spec.value_columns()[0]
                );
                if agg.spec.includes_units() {
                    header.push_str(&format!(" {:>16}", agg.spec.value_columns()[1]));
                }
                if !content.formatted.is_empty() {
                    header.push_str(&format!("  {}", TOTAL_SALES_FORMATTED));
                }
                println!("{}", header);
                for (i, row) in agg.rows.iter().enumerate() {
                    let mut line = format!(
                        "   {:<32} {:>16}",
                        row.labels().join(" / "),
                        row.total_sales.to_string()
                    );
                    if agg.spec.includes_units() {
                        line.push_str(&format!(" {:>10} units", row.units_sold));
                    }
                    if let Some(f) = content.formatted.get(i) {
                        line.push_str(&format!("  ({})", f));
                    }
                    println!("{}", line);
                }
            }
            None => println!(
                "   {} rows x {} columns",
                content.export.num_rows(),
                content.export.columns.len()
            ),
        }
        println!();
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr) // stdout carries the report
        .init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) args + config ────────────────────────────────────────────
    let mut source: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ if source.is_none() => source = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {:?}\n{}", arg, USAGE),
        }
    }

    let mut cfg = ReportConfig::load(config_path.as_deref())
        .context("loading report config")?
        .with_env_overrides(|key| env::var(key).ok());
    if let Some(src) = source {
        cfg.source = src;
    }
    info!(source = %cfg.source.display(), output = %cfg.output_dir.display(), "startup");

    // ─── 3) load + aggregate ─────────────────────────────────────────
    let dashboard = run_pipeline(&cfg.source, &cfg.load_options(), &cfg.aggregate_options())
        .with_context(|| format!("building dashboard from {}", cfg.source.display()))?;

    // ─── 4) present ──────────────────────────────────────────────────
    print_report(&dashboard);

    // ─── 5) downloads ────────────────────────────────────────────────
    let written = dashboard
        .write_artifacts(&cfg.output_dir, &cfg.formats)
        .with_context(|| format!("writing downloads to {}", cfg.output_dir.display()))?;

    let failed = dashboard
        .views
        .iter()
        .filter(|v| v.status() == ViewStatus::Failed)
        .count();
    if failed > 0 {
        warn!(failed, "some views could not be built");
    }
    info!(files = written.len(), dir = %cfg.output_dir.display(), "all done");
    Ok(())
}
