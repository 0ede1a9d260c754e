use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hazard_watch::core_modules::analytics::AnalyticsSummary;
use hazard_watch::core_modules::export::write_export;
use hazard_watch::core_modules::privacy::{self, DEFAULT_BLUR_SIGMA, Region};
use hazard_watch::{FilterParams, HazardPipeline, PipelineConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hazard_tester", about = "Drive the hazard engine from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the generator for a number of ticks and print the live panel and a summary.
    Simulate(SimulateArgs),
    /// Run the generator and write the filtered detections to road_hazard_data.json.
    Export(ExportArgs),
    /// Blur rectangular regions of an image and write the result as PNG.
    Blur(BlurArgs),
    /// Serve the dashboard. Needs the `web` feature.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Ambient detections added to the map store on top of the sample fixture.
    #[arg(long, default_value_t = 20)]
    ticks: usize,
    /// Live detections added to the live panel.
    #[arg(long, default_value_t = 10)]
    live_ticks: usize,
    #[arg(long, env = "HW_SEED")]
    seed: Option<u64>,
    /// Start from an empty store instead of the five sample detections.
    #[arg(long)]
    no_fixture: bool,
    #[arg(long, env = "HW_STORE_CAPACITY")]
    capacity: Option<usize>,
}

#[derive(Debug, Args)]
struct FilterArgs {
    /// Hazard type name, or "all".
    #[arg(long = "type", default_value = "all")]
    hazard_type: String,
    #[arg(long, default_value_t = 0.2)]
    severity: f64,
    /// all, 10min, hour or day.
    #[arg(long, default_value = "all")]
    window: String,
}

impl FilterArgs {
    fn params(&self) -> FilterParams {
        FilterParams::from_raw(&self.hazard_type, self.severity, &self.window)
    }
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    filter: FilterArgs,
    /// Also report this many hazards of the selected type.
    #[arg(long, default_value_t = 0)]
    report: usize,
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    filter: FilterArgs,
    /// Directory the export file is written to.
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Debug, Args)]
struct BlurArgs {
    input: PathBuf,
    output: PathBuf,
    /// Region to blur as x1,y1,x2,y2. Repeatable.
    #[arg(long = "region", required = true)]
    regions: Vec<Region>,
    #[arg(long, default_value_t = DEFAULT_BLUR_SIGMA)]
    sigma: f32,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long, env = "HW_BIND")]
    bind: Option<String>,
}

fn pipeline_for(run: &RunArgs) -> HazardPipeline {
    let mut config = PipelineConfig {
        seed: run.seed,
        seed_fixture: !run.no_fixture,
        ..PipelineConfig::default()
    };
    if let Some(capacity) = run.capacity {
        config.store_capacity = capacity;
    }
    let mut pipeline = HazardPipeline::new(config);
    for _ in 0..run.ticks {
        pipeline.tick();
    }
    for _ in 0..run.live_ticks {
        pipeline.live_tick();
    }
    pipeline
}

fn simulate(args: &SimulateArgs) -> AnalyticsSummary {
    let mut pipeline = pipeline_for(&args.run);
    let params = args.filter.params();
    for _ in 0..args.report {
        pipeline.report_hazard(&params.selected_type);
    }

    println!("--- Live panel (newest first) ---");
    for d in pipeline.recent() {
        println!(
            "#{:<4} {:<16} conf {:>4} sev {:>3.0}% at {} ({:.5}, {:.5})",
            d.id,
            d.hazard_type.label(),
            d.confidence_percent(),
            d.severity * 100.0,
            d.time_of_day(),
            d.lat,
            d.lon
        );
    }

    let view = pipeline.view(&params);
    println!(
        "--- {} of {} detections match type={} severity>={:.2} window={} ---",
        view.detections.len(),
        view.counts.total,
        params.selected_type,
        params.severity_threshold,
        params.time_window.key()
    );
    for (hazard_type, count) in &view.counts.by_type {
        println!("{:<16} {}", hazard_type.label(), count);
    }

    let summary = pipeline.analytics();
    println!(
        "--- Average confidence {:.1}%, average severity {:.0}% ---",
        summary.average_confidence * 100.0,
        summary.average_severity * 100.0
    );
    for (band, count) in &summary.severity_bands {
        println!("{:<6} {}", band.label(), count);
    }
    summary
}

fn export(args: &ExportArgs) -> anyhow::Result<PathBuf> {
    let pipeline = pipeline_for(&args.run);
    let view = pipeline.view(&args.filter.params());
    let path = write_export(&args.dir, &view.detections)
        .with_context(|| format!("writing export to {}", args.dir.display()))?;
    println!("Exported {} detections to {}", view.detections.len(), path.display());
    Ok(path)
}

fn blur(args: &BlurArgs) -> anyhow::Result<usize> {
    let mut frame = privacy::load(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let blurred = privacy::apply_privacy(&mut frame, &args.regions, args.sigma);
    save_frame(&args.output, &frame)?;
    info!(blurred, requested = args.regions.len(), "privacy blur applied");
    println!("Blurred {} region(s). Output saved to {}", blurred, args.output.display());
    Ok(blurred)
}

fn save_frame(path: &Path, frame: &image::RgbaImage) -> anyhow::Result<()> {
    privacy::save(path, frame).with_context(|| format!("writing {}", path.display()))
}

#[cfg(feature = "web")]
async fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    use hazard_watch_dashboard::{Dashboard, ServerConfig, device_camera, start_server};

    let mut cfg = ServerConfig::from_env();
    if let Some(bind) = &args.bind {
        cfg.bind_addr = bind.clone();
    }
    let dashboard = Dashboard::launch(
        HazardPipeline::new(cfg.pipeline.clone()),
        device_camera(cfg.camera_device.clone()),
    );
    let handle = start_server(dashboard.state.clone(), &cfg).await?;
    tokio::select! {
        _ = handle => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }
    dashboard.shutdown().await;
    Ok(())
}

#[cfg(not(feature = "web"))]
async fn serve(args: &ServeArgs) -> anyhow::Result<()> {
    anyhow::bail!(
        "cannot serve on {}: hazard_tester was built without the `web` feature",
        args.bind.as_deref().unwrap_or("the default address")
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    match Cli::parse().command {
        Command::Simulate(args) => {
            simulate(&args);
        }
        Command::Export(args) => {
            export(&args)?;
        }
        Command::Blur(args) => {
            blur(&args)?;
        }
        Command::Serve(args) => serve(&args).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazard_watch::HazardType;
    use hazard_watch::core_modules::export::{EXPORT_FILE_NAME, from_json};

    #[test]
    fn parses_filters_and_regions() {
        let cli = Cli::try_parse_from([
            "hazard_tester",
            "blur",
            "in.png",
            "out.png",
            "--region",
            "0,0,10,10",
            "--region",
            "5,5,20,20",
        ])
        .unwrap();
        match cli.command {
            Command::Blur(args) => {
                assert_eq!(args.regions, vec![Region::new(0, 0, 10, 10), Region::new(5, 5, 20, 20)]);
                assert_eq!(args.sigma, DEFAULT_BLUR_SIGMA);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from([
            "hazard_tester",
            "simulate",
            "--type",
            "Speed Breaker",
            "--severity",
            "0.5",
            "--window",
            "hour",
            "--seed",
            "4",
        ])
        .unwrap();
        match cli.command {
            Command::Simulate(args) => {
                let params = args.filter.params();
                assert_eq!(params.selected_type.hazard_type(), Some(HazardType::SpeedBreaker));
                assert_eq!(params.severity_threshold, 0.5);
                assert_eq!(args.run.seed, Some(4));
                assert_eq!(args.run.ticks, 20);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_malformed_region() {
        assert!(Cli::try_parse_from(["hazard_tester", "blur", "a.png", "b.png", "--region", "1,2,3"]).is_err());
    }

    #[test]
    fn simulate_reports_selected_type() {
        let cli = Cli::try_parse_from([
            "hazard_tester",
            "simulate",
            "--ticks",
            "3",
            "--seed",
            "9",
            "--type",
            "animal",
            "--report",
            "2",
        ])
        .unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let summary = simulate(&args);
        // Live ticks stay out of the map store.
        assert_eq!(summary.total, 10);
        assert!(summary.by_type.count(HazardType::Animal) >= 2);
    }

    #[test]
    fn export_writes_filtered_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_str().unwrap().to_string();
        let cli = Cli::try_parse_from([
            "hazard_tester",
            "export",
            "--ticks",
            "10",
            "--seed",
            "5",
            "--severity",
            "0.5",
            "--dir",
            dir_arg.as_str(),
        ])
        .unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export");
        };

        let path = export(&args).unwrap();
        assert_eq!(path, dir.path().join(EXPORT_FILE_NAME));
        let exported = from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(exported.iter().all(|d| d.severity >= 0.5));
        assert!(exported.iter().any(|d| d.id == 1));
    }

    #[test]
    fn blur_round_trips_through_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.png");
        let output = dir.path().join("blurred.png");
        let frame = image::RgbaImage::from_fn(40, 30, |x, _| {
            if x % 2 == 0 {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 255])
            }
        });
        save_frame(&input, &frame).unwrap();

        let args = BlurArgs {
            input,
            output: output.clone(),
            regions: vec![Region::new(0, 0, 20, 20), Region::new(100, 100, 120, 120)],
            sigma: DEFAULT_BLUR_SIGMA,
        };
        assert_eq!(blur(&args).unwrap(), 1);
        let result = privacy::load(&output).unwrap();
        assert_eq!(result.dimensions(), (40, 30));
        assert_eq!(result.get_pixel(39, 29), frame.get_pixel(39, 29));
        assert_ne!(result.get_pixel(10, 10), frame.get_pixel(10, 10));
    }
}
