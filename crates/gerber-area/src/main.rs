use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use gerber_area::{
    parse, BBox, BoardProgram, ComposeOptions, CompositeArea, CompositeWorker, DrawItem,
    ParseOptions, Unit, Warning,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "gerber-area",
    about = "Interpret an RS-274X Gerber layer into shapes and board area"
)]
struct Cli {
    /// RS-274X layer to interpret
    input: PathBuf,

    /// Where to write the JSON report (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Indent the JSON report
    #[arg(long)]
    pretty: bool,

    /// Also compose the layer into a single area
    #[arg(long)]
    compose: bool,

    /// Stroke circular draws instead of filling them as pie wedges
    #[arg(long)]
    stroke_arcs: bool,

    /// Segments per full turn when flattening curves for --compose
    #[arg(long, default_value_t = ComposeOptions::default().segments_per_turn)]
    segments: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    unit: Unit,
    bounds: BBox,
    stopped: bool,
    items: &'a [DrawItem],
    warnings: &'a [Warning],
    #[serde(skip_serializing_if = "Option::is_none")]
    composite: Option<CompositeReport>,
}

#[derive(Serialize)]
struct CompositeReport {
    area: f64,
    #[serde(flatten)]
    shapes: CompositeArea,
}

fn run_compose(program: BoardProgram, segments: usize) -> Result<CompositeArea, String> {
    let worker = CompositeWorker::new(
        Arc::new(program),
        ComposeOptions {
            segments_per_turn: segments,
        },
    );
    let job = worker.start().map_err(|e| e.to_string())?;
    for fraction in job.progress.iter() {
        eprint!("\rComposing: {:3.0}%", fraction * 100.0);
        let _ = std::io::stderr().flush();
    }
    eprintln!();
    job.wait().map_err(|e| e.to_string())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let data = match std::fs::read(&cli.input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: cannot read {}: {e}", cli.input.display());
            std::process::exit(1);
        }
    };
    let text = String::from_utf8_lossy(&data);

    let options = ParseOptions {
        stroke_circular_draws: cli.stroke_arcs,
    };
    let output = match parse(&text, options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let composite = if cli.compose {
        match run_compose(output.program.clone(), cli.segments) {
            Ok(area) => Some(CompositeReport {
                area: area.area(),
                shapes: area,
            }),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let report = Report {
        unit: output.program.unit(),
        bounds: output.program.bounds(),
        stopped: output.stopped,
        items: output.program.items(),
        warnings: &output.warnings,
        composite,
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    let json = match json {
        Ok(j) => j,
        Err(e) => {
            eprintln!("Error: cannot encode report: {e}");
            std::process::exit(1);
        }
    };

    if let Some(output_path) = cli.output {
        if let Err(e) = std::fs::write(&output_path, &json) {
            eprintln!("Error writing {}: {e}", output_path.display());
            std::process::exit(1);
        }
        log::info!("report written to {}", output_path.display());
    } else {
        println!("{json}");
    }
}
