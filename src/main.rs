use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use fracturex::session::{self, MemorySessionStore};
use fracturex::{
    assess, load_config, render_summary, Bone, DetectionBox, EngineConfig, RiskAssessment,
    Submission,
};
use log::info;
use serde::de::DeserializeOwned;
use serde_json::json;

/// Classify fractures from radiograph landmarks and detector output
#[derive(Parser, Debug)]
#[command(name = "fracturex")]
#[command(about = "Fracture geometry and severity from X-ray landmarks", long_about = None)]
struct Args {
    /// Landmark submission (JSON with `session_id` and `landmarks`)
    #[arg(short, long)]
    landmarks: PathBuf,

    /// Detector output (JSON array of labeled boxes)
    #[arg(short, long)]
    detections: Option<PathBuf>,

    /// Policy file overriding the default thresholds
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bones that must have both landmarks
    #[arg(short, long, value_parser = parse_bone, num_args = 1..)]
    require: Vec<Bone>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: FormatArg,

    /// Also print renderer deformation parameters
    #[arg(long)]
    deformation: bool,

    /// Also print neurovascular risk assessments
    #[arg(long)]
    risk: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Json,
    Text,
}

/// Parse a bone name given on the command line.
fn parse_bone(name: &str) -> Result<Bone, String> {
    Bone::from_name(name).ok_or_else(|| format!("unknown bone {name:?}"))
}

/// Read and deserialize a JSON file.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|source| format!("failed to read {}: {source}", path.display()))?;
    let value = serde_json::from_str(&text)
        .map_err(|source| format!("failed to parse {}: {source}", path.display()))?;
    Ok(value)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    let submission: Submission = read_json(&args.landmarks)?;
    let detections: Vec<DetectionBox> = match &args.detections {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    info!(
        "session {}: {} landmarks, {} detections",
        submission.session_id,
        submission.landmarks.len(),
        detections.len()
    );

    let store = MemorySessionStore::new();
    session::open(&store, &submission.session_id, detections);
    let report = session::submit_with_required(&store, &submission, &args.require, &config)?;

    let deformation = if args.deformation {
        Some(session::deformation(&store, &submission.session_id, &config)?)
    } else {
        None
    };
    let risks: Option<Vec<RiskAssessment>> = if args.risk {
        Some(report.fractures.iter().map(assess).collect::<Result<Vec<_>, _>>()?)
    } else {
        None
    };

    match args.format {
        FormatArg::Json => {
            let mut output = json!({ "report": report });
            if let Some(deformation) = deformation {
                output["deformation"] = json!(deformation);
            }
            if let Some(risks) = risks {
                output["risk"] = json!(risks);
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        FormatArg::Text => {
            print!("{}", render_summary(&report));
            for params in deformation.iter().flatten() {
                println!(
                    "deformation {}: hinge = {:.2}, top = {:+.1} deg, bottom = {:+.1} deg, gap = {:.3}",
                    params.bone,
                    params.hinge_position,
                    params.rotation_top,
                    params.rotation_bottom,
                    params.gap
                );
            }
            for risk in risks.iter().flatten() {
                println!(
                    "risk {}: {:?} zone, {:?} level, {}",
                    risk.bone,
                    risk.zone,
                    risk.level,
                    risk.structures.join(", ")
                );
            }
        }
    }

    Ok(())
}
