use std::path::PathBuf;

use clap::Parser;
use pathwarp::kurbo::Point;
use pathwarp::{Orientation, StraightenSettings, WarpConfig, WarpError, Warping};
use serde::Deserialize;
use serde_json::json;

#[derive(Parser)]
#[command(name = "pathwarp", about = "Warp points around a curved path onto a straight line")]
struct Cli {
    /// GeoJSON LineString (or Feature wrapping one) describing the path
    #[arg(short, long)]
    path: PathBuf,

    /// JSON preset for WarpConfig; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of resampled path points (derived from the path if omitted)
    #[arg(short, long)]
    samples: Option<usize>,

    /// Lateral strips on each side of the path
    #[arg(long)]
    strips: Option<usize>,

    /// Relaxation force in [0, 1]
    #[arg(long)]
    force: Option<f64>,

    /// Relaxation passes
    #[arg(long)]
    iterations: Option<usize>,

    /// Keep the original grid exactly as built
    #[arg(long)]
    no_straighten: bool,

    /// Extra relaxation passes allowed while the grid is still folded
    #[arg(long)]
    untangle_passes: Option<usize>,

    /// RDP simplification tolerance in coordinate units (0 = off)
    #[arg(long)]
    simplify: Option<f64>,

    /// Extend both path ends by this fraction of its length (0 = off)
    #[arg(long)]
    extend: Option<f64>,

    /// Unroll the path bottom to top instead of along its bearing
    #[arg(long)]
    northward: bool,

    /// Point to warp, as "x,y" (repeatable)
    #[arg(long = "point", value_parser = parse_point, allow_hyphen_values = true)]
    points: Vec<Point>,

    /// Map points from the straight frame back to the curved one
    #[arg(long)]
    inverse: bool,

    /// Include both grid zones in the output
    #[arg(long)]
    zone: bool,

    /// Write a side-by-side PNG of both grids
    #[arg(long)]
    render: Option<PathBuf>,

    /// Edge length of each rendered panel, in pixels
    #[arg(long, default_value = "800")]
    panel: u32,
}

/// Accepts a bare LineString or a Feature holding one.
#[derive(Deserialize)]
#[serde(untagged)]
enum PathDocument {
    Feature { geometry: LineStringDocument },
    Geometry(LineStringDocument),
}

#[derive(Deserialize)]
struct LineStringDocument {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<Vec<f64>>,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"x,y\", got {:?}", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(Point::new(x, y))
}

fn load_path(file: &std::path::Path) -> Result<pathwarp::Path, Box<dyn std::error::Error>> {
    let document: PathDocument = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    let line = match document {
        PathDocument::Feature { geometry } | PathDocument::Geometry(geometry) => geometry,
    };
    if line.kind != "LineString" {
        return Err(format!("expected a LineString, got {}", line.kind).into());
    }
    let points = line
        .coordinates
        .iter()
        .map(|c| match c.as_slice() {
            [x, y, ..] => Ok(Point::new(*x, *y)),
            _ => Err(format!("position {:?} has fewer than 2 coordinates", c)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pathwarp::Path::new(points)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(file) => serde_json::from_str(&std::fs::read_to_string(file)?)?,
        None => WarpConfig::default(),
    };
    if cli.samples.is_some() {
        config.samples = cli.samples;
    }
    if let Some(strips) = cli.strips {
        config.strips_per_side = strips;
    }
    if let Some(passes) = cli.untangle_passes {
        config.untangle_passes = passes;
    }
    if let Some(epsilon) = cli.simplify {
        config.simplify_epsilon = epsilon;
    }
    if let Some(extension) = cli.extend {
        config.extension = extension;
    }
    if cli.northward {
        config.orientation = Orientation::Northward;
    }
    if cli.no_straighten {
        config.straighten = None;
    } else if cli.force.is_some() || cli.iterations.is_some() {
        let base = config.straighten.unwrap_or_default();
        config.straighten = Some(StraightenSettings {
            force: cli.force.unwrap_or(base.force),
            iterations: cli.iterations.unwrap_or(base.iterations),
        });
    }

    // Header
    eprintln!();
    eprintln!("  pathwarp \u{00b7} {}", cli.path.display());
    eprintln!();

    let path = load_path(&cli.path)?;
    eprintln!("  Load        {} vertices, length {:.6}", path.len(), path.length());

    let warping = Warping::new(&path, &config)?;
    let grids = warping.grids();
    eprintln!(
        "  Grids       {} steps \u{00b7} {} strips per side \u{00b7} {} triangles each",
        grids.steps,
        grids.strips_per_side,
        grids.original.len()
    );
    let inverted = warping.inverted_triangles();
    if !inverted.is_empty() {
        eprintln!("  Folds       {} inverted triangles", inverted.len());
    }

    let mut outside = 0usize;
    let warped: Vec<_> = cli
        .points
        .iter()
        .map(|&p| {
            let result = if cli.inverse {
                warping.unwarp(p)
            } else {
                warping.warp(p)
            };
            match result {
                Ok(q) => json!({ "input": [p.x, p.y], "output": [q.x, q.y] }),
                Err(e) => {
                    if matches!(e, WarpError::PointOutsideGrid { .. }) {
                        outside += 1;
                    }
                    json!({ "input": [p.x, p.y], "error": e.to_string() })
                }
            }
        })
        .collect();
    if !cli.points.is_empty() {
        eprintln!(
            "  Warp        {} points ({} outside the grid)",
            cli.points.len(),
            outside
        );
    }

    let bbox = |r: Option<pathwarp::geo::Rect<f64>>| {
        r.map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
    };
    let mut output = json!({
        "points": warped,
        "original_bbox": bbox(warping.original_bbox()),
        "warped_bbox": bbox(warping.warped_bbox()),
        "inverted": inverted.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
    });
    if cli.zone {
        let ring = |zone: &pathwarp::Zone| {
            zone.ring().iter().map(|p| [p.x, p.y]).collect::<Vec<_>>()
        };
        output["original_zone"] = json!(ring(warping.original_zone()));
        output["warped_zone"] = json!(ring(warping.warped_zone()));
    }

    if let Some(render_path) = &cli.render {
        pathwarp::render::render_grids_to_file(grids, cli.panel, render_path)?;
        eprintln!("  Render      {}", render_path.display());
    }

    println!("{}", serde_json::to_string_pretty(&output)?);

    // Footer
    eprintln!();
    eprintln!("  \u{2713} done");
    eprintln!();

    Ok(())
}
