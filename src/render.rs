//! Raster rendering of grids for visual inspection.
//!
//! Strokes grid triangles and the centerline via tiny-skia and produces a side-by-side PNG: original grid on the left, warped grid on
//! the right, centerline highlighted in both.

use std::path::Path;

use kurbo::{Point, Rect};

use crate::error::WarpError;
use crate::grid::{grid_to_points, Grid, Grids};

const PADDING: u32 = 20;
const SEPARATOR: u32 = 2;

/// Apply transform manually to a point (f64 → f32).
///
/// Geographic coordinates are transformed in f64 first: degrees with many
/// significant digits lose too much precision as f32.
fn transform_point(p: Point, t: tiny_skia::Transform) -> (f32, f32) {
    (
        (t.sx as f64 * p.x + t.kx as f64 * p.y + t.tx as f64) as f32,
        (t.ky as f64 * p.x + t.sy as f64 * p.y + t.ty as f64) as f32,
    )
}

/// Encode a pixmap to PNG bytes.
fn encode_png(pixmap: &tiny_skia::Pixmap) -> Result<Vec<u8>, WarpError> {
    let mut buf = Vec::new();
    let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixmap.data())?;
    writer.finish()?;
    Ok(buf)
}

/// Every triangle as a closed sub-path, in panel pixels.
fn triangles_path(grid: &Grid, transform: tiny_skia::Transform) -> Option<tiny_skia::Path> {
    let mut pb = tiny_skia::PathBuilder::new();
    for t in grid.triangles() {
        let [a, b, c] = t.vertices.map(|p| transform_point(p, transform));
        pb.move_to(a.0, a.1);
        pb.line_to(b.0, b.1);
        pb.line_to(c.0, c.1);
        pb.close();
    }
    pb.finish()
}

/// Offset-0 points of every row, in order, in panel pixels.
fn centerline_path(
    grid: &Grid,
    steps: usize,
    transform: tiny_skia::Transform,
) -> Result<Option<tiny_skia::Path>, WarpError> {
    let points = grid_to_points(grid, steps)?;
    let mut pb = tiny_skia::PathBuilder::new();
    for row in 0..=steps {
        let Some(p) = points.get(row, 0) else {
            continue;
        };
        let (x, y) = transform_point(p, transform);
        if row == 0 {
            pb.move_to(x, y);
        } else {
            pb.line_to(x, y);
        }
    }
    Ok(pb.finish())
}

/// Fit `bounds` into a square panel, Y flipped so north is up.
fn panel_transform(bounds: Rect, panel: u32) -> tiny_skia::Transform {
    let content = (panel - PADDING * 2) as f64;
    let extent = bounds.width().max(bounds.height());
    let s = if extent > 0.0 { content / extent } else { 1.0 };
    let ox = PADDING as f64 + (content - bounds.width() * s) / 2.0;
    let oy = PADDING as f64 + (content - bounds.height() * s) / 2.0;
    tiny_skia::Transform {
        sx: s as f32,
        kx: 0.0,
        ky: 0.0,
        sy: -(s as f32),
        tx: (ox - s * bounds.x0) as f32,
        ty: (oy + s * bounds.y1) as f32,
    }
}

fn render_panel(grid: &Grid, steps: usize, panel: u32) -> Result<tiny_skia::Pixmap, WarpError> {
    let mut pixmap = tiny_skia::Pixmap::new(panel, panel)
        .ok_or_else(|| WarpError::Render(format!("invalid panel size {}", panel)))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    let Some(bounds) = grid.bounding_box() else {
        return Ok(pixmap);
    };
    let transform = panel_transform(bounds, panel);

    let mut mesh_paint = tiny_skia::Paint::default();
    mesh_paint.set_color(tiny_skia::Color::from_rgba8(90, 90, 90, 255));
    mesh_paint.anti_alias = true;
    let mesh_stroke = tiny_skia::Stroke {
        width: 1.0,
        ..tiny_skia::Stroke::default()
    };
    if let Some(sk_path) = triangles_path(grid, transform) {
        pixmap.stroke_path(
            &sk_path,
            &mesh_paint,
            &mesh_stroke,
            tiny_skia::Transform::identity(),
            None,
        );
    }

    let mut line_paint = tiny_skia::Paint::default();
    line_paint.set_color(tiny_skia::Color::from_rgba8(220, 30, 30, 255));
    line_paint.anti_alias = true;
    let line_stroke = tiny_skia::Stroke {
        width: 2.5,
        ..tiny_skia::Stroke::default()
    };
    if let Some(sk_path) = centerline_path(grid, steps, transform)? {
        pixmap.stroke_path(
            &sk_path,
            &line_paint,
            &line_stroke,
            tiny_skia::Transform::identity(),
            None,
        );
    }
    Ok(pixmap)
}

/// Render both grids side by side and return PNG bytes.
///
/// `panel` is the edge length of each square panel, in pixels.
pub fn render_grids(grids: &Grids, panel: u32) -> Result<Vec<u8>, WarpError> {
    if panel <= PADDING * 2 {
        return Err(WarpError::Render(format!(
            "panel size {} leaves no room inside the {} px padding",
            panel, PADDING
        )));
    }
    let original = render_panel(&grids.original, grids.steps, panel)?;
    let warped = render_panel(&grids.warped, grids.steps, panel)?;

    // ── Composite ──
    let total_w = panel * 2 + SEPARATOR;
    let mut composite = tiny_skia::Pixmap::new(total_w, panel)
        .ok_or_else(|| WarpError::Render(format!("invalid composite size {}x{}", total_w, panel)))?;
    composite.fill(tiny_skia::Color::from_rgba8(200, 200, 200, 255));
    for y in 0..panel {
        for x in 0..panel {
            let idx = (y * panel + x) as usize;
            composite.pixels_mut()[(y * total_w + x) as usize] = original.pixels()[idx];
            composite.pixels_mut()[(y * total_w + panel + SEPARATOR + x) as usize] =
                warped.pixels()[idx];
        }
    }
    log::debug!("rendered grids into {}x{} px", total_w, panel);
    encode_png(&composite)
}

/// Render both grids side by side into a PNG file.
pub fn render_grids_to_file(grids: &Grids, panel: u32, output: &Path) -> Result<(), WarpError> {
    let png_data = render_grids(grids, panel)?;
    std::fs::write(output, png_data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::build_grids;

    #[test]
    fn renders_a_png() {
        let path = crate::path::Path::new(vec![
            kurbo::Point::new(2.35, 48.85),
            kurbo::Point::new(2.36, 48.86),
            kurbo::Point::new(2.38, 48.86),
        ])
        .unwrap();
        let grids = build_grids(&path, 2).unwrap();
        let png_data = render_grids(&grids, 200).unwrap();
        assert_eq!(&png_data[1..4], b"PNG");
    }

    #[test]
    fn rejects_tiny_panels() {
        let path = crate::path::Path::new(vec![
            kurbo::Point::new(0.0, 0.0),
            kurbo::Point::new(1.0, 0.0),
            kurbo::Point::new(2.0, 1.0),
        ])
        .unwrap();
        let grids = build_grids(&path, 1).unwrap();
        assert!(matches!(render_grids(&grids, 30), Err(WarpError::Render(_))));
    }

    #[test]
    fn panel_paths_cover_every_triangle_and_row() {
        let path = crate::path::Path::new(vec![
            kurbo::Point::new(0.0, 0.0),
            kurbo::Point::new(1.0, 0.0),
            kurbo::Point::new(2.0, 1.0),
        ])
        .unwrap();
        let grids = build_grids(&path, 1).unwrap();
        let bounds = grids.original.bounding_box().unwrap();
        let transform = panel_transform(bounds, 200);

        let mesh = triangles_path(&grids.original, transform).unwrap();
        let moves = mesh
            .segments()
            .filter(|s| matches!(s, tiny_skia::PathSegment::MoveTo(_)))
            .count();
        assert_eq!(moves, grids.original.len());
        let b = mesh.bounds();
        assert!(b.left() >= PADDING as f32 - 1e-3 && b.right() <= 180.0 + 1e-3);
        assert!(b.top() >= PADDING as f32 - 1e-3 && b.bottom() <= 180.0 + 1e-3);

        let line = centerline_path(&grids.original, grids.steps, transform)
            .unwrap()
            .unwrap();
        assert_eq!(line.len(), grids.steps + 1);
        // North is up: the last centerline point is higher than the first.
        let first = transform_point(path.points()[0], transform);
        let last = transform_point(path.points()[2], transform);
        assert!(last.1 < first.1);
    }
}
