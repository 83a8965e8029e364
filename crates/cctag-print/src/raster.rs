use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use cctag_core::GrayImage;
use cctag_detector::MarkerBank;
use png::{BitDepth, ColorType, Encoder};
use serde::{Deserialize, Serialize};

use crate::{marker_radii, PrintError};

const SUPERSAMPLE: usize = 4;

/// Canvas and pose of a single rendered marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerRenderSpec {
    pub width: usize,
    pub height: usize,
    /// Marker center, pixel centers at integer coordinates.
    pub center: [f64; 2],
    /// Outer radius along the major axis, pixels.
    pub radius: f64,
    /// Minor over major axis, `1.0` for a fronto-parallel view.
    pub aspect: f64,
    /// Major axis direction, radians from +x.
    pub angle: f64,
    pub background: u8,
    pub ink: u8,
}

impl MarkerRenderSpec {
    /// Square canvas with the marker in the middle.
    pub fn centered(size: usize, radius: f64) -> Self {
        let c = (size as f64 - 1.0) / 2.0;
        Self {
            width: size,
            height: size,
            center: [c, c],
            radius,
            aspect: 1.0,
            angle: 0.0,
            background: 255,
            ink: 0,
        }
    }

    fn validate(&self) -> Result<(), PrintError> {
        if self.width == 0 || self.height == 0 {
            return Err(PrintError::InvalidSpec("canvas must not be empty"));
        }
        Placement::from(self).validate()
    }
}

/// One marker on a sheet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub id: usize,
    pub center: [f64; 2],
    pub radius: f64,
    #[serde(default = "unit_aspect")]
    pub aspect: f64,
    #[serde(default)]
    pub angle: f64,
}

fn unit_aspect() -> f64 {
    1.0
}

impl Placement {
    pub fn new(id: usize, x: f64, y: f64, radius: f64) -> Self {
        Self {
            id,
            center: [x, y],
            radius,
            aspect: 1.0,
            angle: 0.0,
        }
    }

    fn validate(&self) -> Result<(), PrintError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PrintError::InvalidSpec("radius must be > 0"));
        }
        if !(self.aspect.is_finite() && self.aspect > 0.0 && self.aspect <= 1.0) {
            return Err(PrintError::InvalidSpec("aspect must be in (0, 1]"));
        }
        if !(self.angle.is_finite() && self.center.iter().all(|c| c.is_finite())) {
            return Err(PrintError::InvalidSpec("pose must be finite"));
        }
        Ok(())
    }
}

impl From<&MarkerRenderSpec> for Placement {
    fn from(spec: &MarkerRenderSpec) -> Self {
        Self {
            id: 0,
            center: spec.center,
            radius: spec.radius,
            aspect: spec.aspect,
            angle: spec.angle,
        }
    }
}

pub fn render_marker(
    bank: &MarkerBank,
    id: usize,
    spec: &MarkerRenderSpec,
) -> Result<GrayImage, PrintError> {
    spec.validate()?;
    let radii = marker_radii(bank, id)?;
    let mut canvas = GrayImage::filled(spec.width, spec.height, spec.background);
    draw_marker(
        &mut canvas,
        &radii,
        &Placement::from(spec),
        spec.background,
        spec.ink,
    );
    Ok(canvas)
}

/// White sheet with black markers at the given placements.
pub fn render_sheet(
    bank: &MarkerBank,
    placements: &[Placement],
    width: usize,
    height: usize,
) -> Result<GrayImage, PrintError> {
    if width == 0 || height == 0 {
        return Err(PrintError::InvalidSpec("canvas must not be empty"));
    }
    let mut canvas = GrayImage::filled(width, height, 255);
    for p in placements {
        p.validate()?;
        let radii = marker_radii(bank, p.id)?;
        draw_marker(&mut canvas, &radii, p, 255, 0);
    }
    Ok(canvas)
}

fn draw_marker(canvas: &mut GrayImage, radii: &[f32], p: &Placement, background: u8, ink: u8) {
    let [cx, cy] = p.center;
    let (sin_a, cos_a) = p.angle.sin_cos();
    let reach = p.radius + 1.0;
    let x0 = (cx - reach).floor().max(0.0) as usize;
    let y0 = (cy - reach).floor().max(0.0) as usize;
    let x1 = ((cx + reach).ceil().max(0.0) as usize).min(canvas.width.saturating_sub(1));
    let y1 = ((cy + reach).ceil().max(0.0) as usize).min(canvas.height.saturating_sub(1));

    let offsets: Vec<f64> = (0..SUPERSAMPLE)
        .map(|s| (s as f64 + 0.5) / SUPERSAMPLE as f64 - 0.5)
        .collect();
    let n_sub = (SUPERSAMPLE * SUPERSAMPLE) as f64;
    let (bg, fg) = (background as f64, ink as f64);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let mut dark = 0usize;
            let mut outside = 0usize;
            for oy in &offsets {
                for ox in &offsets {
                    let dx = x as f64 + ox - cx;
                    let dy = y as f64 + oy - cy;
                    let u = cos_a * dx + sin_a * dy;
                    let v = -sin_a * dx + cos_a * dy;
                    let rho = (u.hypot(v / p.aspect) / p.radius) as f32;
                    let inside = radii.iter().filter(|&&r| rho < r).count();
                    if inside == 0 {
                        outside += 1;
                    } else if inside % 2 == 1 {
                        dark += 1;
                    }
                }
            }
            // Leave pixels fully outside the marker to whatever is below.
            if outside == SUPERSAMPLE * SUPERSAMPLE {
                continue;
            }
            let covered = n_sub - outside as f64;
            let prev = canvas.data[y * canvas.width + x] as f64;
            let value = (outside as f64 * prev + (covered - dark as f64) * bg + dark as f64 * fg)
                / n_sub;
            canvas.set(x, y, value.round().clamp(0.0, 255.0) as u8);
        }
    }
}

/// Write an 8-bit grayscale PNG.
pub fn write_png(path: impl AsRef<Path>, image: &GrayImage) -> Result<(), PrintError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| PrintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut encoder = Encoder::new(
        BufWriter::new(file),
        image.width as u32,
        image.height as u32,
    );
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.data)?;
    writer.finish()?;
    Ok(())
}
