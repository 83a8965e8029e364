use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use cctag_detector::MarkerBank;

use crate::{marker_radii, PrintError};

/// Standalone SVG of marker `id` with outer radius `radius_mm`.
///
/// Circles are stacked from the outside in, alternating black and white,
/// on a white square with a margin of a quarter radius.
pub fn marker_svg(bank: &MarkerBank, id: usize, radius_mm: f64) -> Result<String, PrintError> {
    if !(radius_mm.is_finite() && radius_mm > 0.0) {
        return Err(PrintError::InvalidSpec("radius must be > 0"));
    }
    let radii = marker_radii(bank, id)?;
    let margin = 0.25 * radius_mm;
    let side = 2.0 * (radius_mm + margin);
    let c = side / 2.0;

    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{side:.3}mm" height="{side:.3}mm" viewBox="0 0 {side:.3} {side:.3}">"#
    );
    let _ = writeln!(out, "  <title>CCTag id {id}</title>");
    let _ = writeln!(
        out,
        r#"  <rect x="0" y="0" width="{side:.3}" height="{side:.3}" fill="white"/>"#
    );
    for (k, r) in radii.iter().enumerate() {
        let fill = if k % 2 == 0 { "black" } else { "white" };
        let _ = writeln!(
            out,
            r#"  <circle cx="{c:.3}" cy="{c:.3}" r="{:.3}" fill="{fill}"/>"#,
            *r as f64 * radius_mm
        );
    }
    out.push_str("</svg>\n");
    Ok(out)
}

pub fn write_svg(
    path: impl AsRef<Path>,
    bank: &MarkerBank,
    id: usize,
    radius_mm: f64,
) -> Result<(), PrintError> {
    let path = path.as_ref();
    let svg = marker_svg(bank, id, radius_mm)?;
    fs::write(path, svg).map_err(|source| PrintError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_has_one_circle_per_edge() {
        let bank = MarkerBank::builtin(3).expect("bank");
        let svg = marker_svg(&bank, 4, 50.0).expect("svg");
        assert!(svg.starts_with("<?xml"));
        assert_eq!(svg.matches("<circle").count(), 6);
        assert_eq!(svg.matches(r#"fill="black""#).count(), 3);
        assert!(svg.contains(r#"r="50.000""#));
        assert!(svg.contains(r#"width="125.000mm""#));
    }

    #[test]
    fn svg_rejects_unknown_id() {
        let bank = MarkerBank::builtin(2).expect("bank");
        assert!(matches!(
            marker_svg(&bank, 10_000, 10.0),
            Err(PrintError::UnknownId { id: 10_000, .. })
        ));
        assert!(marker_svg(&bank, 0, -1.0).is_err());
    }

    #[test]
    fn svg_file_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("m.svg");
        let bank = MarkerBank::builtin(3).expect("bank");
        write_svg(&path, &bank, 0, 20.0).expect("write");
        let text = fs::read_to_string(&path).expect("read");
        assert!(text.trim_end().ends_with("</svg>"));
    }
}
