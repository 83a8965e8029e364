//! Render a few markers with `cctag-print` and detect them back.

use cctag_detector::{DetectorParams, MarkerBank, MarkerDetector};
use cctag_print::{render_sheet, Placement};

#[cfg(not(feature = "tracing"))]
use cctag_core::init_with_level;
#[cfg(feature = "tracing")]
use cctag_core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(not(feature = "tracing"))]
    init_with_level(log::LevelFilter::Info)?;
    #[cfg(feature = "tracing")]
    init_tracing(false);

    let bank = MarkerBank::builtin(3)?;
    let placements = [
        Placement::new(1, 100.0, 100.0, 70.0),
        Placement::new(8, 300.0, 110.0, 60.0),
        Placement::new(21, 200.0, 260.0, 55.0),
    ];
    let img = render_sheet(&bank, &placements, 400, 340)?;

    let detector = MarkerDetector::new(DetectorParams::default(), bank)?;
    for m in detector.detect(&img.view())? {
        println!(
            "id {:>3}  status {:>2}  at ({:7.2}, {:7.2})  quality {:.2}",
            m.id, m.status, m.x, m.y, m.quality
        );
    }
    Ok(())
}
