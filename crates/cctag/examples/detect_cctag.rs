use cctag::{detect_from_file, format_detections};

#[cfg(feature = "tracing")]
use cctag::core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: detect_cctag <image_path>");
        return Ok(());
    };

    let markers = detect_from_file(&path)?;
    print!("{}", format_detections(&markers));
    let reliable = markers.iter().filter(|m| m.is_reliable()).count();
    println!("{reliable} of {} markers reliable", markers.len());

    Ok(())
}
