//! JSON configuration, reports and text output for marker detection.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::annotate::AnnotateStyle;
use crate::detector::{DetectorError, DetectorParams, MarkerBank, MarkerDetection, MarkerDetector};

#[derive(thiserror::Error, Debug)]
pub enum DetectIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration of one detection run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectConfig {
    /// Input image; the CLI fills it from its positional argument.
    #[serde(default)]
    pub image_path: String,
    /// Where to save the annotated copy, if anywhere.
    #[serde(default)]
    pub annotate_path: Option<String>,
    /// Where to save the JSON report, if anywhere.
    #[serde(default)]
    pub output_path: Option<String>,
    /// Text bank file; the built-in bank is used when absent.
    #[serde(default)]
    pub bank_path: Option<String>,
    #[serde(default)]
    pub params: DetectorParams,
    #[serde(default)]
    pub annotate: AnnotateStyle,
}

impl DetectConfig {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DetectIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DetectIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Bank from `bank_path`, or the built-in one for `params.n_crowns`.
    pub fn build_bank(&self) -> Result<MarkerBank, DetectorError> {
        let bank = match &self.bank_path {
            Some(path) => MarkerBank::load(path, self.params.n_crowns)?,
            None => MarkerBank::builtin(self.params.n_crowns)?,
        };
        Ok(bank)
    }

    pub fn build_detector(&self) -> Result<MarkerDetector, DetectorError> {
        MarkerDetector::new(self.params.clone(), self.build_bank()?)
    }
}

/// Detection results of one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectReport {
    pub image_path: String,
    pub width: u32,
    pub height: u32,
    pub markers: Vec<MarkerDetection>,
}

impl DetectReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DetectIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DetectIoError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, DetectIoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Two lines per marker: `"<id>   <status>"` and `"x: <x>   y: <y>"`.
/// Whole coordinates keep a trailing `.0`.
pub fn format_detections(detections: &[MarkerDetection]) -> String {
    let mut out = String::new();
    for m in detections {
        let _ = writeln!(out, "{}   {}", m.id, m.status);
        let _ = writeln!(out, "x: {}   y: {}", coord(m.x), coord(m.y));
    }
    out
}

fn coord(v: f32) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}
