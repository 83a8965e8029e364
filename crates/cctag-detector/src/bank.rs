//! Marker bank: the radius-ratio signature of every marker id.
//!
//! A marker with `n` crowns has `2n` circle edges with normalized radii
//! `1 = r_0 > r_1 > ... > r_{2n-1} > 0`. Bands `[r_{2k+1}, r_{2k}]` are dark,
//! the others and the central disk are light. The signature of an id is
//! `[r_1, ..., r_{2n-1}]`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;

pub const MIN_CROWNS: usize = 2;
pub const MAX_CROWNS: usize = 5;

/// Central disk radius of generated markers, in band units.
const DISK_UNITS: u32 = 3;
/// Candidate band widths of generated markers, in band units.
const WIDTH_CHOICES: [u32; 3] = [1, 2, 3];
/// Minimum signature distance between two generated ids.
pub const BUILTIN_MIN_SEPARATION: f32 = 0.05;
/// Upper bound on the number of generated ids.
pub const BUILTIN_CAPACITY: usize = 128;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("unsupported crown count {0} (expected 2..=5)")]
    UnsupportedCrowns(usize),
    #[error("bank is empty")]
    Empty,
    #[error("line {line}: expected {expected} ratios, got {got}")]
    WrongArity {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("line {line}: {value:?} is not a number")]
    NotANumber { line: usize, value: String },
    #[error("line {line}: ratios must be strictly decreasing inside (0, 1)")]
    NotDecreasing { line: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result of matching a measured signature against the bank.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdMatch {
    pub id: usize,
    pub distance: f32,
    /// Distance to the second-best id, `f32::INFINITY` for one-entry banks.
    pub runner_up: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerBank {
    n_crowns: usize,
    signatures: Vec<Vec<f32>>,
}

impl MarkerBank {
    /// Deterministic built-in bank for `n_crowns`.
    ///
    /// Band widths are enumerated lexicographically over `WIDTH_CHOICES`; a
    /// candidate is kept when its signature is at least
    /// `BUILTIN_MIN_SEPARATION` away from every kept one.
    pub fn builtin(n_crowns: usize) -> Result<Self, BankError> {
        check_crowns(n_crowns)?;
        let n_bands = 2 * n_crowns - 1;
        let mut widths = vec![0usize; n_bands];
        let mut signatures: Vec<Vec<f32>> = Vec::new();

        'enumerate: loop {
            let band_units: Vec<u32> = widths.iter().map(|&w| WIDTH_CHOICES[w]).collect();
            let signature = signature_from_widths(&band_units);
            let separated = signatures
                .iter()
                .all(|s| distance(s, &signature) >= BUILTIN_MIN_SEPARATION);
            if separated {
                signatures.push(signature);
                if signatures.len() == BUILTIN_CAPACITY {
                    break;
                }
            }

            // Odometer increment, last band fastest.
            for pos in (0..n_bands).rev() {
                widths[pos] += 1;
                if widths[pos] < WIDTH_CHOICES.len() {
                    continue 'enumerate;
                }
                widths[pos] = 0;
            }
            break;
        }

        Ok(Self {
            n_crowns,
            signatures,
        })
    }

    pub fn from_signatures(n_crowns: usize, signatures: Vec<Vec<f32>>) -> Result<Self, BankError> {
        check_crowns(n_crowns)?;
        if signatures.is_empty() {
            return Err(BankError::Empty);
        }
        for (idx, sig) in signatures.iter().enumerate() {
            validate_signature(sig, n_crowns, idx + 1)?;
        }
        Ok(Self {
            n_crowns,
            signatures,
        })
    }

    /// Parse the text format: one id per non-empty line, whitespace
    /// separated ratios, `#` starts a comment.
    pub fn parse(text: &str, n_crowns: usize) -> Result<Self, BankError> {
        check_crowns(n_crowns)?;
        let mut signatures = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let sig = content
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f32>().map_err(|_| BankError::NotANumber {
                        line: line_no,
                        value: tok.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            validate_signature(&sig, n_crowns, line_no)?;
            signatures.push(sig);
        }
        if signatures.is_empty() {
            return Err(BankError::Empty);
        }
        Ok(Self {
            n_crowns,
            signatures,
        })
    }

    pub fn load(path: impl AsRef<Path>, n_crowns: usize) -> Result<Self, BankError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, n_crowns)
    }

    /// Serialize to the text format accepted by [`MarkerBank::parse`].
    pub fn to_text(&self) -> String {
        let mut out = format!("# cctag bank, {} crowns\n", self.n_crowns);
        for sig in &self.signatures {
            let line: Vec<String> = sig.iter().map(|r| format!("{r:.6}")).collect();
            let _ = writeln!(out, "{}", line.join(" "));
        }
        out
    }

    pub fn n_crowns(&self) -> usize {
        self.n_crowns
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn signature(&self, id: usize) -> Option<&[f32]> {
        self.signatures.get(id).map(Vec::as_slice)
    }

    /// All `2 * n_crowns` normalized radii of `id`, outermost first.
    pub fn radii(&self, id: usize) -> Option<Vec<f32>> {
        let sig = self.signature(id)?;
        let mut radii = Vec::with_capacity(sig.len() + 1);
        radii.push(1.0);
        radii.extend_from_slice(sig);
        Some(radii)
    }

    /// Smallest pairwise signature distance.
    pub fn min_separation(&self) -> f32 {
        let mut best = f32::INFINITY;
        for (i, a) in self.signatures.iter().enumerate() {
            for b in &self.signatures[i + 1..] {
                best = best.min(distance(a, b));
            }
        }
        best
    }

    /// Nearest id by Euclidean distance between signatures.
    pub fn identify(&self, ratios: &[f32]) -> Option<IdMatch> {
        if ratios.len() != 2 * self.n_crowns - 1 {
            return None;
        }
        let mut best: Option<IdMatch> = None;
        for (id, sig) in self.signatures.iter().enumerate() {
            let d = distance(sig, ratios);
            best = Some(match best {
                None => IdMatch {
                    id,
                    distance: d,
                    runner_up: f32::INFINITY,
                },
                Some(m) if d < m.distance => IdMatch {
                    id,
                    distance: d,
                    runner_up: m.distance,
                },
                Some(m) => IdMatch {
                    runner_up: m.runner_up.min(d),
                    ..m
                },
            });
        }
        best
    }
}

fn check_crowns(n_crowns: usize) -> Result<(), BankError> {
    if (MIN_CROWNS..=MAX_CROWNS).contains(&n_crowns) {
        Ok(())
    } else {
        Err(BankError::UnsupportedCrowns(n_crowns))
    }
}

fn validate_signature(sig: &[f32], n_crowns: usize, line: usize) -> Result<(), BankError> {
    let expected = 2 * n_crowns - 1;
    if sig.len() != expected {
        return Err(BankError::WrongArity {
            line,
            expected,
            got: sig.len(),
        });
    }
    let mut prev = 1.0f32;
    for &r in sig {
        if !(r > 0.0 && r < prev) {
            return Err(BankError::NotDecreasing { line });
        }
        prev = r;
    }
    Ok(())
}

fn signature_from_widths(band_units: &[u32]) -> Vec<f32> {
    let total = DISK_UNITS + band_units.iter().sum::<u32>();
    let mut radius = total;
    band_units
        .iter()
        .map(|&w| {
            radius -= w;
            radius as f32 / total as f32
        })
        .collect()
}

fn distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
