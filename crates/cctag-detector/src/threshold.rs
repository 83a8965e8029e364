//! Binarization of the input image into a dark-pixel mask.

use cctag_core::GrayImageView;

use crate::types::ThresholdMode;

/// Row-major mask, `true` for dark pixels.
#[derive(Clone, Debug)]
pub(crate) struct DarkMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl DarkMask {
    fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    #[cfg(test)]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&d| d).count()
    }
}

/// Images whose intensity range is below this carry no markers.
const MIN_GLOBAL_RANGE: u8 = 16;

pub(crate) fn binarize(img: &GrayImageView<'_>, mode: ThresholdMode) -> DarkMask {
    match mode {
        ThresholdMode::Otsu => binarize_otsu(img),
        ThresholdMode::Adaptive { window, offset } => binarize_adaptive(img, window, offset),
    }
}

fn binarize_otsu(img: &GrayImageView<'_>) -> DarkMask {
    let Some(t) = otsu_threshold(img.data) else {
        return DarkMask::empty(img.width, img.height);
    };
    DarkMask {
        width: img.width,
        height: img.height,
        data: img.data.iter().map(|&v| v <= t).collect(),
    }
}

/// Otsu threshold: pixels `<= t` form the dark class. `None` when the image
/// is (nearly) uniform.
pub(crate) fn otsu_threshold(samples: &[u8]) -> Option<u8> {
    if samples.is_empty() {
        return None;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if max_v - min_v < MIN_GLOBAL_RANGE {
        return None;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }

    let total = samples.len() as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &h)| i as f64 * h as f64)
        .sum();

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = min_v;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += t as f64 * h as f64;
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    Some(best_t)
}

fn binarize_adaptive(img: &GrayImageView<'_>, window: usize, offset: f32) -> DarkMask {
    let (w, h) = (img.width, img.height);
    let global_min = img.data.iter().copied().min().unwrap_or(0);
    let global_max = img.data.iter().copied().max().unwrap_or(0);
    if global_max - global_min < MIN_GLOBAL_RANGE {
        return DarkMask::empty(w, h);
    }

    // Summed-area table with a zero first row and column.
    let stride = w + 1;
    let mut integral = vec![0u64; stride * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += img.get(x, y) as u64;
            integral[(y + 1) * stride + x + 1] = integral[y * stride + x + 1] + row_sum;
        }
    }

    // Windows wider than the image cover all of it.
    let half = (window.max(3) / 2).min(w.max(h)) as isize;
    let mut data = vec![false; w * h];
    for y in 0..h {
        let y0 = (y as isize - half).max(0) as usize;
        let y1 = ((y as isize + half) as usize).min(h - 1) + 1;
        for x in 0..w {
            let x0 = (x as isize - half).max(0) as usize;
            let x1 = ((x as isize + half) as usize).min(w - 1) + 1;
            let sum = integral[y1 * stride + x1] + integral[y0 * stride + x0]
                - integral[y0 * stride + x1]
                - integral[y1 * stride + x0];
            let area = ((x1 - x0) * (y1 - y0)) as f32;
            let mean = sum as f32 / area;
            data[y * w + x] = (img.get(x, y) as f32) < mean - offset;
        }
    }

    DarkMask {
        width: w,
        height: h,
        data,
    }
}
