//! Ring filtering and concentric grouping of dark components.

use crate::components::{ComponentStats, Components};
use crate::types::DetectorParams;

/// Concentric rings that are candidates for one marker, outermost first.
#[derive(Clone, Debug)]
pub(crate) struct RingGroup {
    pub rings: Vec<ComponentStats>,
}

impl RingGroup {
    pub fn outer(&self) -> &ComponentStats {
        &self.rings[0]
    }

    /// Centroid of the outer ring.
    pub fn center(&self) -> (f64, f64) {
        self.outer().centroid()
    }
}

/// A dark component with a hole in the middle and a plausible size.
pub(crate) fn is_ring(stats: &ComponentStats, comps: &Components, params: &DetectorParams) -> bool {
    if stats.area < params.min_ring_area {
        return false;
    }
    let min_side = params.min_ring_diameter as f64;
    if (stats.bbox_width() as f64) < min_side || (stats.bbox_height() as f64) < min_side {
        return false;
    }
    let (cx, cy) = stats.centroid();
    let (ix, iy) = (cx.round() as usize, cy.round() as usize);
    comps.label_at(ix, iy) != stats.label
}

pub(crate) fn group_rings(comps: &Components, params: &DetectorParams) -> Vec<RingGroup> {
    let mut rings: Vec<&ComponentStats> = comps
        .stats
        .iter()
        .filter(|s| is_ring(s, comps, params))
        .collect();
    // Largest first; label breaks ties so the order is total.
    rings.sort_by(|a, b| {
        b.radius()
            .total_cmp(&a.radius())
            .then(a.label.cmp(&b.label))
    });

    let mut used = vec![false; rings.len()];
    let mut groups = Vec::new();
    for i in 0..rings.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let outer = rings[i];
        let (ox, oy) = outer.centroid();
        let tol = (params.center_tolerance_px as f64)
            .max(params.center_tolerance_frac as f64 * outer.radius());

        let mut members = vec![outer.clone()];
        for j in (i + 1)..rings.len() {
            if used[j] {
                continue;
            }
            let inner = rings[j];
            let (ix, iy) = inner.centroid();
            if (ix - ox).hypot(iy - oy) <= tol && outer.contains_bbox(inner, 1) {
                used[j] = true;
                members.push(inner.clone());
            }
        }

        if members.len() < 2 {
            log::trace!("ring {} at ({ox:.1}, {oy:.1}) has no inner ring", outer.label);
            continue;
        }
        if members.len() > params.n_crowns {
            let drop = members.len() - params.n_crowns;
            members.drain(..drop);
        }
        groups.push(RingGroup { rings: members });
    }
    groups
}
