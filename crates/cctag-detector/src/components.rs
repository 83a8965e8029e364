//! 8-connected labeling of the dark mask with per-component moments.

use crate::threshold::DarkMask;

/// Disjoint-set forest with union by size and path compression.
struct UnionFind {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl UnionFind {
    fn with_capacity(n: usize) -> Self {
        Self {
            parent: Vec::with_capacity(n),
            size: Vec::with_capacity(n),
        }
    }

    fn make_set(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.size.push(1);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        while self.parent[x as usize] != root {
            let next = self.parent[x as usize];
            self.parent[x as usize] = root;
            x = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let (big, small) = if self.size[ra as usize] >= self.size[rb as usize] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small as usize] = big;
        self.size[big as usize] += self.size[small as usize];
    }
}

/// Area, bounding box and raw moments of one dark component.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ComponentStats {
    /// Label as stored in [`Components::labels`].
    pub label: u32,
    pub area: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    sum_x: f64,
    sum_y: f64,
}

impl ComponentStats {
    fn new(label: u32, x: usize, y: usize) -> Self {
        Self {
            label,
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            sum_x: 0.0,
            sum_y: 0.0,
        }
    }

    fn push(&mut self, x: usize, y: usize) {
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.sum_x += x as f64;
        self.sum_y += y as f64;
    }

    pub fn centroid(&self) -> (f64, f64) {
        let n = self.area.max(1) as f64;
        (self.sum_x / n, self.sum_y / n)
    }

    pub fn bbox_width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Half of the larger bbox side.
    pub fn radius(&self) -> f64 {
        0.5 * self.bbox_width().max(self.bbox_height()) as f64
    }

    /// Whether `other`'s bbox lies inside this one, with `slack` pixels.
    pub fn contains_bbox(&self, other: &ComponentStats, slack: usize) -> bool {
        other.min_x + slack >= self.min_x
            && other.min_y + slack >= self.min_y
            && other.max_x <= self.max_x + slack
            && other.max_y <= self.max_y + slack
    }
}

/// Label map (0 = background, otherwise component label) and stats.
#[derive(Clone, Debug)]
pub(crate) struct Components {
    pub width: usize,
    pub labels: Vec<u32>,
    pub stats: Vec<ComponentStats>,
}

impl Components {
    #[inline]
    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels[y * self.width + x]
    }
}

pub(crate) fn label_components(mask: &DarkMask) -> Components {
    let (w, h) = (mask.width, mask.height);
    let mut provisional = vec![0u32; w * h];
    let mut uf = UnionFind::with_capacity(64);
    // Set 0 is the background sentinel.
    uf.make_set();

    for y in 0..h {
        for x in 0..w {
            if !mask.get(x, y) {
                continue;
            }
            let mut label = 0u32;
            let mut neighbors = [0u32; 4];
            if x > 0 {
                neighbors[0] = provisional[y * w + x - 1];
            }
            if y > 0 {
                neighbors[1] = provisional[(y - 1) * w + x];
                if x > 0 {
                    neighbors[2] = provisional[(y - 1) * w + x - 1];
                }
                if x + 1 < w {
                    neighbors[3] = provisional[(y - 1) * w + x + 1];
                }
            }
            for &n in neighbors.iter().filter(|&&n| n != 0) {
                if label == 0 {
                    label = n;
                } else if n != label {
                    uf.union(label, n);
                }
            }
            if label == 0 {
                label = uf.make_set();
            }
            provisional[y * w + x] = label;
        }
    }

    // Second pass: resolve roots to dense labels 1..=n and accumulate stats.
    let mut dense = vec![0u32; uf.parent.len()];
    let mut stats: Vec<ComponentStats> = Vec::new();
    let mut labels = provisional;
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let p = labels[idx];
            if p == 0 {
                continue;
            }
            let root = uf.find(p) as usize;
            if dense[root] == 0 {
                let label = stats.len() as u32 + 1;
                dense[root] = label;
                stats.push(ComponentStats::new(label, x, y));
            }
            let label = dense[root];
            labels[idx] = label;
            stats[(label - 1) as usize].push(x, y);
        }
    }

    Components {
        width: w,
        labels,
        stats,
    }
}
