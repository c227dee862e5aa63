use crate::catalog::BlockDescriptor;
use crate::color::Rgb8;

/// Edge length of a bucket along each RGB axis.
pub const BUCKET_EDGE: usize = 32;
/// Buckets per axis.
const GRID: usize = 256 / BUCKET_EDGE;

/// Coarse 8x8x8 bucketing of the RGB cube over a catalog.
///
/// Buckets store positions into the catalog slice the index was built from, so candidate lists
/// can be returned in catalog order.
#[derive(Clone, Debug)]
pub struct ColorSpaceIndex {
    buckets: Vec<Vec<u32>>,
}

impl ColorSpaceIndex {
    pub fn build(descriptors: &[BlockDescriptor]) -> Self {
        let mut buckets = vec![Vec::new(); GRID * GRID * GRID];
        for (position, descriptor) in descriptors.iter().enumerate() {
            let (r, g, b) = Self::bucket_key(descriptor.color);
            buckets[flat_index(r, g, b)].push(position as u32);
        }
        let index = Self { buckets };
        log::debug!(
            "indexed {} descriptors into {} occupied buckets",
            descriptors.len(),
            index.occupied_buckets()
        );
        index
    }

    #[inline]
    pub fn bucket_key(color: Rgb8) -> (usize, usize, usize) {
        (
            color[0] as usize / BUCKET_EDGE,
            color[1] as usize / BUCKET_EDGE,
            color[2] as usize / BUCKET_EDGE,
        )
    }

    /// Catalog positions of every descriptor in the target's bucket and its 26 neighbours,
    /// ascending.
    pub fn candidates(&self, target: Rgb8) -> Vec<usize> {
        self.candidates_around([target])
    }

    /// Union of [`ColorSpaceIndex::candidates()`] over several origins, ascending.
    pub fn candidates_around<I: IntoIterator<Item = Rgb8>>(&self, origins: I) -> Vec<usize> {
        let mut visited = [false; GRID * GRID * GRID];
        let mut found = Vec::new();
        for origin in origins {
            let (r, g, b) = Self::bucket_key(origin);
            for nr in neighbours(r) {
                for ng in neighbours(g) {
                    for nb in neighbours(b) {
                        let bucket = flat_index(nr, ng, nb);
                        if !std::mem::replace(&mut visited[bucket], true) {
                            found.extend(self.buckets[bucket].iter().map(|&p| p as usize));
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }

    pub fn occupied_buckets(&self) -> usize {
        self.buckets.iter().filter(|bucket| !bucket.is_empty()).count()
    }
}

#[inline]
fn flat_index(r: usize, g: usize, b: usize) -> usize {
    (r * GRID + g) * GRID + b
}

/// `axis - 1 ..= axis + 1`, clipped to the grid.
#[inline]
fn neighbours(axis: usize) -> std::ops::RangeInclusive<usize> {
    axis.saturating_sub(1)..=(axis + 1).min(GRID - 1)
}
