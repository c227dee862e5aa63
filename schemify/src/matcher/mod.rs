mod index;

pub use index::{BUCKET_EDGE, ColorSpaceIndex};

use std::collections::HashMap;
use std::fmt::Write;

use parking_lot::RwLock;
use rayon::prelude::*;

use crate::catalog::{BlockDescriptor, Catalog};
use crate::color::Rgb8;
use crate::error::{Error, Result};

/// Whether cells are matched to a single block or to a base block plus optional glass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MatchMode {
    #[default]
    Single,
    WithGlass,
}

/// A base block and the glass laid over it, if any.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockPair<'a> {
    pub base: &'a BlockDescriptor,
    pub glass: Option<&'a BlockDescriptor>,
}

impl BlockPair<'_> {
    pub fn apparent_color(&self) -> Rgb8 {
        match self.glass {
            Some(glass) => glass.blend_over(self.base.color),
            None => self.base.color,
        }
    }
}

/// The candidate closest to `target`, stopping at the first exact match. Ties go to whichever
/// candidate came first.
pub fn nearest<'a, I>(target: Rgb8, candidates: I) -> Option<&'a BlockDescriptor>
where
    I: IntoIterator<Item = &'a BlockDescriptor>,
{
    let mut best: Option<(&'a BlockDescriptor, u32)> = None;
    for candidate in candidates {
        let distance = candidate.color.distance_sq(target);
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((candidate, distance));
            if distance == 0 {
                break;
            }
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// The (base, glass) combination whose apparent color is closest to `target`. Each base is tried
/// bare first, then under every real glass entry; the sentinel in `glass` is skipped since "no
/// glass" is always tried anyway.
pub fn nearest_pair<'a, I>(
    target: Rgb8,
    bases: I,
    glass: &'a [BlockDescriptor],
) -> Option<BlockPair<'a>>
where
    I: IntoIterator<Item = &'a BlockDescriptor>,
{
    let mut best: Option<(BlockPair<'a>, u32)> = None;
    let mut consider = |pair: BlockPair<'a>, distance: u32| {
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((pair, distance));
        }
        distance == 0
    };
    'bases: for base in bases {
        let bare = BlockPair { base, glass: None };
        if consider(bare, base.color.distance_sq(target)) {
            break;
        }
        for overlay in glass.iter().filter(|g| !g.is_sentinel()) {
            let distance = overlay.blend_over(base.color).distance_sq(target);
            let pair = BlockPair {
                base,
                glass: Some(overlay),
            };
            if consider(pair, distance) {
                break 'bases;
            }
        }
    }
    best.map(|(pair, _)| pair)
}

/// What ends up in one grid cell.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedCell {
    /// Transparent input; every layer of this cell stays air.
    Air,
    Block {
        base: BlockDescriptor,
        glass: Option<BlockDescriptor>,
    },
}

impl ResolvedCell {
    pub fn block(base: BlockDescriptor) -> Self {
        ResolvedCell::Block { base, glass: None }
    }

    pub fn with_glass(base: BlockDescriptor, glass: BlockDescriptor) -> Self {
        let glass = (!glass.is_sentinel()).then_some(glass);
        ResolvedCell::Block { base, glass }
    }

    pub fn base(&self) -> Option<&BlockDescriptor> {
        match self {
            ResolvedCell::Air => None,
            ResolvedCell::Block { base, .. } => Some(base),
        }
    }

    pub fn glass(&self) -> Option<&BlockDescriptor> {
        match self {
            ResolvedCell::Air => None,
            ResolvedCell::Block { glass, .. } => glass.as_ref(),
        }
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, ResolvedCell::Air)
    }
}

impl From<BlockPair<'_>> for ResolvedCell {
    fn from(pair: BlockPair<'_>) -> Self {
        ResolvedCell::Block {
            base: pair.base.clone(),
            glass: pair.glass.cloned(),
        }
    }
}

/// One line of the block list: `Air`, `Base: <name>` or `Base: <name>, Glass: <name>`.
impl std::fmt::Display for ResolvedCell {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ResolvedCell::Air => f.write_str("Air"),
            ResolvedCell::Block { base, glass } => {
                write!(f, "Base: {}", base.name)?;
                if let Some(glass) = glass {
                    f.write_str(", Glass: ")?;
                    f.write_str(&glass.name)?;
                }
                Ok(())
            }
        }
    }
}

/// Render a resolved grid as one block-list line per cell.
pub fn block_list(cells: &[ResolvedCell]) -> String {
    let mut out = String::new();
    for cell in cells {
        // Writing to a String cannot fail
        let _ = writeln!(out, "{cell}");
    }
    out
}

/// A matching session over one pair of (already filtered) catalogs.
///
/// Results are memoised per exact target color, separately for single and pair queries. The
/// memo belongs to the session: matching against different filters means building a new
/// matcher. All methods take `&self`, so one matcher can be shared across rayon workers.
pub struct BlockMatcher<'c> {
    blocks: &'c [BlockDescriptor],
    glass: &'c [BlockDescriptor],
    index: ColorSpaceIndex,
    single_cache: RwLock<HashMap<Rgb8, &'c BlockDescriptor>>,
    pair_cache: RwLock<HashMap<Rgb8, BlockPair<'c>>>,
}

impl<'c> BlockMatcher<'c> {
    pub fn new(blocks: &'c Catalog, glass: &'c Catalog) -> Result<Self> {
        if blocks.is_empty() {
            return Err(Error::NoCandidateBlocks {
                role: blocks.role().name(),
            });
        }
        Ok(Self {
            blocks: blocks.entries(),
            glass: glass.entries(),
            index: ColorSpaceIndex::build(blocks.entries()),
            single_cache: RwLock::new(HashMap::new()),
            pair_cache: RwLock::new(HashMap::new()),
        })
    }

    fn at_positions(&self, positions: Vec<usize>) -> Vec<&'c BlockDescriptor> {
        let blocks = self.blocks;
        if positions.is_empty() {
            blocks.iter().collect()
        } else {
            positions.into_iter().map(|p| &blocks[p]).collect()
        }
    }

    /// Bases worth trying for `target`: the index neighbourhood, or the whole catalog if the
    /// neighbourhood is empty.
    fn base_candidates(&self, target: Rgb8) -> Vec<&'c BlockDescriptor> {
        self.at_positions(self.index.candidates(target))
    }

    /// Bases worth trying under glass. Glass shifts the apparent color away from its base, so
    /// besides the target itself this searches around the base each glass would need beneath
    /// it to produce the target.
    fn pair_base_candidates(&self, target: Rgb8) -> Vec<&'c BlockDescriptor> {
        let origins = std::iter::once(target).chain(
            self.glass
                .iter()
                .filter(|glass| !glass.is_sentinel())
                .map(|glass| target.unblend(glass.color, glass.alpha)),
        );
        self.at_positions(self.index.candidates_around(origins))
    }

    pub fn match_block(&self, target: Rgb8) -> Result<&'c BlockDescriptor> {
        if let Some(&hit) = self.single_cache.read().get(&target) {
            return Ok(hit);
        }
        let found = nearest(target, self.base_candidates(target))
            .ok_or(Error::NoCandidateBlocks { role: "block" })?;
        self.single_cache.write().insert(target, found);
        Ok(found)
    }

    pub fn match_pair(&self, target: Rgb8) -> Result<BlockPair<'c>> {
        if let Some(&hit) = self.pair_cache.read().get(&target) {
            return Ok(hit);
        }
        let found = nearest_pair(target, self.pair_base_candidates(target), self.glass)
            .ok_or(Error::NoCandidateBlocks { role: "block" })?;
        self.pair_cache.write().insert(target, found);
        Ok(found)
    }

    /// Resolve one cell; `None` is a transparent input pixel.
    pub fn resolve(&self, target: Option<Rgb8>, mode: MatchMode) -> Result<ResolvedCell> {
        let Some(target) = target else {
            return Ok(ResolvedCell::Air);
        };
        match mode {
            MatchMode::Single => Ok(ResolvedCell::block(self.match_block(target)?.clone())),
            MatchMode::WithGlass => Ok(self.match_pair(target)?.into()),
        }
    }

    /// Resolve a row-major grid of targets in parallel. Output order matches input order.
    #[tracing::instrument(skip_all, fields(cells = targets.len(), ?mode))]
    pub fn resolve_grid(
        &self,
        targets: &[Option<Rgb8>],
        mode: MatchMode,
    ) -> Result<Vec<ResolvedCell>> {
        let cells = targets
            .par_iter()
            .with_min_len(64)
            .map(|&target| self.resolve(target, mode))
            .collect::<Result<Vec<_>>>()?;
        let (single, pair) = self.cached_entries();
        log::debug!(
            "resolved {} cells ({} single / {} pair colors memoised)",
            cells.len(),
            single,
            pair
        );
        Ok(cells)
    }

    /// Number of memoised (single, pair) results.
    pub fn cached_entries(&self) -> (usize, usize) {
        (self.single_cache.read().len(), self.pair_cache.read().len())
    }
}
