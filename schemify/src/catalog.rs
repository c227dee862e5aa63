//! Block and glass catalogs: the read-only color data the matcher searches.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use arcstr::ArcStr;
use serde::Deserialize;

use crate::color::Rgb8;
use crate::error::{Error, Result};
use crate::palette::AIR;

const DEFAULT_BLOCKS: &str = include_str!("../data/blocks.json");
const DEFAULT_GLASS: &str = include_str!("../data/glass.json");
const DEFAULT_LEGACY_IDS: &str = include_str!("../data/legacy_ids.json");

const NAMESPACE: &str = "minecraft:";

/// Which faces of a block a catalog entry is suitable for.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Both,
    Top,
    Side,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "both" => Ok(View::Both),
            "top" => Ok(View::Top),
            "side" => Ok(View::Side),
            _ => Err(format!("unknown view mode {s:?} (expected both, top or side)")),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CatalogRole {
    Block,
    Glass,
}

impl CatalogRole {
    pub const fn default_alpha(self) -> f64 {
        match self {
            CatalogRole::Block => 1.0,
            CatalogRole::Glass => 0.5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            CatalogRole::Block => "block",
            CatalogRole::Glass => "glass",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockDescriptor {
    pub name: ArcStr,
    pub color: Rgb8,
    /// Coverage when used as a glass layer. Always set; defaults are applied at load time.
    pub alpha: f64,
    pub view: View,
}

impl BlockDescriptor {
    pub fn new<S: AsRef<str>>(name: S, color: Rgb8) -> Self {
        Self {
            name: ArcStr::from(name.as_ref()),
            color,
            alpha: 1.0,
            view: View::Both,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    /// The "no glass" placeholder.
    pub fn sentinel() -> Self {
        Self::new("none", Rgb8::default()).with_alpha(0.0)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self.name.as_str(), "none" | "air")
    }

    /// Namespaced block identifier; the sentinel is plain air.
    pub fn identifier(&self) -> String {
        if self.is_sentinel() {
            AIR.to_owned()
        } else if self.name.contains(':') {
            self.name.to_string()
        } else {
            format!("{NAMESPACE}{}", self.name)
        }
    }

    /// The apparent color of this descriptor laid over `base`. The sentinel leaves `base` as is.
    pub fn blend_over(&self, base: Rgb8) -> Rgb8 {
        if self.is_sentinel() {
            base
        } else {
            base.blend(self.color, self.alpha)
        }
    }

    fn validate(&self, role: CatalogRole) -> Result<()> {
        let invalid = |reason: String| Error::InvalidCatalogEntry {
            name: self.name.to_string(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("empty name".into()));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(invalid(format!("alpha {} outside 0..=1", self.alpha)));
        }
        if role == CatalogRole::Glass && !self.is_sentinel() && !(self.alpha > 0.0 && self.alpha < 1.0)
        {
            return Err(invalid(format!(
                "glass alpha {} must be strictly between 0 and 1",
                self.alpha
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawColor {
    r: u8,
    g: u8,
    b: u8,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    color: RawColor,
    #[serde(default)]
    alpha: Option<f64>,
    #[serde(default)]
    view: View,
}

/// An ordered, validated list of descriptors. Order is significant: it is the tie-break order
/// for equally close matches.
#[derive(Clone, Debug)]
pub struct Catalog {
    role: CatalogRole,
    entries: Vec<BlockDescriptor>,
}

impl Catalog {
    /// Validate `entries` for `role`. A glass catalog always ends up containing the sentinel.
    pub fn new(role: CatalogRole, mut entries: Vec<BlockDescriptor>) -> Result<Self> {
        for entry in entries.iter() {
            entry.validate(role)?;
        }
        if role == CatalogRole::Glass && !entries.iter().any(BlockDescriptor::is_sentinel) {
            entries.insert(0, BlockDescriptor::sentinel());
        }
        Ok(Self { role, entries })
    }

    /// Parse a JSON array of `{ name, color: {r, g, b}, alpha?, view? }` entries.
    pub fn from_json(role: CatalogRole, json: &str) -> Result<Self> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        let entries = raw
            .into_iter()
            .map(|entry| BlockDescriptor {
                name: ArcStr::from(entry.name),
                color: Rgb8::new(entry.color.r, entry.color.g, entry.color.b),
                alpha: entry.alpha.unwrap_or(role.default_alpha()),
                view: entry.view,
            })
            .collect();
        let catalog = Self::new(role, entries)?;
        log::debug!("loaded {} {} catalog entries", catalog.len(), role.name());
        Ok(catalog)
    }

    pub fn default_blocks() -> Result<Self> {
        Self::from_json(CatalogRole::Block, DEFAULT_BLOCKS)
    }

    pub fn default_glass() -> Result<Self> {
        Self::from_json(CatalogRole::Glass, DEFAULT_GLASS)
    }

    pub fn role(&self) -> CatalogRole {
        self.role
    }

    pub fn entries(&self) -> &[BlockDescriptor] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BlockDescriptor> {
        self.entries.iter().find(|entry| entry.name.as_str() == name)
    }

    /// Entries usable for `mode` that are not in `excluded`. Mode `Both` accepts every view, and
    /// entries marked `Both` suit every mode. The glass sentinel is never removed.
    pub fn filtered(&self, mode: View, excluded: &HashSet<String>) -> Catalog {
        let entries = self
            .entries
            .iter()
            .filter(|entry| {
                if entry.is_sentinel() {
                    return true;
                }
                let view_match = mode == View::Both || entry.view == View::Both || entry.view == mode;
                view_match && !excluded.contains(entry.name.as_str())
            })
            .cloned()
            .collect();
        Catalog {
            role: self.role,
            entries,
        }
    }

    /// Entries the legacy format can represent through `legacy_ids`. The glass sentinel is kept.
    pub fn legacy_mappable(&self, legacy_ids: &LegacyIdTable) -> Catalog {
        let entries: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.is_sentinel() || legacy_ids.contains(&entry.identifier()))
            .cloned()
            .collect();
        if entries.len() < self.entries.len() {
            log::debug!(
                "dropped {} {} entries without a legacy id",
                self.entries.len() - entries.len(),
                self.role.name()
            );
        }
        Catalog {
            role: self.role,
            entries,
        }
    }
}

/// Pre-flattening numeric block ids for the legacy `.schematic` format.
#[derive(Clone, Debug, Default)]
pub struct LegacyIdTable {
    ids: HashMap<String, (u8, u8)>,
}

impl LegacyIdTable {
    /// Parse a JSON object mapping block names (with or without namespace) to `[id, data]`.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, (u8, u8)> = serde_json::from_str(json)?;
        let ids = raw
            .into_iter()
            .map(|(name, id)| (strip_namespace(&name).to_owned(), id))
            .collect();
        Ok(Self { ids })
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_LEGACY_IDS)
    }

    pub fn insert<S: AsRef<str>>(&mut self, name: S, id: u8, data: u8) {
        self.ids
            .insert(strip_namespace(name.as_ref()).to_owned(), (id, data));
    }

    pub fn contains(&self, identifier: &str) -> bool {
        identifier == AIR || self.ids.contains_key(strip_namespace(identifier))
    }

    /// `(id, data)` for a namespaced identifier. Air is always `(0, 0)`.
    pub fn lookup(&self, identifier: &str) -> Result<(u8, u8)> {
        if identifier == AIR {
            return Ok((0, 0));
        }
        self.ids
            .get(strip_namespace(identifier))
            .copied()
            .ok_or_else(|| Error::UnknownLegacyBlock {
                identifier: identifier.to_owned(),
            })
    }
}

fn strip_namespace(name: &str) -> &str {
    name.strip_prefix(NAMESPACE).unwrap_or(name)
}
