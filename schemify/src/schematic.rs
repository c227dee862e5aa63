//! Assembly of resolved grids into schematic tag trees.
//!
//! Three layouts are produced from the same resolved grid:
//!
//! * [`SchematicFormat::Legacy`]: the pre-flattening MCEdit `.schematic`, with numeric ids
//!   looked up in a [`LegacyIdTable`].
//! * [`SchematicFormat::SpongeV2`]: `.schem` with a name-to-index palette and `IntArray` data.
//! * [`SchematicFormat::SpongeV3`]: `.schem` nested under a `Schematic` compound, with var-int
//!   block data and WorldEdit provenance metadata.
//!
//! Voxels are laid out x fastest, then z, then y.

use std::str::FromStr;

use crate::catalog::LegacyIdTable;
use crate::error::{Error, Result};
use crate::matcher::ResolvedCell;
use crate::nbt::{Compound, GzipCodec, TagKind, TagValue, encode_var_int_array, to_bytes};
use crate::palette::Palette;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SchematicFormat {
    Legacy,
    SpongeV2,
    #[default]
    SpongeV3,
}

impl SchematicFormat {
    /// File extension conventionally used for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            SchematicFormat::Legacy => "schematic",
            SchematicFormat::SpongeV2 | SchematicFormat::SpongeV3 => "schem",
        }
    }

    /// Game data version written when the caller does not pick one.
    pub const fn default_data_version(self) -> i32 {
        match self {
            SchematicFormat::Legacy => 0,
            SchematicFormat::SpongeV2 => 3953,
            SchematicFormat::SpongeV3 => 4189,
        }
    }
}

impl FromStr for SchematicFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "schematic" | "1" => Ok(SchematicFormat::Legacy),
            "v2" | "2" => Ok(SchematicFormat::SpongeV2),
            "v3" | "3" => Ok(SchematicFormat::SpongeV3),
            _ => Err(Error::UnsupportedVersion {
                version: s.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for SchematicFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(match self {
            SchematicFormat::Legacy => "legacy",
            SchematicFormat::SpongeV2 => "v2",
            SchematicFormat::SpongeV3 => "v3",
        })
    }
}

/// Where glass from base+glass matching ends up.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GlassLayer {
    /// Two layers: bases at `y = 0`, glass at `y = 1`.
    #[default]
    Stacked,
    /// One layer of bases; glass is dropped.
    Omitted,
}

impl GlassLayer {
    pub const fn height(self) -> usize {
        match self {
            GlassLayer::Stacked => 2,
            GlassLayer::Omitted => 1,
        }
    }
}

impl FromStr for GlassLayer {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stacked" => Ok(GlassLayer::Stacked),
            "omitted" => Ok(GlassLayer::Omitted),
            _ => Err(format!("unknown glass layer {s:?} (expected stacked or omitted)")),
        }
    }
}

/// Provenance written into `Metadata/WorldEdit` of v3 schematics.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldEditMetadata {
    pub platform_id: String,
    pub platform_name: String,
    pub editing_platform: String,
    pub version: String,
}

impl Default for WorldEditMetadata {
    fn default() -> Self {
        Self {
            platform_id: "intellectualsites:bukkit".into(),
            platform_name: "Bukkit-Official".into(),
            editing_platform: "intellectualsites.bukkit".into(),
            version: "2.12.3".into(),
        }
    }
}

impl WorldEditMetadata {
    fn to_tag(&self) -> TagValue {
        let platform = Compound::new()
            .with("Name", self.platform_name.as_str())
            .with("Version", self.version.as_str());
        Compound::new()
            .with(
                "Platforms",
                Compound::new().with(self.platform_id.as_str(), platform),
            )
            .with("EditingPlatform", self.editing_platform.as_str())
            .with("Version", self.version.as_str())
            .with("Origin", TagValue::IntArray(vec![0, 0, 0]))
            .into()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportOptions {
    pub format: SchematicFormat,
    pub glass_layer: GlassLayer,
    pub data_version: i32,
    /// `Metadata/Date` of v3 schematics, in milliseconds since the Unix epoch.
    pub date_millis: i64,
}

impl ExportOptions {
    pub fn new(format: SchematicFormat) -> Self {
        Self {
            format,
            glass_layer: GlassLayer::default(),
            data_version: format.default_data_version(),
            date_millis: 0,
        }
    }

    pub fn with_glass_layer(mut self, glass_layer: GlassLayer) -> Self {
        self.glass_layer = glass_layer;
        self
    }

    pub fn with_date_millis(mut self, date_millis: i64) -> Self {
        self.date_millis = date_millis;
        self
    }
}

/// Dense `width x height x length` voxel storage in schematic order.
#[derive(Clone, Debug)]
pub struct VoxelBuffer<T> {
    width: usize,
    height: usize,
    length: usize,
    data: Vec<T>,
}

impl<T: Clone> VoxelBuffer<T> {
    pub fn new(width: usize, height: usize, length: usize, fill: T) -> Self {
        Self {
            width,
            height,
            length,
            data: vec![fill; width * height * length],
        }
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.length);
        x + z * self.width + y * self.width * self.length
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let index = self.index(x, y, z);
        self.data[index] = value;
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> &T {
        &self.data[self.index(x, y, z)]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

/// Turns a row-major grid of [`ResolvedCell`]s into a schematic.
pub struct SchematicAssembler<'a> {
    legacy_ids: &'a LegacyIdTable,
    worldedit: WorldEditMetadata,
    codec: GzipCodec,
}

impl<'a> SchematicAssembler<'a> {
    pub fn new(legacy_ids: &'a LegacyIdTable) -> Self {
        Self {
            legacy_ids,
            worldedit: WorldEditMetadata::default(),
            codec: GzipCodec::default(),
        }
    }

    pub fn with_worldedit(mut self, worldedit: WorldEditMetadata) -> Self {
        self.worldedit = worldedit;
        self
    }

    pub fn with_codec(mut self, codec: GzipCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Build the complete tag tree. `cells` holds `width * length` cells, x varying fastest.
    #[tracing::instrument(skip_all, fields(width = width, length = length, format = %options.format))]
    pub fn build_tree(
        &self,
        width: usize,
        length: usize,
        cells: &[ResolvedCell],
        options: &ExportOptions,
    ) -> Result<TagValue> {
        let height = options.glass_layer.height();
        let dims = Dimensions {
            width: short("Width", width)?,
            height: short("Height", height)?,
            length: short("Length", length)?,
        };
        // Both sides fit an i16, so the product cannot overflow
        let expected = width * length;
        if cells.len() != expected {
            return Err(Error::GridSizeMismatch {
                width,
                length,
                expected,
                actual: cells.len(),
            });
        }

        let tree = match options.format {
            SchematicFormat::Legacy => self.legacy_tree(width, length, cells, options, &dims)?,
            SchematicFormat::SpongeV2 => {
                let needs_air = layout_has_air(cells, options.glass_layer);
                let (palette, blocks) = palette_layout(width, length, cells, options, needs_air)?;
                log::debug!("v2 palette has {} entries", palette.len());
                sponge_v2_tree(&dims, options, &palette, blocks)
            }
            SchematicFormat::SpongeV3 => {
                let (palette, blocks) = palette_layout(width, length, cells, options, true)?;
                log::debug!("v3 palette has {} entries", palette.len());
                self.sponge_v3_tree(&dims, options, &palette, &blocks)?
            }
        };
        Ok(tree)
    }

    /// Build, serialize and gzip a schematic.
    pub fn export(
        &self,
        width: usize,
        length: usize,
        cells: &[ResolvedCell],
        options: &ExportOptions,
    ) -> Result<Vec<u8>> {
        let tree = self.build_tree(width, length, cells, options)?;
        let raw = to_bytes(&tree, "")?;
        log::info!(
            "assembled {} schematic {}x{}x{} ({} bytes uncompressed)",
            options.format,
            width,
            options.glass_layer.height(),
            length,
            raw.len()
        );
        self.codec.compress(&raw)
    }

    fn legacy_tree(
        &self,
        width: usize,
        length: usize,
        cells: &[ResolvedCell],
        options: &ExportOptions,
        dims: &Dimensions,
    ) -> Result<TagValue> {
        let height = options.glass_layer.height();
        let mut voxels = VoxelBuffer::new(width, height, length, (0u8, 0u8));
        for_each_voxel(width, cells, options.glass_layer, |x, y, z, identifier| {
            voxels.set(x, y, z, self.legacy_ids.lookup(&identifier)?);
            Ok(())
        })?;
        let (blocks, data): (Vec<i8>, Vec<i8>) = voxels
            .into_inner()
            .into_iter()
            .map(|(id, data)| (id as i8, data as i8))
            .unzip();

        Ok(Compound::new()
            .with("Width", TagValue::Short(dims.width))
            .with("Height", TagValue::Short(dims.height))
            .with("Length", TagValue::Short(dims.length))
            .with("Materials", "Alpha")
            .with("Blocks", TagValue::ByteArray(blocks))
            .with("Data", TagValue::ByteArray(data))
            .with("WEOffsetX", TagValue::Int(0))
            .with("WEOffsetY", TagValue::Int(0))
            .with("WEOffsetZ", TagValue::Int(0))
            .with("Entities", TagValue::empty_list(TagKind::Compound))
            .with("TileEntities", TagValue::empty_list(TagKind::Compound))
            .into())
    }

    fn sponge_v3_tree(
        &self,
        dims: &Dimensions,
        options: &ExportOptions,
        palette: &Palette,
        blocks: &[i32],
    ) -> Result<TagValue> {
        let data = encode_var_int_array(blocks)?;
        let data = data.iter().map(|&b| b as i8).collect();
        let blocks = Compound::new()
            .with("Palette", palette.to_tag())
            .with("Data", TagValue::ByteArray(data))
            .with("BlockEntities", TagValue::empty_list(TagKind::Compound));
        let metadata = Compound::new()
            .with("WorldEdit", self.worldedit.to_tag())
            .with("Date", TagValue::Long(options.date_millis));
        let schematic = Compound::new()
            .with("Version", TagValue::Int(3))
            .with("DataVersion", TagValue::Int(options.data_version))
            .with("Width", TagValue::Short(dims.width))
            .with("Height", TagValue::Short(dims.height))
            .with("Length", TagValue::Short(dims.length))
            .with("Offset", TagValue::IntArray(vec![0, 0, 0]))
            .with("Blocks", blocks)
            .with("Metadata", metadata);
        Ok(Compound::new().with("Schematic", schematic).into())
    }
}

struct Dimensions {
    width: i16,
    height: i16,
    length: i16,
}

fn short(axis: &'static str, value: usize) -> Result<i16> {
    i16::try_from(value).map_err(|_| Error::DimensionOutOfRange { axis, value })
}

/// Whether any voxel of the layout is left empty.
fn layout_has_air(cells: &[ResolvedCell], glass_layer: GlassLayer) -> bool {
    cells.iter().any(|cell| match cell {
        ResolvedCell::Air => true,
        ResolvedCell::Block { glass, .. } => {
            glass_layer == GlassLayer::Stacked && glass.as_ref().is_none_or(|g| g.is_sentinel())
        }
    })
}

/// Visit every non-air voxel with its block identifier, cell by cell: base first, then glass.
fn for_each_voxel<F>(width: usize, cells: &[ResolvedCell], glass_layer: GlassLayer, mut f: F) -> Result<()>
where
    F: FnMut(usize, usize, usize, String) -> Result<()>,
{
    for (i, cell) in cells.iter().enumerate() {
        let (x, z) = (i % width, i / width);
        let ResolvedCell::Block { base, glass } = cell else {
            continue;
        };
        f(x, 0, z, base.identifier())?;
        if glass_layer == GlassLayer::Stacked {
            if let Some(glass) = glass.as_ref().filter(|g| !g.is_sentinel()) {
                f(x, 1, z, glass.identifier())?;
            }
        }
    }
    Ok(())
}

/// Assign palette indices in first-seen order and lay them out as voxels. Empty voxels hold
/// air's index, which is 0 whenever `reserve_air` is set.
fn palette_layout(
    width: usize,
    length: usize,
    cells: &[ResolvedCell],
    options: &ExportOptions,
    reserve_air: bool,
) -> Result<(Palette, Vec<i32>)> {
    let mut palette = Palette::new();
    let air = if reserve_air { palette.reserve_air()? } else { 0 };
    let mut voxels = VoxelBuffer::new(width, options.glass_layer.height(), length, air);
    for_each_voxel(width, cells, options.glass_layer, |x, y, z, identifier| {
        voxels.set(x, y, z, palette.index_of(&identifier));
        Ok(())
    })?;
    Ok((palette, voxels.into_inner()))
}

fn sponge_v2_tree(
    dims: &Dimensions,
    options: &ExportOptions,
    palette: &Palette,
    blocks: Vec<i32>,
) -> TagValue {
    Compound::new()
        .with("SchematicVersion", TagValue::Int(2))
        .with("Version", TagValue::Int(2))
        .with("DataVersion", TagValue::Int(options.data_version))
        .with("Width", TagValue::Short(dims.width))
        .with("Height", TagValue::Short(dims.height))
        .with("Length", TagValue::Short(dims.length))
        .with("Offset", TagValue::IntArray(vec![0, 0, 0]))
        .with("PaletteMax", TagValue::Int(palette.len() as i32))
        .with("Palette", palette.to_tag())
        .with("BlockData", TagValue::IntArray(blocks))
        .with("BlockEntities", TagValue::empty_list(TagKind::Compound))
        .into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Read;

    use serde::Deserialize;

    use super::*;
    use crate::catalog::{BlockDescriptor, Catalog};
    use crate::color::Rgb8;
    use crate::matcher::{BlockMatcher, MatchMode};
    use crate::palette::AIR;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SpongeV2 {
        schematic_version: i32,
        data_version: i32,
        width: i16,
        height: i16,
        length: i16,
        offset: fastnbt::IntArray,
        palette_max: i32,
        palette: HashMap<String, i32>,
        block_data: fastnbt::IntArray,
        block_entities: Vec<fastnbt::Value>,
    }

    #[derive(Debug, Deserialize)]
    struct SpongeV3Root {
        #[serde(rename = "Schematic")]
        schematic: SpongeV3,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SpongeV3 {
        version: i32,
        data_version: i32,
        width: i16,
        height: i16,
        length: i16,
        blocks: SpongeV3Blocks,
        metadata: SpongeV3Metadata,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SpongeV3Blocks {
        palette: HashMap<String, i32>,
        data: fastnbt::ByteArray,
        block_entities: Vec<fastnbt::Value>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SpongeV3Metadata {
        world_edit: fastnbt::Value,
        date: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Legacy {
        width: i16,
        height: i16,
        length: i16,
        materials: String,
        blocks: fastnbt::ByteArray,
        data: fastnbt::ByteArray,
        #[serde(rename = "WEOffsetX")]
        we_offset_x: i32,
        tile_entities: Vec<fastnbt::Value>,
    }

    fn block(name: &str, r: u8, g: u8, b: u8) -> BlockDescriptor {
        BlockDescriptor::new(name, Rgb8::new(r, g, b))
    }

    fn glass(name: &str) -> BlockDescriptor {
        BlockDescriptor::new(name, Rgb8::new(51, 76, 178)).with_alpha(0.5)
    }

    fn gunzip(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(bytes)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn decode_var_ints(bytes: &[i8]) -> Vec<i32> {
        let mut values = Vec::new();
        let (mut value, mut shift) = (0i32, 0);
        for &b in bytes {
            let b = b as u8;
            value |= ((b & 0x7f) as i32) << shift;
            if b & 0x80 == 0 {
                values.push(value);
                value = 0;
                shift = 0;
            } else {
                shift += 7;
            }
        }
        values
    }

    fn rgbw() -> Vec<ResolvedCell> {
        vec![
            ResolvedCell::block(block("red_concrete", 142, 33, 33)),
            ResolvedCell::block(block("green_concrete", 73, 91, 36)),
            ResolvedCell::block(block("blue_concrete", 45, 47, 143)),
            ResolvedCell::block(block("white_concrete", 207, 213, 214)),
        ]
    }

    #[test]
    fn test_voxel_index_order() {
        let mut voxels = VoxelBuffer::new(4, 2, 4, -1);
        for x in 0..4 {
            voxels.set(x, 0, 0, 10 + x as i32);
        }
        assert_eq!(&voxels.as_slice()[0..4], &[10, 11, 12, 13]);
        assert_eq!(voxels.index(0, 0, 1), 4);
        assert_eq!(voxels.index(0, 1, 0), 16);
        assert_eq!(voxels.index(3, 1, 3), 31);
        assert_eq!(*voxels.get(2, 0, 0), 12);
    }

    #[test]
    fn test_v2_end_to_end() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let options =
            ExportOptions::new(SchematicFormat::SpongeV2).with_glass_layer(GlassLayer::Omitted);
        let bytes = assembler.export(2, 2, &rgbw(), &options).unwrap();
        let schematic: SpongeV2 = fastnbt::from_bytes(&gunzip(&bytes)).unwrap();

        assert_eq!(schematic.schematic_version, 2);
        assert_eq!(schematic.data_version, 3953);
        assert_eq!(
            (schematic.width, schematic.height, schematic.length),
            (2, 1, 2)
        );
        assert_eq!(schematic.offset.into_inner(), vec![0, 0, 0]);
        assert_eq!(schematic.palette_max, 4);
        assert_eq!(schematic.palette.len(), 4);
        assert!(!schematic.palette.contains_key(AIR));
        assert_eq!(schematic.palette["minecraft:red_concrete"], 0);
        assert_eq!(schematic.palette["minecraft:white_concrete"], 3);
        assert_eq!(schematic.block_data.into_inner(), vec![0, 1, 2, 3]);
        assert!(schematic.block_entities.is_empty());
    }

    #[test]
    fn test_v2_reserves_air_for_empty_voxels() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let mut cells = rgbw();
        cells[1] = ResolvedCell::Air;
        let options =
            ExportOptions::new(SchematicFormat::SpongeV2).with_glass_layer(GlassLayer::Omitted);
        let bytes = assembler.export(2, 2, &cells, &options).unwrap();
        let schematic: SpongeV2 = fastnbt::from_bytes(&gunzip(&bytes)).unwrap();
        assert_eq!(schematic.palette[AIR], 0);
        assert_eq!(schematic.palette_max, 4);
        assert_eq!(schematic.block_data.into_inner(), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_v3_stacked_glass() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let stone = block("stone", 125, 125, 125);
        let cells = vec![
            ResolvedCell::with_glass(stone.clone(), glass("blue_stained_glass")),
            ResolvedCell::block(stone.clone()),
            ResolvedCell::Air,
            ResolvedCell::with_glass(block("white_concrete", 207, 213, 214), glass("blue_stained_glass")),
        ];
        let options = ExportOptions::new(SchematicFormat::SpongeV3).with_date_millis(1_700_000_000_000);
        let bytes = assembler.export(2, 2, &cells, &options).unwrap();
        let root: SpongeV3Root = fastnbt::from_bytes(&gunzip(&bytes)).unwrap();
        let schematic = root.schematic;

        assert_eq!(schematic.version, 3);
        assert_eq!(schematic.data_version, 4189);
        assert_eq!(
            (schematic.width, schematic.height, schematic.length),
            (2, 2, 2)
        );
        let palette = &schematic.blocks.palette;
        assert_eq!(palette[AIR], 0);
        assert_eq!(palette["minecraft:stone"], 1);
        assert_eq!(palette["minecraft:blue_stained_glass"], 2);
        assert_eq!(palette["minecraft:white_concrete"], 3);
        assert_eq!(
            decode_var_ints(&schematic.blocks.data.into_inner()),
            vec![1, 1, 0, 3, 2, 0, 0, 2]
        );
        assert!(schematic.blocks.block_entities.is_empty());
        assert_eq!(schematic.metadata.date, 1_700_000_000_000);

        let fastnbt::Value::Compound(world_edit) = schematic.metadata.world_edit else {
            panic!("WorldEdit is not a compound");
        };
        assert_eq!(
            world_edit["EditingPlatform"],
            fastnbt::Value::String("intellectualsites.bukkit".into())
        );
        let fastnbt::Value::Compound(platforms) = &world_edit["Platforms"] else {
            panic!("Platforms is not a compound");
        };
        assert!(platforms.contains_key("intellectualsites:bukkit"));
    }

    #[test]
    fn test_v3_palette_indices_beyond_one_byte() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let cells: Vec<_> = (0..200)
            .map(|i| ResolvedCell::block(block(&format!("block_{i}"), 0, 0, 0)))
            .collect();
        let options =
            ExportOptions::new(SchematicFormat::SpongeV3).with_glass_layer(GlassLayer::Omitted);
        let tree = assembler.build_tree(200, 1, &cells, &options).unwrap();
        let root: SpongeV3Root = fastnbt::from_bytes(&to_bytes(&tree, "").unwrap()).unwrap();
        let data = decode_var_ints(&root.schematic.blocks.data.into_inner());
        assert_eq!(data, (1..=200).collect::<Vec<_>>());
    }

    #[test]
    fn test_legacy_layout() {
        let mut table = LegacyIdTable::default();
        table.insert("stone", 1, 0);
        table.insert("blue_stained_glass", 95, 11);
        let assembler = SchematicAssembler::new(&table);
        let cells = vec![
            ResolvedCell::with_glass(block("stone", 125, 125, 125), glass("blue_stained_glass")),
            ResolvedCell::Air,
        ];
        let bytes = assembler
            .export(2, 1, &cells, &ExportOptions::new(SchematicFormat::Legacy))
            .unwrap();
        let schematic: Legacy = fastnbt::from_bytes(&gunzip(&bytes)).unwrap();
        assert_eq!(
            (schematic.width, schematic.height, schematic.length),
            (2, 2, 1)
        );
        assert_eq!(schematic.materials, "Alpha");
        assert_eq!(schematic.blocks.into_inner(), vec![1, 0, 95, 0]);
        assert_eq!(schematic.data.into_inner(), vec![0, 0, 11, 0]);
        assert_eq!(schematic.we_offset_x, 0);
        assert!(schematic.tile_entities.is_empty());

        let unknown = vec![ResolvedCell::block(block("deepslate", 80, 80, 80))];
        assert!(matches!(
            assembler.build_tree(1, 1, &unknown, &ExportOptions::new(SchematicFormat::Legacy)),
            Err(Error::UnknownLegacyBlock { .. })
        ));
    }

    #[test]
    fn test_legacy_export_with_default_catalogs() {
        let table = LegacyIdTable::builtin().unwrap();
        let blocks = Catalog::default_blocks().unwrap().legacy_mappable(&table);
        let glass = Catalog::default_glass().unwrap().legacy_mappable(&table);
        let matcher = BlockMatcher::new(&blocks, &glass).unwrap();

        // Every default block color, including ones with no legacy id, plus a coarse sweep
        let mut targets: Vec<Option<Rgb8>> = Catalog::default_blocks()
            .unwrap()
            .entries()
            .iter()
            .map(|entry| Some(entry.color))
            .collect();
        targets.push(Some(Rgb8::new(135, 101, 59)));
        for v in (0..=255).step_by(51) {
            targets.push(Some(Rgb8::new(v, 255 - v, v / 2)));
        }
        let width = targets.len();

        let assembler = SchematicAssembler::new(&table);
        for mode in [MatchMode::Single, MatchMode::WithGlass] {
            let cells = matcher.resolve_grid(&targets, mode).unwrap();
            let bytes = assembler
                .export(width, 1, &cells, &ExportOptions::new(SchematicFormat::Legacy))
                .unwrap();
            let schematic: Legacy = fastnbt::from_bytes(&gunzip(&bytes)).unwrap();
            assert_eq!(schematic.width as usize, width);
        }
    }

    #[test]
    fn test_grid_size_mismatch() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let result = assembler.build_tree(3, 2, &rgbw(), &ExportOptions::new(SchematicFormat::SpongeV2));
        assert!(matches!(
            result,
            Err(Error::GridSizeMismatch {
                expected: 6,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn test_dimension_out_of_range() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let cells = vec![ResolvedCell::Air; 40_000];
        let result = assembler.build_tree(40_000, 1, &cells, &ExportOptions::new(SchematicFormat::SpongeV3));
        assert!(matches!(
            result,
            Err(Error::DimensionOutOfRange {
                axis: "Width",
                value: 40_000
            })
        ));
    }

    #[test]
    fn test_huge_dimensions_rejected_before_sizing() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let result = assembler.build_tree(usize::MAX, 2, &[], &ExportOptions::new(SchematicFormat::SpongeV2));
        assert!(matches!(
            result,
            Err(Error::DimensionOutOfRange { axis: "Width", .. })
        ));
    }

    #[test]
    fn test_transparent_grid_is_all_air() {
        let table = LegacyIdTable::default();
        let assembler = SchematicAssembler::new(&table);
        let cells = vec![ResolvedCell::Air; 4];
        let tree = assembler
            .build_tree(2, 2, &cells, &ExportOptions::new(SchematicFormat::SpongeV2))
            .unwrap();
        let schematic: SpongeV2 = fastnbt::from_bytes(&to_bytes(&tree, "").unwrap()).unwrap();
        assert_eq!(schematic.palette_max, 1);
        assert_eq!(schematic.block_data.into_inner(), vec![0; 8]);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("v2".parse::<SchematicFormat>().unwrap(), SchematicFormat::SpongeV2);
        assert_eq!("Legacy".parse::<SchematicFormat>().unwrap(), SchematicFormat::Legacy);
        assert_eq!("3".parse::<SchematicFormat>().unwrap(), SchematicFormat::SpongeV3);
        assert!(matches!(
            "v4".parse::<SchematicFormat>(),
            Err(Error::UnsupportedVersion { .. })
        ));
        assert_eq!("omitted".parse::<GlassLayer>(), Ok(GlassLayer::Omitted));
        assert_eq!(SchematicFormat::Legacy.extension(), "schematic");
    }
}
