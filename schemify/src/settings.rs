use std::collections::HashSet;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};
use serde::Deserialize;

use crate::catalog::View;
use crate::nbt::GzipCodec;
use crate::preview::PreviewOptions;
use crate::schematic::{ExportOptions, GlassLayer, SchematicFormat, WorldEditMetadata};

#[derive(Debug, Deserialize)]
struct RawDataVersion {
    v2: i32,
    v3: i32,
}

#[derive(Debug, Deserialize)]
struct RawExport {
    format: String,
    glass_layer: String,
    compression_level: u32,
    data_version: RawDataVersion,
}

#[derive(Debug, Deserialize)]
struct RawMatching {
    view_mode: String,
    exclude_block_entities: bool,
    #[serde(default)]
    block_entities: Vec<String>,
    transparency_threshold: u8,
}

#[derive(Debug)]
pub struct ExportSettings {
    pub format: SchematicFormat,
    pub glass_layer: GlassLayer,
    pub compression_level: u32,
    pub data_version_v2: i32,
    pub data_version_v3: i32,
}

impl ExportSettings {
    fn from_raw(raw: RawExport) -> anyhow::Result<ExportSettings> {
        Ok(ExportSettings {
            format: raw.format.parse()?,
            glass_layer: raw.glass_layer.parse().map_err(anyhow::Error::msg)?,
            compression_level: raw.compression_level,
            data_version_v2: raw.data_version.v2,
            data_version_v3: raw.data_version.v3,
        })
    }

    pub fn data_version(&self, format: SchematicFormat) -> i32 {
        match format {
            SchematicFormat::SpongeV2 => self.data_version_v2,
            SchematicFormat::SpongeV3 => self.data_version_v3,
            SchematicFormat::Legacy => format.default_data_version(),
        }
    }

    /// Options for exporting as `format` (or the configured format), stamped with `date_millis`.
    pub fn options(&self, format: Option<SchematicFormat>, date_millis: i64) -> ExportOptions {
        let format = format.unwrap_or(self.format);
        ExportOptions {
            format,
            glass_layer: self.glass_layer,
            data_version: self.data_version(format),
            date_millis,
        }
    }

    pub fn codec(&self) -> GzipCodec {
        GzipCodec::new(self.compression_level)
    }
}

#[derive(Debug)]
pub struct MatchingSettings {
    pub view_mode: View,
    pub exclude_block_entities: bool,
    pub block_entities: HashSet<String>,
    pub transparency_threshold: u8,
}

impl MatchingSettings {
    fn from_raw(raw: RawMatching) -> anyhow::Result<MatchingSettings> {
        Ok(MatchingSettings {
            view_mode: raw.view_mode.parse().map_err(anyhow::Error::msg)?,
            exclude_block_entities: raw.exclude_block_entities,
            block_entities: raw.block_entities.into_iter().collect(),
            transparency_threshold: raw.transparency_threshold,
        })
    }

    /// Block names to drop from the catalogs before matching.
    pub fn excluded(&self) -> HashSet<String> {
        if self.exclude_block_entities {
            self.block_entities.clone()
        } else {
            HashSet::new()
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub export: ExportSettings,
    pub worldedit: WorldEditMetadata,
    pub matching: MatchingSettings,
    pub preview: PreviewOptions,
}

impl Settings {
    pub fn config_builder() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(
            include_str!("settings_default.toml"),
            FileFormat::Toml,
        ))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Settings> {
        Ok(Settings {
            export: ExportSettings::from_raw(config.get("export")?)?,
            worldedit: WorldEditMetadata {
                platform_id: config.get_string("worldedit.platform_id")?,
                platform_name: config.get_string("worldedit.platform_name")?,
                editing_platform: config.get_string("worldedit.editing_platform")?,
                version: config.get_string("worldedit.version")?,
            },
            matching: MatchingSettings::from_raw(config.get("matching")?)?,
            preview: PreviewOptions {
                cell_size: u32::try_from(config.get_int("preview.cell_size")?)?,
                glass_opacity: config.get_float("preview.glass_opacity")?,
            },
        })
    }
}
