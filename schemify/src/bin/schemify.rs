use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use clap::Parser;
use config::FileFormat;
use image::imageops::FilterType;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use schemify::catalog::{Catalog, CatalogRole, LegacyIdTable, View};
use schemify::color::Rgb8;
use schemify::matcher::{BlockMatcher, MatchMode, ResolvedCell, block_list};
use schemify::preview::render_preview;
use schemify::schematic::{GlassLayer, SchematicAssembler, SchematicFormat};
use schemify::settings::Settings;

#[derive(Debug, clap::Parser)]
struct Cli {
    #[arg(long, default_value_t = false)]
    no_color: bool,
    #[arg(short, long)]
    config: Vec<String>,
    /// Block catalog JSON (defaults to the built-in catalog)
    #[arg(long)]
    blocks: Option<PathBuf>,
    /// Glass catalog JSON (defaults to the built-in catalog)
    #[arg(long)]
    glass: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args)]
struct MatchArgs {
    /// Match base blocks with stained glass laid over them
    #[arg(short, long, default_value_t = false)]
    glass_overlay: bool,
    /// Only use blocks suited to this view (both, top, side)
    #[arg(long)]
    view: Option<View>,
    /// Leave out blocks that carry block entities (chests, barrels, ...)
    #[arg(long, default_value_t = false)]
    no_block_entities: bool,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Convert an image into a schematic
    Export {
        image: PathBuf,
        /// Write schematic to specified file
        target: PathBuf,
        #[arg(short, long)]
        width: u32,
        #[arg(short, long)]
        length: u32,
        /// legacy, v2 or v3
        #[arg(short, long)]
        format: Option<SchematicFormat>,
        /// stacked or omitted
        #[arg(long)]
        glass_layer: Option<GlassLayer>,
        /// Legacy block id table JSON, for the legacy format
        #[arg(long)]
        legacy_ids: Option<PathBuf>,
        /// Also write a preview PNG of the result
        #[arg(long)]
        preview: Option<PathBuf>,
        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Print the block(s) closest to a color
    Match {
        #[arg(value_parser = parse_rgb8)]
        color: Rgb8,
        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Print the block list for an image, one line per cell
    List {
        image: PathBuf,
        #[arg(short, long)]
        width: u32,
        #[arg(short, long)]
        length: u32,
        #[command(flatten)]
        matching: MatchArgs,
    },
}

fn parse_rgb8(s: &str) -> Result<Rgb8, String> {
    s.parse()
}

fn load_catalog(role: CatalogRole, path: Option<&Path>) -> Result<Catalog> {
    let catalog = match (path, role) {
        (Some(path), _) => Catalog::from_json(role, &std::fs::read_to_string(path)?)?,
        (None, CatalogRole::Block) => Catalog::default_blocks()?,
        (None, CatalogRole::Glass) => Catalog::default_glass()?,
    };
    Ok(catalog)
}

/// Load an image, resize it to one pixel per cell and mark low-alpha pixels as transparent.
fn load_targets(path: &Path, width: u32, length: u32, threshold: u8) -> Result<Vec<Option<Rgb8>>> {
    let image = image::open(path)?.to_rgba8();
    log::debug!("loaded {:?}: {}x{}", path, image.width(), image.height());
    let resized = image::imageops::resize(&image, width, length, FilterType::Nearest);
    Ok(resized
        .pixels()
        .map(|p| (p[3] >= threshold).then(|| Rgb8::new(p[0], p[1], p[2])))
        .collect())
}

/// The block and glass catalogs after view and block entity filtering.
struct Session {
    blocks: Catalog,
    glass: Catalog,
    mode: MatchMode,
}

impl Session {
    /// With `legacy_ids`, blocks the legacy format cannot represent are dropped up front.
    fn new(
        cli: &Cli,
        settings: &Settings,
        args: &MatchArgs,
        legacy_ids: Option<&LegacyIdTable>,
    ) -> Result<Session> {
        let view = args.view.unwrap_or(settings.matching.view_mode);
        let excluded = if args.no_block_entities {
            settings.matching.block_entities.clone()
        } else {
            settings.matching.excluded()
        };
        let mut blocks = load_catalog(CatalogRole::Block, cli.blocks.as_deref())?;
        let mut glass = load_catalog(CatalogRole::Glass, cli.glass.as_deref())?;
        if let Some(legacy_ids) = legacy_ids {
            blocks = blocks.legacy_mappable(legacy_ids);
            glass = glass.legacy_mappable(legacy_ids);
        }
        let mode = if args.glass_overlay {
            MatchMode::WithGlass
        } else {
            MatchMode::Single
        };
        Ok(Session {
            blocks: blocks.filtered(view, &excluded),
            glass: glass.filtered(view, &excluded),
            mode,
        })
    }

    fn matcher(&self) -> Result<BlockMatcher<'_>> {
        Ok(BlockMatcher::new(&self.blocks, &self.glass)?)
    }
}

fn resolve_image(
    session: &Session,
    image: &Path,
    width: u32,
    length: u32,
    threshold: u8,
) -> Result<Vec<ResolvedCell>> {
    let targets = load_targets(image, width, length, threshold)?;
    let matcher = session.matcher()?;
    Ok(matcher.resolve_grid(&targets, session.mode)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(!cli.no_color)
        .init();
    log::debug!("args: {:?}", cli);

    let mut builder = Settings::config_builder();
    for config_path in cli.config.iter() {
        builder = builder.add_source(config::File::new(config_path.as_str(), FileFormat::Toml));
    }
    let config = builder.build()?;
    let settings = Settings::from_config(&config)?;
    let threshold = settings.matching.transparency_threshold;

    match &cli.command {
        Commands::Export {
            image,
            target,
            width,
            length,
            format,
            glass_layer,
            legacy_ids,
            preview,
            matching,
        } => {
            let date_millis = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis() as i64;
            let mut options = settings.export.options(*format, date_millis);
            let legacy_ids = match legacy_ids {
                Some(path) => LegacyIdTable::from_json(&std::fs::read_to_string(path)?)?,
                None => LegacyIdTable::builtin()?,
            };
            let restrict_to = (options.format == SchematicFormat::Legacy).then_some(&legacy_ids);
            let session = Session::new(&cli, &settings, matching, restrict_to)?;
            let cells = resolve_image(&session, image, *width, *length, threshold)?;

            options.glass_layer = match session.mode {
                MatchMode::WithGlass => glass_layer.unwrap_or(options.glass_layer),
                MatchMode::Single => GlassLayer::Omitted,
            };
            let assembler = SchematicAssembler::new(&legacy_ids)
                .with_worldedit(settings.worldedit.clone())
                .with_codec(settings.export.codec());
            let bytes = assembler.export(*width as usize, *length as usize, &cells, &options)?;
            log::info!("writing {} schematic to {:?}", options.format, target);
            std::fs::write(target, bytes)?;

            if let Some(preview) = preview {
                let image = render_preview(&cells, *width as usize, *length as usize, &settings.preview)?;
                log::info!("writing preview to {:?}", preview);
                image.save_with_format(preview, image::ImageFormat::Png)?;
            }
        }

        Commands::Match { color, matching } => {
            let session = Session::new(&cli, &settings, matching, None)?;
            let cell = session.matcher()?.resolve(Some(*color), session.mode)?;
            println!("{color}: {cell}");
        }

        Commands::List {
            image,
            width,
            length,
            matching,
        } => {
            let session = Session::new(&cli, &settings, matching, None)?;
            let cells = resolve_image(&session, image, *width, *length, threshold)?;
            print!("{}", block_list(&cells));
        }
    }

    Ok(())
}
