use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSetBuilder};
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Deserialize;
use sprite_dicing_host::{
    Artifacts, DicingPrefs, LoaderConfig, ModuleLoader, ModuleLocation, Pivot, ProgressReporting,
    SourceSprite, artifacts_meta, dice_with, sprites_to_json,
};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "sprite-dicing",
    about = "Dice sprite textures into atlases and meshes through the native module",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
    /// Native module path without extension (defaults to $SPRITE_DICING_MODULE, then <exe dir>/native/sprite_dicing)
    #[arg(long, global = true, help_heading = "Module")]
    module: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dice a file or directory of images
    Dice(DiceArgs),
    /// Resolve and load the native module, then report availability
    Probe,
}

#[derive(Parser, Debug, Clone)]
struct DiceArgs {
    // Input/Output
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory (defaults to the input directory)
    #[arg(short, long, help_heading = "Input/Output")]
    out_dir: Option<PathBuf>,
    /// YAML config file path (overrides dicing options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// Descend into subdirectories
    #[arg(long, default_value_t = false, help_heading = "Input/Output")]
    recursive: bool,
    /// Separator joining path components into sprite ids
    #[arg(long, default_value = "/", help_heading = "Input/Output")]
    separator: String,

    // Dicing
    /// Size of a diced unit, in pixels
    #[arg(long, default_value_t = 64, help_heading = "Dicing")]
    unit_size: u32,
    /// Pixels between units inside atlases
    #[arg(long, default_value_t = 2, help_heading = "Dicing")]
    padding: u32,
    /// Relative UV inset of units (0.0-1.0)
    #[arg(long, default_value_t = 0.0, help_heading = "Dicing")]
    uv_inset: f32,
    /// Drop fully transparent units
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Dicing")]
    trim: bool,
    /// Pixels per world unit for mesh vertices
    #[arg(long, default_value_t = 100.0, help_heading = "Dicing")]
    ppu: f32,
    /// Default pivot X (0.0-1.0)
    #[arg(long, default_value_t = 0.5, help_heading = "Dicing")]
    pivot_x: f32,
    /// Default pivot Y (0.0-1.0)
    #[arg(long, default_value_t = 0.5, help_heading = "Dicing")]
    pivot_y: f32,

    // Atlas
    /// Max atlas width or height
    #[arg(long, default_value_t = 2048, help_heading = "Atlas")]
    atlas_size_limit: u32,
    /// Force square atlases
    #[arg(long, default_value_t = false, help_heading = "Atlas")]
    square: bool,
    /// Force power-of-two atlas dimensions
    #[arg(long, default_value_t = false, help_heading = "Atlas")]
    pot: bool,
    /// Atlas image format: png | webp | tga
    #[arg(long, value_parser = ["png", "webp", "tga"], default_value = "png", help_heading = "Atlas")]
    atlas_format: String,

    // Export
    /// Also write dicing metadata (atlas sizes, prefs) to meta.json
    #[arg(long, default_value_t = false, help_heading = "Export")]
    meta: bool,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: dice and report stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let loader_cfg = match &cli.module {
        Some(p) => LoaderConfig::new(ModuleLocation::new(p)),
        None => LoaderConfig::from_env(),
    };
    match &cli.command {
        Commands::Dice(args) => run_dice(args, &loader_cfg, cli.progress && !cli.quiet),
        Commands::Probe => run_probe(&loader_cfg),
    }
}

fn run_dice(cli: &DiceArgs, loader_cfg: &LoaderConfig, show_progress: bool) -> anyhow::Result<()> {
    let mut prefs = DicingPrefs::builder()
        .unit_size(cli.unit_size)
        .padding(cli.padding)
        .uv_inset(cli.uv_inset)
        .trim_transparent(cli.trim)
        .atlas_size_limit(cli.atlas_size_limit)
        .atlas_square(cli.square)
        .atlas_pot(cli.pot)
        .pixels_per_unit(cli.ppu)
        .default_pivot(Pivot::new(cli.pivot_x, cli.pivot_y))
        .progress(if show_progress {
            ProgressReporting::Trace
        } else {
            ProgressReporting::Silent
        })
        .build();

    // Config file sets dicing options en bloc
    if let Some(path) = &cli.config {
        let file =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)?;
        prefs = y.into_prefs(prefs);
    }

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&prefs)?),
            _ => println!("{}", serde_json::to_string_pretty(&prefs)?),
        }
        return Ok(());
    }

    let root = input_root(&cli.input);
    let paths = gather_paths(&cli.input, cli.recursive, &cli.include, &cli.exclude)?;
    let sources = load_sources_with_progress(&root, &paths, &cli.separator, show_progress)?;
    info!(count = sources.len(), "loaded source sprites");

    let loader = ModuleLoader::from_config(loader_cfg);
    let start = Instant::now();
    let out = dice_with(&loader, &sources, &prefs)
        .with_context(|| format!("dice {} sources", sources.len()))?;
    let dur = start.elapsed();
    info!(time = %fmt_dur(dur), "{}", out.stats().summary());

    if cli.dry_run {
        println!("{} time={}", out.stats().summary(), fmt_dur(dur));
        return Ok(());
    }

    let out_dir = cli.out_dir.clone().unwrap_or(root);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("create out_dir {}", out_dir.display()))?;
    write_outputs(&out, &prefs, &out_dir, &cli.atlas_format, cli.meta)
}

fn run_probe(loader_cfg: &LoaderConfig) -> anyhow::Result<()> {
    let loader = ModuleLoader::from_config(loader_cfg);
    println!("module: {}", loader.describe());
    if loader.ensure_loaded() {
        println!("available: true");
        Ok(())
    } else {
        let reason = loader.last_error().unwrap_or_else(|| "unknown".into());
        println!("available: false");
        anyhow::bail!("native module not available: {}", reason)
    }
}

fn write_outputs(
    out: &Artifacts,
    prefs: &DicingPrefs,
    out_dir: &Path,
    format: &str,
    meta: bool,
) -> anyhow::Result<()> {
    let (ext, image_format) = atlas_format(format)?;
    for (i, atlas) in out.atlases.iter().enumerate() {
        let path = out_dir.join(format!("atlas_{}.{}", i, ext));
        let img = atlas.to_image()?;
        // webp and tga encoders take RGBA8 directly
        DynamicImage::ImageRgba8(img)
            .save_with_format(&path, image_format)
            .with_context(|| format!("write {}", path.display()))?;
        info!(?path, index = i, "wrote atlas");
    }

    let json_path = out_dir.join("sprites.json");
    let json = serde_json::to_string_pretty(&sprites_to_json(&out.sprites))?;
    fs::write(&json_path, json).with_context(|| format!("write {}", json_path.display()))?;
    info!(?json_path, sprites = out.sprites.len(), "sprites written");

    if meta {
        let meta_path = out_dir.join("meta.json");
        let value = artifacts_meta(out, prefs);
        fs::write(&meta_path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("write {}", meta_path.display()))?;
        info!(?meta_path, "meta exported");
    }
    Ok(())
}

fn atlas_format(name: &str) -> anyhow::Result<(&'static str, ImageFormat)> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "png" => ("png", ImageFormat::Png),
        "webp" => ("webp", ImageFormat::WebP),
        "tga" => ("tga", ImageFormat::Tga),
        other => anyhow::bail!("unknown atlas format: {}", other),
    })
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

/// Directory sprite ids are made relative to.
fn input_root(input: &Path) -> PathBuf {
    if input.is_file() {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        input.to_path_buf()
    }
}

fn gather_paths(
    path: &Path,
    recursive: bool,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    // Build glob matchers
    let mut inc_set = None;
    if !include.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in include {
            b.add(Glob::new(pat)?);
        }
        inc_set = Some(b.build()?);
    }
    let mut exc_set = None;
    if !exclude.is_empty() {
        let mut b = GlobSetBuilder::new();
        for pat in exclude {
            b.add(Glob::new(pat)?);
        }
        exc_set = Some(b.build()?);
    }
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        let walker = if recursive {
            WalkDir::new(path)
        } else {
            WalkDir::new(path).max_depth(1)
        };
        for entry in walker.sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(
    p: &Path,
    include: Option<&globset::GlobSet>,
    exclude: Option<&globset::GlobSet>,
) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif" | "webp")
    )
}

/// Path of `path` relative to `root`, extension dropped, components joined with `separator`.
fn eval_sprite_id(root: &Path, path: &Path, separator: &str) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel = rel.with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(separator)
}

fn load_sources_with_progress(
    root: &Path,
    paths: &[PathBuf],
    separator: &str,
    progress: bool,
) -> anyhow::Result<Vec<SourceSprite>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if let Some(b) = &bar {
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(img) => {
                let id = eval_sprite_id(root, p, separator);
                list.push(SourceSprite::from_image(id, &img));
            }
            Err(e) => {
                error!(?p, error = %e, "skip image");
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    if list.is_empty() && !paths.is_empty() {
        warn!("no input image could be decoded");
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    unit_size: Option<u32>,
    padding: Option<u32>,
    uv_inset: Option<f32>,
    trim_transparent: Option<bool>,
    atlas_size_limit: Option<u32>,
    atlas_square: Option<bool>,
    atlas_pot: Option<bool>,
    pixels_per_unit: Option<f32>,
    pivot_x: Option<f32>,
    pivot_y: Option<f32>,
    progress: Option<String>,
}

impl YamlConfig {
    fn into_prefs(self, mut prefs: DicingPrefs) -> DicingPrefs {
        if let Some(v) = self.unit_size {
            prefs.unit_size = v;
        }
        if let Some(v) = self.padding {
            prefs.padding = v;
        }
        if let Some(v) = self.uv_inset {
            prefs.uv_inset = v;
        }
        if let Some(v) = self.trim_transparent {
            prefs.trim_transparent = v;
        }
        if let Some(v) = self.atlas_size_limit {
            prefs.atlas_size_limit = v;
        }
        if let Some(v) = self.atlas_square {
            prefs.atlas_square = v;
        }
        if let Some(v) = self.atlas_pot {
            prefs.atlas_pot = v;
        }
        if let Some(v) = self.pixels_per_unit {
            prefs.pixels_per_unit = v;
        }
        if let Some(v) = self.pivot_x {
            prefs.default_pivot.x = v;
        }
        if let Some(v) = self.pivot_y {
            prefs.default_pivot.y = v;
        }
        if let Some(v) = self.progress {
            prefs.progress = v.parse().unwrap_or(prefs.progress);
        }
        prefs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_id_is_relative_without_extension() {
        let root = Path::new("assets");
        let id = eval_sprite_id(root, Path::new("assets/ui/buttons/ok.png"), "/");
        assert_eq!(id, "ui/buttons/ok");
    }

    #[test]
    fn sprite_id_uses_separator() {
        let root = Path::new("assets");
        let id = eval_sprite_id(root, Path::new("assets/hero/idle.01.png"), ".");
        assert_eq!(id, "hero.idle.01");
    }

    #[test]
    fn sprite_id_outside_root_keeps_full_path() {
        let id = eval_sprite_id(Path::new("other"), Path::new("a/b.png"), "/");
        assert_eq!(id, "a/b");
    }

    #[test]
    fn yaml_overrides_only_present_fields() {
        let y: YamlConfig = serde_yaml::from_str(
            "unit_size: 32\ntrim_transparent: false\npivot_y: 0.0\nprogress: trace\n",
        )
        .expect("yaml");
        let base = DicingPrefs::builder().padding(7).build();
        let prefs = y.into_prefs(base);
        assert_eq!(prefs.unit_size, 32);
        assert!(!prefs.trim_transparent);
        assert_eq!(prefs.padding, 7);
        assert_eq!(prefs.default_pivot, Pivot::new(0.5, 0.0));
        assert_eq!(prefs.progress, ProgressReporting::Trace);
    }

    #[test]
    fn unknown_progress_keeps_previous() {
        let y: YamlConfig = serde_yaml::from_str("progress: loud\n").expect("yaml");
        let prefs = y.into_prefs(DicingPrefs::default());
        assert_eq!(prefs.progress, ProgressReporting::Silent);
    }

    #[test]
    fn image_extensions_recognized() {
        assert!(is_image(Path::new("a/b.PNG")));
        assert!(is_image(Path::new("a/b.webp")));
        assert!(!is_image(Path::new("a/b.txt")));
        assert!(!is_image(Path::new("a/b")));
    }

    #[test]
    fn atlas_format_maps_extension() {
        assert_eq!(atlas_format("webp").expect("webp").0, "webp");
        assert!(atlas_format("bmp").is_err());
    }
}
