use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use pinreel::{
    DiskFrameLoader, FrameLoader as _, FrameRenderer as _, Page, SectionId, SectionSpec,
    SmoothOptions, Viewport,
};

#[derive(Parser, Debug)]
#[command(name = "pinreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one section at a given progress as a PNG.
    Frame(FrameArgs),
    /// Render an N-step progress sweep of one section as numbered PNGs.
    Sweep(SweepArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input page manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Section index within the manifest (mount order).
    #[arg(long, default_value_t = 0)]
    section: usize,

    /// Progress through the pinned travel, 0..=1.
    #[arg(long)]
    progress: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame asset root; defaults to the manifest's directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SweepArgs {
    /// Input page manifest JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Section index within the manifest (mount order).
    #[arg(long, default_value_t = 0)]
    section: usize,

    /// Number of progress steps; defaults to the section's frame count.
    #[arg(long)]
    steps: Option<u32>,

    /// Output directory for numbered PNGs.
    #[arg(long)]
    out_dir: PathBuf,

    /// Frame asset root; defaults to the manifest's directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

/// Page configuration consumed by the CLI.
#[derive(Debug, serde::Deserialize)]
struct PageManifest {
    viewport: Viewport,
    #[serde(default)]
    smooth: Option<SmoothOptions>,
    sections: Vec<SectionSpec>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Sweep(args) => cmd_sweep(args),
    }
}

fn read_manifest(path: &Path) -> anyhow::Result<PageManifest> {
    let f = File::open(path).with_context(|| format!("open page manifest '{}'", path.display()))?;
    let r = BufReader::new(f);
    let manifest: PageManifest =
        serde_json::from_reader(r).with_context(|| "parse page manifest JSON")?;
    Ok(manifest)
}

/// Mount every section of the manifest and load the target section's frames
/// from disk.
fn build_page(
    manifest: &PageManifest,
    section: usize,
    assets_root: &Path,
) -> anyhow::Result<(Page, SectionId)> {
    let mut page = Page::new(manifest.viewport)?;
    if let Some(smooth) = manifest.smooth {
        page.install_smooth(smooth)?;
    }

    let mut target = None;
    for (i, spec) in manifest.sections.iter().enumerate() {
        let (id, tickets) = page
            .mount_section(spec.clone())
            .with_context(|| format!("mount section {i} ('{}')", spec.sequence_name))?;
        if i == section {
            let loader = DiskFrameLoader::new(assets_root);
            for ticket in &tickets {
                page.deliver_frame(id, ticket, loader.fetch(&ticket.path));
            }
            target = Some(id);
        }
    }

    let target = target.with_context(|| {
        format!(
            "section index {section} out of range ({} sections)",
            manifest.sections.len()
        )
    })?;
    Ok((page, target))
}

fn write_surface_png(page: &Page, id: SectionId, out: &Path) -> anyhow::Result<()> {
    let engine = page.engine(id).context("section engine missing")?;
    let engine = engine.borrow();
    let surface = engine
        .renderer()
        .surface()
        .context("section renderer owns no pixel surface")?;

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        out,
        surface.pixels(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))
}

fn section_offset(page: &Page, id: SectionId, progress: f64) -> anyhow::Result<f64> {
    let region = page.section_region(id).context("section region missing")?;
    Ok(region.pin_start + progress.clamp(0.0, 1.0) * region.scroll_distance)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.in_path)?;
    let assets_root = args
        .assets
        .clone()
        .unwrap_or_else(|| args.in_path.parent().unwrap_or(Path::new(".")).to_path_buf());

    let (mut page, id) = build_page(&manifest, args.section, &assets_root)?;
    let offset = section_offset(&page, id, args.progress)?;
    page.jump_to(offset);

    write_surface_png(&page, id, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_sweep(args: SweepArgs) -> anyhow::Result<()> {
    let manifest = read_manifest(&args.in_path)?;
    let assets_root = args
        .assets
        .clone()
        .unwrap_or_else(|| args.in_path.parent().unwrap_or(Path::new(".")).to_path_buf());

    let (mut page, id) = build_page(&manifest, args.section, &assets_root)?;
    let frame_count = page
        .section_spec(id)
        .context("section spec missing")?
        .frame_count;
    let steps = args.steps.unwrap_or(frame_count).max(2);

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;

    for step in 0..steps {
        let progress = f64::from(step) / f64::from(steps - 1);
        let offset = section_offset(&page, id, progress)?;
        page.jump_to(offset);
        let out = args.out_dir.join(format!("{step:04}.png"));
        write_surface_png(&page, id, &out)?;
    }

    eprintln!("wrote {} frames to {}", steps, args.out_dir.display());
    Ok(())
}
