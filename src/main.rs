use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing::{debug, info};

use colorchef::backend::{
    BackendError, BlendParams, ColorBackend, HttpBackend, LineArtParams, PosterizeParams,
};
use colorchef::cli::{
    Args, BlendArgs, Command, ExtractArgs, LineArtArgs, PaletteArgs, PosterizeArgs, ViewArgs,
};
use colorchef::config::Settings;
use colorchef::export::{write_palette_png, PALETTE_FILE_NAME};
use colorchef::logging;
use colorchef::media::{self, MediaAsset};
use colorchef::picker;
use colorchef::selection::{SelectionSnapshot, DEFAULT_COLORS};
use colorchef::session::{ApplyOutcome, ResizePolicy, Session};
use colorchef::tui::{self, TuiApp};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose, args.command.is_interactive());

    let settings = Settings::new(&args.server, args.timeout);
    debug!(api = %settings.api_url, timeout = ?settings.timeout, "settings resolved");

    match args.command {
        Command::Extract(a) => run_extract(a, settings),
        Command::Palette(a) => run_palette(a),
        Command::Posterize(a) => run_posterize(a, &settings),
        Command::LineArt(a) => run_line_art(a, &settings),
        Command::Blend(a) => run_blend(a, &settings),
    }
}

fn run_extract(args: ExtractArgs, settings: Settings) -> Result<()> {
    let policy = if args.refetch_on_resize {
        ResizePolicy::Refetch
    } else {
        ResizePolicy::Reslice
    };
    let settings = settings.with_resize_policy(policy);
    let asset = media::inspect(&args.media)?;

    let target = args.view.colors.unwrap_or(DEFAULT_COLORS);
    let mut session = Session::new(target, settings.resize_policy);
    session.load_asset(asset.clone());
    if asset.is_video() {
        prepare_trim(&mut session, &args)?;
    }

    let backend = HttpBackend::new(&settings)?;
    let (token, request) = session.extract_request();
    info!(
        file = %asset.file_name(),
        colors = request.num_colors,
        trim = ?request.trim,
        "extracting colors"
    );
    let result = backend
        .extract(&asset, &request)
        .map_err(|e| anyhow!(e.user_message("upload file")))?;
    match session.apply_extraction(token, &result)? {
        ApplyOutcome::Applied(n) => info!(pairs = n, "palette ready"),
        ApplyOutcome::Stale => bail!("extraction result arrived for a different file"),
    }

    let image = if args.view.tui && !asset.is_video() {
        Some(picker::load(&asset.path)?)
    } else {
        None
    };
    let backend: Arc<dyn ColorBackend> = Arc::new(backend);
    finish(session, &args.view, Some(backend), image, &settings)
}

/// Set the video's duration, then apply `--start`/`--end` to the window.
fn prepare_trim(session: &mut Session, args: &ExtractArgs) -> Result<()> {
    let duration = match args.duration {
        Some(d) => d,
        None => media::probe_duration(&args.media)?,
    };
    let trim = session.trim_mut();
    trim.set_duration(duration)
        .with_context(|| format!("invalid video duration {duration}"))?;
    if let Some(start) = args.start {
        trim.slide_to(start).context("invalid --start")?;
    }
    if let Some(end) = args.end {
        trim.set_end(end).context("invalid --end")?;
    }
    if trim.needs_trim() && args.start.is_none() && args.end.is_none() {
        info!(
            duration,
            "video is longer than one window; analyzing {:.1}s - {:.1}s",
            trim.start(),
            trim.end()
        );
    }
    Ok(())
}

fn run_palette(args: PaletteArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.state)
        .with_context(|| format!("failed to read {}", args.state.display()))?;
    let snapshot: SelectionSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a saved palette", args.state.display()))?;

    let mut session = Session::new(snapshot.num_colors, ResizePolicy::Reslice);
    session
        .selection_mut()
        .restore(&snapshot)
        .with_context(|| format!("{} holds an invalid color", args.state.display()))?;
    if let Some(count) = args.view.colors {
        session.resize(count);
    }

    let image = args.image.as_deref().map(picker::load).transpose()?;
    finish(session, &args.view, None, image, &Settings::default())
}

/// Shared tail of `extract` and `palette`: shuffle, the terminal view, then
/// whatever outputs were asked for.
fn finish(
    mut session: Session,
    view: &ViewArgs,
    backend: Option<Arc<dyn ColorBackend>>,
    image: Option<image::RgbImage>,
    settings: &Settings,
) -> Result<()> {
    if view.shuffle {
        session.selection_mut().shuffle();
    }

    if view.tui {
        let export_path = palette_path(view.export.as_deref())?;
        let app = TuiApp::new(session, backend, image, export_path, settings.debounce);
        session = tui::run(app)?.into_session();
    }

    if let Some(path) = &view.save_state {
        let json = serde_json::to_string_pretty(&session.selection().snapshot())?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "saved palette state");
    }

    if !view.tui {
        if let Some(export) = &view.export {
            let path = palette_path(Some(export))?;
            write_palette_png(&session.selection().active_colors(), &path)?;
        }
    }

    if !view.tui && view.export.is_none() && view.save_state.is_none() {
        print_palette(&session);
    }
    Ok(())
}

/// Where the palette image goes. A directory gets the default file name.
fn palette_path(export: Option<&Path>) -> Result<PathBuf> {
    match export {
        Some(p) if p.is_dir() => Ok(p.join(PALETTE_FILE_NAME)),
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(std::env::current_dir()
            .context("failed to resolve the working directory")?
            .join(PALETTE_FILE_NAME)),
    }
}

fn print_palette(session: &Session) {
    let selection = session.selection();
    for (i, pair) in selection.active().iter().enumerate() {
        println!(
            "{:>2}  {}  ({:.2}, {:.2})",
            i + 1,
            pair.color.to_hex(),
            pair.region.x,
            pair.region.y
        );
    }
    for color in selection.picked() {
        println!(" *  {}", color.to_hex());
    }
    info!(
        shown = selection.active().len(),
        reserve = selection.reserve().len(),
        "palette printed"
    );
}

fn image_asset(path: &Path) -> Result<MediaAsset> {
    Ok(media::inspect_image(path)?)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}

fn run_posterize(args: PosterizeArgs, settings: &Settings) -> Result<()> {
    let asset = image_asset(&args.image)?;
    let backend = HttpBackend::new(settings)?;
    let params = PosterizeParams {
        pixel_size: args.opts.pixel_size,
        num_colors: args.opts.colors,
    };
    let fail = |e: BackendError| anyhow!(e.user_message("posterize image"));
    if args.svg {
        let svg = backend.posterize_svg(&asset, &params).map_err(fail)?;
        write_output(&args.output, svg.as_bytes())
    } else {
        let png = backend.posterize(&asset, &params).map_err(fail)?;
        write_output(&args.output, &png)
    }
}

fn run_line_art(args: LineArtArgs, settings: &Settings) -> Result<()> {
    let asset = image_asset(&args.image)?;
    let backend = HttpBackend::new(settings)?;
    let params = LineArtParams {
        threshold: args.opts.threshold,
        blur_radius: args.opts.blur_radius,
    };
    let fail = |e: BackendError| anyhow!(e.user_message("create line art"));
    if args.svg {
        let svg = backend.line_art_svg(&asset, &params).map_err(fail)?;
        write_output(&args.output, svg.as_bytes())
    } else {
        let png = backend.line_art(&asset, &params).map_err(fail)?;
        write_output(&args.output, &png)
    }
}

fn run_blend(args: BlendArgs, settings: &Settings) -> Result<()> {
    let asset = image_asset(&args.image)?;
    let backend = HttpBackend::new(settings)?;
    let params = BlendParams {
        posterize: PosterizeParams {
            pixel_size: args.posterize.pixel_size,
            num_colors: args.posterize.colors,
        },
        line_art: LineArtParams {
            threshold: args.line_art.threshold,
            blur_radius: args.line_art.blur_radius,
        },
    };
    let png = backend
        .blend_art(&asset, &params)
        .map_err(|e| anyhow!(e.user_message("blend art")))?;
    write_output(&args.output, &png)
}
