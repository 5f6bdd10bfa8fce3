use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{error, info, warn};
use simplelog::{Config, WriteLogger};

use pdf_overlay::export::{ManifestWriter, edited_file_name, write_output};
use pdf_overlay::notification::NoticeLevel;
use pdf_overlay::overlay::controllers::{ClickOutcome, Key};
use pdf_overlay::overlay::{EditorConfig, EditorSession, ElementId, Tool};
use pdf_overlay::panic_handler;
use pdf_overlay::pdf::{DEFAULT_TEXT_CACHE_SIZE, RenderService};
use pdf_overlay::settings;

mod cli;

use cli::{CliArgs, CliCommand, MoveSpec, Replacement, ShapeSpec, TextPlacement, ViewArgs};

/// Covers the slowest stabilize retry plus a generous render budget
const SETTLE_TIMEOUT: Duration = Duration::from_secs(15);

fn main() -> Result<()> {
    let args = CliArgs::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("cannot create log file {}", args.log_file.display()))?,
    )?;
    panic_handler::initialize_panic_handler();

    info!("Starting pdf-overlay");
    settings::load_settings(args.config.as_deref());
    let config = settings::editor_config();

    let result = match args.command {
        CliCommand::Inspect {
            file,
            view,
            raster,
            json,
        } => inspect(&config, &file, view, raster.as_deref(), json),
        CliCommand::Edit {
            file,
            view,
            add_text,
            shapes,
            replace,
            moves,
            delete,
            out,
        } => {
            let script = EditScript {
                add_text,
                shapes,
                replace,
                moves,
                delete: delete.iter().map(|id| ElementId::from(id.as_str())).collect(),
            };
            edit(&config, &file, view, &script, out)
        }
    };

    if let Err(err) = &result {
        error!("Command failed: {err:?}");
    }
    info!("Shutting down pdf-overlay");
    result
}

/// A session with the requested page rendered and its overlay built
struct OpenDocument {
    session: EditorSession,
    // Kept alive so the worker thread outlives the session's use
    _service: RenderService,
    bytes: Vec<u8>,
}

fn open_document(config: &EditorConfig, path: &Path, view: ViewArgs) -> Result<OpenDocument> {
    let bytes = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    info!("Opening {} ({} bytes)", path.display(), bytes.len());

    let mut session = EditorSession::new(config.clone());
    let mut service = RenderService::new(config.editor_width_px, DEFAULT_TEXT_CACHE_SIZE);

    service.open(&mut session, bytes.clone());
    settle(&mut service, &mut session)?;
    if !session.lifecycle().has_document() {
        bail!(
            "cannot open {}: {}",
            path.display(),
            last_error(&session).unwrap_or_else(|| "unknown error".to_string())
        );
    }

    if view.page != session.page() {
        let effects = session.go_to_page(view.page);
        if effects.is_empty() {
            bail!(
                "page {} is out of range (document has {} pages)",
                view.page,
                session.page_count()
            );
        }
        service.execute(effects);
        settle(&mut service, &mut session)?;
    }
    if let Some(zoom) = view.zoom {
        let effects = session.set_zoom(zoom);
        service.execute(effects);
        settle(&mut service, &mut session)?;
    }

    if session.page_view().is_none() {
        bail!(
            "page {} did not render: {}",
            session.page(),
            last_error(&session).unwrap_or_else(|| "unknown error".to_string())
        );
    }

    Ok(OpenDocument {
        session,
        _service: service,
        bytes,
    })
}

fn settle(service: &mut RenderService, session: &mut EditorSession) -> Result<()> {
    if service.run_until_settled(session, SETTLE_TIMEOUT) {
        Ok(())
    } else {
        Err(anyhow!(
            "rendering did not settle within {}s",
            SETTLE_TIMEOUT.as_secs()
        ))
    }
}

fn last_error(session: &EditorSession) -> Option<String> {
    session
        .notices()
        .all()
        .iter()
        .find(|n| n.level == NoticeLevel::Error)
        .map(|n| n.message.clone())
}

fn inspect(
    config: &EditorConfig,
    path: &Path,
    view: ViewArgs,
    raster_out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let doc = open_document(config, path, view)?;
    let session = &doc.session;
    let page_view = session
        .page_view()
        .ok_or_else(|| anyhow!("no page is displayed"))?;

    if let Some(out) = raster_out {
        let raster = &page_view.raster;
        let image =
            image::RgbImage::from_raw(raster.width_px, raster.height_px, raster.pixels.clone())
                .ok_or_else(|| anyhow!("raster buffer does not match its dimensions"))?;
        image
            .save(out)
            .with_context(|| format!("cannot write {}", out.display()))?;
        info!("Saved raster to {}", out.display());
    }

    let snapshot = session.snapshot();
    if json {
        let report = serde_json::json!({
            "file": path.display().to_string(),
            "page": session.page(),
            "page_count": session.page_count(),
            "zoom": session.zoom(),
            "raster": {
                "width_px": page_view.raster.width_px,
                "height_px": page_view.raster.height_px,
            },
            "overlay": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}: page {}/{} at {:.0}% ({}x{} px)",
        path.display(),
        session.page(),
        session.page_count(),
        session.zoom() * 100.0,
        page_view.raster.width_px,
        page_view.raster.height_px
    );
    println!("{} text runs, {} masks", snapshot.text_runs.len(), snapshot.masks.len());
    for run in &snapshot.text_runs {
        println!(
            "  {:<10} ({:>7.1}, {:>7.1}) {:>6.1}° {:>5.1}px  {}",
            run.id.as_str(),
            run.placement.x,
            run.placement.y,
            run.placement.rotation_degrees,
            run.style.font_size_px,
            run.text
        );
    }
    Ok(())
}

struct EditScript {
    add_text: Vec<TextPlacement>,
    shapes: Vec<ShapeSpec>,
    replace: Vec<Replacement>,
    moves: Vec<MoveSpec>,
    delete: Vec<ElementId>,
}

fn edit(
    config: &EditorConfig,
    path: &Path,
    view: ViewArgs,
    script: &EditScript,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut doc = open_document(config, path, view)?;
    let session = &mut doc.session;

    for Replacement { id, text } in &script.replace {
        replace_text(session, id, text)?;
    }
    for MoveSpec { id, to } in &script.moves {
        move_element(session, id, *to)?;
    }
    for id in &script.delete {
        session.clear_selection();
        session.select(id)?;
        session
            .delete_selected(false)?
            .ok_or_else(|| anyhow!("nothing deleted for {id}"))?;
        println!("deleted {id}");
    }

    if !script.add_text.is_empty() {
        session.set_tool(Tool::Text);
        for TextPlacement { at, text } in &script.add_text {
            let style = session.config().text_style.clone();
            session.place_text(*at, style);
            session.type_text(text)?;
            match session.text_key(Key::Enter) {
                Some(id) => println!("added {id}"),
                None => warn!("Free text at {at:?} was discarded"),
            }
        }
    }

    for ShapeSpec { kind, start, end } in &script.shapes {
        let kind = session.select_shape_tool(*kind);
        let style = session.config().shape_style;
        session.begin_shape(*start, kind, style)?;
        session.update_shape_preview(*end);
        match session.commit_shape() {
            Some(id) => println!("added {id}"),
            None => println!("skipped {} shorter than the drag threshold", kind.as_str()),
        }
    }
    session.set_tool(Tool::None);

    if !session.has_unsaved_changes() {
        println!("no changes to apply");
        return Ok(());
    }

    let mut writer = ManifestWriter::new();
    let manifest = session.apply_changes(&mut writer, &doc.bytes)?;
    let out = out.unwrap_or_else(|| default_output(path));
    write_output(&out, &manifest)?;
    println!("wrote {}", out.display());
    Ok(())
}

/// Select, click again to edit, type, then blur to commit
fn replace_text(session: &mut EditorSession, id: &ElementId, text: &str) -> Result<()> {
    session.clear_selection();
    session.click(id)?;
    match session.click(id)? {
        ClickOutcome::EditingStarted(_) => {}
        other => bail!("{id} did not enter editing ({other:?})"),
    }
    session.edit_input(text)?;
    match session.blur_edit()? {
        Some(id) => println!("replaced {id}"),
        None => println!("{id} unchanged"),
    }
    Ok(())
}

/// Drag an element by its top-left corner
fn move_element(
    session: &mut EditorSession,
    id: &ElementId,
    to: pdf_overlay::overlay::Point,
) -> Result<()> {
    session.clear_selection();
    session.select(id)?;
    let origin = session
        .model()
        .position_of(id)
        .ok_or_else(|| anyhow!("unknown element {id}"))?;
    if !session.begin_drag(id, origin)? {
        bail!("{id} cannot be dragged");
    }
    session.drag_to(to);
    match session.commit_drag()? {
        Some(at) => println!("moved {id} to ({:.1}, {:.1})", at.x, at.y),
        None => println!("{id} already at ({:.1}, {:.1})", to.x, to.y),
    }
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let name = PathBuf::from(edited_file_name(Some(input))).with_extension("json");
    match input.parent() {
        Some(dir) => dir.join(name),
        None => name,
    }
}
