//! Subcommand implementations.

use crate::cli::{Cli, Command};
use inkpress_core::{DesignDocument, Editor, EditorConfig, EditorError, GeometryError, PageSpec, px_to_mm};
use inkpress_render::{EditorExportExt, RenderError};
use kurbo::Rect;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: not a design document: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize design: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Config(#[from] GeometryError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Execute the parsed command, writing human-readable output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> AppResult<()> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match &cli.command {
        Command::Info { design } => info(design, config, out),
        Command::Export {
            design,
            output,
            multiplier,
            print,
        } => export(design, output, *multiplier, *print, config, out),
        Command::ImportSvg { design, svg, output } => import_svg(design, svg, output, config, out),
        Command::New {
            output,
            name,
            width_mm,
            height_mm,
            bleed_mm,
            safe_mm,
            dpi,
        } => {
            let page = PageSpec::new(*width_mm, *height_mm, *bleed_mm, *dpi, *safe_mm)?;
            create(output, name, page, config, out)
        }
    }
}

fn read_document(path: &Path) -> AppResult<DesignDocument> {
    let json = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    DesignDocument::from_json(&json).map_err(|source| AppError::Document {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, bytes: &[u8]) -> AppResult<()> {
    std::fs::write(path, bytes).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_document(path: &Path, document: &DesignDocument) -> AppResult<()> {
    let json = document.to_json().map_err(AppError::Serialize)?;
    write_file(path, json.as_bytes())
}

fn describe_box(label: &str, rect: Rect, dpi: f64, out: &mut impl Write) -> std::io::Result<()> {
    let mm = |px: f64| px_to_mm(px, dpi);
    writeln!(
        out,
        "  {label:<6} {:>7.1} x {:>7.1} mm  at ({:.1}, {:.1}) px",
        mm(rect.width()),
        mm(rect.height()),
        rect.x0,
        rect.y0
    )
}

fn info(design: &Path, config: EditorConfig, out: &mut impl Write) -> AppResult<()> {
    let document = read_document(design)?;
    let editor = Editor::open(&document, config)?;
    let page = editor.page();
    let boxes = editor.boxes();
    let dpi = editor.display_dpi();

    writeln!(out, "{} ({})", document.name, document.id)?;
    writeln!(
        out,
        "Page {} x {} mm, bleed {} mm, safe {} mm, print {} dpi, display {:.1} dpi",
        page.width_mm, page.height_mm, page.bleed_mm, page.safe_area_mm, page.dpi, dpi
    )?;
    describe_box("bleed", boxes.bleed, dpi, out)?;
    describe_box("trim", boxes.trim, dpi, out)?;
    describe_box("safe", boxes.safe, dpi, out)?;

    let layers = editor.get_layers();
    writeln!(out, "Layers ({}), top first:", layers.len())?;
    for layer in &layers {
        let mut flags = Vec::new();
        if !layer.visible {
            flags.push("hidden");
        }
        if layer.locked {
            flags.push("locked");
        }
        writeln!(out, "  {:<8} {} {} {}", layer.kind, layer.name, layer.id, flags.join(","))?;
    }
    Ok(())
}

fn export(
    design: &Path,
    output: &Path,
    multiplier: Option<f64>,
    print: bool,
    config: EditorConfig,
    out: &mut impl Write,
) -> AppResult<()> {
    let document = read_document(design)?;
    let editor = Editor::open(&document, config)?;

    let png = if print {
        editor.export_high_res_png()?
    } else {
        editor.export_png(multiplier.unwrap_or(1.0))?
    };
    write_file(output, &png)?;
    log::info!("Exported {} to {}", document.name, output.display());
    writeln!(out, "Wrote {} ({} bytes)", output.display(), png.len())?;
    Ok(())
}

fn import_svg(
    design: &Path,
    svg: &Path,
    output: &Path,
    config: EditorConfig,
    out: &mut impl Write,
) -> AppResult<()> {
    let document = read_document(design)?;
    let svg_text = std::fs::read_to_string(svg).map_err(|source| AppError::Io {
        path: svg.to_path_buf(),
        source,
    })?;

    let mut editor = Editor::open(&document, config)?;
    let id = editor.import_svg(&svg_text)?;

    let mut updated = editor.to_document(document.name.clone());
    updated.id = document.id;
    write_document(output, &updated)?;
    writeln!(out, "Imported {} as {id}, wrote {}", svg.display(), output.display())?;
    Ok(())
}

fn create(
    output: &Path,
    name: &str,
    page: PageSpec,
    config: EditorConfig,
    out: &mut impl Write,
) -> AppResult<()> {
    let editor = Editor::new(page, config)?;
    let document = editor.to_document(name);
    write_document(output, &document)?;
    writeln!(out, "Created {} ({})", output.display(), document.id)?;
    Ok(())
}
