//! PNG export of the board.
//!
//! The board snapshot is composed into an SVG document (board body, axes, items and
//! the four axis titles placed outside the board edges) and rasterized with resvg.
//! Files are written through a temporary file that is only persisted on success.

use crate::geometry::Bounds;
use crate::model::{AxisKey, Titles};
use crate::store::Contents;
use chrono::Local;
use resvg::usvg;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use tiny_skia::{Color, Pixmap, Transform};
use tracing::{info, warn};

pub const EXPORT_SCALE: f32 = 2.0;
/// Space around the board reserved for the axis titles.
pub const EXPORT_MARGIN: f32 = 100.0;
const LABEL_INSET: f32 = 20.0;
const LABEL_FONT_SIZE: f32 = 24.0;
const BACKGROUND: (u8, u8, u8) = (0x2c, 0x2c, 0x2c);
const BOARD_FILL: &str = "#f5f5f5";
const AXIS_STROKE: &str = "#555555";

#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    #[error("board has no layout to export (is it visible?)")]
    Unmeasured,
    #[error("failed to parse SVG: {0}")]
    Svg(String),
    #[error("failed to create {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to finalize export: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("export worker stopped before reporting")]
    WorkerGone,
}

/// Everything the export needs, captured from the live board.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub titles: Titles,
    pub contents: Contents,
    pub bounds: Option<Bounds>,
}

pub fn render_svg(request: &ExportRequest) -> Result<String, ExportError> {
    let bounds = request.bounds.ok_or(ExportError::Unmeasured)?;
    let (w, h) = (bounds.width, bounds.height);
    let (total_w, total_h) = (w + EXPORT_MARGIN * 2.0, h + EXPORT_MARGIN * 2.0);
    let (bg_r, bg_g, bg_b) = BACKGROUND;

    let mut svg = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{total_w}" height="{total_h}" viewBox="0 0 {total_w} {total_h}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="{total_w}" height="{total_h}" fill="rgb({bg_r},{bg_g},{bg_b})"/>"#
    );
    let _ = writeln!(
        svg,
        r#"<g transform="translate({m},{m})">"#,
        m = EXPORT_MARGIN
    );
    let _ = writeln!(svg, r#"<rect width="{w}" height="{h}" fill="{BOARD_FILL}"/>"#);
    let _ = writeln!(
        svg,
        r#"<line x1="0" y1="{y}" x2="{w}" y2="{y}" stroke="{AXIS_STROKE}" stroke-width="2"/>"#,
        y = bounds.mid_y()
    );
    let _ = writeln!(
        svg,
        r#"<line x1="{x}" y1="0" x2="{x}" y2="{h}" stroke="{AXIS_STROKE}" stroke-width="2"/>"#,
        x = bounds.mid_x()
    );

    for (_, items) in request.contents.iter() {
        for item in items {
            let size = item.font_size as f32;
            let x = item.position.x;
            let _ = write!(
                svg,
                r#"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{size}" fill="{color}">"#,
                y = item.position.y + size,
                color = item.color.hex()
            );
            for (line_no, line) in item.display_text().split('\n').enumerate() {
                let dy = if line_no == 0 { 0.0 } else { size * 1.2 };
                let _ = write!(svg, r#"<tspan x="{x}" dy="{dy}">{}</tspan>"#, escape_xml(line));
            }
            let _ = writeln!(svg, "</text>");
        }
    }
    let _ = writeln!(svg, "</g>");

    for axis in AxisKey::ALL {
        let (x, y, anchor, baseline) = match axis {
            AxisKey::X1 => (LABEL_INSET, EXPORT_MARGIN + h / 2.0, "start", "middle"),
            AxisKey::X2 => (total_w - LABEL_INSET, EXPORT_MARGIN + h / 2.0, "end", "middle"),
            AxisKey::Y1 => (EXPORT_MARGIN + w / 2.0, LABEL_INSET, "middle", "hanging"),
            AxisKey::Y2 => (EXPORT_MARGIN + w / 2.0, total_h - LABEL_INSET, "middle", "auto"),
        };
        let _ = writeln!(
            svg,
            r##"<text x="{x}" y="{y}" text-anchor="{anchor}" dominant-baseline="{baseline}" font-family="sans-serif" font-size="{LABEL_FONT_SIZE}" fill="#ffffff">{}</text>"##,
            escape_xml(request.titles.get(axis))
        );
    }
    svg.push_str("</svg>\n");
    Ok(svg)
}

pub fn rasterize(svg: &str, scale: f32) -> Result<Vec<u8>, ExportError> {
    let mut opts = usvg::Options::default();
    opts.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &opts).map_err(|e| ExportError::Svg(e.to_string()))?;

    let width = (tree.size().width() * scale).ceil() as u32;
    let height = (tree.size().height() * scale).ceil() as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Pixmap { width, height })?;
    let (r, g, b) = BACKGROUND;
    pixmap.fill(Color::from_rgba8(r, g, b, 255));
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| ExportError::Encode(e.to_string()))
}

/// Writes `png` into `dir` under a dated, non-clobbering name.
pub fn write_png(dir: &Path, png: &[u8]) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let stem = format!("quadrants_{}", Local::now().format("%Y-%m-%d"));
    let mut target = dir.join(format!("{}.png", stem));
    let mut n = 2;
    while target.exists() {
        target = dir.join(format!("{}_{}.png", stem, n));
        n += 1;
    }
    // Dropping the temp file on any error path removes it.
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(png)?;
    tmp.flush()?;
    tmp.persist_noclobber(&target)?;
    Ok(target)
}

pub fn export_board(request: &ExportRequest, dir: &Path) -> Result<PathBuf, ExportError> {
    let svg = render_svg(request)?;
    let png = rasterize(&svg, EXPORT_SCALE)?;
    write_png(dir, &png)
}

/// Runs exports off the event loop; results are collected with [`ExportWorker::poll`].
#[derive(Debug, Default)]
pub struct ExportWorker {
    pending: Option<Receiver<Result<PathBuf, ExportError>>>,
}

impl ExportWorker {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts an export. Returns false if one is already running.
    pub fn start(&mut self, request: ExportRequest, dir: PathBuf) -> bool {
        if self.is_busy() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = export_board(&request, &dir);
            let _ = tx.send(result);
        });
        self.pending = Some(rx);
        true
    }

    pub fn poll(&mut self) -> Option<Result<PathBuf, ExportError>> {
        let rx = self.pending.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(ExportError::WorkerGone),
        };
        self.pending = None;
        match &result {
            Ok(path) => info!(path = %path.display(), "export finished"),
            Err(err) => warn!(%err, "export failed"),
        }
        Some(result)
    }
}

fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars().filter(|&c| is_valid_xml_char(c)) {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
