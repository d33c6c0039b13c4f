//! Default `Rasterizer`: paints a `ReportDocument` into an RGB image for PDF
//! export. Deliberately plain (no kerning, no shaping); swap in another
//! `Rasterizer` for anything richer.
//!
//! Layout (line wrapping, block positions, chart bars) is computed up front in
//! `ReportLayout`, separate from painting, so it can be tested without a font
//! or a pixmap. Painting uses tiny-skia for fills and ab_glyph for glyph
//! coverage. Without a usable font, layout falls back to approximate metrics
//! and text is left out of the image.

use std::path::{Path, PathBuf};

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use tiny_skia::{Color, Paint, Pixmap, PremultipliedColorU8, Rect as SkiaRect, Transform};
use tracing::{info, warn};

use crate::report::chart::ChartSpec;
use crate::report::document::{Block, ReportDocument};
use crate::report::RenderError;

const PAGE_WIDTH: u32 = 800;
const PADDING: f32 = 32.0;
const LINE_HEIGHT: f32 = 1.4;
const CHART_HEIGHT: f32 = 240.0;
/// Average advance as a fraction of the font size when no font is loaded.
const FALLBACK_ADVANCE: f32 = 0.55;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

type Rgb = [u8; 3];

const TITLE_COLOR: Rgb = [0xff, 0xff, 0xff];
const HEADING_COLOR: Rgb = [0x4b, 0xc0, 0xc0];
const BODY_COLOR: Rgb = [0xe0, 0xe0, 0xe0];
const MUTED_COLOR: Rgb = [0xb0, 0xb0, 0xb0];
const AXIS_COLOR: Rgb = [0x80, 0x80, 0x80];

/// Tightly packed 8-bit RGB, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Turns a display document into pixels. Stand-in for a DOM capture.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, document: &ReportDocument) -> Result<RgbImage, RenderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
    pub size: f32,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Every positioned element of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub width: u32,
    pub height: u32,
    pub texts: Vec<TextRun>,
    pub bars: Vec<BarRect>,
    pub axes: Vec<BarRect>,
}

struct TextStyle {
    size: f32,
    color: Rgb,
    space_before: f32,
    space_after: f32,
}

fn style_for(block: &Block<'_>) -> TextStyle {
    let (size, color, space_before, space_after) = match block {
        Block::Title(_) => (28.0, TITLE_COLOR, 0.0, 12.0),
        Block::Heading(_) => (20.0, HEADING_COLOR, 16.0, 6.0),
        Block::Label(_) => (16.0, TITLE_COLOR, 10.0, 2.0),
        Block::Insight(_) => (14.0, MUTED_COLOR, 0.0, 4.0),
        Block::Paragraph(_) | Block::Chart(_) => (15.0, BODY_COLOR, 0.0, 6.0),
    };
    TextStyle {
        size,
        color,
        space_before,
        space_after,
    }
}

/// Measures text advance in pixels.
pub struct TextMetrics<'a> {
    font: Option<&'a FontArc>,
}

impl<'a> TextMetrics<'a> {
    pub fn new(font: Option<&'a FontArc>) -> Self {
        Self { font }
    }

    pub fn width(&self, text: &str, size: f32) -> f32 {
        match self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                text.chars().map(|c| scaled.h_advance(scaled.glyph_id(c))).sum()
            }
            None => text.chars().count() as f32 * size * FALLBACK_ADVANCE,
        }
    }

    /// Greedy word wrap. Words wider than the line are broken by character,
    /// which also covers scripts written without spaces.
    pub fn wrap(&self, text: &str, size: f32, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            let mut line = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if line.is_empty() {
                    word.to_string()
                } else {
                    format!("{line} {word}")
                };
                if self.width(&candidate, size) <= max_width {
                    line = candidate;
                    continue;
                }
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                if self.width(word, size) <= max_width {
                    line = word.to_string();
                } else {
                    for c in word.chars() {
                        let mut next = line.clone();
                        next.push(c);
                        if !line.is_empty() && self.width(&next, size) > max_width {
                            lines.push(std::mem::take(&mut line));
                            line.push(c);
                        } else {
                            line = next;
                        }
                    }
                }
            }
            lines.push(line);
        }
        lines
    }
}

impl ReportLayout {
    pub fn from_document(document: &ReportDocument, metrics: &TextMetrics<'_>) -> Self {
        let content_width = PAGE_WIDTH as f32 - 2.0 * PADDING;
        let mut layout = Self {
            width: PAGE_WIDTH,
            height: 0,
            texts: Vec::new(),
            bars: Vec::new(),
            axes: Vec::new(),
        };
        let mut y = PADDING;

        for block in document.blocks() {
            let style = style_for(&block);
            y += style.space_before;
            match block {
                Block::Chart(chart) => {
                    y = layout.place_chart(chart, metrics, y, content_width);
                }
                Block::Title(text)
                | Block::Heading(text)
                | Block::Paragraph(text)
                | Block::Label(text)
                | Block::Insight(text) => {
                    let line_height = style.size * LINE_HEIGHT;
                    for line in metrics.wrap(text, style.size, content_width) {
                        y += line_height;
                        layout.texts.push(TextRun {
                            text: line,
                            x: PADDING,
                            baseline: y - (line_height - style.size),
                            size: style.size,
                            color: style.color,
                        });
                    }
                }
            }
            y += style.space_after;
        }

        layout.height = (y + PADDING).ceil() as u32;
        layout
    }

    fn place_chart(
        &mut self,
        chart: &ChartSpec,
        metrics: &TextMetrics<'_>,
        top: f32,
        width: f32,
    ) -> f32 {
        let title_size = 14.0;
        let label_size = 12.0;
        let title_y = top + title_size * LINE_HEIGHT;
        self.texts.push(TextRun {
            text: chart.title.clone(),
            x: PADDING,
            baseline: title_y - title_size * (LINE_HEIGHT - 1.0),
            size: title_size,
            color: BODY_COLOR,
        });

        let plot_top = title_y + 8.0;
        let baseline = top + CHART_HEIGHT - label_size * LINE_HEIGHT;
        let plot_h = baseline - plot_top;
        let count = chart.bars().count().max(1) as f32;
        let slot = width / count;
        let bar_w = slot * 0.6;
        let y_max = chart.y_max();

        self.axes.push(BarRect {
            x: PADDING,
            y: baseline,
            width,
            height: 1.0,
        });

        for (i, (label, value)) in chart.bars().enumerate() {
            let h = (value.max(chart.y_min) / y_max) as f32 * plot_h;
            let x = PADDING + slot * i as f32 + (slot - bar_w) / 2.0;
            self.bars.push(BarRect {
                x,
                y: baseline - h,
                width: bar_w,
                height: h,
            });

            let label_w = metrics.width(label, label_size);
            self.texts.push(TextRun {
                text: label.to_string(),
                x: (x + bar_w / 2.0 - label_w / 2.0).max(PADDING),
                baseline: baseline + label_size * LINE_HEIGHT,
                size: label_size,
                color: MUTED_COLOR,
            });
        }

        top + CHART_HEIGHT
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Painting
// ────────────────────────────────────────────────────────────────────────────

pub struct ReportRasterizer {
    font: Option<FontArc>,
}

impl ReportRasterizer {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Loads the configured font, else the first system font that parses.
    pub fn with_font_search(configured: Option<&Path>) -> Self {
        let candidates = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            match std::fs::read(&path).map(FontArc::try_from_vec) {
                Ok(Ok(font)) => {
                    info!("Report font loaded from {}", path.display());
                    return Self::new(Some(font));
                }
                Ok(Err(e)) => warn!("Font at {} is not usable: {e}", path.display()),
                Err(_) => continue,
            }
        }

        warn!("No report font found; PDF exports will contain no text");
        Self::new(None)
    }

    fn draw_text(&self, pixmap: &mut Pixmap, run: &TextRun) {
        let Some(font) = &self.font else {
            return;
        };
        let scale = PxScale::from(run.size);
        let scaled = font.as_scaled(scale);
        let mut x = run.x;

        for c in run.text.chars() {
            let id = scaled.glyph_id(c);
            let glyph = id.with_scale_and_position(scale, point(x, run.baseline));
            x += scaled.h_advance(id);

            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    blend_pixel(
                        pixmap,
                        bounds.min.x as i32 + gx as i32,
                        bounds.min.y as i32 + gy as i32,
                        run.color,
                        coverage,
                    );
                });
            }
        }
    }
}

impl Rasterizer for ReportRasterizer {
    fn rasterize(&self, document: &ReportDocument) -> Result<RgbImage, RenderError> {
        let layout = ReportLayout::from_document(document, &TextMetrics::new(self.font.as_ref()));
        let mut pixmap =
            Pixmap::new(layout.width, layout.height).ok_or(RenderError::PixmapCreationFailed {
                width: layout.width,
                height: layout.height,
            })?;

        if let Some(color) = document.background.as_deref().and_then(parse_hex_color) {
            pixmap.fill(color);
        }

        let mut axis_paint = Paint::default();
        axis_paint.set_color_rgba8(AXIS_COLOR[0], AXIS_COLOR[1], AXIS_COLOR[2], 255);
        for axis in &layout.axes {
            fill_bar(&mut pixmap, axis, &axis_paint);
        }

        // rgba(75, 192, 192, 0.6)
        let mut bar_paint = Paint::default();
        bar_paint.set_color_rgba8(75, 192, 192, 153);
        for bar in &layout.bars {
            fill_bar(&mut pixmap, bar, &bar_paint);
        }

        for run in &layout.texts {
            self.draw_text(&mut pixmap, run);
        }

        Ok(to_rgb(&pixmap))
    }
}

fn fill_bar(pixmap: &mut Pixmap, bar: &BarRect, paint: &Paint<'_>) {
    // zero-height bars have no rect
    if let Some(rect) = SkiaRect::from_xywh(bar.x, bar.y, bar.width, bar.height) {
        pixmap.fill_rect(rect, paint, Transform::identity(), None);
    }
}

/// Source-over blend of a solid color at `coverage` into one pixel.
fn blend_pixel(pixmap: &mut Pixmap, x: i32, y: i32, color: Rgb, coverage: f32) {
    let (w, h) = (pixmap.width() as i32, pixmap.height() as i32);
    if x < 0 || y < 0 || x >= w || y >= h {
        return;
    }
    let a = coverage.clamp(0.0, 1.0);
    let idx = (y * w + x) as usize;
    let pixels = pixmap.pixels_mut();
    let dst = pixels[idx];
    let mix = |src: u8, dst: u8| (src as f32 * a + dst as f32 * (1.0 - a)).round() as u8;
    if let Some(out) = PremultipliedColorU8::from_rgba(
        mix(color[0], dst.red()),
        mix(color[1], dst.green()),
        mix(color[2], dst.blue()),
        mix(255, dst.alpha()),
    ) {
        pixels[idx] = out;
    }
}

/// Flattens premultiplied RGBA onto white.
fn to_rgb(pixmap: &Pixmap) -> RgbImage {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 3);
    for px in pixmap.pixels() {
        let under = 255 - px.alpha();
        data.push(px.red().saturating_add(under));
        data.push(px.green().saturating_add(under));
        data.push(px.blue().saturating_add(under));
    }
    RgbImage {
        width: pixmap.width(),
        height: pixmap.height(),
        data,
    }
}

/// Parses `#rrggbb`.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::from_rgba8(channel(0)?, channel(2)?, channel(4)?, 255))
}
