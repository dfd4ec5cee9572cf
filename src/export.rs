//! Comic export
//!
//! Lays the comic out on one white page: the title, the front cover, a
//! two-column grid of labelled panels with their captions, and the back
//! cover. The page is written as a PNG or as a single-page PDF embedding
//! the page as JPEG. Runs on a blocking thread.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use regex::Regex;
use thiserror::Error;

use crate::constants::{EXPORT_FILE_PREFIX, PANEL_COUNT, SLOT_COUNT};
use crate::models::{ExportFormat, ExportQuality, GeneratedImage, SlotId, Storyboard};

static REGULAR_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static BOLD_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

// Page geometry in unscaled units
const PAGE_WIDTH: u32 = 800;
const PAGE_PADDING: u32 = 40;
const CONTENT_WIDTH: u32 = PAGE_WIDTH - 2 * PAGE_PADDING;
const TITLE_GAP: u32 = 30;
const SECTION_GAP: u32 = 40;
const HEADING_RULE: u32 = 2;
const HEADING_RULE_GAP: u32 = 5;
const HEADING_GAP: u32 = 15;
const GRID_GAP: u32 = 20;
const GRID_COLUMNS: u32 = 2;
const PANEL_SIZE: u32 = (CONTENT_WIDTH - GRID_GAP) / GRID_COLUMNS;
const LABEL_GAP: u32 = 5;
const CAPTION_GAP: u32 = 8;
const CAPTION_PADDING: u32 = 8;
const CAPTION_BORDER: u32 = 1;
const BORDER: u32 = 2;
const JPEG_QUALITY: u8 = 92;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const RULE_GRAY: Rgb<u8> = Rgb([204, 204, 204]);
const CAPTION_FILL: Rgb<u8> = Rgb([243, 244, 246]);
const CAPTION_STROKE: Rgb<u8> = Rgb([209, 213, 219]);

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("comic is not complete: {0} of 8 images ready")]
    Incomplete(usize),
    #[error("image for {slot} is not valid base64: {source}")]
    Decode {
        slot: SlotId,
        #[source]
        source: base64::DecodeError,
    },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("font error: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
    #[error("pdf error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Work handed to the blocking export thread
#[derive(Debug, Clone)]
pub enum ExportRequest {
    Comic {
        storyboard: Storyboard,
        images: Vec<GeneratedImage>,
        quality: ExportQuality,
        format: ExportFormat,
        dir: PathBuf,
    },
    Slot {
        image: GeneratedImage,
        dir: PathBuf,
    },
}

impl ExportRequest {
    /// Write the file and return where it went
    pub fn run(self) -> Result<PathBuf, ExportError> {
        match self {
            ExportRequest::Comic {
                storyboard,
                images,
                quality,
                format,
                dir,
            } => {
                let page = compose(&storyboard, &images, quality.scale())?;
                let path = dir.join(export_file_name(&storyboard.title, format));
                fs::create_dir_all(&dir)?;
                match format {
                    ExportFormat::Png => write_png(&page, &path)?,
                    ExportFormat::Pdf => write_pdf(&page, &storyboard.title, &path)?,
                }
                tracing::info!(path = %path.display(), ?quality, ?format, "Comic exported");
                Ok(path)
            }
            ExportRequest::Slot { image, dir } => save_slot_image(&image, &dir),
        }
    }
}

/// Title reduced to `[a-z0-9_]`, or `my-comic` when nothing is left
pub fn safe_title(title: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"(?i)[^a-z0-9]").expect("static pattern"));
    let safe = re.replace_all(title, "_").to_lowercase();
    if safe.is_empty() {
        String::from("my-comic")
    } else {
        safe
    }
}

pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    format!("{}{}.{}", EXPORT_FILE_PREFIX, safe_title(title), format.extension())
}

/// File name for a single image, derived from its label
pub fn slot_file_name(label: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern"));
    format!("{}.jpg", re.replace_all(label, "_").to_lowercase())
}

// ============================================================================
// Text
// ============================================================================

struct Fonts {
    regular: FontRef<'static>,
    bold: FontRef<'static>,
}

impl Fonts {
    fn load() -> Result<Self, ExportError> {
        Ok(Fonts {
            regular: FontRef::try_from_slice(REGULAR_FONT)?,
            bold: FontRef::try_from_slice(BOLD_FONT)?,
        })
    }

    fn pick(&self, style: TextStyle) -> &FontRef<'static> {
        if style.bold {
            &self.bold
        } else {
            &self.regular
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TextStyle {
    size: f32,
    bold: bool,
    line_height: u32,
}

const TITLE: TextStyle = TextStyle { size: 40.0, bold: true, line_height: 48 };
const HEADING: TextStyle = TextStyle { size: 24.0, bold: true, line_height: 30 };
const LABEL: TextStyle = TextStyle { size: 16.0, bold: true, line_height: 22 };
const CAPTION: TextStyle = TextStyle { size: 14.0, bold: false, line_height: 18 };

fn text_width(fonts: &Fonts, style: TextStyle, text: &str) -> u32 {
    text_size(PxScale::from(style.size), fonts.pick(style), text).0
}

/// Greedy word wrap to `max_width`. Explicit line breaks are kept and words
/// wider than a line are broken between characters.
fn wrap(fonts: &Fonts, style: TextStyle, text: &str, max_width: u32) -> Vec<String> {
    let fits = |s: &str| text_width(fonts, style, s) <= max_width;
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if fits(&candidate) {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for c in word.chars() {
                line.push(c);
                if line.chars().count() > 1 && !fits(&line) {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(c);
                }
            }
        }
        lines.push(line);
    }
    lines
}

// ============================================================================
// Layout
// ============================================================================

/// Something drawn on the page, in unscaled units
#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Text {
        x: u32,
        y: u32,
        style: TextStyle,
        text: String,
    },
    Fill {
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        color: Rgb<u8>,
    },
    Art {
        slot: SlotId,
        x: u32,
        y: u32,
        size: u32,
    },
}

#[derive(Debug)]
struct PageLayout {
    width: u32,
    height: u32,
    marks: Vec<Mark>,
}

impl PageLayout {
    fn art(&self) -> impl Iterator<Item = (SlotId, u32, u32, u32)> + '_ {
        self.marks.iter().filter_map(|mark| match mark {
            Mark::Art { slot, x, y, size } => Some((*slot, *x, *y, *size)),
            _ => None,
        })
    }
}

struct Composer<'a> {
    fonts: &'a Fonts,
    marks: Vec<Mark>,
}

impl Composer<'_> {
    fn centered(&mut self, style: TextStyle, text: String, left: u32, width: u32, y: u32) {
        let w = text_width(self.fonts, style, &text).min(width);
        self.marks.push(Mark::Text {
            x: left + (width - w) / 2,
            y,
            style,
            text,
        });
    }

    /// Section heading with its underline; returns where the section body starts
    fn heading(&mut self, text: &str, y: u32) -> u32 {
        self.marks.push(Mark::Text {
            x: PAGE_PADDING,
            y,
            style: HEADING,
            text: text.to_string(),
        });
        let rule_y = y + HEADING.line_height + HEADING_RULE_GAP;
        self.marks.push(Mark::Fill {
            x: PAGE_PADDING,
            y: rule_y,
            w: CONTENT_WIDTH,
            h: HEADING_RULE,
            color: RULE_GRAY,
        });
        rule_y + HEADING_RULE + HEADING_GAP
    }

    /// Framed image; the frame is the art's border
    fn art(&mut self, slot: SlotId, x: u32, y: u32, size: u32) {
        self.marks.push(Mark::Fill { x, y, w: size, h: size, color: BLACK });
        self.marks.push(Mark::Art { slot, x, y, size });
    }

    /// One grid cell: label, image and optional caption box. Returns its height.
    fn panel(&mut self, n: usize, caption: &str, x: u32, y: u32) -> u32 {
        let label = SlotId::Panel(n).label();
        self.centered(LABEL, label, x, PANEL_SIZE, y);
        let art_y = y + LABEL.line_height + LABEL_GAP;
        self.art(SlotId::Panel(n), x, art_y, PANEL_SIZE);
        let mut bottom = art_y + PANEL_SIZE;

        if !caption.trim().is_empty() {
            let inset = CAPTION_BORDER + CAPTION_PADDING;
            let lines = wrap(self.fonts, CAPTION, caption.trim(), PANEL_SIZE - 2 * inset);
            let box_y = bottom + CAPTION_GAP;
            let box_h = lines.len() as u32 * CAPTION.line_height + 2 * inset;

            self.marks.push(Mark::Fill { x, y: box_y, w: PANEL_SIZE, h: box_h, color: CAPTION_STROKE });
            self.marks.push(Mark::Fill {
                x: x + CAPTION_BORDER,
                y: box_y + CAPTION_BORDER,
                w: PANEL_SIZE - 2 * CAPTION_BORDER,
                h: box_h - 2 * CAPTION_BORDER,
                color: CAPTION_FILL,
            });
            for (i, line) in lines.into_iter().enumerate() {
                self.marks.push(Mark::Text {
                    x: x + inset,
                    y: box_y + inset + i as u32 * CAPTION.line_height,
                    style: CAPTION,
                    text: line,
                });
            }
            bottom = box_y + box_h;
        }
        bottom - y
    }
}

fn layout(storyboard: &Storyboard, fonts: &Fonts) -> PageLayout {
    let mut c = Composer {
        fonts,
        marks: Vec::new(),
    };
    let mut y = PAGE_PADDING;

    let title = storyboard.title.trim();
    if !title.is_empty() {
        for line in wrap(fonts, TITLE, title, CONTENT_WIDTH) {
            c.centered(TITLE, line, PAGE_PADDING, CONTENT_WIDTH, y);
            y += TITLE.line_height;
        }
        y += TITLE_GAP;
    }

    y = c.heading("Front Cover", y);
    c.art(SlotId::FrontCover, PAGE_PADDING, y, CONTENT_WIDTH);
    y += CONTENT_WIDTH + SECTION_GAP;

    y = c.heading("Comic Panels", y);
    let rows = (PANEL_COUNT as u32).div_ceil(GRID_COLUMNS);
    for row in 0..rows {
        let mut row_height = 0;
        for col in 0..GRID_COLUMNS {
            let n = (row * GRID_COLUMNS + col + 1) as usize;
            if n > PANEL_COUNT {
                break;
            }
            let caption = storyboard.description_for(SlotId::Panel(n)).unwrap_or("");
            let x = PAGE_PADDING + col * (PANEL_SIZE + GRID_GAP);
            row_height = row_height.max(c.panel(n, caption, x, y));
        }
        y += row_height;
        if row + 1 < rows {
            y += GRID_GAP;
        }
    }
    y += SECTION_GAP;

    y = c.heading("Back Cover", y);
    c.art(SlotId::BackCover, PAGE_PADDING, y, CONTENT_WIDTH);
    y += CONTENT_WIDTH + PAGE_PADDING;

    PageLayout {
        width: PAGE_WIDTH,
        height: y,
        marks: c.marks,
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn decode(image: &GeneratedImage) -> Result<RgbImage, ExportError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image.base64.as_bytes())
        .map_err(|source| ExportError::Decode {
            slot: image.id,
            source,
        })?;
    Ok(image::load_from_memory(&bytes)?.to_rgb8())
}

fn fill(page: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    if w > 0 && h > 0 {
        draw_filled_rect_mut(page, Rect::at(x as i32, y as i32).of_size(w, h), color);
    }
}

/// Render the page at `scale`. Every one of the eight images must be present.
pub fn compose(
    storyboard: &Storyboard,
    images: &[GeneratedImage],
    scale: u32,
) -> Result<RgbImage, ExportError> {
    let ready = images.iter().filter(|i| i.is_ready()).count();
    if images.len() != SLOT_COUNT || ready != SLOT_COUNT {
        return Err(ExportError::Incomplete(ready));
    }

    let fonts = Fonts::load()?;
    let page_layout = layout(storyboard, &fonts);
    let mut page = RgbImage::from_pixel(page_layout.width * scale, page_layout.height * scale, WHITE);
    let border = BORDER * scale;

    for mark in &page_layout.marks {
        match mark {
            Mark::Text { x, y, style, text } => draw_text_mut(
                &mut page,
                BLACK,
                (x * scale) as i32,
                (y * scale) as i32,
                PxScale::from(style.size * scale as f32),
                fonts.pick(*style),
                text,
            ),
            Mark::Fill { x, y, w, h, color } => {
                fill(&mut page, x * scale, y * scale, w * scale, h * scale, *color)
            }
            Mark::Art { slot, x, y, size } => {
                let image = images
                    .iter()
                    .find(|i| i.id == *slot)
                    .ok_or(ExportError::Incomplete(ready))?;
                let inner = size * scale - 2 * border;
                let art = imageops::resize(&decode(image)?, inner, inner, FilterType::Triangle);
                imageops::overlay(&mut page, &art, (x * scale + border) as i64, (y * scale + border) as i64);
            }
        }
    }
    Ok(page)
}

pub fn write_png(page: &RgbImage, path: &Path) -> Result<(), ExportError> {
    page.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

fn encode_jpeg(page: &RgbImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(page)?;
    Ok(buf.into_inner())
}

/// One page the size of the raster, the raster embedded as a JPEG XObject
pub fn write_pdf(page: &RgbImage, title: &str, path: &Path) -> Result<(), ExportError> {
    let (width, height) = (page.width() as i64, page.height() as i64);
    let jpeg = encode_jpeg(page)?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![width.into(), 0.into(), 0.into(), height.into(), 0.into(), 0.into()],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal(crate::constants::APP_NAME),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.save(path)?;
    Ok(())
}

/// Write one finished image as-is next to the exports
pub fn save_slot_image(image: &GeneratedImage, dir: &Path) -> Result<PathBuf, ExportError> {
    if !image.is_ready() {
        return Err(ExportError::Incomplete(0));
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image.base64.as_bytes())
        .map_err(|source| ExportError::Decode {
            slot: image.id,
            source,
        })?;
    fs::create_dir_all(dir)?;
    let path = dir.join(slot_file_name(&image.label));
    fs::write(&path, bytes)?;
    tracing::info!(slot = %image.id, path = %path.display(), "Image saved");
    Ok(path)
}
