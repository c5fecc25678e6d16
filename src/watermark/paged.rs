//! Watermarking of paginated (PDF) documents.
//!
//! Overlays are Form XObjects drawn in points. Existing page content is
//! wrapped in `q`/`Q` and the overlay is painted last.
//!
//! Center and corner overlays are built once at US Letter size and scaled
//! uniformly, centered in each page's MediaBox, so every page gets the same
//! composition. Tile overlays are built at the page's own size instead so the
//! pattern reaches every edge; pages of equal size share one XObject.

use super::color::{hex_to_rgb, Color};
use super::fonts::FontResolver;
use super::pdf_font::{add_font, PdfFont};
use super::position::{
    approximate_page_text_width, calculate_page_tile_positions, calculate_position,
    page_tile_step, CanvasDimensions, TextDimensions, PAGE_MARGIN,
};
use super::{WatermarkError, WatermarkOptions, WatermarkPosition};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::sync::Arc;

/// Reference overlay width in points (US Letter).
pub const REFERENCE_WIDTH: f32 = 612.0;

/// Reference overlay height in points (US Letter).
pub const REFERENCE_HEIGHT: f32 = 792.0;

const FONT_RESOURCE: &str = "F0";
const GSTATE_RESOURCE: &str = "GS0";
const XOBJECT_PREFIX: &str = "InkmarkWm";

/// Renders watermarks onto every page of a PDF.
#[derive(Clone)]
pub struct PagedDocWatermarker {
    fonts: Arc<dyn FontResolver>,
}

impl std::fmt::Debug for PagedDocWatermarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedDocWatermarker").finish_non_exhaustive()
    }
}

/// Size of an overlay surface in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySize {
    pub width: f32,
    pub height: f32,
}

impl OverlaySize {
    pub const LETTER: Self = Self {
        width: REFERENCE_WIDTH,
        height: REFERENCE_HEIGHT,
    };

    pub fn of_media_box(media_box: [f32; 4]) -> Self {
        let [llx, lly, urx, ury] = media_box;
        Self {
            width: urx - llx,
            height: ury - lly,
        }
    }

    fn key(&self) -> (u32, u32) {
        (self.width.to_bits(), self.height.to_bits())
    }
}

/// Placement of an overlay on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFit {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl PagedDocWatermarker {
    pub fn new(fonts: Arc<dyn FontResolver>) -> Self {
        Self { fonts }
    }

    pub fn render(
        &self,
        data: &[u8],
        text: &str,
        options: &WatermarkOptions,
    ) -> Result<Vec<u8>, WatermarkError> {
        let color = hex_to_rgb(&options.font_color)?;
        let mut doc = Document::load_mem(data)?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(WatermarkError::CorruptDocument(
                "document has no pages".to_string(),
            ));
        }

        // Validate every page before touching the document.
        let mut plans = Vec::with_capacity(pages.len());
        for (&number, &page_id) in &pages {
            let media_box = page_media_box(&doc, page_id, number)?;
            let (size, fit) = plan_page(options.position, media_box);
            plans.push((page_id, size, fit));
        }

        let handle = self.fonts.resolve(options.font_size as f32);
        let font = add_font(&mut doc, &handle, text);

        let mut overlays: HashMap<(u32, u32), ObjectId> = HashMap::new();
        for (page_id, size, fit) in plans {
            let overlay_id = match overlays.get(&size.key()) {
                Some(&id) => id,
                None => {
                    let id = add_overlay(&mut doc, &font, text, options, color, size)?;
                    overlays.insert(size.key(), id);
                    id
                }
            };
            stamp_page(&mut doc, page_id, overlay_id, fit)?;
        }

        tracing::debug!(
            pages = pages.len(),
            overlays = overlays.len(),
            position = %options.position,
            embedded_font = font.is_embedded(),
            "pdf watermark applied"
        );

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| WatermarkError::CorruptDocument(e.to_string()))?;
        Ok(output)
    }
}

/// Overlay size and placement for a page.
///
/// Tile overlays match the page exactly; other positions use the fitted
/// Letter reference.
pub fn plan_page(position: WatermarkPosition, media_box: [f32; 4]) -> (OverlaySize, PageFit) {
    if position == WatermarkPosition::Tile {
        let fit = PageFit {
            scale: 1.0,
            offset_x: media_box[0],
            offset_y: media_box[1],
        };
        (OverlaySize::of_media_box(media_box), fit)
    } else {
        (OverlaySize::LETTER, fit_reference(media_box))
    }
}

/// Build the overlay drawing operations for a surface of `size` points.
pub fn overlay_content(
    font: &PdfFont,
    text: &str,
    options: &WatermarkOptions,
    color: Color,
    size: OverlaySize,
) -> Content {
    let font_size = options.font_size as f32;
    let (r, g, b) = color.to_unit();

    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("gs", vec![Object::Name(GSTATE_RESOURCE.as_bytes().to_vec())]),
        Operation::new("rg", vec![r.into(), g.into(), b.into()]),
    ];

    match options.position {
        WatermarkPosition::Tile | WatermarkPosition::Center => {
            let radians = options.angle.to_radians();
            let (sin, cos) = radians.sin_cos();

            ops.push(Operation::new(
                "cm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (size.width / 2.0).into(),
                    (size.height / 2.0).into(),
                ],
            ));
            ops.push(Operation::new(
                "cm",
                vec![cos.into(), sin.into(), (-sin).into(), cos.into(), 0.into(), 0.into()],
            ));
            ops.push(Operation::new("BT", vec![]));
            ops.push(font_op(font_size));

            if options.position == WatermarkPosition::Tile {
                let step = page_tile_step(options.spacing, options.font_size, text);
                // The rotated grid must still cover the surface corners
                let reach = size.width.hypot(size.height) / 2.0 + step;
                for (x, y) in calculate_page_tile_positions(reach, reach, step) {
                    ops.push(Operation::new(
                        "Tm",
                        vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                    ));
                    ops.push(Operation::new("Tj", vec![font.encode(text)]));
                }
            } else {
                let half = font.text_width(text, font_size) / 2.0;
                ops.push(Operation::new("Td", vec![(-half).into(), 0.into()]));
                ops.push(Operation::new("Tj", vec![font.encode(text)]));
            }
            ops.push(Operation::new("ET", vec![]));
        }
        corner => {
            let (x, baseline) = corner_origin(corner, options.font_size, text);
            ops.push(Operation::new("BT", vec![]));
            ops.push(font_op(font_size));
            ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
            ops.push(Operation::new("Tj", vec![font.encode(text)]));
            ops.push(Operation::new("ET", vec![]));
        }
    }

    ops.push(Operation::new("Q", vec![]));
    Content { operations: ops }
}

fn font_op(size: f32) -> Operation {
    Operation::new(
        "Tf",
        vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), size.into()],
    )
}

/// Baseline origin for a corner draw in page space (origin bottom-left).
///
/// Text width is approximated, the box height is the font size.
pub fn corner_origin(position: WatermarkPosition, font_size: u32, text: &str) -> (f32, f32) {
    let width = approximate_page_text_width(font_size, text).ceil() as u32;
    let canvas = CanvasDimensions::new(REFERENCE_WIDTH as u32, REFERENCE_HEIGHT as u32);
    let text_box = TextDimensions::new(width, font_size);

    let top_left = calculate_position(position, &canvas, &text_box, PAGE_MARGIN);
    let baseline = REFERENCE_HEIGHT - top_left.y as f32 - font_size as f32;
    (top_left.x as f32, baseline)
}

fn add_overlay(
    doc: &mut Document,
    font: &PdfFont,
    text: &str,
    options: &WatermarkOptions,
    color: Color,
    size: OverlaySize,
) -> Result<ObjectId, WatermarkError> {
    let content = overlay_content(font, text, options, color, size).encode()?;
    let opacity = options.opacity.clamp(0.0, 1.0);

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![0.into(), 0.into(), size.width.into(), size.height.into()],
        "Resources" => dictionary! {
            "Font" => dictionary! { FONT_RESOURCE => font.id },
            "ExtGState" => dictionary! {
                GSTATE_RESOURCE => dictionary! {
                    "Type" => "ExtGState",
                    "ca" => opacity,
                    "CA" => opacity,
                },
            },
        },
    };

    Ok(doc.add_object(Stream::new(dict, content)))
}

/// Uniform scale and centering offset for the reference overlay on a page.
pub fn fit_reference(media_box: [f32; 4]) -> PageFit {
    let [llx, lly, urx, ury] = media_box;
    let width = urx - llx;
    let height = ury - lly;

    let scale = (width / REFERENCE_WIDTH).min(height / REFERENCE_HEIGHT);
    PageFit {
        scale,
        offset_x: llx + (width - REFERENCE_WIDTH * scale) / 2.0,
        offset_y: lly + (height - REFERENCE_HEIGHT * scale) / 2.0,
    }
}

/// Resolve a page's MediaBox, following Parent inheritance.
///
/// Coordinates are normalized so the first corner is lower-left.
pub fn page_media_box(
    doc: &Document,
    page_id: ObjectId,
    page_number: u32,
) -> Result<[f32; 4], WatermarkError> {
    let raw = inherited_attribute(doc, page_id, b"MediaBox")
        .ok_or_else(|| WatermarkError::page_geometry(page_number, "missing MediaBox"))?;

    let array = deref(doc, raw)
        .as_array()
        .map_err(|_| WatermarkError::page_geometry(page_number, "MediaBox is not an array"))?;

    if array.len() != 4 {
        return Err(WatermarkError::page_geometry(
            page_number,
            format!("MediaBox has {} entries", array.len()),
        ));
    }

    let mut values = [0.0f32; 4];
    for (slot, value) in values.iter_mut().zip(array) {
        *slot = deref(doc, value).as_float().map_err(|_| {
            WatermarkError::page_geometry(page_number, "MediaBox entry is not a number")
        })?;
    }

    let [x0, y0, x1, y1] = values;
    let normalized = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];
    let width = normalized[2] - normalized[0];
    let height = normalized[3] - normalized[1];

    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(WatermarkError::page_geometry(
            page_number,
            format!("MediaBox has no area ({} x {})", width, height),
        ));
    }

    Ok(normalized)
}

fn deref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    // Bounded walk guards against Parent cycles in damaged files.
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    overlay_id: ObjectId,
    fit: PageFit,
) -> Result<(), WatermarkError> {
    let mut resources = match inherited_attribute(doc, page_id, b"Resources") {
        Some(obj) => deref(doc, obj).as_dict().cloned().unwrap_or_default(),
        None => Dictionary::new(),
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(obj) => deref(doc, obj).as_dict().cloned().unwrap_or_default(),
        Err(_) => Dictionary::new(),
    };

    let mut index = 0;
    let name = loop {
        let candidate = format!("{}{}", XOBJECT_PREFIX, index);
        if !xobjects.has(candidate.as_bytes()) {
            break candidate;
        }
        index += 1;
    };
    xobjects.set(name.as_bytes().to_vec(), overlay_id);
    resources.set("XObject", xobjects);

    let before = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let after = Content {
        operations: vec![
            Operation::new("Q", vec![]),
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    fit.scale.into(),
                    0.into(),
                    0.into(),
                    fit.scale.into(),
                    fit.offset_x.into(),
                    fit.offset_y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ],
    }
    .encode()?;
    let after = doc.add_object(Stream::new(dictionary! {}, after));

    let mut contents = vec![Object::Reference(before)];
    contents.extend(existing_contents(doc, page_id)?);
    contents.push(Object::Reference(after));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Contents", contents);
    page.set("Resources", resources);
    Ok(())
}

/// The page's content stream references, flattening an indirect array.
fn existing_contents(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, WatermarkError> {
    let page = doc.get_dictionary(page_id)?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Array(items)) => items.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        _ => Vec::new(),
    };
    Ok(contents)
}
