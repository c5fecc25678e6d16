//! Font resources for page overlays.
//!
//! A resolved outline face is subset to the glyphs of the watermark text and
//! embedded as a Type0 font with Identity-H encoding, so text is written as
//! big-endian glyph ids. When no face is available, or it cannot be embedded,
//! the standard Helvetica is referenced instead; it only covers WinAnsi and
//! anything outside that range is written as '?'.

use super::fonts::{FontHandle, Typeface};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashMap};
use ttf_parser::{Face, RawFace, Tag};

/// Subset tag prefixed to embedded font names.
const SUBSET_TAG: &str = "INKMRK";

/// Font object added to a document plus how to encode text for it.
#[derive(Debug, Clone)]
pub struct PdfFont {
    pub id: ObjectId,
    encoding: TextEncoding,
}

#[derive(Debug, Clone)]
enum TextEncoding {
    /// Char to subset glyph id, plus glyph widths in 1/1000 em.
    Identity {
        gids: HashMap<char, u16>,
        widths: HashMap<char, f32>,
    },
    WinAnsi,
}

impl PdfFont {
    pub fn is_embedded(&self) -> bool {
        matches!(self.encoding, TextEncoding::Identity { .. })
    }

    /// Encode `text` as a string operand for `Tj`.
    pub fn encode(&self, text: &str) -> Object {
        match &self.encoding {
            TextEncoding::Identity { gids, .. } => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let gid = gids.get(&ch).copied().unwrap_or(0);
                    out.extend_from_slice(&gid.to_be_bytes());
                }
                Object::String(out, StringFormat::Hexadecimal)
            }
            TextEncoding::WinAnsi => Object::String(to_winansi_bytes(text), StringFormat::Literal),
        }
    }

    /// Advance width of `text` at `font_size` points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: f32 = match &self.encoding {
            TextEncoding::Identity { widths, .. } => text
                .chars()
                .map(|ch| widths.get(&ch).copied().unwrap_or(0.0))
                .sum(),
            TextEncoding::WinAnsi => to_winansi_bytes(text)
                .into_iter()
                .map(helvetica_width)
                .sum(),
        };
        units * font_size / 1000.0
    }
}

/// Add a font able to draw `text` to `doc`.
///
/// Never fails; embedding problems fall back to Helvetica.
pub fn add_font(doc: &mut Document, font: &FontHandle, text: &str) -> PdfFont {
    if let Typeface::Outline(loaded) = font.typeface() {
        let stem = loaded
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Watermark");

        match embed_type0(doc, loaded.data(), stem, text) {
            Some(embedded) => {
                tracing::debug!(path = %loaded.path.display(), "embedded overlay font");
                return embedded;
            }
            None => {
                tracing::warn!(
                    path = %loaded.path.display(),
                    "could not embed font in overlay, using Helvetica"
                );
            }
        }
    }

    add_helvetica(doc)
}

/// Reference the standard Helvetica (no embedding).
pub fn add_helvetica(doc: &mut Document) -> PdfFont {
    let id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    PdfFont {
        id,
        encoding: TextEncoding::WinAnsi,
    }
}

fn embed_type0(doc: &mut Document, data: &[u8], stem: &str, text: &str) -> Option<PdfFont> {
    let face = Face::parse(data, 0).ok()?;
    let is_cff = face.tables().cff.is_some();

    let units = face.units_per_em() as f32;
    let scale = |v: f32| v / units * 1000.0;

    let mut remapper = subsetter::GlyphRemapper::new();
    remapper.remap(0);

    let mut gids = HashMap::new();
    let mut widths = HashMap::new();
    let mut gid_widths = BTreeMap::new();

    for ch in text.chars() {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        let new_gid = remapper.remap(gid.0);
        let width = scale(face.glyph_hor_advance(gid).unwrap_or(0) as f32);
        gids.insert(ch, new_gid);
        widths.insert(ch, width);
        gid_widths.insert(new_gid, width);
    }

    if gids.is_empty() {
        return None;
    }

    let subset = match subsetter::subset(data, 0, &remapper) {
        Ok(subset) => subset,
        Err(e) => {
            tracing::warn!(error = %e, "font subsetting failed");
            return None;
        }
    };

    let ps_name = format!("{}+{}", SUBSET_TAG, postscript_name(stem));

    let bb = face.global_bounding_box();
    let bbox: Vec<Object> = vec![
        scale(bb.x_min as f32).into(),
        scale(bb.y_min as f32).into(),
        scale(bb.x_max as f32).into(),
        scale(bb.y_max as f32).into(),
    ];
    let cap_height = face
        .capital_height()
        .map(|h| scale(h as f32))
        .unwrap_or(700.0);

    let mut descriptor = dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(ps_name.clone().into_bytes()),
        "Flags" => 4,
        "FontBBox" => bbox,
        "ItalicAngle" => 0,
        "Ascent" => scale(face.ascender() as f32),
        "Descent" => scale(face.descender() as f32),
        "CapHeight" => cap_height,
        "StemV" => 80,
    };

    let cid_subtype = if is_cff {
        let cff = extract_cff(&subset)?;
        let file_id = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "CIDFontType0C" },
            cff,
        ));
        descriptor.set("FontFile3", file_id);
        "CIDFontType0"
    } else {
        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => subset.len() as i64 },
            subset,
        ));
        descriptor.set("FontFile2", file_id);
        "CIDFontType2"
    };
    let descriptor_id = doc.add_object(descriptor);

    let mut w_array = Vec::with_capacity(gid_widths.len() * 2);
    for (gid, width) in &gid_widths {
        w_array.push(Object::Integer(*gid as i64));
        w_array.push(Object::Array(vec![(*width).into()]));
    }

    let mut cid_font = dictionary! {
        "Type" => "Font",
        "Subtype" => cid_subtype,
        "BaseFont" => Object::Name(ps_name.clone().into_bytes()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 0,
        "W" => w_array,
    };
    if !is_cff {
        cid_font.set("CIDToGIDMap", "Identity");
    }
    let cid_font_id = doc.add_object(cid_font);

    let cmap_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&gids)));

    let id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(ps_name.into_bytes()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => cmap_id,
    });

    Some(PdfFont {
        id,
        encoding: TextEncoding::Identity { gids, widths },
    })
}

/// Pull the bare CFF program out of an OpenType subset.
fn extract_cff(subset: &[u8]) -> Option<Vec<u8>> {
    let raw = RawFace::parse(subset, 0).ok()?;
    raw.table(Tag::from_bytes(b"CFF ")).map(|t| t.to_vec())
}

fn postscript_name(stem: &str) -> String {
    let name: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        "Watermark".to_string()
    } else {
        name
    }
}

fn to_unicode_cmap(gids: &HashMap<char, u16>) -> Vec<u8> {
    let mut pairs: Vec<(u16, char)> = gids.iter().map(|(&ch, &gid)| (gid, ch)).collect();
    pairs.sort_unstable();

    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    // bfchar blocks hold at most 100 entries
    for chunk in pairs.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let hex: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap.into_bytes()
}

/// Encode as WinAnsi, replacing anything outside it with '?'.
pub fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            0x0020..=0x007E => c as u8,
            0x00A0..=0x00FF => c as u8,
            0x20AC => 0x80,
            0x201A => 0x82,
            0x0192 => 0x83,
            0x201E => 0x84,
            0x2026 => 0x85,
            0x2020 => 0x86,
            0x2021 => 0x87,
            0x02C6 => 0x88,
            0x2030 => 0x89,
            0x0160 => 0x8A,
            0x2039 => 0x8B,
            0x0152 => 0x8C,
            0x017D => 0x8E,
            0x2018 => 0x91,
            0x2019 => 0x92,
            0x201C => 0x93,
            0x201D => 0x94,
            0x2022 => 0x95,
            0x2013 => 0x96,
            0x2014 => 0x97,
            0x02DC => 0x98,
            0x2122 => 0x99,
            0x0161 => 0x9A,
            0x203A => 0x9B,
            0x0153 => 0x9C,
            0x017E => 0x9E,
            0x0178 => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// Approximate Helvetica advance in 1/1000 em for a WinAnsi byte.
fn helvetica_width(byte: u8) -> f32 {
    match byte {
        32 => 278.0,
        33..=47 => 333.0,
        48..=57 => 556.0,
        58..=64 => 333.0,
        73 | 74 => 278.0,
        77 => 833.0,
        65..=90 => 667.0,
        91..=96 => 333.0,
        102 | 105 | 106 | 108 | 116 => 278.0,
        109 | 119 => 833.0,
        97..=122 => 556.0,
        _ => 556.0,
    }
}
