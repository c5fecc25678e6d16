//! Shared fixtures: builtin-only font resolver and in-memory documents.

use image::{ImageFormat, Rgba, RgbaImage};
use inkmark::watermark::fonts::{
    CachedResolver, FontResolver, FontSearchConfig, LoadedFont, ScanningResolver, Typeface,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const VML_NS: &str = "urn:schemas-microsoft-com:vml";

/// Resolver that can only ever fall back to the built-in face.
pub fn builtin_fonts() -> Arc<dyn FontResolver> {
    Arc::new(ScanningResolver::new(FontSearchConfig {
        custom_path: Some(PathBuf::from("/nonexistent/inkmark/custom.ttf")),
        known_paths: Vec::new(),
        system_root: PathBuf::from("/nonexistent/inkmark/fonts"),
    }))
}

/// Resolver over the host's installed fonts and the face it picked.
///
/// None when the host has no usable font file.
pub fn system_fonts() -> Option<(Arc<dyn FontResolver>, Arc<LoadedFont>)> {
    let resolver: Arc<dyn FontResolver> =
        Arc::new(CachedResolver::new(FontSearchConfig::default()));
    let face = match resolver.resolve(40.0).typeface() {
        Typeface::Outline(font) => font.clone(),
        Typeface::Builtin => return None,
    };
    Some((resolver, face))
}

pub fn solid_image(width: u32, height: u32, color: [u8; 4], format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buffer = Cursor::new(Vec::new());
    let dynamic = if format == ImageFormat::Jpeg {
        image::DynamicImage::ImageRgb8(image::DynamicImage::ImageRgba8(img).to_rgb8())
    } else {
        image::DynamicImage::ImageRgba8(img)
    };
    dynamic.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn white_png(width: u32, height: u32) -> Vec<u8> {
    solid_image(width, height, [255, 255, 255, 255], ImageFormat::Png)
}

/// A PDF with one text content stream per page, each page sized by `media_boxes`.
pub fn pdf_with_pages(media_boxes: &[[i64; 4]]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (index, media_box) in media_boxes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 300.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Page {} body text", index + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => Object::Array(media_box.iter().map(|&v| v.into()).collect()),
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// Content stream lengths per page, in page order.
pub fn page_stream_lengths(doc: &Document) -> Vec<Vec<usize>> {
    doc.get_pages()
        .values()
        .map(|&page_id| {
            doc.get_page_contents(page_id)
                .into_iter()
                .map(|id| stream_len(doc, id))
                .collect()
        })
        .collect()
}

pub fn stream_len(doc: &Document, id: ObjectId) -> usize {
    doc.get_object(id)
        .and_then(Object::as_stream)
        .map(|s| s.content.len())
        .unwrap()
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>{overrides}</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// Section layout for [`docx`].
pub enum Sections {
    /// One body-level sectPr without any header reference
    NoHeader,
    /// Two sections sharing one existing default header
    SharedHeader,
    /// A body without any sectPr
    NoSectPr,
}

pub fn docx(sections: Sections) -> Vec<u8> {
    let body_p = r#"<w:p><w:r><w:t>Body text</w:t></w:r></w:p>"#;
    let (body, rels, header, overrides) = match sections {
        Sections::NoHeader => (
            format!(
                r#"{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#,
                body_p
            ),
            String::new(),
            None,
            String::new(),
        ),
        Sections::SharedHeader => (
            format!(
                concat!(
                    r#"<w:p><w:pPr><w:sectPr><w:headerReference w:type="default" r:id="rIdH1"/></w:sectPr></w:pPr></w:p>"#,
                    "{}",
                    r#"<w:sectPr><w:headerReference w:type="default" r:id="rIdH1"/><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>"#
                ),
                body_p
            ),
            r#"<Relationship Id="rIdH1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#.to_string(),
            Some(format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="{}"><w:p><w:r><w:t>Header</w:t></w:r></w:p><w:p/></w:hdr>"#,
                WML_NS
            )),
            r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#.to_string(),
        ),
        Sections::NoSectPr => (body_p.to_string(), String::new(), None, String::new()),
    };

    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{}" xmlns:r="{}"><w:body>{}</w:body></w:document>"#,
        WML_NS, REL_NS, body
    );
    let document_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        rels
    );

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut add = |name: &str, content: &str| {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    };

    add("[Content_Types].xml", &CONTENT_TYPES.replace("{overrides}", &overrides));
    add("_rels/.rels", PACKAGE_RELS);
    add("word/document.xml", &document);
    add("word/_rels/document.xml.rels", &document_rels);
    if let Some(header) = &header {
        add("word/header1.xml", header);
    }
    add("word/media/keep.bin", "untouched payload");

    writer.finish().unwrap().into_inner()
}

pub fn read_zip_text(data: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(data)).ok()?;
    let mut entry = archive.by_name(name).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).ok()?;
    Some(content)
}

pub fn zip_names(data: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(data)).unwrap();
    archive.file_names().map(str::to_string).collect()
}
