//! Watermarking of flow (DOCX) documents.
//!
//! Every section's default header gets a VML text-path shape appended to its
//! first paragraph. The shape is a vector primitive the viewer renders and
//! repeats behind the page body; nothing is rasterized here.
//!
//! XML is never re-serialized. Parts are parsed with `roxmltree` to find
//! insertion points, and the new markup is spliced into the original text by
//! byte range, so untouched markup survives verbatim. Untouched zip entries
//! are raw-copied.

use super::{WatermarkError, WatermarkOptions};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::ops::Range;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const VML_NS: &str = "urn:schemas-microsoft-com:vml";
const HEADER_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
const HEADER_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml";

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Font family hint for the shape's text path.
pub const SHAPE_FONT_FAMILY: &str = "Microsoft YaHei";

/// Renders watermarks into the header layer of DOCX documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowDocWatermarker;

/// A header that must be created for a section that has none.
#[derive(Debug)]
struct NewHeader {
    part: String,
    rel_id: String,
}

impl FlowDocWatermarker {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        data: &[u8],
        text: &str,
        options: &WatermarkOptions,
    ) -> Result<Vec<u8>, WatermarkError> {
        super::color::hex_to_rgb(&options.font_color)?;

        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let document = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or_else(|| WatermarkError::CorruptDocument(format!("missing {}", DOCUMENT_PART)))?;
        let content_types = read_part(&mut archive, CONTENT_TYPES_PART)?.ok_or_else(|| {
            WatermarkError::CorruptDocument(format!("missing {}", CONTENT_TYPES_PART))
        })?;
        let rels = read_part(&mut archive, DOCUMENT_RELS_PART)?;

        let rel_targets = match &rels {
            Some(xml) => parse_relationships(xml)?,
            None => HashMap::new(),
        };

        let plan = plan_sections(&document, &rel_targets)?;

        let mut replaced: BTreeMap<String, String> = BTreeMap::new();
        let mut added: BTreeMap<String, String> = BTreeMap::new();

        // Existing headers, each patched once even when shared by sections.
        for part in &plan.existing_headers {
            let xml = read_part(&mut archive, part)?.ok_or_else(|| {
                WatermarkError::UnsupportedDocumentStructure(format!(
                    "header part {} is missing",
                    part
                ))
            })?;
            replaced.insert(part.clone(), insert_into_header(&xml, part, text, options)?);
        }

        if !plan.new_headers.is_empty() {
            replaced.insert(DOCUMENT_PART.to_string(), plan.document);

            for header in &plan.new_headers {
                added.insert(header.part.clone(), new_header_xml(text, options));
            }

            let rels_xml = add_relationships(rels.as_deref(), &plan.new_headers)?;
            if rels.is_some() {
                replaced.insert(DOCUMENT_RELS_PART.to_string(), rels_xml);
            } else {
                added.insert(DOCUMENT_RELS_PART.to_string(), rels_xml);
            }

            replaced.insert(
                CONTENT_TYPES_PART.to_string(),
                add_content_type_overrides(&content_types, &plan.new_headers)?,
            );
        }

        tracing::debug!(
            sections = plan.sections,
            patched_headers = plan.existing_headers.len(),
            created_headers = plan.new_headers.len(),
            "docx watermark applied"
        );

        rewrite_archive(&mut archive, &replaced, &added)
    }
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, WatermarkError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| WatermarkError::CorruptDocument(format!("{}: {}", name, e)))?;
    Ok(Some(content))
}

fn parse_xml<'a>(xml: &'a str, part: &str) -> Result<roxmltree::Document<'a>, WatermarkError> {
    roxmltree::Document::parse(xml)
        .map_err(|e| WatermarkError::CorruptDocument(format!("{}: {}", part, e)))
}

/// Relationship id to target part name (resolved against `word/`).
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, WatermarkError> {
    let doc = parse_xml(xml, DOCUMENT_RELS_PART)?;

    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name((PKG_REL_NS, "Relationship")))
        .filter(|n| n.attribute("TargetMode") != Some("External"))
        .filter_map(|n| {
            let id = n.attribute("Id")?;
            let target = n.attribute("Target")?;
            Some((id.to_string(), resolve_target(target)))
        })
        .collect())
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target),
    }
}

/// Result of walking the document's sections.
#[derive(Debug)]
struct SectionPlan {
    sections: usize,
    existing_headers: Vec<String>,
    new_headers: Vec<NewHeader>,
    /// document.xml with header references added for the new headers
    document: String,
}

fn plan_sections(
    document: &str,
    rel_targets: &HashMap<String, String>,
) -> Result<SectionPlan, WatermarkError> {
    let doc = parse_xml(document, DOCUMENT_PART)?;

    // A sectPr inside sectPrChange is a tracked revision, not a section
    let sections: Vec<_> = doc
        .descendants()
        .filter(|n| n.has_tag_name((WML_NS, "sectPr")))
        .filter(|n| {
            !n.parent_element()
                .is_some_and(|p| p.has_tag_name((WML_NS, "sectPrChange")))
        })
        .collect();

    if sections.is_empty() {
        return Err(WatermarkError::UnsupportedDocumentStructure(
            "document has no section properties".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut existing_headers = Vec::new();
    let mut new_headers = Vec::new();
    let mut edits = Vec::new();

    for section in &sections {
        let default_ref = section.children().find(|n| {
            n.has_tag_name((WML_NS, "headerReference"))
                && n.attribute((WML_NS, "type")).unwrap_or("default") == "default"
        });

        match default_ref {
            Some(reference) => {
                let rel_id = reference.attribute((REL_NS, "id")).ok_or_else(|| {
                    WatermarkError::UnsupportedDocumentStructure(
                        "header reference without relationship id".to_string(),
                    )
                })?;
                let part = rel_targets.get(rel_id).ok_or_else(|| {
                    WatermarkError::UnsupportedDocumentStructure(format!(
                        "header relationship {} has no target",
                        rel_id
                    ))
                })?;
                if seen.insert(part.clone()) {
                    existing_headers.push(part.clone());
                }
            }
            None => {
                let n = new_headers.len() + 1;
                let header = NewHeader {
                    part: format!("word/header_inkmark{}.xml", n),
                    rel_id: unique_rel_id(rel_targets, n),
                };

                let prefix = tag_prefix(&document[section.range()]);
                let reference = format!(
                    r#"<{} xmlns:r="{}" {}="default" r:id="{}"/>"#,
                    qualified(prefix, "headerReference"),
                    REL_NS,
                    qualified(prefix, "type"),
                    header.rel_id
                );
                edits.push(insert_first_child(document, section.range(), reference));
                new_headers.push(header);
            }
        }
    }

    Ok(SectionPlan {
        sections: sections.len(),
        existing_headers,
        new_headers,
        document: splice(document, edits),
    })
}

fn unique_rel_id(rel_targets: &HashMap<String, String>, n: usize) -> String {
    let mut candidate = format!("rIdInkmark{}", n);
    let mut bump = 0;
    while rel_targets.contains_key(&candidate) {
        bump += 1;
        candidate = format!("rIdInkmark{}_{}", n, bump);
    }
    candidate
}

fn insert_into_header(
    xml: &str,
    part: &str,
    text: &str,
    options: &WatermarkOptions,
) -> Result<String, WatermarkError> {
    let doc = parse_xml(xml, part)?;
    let root = doc.root_element();

    if !root.has_tag_name((WML_NS, "hdr")) {
        return Err(WatermarkError::UnsupportedDocumentStructure(format!(
            "{} is not a header part",
            part
        )));
    }

    let prefix = tag_prefix(&xml[root.range()]);
    let run = watermark_run(prefix, text, options);

    let edit = match root.children().find(|n| n.has_tag_name((WML_NS, "p"))) {
        Some(paragraph) => append_child(xml, paragraph.range(), run),
        None => {
            let p = qualified(prefix, "p");
            append_child(xml, root.range(), format!("<{}>{}</{}>", p, run, p))
        }
    };

    Ok(splice(xml, vec![edit]))
}

fn new_header_xml(text: &str, options: &WatermarkOptions) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:hdr xmlns:w="{}" xmlns:r="{}"><w:p>{}</w:p></w:hdr>"#
        ),
        WML_NS,
        REL_NS,
        watermark_run("w", text, options)
    )
}

/// The `<w:r>` holding the VML watermark shape.
pub fn watermark_run(prefix: &str, text: &str, options: &WatermarkOptions) -> String {
    format!(
        concat!(
            "<{r}><{pict}>",
            r##"<v:shape xmlns:v="{vml}" id="watermark" type="#_x0000_t136" "##,
            r#"style="position:absolute;margin-left:0;margin-top:0;width:500pt;height:200pt;rotation:{angle};z-index:-251658752" "#,
            r#"fillcolor="{color}" stroked="f">"#,
            r#"<v:fill opacity="{opacity}"/>"#,
            r#"<v:textpath on="t" style="font-family:&quot;{family}&quot;;font-size:{size}pt" string="{text}"/>"#,
            "</v:shape>",
            "</{pict}></{r}>"
        ),
        r = qualified(prefix, "r"),
        pict = qualified(prefix, "pict"),
        vml = VML_NS,
        angle = options.angle as i32,
        color = escape_attr(&options.font_color),
        opacity = options.opacity,
        family = SHAPE_FONT_FAMILY,
        size = options.font_size,
        text = escape_attr(text),
    )
}

fn add_relationships(
    existing: Option<&str>,
    headers: &[NewHeader],
) -> Result<String, WatermarkError> {
    let entries: String = headers
        .iter()
        .map(|h| {
            let target = h.part.strip_prefix("word/").unwrap_or(&h.part);
            format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
                h.rel_id, HEADER_REL_TYPE, target
            )
        })
        .collect();

    match existing {
        Some(xml) => {
            let doc = parse_xml(xml, DOCUMENT_RELS_PART)?;
            let root = doc.root_element();
            Ok(splice(xml, vec![append_child(xml, root.range(), entries)]))
        }
        None => Ok(format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                "\n",
                r#"<Relationships xmlns="{}">{}</Relationships>"#
            ),
            PKG_REL_NS, entries
        )),
    }
}

fn add_content_type_overrides(xml: &str, headers: &[NewHeader]) -> Result<String, WatermarkError> {
    let doc = parse_xml(xml, CONTENT_TYPES_PART)?;
    let root = doc.root_element();

    let entries: String = headers
        .iter()
        .map(|h| {
            format!(
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                h.part, HEADER_CONTENT_TYPE
            )
        })
        .collect();

    Ok(splice(xml, vec![append_child(xml, root.range(), entries)]))
}

fn rewrite_archive<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    replaced: &BTreeMap<String, String>,
    added: &BTreeMap<String, String>,
) -> Result<Vec<u8>, WatermarkError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let io_err = |e: std::io::Error| WatermarkError::CorruptDocument(e.to_string());

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        let name = entry.name().to_string();

        match replaced.get(&name) {
            Some(content) => {
                drop(entry);
                writer.start_file(name, options)?;
                writer.write_all(content.as_bytes()).map_err(io_err)?;
            }
            None => writer.raw_copy_file(entry)?,
        }
    }

    for (name, content) in added {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(content.as_bytes()).map_err(io_err)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Prefix of an element's qualified name, read from its start tag.
fn tag_prefix(element_source: &str) -> &str {
    let name_end = element_source
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_whitespace() || *c == '>' || *c == '/')
        .map(|(i, _)| i)
        .unwrap_or(element_source.len());
    let name = &element_source[1.min(name_end)..name_end];
    name.split_once(':').map(|(p, _)| p).unwrap_or("")
}

fn qualified(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{}:{}", prefix, local)
    }
}

/// An insertion of `text` at byte offset `at`, or a replacement of a range.
type Edit = (Range<usize>, String);

/// Insert `content` as the last child of the element spanning `range`.
fn append_child(source: &str, range: Range<usize>, content: String) -> Edit {
    let element = &source[range.clone()];
    if element.ends_with("/>") {
        expand_empty(element, range, content)
    } else {
        let close = element.rfind("</").map(|i| range.start + i).unwrap_or(range.end);
        (close..close, content)
    }
}

/// Insert `content` as the first child of the element spanning `range`.
fn insert_first_child(source: &str, range: Range<usize>, content: String) -> Edit {
    let element = &source[range.clone()];
    if element.ends_with("/>") {
        expand_empty(element, range, content)
    } else {
        let open_end = start_tag_end(element).map(|i| range.start + i).unwrap_or(range.end);
        (open_end..open_end, content)
    }
}

/// Rewrite `<a x="1"/>` as `<a x="1">content</a>`.
fn expand_empty(element: &str, range: Range<usize>, content: String) -> Edit {
    let head = element[..element.len() - 2].trim_end();
    let name = head[1..]
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default();
    (range, format!("{}>{}</{}>", head, content, name))
}

/// Byte index just past the `>` of a start tag, skipping quoted values.
fn start_tag_end(element: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in element.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn splice(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = source.to_string();
    for (range, content) in edits {
        out.replace_range(range, &content);
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
