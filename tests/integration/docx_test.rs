//! DOCX renders: VML shape in every section's default header.

use super::fixtures::{docx, read_zip_text, zip_names, Sections, REL_NS, VML_NS, WML_NS};
use inkmark::watermark::{FlowDocWatermarker, WatermarkError, WatermarkOptions};

fn shapes_in(xml: &str) -> usize {
    let doc = roxmltree::Document::parse(xml).unwrap();
    doc.descendants()
        .filter(|n| n.has_tag_name((VML_NS, "shape")))
        .count()
}

#[test]
fn test_sections_without_header_get_one() {
    let out = FlowDocWatermarker::new()
        .render(&docx(Sections::NoHeader), "机密 & <draft>", &WatermarkOptions::default())
        .unwrap();

    let document = read_zip_text(&out, "word/document.xml").unwrap();
    let doc = roxmltree::Document::parse(&document).unwrap();
    let sect = doc
        .descendants()
        .find(|n| n.has_tag_name((WML_NS, "sectPr")))
        .unwrap();
    let reference = sect.first_element_child().unwrap();
    assert!(reference.has_tag_name((WML_NS, "headerReference")));
    let rel_id = reference.attribute((REL_NS, "id")).unwrap();

    let rels = read_zip_text(&out, "word/_rels/document.xml.rels").unwrap();
    let rels_doc = roxmltree::Document::parse(&rels).unwrap();
    let rel = rels_doc
        .descendants()
        .find(|n| n.attribute("Id") == Some(rel_id))
        .unwrap();
    let target = rel.attribute("Target").unwrap();
    assert!(rel.attribute("Type").unwrap().ends_with("/header"));

    let header = read_zip_text(&out, &format!("word/{}", target)).unwrap();
    assert_eq!(shapes_in(&header), 1);

    let header_doc = roxmltree::Document::parse(&header).unwrap();
    let textpath = header_doc
        .descendants()
        .find(|n| n.has_tag_name((VML_NS, "textpath")))
        .unwrap();
    assert_eq!(textpath.attribute("string"), Some("机密 & <draft>"));

    let content_types = read_zip_text(&out, "[Content_Types].xml").unwrap();
    assert!(content_types.contains(&format!("PartName=\"/word/{}\"", target)));
}

#[test]
fn test_shared_header_gets_one_shape_in_first_paragraph() {
    let out = FlowDocWatermarker::new()
        .render(&docx(Sections::SharedHeader), "DRAFT", &WatermarkOptions::default())
        .unwrap();

    let header = read_zip_text(&out, "word/header1.xml").unwrap();
    assert_eq!(shapes_in(&header), 1);

    let doc = roxmltree::Document::parse(&header).unwrap();
    let first_p = doc
        .descendants()
        .find(|n| n.has_tag_name((WML_NS, "p")))
        .unwrap();
    assert!(first_p
        .descendants()
        .any(|n| n.has_tag_name((VML_NS, "shape"))));

    // Existing header reused, nothing new added
    assert!(!zip_names(&out).iter().any(|n| n.contains("inkmark")));
}

#[test]
fn test_shape_attributes_follow_options() {
    let options = WatermarkOptions {
        font_size: 60,
        font_color: "#FF0000".to_string(),
        opacity: 0.5,
        angle: 30.0,
        ..WatermarkOptions::default()
    };
    let out = FlowDocWatermarker::new()
        .render(&docx(Sections::SharedHeader), "TOP SECRET", &options)
        .unwrap();

    let header = read_zip_text(&out, "word/header1.xml").unwrap();
    let doc = roxmltree::Document::parse(&header).unwrap();
    let shape = doc
        .descendants()
        .find(|n| n.has_tag_name((VML_NS, "shape")))
        .unwrap();
    assert_eq!(shape.attribute("fillcolor"), Some("#FF0000"));
    let style = shape.attribute("style").unwrap();
    assert!(style.contains("rotation:30"));
    assert!(style.contains("width:500pt;height:200pt"));

    let fill = shape
        .children()
        .find(|n| n.has_tag_name((VML_NS, "fill")))
        .unwrap();
    assert_eq!(fill.attribute("opacity"), Some("0.5"));

    let textpath = shape
        .children()
        .find(|n| n.has_tag_name((VML_NS, "textpath")))
        .unwrap();
    let style = textpath.attribute("style").unwrap();
    assert!(style.contains("font-size:60pt"));
    assert!(style.contains("Microsoft YaHei"));
}

#[test]
fn test_untouched_entries_survive() {
    let input = docx(Sections::SharedHeader);
    let out = FlowDocWatermarker::new()
        .render(&input, "X", &WatermarkOptions::default())
        .unwrap();

    assert_eq!(
        read_zip_text(&out, "word/media/keep.bin").as_deref(),
        Some("untouched payload")
    );
    assert_eq!(
        read_zip_text(&out, "_rels/.rels"),
        read_zip_text(&input, "_rels/.rels")
    );
    assert_eq!(
        read_zip_text(&out, "word/document.xml"),
        read_zip_text(&input, "word/document.xml")
    );
}

#[test]
fn test_watermarking_twice_stacks_shapes() {
    let marker = FlowDocWatermarker::new();
    let options = WatermarkOptions::default();
    let once = marker.render(&docx(Sections::NoHeader), "ONE", &options).unwrap();
    let twice = marker.render(&once, "TWO", &options).unwrap();

    let names = zip_names(&twice);
    let headers: Vec<_> = names
        .iter()
        .filter(|n| n.starts_with("word/header"))
        .collect();
    assert_eq!(headers.len(), 1);
    let header = read_zip_text(&twice, headers[0]).unwrap();
    assert_eq!(shapes_in(&header), 2);
}

#[test]
fn test_missing_section_properties() {
    let err = FlowDocWatermarker::new()
        .render(&docx(Sections::NoSectPr), "X", &WatermarkOptions::default())
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedDocumentStructure(_)));
}

#[test]
fn test_not_a_zip() {
    let err = FlowDocWatermarker::new()
        .render(b"PK\x03\x04 truncated", "X", &WatermarkOptions::default())
        .unwrap_err();
    assert!(matches!(err, WatermarkError::CorruptDocument(_)));
}

#[test]
fn test_bad_color_is_rejected() {
    let options = WatermarkOptions {
        font_color: "red".to_string(),
        ..WatermarkOptions::default()
    };
    let err = FlowDocWatermarker::new()
        .render(&docx(Sections::NoHeader), "X", &options)
        .unwrap_err();
    assert!(matches!(err, WatermarkError::InvalidColorFormat(_)));
}
