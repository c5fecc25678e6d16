//! Type-tag routing through the top-level render entry point.

use super::fixtures::{builtin_fonts, docx, pdf_with_pages, white_png, Sections};
use inkmark::watermark::{render, FileKind, WatermarkError, WatermarkOptions, Watermarker};

#[test]
fn test_spreadsheet_is_unsupported() {
    let err = render(
        &white_png(10, 10),
        "X",
        "spreadsheet",
        None,
        ".xlsx",
        builtin_fonts(),
    )
    .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedFileType(ref tag) if tag == "spreadsheet"));
}

#[test]
fn test_each_tag_renders_its_format() {
    let fonts = builtin_fonts();

    let png = render(&white_png(64, 48), "T", "image", None, ".png", fonts.clone()).unwrap();
    assert_eq!(image::guess_format(&png).unwrap(), image::ImageFormat::Png);

    let pdf = render(
        &pdf_with_pages(&[[0, 0, 612, 792]]),
        "T",
        "pdf",
        None,
        ".pdf",
        fonts.clone(),
    )
    .unwrap();
    assert!(pdf.starts_with(b"%PDF-"));

    let word = render(
        &docx(Sections::NoHeader),
        "T",
        "word",
        None,
        ".docx",
        fonts,
    )
    .unwrap();
    assert!(word.starts_with(b"PK"));
}

#[test]
fn test_explicit_options_are_used() {
    let options = WatermarkOptions {
        font_color: "nope".to_string(),
        ..WatermarkOptions::default()
    };
    let err = render(
        &white_png(10, 10),
        "X",
        "image",
        Some(&options),
        ".png",
        builtin_fonts(),
    )
    .unwrap_err();
    assert!(matches!(err, WatermarkError::InvalidColorFormat(_)));
}

#[test]
fn test_enum_variants_match_tags() {
    for (tag, kind) in [
        ("image", FileKind::Image),
        ("pdf", FileKind::Pdf),
        ("word", FileKind::Word),
    ] {
        let watermarker = Watermarker::from_tag(tag, builtin_fonts(), "").unwrap();
        assert_eq!(watermarker.kind(), kind);
        assert_eq!(kind.to_string(), tag);
    }
}

#[test]
fn test_mismatched_tag_surfaces_renderer_error() {
    let err = render(
        &white_png(10, 10),
        "X",
        "pdf",
        None,
        ".pdf",
        builtin_fonts(),
    )
    .unwrap_err();
    assert!(matches!(err, WatermarkError::CorruptDocument(_)));
}
