//! PDF renders: overlay merged onto every page, originals preserved.

use super::fixtures::{builtin_fonts, page_stream_lengths, pdf_with_pages, stream_len};
use inkmark::watermark::{PagedDocWatermarker, WatermarkError, WatermarkOptions, WatermarkPosition};
use lopdf::content::Content;
use lopdf::{Document, Object, ObjectId};
use std::collections::HashSet;

const LETTER: [i64; 4] = [0, 0, 612, 792];
const A4: [i64; 4] = [0, 0, 595, 842];
const LANDSCAPE: [i64; 4] = [0, 0, 842, 595];

fn overlay_stream(doc: &Document, page_id: ObjectId) -> (Vec<u8>, lopdf::Dictionary) {
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    let overlay_id = xobjects
        .get(b"InkmarkWm0")
        .unwrap()
        .as_reference()
        .unwrap();
    let stream = doc.get_object(overlay_id).unwrap().as_stream().unwrap();
    (stream.content.clone(), stream.dict.clone())
}

#[test]
fn test_page_count_and_original_streams_preserved() {
    let input = pdf_with_pages(&[LETTER, A4, LANDSCAPE]);
    let original = Document::load_mem(&input).unwrap();
    let before = page_stream_lengths(&original);

    let marker = PagedDocWatermarker::new(builtin_fonts());
    let out = marker
        .render(&input, "CONFIDENTIAL", &WatermarkOptions::default())
        .unwrap();

    let doc = Document::load_mem(&out).unwrap();
    assert_eq!(doc.get_pages().len(), 3);

    for (page_index, &page_id) in doc.get_pages().values().enumerate() {
        let contents = doc.get_page_contents(page_id);
        // q stream + original streams + overlay invocation
        assert_eq!(contents.len(), before[page_index].len() + 2);
        let kept: Vec<usize> = contents[1..contents.len() - 1]
            .iter()
            .map(|&id| stream_len(&doc, id))
            .collect();
        assert_eq!(kept, before[page_index], "page {}", page_index + 1);
    }
}

fn overlay_id(doc: &Document, page_id: ObjectId) -> ObjectId {
    doc.get_dictionary(page_id)
        .and_then(|page| page.get(b"Resources"))
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .and_then(|x| x.get(b"InkmarkWm0"))
        .and_then(Object::as_reference)
        .unwrap()
}

/// Operands of the `cm` in the invocation stream appended last to a page.
fn stamp_matrix(doc: &Document, page_id: ObjectId) -> Vec<f32> {
    let contents = doc.get_page_contents(page_id);
    let last = doc
        .get_object(*contents.last().unwrap())
        .and_then(Object::as_stream)
        .unwrap();
    Content::decode(&last.content)
        .unwrap()
        .operations
        .into_iter()
        .find(|op| op.operator == "cm")
        .unwrap()
        .operands
        .iter()
        .map(|o| o.as_float().unwrap())
        .collect()
}

#[test]
fn test_overlay_is_shared_and_semi_transparent() {
    let input = pdf_with_pages(&[LETTER, A4]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let options = WatermarkOptions {
        opacity: 0.25,
        position: WatermarkPosition::Center,
        ..WatermarkOptions::default()
    };
    let out = marker.render(&input, "DRAFT", &options).unwrap();
    let doc = Document::load_mem(&out).unwrap();

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let (first, dict) = overlay_stream(&doc, pages[0]);
    let (second, _) = overlay_stream(&doc, pages[1]);
    assert_eq!(first, second);

    let gs = dict
        .get(b"Resources")
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"ExtGState"))
        .and_then(Object::as_dict)
        .and_then(|g| g.get(b"GS0"))
        .and_then(Object::as_dict)
        .unwrap();
    let ca = gs.get(b"ca").and_then(Object::as_float).unwrap();
    assert!((ca - 0.25).abs() < 1e-4);

    let bbox = dict.get(b"BBox").and_then(Object::as_array).unwrap();
    assert_eq!(bbox.len(), 4);
    assert_eq!(overlay_id(&doc, pages[0]), overlay_id(&doc, pages[1]));
}

#[test]
fn test_tile_overlay_matches_each_page_size() {
    let shifted_landscape = [10, 20, 802, 632];
    let input = pdf_with_pages(&[A4, LANDSCAPE, A4, shifted_landscape]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let out = marker
        .render(&input, "SAMPLE", &WatermarkOptions::default())
        .unwrap();
    let doc = Document::load_mem(&out).unwrap();
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for (&page_id, media_box) in pages.iter().zip([A4, LANDSCAPE, A4, shifted_landscape]) {
        let (_, dict) = overlay_stream(&doc, page_id);
        let bbox: Vec<f32> = dict
            .get(b"BBox")
            .and_then(Object::as_array)
            .unwrap()
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        let width = (media_box[2] - media_box[0]) as f32;
        let height = (media_box[3] - media_box[1]) as f32;
        assert_eq!(bbox, vec![0.0, 0.0, width, height]);

        // Painted unscaled at the page origin, so the surface covers the page
        let matrix = stamp_matrix(&doc, page_id);
        assert_eq!(
            matrix,
            vec![1.0, 0.0, 0.0, 1.0, media_box[0] as f32, media_box[1] as f32]
        );
    }

    // Equal sizes share one XObject
    assert_eq!(overlay_id(&doc, pages[0]), overlay_id(&doc, pages[2]));
    let distinct: HashSet<ObjectId> = pages.iter().map(|&p| overlay_id(&doc, p)).collect();
    assert_eq!(distinct.len(), 3);
}

#[test]
fn test_center_overlay_is_fitted_on_other_sizes() {
    let input = pdf_with_pages(&[LANDSCAPE]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let options = WatermarkOptions {
        position: WatermarkPosition::Center,
        ..WatermarkOptions::default()
    };
    let out = marker.render(&input, "SAMPLE", &options).unwrap();
    let doc = Document::load_mem(&out).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();

    let matrix = stamp_matrix(&doc, page_id);
    let scale = 595.0 / 792.0;
    assert!((matrix[0] - scale).abs() < 1e-2);
    assert!((matrix[3] - scale).abs() < 1e-2);
    assert!((matrix[4] - (842.0 - 612.0 * scale) / 2.0).abs() < 1.0);
}

#[test]
fn test_indirect_contents_array_keeps_original_streams() {
    let input = pdf_with_pages(&[LETTER]);
    let mut doc = Document::load_mem(&input).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let original = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Contents"))
        .and_then(Object::as_reference)
        .unwrap();
    let array_id = doc.add_object(Object::Array(vec![Object::Reference(original)]));
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("Contents", array_id);
    let mut indirect = Vec::new();
    doc.save_to(&mut indirect).unwrap();
    let original_len = stream_len(&doc, original);

    let marker = PagedDocWatermarker::new(builtin_fonts());
    let out = marker
        .render(&indirect, "SAMPLE", &WatermarkOptions::default())
        .unwrap();
    let doc = Document::load_mem(&out).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();

    let contents = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Contents"))
        .and_then(Object::as_array)
        .unwrap();
    assert_eq!(contents.len(), 3);
    for entry in contents {
        let id = entry.as_reference().unwrap();
        assert!(
            doc.get_object(id).and_then(Object::as_stream).is_ok(),
            "content entry {:?} is not a stream",
            id
        );
    }
    let kept = contents[1].as_reference().unwrap();
    assert_eq!(stream_len(&doc, kept), original_len);
}

#[test]
fn test_tile_draws_repeatedly_and_center_once() {
    let input = pdf_with_pages(&[LETTER]);
    let marker = PagedDocWatermarker::new(builtin_fonts());

    let count_tj = |position: WatermarkPosition| {
        let options = WatermarkOptions {
            position,
            ..WatermarkOptions::default()
        };
        let out = marker.render(&input, "SAMPLE", &options).unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let (content, _) = overlay_stream(&doc, page_id);
        Content::decode(&content)
            .unwrap()
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .count()
    };

    assert!(count_tj(WatermarkPosition::Tile) > 4);
    assert_eq!(count_tj(WatermarkPosition::Center), 1);
    assert_eq!(count_tj(WatermarkPosition::BottomLeft), 1);
}

#[test]
fn test_unencodable_text_degrades_to_question_marks() {
    let input = pdf_with_pages(&[LETTER]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let options = WatermarkOptions {
        position: WatermarkPosition::Center,
        ..WatermarkOptions::default()
    };

    let out = marker.render(&input, "机密", &options).unwrap();
    let doc = Document::load_mem(&out).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let (content, _) = overlay_stream(&doc, page_id);

    let ops = Content::decode(&content).unwrap().operations;
    let shown = ops
        .iter()
        .find(|op| op.operator == "Tj")
        .and_then(|op| op.operands.first())
        .and_then(|o| o.as_str().ok())
        .unwrap();
    assert_eq!(shown, b"??");
}

#[test]
fn test_watermarking_twice_uses_a_fresh_resource_name() {
    let input = pdf_with_pages(&[A4]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let options = WatermarkOptions::default();

    let once = marker.render(&input, "ONE", &options).unwrap();
    let twice = marker.render(&once, "TWO", &options).unwrap();

    let doc = Document::load_mem(&twice).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    let page_id = *doc.get_pages().values().next().unwrap();
    let resources = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"Resources")
        .and_then(Object::as_dict)
        .unwrap();
    let xobjects = resources.get(b"XObject").and_then(Object::as_dict).unwrap();
    assert!(xobjects.has(b"InkmarkWm0"));
    assert!(xobjects.has(b"InkmarkWm1"));
}

#[test]
fn test_zero_area_page_is_rejected() {
    let input = pdf_with_pages(&[LETTER, [0, 0, 0, 792]]);
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let err = marker
        .render(&input, "X", &WatermarkOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        WatermarkError::UnsupportedPageGeometry { page: 2, .. }
    ));
}

#[test]
fn test_garbage_is_corrupt() {
    let marker = PagedDocWatermarker::new(builtin_fonts());
    let err = marker
        .render(b"%PDF-1.4\nnot really", "X", &WatermarkOptions::default())
        .unwrap_err();
    assert!(matches!(err, WatermarkError::CorruptDocument(_)));
}
