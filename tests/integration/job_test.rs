//! File-based jobs through the render pool and task store.

use super::fixtures::{builtin_fonts, docx, pdf_with_pages, white_png, Sections};
use inkmark::config::Config;
use inkmark::file_type::RequestedType;
use inkmark::job::JobContext;
use inkmark::pool::RenderPool;
use inkmark::task::{TaskStatus, TaskStore};
use std::sync::Arc;
use tempfile::TempDir;

fn context(dir: &TempDir) -> JobContext {
    let config = Config {
        output_dir: dir.path().join("out"),
        workers: Some(2),
        ..Config::default()
    };
    JobContext::new(Arc::new(config), builtin_fonts(), TaskStore::new())
}

#[test]
fn test_mixed_batch() {
    let dir = TempDir::new().unwrap();
    let png = dir.path().join("photo.png");
    let pdf = dir.path().join("report.pdf");
    let word = dir.path().join("memo.docx");
    let sheet = dir.path().join("numbers.xlsx");
    std::fs::write(&png, white_png(50, 40)).unwrap();
    std::fs::write(&pdf, pdf_with_pages(&[[0, 0, 612, 792], [0, 0, 595, 842]])).unwrap();
    std::fs::write(&word, docx(Sections::SharedHeader)).unwrap();
    std::fs::write(&sheet, b"PK").unwrap();

    let ctx = context(&dir);
    let pool = RenderPool::new(ctx.config().workers).unwrap();
    let jobs = [&png, &pdf, &word, &sheet]
        .iter()
        .map(|path| ctx.submit(*path, "INTERNAL", RequestedType::Auto, None))
        .collect();

    let records = ctx.run_all(&pool, jobs);
    let statuses: Vec<_> = records.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            TaskStatus::Completed,
            TaskStatus::Completed,
            TaskStatus::Completed,
            TaskStatus::Failed
        ]
    );

    for record in &records[..3] {
        let output = record.output.as_ref().unwrap();
        assert!(output.starts_with(dir.path().join("out")));
        assert!(output.is_file());
    }
    assert!(records[3].output.is_none());
    assert_eq!(ctx.store().len(), 4);
}

#[test]
fn test_forced_type_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let disguised = dir.path().join("scan.bin");
    std::fs::write(&disguised, white_png(20, 20)).unwrap();

    let ctx = context(&dir);
    let auto = ctx.submit(&disguised, "X", RequestedType::Auto, None);
    assert!(ctx.run(&auto).is_err());

    let forced = ctx.submit(&disguised, "X", RequestedType::Image, None);
    let output = ctx.run(&forced).unwrap();
    // Unknown extensions encode as PNG
    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
}

#[test]
fn test_text_is_validated() {
    let dir = TempDir::new().unwrap();
    let png = dir.path().join("a.png");
    std::fs::write(&png, white_png(20, 20)).unwrap();

    let ctx = context(&dir);
    let job = ctx.submit(&png, "", RequestedType::Auto, None);
    assert!(ctx.run(&job).is_err());
    assert_eq!(ctx.store().get(&job.task_id).unwrap().status, TaskStatus::Failed);
}
