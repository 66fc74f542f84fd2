//! Engine lifecycle and document open/close behaviour

mod common;

use std::io::Write;
use std::sync::Arc;

use pdf_core::engine::fake::{FakeDocument, FakeEngine};
use pdf_core::{Config, CoreError, DocumentSource, EngineLifecycle, ErrorKind, PdfCore};
use pretty_assertions::assert_eq;

#[test]
fn test_engine_initialized_once_for_many_documents() {
    let lifecycle = EngineLifecycle::shared(FakeEngine::new());
    let bytes = lifecycle.engine().register(FakeDocument::with_pages(1));
    let mut core = PdfCore::new(Arc::clone(&lifecycle), Config::default());

    let a = core.open_memory(&bytes, None).unwrap();
    let b = core.open_memory(&bytes, None).unwrap();
    assert_eq!(lifecycle.stats().ref_count, 2);
    assert_eq!(lifecycle.engine().init_calls(), 1);

    core.close_document(a);
    assert_eq!(lifecycle.engine().destroy_calls(), 0);
    core.close_document(b);
    assert_eq!(lifecycle.engine().destroy_calls(), 1);
    assert!(!lifecycle.stats().is_initialized());
}

#[test]
fn test_cores_share_one_lifecycle() {
    let lifecycle = EngineLifecycle::shared(FakeEngine::new());
    let bytes = lifecycle.engine().register(FakeDocument::with_pages(1));
    let mut first = PdfCore::new(Arc::clone(&lifecycle), Config::default());
    let mut second = PdfCore::new(Arc::clone(&lifecycle), Config::default());

    first.open_memory(&bytes, None).unwrap();
    second.open_memory(&bytes, None).unwrap();
    assert_eq!(lifecycle.engine().init_calls(), 1);

    drop(first);
    assert_eq!(lifecycle.stats().ref_count, 1);
    drop(second);
    assert_eq!(lifecycle.engine().destroy_calls(), 1);
}

#[test]
fn test_empty_source_never_reaches_engine() {
    let mut core = common::new_core();
    let err = core.open_memory(&[], None).unwrap_err();
    assert!(matches!(err, CoreError::EmptySource));
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustedOrEmptySource);
    assert_eq!(core.lifecycle().engine().load_calls(), 0);
    assert_eq!(core.lifecycle().engine().init_calls(), 0);
}

#[test]
fn test_failed_open_releases_engine() {
    let mut core = common::new_core();
    let err = core.open_memory(b"not a pdf", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FormatOrCorrupt);

    let engine = core.lifecycle().engine();
    assert_eq!(engine.init_calls(), 1);
    assert_eq!(engine.destroy_calls(), 1);
    assert_eq!(core.lifecycle().stats().ref_count, 0);
    assert_eq!(core.document_count(), 0);
}

#[test]
fn test_password_errors_are_distinct() {
    let mut core = common::new_core();
    let bytes = core
        .lifecycle()
        .engine()
        .register(FakeDocument::with_pages(1).password("secret"));

    let missing = core.open_memory(&bytes, None).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::PasswordRequired);
    let wrong = core.open_memory(&bytes, Some("guess")).unwrap_err();
    assert_eq!(wrong.kind(), ErrorKind::PasswordRequired);

    let doc = core.open_memory(&bytes, Some("secret")).unwrap();
    assert_eq!(core.page_count(doc), Some(1));
}

#[test]
fn test_unsupported_security() {
    let mut core = common::new_core();
    let bytes = core
        .lifecycle()
        .engine()
        .register(FakeDocument::with_pages(1).unsupported_security());

    let err = core.open_memory(&bytes, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedSecurity);
}

#[test]
fn test_open_from_file() {
    let mut core = common::new_core();
    let bytes = core.lifecycle().engine().register(FakeDocument::with_pages(4));

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(&bytes).unwrap();

    let doc = core.open_file(file, None).unwrap();
    assert_eq!(core.page_count(doc), Some(4));
    assert_eq!(core.source_size(doc), Some(bytes.len() as u64));
}

#[test]
fn test_empty_file_is_rejected() {
    let mut core = common::new_core();
    let file = tempfile::tempfile().unwrap();
    let err = core.open_file(file, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustedOrEmptySource);
}

#[test]
fn test_memory_source_is_copied() {
    let mut core = common::new_core();
    let mut bytes = core.lifecycle().engine().register(FakeDocument::with_pages(2));

    let source = DocumentSource::from_slice(&bytes);
    bytes.clear();
    let doc = core.open_document(source, None).unwrap();
    assert_eq!(core.page_count(doc), Some(2));
}

#[test]
fn test_every_page_in_range_loads() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::with_pages(5));

    let count = core.page_count(doc).unwrap();
    assert!(count >= 0);
    let pages = core.load_pages(doc, 0, count - 1).unwrap();
    assert_eq!(pages.len(), count as usize);
    for (index, page) in pages.iter().enumerate() {
        assert_eq!(core.page_index(*page), Some(index as i32));
    }
}
