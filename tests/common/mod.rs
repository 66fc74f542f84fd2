//! Shared fixtures for integration tests

#![allow(dead_code)]

use pdf_core::engine::fake::{FakeDocument, FakeEngine, FakePage};
use pdf_core::geometry::RectF;
use pdf_core::render::Color;
use pdf_core::{Config, DocumentHandle, EngineLifecycle, PdfCore};

pub const RED: Color = Color::rgba(0xFF, 0x00, 0x00, 0xFF);
pub const BLUE: Color = Color::rgba(0x00, 0x00, 0xFF, 0xFF);
pub const GREEN: Color = Color::rgba(0x00, 0xFF, 0x00, 0xFF);

pub fn new_core() -> PdfCore<FakeEngine> {
    PdfCore::new(EngineLifecycle::shared(FakeEngine::new()), Config::default())
}

pub fn open(core: &mut PdfCore<FakeEngine>, doc: FakeDocument) -> DocumentHandle {
    let bytes = core.lifecycle().engine().register(doc);
    core.open_memory(&bytes, None).expect("fake document opens")
}

/// 100x100 pt page: red content in the top-left quarter, a blue annotation
/// in the top-right quarter and a green widget in the bottom-left quarter
pub fn quartered_page() -> FakePage {
    FakePage::new(100.0, 100.0)
        .content(RectF::new(0.0, 100.0, 50.0, 50.0), RED)
        .annotation(RectF::new(50.0, 100.0, 100.0, 50.0), BLUE)
        .widget(RectF::new(0.0, 50.0, 50.0, 0.0), GREEN)
}

pub fn rgba(color: Color) -> [u8; 4] {
    [color.r, color.g, color.b, color.a]
}
