//! Rendering pipeline against the fake engine

mod common;

use common::{quartered_page, rgba, BLUE, GREEN, RED};
use pdf_core::engine::fake::FakeDocument;
use pdf_core::render::Color;
use pdf_core::{OwnedSurface, PixelFormat, RenderOutcome, RenderRequest, SkipReason};
use pretty_assertions::assert_eq;

const GRAY: [u8; 4] = [0x84, 0x84, 0x84, 0xFF];
const WHITE: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

#[test]
fn test_margin_gray_and_page_white() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(20, 20, PixelFormat::Rgba8888);
    let outcome = core.render_page(page, &mut surface, &RenderRequest::new(72, 5, 5, 10, 10));
    assert_eq!(outcome, RenderOutcome::Rendered);

    assert_eq!(surface.rgba_at(0, 0), Some(GRAY));
    assert_eq!(surface.rgba_at(19, 19), Some(GRAY));
    assert_eq!(surface.rgba_at(6, 6), Some(rgba(RED)));
    // Bottom-right quarter has no content
    assert_eq!(surface.rgba_at(12, 12), Some(WHITE));
    // Annotations were not requested
    assert_eq!(surface.rgba_at(12, 6), Some(WHITE));
    assert!(!surface.is_locked());
}

#[test]
fn test_full_canvas_has_no_margin() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    core.render_page(page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));

    assert_eq!(surface.rgba_at(9, 9), Some(WHITE));
    assert_eq!(surface.rgba_at(0, 0), Some(rgba(RED)));
}

#[test]
fn test_annotations_follow_request_flag() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let request = RenderRequest::new(72, 0, 0, 10, 10).with_annotations(true);
    core.render_page(page, &mut surface, &request);

    assert_eq!(surface.rgba_at(7, 2), Some(rgba(BLUE)));
    // Widgets belong to the form-aware path only
    assert_eq!(surface.rgba_at(2, 7), Some(WHITE));
}

#[test]
fn test_render_switches_surface_to_rgba() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgb565);
    let outcome = core.render_page(page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert!(outcome.is_rendered());
    assert_eq!(surface.rgba_at(0, 0), Some(rgba(RED)));

    let mut fixed = OwnedSurface::new(10, 10, PixelFormat::Rgb565).fixed_format();
    let outcome = core.render_page(page, &mut fixed, &RenderRequest::new(72, 0, 0, 10, 10));
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::SurfaceConfigure));
    assert_eq!(fixed.lock_calls(), 0);
}

#[test]
fn test_lock_failure_is_absorbed() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888).failing_lock();
    let outcome = core.render_page(page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::SurfaceLock));
    assert!(surface.data().iter().all(|b| *b == 0));
}

#[test]
fn test_stale_page_is_skipped() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();
    core.close_page(page);

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let outcome = core.render_page(page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::InvalidHandle));
    assert_eq!(surface.lock_calls(), 0);
}

#[test]
fn test_form_render_draws_widgets_in_host_order() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let request = RenderRequest::new(72, 0, 0, 10, 10);
    let outcome = core.render_page_with_forms(doc, page, &mut surface, &request);
    assert_eq!(outcome, RenderOutcome::Rendered);

    assert_eq!(surface.rgba_at(2, 2), Some(rgba(RED)));
    assert_eq!(surface.rgba_at(2, 7), Some(rgba(GREEN)));
    assert_eq!(surface.rgba_at(7, 7), Some(WHITE));
    assert_eq!(surface.unlock_calls(), 1);
}

#[test]
fn test_form_render_honors_annotation_flag() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let request = RenderRequest::new(72, 0, 0, 10, 10);
    core.render_page_with_forms(doc, page, &mut surface, &request);
    // Widget overlay only; the annotation stays off
    assert_eq!(surface.rgba_at(7, 2), Some(WHITE));
    assert_eq!(surface.rgba_at(2, 7), Some(rgba(GREEN)));

    let request = request.with_annotations(true);
    core.render_page_with_forms(doc, page, &mut surface, &request);
    assert_eq!(surface.rgba_at(7, 2), Some(rgba(BLUE)));
    assert_eq!(surface.rgba_at(2, 2), Some(rgba(RED)));
}

#[test]
fn test_form_actions_run_once() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::with_pages(2));
    let first = core.load_page(doc, 0).unwrap();
    let second = core.load_page(doc, 1).unwrap();

    let mut surface = OwnedSurface::new(8, 8, PixelFormat::Rgba8888);
    let request = RenderRequest::new(72, 0, 0, 8, 8);
    core.render_page_with_forms(doc, first, &mut surface, &request);
    core.render_page_with_forms(doc, first, &mut surface, &request);
    core.render_page_with_forms(doc, second, &mut surface, &request);

    assert_eq!(
        core.lifecycle().engine().events(),
        vec![
            "init_form",
            "document_actions",
            "after_load_page:0",
            "page_open_action:0",
            "draw_form_fields:0",
            "draw_form_fields:0",
            "after_load_page:1",
            "page_open_action:1",
            "draw_form_fields:1",
        ]
    );
}

#[test]
fn test_form_render_into_rgb565() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgb565);
    let outcome =
        core.render_page_with_forms(doc, page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert!(outcome.is_rendered());

    assert_eq!(surface.rgb565_at(2, 2), Some(RED.to_rgb565()));
    assert_eq!(surface.rgb565_at(2, 2), Some(0xF800));
    assert_eq!(surface.rgb565_at(2, 7), Some(0x07E0));
    assert_eq!(surface.rgb565_at(7, 7), Some(0xFFFF));
}

#[test]
fn test_form_render_rejects_other_formats() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Alpha8);
    let outcome =
        core.render_page_with_forms(doc, page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::UnsupportedFormat));
    assert_eq!(surface.lock_calls(), 0);
    assert!(core.lifecycle().engine().events().is_empty());
}

#[test]
fn test_form_environment_failure_keeps_content() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();
    core.lifecycle().engine().set_form_unavailable(true);

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let outcome =
        core.render_page_with_forms(doc, page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::FormUnavailable));
    assert_eq!(surface.rgba_at(2, 2), Some(rgba(RED)));
    assert_eq!(surface.rgba_at(2, 7), Some(WHITE));
    assert_eq!(surface.lock_calls(), surface.unlock_calls());

    // A later attempt retries environment creation
    core.lifecycle().engine().set_form_unavailable(false);
    let outcome =
        core.render_page_with_forms(doc, page, &mut surface, &RenderRequest::new(72, 0, 0, 10, 10));
    assert!(outcome.is_rendered());
}

#[test]
fn test_form_render_requires_owning_document() {
    let mut core = common::new_core();
    let a = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let b = common::open(&mut core, FakeDocument::with_pages(1));
    let page_of_a = core.load_page(a, 0).unwrap();

    let mut surface = OwnedSurface::new(10, 10, PixelFormat::Rgba8888);
    let outcome = core.render_page_with_forms(
        b,
        page_of_a,
        &mut surface,
        &RenderRequest::new(72, 0, 0, 10, 10),
    );
    assert_eq!(outcome, RenderOutcome::Skipped(SkipReason::InvalidHandle));
}

#[test]
fn test_render_to_image() {
    let mut core = common::new_core();
    let doc = common::open(&mut core, FakeDocument::new(vec![quartered_page()]));
    let page = core.load_page(doc, 0).unwrap();

    let image = core.render_to_image(page, 144, false).unwrap();
    assert_eq!(image.dimensions(), (200, 200));
    assert_eq!(image.get_pixel(10, 10).0, rgba(RED));
    assert_eq!(image.get_pixel(150, 150).0, rgba(Color::WHITE));
}
