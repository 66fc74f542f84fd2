//! Rendering Pipeline
//!
//! Rasterizes a page into a caller-owned [`RenderTarget`].
//!
//! # Pipeline
//!
//! ```text
//! target ─► format check ─► lock ─► gray canvas (if draw < canvas)
//!                                      │
//!                                      ▼
//!                              white draw rect (clamped)
//!                                      │
//!                                      ▼
//!                              engine page content
//!                                      │  (form-aware path only)
//!                                      ▼
//!          form env (once/doc) ─► page open actions (once/page)
//!                                      │
//!                                      ▼
//!           swap R/B ─► form widgets ─► swap back ─► pack 565 ─► unlock
//! ```
//!
//! Failures never propagate: each abort is logged and reported as
//! [`RenderOutcome::Skipped`], with the surface unlocked on the way out.

mod bitmap;
mod surface;

pub use bitmap::{Bitmap, ChannelOrder, Color};
pub use surface::{OwnedSurface, PixelFormat, RenderTarget, SurfaceError, SurfaceInfo, SurfaceLock};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::{Engine, RenderFlags};
use crate::geometry::Viewport;
use crate::handle::{DocumentHandle, PageHandle, Slot};
use crate::registry::{DocumentEntry, PdfCore};

/// Where and how large to draw a page on the target canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Resolution the draw size was computed for
    pub dpi: i32,
    pub start_x: i32,
    pub start_y: i32,
    pub draw_width: i32,
    pub draw_height: i32,
    pub render_annotations: bool,
}

impl RenderRequest {
    pub fn new(dpi: i32, start_x: i32, start_y: i32, draw_width: i32, draw_height: i32) -> Self {
        Self {
            dpi,
            start_x,
            start_y,
            draw_width,
            draw_height,
            render_annotations: false,
        }
    }

    pub fn with_annotations(mut self, render_annotations: bool) -> Self {
        self.render_annotations = render_annotations;
        self
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.start_x, self.start_y, self.draw_width, self.draw_height)
    }

    fn flags(&self) -> RenderFlags {
        RenderFlags::with_annotations(self.render_annotations)
    }
}

/// Why a render call did nothing (or stopped early)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidHandle,
    SurfaceConfigure,
    SurfaceLock,
    BufferTooSmall,
    UnsupportedFormat,
    FormUnavailable,
    EngineFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Skipped(SkipReason),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered)
    }
}

/// Gray margin when the draw rectangle does not cover the canvas, then the
/// clamped draw rectangle in white
fn fill_background(bitmap: &mut Bitmap<'_>, request: &RenderRequest, config: &Config) {
    let canvas_w = bitmap.width() as i32;
    let canvas_h = bitmap.height() as i32;

    if request.draw_width < canvas_w || request.draw_height < canvas_h {
        bitmap.fill(Color::from_u32(config.render.margin_color));
    }

    let base_w = canvas_w.min(request.draw_width);
    let base_h = canvas_h.min(request.draw_height);
    let base_x = request.start_x.max(0);
    let base_y = request.start_y.max(0);
    bitmap.fill_rect(
        base_x,
        base_y,
        base_w,
        base_h,
        Color::from_u32(config.render.page_color),
    );
}

impl<E: Engine> PdfCore<E> {
    /// Draw a page onto a surface
    ///
    /// Surfaces not in RGBA_8888 are switched to it first.
    pub fn render_page<T>(
        &self,
        page: PageHandle,
        target: &mut T,
        request: &RenderRequest,
    ) -> RenderOutcome
    where
        T: RenderTarget + ?Sized,
    {
        let Some(page_entry) = self.page(page) else {
            tracing::error!("Render page pointers invalid");
            return RenderOutcome::Skipped(SkipReason::InvalidHandle);
        };

        if target.info().format != PixelFormat::Rgba8888 {
            tracing::debug!("Set format to RGBA_8888");
            if let Err(e) = target.set_format(PixelFormat::Rgba8888) {
                tracing::error!("Failed to set buffer geometry: {}", e);
                return RenderOutcome::Skipped(SkipReason::SurfaceConfigure);
            }
        }

        let info = target.info();
        let mut lock = match SurfaceLock::acquire(target) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::error!("Locking native window failed: {}", e);
                return RenderOutcome::Skipped(SkipReason::SurfaceLock);
            }
        };

        let Some(mut bitmap) = Bitmap::new(
            lock.pixels_mut(),
            info.width,
            info.height,
            info.stride,
            ChannelOrder::Rgba,
        ) else {
            tracing::error!("Surface buffer smaller than {}x{}", info.width, info.height);
            return RenderOutcome::Skipped(SkipReason::BufferTooSmall);
        };

        fill_background(&mut bitmap, request, &self.config);
        match self.engine().render_page(
            &page_entry.native,
            &mut bitmap,
            &request.viewport(),
            request.flags(),
        ) {
            Ok(()) => RenderOutcome::Rendered,
            Err(code) => {
                tracing::error!("Page rasterization failed: {}", code.description());
                RenderOutcome::Skipped(SkipReason::EngineFailure)
            }
        }
    }

    /// Draw a page and its interactive form fields onto an RGBA_8888 or
    /// RGB_565 surface
    ///
    /// The document's form environment is created on first use; page open
    /// actions run once per page handle.
    pub fn render_page_with_forms<T>(
        &mut self,
        doc: DocumentHandle,
        page: PageHandle,
        target: &mut T,
        request: &RenderRequest,
    ) -> RenderOutcome
    where
        T: RenderTarget + ?Sized,
    {
        let engine = self.lifecycle.engine();
        let config = &self.config;
        let entry = match self.documents.get_mut(doc.0) {
            Some(entry) if page.document == doc && entry.pages.contains(page.slot) => entry,
            _ => {
                tracing::error!("Render page pointers invalid");
                return RenderOutcome::Skipped(SkipReason::InvalidHandle);
            }
        };

        let info = target.info();
        if !matches!(info.format, PixelFormat::Rgba8888 | PixelFormat::Rgb565) {
            tracing::error!("Bitmap format must be RGBA_8888 or RGB_565");
            return RenderOutcome::Skipped(SkipReason::UnsupportedFormat);
        }

        let mut lock = match SurfaceLock::acquire(target) {
            Ok(lock) => lock,
            Err(e) => {
                tracing::error!("Locking bitmap failed: {}", e);
                return RenderOutcome::Skipped(SkipReason::SurfaceLock);
            }
        };

        match info.format {
            PixelFormat::Rgb565 => {
                if lock.pixels_mut().len() < info.required_len() {
                    tracing::error!("Bitmap buffer smaller than {}x{}", info.width, info.height);
                    return RenderOutcome::Skipped(SkipReason::BufferTooSmall);
                }
                let row_bytes = info.width as usize * 4;
                let mut rgba = vec![0u8; row_bytes * info.height as usize];
                let Some(mut bitmap) =
                    Bitmap::new(&mut rgba, info.width, info.height, row_bytes, ChannelOrder::Rgba)
                else {
                    return RenderOutcome::Skipped(SkipReason::BufferTooSmall);
                };

                let outcome = draw_with_forms(engine, config, entry, page.slot, &mut bitmap, request);
                if outcome.is_rendered() {
                    bitmap.pack_rgb565(lock.pixels_mut(), info.stride);
                }
                outcome
            }
            _ => {
                let Some(mut bitmap) = Bitmap::new(
                    lock.pixels_mut(),
                    info.width,
                    info.height,
                    info.stride,
                    ChannelOrder::Rgba,
                ) else {
                    tracing::error!("Bitmap buffer smaller than {}x{}", info.width, info.height);
                    return RenderOutcome::Skipped(SkipReason::BufferTooSmall);
                };
                draw_with_forms(engine, config, entry, page.slot, &mut bitmap, request)
            }
        }
    }

    /// Render a whole page at `dpi` into a fresh RGBA image
    pub fn render_to_image(
        &self,
        page: PageHandle,
        dpi: i32,
        render_annotations: bool,
    ) -> Option<image::RgbaImage> {
        let width = self.page_width_pixels(page, dpi)?;
        let height = self.page_height_pixels(page, dpi)?;
        if width <= 0 || height <= 0 {
            tracing::warn!("Page renders to an empty {}x{} image", width, height);
            return None;
        }

        let mut surface = OwnedSurface::new(width as u32, height as u32, PixelFormat::Rgba8888);
        let request =
            RenderRequest::new(dpi, 0, 0, width, height).with_annotations(render_annotations);
        if !self.render_page(page, &mut surface, &request).is_rendered() {
            return None;
        }
        surface.to_rgba_image()
    }
}

/// Content, then form widgets, into a 32-bit bitmap
fn draw_with_forms<E: Engine>(
    engine: &E,
    config: &Config,
    entry: &mut DocumentEntry<E>,
    page_slot: Slot,
    bitmap: &mut Bitmap<'_>,
    request: &RenderRequest,
) -> RenderOutcome {
    let Some(page_entry) = entry.pages.get_mut(page_slot) else {
        return RenderOutcome::Skipped(SkipReason::InvalidHandle);
    };
    let viewport = request.viewport();
    let flags = request.flags();

    fill_background(bitmap, request, config);
    if let Err(code) = engine.render_page(&page_entry.native, bitmap, &viewport, flags) {
        tracing::error!("Page rasterization failed: {}", code.description());
        return RenderOutcome::Skipped(SkipReason::EngineFailure);
    }

    if entry.form.is_none() {
        let callbacks = config.form.callbacks();
        let Some(mut form) = engine.init_form_environment(&entry.native, &callbacks) else {
            tracing::error!("Cannot create form fill environment");
            return RenderOutcome::Skipped(SkipReason::FormUnavailable);
        };
        engine.do_document_actions(&mut form);
        tracing::debug!("Form fill environment created");
        entry.form = Some(form);
    }
    let Some(form) = entry.form.as_mut() else {
        return RenderOutcome::Skipped(SkipReason::FormUnavailable);
    };

    if !page_entry.form_opened {
        engine.on_after_load_page(form, &page_entry.native);
        engine.do_page_open_action(form, &page_entry.native);
        page_entry.form_opened = true;
    }

    let swap = engine.form_channel_order() != bitmap.order();
    if swap {
        bitmap.swap_red_blue();
    }
    let drawn = engine.draw_form_fields(form, &page_entry.native, bitmap, &viewport, flags);
    if swap {
        bitmap.swap_red_blue();
    }

    match drawn {
        Ok(()) => RenderOutcome::Rendered,
        Err(code) => {
            tracing::error!("Form field drawing failed: {}", code.description());
            RenderOutcome::Skipped(SkipReason::EngineFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_background_margin_and_clamp() {
        let config = Config::default();
        let mut data = vec![0u8; 4 * 4 * 4];
        let mut bitmap = Bitmap::new(&mut data, 4, 4, 16, ChannelOrder::Rgba).unwrap();

        let request = RenderRequest::new(72, -1, 1, 2, 2);
        fill_background(&mut bitmap, &request, &config);

        assert_eq!(bitmap.pixel(0, 1), Some(Color::WHITE));
        assert_eq!(bitmap.pixel(1, 2), Some(Color::WHITE));
        assert_eq!(bitmap.pixel(2, 1), Some(Color::GRAY));
        assert_eq!(bitmap.pixel(0, 0), Some(Color::GRAY));
    }

    #[test]
    fn test_fill_background_full_canvas_has_no_margin() {
        let config = Config::default();
        let mut data = vec![0u8; 2 * 2 * 4];
        let mut bitmap = Bitmap::new(&mut data, 2, 2, 8, ChannelOrder::Rgba).unwrap();

        fill_background(&mut bitmap, &RenderRequest::new(72, 0, 0, 10, 10), &config);
        for y in 0..2 {
            for x in 0..2 {
                assert_eq!(bitmap.pixel(x, y), Some(Color::WHITE));
            }
        }
    }
}
