use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gtk4::gdk::prelude::GdkCairoContextExt;
use gtk4::gdk_pixbuf::{Pixbuf, PixbufLoader};
use gtk4::prelude::*;
use gtk4::DrawingArea;

use crate::geometry::{OverlayBox, SurfaceBounds};

const PREVIEW_WIDTH: i32 = 640;
const PREVIEW_HEIGHT: i32 = 360;
const LOADING_ALPHA: f64 = 0.5;
const OVERLAY_FILL: (f64, f64, f64, f64) = (0.0, 0.48, 1.0, 0.18);
const OVERLAY_STROKE: (f64, f64, f64) = (0.0, 0.48, 1.0);

/// Preview surface: thumbnail or frame with the crop box on top.
#[derive(Clone)]
pub(super) struct PreviewCanvas {
    pub(super) area: DrawingArea,
    pixbuf: Rc<RefCell<Option<Pixbuf>>>,
    overlay: Rc<Cell<OverlayBox>>,
    loading: Rc<Cell<bool>>,
}

impl PreviewCanvas {
    pub(super) fn build(overlay: OverlayBox) -> Self {
        let area = DrawingArea::new();
        area.set_content_width(PREVIEW_WIDTH);
        area.set_content_height(PREVIEW_HEIGHT);
        area.set_hexpand(true);
        area.set_vexpand(true);

        let canvas = Self {
            area,
            pixbuf: Rc::new(RefCell::new(None)),
            overlay: Rc::new(Cell::new(overlay)),
            loading: Rc::new(Cell::new(false)),
        };

        let pixbuf = canvas.pixbuf.clone();
        let overlay = canvas.overlay.clone();
        let loading = canvas.loading.clone();
        canvas.area.set_draw_func(move |_, context, width, height| {
            if width <= 0 || height <= 0 {
                return;
            }
            let bounds = SurfaceBounds::new(f64::from(width), f64::from(height));

            context.set_source_rgb(0.12, 0.12, 0.14);
            context.paint().ok();

            if let Some(pixbuf) = pixbuf.borrow().as_ref() {
                let scale_x = bounds.width / f64::from(pixbuf.width().max(1));
                let scale_y = bounds.height / f64::from(pixbuf.height().max(1));
                context.save().ok();
                context.scale(scale_x, scale_y);
                context.set_source_pixbuf(pixbuf, 0.0, 0.0);
                if loading.get() {
                    context.paint_with_alpha(LOADING_ALPHA).ok();
                } else {
                    context.paint().ok();
                }
                context.restore().ok();
            }

            let (x, y, w, h) = overlay.get().to_pixels(bounds);
            let (r, g, b, a) = OVERLAY_FILL;
            context.rectangle(x, y, w, h);
            context.set_source_rgba(r, g, b, a);
            context.fill_preserve().ok();
            let (r, g, b) = OVERLAY_STROKE;
            context.set_source_rgb(r, g, b);
            context.set_line_width(2.0);
            context.stroke().ok();
        });

        canvas
    }

    pub(super) fn bounds(&self) -> SurfaceBounds {
        SurfaceBounds::new(f64::from(self.area.width()), f64::from(self.area.height()))
    }

    pub(super) fn set_overlay(&self, overlay: OverlayBox) {
        self.overlay.set(overlay);
        self.area.queue_draw();
    }

    pub(super) fn set_loading(&self, loading: bool) {
        if self.loading.replace(loading) != loading {
            self.area.queue_draw();
        }
    }

    pub(super) fn set_pixbuf(&self, pixbuf: Option<Pixbuf>) {
        *self.pixbuf.borrow_mut() = pixbuf;
        self.area.queue_draw();
    }

    /// Decodes encoded image bytes and shows them; undecodable data keeps the current image.
    pub(super) fn show_image_bytes(&self, bytes: &[u8]) {
        match pixbuf_from_bytes(bytes) {
            Ok(pixbuf) => self.set_pixbuf(Some(pixbuf)),
            Err(err) => tracing::warn!(%err, "failed to decode preview image"),
        }
    }
}

fn pixbuf_from_bytes(bytes: &[u8]) -> Result<Pixbuf, gtk4::glib::Error> {
    let loader = PixbufLoader::new();
    loader.write(bytes)?;
    loader.close()?;
    loader.pixbuf().ok_or_else(|| {
        gtk4::glib::Error::new(
            gtk4::gdk_pixbuf::PixbufError::CorruptImage,
            "loader produced no image",
        )
    })
}
