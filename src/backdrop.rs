//! Floor plan backdrop: page 1 of a PDF rasterized off the UI thread.

use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use image::RgbaImage;
use pdfium_render::prelude::*;

use crate::error::{EditorError, Result};
use crate::geometry::Point;

pub struct Backdrop {
    pub name: String,
    pub image: RgbaImage,
    /// Image pixels per canvas unit.
    pub density: f32,
}

impl Backdrop {
    /// Size on the canvas, in canvas units.
    pub fn logical_size(&self) -> Point {
        Point::new(
            self.image.width() as f32 / self.density,
            self.image.height() as f32 / self.density,
        )
    }
}

/// Configured path first, then the platform library next to the executable.
fn pdfium_library(configured: Option<&Path>) -> Option<PathBuf> {
    configured.map(Path::to_path_buf).or_else(|| {
        let mut candidate = std::env::current_exe().ok()?;
        candidate.pop();
        candidate.push(Pdfium::pdfium_platform_library_name());
        candidate.exists().then_some(candidate)
    })
}

/// Largest render factor not exceeding `scale` that keeps both sides of a
/// `page`-sized raster (PDF points) within `max_side` pixels.
pub fn bounded_scale(page: Point, scale: f32, max_side: usize) -> Result<f32> {
    if !(page.x > 0.0 && page.y > 0.0 && page.x.is_finite() && page.y.is_finite()) {
        return Err(EditorError::Pdf(format!(
            "page has no usable size ({} x {} pt)",
            page.x, page.y
        )));
    }
    let limit = max_side as f32;
    let bounded = scale.min(limit / page.x).min(limit / page.y);
    if !(bounded.is_finite() && bounded > 0.0) {
        return Err(EditorError::Pdf(format!("cannot fit page into {max_side} px")));
    }
    if bounded < scale {
        tracing::info!(requested = scale, bounded, max_side, "backdrop render reduced");
    }
    Ok(bounded)
}

/// Fails instead of handing the GPU a texture it cannot hold.
pub fn check_texture_fit(image: &RgbaImage, max_side: usize) -> Result<()> {
    let (width, height) = image.dimensions();
    if width as usize > max_side || height as usize > max_side {
        return Err(EditorError::Pdf(format!(
            "rendered page is {width} x {height} px, larger than the {max_side} px texture limit"
        )));
    }
    Ok(())
}

/// Renders page 1 and returns the raster with its pixels per canvas unit.
pub fn rasterize_first_page(
    bytes: Vec<u8>,
    library: Option<&Path>,
    scale: f32,
    max_side: usize,
) -> Result<(RgbaImage, f32)> {
    let path = pdfium_library(library).ok_or_else(|| {
        EditorError::PdfUnavailable(
            "local PDFium binary not found. Place PDFium next to the app or set SCHEMAPLAN_PDFIUM_LIB"
                .to_string(),
        )
    })?;
    let bindings = Pdfium::bind_to_library(&path)
        .map_err(|err| EditorError::PdfUnavailable(err.to_string()))?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium
        .load_pdf_from_byte_vec(bytes, None)
        .map_err(|err| EditorError::Pdf(format!("load failed: {err}")))?;
    let page = document
        .pages()
        .get(0)
        .map_err(|err| EditorError::Pdf(format!("page read failed: {err}")))?;
    let points = Point::new(page.width().value, page.height().value);
    let factor = bounded_scale(points, scale, max_side)?;
    let limit = i32::try_from(max_side).unwrap_or(i32::MAX);
    let render = page
        .render_with_config(
            &PdfRenderConfig::new()
                .scale_page_by_factor(factor)
                .set_maximum_width(limit)
                .set_maximum_height(limit)
                .render_form_data(true),
        )
        .map_err(|err| EditorError::Pdf(err.to_string()))?;
    let image = render.as_image().to_rgba8();
    check_texture_fit(&image, max_side)?;
    // The renderer may round or cap, so measure what actually came back.
    let density = image.width() as f32 / points.x;
    Ok((image, density))
}

type Job = (u64, Result<Backdrop>);

/// Raster plus its pixels per canvas unit.
type Raster = (RgbaImage, f32);

/// Runs rasterization jobs on worker threads. Only the result of the most
/// recent request is ever handed out; older ones are dropped on arrival.
pub struct BackdropLoader {
    generation: u64,
    busy: bool,
    tx: Sender<Job>,
    rx: Receiver<Job>,
}

impl Default for BackdropLoader {
    fn default() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            generation: 0,
            busy: false,
            tx,
            rx,
        }
    }
}

impl BackdropLoader {
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// `max_side` is the largest texture side the renderer accepts.
    pub fn request_pdf(
        &mut self,
        name: String,
        bytes: Vec<u8>,
        library: Option<PathBuf>,
        scale: f32,
        max_side: usize,
    ) {
        tracing::info!(%name, size = bytes.len(), max_side, "rasterizing backdrop");
        self.request_with(name, move || {
            rasterize_first_page(bytes, library.as_deref(), scale, max_side)
        });
    }

    pub fn request_with<F>(&mut self, name: String, job: F)
    where
        F: FnOnce() -> Result<Raster> + Send + 'static,
    {
        self.generation += 1;
        self.busy = true;
        let generation = self.generation;
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = job().map(|(image, density)| Backdrop {
                name,
                image,
                density,
            });
            // The receiver only goes away with the app.
            let _ = tx.send((generation, result));
        });
    }

    /// Latest finished result, if the newest request has completed.
    pub fn poll(&mut self) -> Option<Result<Backdrop>> {
        let mut latest = None;
        while let Ok((generation, result)) = self.rx.try_recv() {
            if generation == self.generation {
                self.busy = false;
                latest = Some(result);
            } else {
                tracing::debug!(generation, current = self.generation, "discarding stale backdrop");
            }
        }
        latest
    }
}
