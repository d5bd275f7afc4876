use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut, draw_text_mut, text_size, Blend,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::basemap::Basemap;
use crate::catalog::Catalog;
use crate::error::{DirectoryError, Result};
use crate::models::{AccountId, City, MarkerColor, RenderKind};

pub const TITLE: &str = "Cities on map";

const EMBEDDED_FONT: &[u8] = include_bytes!("../data/fonts/DejaVuSans.ttf");

/// Label offset from the marker, in degrees on both axes.
const LABEL_OFFSET_DEG: f64 = 0.5;
const MIN_WIDTH: u32 = 360;
const MARGIN: u32 = 24;
const TITLE_BAND: u32 = 32;
const TRIM_PAD: u32 = 6;
const MARKER_RADIUS: i32 = 4;
const LABEL_SCALE: f32 = 13.0;
const TITLE_SCALE: f32 = 18.0;
const DASH: f32 = 4.0;
const DASH_GAP: f32 = 3.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OCEAN: Rgba<u8> = Rgba([151, 183, 224, 255]);
const LAND: Rgba<u8> = Rgba([239, 239, 219, 255]);
const COASTLINE: Rgba<u8> = Rgba([20, 20, 20, 255]);
const BORDER: Rgba<u8> = Rgba([90, 90, 90, 255]);
const LAKE: Rgba<u8> = Rgba([151, 183, 224, 128]);
const RIVER: Rgba<u8> = Rgba([110, 150, 210, 255]);
const TEXT: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Equirectangular mapping of the whole globe onto a pixel frame.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub x0: f32,
    pub y0: f32,
    pub width: f32,
    pub height: f32,
}

impl Projection {
    pub fn project(&self, longitude: f64, latitude: f64) -> (f32, f32) {
        let x = self.x0 as f64 + (longitude + 180.0) / 360.0 * self.width as f64;
        let y = self.y0 as f64 + (90.0 - latitude) / 180.0 * self.height as f64;
        (x as f32, y as f32)
    }
}

pub struct MapRenderer {
    basemap: Basemap,
    font: Font<'static>,
    width: u32,
}

impl MapRenderer {
    /// `width` is the map frame width in pixels; the frame is always twice as wide as tall.
    pub fn new(basemap: Basemap, font: Font<'static>, width: u32) -> Self {
        Self {
            basemap,
            font,
            width: width.max(MIN_WIDTH),
        }
    }

    /// Renderer over the bundled basemap and font.
    pub fn with_embedded(width: u32) -> Result<Self> {
        Ok(Self::new(Basemap::embedded()?, embedded_font()?, width))
    }

    pub fn projection(&self) -> Projection {
        Projection {
            x0: MARGIN as f32,
            y0: (MARGIN + TITLE_BAND) as f32,
            width: self.width as f32,
            height: (self.width / 2) as f32,
        }
    }

    /// Resolves names through the catalog. Unknown names are skipped.
    pub fn resolve_names<S: AsRef<str>>(catalog: &Catalog, names: &[S]) -> Vec<City> {
        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let city = catalog.get(name).cloned();
                if city.is_none() {
                    warn!("skipping unknown city '{}' while rendering", name);
                }
                city
            })
            .collect()
    }

    pub fn render<W: Write>(&self, cities: &[City], color: MarkerColor, sink: &mut W) -> Result<()> {
        let bytes = self.render_png(cities, color)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(())
    }

    pub fn render_names<S: AsRef<str>, W: Write>(
        &self,
        catalog: &Catalog,
        names: &[S],
        color: MarkerColor,
        sink: &mut W,
    ) -> Result<()> {
        let cities = Self::resolve_names(catalog, names);
        self.render(&cities, color, sink)
    }

    pub fn render_png(&self, cities: &[City], color: MarkerColor) -> Result<Vec<u8>> {
        let img = trim(self.compose(cities, color));

        let mut cursor = Cursor::new(Vec::new());
        let encoder = PngEncoder::new(&mut cursor);
        encoder.write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgba8)?;
        let bytes = cursor.into_inner();

        debug!(
            "rendered {} cities as {}x{} png ({} bytes)",
            cities.len(),
            img.width(),
            img.height(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Writes the map to a fresh file in `dir` named after the request kind, the
    /// account and a per-call id. The file appears atomically once fully written.
    pub fn render_to_file(
        &self,
        cities: &[City],
        color: MarkerColor,
        dir: &Path,
        account_id: AccountId,
        kind: RenderKind,
    ) -> Result<PathBuf> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }

        let bytes = self.render_png(cities, color)?;
        let path = dir.join(format!(
            "map_{}_{}_{}.png",
            kind,
            account_id,
            Uuid::new_v4().simple()
        ));

        let mut tmp = tempfile::Builder::new()
            .prefix(".map-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| DirectoryError::Io(e.error))?;

        debug!("map for account {} written to {}", account_id, path.display());
        Ok(path)
    }

    fn compose(&self, cities: &[City], color: MarkerColor) -> RgbaImage {
        let proj = self.projection();
        let canvas_w = self.width + 2 * MARGIN;
        let canvas_h = self.width / 2 + 2 * MARGIN + TITLE_BAND;
        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, BACKGROUND);
        let frame = Rect::at(proj.x0 as i32, proj.y0 as i32).of_size(self.width, self.width / 2);

        draw_filled_rect_mut(&mut canvas, frame, OCEAN);

        for ring in &self.basemap.land {
            if let Some(points) = pixel_polygon(&proj, ring) {
                draw_polygon_mut(&mut canvas, &points, LAND);
            }
        }
        for ring in &self.basemap.land {
            draw_polyline(&mut canvas, &proj, ring, true, COASTLINE);
        }
        for line in &self.basemap.borders {
            draw_dashed_polyline(&mut canvas, &proj, line, BORDER);
        }

        let mut blended = Blend(canvas);
        for ring in &self.basemap.lakes {
            if let Some(points) = pixel_polygon(&proj, ring) {
                draw_polygon_mut(&mut blended, &points, LAKE);
            }
        }
        let mut canvas = blended.0;

        for line in &self.basemap.rivers {
            draw_polyline(&mut canvas, &proj, line, false, RIVER);
        }
        draw_hollow_rect_mut(&mut canvas, frame, COASTLINE);

        let font = &self.font;
        let title_scale = Scale::uniform(TITLE_SCALE);
        let (title_w, _) = text_size(title_scale, font, TITLE);
        let title_x = (canvas_w as i32 - title_w) / 2;
        draw_text_mut(&mut canvas, TEXT, title_x, MARGIN as i32, title_scale, font, TITLE);

        let fill = Rgba(color.rgba());
        let outline = Rgba(color.outline_rgba());
        let label_scale = Scale::uniform(LABEL_SCALE);
        for city in cities {
            if !on_globe(city) {
                warn!(
                    "skipping {} with coordinates ({}, {}) outside the globe",
                    city.name, city.latitude, city.longitude
                );
                continue;
            }

            let (x, y) = proj.project(city.longitude, city.latitude);
            let center = (x.round() as i32, y.round() as i32);
            draw_filled_circle_mut(&mut canvas, center, MARKER_RADIUS + 1, outline);
            draw_filled_circle_mut(&mut canvas, center, MARKER_RADIUS, fill);

            let (lx, ly) = proj.project(
                city.longitude + LABEL_OFFSET_DEG,
                city.latitude + LABEL_OFFSET_DEG,
            );
            // The anchor is the text's bottom-left corner.
            let (_, text_h) = text_size(label_scale, font, &city.name);
            draw_text_mut(
                &mut canvas,
                TEXT,
                lx.round() as i32,
                ly.round() as i32 - text_h,
                label_scale,
                font,
                &city.name,
            );
        }

        canvas
    }
}

pub fn embedded_font() -> Result<Font<'static>> {
    Font::try_from_bytes(EMBEDDED_FONT)
        .ok_or_else(|| DirectoryError::Font("bundled DejaVu Sans".to_string()))
}

/// Loads a TrueType font from disk, used in place of the bundled one.
pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let bytes = fs::read(path)?;
    Font::try_from_vec(bytes).ok_or_else(|| DirectoryError::Font(path.display().to_string()))
}

fn on_globe(city: &City) -> bool {
    (-90.0..=90.0).contains(&city.latitude) && (-180.0..=180.0).contains(&city.longitude)
}

/// Projects a ring to integer pixels, dropping points that collapse onto their
/// neighbour. `None` when fewer than three distinct points remain.
fn pixel_polygon(proj: &Projection, ring: &[(f64, f64)]) -> Option<Vec<Point<i32>>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(ring.len());
    for &(lon, lat) in ring {
        let (x, y) = proj.project(lon, lat);
        let p = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    Some(points)
}

fn draw_polyline(
    canvas: &mut RgbaImage,
    proj: &Projection,
    path: &[(f64, f64)],
    closed: bool,
    color: Rgba<u8>,
) {
    let projected: Vec<(f32, f32)> = path.iter().map(|&(lon, lat)| proj.project(lon, lat)).collect();
    for pair in projected.windows(2) {
        draw_line_segment_mut(canvas, pair[0], pair[1], color);
    }
    if closed && projected.len() > 2 {
        if let (Some(&last), Some(&first)) = (projected.last(), projected.first()) {
            draw_line_segment_mut(canvas, last, first, color);
        }
    }
}

fn draw_dashed_polyline(canvas: &mut RgbaImage, proj: &Projection, path: &[(f64, f64)], color: Rgba<u8>) {
    let projected: Vec<(f32, f32)> = path.iter().map(|&(lon, lat)| proj.project(lon, lat)).collect();
    // Dash phase carries across vertices so the pattern stays even.
    let mut phase = 0.0f32;
    for pair in projected.windows(2) {
        let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
        let length = ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt();
        if length == 0.0 {
            continue;
        }
        let mut t = 0.0f32;
        while t < length {
            let period_pos = (phase + t) % (DASH + DASH_GAP);
            if period_pos < DASH {
                let run = (DASH - period_pos).min(length - t);
                let start = (x1 + (x2 - x1) * t / length, y1 + (y2 - y1) * t / length);
                let end_t = t + run;
                let end = (x1 + (x2 - x1) * end_t / length, y1 + (y2 - y1) * end_t / length);
                draw_line_segment_mut(canvas, start, end, color);
                t = end_t;
            } else {
                t += (DASH + DASH_GAP - period_pos).min(length - t);
            }
        }
        phase = (phase + length) % (DASH + DASH_GAP);
    }
}

/// Crops to the bounding box of everything that is not background, plus a small pad.
fn trim(img: RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in img.enumerate_pixels() {
        if *pixel == BACKGROUND {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }

    let Some((min_x, min_y, max_x, max_y)) = bounds else {
        return img;
    };
    let left = min_x.saturating_sub(TRIM_PAD);
    let top = min_y.saturating_sub(TRIM_PAD);
    let right = (max_x + TRIM_PAD).min(width - 1);
    let bottom = (max_y + TRIM_PAD).min(height - 1);
    image::imageops::crop_imm(&img, left, top, right - left + 1, bottom - top + 1).to_image()
}
