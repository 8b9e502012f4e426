//! Software map surface used when no interactive map is available.
//!
//! Draws a styled background with a geographic grid, the route trail, a
//! position marker and an optional progress bar, all in Web-Mercator space
//! around the camera center. Bearing rotates the view so the heading points
//! up; pitch foreshortens the vertical axis. Ending slides are composited on
//! top with the `image` crate.
//!
//! [`HeadlessMap`] is both the [`MapSurface`] and the [`FrameCapture`]:
//! clones share one scene, so the orchestrator can own one handle as the
//! surface and another as the capture.

use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use flyover_common::{FlyoverError, FlyoverResult};
use flyover_route_model::{CameraPose, GeoPoint, OverlayToggles, RenderConfig, RouteBounds};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

use crate::collaborators::{FrameCapture, MapSurface, PixelBuffer};
use crate::slideshow::SlideFrame;

/// World size in pixels at zoom 0.
pub const TILE_SIZE: f64 = 512.0;

/// Latitude limit of the Web-Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

/// Zoom used when the route collapses to a single point.
const SINGLE_POINT_ZOOM: f64 = 16.0;
const MAX_OVERVIEW_ZOOM: f64 = 20.0;

/// Fraction of the frame the slide foreground may cover.
const SLIDE_FIT: f64 = 0.9;
const SLIDE_BLUR_SIGMA: f32 = 24.0;

/// Project onto the Web-Mercator plane at `zoom`, in world pixels.
pub fn project(point: &GeoPoint, zoom: f64) -> (f64, f64) {
    let world = TILE_SIZE * 2f64.powf(zoom);
    let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (point.lng + 180.0) / 360.0 * world;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * world;
    (x, y)
}

/// Inverse of [`project`].
pub fn unproject(x: f64, y: f64, zoom: f64) -> GeoPoint {
    let world = TILE_SIZE * 2f64.powf(zoom);
    let lng = x / world * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / world)).sinh().atan().to_degrees();
    GeoPoint::new(lat, lng)
}

/// Background palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStyle {
    Outdoors,
    Streets,
    Dark,
    Satellite,
}

impl MapStyle {
    /// Resolve a style name. Accepts bare names and style URLs that
    /// contain one; unknown names fall back to `Outdoors`.
    pub fn parse(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("satellite") {
            Self::Satellite
        } else if name.contains("dark") || name.contains("night") {
            Self::Dark
        } else if name.contains("streets") || name.contains("light") {
            Self::Streets
        } else {
            Self::Outdoors
        }
    }

    fn background(self) -> [u8; 4] {
        match self {
            Self::Outdoors => [232, 236, 220, 255],
            Self::Streets => [242, 240, 236, 255],
            Self::Dark => [30, 33, 40, 255],
            Self::Satellite => [52, 66, 48, 255],
        }
    }

    fn grid(self) -> [u8; 4] {
        match self {
            Self::Outdoors => [205, 214, 190, 255],
            Self::Streets => [222, 219, 212, 255],
            Self::Dark => [48, 53, 64, 255],
            Self::Satellite => [70, 86, 62, 255],
        }
    }
}

/// Screen mapping for one camera pose.
#[derive(Debug, Clone, Copy)]
struct Viewport {
    width: f64,
    height: f64,
    center_x: f64,
    center_y: f64,
    zoom: f64,
    cos_b: f64,
    sin_b: f64,
    tilt: f64,
    scale: f64,
}

impl Viewport {
    fn new(pose: &CameraPose, width: u32, height: u32, scale: f64) -> Self {
        let (center_x, center_y) = project(&pose.center, pose.zoom);
        let bearing = pose.bearing_deg.to_radians();
        Self {
            width: width as f64,
            height: height as f64,
            center_x,
            center_y,
            zoom: pose.zoom,
            cos_b: bearing.cos(),
            sin_b: bearing.sin(),
            tilt: pose.pitch_deg.to_radians().cos().max(0.1),
            scale,
        }
    }

    fn to_screen(&self, point: &GeoPoint) -> (f64, f64) {
        let (x, y) = project(point, self.zoom);
        let dx = x - self.center_x;
        let dy = y - self.center_y;
        let rx = dx * self.cos_b + dy * self.sin_b;
        let ry = (-dx * self.sin_b + dy * self.cos_b) * self.tilt;
        (
            self.width / 2.0 + rx * self.scale,
            self.height / 2.0 + ry * self.scale,
        )
    }

    fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let rx = (sx - self.width / 2.0) / self.scale;
        let ry = (sy - self.height / 2.0) / self.scale / self.tilt;
        (
            self.center_x + rx * self.cos_b - ry * self.sin_b,
            self.center_y + rx * self.sin_b + ry * self.cos_b,
        )
    }
}

/// A decoded ending image plus its blurred backdrop for the last frame size.
struct SlideAssets {
    path: PathBuf,
    decoded: DynamicImage,
    image: RgbaImage,
    background: Option<((u32, u32), RgbaImage)>,
}

struct Scene {
    width: u32,
    height: u32,
    style: MapStyle,
    route_rgba: [u8; 4],
    route_width: f64,
    overlays: OverlayToggles,
    camera: Option<CameraPose>,
    trail: Vec<GeoPoint>,
    slide: Option<SlideFrame>,
    slide_assets: Option<SlideAssets>,
}

/// Shared software map surface and frame capture.
#[derive(Clone)]
pub struct HeadlessMap {
    scene: Arc<Mutex<Scene>>,
}

impl HeadlessMap {
    pub fn new(config: &RenderConfig) -> Self {
        let scene = Scene {
            width: config.width,
            height: config.height,
            style: MapStyle::parse(&config.map_style),
            route_rgba: config.route_rgba().unwrap_or([252, 76, 2, 255]),
            route_width: config.route_width.max(1.0),
            overlays: config.overlays,
            camera: None,
            trail: Vec::new(),
            slide: None,
            slide_assets: None,
        };
        Self {
            scene: Arc::new(Mutex::new(scene)),
        }
    }

    fn lock(&self) -> FlyoverResult<MutexGuard<'_, Scene>> {
        self.scene
            .lock()
            .map_err(|_| FlyoverError::map_surface("map scene lock poisoned"))
    }

    /// Draw the current scene at `pixel_scale` times the configured size.
    pub fn render(&self, pixel_scale: f64) -> FlyoverResult<RgbaImage> {
        let mut scene = self.lock()?;
        let scale = if pixel_scale.is_finite() && pixel_scale > 0.0 {
            pixel_scale
        } else {
            1.0
        };
        let width = scaled_even(scene.width, scale);
        let height = scaled_even(scene.height, scale);

        let pose = scene.camera.unwrap_or_else(|| {
            let center = scene
                .trail
                .first()
                .copied()
                .unwrap_or_else(|| GeoPoint::new(0.0, 0.0));
            CameraPose::overhead(center, 1.0)
        });
        let viewport = Viewport::new(&pose, width, height, scale);

        let mut frame = RgbaImage::from_pixel(width, height, Rgba(scene.style.background()));
        draw_grid(&mut frame, &viewport, scene.style.grid());

        if scene.trail.len() > 1 {
            let radius = scene.route_width * scale / 2.0;
            draw_polyline(&mut frame, &viewport, &scene.trail, radius, scene.route_rgba);
        }
        if scene.overlays.position_marker {
            let (x, y) = viewport.to_screen(&pose.center);
            let r = scene.route_width * scale;
            fill_disc(&mut frame, x, y, r * 1.8, [255, 255, 255, 255]);
            fill_disc(&mut frame, x, y, r * 1.2, scene.route_rgba);
        }
        if scene.overlays.progress_bar {
            draw_progress_bar(&mut frame, pose.progress, scale, scene.route_rgba);
        }

        if let Some(slide) = scene.slide.clone() {
            let assets = scene
                .slide_assets
                .as_mut()
                .filter(|a| a.path == slide.path)
                .ok_or_else(|| FlyoverError::map_surface("slide shown without its image"))?;
            compose_slide(&mut frame, assets, &slide);
        }

        Ok(frame)
    }
}

fn scaled_even(size: u32, scale: f64) -> u32 {
    let scaled = (size as f64 * scale).round().max(2.0) as u32;
    scaled & !1
}

impl MapSurface for HeadlessMap {
    fn set_camera(&mut self, pose: &CameraPose) -> FlyoverResult<()> {
        self.lock()?.camera = Some(*pose);
        Ok(())
    }

    fn set_route_trail(&mut self, points: &[GeoPoint]) -> FlyoverResult<()> {
        let mut scene = self.lock()?;
        scene.trail.clear();
        scene.trail.extend_from_slice(points);
        Ok(())
    }

    fn compute_overview_pose(
        &self,
        bounds: &RouteBounds,
        padding: f64,
    ) -> FlyoverResult<CameraPose> {
        let scene = self.lock()?;
        let padding = if padding.is_finite() {
            padding.clamp(0.0, 0.45)
        } else {
            0.0
        };
        let usable_w = scene.width as f64 * (1.0 - 2.0 * padding);
        let usable_h = scene.height as f64 * (1.0 - 2.0 * padding);

        let north_west = GeoPoint::new(bounds.max_lat, bounds.min_lng);
        let south_east = GeoPoint::new(bounds.min_lat, bounds.max_lng);
        let (x0, y0) = project(&north_west, 0.0);
        let (x1, y1) = project(&south_east, 0.0);
        let span_x = (x1 - x0).abs();
        let span_y = (y1 - y0).abs();

        let fit = |usable: f64, span: f64| {
            if span > f64::EPSILON {
                (usable / span).log2()
            } else {
                f64::INFINITY
            }
        };
        let zoom = fit(usable_w, span_x).min(fit(usable_h, span_y));
        let zoom = if zoom.is_finite() {
            zoom.clamp(0.0, MAX_OVERVIEW_ZOOM)
        } else {
            SINGLE_POINT_ZOOM
        };

        let center = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, 0.0);
        tracing::debug!(zoom, lat = center.lat, lng = center.lng, "Overview pose");
        Ok(CameraPose::overhead(center, zoom))
    }

    fn show_slide(&mut self, slide: &SlideFrame) -> FlyoverResult<()> {
        let mut scene = self.lock()?;
        let loaded = scene
            .slide_assets
            .as_ref()
            .is_some_and(|a| a.path == slide.path);
        if !loaded {
            scene.slide = None;
            scene.slide_assets = Some(load_slide(&slide.path)?);
        }
        scene.slide = Some(slide.clone());
        Ok(())
    }

    fn clear_slide(&mut self) -> FlyoverResult<()> {
        let mut scene = self.lock()?;
        scene.slide = None;
        scene.slide_assets = None;
        Ok(())
    }
}

impl FrameCapture for HeadlessMap {
    fn capture(&mut self, pixel_scale: f64) -> Option<PixelBuffer> {
        match self.render(pixel_scale) {
            Ok(frame) => Some(PixelBuffer::from_image(frame)),
            Err(err) => {
                tracing::warn!(error = %err, "Headless capture failed");
                None
            }
        }
    }
}

fn draw_grid(frame: &mut RgbaImage, viewport: &Viewport, color: [u8; 4]) {
    // Lines stay anchored to the map; spacing doubles with each zoom level
    // and restarts at integer zooms, where every old line is kept.
    let step = 128.0 * 2f64.powf(viewport.zoom.fract());
    let line = 1.0 / viewport.scale;
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
        let (wx, wy) = viewport.to_world(x as f64 + 0.5, y as f64 + 0.5);
        if wx.rem_euclid(step) < line || wy.rem_euclid(step) < line {
            *pixel = Rgba(color);
        }
    }
}

fn draw_polyline(
    frame: &mut RgbaImage,
    viewport: &Viewport,
    points: &[GeoPoint],
    radius: f64,
    color: [u8; 4],
) {
    let (width, height) = frame.dimensions();
    let mut mask = vec![false; width as usize * height as usize];
    let screen: Vec<(f64, f64)> = points.iter().map(|p| viewport.to_screen(p)).collect();
    let margin = radius + 1.0;
    let step = (radius * 0.5).max(0.5);

    for pair in screen.windows(2) {
        let (ax, ay) = pair[0];
        let (bx, by) = pair[1];
        let off_screen = (ax < -margin && bx < -margin)
            || (ay < -margin && by < -margin)
            || (ax > width as f64 + margin && bx > width as f64 + margin)
            || (ay > height as f64 + margin && by > height as f64 + margin);
        if off_screen {
            continue;
        }
        let length = (bx - ax).hypot(by - ay);
        let stamps = (length / step).ceil().max(1.0) as usize;
        for i in 0..=stamps {
            let t = i as f64 / stamps as f64;
            mark_disc(
                &mut mask,
                width,
                height,
                ax + (bx - ax) * t,
                ay + (by - ay) * t,
                radius,
            );
        }
    }

    for (pixel, marked) in frame.pixels_mut().zip(mask) {
        if marked {
            blend(pixel, color);
        }
    }
}

/// Pixel bounds of a disc, or `None` when it misses the frame.
fn disc_span(width: u32, height: u32, cx: f64, cy: f64, r: f64) -> Option<(u32, u32, u32, u32)> {
    if width == 0 || height == 0 || !(r > 0.0) {
        return None;
    }
    if cx + r < 0.0 || cy + r < 0.0 || cx - r >= width as f64 || cy - r >= height as f64 {
        return None;
    }
    let x0 = (cx - r).floor().max(0.0) as u32;
    let y0 = (cy - r).floor().max(0.0) as u32;
    let x1 = ((cx + r).ceil() as u32).min(width - 1);
    let y1 = ((cy + r).ceil() as u32).min(height - 1);
    Some((x0, y0, x1, y1))
}

fn mark_disc(mask: &mut [bool], width: u32, height: u32, cx: f64, cy: f64, r: f64) {
    let Some((x0, y0, x1, y1)) = disc_span(width, height, cx, cy, r) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                mask[y as usize * width as usize + x as usize] = true;
            }
        }
    }
}

fn fill_disc(frame: &mut RgbaImage, cx: f64, cy: f64, r: f64, color: [u8; 4]) {
    let (width, height) = frame.dimensions();
    let Some((x0, y0, x1, y1)) = disc_span(width, height, cx, cy, r) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r * r {
                blend(frame.get_pixel_mut(x, y), color);
            }
        }
    }
}

fn draw_progress_bar(frame: &mut RgbaImage, progress: f64, scale: f64, color: [u8; 4]) {
    let (width, height) = frame.dimensions();
    let bar_height = ((8.0 * scale).round() as u32).clamp(1, height);
    let filled = (width as f64 * progress.clamp(0.0, 1.0)).round() as u32;
    for y in height - bar_height..height {
        for x in 0..width {
            let pixel = frame.get_pixel_mut(x, y);
            if x < filled {
                blend(pixel, color);
            } else {
                blend(pixel, [0, 0, 0, 96]);
            }
        }
    }
}

fn blend(pixel: &mut Rgba<u8>, color: [u8; 4]) {
    let alpha = color[3] as u32;
    for c in 0..3 {
        pixel[c] = ((color[c] as u32 * alpha + pixel[c] as u32 * (255 - alpha)) / 255) as u8;
    }
    pixel[3] = 255;
}

fn load_slide(path: &std::path::Path) -> FlyoverResult<SlideAssets> {
    let decoded = image::open(path).map_err(|e| {
        FlyoverError::map_surface(format!(
            "Failed to load ending image {}: {e}",
            path.display()
        ))
    })?;
    tracing::debug!(
        path = %path.display(),
        width = decoded.width(),
        height = decoded.height(),
        "Loaded ending image"
    );
    Ok(SlideAssets {
        path: path.to_path_buf(),
        image: decoded.to_rgba8(),
        decoded,
        background: None,
    })
}

/// Blurred, darkened fill of the whole frame, rebuilt when the size changes.
fn slide_background(assets: &mut SlideAssets, size: (u32, u32)) -> &RgbaImage {
    if assets.background.as_ref().is_some_and(|(built, _)| *built != size) {
        assets.background = None;
    }
    let decoded = &assets.decoded;
    let (_, background) = assets.background.get_or_insert_with(|| {
        let mut background = decoded
            .resize_to_fill(size.0, size.1, FilterType::Triangle)
            .blur(SLIDE_BLUR_SIGMA)
            .to_rgba8();
        for pixel in background.pixels_mut() {
            blend(pixel, [0, 0, 0, 110]);
        }
        (size, background)
    });
    background
}

fn compose_slide(frame: &mut RgbaImage, assets: &mut SlideAssets, slide: &SlideFrame) {
    let (width, height) = frame.dimensions();
    let background = slide_background(assets, (width, height));
    overlay_with_opacity(frame, background, 0, 0, slide.opacity);

    let (iw, ih) = assets.image.dimensions();
    if iw == 0 || ih == 0 {
        return;
    }
    let max_w = width as f64 * SLIDE_FIT * slide.scale;
    let max_h = height as f64 * SLIDE_FIT * slide.scale;
    let fit = (max_w / iw as f64).min(max_h / ih as f64);
    let fw = ((iw as f64 * fit).round() as u32).max(1);
    let fh = ((ih as f64 * fit).round() as u32).max(1);
    let foreground = imageops::resize(&assets.image, fw, fh, FilterType::Triangle);

    let x = (width as i64 - fw as i64) / 2;
    let y = (height as i64 - fh as i64) / 2;
    overlay_with_opacity(frame, &foreground, x, y, slide.opacity);
}

fn overlay_with_opacity(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, opacity: f64) {
    if !(opacity > 0.0) {
        return;
    }
    if opacity >= 1.0 {
        imageops::overlay(base, top, x, y);
        return;
    }
    let mut faded = top.clone();
    for pixel in faded.pixels_mut() {
        pixel[3] = (pixel[3] as f64 * opacity).round() as u8;
    }
    imageops::overlay(base, &faded, x, y);
}
