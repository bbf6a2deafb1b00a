//! Mapping between user space and device space.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pan and zoom of the canvas.
///
/// `pan` is the user-space point shown at the centre of the device. Device
/// y grows downwards while user y grows upwards, so the transform flips the
/// y axis. It is always a similarity: no shear, zoom strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTransform")]
pub struct CoordinateTransform {
    /// User-space point at the device centre
    pub pan: Point,
    /// Device pixels per user unit
    zoom: f64,
    /// Device size in pixels
    size: Size,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
            size: Size::ZERO,
            min_zoom: 0.1,
            max_zoom: 100.0,
        }
    }
}

/// Rejected stored transform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("invalid zoom limits {0}..{1}")]
    Limits(f64, f64),
    #[error("zoom {0} outside {1}..{2}")]
    Zoom(f64, f64, f64),
}

/// Wire form of [`CoordinateTransform`], checked before it becomes one.
#[derive(Deserialize)]
struct StoredTransform {
    pan: Point,
    zoom: f64,
    size: Size,
    min_zoom: f64,
    max_zoom: f64,
}

impl TryFrom<StoredTransform> for CoordinateTransform {
    type Error = TransformError;

    fn try_from(raw: StoredTransform) -> Result<Self, Self::Error> {
        let StoredTransform { pan, zoom, size, min_zoom, max_zoom } = raw;
        if !(min_zoom > 0.0 && min_zoom <= max_zoom) {
            return Err(TransformError::Limits(min_zoom, max_zoom));
        }
        if !(zoom >= min_zoom && zoom <= max_zoom) {
            return Err(TransformError::Zoom(zoom, min_zoom, max_zoom));
        }
        Ok(Self { pan, zoom, size, min_zoom, max_zoom })
    }
}

impl CoordinateTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped into the allowed range. Non-finite or
    /// non-positive values are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
            if self.zoom != zoom {
                log::warn!("zoom {zoom} clamped to {}", self.zoom);
            }
        } else {
            log::debug!("ignoring invalid zoom {zoom}");
        }
    }

    /// Change the zoom limits. The current zoom is clamped into them.
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        if !(min_zoom > 0.0 && min_zoom <= max_zoom) {
            log::debug!("ignoring invalid zoom limits {min_zoom}..{max_zoom}");
            return;
        }
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Set the device size. Returns `true` if it changed.
    pub fn set_size(&mut self, size: Size) -> bool {
        if self.size == size {
            return false;
        }
        self.size = size;
        true
    }

    pub fn center(&self) -> Point {
        Point::new(0.5 * self.size.width, 0.5 * self.size.height)
    }

    /// Convert a device point to user coordinates.
    pub fn dev_to_user(&self, p: Point) -> Point {
        let c = self.center();
        Point::new(
            (p.x - c.x) / self.zoom + self.pan.x,
            -(p.y - c.y) / self.zoom + self.pan.y,
        )
    }

    /// Convert a user point to device coordinates.
    pub fn user_to_dev(&self, v: Point) -> Point {
        let c = self.center();
        Point::new(
            c.x + (v.x - self.pan.x) * self.zoom,
            c.y - (v.y - self.pan.y) * self.zoom,
        )
    }

    /// The user-to-device matrix.
    pub fn canvas_transform(&self) -> Affine {
        Affine::translate(self.center().to_vec2())
            * Affine::scale_non_uniform(self.zoom, -self.zoom)
            * Affine::translate(-self.pan.to_vec2())
    }

    /// The device rectangle in user coordinates.
    pub fn visible_rect(&self) -> Rect {
        Rect::from_points(
            self.dev_to_user(Point::ZERO),
            self.dev_to_user(Point::new(self.size.width, self.size.height)),
        )
    }

    /// Zoom by `factor`, keeping the user point under `device_point` fixed.
    pub fn zoom_at(&mut self, device_point: Point, factor: f64) {
        let anchor = self.dev_to_user(device_point);
        let old_zoom = self.zoom;
        self.set_zoom(self.zoom * factor);
        if (self.zoom - old_zoom).abs() < f64::EPSILON {
            return;
        }
        let drift = self.dev_to_user(device_point) - anchor;
        self.pan -= drift;
    }

    /// Centre `rect` and choose the largest zoom that shows it with
    /// `padding` pixels to spare on every side.
    pub fn fit_to_rect(&mut self, rect: Rect, padding: f64) {
        if rect.is_zero_area() || self.size.is_zero_area() {
            self.pan = rect.center();
            return;
        }
        let avail = Size::new(
            (self.size.width - 2.0 * padding).max(1.0),
            (self.size.height - 2.0 * padding).max(1.0),
        );
        let zoom = (avail.width / rect.width()).min(avail.height / rect.height());
        self.set_zoom(zoom);
        self.pan = rect.center();
    }

    /// Back to unit zoom centred on the user origin.
    pub fn reset(&mut self) {
        self.pan = Point::ZERO;
        self.set_zoom(1.0);
    }

    /// Move the view by a device-space delta.
    pub fn pan_by_device(&mut self, delta: Vec2) {
        self.pan += Vec2::new(-delta.x / self.zoom, delta.y / self.zoom);
    }
}
