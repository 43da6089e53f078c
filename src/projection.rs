//! Projection adapter
//!
//! Turns marker geo-coordinates into anchor points on the layout plane.
//! Markers the projection cannot represent are dropped silently.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::{CanvasConfig, ProjectionKind};
use crate::data::{MarkerId, MarkerRecord, Point};

/// Mercator is undefined at the poles; clip like web maps do
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Geographic projection onto the layout plane
pub trait Projector {
    /// `None` when the coordinate lies outside the projection's domain
    fn project(&self, lon: f64, lat: f64) -> Option<Point>;
}

/// Geographic bounding box a projection is fitted to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Default for Extent {
    fn default() -> Self {
        Self {
            west: -180.0,
            south: -60.0,
            east: 180.0,
            north: 75.0,
        }
    }
}

/// Uniform scale + translation mapping raw projected units onto the canvas
#[derive(Debug, Clone, Copy)]
struct Fit {
    scale: f64,
    tx: f64,
    ty: f64,
}

impl Fit {
    fn new(min: Point, max: Point, width: f64, height: f64) -> Self {
        let dx = (max.x - min.x).abs().max(f64::EPSILON);
        let dy = (max.y - min.y).abs().max(f64::EPSILON);
        let scale = (width / dx).min(height / dy);
        // Center the extent on the canvas
        let tx = (width - dx * scale) / 2.0 - min.x * scale;
        let ty = (height - dy * scale) / 2.0 - min.y * scale;
        Self { scale, tx, ty }
    }

    fn apply(&self, raw: Point) -> Point {
        Point::new(raw.x * self.scale + self.tx, raw.y * self.scale + self.ty)
    }
}

/// Plate carrée: longitude and latitude map linearly
#[derive(Debug, Clone, Copy)]
pub struct Equirectangular {
    fit: Fit,
}

impl Equirectangular {
    pub fn fitted(extent: Extent, width: f64, height: f64) -> Self {
        let min = Point::new(extent.west, -extent.north);
        let max = Point::new(extent.east, -extent.south);
        Self {
            fit: Fit::new(min, max, width, height),
        }
    }
}

impl Projector for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> Option<Point> {
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0 {
            return None;
        }
        Some(self.fit.apply(Point::new(lon, -lat)))
    }
}

/// Spherical Mercator
#[derive(Debug, Clone, Copy)]
pub struct Mercator {
    fit: Fit,
}

impl Mercator {
    pub fn fitted(extent: Extent, width: f64, height: f64) -> Self {
        let north = extent.north.min(MERCATOR_MAX_LAT);
        let south = extent.south.max(-MERCATOR_MAX_LAT);
        let min = Point::new(extent.west.to_radians(), -mercator_y(north));
        let max = Point::new(extent.east.to_radians(), -mercator_y(south));
        Self {
            fit: Fit::new(min, max, width, height),
        }
    }
}

fn mercator_y(lat: f64) -> f64 {
    (PI / 4.0 + lat.to_radians() / 2.0).tan().ln()
}

impl Projector for Mercator {
    fn project(&self, lon: f64, lat: f64) -> Option<Point> {
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > MERCATOR_MAX_LAT {
            return None;
        }
        Some(self.fit.apply(Point::new(lon.to_radians(), -mercator_y(lat))))
    }
}

/// Build the projector described by the canvas config
pub fn from_canvas(canvas: &CanvasConfig) -> Box<dyn Projector> {
    match canvas.projection {
        ProjectionKind::Equirectangular => {
            Box::new(Equirectangular::fitted(canvas.extent, canvas.width, canvas.height))
        }
        ProjectionKind::Mercator => {
            Box::new(Mercator::fitted(canvas.extent, canvas.width, canvas.height))
        }
    }
}

/// A marker with its undisplaced projected point
#[derive(Debug, Clone, PartialEq)]
pub struct Anchored {
    pub record: MarkerRecord,
    pub anchor: Point,
}

/// Result of projecting the whole marker set
#[derive(Debug, Clone, Default)]
pub struct Projected {
    pub placed: Vec<Anchored>,
    pub dropped: Vec<MarkerId>,
}

/// Project every marker, keeping input order; unplaceable markers go to `dropped`
pub fn project_markers(projector: &dyn Projector, records: &[MarkerRecord]) -> Projected {
    let mut out = Projected::default();
    for record in records {
        match projector.project(record.longitude, record.latitude) {
            Some(anchor) => out.placed.push(Anchored {
                record: record.clone(),
                anchor,
            }),
            None => {
                tracing::debug!("Marker '{}' is outside the projection domain", record.id);
                out.dropped.push(record.id.clone());
            }
        }
    }
    out
}
