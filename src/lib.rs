//! Visit Map
//!
//! Lays out map markers without overlap, reveals visited ones in the order
//! they were first visited, and lets the user inspect any marker by hover or
//! tap. Rendering is left to the host through the traits in [`surface`] and
//! [`interaction`].
//!
//! Pipeline: data -> projection -> layout -> surface placement -> reveal,
//! with the interaction controller attached to the placed markers.

pub mod config;
pub mod data;
pub mod easing;
pub mod interaction;
pub mod layout;
pub mod logging;
pub mod projection;
pub mod reveal;
pub mod scheduler;
pub mod surface;

use std::collections::{HashMap, HashSet};

use config::Config;
use data::{Dataset, Marker, MarkerId, Point};
use layout::LayoutEngine;
use projection::Projector;
use reveal::RevealOrder;

/// Markers ready for rendering plus the order they will be revealed in
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub markers: Vec<Marker>,
    pub order: RevealOrder,
    /// Markers the projection could not place
    pub dropped: Vec<MarkerId>,
}

impl Scene {
    /// Project, lay out and order a dataset
    pub fn build(config: &Config, projector: &dyn Projector, dataset: &Dataset) -> Self {
        let projected = projection::project_markers(projector, &dataset.markers);
        let engine = LayoutEngine::new(config.layout.clone());
        let mut markers = engine.place(projected.placed);

        let order = {
            let placed: HashSet<&MarkerId> = markers.iter().map(|m| m.id()).collect();
            RevealOrder::from_visits(&dataset.visits, |id| placed.contains(id))
        };
        order.annotate(&mut markers);

        Self {
            markers,
            order,
            dropped: projected.dropped,
        }
    }

    /// Adjusted position of every placed marker
    pub fn positions(&self) -> HashMap<MarkerId, Point> {
        self.markers.iter().map(|m| (m.id().clone(), m.position)).collect()
    }

    pub fn marker(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id() == id)
    }

    /// Topmost marker whose disc contains `point`
    pub fn hit_test(&self, point: Point) -> Option<&Marker> {
        self.markers
            .iter()
            .rev()
            .find(|m| m.position.distance(point) <= m.radius)
    }
}
