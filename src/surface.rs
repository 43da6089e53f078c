//! Rendering surface contract
//!
//! The core never draws. It hands positions, visual treatments and
//! transforms to whatever implements these traits.
//!
//! Image settle signals do not pass through the surface: the host reports
//! each load outcome to a [`crate::reveal::SettleGate`], which holds the
//! reveal back until every image has loaded or failed.

use crate::data::{Marker, MarkerId, Point};

/// Named visual treatment of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Treatment {
    /// Placed but not yet revealed (desaturated, no shadow)
    Dormant,
    Revealed,
}

/// Scale about a fixed point; `None` on the surface means identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub origin: Point,
}

pub trait RenderSurface {
    fn place(&mut self, id: &MarkerId, position: Point, radius: f64);
    fn set_treatment(&mut self, id: &MarkerId, treatment: Treatment);
    fn set_transform(&mut self, id: &MarkerId, transform: Option<Transform>);
}

/// The visible "markers revealed so far" counter
pub trait CounterSink {
    fn set_count(&mut self, count: usize);
    fn mark_complete(&mut self);
}

/// Static placement: every laid-out marker starts dormant at its adjusted position
pub fn place_markers<S: RenderSurface + ?Sized>(surface: &mut S, markers: &[Marker]) {
    for marker in markers {
        surface.place(marker.id(), marker.position, marker.radius);
        surface.set_treatment(marker.id(), Treatment::Dormant);
    }
    tracing::debug!("Placed {} markers", markers.len());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    /// Remembers everything the core asked it to do
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub placed: Vec<(MarkerId, Point, f64)>,
        pub treatments: HashMap<MarkerId, Treatment>,
        pub revealed: Vec<MarkerId>,
        pub transforms: HashMap<MarkerId, Option<Transform>>,
        /// Markers that received at least one non-identity transform
        pub popped: HashSet<MarkerId>,
        pub transform_calls: usize,
    }

    impl RenderSurface for RecordingSurface {
        fn place(&mut self, id: &MarkerId, position: Point, radius: f64) {
            self.placed.push((id.clone(), position, radius));
        }

        fn set_treatment(&mut self, id: &MarkerId, treatment: Treatment) {
            if treatment == Treatment::Revealed {
                self.revealed.push(id.clone());
            }
            self.treatments.insert(id.clone(), treatment);
        }

        fn set_transform(&mut self, id: &MarkerId, transform: Option<Transform>) {
            self.transform_calls += 1;
            if transform.is_some() {
                self.popped.insert(id.clone());
            }
            self.transforms.insert(id.clone(), transform);
        }
    }

    #[derive(Default)]
    pub(crate) struct RecordingCounter {
        pub counts: Vec<usize>,
        pub completed: u32,
    }

    impl RecordingCounter {
        pub fn current(&self) -> Option<usize> {
            self.counts.last().copied()
        }
    }

    impl CounterSink for RecordingCounter {
        fn set_count(&mut self, count: usize) {
            self.counts.push(count);
        }

        fn mark_complete(&mut self) {
            self.completed += 1;
        }
    }

    #[test]
    fn test_place_markers_starts_dormant() {
        use crate::data::MarkerRecord;

        let marker = Marker {
            record: MarkerRecord {
                id: MarkerId::from("arch"),
                longitude: -109.6,
                latitude: 38.7,
                category: "park".to_string(),
                display_name: "Arches".to_string(),
                region: "Utah".to_string(),
            },
            radius: 14.0,
            anchor: Point::new(10.0, 10.0),
            position: Point::new(12.0, 9.0),
            first_visit: None,
        };
        let mut surface = RecordingSurface::default();
        place_markers(&mut surface, &[marker]);

        assert_eq!(surface.placed, vec![(MarkerId::from("arch"), Point::new(12.0, 9.0), 14.0)]);
        assert_eq!(surface.treatments[&MarkerId::from("arch")], Treatment::Dormant);
    }
}
