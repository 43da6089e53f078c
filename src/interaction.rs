//! Interaction controller - hover and tap inspection of markers
//!
//! Mouse: `Idle -> Hovering(id)` on mouse-over, back to `Idle` on mouse-out,
//! with the tooltip following the pointer in between.
//!
//! Touch: `TouchIdle -> TouchSelected(id)` on the first tap of a marker.
//! Tapping the same marker again, or empty space, returns to `TouchIdle`.
//! Tapping another marker swaps the selection directly.
//!
//! Touch input is followed by synthetic mouse events a little later. While
//! `TouchState::active` is set, every mouse handler is a no-op. The flag is
//! raised on touch-start and dropped on the second frame after touch-end.

use crate::config::TooltipConfig;
use crate::data::{MarkerId, Point};

/// Frames to wait after touch-end before mouse input is trusted again
pub const TOUCH_SETTLE_FRAMES: u8 = 2;

/// Visible region in page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            width,
            height,
        }
    }

    /// Prefer the zoom-aware visual viewport; fall back to the window size
    pub fn resolve(visual: Option<Viewport>, window_width: f64, window_height: f64) -> Self {
        match visual {
            Some(v) if v.width > 0.0 && v.height > 0.0 => v,
            _ => Self::new(window_width, window_height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Where the tooltip's top-left corner goes, and which axes were flipped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Point,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// Place a tooltip next to `anchor`, flipping each axis independently when
/// the far edge would cross `viewport extent - padding`
pub fn place_tooltip(anchor: Point, size: Size, viewport: Viewport, padding: f64, gap: f64) -> Placement {
    let right = viewport.offset_x + viewport.width - padding;
    let bottom = viewport.offset_y + viewport.height - padding;

    let flip_x = anchor.x + gap + size.width > right;
    let flip_y = anchor.y + gap + size.height > bottom;

    let x = if flip_x { anchor.x - gap - size.width } else { anchor.x + gap };
    let y = if flip_y { anchor.y - gap - size.height } else { anchor.y + gap };

    Placement {
        position: Point::new(x, y),
        flip_x,
        flip_y,
    }
}

/// Touch bookkeeping, owned by the controller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchState {
    pub active: bool,
    pub current_target: Option<MarkerId>,
}

/// What the controller drives on screen
pub trait TooltipSurface {
    fn show_tooltip(&mut self, id: &MarkerId, placement: Placement);
    fn move_tooltip(&mut self, placement: Placement);
    fn hide_tooltip(&mut self);
    fn set_enlarged(&mut self, id: &MarkerId, enlarged: bool);
}

pub struct InteractionController {
    config: TooltipConfig,
    viewport: Viewport,
    tooltip_size: Size,
    hovered: Option<MarkerId>,
    touch: TouchState,
    settle_frames: Option<u8>,
}

impl InteractionController {
    pub fn new(config: TooltipConfig, viewport: Viewport) -> Self {
        Self {
            config,
            viewport,
            tooltip_size: Size::default(),
            hovered: None,
            touch: TouchState::default(),
            settle_frames: None,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Rendered size of the tooltip, measured by the host
    pub fn set_tooltip_size(&mut self, size: Size) {
        self.tooltip_size = size;
    }

    pub fn placement(&self, anchor: Point) -> Placement {
        place_tooltip(
            anchor,
            self.tooltip_size,
            self.viewport,
            self.config.padding,
            self.config.gap,
        )
    }

    /// Mouse input is ignored while touch is active and while a tap selection is pinned
    fn mouse_suppressed(&self) -> bool {
        self.touch.active || self.touch.current_target.is_some()
    }

    pub fn mouse_over(&mut self, id: &MarkerId, pointer: Point, surface: &mut dyn TooltipSurface) {
        if self.mouse_suppressed() {
            return;
        }
        self.hovered = Some(id.clone());
        surface.show_tooltip(id, self.placement(pointer));
    }

    pub fn mouse_move(&mut self, pointer: Point, surface: &mut dyn TooltipSurface) {
        if self.mouse_suppressed() || self.hovered.is_none() {
            return;
        }
        surface.move_tooltip(self.placement(pointer));
    }

    pub fn mouse_out(&mut self, id: &MarkerId, surface: &mut dyn TooltipSurface) {
        if self.mouse_suppressed() || self.hovered.as_ref() != Some(id) {
            return;
        }
        self.hovered = None;
        surface.hide_tooltip();
    }

    pub fn touch_start(&mut self) {
        self.touch.active = true;
        self.settle_frames = None;
    }

    pub fn touch_end(&mut self) {
        self.settle_frames = Some(TOUCH_SETTLE_FRAMES);
    }

    /// A tap on `target`, or on empty space when `None`
    pub fn tap(&mut self, target: Option<&MarkerId>, point: Point, surface: &mut dyn TooltipSurface) {
        if self.hovered.take().is_some() {
            surface.hide_tooltip();
        }
        let current = self.touch.current_target.take();

        match (current, target) {
            (Some(current), Some(target)) if &current == target => {
                surface.set_enlarged(&current, false);
                surface.hide_tooltip();
            }
            (current, Some(target)) => {
                if let Some(previous) = current {
                    surface.set_enlarged(&previous, false);
                }
                surface.set_enlarged(target, true);
                surface.show_tooltip(target, self.placement(point));
                self.touch.current_target = Some(target.clone());
            }
            (Some(current), None) => {
                surface.set_enlarged(&current, false);
                surface.hide_tooltip();
            }
            (None, None) => {}
        }
    }

    /// Call once per animation frame, before handling that frame's input.
    /// Returns whether another frame is needed.
    pub fn on_frame(&mut self) -> bool {
        if let Some(remaining) = self.settle_frames {
            let remaining = remaining.saturating_sub(1);
            if remaining == 0 {
                self.touch.active = false;
                self.settle_frames = None;
                tracing::trace!("Touch settled; mouse input re-enabled");
            } else {
                self.settle_frames = Some(remaining);
            }
        }
        self.needs_frame()
    }

    pub fn needs_frame(&self) -> bool {
        self.settle_frames.is_some()
    }

    pub fn hovered(&self) -> Option<&MarkerId> {
        self.hovered.as_ref()
    }

    pub fn touch_state(&self) -> &TouchState {
        &self.touch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Show(MarkerId, Placement),
        Move(Placement),
        Hide,
        Enlarge(MarkerId, bool),
    }

    #[derive(Default)]
    struct RecordingTooltip {
        calls: Vec<Call>,
    }

    impl TooltipSurface for RecordingTooltip {
        fn show_tooltip(&mut self, id: &MarkerId, placement: Placement) {
            self.calls.push(Call::Show(id.clone(), placement));
        }

        fn move_tooltip(&mut self, placement: Placement) {
            self.calls.push(Call::Move(placement));
        }

        fn hide_tooltip(&mut self) {
            self.calls.push(Call::Hide);
        }

        fn set_enlarged(&mut self, id: &MarkerId, enlarged: bool) {
            self.calls.push(Call::Enlarge(id.clone(), enlarged));
        }
    }

    fn controller() -> InteractionController {
        let mut c = InteractionController::new(
            TooltipConfig { padding: 0.0, gap: 0.0 },
            Viewport::new(800.0, 600.0),
        );
        c.set_tooltip_size(Size::new(200.0, 80.0));
        c
    }

    fn id(s: &str) -> MarkerId {
        MarkerId::from(s)
    }

    #[test]
    fn test_flip_near_right_edge() {
        let viewport = Viewport::new(800.0, 600.0);
        let p = place_tooltip(Point::new(795.0, 10.0), Size::new(200.0, 80.0), viewport, 0.0, 0.0);
        assert!(p.flip_x);
        assert!(!p.flip_y);
        assert_eq!(p.position, Point::new(595.0, 10.0));
    }

    #[test]
    fn test_flip_near_bottom_respects_padding() {
        let viewport = Viewport::new(800.0, 600.0);
        // 100 + 12 + 80 = 192 fits in 600, but not with padding 420
        let p = place_tooltip(Point::new(100.0, 100.0), Size::new(200.0, 80.0), viewport, 0.0, 12.0);
        assert!(!p.flip_y);
        let p = place_tooltip(Point::new(100.0, 100.0), Size::new(200.0, 80.0), viewport, 420.0, 12.0);
        assert!(p.flip_y);
        assert_eq!(p.position.y, 8.0);
    }

    #[test]
    fn test_visual_viewport_offset() {
        let visual = Viewport {
            offset_x: 400.0,
            offset_y: 0.0,
            width: 400.0,
            height: 300.0,
        };
        let viewport = Viewport::resolve(Some(visual), 1600.0, 1200.0);
        let p = place_tooltip(Point::new(500.0, 50.0), Size::new(200.0, 80.0), viewport, 0.0, 0.0);
        assert!(!p.flip_x);
        let p = place_tooltip(Point::new(700.0, 250.0), Size::new(200.0, 80.0), viewport, 0.0, 0.0);
        assert!(p.flip_x && p.flip_y);

        assert_eq!(Viewport::resolve(None, 1024.0, 768.0), Viewport::new(1024.0, 768.0));
    }

    #[test]
    fn test_hover_follows_pointer() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.mouse_over(&id("yell"), Point::new(10.0, 10.0), &mut tip);
        c.mouse_move(Point::new(790.0, 20.0), &mut tip);
        c.mouse_out(&id("yell"), &mut tip);

        assert_eq!(tip.calls.len(), 3);
        assert!(matches!(&tip.calls[0], Call::Show(m, p) if *m == id("yell") && !p.flip_x));
        assert!(matches!(&tip.calls[1], Call::Move(p) if p.flip_x));
        assert_eq!(tip.calls[2], Call::Hide);
        assert_eq!(c.hovered(), None);
    }

    #[test]
    fn test_mouse_out_of_other_marker_ignored() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();
        c.mouse_over(&id("yell"), Point::new(10.0, 10.0), &mut tip);
        c.mouse_out(&id("zion"), &mut tip);
        assert_eq!(tip.calls.len(), 1);
        assert_eq!(c.hovered(), Some(&id("yell")));
    }

    #[test]
    fn test_touch_suppresses_mouse() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.touch_start();
        assert!(c.touch_state().active);
        c.mouse_over(&id("glac"), Point::new(10.0, 10.0), &mut tip);
        c.mouse_move(Point::new(20.0, 20.0), &mut tip);
        c.mouse_out(&id("glac"), &mut tip);
        assert!(tip.calls.is_empty());
    }

    #[test]
    fn test_touch_settles_after_two_frames() {
        let mut c = controller();
        c.touch_start();
        assert!(!c.on_frame());
        c.touch_end();

        assert!(c.on_frame());
        assert!(c.touch_state().active);
        assert!(!c.on_frame());
        assert!(!c.touch_state().active);
    }

    #[test]
    fn test_new_touch_cancels_settle() {
        let mut c = controller();
        c.touch_start();
        c.touch_end();
        c.on_frame();
        c.touch_start();
        c.on_frame();
        c.on_frame();
        assert!(c.touch_state().active);
    }

    #[test]
    fn test_tap_same_marker_toggles() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.tap(Some(&id("arch")), Point::new(10.0, 10.0), &mut tip);
        assert_eq!(c.touch_state().current_target, Some(id("arch")));
        c.tap(Some(&id("arch")), Point::new(10.0, 10.0), &mut tip);
        assert_eq!(c.touch_state().current_target, None);

        assert_eq!(tip.calls[0], Call::Enlarge(id("arch"), true));
        assert!(matches!(&tip.calls[1], Call::Show(m, _) if *m == id("arch")));
        assert_eq!(&tip.calls[2..], &[Call::Enlarge(id("arch"), false), Call::Hide]);
    }

    #[test]
    fn test_tap_other_marker_swaps_directly() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.tap(Some(&id("arch")), Point::new(10.0, 10.0), &mut tip);
        tip.calls.clear();
        c.tap(Some(&id("cany")), Point::new(30.0, 10.0), &mut tip);

        assert_eq!(tip.calls[0], Call::Enlarge(id("arch"), false));
        assert_eq!(tip.calls[1], Call::Enlarge(id("cany"), true));
        assert!(matches!(&tip.calls[2], Call::Show(m, _) if *m == id("cany")));
        assert!(!tip.calls.contains(&Call::Hide));
        assert_eq!(c.touch_state().current_target, Some(id("cany")));
    }

    #[test]
    fn test_tap_outside_clears_selection() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.tap(None, Point::new(0.0, 0.0), &mut tip);
        assert!(tip.calls.is_empty());

        c.tap(Some(&id("arch")), Point::new(10.0, 10.0), &mut tip);
        tip.calls.clear();
        c.tap(None, Point::new(400.0, 400.0), &mut tip);
        assert_eq!(tip.calls, vec![Call::Enlarge(id("arch"), false), Call::Hide]);
    }

    #[test]
    fn test_tap_outside_closes_hover_tooltip() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();

        c.mouse_over(&id("yell"), Point::new(10.0, 10.0), &mut tip);
        c.touch_start();
        c.tap(None, Point::new(400.0, 400.0), &mut tip);
        c.touch_end();
        c.on_frame();
        c.on_frame();
        c.mouse_out(&id("yell"), &mut tip);

        assert!(!c.touch_state().active);
        assert_eq!(c.hovered(), None);
        assert_eq!(tip.calls.len(), 2);
        assert_eq!(tip.calls[1], Call::Hide);
    }

    #[test]
    fn test_pinned_selection_blocks_hover() {
        let mut c = controller();
        let mut tip = RecordingTooltip::default();
        c.touch_start();
        c.tap(Some(&id("arch")), Point::new(10.0, 10.0), &mut tip);
        c.touch_end();
        c.on_frame();
        c.on_frame();
        tip.calls.clear();

        c.mouse_over(&id("zion"), Point::new(50.0, 50.0), &mut tip);
        assert!(tip.calls.is_empty());
    }
}
