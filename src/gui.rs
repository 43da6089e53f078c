//! Native map viewer using egui
//!
//! Implements the rendering surface, counter and tooltip on top of egui,
//! loads marker images in the background and feeds pointer/touch input to
//! the interaction controller.

use eframe::egui;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use tracing::{debug, info, warn};

use visit_map::config::Config;
use visit_map::data::{MarkerId, Point};
use visit_map::easing::ease_out_cubic;
use visit_map::interaction::{InteractionController, Placement, Size, TooltipSurface, Viewport};
use visit_map::reveal::{RevealSequencer, Settle, SettleGate};
use visit_map::scheduler::FrameRequester;
use visit_map::surface::{self, CounterSink, RenderSurface, Transform, Treatment};
use visit_map::Scene;

/// Enlarged markers grow by this factor
const ENLARGE: f32 = 1.4;
/// How long the counter flourish lasts after the reveal completes
const FLOURISH_SECS: f64 = 1.5;

/// Run the native map viewer
pub fn run_viewer(config: Config, scene: Scene, data_dir: PathBuf) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.canvas.width as f32, config.canvas.height as f32 + 60.0])
            .with_title("Visit Map"),
        ..Default::default()
    };

    eframe::run_native(
        "Visit Map",
        options,
        Box::new(|cc| Ok(Box::new(VisitMapApp::new(cc, config, scene, data_dir)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}

/// Frame requests become egui repaint requests
struct Repaint(egui::Context);

impl FrameRequester for Repaint {
    fn request_frame(&mut self) {
        self.0.request_repaint();
    }
}

struct MarkerVisual {
    position: Point,
    radius: f64,
    treatment: Treatment,
    transform: Option<Transform>,
    texture: Option<egui::TextureHandle>,
}

/// Rendering surface: what to draw for each marker
#[derive(Default)]
struct MapCanvas {
    visuals: HashMap<MarkerId, MarkerVisual>,
    draw_order: Vec<MarkerId>,
}

impl RenderSurface for MapCanvas {
    fn place(&mut self, id: &MarkerId, position: Point, radius: f64) {
        if !self.visuals.contains_key(id) {
            self.draw_order.push(id.clone());
        }
        self.visuals.insert(
            id.clone(),
            MarkerVisual {
                position,
                radius,
                treatment: Treatment::Dormant,
                transform: None,
                texture: None,
            },
        );
    }

    fn set_treatment(&mut self, id: &MarkerId, treatment: Treatment) {
        if let Some(visual) = self.visuals.get_mut(id) {
            visual.treatment = treatment;
        }
    }

    fn set_transform(&mut self, id: &MarkerId, transform: Option<Transform>) {
        if let Some(visual) = self.visuals.get_mut(id) {
            visual.transform = transform;
        }
    }
}

#[derive(Default)]
struct CounterDisplay {
    count: usize,
    complete: bool,
}

impl CounterSink for CounterDisplay {
    fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    fn mark_complete(&mut self) {
        self.complete = true;
    }
}

/// Tooltip and enlargement state driven by the interaction controller
#[derive(Default)]
struct Overlay {
    tooltip: Option<(MarkerId, Placement)>,
    enlarged: HashSet<MarkerId>,
}

impl TooltipSurface for Overlay {
    fn show_tooltip(&mut self, id: &MarkerId, placement: Placement) {
        self.tooltip = Some((id.clone(), placement));
    }

    fn move_tooltip(&mut self, placement: Placement) {
        if let Some((_, current)) = self.tooltip.as_mut() {
            *current = placement;
        }
    }

    fn hide_tooltip(&mut self) {
        self.tooltip = None;
    }

    fn set_enlarged(&mut self, id: &MarkerId, enlarged: bool) {
        if enlarged {
            self.enlarged.insert(id.clone());
        } else {
            self.enlarged.remove(id);
        }
    }
}

/// Layout plane -> screen mapping for the current panel
#[derive(Clone, Copy)]
struct View {
    scale: f32,
    offset: egui::Vec2,
}

impl View {
    fn fit(rect: egui::Rect, width: f64, height: f64) -> Self {
        let scale = (rect.width() / width as f32).min(rect.height() / height as f32);
        let used = egui::vec2(width as f32 * scale, height as f32 * scale);
        Self {
            scale,
            offset: rect.min.to_vec2() + (rect.size() - used) / 2.0,
        }
    }

    fn to_screen(self, p: Point) -> egui::Pos2 {
        egui::pos2(p.x as f32 * self.scale, p.y as f32 * self.scale) + self.offset
    }

    fn to_layout(self, pos: egui::Pos2) -> Point {
        let local = (pos.to_vec2() - self.offset) / self.scale;
        Point::new(local.x as f64, local.y as f64)
    }
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(pos.x as f64, pos.y as f64)
}

type ImageResult = (MarkerId, anyhow::Result<egui::ColorImage>);

struct VisitMapApp {
    config: Config,
    scene: Scene,
    reveal: RevealSequencer<MapCanvas, CounterDisplay>,
    controller: InteractionController,
    overlay: Overlay,
    gate: SettleGate,
    images: Receiver<ImageResult>,
    pointer_over: Option<MarkerId>,
    last_pointer: Option<egui::Pos2>,
    completed_at: Option<f64>,
}

impl VisitMapApp {
    fn new(cc: &eframe::CreationContext<'_>, config: Config, scene: Scene, data_dir: PathBuf) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let mut canvas = MapCanvas::default();
        surface::place_markers(&mut canvas, &scene.markers);

        let reveal = RevealSequencer::new(
            &config.reveal,
            &scene.order,
            &scene.positions(),
            canvas,
            CounterDisplay::default(),
            Box::new(Repaint(cc.egui_ctx.clone())),
        );

        let ids: Vec<MarkerId> = scene.markers.iter().map(|m| m.id().clone()).collect();
        let gate = SettleGate::new(ids.clone());
        let images = spawn_image_loads(&cc.egui_ctx, data_dir.join("images"), ids);

        let screen = cc.egui_ctx.screen_rect();
        let controller = InteractionController::new(
            config.tooltip.clone(),
            Viewport::new(screen.width() as f64, screen.height() as f64),
        );

        info!(
            "Viewer ready: {} markers, {} to reveal, {} images pending",
            scene.markers.len(),
            scene.order.len(),
            gate.pending()
        );

        Self {
            config,
            scene,
            reveal,
            controller,
            overlay: Overlay::default(),
            gate,
            images,
            pointer_over: None,
            last_pointer: None,
            completed_at: None,
        }
    }

    /// Attach loaded textures and open the gate once every image settled
    fn drain_images(&mut self, ctx: &egui::Context) {
        while let Ok((id, result)) = self.images.try_recv() {
            let outcome = match result {
                Ok(image) => {
                    let texture = ctx.load_texture(format!("marker-{}", id), image, egui::TextureOptions::LINEAR);
                    if let Some(visual) = self.reveal.surface_mut().visuals.get_mut(&id) {
                        visual.texture = Some(texture);
                    }
                    Settle::Loaded
                }
                Err(e) => {
                    debug!("No image for '{}': {}", id, e);
                    Settle::Failed
                }
            };
            if self.gate.settle(&id, outcome) {
                info!("All marker images settled ({} failed)", self.gate.failed());
            }
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context, view: View) {
        let events = ctx.input(|i| i.events.clone());
        for event in &events {
            if let egui::Event::Touch { phase, pos, .. } = event {
                match phase {
                    egui::TouchPhase::Start => self.controller.touch_start(),
                    egui::TouchPhase::End => {
                        let target = self.scene.hit_test(view.to_layout(*pos)).map(|m| m.id().clone());
                        self.controller.tap(target.as_ref(), to_point(*pos), &mut self.overlay);
                        self.controller.touch_end();
                    }
                    egui::TouchPhase::Cancel => self.controller.touch_end(),
                    egui::TouchPhase::Move => {}
                }
            }
        }

        let hover = ctx.input(|i| i.pointer.hover_pos());
        let over = hover
            .and_then(|p| self.scene.hit_test(view.to_layout(p)))
            .map(|m| m.id().clone());

        if over != self.pointer_over {
            if let Some(previous) = self.pointer_over.take() {
                self.controller.mouse_out(&previous, &mut self.overlay);
            }
            if let (Some(id), Some(p)) = (&over, hover) {
                self.controller.mouse_over(id, to_point(p), &mut self.overlay);
            }
            self.pointer_over = over;
        } else if let Some(p) = hover {
            if Some(p) != self.last_pointer {
                self.controller.mouse_move(to_point(p), &mut self.overlay);
            }
        }
        self.last_pointer = hover;
    }

    fn paint_markers(&self, painter: &egui::Painter, view: View) {
        let canvas = self.reveal.surface();
        for id in &canvas.draw_order {
            let Some(visual) = canvas.visuals.get(id) else { continue };

            let mut scale = visual.transform.map(|t| t.scale as f32).unwrap_or(1.0);
            if self.overlay.enlarged.contains(id) {
                scale *= ENLARGE;
            }
            let center = view.to_screen(visual.position);
            let radius = (visual.radius as f32 * view.scale * scale).max(0.0);

            let (fill, stroke, tint) = match visual.treatment {
                Treatment::Dormant => (
                    egui::Color32::from_gray(70),
                    egui::Color32::from_gray(110),
                    egui::Color32::from_white_alpha(90),
                ),
                Treatment::Revealed => {
                    // Drop shadow
                    painter.circle_filled(center + egui::vec2(1.5, 2.0), radius, egui::Color32::from_black_alpha(120));
                    (
                        egui::Color32::from_rgb(64, 140, 96),
                        egui::Color32::from_rgb(240, 220, 150),
                        egui::Color32::WHITE,
                    )
                }
            };

            painter.circle_filled(center, radius, fill);
            if let Some(texture) = &visual.texture {
                let half = radius * std::f32::consts::FRAC_1_SQRT_2;
                let rect = egui::Rect::from_center_size(center, egui::vec2(half * 2.0, half * 2.0));
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(texture.id(), rect, uv, tint);
            }
            painter.circle_stroke(center, radius, egui::Stroke::new(1.5, stroke));
        }
    }

    fn show_tooltip(&mut self, ctx: &egui::Context) {
        let Some((id, placement)) = self.overlay.tooltip.clone() else { return };
        let Some(marker) = self.scene.marker(&id) else {
            warn!("Tooltip for unknown marker '{}'", id);
            return;
        };

        let response = egui::Area::new(egui::Id::new("marker_tooltip"))
            .order(egui::Order::Tooltip)
            .fixed_pos(egui::pos2(placement.position.x as f32, placement.position.y as f32))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.strong(&marker.record.display_name);
                    if !marker.record.region.is_empty() {
                        ui.label(&marker.record.region);
                    }
                    match marker.first_visit {
                        Some(date) => ui.label(format!("First visited {}", date.format("%B %-d, %Y"))),
                        None => ui.weak("Not visited yet"),
                    };
                });
            })
            .response;

        let rect = response.rect;
        self.controller
            .set_tooltip_size(Size::new(rect.width() as f64, rect.height() as f64));
    }
}

impl eframe::App for VisitMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now_secs = ctx.input(|i| i.time);
        let now = now_secs * 1000.0;

        // Frame callbacks run before this frame's input
        if self.controller.on_frame() {
            ctx.request_repaint();
        }

        self.drain_images(ctx);
        if self.gate.is_open() && !self.reveal.is_started() {
            self.reveal.start(now);
        }
        if self.reveal.is_active() {
            self.reveal.on_frame(now);
        }

        let counter = self.reveal.counter();
        if counter.complete && self.completed_at.is_none() {
            self.completed_at = Some(now_secs);
        }
        // 1 right at completion, fading to 0 over the flourish
        let flourish = self
            .completed_at
            .map(|t| 1.0 - ease_out_cubic(((now_secs - t) / FLOURISH_SECS).clamp(0.0, 1.0)))
            .unwrap_or(0.0);
        if flourish > 0.0 {
            ctx.request_repaint();
        }
        let total = self.reveal.total();

        egui::TopBottomPanel::top("counter_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let text = egui::RichText::new(format!("{} of {} visited", counter.count, total)).heading();
                let text = if flourish > 0.0 {
                    let gold = egui::Color32::from_rgb(250, 210, 90);
                    text.color(blend(ui.visuals().text_color(), gold, flourish as f32))
                } else {
                    text
                };
                ui.label(text);
                ui.label(format!("{} markers on the map", self.scene.markers.len()));
                if !self.gate.is_open() {
                    ui.spinner();
                    ui.label(format!("loading {} images", self.gate.pending()));
                }
            });
        });

        let screen = ctx.screen_rect();
        self.controller
            .set_viewport(Viewport::resolve(None, screen.width() as f64, screen.height() as f64));

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::hover());
            let view = View::fit(response.rect, self.config.canvas.width, self.config.canvas.height);

            self.handle_input(ctx, view);
            self.paint_markers(&painter, view);
        });

        self.show_tooltip(ctx);
    }
}

/// Decode every marker image on the blocking pool; results arrive over a channel
fn spawn_image_loads(ctx: &egui::Context, dir: PathBuf, ids: Vec<MarkerId>) -> Receiver<ImageResult> {
    let (tx, rx) = mpsc::channel();
    for id in ids {
        let tx = tx.clone();
        let ctx = ctx.clone();
        let dir = dir.clone();
        tokio::task::spawn_blocking(move || {
            let result = load_marker_image(&dir, &id);
            if tx.send((id, result)).is_ok() {
                ctx.request_repaint();
            }
        });
    }
    rx
}

fn load_marker_image(dir: &Path, id: &MarkerId) -> anyhow::Result<egui::ColorImage> {
    let path = ["png", "jpg", "jpeg"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", id, ext)))
        .find(|p| p.exists())
        .ok_or_else(|| anyhow::anyhow!("no image in {:?}", dir))?;

    let image = image::open(&path)?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

/// Per-channel mix from `from` towards `to`
fn blend(from: egui::Color32, to: egui::Color32, t: f32) -> egui::Color32 {
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    egui::Color32::from_rgb(mix(from.r(), to.r()), mix(from.g(), to.g()), mix(from.b(), to.b()))
}
