//! The orrery canvas: scene assembly, projection, painting, and the mouse
//! interaction that drives the camera and the focus body.

use std::f64::consts::TAU;

use egui::{Align2, Color32, FontId, PointerButton, Pos2, Sense, Shape, Stroke};
use nalgebra::Vector3;
use orrery::{
    bodies::{Body, BodyClass, BodyId},
    camera::{
        self, mean_depth, sort_back_to_front, world_from_sim, Drawable, Projection,
        AXIS_PERSPECTIVE_STRENGTH, PLANE_PERSPECTIVE_STRENGTH,
    },
};
use time::OffsetDateTime;

use crate::{config::ViewerConfig, i18n, i18n_args, LabelMode, Simulation};

/// AU per light-year, for the focus-offset readout.
pub const AU_PER_LIGHT_YEAR: f64 = 63_241.1;
/// Light-seconds per AU, for the distance readouts.
pub const LIGHT_SECONDS_PER_AU: f64 = 499.004_78;

const PLANE_COLOR: Color32 = Color32::WHITE;
const AXIS_COLOR: Color32 = Color32::from_rgb(50, 50, 50);
const ORBIT_COLOR: Color32 = Color32::from_rgb(40, 40, 40);
const LABEL_COLOR: Color32 = Color32::from_rgb(135, 135, 135);
const STATUS_COLOR: Color32 = Color32::WHITE;

/// Minimum clickable radius for focus selection (px).
const HIT_RADIUS_PX: f32 = 5.0;
const PLANE_SEGMENTS: usize = 120;

/// Sprite color per body class.
fn class_color(class: BodyClass) -> Color32 {
    match class {
        BodyClass::Star => Color32::from_rgb(255, 255, 0),
        BodyClass::RockyBody => Color32::from_rgb(100, 100, 100),
        BodyClass::MetalRichBody => Color32::from_rgb(255, 165, 0),
        BodyClass::HighMetalContentWorld => Color32::from_rgb(255, 100, 100),
        BodyClass::EarthLikeWorld => Color32::from_rgb(120, 138, 48),
        BodyClass::IcyBody => Color32::from_rgb(0, 255, 255),
        BodyClass::ClassIGasGiant => Color32::from_rgb(100, 149, 237),
        BodyClass::ClassIIGasGiant => Color32::from_rgb(120, 100, 200),
        BodyClass::GasGiantWaterLife => Color32::from_rgb(100, 180, 237),
        BodyClass::GasGiantAmmoniaLife => Color32::from_rgb(150, 150, 100),
        BodyClass::HeliumRichGasGiant => Color32::from_rgb(200, 200, 150),
        BodyClass::WaterWorld => Color32::from_rgb(50, 100, 200),
        BodyClass::AmmoniaWorld => Color32::from_rgb(150, 100, 50),
        BodyClass::RockyIceWorld => Color32::from_rgb(200, 220, 255),
        BodyClass::Barycentre => Color32::from_rgb(30, 30, 30),
        BodyClass::Unclassified => Color32::WHITE,
    }
}

enum DrawItem {
    Body { ix: usize, cam: Vector3<f64> },
    Path { points: Vec<Vector3<f64>> },
}

pub fn show(ui: &mut egui::Ui, sim: &mut Simulation, config: &ViewerConfig) {
    let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
    let rect = response.rect;
    let viewport = (f64::from(rect.width()), f64::from(rect.height()));

    // Interaction first, so this frame already reflects the drag.
    if response.dragged_by(PointerButton::Primary) {
        let d = response.drag_delta();
        sim.camera.drag_rotate(f64::from(d.x), f64::from(d.y));
    }
    if response.dragged_by(PointerButton::Middle) {
        let d = response.drag_delta();
        sim.camera.pan(f64::from(d.x), f64::from(d.y));
    }
    if response.double_clicked_by(PointerButton::Middle) {
        sim.reset_view(viewport);
    }
    if response.hovered() {
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll > 0.0 {
            sim.camera.zoom_in();
        } else if scroll < 0.0 {
            sim.camera.zoom_out();
        }
    }

    let center = (
        f64::from(rect.center().x) + sim.camera.pan_x,
        f64::from(rect.center().y) + sim.camera.pan_y,
    );
    let projection = Projection {
        center,
        scale: sim.camera.zoom,
        distance_offset: config.camera_distance_offset,
        strength: config.perspective_strength,
    };

    // The reference plane and axes only make sense around the true system
    // origin; they disappear while a focus body is re-basing everything.
    if sim.system.focus().is_none() {
        draw_reference_plane(&painter, sim, &projection);
        draw_axes(&painter, sim, &projection);
    }

    let mut drawables: Vec<Drawable<DrawItem>> = Vec::new();
    for (ix, body) in sim.system.bodies().iter().enumerate() {
        let cam = sim.camera.rotate(world_from_sim(body.absolute_position));
        drawables.push(Drawable {
            item: DrawItem::Body { ix, cam },
            depth: cam.z,
        });
        if !body.orbit_path.is_empty() {
            let points: Vec<Vector3<f64>> = body
                .orbit_path
                .iter()
                .map(|p| sim.camera.rotate(world_from_sim(p + body.parent_offset)))
                .collect();
            let depth = mean_depth(&points);
            drawables.push(Drawable {
                item: DrawItem::Path { points },
                depth,
            });
        }
    }
    sort_back_to_front(&mut drawables);

    let mut screen_bodies: Vec<(BodyId, Pos2, f32)> = Vec::new();
    for drawable in &drawables {
        match &drawable.item {
            DrawItem::Body { ix, cam } => {
                let body = &sim.system.bodies()[*ix];
                let p = projection.project(*cam);
                let pos = Pos2::new(p.x as f32, p.y as f32);
                let radius = camera::sprite_radius(body.radius_px, p.perspective) as f32;
                painter.circle_filled(pos, radius, class_color(body.class));
                screen_bodies.push((body.id, pos, radius));
                if let Some(text) = label_text(body, sim.label_mode) {
                    painter.text(
                        Pos2::new(pos.x, pos.y + radius + 8.0),
                        Align2::CENTER_CENTER,
                        text,
                        FontId::proportional(12.0),
                        LABEL_COLOR,
                    );
                }
            }
            DrawItem::Path { points } => {
                let line: Vec<Pos2> = points
                    .iter()
                    .map(|&p| {
                        let s = projection.project(p);
                        Pos2::new(s.x as f32, s.y as f32)
                    })
                    .collect();
                if line.len() > 1 {
                    painter.add(Shape::line(line, Stroke::new(1.0, ORBIT_COLOR)));
                }
            }
        }
    }

    // Front-most sprite wins the click.
    if response.clicked_by(PointerButton::Secondary) {
        if let Some(pointer) = response.interact_pointer_pos() {
            let hit = screen_bodies
                .iter()
                .rev()
                .find(|(_, pos, radius)| pointer.distance(*pos) <= radius.max(HIT_RADIUS_PX));
            if let Some(&(id, _, _)) = hit {
                sim.system.set_focus(Some(id));
                sim.camera.pan_x = 0.0;
                sim.camera.pan_y = 0.0;
            }
        }
    }

    draw_status(&painter, rect, sim);
}

fn draw_reference_plane(painter: &egui::Painter, sim: &Simulation, projection: &Projection) {
    let radius = sim.system.plane_radius();
    let plane = Projection {
        strength: PLANE_PERSPECTIVE_STRENGTH,
        ..*projection
    };
    let points: Vec<Pos2> = (0..=PLANE_SEGMENTS)
        .map(|i| {
            let angle = i as f64 / PLANE_SEGMENTS as f64 * TAU;
            let p = Vector3::new(radius * angle.cos(), radius * angle.sin(), 0.0);
            let s = plane.project(sim.camera.rotate(world_from_sim(p)));
            Pos2::new(s.x as f32, s.y as f32)
        })
        .collect();
    painter.add(Shape::line(points, Stroke::new(3.0, PLANE_COLOR)));
}

fn draw_axes(painter: &egui::Painter, sim: &Simulation, projection: &Projection) {
    let radius = sim.system.plane_radius();
    let axes = Projection {
        strength: AXIS_PERSPECTIVE_STRENGTH,
        ..*projection
    };
    let reach = radius * 0.9;
    let label_reach = radius * 0.95;
    let segments = [
        ("X", Vector3::new(reach, 0.0, 0.0), Vector3::new(label_reach, 0.0, 0.0)),
        ("Z", Vector3::new(0.0, reach, 0.0), Vector3::new(0.0, -label_reach, 0.0)),
    ];
    for (name, end, label_at) in segments {
        let a = axes.project(sim.camera.rotate(world_from_sim(-end)));
        let b = axes.project(sim.camera.rotate(world_from_sim(end)));
        painter.line_segment(
            [
                Pos2::new(a.x as f32, a.y as f32),
                Pos2::new(b.x as f32, b.y as f32),
            ],
            Stroke::new(1.0, AXIS_COLOR),
        );
        let l = axes.project(sim.camera.rotate(world_from_sim(label_at)));
        painter.text(
            Pos2::new(l.x as f32, l.y as f32),
            Align2::CENTER_CENTER,
            name,
            FontId::proportional(14.0),
            AXIS_COLOR,
        );
    }
}

fn label_text(body: &Body, mode: LabelMode) -> Option<String> {
    match mode {
        LabelMode::Name => Some(body.name.to_string()),
        LabelMode::Class => Some(body.class.label().to_owned()),
        LabelMode::Atmosphere => Some(body.atmosphere.to_string()),
        LabelMode::Off => None,
    }
}

fn draw_status(painter: &egui::Painter, rect: egui::Rect, sim: &Simulation) {
    let focus_name = sim
        .system
        .focus()
        .and_then(|id| sim.system.get(id))
        .map_or_else(|| i18n!("system-origin"), |b| b.name.to_string());

    let offset = sim.system.focus_offset();
    let ly = 1.0 / AU_PER_LIGHT_YEAR;
    // The dump's galactic axes and the engine's storage axes disagree the
    // same way the display remap does: dump Y is up, storage Z is up.
    let x = sim.coords.x + offset.x * ly;
    let up = sim.coords.z + offset.y * ly;
    let z = sim.coords.y + offset.z * ly;

    let origin_ls = offset.norm() * LIGHT_SECONDS_PER_AU;
    let star_ls = sim
        .system
        .root()
        .and_then(|id| sim.system.get(id))
        .map_or(0.0, |star| star.absolute_position.norm() * LIGHT_SECONDS_PER_AU);

    let lines = [
        i18n_args!(
            "status-title",
            "system",
            sim.system_name.clone(),
            "time",
            format_sim_time(sim.clock.current)
        ),
        i18n_args!(
            "status-bodies",
            "bodies",
            sim.system.len(),
            "plane",
            format!("{:.2}", sim.system.plane_radius())
        ),
        i18n_args!("status-centre", "name", focus_name),
        i18n_args!(
            "status-coords",
            "x",
            format!("{x:.6}"),
            "y",
            format!("{z:.6}"),
            "z",
            format!("{:.6}", -up)
        ),
        i18n_args!("status-distance-origin", "ls", format!("{origin_ls:.6}")),
        i18n_args!("status-distance-star", "ls", format!("{star_ls:.6}")),
    ];
    for (i, line) in lines.iter().enumerate() {
        painter.text(
            Pos2::new(rect.left() + 25.0, rect.top() + 25.0 + 30.0 * i as f32),
            Align2::LEFT_TOP,
            line,
            FontId::proportional(14.0),
            STATUS_COLOR,
        );
    }
}

fn format_sim_time(t: OffsetDateTime) -> String {
    format!(
        "{:02}-{:02}-{:04} {:02}:{:02}:{:02} UTC",
        t.day(),
        u8::from(t.month()),
        t.year(),
        t.hour(),
        t.minute(),
        t.second()
    )
}
