//! The bottom control bar (time acceleration, view and label controls)
//! and the body-list window.

use egui::Context;
use egui_extras::{Column, TableBuilder};
use orrery::bodies::BodyId;

use crate::{i18n, i18n_args, view::LIGHT_SECONDS_PER_AU, LabelMode, Simulation};

/// Snap-back slider state for the acceleration control. The slider maps
/// straight onto the clock's control curve and springs back to zero when
/// released, so acceleration is only ever active while dragging.
#[derive(Default)]
pub struct TimeControls {
    control: f64,
}

pub fn show_bottom_bar(
    ctx: &Context,
    sim: &mut Simulation,
    controls: &mut TimeControls,
    viewport: (f64, f64),
) {
    egui::TopBottomPanel::bottom("controls").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui.button(i18n!("controls-reset-view")).clicked() {
                sim.reset_view(viewport);
            }
            if ui.button(i18n!("controls-reset-time")).clicked() {
                controls.control = 0.0;
                sim.clock.set_control(0.0);
                sim.clock.reset();
            }
            if ui
                .button(i18n_args!(
                    "controls-labels",
                    "mode",
                    label_mode_name(sim.label_mode)
                ))
                .clicked()
            {
                sim.label_mode = sim.label_mode.cycle();
            }
            ui.separator();
            ui.label(i18n!("controls-time-rate"));

            ui.spacing_mut().slider_width = (ui.available_width() - 160.0).max(120.0);
            let response = ui.add(
                egui::Slider::new(&mut controls.control, -1.0..=1.0).show_value(false),
            );
            if response.drag_stopped() {
                controls.control = 0.0;
            }
            sim.clock.set_control(controls.control);

            let acceleration = sim.clock.acceleration();
            if acceleration == 0.0 {
                ui.label(i18n!("controls-real-time"));
            } else {
                ui.label(i18n_args!(
                    "controls-accel",
                    "factor",
                    format!("{acceleration:+.0}")
                ));
            }
        });
    });
}

fn label_mode_name(mode: LabelMode) -> String {
    match mode {
        LabelMode::Name => i18n!("label-mode-name"),
        LabelMode::Class => i18n!("label-mode-class"),
        LabelMode::Atmosphere => i18n!("label-mode-atmosphere"),
        LabelMode::Off => i18n!("label-mode-off"),
    }
}

pub fn show_bodies_window(ctx: &Context, sim: &mut Simulation, open: &mut bool) {
    // Snapshot the rows first; the focus button needs the map mutable.
    let rows: Vec<(BodyId, String, &'static str, f64)> = sim
        .system
        .bodies()
        .iter()
        .map(|b| {
            (
                b.id,
                b.name.to_string(),
                b.class.label(),
                b.absolute_position.norm() * LIGHT_SECONDS_PER_AU,
            )
        })
        .collect();
    let mut focus_request: Option<BodyId> = None;

    egui::Window::new(i18n!("bodies-title"))
        .open(open)
        .default_width(460.0)
        .show(ctx, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .column(Column::auto().resizable(true))
                .column(Column::auto())
                .column(Column::auto())
                .column(Column::remainder())
                .header(18.0, |mut header| {
                    header.col(|ui| {
                        ui.strong(i18n!("bodies-name"));
                    });
                    header.col(|ui| {
                        ui.strong(i18n!("bodies-class"));
                    });
                    header.col(|ui| {
                        ui.strong(i18n!("bodies-distance"));
                    });
                    header.col(|_| {});
                })
                .body(|mut table| {
                    for (id, name, class, distance_ls) in &rows {
                        table.row(16.0, |mut row| {
                            row.col(|ui| {
                                ui.label(name);
                            });
                            row.col(|ui| {
                                ui.label(*class);
                            });
                            row.col(|ui| {
                                ui.label(format!("{distance_ls:.3} ls"));
                            });
                            row.col(|ui| {
                                if ui.small_button(i18n!("bodies-focus")).clicked() {
                                    focus_request = Some(*id);
                                }
                            });
                        });
                    }
                });
        });

    if let Some(id) = focus_request {
        sim.system.set_focus(Some(id));
        sim.camera.pan_x = 0.0;
        sim.camera.pan_y = 0.0;
    }
}
