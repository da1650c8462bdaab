#![warn(clippy::unwrap_used, clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::doc_markdown,
    clippy::struct_field_names
)]
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use backend::{handler_thread, HReq, HRes};
use color_eyre::eyre;
use config::ViewerConfig;
use egui_notify::Toasts;
use orrery::{
    camera::Camera, ingest::SystemCoords, system::SystemMap, time::SimClock,
};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unic_langid::LanguageIdentifier;

mod backend;
mod config;
mod controls;
mod view;

fluent_templates::static_loader! {
    static LOCALES = {
        locales: "src/locales",
        fallback_language: "en-US",
    };
}

const US_ENGLISH: LanguageIdentifier = unic_langid::langid!("en-US");

#[macro_export]
macro_rules! i18n {
    ($v:expr) => {{
        use ::fluent_templates::Loader;
        $crate::LOCALES.lookup(&$crate::US_ENGLISH, $v)
    }};
}

#[macro_export]
macro_rules! i18n_args {
    ($v:expr, $($arg:expr, $val:expr),*) => {{
	use ::fluent_templates::Loader;
	let mut args = ::std::collections::HashMap::new();
	$(
	    args.insert(::std::string::String::from($arg), ::fluent::FluentValue::from($val));
	)*
	$crate::LOCALES.lookup_with_args(&$crate::US_ENGLISH, $v, &args)
    }}
}

fn handle<T>(toasts: &mut Toasts, f: impl FnOnce(&mut Toasts) -> eyre::Result<T>) -> Option<T> {
    match f(toasts) {
        Ok(v) => Some(v),
        Err(e) => {
            toasts.error(format!("{e}"));
            error!("{:#}", e);
            None
        }
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
    let config = ViewerConfig::load();
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height]),
        ..Default::default()
    };
    let (main_tx, handler_rx) = mpsc::channel();
    let (handler_tx, main_rx) = mpsc::channel();
    let _ = thread::spawn(|| handler_thread(handler_rx, handler_tx));
    eframe::run_native(
        &i18n!("title"),
        native_options,
        Box::new(|cc| {
            Ok(Box::new(App::new(
                cc,
                Backend {
                    tx: main_tx,
                    rx: main_rx,
                },
                config,
            )))
        }),
    )
    .expect(&i18n!("error-start-failed"));
    std::process::exit(0)
}

/// Channel pair to the handler thread that does the file I/O.
pub struct Backend {
    tx: Sender<(egui::Context, HReq)>,
    rx: Receiver<eyre::Result<HRes>>,
}

impl Backend {
    pub fn tx(&mut self, ctx: &egui::Context, req: HReq) -> eyre::Result<()> {
        self.tx.send((ctx.clone(), req))?;
        Ok(())
    }
}

/// What the overlay prints under each body sprite.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LabelMode {
    #[default]
    Name,
    Class,
    Atmosphere,
    Off,
}

impl LabelMode {
    pub fn cycle(self) -> Self {
        match self {
            LabelMode::Name => LabelMode::Class,
            LabelMode::Class => LabelMode::Atmosphere,
            LabelMode::Atmosphere => LabelMode::Off,
            LabelMode::Off => LabelMode::Name,
        }
    }
}

/// The one simulation context threaded through every frame: the composed
/// system, the clock, and the view state. Nothing else holds a copy.
pub struct Simulation {
    pub system: SystemMap,
    pub clock: SimClock,
    pub camera: Camera,
    pub system_name: String,
    pub coords: SystemCoords,
    pub label_mode: LabelMode,
}

impl Simulation {
    fn empty() -> Self {
        Self {
            system: SystemMap::default(),
            clock: SimClock::now(),
            camera: Camera::default(),
            system_name: i18n!("no-system"),
            coords: SystemCoords::default(),
            label_mode: LabelMode::Name,
        }
    }

    /// Swap in a freshly built system. The old map is dropped whole, so no
    /// tick ever sees a half-updated tree.
    pub fn replace_system(
        &mut self,
        system: SystemMap,
        name: String,
        coords: SystemCoords,
        viewport: (f64, f64),
    ) {
        self.system = system;
        self.system_name = name;
        self.coords = coords;
        self.camera.reset_orientation();
        self.camera.fit_to_plane(self.system.plane_radius(), viewport);
    }

    pub fn reset_view(&mut self, viewport: (f64, f64)) {
        self.system.set_focus(None);
        self.camera.reset_orientation();
        self.camera.fit_to_plane(self.system.plane_radius(), viewport);
    }
}

struct App {
    sim: Simulation,
    backend: Backend,
    toasts: Toasts,
    config: ViewerConfig,
    controls: controls::TimeControls,
    show_bodies: bool,
    loading: bool,
}

impl App {
    fn new(cc: &eframe::CreationContext, backend: Backend, config: ViewerConfig) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let mut sim = Simulation::empty();
        sim.camera.fit_to_plane(
            sim.system.plane_radius(),
            (f64::from(config.window_width), f64::from(config.window_height)),
        );
        Self {
            sim,
            backend,
            toasts: Toasts::default(),
            config,
            controls: controls::TimeControls::default(),
            show_bodies: false,
            loading: false,
        }
    }

    fn open_dump_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            let req = HReq::LoadSystemDump {
                path,
                path_points: self.config.orbit_path_points,
            };
            if handle(&mut self.toasts, |_| self.backend.tx(ctx, req)).is_some() {
                self.loading = true;
            }
        }
    }

    fn handle_res(&mut self, res: eyre::Result<HRes>, viewport: (f64, f64)) {
        self.loading = false;
        match res {
            Ok(HRes::LoadedSystem {
                system,
                name,
                coords,
            }) => {
                self.toasts
                    .success(i18n_args!("toast-loaded", "bodies", system.len()));
                self.sim.replace_system(system, name, coords, viewport);
            }
            Err(e) => {
                self.toasts.error(format!("{e}"));
                error!("{:#}", e);
            }
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let screen = ctx.screen_rect();
        let viewport = (f64::from(screen.width()), f64::from(screen.height()));
        while let Ok(res) = self.backend.rx.try_recv() {
            self.handle_res(res, viewport);
        }

        // One full recompute per rendered frame, nothing incremental.
        let dt = f64::from(ctx.input(|i| i.stable_dt));
        self.sim.clock.advance(dt);
        self.sim.system.tick(self.sim.clock.current);

        egui::TopBottomPanel::top("menubar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button(i18n!("menu-file"), |ui| {
                    if ui.button(i18n!("menu-open-dump")).clicked() {
                        ui.close_menu();
                        self.open_dump_dialog(ctx);
                    }
                    if ui.button(i18n!("menu-quit")).clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button(i18n!("menu-view"), |ui| {
                    if ui.button(i18n!("menu-bodies")).clicked() {
                        ui.close_menu();
                        self.show_bodies = !self.show_bodies;
                    }
                });
                if self.loading {
                    ui.spinner();
                }
            });
        });

        controls::show_bottom_bar(ctx, &mut self.sim, &mut self.controls, viewport);
        if self.show_bodies {
            controls::show_bodies_window(ctx, &mut self.sim, &mut self.show_bodies);
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(egui::Color32::BLACK))
            .show(ctx, |ui| {
                view::show(ui, &mut self.sim, &self.config);
            });

        self.toasts.show(ctx);
        // The orrery animates even with no input events.
        ctx.request_repaint();
    }
}
