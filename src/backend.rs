use std::{
    fs,
    path::PathBuf,
    sync::mpsc::{Receiver, Sender},
};

use color_eyre::eyre::{self, WrapErr};
use orrery::{
    ingest::{self, SystemCoords},
    system::SystemMap,
};
use tracing::info;

use crate::{i18n, i18n_args};

pub enum HReq {
    /// Read and compose a system dump off the UI thread.
    LoadSystemDump { path: PathBuf, path_points: usize },
}

pub enum HRes {
    LoadedSystem {
        system: SystemMap,
        name: String,
        coords: SystemCoords,
    },
}

pub fn handler_thread(rx: Receiver<(egui::Context, HReq)>, tx: Sender<eyre::Result<HRes>>) {
    while let Ok((ctx, req)) = rx.recv() {
        let res = (|| match req {
            HReq::LoadSystemDump { path, path_points } => {
                info!(path = %path.display(), "loading system dump");
                let raw = fs::read_to_string(&path).wrap_err_with(|| {
                    i18n_args!("error-read-dump", "path", path.display().to_string())
                })?;
                let dump = ingest::parse_dump(&raw)?;
                let name = dump.name.clone().unwrap_or_else(|| {
                    path.file_stem()
                        .map_or_else(|| i18n!("no-system"), |s| s.to_string_lossy().into_owned())
                });
                let system = ingest::build_system(&dump.bodies, path_points);
                Ok(HRes::LoadedSystem {
                    system,
                    name,
                    coords: dump.coords,
                })
            }
        })();
        let _ = tx.send(res);
        ctx.request_repaint();
    }
}
