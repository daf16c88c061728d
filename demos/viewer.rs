//! Opens the viewer over a directory of assets (default `./public`).
//!
//! ```text
//! cargo run --example viewer -- path/to/assets
//! ```
//!
//! The directory must contain `model.obj`, `texture.jpg` and `environment.hdr`.

use std::rc::Rc;

use orbitview::prelude::*;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let root = std::env::args().nth(1).unwrap_or_else(|| "public".to_string());
    log::info!("Serving assets from '{}'", root);

    let mut app = ViewerApp::new(ViewerConfig::default(), Rc::new(FileSource::new(root)))?;
    app.set_progress_listener(|percentage| log::info!("Loading {}%", percentage));
    app.run()
}
