//! Polyview Terminal Viewer
//!
//! Usage: polyview-terminal [--config viewer.toml] [mesh.obj | primitive-name]
//!
//! Controls:
//!   - x/X y/Y z/Z: Move the camera along an axis
//!   - Arrows, PgUp/PgDn: Move the look-at target
//!   - 1-6: Cube, tetrahedron, octahedron, icosahedron, dodecahedron, sphere
//!   - p: Toggle perspective/orthographic
//!   - r/R, +/-, m: Spin, scale, mirror the mesh
//!   - ':': Command line (translate, scale, rotate, reflect, rotate-line, load, save)
//!   - Q/ESC: Quit
use polyview_core::{load_obj, Primitive, ViewerConfig};
use polyview_terminal::TerminalApp;
use std::env;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let mut config_path = None;
    let mut source = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => config_path = Some(args.next().ok_or("--config needs a path")?),
            _ => source = Some(arg),
        }
    }

    let config = match config_path {
        Some(path) => ViewerConfig::load(&path)?,
        None => ViewerConfig::default(),
    };

    let mesh = match source {
        Some(source) if source.ends_with(".obj") => load_obj(&source)?,
        Some(name) => name.parse::<Primitive>()?.build(),
        None => Primitive::Cube.build(),
    };
    log::info!(
        "starting viewer with {} vertices, {} faces",
        mesh.vertex_count(),
        mesh.faces().len()
    );

    let mut app = TerminalApp::new(mesh, config)?;
    app.run()?;
    Ok(())
}
