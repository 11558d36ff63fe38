//! Example: Load and render an OBJ file in the terminal
//!
//! Usage: cargo run --example load_obj -- path/to/file.obj
use polyview_core::{obj, primitives, ViewerConfig};
use polyview_terminal::TerminalApp;
use std::env;
use std::io;

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <obj-file>", args[0]);
        eprintln!("\nNo OBJ file provided, using default icosahedron...");
        let mut app = TerminalApp::new(primitives::icosahedron(), ViewerConfig::default())?;
        return app.run();
    }

    let obj_path = &args[1];

    println!("Loading OBJ file: {}", obj_path);

    let mesh = obj::load_obj(obj_path).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to load OBJ: {}", e),
        )
    })?;

    println!(
        "Loaded {} vertices, {} edges, {} faces",
        mesh.vertex_count(),
        mesh.edges().len(),
        mesh.faces().len()
    );
    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(mesh, ViewerConfig::default())?;
    app.run()
}
