/// Example: parse a text mesh and report what the viewer would upload
///
/// Usage: cargo run --example mesh_info -- path/to/mesh.obj [--strict]
use std::env;
use std::error::Error;
use std::path::PathBuf;

use teaview_core::{loader, RenderPass};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1).map(PathBuf::from) else {
        eprintln!("Usage: {} <mesh-file> [--strict]", args[0]);
        std::process::exit(2);
    };
    let strict = args.iter().any(|arg| arg == "--strict");

    let mesh = loader::load_mesh(&path, strict).wait()?;
    println!("{}", path.display());
    println!("  vertices: {}", mesh.vertex_count());
    println!("  faces:    {}", mesh.face_count());

    if let Some(bounds) = mesh.bounding_box() {
        println!("  min:      {:?}", bounds.min);
        println!("  max:      {:?}", bounds.max);
        println!("  centre:   {:?}", bounds.center());
        println!("  offset:   {:?}", RenderPass::mesh_offset(bounds));
    }
    Ok(())
}
