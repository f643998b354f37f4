/// teaview terminal viewer
///
/// Usage: `teaview-terminal [config.toml]`
///
/// Controls:
///   - A / D: spin the mesh
///   - Up / Down: move the eye along Z
///   - Left / Right: orbit the view
///   - 1 / 2 / 3: shaded, reflective, refractive
///   - Q / ESC: quit
use std::error::Error;
use std::fs::File;
use std::path::Path;

use env_logger::{Env, Target};
use teaview_core::ViewerConfig;
use teaview_terminal::TerminalApp;

/// Logs go to a file so they don't tear the ASCII frame
fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load(Path::new(&path))?,
        None => ViewerConfig::default(),
    };
    init_logging(&config.log_file)?;
    log::info!("Starting teaview with {:?}", config);

    let mut app = TerminalApp::new(config)?;
    app.run()?;

    log::info!("teaview finished");
    Ok(())
}
