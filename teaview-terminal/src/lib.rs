/// Terminal viewer: loads a mesh and a cubemap in the background and draws
/// them as coloured ASCII
use crossterm::{
    cursor,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::{error, info, warn};
use std::io::{stdout, Write};
use std::time::{Duration, Instant};
use teaview_core::{
    loader, CubemapImage, InputController, Key, LoadStatus, MeshData, PendingLoad, Readiness,
    RenderBackend, RenderError, RenderPass, SceneState, ShadingMode, SkyboxGeometry,
    ViewerConfig,
};

pub mod renderer;
pub mod shader;
pub mod texture;

pub use renderer::AsciiRenderer;
pub use texture::CubemapTexture;

/// Map a terminal key to a viewer key
pub fn key_from_code(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Up => Some(Key::ArrowUp),
        KeyCode::Down => Some(Key::ArrowDown),
        KeyCode::Left => Some(Key::ArrowLeft),
        KeyCode::Right => Some(Key::ArrowRight),
        KeyCode::Char('a') | KeyCode::Char('A') => Some(Key::A),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Key::D),
        _ => None,
    }
}

fn shading_choice(code: KeyCode) -> Option<ShadingMode> {
    match code {
        KeyCode::Char('1') => Some(ShadingMode::Shaded),
        KeyCode::Char('2') => Some(ShadingMode::Reflective),
        KeyCode::Char('3') => Some(ShadingMode::Refractive),
        _ => None,
    }
}

/// Main application struct for the terminal viewer
pub struct TerminalApp {
    config: ViewerConfig,
    scene: SceneState,
    input: InputController,
    pass: RenderPass,
    renderer: AsciiRenderer,
    mesh_load: Option<PendingLoad<MeshData>>,
    cubemap_loads: Vec<PendingLoad<CubemapImage>>,
    /// The terminal reports key releases; otherwise every press is released at once
    release_events: bool,
    running: bool,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    /// Size the viewer to the current terminal
    pub fn new(config: ViewerConfig) -> Result<Self, RenderError> {
        let (width, height) = terminal::size()?;
        Self::with_size(config, width as usize, height as usize)
    }

    /// Upload the skybox and start the background loads
    pub fn with_size(config: ViewerConfig, width: usize, height: usize) -> Result<Self, RenderError> {
        let mut renderer = AsciiRenderer::new(width, height);
        let mut pass = RenderPass::new();
        pass.upload_skybox(&SkyboxGeometry::new(config.skybox_half_extent), &mut renderer)?;

        info!(
            "Loading mesh {} and cubemap {}",
            config.mesh_path.display(),
            config.cubemap_dir.display()
        );
        let mesh_load = loader::load_mesh(&config.mesh_path, config.strict_parse);
        let cubemap_loads = loader::load_cubemap(&config.cubemap_dir);

        Ok(Self {
            scene: config.scene_state(),
            config,
            input: InputController::new(),
            pass,
            renderer,
            mesh_load: Some(mesh_load),
            cubemap_loads,
            release_events: false,
            running: true,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once the mesh load has resolved and every cubemap face has arrived or failed
    pub fn loads_settled(&self) -> bool {
        self.mesh_load.is_none() && self.cubemap_loads.is_empty()
    }

    pub fn run(&mut self) -> Result<(), RenderError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        self.release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.release_events {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        info!("Key release events: {}", self.release_events);

        let result = self.main_loop();

        // Cleanup
        if self.release_events {
            execute!(stdout(), PopKeyboardEnhancementFlags)?;
        }
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), RenderError> {
        let target_frame_time = Duration::from_millis(1000 / u64::from(self.config.target_fps.max(1)));

        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::from_millis(0))? {
                let event = event::read()?;
                self.handle_event(event);
            }

            self.poll_loads()?;
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key_event) => self.handle_key(key_event),
            Event::Resize(width, height) => self.renderer.resize(width as usize, height as usize),
            Event::FocusLost => self.input.release_all(),
            _ => {}
        }
    }

    fn handle_key(&mut self, event: KeyEvent) {
        if event.kind == KeyEventKind::Release {
            if let Some(key) = key_from_code(event.code) {
                self.input.key_up(key);
            }
            return;
        }

        let ctrl_c =
            event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || matches!(event.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.running = false;
            return;
        }

        if let Some(mode) = shading_choice(event.code) {
            self.scene.shading.select(mode);
            info!("Shading mode {}", mode.label());
            return;
        }

        if let Some(key) = key_from_code(event.code) {
            self.input.key_down(key, &mut self.scene);
            if !self.release_events {
                self.input.key_up(key);
            }
        }
    }

    /// Hand finished background loads to the renderer without blocking
    pub fn poll_loads(&mut self) -> Result<(), RenderError> {
        if let Some(pending) = &self.mesh_load {
            match pending.poll() {
                LoadStatus::Pending => {}
                LoadStatus::Ready(mesh) => {
                    self.mesh_load = None;
                    self.pass.upload_mesh(&mesh, &mut self.renderer)?;
                }
                LoadStatus::Failed(err) => {
                    self.mesh_load = None;
                    self.pass.mark_mesh_failed(&err);
                }
            }
        }

        let mut still_pending = Vec::with_capacity(self.cubemap_loads.len());
        for pending in std::mem::take(&mut self.cubemap_loads) {
            match pending.poll() {
                LoadStatus::Pending => still_pending.push(pending),
                LoadStatus::Ready(image) => {
                    if let Err(err) = self.renderer.upload_cubemap_face(&image) {
                        error!("Cubemap face {:?} upload failed: {}", image.face(), err);
                    }
                }
                LoadStatus::Failed(err) => {
                    warn!("Cubemap face {} failed to load: {}", pending.label(), err);
                }
            }
        }
        self.cubemap_loads = still_pending;
        Ok(())
    }

    /// Compose the frame through the render pass
    pub fn render_frame(&mut self) -> Result<(), RenderError> {
        self.pass.render_frame(&self.scene, &mut self.renderer)?;
        Ok(())
    }

    fn status_line(&self) -> String {
        let status = match self.pass.mesh_readiness() {
            Readiness::Pending => "loading",
            Readiness::Ready => "ready",
            Readiness::Failed => "mesh failed",
        };
        let modes: Vec<&str> = self.scene.shading.active_modes().map(ShadingMode::label).collect();
        format!(
            "teaview | {} | FPS: {:.1} | spin {:.0} eye z {:.2} orbit {:.0} | {} | A/D spin, Up/Down zoom, Left/Right orbit, 1-3 shading mode, Q quit",
            status,
            self.fps,
            self.scene.spin_degrees,
            self.scene.camera.eye.z,
            self.scene.orbit_degrees,
            if modes.is_empty() { "no shading".to_string() } else { modes.join("+") },
        )
    }

    fn render(&mut self) -> Result<(), RenderError> {
        if let Err(err) = self.render_frame() {
            error!("Frame aborted: {}", err);
            return Err(err);
        }

        let mut stdout = stdout();
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        let mut line = self.status_line();
        line.truncate(self.renderer.width());
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(line),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
