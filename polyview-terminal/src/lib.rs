//! Terminal front end for the polyview wireframe renderer
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::{debug, info};
use nalgebra::{Point3, Vector3};
use polyview_core::{
    load_obj, save_obj, Camera, DrawStats, Mesh, ObjError, Primitive, PrimitiveError, Projection,
    ProjectionMode, Renderer, SurfaceFunction, TransformError, TransformOp, ViewerConfig,
};
use std::io::{self, stdout, Write};
use std::time::Duration;
use thiserror::Error;

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Rows kept free at the bottom for the status line
const STATUS_ROWS: usize = 1;
/// Camera nudge per key press, in world units
const CAMERA_STEP: f64 = 1.0;
const ROTATE_STEP: f64 = std::f64::consts::PI / 12.0;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Transform(#[from] TransformError),
    #[error("{0}")]
    Obj(#[from] ObjError),
    #[error("{0}")]
    Primitive(#[from] PrimitiveError),
    #[error("{0}")]
    Camera(#[from] polyview_core::CameraError),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
}

/// Keyboard mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a `:` command; holds the text entered so far
    Command(String),
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    config: ViewerConfig,
    renderer: Renderer,
    ascii: AsciiRenderer,
    camera: Camera,
    projection: Projection,
    mode: InputMode,
    status: String,
    stats: DrawStats,
    running: bool,
}

impl TerminalApp {
    pub fn new(mesh: Mesh, config: ViewerConfig) -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        Ok(Self::with_size(mesh, config, columns as usize, rows as usize))
    }

    /// Build the app for a terminal of `columns` x `rows` characters.
    pub fn with_size(mesh: Mesh, config: ViewerConfig, columns: usize, rows: usize) -> Self {
        let ascii = AsciiRenderer::new(columns, rows.saturating_sub(STATUS_ROWS));
        let (width, height) = ascii.surface_size();

        let mut renderer = config.renderer();
        renderer.resize(width, height);
        renderer.set_scale(fitted_scale(&config, width, height));
        renderer.add_mesh(mesh, config.edge_color());

        Self {
            camera: config.camera(),
            projection: config.projection(),
            config,
            renderer,
            ascii,
            mode: InputMode::Normal,
            status: String::from("press : for commands, q to quit"),
            stats: DrawStats::default(),
            running: true,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mesh(&self) -> &Mesh {
        &self.renderer.objects()[0].mesh
    }

    pub fn ascii(&self) -> &AsciiRenderer {
        &self.ascii
    }

    fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.renderer.objects_mut()[0].mesh
    }

    fn replace_mesh(&mut self, mesh: Mesh) {
        self.renderer.clear_scene();
        self.renderer.add_mesh(mesh, self.config.edge_color());
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        self.redraw();
        self.present()?;

        while self.running {
            if !event::poll(Duration::from_millis(250))? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
                Event::Resize(columns, rows) => self.resize(columns as usize, rows as usize),
                _ => continue,
            }
            self.redraw();
            self.present()?;
        }

        Ok(())
    }

    fn resize(&mut self, columns: usize, rows: usize) {
        self.ascii = AsciiRenderer::new(columns, rows.saturating_sub(STATUS_ROWS));
        let (width, height) = self.ascii.surface_size();
        self.renderer.resize(width, height);
        self.renderer.set_scale(fitted_scale(&self.config, width, height));
    }

    /// Dispatch one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if let InputMode::Command(buffer) = &mut self.mode {
            match key.code {
                KeyCode::Esc => self.mode = InputMode::Normal,
                KeyCode::Enter => {
                    let line = std::mem::take(buffer);
                    self.mode = InputMode::Normal;
                    self.status = match self.execute(&line) {
                        Ok(message) => message,
                        Err(e) => format!("error: {e}"),
                    };
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return;
        }

        let result = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                Ok(())
            }
            KeyCode::Char(':') => {
                self.mode = InputMode::Command(String::new());
                Ok(())
            }
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                self.select_primitive(Primitive::ALL[index]);
                Ok(())
            }
            KeyCode::Char('p') => {
                self.toggle_projection();
                Ok(())
            }

            // Camera position
            KeyCode::Char('x') => self.nudge_camera(Vector3::x() * CAMERA_STEP),
            KeyCode::Char('X') => self.nudge_camera(-Vector3::x() * CAMERA_STEP),
            KeyCode::Char('y') => self.nudge_camera(Vector3::y() * CAMERA_STEP),
            KeyCode::Char('Y') => self.nudge_camera(-Vector3::y() * CAMERA_STEP),
            KeyCode::Char('z') => self.nudge_camera(Vector3::z() * CAMERA_STEP),
            KeyCode::Char('Z') => self.nudge_camera(-Vector3::z() * CAMERA_STEP),

            // Look-at target
            KeyCode::Right => self.nudge_target(Vector3::x() * CAMERA_STEP),
            KeyCode::Left => self.nudge_target(-Vector3::x() * CAMERA_STEP),
            KeyCode::Up => self.nudge_target(Vector3::y() * CAMERA_STEP),
            KeyCode::Down => self.nudge_target(-Vector3::y() * CAMERA_STEP),
            KeyCode::PageUp => self.nudge_target(Vector3::z() * CAMERA_STEP),
            KeyCode::PageDown => self.nudge_target(-Vector3::z() * CAMERA_STEP),

            // Quick transforms about the mesh's own center
            KeyCode::Char('r') => self.spin(ROTATE_STEP),
            KeyCode::Char('R') => self.spin(-ROTATE_STEP),
            KeyCode::Char('+') => self.apply(TransformOp::Scale(Vector3::repeat(1.1))),
            KeyCode::Char('-') => self.apply(TransformOp::Scale(Vector3::repeat(1.0 / 1.1))),
            KeyCode::Char('m') => self.apply(TransformOp::Reflect {
                normal: Vector3::x(),
                point: Point3::origin(),
            }),
            _ => Ok(()),
        };

        if let Err(e) = result {
            self.status = format!("error: {e}");
        }
    }

    /// Run a `:` command line and describe the outcome.
    ///
    /// Besides transform commands this understands `load <path>`, `save <path>`,
    /// `primitive <name>`, `surface <function>` and `projection <kind>`.
    pub fn execute(&mut self, line: &str) -> Result<String, CommandError> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let argument = rest.trim();
        let require = |name: &'static str| {
            if argument.is_empty() {
                Err(CommandError::MissingArgument(name))
            } else {
                Ok(argument)
            }
        };

        match keyword {
            "load" => {
                let path = require("load")?;
                let mesh = load_obj(path)?;
                let message = format!(
                    "loaded {path}: {} vertices, {} faces",
                    mesh.vertex_count(),
                    mesh.faces().len()
                );
                self.replace_mesh(mesh);
                Ok(message)
            }
            "save" => {
                let path = require("save")?;
                save_obj(self.mesh(), path)?;
                Ok(format!("saved {path}"))
            }
            "primitive" => {
                let primitive: Primitive = require("primitive")?.parse()?;
                self.select_primitive(primitive);
                Ok(format!("showing {primitive}"))
            }
            "surface" => {
                let function: SurfaceFunction = require("surface")?.parse()?;
                self.replace_mesh(function.build());
                Ok(format!("showing {function} surface"))
            }
            "projection" => {
                let mode: ProjectionMode = require("projection")?.parse()?;
                self.set_projection_mode(mode);
                Ok(format!("{mode} projection"))
            }
            _ => {
                let op: TransformOp = line.parse()?;
                self.apply(op.clone())?;
                Ok(format!("applied `{op}`"))
            }
        }
    }

    fn apply(&mut self, op: TransformOp) -> Result<(), TransformError> {
        info!("applying {op}");
        op.apply(self.mesh_mut())
    }

    /// Rotate about the vertical line through the mesh centroid.
    fn spin(&mut self, angle: f64) -> Result<(), TransformError> {
        let Some(center) = self.mesh().centroid() else {
            return Ok(());
        };
        let top = center + Vector3::z();
        self.apply(TransformOp::RotateAroundLine {
            p1: center,
            p2: top,
            angle,
        })
    }

    fn nudge_camera(&mut self, offset: Vector3<f64>) -> Result<(), TransformError> {
        self.camera.translate_position(offset);
        debug!("camera at {}", self.camera.position);
        Ok(())
    }

    fn nudge_target(&mut self, offset: Vector3<f64>) -> Result<(), TransformError> {
        self.camera.translate_look_at(offset);
        debug!("looking at {}", self.camera.look_at);
        Ok(())
    }

    fn select_primitive(&mut self, primitive: Primitive) {
        self.replace_mesh(primitive.build());
        self.status = format!("showing {primitive}");
    }

    /// Switch to `mode`, preferring the configured parameters when they match.
    fn set_projection_mode(&mut self, mode: ProjectionMode) {
        let configured = self.config.projection();
        self.projection = if configured.mode() == mode {
            configured
        } else {
            Projection::for_mode(mode)
        };
    }

    fn toggle_projection(&mut self) {
        let next = match self.projection.mode() {
            ProjectionMode::Perspective => ProjectionMode::Orthographic,
            ProjectionMode::Orthographic => ProjectionMode::Perspective,
        };
        self.set_projection_mode(next);
        self.status = format!("{next} projection");
    }

    /// Render the scene into the cell grid.
    pub fn redraw(&mut self) {
        match self.renderer.draw(&self.camera, &self.projection) {
            Ok(stats) => {
                self.stats = stats;
                self.ascii
                    .compose(self.renderer.surface(), self.renderer.depth_buffer());
            }
            Err(e) => self.status = format!("error: {e}"),
        }
    }

    fn present(&mut self) -> io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.ascii.draw(&mut stdout)?;

        // Status line
        let line = match &self.mode {
            InputMode::Command(buffer) => format!(":{buffer}"),
            InputMode::Normal => format!(
                "{} | {} | faces {}/{} | {}",
                self.projection.mode(),
                self.camera.position,
                self.stats.faces_drawn,
                self.stats.faces_drawn + self.stats.faces_culled,
                self.status
            ),
        };
        queue!(
            stdout,
            SetForegroundColor(Color::Yellow),
            Print(line),
            ResetColor,
            terminal::Clear(ClearType::UntilNewLine)
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Scale the configured framing to a surface of `width` x `height` pixels.
fn fitted_scale(config: &ViewerConfig, width: usize, height: usize) -> f64 {
    let reference = config.surface.width.min(config.surface.height).max(1) as f64;
    config.surface.scale * width.min(height) as f64 / reference
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use polyview_core::primitives;

    fn app() -> TerminalApp {
        TerminalApp::with_size(primitives::cube(2.0), ViewerConfig::default(), 80, 25)
    }

    fn press(app: &mut TerminalApp, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_command(app: &mut TerminalApp, text: &str) {
        press(app, KeyCode::Char(':'));
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn test_surface_follows_terminal_size() {
        let app = app();
        assert_eq!(app.renderer.surface().width(), 80);
        assert_eq!(app.renderer.surface().height(), 48);
        // 400x400 at scale 100 maps to 48 rows at scale 12.
        assert_eq!(app.renderer.viewport().scale, 12.0);
    }

    #[test]
    fn test_redraw_paints_cells() {
        let mut app = app();
        app.redraw();
        assert_eq!(app.stats.faces_drawn, 3);
        assert!(app.ascii().cells().iter().any(|c| c.glyph != ' '));
    }

    #[test]
    fn test_camera_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Char('Z'));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.camera().position, Point3::new(6.0, 5.0, 5.0));
        assert_eq!(app.camera().look_at, Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_primitive_and_projection_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.mesh().vertex_count(), 4);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.projection().mode(), ProjectionMode::Orthographic);
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(*app.projection(), Projection::default_perspective());
    }

    #[test]
    fn test_command_line_applies_transform() {
        let mut app = app();
        type_command(&mut app, "translate 1 2 3");
        assert_eq!(app.mode(), &InputMode::Normal);
        assert_eq!(app.mesh().centroid(), Some(Point3::new(1.0, 2.0, 3.0)));
        assert_eq!(app.status(), "applied `translate 1 2 3`");
    }

    #[test]
    fn test_bad_command_leaves_mesh_alone() {
        let mut app = app();
        let before = app.mesh().clone();
        type_command(&mut app, "rotate 1 0 0 0");
        assert_eq!(app.mesh(), &before);
        assert!(app.status().starts_with("error:"));

        type_command(&mut app, "scale 2 two 2");
        assert_eq!(app.mesh(), &before);
    }

    #[test]
    fn test_escape_cancels_command() {
        let mut app = app();
        press(&mut app, KeyCode::Char(':'));
        press(&mut app, KeyCode::Char('q'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode(), &InputMode::Normal);
        assert!(app.is_running());
    }

    #[test]
    fn test_save_and_load_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.obj");
        let path = path.to_str().unwrap();

        let mut app = app();
        app.execute(&format!("save {path}")).unwrap();
        app.execute("primitive octahedron").unwrap();
        assert_eq!(app.mesh().vertex_count(), 6);

        let message = app.execute(&format!("load {path}")).unwrap();
        assert!(message.contains("8 vertices"));
        assert_eq!(app.mesh().faces().len(), 6);

        assert!(matches!(
            app.execute("load"),
            Err(CommandError::MissingArgument("load"))
        ));
    }

    #[test]
    fn test_surface_command() {
        let mut app = app();
        assert_eq!(app.execute("surface saddle").unwrap(), "showing saddle surface");
        assert_eq!(app.renderer.objects().len(), 1);
        assert_eq!(app.mesh().faces().len(), 24 * 24);
        app.redraw();
        assert!(app.stats.faces_drawn > 0);

        assert!(matches!(
            app.execute("surface torus"),
            Err(CommandError::Primitive(PrimitiveError::UnknownSurface(_)))
        ));
        assert!(matches!(
            app.execute("surface"),
            Err(CommandError::MissingArgument("surface"))
        ));
    }

    #[test]
    fn test_non_finite_command_is_rejected() {
        let mut app = app();
        let before = app.mesh().clone();
        type_command(&mut app, "scale nan 1 1");
        assert_eq!(app.mesh(), &before);
        assert!(app.status().starts_with("error:"));
    }

    #[test]
    fn test_spin_keeps_centroid() {
        let mut app = app();
        app.execute("translate 3 -1 0").unwrap();
        press(&mut app, KeyCode::Char('r'));
        let center = app.mesh().centroid().unwrap();
        assert!((center - Point3::new(3.0, -1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_quit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.is_running());
    }
}
