//! Depth-buffered wireframe rasterizer.
//!
//! A draw call culls back faces in object space, projects the surviving vertices
//! through `projection * view`, and steps each face edge with Bresenham's
//! algorithm while interpolating depth. Depth is stored as `-z_ndc`, so the
//! nearer of two samples has the greater value and wins the depth test.
use log::debug;
use nalgebra::{Matrix4, Point3};
use thiserror::Error;

use crate::geometry::Mesh;
use crate::projection::{Camera, CameraError, Projection};
use crate::transform::Transform;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("cannot build view matrix: {0}")]
    Camera(#[from] CameraError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

/// Row-major pixel grid written by the renderer.
#[derive(Debug, Clone)]
pub struct FrameSurface {
    width: usize,
    height: usize,
    background: Color,
    pixels: Vec<Color>,
}

impl FrameSurface {
    pub fn new(width: usize, height: usize, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Color> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// Number of pixels that differ from the background.
    pub fn painted(&self) -> usize {
        self.pixels.iter().filter(|&&c| c != self.background).count()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(self.background);
    }
}

/// Per-pixel depth scratch. Holds the greatest depth written since the last reset.
#[derive(Debug, Clone)]
pub struct DepthBuffer {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl DepthBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![f64::NEG_INFINITY; width * height],
        }
    }

    pub fn reset(&mut self) {
        self.values.fill(f64::NEG_INFINITY);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.values[y * self.width + x])
    }

    /// Store `depth` if it is greater than the current value.
    fn test_and_set(&mut self, index: usize, depth: f64) -> bool {
        if depth > self.values[index] {
            self.values[index] = depth;
            true
        } else {
            false
        }
    }
}

/// Maps normalized device x/y to pixels: `(cx + x * scale, cy - y * scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub scale: f64,
}

impl Viewport {
    pub fn centered(width: usize, height: usize, scale: f64) -> Self {
        Self {
            center_x: width as f64 / 2.0,
            center_y: height as f64 / 2.0,
            scale,
        }
    }
}

/// A projected vertex: integer pixel position plus depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
    pub depth: f64,
}

/// Project a world-space point. When the homogeneous `w` is zero the
/// perspective divide is skipped and the raw clip coordinates are used.
pub fn project_point(
    view_projection: &Matrix4<f64>,
    point: &Point3<f64>,
    viewport: &Viewport,
) -> ScreenPoint {
    let clip = view_projection * point.to_homogeneous();
    let ndc = if clip.w != 0.0 {
        clip.xyz() / clip.w
    } else {
        clip.xyz()
    };

    ScreenPoint {
        x: (viewport.center_x + ndc.x * viewport.scale) as i32,
        y: (viewport.center_y - ndc.y * viewport.scale) as i32,
        depth: -ndc.z,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Drawing,
}

/// Counters for a single draw call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub faces_drawn: usize,
    pub faces_culled: usize,
    pub edges_drawn: usize,
    pub pixels_written: usize,
}

/// A registered mesh and the color of its strokes.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub mesh: Mesh,
    pub color: Color,
}

/// Owns the frame surface, the depth buffer and the scene list.
///
/// Draw calls take `&mut self`, so a renderer never runs two draws at once;
/// independent scenes that must draw concurrently need their own renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    surface: FrameSurface,
    depth: DepthBuffer,
    viewport: Viewport,
    objects: Vec<SceneObject>,
    state: RenderState,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_options(width, height, 100.0, Color::WHITE)
    }

    pub fn with_options(width: usize, height: usize, scale: f64, background: Color) -> Self {
        Self {
            surface: FrameSurface::new(width, height, background),
            depth: DepthBuffer::new(width, height),
            viewport: Viewport::centered(width, height, scale),
            objects: Vec::new(),
            state: RenderState::Idle,
        }
    }

    pub fn surface(&self) -> &FrameSurface {
        &self.surface
    }

    pub fn depth_buffer(&self) -> &DepthBuffer {
        &self.depth
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.viewport.scale = scale;
    }

    /// Reallocate the surface and depth buffer, keeping the scene and scale.
    pub fn resize(&mut self, width: usize, height: usize) {
        let background = self.surface.background;
        self.surface = FrameSurface::new(width, height, background);
        self.depth = DepthBuffer::new(width, height);
        self.viewport = Viewport::centered(width, height, self.viewport.scale);
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Register a mesh; returns its position in draw order.
    pub fn add_mesh(&mut self, mesh: Mesh, color: Color) -> usize {
        self.objects.push(SceneObject { mesh, color });
        self.objects.len() - 1
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [SceneObject] {
        &mut self.objects
    }

    pub fn mesh_mut(&mut self, id: usize) -> Option<&mut Mesh> {
        self.objects.get_mut(id).map(|object| &mut object.mesh)
    }

    /// Drop every registered mesh. Ids handed out before are no longer valid.
    pub fn clear_scene(&mut self) {
        self.objects.clear();
    }

    /// Redraw every registered mesh, in insertion order.
    pub fn draw(&mut self, camera: &Camera, projection: &Projection) -> Result<DrawStats, RenderError> {
        let view = camera.view_matrix()?;
        let view_projection = Transform::view_projection(&view, &projection.matrix());

        debug_assert_eq!(self.state, RenderState::Idle);
        self.state = RenderState::Drawing;
        self.surface.clear();
        self.depth.reset();

        let mut stats = DrawStats::default();
        let mut canvas = Canvas {
            surface: &mut self.surface,
            depth: &mut self.depth,
            stats: &mut stats,
        };
        for object in &self.objects {
            canvas.draw_mesh(&object.mesh, object.color, &view_projection, &camera.position, &self.viewport);
        }

        self.state = RenderState::Idle;
        debug!(
            "drew {} faces ({} culled), {} edges, {} pixels",
            stats.faces_drawn, stats.faces_culled, stats.edges_drawn, stats.pixels_written
        );
        Ok(stats)
    }
}

/// Mutable borrows held for the span of one draw call.
struct Canvas<'a> {
    surface: &'a mut FrameSurface,
    depth: &'a mut DepthBuffer,
    stats: &'a mut DrawStats,
}

impl Canvas<'_> {
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        color: Color,
        view_projection: &Matrix4<f64>,
        eye: &Point3<f64>,
        viewport: &Viewport,
    ) {
        let projected: Vec<ScreenPoint> = mesh
            .vertices()
            .iter()
            .map(|v| project_point(view_projection, v, viewport))
            .collect();

        // Edge-only meshes have no orientation to cull by.
        if mesh.faces().is_empty() {
            for edge in mesh.edges() {
                self.draw_line(projected[edge.a()], projected[edge.b()], color);
            }
            return;
        }

        for face in mesh.faces() {
            if !mesh.is_face_visible(face, eye) {
                self.stats.faces_culled += 1;
                continue;
            }
            self.stats.faces_drawn += 1;
            for (a, b) in face.boundary() {
                self.draw_line(projected[a], projected[b], color);
            }
        }
    }

    fn draw_line(&mut self, start: ScreenPoint, end: ScreenPoint, color: Color) {
        self.stats.edges_drawn += 1;
        let Some((start, end)) = clip_to_surface(start, end, self.surface.width, self.surface.height)
        else {
            return;
        };

        let (mut x, mut y) = (i64::from(start.x), i64::from(start.y));
        let (x_end, y_end) = (i64::from(end.x), i64::from(end.y));
        let dx = (x_end - x).abs();
        let dy = (y_end - y).abs();
        let sx = if x < x_end { 1 } else { -1 };
        let sy = if y < y_end { 1 } else { -1 };
        let mut err = dx - dy;

        let length = dx.max(dy);
        let z_step = if length != 0 {
            (end.depth - start.depth) / length as f64
        } else {
            0.0
        };
        let mut z = start.depth;

        let (width, height) = (self.surface.width as i64, self.surface.height as i64);
        loop {
            if (0..width).contains(&x) && (0..height).contains(&y) {
                let index = (y * width + x) as usize;
                if self.depth.test_and_set(index, z) {
                    self.surface.pixels[index] = color;
                    self.stats.pixels_written += 1;
                }
            }

            if x == x_end && y == y_end {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
            z += z_step;
        }
    }
}

/// Liang-Barsky clip of a screen segment to the surface rectangle.
///
/// Segments already inside are returned untouched; clipped endpoints are rounded
/// back to pixels and their depth interpolated at the clip parameter.
fn clip_to_surface(
    a: ScreenPoint,
    b: ScreenPoint,
    width: usize,
    height: usize,
) -> Option<(ScreenPoint, ScreenPoint)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x0, y0) = (f64::from(a.x), f64::from(a.y));
    let dx = f64::from(b.x) - x0;
    let dy = f64::from(b.y) - y0;
    let (x_max, y_max) = ((width - 1) as f64, (height - 1) as f64);

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, x0), (dx, x_max - x0), (-dy, y0), (dy, y_max - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    if t0 == 0.0 && t1 == 1.0 {
        return Some((a, b));
    }
    let at = |t: f64| ScreenPoint {
        x: (x0 + t * dx).round() as i32,
        y: (y0 + t * dy).round() as i32,
        depth: a.depth + t * (b.depth - a.depth),
    };
    Some((at(t0), at(t1)))
}
