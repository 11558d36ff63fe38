//! Polyview Core Library - wireframe geometry, transforms and rasterization
//!
//! This library holds the stateless pieces of the viewer: the polyhedral mesh
//! model and its affine operators, the primitive factory, the look-at camera and
//! projection builders, and a depth-buffered line renderer. OBJ import/export and
//! TOML configuration round it out.

pub mod config;
pub mod geometry;
pub mod obj;
pub mod primitives;
pub mod projection;
pub mod render;
pub mod transform;

// Re-export commonly used types
pub use config::{ConfigError, ViewerConfig};
pub use geometry::{Edge, Face, Mesh, MeshError};
pub use obj::{load_obj, save_obj, ObjError};
pub use primitives::{Axis, Primitive, PrimitiveError, SurfaceFunction};
pub use projection::{Camera, CameraError, Projection, ProjectionMode};
pub use render::{Color, DrawStats, FrameSurface, RenderError, Renderer};
pub use transform::{Transform, TransformError, TransformOp};
