//! Seams to the rendering side of the game.
//!
//! The simulation never touches GPU state. It needs three things from the
//! outside world:
//!
//! - a [`GeometrySource`] that loads a mesh and reports how many nodes its
//!   hierarchy has, so entity transforms can be sized
//! - a [`Renderer`] that draws one entity with its template geometry
//! - a [`Camera`] that maps world points to pixels and back, for labels and
//!   point-and-click targeting
//!
//! [`HeadlessGeometry`] and [`PerspectiveCamera`] are in-crate implementations
//! used by the headless runner and tests.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use std::collections::BTreeMap;

use crate::entity::{Entity, EntityId, Geometry, ImportFlags};

// =============================================================================
// Geometry
// =============================================================================

/// Loads meshes for templates.
pub trait GeometrySource {
    /// Load `mesh` with `flags`, returning a handle and node count or a reason
    /// for failure.
    fn load(&mut self, mesh: &str, flags: ImportFlags) -> Result<Geometry, String>;
}

/// Geometry source that loads nothing and answers node counts from a table.
///
/// Unknown meshes get `default_nodes` if set and fail otherwise. A mesh
/// imported with [`ImportFlags::FLATTEN_HIERARCHY`] always has a single node.
#[derive(Debug, Clone)]
pub struct HeadlessGeometry {
    node_counts: BTreeMap<String, usize>,
    default_nodes: Option<usize>,
    next_handle: u64,
}

impl HeadlessGeometry {
    /// Every mesh loads with `default_nodes` nodes unless listed otherwise.
    #[must_use]
    pub fn lenient(default_nodes: usize) -> Self {
        Self {
            node_counts: BTreeMap::new(),
            default_nodes: Some(default_nodes),
            next_handle: 1,
        }
    }

    /// Only meshes added with [`with_mesh`](Self::with_mesh) load.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            node_counts: BTreeMap::new(),
            default_nodes: None,
            next_handle: 1,
        }
    }

    /// Register a mesh and its node count.
    #[must_use]
    pub fn with_mesh(mut self, mesh: impl Into<String>, node_count: usize) -> Self {
        self.node_counts.insert(mesh.into(), node_count);
        self
    }
}

impl GeometrySource for HeadlessGeometry {
    fn load(&mut self, mesh: &str, flags: ImportFlags) -> Result<Geometry, String> {
        if mesh.is_empty() {
            return Err("empty mesh reference".to_string());
        }
        let listed = self.node_counts.get(mesh).copied().or(self.default_nodes);
        let Some(nodes) = listed else {
            return Err("file not found".to_string());
        };
        let node_count = if flags.contains(ImportFlags::FLATTEN_HIERARCHY) {
            1
        } else {
            nodes.max(1)
        };
        let handle = self.next_handle;
        self.next_handle += 1;
        Ok(Geometry { handle, node_count })
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Draws entities.
pub trait Renderer {
    /// Draw `entity` using its template's `geometry`.
    fn render(&mut self, entity: &Entity, geometry: Geometry);
}

/// Renderer that records what it was asked to draw.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    /// Entities drawn, in call order
    pub drawn: Vec<EntityId>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, entity: &Entity, _geometry: Geometry) {
        self.drawn.push(entity.id());
    }
}

// =============================================================================
// Camera
// =============================================================================

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in pixels
    pub width: f32,
    /// Height in pixels
    pub height: f32,
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// Conversions between world space and screen pixels.
pub trait Camera {
    /// Pixel position of `world` plus its camera-space depth, or `None` if
    /// the point is in front of the near clip plane.
    fn pixel_from_world(&self, world: Vec3, viewport: Viewport) -> Option<Vec3>;

    /// Point where the ray through `pixel` meets the horizontal plane at
    /// height `plane_y`, or `None` if the ray misses it.
    fn world_from_pixel_on_plane(&self, pixel: Vec2, viewport: Viewport, plane_y: f32) -> Option<Vec3>;
}

/// Left-handed perspective camera looking down its local Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Camera world matrix
    pub transform: Mat4,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl PerspectiveCamera {
    /// Camera at `position` looking at `target`.
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let view = Mat4::look_at_lh(position, target, Vec3::Y);
        Self {
            transform: view.inverse(),
            fov_y: std::f32::consts::FRAC_PI_3,
            near: 1.0,
            far: 100_000.0,
        }
    }

    fn view(&self) -> Mat4 {
        self.transform.inverse()
    }

    fn projection(&self, viewport: Viewport) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, viewport.aspect(), self.near, self.far)
    }
}

impl Camera for PerspectiveCamera {
    fn pixel_from_world(&self, world: Vec3, viewport: Viewport) -> Option<Vec3> {
        let camera_pt = self.view().transform_point3(world);
        if camera_pt.z < self.near {
            return None;
        }
        let clip = self.projection(viewport) * camera_pt.extend(1.0);
        let ndc = clip.xy() / clip.w;
        let x = (ndc.x + 1.0) * viewport.width * 0.5;
        let y = (1.0 - ndc.y) * viewport.height * 0.5;
        Some(Vec3::new(x, y, camera_pt.z))
    }

    fn world_from_pixel_on_plane(&self, pixel: Vec2, viewport: Viewport, plane_y: f32) -> Option<Vec3> {
        if viewport.width <= 0.0 || viewport.height <= 0.0 {
            return None;
        }
        let ndc_x = 2.0 * pixel.x / viewport.width - 1.0;
        let ndc_y = 1.0 - 2.0 * pixel.y / viewport.height;
        let inv = (self.projection(viewport) * self.view()).inverse();

        let near = inv.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        let dir = (far - near).normalize_or_zero();
        if dir.y.abs() < 1e-6 {
            return None;
        }
        let t = (plane_y - near.y) / dir.y;
        if t < 0.0 {
            return None;
        }
        let mut hit = near + dir * t;
        hit.y = plane_y;
        Some(hit)
    }
}

/// A piece of text anchored at a pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Entity the label describes
    pub entity: EntityId,
    /// Pixel position
    pub pixel: Vec2,
    /// Camera-space depth, for sorting
    pub depth: f32,
    /// Text lines
    pub lines: Vec<String>,
}
