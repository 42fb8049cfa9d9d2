//! Hierarchical transforms and matrix helpers.
//!
//! Node 0 is the root and holds the entity's world matrix. Every other node
//! is a sub-part matrix local to its parent in the mesh hierarchy; the
//! renderer resolves the hierarchy, the simulation only edits local matrices.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Matrix operations used by agents.
///
/// Matrices follow glam's column layout: `x_axis`, `y_axis` and `z_axis` are
/// the local right, up and forward axes (scaled), `w_axis` is the position.
pub trait MatrixExt {
    /// Translation part.
    fn position(&self) -> Vec3;
    /// Replace the translation part.
    fn set_position(&mut self, position: Vec3);
    /// Unit forward (local Z) axis.
    fn forward(&self) -> Vec3;
    /// Unit right (local X) axis.
    fn right(&self) -> Vec3;
    /// Move along the local Z axis by `distance`, ignoring scale.
    fn move_local_z(&mut self, distance: f32);
    /// Rotate about the local X axis.
    fn rotate_local_x(&mut self, angle: f32);
    /// Rotate about the local Y axis.
    fn rotate_local_y(&mut self, angle: f32);
    /// Rotate about the local Z axis.
    fn rotate_local_z(&mut self, angle: f32);
    /// Length of the local X axis.
    fn uniform_scale(&self) -> f32;
    /// Rescale all three axes to `scale`, keeping orientation and position.
    fn set_uniform_scale(&mut self, scale: f32);
}

impl MatrixExt for Mat4 {
    fn position(&self) -> Vec3 {
        self.w_axis.truncate()
    }

    fn set_position(&mut self, position: Vec3) {
        self.w_axis = position.extend(1.0);
    }

    fn forward(&self) -> Vec3 {
        self.z_axis.truncate().normalize_or_zero()
    }

    fn right(&self) -> Vec3 {
        self.x_axis.truncate().normalize_or_zero()
    }

    fn move_local_z(&mut self, distance: f32) {
        let step = self.forward() * distance;
        self.w_axis += step.extend(0.0);
    }

    fn rotate_local_x(&mut self, angle: f32) {
        *self *= Mat4::from_rotation_x(angle);
    }

    fn rotate_local_y(&mut self, angle: f32) {
        *self *= Mat4::from_rotation_y(angle);
    }

    fn rotate_local_z(&mut self, angle: f32) {
        *self *= Mat4::from_rotation_z(angle);
    }

    fn uniform_scale(&self) -> f32 {
        self.x_axis.truncate().length()
    }

    fn set_uniform_scale(&mut self, scale: f32) {
        self.x_axis = (self.x_axis.truncate().normalize_or_zero() * scale).extend(0.0);
        self.y_axis = (self.y_axis.truncate().normalize_or_zero() * scale).extend(0.0);
        self.z_axis = (self.z_axis.truncate().normalize_or_zero() * scale).extend(0.0);
    }
}

/// Build a world matrix from a position, Euler rotation in degrees and a
/// uniform scale. Rotation is applied Z, then X, then Y.
#[must_use]
pub fn compose(position: Vec3, rotation_degrees: Vec3, scale: f32) -> Mat4 {
    let rotation = Quat::from_euler(
        EulerRot::YXZ,
        rotation_degrees.y.to_radians(),
        rotation_degrees.x.to_radians(),
        rotation_degrees.z.to_radians(),
    );
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, position)
}

/// Root plus sub-part matrices for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Transforms {
    nodes: Vec<Mat4>,
}

impl Transforms {
    /// Root set to `root`, `node_count - 1` identity sub-part matrices.
    ///
    /// A node count of zero still yields a root.
    #[must_use]
    pub fn new(root: Mat4, node_count: usize) -> Self {
        let mut nodes = vec![Mat4::IDENTITY; node_count.max(1)];
        nodes[0] = root;
        Self { nodes }
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; there is at least a root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root world matrix.
    #[must_use]
    pub fn root(&self) -> &Mat4 {
        &self.nodes[0]
    }

    /// Mutable root world matrix.
    pub fn root_mut(&mut self) -> &mut Mat4 {
        &mut self.nodes[0]
    }

    /// Matrix for node `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Mat4> {
        self.nodes.get(index)
    }

    /// Mutable matrix for node `index`.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut Mat4> {
        self.nodes.get_mut(index)
    }

    /// All matrices in node order.
    #[must_use]
    pub fn as_slice(&self) -> &[Mat4] {
        &self.nodes
    }
}
