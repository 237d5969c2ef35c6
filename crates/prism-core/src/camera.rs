//! Cameras: a node for placement plus a projection.

use glam::{Mat4, Vec2};

use crate::error::Result;
use crate::node::{NodeId, NodeStore};

/// View-to-screen projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        near: f32,
        far: f32,
        zoom: f32,
    },
    /// Orthographic box `height` units tall, centered on `center`.
    Orthographic {
        height: f32,
        center: Vec2,
        near: f32,
        far: f32,
        zoom: f32,
    },
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Self::Perspective {
            fov_y_degrees,
            near,
            far,
            zoom: 1.0,
        }
    }

    pub fn orthographic(height: f32, near: f32, far: f32) -> Self {
        Self::Orthographic {
            height,
            center: Vec2::ZERO,
            near,
            far,
            zoom: 1.0,
        }
    }

    /// Projection matrix for a target with the given width / height ratio.
    ///
    /// Zoom narrows the field of view (perspective) or shrinks the visible
    /// box (orthographic).
    pub fn view_to_screen(&self, aspect: f32) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_degrees,
                near,
                far,
                zoom,
            } => {
                let half = (fov_y_degrees.to_radians() * 0.5).tan() / zoom;
                Mat4::perspective_rh_gl(2.0 * half.atan(), aspect, near, far)
            }
            Projection::Orthographic {
                height,
                center,
                near,
                far,
                zoom,
            } => {
                let half_height = height * 0.5 / zoom;
                let half_width = half_height * aspect;
                Mat4::orthographic_rh_gl(
                    center.x - half_width,
                    center.x + half_width,
                    center.y - half_height,
                    center.y + half_height,
                    near,
                    far,
                )
            }
        }
    }
}

/// A camera placed by a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub node: NodeId,
    pub projection: Projection,
}

impl Camera {
    pub fn new(node: NodeId, projection: Projection) -> Self {
        Self { node, projection }
    }

    /// Inverse of the camera node's world transform.
    pub fn world_to_view(&self, nodes: &mut NodeStore) -> Result<Mat4> {
        nodes.world_to_local(self.node)
    }

    pub fn view_to_screen(&self, aspect: f32) -> Mat4 {
        self.projection.view_to_screen(aspect)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{Vec3, Vec4};

    use super::*;

    #[test]
    fn test_zoom_narrows_perspective() {
        let wide = Projection::perspective(90.0, 0.1, 10.0).view_to_screen(1.0);
        let zoomed = Projection::Perspective {
            fov_y_degrees: 90.0,
            near: 0.1,
            far: 10.0,
            zoom: 2.0,
        }
        .view_to_screen(1.0);
        // tan(45deg) = 1, zoomed by 2 => cot(half fov) doubles
        assert_relative_eq!(wide.y_axis.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(zoomed.y_axis.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_space() {
        let m = Projection::Orthographic {
            height: 2.0,
            center: Vec2::new(1.0, 0.0),
            near: 0.1,
            far: 4.0,
            zoom: 1.0,
        }
        .view_to_screen(2.0);
        // box spans x in [-1, 3], y in [-1, 1]
        let corner = m * Vec4::new(3.0, 1.0, -1.0, 1.0);
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_world_to_view_inverts_camera_placement() {
        let mut nodes = NodeStore::new();
        let eye = nodes.create_named("camera");
        nodes
            .node_mut(eye)
            .unwrap()
            .set_position(Vec3::new(0.0, 0.0, 5.0))
            .unwrap();
        let camera = Camera::new(eye, Projection::perspective(60.0, 0.1, 100.0));

        let view = camera.world_to_view(&mut nodes).unwrap();
        let origin = view.transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));
    }
}
