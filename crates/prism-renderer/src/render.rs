//! Scene traversal that turns a node subtree into draws.

use glam::Mat4;
use prism_core::{Camera, Mesh, NodeId, Scene, Uniforms};
use tracing::{debug, error};

use crate::context::{DrawCall, RenderingContext};
use crate::device::GraphicsDevice;
use crate::error::{RenderError, Result};
use crate::traits::DrawTarget;

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Meshes drawn.
    pub draws: usize,
    /// Visible nodes reached, with or without a mesh.
    pub nodes_visited: usize,
}

/// Draws every visible mesh under `root` into `target`, parents before
/// children.
///
/// Hidden nodes prune their subtree. The target is prepared before each
/// draw, and each draw receives `localToWorld`, `worldToView`, `localToView`
/// and `viewToScreen` for the target's size at that point, overridden by the
/// material's own uniforms. A failing draw is logged and the traversal
/// continues; the failures are reported together at the end.
pub fn render_scene<D, T>(
    ctx: &mut RenderingContext<D>,
    target: &mut T,
    scene: &mut Scene,
    root: NodeId,
    camera: &Camera,
) -> Result<FrameStats>
where
    D: GraphicsDevice,
    T: DrawTarget + ?Sized,
{
    let world_to_view = camera.world_to_view(&mut scene.nodes)?;
    let root_parent = match scene.nodes.parent(root)? {
        Some(parent) => scene.nodes.local_to_world(parent)?,
        None => Mat4::IDENTITY,
    };

    let mut stats = FrameStats::default();
    let mut failed = 0;
    let mut first_error = None;
    let mut stack = vec![(root, root_parent)];

    while let Some((id, parent_to_world)) = stack.pop() {
        let node = scene.nodes.node_mut(id)?;
        if !node.is_visible() {
            continue;
        }
        stats.nodes_visited += 1;
        let local_to_world = parent_to_world * node.local_to_parent();
        let mesh = node.mesh();
        stack.extend(node.children().iter().rev().map(|child| (*child, local_to_world)));

        let Some(mesh) = mesh else {
            continue;
        };
        let drawn = target.prepare(ctx).and_then(|()| {
            let matrices = Matrices {
                local_to_world,
                world_to_view,
                view_to_screen: camera.view_to_screen(target.aspect_ratio()),
            };
            draw_mesh(ctx, target, scene, mesh, &matrices)
        });
        match drawn {
            Ok(()) => stats.draws += 1,
            Err(err) => {
                error!(node = id.index(), %err, "draw failed");
                failed += 1;
                first_error.get_or_insert(err);
            }
        }
    }

    debug!(draws = stats.draws, nodes = stats.nodes_visited, failed, "scene rendered");
    match first_error {
        Some(first) => Err(RenderError::DrawsFailed {
            failed,
            first: Box::new(first),
        }),
        None => Ok(stats),
    }
}

struct Matrices {
    local_to_world: Mat4,
    world_to_view: Mat4,
    view_to_screen: Mat4,
}

fn draw_mesh<D, T>(
    ctx: &mut RenderingContext<D>,
    target: &T,
    scene: &Scene,
    mesh: Mesh,
    matrices: &Matrices,
) -> Result<()>
where
    D: GraphicsDevice,
    T: DrawTarget + ?Sized,
{
    let geometry = scene.geometries.try_get(mesh.geometry)?;
    let material = scene.materials.try_get(mesh.material)?;

    let mut uniforms = Uniforms::new()
        .with("localToWorld", matrices.local_to_world)
        .with("worldToView", matrices.world_to_view)
        .with(
            "localToView",
            matrices.world_to_view * matrices.local_to_world,
        )
        .with("viewToScreen", matrices.view_to_screen);
    uniforms.merge(material.uniforms());

    ctx.draw(
        &target.binding(),
        &DrawCall {
            material,
            geometry,
            uniforms: &uniforms,
            textures: &scene.textures,
        },
    )
}
