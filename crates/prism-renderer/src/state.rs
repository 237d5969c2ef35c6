//! Value-type state blocks and the commands that move between them.
//!
//! Each block knows how to diff itself: [`StateBlock::transition`] returns
//! the minimal command list that takes the driver from one value to
//! another, field by field. The rendering context keeps the current value
//! of every block and runs its setters through these tables.

use glam::{UVec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::device::{
    BlendEquation, BlendFactor, Capability, CullFace, DepthFunc, DeviceCommand, FramebufferHandle,
    ProgramHandle,
};

/// A pixel rectangle, origin at the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle covering `size` from the origin.
    pub fn from_size(size: UVec2) -> Self {
        Self::new(0, 0, size.x as i32, size.y as i32)
    }
}

/// A block of driver state with a diff table.
pub trait StateBlock: Clone + PartialEq {
    /// Commands that move the driver from `from` to `to`. Empty when equal.
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand>;
}

fn toggle(capability: Capability, enabled: bool) -> DeviceCommand {
    if enabled {
        DeviceCommand::Enable(capability)
    } else {
        DeviceCommand::Disable(capability)
    }
}

/// The viewport rectangle.
impl StateBlock for Rect {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        if from == to {
            Vec::new()
        } else {
            vec![DeviceCommand::Viewport(*to)]
        }
    }
}

/// The scissor test: `None` disables it.
impl StateBlock for Option<Rect> {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        match (from, to) {
            (None, None) => Vec::new(),
            (Some(_), None) => vec![toggle(Capability::ScissorTest, false)],
            (None, Some(rect)) => vec![
                toggle(Capability::ScissorTest, true),
                DeviceCommand::Scissor(*rect),
            ],
            (Some(old), Some(new)) if old == new => Vec::new(),
            (Some(_), Some(new)) => vec![DeviceCommand::Scissor(*new)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlendState {
    pub enabled: bool,
    pub equation: BlendEquation,
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

impl BlendState {
    fn preset(equation: BlendEquation, src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            enabled: true,
            equation,
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
        }
    }

    /// Premultiplied-alpha "over" compositing.
    pub fn over() -> Self {
        Self::preset(BlendEquation::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha)
    }

    pub fn add() -> Self {
        Self::preset(BlendEquation::Add, BlendFactor::One, BlendFactor::One)
    }

    pub fn subtract() -> Self {
        Self::preset(BlendEquation::ReverseSubtract, BlendFactor::One, BlendFactor::One)
    }

    pub fn multiply() -> Self {
        Self::preset(BlendEquation::Add, BlendFactor::Zero, BlendFactor::SrcColor)
    }
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            equation: BlendEquation::Add,
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
        }
    }
}

impl StateBlock for BlendState {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        if from.enabled != to.enabled {
            commands.push(toggle(Capability::Blend, to.enabled));
        }
        if from.equation != to.equation {
            commands.push(DeviceCommand::BlendEquation(to.equation));
        }
        let factors = |s: &Self| (s.src_rgb, s.dst_rgb, s.src_alpha, s.dst_alpha);
        if factors(from) != factors(to) {
            commands.push(DeviceCommand::BlendFunc {
                src_rgb: to.src_rgb,
                dst_rgb: to.dst_rgb,
                src_alpha: to.src_alpha,
                dst_alpha: to.dst_alpha,
            });
        }
        commands
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DepthTestState {
    pub enabled: bool,
    pub func: DepthFunc,
}

impl DepthTestState {
    pub fn enabled(func: DepthFunc) -> Self {
        Self {
            enabled: true,
            func,
        }
    }
}

impl StateBlock for DepthTestState {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        if from.enabled != to.enabled {
            commands.push(toggle(Capability::DepthTest, to.enabled));
        }
        if from.func != to.func {
            commands.push(DeviceCommand::DepthFunc(to.func));
        }
        commands
    }
}

/// Write masks for color channels, depth and stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaskState {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    pub alpha: bool,
    pub depth: bool,
    pub stencil: u32,
}

impl Default for MaskState {
    fn default() -> Self {
        Self {
            red: true,
            green: true,
            blue: true,
            alpha: true,
            depth: true,
            stencil: u32::MAX,
        }
    }
}

impl StateBlock for MaskState {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        let color = |s: &Self| (s.red, s.green, s.blue, s.alpha);
        if color(from) != color(to) {
            commands.push(DeviceCommand::ColorMask {
                red: to.red,
                green: to.green,
                blue: to.blue,
                alpha: to.alpha,
            });
        }
        if from.depth != to.depth {
            commands.push(DeviceCommand::DepthMask(to.depth));
        }
        if from.stencil != to.stencil {
            commands.push(DeviceCommand::StencilMask(to.stencil));
        }
        commands
    }
}

/// Values written by a clear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClearState {
    pub color: Vec3,
    pub alpha: f32,
    pub depth: f32,
    pub stencil: i32,
}

impl ClearState {
    pub fn new(color: Vec3, alpha: f32) -> Self {
        Self {
            color,
            alpha,
            ..Self::default()
        }
    }
}

impl Default for ClearState {
    fn default() -> Self {
        Self {
            color: Vec3::ZERO,
            alpha: 0.0,
            depth: 1.0,
            stencil: 0,
        }
    }
}

impl StateBlock for ClearState {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        if from.color != to.color || from.alpha != to.alpha {
            commands.push(DeviceCommand::ClearColor(to.color.extend(to.alpha).to_array()));
        }
        if from.depth != to.depth {
            commands.push(DeviceCommand::ClearDepth(to.depth));
        }
        if from.stencil != to.stencil {
            commands.push(DeviceCommand::ClearStencil(to.stencil));
        }
        commands
    }
}

/// Face culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CullingState {
    pub enabled: bool,
    pub face: CullFace,
}

impl StateBlock for CullingState {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        let mut commands = Vec::new();
        if from.enabled != to.enabled {
            commands.push(toggle(Capability::CullFace, to.enabled));
        }
        if from.face != to.face {
            commands.push(DeviceCommand::CullFace(to.face));
        }
        commands
    }
}

/// The active program binding.
impl StateBlock for Option<ProgramHandle> {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        if from == to {
            Vec::new()
        } else {
            vec![DeviceCommand::UseProgram(*to)]
        }
    }
}

/// The active framebuffer binding; `None` is the default framebuffer.
impl StateBlock for Option<FramebufferHandle> {
    fn transition(from: &Self, to: &Self) -> Vec<DeviceCommand> {
        if from == to {
            Vec::new()
        } else {
            vec![DeviceCommand::BindFramebuffer(*to)]
        }
    }
}

/// The state a draw needs, applied in a fixed order by the context.
/// Blocks left `None` keep whatever is currently bound.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrawState {
    pub viewport: Option<Rect>,
    pub scissor: Option<Option<Rect>>,
    pub blend: Option<BlendState>,
    pub depth_test: Option<DepthTestState>,
    pub mask: Option<MaskState>,
    pub culling: Option<CullingState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_blocks_emit_nothing() {
        assert!(DepthTestState::transition(&Default::default(), &Default::default()).is_empty());
        assert!(BlendState::transition(&BlendState::over(), &BlendState::over()).is_empty());
        assert!(MaskState::transition(&Default::default(), &Default::default()).is_empty());
        assert!(ClearState::transition(&Default::default(), &Default::default()).is_empty());
        let rect = Rect::new(0, 0, 10, 10);
        assert!(Rect::transition(&rect, &rect).is_empty());
    }

    #[test]
    fn test_single_field_change_emits_one_command() {
        let from = DepthTestState::default();
        let to = DepthTestState {
            enabled: true,
            ..from
        };
        assert_eq!(
            DepthTestState::transition(&from, &to),
            vec![DeviceCommand::Enable(Capability::DepthTest)]
        );
    }

    #[test]
    fn test_blend_factors_grouped() {
        let commands = BlendState::transition(&BlendState::default(), &BlendState::over());
        assert_eq!(
            commands,
            vec![
                DeviceCommand::Enable(Capability::Blend),
                DeviceCommand::BlendFunc {
                    src_rgb: BlendFactor::One,
                    dst_rgb: BlendFactor::OneMinusSrcAlpha,
                    src_alpha: BlendFactor::One,
                    dst_alpha: BlendFactor::OneMinusSrcAlpha,
                },
            ]
        );
    }

    #[test]
    fn test_scissor_none_disables_test() {
        let rect = Rect::new(1, 2, 3, 4);
        assert_eq!(
            <Option<Rect>>::transition(&None, &Some(rect)),
            vec![
                DeviceCommand::Enable(Capability::ScissorTest),
                DeviceCommand::Scissor(rect),
            ]
        );
        assert_eq!(
            <Option<Rect>>::transition(&Some(rect), &None),
            vec![DeviceCommand::Disable(Capability::ScissorTest)]
        );
    }

    #[test]
    fn test_clear_color_includes_alpha() {
        let to = ClearState::new(Vec3::new(0.1, 0.2, 0.3), 1.0);
        assert_eq!(
            ClearState::transition(&ClearState::default(), &to),
            vec![DeviceCommand::ClearColor([0.1, 0.2, 0.3, 1.0])]
        );
    }
}
