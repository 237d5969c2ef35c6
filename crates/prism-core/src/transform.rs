//! Transform composition and checked inversion.

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::error::{CoreError, Result};

/// Determinants at or below this magnitude are treated as singular.
const SINGULAR_DETERMINANT: f32 = 1e-12;

/// Axis order of an Euler rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

/// Euler angles in radians, applied as intrinsic rotations in `order`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Euler {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub order: EulerOrder,
}

impl Euler {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            order: EulerOrder::Xyz,
        }
    }

    pub fn with_order(mut self, order: EulerOrder) -> Self {
        self.order = order;
        self
    }

    pub fn to_quat(&self) -> Quat {
        let Euler { x, y, z, order } = *self;
        match order {
            EulerOrder::Xyz => Quat::from_euler(EulerRot::XYZ, x, y, z),
            EulerOrder::Xzy => Quat::from_euler(EulerRot::XZY, x, z, y),
            EulerOrder::Yxz => Quat::from_euler(EulerRot::YXZ, y, x, z),
            EulerOrder::Yzx => Quat::from_euler(EulerRot::YZX, y, z, x),
            EulerOrder::Zxy => Quat::from_euler(EulerRot::ZXY, z, x, y),
            EulerOrder::Zyx => Quat::from_euler(EulerRot::ZYX, z, y, x),
        }
    }
}

/// Builds `translate * rotate * scale`: a local point is scaled, then
/// rotated, then translated.
pub fn compose(position: Vec3, rotation: Euler, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation.to_quat(), position)
}

/// Inverts `matrix`, failing instead of producing non-finite values.
pub fn try_inverse(matrix: &Mat4) -> Result<Mat4> {
    let determinant = matrix.determinant();
    if !determinant.is_finite() || determinant.abs() <= SINGULAR_DETERMINANT {
        return Err(CoreError::DegenerateTransform { determinant });
    }
    Ok(matrix.inverse())
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    #[test]
    fn test_compose_order() {
        let m = compose(
            Vec3::new(10.0, 0.0, 0.0),
            Euler::new(0.0, 0.0, FRAC_PI_2),
            Vec3::splat(2.0),
        );
        // scale (1,0,0) -> (2,0,0), rotate about z -> (0,2,0), translate -> (10,2,0)
        let p = m.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(10.0, 2.0, 0.0), 1e-5));
    }

    #[test]
    fn test_euler_order_matters() {
        let a = Euler::new(FRAC_PI_2, FRAC_PI_2, 0.0).to_quat();
        let b = Euler::new(FRAC_PI_2, FRAC_PI_2, 0.0)
            .with_order(EulerOrder::Yxz)
            .to_quat();
        assert!(!a.abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn test_singular_inverse_fails() {
        let m = compose(Vec3::ZERO, Euler::default(), Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(
            try_inverse(&m),
            Err(CoreError::DegenerateTransform { .. })
        ));
    }

    #[test]
    fn test_inverse_round_trip() {
        let m = compose(Vec3::new(1.0, 2.0, 3.0), Euler::new(0.3, 0.2, 0.1), Vec3::splat(0.5));
        let inv = try_inverse(&m).unwrap();
        assert!((m * inv).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }
}
