//! 2D affine transforms embedded in homogeneous 4x4 matrices.
//!
//! Every builder starts from [`Mat4::IDENTITY`] and only touches the entries
//! it owns, so calls never leak state into each other. Matrices are
//! column-major and meant to be post-multiplied (`model * delta`), with the
//! translation in the last column.
//!
//! ```
//! use twirl::affine;
//! use twirl::Vec4;
//!
//! let pose = affine::translation(0.0, -0.75)
//!     * affine::scale(0.2, 0.2)
//!     * affine::rotation(-std::f32::consts::FRAC_PI_2);
//!
//! let origin = pose * Vec4::new(0.0, 0.0, 0.0, 1.0);
//! assert!((origin.y + 0.75).abs() < 1e-6);
//! ```

use glam::{Mat4, Vec4};

/// Translation by `(tx, ty)`.
///
/// ```text
/// [ 1 0 0 tx ]
/// [ 0 1 0 ty ]
/// [ 0 0 1 0  ]
/// [ 0 0 0 1  ]
/// ```
///
/// Z is left alone; this is a 2D transform.
pub fn translation(tx: f32, ty: f32) -> Mat4 {
    let mut m = Mat4::IDENTITY;
    m.w_axis.x = tx;
    m.w_axis.y = ty;
    m
}

/// Counter-clockwise rotation about +Z by `angle` radians.
///
/// ```text
/// [ cos -sin 0 0 ]
/// [ sin  cos 0 0 ]
/// [ 0    0   1 0 ]
/// [ 0    0   0 1 ]
/// ```
pub fn rotation(angle: f32) -> Mat4 {
    let (sin, cos) = angle.sin_cos();
    let mut m = Mat4::IDENTITY;
    m.x_axis = Vec4::new(cos, sin, 0.0, 0.0);
    m.y_axis = Vec4::new(-sin, cos, 0.0, 0.0);
    m
}

/// Non-uniform scale by `sx` along X and `sy` along Y.
///
/// ```text
/// [ sx 0  0 0 ]
/// [ 0  sy 0 0 ]
/// [ 0  0  1 0 ]
/// [ 0  0  0 1 ]
/// ```
pub fn scale(sx: f32, sy: f32) -> Mat4 {
    let mut m = Mat4::IDENTITY;
    m.x_axis.x = sx;
    m.y_axis.y = sy;
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const ORIGIN: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

    #[test]
    fn translation_moves_origin() {
        for (tx, ty) in [(0.0, 0.0), (1.5, -2.0), (-0.25, 0.75), (100.0, 1e-3)] {
            let p = translation(tx, ty) * ORIGIN;
            assert_eq!(p, Vec4::new(tx, ty, 0.0, 1.0));
        }
    }

    #[test]
    fn translation_ignores_directions() {
        let dir = Vec4::new(1.0, 2.0, 0.0, 0.0);
        assert_eq!(translation(5.0, 7.0) * dir, dir);
    }

    #[test]
    fn rotation_block_is_orthonormal() {
        for i in -16..=16 {
            let theta = i as f32 * PI / 8.0 + 0.1;
            let m = rotation(theta);

            let c0 = m.x_axis.truncate().truncate();
            let c1 = m.y_axis.truncate().truncate();
            assert!((c0.length() - 1.0).abs() < 1e-6);
            assert!((c1.length() - 1.0).abs() < 1e-6);
            assert!(c0.dot(c1).abs() < 1e-6);

            let det = c0.x * c1.y - c1.x * c0.y;
            assert!((det - 1.0).abs() < 1e-6, "det {det} at {theta}");
        }
    }

    #[test]
    fn rotation_is_counter_clockwise() {
        let p = rotation(FRAC_PI_2) * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert!(p.abs_diff_eq(Vec4::new(0.0, 1.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn rotation_matches_glam() {
        let theta = 0.7;
        assert!(rotation(theta).abs_diff_eq(Mat4::from_rotation_z(theta), 1e-6));
    }

    #[test]
    fn scale_sets_diagonal() {
        let m = scale(2.0, -3.0);
        assert_eq!(m.x_axis, Vec4::new(2.0, 0.0, 0.0, 0.0));
        assert_eq!(m.y_axis, Vec4::new(0.0, -3.0, 0.0, 0.0));
        assert_eq!(m.z_axis, Vec4::Z);
        assert_eq!(m.w_axis, Vec4::W);
    }

    #[test]
    fn neutral_arguments_give_identity() {
        assert_eq!(translation(0.0, 0.0), Mat4::IDENTITY);
        assert_eq!(rotation(0.0), Mat4::IDENTITY);
        assert_eq!(scale(1.0, 1.0), Mat4::IDENTITY);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let a = rotation(1.234);
        let _ = translation(9.0, 9.0);
        let b = rotation(1.234);
        assert_eq!(a.to_cols_array().map(f32::to_bits), b.to_cols_array().map(f32::to_bits));

        assert_eq!(translation(0.3, 0.4), translation(0.3, 0.4));
        assert_eq!(scale(0.2, 0.5), scale(0.2, 0.5));
    }

    #[test]
    fn initial_pose_matches_literal() {
        let pose = translation(0.0, -0.75) * scale(0.2, 0.2) * rotation(-FRAC_PI_2);
        let expected = Mat4::from_cols_array(&[
            0.0, -0.2, 0.0, 0.0, //
            0.2, 0.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, -0.75, 0.0, 1.0,
        ]);
        assert!(pose.abs_diff_eq(expected, 1e-6), "{pose:?}");
    }

    #[test]
    fn nan_propagates() {
        let m = translation(f32::NAN, 0.0);
        assert!(m.w_axis.x.is_nan());
        assert_eq!(m.w_axis.y, 0.0);
    }
}
