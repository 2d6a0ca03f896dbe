// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::vector::{Vec3, Vec4};
use std::ops::Mul;

/// A 4x4 column-major matrix, used for world, view and projection transforms.
///
/// The memory layout matches GLSL's `mat4` under std140, so a `Mat4` can be
/// written straight into a uniform block.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// A 4x4 matrix with all elements set to 0.
    pub const ZERO: Self = Self {
        cols: [Vec4::ZERO; 4],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, v.extend(1.0))
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Self::from_cols(
            Vec4::new(scale.x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, scale.y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, scale.z, 0.0),
            Vec4::W,
        )
    }

    /// Creates a matrix for a right-handed rotation around the Y-axis.
    ///
    /// # Arguments
    ///
    /// * `angle`: The angle of rotation in radians.
    #[inline]
    pub fn from_rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(
            Vec4::new(c, 0.0, -s, 0.0),
            Vec4::Y,
            Vec4::new(s, 0.0, c, 0.0),
            Vec4::W,
        )
    }

    /// Returns the transposed matrix.
    pub fn transpose(&self) -> Self {
        Self::from_cols(
            self.get_row(0),
            self.get_row(1),
            self.get_row(2),
            self.get_row(3),
        )
    }

    /// Returns the translation part of an affine transform.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.cols[3].truncate()
    }

    /// Flattens the matrix into 16 column-major floats.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (i, col) in self.cols.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&col.to_array());
        }
        out
    }

    /// Computes the inverse of a general matrix through its 2x2 sub-determinants.
    ///
    /// Returns `None` when the determinant is below [`super::EPSILON`].
    pub fn inverse(&self) -> Option<Self> {
        let m = self.to_cols_array();
        // m[c * 4 + r]
        let at = |c: usize, r: usize| m[c * 4 + r];

        let s0 = at(0, 0) * at(1, 1) - at(1, 0) * at(0, 1);
        let s1 = at(0, 0) * at(1, 2) - at(1, 0) * at(0, 2);
        let s2 = at(0, 0) * at(1, 3) - at(1, 0) * at(0, 3);
        let s3 = at(0, 1) * at(1, 2) - at(1, 1) * at(0, 2);
        let s4 = at(0, 1) * at(1, 3) - at(1, 1) * at(0, 3);
        let s5 = at(0, 2) * at(1, 3) - at(1, 2) * at(0, 3);

        let c5 = at(2, 2) * at(3, 3) - at(3, 2) * at(2, 3);
        let c4 = at(2, 1) * at(3, 3) - at(3, 1) * at(2, 3);
        let c3 = at(2, 1) * at(3, 2) - at(3, 1) * at(2, 2);
        let c2 = at(2, 0) * at(3, 3) - at(3, 0) * at(2, 3);
        let c1 = at(2, 0) * at(3, 2) - at(3, 0) * at(2, 2);
        let c0 = at(2, 0) * at(3, 1) - at(3, 0) * at(2, 1);

        let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
        if det.abs() < super::EPSILON {
            return None;
        }
        let inv = 1.0 / det;

        let col = |a: f32, b: f32, c: f32, d: f32| Vec4::new(a * inv, b * inv, c * inv, d * inv);
        Some(Self::from_cols(
            col(
                at(1, 1) * c5 - at(1, 2) * c4 + at(1, 3) * c3,
                -at(0, 1) * c5 + at(0, 2) * c4 - at(0, 3) * c3,
                at(3, 1) * s5 - at(3, 2) * s4 + at(3, 3) * s3,
                -at(2, 1) * s5 + at(2, 2) * s4 - at(2, 3) * s3,
            ),
            col(
                -at(1, 0) * c5 + at(1, 2) * c2 - at(1, 3) * c1,
                at(0, 0) * c5 - at(0, 2) * c2 + at(0, 3) * c1,
                -at(3, 0) * s5 + at(3, 2) * s2 - at(3, 3) * s1,
                at(2, 0) * s5 - at(2, 2) * s2 + at(2, 3) * s1,
            ),
            col(
                at(1, 0) * c4 - at(1, 1) * c2 + at(1, 3) * c0,
                -at(0, 0) * c4 + at(0, 1) * c2 - at(0, 3) * c0,
                at(3, 0) * s4 - at(3, 1) * s2 + at(3, 3) * s0,
                -at(2, 0) * s4 + at(2, 1) * s2 - at(2, 3) * s0,
            ),
            col(
                -at(1, 0) * c3 + at(1, 1) * c1 - at(1, 2) * c0,
                at(0, 0) * c3 - at(0, 1) * c1 + at(0, 2) * c0,
                -at(3, 0) * s3 + at(3, 1) * s1 - at(3, 2) * s0,
                at(2, 0) * s3 - at(2, 1) * s1 + at(2, 2) * s0,
            ),
        ))
    }
}

impl Mul for Mat4 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            cols: [
                self * rhs.cols[0],
                self * rhs.cols[1],
                self * rhs.cols[2],
                self * rhs.cols[3],
            ],
        }
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    #[inline]
    fn mul(self, rhs: Vec4) -> Vec4 {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_is_neutral() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Mat4::IDENTITY * t, t);
        assert_eq!(t * Mat4::IDENTITY, t);
    }

    #[test]
    fn translation_moves_points_not_directions() {
        let t = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t * Vec4::W, Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(t * Vec4::X, Vec4::X);
        assert_eq!(t.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn transpose_twice_is_identity_operation() {
        let m = Mat4::from_rotation_y(0.7) * Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(m.transpose().transpose(), m);
        assert_relative_eq!(m.get_row(1).y, 3.0);
    }

    #[test]
    fn inverse_undoes_transform() {
        let m = Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0))
            * Mat4::from_rotation_y(0.4)
            * Mat4::from_scale(Vec3::new(2.0, 0.5, 4.0));
        let inv = m.inverse().expect("invertible");
        let id = m * inv;
        for (a, b) in id.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array()) {
            assert_relative_eq!(*a, b, epsilon = 1e-5);
        }
        assert!(Mat4::ZERO.inverse().is_none());
    }

    #[test]
    fn cols_array_is_column_major() {
        let t = Mat4::from_translation(Vec3::new(5.0, 6.0, 7.0));
        let a = t.to_cols_array();
        assert_eq!(&a[12..16], &[5.0, 6.0, 7.0, 1.0]);
    }
}
