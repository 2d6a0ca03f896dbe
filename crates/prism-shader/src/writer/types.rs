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

//! Type markers for the GLSL values a [`super::ShaderWriter`] manipulates.
//!
//! Markers carry no data; they only drive which operations are allowed on an
//! [`super::Expr`] and what their result type is.

use std::marker::PhantomData;

/// A GLSL type, named as it is spelled in source.
pub trait GlslType: 'static {
    /// The GLSL spelling of the type.
    const NAME: &'static str;
}

macro_rules! glsl_types {
    ($($(#[$meta:meta])* $ty:ident => $name:literal),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq)]
            pub struct $ty;

            impl GlslType for $ty {
                const NAME: &'static str = $name;
            }
        )*
    };
}

glsl_types! {
    /// `void`, the return type of procedures.
    Void => "void",
    /// `bool`.
    Bool => "bool",
    /// `int`.
    Int => "int",
    /// `uint`.
    UInt => "uint",
    /// `float`.
    Float => "float",
    /// `vec2`.
    Vec2 => "vec2",
    /// `vec3`.
    Vec3 => "vec3",
    /// `vec4`.
    Vec4 => "vec4",
    /// `ivec2`.
    IVec2 => "ivec2",
    /// `ivec4`.
    IVec4 => "ivec4",
    /// `uvec4`.
    UVec4 => "uvec4",
    /// `mat3`.
    Mat3 => "mat3",
    /// `mat4`.
    Mat4 => "mat4",
    /// `sampler2D`.
    Sampler2D => "sampler2D",
    /// `samplerCube`.
    SamplerCube => "samplerCube",
    /// `samplerBuffer`, read through `texelFetch`.
    SamplerBuffer => "samplerBuffer",
}

/// A sized or runtime array of `T`. Only indexing is allowed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array<T>(PhantomData<T>);

impl<T: GlslType> GlslType for Array<T> {
    const NAME: &'static str = T::NAME;
}

/// Types supporting `+`, `-` and component-wise arithmetic.
pub trait Arithmetic: GlslType {}

/// Floating point scalars and vectors (`genType` in GLSL).
pub trait FloatVector: Arithmetic {}

/// Scalar types that can be ordered with `<`, `>`...
pub trait Ordered: GlslType {}

/// Square float matrices.
pub trait Matrix: Arithmetic {
    /// The type of one column.
    type Column: GlslType;
}

/// Opaque sampler types.
pub trait SamplerType: GlslType {}

/// Samplers readable through `texture()`.
pub trait Sampled: SamplerType {
    /// The coordinate type expected by `texture()`.
    type Coords: GlslType;
}

/// Vectors whose components can be extracted with a swizzle.
pub trait Vector: GlslType {
    /// The type of a single component.
    type Component: GlslType;
}

impl Arithmetic for Int {}
impl Arithmetic for UInt {}
impl Arithmetic for Float {}
impl Arithmetic for Vec2 {}
impl Arithmetic for Vec3 {}
impl Arithmetic for Vec4 {}
impl Arithmetic for IVec2 {}
impl Arithmetic for IVec4 {}
impl Arithmetic for UVec4 {}
impl Arithmetic for Mat3 {}
impl Arithmetic for Mat4 {}

impl FloatVector for Float {}
impl FloatVector for Vec2 {}
impl FloatVector for Vec3 {}
impl FloatVector for Vec4 {}

impl Ordered for Int {}
impl Ordered for UInt {}
impl Ordered for Float {}

impl Matrix for Mat3 {
    type Column = Vec3;
}
impl Matrix for Mat4 {
    type Column = Vec4;
}

impl SamplerType for Sampler2D {}
impl SamplerType for SamplerCube {}
impl SamplerType for SamplerBuffer {}

impl Sampled for Sampler2D {
    type Coords = Vec2;
}
impl Sampled for SamplerCube {
    type Coords = Vec3;
}

impl Vector for Vec2 {
    type Component = Float;
}
impl Vector for Vec3 {
    type Component = Float;
}
impl Vector for Vec4 {
    type Component = Float;
}
impl Vector for IVec2 {
    type Component = Int;
}
impl Vector for IVec4 {
    type Component = Int;
}
impl Vector for UVec4 {
    type Component = UInt;
}

/// Result type of `Self * Rhs`.
pub trait MulRule<Rhs: GlslType>: GlslType {
    /// The product type.
    type Output: GlslType;
}

/// Result type of `Self / Rhs`.
pub trait DivRule<Rhs: GlslType>: GlslType {
    /// The quotient type.
    type Output: GlslType;
}

macro_rules! same_type_products {
    ($($ty:ty),*) => {
        $(
            impl MulRule<$ty> for $ty {
                type Output = $ty;
            }
            impl DivRule<$ty> for $ty {
                type Output = $ty;
            }
        )*
    };
}

same_type_products!(Int, UInt, Float, Vec2, Vec3, Vec4, IVec2, IVec4, Mat3, Mat4);

macro_rules! scaled_products {
    ($scalar:ty => $($ty:ty),*) => {
        $(
            impl MulRule<$scalar> for $ty {
                type Output = $ty;
            }
            impl MulRule<$ty> for $scalar {
                type Output = $ty;
            }
            impl DivRule<$scalar> for $ty {
                type Output = $ty;
            }
        )*
    };
}

scaled_products!(Float => Vec2, Vec3, Vec4, Mat3, Mat4);
scaled_products!(Int => IVec2, IVec4);

impl MulRule<Vec4> for Mat4 {
    type Output = Vec4;
}
impl MulRule<Mat4> for Vec4 {
    type Output = Vec4;
}
impl MulRule<Vec3> for Mat3 {
    type Output = Vec3;
}
impl MulRule<Mat3> for Vec3 {
    type Output = Vec3;
}

/// Returns the GLSL spelling of `T`.
pub fn type_name<T: GlslType>() -> &'static str {
    T::NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_name<A: MulRule<B>, B: GlslType>() -> &'static str {
        <A::Output as GlslType>::NAME
    }

    #[test]
    fn products_follow_glsl_rules() {
        assert_eq!(product_name::<Mat4, Vec4>(), "vec4");
        assert_eq!(product_name::<Vec3, Float>(), "vec3");
        assert_eq!(product_name::<Float, Vec2>(), "vec2");
        assert_eq!(product_name::<Mat3, Mat3>(), "mat3");
        assert_eq!(product_name::<Int, IVec4>(), "ivec4");
    }

    #[test]
    fn arrays_are_spelled_as_their_element() {
        assert_eq!(type_name::<Array<Mat4>>(), "mat4");
    }
}
