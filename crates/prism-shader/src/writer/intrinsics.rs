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

//! Expression composition: operators, accessors, constructors and the GLSL
//! built-in functions used by the generators.

use super::expr::{AnyExpr, Expr};
use super::types::*;
use super::ShaderWriter;

impl ShaderWriter {
    fn binary<R>(&self, lhs: String, op: &str, rhs: String) -> Expr<R> {
        self.pending(format!("({lhs} {op} {rhs})"))
    }

    fn intrinsic<R>(&self, name: &str, args: &[AnyExpr]) -> Expr<R> {
        self.pending(format!("{name}({})", self.join(args)))
    }

    // --- Arithmetic ---

    /// `a + b`
    pub fn add<T: Arithmetic>(&self, a: Expr<T>, b: Expr<T>) -> Expr<T> {
        self.binary(self.text(a), "+", self.text(b))
    }

    /// `a - b`
    pub fn sub<T: Arithmetic>(&self, a: Expr<T>, b: Expr<T>) -> Expr<T> {
        self.binary(self.text(a), "-", self.text(b))
    }

    /// `a * b`, typed after the GLSL product rules.
    pub fn mul<A, B>(&self, a: Expr<A>, b: Expr<B>) -> Expr<A::Output>
    where
        A: MulRule<B>,
        B: GlslType,
    {
        self.binary(self.text(a), "*", self.text(b))
    }

    /// `a / b`
    pub fn div<A, B>(&self, a: Expr<A>, b: Expr<B>) -> Expr<A::Output>
    where
        A: DivRule<B>,
        B: GlslType,
    {
        self.binary(self.text(a), "/", self.text(b))
    }

    /// `-a`
    pub fn neg<T: Arithmetic>(&self, a: Expr<T>) -> Expr<T> {
        self.pending(format!("(-{})", self.text(a)))
    }

    /// `++a`, as a loop step.
    pub fn increment<T: Arithmetic>(&self, a: Expr<T>) -> Expr<T> {
        self.pending(format!("++{}", self.text(a)))
    }

    // --- Comparisons and logic ---

    /// `a < b`
    pub fn lt<T: Ordered>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), "<", self.text(b))
    }

    /// `a <= b`
    pub fn le<T: Ordered>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), "<=", self.text(b))
    }

    /// `a > b`
    pub fn gt<T: Ordered>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), ">", self.text(b))
    }

    /// `a >= b`
    pub fn ge<T: Ordered>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), ">=", self.text(b))
    }

    /// `a == b`
    pub fn eq<T: GlslType>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), "==", self.text(b))
    }

    /// `a != b`
    pub fn ne<T: GlslType>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Bool> {
        self.binary(self.text(a), "!=", self.text(b))
    }

    /// `a && b`
    pub fn and(&self, a: Expr<Bool>, b: Expr<Bool>) -> Expr<Bool> {
        self.binary(self.text(a), "&&", self.text(b))
    }

    /// `a || b`
    pub fn or(&self, a: Expr<Bool>, b: Expr<Bool>) -> Expr<Bool> {
        self.binary(self.text(a), "||", self.text(b))
    }

    /// `!a`
    pub fn not(&self, a: Expr<Bool>) -> Expr<Bool> {
        self.pending(format!("(!{})", self.text(a)))
    }

    /// `cond ? a : b`
    pub fn select<T: GlslType>(&self, cond: Expr<Bool>, a: Expr<T>, b: Expr<T>) -> Expr<T> {
        self.pending(format!(
            "({} ? {} : {})",
            self.text(cond),
            self.text(a),
            self.text(b)
        ))
    }

    // --- Accessors ---

    /// A swizzle such as `.xyz` or `.rg`.
    ///
    /// ## Panics
    /// In debug builds, when the component count does not match `Out`.
    pub fn swizzle<Out: GlslType, T: Vector>(
        &self,
        value: Expr<T>,
        components: &str,
    ) -> Expr<Out> {
        debug_assert!(
            (1..=4).contains(&components.len()),
            "invalid swizzle '.{components}'"
        );
        self.pending(format!("{}.{components}", self.text(value)))
    }

    /// A struct member access.
    pub fn member<Out: GlslType, T: GlslType>(
        &self,
        value: Expr<T>,
        name: &str,
    ) -> Expr<Out> {
        self.pending(format!("{}.{name}", self.text(value)))
    }

    /// `array[index]`
    pub fn index<T: GlslType>(&self, array: Expr<Array<T>>, index: Expr<Int>) -> Expr<T> {
        self.pending(format!("{}[{}]", self.text(array), self.text(index)))
    }

    /// `matrix[column]`
    pub fn column<M: Matrix>(&self, matrix: Expr<M>, column: u32) -> Expr<M::Column> {
        self.pending(format!("{}[{column}]", self.text(matrix)))
    }

    /// `T(args...)`
    pub fn construct<T: GlslType>(&self, args: &[AnyExpr]) -> Expr<T> {
        self.intrinsic(T::NAME, args)
    }

    /// Conversion constructor, `Out(value)`.
    pub fn cast<Out: GlslType, T: GlslType>(&self, value: Expr<T>) -> Expr<Out> {
        self.construct(&[value.any()])
    }

    // --- Built-in functions ---

    /// `normalize(v)`
    pub fn normalize<T: FloatVector>(&self, v: Expr<T>) -> Expr<T> {
        self.intrinsic("normalize", &[v.any()])
    }

    /// `length(v)`
    pub fn length<T: FloatVector>(&self, v: Expr<T>) -> Expr<Float> {
        self.intrinsic("length", &[v.any()])
    }

    /// `distance(a, b)`
    pub fn distance<T: FloatVector>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Float> {
        self.intrinsic("distance", &[a.any(), b.any()])
    }

    /// `dot(a, b)`
    pub fn dot<T: FloatVector>(&self, a: Expr<T>, b: Expr<T>) -> Expr<Float> {
        self.intrinsic("dot", &[a.any(), b.any()])
    }

    /// `cross(a, b)`
    pub fn cross(&self, a: Expr<Vec3>, b: Expr<Vec3>) -> Expr<Vec3> {
        self.intrinsic("cross", &[a.any(), b.any()])
    }

    /// `reflect(incident, normal)`
    pub fn reflect<T: FloatVector>(&self, incident: Expr<T>, normal: Expr<T>) -> Expr<T> {
        self.intrinsic("reflect", &[incident.any(), normal.any()])
    }

    /// `mix(a, b, t)`; `t` is either `T` or `float`.
    pub fn mix<T: FloatVector, F: FloatVector>(
        &self,
        a: Expr<T>,
        b: Expr<T>,
        t: Expr<F>,
    ) -> Expr<T> {
        self.intrinsic("mix", &[a.any(), b.any(), t.any()])
    }

    /// `fma(a, b, c)`, computing `a * b + c`.
    pub fn fma<T: FloatVector>(&self, a: Expr<T>, b: Expr<T>, c: Expr<T>) -> Expr<T> {
        self.intrinsic("fma", &[a.any(), b.any(), c.any()])
    }

    /// `max(a, b)`; `b` is either `T` or its scalar.
    pub fn max<T: Arithmetic, U: Arithmetic>(&self, a: Expr<T>, b: Expr<U>) -> Expr<T> {
        self.intrinsic("max", &[a.any(), b.any()])
    }

    /// `min(a, b)`; `b` is either `T` or its scalar.
    pub fn min<T: Arithmetic, U: Arithmetic>(&self, a: Expr<T>, b: Expr<U>) -> Expr<T> {
        self.intrinsic("min", &[a.any(), b.any()])
    }

    /// `clamp(x, lo, hi)`
    pub fn clamp<T: Arithmetic, U: Arithmetic>(
        &self,
        x: Expr<T>,
        lo: Expr<U>,
        hi: Expr<U>,
    ) -> Expr<T> {
        self.intrinsic("clamp", &[x.any(), lo.any(), hi.any()])
    }

    /// `pow(x, y)`
    pub fn pow<T: FloatVector>(&self, x: Expr<T>, y: Expr<T>) -> Expr<T> {
        self.intrinsic("pow", &[x.any(), y.any()])
    }

    /// `sqrt(x)`
    pub fn sqrt<T: FloatVector>(&self, x: Expr<T>) -> Expr<T> {
        self.intrinsic("sqrt", &[x.any()])
    }

    /// `exp(x)`
    pub fn exp<T: FloatVector>(&self, x: Expr<T>) -> Expr<T> {
        self.intrinsic("exp", &[x.any()])
    }

    /// `abs(x)`
    pub fn abs<T: Arithmetic>(&self, x: Expr<T>) -> Expr<T> {
        self.intrinsic("abs", &[x.any()])
    }

    /// `step(edge, x)`
    pub fn step<T: FloatVector>(&self, edge: Expr<T>, x: Expr<T>) -> Expr<T> {
        self.intrinsic("step", &[edge.any(), x.any()])
    }

    /// `smoothstep(lo, hi, x)`
    pub fn smoothstep<T: FloatVector>(&self, lo: Expr<T>, hi: Expr<T>, x: Expr<T>) -> Expr<T> {
        self.intrinsic("smoothstep", &[lo.any(), hi.any(), x.any()])
    }

    /// `transpose(m)`
    pub fn transpose<M: Matrix>(&self, m: Expr<M>) -> Expr<M> {
        self.intrinsic("transpose", &[m.any()])
    }

    /// `inverse(m)`
    pub fn inverse<M: Matrix>(&self, m: Expr<M>) -> Expr<M> {
        self.intrinsic("inverse", &[m.any()])
    }

    /// `texture(sampler, coords)`
    pub fn texture<S: Sampled>(&self, sampler: Expr<S>, coords: Expr<S::Coords>) -> Expr<Vec4> {
        self.intrinsic("texture", &[sampler.any(), coords.any()])
    }

    /// `texelFetch(buffer, index)`
    pub fn texel_fetch(&self, buffer: Expr<SamplerBuffer>, index: Expr<Int>) -> Expr<Vec4> {
        self.intrinsic("texelFetch", &[buffer.any(), index.any()])
    }

    /// `textureSize(sampler, 0)`
    pub fn texture_size(&self, sampler: Expr<Sampler2D>) -> Expr<IVec2> {
        let lod = self.int(0);
        self.intrinsic("textureSize", &[sampler.any(), lod.any()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::renderer::api::ShaderStage;

    #[test]
    fn matrix_vector_product_renders_nested() {
        let writer = ShaderWriter::new(ShaderStage::Vertex);
        let projection = writer.decl_builtin::<Mat4>("c3d_projection");
        let view = writer.decl_builtin::<Mat4>("c3d_curView");
        let position = writer.decl_builtin::<Vec4>("position");
        let clip = writer.mul(projection, writer.mul(view, position));
        assert_eq!(
            writer.text(clip),
            "(c3d_projection * (c3d_curView * position))"
        );
    }

    #[test]
    fn swizzle_member_and_index() {
        let writer = ShaderWriter::new(ShaderStage::Fragment);
        let bones = writer.decl_builtin::<Array<Mat4>>("c3d_bones");
        let ids = writer.decl_builtin::<IVec4>("boneIds0");
        let bone = writer.index(bones, writer.swizzle::<Int, _>(ids, "x"));
        assert_eq!(writer.text(bone), "c3d_bones[boneIds0.x]");

        let light = writer.decl_builtin::<Vec4>("light");
        let rgb = writer.swizzle::<Vec3, _>(light, "rgb");
        assert_eq!(writer.text(writer.normalize(rgb)), "normalize(light.rgb)");

        let view = writer.decl_builtin::<Mat4>("view");
        let right = writer.swizzle::<Float, _>(writer.column(view, 1), "x");
        assert_eq!(writer.text(right), "view[1].x");
    }

    #[test]
    fn constructors_and_casts() {
        let writer = ShaderWriter::new(ShaderStage::Vertex);
        let position = writer.decl_builtin::<Vec3>("position");
        let one = writer.float(1.0);
        let homogeneous = writer.construct::<Vec4>(&[position.any(), one.any()]);
        assert_eq!(writer.text(homogeneous), "vec4(position, 1.0)");
        let count = writer.decl_builtin::<Float>("count");
        assert_eq!(writer.text(writer.cast::<Int, _>(count)), "int(count)");
    }
}
