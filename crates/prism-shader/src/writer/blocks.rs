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

use super::expr::{AnyExpr, Expr};
use super::types::{Array, Bool, GlslType};
use super::ShaderWriter;
use std::fmt;
use std::marker::PhantomData;

/// Builder for uniform and storage blocks.
///
/// Members are global names as soon as they are added; the block text itself is
/// written by [`BlockBuilder::end`], only the first time a block of that name is
/// declared.
pub struct BlockBuilder<'w> {
    writer: &'w ShaderWriter,
    header: String,
    members: Vec<String>,
    emit: bool,
}

impl<'w> BlockBuilder<'w> {
    pub(crate) fn new(writer: &'w ShaderWriter, name: &str, header: String) -> Self {
        let emit = writer.declare_once(format!("block:{name}"));
        Self {
            writer,
            header,
            members: Vec::new(),
            emit,
        }
    }

    /// Adds a member of type `T`.
    pub fn member<T: GlslType>(&mut self, name: &str) -> Expr<T> {
        self.members.push(format!("{} {name};", T::NAME));
        self.writer.named(name)
    }

    /// Adds a fixed-size array member.
    pub fn member_array<T: GlslType>(&mut self, name: &str, count: u32) -> Expr<Array<T>> {
        self.members.push(format!("{} {name}[{count}];", T::NAME));
        self.writer.named(name)
    }

    /// Adds a runtime-sized array member; only valid as the last member of a
    /// storage block.
    pub fn member_runtime_array<T: GlslType>(&mut self, name: &str) -> Expr<Array<T>> {
        self.members.push(format!("{} {name}[];", T::NAME));
        self.writer.named(name)
    }

    /// Writes the block.
    pub fn end(self) {
        if !self.emit {
            return;
        }
        self.writer.write_line(&self.header);
        self.writer.write_line("{");
        self.writer.indent();
        for member in &self.members {
            self.writer.write_line(member);
        }
        self.writer.dedent();
        self.writer.write_line("};");
        self.writer.blank_line();
    }
}

/// Builder for `struct` declarations. A struct is written once per writer.
pub struct StructBuilder<'w> {
    writer: &'w ShaderWriter,
    name: String,
    members: Vec<String>,
}

impl<'w> StructBuilder<'w> {
    pub(crate) fn new(writer: &'w ShaderWriter, name: &str) -> Self {
        Self {
            writer,
            name: name.to_owned(),
            members: Vec::new(),
        }
    }

    /// Adds a member of type `T`.
    pub fn member<T: GlslType>(mut self, name: &str) -> Self {
        self.members.push(format!("{} {name};", T::NAME));
        self
    }

    /// Adds a fixed-size array member.
    pub fn member_array<T: GlslType>(mut self, name: &str, count: u32) -> Self {
        self.members.push(format!("{} {name}[{count}];", T::NAME));
        self
    }

    /// Writes the struct, unless a struct of the same name already was.
    pub fn end(self) {
        if !self.writer.declare_once(format!("struct:{}", self.name)) {
            return;
        }
        self.writer.write_line(&format!("struct {}", self.name));
        self.writer.write_line("{");
        self.writer.indent();
        for member in &self.members {
            self.writer.write_line(member);
        }
        self.writer.dedent();
        self.writer.write_line("};");
        self.writer.blank_line();
    }
}

/// Continuation of an `if` statement.
pub struct IfChain<'w> {
    writer: &'w ShaderWriter,
}

impl<'w> IfChain<'w> {
    pub(crate) fn new(writer: &'w ShaderWriter) -> Self {
        Self { writer }
    }

    /// `else if (cond) { body }`
    pub fn else_if(self, cond: Expr<Bool>, body: impl FnOnce()) -> Self {
        let header = format!("else if ({})", self.writer.text(cond));
        self.writer.block(&header, body);
        self
    }

    /// `else { body }`
    pub fn else_(self, body: impl FnOnce()) {
        self.writer.block("else", body);
    }
}

/// How a parameter is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamQualifier {
    /// Read-only copy.
    In,
    /// Written by the callee.
    Out,
    /// Read and written by the callee.
    InOut,
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    ty: &'static str,
    name: String,
    qualifier: ParamQualifier,
}

impl Param {
    /// An input parameter.
    pub fn new<T: GlslType>(name: impl Into<String>) -> Self {
        Self::with_qualifier::<T>(name, ParamQualifier::In)
    }

    /// An output parameter.
    pub fn out<T: GlslType>(name: impl Into<String>) -> Self {
        Self::with_qualifier::<T>(name, ParamQualifier::Out)
    }

    /// An input/output parameter.
    pub fn inout<T: GlslType>(name: impl Into<String>) -> Self {
        Self::with_qualifier::<T>(name, ParamQualifier::InOut)
    }

    fn with_qualifier<T: GlslType>(name: impl Into<String>, qualifier: ParamQualifier) -> Self {
        Self {
            ty: T::NAME,
            name: name.into(),
            qualifier,
        }
    }

    /// The parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn declaration(&self) -> String {
        let qualifier = match self.qualifier {
            ParamQualifier::In => "",
            ParamQualifier::Out => "out ",
            ParamQualifier::InOut => "inout ",
        };
        format!("{qualifier}{} {}", self.ty, self.name)
    }
}

/// The parameters of the function being implemented.
pub struct Params<'a> {
    writer: &'a ShaderWriter,
    params: &'a [Param],
}

impl<'a> Params<'a> {
    pub(crate) fn new(writer: &'a ShaderWriter, params: &'a [Param]) -> Self {
        Self { writer, params }
    }

    /// The parameter at `index`, typed.
    ///
    /// ## Panics
    /// When `index` is out of range.
    pub fn get<T: GlslType>(&self, index: usize) -> Expr<T> {
        let param = &self.params[index];
        debug_assert_eq!(
            param.ty,
            T::NAME,
            "parameter '{}' read with the wrong type",
            param.name
        );
        self.writer.named(param.name.clone())
    }

    /// The parameter at `index`, untyped, for forwarding to another call.
    pub fn any(&self, index: usize) -> AnyExpr {
        self.writer.named::<()>(self.params[index].name.clone()).any()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` for parameterless functions.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A handle to a function emitted by [`ShaderWriter::implement_function`].
pub struct Function<R> {
    name: String,
    _ret: PhantomData<fn() -> R>,
}

impl<R> Function<R> {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            _ret: PhantomData,
        }
    }

    /// The function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A call expression. `void` calls are emitted with [`ShaderWriter::emit`].
    pub fn call(&self, writer: &ShaderWriter, args: &[AnyExpr]) -> Expr<R> {
        writer.call(&self.name, args)
    }
}

impl<R> Clone for Function<R> {
    fn clone(&self) -> Self {
        Self::new(&self.name)
    }
}

impl<R: GlslType> fmt::Debug for Function<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function<{}>({})", R::NAME, self.name)
    }
}
