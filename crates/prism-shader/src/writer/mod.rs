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

//! The GLSL writer: an arena of expression nodes plus the source text they are
//! rendered into.
//!
//! Composing expressions only allocates arena nodes. Statements (declarations,
//! assignments, control flow) are the only operations that append text.
//!
//! ```
//! use prism_core::renderer::api::ShaderStage;
//! use prism_shader::writer::{ShaderWriter, Vec4, Void};
//!
//! let writer = ShaderWriter::new(ShaderStage::Fragment);
//! let colour = writer.decl_output::<Vec4>("pxl_colour", 0);
//! writer.implement_function::<Void>("main", &[], |_| {
//!     let one = writer.float(1.0);
//!     writer.assign(colour, writer.construct::<Vec4>(&[one.any()]));
//! });
//! assert!(writer.finalise().contains("pxl_colour = vec4(1.0);"));
//! ```

mod blocks;
mod expr;
mod intrinsics;
mod types;

pub use self::blocks::{
    BlockBuilder, Function, IfChain, Param, ParamQualifier, Params, StructBuilder,
};
pub use self::expr::{AnyExpr, Expr, ExprId, ExprNode};
pub use self::types::*;

use ahash::AHashSet;
use prism_core::renderer::api::ShaderStage;
use std::cell::RefCell;

/// GLSL version every generated shader targets.
pub const GLSL_VERSION: u32 = 450;

const INDENT: &str = "    ";

#[derive(Debug, Default)]
struct WriterState {
    nodes: Vec<ExprNode>,
    source: String,
    indent: usize,
    declared: AHashSet<String>,
    extensions: Vec<String>,
    function_depth: usize,
}

/// Builds the source of one shader stage.
///
/// Every method takes `&self` so that control-flow bodies can keep emitting
/// through the same writer they were called on.
#[derive(Debug)]
pub struct ShaderWriter {
    stage: ShaderStage,
    state: RefCell<WriterState>,
}

impl ShaderWriter {
    /// Creates an empty writer for `stage`.
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            state: RefCell::new(WriterState::default()),
        }
    }

    /// The stage this writer emits.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    // --- Arena ---

    fn push<T>(&self, node: ExprNode) -> Expr<T> {
        let mut state = self.state.borrow_mut();
        let id = ExprId(state.nodes.len() as u32);
        state.nodes.push(node);
        Expr::new(id)
    }

    pub(crate) fn pending<T>(&self, text: String) -> Expr<T> {
        self.push(ExprNode::Pending(text))
    }

    pub(crate) fn named<T>(&self, name: impl Into<String>) -> Expr<T> {
        self.push(ExprNode::Named(name.into()))
    }

    /// A copy of the node behind `id`.
    pub fn node(&self, id: ExprId) -> ExprNode {
        self.state.borrow().nodes[id.0 as usize].clone()
    }

    /// Number of nodes allocated so far.
    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    /// Renders an expression as GLSL text.
    pub fn text<T>(&self, expr: Expr<T>) -> String {
        self.text_of(expr.id())
    }

    pub(crate) fn text_of(&self, id: ExprId) -> String {
        self.state.borrow().nodes[id.0 as usize].text().to_owned()
    }

    pub(crate) fn join(&self, args: &[AnyExpr]) -> String {
        args.iter()
            .map(|arg| self.text_of(arg.0))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // --- Raw output ---

    pub(crate) fn write_line(&self, line: &str) {
        let mut state = self.state.borrow_mut();
        if !line.is_empty() {
            for _ in 0..state.indent {
                state.source.push_str(INDENT);
            }
            state.source.push_str(line);
        }
        state.source.push('\n');
    }

    /// Appends an empty line.
    pub fn blank_line(&self) {
        self.write_line("");
    }

    /// Appends a `//` comment.
    pub fn comment(&self, text: &str) {
        self.write_line(&format!("// {text}"));
    }

    /// Records `key` as declared. Returns `false` when it already was.
    pub(crate) fn declare_once(&self, key: String) -> bool {
        self.state.borrow_mut().declared.insert(key)
    }

    /// Returns `true` when a global, block, struct or function called `name`
    /// has been declared.
    pub fn is_declared(&self, name: &str) -> bool {
        let state = self.state.borrow();
        ["var", "block", "struct", "fn"]
            .iter()
            .any(|kind| state.declared.contains(&format!("{kind}:{name}")))
    }

    /// Requests a GLSL extension in the final source.
    pub fn enable_extension(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        if !state.extensions.iter().any(|ext| ext == name) {
            state.extensions.push(name.to_owned());
        }
    }

    fn indent(&self) {
        self.state.borrow_mut().indent += 1;
    }

    fn dedent(&self) {
        let mut state = self.state.borrow_mut();
        state.indent = state.indent.saturating_sub(1);
    }

    /// Emits `header { body }` with the body indented one level deeper.
    pub(crate) fn block(&self, header: &str, body: impl FnOnce()) {
        self.write_line(header);
        self.write_line("{");
        self.indent();
        body();
        self.dedent();
        self.write_line("}");
    }

    // --- Literals ---

    /// A `float` literal.
    pub fn float(&self, value: f32) -> Expr<Float> {
        self.pending(format!("{value:?}"))
    }

    /// An `int` literal.
    pub fn int(&self, value: i32) -> Expr<Int> {
        self.pending(value.to_string())
    }

    /// A `uint` literal.
    pub fn uint(&self, value: u32) -> Expr<UInt> {
        self.pending(format!("{value}u"))
    }

    /// A `bool` literal.
    pub fn bool(&self, value: bool) -> Expr<Bool> {
        self.pending(value.to_string())
    }

    // --- Declarations ---

    /// Declares and initialises a local variable.
    pub fn decl_locale<T: GlslType>(&self, name: &str, init: Expr<T>) -> Expr<T> {
        let line = format!("{} {name} = {};", T::NAME, self.text(init));
        self.write_line(&line);
        self.named(name)
    }

    /// Declares a local variable without initialiser.
    pub fn decl_locale_uninit<T: GlslType>(&self, name: &str) -> Expr<T> {
        self.write_line(&format!("{} {name};", T::NAME));
        self.named(name)
    }

    /// Declares a global constant, once.
    pub fn decl_constant<T: GlslType>(&self, name: &str, value: Expr<T>) -> Expr<T> {
        if self.declare_once(format!("var:{name}")) {
            let line = format!("const {} {name} = {};", T::NAME, self.text(value));
            self.write_line(&line);
        }
        self.named(name)
    }

    fn decl_global<T: GlslType>(&self, name: &str, declaration: String) -> Expr<T> {
        if self.declare_once(format!("var:{name}")) {
            self.write_line(&declaration);
        }
        self.named(name)
    }

    /// Declares a stage input at `location`.
    pub fn decl_input<T: GlslType>(&self, name: &str, location: u32) -> Expr<T> {
        self.decl_global(
            name,
            format!("layout(location = {location}) in {} {name};", T::NAME),
        )
    }

    /// Declares a non-interpolated stage input, required for integer varyings.
    pub fn decl_input_flat<T: GlslType>(&self, name: &str, location: u32) -> Expr<T> {
        self.decl_global(
            name,
            format!("layout(location = {location}) flat in {} {name};", T::NAME),
        )
    }

    /// Declares a stage output at `location`.
    pub fn decl_output<T: GlslType>(&self, name: &str, location: u32) -> Expr<T> {
        self.decl_global(
            name,
            format!("layout(location = {location}) out {} {name};", T::NAME),
        )
    }

    /// Declares a non-interpolated stage output.
    pub fn decl_output_flat<T: GlslType>(&self, name: &str, location: u32) -> Expr<T> {
        self.decl_global(
            name,
            format!("layout(location = {location}) flat out {} {name};", T::NAME),
        )
    }

    /// Declares a vertex attribute when `enabled`, returning `None` otherwise.
    pub fn decl_attribute<T: GlslType>(
        &self,
        name: &str,
        location: u32,
        enabled: bool,
    ) -> Option<Expr<T>> {
        debug_assert_eq!(
            self.stage,
            ShaderStage::Vertex,
            "attribute '{name}' declared outside a vertex shader"
        );
        enabled.then(|| self.decl_input::<T>(name, location))
    }

    /// Refers to a name provided by GLSL itself (`gl_Position`...).
    pub fn decl_builtin<T: GlslType>(&self, name: &str) -> Expr<T> {
        self.named(name)
    }

    /// Declares a sampler bound at `(set, binding)`.
    pub fn decl_sampler<T: SamplerType>(&self, name: &str, set: u32, binding: u32) -> Expr<T> {
        self.decl_global(
            name,
            format!(
                "layout(set = {set}, binding = {binding}) uniform {} {name};",
                T::NAME
            ),
        )
    }

    /// Starts a std140 uniform block at `(set, binding)`.
    pub fn decl_ubo(&self, name: &str, set: u32, binding: u32) -> BlockBuilder<'_> {
        let header = format!("layout(std140, set = {set}, binding = {binding}) uniform {name}");
        BlockBuilder::new(self, name, header)
    }

    /// Starts a std430 storage block at `(set, binding)`.
    pub fn decl_ssbo(
        &self,
        name: &str,
        set: u32,
        binding: u32,
        read_only: bool,
    ) -> BlockBuilder<'_> {
        let access = if read_only { "readonly " } else { "" };
        let header =
            format!("layout(std430, set = {set}, binding = {binding}) {access}buffer {name}");
        BlockBuilder::new(self, name, header)
    }

    /// Starts a struct declaration.
    pub fn decl_struct(&self, name: &str) -> StructBuilder<'_> {
        StructBuilder::new(self, name)
    }

    // --- Statements ---

    /// `lhs = rhs;`
    pub fn assign<T>(&self, lhs: Expr<T>, rhs: Expr<T>) {
        let line = format!("{} = {};", self.text(lhs), self.text(rhs));
        self.write_line(&line);
    }

    /// `lhs += rhs;`
    pub fn add_assign<T: Arithmetic>(&self, lhs: Expr<T>, rhs: Expr<T>) {
        let line = format!("{} += {};", self.text(lhs), self.text(rhs));
        self.write_line(&line);
    }

    /// `lhs -= rhs;`
    pub fn sub_assign<T: Arithmetic>(&self, lhs: Expr<T>, rhs: Expr<T>) {
        let line = format!("{} -= {};", self.text(lhs), self.text(rhs));
        self.write_line(&line);
    }

    /// `lhs *= rhs;`
    pub fn mul_assign<A, B>(&self, lhs: Expr<A>, rhs: Expr<B>)
    where
        A: MulRule<B, Output = A>,
        B: GlslType,
    {
        let line = format!("{} *= {};", self.text(lhs), self.text(rhs));
        self.write_line(&line);
    }

    /// Emits an expression as a statement, typically a `void` call.
    pub fn emit<T>(&self, expr: Expr<T>) {
        let line = format!("{};", self.text(expr));
        self.write_line(&line);
    }

    /// `return value;`
    pub fn return_<T>(&self, value: Expr<T>) {
        let line = format!("return {};", self.text(value));
        self.write_line(&line);
    }

    /// `return;`
    pub fn return_void(&self) {
        self.write_line("return;");
    }

    /// `discard;`
    pub fn discard(&self) {
        debug_assert_eq!(self.stage, ShaderStage::Fragment);
        self.write_line("discard;");
    }

    // --- Functions ---

    /// Emits the function `name` the first time it is requested.
    ///
    /// Later requests for the same name skip `body` and return the same handle,
    /// so a function is emitted exactly once per writer.
    ///
    /// ## Panics
    /// When called from inside another function body.
    pub fn implement_function<R: GlslType>(
        &self,
        name: &str,
        params: &[Param],
        body: impl FnOnce(&Params<'_>),
    ) -> Function<R> {
        let function = Function::new(name);
        if !self.declare_once(format!("fn:{name}")) {
            log::trace!("Function '{name}' already emitted.");
            return function;
        }
        let depth = self.state.borrow().function_depth;
        assert_eq!(depth, 0, "function '{name}' implemented inside another function");

        let signature = params
            .iter()
            .map(Param::declaration)
            .collect::<Vec<_>>()
            .join(", ");
        self.block(&format!("{} {name}({signature})", R::NAME), || {
            self.state.borrow_mut().function_depth += 1;
            body(&Params::new(self, params));
            self.state.borrow_mut().function_depth -= 1;
        });
        self.blank_line();
        function
    }

    /// A call to `name`, by name. Prefer [`Function::call`] for declared functions.
    pub fn call<R>(&self, name: &str, args: &[AnyExpr]) -> Expr<R> {
        self.pending(format!("{name}({})", self.join(args)))
    }

    // --- Control flow ---

    /// `if (cond) { body }`, extended through the returned chain.
    pub fn if_(&self, cond: Expr<Bool>, body: impl FnOnce()) -> IfChain<'_> {
        self.block(&format!("if ({})", self.text(cond)), body);
        IfChain::new(self)
    }

    /// `for (int name = begin; name < end; ++name) { body(name) }`
    pub fn for_range(
        &self,
        name: &str,
        begin: Expr<Int>,
        end: Expr<Int>,
        body: impl FnOnce(Expr<Int>),
    ) {
        let header = format!(
            "for (int {name} = {}; {name} < {}; ++{name})",
            self.text(begin),
            self.text(end)
        );
        let index = self.named::<Int>(name);
        self.block(&header, || body(index));
    }

    /// A general `for` loop over a variable of type `T`.
    pub fn for_loop<T: GlslType>(
        &self,
        name: &str,
        init: Expr<T>,
        cond: impl FnOnce(Expr<T>) -> Expr<Bool>,
        step: impl FnOnce(Expr<T>) -> AnyExpr,
        body: impl FnOnce(Expr<T>),
    ) {
        let var = self.named::<T>(name);
        let cond = cond(var);
        let step = step(var);
        let header = format!(
            "for ({} {name} = {}; {}; {})",
            T::NAME,
            self.text(init),
            self.text(cond),
            self.text_of(step.0)
        );
        self.block(&header, || body(var));
    }

    /// `while (cond) { body }`
    pub fn while_(&self, cond: Expr<Bool>, body: impl FnOnce()) {
        self.block(&format!("while ({})", self.text(cond)), body);
    }

    // --- Output ---

    /// The source emitted so far, without the version header.
    pub fn source(&self) -> String {
        self.state.borrow().source.clone()
    }

    /// Returns the complete shader text.
    pub fn finalise(self) -> String {
        let state = self.state.into_inner();
        let mut text = format!("#version {GLSL_VERSION}\n");
        for extension in &state.extensions {
            text.push_str(&format!("#extension {extension} : enable\n"));
        }
        text.push('\n');
        text.push_str(&state.source);
        text
    }
}
