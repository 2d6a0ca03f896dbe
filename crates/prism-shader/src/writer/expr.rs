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

use super::types::GlslType;
use std::fmt;
use std::marker::PhantomData;

/// Index of a node in a writer's expression arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub(crate) u32);

/// One node of the expression arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprNode {
    /// Composed text that has not been bound to a variable.
    Pending(String),
    /// A declared name: variable, uniform member, parameter or builtin.
    Named(String),
}

impl ExprNode {
    /// The text substituted wherever the node is used.
    pub fn text(&self) -> &str {
        match self {
            ExprNode::Pending(text) | ExprNode::Named(text) => text,
        }
    }

    /// Returns `true` when the node is bound to a name.
    pub fn is_named(&self) -> bool {
        matches!(self, ExprNode::Named(_))
    }
}

/// A typed handle to an expression owned by a [`super::ShaderWriter`].
///
/// Handles are plain indices: they are `Copy`, never borrow the writer and
/// rendering them does not consume them.
pub struct Expr<T> {
    id: ExprId,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Expr<T> {
    pub(crate) fn new(id: ExprId) -> Self {
        Self {
            id,
            _ty: PhantomData,
        }
    }

    /// The arena index of the expression.
    pub fn id(&self) -> ExprId {
        self.id
    }

    /// Erases the type, for argument lists.
    pub fn any(self) -> AnyExpr {
        AnyExpr(self.id)
    }
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Expr<T> {}

impl<T> PartialEq for Expr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Expr<T> {}

impl<T: GlslType> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expr<{}>({})", T::NAME, self.id.0)
    }
}

/// An untyped expression handle, used for call and constructor arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyExpr(pub(crate) ExprId);

impl<T> From<Expr<T>> for AnyExpr {
    fn from(expr: Expr<T>) -> Self {
        expr.any()
    }
}
