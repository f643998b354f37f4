//! Push/pop stacks of modelview matrices, one per drawable

use nalgebra::{Matrix3, Matrix4, Vector3};

use crate::error::StackError;
use crate::transform::Transform;

/// LIFO stack of 4x4 transform snapshots
#[derive(Debug, Clone, Default)]
pub struct MatrixStack {
    saved: Vec<Matrix4<f32>>,
}

impl MatrixStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a copy of `matrix`
    pub fn push(&mut self, matrix: &Matrix4<f32>) {
        self.saved.push(*matrix);
    }

    /// Restore the most recently saved matrix.
    ///
    /// Popping more than was pushed is a logic error in the caller and is
    /// reported rather than papered over with an identity matrix.
    pub fn pop(&mut self) -> Result<Matrix4<f32>, StackError> {
        self.saved.pop().ok_or(StackError::EmptyPop)
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saved.is_empty()
    }
}

/// A drawable's current modelview matrix together with its own save stack
#[derive(Debug, Clone)]
pub struct ModelView {
    current: Matrix4<f32>,
    stack: MatrixStack,
}

impl ModelView {
    pub fn new() -> Self {
        Self {
            current: Matrix4::identity(),
            stack: MatrixStack::new(),
        }
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.current
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn push(&mut self) {
        self.stack.push(&self.current);
    }

    pub fn pop(&mut self) -> Result<(), StackError> {
        self.current = self.stack.pop()?;
        Ok(())
    }

    /// Post-multiply by a translation (object-local)
    pub fn translate(&mut self, offset: &Vector3<f32>) {
        self.current *= Transform::translation_matrix(offset.x, offset.y, offset.z);
    }

    /// Post-multiply by a rotation about the Y axis (object-local)
    pub fn rotate_y_degrees(&mut self, degrees: f32) {
        self.current *= Transform::rotation_y(degrees.to_radians());
    }

    /// Left-multiply: `current = lhs * current`
    pub fn pre_multiply(&mut self, lhs: &Matrix4<f32>) {
        self.current = lhs * self.current;
    }

    pub fn normal_matrix(&self) -> Matrix3<f32> {
        Transform::normal_matrix(&self.current)
    }
}

impl Default for ModelView {
    fn default() -> Self {
        Self::new()
    }
}
