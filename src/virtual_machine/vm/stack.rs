use crate::virtual_machine::errors::VMError;

/// Value held in a stack slot.
///
/// Slots are 64-bit signed integers; see the module docs of
/// [`vm`](crate::virtual_machine::vm) for how this relates to 32-byte words.
pub type Word = i64;

/// LIFO scratch space of the interpreter.
///
/// Unbounded: `push` always succeeds. Reads beyond the current depth fail with
/// [`VMError::StackUnderflow`] and never yield a default value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    items: Vec<Word>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Word) {
        self.items.push(value);
    }

    /// Removes and returns the top value.
    pub fn pop(&mut self) -> Result<Word, VMError> {
        self.require(1)?;
        Ok(self.items.pop().unwrap_or_default())
    }

    /// Returns the value `n` slots below the top without removing it.
    pub fn peek(&self, n: usize) -> Result<Word, VMError> {
        self.require(n + 1)?;
        Ok(self.items[self.items.len() - 1 - n])
    }

    /// Fails unless at least `count` values are present.
    ///
    /// Instructions call this before popping so a failing instruction leaves
    /// the stack untouched.
    pub fn require(&self, count: usize) -> Result<(), VMError> {
        if self.items.len() < count {
            return Err(VMError::StackUnderflow {
                required: count,
                available: self.items.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom-to-top view of the stack.
    pub fn as_slice(&self) -> &[Word] {
        &self.items
    }
}
