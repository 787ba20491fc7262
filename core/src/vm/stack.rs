use core::fmt;

/// The VM's operand stack.
///
/// The compiler computes the exact maximum depth of every routine, so the
/// limit is only checked in debug builds, where exceeding it means the
/// compiler's stack accounting is wrong.
///
/// # Examples
///
/// ```ignore
/// let mut stack = Stack::new(100);
/// stack.push(42);
/// stack.push(17);
/// assert_eq!(stack.pop(), Some(17));
/// assert_eq!(stack.peek(), Some(&42));
/// assert_eq!(stack.len(), 1);
/// ```
pub struct Stack<T> {
    items: Vec<T>,
    /// Maximum allowed stack size (enforced in debug mode only).
    max_size: usize,
}

impl<T> Stack<T> {
    /// Creates a new stack with the specified maximum size.
    ///
    /// Pre-allocates up to 256 slots.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: Vec::with_capacity(max_size.min(256)),
            max_size,
        }
    }

    /// Pushes a value onto the stack.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the stack is already at maximum capacity.
    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(
            self.items.len() < self.max_size,
            "Stack overflow: attempted to push beyond maximum size of {}",
            self.max_size
        );
        self.items.push(value);
    }

    /// Removes and returns the top value, or `None` if the stack is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Returns a reference to the top value without removing it.
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Removes the top `n` values, returned bottom first.
    ///
    /// Returns `None` and leaves the stack alone if it holds fewer than `n`.
    pub fn pop_n(&mut self, n: usize) -> Option<Vec<T>> {
        let start = self.items.len().checked_sub(n)?;
        Some(self.items.split_off(start))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the maximum capacity of the stack.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("items", &self.items)
            .field("max_size", &self.max_size)
            .finish()
    }
}
