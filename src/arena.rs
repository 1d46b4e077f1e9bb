//! Typed bump arena for hot-path scratch buffers
//!
//! One `Arena<T>` is owned by one worker. Each batch of work opens a scope
//! with [`Arena::reset`], carves disjoint zero-filled slices out of it with
//! [`ArenaScope::get`], and gives everything back when the scope is dropped.
//! Capacity is retained across scopes, so steady-state batches never touch
//! the allocator.

#![forbid(unsafe_code)]

/// Errors from the scratch arena.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("arena exhausted: requested {requested}, {remaining} left")]
    Exhausted { requested: usize, remaining: usize },
}

/// Fixed-capacity bump arena of `T`.
#[derive(Debug)]
pub struct Arena<T> {
    storage: Vec<T>,
}

impl<T: Copy + Default> Arena<T> {
    /// Arena able to hand out `cap` elements per scope.
    pub fn new(cap: usize) -> Self {
        Self { storage: vec![T::default(); cap] }
    }

    /// Elements available per scope.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Grow to at least `cap` elements. Never shrinks.
    pub fn ensure_cap(&mut self, cap: usize) {
        if self.storage.len() < cap {
            self.storage.resize(cap, T::default());
        }
    }

    /// Start a fresh scope. Every slice from the previous scope is released.
    pub fn reset(&mut self) -> ArenaScope<'_, T> {
        ArenaScope { rest: &mut self.storage[..], handed_out: 0 }
    }
}

/// Live allocation window over an [`Arena`].
pub struct ArenaScope<'a, T> {
    rest: &'a mut [T],
    handed_out: usize,
}

impl<'a, T: Copy + Default> ArenaScope<'a, T> {
    /// Take the next `n` elements, zeroed (`T::default()`).
    pub fn get(&mut self, n: usize) -> Result<&'a mut [T], ArenaError> {
        if n > self.rest.len() {
            return Err(ArenaError::Exhausted { requested: n, remaining: self.rest.len() });
        }
        let rest = std::mem::take(&mut self.rest);
        let (head, tail) = rest.split_at_mut(n);
        self.rest = tail;
        self.handed_out += n;
        head.fill(T::default());
        Ok(head)
    }

    /// Elements handed out so far in this scope.
    #[inline]
    pub fn used(&self) -> usize {
        self.handed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_are_disjoint_and_zeroed() {
        let mut arena = Arena::<u64>::new(8);
        {
            let mut s = arena.reset();
            let a = s.get(3).unwrap();
            let b = s.get(5).unwrap();
            a.fill(1);
            b.fill(2);
            assert_eq!(s.used(), 8);
            assert_eq!(a, &[1, 1, 1]);
            assert_eq!(b, &[2, 2, 2, 2, 2]);
        }
        // New scope hands out zeroed memory again.
        let mut s = arena.reset();
        assert_eq!(s.get(8).unwrap(), &[0u64; 8]);
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut arena = Arena::<u32>::new(4);
        let mut s = arena.reset();
        s.get(3).unwrap();
        assert_eq!(s.get(2), Err(ArenaError::Exhausted { requested: 2, remaining: 1 }));
    }

    #[test]
    fn ensure_cap_grows() {
        let mut arena = Arena::<u8>::new(2);
        arena.ensure_cap(16);
        assert_eq!(arena.capacity(), 16);
        arena.ensure_cap(4);
        assert_eq!(arena.capacity(), 16);
    }
}
