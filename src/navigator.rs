//! Cursor for stepping through extracted images one at a time.

/// Bounded cursor over `len` slides. Stays at 0 when there are none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideNavigator {
    current: usize,
    len: usize,
}

impl SlideNavigator {
    pub fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    /// Index of the slide being shown.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Advance one slide. Returns false at the last slide.
    pub fn next(&mut self) -> bool {
        self.change(1)
    }

    /// Go back one slide. Returns false at the first slide.
    pub fn prev(&mut self) -> bool {
        self.change(-1)
    }

    /// Jump to `index`. Out-of-range indices leave the cursor where it is.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if index >= self.len || index == self.current {
            return false;
        }
        self.current = index;
        true
    }

    fn change(&mut self, delta: isize) -> bool {
        if self.len == 0 {
            return false;
        }
        let target = (self.current as isize + delta).clamp(0, self.len as isize - 1) as usize;
        if target == self.current {
            return false;
        }
        self.current = target;
        true
    }
}
