use super::*;

/// Nesting and size limits for one encode or decode pass.
#[derive(Debug, Clone)]
pub(crate) struct Limits {
    max_depth: usize,
    max_size: usize,
    depth: usize,
    expanded: u64,
}

impl Limits {
    pub fn new(max_depth: usize, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
            depth: 0,
            expanded: 0,
        }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn enter(&mut self) -> Result<(), Error> {
        if self.depth >= self.max_depth {
            return Err(Error::Depth);
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn check_size(&self, size: u64) -> Result<(), Error> {
        if size > self.max_size as u64 {
            Err(Error::UnsupportedSize)
        } else {
            Ok(())
        }
    }

    /// Accounts for `size` units copied out of a reference table; the running total
    /// for one item may not exceed `max_size`.
    pub fn charge(&mut self, size: u64) -> Result<(), Error> {
        self.expanded = self.expanded.saturating_add(size);
        self.check_size(self.expanded)
    }

    pub fn reset(&mut self) {
        self.depth = 0;
        self.expanded = 0;
    }
}
