//! Generation-counter mark sets: O(1) "unmark everything".

/// A set of small integers cleared by bumping a generation counter.
#[derive(Debug, Clone)]
pub struct Mark {
    value: u32,
    marks: Vec<u32>,
}

impl Mark {
    pub fn new(size: usize) -> Self {
        Self {
            value: 1,
            marks: vec![0; size],
        }
    }

    /// Unmark every entry.
    pub fn clear(&mut self) {
        self.value = self.value.wrapping_add(1);
        if self.value == 0 {
            self.marks.fill(0);
            self.value = 1;
        }
    }

    #[inline]
    pub fn mark(&mut self, i: usize) {
        self.marks[i] = self.value;
    }

    #[inline]
    pub fn is_marked(&self, i: usize) -> bool {
        self.marks[i] == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let mut mark = Mark::new(10);
        assert!(!mark.is_marked(3));
        mark.mark(3);
        assert!(mark.is_marked(3));
        mark.clear();
        assert!(!mark.is_marked(3));
    }

    #[test]
    fn test_generation_wraparound() {
        let mut mark = Mark::new(4);
        mark.value = u32::MAX;
        mark.mark(1);
        mark.clear();
        assert_eq!(mark.value, 1);
        assert!(!mark.is_marked(1));
    }
}
