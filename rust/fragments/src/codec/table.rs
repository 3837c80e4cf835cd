// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Append-only table sink with the "size first, last index first" contract.
//!
//! Table emission knows every table's final length before the first entry is
//! written, and writes entries from the highest slot down to slot 0. The sink
//! buffers them in arrival order and flips once at the end, so the finished
//! column is in forward slot order.

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct ReverseTable<T> {
    name: &'static str,
    len: usize,
    entries: Vec<T>,
}

impl<T> ReverseTable<T> {
    pub fn with_len(name: &'static str, len: usize) -> Self {
        Self {
            name,
            len,
            entries: Vec::with_capacity(len),
        }
    }

    /// Slot the next `push` must target.
    #[inline]
    pub fn next_slot(&self) -> Option<usize> {
        (self.entries.len() < self.len).then(|| self.len - 1 - self.entries.len())
    }

    /// Appends the entry for `slot`, which must be exactly [`Self::next_slot`].
    pub fn push(&mut self, slot: usize, value: T) -> Result<()> {
        match self.next_slot() {
            Some(expected) if expected == slot => {
                self.entries.push(value);
                Ok(())
            }
            Some(expected) => Err(Error::codec(format!(
                "table {} written out of order: got slot {slot}, expected {expected}",
                self.name
            ))),
            None => Err(Error::codec(format!(
                "table {} overflow: {} entries declared",
                self.name, self.len
            ))),
        }
    }

    /// Returns the column in forward slot order.
    pub fn finish(mut self) -> Result<Vec<T>> {
        if self.entries.len() != self.len {
            return Err(Error::codec(format!(
                "table {} incomplete: {} of {} entries written",
                self.name,
                self.entries.len(),
                self.len
            )));
        }
        self.entries.reverse();
        Ok(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flips_to_forward_order() {
        let mut table = ReverseTable::with_len("materials", 3);
        table.push(2, "c").unwrap();
        table.push(1, "b").unwrap();
        table.push(0, "a").unwrap();
        assert_eq!(table.finish().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_forward_writes() {
        let mut table = ReverseTable::with_len("samples", 2);
        assert!(table.push(0, 1u32).is_err());
    }

    #[test]
    fn rejects_incomplete_tables() {
        let mut table = ReverseTable::with_len("items", 2);
        table.push(1, 1u32).unwrap();
        assert!(table.finish().is_err());
    }

    #[test]
    fn empty_table() {
        let table: ReverseTable<u32> = ReverseTable::with_len("shells", 0);
        assert_eq!(table.next_slot(), None);
        assert!(table.finish().unwrap().is_empty());
    }
}
