//! Contiguous vector arena.
//!
//! Vectors live back to back in a single `Vec<f32>`; a `document id ->
//! slot` map locates them. Removal leaves a hole that is reclaimed by
//! [`VectorArena::compact`], which runs automatically once holes make up
//! half of the arena. Slot order is insertion order, and overwriting an
//! existing id keeps its slot.

use std::collections::HashMap;

use crate::vector::types::{VectorDimension, VectorError};

#[derive(Debug, Clone)]
pub struct VectorArena {
    dimension: VectorDimension,
    /// `slot_count * dimension` floats.
    data: Vec<f32>,
    /// Owner of each slot; `None` marks a hole.
    owners: Vec<Option<String>>,
    slots: HashMap<String, usize>,
    holes: usize,
}

impl VectorArena {
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            dimension,
            data: Vec::new(),
            owners: Vec::new(),
            slots: HashMap::new(),
            holes: 0,
        }
    }

    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// Stores `vector` for `id`, overwriting any previous vector in place.
    ///
    /// Returns `true` when the id was not present before.
    pub fn insert(&mut self, id: &str, vector: &[f32]) -> Result<bool, VectorError> {
        self.dimension.validate_vector(vector)?;
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorError::NonFinite);
        }

        let dim = self.dimension.get();
        if let Some(&slot) = self.slots.get(id) {
            self.data[slot * dim..(slot + 1) * dim].copy_from_slice(vector);
            return Ok(false);
        }

        let slot = self.owners.len();
        self.data.extend_from_slice(vector);
        self.owners.push(Some(id.to_string()));
        self.slots.insert(id.to_string(), slot);
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.slots.get(id).map(|&slot| self.slot_vector(slot))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Removes the vector for `id`. Removing an unknown id is a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.slots.remove(id) else {
            return false;
        };
        self.owners[slot] = None;
        self.holes += 1;

        if self.holes * 2 >= self.owners.len() {
            self.compact();
        }
        true
    }

    /// Rewrites the arena without holes, preserving slot order.
    pub fn compact(&mut self) {
        if self.holes == 0 {
            return;
        }

        let dim = self.dimension.get();
        let mut data = Vec::with_capacity(self.slots.len() * dim);
        let mut owners = Vec::with_capacity(self.slots.len());
        for (slot, owner) in self.owners.iter().enumerate() {
            if let Some(id) = owner {
                data.extend_from_slice(&self.data[slot * dim..(slot + 1) * dim]);
                self.slots.insert(id.clone(), owners.len());
                owners.push(Some(id.clone()));
            }
        }

        self.data = data;
        self.owners = owners;
        self.holes = 0;
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Live `(id, vector)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(slot, owner)| owner.as_deref().map(|id| (id, self.slot_vector(slot))))
    }

    /// Owned copy of every live vector in slot order.
    pub fn snapshot(&self) -> Vec<(String, Vec<f32>)> {
        self.iter()
            .map(|(id, vector)| (id.to_string(), vector.to_vec()))
            .collect()
    }

    fn slot_vector(&self, slot: usize) -> &[f32] {
        let dim = self.dimension.get();
        &self.data[slot * dim..(slot + 1) * dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(dim: usize) -> VectorArena {
        VectorArena::new(VectorDimension::new(dim).unwrap())
    }

    #[test]
    fn test_insert_get_and_overwrite() {
        let mut arena = arena(2);
        assert!(arena.insert("a", &[1.0, 2.0]).unwrap());
        assert!(arena.insert("b", &[3.0, 4.0]).unwrap());
        assert!(!arena.insert("a", &[5.0, 6.0]).unwrap());

        assert_eq!(arena.get("a"), Some(&[5.0, 6.0][..]));
        assert_eq!(arena.len(), 2);

        let ids: Vec<&str> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_dimension_and_finiteness_are_validated() {
        let mut arena = arena(3);
        assert!(matches!(
            arena.insert("a", &[1.0, 2.0]),
            Err(VectorError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(
            arena.insert("a", &[1.0, f32::NAN, 0.0]),
            Err(VectorError::NonFinite)
        );
        assert!(arena.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent_and_compacts() {
        let mut arena = arena(1);
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            arena.insert(id, &[i as f32]).unwrap();
        }

        assert!(arena.remove("b"));
        assert!(!arena.remove("b"));
        assert!(!arena.remove("missing"));
        assert!(arena.remove("a"));

        // Two holes out of four slots triggers compaction
        assert_eq!(arena.holes, 0);
        assert_eq!(arena.data.len(), 2);
        assert_eq!(arena.get("c"), Some(&[2.0][..]));
        assert_eq!(arena.get("d"), Some(&[3.0][..]));

        let ids: Vec<String> = arena.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c".to_string(), "d".to_string()]);
    }
}
