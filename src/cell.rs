//! Spatial cells. The model does not know how cells are arranged; it only needs to know which
//! cells exist so that strategies can be targeted at them.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    id: CellId,
}

impl Cell {
    pub fn id(&self) -> CellId {
        self.id
    }
}

/// The master list of cells, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct CellList {
    cells: IndexMap<CellId, Cell>,
}

impl CellList {
    pub fn new() -> CellList {
        CellList::default()
    }

    pub fn add(&mut self, id: CellId) -> Result<(), ModelError> {
        if self.cells.contains_key(&id) {
            return Err(ModelError::DuplicateCell(id));
        }
        self.cells.insert(id, Cell { id });
        Ok(())
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.cells.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Checks that `targets` is a non-empty list of known cells and returns it as a set,
    /// preserving first-seen order.
    pub fn resolve_targets(&self, targets: &[CellId]) -> Result<IndexSet<CellId>, ModelError> {
        if targets.is_empty() {
            return Err(ModelError::illegal("cells", "must not be empty"));
        }
        targets
            .iter()
            .map(|&id| {
                if self.contains(id) {
                    Ok(id)
                } else {
                    Err(ModelError::UnknownCell(id))
                }
            })
            .collect()
    }
}

impl FromIterator<CellId> for CellList {
    fn from_iter<T: IntoIterator<Item = CellId>>(iter: T) -> Self {
        CellList {
            cells: iter.into_iter().map(|id| (id, Cell { id })).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_cell_is_rejected() {
        let mut cells = CellList::new();
        cells.add(CellId(1)).unwrap();
        assert!(matches!(
            cells.add(CellId(1)),
            Err(ModelError::DuplicateCell(CellId(1)))
        ));
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn resolve_targets_validates() {
        let cells: CellList = [CellId(1), CellId(2)].into_iter().collect();
        assert!(cells.resolve_targets(&[]).is_err());
        assert!(matches!(
            cells.resolve_targets(&[CellId(1), CellId(3)]),
            Err(ModelError::UnknownCell(CellId(3)))
        ));
        let set = cells
            .resolve_targets(&[CellId(2), CellId(1), CellId(2)])
            .unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![CellId(2), CellId(1)]);
    }
}
