use std::collections::HashMap;

use crate::error::{Error, Result};

/// Maps file ids to positions in a node or element array.
///
/// The strategy is chosen once, when the full id set is known: ids `1..=n` in order resolve
/// arithmetically, anything else goes through a hash map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdIndex {
    Sequential { len: usize },
    Lookup(HashMap<usize, usize>),
}

impl Default for IdIndex {
    fn default() -> Self {
        Self::Sequential { len: 0 }
    }
}

impl IdIndex {
    /// Builds the index for `ids`, given in array order.
    ///
    /// `what` names the kind of record in error messages.
    pub fn build<I>(what: &'static str, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let ids: Vec<usize> = ids.into_iter().collect();
        if ids.iter().enumerate().all(|(i, &id)| id == i + 1) {
            return Ok(Self::Sequential { len: ids.len() });
        }
        let mut map = HashMap::with_capacity(ids.len());
        for (i, id) in ids.into_iter().enumerate() {
            if map.insert(id, i).is_some() {
                return Err(Error::DuplicateId { what, id });
            }
        }
        Ok(Self::Lookup(map))
    }

    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sequential { len } => *len,
            Self::Lookup(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Array position of `id`, if present.
    pub fn get(&self, id: usize) -> Option<usize> {
        match self {
            Self::Sequential { len } => (1..=*len).contains(&id).then(|| id - 1),
            Self::Lookup(map) => map.get(&id).copied(),
        }
    }

    pub(crate) fn resolve(&self, what: &'static str, id: usize) -> Result<usize> {
        self.get(id).ok_or(Error::UnknownId { what, id })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn sequential_ids_resolve_arithmetically() -> anyhow::Result<()> {
        let index = IdIndex::build("node", 1..=5)?;

        assert!(index.is_sequential());
        assert_eq!(index.get(1), Some(0));
        assert_eq!(index.get(5), Some(4));
        assert_eq!(index.get(0), None);
        assert_eq!(index.get(6), None);
        Ok(())
    }

    #[test]
    fn gaps_switch_to_lookup() -> anyhow::Result<()> {
        let index = IdIndex::build("node", [1, 2, 10, 11])?;

        assert!(!index.is_sequential());
        assert_eq!(index.get(10), Some(2));
        assert_eq!(index.get(3), None);
        assert!(matches!(
            index.resolve("node", 3),
            Err(Error::UnknownId {
                what: "node",
                id: 3,
            })
        ));
        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        assert!(matches!(
            IdIndex::build("element", [4, 2, 4]),
            Err(Error::DuplicateId { id: 4, .. })
        ));
    }

    proptest! {
        #[test]
        fn lookup_is_a_bijection(ids in proptest::collection::hash_set(1usize..10_000, 1..200)) {
            let ids: Vec<usize> = ids.into_iter().collect();
            let index = IdIndex::build("node", ids.iter().copied()).unwrap();

            prop_assert_eq!(index.len(), ids.len());
            for (i, &id) in ids.iter().enumerate() {
                prop_assert_eq!(index.get(id), Some(i));
            }
        }
    }
}
