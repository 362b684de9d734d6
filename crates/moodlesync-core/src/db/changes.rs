//! Writes staged during a sync run and applied by a single commit.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::models::{Assignment, AssignmentField, Course, CourseField, Resource, ResourceField};

/// A staged write for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged<R, F> {
    /// Row does not exist in the store yet
    Insert(R),
    /// Row exists; only `fields` (plus `updated_at`) are written
    Update { row: R, fields: BTreeSet<F> },
}

impl<R, F> Staged<R, F> {
    pub const fn row(&self) -> &R {
        match self {
            Self::Insert(row) | Self::Update { row, .. } => row,
        }
    }
}

/// Staged rows of one entity kind, keyed by natural key.
///
/// Lookups here see writes queued earlier in the same run, which the store
/// does not until commit.
#[derive(Debug, Clone)]
pub struct StagedTable<K, R, F> {
    order: Vec<K>,
    rows: HashMap<K, Staged<R, F>>,
}

impl<K, R, F> Default for StagedTable<K, R, F> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            rows: HashMap::new(),
        }
    }
}

impl<K, R, F> StagedTable<K, R, F>
where
    K: Eq + Hash + Clone,
    F: Ord,
{
    /// Latest staged version of the row with this key.
    pub fn get(&self, key: &K) -> Option<&R> {
        self.rows.get(key).map(Staged::row)
    }

    pub fn queue_insert(&mut self, key: K, row: R) {
        if !self.rows.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.rows.insert(key, Staged::Insert(row));
    }

    /// Stage an update. A row still pending insertion stays an insert carrying
    /// the new values; repeated updates accumulate their changed fields.
    pub fn queue_update(&mut self, key: K, row: R, fields: impl IntoIterator<Item = F>) {
        match self.rows.get_mut(&key) {
            Some(Staged::Insert(staged)) => *staged = row,
            Some(Staged::Update {
                row: staged,
                fields: staged_fields,
            }) => {
                *staged = row;
                staged_fields.extend(fields);
            }
            None => {
                self.order.push(key.clone());
                self.rows.insert(
                    key,
                    Staged::Update {
                        row,
                        fields: fields.into_iter().collect(),
                    },
                );
            }
        }
    }

    /// Staged writes in the order their keys were first seen.
    pub fn iter(&self) -> impl Iterator<Item = &Staged<R, F>> {
        self.order.iter().filter_map(|key| self.rows.get(key))
    }

    pub const fn len(&self) -> usize {
        self.order.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Every write queued by one sync run.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub courses: StagedTable<i64, Course, CourseField>,
    pub assignments: StagedTable<i64, Assignment, AssignmentField>,
    pub resources: StagedTable<String, Resource, ResourceField>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged rows across all entity kinds.
    pub fn len(&self) -> usize {
        self.courses.len() + self.assignments.len() + self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Table = StagedTable<&'static str, u32, u8>;

    #[test]
    fn update_of_pending_insert_stays_insert() {
        let mut table = Table::default();
        table.queue_insert("a", 1);
        table.queue_update("a", 2, [1]);

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&"a"), Some(&2));
        assert!(matches!(table.iter().next(), Some(Staged::Insert(2))));
    }

    #[test]
    fn repeated_updates_merge_fields() {
        let mut table = Table::default();
        table.queue_update("a", 1, [1]);
        table.queue_update("a", 2, [3]);

        let Some(Staged::Update { row, fields }) = table.iter().next() else {
            panic!("expected staged update");
        };
        assert_eq!(*row, 2);
        assert_eq!(fields.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn iteration_follows_first_seen_order() {
        let mut table = Table::default();
        table.queue_insert("b", 1);
        table.queue_insert("a", 2);
        table.queue_update("b", 3, [1]);

        let rows = table.iter().map(|staged| *staged.row()).collect::<Vec<_>>();
        assert_eq!(rows, vec![3, 2]);
    }
}
