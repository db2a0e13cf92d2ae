//! Dependency resolution.
//!
//! Turns the caller's migrations plus ledger history into a deterministic,
//! fully satisfiable execution order:
//!
//! 1. [`expand`] injects no-op placeholders for dependencies that are only
//!    known through the ledger, and adds synthetic ordering edges so that
//!    unrelated migrations keep their input order.
//! 2. [`sort`] builds the dependency graph, drops duplicates and every
//!    migration whose dependency chain cannot be satisfied, then orders the
//!    rest with Kahn's algorithm. Cycle members end up in the drop list.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::BuildHasher;

use crate::migration::Migration;

/// A migration in the working sequence, with its synthetic ordering edge.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The migration or placeholder.
    pub migration: Migration,
    /// Id of the entry that must precede this one to keep input order.
    after: Option<String>,
}

impl Entry {
    /// Creates an entry without a synthetic ordering edge.
    #[must_use]
    pub const fn new(migration: Migration) -> Self {
        Self {
            migration,
            after: None,
        }
    }

    /// Returns the id this entry is ordered after, if any.
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        self.after.as_deref()
    }
}

impl From<Migration> for Entry {
    fn from(migration: Migration) -> Self {
        Self::new(migration)
    }
}

/// Result of resolving a migration set.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Migrations in execution order.
    pub sorted: Vec<Migration>,
    /// Duplicates and migrations whose dependencies cannot be satisfied.
    pub dropped: Vec<Migration>,
}

impl Resolution {
    /// Returns the ids of the sorted migrations.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<&str> {
        self.sorted.iter().map(|m| m.id.as_str()).collect()
    }

    /// Returns the ids of the dropped migrations.
    #[must_use]
    pub fn dropped_ids(&self) -> Vec<&str> {
        self.dropped.iter().map(|m| m.id.as_str()).collect()
    }

    /// Returns whether `id` was excluded from execution.
    ///
    /// Duplicate placeholders also land in the drop list; an id only counts
    /// as excluded when no copy of it made it into the sorted order.
    #[must_use]
    pub fn is_dropped(&self, id: &str) -> bool {
        self.dropped.iter().any(|m| m.id == id) && !self.sorted.iter().any(|m| m.id == id)
    }
}

/// Resolves `migrations` against the ids already recorded in the ledger.
#[must_use]
pub fn resolve<S: BuildHasher>(
    migrations: &[Migration],
    applied: &HashSet<String, S>,
) -> Resolution {
    sort(expand(migrations, applied))
}

/// Builds the working sequence for `migrations` given the applied ids.
///
/// An applied migration is replaced by a no-op stand-in. For a pending one,
/// each declared dependency found in the ledger is injected as a placeholder
/// ahead of it. A placeholder keeps the rollback of a fuller definition when
/// the dependency was declared with one.
///
/// Every entry whose predecessor declares no dependencies gets a synthetic
/// edge to that predecessor, which pins the relative order of unrelated
/// migrations.
#[must_use]
pub fn expand<S: BuildHasher>(
    migrations: &[Migration],
    applied: &HashSet<String, S>,
) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::with_capacity(migrations.len());

    for migration in migrations {
        if applied.contains(&migration.id) {
            entries.push(Entry::new(migration.clone().into_placeholder()));
            continue;
        }

        let mut injected: HashSet<&str> = HashSet::new();
        for dependency in &migration.dependencies {
            let id = dependency.id();
            if !applied.contains(id) || !injected.insert(id) {
                continue;
            }
            let placeholder = dependency.definition().map_or_else(
                || Migration::placeholder(id),
                |definition| definition.clone().into_placeholder(),
            );
            entries.push(Entry::new(placeholder));
        }

        entries.push(Entry::new(migration.clone()));
    }

    for i in 1..entries.len() {
        if entries[i - 1].migration.dependencies.is_empty() {
            let previous = entries[i - 1].migration.id.clone();
            entries[i].after = Some(previous);
        }
    }

    entries
}

/// Orders `entries` so that every dependency precedes its dependents.
///
/// The first occurrence of an id becomes the graph node; later occurrences
/// are dropped. A node is dropped when one of its declared dependencies is
/// not a live node, which may in turn unsatisfy its own dependents. Among
/// nodes that are ready at the same time the one given first wins, so the
/// output only depends on the input. Nodes left over by the sort sit on, or
/// behind, a cycle and are dropped as well. Dropped nodes keep their input
/// order within each group.
#[must_use]
pub fn sort(entries: Vec<Entry>) -> Resolution {
    let mut nodes: Vec<Option<Entry>> = Vec::with_capacity(entries.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(entries.len());
    let mut dropped: Vec<Migration> = Vec::new();

    for entry in entries {
        if index.contains_key(&entry.migration.id) {
            dropped.push(entry.migration);
            continue;
        }
        index.insert(entry.migration.id.clone(), nodes.len());
        nodes.push(Some(entry));
    }

    let count = nodes.len();
    let dependencies: Vec<Vec<Option<usize>>> = nodes
        .iter()
        .flatten()
        .map(|entry| {
            entry
                .migration
                .dependency_ids()
                .into_iter()
                .map(|id| index.get(id).copied())
                .collect()
        })
        .collect();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (node, deps) in dependencies.iter().enumerate() {
        for dep in deps.iter().flatten() {
            dependents[*dep].push(node);
        }
    }

    // Work-list scan for unsatisfiable nodes, until a fixed point.
    let mut live = vec![true; count];
    let mut unsatisfied: Vec<usize> = Vec::new();
    let mut queue: VecDeque<usize> = (0..count).collect();
    while let Some(node) = queue.pop_front() {
        if !live[node] {
            continue;
        }
        let satisfiable = dependencies[node]
            .iter()
            .all(|dep| dep.is_some_and(|d| live[d]));
        if !satisfiable {
            live[node] = false;
            unsatisfied.push(node);
            queue.extend(dependents[node].iter().copied().filter(|&d| live[d]));
        }
    }
    unsatisfied.sort_unstable();

    let mut in_degree = vec![0_usize; count];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    for node in (0..count).filter(|&n| live[n]) {
        let mut predecessors: Vec<usize> = dependencies[node].iter().flatten().copied().collect();
        let synthetic = nodes[node]
            .as_ref()
            .and_then(|entry| entry.after())
            .and_then(|id| index.get(id).copied())
            .filter(|&p| p != node && live[p]);
        predecessors.extend(synthetic);
        predecessors.sort_unstable();
        predecessors.dedup();
        for predecessor in predecessors {
            successors[predecessor].push(node);
            in_degree[node] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..count)
        .filter(|&n| live[n] && in_degree[n] == 0)
        .collect();
    let mut order: Vec<usize> = Vec::with_capacity(count);
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &successor in &successors[node] {
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                ready.insert(successor);
            }
        }
    }

    let ordered: HashSet<usize> = order.iter().copied().collect();
    let cyclic = (0..count).filter(|n| live[*n] && !ordered.contains(n));

    let mut take = |node: usize| nodes[node].take().map(|entry| entry.migration);
    let sorted: Vec<Migration> = order.into_iter().filter_map(&mut take).collect();
    dropped.extend(unsatisfied.into_iter().filter_map(&mut take));
    dropped.extend(cyclic.filter_map(&mut take));

    Resolution { sorted, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;

    fn migration(id: &str, deps: &[&str]) -> Migration {
        deps.iter().fold(Migration::new(id, Operation::noop()), |m, dep| {
            m.depends_on(*dep)
        })
    }

    fn entries(migrations: Vec<Migration>) -> Vec<Entry> {
        migrations.into_iter().map(Entry::from).collect()
    }

    fn applied(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|id| (*id).to_string()).collect()
    }

    #[test]
    fn test_sort_dependency_first() {
        let resolution = sort(entries(vec![migration("2", &["1"]), migration("1", &[])]));
        assert_eq!(resolution.sorted_ids(), vec!["1", "2"]);
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn test_sort_drops_unsatisfiable_chains() {
        let resolution = sort(entries(vec![
            migration("3", &["0"]),
            migration("1", &[]),
            migration("4", &["2"]),
            migration("3.4", &["3.3", "4"]),
            migration("2", &["1"]),
            migration("3.1", &["3", "4"]),
            migration("3.3", &["3", "4"]),
            migration("3.2", &["3.1", "4"]),
        ]));

        assert_eq!(resolution.sorted_ids(), vec!["1", "2", "4"]);
        let dropped = resolution.dropped_ids();
        assert_eq!(dropped.len(), 5);
        for id in ["3", "3.1", "3.2", "3.3", "3.4"] {
            assert!(dropped.contains(&id), "{id} should be dropped");
        }
    }

    #[test]
    fn test_sort_missing_external_dependency() {
        let resolution = sort(entries(vec![migration("2", &["1"])]));
        assert!(resolution.sorted.is_empty());
        assert_eq!(resolution.dropped_ids(), vec!["2"]);
    }

    #[test]
    fn test_sort_empty() {
        let resolution = sort(Vec::new());
        assert!(resolution.sorted.is_empty());
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn test_sort_drops_cycles_and_their_dependents() {
        let resolution = sort(entries(vec![
            migration("a", &["b"]),
            migration("b", &["a"]),
            migration("c", &[]),
            migration("d", &["a"]),
            migration("e", &["c"]),
        ]));

        assert_eq!(resolution.sorted_ids(), vec!["c", "e"]);
        assert_eq!(resolution.dropped_ids(), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_sort_drops_self_dependency() {
        let resolution = sort(entries(vec![migration("a", &["a"]), migration("b", &[])]));
        assert_eq!(resolution.sorted_ids(), vec!["b"]);
        assert_eq!(resolution.dropped_ids(), vec!["a"]);
    }

    #[test]
    fn test_sort_keeps_first_duplicate() {
        let resolution = sort(entries(vec![
            Migration::placeholder("1"),
            migration("1", &["0"]),
            migration("2", &["1"]),
        ]));

        assert_eq!(resolution.sorted_ids(), vec!["1", "2"]);
        assert!(resolution.sorted[0].is_placeholder());
        assert_eq!(resolution.dropped_ids(), vec!["1"]);
        assert!(!resolution.is_dropped("1"));
    }

    #[test]
    fn test_resolve_preserves_input_order() {
        let migrations = vec![
            migration("c", &[]),
            migration("a", &[]),
            migration("b", &[]),
        ];
        let first = resolve(&migrations, &HashSet::new());
        let second = resolve(&migrations, &HashSet::new());

        assert_eq!(first.sorted_ids(), vec!["c", "a", "b"]);
        assert_eq!(first.sorted_ids(), second.sorted_ids());
    }

    #[test]
    fn test_resolve_orders_dependency_first() {
        let migrations = vec![migration("1", &[]), migration("2", &["1"])];
        let resolution = resolve(&migrations, &HashSet::new());
        assert_eq!(resolution.sorted_ids(), vec!["1", "2"]);

        let resolution = resolve(&migrations[1..], &HashSet::new());
        assert!(resolution.sorted.is_empty());
        assert_eq!(resolution.dropped_ids(), vec!["2"]);
        assert!(resolution.is_dropped("2"));
    }

    #[test]
    fn test_expand_injects_history_placeholder() {
        let migrations = vec![migration("2", &["1"])];
        let expanded = expand(&migrations, &applied(&["1"]));

        let ids: Vec<&str> = expanded.iter().map(|e| e.migration.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert!(expanded[0].migration.is_placeholder());
        assert!(!expanded[1].migration.is_placeholder());
        assert_eq!(expanded[1].after(), Some("1"));

        let resolution = sort(expanded);
        assert_eq!(resolution.sorted_ids(), vec!["1", "2"]);
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn test_expand_replaces_applied_with_stand_in() {
        let migrations = vec![migration("1", &[]), migration("2", &["1"])];
        let expanded = expand(&migrations, &applied(&["1"]));

        let ids: Vec<&str> = expanded.iter().map(|e| e.migration.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1", "2"]);
        assert!(expanded.iter().take(2).all(|e| e.migration.is_placeholder()));

        let resolution = sort(expanded);
        assert_eq!(resolution.sorted_ids(), vec!["1", "2"]);
        assert_eq!(resolution.dropped_ids(), vec!["1"]);
    }

    #[test]
    fn test_expand_placeholder_keeps_defined_rollback() {
        let people = Migration::new("1", Operation::noop()).backward(Operation::noop());
        let pets = Migration::new("2", Operation::noop()).depends_on(&people);
        let expanded = expand(&[pets], &applied(&["1"]));

        assert!(expanded[0].migration.is_placeholder());
        assert!(expanded[0].migration.is_reversible());
    }

    #[test]
    fn test_expand_adds_no_edge_after_dependent() {
        let migrations = vec![migration("2", &["1"]), migration("1", &[]), migration("3", &[])];
        let expanded = expand(&migrations, &HashSet::new());

        assert_eq!(expanded[0].after(), None);
        assert_eq!(expanded[1].after(), None);
        assert_eq!(expanded[2].after(), Some("1"));
        assert_eq!(sort(expanded).sorted_ids(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_resolve_against_partial_history() {
        let migrations = vec![
            migration("3", &["1.1.1", "2.2"]),
            migration("1.1.1", &["1.1"]),
            migration("2.2", &["2"]),
            migration("2.1", &["2"]),
            migration("1.1", &["1"]),
            migration("(will not run)", &["NotSatisfied"]),
        ];

        let resolution = resolve(&migrations, &applied(&["1"]));
        assert_eq!(resolution.sorted_ids(), vec!["1", "1.1", "1.1.1"]);
        for id in ["2.2", "3", "2.1", "(will not run)"] {
            assert!(resolution.is_dropped(id), "{id} should be dropped");
        }

        let resolution = resolve(&migrations, &applied(&["1", "2", "1.1", "1.1.1"]));
        assert_eq!(
            resolution.sorted_ids(),
            vec!["1.1.1", "2", "2.2", "3", "2.1", "1.1"]
        );
        assert!(resolution.is_dropped("(will not run)"));
    }
}
