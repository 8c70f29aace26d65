//! Wave planning: dependency edges between diff items and the
//! topological wave each item executes in.

use driftlock_core::OpAction;
use driftlock_diff::{Diff, KindOrdering};

/// For each item, the indexes of the items it depends on.
pub(crate) fn dependencies(diffs: &[Diff], ordering: &KindOrdering) -> Vec<Vec<usize>> {
    let mut deps = vec![Vec::new(); diffs.len()];
    for (i, item) in diffs.iter().enumerate() {
        for (j, other) in diffs.iter().enumerate() {
            if i == j {
                continue;
            }
            let depends = match (item.action(), other.action()) {
                // An upsert waits for the upsert of its prerequisite.
                (
                    OpAction::Create | OpAction::Update,
                    OpAction::Create | OpAction::Update,
                ) => ordering.hard_dependency(item.id(), other.id()),
                // Deleting a prerequisite waits for its dependents to go.
                (OpAction::Delete, OpAction::Delete) => {
                    ordering.hard_dependency(other.id(), item.id())
                }
                _ => false,
            };
            if depends {
                deps[i].push(j);
            }
        }
    }
    deps
}

/// Assigns each item to a wave: an item executes one wave after its
/// latest dependency. Dependency relations are acyclic by construction
/// (namespace/definition edges only), so this converges within `n`
/// passes.
pub(crate) fn waves(deps: &[Vec<usize>]) -> Vec<usize> {
    let n = deps.len();
    let mut wave = vec![0usize; n];
    for _ in 0..n {
        let mut changed = false;
        for i in 0..n {
            for &j in &deps[i] {
                if wave[i] <= wave[j] {
                    wave[i] = wave[j] + 1;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    wave
}
