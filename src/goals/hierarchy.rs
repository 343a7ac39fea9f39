//! Read-only assembly of the goal tree for hierarchy display.

use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::goals::store::{GoalStore, StoredGoal};
use crate::goals::types::{record_to_goal, record_to_key_result, GoalRecord, GoalTreeNode};

/// Builds the nested tree under `root_id`, or the whole forest of active
/// roots when no root is given.
pub fn get_hierarchy<S: GoalStore>(
    store: &mut S,
    tenant_id: Uuid,
    root_id: Option<Uuid>,
) -> Result<Vec<GoalTreeNode>, GoalsError> {
    let roots = match root_id {
        Some(id) => {
            let record = store
                .find_goal(tenant_id, id)?
                .and_then(StoredGoal::into_active)
                .ok_or_else(|| GoalsError::NotFound("Goal not found".to_string()))?;
            vec![record]
        }
        None => store.find_roots(tenant_id)?,
    };
    build_hierarchy(store, tenant_id, roots)
}

/// Assembles each root and its active descendants into a nested structure.
///
/// Uses an explicit work list instead of call-stack recursion, so tree depth
/// is bounded by tenant data size rather than stack space. A goal with no
/// active children yields an empty `children` vec. The traversal trusts that
/// parent edges form a forest; the mutation guard keeps cycles out.
pub fn build_hierarchy<S: GoalStore>(
    store: &mut S,
    tenant_id: Uuid,
    roots: Vec<GoalRecord>,
) -> Result<Vec<GoalTreeNode>, GoalsError> {
    // First pass: flatten the forest into an arena, remembering each node's
    // parent slot. Children always land at higher indices than their parent.
    let mut arena: Vec<(Option<usize>, GoalTreeNode)> = Vec::new();
    let mut work: Vec<(Option<usize>, GoalRecord)> =
        roots.into_iter().rev().map(|r| (None, r)).collect();

    while let Some((parent_slot, record)) = work.pop() {
        let goal_id = record.id;
        let key_results = store
            .find_key_results(goal_id)?
            .into_iter()
            .map(record_to_key_result)
            .collect();
        let slot = arena.len();
        arena.push((
            parent_slot,
            GoalTreeNode {
                goal: record_to_goal(record),
                key_results,
                children: Vec::new(),
            },
        ));
        let children = store.find_children(tenant_id, goal_id, true)?;
        for child in children.into_iter().rev() {
            work.push((Some(slot), child));
        }
    }

    // Second pass: fold the arena back into nested nodes from the bottom up.
    // By the time a slot is popped, all of its children have been attached.
    let mut forest = Vec::new();
    while let Some((parent_slot, mut node)) = arena.pop() {
        node.children.reverse();
        match parent_slot {
            Some(slot) => arena[slot].1.children.push(node),
            None => forest.push(node),
        }
    }
    forest.reverse();
    Ok(forest)
}
