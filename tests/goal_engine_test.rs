//! Engine-level tests for the goal hierarchy: validation, progress roll-up,
//! soft deletion and tree assembly, all against an in-memory store.

use chrono::{Duration, Utc};
use uuid::Uuid;

use hrserver::goals::engine::GoalEngine;
use hrserver::goals::error::GoalsError;
use hrserver::goals::hierarchy::get_hierarchy;
use hrserver::goals::store::{GoalStore, StoredGoal};
use hrserver::goals::types::{
    to_decimal, CreateGoalRequest, CreateKeyResultRequest, GoalFilters, GoalRecord, GoalStatus,
    GoalType, KeyResultRecord, KeyResultValueUpdate, UpdateGoalRequest, UpdateProgressRequest,
};

#[derive(Default)]
struct MemStore {
    goals: Vec<GoalRecord>,
    key_results: Vec<KeyResultRecord>,
}

impl GoalStore for MemStore {
    fn find_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<Option<StoredGoal>, GoalsError> {
        Ok(self
            .goals
            .iter()
            .find(|g| g.tenant_id == tenant_id && g.id == id)
            .map(|g| {
                if g.is_active {
                    StoredGoal::Active(g.clone())
                } else {
                    StoredGoal::Tombstoned(g.id)
                }
            }))
    }

    fn find_children(
        &mut self,
        tenant_id: Uuid,
        parent_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<GoalRecord>, GoalsError> {
        let mut out: Vec<GoalRecord> = self
            .goals
            .iter()
            .filter(|g| g.tenant_id == tenant_id && g.parent_id == Some(parent_id))
            .filter(|g| !active_only || g.is_active)
            .cloned()
            .collect();
        out.sort_by_key(|g| g.created_at);
        Ok(out)
    }

    fn find_roots(&mut self, tenant_id: Uuid) -> Result<Vec<GoalRecord>, GoalsError> {
        let mut out: Vec<GoalRecord> = self
            .goals
            .iter()
            .filter(|g| g.tenant_id == tenant_id && g.parent_id.is_none() && g.is_active)
            .cloned()
            .collect();
        out.sort_by_key(|g| g.created_at);
        Ok(out)
    }

    fn find_key_results(&mut self, goal_id: Uuid) -> Result<Vec<KeyResultRecord>, GoalsError> {
        let mut out: Vec<KeyResultRecord> = self
            .key_results
            .iter()
            .filter(|kr| kr.goal_id == goal_id)
            .cloned()
            .collect();
        out.sort_by_key(|kr| kr.created_at);
        Ok(out)
    }

    fn find_key_result(&mut self, id: Uuid) -> Result<Option<KeyResultRecord>, GoalsError> {
        Ok(self.key_results.iter().find(|kr| kr.id == id).cloned())
    }

    fn insert_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError> {
        self.goals.push(record.clone());
        Ok(())
    }

    fn save_goal(&mut self, record: &GoalRecord) -> Result<(), GoalsError> {
        let slot = self
            .goals
            .iter_mut()
            .find(|g| g.id == record.id)
            .ok_or_else(|| GoalsError::NotFound("Goal not found".to_string()))?;
        *slot = record.clone();
        Ok(())
    }

    fn soft_delete_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), GoalsError> {
        if let Some(goal) = self
            .goals
            .iter_mut()
            .find(|g| g.tenant_id == tenant_id && g.id == id)
        {
            goal.is_active = false;
            goal.updated_at = Utc::now();
        }
        Ok(())
    }

    fn list_goals(
        &mut self,
        tenant_id: Uuid,
        filters: &GoalFilters,
    ) -> Result<Vec<GoalRecord>, GoalsError> {
        let mut out: Vec<GoalRecord> = self
            .goals
            .iter()
            .filter(|g| g.tenant_id == tenant_id && g.is_active)
            .filter(|g| filters.status.as_ref().map_or(true, |s| &g.status == s))
            .filter(|g| filters.goal_type.as_ref().map_or(true, |t| &g.goal_type == t))
            .filter(|g| filters.category.as_ref().map_or(true, |c| &g.category == c))
            .filter(|g| filters.user_id.map_or(true, |u| g.user_id == u))
            .filter(|g| {
                filters
                    .department_id
                    .map_or(true, |d| g.department_id == Some(d))
            })
            .filter(|g| filters.parent_id.map_or(true, |p| g.parent_id == Some(p)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = filters.offset.unwrap_or(0).max(0) as usize;
        let mut out: Vec<GoalRecord> = out.into_iter().skip(offset).collect();
        if let Some(limit) = filters.limit {
            out.truncate(limit.max(0) as usize);
        }
        Ok(out)
    }

    fn insert_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError> {
        self.key_results.push(record.clone());
        Ok(())
    }

    fn save_key_result(&mut self, record: &KeyResultRecord) -> Result<(), GoalsError> {
        let slot = self
            .key_results
            .iter_mut()
            .find(|kr| kr.id == record.id)
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
        *slot = record.clone();
        Ok(())
    }

    fn delete_key_result(&mut self, id: Uuid) -> Result<(), GoalsError> {
        self.key_results.retain(|kr| kr.id != id);
        Ok(())
    }
}

fn base_request(title: &str) -> CreateGoalRequest {
    let today = Utc::now().date_naive();
    CreateGoalRequest {
        title: Some(title.to_string()),
        description: None,
        goal_type: None,
        category: None,
        target_value: None,
        current_value: None,
        unit: None,
        start_date: Some(today),
        due_date: Some(today + Duration::days(90)),
        weight: None,
        parent_id: None,
        department_id: None,
        user_id: None,
        key_results: None,
    }
}

fn kr(title: &str, target: f64, current: f64) -> CreateKeyResultRequest {
    CreateKeyResultRequest {
        title: title.to_string(),
        target_value: target,
        current_value: Some(current),
        unit: None,
        weight: None,
    }
}

fn progress_of(record: &GoalRecord) -> f64 {
    use bigdecimal::ToPrimitive;
    record.progress.to_f64().unwrap_or(f64::NAN)
}

#[test]
fn create_goal_computes_progress_from_key_results() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let mut req = base_request("Grow revenue");
    req.key_results = Some(vec![kr("Deals closed", 10.0, 5.0), kr("ARR", 40.0, 30.0)]);
    let goal = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap();

    assert_eq!(progress_of(&goal), 62.5);
    assert_eq!(goal.status, "in_progress");
}

#[test]
fn create_goal_requires_title_and_dates() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let mut req = base_request("  ");
    req.title = Some("   ".to_string());
    let err = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap_err();
    assert!(matches!(err, GoalsError::Validation(_)));

    let mut req = base_request("Valid");
    req.due_date = None;
    let err = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap_err();
    assert!(matches!(err, GoalsError::Validation(_)));
}

#[test]
fn team_goal_requires_department() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let mut req = base_request("Team goal");
    req.goal_type = Some(GoalType::Team);
    let err = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap_err();
    assert!(matches!(err, GoalsError::Validation(_)));

    let mut req = base_request("Team goal");
    req.goal_type = Some(GoalType::Team);
    req.department_id = Some(Uuid::new_v4());
    assert!(engine.create_goal(tenant, Uuid::new_v4(), req).is_ok());
}

#[test]
fn direct_value_progress_caps_at_hundred() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut req = base_request("Ship features");
    req.target_value = Some(100.0);
    let goal = engine.create_goal(tenant, actor, req).unwrap();
    assert_eq!(progress_of(&goal), 0.0);
    assert_eq!(goal.status, "not_started");

    let updated = engine
        .update_goal_progress(
            tenant,
            goal.id,
            UpdateProgressRequest {
                current_value: Some(40.0),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(progress_of(&updated), 40.0);
    assert_eq!(updated.status, "in_progress");

    let updated = engine
        .update_goal_progress(
            tenant,
            goal.id,
            UpdateProgressRequest {
                current_value: Some(250.0),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(progress_of(&updated), 100.0);
    assert_eq!(updated.status, "completed");
}

#[test]
fn progress_update_without_value_or_key_results_conflicts() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let goal = engine
        .create_goal(tenant, Uuid::new_v4(), base_request("Bare goal"))
        .unwrap();
    let err = engine
        .update_goal_progress(
            tenant,
            goal.id,
            UpdateProgressRequest {
                current_value: None,
                note: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GoalsError::Conflict(_)));
}

#[test]
fn key_results_drive_progress_over_direct_values() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let mut req = base_request("OKR goal");
    req.target_value = Some(100.0);
    req.key_results = Some(vec![kr("Single", 10.0, 5.0)]);
    let goal = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap();
    assert_eq!(progress_of(&goal), 50.0);

    // The direct value is recorded but the key results still own the number.
    let updated = engine
        .update_goal_progress(
            tenant,
            goal.id,
            UpdateProgressRequest {
                current_value: Some(99.0),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(progress_of(&updated), 50.0);
    assert_eq!(updated.current_value, to_decimal(99.0));
}

#[test]
fn updating_key_results_completes_goal_and_rolls_up() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let mut parent_req = base_request("Company objective");
    parent_req.key_results = Some(vec![kr("North star", 100.0, 20.0)]);
    let parent = engine.create_goal(tenant, actor, parent_req).unwrap();
    assert_eq!(progress_of(&parent), 20.0);

    let mut child_req = base_request("Team objective");
    child_req.parent_id = Some(parent.id);
    child_req.key_results = Some(vec![kr("Metric", 10.0, 5.0)]);
    let child = engine.create_goal(tenant, actor, child_req).unwrap();

    // Move the parent's own key result underneath it, then touch the child;
    // the roll-up walk must pick the new value up.
    store
        .key_results
        .iter_mut()
        .find(|k| k.goal_id == parent.id)
        .unwrap()
        .current_value = to_decimal(60.0);
    let kr_id = store
        .key_results
        .iter()
        .find(|k| k.goal_id == child.id)
        .unwrap()
        .id;
    let mut engine = GoalEngine::new(&mut store);
    let updated_child = engine
        .update_key_results(
            tenant,
            child.id,
            vec![KeyResultValueUpdate {
                id: kr_id,
                current_value: 10.0,
            }],
        )
        .unwrap();
    assert_eq!(progress_of(&updated_child), 100.0);
    assert_eq!(updated_child.status, "completed");

    let rolled_parent = store
        .goals
        .iter()
        .find(|g| g.id == parent.id)
        .unwrap()
        .clone();
    assert_eq!(progress_of(&rolled_parent), 60.0);
    assert_eq!(rolled_parent.status, "in_progress");
}

#[test]
fn roll_up_stops_silently_on_missing_ancestor() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let parent = engine
        .create_goal(tenant, actor, base_request("Doomed parent"))
        .unwrap();
    let mut child_req = base_request("Orphaned child");
    child_req.parent_id = Some(parent.id);
    child_req.target_value = Some(10.0);
    let child = engine.create_goal(tenant, actor, child_req).unwrap();

    // Tombstone the parent out from under the child.
    store
        .goals
        .iter_mut()
        .find(|g| g.id == parent.id)
        .unwrap()
        .is_active = false;

    let mut engine = GoalEngine::new(&mut store);
    let updated = engine
        .update_goal_progress(
            tenant,
            child.id,
            UpdateProgressRequest {
                current_value: Some(5.0),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(progress_of(&updated), 50.0);
}

#[test]
fn delete_goal_with_active_children_conflicts() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let parent = engine
        .create_goal(tenant, actor, base_request("Parent"))
        .unwrap();
    let mut child_req = base_request("Child");
    child_req.parent_id = Some(parent.id);
    engine.create_goal(tenant, actor, child_req).unwrap();

    let err = engine.delete_goal(tenant, parent.id).unwrap_err();
    assert!(matches!(err, GoalsError::Conflict(_)));

    // The refused delete must leave the parent untouched.
    assert!(store.goals.iter().find(|g| g.id == parent.id).unwrap().is_active);
}

#[test]
fn deleted_goal_is_tombstoned_not_dropped() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let goal = engine
        .create_goal(tenant, Uuid::new_v4(), base_request("Short lived"))
        .unwrap();
    engine.delete_goal(tenant, goal.id).unwrap();

    let err = engine.get_goal(tenant, goal.id).unwrap_err();
    assert!(matches!(err, GoalsError::NotFound(_)));

    // The row survives for audit history.
    assert!(store.goals.iter().any(|g| g.id == goal.id && !g.is_active));
}

#[test]
fn cross_tenant_access_reports_not_found() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();

    let goal = engine
        .create_goal(tenant_a, Uuid::new_v4(), base_request("Private"))
        .unwrap();

    let err = engine.get_goal(tenant_b, goal.id).unwrap_err();
    assert!(matches!(err, GoalsError::NotFound(_)));
    let err = engine.delete_goal(tenant_b, goal.id).unwrap_err();
    assert!(matches!(err, GoalsError::NotFound(_)));
}

#[test]
fn reparenting_cannot_create_cycles() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let a = engine.create_goal(tenant, actor, base_request("A")).unwrap();
    let mut b_req = base_request("B");
    b_req.parent_id = Some(a.id);
    let b = engine.create_goal(tenant, actor, b_req).unwrap();

    // a -> b would close the loop a -> b -> a.
    let err = engine
        .update_goal_fields(
            tenant,
            a.id,
            UpdateGoalRequest {
                title: None,
                description: None,
                goal_type: None,
                category: None,
                target_value: None,
                unit: None,
                start_date: None,
                due_date: None,
                status: None,
                weight: None,
                parent_id: Some(b.id),
                department_id: None,
                user_id: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GoalsError::Validation(_)));

    // Self-parenting is refused outright.
    let err = engine
        .update_goal_fields(
            tenant,
            a.id,
            UpdateGoalRequest {
                title: None,
                description: None,
                goal_type: None,
                category: None,
                target_value: None,
                unit: None,
                start_date: None,
                due_date: None,
                status: None,
                weight: None,
                parent_id: Some(a.id),
                department_id: None,
                user_id: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GoalsError::Validation(_)));
}

#[test]
fn cancelled_status_sticks_through_progress_updates() {
    let mut store = MemStore::default();
    let mut engine = GoalEngine::new(&mut store);
    let tenant = Uuid::new_v4();

    let mut req = base_request("Abandoned initiative");
    req.target_value = Some(100.0);
    let goal = engine.create_goal(tenant, Uuid::new_v4(), req).unwrap();

    let cancelled = engine
        .update_goal_fields(
            tenant,
            goal.id,
            UpdateGoalRequest {
                title: None,
                description: None,
                goal_type: None,
                category: None,
                target_value: None,
                unit: None,
                start_date: None,
                due_date: None,
                status: Some(GoalStatus::Cancelled),
                weight: None,
                parent_id: None,
                department_id: None,
                user_id: None,
            },
        )
        .unwrap();
    assert_eq!(cancelled.status, "cancelled");

    let updated = engine
        .update_goal_progress(
            tenant,
            goal.id,
            UpdateProgressRequest {
                current_value: Some(70.0),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(updated.status, "cancelled");
    assert_eq!(progress_of(&updated), 70.0);
}

#[test]
fn adding_and_removing_key_results_recomputes() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let goal = engine
        .create_goal(tenant, Uuid::new_v4(), base_request("Evolving goal"))
        .unwrap();

    let added = engine
        .add_key_result(tenant, goal.id, kr("First metric", 10.0, 10.0))
        .unwrap();
    assert_eq!(added.status, "completed");
    let refreshed = engine.get_goal(tenant, goal.id).unwrap();
    assert_eq!(progress_of(&refreshed), 100.0);
    assert_eq!(refreshed.status, "completed");

    // Completion is sticky: removing the only key result drops the number
    // back to the direct value pair but the status stays.
    let after_removal = engine.remove_key_result(tenant, added.id).unwrap();
    assert_eq!(progress_of(&after_removal), 0.0);
    assert_eq!(after_removal.status, "completed");
}

#[test]
fn hierarchy_nests_children_and_leaves_are_empty() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let root = engine
        .create_goal(tenant, actor, base_request("Root"))
        .unwrap();
    let mut left_req = base_request("Left");
    left_req.parent_id = Some(root.id);
    left_req.key_results = Some(vec![kr("Metric", 10.0, 5.0)]);
    let left = engine.create_goal(tenant, actor, left_req).unwrap();
    let mut right_req = base_request("Right");
    right_req.parent_id = Some(root.id);
    engine.create_goal(tenant, actor, right_req).unwrap();
    let mut grandchild_req = base_request("Grandchild");
    grandchild_req.parent_id = Some(left.id);
    engine.create_goal(tenant, actor, grandchild_req).unwrap();

    let forest = get_hierarchy(&mut store, tenant, None).unwrap();
    assert_eq!(forest.len(), 1);
    let root_node = &forest[0];
    assert_eq!(root_node.goal.title, "Root");
    assert_eq!(root_node.children.len(), 2);
    assert_eq!(root_node.children[0].goal.title, "Left");
    assert_eq!(root_node.children[0].key_results.len(), 1);
    assert_eq!(root_node.children[0].children.len(), 1);
    assert_eq!(root_node.children[0].children[0].goal.title, "Grandchild");
    assert!(root_node.children[0].children[0].children.is_empty());
    assert_eq!(root_node.children[1].goal.title, "Right");
    assert!(root_node.children[1].children.is_empty());

    let subtree = get_hierarchy(&mut store, tenant, Some(left.id)).unwrap();
    assert_eq!(subtree.len(), 1);
    assert_eq!(subtree[0].goal.title, "Left");
    assert_eq!(subtree[0].children.len(), 1);

    let err = get_hierarchy(&mut store, tenant, Some(Uuid::new_v4())).unwrap_err();
    assert!(matches!(err, GoalsError::NotFound(_)));
}

#[test]
fn hierarchy_excludes_tombstoned_subtrees() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let root = engine
        .create_goal(tenant, actor, base_request("Root"))
        .unwrap();
    let mut child_req = base_request("Child");
    child_req.parent_id = Some(root.id);
    let child = engine.create_goal(tenant, actor, child_req).unwrap();
    engine.delete_goal(tenant, child.id).unwrap();

    let forest = get_hierarchy(&mut store, tenant, None).unwrap();
    assert_eq!(forest.len(), 1);
    assert!(forest[0].children.is_empty());
}

#[test]
fn stats_aggregate_per_tenant() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let mut engine = GoalEngine::new(&mut store);
    let mut done_req = base_request("Done");
    done_req.key_results = Some(vec![kr("Metric", 10.0, 10.0)]);
    engine.create_goal(tenant, actor, done_req).unwrap();

    let mut overdue_req = base_request("Overdue");
    overdue_req.start_date = Some(today - Duration::days(60));
    overdue_req.due_date = Some(today - Duration::days(1));
    overdue_req.key_results = Some(vec![kr("Metric", 10.0, 5.0)]);
    engine.create_goal(tenant, actor, overdue_req).unwrap();

    engine
        .create_goal(tenant, actor, base_request("Untouched"))
        .unwrap();

    // Another tenant's goal must not leak into the numbers.
    engine
        .create_goal(Uuid::new_v4(), actor, base_request("Elsewhere"))
        .unwrap();

    let stats = engine.get_stats(tenant, &GoalFilters::default()).unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.overdue_count, 1);
    assert_eq!(stats.avg_progress, 50.0);
    assert_eq!(stats.by_status.get("completed"), Some(&1));
    assert_eq!(stats.by_status.get("at_risk"), Some(&1));
    assert_eq!(stats.by_status.get("not_started"), Some(&1));
    assert_eq!(stats.by_type.get("individual"), Some(&3));
}

#[test]
fn list_goals_applies_filters() {
    let mut store = MemStore::default();
    let tenant = Uuid::new_v4();
    let user = Uuid::new_v4();
    let other_user = Uuid::new_v4();

    let mut engine = GoalEngine::new(&mut store);
    let mut mine = base_request("Mine");
    mine.user_id = Some(user);
    engine.create_goal(tenant, user, mine).unwrap();
    let mut theirs = base_request("Theirs");
    theirs.user_id = Some(other_user);
    engine.create_goal(tenant, other_user, theirs).unwrap();

    let filters = GoalFilters {
        user_id: Some(user),
        ..Default::default()
    };
    let listed = engine.list_goals(tenant, &filters).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].title, "Mine");
}
