//! Goal mutation guard and roll-up engine.
//!
//! Every write to the goal hierarchy enters through [`GoalEngine`]: it
//! validates structural invariants, delegates numeric/status derivation to
//! [`crate::goals::progress`], persists through the [`GoalStore`] adapter and
//! walks the ancestor chain afterwards so every level reflects the same
//! progress/status policy.

use chrono::{NaiveDate, Utc};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

use crate::goals::error::GoalsError;
use crate::goals::progress::{compute_progress, resolve_status, round2};
use crate::goals::store::{GoalStore, StoredGoal};
use crate::goals::types::{
    record_to_key_result, to_decimal, CreateGoalRequest, CreateKeyResultRequest, GoalFilters,
    GoalRecord, GoalStats, GoalStatus, GoalType, KeyResult, KeyResultRecord, KeyResultStatus,
    KeyResultValueUpdate, UpdateGoalRequest, UpdateProgressRequest,
};
use bigdecimal::ToPrimitive;

pub struct GoalEngine<'a, S: GoalStore> {
    store: &'a mut S,
}

fn require_finite(value: f64, field: &str) -> Result<(), GoalsError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GoalsError::Validation(format!(
            "{field} must be a finite number"
        )))
    }
}

fn require_weight(value: f64) -> Result<(), GoalsError> {
    require_finite(value, "weight")?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(GoalsError::Validation(
            "weight must be greater than zero".to_string(),
        ))
    }
}

fn key_result_status_for(target: f64, current: f64) -> KeyResultStatus {
    if target > 0.0 && current >= target {
        KeyResultStatus::Completed
    } else if current > 0.0 {
        KeyResultStatus::InProgress
    } else {
        KeyResultStatus::NotStarted
    }
}

impl<'a, S: GoalStore> GoalEngine<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn active_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<GoalRecord, GoalsError> {
        self.store
            .find_goal(tenant_id, id)?
            .and_then(StoredGoal::into_active)
            .ok_or_else(|| GoalsError::NotFound("Goal not found".to_string()))
    }

    fn progress_inputs(&mut self, goal_id: Uuid) -> Result<Vec<KeyResult>, GoalsError> {
        Ok(self
            .store
            .find_key_results(goal_id)?
            .into_iter()
            .map(record_to_key_result)
            .collect())
    }

    /// Recomputes progress and status on `record` from the given key results
    /// and the record's own value pair.
    fn recompute(&self, record: &mut GoalRecord, key_results: &[KeyResult]) {
        let progress = compute_progress(
            record.target_value.as_ref().and_then(|v| v.to_f64()),
            record.current_value.to_f64().unwrap_or(0.0),
            key_results,
        );
        let status = resolve_status(
            progress,
            record.due_date,
            GoalStatus::from_str(&record.status),
            self.today(),
        );
        record.progress = to_decimal(progress);
        record.status = status.to_str().to_string();
        record.updated_at = Utc::now();
    }

    /// Walks up from `new_parent_id` and rejects if `goal_id` appears in the
    /// ancestor chain, so reparenting can never introduce a cycle.
    fn ensure_no_cycle(
        &mut self,
        tenant_id: Uuid,
        goal_id: Uuid,
        new_parent_id: Uuid,
    ) -> Result<(), GoalsError> {
        let mut visited = HashSet::new();
        let mut next = Some(new_parent_id);
        while let Some(ancestor_id) = next {
            if ancestor_id == goal_id {
                return Err(GoalsError::Validation(
                    "A goal cannot be its own ancestor".to_string(),
                ));
            }
            if !visited.insert(ancestor_id) {
                break;
            }
            next = match self.store.find_goal(tenant_id, ancestor_id)? {
                Some(StoredGoal::Active(ancestor)) => ancestor.parent_id,
                _ => None,
            };
        }
        Ok(())
    }

    fn new_key_result(
        &self,
        goal_id: Uuid,
        req: CreateKeyResultRequest,
    ) -> Result<KeyResultRecord, GoalsError> {
        if req.title.trim().is_empty() {
            return Err(GoalsError::Validation(
                "Key result title is required".to_string(),
            ));
        }
        require_finite(req.target_value, "target_value")?;
        let current = req.current_value.unwrap_or(0.0);
        require_finite(current, "current_value")?;
        let weight = req.weight.unwrap_or(1.0);
        require_weight(weight)?;
        let now = Utc::now();
        Ok(KeyResultRecord {
            id: Uuid::new_v4(),
            goal_id,
            title: req.title,
            target_value: to_decimal(req.target_value),
            current_value: to_decimal(current),
            unit: req.unit,
            weight: to_decimal(weight),
            status: key_result_status_for(req.target_value, current)
                .to_str()
                .to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn create_goal(
        &mut self,
        tenant_id: Uuid,
        actor_id: Uuid,
        req: CreateGoalRequest,
    ) -> Result<GoalRecord, GoalsError> {
        let title = req
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GoalsError::Validation("title is required".to_string()))?
            .to_string();
        let start_date = req
            .start_date
            .ok_or_else(|| GoalsError::Validation("start_date is required".to_string()))?;
        let due_date = req
            .due_date
            .ok_or_else(|| GoalsError::Validation("due_date is required".to_string()))?;

        let goal_type = req.goal_type.unwrap_or(GoalType::Individual);
        if goal_type == GoalType::Team && req.department_id.is_none() {
            return Err(GoalsError::Validation(
                "Team goals require a department_id".to_string(),
            ));
        }

        if let Some(target) = req.target_value {
            require_finite(target, "target_value")?;
        }
        let current = req.current_value.unwrap_or(0.0);
        require_finite(current, "current_value")?;
        let weight = req.weight.unwrap_or(1.0);
        require_weight(weight)?;

        // Parent must exist under the same tenant before anything is written.
        if let Some(parent_id) = req.parent_id {
            match self.store.find_goal(tenant_id, parent_id)? {
                Some(StoredGoal::Active(_)) => {}
                _ => {
                    return Err(GoalsError::NotFound(
                        "Parent goal not found".to_string(),
                    ))
                }
            }
        }

        let goal_id = Uuid::new_v4();
        let key_results: Vec<KeyResultRecord> = req
            .key_results
            .unwrap_or_default()
            .into_iter()
            .map(|kr| self.new_key_result(goal_id, kr))
            .collect::<Result<_, _>>()?;

        let now = Utc::now();
        let mut record = GoalRecord {
            id: goal_id,
            tenant_id,
            user_id: req.user_id.unwrap_or(actor_id),
            parent_id: req.parent_id,
            department_id: req.department_id,
            title,
            description: req.description,
            goal_type: goal_type.to_str().to_string(),
            category: req.category.unwrap_or_else(|| "okr".to_string()),
            target_value: req.target_value.map(to_decimal),
            current_value: to_decimal(current),
            unit: req.unit,
            start_date,
            due_date,
            status: GoalStatus::NotStarted.to_str().to_string(),
            progress: to_decimal(0.0),
            weight: to_decimal(weight),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let inputs: Vec<KeyResult> = key_results
            .iter()
            .cloned()
            .map(record_to_key_result)
            .collect();
        self.recompute(&mut record, &inputs);

        self.store.insert_goal(&record)?;
        for kr in &key_results {
            self.store.insert_key_result(kr)?;
        }

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(record)
    }

    pub fn update_goal_fields(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
        req: UpdateGoalRequest,
    ) -> Result<GoalRecord, GoalsError> {
        let mut record = self.active_goal(tenant_id, id)?;

        if let Some(parent_id) = req.parent_id {
            if parent_id == id {
                return Err(GoalsError::Validation(
                    "A goal cannot be its own parent".to_string(),
                ));
            }
            match self.store.find_goal(tenant_id, parent_id)? {
                Some(StoredGoal::Active(_)) => {}
                _ => {
                    return Err(GoalsError::NotFound(
                        "Parent goal not found".to_string(),
                    ))
                }
            }
            self.ensure_no_cycle(tenant_id, id, parent_id)?;
            record.parent_id = Some(parent_id);
        }

        if let Some(title) = req.title {
            if title.trim().is_empty() {
                return Err(GoalsError::Validation("title cannot be empty".to_string()));
            }
            record.title = title;
        }
        if let Some(description) = req.description {
            record.description = Some(description);
        }
        if let Some(goal_type) = req.goal_type {
            record.goal_type = goal_type.to_str().to_string();
        }
        if let Some(category) = req.category {
            record.category = category;
        }
        if let Some(target_value) = req.target_value {
            require_finite(target_value, "target_value")?;
            record.target_value = Some(to_decimal(target_value));
        }
        if let Some(unit) = req.unit {
            record.unit = Some(unit);
        }
        if let Some(start_date) = req.start_date {
            record.start_date = start_date;
        }
        if let Some(due_date) = req.due_date {
            record.due_date = due_date;
        }
        if let Some(status) = req.status {
            // The explicit edit path is the only one allowed to leave the
            // sticky completed/cancelled states.
            record.status = status.to_str().to_string();
        }
        if let Some(weight) = req.weight {
            require_weight(weight)?;
            record.weight = to_decimal(weight);
        }
        if let Some(department_id) = req.department_id {
            record.department_id = Some(department_id);
        }
        if let Some(user_id) = req.user_id {
            record.user_id = user_id;
        }

        if GoalType::from_str(&record.goal_type) == GoalType::Team
            && record.department_id.is_none()
        {
            return Err(GoalsError::Validation(
                "Team goals require a department_id".to_string(),
            ));
        }

        record.updated_at = Utc::now();
        self.store.save_goal(&record)?;
        Ok(record)
    }

    pub fn update_goal_progress(
        &mut self,
        tenant_id: Uuid,
        id: Uuid,
        req: UpdateProgressRequest,
    ) -> Result<GoalRecord, GoalsError> {
        let mut record = self.active_goal(tenant_id, id)?;
        let inputs = self.progress_inputs(id)?;

        if inputs.is_empty() {
            let current = req.current_value.ok_or_else(|| {
                GoalsError::Conflict(
                    "Goal has no key results; current_value is required".to_string(),
                )
            })?;
            require_finite(current, "current_value")?;
            record.current_value = to_decimal(current);
        } else if let Some(current) = req.current_value {
            // Recorded for reference; progress is driven by the key results.
            require_finite(current, "current_value")?;
            record.current_value = to_decimal(current);
        }

        self.recompute(&mut record, &inputs);
        self.store.save_goal(&record)?;

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(record)
    }

    pub fn add_key_result(
        &mut self,
        tenant_id: Uuid,
        goal_id: Uuid,
        req: CreateKeyResultRequest,
    ) -> Result<KeyResultRecord, GoalsError> {
        let mut record = self.active_goal(tenant_id, goal_id)?;
        let kr = self.new_key_result(goal_id, req)?;
        self.store.insert_key_result(&kr)?;

        let inputs = self.progress_inputs(goal_id)?;
        self.recompute(&mut record, &inputs);
        self.store.save_goal(&record)?;

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(kr)
    }

    pub fn update_key_results(
        &mut self,
        tenant_id: Uuid,
        goal_id: Uuid,
        updates: Vec<KeyResultValueUpdate>,
    ) -> Result<GoalRecord, GoalsError> {
        let mut record = self.active_goal(tenant_id, goal_id)?;

        let mut key_results = self.store.find_key_results(goal_id)?;
        let mut touched = HashSet::new();
        for update in &updates {
            require_finite(update.current_value, "current_value")?;
            let kr = key_results
                .iter_mut()
                .find(|kr| kr.id == update.id)
                .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
            kr.current_value = to_decimal(update.current_value);
            kr.status = key_result_status_for(
                kr.target_value.to_f64().unwrap_or(0.0),
                update.current_value,
            )
            .to_str()
            .to_string();
            kr.updated_at = Utc::now();
            touched.insert(kr.id);
        }
        for kr in key_results.iter().filter(|kr| touched.contains(&kr.id)) {
            self.store.save_key_result(kr)?;
        }

        let inputs: Vec<KeyResult> = key_results
            .into_iter()
            .map(record_to_key_result)
            .collect();
        self.recompute(&mut record, &inputs);
        self.store.save_goal(&record)?;

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(record)
    }

    pub fn remove_key_result(
        &mut self,
        tenant_id: Uuid,
        key_result_id: Uuid,
    ) -> Result<GoalRecord, GoalsError> {
        let kr = self
            .store
            .find_key_result(key_result_id)?
            .ok_or_else(|| GoalsError::NotFound("Key result not found".to_string()))?;
        let mut record = self.active_goal(tenant_id, kr.goal_id)?;

        self.store.delete_key_result(key_result_id)?;

        let inputs = self.progress_inputs(record.id)?;
        self.recompute(&mut record, &inputs);
        self.store.save_goal(&record)?;

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(record)
    }

    /// Soft delete. Goals with active children cannot be deleted; callers
    /// must delete or reparent the children first.
    pub fn delete_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<(), GoalsError> {
        let record = self.active_goal(tenant_id, id)?;

        let children = self.store.find_children(tenant_id, id, true)?;
        if !children.is_empty() {
            return Err(GoalsError::Conflict(format!(
                "Goal has {} active child goal(s); delete or reparent them first",
                children.len()
            )));
        }

        self.store.soft_delete_goal(tenant_id, id)?;

        if record.parent_id.is_some() {
            self.roll_up_chain(tenant_id, record.parent_id, record.id);
        }
        Ok(())
    }

    pub fn get_goal(&mut self, tenant_id: Uuid, id: Uuid) -> Result<GoalRecord, GoalsError> {
        self.active_goal(tenant_id, id)
    }

    pub fn list_goals(
        &mut self,
        tenant_id: Uuid,
        filters: &GoalFilters,
    ) -> Result<Vec<GoalRecord>, GoalsError> {
        self.store.list_goals(tenant_id, filters)
    }

    pub fn get_stats(
        &mut self,
        tenant_id: Uuid,
        filters: &GoalFilters,
    ) -> Result<GoalStats, GoalsError> {
        let records = self.store.list_goals(tenant_id, filters)?;
        let today = self.today();

        let total = records.len() as i64;
        let mut progress_sum = 0.0;
        let mut overdue_count = 0i64;
        let mut by_status: BTreeMap<String, i64> = BTreeMap::new();
        let mut by_type: BTreeMap<String, i64> = BTreeMap::new();
        let mut by_category: BTreeMap<String, i64> = BTreeMap::new();

        for record in &records {
            progress_sum += record.progress.to_f64().unwrap_or(0.0);
            let status = GoalStatus::from_str(&record.status);
            if status != GoalStatus::Completed
                && status != GoalStatus::Cancelled
                && record.due_date < today
            {
                overdue_count += 1;
            }
            *by_status.entry(record.status.clone()).or_insert(0) += 1;
            *by_type.entry(record.goal_type.clone()).or_insert(0) += 1;
            *by_category.entry(record.category.clone()).or_insert(0) += 1;
        }

        let avg_progress = if total > 0 {
            round2(progress_sum / total as f64)
        } else {
            0.0
        };

        Ok(GoalStats {
            total,
            avg_progress,
            overdue_count,
            by_status,
            by_type,
            by_category,
        })
    }

    /// Walks the ancestor chain upward from `next`, recomputing and
    /// persisting progress/status at every level until the root.
    ///
    /// Each ancestor's progress derives from its OWN key results and value
    /// pair; child goals do not feed into the number. A broken chain stops
    /// the walk without failing the mutation that triggered it: the leaf
    /// write has already succeeded. The visited set keeps pre-existing bad
    /// parent data from looping the walk.
    fn roll_up_chain(&mut self, tenant_id: Uuid, mut next: Option<Uuid>, origin: Uuid) {
        let mut visited = HashSet::from([origin]);
        while let Some(parent_id) = next {
            if !visited.insert(parent_id) {
                debug!("roll-up aborted: cycle at goal {parent_id}");
                break;
            }
            let mut parent = match self.store.find_goal(tenant_id, parent_id) {
                Ok(Some(StoredGoal::Active(p))) => p,
                Ok(_) => {
                    debug!("roll-up stopped: ancestor {parent_id} missing or inactive");
                    break;
                }
                Err(e) => {
                    debug!("roll-up stopped at {parent_id}: {e}");
                    break;
                }
            };
            let inputs = match self.progress_inputs(parent_id) {
                Ok(inputs) => inputs,
                Err(e) => {
                    debug!("roll-up stopped at {parent_id}: {e}");
                    break;
                }
            };
            self.recompute(&mut parent, &inputs);
            if let Err(e) = self.store.save_goal(&parent) {
                debug!("roll-up stopped at {parent_id}: {e}");
                break;
            }
            next = parent.parent_id;
        }
    }
}
