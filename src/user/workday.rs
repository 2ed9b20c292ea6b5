//! Ordered per-user task list

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the number of tasks planned for one day
pub const MAX_TASKS_PER_DAY: usize = 8;

pub const MIN_FOCUS_PERIODS: u8 = 1;
pub const MAX_FOCUS_PERIODS: u8 = 9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkdayError {
    #[error("task with name [{0}] not found")]
    TaskNotFound(String),
    #[error("task with name [{0}] already exists")]
    DuplicateTask(String),
    #[error("workday already holds {MAX_TASKS_PER_DAY} tasks")]
    CapacityReached,
    #[error("position {index} is out of range for {len} tasks")]
    PositionOutOfRange { index: usize, len: usize },
}

/// A named unit of work with an assigned number of focus periods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub focus_periods: u8,
}

impl Task {
    pub fn new(name: impl Into<String>, focus_periods: u8) -> Self {
        Self {
            name: name.into(),
            focus_periods,
        }
    }
}

/// A user's tasks for the day, in user-controlled order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserWorkday {
    #[serde(default)]
    pub tasks_for_day: Vec<Task>,
    #[serde(default)]
    pub current_task_index: usize,
    #[serde(default)]
    pub periods_left: u8,
}

impl UserWorkday {
    pub fn len(&self) -> usize {
        self.tasks_for_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks_for_day.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_TASKS_PER_DAY
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks_for_day.iter().map(|t| t.name.clone()).collect()
    }

    pub fn task_by_name(&self, name: &str) -> Result<&Task, WorkdayError> {
        self.tasks_for_day
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| WorkdayError::TaskNotFound(name.to_string()))
    }

    fn position_of(&self, name: &str) -> Result<usize, WorkdayError> {
        self.tasks_for_day
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| WorkdayError::TaskNotFound(name.to_string()))
    }

    /// Check whether a task called `name` could be appended right now
    pub fn check_new_task(&self, name: &str) -> Result<(), WorkdayError> {
        if self.is_full() {
            return Err(WorkdayError::CapacityReached);
        }
        if self.task_by_name(name).is_ok() {
            return Err(WorkdayError::DuplicateTask(name.to_string()));
        }
        Ok(())
    }

    /// Append a task at the end of the day
    pub fn add_task(&mut self, task: Task) -> Result<(), WorkdayError> {
        self.check_new_task(&task.name)?;
        self.tasks_for_day.push(task);
        Ok(())
    }

    pub fn delete_task(&mut self, name: &str) -> Result<Task, WorkdayError> {
        let index = self.position_of(name)?;
        Ok(self.tasks_for_day.remove(index))
    }

    /// Replace the task called `name`; the replacement may carry a new name
    pub fn update_task(&mut self, name: &str, task: Task) -> Result<(), WorkdayError> {
        let index = self.position_of(name)?;
        if task.name != name && self.task_by_name(&task.name).is_ok() {
            return Err(WorkdayError::DuplicateTask(task.name));
        }
        self.tasks_for_day[index] = task;
        Ok(())
    }

    /// Move the task called `name` to the 0-based `new_index`.
    ///
    /// All other tasks keep their relative order.
    pub fn set_task_position(&mut self, name: &str, new_index: usize) -> Result<(), WorkdayError> {
        let len = self.len();
        if new_index >= len {
            return Err(WorkdayError::PositionOutOfRange {
                index: new_index,
                len,
            });
        }
        let index = self.position_of(name)?;
        let task = self.tasks_for_day.remove(index);
        self.tasks_for_day.insert(new_index, task);
        Ok(())
    }
}
