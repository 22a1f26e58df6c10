//! Schedules and execution audit records.
//!
//! Cron expressions are checked for shape only. Deciding when a schedule is
//! due belongs to whatever external timer calls
//! [`WorkflowScheduler::handle_scheduled_execution`](crate::WorkflowScheduler::handle_scheduled_execution).

use crate::error::ScheduleError;
use agentry_core::{WorkflowExecutionId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cron expression with an optional timezone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronSchedule {
    /// The cron expression.
    pub expression: String,
    /// Timezone for evaluation.
    pub timezone: Option<String>,
}

impl CronSchedule {
    /// Creates a new cron schedule.
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            timezone: None,
        }
    }

    /// Sets the timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Validates the expression has five fields and the timezone is not blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression or timezone is invalid.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let parts: Vec<&str> = self.expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(ScheduleError::InvalidCronExpression {
                expression: self.expression.clone(),
                reason: format!("expected 5 parts, got {}", parts.len()),
            });
        }
        if let Some(timezone) = self.timezone.as_ref().filter(|tz| tz.trim().is_empty()) {
            return Err(ScheduleError::InvalidTimezone {
                timezone: timezone.clone(),
            });
        }
        Ok(())
    }
}

/// A request to attach a schedule to a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub cron: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl ScheduleRequest {
    /// Creates a request with no timezone or window.
    #[must_use]
    pub fn new(cron: impl Into<String>) -> Self {
        Self {
            cron: cron.into(),
            timezone: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Sets the timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Restricts firing to `[start, end]`.
    #[must_use]
    pub fn with_window(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}

/// A schedule attached to a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// The cron expression, exactly as requested.
    pub cron: String,
    pub timezone: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// When the schedule was attached.
    pub scheduled_at: DateTime<Utc>,
}

impl ScheduleConfig {
    /// Validates a request and builds the config.
    ///
    /// # Errors
    ///
    /// Returns an error if the cron expression, timezone or window is invalid.
    pub fn from_request(
        request: ScheduleRequest,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let cron = CronSchedule {
            expression: request.cron,
            timezone: request.timezone,
        };
        cron.validate()?;
        if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
            if end < start {
                return Err(ScheduleError::InvalidWindow {
                    reason: format!("end {end} is before start {start}"),
                });
            }
        }
        Ok(Self {
            cron: cron.expression,
            timezone: cron.timezone,
            start_date: request.start_date,
            end_date: request.end_date,
            scheduled_at: now,
        })
    }

    /// Returns whether `now` falls inside the start/end window.
    #[must_use]
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.start_date.is_none_or(|start| now >= start)
            && self.end_date.is_none_or(|end| now <= end)
    }
}

/// Status of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowExecutionStatus {
    /// Created by scheduling, waiting for a trigger.
    Pending,
    /// Steps are being dispatched.
    Running,
    /// Every step succeeded.
    Completed,
    /// A step failed.
    Failed,
    /// A trigger arrived but the workflow was not eligible to run.
    Skipped,
}

/// Audit record of one scheduled or triggered execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionRecord {
    pub id: WorkflowExecutionId,
    pub workflow_id: WorkflowId,
    pub status: WorkflowExecutionStatus,
    /// The schedule that produced this execution.
    pub trigger: Option<ScheduleConfig>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure or skip reason.
    pub error: Option<String>,
}

impl WorkflowExecutionRecord {
    /// Creates a pending record.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, trigger: Option<ScheduleConfig>) -> Self {
        Self {
            id: WorkflowExecutionId::new(),
            workflow_id,
            status: WorkflowExecutionStatus::Pending,
            trigger,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Marks the execution as started.
    pub fn start(&mut self) {
        self.status = WorkflowExecutionStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Marks the execution as completed.
    pub fn complete(&mut self) {
        self.status = WorkflowExecutionStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the execution as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = WorkflowExecutionStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Marks the execution as skipped.
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = WorkflowExecutionStatus::Skipped;
        self.error = Some(reason.into());
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cron_schedule_creation() {
        let schedule = CronSchedule::new("0 7 * * *").with_timezone("America/New_York");

        assert_eq!(schedule.expression, "0 7 * * *");
        assert_eq!(schedule.timezone, Some("America/New_York".to_string()));
    }

    #[test]
    fn cron_schedule_validation() {
        assert!(CronSchedule::new("0 7 * * *").validate().is_ok());
        assert!(CronSchedule::new("invalid").validate().is_err());
        assert!(CronSchedule::new("0 0 * * * *").validate().is_err());
        assert!(matches!(
            CronSchedule::new("0 0 * * *").with_timezone(" ").validate(),
            Err(ScheduleError::InvalidTimezone { .. })
        ));
    }

    #[test]
    fn config_keeps_the_literal_cron() {
        let now = Utc::now();
        let config = ScheduleConfig::from_request(
            ScheduleRequest::new("0 0 * * *").with_timezone("UTC"),
            now,
        )
        .expect("valid");
        assert_eq!(config.cron, "0 0 * * *");
        assert_eq!(config.timezone.as_deref(), Some("UTC"));
        assert_eq!(config.scheduled_at, now);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let err = ScheduleConfig::from_request(
            ScheduleRequest::new("0 0 * * *").with_window(Some(now), Some(now - Duration::days(1))),
            now,
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = Utc::now();
        let config = ScheduleConfig::from_request(
            ScheduleRequest::new("*/5 * * * *")
                .with_window(Some(now), Some(now + Duration::hours(1))),
            now,
        )
        .expect("valid");

        assert!(config.is_within_window(now));
        assert!(config.is_within_window(now + Duration::hours(1)));
        assert!(!config.is_within_window(now - Duration::seconds(1)));
        assert!(!config.is_within_window(now + Duration::hours(2)));
    }

    #[test]
    fn execution_record_lifecycle() {
        let mut record = WorkflowExecutionRecord::new(WorkflowId::new(), None);
        assert_eq!(record.status, WorkflowExecutionStatus::Pending);

        record.start();
        assert_eq!(record.status, WorkflowExecutionStatus::Running);
        assert!(record.started_at.is_some());

        record.fail("step 0 (gmail) failed");
        assert_eq!(record.status, WorkflowExecutionStatus::Failed);
        assert!(record.finished_at.is_some());
        assert_eq!(record.error.as_deref(), Some("step 0 (gmail) failed"));
    }
}
