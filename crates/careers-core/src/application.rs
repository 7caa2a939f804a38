//! Candidate applications, the status transition graph and the audit entries
//! recorded for every change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Reviewing,
    InterviewScheduled,
    InterviewCompleted,
    Offered,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::Reviewing,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::InterviewCompleted,
        ApplicationStatus::Offered,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::InterviewCompleted => "interview_completed",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// The transition graph. Both the quick-action list and the server-side
    /// guard read this table and nothing else.
    pub const fn allowed_targets(self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Submitted => &[Reviewing, Rejected],
            Reviewing => &[InterviewScheduled, Rejected],
            InterviewScheduled => &[Rejected],
            InterviewCompleted => &[Offered, Rejected],
            Offered => &[Accepted, Rejected],
            Accepted | Rejected | Withdrawn => &[],
        }
    }

    pub fn can_transition_to(self, target: ApplicationStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Records may only be removed once rejected.
    pub fn can_delete(self) -> bool {
        self == ApplicationStatus::Rejected
    }

    /// Button label for moving an application into this status.
    pub const fn action_label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "Reopen",
            ApplicationStatus::Reviewing => "Start review",
            ApplicationStatus::InterviewScheduled => "Schedule interview",
            ApplicationStatus::InterviewCompleted => "Complete interview",
            ApplicationStatus::Offered => "Make offer",
            ApplicationStatus::Accepted => "Mark accepted",
            ApplicationStatus::Rejected => "Reject",
            ApplicationStatus::Withdrawn => "Mark withdrawn",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseEnumError::new("application status", value.trim()))
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QuickActionKind {
    Transition { target: ApplicationStatus },
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    #[serde(flatten)]
    pub kind: QuickActionKind,
    pub label: &'static str,
    pub destructive: bool,
}

/// Actions staff may take on an application in `status`, in display order.
pub fn available_actions(status: ApplicationStatus) -> Vec<QuickAction> {
    let mut actions = status
        .allowed_targets()
        .iter()
        .map(|&target| QuickAction {
            kind: QuickActionKind::Transition { target },
            label: target.action_label(),
            destructive: target == ApplicationStatus::Rejected,
        })
        .collect::<Vec<_>>();
    if status.can_delete() {
        actions.push(QuickAction {
            kind: QuickActionKind::Delete,
            label: "Delete",
            destructive: true,
        });
    }
    actions
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDocument {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub position_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub resume_url: Option<String>,
    pub cover_letter: Option<String>,
    pub documents: Vec<ApplicationDocument>,
    pub source: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Application {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Checks `target` against the graph and computes the change without
    /// touching `self`; callers persist the returned change.
    pub fn plan_transition(
        &self,
        target: ApplicationStatus,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, TransitionRejected> {
        if !self.status.can_transition_to(target) {
            return Err(TransitionRejected {
                from: self.status,
                to: target,
            });
        }
        let at = now.max(self.last_activity_at);
        Ok(StatusChange {
            application_id: self.id,
            from: self.status,
            to: target,
            at,
            activity: ApplicationActivity::status_changed(self.id, self.status, target, notes, at),
        })
    }
}

/// A guarded, not yet persisted status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub application_id: Uuid,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub at: DateTime<Utc>,
    pub activity: ApplicationActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error("transition from {from} to {to} is not allowed")]
pub struct TransitionRejected {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Submitted,
    StatusChanged,
}

impl ActivityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ActivityType::Submitted => "submitted",
            ActivityType::StatusChanged => "status_changed",
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "submitted" => Ok(ActivityType::Submitted),
            "status_changed" => Ok(ActivityType::StatusChanged),
            other => Err(ParseEnumError::new("activity type", other)),
        }
    }
}

/// Audit entry. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub id: Uuid,
    pub application_id: Uuid,
    pub activity_type: ActivityType,
    pub old_status: Option<ApplicationStatus>,
    pub new_status: ApplicationStatus,
    pub description: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApplicationActivity {
    pub fn submitted(application: &Application) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id: application.id,
            activity_type: ActivityType::Submitted,
            old_status: None,
            new_status: application.status,
            description: format!("Application submitted by {}", application.full_name()),
            notes: None,
            created_at: application.applied_at,
        }
    }

    pub fn status_changed(
        application_id: Uuid,
        from: ApplicationStatus,
        to: ApplicationStatus,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            application_id,
            activity_type: ActivityType::StatusChanged,
            old_status: Some(from),
            new_status: to,
            description: format!("Status changed from {from} to {to}"),
            notes: notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            created_at: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn application(status: ApplicationStatus) -> Application {
        let at = Utc.with_ymd_and_hms(2026, 10, 2, 8, 30, 0).single().unwrap();
        Application {
            id: Uuid::new_v4(),
            position_id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            linkedin_url: None,
            portfolio_url: None,
            resume_url: None,
            cover_letter: None,
            documents: vec![],
            source: None,
            status,
            applied_at: at,
            last_activity_at: at,
        }
    }

    #[test]
    fn graph_matches_quick_action_table() {
        use ApplicationStatus::*;
        let edges = [
            (Submitted, Reviewing),
            (Reviewing, InterviewScheduled),
            (InterviewCompleted, Offered),
            (Offered, Accepted),
            (Submitted, Rejected),
            (Reviewing, Rejected),
            (InterviewScheduled, Rejected),
            (InterviewCompleted, Rejected),
            (Offered, Rejected),
        ];
        for from in ApplicationStatus::ALL {
            for to in ApplicationStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    edges.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        for closed in [Accepted, Rejected, Withdrawn] {
            assert!(closed.allowed_targets().is_empty(), "{closed}");
        }
    }

    #[test]
    fn available_actions_follow_the_graph() {
        for status in ApplicationStatus::ALL {
            let targets = available_actions(status)
                .into_iter()
                .filter_map(|action| match action.kind {
                    QuickActionKind::Transition { target } => Some(target),
                    QuickActionKind::Delete => None,
                })
                .collect::<Vec<_>>();
            assert_eq!(targets, status.allowed_targets());
        }

        let rejected = available_actions(ApplicationStatus::Rejected);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].kind, QuickActionKind::Delete);
        assert!(available_actions(ApplicationStatus::Withdrawn).is_empty());
    }

    #[test]
    fn quick_actions_serialize_with_action_tag() {
        let json = serde_json::to_value(available_actions(ApplicationStatus::Offered)).unwrap();
        assert_eq!(json[0]["action"], "transition");
        assert_eq!(json[0]["target"], "accepted");
        assert_eq!(json[0]["label"], "Mark accepted");
        assert_eq!(json[1]["target"], "rejected");
        assert_eq!(json[1]["destructive"], true);
    }

    #[test]
    fn only_rejected_applications_can_be_deleted() {
        for status in ApplicationStatus::ALL {
            assert_eq!(status.can_delete(), status == ApplicationStatus::Rejected);
        }
    }

    #[test]
    fn planned_transition_records_old_and_new_status() {
        let app = application(ApplicationStatus::Submitted);
        let now = app.last_activity_at + Duration::minutes(5);
        let change = app
            .plan_transition(ApplicationStatus::Reviewing, Some("  looks strong ".into()), now)
            .expect("edge exists");
        assert_eq!(change.from, ApplicationStatus::Submitted);
        assert_eq!(change.to, ApplicationStatus::Reviewing);
        assert_eq!(change.at, now);
        assert_eq!(change.activity.old_status, Some(ApplicationStatus::Submitted));
        assert_eq!(change.activity.new_status, ApplicationStatus::Reviewing);
        assert_eq!(change.activity.notes.as_deref(), Some("looks strong"));
        assert_eq!(change.activity.activity_type, ActivityType::StatusChanged);
    }

    #[test]
    fn planned_transition_never_moves_activity_backwards() {
        let app = application(ApplicationStatus::Offered);
        let skewed = app.last_activity_at - Duration::hours(1);
        let change = app
            .plan_transition(ApplicationStatus::Accepted, None, skewed)
            .expect("edge exists");
        assert_eq!(change.at, app.last_activity_at);
    }

    #[test]
    fn planned_transition_rejects_missing_edge() {
        let app = application(ApplicationStatus::Reviewing);
        let err = app
            .plan_transition(ApplicationStatus::Offered, None, app.last_activity_at)
            .unwrap_err();
        assert_eq!(
            err,
            TransitionRejected {
                from: ApplicationStatus::Reviewing,
                to: ApplicationStatus::Offered,
            }
        );
        assert_eq!(err.to_string(), "transition from reviewing to offered is not allowed");
    }

    #[test]
    fn status_parses_loose_labels() {
        assert_eq!(
            "Interview Scheduled".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::InterviewScheduled)
        );
        assert_eq!(
            "interview-completed".parse::<ApplicationStatus>(),
            Ok(ApplicationStatus::InterviewCompleted)
        );
        assert!("hired".parse::<ApplicationStatus>().is_err());
    }
}
