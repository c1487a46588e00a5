use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a push recipient: a student user or a university.
///
/// Uniqueness scope is process-wide; the id is never persisted by this
/// service and carries no structure the core depends on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Notification type enumeration
///
/// Closed set of the domain events the platform pushes. Producer-supplied
/// strings outside this set fall back to `System` rather than failing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    /// A job posting matched the student's profile
    JobMatch,
    /// Skill-gap analysis produced a recommendation
    SkillDevelopment,
    /// An assessment deadline is approaching
    AssessmentReminder,
    /// An application changed status
    ApplicationUpdate,
    /// An interview was scheduled or rescheduled
    InterviewSchedule,
    /// Placement dashboard update for a university
    PlacementUpdate,
    /// Platform notice; also the fallback for unknown tags
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::JobMatch => "jobMatch",
            NotificationType::SkillDevelopment => "skillDevelopment",
            NotificationType::AssessmentReminder => "assessmentReminder",
            NotificationType::ApplicationUpdate => "applicationUpdate",
            NotificationType::InterviewSchedule => "interviewSchedule",
            NotificationType::PlacementUpdate => "placementUpdate",
            NotificationType::System => "system",
        }
    }

    /// Parse a producer-supplied tag. Producers pick tags ad hoc, so the
    /// kebab- and snake-case spellings seen in the wild are accepted too.
    pub fn parse(s: &str) -> Self {
        match s {
            "jobMatch" | "job-match" | "job_match" => NotificationType::JobMatch,
            "skillDevelopment" | "skill-development" | "skill_development" => {
                NotificationType::SkillDevelopment
            }
            "assessmentReminder" | "assessment-reminder" | "assessment_reminder" => {
                NotificationType::AssessmentReminder
            }
            "applicationUpdate" | "application-update" | "application_update" => {
                NotificationType::ApplicationUpdate
            }
            "interviewSchedule" | "interview-schedule" | "interview_schedule" => {
                NotificationType::InterviewSchedule
            }
            "placementUpdate" | "placement-update" | "placement_update" => {
                NotificationType::PlacementUpdate
            }
            _ => NotificationType::System,
        }
    }
}

/// Notification priority level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    High,
    Medium,
    Low,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::High => "high",
            NotificationPriority::Medium => "medium",
            NotificationPriority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "high" => NotificationPriority::High,
            "low" => NotificationPriority::Low,
            _ => NotificationPriority::Medium,
        }
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        NotificationPriority::Medium
    }
}

/// A formatted notification record.
///
/// This is also the outbound wire shape: delivered and flushed frames are
/// the serialized record itself, with `created_at` exposed as `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,

    pub recipient: SubscriberId,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub title: String,

    pub content: String,

    pub priority: NotificationPriority,

    /// Opaque producer payload, echoed to the client untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Read state, maintained by the store, not by delivery
    pub is_read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,

    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Build a record from producer input, assigning id and timestamp.
    pub fn from_input(recipient: SubscriberId, input: NotificationInput) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient,
            notification_type: input.notification_type,
            title: input.title,
            content: input.content,
            priority: input.priority,
            data: input.data,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Producer-facing notification input: everything except identity and
/// timestamps, which the dispatcher assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl NotificationInput {
    pub fn new(
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            notification_type,
            title: title.into(),
            content: content.into(),
            priority,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Job-match notifications are delivered at high priority.
    pub fn job_match(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            NotificationType::JobMatch,
            title,
            content,
            NotificationPriority::High,
        )
    }

    pub fn skill_development(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            NotificationType::SkillDevelopment,
            title,
            content,
            NotificationPriority::Medium,
        )
    }

    pub fn assessment_reminder(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(
            NotificationType::AssessmentReminder,
            title,
            content,
            NotificationPriority::High,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_type_parse_fallback() {
        assert_eq!(NotificationType::parse("jobMatch"), NotificationType::JobMatch);
        assert_eq!(NotificationType::parse("job-match"), NotificationType::JobMatch);
        assert_eq!(
            NotificationType::parse("skill_development"),
            NotificationType::SkillDevelopment
        );
        assert_eq!(NotificationType::parse("bogus"), NotificationType::System);
        assert_eq!(NotificationType::parse(""), NotificationType::System);
    }

    #[test]
    fn test_priority_parse_fallback() {
        assert_eq!(NotificationPriority::parse("high"), NotificationPriority::High);
        assert_eq!(NotificationPriority::parse("low"), NotificationPriority::Low);
        assert_eq!(NotificationPriority::parse("urgent"), NotificationPriority::Medium);
    }

    #[test]
    fn test_notification_wire_shape() {
        let input = NotificationInput::job_match("New match", "92% match")
            .with_data(serde_json::json!({"jobId": "j-1"}));
        let record = Notification::from_input(SubscriberId::from("u42"), input);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "jobMatch");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["recipient"], "u42");
        assert_eq!(json["data"]["jobId"], "j-1");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("created_at").is_none());
    }

    #[test]
    fn test_notification_roundtrip() {
        let record = Notification::from_input(
            SubscriberId::from("uni-7"),
            NotificationInput::new(
                NotificationType::PlacementUpdate,
                "Placement rate updated",
                "84% of the 2026 cohort placed",
                NotificationPriority::Medium,
            ),
        );

        let json = serde_json::to_string(&record).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn test_input_default_priority() {
        let input: NotificationInput = serde_json::from_value(serde_json::json!({
            "type": "assessmentReminder",
            "title": "Assessment due",
            "content": "Your coding assessment closes tomorrow"
        }))
        .unwrap();
        assert_eq!(input.priority, NotificationPriority::Medium);
        assert!(input.data.is_none());
    }

    #[test]
    fn test_subscriber_id_is_empty() {
        assert!(SubscriberId::from("").is_empty());
        assert!(SubscriberId::from("   ").is_empty());
        assert!(!SubscriberId::from("u42").is_empty());
    }
}
