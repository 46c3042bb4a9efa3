use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ============================================================================
// Backend API Models
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub course_linked: bool,
    /// Derived count reported by the backend; not authoritative.
    #[serde(default)]
    pub student_count: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Student {
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AssignmentStats {
    #[serde(default)]
    pub total_assignments: u32,
    #[serde(default)]
    pub submitted_assignments: u32,
    #[serde(default)]
    pub submission_rate: f64,
}

impl AssignmentStats {
    /// Repair a known backend inconsistency: a positive submitted count with
    /// a zero total. The repaired record has total == submitted and rate 1.0.
    /// The rate is always recomputed and clamped to [0, 1].
    pub fn repaired(mut self) -> Self {
        if self.submitted_assignments > 0 && self.total_assignments == 0 {
            self.total_assignments = self.submitted_assignments;
            self.submission_rate = 1.0;
        } else if self.total_assignments > 0 {
            self.submission_rate =
                self.submitted_assignments as f64 / self.total_assignments as f64;
        } else {
            self.submission_rate = 0.0;
        }
        self.submission_rate = self.submission_rate.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GradeRecord {
    pub assignment_id: String,
    /// None until the submission is graded.
    pub grade: Option<f64>,
    #[serde(default)]
    pub max_grade: f64,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub graded: bool,
}

impl GradeRecord {
    pub fn graded_value(&self) -> Option<f64> {
        self.grade
    }
}

/// Average over graded records only. Ungraded (null-grade) entries are
/// excluded from the denominator; an empty or fully-ungraded set averages 0.0.
pub fn average_grade(records: &[GradeRecord]) -> f64 {
    let graded: Vec<f64> = records.iter().filter_map(|r| r.graded_value()).collect();
    if graded.is_empty() {
        return 0.0;
    }
    graded.iter().sum::<f64>() / graded.len() as f64
}

pub fn graded_count(records: &[GradeRecord]) -> usize {
    records.iter().filter(|r| r.graded_value().is_some()).count()
}

// ============================================================================
// Notification Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Success,
    Warning,
    Error,
    Assignment,
    Grade,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        NotificationType::Info,
        NotificationType::Success,
        NotificationType::Warning,
        NotificationType::Error,
        NotificationType::Assignment,
        NotificationType::Grade,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl NotificationPriority {
    pub const ALL: [NotificationPriority; 3] = [
        NotificationPriority::Low,
        NotificationPriority::Medium,
        NotificationPriority::High,
    ];
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    #[serde(default)]
    pub read: bool,
    /// Local-only flag; the backend has no archive endpoint, so archived
    /// state is lost on reload.
    #[serde(default)]
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Notification {
    /// Course reference carried in the metadata map, if any. Notifications
    /// without one are system-wide and bypass the enrolled-courses filter.
    pub fn course_id(&self) -> Option<&str> {
        self.metadata.get("courseId").and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Push,
    InApp,
}

/// Channel toggles persisted on the backend, one record per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChannelPreferences {
    pub email: bool,
    pub push: bool,
    pub in_app: bool,
}

impl Default for ChannelPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            in_app: true,
        }
    }
}

impl ChannelPreferences {
    pub fn get(&self, channel: NotificationChannel) -> bool {
        match channel {
            NotificationChannel::Email => self.email,
            NotificationChannel::Push => self.push,
            NotificationChannel::InApp => self.in_app,
        }
    }
}

/// Filter settings that live only in the client for the session. They are
/// NOT persisted server-side and do not survive a reload. Kept as a separate
/// type from `ChannelPreferences` so the two cannot be confused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPreferences {
    pub enrolled_courses_only: bool,
    pub enabled_types: HashSet<NotificationType>,
    pub enabled_priorities: HashSet<NotificationPriority>,
}

impl Default for SessionPreferences {
    fn default() -> Self {
        Self {
            enrolled_courses_only: true,
            enabled_types: NotificationType::ALL.into_iter().collect(),
            enabled_priorities: NotificationPriority::ALL.into_iter().collect(),
        }
    }
}

// ============================================================================
// Internal Models for Reconciliation
// ============================================================================

/// One reconciled roster entry: group membership, enrollment, assignment
/// completion and grade state for a single student in a single course.
#[derive(Debug, Clone)]
pub struct StudentWithStats {
    pub student: Student,
    pub group_name: String,
    pub enrolled: bool,
    pub stats: AssignmentStats,
    pub average_grade: f64,
    pub graded_count: usize,
}

#[derive(Debug, Clone)]
pub struct CourseRosterView {
    /// All reconciled records, in discovery order.
    pub records: Vec<StudentWithStats>,
    /// Mean submission rate across all records; 0.0 for an empty roster.
    pub mean_submission_rate: f64,
    /// Mean grade across students with at least one graded record; 0.0 when
    /// no student has any.
    pub mean_grade: f64,
}

impl CourseRosterView {
    pub fn enrolled(&self) -> impl Iterator<Item = &StudentWithStats> {
        self.records.iter().filter(|r| r.enrolled)
    }

    pub fn not_enrolled(&self) -> impl Iterator<Item = &StudentWithStats> {
        self.records.iter().filter(|r| !r.enrolled)
    }
}

/// Outcome of a group-membership or course-link mutation. Lets callers tell
/// "nothing happened" apart from "something broke".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Success,
    AlreadyMember,
    NotFound,
    PermissionDenied,
    Failed(String),
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            MutationOutcome::Success | MutationOutcome::AlreadyMember
        )
    }
}

#[derive(Debug, Clone)]
pub struct EnrollmentFailure {
    pub student_id: String,
    pub reason: String,
}

/// Result of linking a course to a group. The link can succeed even when
/// some member enrollments fail; those failures are collected, not dropped.
#[derive(Debug, Clone)]
pub struct LinkReport {
    pub outcome: MutationOutcome,
    pub enrollment_failures: Vec<EnrollmentFailure>,
}

// ============================================================================
// Session Models
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
}
