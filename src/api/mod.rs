mod envelope;
mod error;
mod rest;

pub use envelope::{normalize, Envelope};
pub use error::{require_id, ApiError, ApiResult};
pub use rest::RestGateway;

use crate::models::{
    AssignmentStats, ChannelPreferences, GradeRecord, Group, Notification, NotificationChannel,
    Student,
};

/// The seam between the reconciliation/notification logic and the backend.
///
/// Services are constructed once at startup and passed down explicitly; tests
/// substitute an in-memory fake. One method per resource-and-verb; every
/// method validates its identifier arguments before any network I/O and
/// reports failures through the structured [`ApiError`] taxonomy. Callers
/// decide what degrades and what propagates.
#[allow(async_fn_in_trait)]
pub trait CourseApi {
    // Reads
    async fn groups_for_course(&self, course_id: &str) -> ApiResult<Vec<Group>>;
    async fn course_roster(&self, course_id: &str) -> ApiResult<Vec<Student>>;
    async fn students_in_group(&self, group_id: &str) -> ApiResult<Vec<Student>>;
    async fn assignment_stats(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> ApiResult<AssignmentStats>;
    async fn grades(&self, student_id: &str, course_id: &str) -> ApiResult<Vec<GradeRecord>>;
    async fn all_students(&self) -> ApiResult<Vec<Student>>;
    async fn available_students(&self, group_id: &str) -> ApiResult<Vec<Student>>;
    async fn course_teachers(&self, course_id: &str) -> ApiResult<Vec<Student>>;

    // Group mutations
    async fn create_group(&self, name: &str, description: Option<&str>) -> ApiResult<Group>;
    async fn delete_group(&self, group_id: &str) -> ApiResult<()>;
    async fn add_student_to_group(&self, group_id: &str, student_id: &str) -> ApiResult<()>;
    async fn remove_student_from_group(&self, group_id: &str, student_id: &str) -> ApiResult<()>;
    async fn link_course(&self, group_id: &str, course_id: &str) -> ApiResult<()>;
    async fn unlink_course(&self, group_id: &str, course_id: &str) -> ApiResult<()>;
    async fn enroll_student(&self, course_id: &str, student_id: &str) -> ApiResult<()>;

    // Notifications
    async fn notifications(&self) -> ApiResult<Vec<Notification>>;
    async fn mark_notification_read(&self, id: &str) -> ApiResult<()>;
    async fn mark_all_notifications_read(&self) -> ApiResult<()>;
    async fn channel_preferences(&self) -> ApiResult<ChannelPreferences>;
    async fn update_channel_preference(
        &self,
        channel: NotificationChannel,
        enabled: bool,
    ) -> ApiResult<()>;
}
