use crate::api::{ApiError, CourseApi};
use crate::models::{
    average_grade, graded_count, AssignmentStats, CourseRosterView, EnrollmentFailure, GradeRecord,
    LinkReport, MutationOutcome, Student, StudentWithStats,
};
use futures::future::join_all;
use indexmap::IndexMap;
use reqwest::StatusCode;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Decide whether a student counts as enrolled in the course.
///
/// The backend's roster signal is not always available, so activity evidence
/// (a submission or a graded entry) also implies enrollment. The rule is
/// monotone: evidence only ever upgrades unknown/false to true, it never
/// overrides an explicit "enrolled" fact.
pub fn infer_enrollment(
    explicit_roster_flag: bool,
    stats: &AssignmentStats,
    grades: &[GradeRecord],
) -> bool {
    explicit_roster_flag || stats.submitted_assignments > 0 || graded_count(grades) > 0
}

/// Merges group membership, roster membership, assignment completion and
/// grades for a course into one consistent per-student view.
///
/// Holds no persistent state: every reconciliation pass rebuilds the view
/// from scratch. Constructed once at startup with the gateway and passed
/// down explicitly.
pub struct ReconciliationEngine<G> {
    api: G,
}

impl<G: CourseApi> ReconciliationEngine<G> {
    pub fn new(api: G) -> Self {
        Self { api }
    }

    /// Build the reconciled roster for a course.
    ///
    /// The group list is the only fetch that propagates an error; without it
    /// there is no meaningful partial result. Every per-student sub-fetch
    /// degrades to a zeroed/empty placeholder instead, so one bad student
    /// never aborts the whole roster.
    pub async fn reconcile_course_roster(
        &self,
        course_id: &str,
    ) -> Result<CourseRosterView, ApiError> {
        let groups = self.api.groups_for_course(course_id).await?;

        // One member fetch per group, in flight at once.
        let member_fetches =
            join_all(groups.iter().map(|g| self.api.students_in_group(&g.id))).await;

        // Deduplicate across groups; the first group a student is discovered
        // in supplies the displayed group name.
        let mut discovered: IndexMap<String, (Student, String)> = IndexMap::new();
        for (group, fetched) in groups.iter().zip(member_fetches) {
            let students = match fetched {
                Ok(students) => students,
                Err(e) => {
                    warn!(group_id = %group.id, error = %e, "skipping group: member fetch failed");
                    continue;
                }
            };
            for student in students {
                discovered
                    .entry(student.id.clone())
                    .or_insert((student, group.name.clone()));
            }
        }

        // Roster membership is best-effort; inference covers the gap.
        let roster: HashSet<String> = match self.api.course_roster(course_id).await {
            Ok(students) => students.into_iter().map(|s| s.id).collect(),
            Err(e) => {
                debug!(course_id, error = %e, "course roster unavailable, relying on activity evidence");
                HashSet::new()
            }
        };

        let records = join_all(discovered.into_values().map(|(student, group_name)| {
            let roster = &roster;
            async move {
                // Stats and grades are independent; issue both before
                // awaiting either, and let each degrade on its own.
                let (stats, grades) = tokio::join!(
                    self.api.assignment_stats(&student.id, course_id),
                    self.api.grades(&student.id, course_id),
                );

                let stats = match stats {
                    Ok(stats) => stats,
                    Err(e) => {
                        debug!(student_id = %student.id, error = %e, "stats unavailable, using placeholder");
                        AssignmentStats::default()
                    }
                }
                .repaired();

                let grades = match grades {
                    Ok(grades) => grades,
                    Err(e) => {
                        debug!(student_id = %student.id, error = %e, "grades unavailable, using placeholder");
                        Vec::new()
                    }
                };

                let enrolled = infer_enrollment(roster.contains(&student.id), &stats, &grades);

                StudentWithStats {
                    enrolled,
                    average_grade: average_grade(&grades),
                    graded_count: graded_count(&grades),
                    stats,
                    student,
                    group_name,
                }
            }
        }))
        .await;

        Ok(build_view(records))
    }

    /// Students who could still be added to a group. The dedicated backend
    /// endpoint is best-effort and missing on older deployments; a 404 falls
    /// back to the full student list with current members filtered out
    /// client-side. Other errors propagate.
    pub async fn available_students(&self, group_id: &str) -> Result<Vec<Student>, ApiError> {
        match self.api.available_students(group_id).await {
            Ok(students) => Ok(students),
            Err(e) if e.is_not_found() => {
                let members: HashSet<String> = self
                    .api
                    .students_in_group(group_id)
                    .await?
                    .into_iter()
                    .map(|s| s.id)
                    .collect();
                let all = self.api.all_students().await?;
                Ok(all
                    .into_iter()
                    .filter(|s| !members.contains(&s.id))
                    .collect())
            }
            Err(e) => Err(e),
        }
    }

    /// Add a student to a group. A second identical call reports
    /// `AlreadyMember` rather than an error, and never grows the group twice.
    pub async fn add_student_to_group(&self, group_id: &str, student_id: &str) -> MutationOutcome {
        match self.api.add_student_to_group(group_id, student_id).await {
            Ok(()) => MutationOutcome::Success,
            Err(e) => outcome_from(e),
        }
    }

    /// Remove a student from a group. Removing the last course link from a
    /// group does not delete the group.
    pub async fn remove_student_from_group(
        &self,
        group_id: &str,
        student_id: &str,
    ) -> MutationOutcome {
        match self
            .api
            .remove_student_from_group(group_id, student_id)
            .await
        {
            Ok(()) => MutationOutcome::Success,
            Err(e) => outcome_from(e),
        }
    }

    /// Link a course to a group and enroll every current member into the
    /// course. Per-member enrollment failures are collected and reported;
    /// the link itself still counts as succeeded when some enrollments fail.
    pub async fn link_course_to_group(&self, group_id: &str, course_id: &str) -> LinkReport {
        // Members are captured before the link so "current members" is well
        // defined even if the group changes concurrently.
        let members = match self.api.students_in_group(group_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(group_id, error = %e, "member fetch failed, linking without auto-enrollment");
                Vec::new()
            }
        };

        if let Err(e) = self.api.link_course(group_id, course_id).await {
            return LinkReport {
                outcome: outcome_from(e),
                enrollment_failures: Vec::new(),
            };
        }

        let enrollments = join_all(
            members
                .iter()
                .map(|m| self.api.enroll_student(course_id, &m.id)),
        )
        .await;

        let enrollment_failures = members
            .iter()
            .zip(enrollments)
            .filter_map(|(member, result)| match result {
                Ok(()) => None,
                // Already enrolled is not a failure worth reporting.
                Err(ApiError::Status { status, .. }) if status == StatusCode::CONFLICT => None,
                Err(e) => Some(EnrollmentFailure {
                    student_id: member.id.clone(),
                    reason: e.to_string(),
                }),
            })
            .collect();

        LinkReport {
            outcome: MutationOutcome::Success,
            enrollment_failures,
        }
    }

    /// Unlink a course from a group. Members stay enrolled in the course;
    /// the asymmetry with linking is intentional.
    pub async fn unlink_course_from_group(
        &self,
        group_id: &str,
        course_id: &str,
    ) -> MutationOutcome {
        match self.api.unlink_course(group_id, course_id).await {
            Ok(()) => MutationOutcome::Success,
            Err(e) => outcome_from(e),
        }
    }
}

fn outcome_from(err: ApiError) -> MutationOutcome {
    match err {
        ApiError::Permission { .. } => MutationOutcome::PermissionDenied,
        ApiError::NotFound { .. } => MutationOutcome::NotFound,
        ApiError::Status { status, .. } if status == StatusCode::CONFLICT => {
            MutationOutcome::AlreadyMember
        }
        other => MutationOutcome::Failed(other.to_string()),
    }
}

fn build_view(records: Vec<StudentWithStats>) -> CourseRosterView {
    let mean_submission_rate = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.stats.submission_rate).sum::<f64>() / records.len() as f64
    };

    // Students with no graded entries are excluded from the grade-average
    // denominator, matching the per-student graded-only rule.
    let with_grades: Vec<f64> = records
        .iter()
        .filter(|r| r.graded_count > 0)
        .map(|r| r.average_grade)
        .collect();
    let mean_grade = if with_grades.is_empty() {
        0.0
    } else {
        with_grades.iter().sum::<f64>() / with_grades.len() as f64
    };

    CourseRosterView {
        records,
        mean_submission_rate,
        mean_grade,
    }
}
