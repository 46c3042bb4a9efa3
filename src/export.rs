use crate::models::CourseRosterView;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

/// Export a reconciled roster to a CSV file, one row per student.
/// Course-level aggregates are not written here; the caller prints them.
pub fn export_roster_csv(view: &CourseRosterView, course_name: &str) -> Result<PathBuf> {
    if view.records.is_empty() {
        anyhow::bail!("No roster records to export");
    }

    // Generate filename with timestamp
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("roster_{}_{}.csv", course_name, timestamp);
    let filepath = PathBuf::from(&filename);

    let headers = [
        "student_id",
        "student_name",
        "email",
        "group",
        "enrolled",
        "submitted_assignments",
        "total_assignments",
        "submission_rate",
        "average_grade",
        "graded_entries",
    ];

    let mut wtr = csv::Writer::from_path(&filepath).context("Failed to create CSV file")?;

    wtr.write_record(headers)
        .context("Failed to write CSV headers")?;

    for record in &view.records {
        wtr.write_record(&[
            record.student.id.clone(),
            record.student.full_name(),
            record.student.email.clone(),
            record.group_name.clone(),
            record.enrolled.to_string(),
            record.stats.submitted_assignments.to_string(),
            record.stats.total_assignments.to_string(),
            format!("{:.2}", record.stats.submission_rate),
            format!("{:.2}", record.average_grade),
            record.graded_count.to_string(),
        ])
        .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;

    Ok(filepath)
}
