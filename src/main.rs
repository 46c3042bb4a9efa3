use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classboard::api::{CourseApi, RestGateway};
use classboard::config::{self, Config};
use classboard::export;
use classboard::models::{self, CurrentUser, MutationOutcome};
use classboard::notify::NotificationCenter;
use classboard::reconcile::ReconciliationEngine;
use classboard::session::{Session, SessionStore};
use std::collections::HashSet;

#[derive(Parser)]
#[command(name = "classboard")]
#[command(about = "Course, group and notification client for the classboard backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile and print the roster for a course
    Roster { course_id: String },
    /// Reconcile a course roster and export it to CSV
    Export {
        course_id: String,
        /// Course name used in the exported filename
        #[arg(long)]
        name: Option<String>,
    },
    /// Create a new student group
    CreateGroup {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a group
    DeleteGroup { group_id: String },
    /// Add a student to a group
    AddStudent {
        group_id: String,
        student_id: String,
    },
    /// Remove a student from a group
    RemoveStudent {
        group_id: String,
        student_id: String,
    },
    /// List students who could still be added to a group
    AvailableStudents { group_id: String },
    /// Link a course to a group and enroll its members
    LinkCourse {
        group_id: String,
        course_id: String,
    },
    /// Unlink a course from a group (members stay enrolled)
    UnlinkCourse {
        group_id: String,
        course_id: String,
    },
    /// List notifications after preference filtering
    Notifications {
        /// Courses the user is enrolled in, for the enrolled-only filter
        #[arg(long = "course")]
        courses: Vec<String>,
    },
    /// Mark every notification as read
    MarkAllRead,
    /// Store a login session for later runs
    Login {
        token: String,
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "teacher")]
        role: String,
    },
    /// Clear the stored login session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Login and logout only touch the session file, no backend needed.
    match &cli.command {
        Commands::Login {
            token,
            user_id,
            email,
            role,
        } => {
            let store = SessionStore::new(config::session_path());
            store.save(&Session {
                token: token.clone(),
                user: CurrentUser {
                    id: user_id.clone(),
                    email: email.clone(),
                    name: None,
                    role: role.clone(),
                },
            })?;
            println!("Session saved.");
            return Ok(());
        }
        Commands::Logout => {
            SessionStore::new(config::session_path()).clear()?;
            println!("Session cleared.");
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load().context("Failed to load configuration")?;
    let gateway = RestGateway::new(config.api_base_url.clone(), config.token.clone())
        .context("Failed to build API gateway")?;

    match cli.command {
        Commands::Roster { course_id } => {
            let engine = ReconciliationEngine::new(gateway.clone());
            let view = engine.reconcile_course_roster(&course_id).await?;
            print_roster(&view);
            print_teachers(&gateway, &course_id).await;
        }
        Commands::Export { course_id, name } => {
            let engine = ReconciliationEngine::new(gateway);
            let view = engine.reconcile_course_roster(&course_id).await?;
            let course_name = name.unwrap_or_else(|| course_id.clone());
            let path = export::export_roster_csv(&view, &course_name)?;
            println!("Exported {} students to {}", view.records.len(), path.display());
            println!(
                "Course mean submission rate: {:.2}, mean grade: {:.2}",
                view.mean_submission_rate, view.mean_grade
            );
        }
        Commands::CreateGroup { name, description } => {
            let group = gateway.create_group(&name, description.as_deref()).await?;
            println!("Created group {} ({})", group.name, group.id);
        }
        Commands::DeleteGroup { group_id } => {
            gateway.delete_group(&group_id).await?;
            println!("Deleted group {}", group_id);
        }
        Commands::AddStudent {
            group_id,
            student_id,
        } => {
            let engine = ReconciliationEngine::new(gateway);
            let outcome = engine.add_student_to_group(&group_id, &student_id).await;
            print_outcome("add", &outcome);
        }
        Commands::RemoveStudent {
            group_id,
            student_id,
        } => {
            let engine = ReconciliationEngine::new(gateway);
            let outcome = engine
                .remove_student_from_group(&group_id, &student_id)
                .await;
            print_outcome("remove", &outcome);
        }
        Commands::AvailableStudents { group_id } => {
            let engine = ReconciliationEngine::new(gateway);
            let students = engine.available_students(&group_id).await?;
            if students.is_empty() {
                println!("No students available to add.");
            }
            for s in students {
                println!("  {} <{}>", s.full_name(), s.email);
            }
        }
        Commands::LinkCourse {
            group_id,
            course_id,
        } => {
            let engine = ReconciliationEngine::new(gateway);
            let report = engine.link_course_to_group(&group_id, &course_id).await;
            print_outcome("link", &report.outcome);
            for failure in &report.enrollment_failures {
                println!(
                    "  enrollment failed for {}: {}",
                    failure.student_id, failure.reason
                );
            }
        }
        Commands::UnlinkCourse {
            group_id,
            course_id,
        } => {
            let engine = ReconciliationEngine::new(gateway);
            let outcome = engine.unlink_course_from_group(&group_id, &course_id).await;
            print_outcome("unlink", &outcome);
        }
        Commands::Notifications { courses } => {
            let mut center = NotificationCenter::new(gateway);
            center.load_preferences().await;
            let enrolled: HashSet<String> = courses.into_iter().collect();
            let notifications = center.list_notifications(&enrolled).await;
            if notifications.is_empty() {
                println!("No notifications.");
            }
            for n in notifications {
                let read = if n.read { " " } else { "*" };
                println!(
                    "{} [{:?}/{:?}] {}: {}",
                    read, n.notification_type, n.priority, n.title, n.message
                );
            }
        }
        Commands::MarkAllRead => {
            let mut center = NotificationCenter::new(gateway);
            if center.mark_all_read().await {
                println!("All notifications marked read.");
            } else {
                println!("Could not mark notifications read.");
            }
        }
        Commands::Login { .. } | Commands::Logout => unreachable!(),
    }

    Ok(())
}

fn print_roster(view: &models::CourseRosterView) {
    println!("Enrolled:");
    for r in view.enrolled() {
        println!(
            "  {} <{}> [{}] {}/{} submitted ({:.0}%), avg grade {:.2}",
            r.student.full_name(),
            r.student.email,
            r.group_name,
            r.stats.submitted_assignments,
            r.stats.total_assignments,
            r.stats.submission_rate * 100.0,
            r.average_grade
        );
    }
    println!("Not enrolled:");
    for r in view.not_enrolled() {
        println!(
            "  {} <{}> [{}]",
            r.student.full_name(),
            r.student.email,
            r.group_name
        );
    }
    println!(
        "Course mean submission rate: {:.2}, mean grade: {:.2}",
        view.mean_submission_rate, view.mean_grade
    );
}

/// Teacher list is permission-gated; a 403 renders a reduced view instead of
/// failing the whole command.
async fn print_teachers(gateway: &RestGateway, course_id: &str) {
    match gateway.course_teachers(course_id).await {
        Ok(teachers) => {
            println!("Teachers:");
            for t in teachers {
                println!("  {} <{}>", t.full_name(), t.email);
            }
        }
        Err(e) if e.is_permission() => {
            println!("Teachers: (hidden, insufficient permissions)");
        }
        Err(e) => {
            println!("Teachers: (unavailable: {})", e);
        }
    }
}

fn print_outcome(verb: &str, outcome: &MutationOutcome) {
    match outcome {
        MutationOutcome::Success => println!("{}: done", verb),
        MutationOutcome::AlreadyMember => println!("{}: already in place, nothing changed", verb),
        MutationOutcome::NotFound => println!("{}: not found", verb),
        MutationOutcome::PermissionDenied => println!("{}: permission denied", verb),
        MutationOutcome::Failed(msg) => println!("{}: failed ({})", verb, msg),
    }
}
