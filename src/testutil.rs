//! In-memory stand-in for the backend, substituted through the `CourseApi`
//! seam. Setup methods shape the world; accessor methods let tests observe
//! which mutations reached the "backend".

use crate::api::{require_id, ApiError, ApiResult, CourseApi};
use crate::models::{
    AssignmentStats, ChannelPreferences, GradeRecord, Group, Notification, NotificationChannel,
    Student,
};
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn student(id: &str) -> Student {
    Student {
        id: id.to_string(),
        first_name: id.to_uppercase(),
        last_name: "Fake".to_string(),
        email: format!("{}@example.edu", id),
        role: Some("student".to_string()),
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::NotFound {
        url: format!("fake://{}", what),
    }
}

fn forbidden(what: &str) -> ApiError {
    ApiError::Permission {
        url: format!("fake://{}", what),
    }
}

fn conflict(what: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::CONFLICT,
        url: format!("fake://{}", what),
        body: "already exists".to_string(),
    }
}

fn server_error(what: &str) -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        url: format!("fake://{}", what),
        body: "injected failure".to_string(),
    }
}

#[derive(Default)]
struct State {
    groups: Vec<Group>,
    members: HashMap<String, Vec<Student>>,
    roster: HashSet<String>,
    stats: HashMap<String, AssignmentStats>,
    grades: HashMap<String, Vec<GradeRecord>>,
    course_links: HashSet<(String, String)>,
    available: Option<Vec<Student>>,
    notifications: Vec<Notification>,
    channel_prefs: ChannelPreferences,

    fail_groups: bool,
    fail_roster: bool,
    fail_stats: HashSet<String>,
    fail_grades: HashSet<String>,
    fail_enroll: HashSet<String>,
    fail_prefs: bool,
    deny_mutations: bool,

    enroll_calls: Vec<(String, String)>,
    read_ids: Vec<String>,
    read_all_calls: usize,
    channel_updates: Vec<(NotificationChannel, bool)>,
}

pub struct FakeApi {
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    // ---- setup ----

    pub fn add_group(&mut self, id: &str, name: &str, member_ids: &[&str]) {
        let state = self.state.get_mut().unwrap();
        state.groups.push(Group {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            course_linked: false,
            student_count: member_ids.len() as u32,
        });
        state
            .members
            .insert(id.to_string(), member_ids.iter().map(|m| student(m)).collect());
    }

    pub fn set_stats(&mut self, student_id: &str, total: u32, submitted: u32) {
        self.state.get_mut().unwrap().stats.insert(
            student_id.to_string(),
            AssignmentStats {
                total_assignments: total,
                submitted_assignments: submitted,
                submission_rate: 0.0,
            },
        );
    }

    pub fn add_grade(&mut self, student_id: &str, assignment_id: &str, grade: Option<f64>, max: f64) {
        self.state
            .get_mut()
            .unwrap()
            .grades
            .entry(student_id.to_string())
            .or_default()
            .push(GradeRecord {
                assignment_id: assignment_id.to_string(),
                grade,
                max_grade: max,
                submitted_at: None,
                graded: grade.is_some(),
            });
    }

    pub fn set_roster(&mut self, student_ids: &[&str]) {
        self.state.get_mut().unwrap().roster =
            student_ids.iter().map(|s| s.to_string()).collect();
    }

    /// Give the fake a dedicated available-students endpoint. Without this,
    /// it answers 404 like an older deployment.
    pub fn set_available_students(&mut self, student_ids: &[&str]) {
        self.state.get_mut().unwrap().available =
            Some(student_ids.iter().map(|id| student(id)).collect());
    }

    pub fn push_notification(&mut self, notification: Notification) {
        self.state.get_mut().unwrap().notifications.push(notification);
    }

    pub fn set_channel_prefs(&mut self, prefs: ChannelPreferences) {
        self.state.get_mut().unwrap().channel_prefs = prefs;
    }

    pub fn fail_groups(&mut self) {
        self.state.get_mut().unwrap().fail_groups = true;
    }

    pub fn fail_roster(&mut self) {
        self.state.get_mut().unwrap().fail_roster = true;
    }

    pub fn fail_stats_for(&mut self, student_id: &str) {
        self.state
            .get_mut()
            .unwrap()
            .fail_stats
            .insert(student_id.to_string());
    }

    pub fn fail_grades_for(&mut self, student_id: &str) {
        self.state
            .get_mut()
            .unwrap()
            .fail_grades
            .insert(student_id.to_string());
    }

    pub fn fail_enroll_for(&mut self, student_id: &str) {
        self.state
            .get_mut()
            .unwrap()
            .fail_enroll
            .insert(student_id.to_string());
    }

    pub fn fail_preferences(&mut self) {
        self.state.get_mut().unwrap().fail_prefs = true;
    }

    pub fn deny_mutations(&mut self) {
        self.state.get_mut().unwrap().deny_mutations = true;
    }

    // ---- observation ----

    pub fn group_size(&self, group_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .members
            .get(group_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.state.lock().unwrap().roster.contains(student_id)
    }

    pub fn enrollment_calls(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().enroll_calls.clone()
    }

    pub fn read_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().read_ids.clone()
    }

    pub fn read_all_calls(&self) -> usize {
        self.state.lock().unwrap().read_all_calls
    }

    pub fn channel_updates(&self) -> Vec<(NotificationChannel, bool)> {
        self.state.lock().unwrap().channel_updates.clone()
    }
}

impl CourseApi for FakeApi {
    async fn groups_for_course(&self, course_id: &str) -> ApiResult<Vec<Group>> {
        require_id(course_id, "course_id")?;
        let state = self.state.lock().unwrap();
        if state.fail_groups {
            return Err(server_error("groups"));
        }
        Ok(state.groups.clone())
    }

    async fn course_roster(&self, course_id: &str) -> ApiResult<Vec<Student>> {
        require_id(course_id, "course_id")?;
        let state = self.state.lock().unwrap();
        if state.fail_roster {
            return Err(server_error("roster"));
        }
        Ok(state.roster.iter().map(|id| student(id)).collect())
    }

    async fn students_in_group(&self, group_id: &str) -> ApiResult<Vec<Student>> {
        require_id(group_id, "group_id")?;
        let state = self.state.lock().unwrap();
        state
            .members
            .get(group_id)
            .cloned()
            .ok_or_else(|| not_found("group"))
    }

    async fn assignment_stats(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> ApiResult<AssignmentStats> {
        require_id(student_id, "student_id")?;
        require_id(course_id, "course_id")?;
        let state = self.state.lock().unwrap();
        if state.fail_stats.contains(student_id) {
            return Err(server_error("stats"));
        }
        state
            .stats
            .get(student_id)
            .cloned()
            .ok_or_else(|| not_found("stats"))
    }

    async fn grades(&self, student_id: &str, course_id: &str) -> ApiResult<Vec<GradeRecord>> {
        require_id(student_id, "student_id")?;
        require_id(course_id, "course_id")?;
        let state = self.state.lock().unwrap();
        if state.fail_grades.contains(student_id) {
            return Err(server_error("grades"));
        }
        Ok(state.grades.get(student_id).cloned().unwrap_or_default())
    }

    async fn all_students(&self) -> ApiResult<Vec<Student>> {
        let state = self.state.lock().unwrap();
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for members in state.members.values() {
            for m in members {
                if seen.insert(m.id.clone()) {
                    all.push(m.clone());
                }
            }
        }
        Ok(all)
    }

    async fn available_students(&self, group_id: &str) -> ApiResult<Vec<Student>> {
        require_id(group_id, "group_id")?;
        let state = self.state.lock().unwrap();
        match &state.available {
            Some(students) => Ok(students.clone()),
            // Behaves like an older deployment: the dedicated endpoint is gone.
            None => Err(not_found("available-students")),
        }
    }

    async fn course_teachers(&self, course_id: &str) -> ApiResult<Vec<Student>> {
        require_id(course_id, "course_id")?;
        Err(forbidden("teachers"))
    }

    async fn create_group(&self, name: &str, description: Option<&str>) -> ApiResult<Group> {
        require_id(name, "name")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("group"));
        }
        let group = Group {
            id: format!("g{}", state.groups.len() + 1),
            name: name.to_string(),
            description: description.map(|d| d.to_string()),
            course_linked: false,
            student_count: 0,
        };
        state.members.insert(group.id.clone(), Vec::new());
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, group_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("group"));
        }
        if state.members.remove(group_id).is_none() {
            return Err(not_found("group"));
        }
        state.groups.retain(|g| g.id != group_id);
        Ok(())
    }

    async fn add_student_to_group(&self, group_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(student_id, "student_id")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("membership"));
        }
        let members = state
            .members
            .get_mut(group_id)
            .ok_or_else(|| not_found("group"))?;
        if members.iter().any(|m| m.id == student_id) {
            return Err(conflict("membership"));
        }
        members.push(student(student_id));
        Ok(())
    }

    async fn remove_student_from_group(&self, group_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(student_id, "student_id")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("membership"));
        }
        let members = state
            .members
            .get_mut(group_id)
            .ok_or_else(|| not_found("group"))?;
        let before = members.len();
        members.retain(|m| m.id != student_id);
        if members.len() == before {
            return Err(not_found("membership"));
        }
        Ok(())
    }

    async fn link_course(&self, group_id: &str, course_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(course_id, "course_id")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("link"));
        }
        if !state.members.contains_key(group_id) {
            return Err(not_found("group"));
        }
        if !state
            .course_links
            .insert((group_id.to_string(), course_id.to_string()))
        {
            return Err(conflict("link"));
        }
        Ok(())
    }

    async fn unlink_course(&self, group_id: &str, course_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(course_id, "course_id")?;
        let mut state = self.state.lock().unwrap();
        if state.deny_mutations {
            return Err(forbidden("link"));
        }
        if !state
            .course_links
            .remove(&(group_id.to_string(), course_id.to_string()))
        {
            return Err(not_found("link"));
        }
        Ok(())
    }

    async fn enroll_student(&self, course_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(course_id, "course_id")?;
        require_id(student_id, "student_id")?;
        let mut state = self.state.lock().unwrap();
        state
            .enroll_calls
            .push((course_id.to_string(), student_id.to_string()));
        if state.fail_enroll.contains(student_id) {
            return Err(server_error("enroll"));
        }
        state.roster.insert(student_id.to_string());
        Ok(())
    }

    async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        Ok(self.state.lock().unwrap().notifications.clone())
    }

    async fn mark_notification_read(&self, id: &str) -> ApiResult<()> {
        require_id(id, "notification_id")?;
        let mut state = self.state.lock().unwrap();
        state.read_ids.push(id.to_string());
        let found = state.notifications.iter_mut().find(|n| n.id == id);
        match found {
            Some(n) => {
                n.read = true;
                Ok(())
            }
            None => Err(not_found("notification")),
        }
    }

    async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.read_all_calls += 1;
        for n in &mut state.notifications {
            n.read = true;
        }
        Ok(())
    }

    async fn channel_preferences(&self) -> ApiResult<ChannelPreferences> {
        let state = self.state.lock().unwrap();
        if state.fail_prefs {
            return Err(server_error("preferences"));
        }
        Ok(state.channel_prefs)
    }

    async fn update_channel_preference(
        &self,
        channel: NotificationChannel,
        enabled: bool,
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_prefs {
            return Err(server_error("preferences"));
        }
        state.channel_updates.push((channel, enabled));
        match channel {
            NotificationChannel::Email => state.channel_prefs.email = enabled,
            NotificationChannel::Push => state.channel_prefs.push = enabled,
            NotificationChannel::InApp => state.channel_prefs.in_app = enabled,
        }
        Ok(())
    }
}
