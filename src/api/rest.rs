use super::envelope;
use super::error::{require_id, ApiError, ApiResult};
use super::CourseApi;
use crate::models::{
    AssignmentStats, ChannelPreferences, GradeRecord, Group, Notification, NotificationChannel,
    Student,
};
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Production gateway: authenticated HTTP against the course-management
/// backend. No caching, no retries; one request per call.
#[derive(Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderValue,
}

impl RestGateway {
    /// Fails when the token is empty or contains characters that cannot be
    /// sent in an Authorization header; a bad token is a configuration
    /// mistake worth reporting up front, not a guaranteed 401 later.
    pub fn new(base_url: String, token: String) -> Result<Self> {
        if token.trim().is_empty() {
            anyhow::bail!("API token is empty");
        }
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("API token contains characters that cannot be sent in an HTTP header")?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120)) // 2 minute timeout
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("classboard"));
        headers
    }

    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self
            .client
            .request(method, &url)
            .headers(self.build_headers());
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        let status = response.status();

        // Read the body for both error and success cases so failures carry
        // the backend's message.
        let text = response.text().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, url, text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| ApiError::Decode {
            url,
            message: format!(
                "{} (first 500 chars of body: {})",
                e,
                text.chars().take(500).collect::<String>()
            ),
        })
    }

    /// GET a collection, folding the backend's three payload shapes (bare
    /// array, `$values` wrapper, single object) into one list.
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> ApiResult<Vec<T>> {
        let value = self.request(Method::GET, path, None).await?;
        let env = envelope::normalize(value).map_err(|e| ApiError::Decode {
            url: format!("{}{}", self.base_url, path),
            message: e.to_string(),
        })?;
        Ok(env.into_vec())
    }

    /// GET a single object. Single-object endpoints go through the same
    /// envelope normalization as collections: the backend has been seen
    /// wrapping lone objects in `$values` too, and deserializing such a
    /// wrapper directly against a defaulted struct would silently produce an
    /// all-zero record.
    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let value = self.request(Method::GET, path, None).await?;
        decode_single(value, &format!("{}{}", self.base_url, path))
    }

    async fn send_unit(&self, method: Method, path: &str, body: Option<Value>) -> ApiResult<()> {
        self.request(method, path, body).await.map(|_| ())
    }
}

/// Normalize a payload and require exactly one element; zero or several is a
/// decode error, never a defaulted struct.
fn decode_single<T: DeserializeOwned>(value: Value, url: &str) -> ApiResult<T> {
    let env = envelope::normalize::<T>(value).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    let mut items = env.into_vec();
    match items.len() {
        1 => Ok(items.remove(0)),
        0 => Err(ApiError::Decode {
            url: url.to_string(),
            message: "expected one object, got an empty payload".to_string(),
        }),
        n => Err(ApiError::Decode {
            url: url.to_string(),
            message: format!("expected one object, got {} elements", n),
        }),
    }
}

impl CourseApi for RestGateway {
    async fn groups_for_course(&self, course_id: &str) -> ApiResult<Vec<Group>> {
        require_id(course_id, "course_id")?;
        self.get_list(&format!("/course/{}/groups", course_id)).await
    }

    /// The authoritative course roster. Callers treat this as best-effort:
    /// the reconciliation engine degrades to activity-based inference when it
    /// is unavailable.
    async fn course_roster(&self, course_id: &str) -> ApiResult<Vec<Student>> {
        require_id(course_id, "course_id")?;
        self.get_list(&format!("/course/{}/students", course_id))
            .await
    }

    async fn students_in_group(&self, group_id: &str) -> ApiResult<Vec<Student>> {
        require_id(group_id, "group_id")?;
        self.get_list(&format!("/group/{}/students", group_id)).await
    }

    async fn assignment_stats(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> ApiResult<AssignmentStats> {
        require_id(student_id, "student_id")?;
        require_id(course_id, "course_id")?;
        self.get_one(&format!(
            "/student/{}/assignments/stats?courseId={}",
            student_id, course_id
        ))
        .await
    }

    async fn grades(&self, student_id: &str, course_id: &str) -> ApiResult<Vec<GradeRecord>> {
        require_id(student_id, "student_id")?;
        require_id(course_id, "course_id")?;
        self.get_list(&format!(
            "/student/{}/grades?courseId={}",
            student_id, course_id
        ))
        .await
    }

    async fn all_students(&self) -> ApiResult<Vec<Student>> {
        self.get_list("/user?role=student").await
    }

    /// Best-effort endpoint: older deployments return 404 for it. The 404 is
    /// reported as-is; the engine owns the client-side fallback.
    async fn available_students(&self, group_id: &str) -> ApiResult<Vec<Student>> {
        require_id(group_id, "group_id")?;
        self.get_list(&format!("/group/{}/available-students", group_id))
            .await
    }

    async fn course_teachers(&self, course_id: &str) -> ApiResult<Vec<Student>> {
        require_id(course_id, "course_id")?;
        self.get_list(&format!("/course/{}/teachers", course_id))
            .await
    }

    async fn create_group(&self, name: &str, description: Option<&str>) -> ApiResult<Group> {
        require_id(name, "name")?;
        let value = self
            .request(
                Method::POST,
                "/group",
                Some(json!({ "name": name, "description": description })),
            )
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            url: format!("{}/group", self.base_url),
            message: e.to_string(),
        })
    }

    async fn delete_group(&self, group_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        self.send_unit(Method::DELETE, &format!("/group/{}", group_id), None)
            .await
    }

    async fn add_student_to_group(&self, group_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(student_id, "student_id")?;
        self.send_unit(
            Method::POST,
            &format!("/group/{}/students/{}", group_id, student_id),
            None,
        )
        .await
    }

    async fn remove_student_from_group(&self, group_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(student_id, "student_id")?;
        self.send_unit(
            Method::DELETE,
            &format!("/group/{}/students/{}", group_id, student_id),
            None,
        )
        .await
    }

    async fn link_course(&self, group_id: &str, course_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(course_id, "course_id")?;
        self.send_unit(
            Method::POST,
            &format!("/group/{}/enrollments", group_id),
            Some(json!({ "courseId": course_id })),
        )
        .await
    }

    async fn unlink_course(&self, group_id: &str, course_id: &str) -> ApiResult<()> {
        require_id(group_id, "group_id")?;
        require_id(course_id, "course_id")?;
        self.send_unit(
            Method::DELETE,
            &format!("/group/{}/enrollments/{}", group_id, course_id),
            None,
        )
        .await
    }

    async fn enroll_student(&self, course_id: &str, student_id: &str) -> ApiResult<()> {
        require_id(course_id, "course_id")?;
        require_id(student_id, "student_id")?;
        self.send_unit(
            Method::POST,
            &format!("/course/{}/students/{}", course_id, student_id),
            None,
        )
        .await
    }

    async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        self.get_list("/notification").await
    }

    async fn mark_notification_read(&self, id: &str) -> ApiResult<()> {
        require_id(id, "notification_id")?;
        self.send_unit(Method::PUT, &format!("/notification/{}/read", id), None)
            .await
    }

    async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        self.send_unit(Method::PUT, "/notification/read-all", None)
            .await
    }

    async fn channel_preferences(&self) -> ApiResult<ChannelPreferences> {
        self.get_one("/notification/preferences").await
    }

    /// Each channel is an independent backend record, so a toggle is a
    /// partial update for that channel only.
    async fn update_channel_preference(
        &self,
        channel: NotificationChannel,
        enabled: bool,
    ) -> ApiResult<()> {
        let channel_path = match channel {
            NotificationChannel::Email => "email",
            NotificationChannel::Push => "push",
            NotificationChannel::InApp => "in-app",
        };
        self.send_unit(
            Method::PUT,
            &format!("/notification/preferences/{}", channel_path),
            Some(json!({ "enabled": enabled })),
        )
        .await
    }
}
