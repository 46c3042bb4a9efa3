use crate::models::CurrentUser;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::PathBuf;

// Earlier versions of this client stored the token and user under different
// key names. Writes populate every key; reads prefer the current one.
const TOKEN_KEYS: [&str; 2] = ["auth_token", "token"];
const USER_KEYS: [&str; 2] = ["current_user", "user"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: CurrentUser,
}

/// Key-value session persistence, written once at login and cleared at
/// logout. A saved session round-trips exactly: store, reload, identical
/// user and role.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let mut map = Map::new();
        let user_json =
            serde_json::to_string(&session.user).context("Failed to serialize current user")?;
        for key in TOKEN_KEYS {
            map.insert(key.to_string(), Value::String(session.token.clone()));
        }
        for key in USER_KEYS {
            // The user is stored as a serialized string, the way the browser
            // client kept it in local storage.
            map.insert(key.to_string(), Value::String(user_json.clone()));
        }
        let contents = serde_json::to_string_pretty(&Value::Object(map))?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read session from {}", self.path.display())
                })
            }
        };
        let map: Map<String, Value> =
            serde_json::from_str(&contents).context("Session file is not valid JSON")?;

        let token = TOKEN_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .map(|s| s.to_string());
        let user = USER_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
            .and_then(|s| serde_json::from_str::<CurrentUser>(s).ok());

        match (token, user) {
            (Some(token), Some(user)) => Ok(Some(Session { token, user })),
            _ => Ok(None),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to clear session at {}", self.path.display())
            }),
        }
    }
}
