use serde::{Deserialize, Serialize};
use crate::models::ViewerContext;

/// Site user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub login: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub created_ts: i64,
}

impl User {
    pub fn new(login: &str, roles: &[String]) -> Self {
        Self {
            id: None,
            login: login.to_string(),
            display_name: login.to_string(),
            email: String::new(),
            roles: roles.to_vec(),
            created_ts: chrono::Utc::now().timestamp(),
        }
    }

    /// Viewer context for this user, with capabilities granted by roles
    pub fn viewer(&self) -> ViewerContext {
        let mut viewer = ViewerContext {
            user_id: self.id,
            login: self.login.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            ..ViewerContext::default()
        };
        for role in &self.roles {
            viewer = viewer.with_role(role);
        }
        viewer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_viewer_carries_roles() {
        let mut user = User::new("alice", &["administrator".to_string()]);
        user.id = Some(7);
        let viewer = user.viewer();
        assert_eq!(viewer.user_id, Some(7));
        assert_eq!(viewer.login, "alice");
        assert!(viewer.has_capability("view_all_entries"));
    }
}
