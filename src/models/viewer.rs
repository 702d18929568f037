use std::collections::BTreeSet;

/// Capabilities that, by default, make a viewer an administrator for filtering purposes
pub const DEFAULT_ADMIN_CAPABILITIES: &[&str] =
    &["manage_options", "view_all_entries", "edit_others_entries"];

/// Capabilities granted by a role
pub fn role_capabilities(role: &str) -> &'static [&'static str] {
    match role {
        "administrator" => &[
            "manage_options",
            "view_all_entries",
            "edit_others_entries",
            "edit_forms",
        ],
        "editor" => &["edit_others_entries"],
        "author" | "contributor" | "subscriber" => &[],
        _ => &[],
    }
}

/// Identity and capabilities of whoever the filter is applied for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerContext {
    pub user_id: Option<i64>,
    pub login: String,
    pub display_name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub capabilities: BTreeSet<String>,
}

impl ViewerContext {
    /// A logged-out visitor
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in user with no roles yet
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Add a role and the capabilities it grants
    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        for cap in role_capabilities(role) {
            self.capabilities.insert(cap.to_string());
        }
        self
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn has_any_capability(&self, capabilities: &[String]) -> bool {
        capabilities.iter().any(|c| self.has_capability(c))
    }
}
