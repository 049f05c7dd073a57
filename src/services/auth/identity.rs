/// Authenticated caller, produced once per request by the bearer check.
///
/// - `subject_id` is the profile primary key; handlers never take a target id from the request
/// - `role` is carried through from the token but nothing gates on it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    pub role: String,
    pub email: Option<String>,
}

impl Identity {
    pub const DEFAULT_ROLE: &'static str = "user";

    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: Self::DEFAULT_ROLE.to_string(),
            email: None,
        }
    }

    pub fn with_role(mut self, role: Option<String>) -> Self {
        if let Some(role) = role {
            self.role = role;
        }
        self
    }

    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }
}
