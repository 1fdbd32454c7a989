#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Admin,
    User,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "user" => Self::User,
            _ => Self::Guest,
        }
    }

    pub fn all() -> &'static [Role] {
        &[Self::Owner, Self::Admin, Self::User, Self::Guest]
    }

    /// Roles allowed past the subscription gate.
    pub fn has_access(&self) -> bool {
        !matches!(self, Self::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new(email: String, password_hash: String, name: Option<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            password_hash,
            name: name.unwrap_or_else(|| "Usuario".to_string()),
            role: Role::Guest,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

/// One issued password-reset token. Only the verifier's hash is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordReset {
    pub id: Option<i64>,
    pub selector: String,
    pub verifier_hash: String,
    pub user_id: String,
    pub email: String,
    pub created_at: String,
    pub expires_at: String,
    pub consumed_at: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl PasswordReset {
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

/// Last known state of a payment-provider subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub preapproval_id: String,
    pub user_email: String,
    pub status: String,
    pub updated_at: String,
}
