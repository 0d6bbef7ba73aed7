use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full user record as returned by `/api/users/me/`, the login endpoint
/// and the leaderboard.
///
/// Server-computed statistics only appear on some of those responses, so
/// everything beyond the identity fields defaults when absent. Fields
/// the server adds that this client does not know about are kept in
/// `extra`, so a profile that goes through a local shallow merge
/// round-trips without dropping anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub linkedin_username: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
    // Stats computed server-side for /me/ and the leaderboard
    #[serde(default)]
    pub completed_challenges: Option<i64>,
    #[serde(default)]
    pub in_progress: Option<i64>,
    #[serde(default)]
    pub calculated_points: Option<i64>,
    #[serde(default)]
    pub category_progress: Vec<CategoryProgress>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    /// Name to show in a UI: display name when set, username otherwise.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    pub fn full_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.username.clone(),
        }
    }
}

/// Per-category completion counts embedded in the `/me/` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub name: String,
    #[serde(default)]
    pub completed: i64,
    #[serde(default)]
    pub total: i64,
}

impl CategoryProgress {
    pub fn percent_complete(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            self.completed * 100 / self.total
        }
    }
}

/// Abbreviated user record nested inside challenges, submissions and
/// discussions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

/// Registration issues an access token only; the server hands out a
/// refresh token at login.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserProfile,
}

/// Leaderboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeframe {
    #[default]
    All,
    Week,
    Month,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::All => "all",
            Timeframe::Week => "week",
            Timeframe::Month => "month",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
