use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One entry of a challenge's `test_cases` list. Stored server-side as
/// free-form JSON, so both fields default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub time_limit: Option<i64>,
    #[serde(default)]
    pub submission_count: Option<i64>,
    /// Latest submission status of the requesting user, or `not_started`
    #[serde(default)]
    pub user_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by: Option<UserSummary>,
}

impl Challenge {
    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }
}

/// Payload for creating or replacing a challenge. The server resolves
/// `category_name` to a category, creating one when missing.
#[derive(Debug, Clone, Serialize)]
pub struct NewChallenge {
    pub title: String,
    pub description: String,
    pub category_name: String,
    pub difficulty: Difficulty,
    pub points: i64,
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template: String,
    pub test_cases: Vec<TestCase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i64>,
}

/// Query filters for the challenge list endpoint.
#[derive(Debug, Clone, Default)]
pub struct ChallengeFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub code: String,
    pub language: String,
}

/// Body for running code against a single test case.
#[derive(Debug, Clone, Serialize)]
pub struct RunRequest {
    pub code: String,
    pub language: String,
    pub input: String,
    pub expected_output: String,
}

/// Raw execution result from the run endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Outcome of running one test case through the run endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub error: Option<String>,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    #[serde(default)]
    pub challenge: Option<Challenge>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub test_results: Vec<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn passed(&self) -> bool {
        self.status == "passed"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
    pub id: i64,
    #[serde(default)]
    pub challenge: Option<i64>,
    #[serde(default)]
    pub user: Option<UserSummary>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDiscussion {
    pub content: String,
}
