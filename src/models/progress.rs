use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: i64,
    #[serde(default)]
    pub user: Option<i64>,
    pub challenge: i64,
    #[serde(default)]
    pub challenge_title: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub best_score: i64,
}

impl UserProgress {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Per-category counts from the stats endpoint. Field names differ from
/// the `category_progress` embedded in `/me/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStat {
    pub name: String,
    #[serde(default)]
    pub total_challenges: i64,
    #[serde(default)]
    pub completed_challenges: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total_points: i64,
    #[serde(default)]
    pub completed_challenges: i64,
    #[serde(default)]
    pub in_progress_challenges: i64,
    #[serde(default)]
    pub category_progress: Vec<CategoryStat>,
}

/// Aggregates from `/api/challenges/progress/statistics/`. Sums over an
/// empty set come back as null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressStatistics {
    #[serde(default)]
    pub total_completed: Option<i64>,
    #[serde(default)]
    pub total_points: Option<i64>,
    #[serde(default)]
    pub total_attempts: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub points_required: i64,
    #[serde(default)]
    pub challenges_required: i64,
    /// Whether the requesting user has earned this achievement
    #[serde(default)]
    pub earned: bool,
    #[serde(default)]
    pub earned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    pub id: i64,
    #[serde(default)]
    pub user: Option<i64>,
    pub achievement: i64,
    #[serde(default)]
    pub achievement_details: Option<Achievement>,
    #[serde(default)]
    pub earned_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_stats() {
        let json = r#"{
            "total_points": 120,
            "completed_challenges": 4,
            "in_progress_challenges": 2,
            "category_progress": [
                {"name": "Algorithms", "total_challenges": 10, "completed_challenges": 3},
                {"name": "Strings", "total_challenges": 5, "completed_challenges": 1}
            ]
        }"#;

        let stats: UserStats = serde_json::from_str(json).expect("parse stats");
        assert_eq!(stats.total_points, 120);
        assert_eq!(stats.category_progress.len(), 2);
        assert_eq!(stats.category_progress[0].completed_challenges, 3);
    }

    #[test]
    fn test_parse_statistics_with_null_sums() {
        let json = r#"{"total_completed": 0, "total_points": null, "total_attempts": 0}"#;
        let stats: ProgressStatistics = serde_json::from_str(json).expect("parse statistics");
        assert_eq!(stats.total_points, None);
        assert_eq!(stats.total_completed, Some(0));
    }

    #[test]
    fn test_progress_completion() {
        let json = r#"{"id": 1, "challenge": 9, "status": "completed", "best_score": 10}"#;
        let progress: UserProgress = serde_json::from_str(json).expect("parse progress");
        assert!(progress.is_completed());
        assert_eq!(progress.best_score, 10);
    }
}
