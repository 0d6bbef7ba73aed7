//! Data models for Createathon entities.
//!
//! This module contains the data structures used to represent platform
//! data:
//!
//! - `UserProfile`, `UserSummary`: user records and auth payloads
//! - `Challenge`, `Category`, `TestCase`, `Submission`, `Discussion`:
//!   challenge authoring, grading and discussion
//! - Progress types: `UserProgress`, `UserStats`, `Achievement`, etc.

pub mod challenge;
pub mod progress;
pub mod user;

pub use challenge::{
    Challenge, ChallengeFilter, Category, Difficulty, Discussion, NewChallenge, NewDiscussion,
    RunOutput, RunRequest, SubmitRequest, Submission, TestCase, TestCaseResult,
};
pub use progress::{
    Achievement, CategoryStat, ProgressStatistics, UserAchievement, UserProgress, UserStats,
};
pub use user::{
    CategoryProgress, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, Timeframe,
    UserProfile, UserSummary,
};
