//! API client for communicating with the Createathon REST API.
//!
//! This module provides the `ApiClient` struct, the single choke-point
//! for every network call. It attaches the stored access token, logs
//! request metadata, and on a 401 performs one transparent
//! refresh-and-retry before giving up.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{CredentialKey, CredentialStore};
use crate::models::{
    Achievement, Category, Challenge, ChallengeFilter, Discussion, LoginRequest, LoginResponse,
    NewChallenge, NewDiscussion, ProgressStatistics, RegisterRequest, RegisterResponse, RunOutput,
    RunRequest, SubmitRequest, Submission, TestCase, TestCaseResult, Timeframe, UserAchievement,
    UserProfile, UserProgress, UserStats,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow grading runs while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Authorization scheme the server expects (DRF token auth)
const AUTH_SCHEME: &str = "Token";

const LOGIN_PATH: &str = "/api/users/login/";
const REGISTER_PATH: &str = "/api/users/register/";
const REFRESH_PATH: &str = "/api/users/refresh/";
const ME_PATH: &str = "/api/users/me/";
const LEADERBOARD_PATH: &str = "/api/users/leaderboard/";
const CHALLENGES_PATH: &str = "/api/challenges/challenges/";
const CATEGORIES_PATH: &str = "/api/challenges/categories/";
const STATS_PATH: &str = "/api/challenges/stats/";
const PROGRESS_PATH: &str = "/api/challenges/progress/";
const PROGRESS_STATISTICS_PATH: &str = "/api/challenges/progress/statistics/";
const ACHIEVEMENTS_PATH: &str = "/api/challenges/achievements/";
const USER_ACHIEVEMENTS_PATH: &str = "/api/challenges/user-achievements/";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: String,
}

/// API client for Createathon.
///
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the credential store and refresh lock are shared, so
/// clones participate in the same session.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: CredentialStore,
    refresh_lock: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new API client against `base_url`, reading and writing
    /// tokens through `store`.
    pub fn new(base_url: impl Into<String>, store: CredentialStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            store,
            refresh_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Request pipeline
    // ========================================================================

    /// Dispatch a request, attaching the stored access token and
    /// refreshing it once on 401.
    ///
    /// The explicit `attempt` counter caps the retry at one: a 401 on
    /// the retried request propagates to the caller rather than looping
    /// on a permanently invalid refresh token. Requests that carried no
    /// token (login, register) also propagate their 401 untouched, so
    /// invalid-credentials errors stay visible.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut token = self.store.get(CredentialKey::AccessToken);
        let mut attempt = 0;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if let Some(ref access) = token {
                request = request.header(
                    header::AUTHORIZATION,
                    format!("{} {}", AUTH_SCHEME, access),
                );
            }
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            // Diagnostic side channel only; never affects control flow
            debug!(method = %method, path, attempt, has_body = body.is_some(), "Dispatching request");

            let response = request.send().await?;

            match &token {
                Some(stale) if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 => {
                    attempt += 1;
                    let stale = stale.clone();
                    debug!(path, "Access token rejected, refreshing");
                    token = Some(self.refresh_access_token(&stale).await?);
                }
                _ => return Ok(response),
            }
        }
    }

    /// Exchange the refresh token for a new access token, coalescing
    /// concurrent attempts.
    ///
    /// All refreshes serialize on one lock; whoever loses the race
    /// re-reads the store and reuses the token the winner persisted, so
    /// at most one refresh call reaches the network per expiry. On any
    /// failure both tokens are cleared and the session is terminated.
    async fn refresh_access_token(&self, stale_token: &str) -> Result<String, ApiError> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.store.get(CredentialKey::AccessToken) {
            if current != stale_token {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.get(CredentialKey::RefreshToken) else {
            warn!("No refresh token available, terminating session");
            self.store.clear_tokens();
            return Err(ApiError::SessionExpired);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(access) => {
                self.store.set(CredentialKey::AccessToken, &access);
                debug!("Access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, terminating session");
                self.store.clear_tokens();
                Err(ApiError::SessionExpired)
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let url = format!("{}{}", self.base_url, REFRESH_PATH);
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let response = self.client.post(&url).json(&body).send().await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let refreshed: RefreshResponse = serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse refresh response: {}", e))
        })?;
        Ok(refreshed.token)
    }

    /// Check if a response is successful, returning an error with body
    /// detail if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_with_params(path, &[]).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, params, None).await?;
        Self::read_json(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::POST, path, &[], Some(body)).await?;
        Self::read_json(response).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PUT, path, &[], Some(body)).await?;
        Self::read_json(response).await
    }

    async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(Method::PATCH, path, &[], Some(body)).await?;
        Self::read_json(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.send::<()>(Method::DELETE, path, &[], None).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    // ========================================================================
    // Authentication & users
    // ========================================================================

    /// Log in with username and password. The caller persists the
    /// returned tokens; see `SessionController::login`.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post(LOGIN_PATH, credentials).await
    }

    /// Register a new account. The response carries an access token but
    /// no refresh token.
    pub async fn register(&self, details: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        self.post(REGISTER_PATH, details).await
    }

    /// Fetch the current user's profile with server-computed stats.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.get(ME_PATH).await
    }

    /// Patch profile fields, returning the updated record.
    pub async fn update_profile(&self, changes: &serde_json::Value) -> Result<UserProfile, ApiError> {
        self.patch(ME_PATH, changes).await
    }

    /// Fetch the top users for a timeframe.
    pub async fn fetch_leaderboard(&self, timeframe: Timeframe) -> Result<Vec<UserProfile>, ApiError> {
        self.get_with_params(LEADERBOARD_PATH, &[("timeframe", timeframe.as_str())])
            .await
    }

    // ========================================================================
    // Challenges
    // ========================================================================

    /// Fetch challenges, newest first, optionally filtered by category
    /// name and difficulty.
    pub async fn fetch_challenges(&self, filter: &ChallengeFilter) -> Result<Vec<Challenge>, ApiError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(ref category) = filter.category {
            params.push(("category", category.as_str()));
        }
        if let Some(ref difficulty) = filter.difficulty {
            params.push(("difficulty", difficulty.as_str()));
        }
        self.get_with_params(CHALLENGES_PATH, &params).await
    }

    pub async fn fetch_challenge(&self, challenge_id: i64) -> Result<Challenge, ApiError> {
        self.get(&format!("{}{}/", CHALLENGES_PATH, challenge_id)).await
    }

    pub async fn create_challenge(&self, challenge: &NewChallenge) -> Result<Challenge, ApiError> {
        self.post(CHALLENGES_PATH, challenge).await
    }

    pub async fn update_challenge(
        &self,
        challenge_id: i64,
        challenge: &NewChallenge,
    ) -> Result<Challenge, ApiError> {
        self.put(&format!("{}{}/", CHALLENGES_PATH, challenge_id), challenge)
            .await
    }

    /// Delete a challenge. Only the author may do this.
    pub async fn delete_challenge(&self, challenge_id: i64) -> Result<(), ApiError> {
        self.delete(&format!("{}{}/", CHALLENGES_PATH, challenge_id)).await
    }

    /// Run code against one test case without recording a submission.
    pub async fn run_code(&self, challenge_id: i64, run: &RunRequest) -> Result<RunOutput, ApiError> {
        self.post(&format!("{}{}/run/", CHALLENGES_PATH, challenge_id), run)
            .await
    }

    /// Run code against each test case in turn.
    ///
    /// Cases execute sequentially; a failing or erroring case never
    /// aborts the sweep, its error is captured on the per-case result
    /// instead. A case passes when the server reported no execution
    /// error and the trimmed actual output equals the trimmed expected
    /// output.
    pub async fn run_test_cases(
        &self,
        challenge_id: i64,
        code: &str,
        language: &str,
        cases: &[TestCase],
    ) -> Vec<TestCaseResult> {
        let mut results = Vec::with_capacity(cases.len());

        for case in cases {
            let run = RunRequest {
                code: code.to_string(),
                language: language.to_string(),
                input: case.input.clone(),
                expected_output: case.output.clone(),
            };

            let result = match self.run_code(challenge_id, &run).await {
                Ok(output) => {
                    let actual = output.output.unwrap_or_default();
                    let passed =
                        output.error.is_none() && actual.trim() == case.output.trim();
                    TestCaseResult {
                        input: case.input.clone(),
                        expected_output: case.output.clone(),
                        actual_output: actual,
                        error: output.error,
                        passed,
                    }
                }
                Err(e) => TestCaseResult {
                    input: case.input.clone(),
                    expected_output: case.output.clone(),
                    actual_output: String::new(),
                    error: Some(e.to_string()),
                    passed: false,
                },
            };
            results.push(result);
        }

        results
    }

    /// Submit a solution for grading against all test cases.
    pub async fn submit_solution(
        &self,
        challenge_id: i64,
        submission: &SubmitRequest,
    ) -> Result<Submission, ApiError> {
        self.post(&format!("{}{}/submit/", CHALLENGES_PATH, challenge_id), submission)
            .await
    }

    /// Fetch the current user's submissions for a challenge.
    pub async fn fetch_submissions(&self, challenge_id: i64) -> Result<Vec<Submission>, ApiError> {
        self.get(&format!("{}{}/submissions/", CHALLENGES_PATH, challenge_id))
            .await
    }

    pub async fn fetch_discussions(&self, challenge_id: i64) -> Result<Vec<Discussion>, ApiError> {
        self.get(&format!("{}{}/discussions/", CHALLENGES_PATH, challenge_id))
            .await
    }

    pub async fn post_discussion(
        &self,
        challenge_id: i64,
        content: &str,
    ) -> Result<Discussion, ApiError> {
        let body = NewDiscussion {
            content: content.to_string(),
        };
        self.post(&format!("{}{}/discussions/", CHALLENGES_PATH, challenge_id), &body)
            .await
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get(CATEGORIES_PATH).await
    }

    // ========================================================================
    // Progress & achievements
    // ========================================================================

    /// Fetch aggregate stats for the dashboard.
    pub async fn fetch_stats(&self) -> Result<UserStats, ApiError> {
        self.get(STATS_PATH).await
    }

    pub async fn fetch_progress(&self) -> Result<Vec<UserProgress>, ApiError> {
        self.get(PROGRESS_PATH).await
    }

    pub async fn fetch_progress_statistics(&self) -> Result<ProgressStatistics, ApiError> {
        self.get(PROGRESS_STATISTICS_PATH).await
    }

    /// Fetch the achievement catalog annotated with the current user's
    /// earned state.
    pub async fn fetch_achievements(&self) -> Result<Vec<Achievement>, ApiError> {
        self.get(ACHIEVEMENTS_PATH).await
    }

    pub async fn fetch_user_achievements(&self) -> Result<Vec<UserAchievement>, ApiError> {
        self.get(USER_ACHIEVEMENTS_PATH).await
    }

    /// Fetch everything the dashboard renders in one go.
    pub async fn fetch_dashboard(
        &self,
    ) -> Result<(UserStats, Vec<UserProgress>, Vec<UserAchievement>), ApiError> {
        tokio::try_join!(
            self.fetch_stats(),
            self.fetch_progress(),
            self.fetch_user_achievements()
        )
    }
}
