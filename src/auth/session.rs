use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, RegisterRequest, UserProfile};

use super::store::{CredentialKey, CredentialStore};

/// Owns the session lifecycle: the in-memory record of the current
/// authenticated user and the operations that change it.
///
/// Construct one explicitly and hand it to the view layer; there is no
/// ambient singleton, so initialization order stays visible and tests
/// build their own controller against a mock server.
///
/// Invariant: whenever `user()` is `Some`, an access token is present in
/// the credential store. Both are always cleared together.
pub struct SessionController {
    api: ApiClient,
    store: CredentialStore,
    user: Option<UserProfile>,
    initializing: bool,
}

impl SessionController {
    pub fn new(api: ApiClient, store: CredentialStore) -> Self {
        Self {
            api,
            store,
            user: None,
            initializing: true,
        }
    }

    /// Restore the session persisted by a previous run.
    ///
    /// Resolves to a definite signed-in or signed-out state before any
    /// dependent view renders. A rejected or unreachable token clears
    /// the stored credentials instead of surfacing an error; this is the
    /// one operation that swallows fetch failures.
    pub async fn initialize(&mut self) {
        if self.store.get(CredentialKey::AccessToken).is_some() {
            match self.api.fetch_profile().await {
                Ok(profile) => {
                    info!(username = %profile.username, "Session restored");
                    self.user = Some(profile);
                }
                Err(e) => {
                    warn!(error = %e, "Failed to restore session, clearing credentials");
                    self.store.clear_tokens();
                    self.user = None;
                }
            }
        }
        self.initializing = false;
    }

    /// Log in and persist both tokens.
    ///
    /// Tokens are written to the store before the profile becomes
    /// visible, so the profile never outlives the credentials backing it.
    pub async fn login(&mut self, credentials: &LoginRequest) -> Result<&UserProfile, ApiError> {
        let response = self.api.login(credentials).await?;

        self.store.set(CredentialKey::AccessToken, &response.token);
        self.store.set(CredentialKey::RefreshToken, &response.refresh_token);

        info!(username = %response.user.username, "Login successful");
        Ok(self.user.insert(response.user))
    }

    /// Register a new account.
    ///
    /// The server issues only an access token at registration, so this
    /// session cannot silently refresh once that token expires; the next
    /// full login obtains a refresh token.
    pub async fn register(&mut self, details: &RegisterRequest) -> Result<&UserProfile, ApiError> {
        let response = self.api.register(details).await?;

        self.store.set(CredentialKey::AccessToken, &response.token);

        info!(username = %response.user.username, "Registration successful");
        Ok(self.user.insert(response.user))
    }

    /// Clear both tokens and forget the user. Never fails; the pipeline
    /// reads its token from the store per request, so clearing the store
    /// also clears the authorization default.
    pub fn logout(&mut self) {
        self.store.clear_tokens();
        self.user = None;
        info!("Logged out");
    }

    /// Shallow-merge `changes` into the in-memory profile without a
    /// network call. Used to locally reflect an update the server
    /// already confirmed elsewhere; call [`Self::refresh_profile`] to
    /// reconcile server-computed fields.
    pub fn update_user(&mut self, changes: &serde_json::Value) {
        let Some(current) = self.user.as_ref() else {
            return;
        };
        let Some(patch) = changes.as_object() else {
            return;
        };

        let mut merged = match serde_json::to_value(current) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to encode profile for merge");
                return;
            }
        };

        if let Some(object) = merged.as_object_mut() {
            for (field, value) in patch {
                object.insert(field.clone(), value.clone());
            }
        }

        match serde_json::from_value(merged) {
            Ok(updated) => self.user = Some(updated),
            Err(e) => warn!(error = %e, "Discarding profile patch that no longer parses"),
        }
    }

    /// Re-fetch the profile and replace it wholesale.
    pub async fn refresh_profile(&mut self) -> Result<&UserProfile, ApiError> {
        let profile = self.api.fetch_profile().await?;
        Ok(self.user.insert(profile))
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True until `initialize` has resolved to a definite state.
    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    /// Code-language preference: the stored value wins over the profile
    /// field, mirroring how the preference is written locally on change
    /// before the server confirms it.
    pub fn preferred_language(&self) -> Option<String> {
        self.store
            .get(CredentialKey::PreferredLanguage)
            .or_else(|| self.user.as_ref().and_then(|u| u.preferred_language.clone()))
    }

    pub fn set_preferred_language(&self, language: &str) {
        self.store.set(CredentialKey::PreferredLanguage, language);
    }

    /// The underlying client, for the rest of the API surface
    /// (challenges, progress, leaderboard).
    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
