//! `/auth` endpoints: sign-in, sign-up, API keys and profile updates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign-in credentials, sent form-encoded
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninForm {
    pub email: String,
    pub password: String,
}

impl SigninForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for SigninForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form, sent form-encoded; `profile_image_url` is left out when unset
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("profile_image_url", &self.profile_image_url)
            .finish()
    }
}

/// Signed-in user together with the bearer token issued for it
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub token: String,
    pub token_type: String,
    /// Unix seconds; `None` for tokens that do not expire
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub profile_image_url: String,
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
}

impl SessionUser {
    /// `true` once `expires_at` lies at or before `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionUser")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("id", &self.id)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("profile_image_url", &self.profile_image_url)
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub profile_image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileForm {
    pub profile_image_url: String,
    pub name: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePasswordForm {
    pub password: String,
    pub new_password: String,
}

impl fmt::Debug for UpdatePasswordForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdatePasswordForm")
            .field("password", &"<redacted>")
            .field("new_password", &"<redacted>")
            .finish()
    }
}

endpoint! {
    pub struct AuthSignin => "authSignin" {
        method: Post,
        path: "/auth/signin",
        request: SigninForm,
        response: SessionUser,
        encoding: Form,
    }
}

endpoint! {
    pub struct AuthSignup => "authSignup" {
        method: Post,
        path: "/auth/signup",
        request: SignupForm,
        response: SessionUser,
        encoding: Form,
    }
}

endpoint! {
    pub struct AuthSignout => "authSignout" {
        method: Get,
        path: "/auth/signout",
        response: bool,
    }
}

endpoint! {
    pub struct AuthGetApiKey => "authGetApiKey" {
        method: Get,
        path: "/auth/api_key",
        response: ApiKey,
    }
}

endpoint! {
    pub struct AuthCreateApiKey => "authCreateApiKey" {
        method: Post,
        path: "/auth/api_key",
        response: ApiKey,
    }
}

endpoint! {
    pub struct AuthDeleteApiKey => "authDeleteApiKey" {
        method: Delete,
        path: "/auth/api_key",
        response: bool,
    }
}

endpoint! {
    pub struct AuthUpdateProfile => "authUpdateProfile" {
        method: Post,
        path: "/auth/update/profile",
        request: UpdateProfileForm,
        response: UserResponse,
    }
}

endpoint! {
    pub struct AuthUpdatePassword => "authUpdatePassword" {
        method: Post,
        path: "/auth/update/password",
        request: UpdatePasswordForm,
        response: bool,
    }
}
