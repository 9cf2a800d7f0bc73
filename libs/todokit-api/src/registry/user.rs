//! `/user` endpoints (admin listing, role changes, public status)

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-user settings; unknown keys are kept as they come
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(default)]
    pub ui: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserModel {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub profile_image_url: String,
    /// Unix seconds
    pub last_active_at: i64,
    pub updated_at: i64,
    pub created_at: i64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub settings: Option<UserSettings>,
    #[serde(default)]
    pub info: Option<String>,
}

/// Paging for the user listing; unset bounds are left out of the query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleUpdateForm {
    pub id: String,
    pub role: String,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    pub name: String,
    pub profile_image_url: String,
    pub active: bool,
}

path_params! {
    pub struct UserId { user_id: String }
}

endpoint! {
    pub struct UserGetUsers => "userGetUsers" {
        method: Get,
        path: "/user/",
        request: UserListQuery,
        response: Vec<UserModel>,
    }
}

endpoint! {
    /// `None` when no user has the given id
    pub struct UserUpdateRole => "userUpdateRole" {
        method: Post,
        path: "/user/update/role",
        request: UserRoleUpdateForm,
        response: Option<UserModel>,
    }
}

endpoint! {
    pub struct UserGetById => "userGetById" {
        method: Get,
        path: "/user/{user_id}",
        params: UserId,
        response: UserStatus,
    }
}
