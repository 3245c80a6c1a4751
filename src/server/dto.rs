use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::service::ListParams;
use crate::store::{Pagination, SortParam};
use crate::types::{PageData, Record, RedirectData, SubjectPermissions, User};

fn default_true() -> bool {
    true
}

/// `?sort=name:desc,code&limit=20&offset=40&search=foo`
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListQuery {
    #[must_use]
    pub fn into_params(self) -> ListParams {
        ListParams {
            sort: self.sort.as_deref().map(SortParam::parse_list).unwrap_or_default(),
            page: Pagination::new(self.limit, self.offset),
            search: self.search,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub permissions: SubjectPermissions,
}

#[derive(Debug, Deserialize)]
pub struct CodeNameRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub code: String,
    #[serde(default)]
    pub permissions: SubjectPermissions,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    /// `null` removes the password.
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRolesRequest {
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub permissions: SubjectPermissions,
}

/// Body of a draft creation: `old_id` alone deletes, `new` alone creates,
/// both update.
#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest<P> {
    pub old_id: Option<i64>,
    pub new: Option<P>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDraftRequest<P> {
    pub new: P,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub overwrite: bool,
}

/// Everything an edge agent needs to serve a project.
#[derive(Debug, Serialize)]
pub struct PublishedView {
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub redirects: Vec<Record<RedirectData>>,
    pub pages: Vec<Record<PageData>>,
}
