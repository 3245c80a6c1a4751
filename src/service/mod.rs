//! Domain services: every operation the transport layer exposes.
//!
//! Services own an `Arc<SqliteStore>` and the configuration slices they
//! need. Each multi-row mutation runs inside exactly one store transaction.

pub mod agents;
pub mod auth;
pub mod dashboard;
pub mod drafts;
pub mod import;
pub mod namespaces;
pub mod projects;
pub mod publish;
pub mod roles;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use crate::auth::{JwtIssuer, PasswordManager};
use crate::config::Config;
use crate::error::Result;
use crate::permission::PermissionEngine;
use crate::store::{Pagination, Select, SortParam, SqliteStore, query};
use crate::types::{PageData, RedirectData};

pub use agents::AgentService;
pub use auth::AuthService;
pub use dashboard::{Breakdown, Dashboard, DashboardService};
pub use drafts::{DraftEngine, Draftable};
pub use import::{ImportReport, ImportService};
pub use namespaces::NamespaceService;
pub use projects::ProjectService;
pub use publish::{PublishCoordinator, PublishOutcome, RollbackOutcome};
pub use roles::RoleService;
pub use tokens::{CreatedToken, TokenService};
pub use users::{NewUserRequest, UserService};

/// Sorting, paging and free-text search of a listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub sort: Vec<SortParam>,
    pub page: Pagination,
    pub search: Option<String>,
}

impl ListParams {
    /// Applies the whitelisted sort keys to `query`.
    pub(crate) fn sorted(&self, query: Select, whitelist: &[(&str, &str)]) -> Select {
        query::apply_sort(query, whitelist, &self.sort, None)
    }

    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Every service, wired to one store.
pub struct Services {
    pub namespaces: NamespaceService,
    pub projects: ProjectService,
    pub redirects: DraftEngine<RedirectData>,
    pub pages: DraftEngine<PageData>,
    pub publish: PublishCoordinator,
    pub imports: ImportService,
    pub dashboard: DashboardService,
    pub roles: RoleService,
    pub users: UserService,
    pub tokens: TokenService,
    pub agents: AgentService,
    pub auth: AuthService,
    pub permissions: PermissionEngine,
}

impl Services {
    pub fn new(store: Arc<SqliteStore>, config: &Config) -> Result<Self> {
        let jwt = Arc::new(JwtIssuer::new(&config.jwt)?);
        let passwords = PasswordManager::new();
        Ok(Self {
            namespaces: NamespaceService::new(store.clone()),
            projects: ProjectService::new(store.clone()),
            redirects: DraftEngine::new(store.clone(), config.page),
            pages: DraftEngine::new(store.clone(), config.page),
            publish: PublishCoordinator::new(store.clone(), config.page),
            imports: ImportService::new(store.clone()),
            dashboard: DashboardService::new(store.clone(), config.agent),
            roles: RoleService::new(store.clone()),
            users: UserService::new(store.clone(), passwords.clone()),
            tokens: TokenService::new(store.clone()),
            agents: AgentService::new(store.clone()),
            auth: AuthService::new(store.clone(), passwords, jwt),
            permissions: PermissionEngine::new(store),
        })
    }
}
