use serde::Serialize;

use crate::error::{Error, Result};
use crate::types::{Action, AdminSection, ResourceKind, ResourcePermission, SubjectPermissions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// A user signed in with a password and presenting a JWT.
    Basic,
    /// An API token.
    Token,
}

/// The authenticated subject of a request.
///
/// For token auth `user_id` is zero and `username` is the token name.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub auth_type: AuthType,
    pub permissions: SubjectPermissions,
}

impl AuthContext {
    #[must_use]
    pub fn can_resource(&self, namespace: &str, project: &str, resource: ResourceKind, action: Action) -> bool {
        self.permissions.can_resource(namespace, project, resource, action)
    }

    pub fn require_resource(
        &self,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> Result<()> {
        if self.can_resource(namespace, project, resource, action) {
            Ok(())
        } else {
            tracing::debug!(
                subject = %self.username,
                namespace,
                project,
                resource = %resource,
                action = %action,
                "resource access denied"
            );
            Err(Error::Forbidden)
        }
    }

    #[must_use]
    pub fn can_admin(&self, section: AdminSection, action: Action) -> bool {
        self.permissions.can_admin(section, action)
    }

    pub fn require_admin(&self, section: AdminSection, action: Action) -> Result<()> {
        if self.can_admin(section, action) {
            Ok(())
        } else {
            tracing::debug!(subject = %self.username, section = %section, action = %action, "admin access denied");
            Err(Error::Forbidden)
        }
    }

    /// Rules used to narrow list queries for `resource`/`action`.
    #[must_use]
    pub fn rules_for(&self, resource: ResourceKind, action: Action) -> Vec<ResourcePermission> {
        self.permissions.resource_rules_for(resource, action)
    }
}
