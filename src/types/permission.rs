use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const WILDCARD: &str = "*";

/// One dimension of a permission rule: either the `*` wildcard or a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope<T> {
    Any,
    Exact(T),
}

impl<T: PartialEq> Scope<T> {
    /// Returns true when this rule dimension admits `value`.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Scope::Any => true,
            Scope::Exact(v) => v == value,
        }
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Scope::Any)
    }

    pub fn exact(&self) -> Option<&T> {
        match self {
            Scope::Any => None,
            Scope::Exact(v) => Some(v),
        }
    }
}

impl Scope<String> {
    #[must_use]
    pub fn matches_str(&self, value: &str) -> bool {
        match self {
            Scope::Any => true,
            Scope::Exact(v) => v == value,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Scope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Any => f.write_str(WILDCARD),
            Scope::Exact(v) => v.fmt(f),
        }
    }
}

impl<T: FromStr> FromStr for Scope<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            Ok(Scope::Any)
        } else {
            s.parse().map(Scope::Exact)
        }
    }
}

impl<T: fmt::Display> Serialize for Scope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T> Deserialize<'de> for Scope<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), " '{}'"), other)),
                }
            }
        }
    };
}

string_enum!(
    /// Resources guarded by per-project permissions.
    ///
    /// `Any` is a request-side sentinel used by generic listings; it is never
    /// stored in a rule (rules use `Scope::Any` for `*`).
    ResourceKind {
        Redirect => "redirect",
        Page => "page",
        Agent => "agent",
        Any => "any",
    }
);

string_enum!(Action {
    Read => "read",
    Write => "write",
});

string_enum!(
    /// Admin console sections.
    AdminSection {
        Users => "users",
        Roles => "roles",
        Projects => "projects",
        Namespaces => "namespaces",
        Tokens => "tokens",
    }
);

string_enum!(RoleType {
    User => "user",
    Role => "role",
    Token => "token",
});

/// A per-project permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePermission {
    pub namespace: Scope<String>,
    pub project: Scope<String>,
    pub resource: Scope<ResourceKind>,
    pub action: Scope<Action>,
}

impl ResourcePermission {
    pub fn new(
        namespace: Scope<String>,
        project: Scope<String>,
        resource: Scope<ResourceKind>,
        action: Scope<Action>,
    ) -> Self {
        Self {
            namespace,
            project,
            resource,
            action,
        }
    }

    /// Full access to everything.
    #[must_use]
    pub fn all() -> Self {
        Self::new(Scope::Any, Scope::Any, Scope::Any, Scope::Any)
    }

    /// True when this rule grants `action` on `resource` in `namespace`/`project`.
    #[must_use]
    pub fn allows(&self, namespace: &str, project: &str, resource: ResourceKind, action: Action) -> bool {
        self.namespace.matches_str(namespace)
            && self.project.matches_str(project)
            && self.allows_resource(resource)
            && self.action.matches(&action)
    }

    /// Resource dimension only; the `any` request sentinel admits every rule.
    #[must_use]
    pub fn allows_resource(&self, resource: ResourceKind) -> bool {
        resource == ResourceKind::Any || self.resource.matches(&resource)
    }

    fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.namespace, self.project, self.resource, self.action
        )
    }
}

/// A permission rule for the admin console.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminPermission {
    pub section: Scope<AdminSection>,
    pub action: Scope<Action>,
}

impl AdminPermission {
    pub fn new(section: Scope<AdminSection>, action: Scope<Action>) -> Self {
        Self { section, action }
    }

    #[must_use]
    pub fn allows(&self, section: AdminSection, action: Action) -> bool {
        self.section.matches(&section) && self.action.matches(&action)
    }

    fn dedup_key(&self) -> String {
        format!("{}|{}", self.section, self.action)
    }
}

/// The effective permission set of an authenticated subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPermissions {
    #[serde(default)]
    pub resources: Vec<ResourcePermission>,
    #[serde(default)]
    pub admin: Vec<AdminPermission>,
}

impl SubjectPermissions {
    pub fn new(resources: Vec<ResourcePermission>, admin: Vec<AdminPermission>) -> Self {
        Self { resources, admin }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.admin.is_empty()
    }

    #[must_use]
    pub fn can_resource(
        &self,
        namespace: &str,
        project: &str,
        resource: ResourceKind,
        action: Action,
    ) -> bool {
        self.resources
            .iter()
            .any(|rule| rule.allows(namespace, project, resource, action))
    }

    #[must_use]
    pub fn can_admin(&self, section: AdminSection, action: Action) -> bool {
        self.admin.iter().any(|rule| rule.allows(section, action))
    }

    /// Rules that grant `action` on `resource` somewhere, used to rewrite list queries.
    pub fn resource_rules_for(&self, resource: ResourceKind, action: Action) -> Vec<ResourcePermission> {
        self.resources
            .iter()
            .filter(|rule| rule.allows_resource(resource) && rule.action.matches(&action))
            .cloned()
            .collect()
    }

    /// Adds every rule of `other`, keeping the first occurrence of each rule.
    pub fn merge(&mut self, other: SubjectPermissions) {
        self.resources.extend(other.resources);
        self.admin.extend(other.admin);
        self.dedup();
    }

    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.resources.retain(|rule| seen.insert(rule.dedup_key()));
        let mut seen = HashSet::new();
        self.admin.retain(|rule| seen.insert(rule.dedup_key()));
    }
}
