pub const SCHEMA: &str = r#"
-- Two-level tenant hierarchy
CREATE TABLE IF NOT EXISTS namespaces (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    namespace_code TEXT NOT NULL REFERENCES namespaces(code) ON DELETE CASCADE,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,
    published_at TEXT,              -- NULL = never published
    publishing_since TEXT,          -- set while a publish holds the project
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace_code, code)
);

-- Redirects; payload columns are NULL for stubs backing a CREATE draft
CREATE TABLE IF NOT EXISTS redirects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_code TEXT NOT NULL,
    project_code TEXT NOT NULL,
    type TEXT,
    source TEXT,
    target TEXT,
    status INTEGER,
    is_published INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (namespace_code, project_code)
        REFERENCES projects(namespace_code, code) ON DELETE CASCADE
);

-- At most one pending draft per redirect; new_* is the embedded payload copy
CREATE TABLE IF NOT EXISTS redirect_drafts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_code TEXT NOT NULL,
    project_code TEXT NOT NULL,
    change_type TEXT NOT NULL,
    old_redirect_id INTEGER NOT NULL UNIQUE REFERENCES redirects(id) ON DELETE CASCADE,
    new_type TEXT,
    new_source TEXT,
    new_target TEXT,
    new_status INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (namespace_code, project_code)
        REFERENCES projects(namespace_code, code) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_code TEXT NOT NULL,
    project_code TEXT NOT NULL,
    type TEXT,
    path TEXT,
    content TEXT,
    content_type TEXT,
    content_size INTEGER NOT NULL DEFAULT 0,
    is_published INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (namespace_code, project_code)
        REFERENCES projects(namespace_code, code) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS page_drafts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_code TEXT NOT NULL,
    project_code TEXT NOT NULL,
    change_type TEXT NOT NULL,
    old_page_id INTEGER NOT NULL UNIQUE REFERENCES pages(id) ON DELETE CASCADE,
    new_type TEXT,
    new_path TEXT,
    new_content TEXT,
    new_content_type TEXT,
    new_content_size INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (namespace_code, project_code)
        REFERENCES projects(namespace_code, code) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password TEXT,                  -- argon2id PHC string, NULL = no password login
    active INTEGER NOT NULL DEFAULT 1,
    firstname TEXT NOT NULL DEFAULT '',
    lastname TEXT NOT NULL DEFAULT '',
    refresh_token_hash TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- type: user (implicit, one per user), token (implicit, one per token), role (named)
CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(code, type)
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, role_id)
);

CREATE TABLE IF NOT EXISTS resource_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    namespace TEXT NOT NULL,
    project TEXT NOT NULL,
    resource TEXT NOT NULL,
    action TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS admin_permissions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    section TEXT NOT NULL,
    action TEXT NOT NULL
);

-- API tokens; the plain value is never stored
CREATE TABLE IF NOT EXISTS tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    token_hash TEXT NOT NULL UNIQUE,   -- sha256 hex of the plain token
    preview TEXT NOT NULL,
    expires_at TEXT,                   -- NULL = never
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace_code TEXT NOT NULL,
    project_code TEXT NOT NULL,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    status TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0,
    error TEXT NOT NULL DEFAULT '',
    load_duration_ms INTEGER NOT NULL DEFAULT 0,
    last_hit_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(namespace_code, project_code, name),
    FOREIGN KEY (namespace_code, project_code)
        REFERENCES projects(namespace_code, code) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_redirects_project ON redirects(namespace_code, project_code, is_published);
CREATE INDEX IF NOT EXISTS idx_redirects_source ON redirects(namespace_code, project_code, source);
CREATE INDEX IF NOT EXISTS idx_redirect_drafts_project ON redirect_drafts(namespace_code, project_code);
CREATE INDEX IF NOT EXISTS idx_redirect_drafts_source ON redirect_drafts(namespace_code, project_code, new_source);
CREATE INDEX IF NOT EXISTS idx_pages_project ON pages(namespace_code, project_code, is_published);
CREATE INDEX IF NOT EXISTS idx_pages_path ON pages(namespace_code, project_code, path);
CREATE INDEX IF NOT EXISTS idx_page_drafts_project ON page_drafts(namespace_code, project_code);
CREATE INDEX IF NOT EXISTS idx_page_drafts_path ON page_drafts(namespace_code, project_code, new_path);
CREATE INDEX IF NOT EXISTS idx_agents_project ON agents(namespace_code, project_code);
CREATE INDEX IF NOT EXISTS idx_agents_last_hit ON agents(namespace_code, project_code, last_hit_at);
CREATE INDEX IF NOT EXISTS idx_user_roles_role ON user_roles(role_id);
CREATE INDEX IF NOT EXISTS idx_resource_permissions_role ON resource_permissions(role_id);
CREATE INDEX IF NOT EXISTS idx_admin_permissions_role ON admin_permissions(role_id);
"#;
