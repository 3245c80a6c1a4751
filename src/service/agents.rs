use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::agents::AgentReport;
use crate::store::{Condition, Ctx, Paginated, SqliteStore, agents, now, projects};
use crate::types::{Agent, AgentStatus, AgentType};
use crate::validate::{Rule, Validator};

use super::ListParams;

const NAME_MAX: usize = 255;

/// Host or pod style names: no whitespace, no leading punctuation.
static AGENT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:@-]*$")
        .unwrap_or_else(|e| panic!("invalid agent name regex: {e}"))
});
const AGENT_TYPES: &[&str] = &["default", "traefik"];
const AGENT_STATUSES: &[&str] = &["success", "error"];

/// What an agent reports on each poll, before enum validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentHit {
    pub name: String,
    #[serde(rename = "type")]
    pub agent_type: String,
    pub status: String,
    pub version: i64,
    pub error: String,
    pub load_duration_ms: i64,
}

impl AgentHit {
    fn into_report(self) -> Result<AgentReport> {
        Validator::new()
            .field(
                "name",
                &self.name,
                &[Rule::Required, Rule::Max(NAME_MAX), Rule::Regex("agent_name", &AGENT_NAME_RE)],
            )
            .field("type", &self.agent_type, &[Rule::Required, Rule::OneOf(AGENT_TYPES)])
            .field("status", &self.status, &[Rule::Required, Rule::OneOf(AGENT_STATUSES)])
            .finish()?;
        let agent_type: AgentType = self.agent_type.parse().map_err(Error::InvalidArgument)?;
        let status: AgentStatus = self.status.parse().map_err(Error::InvalidArgument)?;
        Ok(AgentReport {
            name: self.name,
            agent_type,
            status,
            version: self.version,
            error: self.error,
            load_duration_ms: self.load_duration_ms.max(0),
        })
    }
}

pub struct AgentService {
    store: Arc<SqliteStore>,
}

impl AgentService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Records a poll: creates the agent on first sight, otherwise refreshes it.
    pub fn upsert(&self, ctx: &Ctx, namespace: &str, project: &str, hit: AgentHit) -> Result<Agent> {
        let report = hit.into_report()?;
        let agent = self.store.write(ctx, |tx| {
            projects::require(tx, namespace, project)?;
            agents::upsert(tx, namespace, project, &report, now())
        })?;
        tracing::debug!(
            namespace,
            project,
            agent = %agent.name,
            status = %agent.status,
            version = agent.version,
            "agent hit"
        );
        Ok(agent)
    }

    /// Refreshes liveness of a known agent without touching its report.
    pub fn update_last_hit(&self, ctx: &Ctx, namespace: &str, project: &str, name: &str) -> Result<()> {
        self.store
            .write(ctx, |tx| agents::update_last_hit(tx, namespace, project, name, now()))
    }

    pub fn get(&self, ctx: &Ctx, namespace: &str, project: &str, id: i64) -> Result<Agent> {
        self.store
            .read(ctx, |conn| agents::get(conn, namespace, project, id))?
            .ok_or(Error::NotFound("agent"))
    }

    pub fn delete(&self, ctx: &Ctx, namespace: &str, project: &str, id: i64) -> Result<()> {
        if !self.store.write(ctx, |tx| agents::delete(tx, namespace, project, id))? {
            return Err(Error::NotFound("agent"));
        }
        tracing::info!(namespace, project, agent_id = id, "agent deleted");
        Ok(())
    }

    pub fn list(&self, ctx: &Ctx, namespace: &str, project: &str, params: &ListParams) -> Result<Paginated<Agent>> {
        let mut query = params
            .sorted(agents::select(), agents::SORT_COLUMNS)
            .filter(Condition::eq("namespace_code", namespace))
            .filter(Condition::eq("project_code", project));
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::contains("name", term));
        }
        self.store.read(ctx, |conn| agents::search(conn, query, params.page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{seed_project, store};

    fn hit(name: &str, status: &str) -> AgentHit {
        AgentHit {
            name: name.to_string(),
            agent_type: "traefik".to_string(),
            status: status.to_string(),
            version: 2,
            ..Default::default()
        }
    }

    fn service() -> (tempfile::TempDir, AgentService) {
        let (temp, store) = store();
        seed_project(&store, "a", "p");
        (temp, AgentService::new(Arc::new(store)))
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let (_temp, service) = service();
        let ctx = Ctx::new();
        let first = service.upsert(&ctx, "a", "p", hit("edge-1", "success")).unwrap();
        let second = service.upsert(&ctx, "a", "p", hit("edge-1", "error")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.status, AgentStatus::Error);
        assert!(second.last_hit_at >= first.last_hit_at);
        assert_eq!(service.list(&ctx, "a", "p", &ListParams::default()).unwrap().total, 1);
    }

    #[test]
    fn test_upsert_validates_enums() {
        let (_temp, service) = service();
        let mut bad = hit("edge-1", "weird");
        bad.agent_type = "nginx".into();
        match service.upsert(&Ctx::new(), "a", "p", bad) {
            Err(Error::Validation(report)) => {
                assert!(report.has("type", "oneof"));
                assert!(report.has("status", "oneof"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_upsert_rejects_malformed_name() {
        let (_temp, service) = service();
        for name in ["edge 1", "-edge", "edge\n1"] {
            match service.upsert(&Ctx::new(), "a", "p", hit(name, "success")) {
                Err(Error::Validation(report)) => assert!(report.has("name", "agent_name"), "{name:?}"),
                other => panic!("expected validation error for {name:?}, got {other:?}"),
            }
        }
        service
            .upsert(&Ctx::new(), "a", "p", hit("edge-1.eu-west:8080", "success"))
            .unwrap();
    }

    #[test]
    fn test_upsert_requires_project() {
        let (_temp, service) = service();
        assert!(matches!(
            service.upsert(&Ctx::new(), "a", "ghost", hit("edge-1", "success")),
            Err(Error::NotFound("project"))
        ));
    }

    #[test]
    fn test_update_last_hit_unknown_agent() {
        let (_temp, service) = service();
        assert!(matches!(
            service.update_last_hit(&Ctx::new(), "a", "p", "ghost"),
            Err(Error::NotFound("agent"))
        ));
    }
}
