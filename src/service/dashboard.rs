use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::store::drafts::{self, DraftPayload};
use crate::store::{Ctx, SqliteStore, agents, now, projects};
use crate::types::{PageData, RedirectData};

/// A total with its per-category split.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub total: i64,
    pub by_category: BTreeMap<String, i64>,
}

impl Breakdown {
    fn from_counts(counts: Vec<(String, i64)>) -> Self {
        let total = counts.iter().map(|(_, n)| n).sum();
        Self {
            total,
            by_category: counts.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentSummary {
    pub online: i64,
    pub errors: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub version: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub redirects: Breakdown,
    pub redirect_drafts: Breakdown,
    pub pages: Breakdown,
    pub page_drafts: Breakdown,
    pub agents: AgentSummary,
}

pub struct DashboardService {
    store: Arc<SqliteStore>,
    agents: AgentConfig,
}

impl DashboardService {
    pub fn new(store: Arc<SqliteStore>, agents: AgentConfig) -> Self {
        Self { store, agents }
    }

    /// Snapshot of one project: published rows by type, pending drafts by
    /// change type and agents seen within the offline threshold.
    pub fn get(&self, ctx: &Ctx, namespace: &str, project: &str) -> Result<Dashboard> {
        let since = now() - self.agents.offline_threshold();
        self.store.read(ctx, |conn| {
            let current = projects::require(conn, namespace, project)?;
            let (online, errors) = agents::count_online(conn, namespace, project, since)?;
            Ok(Dashboard {
                version: current.version,
                published_at: current.published_at,
                redirects: published_by_type::<RedirectData>(conn, namespace, project)?,
                redirect_drafts: drafts_by_change::<RedirectData>(conn, namespace, project)?,
                pages: published_by_type::<PageData>(conn, namespace, project)?,
                page_drafts: drafts_by_change::<PageData>(conn, namespace, project)?,
                agents: AgentSummary { online, errors },
            })
        })
    }
}

fn published_by_type<P: DraftPayload>(
    conn: &rusqlite::Connection,
    namespace: &str,
    project: &str,
) -> Result<Breakdown> {
    drafts::count_published_by::<P>(conn, namespace, project, "type").map(Breakdown::from_counts)
}

fn drafts_by_change<P: DraftPayload>(
    conn: &rusqlite::Connection,
    namespace: &str,
    project: &str,
) -> Result<Breakdown> {
    drafts::count_drafts_by_change_type::<P>(conn, namespace, project).map(Breakdown::from_counts)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::Error;
    use crate::store::agents::AgentReport;
    use crate::store::test_support::{seed_project, store};
    use crate::types::{AgentStatus, AgentType, ChangeType, PageType, RedirectStatus, RedirectType};

    fn report(name: &str, status: AgentStatus) -> AgentReport {
        AgentReport {
            name: name.to_string(),
            agent_type: AgentType::Default,
            status,
            version: 1,
            error: String::new(),
            load_duration_ms: 12,
        }
    }

    #[test]
    fn test_dashboard_counts() {
        let (_temp, store) = store();
        seed_project(&store, "a", "p");
        let ctx = Ctx::new();
        store
            .write(&ctx, |tx| {
                for (t, source) in [(RedirectType::Basic, "/a"), (RedirectType::Basic, "/b"), (RedirectType::Regex, "^/c")] {
                    let id = drafts::insert_stub::<RedirectData>(tx, "a", "p")?;
                    let data = RedirectData::new(t, source, "/t", RedirectStatus::Found);
                    drafts::publish_row(tx, id, &data, now())?;
                }
                let stub = drafts::insert_stub::<RedirectData>(tx, "a", "p")?;
                let data = RedirectData::new(RedirectType::Basic, "/d", "/t", RedirectStatus::Found);
                drafts::insert_draft(tx, "a", "p", ChangeType::Create, stub, Some(&data))?;

                let stub = drafts::insert_stub::<PageData>(tx, "a", "p")?;
                let page = PageData::new(PageType::Basic, "/p", "hello", "text/plain");
                drafts::insert_draft(tx, "a", "p", ChangeType::Create, stub, Some(&page))?;

                let t = now();
                agents::upsert(tx, "a", "p", &report("fresh", AgentStatus::Success), t)?;
                agents::upsert(tx, "a", "p", &report("broken", AgentStatus::Error), t)?;
                agents::upsert(tx, "a", "p", &report("stale", AgentStatus::Error), t - Duration::hours(2))?;
                Ok(())
            })
            .unwrap();

        let service = DashboardService::new(Arc::new(store), AgentConfig::default());
        let dashboard = service.get(&ctx, "a", "p").unwrap();
        assert_eq!(dashboard.version, 1);
        assert_eq!(dashboard.published_at, None);
        assert_eq!(dashboard.redirects.total, 3);
        assert_eq!(dashboard.redirects.by_category.get("basic"), Some(&2));
        assert_eq!(dashboard.redirects.by_category.get("regex"), Some(&1));
        assert_eq!(dashboard.redirect_drafts.by_category.get("CREATE"), Some(&1));
        assert_eq!(dashboard.pages.total, 0);
        assert_eq!(dashboard.page_drafts.total, 1);
        assert_eq!(dashboard.agents, AgentSummary { online: 2, errors: 1 });
    }

    #[test]
    fn test_dashboard_unknown_project() {
        let (_temp, store) = store();
        let service = DashboardService::new(Arc::new(store), AgentConfig::default());
        assert!(matches!(
            service.get(&Ctx::new(), "a", "missing"),
            Err(Error::NotFound("project"))
        ));
    }
}
