//! The draft engine shared by redirects and pages.
//!
//! A row only changes through drafts: CREATE drafts own an unpublished stub,
//! UPDATE and DELETE drafts point at a published row. At most one draft
//! exists per row.

use std::marker::PhantomData;
use std::sync::Arc;

use rusqlite::Connection;

use crate::config::PageConfig;
use crate::error::{Error, Result};
use crate::store::drafts::{self, DraftPayload};
use crate::store::{Condition, Ctx, Paginated, SqliteStore, pages, projects};
use crate::types::{ChangeType, Draft, PageData, Record, RedirectData};
use crate::validate::Validate;

use super::ListParams;

/// A payload the draft engine can stage.
pub trait Draftable: DraftPayload + Validate {
    /// Sort keys accepted when listing rows.
    const SORT_COLUMNS: &'static [(&'static str, &'static str)];
    /// Sort keys accepted when listing drafts.
    const DRAFT_SORT_COLUMNS: &'static [(&'static str, &'static str)];

    /// Error raised when the unique key is already taken in the project.
    fn key_taken() -> Error;

    /// Bytes this payload counts against the project budget, if budgeted.
    fn budget_size(&self) -> Option<i64> {
        None
    }

    /// Budgeted bytes the project currently serves.
    fn published_total(_conn: &Connection, _namespace: &str, _project: &str) -> Result<i64> {
        Ok(0)
    }
}

impl Draftable for RedirectData {
    const SORT_COLUMNS: &'static [(&'static str, &'static str)] = crate::store::redirects::SORT_COLUMNS;
    const DRAFT_SORT_COLUMNS: &'static [(&'static str, &'static str)] =
        crate::store::redirects::DRAFT_SORT_COLUMNS;

    fn key_taken() -> Error {
        Error::SourceAlreadyUsed
    }
}

impl Draftable for PageData {
    const SORT_COLUMNS: &'static [(&'static str, &'static str)] = pages::SORT_COLUMNS;
    const DRAFT_SORT_COLUMNS: &'static [(&'static str, &'static str)] = pages::DRAFT_SORT_COLUMNS;

    fn key_taken() -> Error {
        Error::PathAlreadyUsed
    }

    fn budget_size(&self) -> Option<i64> {
        Some(self.content_size())
    }

    fn published_total(conn: &Connection, namespace: &str, project: &str) -> Result<i64> {
        pages::published_content_size(conn, namespace, project)
    }
}

pub struct DraftEngine<P> {
    store: Arc<SqliteStore>,
    limits: PageConfig,
    _payload: PhantomData<fn() -> P>,
}

impl<P: Draftable> DraftEngine<P> {
    pub fn new(store: Arc<SqliteStore>, limits: PageConfig) -> Self {
        Self {
            store,
            limits,
            _payload: PhantomData,
        }
    }

    /// Validation that needs no storage: field rules and the per-item size cap.
    fn check_payload(&self, payload: &P) -> Result<()> {
        payload.validate()?;
        if let Some(size) = payload.budget_size() {
            if size > self.limits.size_limit {
                return Err(Error::ContentSizeExceeded {
                    size,
                    limit: self.limits.size_limit,
                });
            }
        }
        Ok(())
    }

    /// Fails when `published + added - replaced` would exceed the project budget.
    ///
    /// Pending drafts never count: a discarded DELETE draft must not leave the
    /// project over budget.
    fn check_total(&self, conn: &Connection, namespace: &str, project: &str, added: i64, replaced: i64) -> Result<()> {
        let published = P::published_total(conn, namespace, project)?;
        if published + added - replaced > self.limits.total_size_limit {
            return Err(Error::TotalSizeLimitReached {
                limit: self.limits.total_size_limit,
            });
        }
        Ok(())
    }

    /// Stages a change. The change type follows from which halves are given:
    /// both is UPDATE, only `new_payload` is CREATE, only `old_id` is DELETE.
    pub fn create(
        &self,
        ctx: &Ctx,
        namespace: &str,
        project: &str,
        old_id: Option<i64>,
        new_payload: Option<P>,
    ) -> Result<Draft<P>> {
        let change_type = ChangeType::derive(old_id.is_some(), new_payload.is_some()).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "a {} draft needs an existing {} id, a new payload, or both",
                P::ENTITY,
                P::ENTITY
            ))
        })?;
        if let Some(payload) = &new_payload {
            self.check_payload(payload)?;
        }

        let draft = self.store.write(ctx, |tx| {
            projects::require(tx, namespace, project)?;

            let old = match old_id {
                Some(id) => Some(
                    drafts::get_record::<P>(tx, namespace, project, id)?
                        .filter(|record| record.is_published)
                        .ok_or(Error::NotFound(P::ENTITY))?,
                ),
                None => None,
            };
            if let Some(old) = &old {
                if drafts::draft_for_row::<P>(tx, old.id)?.is_some() {
                    return Err(Error::AlreadyExists("draft"));
                }
            }

            if let Some(payload) = &new_payload {
                if !drafts::key_available::<P>(tx, namespace, project, payload.key(), old_id, None)? {
                    return Err(P::key_taken());
                }
                if let Some(size) = payload.budget_size() {
                    // The published row this draft replaces is already counted.
                    let replaced = old
                        .as_ref()
                        .and_then(|o| o.data.as_ref())
                        .and_then(|d| d.budget_size())
                        .unwrap_or(0);
                    self.check_total(tx, namespace, project, size, replaced)?;
                }
            }

            let owner = match &old {
                Some(old) => old.id,
                None => drafts::insert_stub::<P>(tx, namespace, project)?,
            };
            drafts::insert_draft(tx, namespace, project, change_type, owner, new_payload.as_ref())
        })?;

        tracing::debug!(
            entity = P::ENTITY,
            namespace,
            project,
            draft_id = draft.id,
            change_type = %draft.change_type,
            "draft created"
        );
        Ok(draft)
    }

    /// Replaces the payload of a CREATE or UPDATE draft.
    pub fn update(&self, ctx: &Ctx, namespace: &str, project: &str, draft_id: i64, new_payload: P) -> Result<Draft<P>> {
        self.check_payload(&new_payload)?;

        self.store.write(ctx, |tx| {
            let draft = drafts::get_draft::<P>(tx, namespace, project, draft_id)?.ok_or(Error::NotFound("draft"))?;
            if draft.change_type == ChangeType::Delete {
                return Err(Error::InvalidArgument("a DELETE draft has no payload to update".into()));
            }

            let key_changed = draft.new_data.as_ref().is_none_or(|old| old.key() != new_payload.key());
            if key_changed
                && !drafts::key_available::<P>(
                    tx,
                    namespace,
                    project,
                    new_payload.key(),
                    Some(draft.old_id),
                    Some(draft.id),
                )?
            {
                return Err(P::key_taken());
            }

            if let Some(size) = new_payload.budget_size() {
                let previous = draft.new_data.as_ref().and_then(|d| d.budget_size()).unwrap_or(0);
                if size > previous {
                    let replaced = if draft.change_type == ChangeType::Update {
                        drafts::get_record::<P>(tx, namespace, project, draft.old_id)?
                            .and_then(|record| record.data)
                            .and_then(|data| data.budget_size())
                            .unwrap_or(0)
                    } else {
                        0
                    };
                    self.check_total(tx, namespace, project, size, replaced)?;
                }
            }

            drafts::update_draft(tx, draft.id, draft.change_type, &new_payload)?;
            drafts::get_draft::<P>(tx, namespace, project, draft.id)?.ok_or(Error::NotFound("draft"))
        })
    }

    /// Discards a draft; a CREATE draft takes its stub row with it.
    pub fn delete(&self, ctx: &Ctx, namespace: &str, project: &str, draft_id: i64) -> Result<()> {
        self.store.write(ctx, |tx| {
            let draft = drafts::get_draft::<P>(tx, namespace, project, draft_id)?.ok_or(Error::NotFound("draft"))?;
            drafts::delete_draft::<P>(tx, draft.id)?;
            if draft.change_type == ChangeType::Create {
                drafts::delete_row::<P>(tx, draft.old_id)?;
            }
            Ok(())
        })
    }

    /// Drops every draft of the project and every row never published.
    /// Returns `(drafts, rows)` removed.
    pub fn rollback(&self, ctx: &Ctx, namespace: &str, project: &str) -> Result<(usize, usize)> {
        self.store.write(ctx, |tx| {
            projects::require(tx, namespace, project)?;
            rollback_in::<P>(tx, ctx, namespace, project)
        })
    }

    pub fn get_draft(&self, ctx: &Ctx, namespace: &str, project: &str, draft_id: i64) -> Result<Draft<P>> {
        self.store
            .read(ctx, |conn| drafts::get_draft::<P>(conn, namespace, project, draft_id))?
            .ok_or(Error::NotFound("draft"))
    }

    pub fn get(&self, ctx: &Ctx, namespace: &str, project: &str, id: i64) -> Result<Record<P>> {
        self.store
            .read(ctx, |conn| drafts::get_record::<P>(conn, namespace, project, id))?
            .filter(|record| record.is_published)
            .ok_or(Error::NotFound(P::ENTITY))
    }

    pub fn list_drafts(
        &self,
        ctx: &Ctx,
        namespace: &str,
        project: &str,
        params: &ListParams,
    ) -> Result<Paginated<Draft<P>>> {
        let mut query = params.sorted(drafts::select_drafts::<P>(namespace, project), P::DRAFT_SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::contains(format!("new_{}", P::KEY_COLUMN), term));
        }
        self.store
            .read(ctx, |conn| drafts::search_drafts::<P>(conn, query, params.page))
    }

    /// Published rows of the project.
    pub fn list(&self, ctx: &Ctx, namespace: &str, project: &str, params: &ListParams) -> Result<Paginated<Record<P>>> {
        let mut query = params.sorted(drafts::select_published::<P>(namespace, project), P::SORT_COLUMNS);
        if let Some(term) = params.search_term() {
            query = query.filter(Condition::contains(P::KEY_COLUMN, term));
        }
        self.store
            .read(ctx, |conn| drafts::search_records::<P>(conn, query, params.page))
    }

    /// Every published row, for agents.
    pub fn published(&self, ctx: &Ctx, namespace: &str, project: &str) -> Result<Vec<Record<P>>> {
        self.store
            .read(ctx, |conn| drafts::list_published::<P>(conn, namespace, project))
    }

    /// Whether `key` could be used by a new draft.
    pub fn key_available(
        &self,
        ctx: &Ctx,
        namespace: &str,
        project: &str,
        key: &str,
        exclude_old_id: Option<i64>,
        exclude_draft_id: Option<i64>,
    ) -> Result<bool> {
        self.store.read(ctx, |conn| {
            drafts::key_available::<P>(conn, namespace, project, key, exclude_old_id, exclude_draft_id)
        })
    }
}

/// Rollback body, shared with the project-wide rollback.
pub(crate) fn rollback_in<P: DraftPayload>(
    conn: &Connection,
    ctx: &Ctx,
    namespace: &str,
    project: &str,
) -> Result<(usize, usize)> {
    let removed_drafts = drafts::delete_drafts::<P>(conn, namespace, project)?;
    ctx.check()?;
    let removed_rows = drafts::delete_unpublished::<P>(conn, namespace, project)?;
    Ok((removed_drafts, removed_rows))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::test_support::{seed_project, store};
    use crate::store::{now, pages as page_store};
    use crate::types::{PageType, RedirectStatus, RedirectType};

    fn redirect(source: &str, target: &str) -> RedirectData {
        RedirectData::new(RedirectType::Basic, source, target, RedirectStatus::MovedPermanent)
    }

    fn page(path: &str, content: &str) -> PageData {
        PageData::new(PageType::Basic, path, content, "text/html")
    }

    fn limits(size_limit: i64, total_size_limit: i64) -> PageConfig {
        PageConfig {
            size_limit,
            total_size_limit,
        }
    }

    fn engines(limits: PageConfig) -> (tempfile::TempDir, Arc<SqliteStore>, DraftEngine<RedirectData>, DraftEngine<PageData>) {
        let (temp, store) = store();
        seed_project(&store, "a", "p");
        let store = Arc::new(store);
        (
            temp,
            store.clone(),
            DraftEngine::new(store.clone(), limits),
            DraftEngine::new(store, limits),
        )
    }

    /// Publishes a row directly so tests can start from published state.
    fn publish_directly<P: Draftable>(store: &SqliteStore, payload: &P) -> i64 {
        store
            .write(&Ctx::new(), |tx| {
                let id = drafts::insert_stub::<P>(tx, "a", "p")?;
                drafts::publish_row(tx, id, payload, now())?;
                Ok(id)
            })
            .unwrap()
    }

    /// Keys of the effective view: published rows not overridden by a draft,
    /// plus every non-delete draft.
    fn effective_keys(store: &SqliteStore) -> Vec<String> {
        let ctx = Ctx::new();
        store
            .read(&ctx, |conn| {
                let drafts = drafts::list_drafts::<RedirectData>(conn, "a", "p")?;
                let overridden: HashSet<i64> = drafts.iter().map(|d| d.old_id).collect();
                let mut keys: Vec<String> = drafts::list_published::<RedirectData>(conn, "a", "p")?
                    .into_iter()
                    .filter(|r| !overridden.contains(&r.id))
                    .filter_map(|r| r.data.map(|d| d.source))
                    .collect();
                keys.extend(drafts.into_iter().filter_map(|d| d.new_data.map(|d| d.source)));
                Ok(keys)
            })
            .unwrap()
    }

    fn assert_unique(keys: &[String]) {
        let set: HashSet<&String> = keys.iter().collect();
        assert_eq!(set.len(), keys.len(), "duplicate keys in {keys:?}");
    }

    #[test]
    fn test_change_type_derivation() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let published = publish_directly(&store, &redirect("/old", "/t"));

        let created = redirects.create(&ctx, "a", "p", None, Some(redirect("/x", "/y"))).unwrap();
        assert_eq!(created.change_type, ChangeType::Create);
        assert_ne!(created.old_id, published);

        let updated = redirects
            .create(&ctx, "a", "p", Some(published), Some(redirect("/old", "/new")))
            .unwrap();
        assert_eq!(updated.change_type, ChangeType::Update);
        assert_eq!(updated.old_id, published);

        assert!(matches!(
            redirects.create(&ctx, "a", "p", None, None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_delete_draft_of_published_row() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let published = publish_directly(&store, &redirect("/old", "/t"));

        let draft = redirects.create(&ctx, "a", "p", Some(published), None).unwrap();
        assert_eq!(draft.change_type, ChangeType::Delete);
        assert!(draft.new_data.is_none());

        // One draft per row.
        assert!(matches!(
            redirects.create(&ctx, "a", "p", Some(published), Some(redirect("/old", "/n"))),
            Err(Error::AlreadyExists("draft"))
        ));
        assert!(matches!(
            redirects.update(&ctx, "a", "p", draft.id, redirect("/old", "/n")),
            Err(Error::InvalidArgument(_))
        ));

        redirects.delete(&ctx, "a", "p", draft.id).unwrap();
        assert!(redirects.get(&ctx, "a", "p", published).is_ok());
    }

    #[test]
    fn test_old_id_must_be_published_row_of_project() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let stub = redirects.create(&ctx, "a", "p", None, Some(redirect("/x", "/y"))).unwrap().old_id;
        assert!(matches!(
            redirects.create(&ctx, "a", "p", Some(stub), None),
            Err(Error::NotFound("redirect"))
        ));
        assert!(matches!(
            redirects.create(&ctx, "a", "p", Some(9999), None),
            Err(Error::NotFound("redirect"))
        ));
        seed_project(&store, "a", "other");
        let published = publish_directly(&store, &redirect("/z", "/t"));
        assert!(matches!(
            redirects.create(&ctx, "a", "other", Some(published), None),
            Err(Error::NotFound("redirect"))
        ));
    }

    #[test]
    fn test_source_collision_with_published_redirect() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        publish_directly(&store, &redirect("/x", "/y"));
        assert!(matches!(
            redirects.create(&ctx, "a", "p", None, Some(redirect("/x", "/other"))),
            Err(Error::SourceAlreadyUsed)
        ));
    }

    #[test]
    fn test_source_collision_between_drafts() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let first = redirects.create(&ctx, "a", "p", None, Some(redirect("/a", "/1"))).unwrap();
        let second = redirects.create(&ctx, "a", "p", None, Some(redirect("/b", "/2"))).unwrap();

        assert!(matches!(
            redirects.update(&ctx, "a", "p", second.id, redirect("/a", "/2")),
            Err(Error::SourceAlreadyUsed)
        ));
        // Keeping its own source is fine.
        redirects.update(&ctx, "a", "p", first.id, redirect("/a", "/changed")).unwrap();
        assert_unique(&effective_keys(&store));
    }

    #[test]
    fn test_update_draft_may_keep_published_source() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let published = publish_directly(&store, &redirect("/x", "/y"));
        let draft = redirects
            .create(&ctx, "a", "p", Some(published), Some(redirect("/x", "/z")))
            .unwrap();
        let moved = redirects.update(&ctx, "a", "p", draft.id, redirect("/moved", "/z")).unwrap();
        assert_eq!(moved.new_data.unwrap().source, "/moved");
        let back = redirects.update(&ctx, "a", "p", draft.id, redirect("/x", "/z")).unwrap();
        assert_eq!(back.new_data.unwrap().source, "/x");
    }

    #[test]
    fn test_uniqueness_holds_across_operation_sequence() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let p1 = publish_directly(&store, &redirect("/one", "/t"));
        let _p2 = publish_directly(&store, &redirect("/two", "/t"));

        let attempts: Vec<Result<Draft<RedirectData>>> = vec![
            redirects.create(&ctx, "a", "p", None, Some(redirect("/one", "/dup"))),
            redirects.create(&ctx, "a", "p", None, Some(redirect("/three", "/t"))),
            redirects.create(&ctx, "a", "p", None, Some(redirect("/three", "/dup"))),
            redirects.create(&ctx, "a", "p", Some(p1), Some(redirect("/two", "/t"))),
            redirects.create(&ctx, "a", "p", Some(p1), Some(redirect("/four", "/t"))),
            redirects.create(&ctx, "a", "p", None, Some(redirect("/one", "/t"))),
        ];
        let failures = attempts.iter().filter(|r| r.is_err()).count();
        assert_eq!(failures, 4);
        assert_unique(&effective_keys(&store));
    }

    #[test]
    fn test_delete_create_draft_removes_stub() {
        let (_temp, store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let draft = redirects.create(&ctx, "a", "p", None, Some(redirect("/x", "/y"))).unwrap();
        redirects.delete(&ctx, "a", "p", draft.id).unwrap();
        let stub = store
            .read(&ctx, |conn| drafts::get_record::<RedirectData>(conn, "a", "p", draft.old_id))
            .unwrap();
        assert!(stub.is_none());
        assert!(matches!(
            redirects.delete(&ctx, "a", "p", draft.id),
            Err(Error::NotFound("draft"))
        ));
    }

    #[test]
    fn test_invalid_payload_is_rejected() {
        let (_temp, _store, redirects, _) = engines(PageConfig::default());
        let err = redirects
            .create(&Ctx::new(), "a", "p", None, Some(redirect("no-slash", "/y")))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_missing_project() {
        let (_temp, _store, redirects, _) = engines(PageConfig::default());
        assert!(matches!(
            redirects.create(&Ctx::new(), "a", "ghost", None, Some(redirect("/x", "/y"))),
            Err(Error::NotFound("project"))
        ));
    }

    #[test]
    fn test_page_size_limit() {
        let (_temp, _store, _, pages) = engines(limits(4, 100));
        let err = pages
            .create(&Ctx::new(), "a", "p", None, Some(page("/big", "12345")))
            .unwrap_err();
        assert!(matches!(err, Error::ContentSizeExceeded { size: 5, limit: 4 }));
    }

    #[test]
    fn test_page_total_budget_on_create_and_update() {
        let (_temp, store, _, pages) = engines(limits(10, 15));
        let ctx = Ctx::new();
        publish_directly(&store, &page("/pub", "0123456789"));

        let draft = pages.create(&ctx, "a", "p", None, Some(page("/a", "01234"))).unwrap();
        assert!(matches!(
            pages.create(&ctx, "a", "p", None, Some(page("/b", "012345"))),
            Err(Error::TotalSizeLimitReached { limit: 15 })
        ));
        // Growing the draft past five bytes does not fit either.
        assert!(matches!(
            pages.update(&ctx, "a", "p", draft.id, page("/a", "012345")),
            Err(Error::TotalSizeLimitReached { .. })
        ));
        // Shrinking never checks the budget.
        pages.update(&ctx, "a", "p", draft.id, page("/a", "0")).unwrap();

        let total = store
            .read(&ctx, |conn| page_store::published_content_size(conn, "a", "p"))
            .unwrap();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_pending_delete_frees_no_budget() {
        let (_temp, store, _, pages) = engines(limits(10, 12));
        let ctx = Ctx::new();
        let published = publish_directly(&store, &page("/a", "0123456789"));

        let removal = pages.create(&ctx, "a", "p", Some(published), None).unwrap();
        assert_eq!(removal.change_type, ChangeType::Delete);
        assert!(matches!(
            pages.create(&ctx, "a", "p", None, Some(page("/b", "0123456789"))),
            Err(Error::TotalSizeLimitReached { limit: 12 })
        ));

        // Discarding the DELETE draft leaves the project within budget.
        pages.delete(&ctx, "a", "p", removal.id).unwrap();
        let total = store
            .read(&ctx, |conn| page_store::published_content_size(conn, "a", "p"))
            .unwrap();
        assert!(total <= 12);
    }

    #[test]
    fn test_update_draft_growth_counts_replaced_row_once() {
        let (_temp, store, _, pages) = engines(limits(10, 14));
        let ctx = Ctx::new();
        let published = publish_directly(&store, &page("/pub", "01234"));
        let draft = pages
            .create(&ctx, "a", "p", Some(published), Some(page("/pub", "0")))
            .unwrap();

        // 5 published, replaced by 10: 10 of 14.
        pages.update(&ctx, "a", "p", draft.id, page("/pub", "0123456789")).unwrap();
    }

    #[test]
    fn test_page_update_draft_replaces_published_size() {
        let (_temp, store, _, pages) = engines(limits(10, 12));
        let ctx = Ctx::new();
        let published = publish_directly(&store, &page("/pub", "0123456789"));
        // 10 published, replaced by 10: still within 12.
        pages
            .create(&ctx, "a", "p", Some(published), Some(page("/pub", "9876543210")))
            .unwrap();
    }

    #[test]
    fn test_path_collision() {
        let (_temp, store, _, pages) = engines(PageConfig::default());
        publish_directly(&store, &page("/about", "x"));
        assert!(matches!(
            pages.create(&Ctx::new(), "a", "p", None, Some(page("/about", "y"))),
            Err(Error::PathAlreadyUsed)
        ));
    }

    #[test]
    fn test_rollback_keeps_published_rows() {
        let (_temp, store, _, pages) = engines(PageConfig::default());
        let ctx = Ctx::new();
        let published = publish_directly(&store, &page("/kept", "x"));
        pages.create(&ctx, "a", "p", None, Some(page("/new", "y"))).unwrap();

        let (removed_drafts, removed_rows) = pages.rollback(&ctx, "a", "p").unwrap();
        assert_eq!((removed_drafts, removed_rows), (1, 1));

        let listed = pages.list(&ctx, "a", "p", &ListParams::default()).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].id, published);
        assert_eq!(pages.list_drafts(&ctx, "a", "p", &ListParams::default()).unwrap().total, 0);
    }

    #[test]
    fn test_list_drafts_search() {
        let (_temp, _store, redirects, _) = engines(PageConfig::default());
        let ctx = Ctx::new();
        redirects.create(&ctx, "a", "p", None, Some(redirect("/blog/a", "/1"))).unwrap();
        redirects.create(&ctx, "a", "p", None, Some(redirect("/shop", "/2"))).unwrap();
        let params = ListParams {
            search: Some("BLOG".into()),
            ..ListParams::default()
        };
        let found = redirects.list_drafts(&ctx, "a", "p", &params).unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].new_data.as_ref().unwrap().source, "/blog/a");
    }
}
