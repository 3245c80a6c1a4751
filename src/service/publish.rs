//! Publishing and rolling back a project's pending drafts.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::PageConfig;
use crate::error::{Error, Result};
use crate::store::drafts;
use crate::store::{Ctx, SqliteStore, now, pages, projects};
use crate::types::{ChangeType, PageData, Project, RedirectData};

use super::drafts::{Draftable, rollback_in};

/// Upserts applied between cancellation checks.
const PUBLISH_BATCH: usize = 500;

/// Age in seconds after which a publish claim is considered abandoned.
pub const PUBLISH_CLAIM_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedChanges {
    pub published: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub project: Project,
    pub redirects: AppliedChanges,
    pub pages: AppliedChanges,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    pub redirect_drafts: usize,
    pub unpublished_redirects: usize,
    pub page_drafts: usize,
    pub unpublished_pages: usize,
}

pub struct PublishCoordinator {
    store: Arc<SqliteStore>,
    limits: PageConfig,
}

impl PublishCoordinator {
    pub fn new(store: Arc<SqliteStore>, limits: PageConfig) -> Self {
        Self { store, limits }
    }

    /// Promotes every pending draft of the project in one transaction.
    ///
    /// The project is claimed first; a second publish of the same project
    /// fails with [`Error::PublishInProgress`] until the claim is released.
    /// Writes to other projects only delay the call by the busy timeout.
    pub fn publish(&self, ctx: &Ctx, namespace: &str, project: &str) -> Result<PublishOutcome> {
        let pending = self.store.read(ctx, |conn| {
            projects::require(conn, namespace, project)?;
            pending_drafts(conn, namespace, project)
        })?;
        if pending == 0 {
            return Err(Error::NothingToPublish);
        }

        let claimed_at = now();
        let stale_before = claimed_at - TimeDelta::seconds(PUBLISH_CLAIM_TTL_SECS);
        self.store
            .write(ctx, |tx| projects::claim_publish(tx, namespace, project, claimed_at, stale_before))
            .inspect_err(|e| {
                if matches!(e, Error::PublishInProgress) {
                    tracing::warn!(namespace, project, "publish rejected, project is already publishing");
                }
            })?;

        let outcome = self.store.write(ctx, |tx| {
            // A stale-claim takeover means another publish owns the project now.
            if projects::publishing_since(tx, namespace, project)? != Some(claimed_at) {
                return Err(Error::PublishInProgress);
            }
            let current = projects::require(tx, namespace, project)?;
            // A concurrent publish may have drained the drafts meanwhile.
            if pending_drafts(tx, namespace, project)? == 0 {
                return Err(Error::NothingToPublish);
            }

            let redirects = apply_drafts::<RedirectData>(tx, ctx, namespace, project, claimed_at, None)?;
            let pages = apply_drafts::<PageData>(
                tx,
                ctx,
                namespace,
                project,
                claimed_at,
                Some(self.limits.size_limit),
            )?;

            let total = pages::published_content_size(tx, namespace, project)?;
            if total > self.limits.total_size_limit {
                return Err(Error::TotalSizeLimitReached {
                    limit: self.limits.total_size_limit,
                });
            }

            let version = current.version + 1;
            let stamped_at = current.published_at.map_or(claimed_at, |prev| prev.max(claimed_at));
            // Also clears the claim.
            projects::record_publish(tx, namespace, project, version, stamped_at)?;
            Ok(PublishOutcome {
                project: projects::require(tx, namespace, project)?,
                redirects,
                pages,
            })
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.release_claim(namespace, project, claimed_at);
                return Err(e);
            }
        };

        tracing::info!(
            namespace,
            project,
            version = outcome.project.version,
            redirects_published = outcome.redirects.published,
            redirects_deleted = outcome.redirects.deleted,
            pages_published = outcome.pages.published,
            pages_deleted = outcome.pages.deleted,
            "project published"
        );
        Ok(outcome)
    }

    /// Drops the claim of a failed publish. Runs even when the request was
    /// cancelled; a claim left behind expires after [`PUBLISH_CLAIM_TTL_SECS`].
    fn release_claim(&self, namespace: &str, project: &str, claimed_at: DateTime<Utc>) {
        let released = self
            .store
            .write(&Ctx::new(), |tx| projects::release_publish(tx, namespace, project, claimed_at));
        if let Err(e) = released {
            tracing::warn!(namespace, project, error = %e, "failed to release publish claim");
        }
    }

    /// Discards every draft and unpublished row of both kinds at once.
    pub fn rollback(&self, ctx: &Ctx, namespace: &str, project: &str) -> Result<RollbackOutcome> {
        let outcome = self.store.write(ctx, |tx| {
            projects::require(tx, namespace, project)?;
            let (redirect_drafts, unpublished_redirects) = rollback_in::<RedirectData>(tx, ctx, namespace, project)?;
            ctx.check()?;
            let (page_drafts, unpublished_pages) = rollback_in::<PageData>(tx, ctx, namespace, project)?;
            Ok(RollbackOutcome {
                redirect_drafts,
                unpublished_redirects,
                page_drafts,
                unpublished_pages,
            })
        })?;
        tracing::info!(
            namespace,
            project,
            redirect_drafts = outcome.redirect_drafts,
            page_drafts = outcome.page_drafts,
            "project rolled back"
        );
        Ok(outcome)
    }
}

fn pending_drafts(conn: &Connection, namespace: &str, project: &str) -> Result<i64> {
    Ok(drafts::count_drafts::<RedirectData>(conn, namespace, project)?
        + drafts::count_drafts::<PageData>(conn, namespace, project)?)
}

/// Applies the drafts of one kind: upserts first, then the drafts are
/// dropped, then the rows marked for deletion.
fn apply_drafts<P: Draftable>(
    conn: &Connection,
    ctx: &Ctx,
    namespace: &str,
    project: &str,
    published_at: DateTime<Utc>,
    size_limit: Option<i64>,
) -> Result<AppliedChanges> {
    let pending = drafts::list_drafts::<P>(conn, namespace, project)?;
    let (upserts, deletes): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .partition(|draft| draft.change_type != ChangeType::Delete);

    for batch in upserts.chunks(PUBLISH_BATCH) {
        ctx.check()?;
        for draft in batch {
            let payload = draft.new_data.as_ref().ok_or_else(|| {
                Error::Internal(format!("{} draft {} has no payload", P::ENTITY, draft.id))
            })?;
            if let (Some(limit), Some(size)) = (size_limit, payload.budget_size()) {
                if size > limit {
                    return Err(Error::ContentSizeExceeded { size, limit });
                }
            }
            drafts::publish_row(conn, draft.old_id, payload, published_at)?;
        }
    }

    ctx.check()?;
    drafts::delete_drafts::<P>(conn, namespace, project)?;
    let delete_ids: Vec<i64> = deletes.iter().map(|draft| draft.old_id).collect();
    let deleted = drafts::delete_rows::<P>(conn, &delete_ids)?;

    Ok(AppliedChanges {
        published: upserts.len(),
        deleted,
    })
}
