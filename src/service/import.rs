//! Bulk import of redirects from a tab-separated file.
//!
//! Parsing never touches storage; the import phase reconciles each parsed
//! row against the project's published redirects and pending drafts inside
//! a single transaction.

use std::collections::HashMap;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::store::drafts;
use crate::store::{Ctx, SqliteStore, projects};
use crate::types::{ChangeType, RedirectData, RedirectStatus, RedirectType, redirects_equal};
use crate::validate::Validate;

/// Largest accepted upload, in bytes.
pub const MAX_IMPORT_SIZE: usize = 2 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 2] = ["csv", "tsv"];
const ALLOWED_MIME_PREFIXES: [&str; 5] = [
    "text/csv",
    "text/tab-separated-values",
    "text/plain",
    "application/csv",
    "application/octet-stream",
];
const HEADER: [&str; 4] = ["type", "source", "target", "status"];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportErrorReason {
    InvalidFieldCount,
    InvalidType,
    InvalidStatus,
    EmptySource,
    EmptyTarget,
    DuplicateSourceInFile,
    SourceAlreadyExists,
    InvalidRedirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRowError {
    /// 1-based line in the file; the header is line 1.
    pub line: u64,
    pub source: String,
    pub reason: ImportErrorReason,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub line: u64,
    pub redirect: RedirectData,
}

/// Result of the parse phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    pub errors: Vec<ImportRowError>,
}

impl ParsedImport {
    /// Data lines seen, valid or not.
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.rows.len() + self.errors.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub total_lines: usize,
    pub imported: usize,
    pub skipped: usize,
    pub error_count: usize,
    pub errors: Vec<ImportRowError>,
    pub success: bool,
}

/// Rejects uploads by name, declared type and size before reading them.
pub fn check_upload(file_name: &str, content_type: Option<&str>, size: usize) -> Result<()> {
    if size > MAX_IMPORT_SIZE {
        return Err(Error::ImportFile(format!(
            "file is {size} bytes, the limit is {MAX_IMPORT_SIZE}"
        )));
    }
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Error::ImportFile(format!(
            "unsupported file extension for '{file_name}', expected .csv or .tsv"
        )));
    }
    if let Some(content_type) = content_type {
        let content_type = content_type.to_ascii_lowercase();
        if !ALLOWED_MIME_PREFIXES
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
        {
            return Err(Error::ImportFile(format!(
                "unsupported content type '{content_type}'"
            )));
        }
    }
    Ok(())
}

fn parse_type(raw: &str) -> Option<RedirectType> {
    raw.to_ascii_lowercase().parse().ok()
}

fn parse_status(raw: &str) -> Option<RedirectStatus> {
    if let Ok(code) = raw.parse::<u16>() {
        return RedirectStatus::from_code(code);
    }
    RedirectStatus::ALL
        .into_iter()
        .find(|status| status.name().eq_ignore_ascii_case(raw))
}

fn check_header(header: &StringRecord) -> Result<()> {
    let matches = header.len() == HEADER.len()
        && header
            .iter()
            .zip(HEADER)
            .all(|(got, want)| got.trim().eq_ignore_ascii_case(want));
    if matches {
        Ok(())
    } else {
        Err(Error::ImportFile(format!(
            "header must be '{}', got '{}'",
            HEADER.join("\\t"),
            header.iter().collect::<Vec<_>>().join("\\t")
        )))
    }
}

fn row_error(line: u64, source: &str, reason: ImportErrorReason, message: impl Into<String>) -> ImportRowError {
    ImportRowError {
        line,
        source: source.to_string(),
        reason,
        message: message.into(),
    }
}

fn parse_record(line: u64, record: &StringRecord) -> std::result::Result<RedirectData, ImportRowError> {
    let source = record.get(1).unwrap_or_default();
    if record.len() != HEADER.len() {
        return Err(row_error(
            line,
            source,
            ImportErrorReason::InvalidFieldCount,
            format!("expected {} fields, got {}", HEADER.len(), record.len()),
        ));
    }
    let (raw_type, target, raw_status) = (&record[0], &record[2], &record[3]);

    let redirect_type = parse_type(raw_type).ok_or_else(|| {
        row_error(line, source, ImportErrorReason::InvalidType, format!("unknown type '{raw_type}'"))
    })?;
    let status = parse_status(raw_status).ok_or_else(|| {
        row_error(line, source, ImportErrorReason::InvalidStatus, format!("unknown status '{raw_status}'"))
    })?;
    if source.is_empty() {
        return Err(row_error(line, source, ImportErrorReason::EmptySource, "source is empty"));
    }
    if target.is_empty() {
        return Err(row_error(line, source, ImportErrorReason::EmptyTarget, "target is empty"));
    }
    Ok(RedirectData::new(redirect_type, source, target, status))
}

/// Parses a tab-separated import file.
///
/// A wrong header fails the whole file; every other problem is reported per
/// row and the row is dropped.
pub fn parse(bytes: &[u8]) -> Result<ParsedImport> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(bytes);

    let header = reader
        .headers()
        .map_err(|e| Error::ImportFile(format!("unreadable header: {e}")))?
        .clone();
    check_header(&header)?;

    let mut parsed = ParsedImport::default();
    let mut first_seen: HashMap<String, u64> = HashMap::new();
    let mut record = StringRecord::new();
    loop {
        let more = reader
            .read_record(&mut record)
            .map_err(|e| Error::ImportFile(format!("unreadable row: {e}")))?;
        if !more {
            break;
        }
        let line = record.position().map_or(0, csv::Position::line);

        let redirect = match parse_record(line, &record) {
            Ok(redirect) => redirect,
            Err(error) => {
                parsed.errors.push(error);
                continue;
            }
        };
        if let Some(first) = first_seen.get(&redirect.source) {
            parsed.errors.push(row_error(
                line,
                &redirect.source,
                ImportErrorReason::DuplicateSourceInFile,
                format!("duplicate of line {first}"),
            ));
            continue;
        }
        first_seen.insert(redirect.source.clone(), line);
        parsed.rows.push(ImportRow { line, redirect });
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Imported,
    Skipped,
}

pub struct ImportService {
    store: Arc<SqliteStore>,
}

impl ImportService {
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Parses and imports in one call.
    pub fn import_bytes(
        &self,
        ctx: &Ctx,
        namespace: &str,
        project: &str,
        bytes: &[u8],
        overwrite: bool,
    ) -> Result<ImportReport> {
        if bytes.len() > MAX_IMPORT_SIZE {
            return Err(Error::ImportFile(format!(
                "file is {} bytes, the limit is {MAX_IMPORT_SIZE}",
                bytes.len()
            )));
        }
        let parsed = parse(bytes)?;
        self.import(ctx, namespace, project, parsed, overwrite)
    }

    /// Reconciles parsed rows with the project.
    ///
    /// Sources already in use are reported unless `overwrite` is set, in
    /// which case the existing draft or published redirect is updated.
    /// Rows identical to what is already staged are skipped.
    pub fn import(
        &self,
        ctx: &Ctx,
        namespace: &str,
        project: &str,
        parsed: ParsedImport,
        overwrite: bool,
    ) -> Result<ImportReport> {
        let total_lines = parsed.total_lines();
        let mut errors = parsed.errors;

        let (imported, skipped) = self.store.write(ctx, |tx| {
            projects::require(tx, namespace, project)?;
            let mut imported = 0;
            let mut skipped = 0;
            for row in &parsed.rows {
                ctx.check()?;
                let source = row.redirect.source.as_str();
                let available = drafts::key_available::<RedirectData>(tx, namespace, project, source, None, None)?;
                if !available && !overwrite {
                    errors.push(row_error(
                        row.line,
                        source,
                        ImportErrorReason::SourceAlreadyExists,
                        "source is already used",
                    ));
                    continue;
                }
                if let Err(report) = row.redirect.validate() {
                    errors.push(row_error(
                        row.line,
                        source,
                        ImportErrorReason::InvalidRedirect,
                        report.to_string(),
                    ));
                    continue;
                }
                match reconcile(tx, namespace, project, &row.redirect, available)? {
                    RowOutcome::Imported => imported += 1,
                    RowOutcome::Skipped => skipped += 1,
                }
            }
            Ok((imported, skipped))
        })?;

        errors.sort_by_key(|e| e.line);
        let report = ImportReport {
            total_lines,
            imported,
            skipped,
            error_count: errors.len(),
            success: errors.is_empty(),
            errors,
        };
        tracing::info!(
            namespace,
            project,
            total_lines = report.total_lines,
            imported = report.imported,
            skipped = report.skipped,
            errors = report.error_count,
            overwrite,
            "redirect import finished"
        );
        Ok(report)
    }
}

fn reconcile(
    conn: &Connection,
    namespace: &str,
    project: &str,
    redirect: &RedirectData,
    available: bool,
) -> Result<RowOutcome> {
    let source = redirect.source.as_str();

    if let Some(published) = drafts::find_published_by_key::<RedirectData>(conn, namespace, project, source)? {
        return match drafts::draft_for_row::<RedirectData>(conn, published.id)? {
            Some(draft) if draft.change_type != ChangeType::Delete
                && redirects_equal(draft.new_data.as_ref(), Some(redirect)) =>
            {
                Ok(RowOutcome::Skipped)
            }
            // A pending DELETE is turned back into an UPDATE.
            Some(draft) => {
                drafts::update_draft(conn, draft.id, ChangeType::Update, redirect)?;
                Ok(RowOutcome::Imported)
            }
            None if redirects_equal(published.data.as_ref(), Some(redirect)) => Ok(RowOutcome::Skipped),
            None => {
                drafts::insert_draft(conn, namespace, project, ChangeType::Update, published.id, Some(redirect))?;
                Ok(RowOutcome::Imported)
            }
        };
    }

    if let Some(draft) = drafts::find_draft_by_key::<RedirectData>(conn, namespace, project, source)? {
        if redirects_equal(draft.new_data.as_ref(), Some(redirect)) {
            return Ok(RowOutcome::Skipped);
        }
        drafts::update_draft(conn, draft.id, draft.change_type, redirect)?;
        return Ok(RowOutcome::Imported);
    }

    if !available {
        tracing::warn!(
            namespace,
            project,
            source,
            "source reported in use but no redirect or draft holds it, importing as new"
        );
    }
    let stub = drafts::insert_stub::<RedirectData>(conn, namespace, project)?;
    drafts::insert_draft(conn, namespace, project, ChangeType::Create, stub, Some(redirect))?;
    Ok(RowOutcome::Imported)
}
