//! Per-student absence counts imported from the course roster sheet.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::leave_count::TOTAL_COUNT_KEY;
use crate::store::LeaveCountStore;
use crate::utils::validation::{is_valid_roll_number, normalize_roll_number};

/// Returned for roll numbers with no imported entry.
pub const UNKNOWN_COUNT: i64 = -1;

const PREVIEW_ROWS: usize = 10;
const ROLL_NUMBER_HEADERS: [&str; 3] = ["rollNumber", "Roll Number", "RollNumber"];
const COUNT_HEADERS: [&str; 4] = ["Absent", "Attendance Count", "LeaveCount", "count"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveLookup {
    #[schema(example = "CS101")]
    pub roll_number: String,
    /// Absences for this student, `-1` when unknown.
    #[schema(example = 3)]
    pub count: i64,
    /// Sessions held so far, `-1` when not imported.
    #[schema(example = 24)]
    pub total_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveCountRow {
    #[schema(example = "CS101")]
    pub roll_number: String,
    #[schema(example = 3)]
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Updated,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub roll_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    pub status: ImportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<ImportOutcome>,
}

impl ImportReport {
    fn push(&mut self, outcome: ImportOutcome) {
        match outcome.status {
            ImportStatus::Updated => self.updated += 1,
            ImportStatus::Failed => self.failed += 1,
            ImportStatus::Skipped => self.skipped += 1,
        }
        self.results.push(outcome);
    }
}

fn is_importable_roll_number(roll_number: &str) -> bool {
    roll_number == TOTAL_COUNT_KEY || is_valid_roll_number(roll_number)
}

/// Lookup and import over a `LeaveCountStore`, with a short-lived cache in
/// front of lookups.
///
/// Cached values carry the import generation they were read under. Every
/// import bumps the generation after its writes, so a value read before an
/// import finished is never served afterwards, even if it lands in the cache
/// late.
#[derive(Clone)]
pub struct LeaveCounts {
    cache: Cache<String, (u64, Option<i64>)>,
    generation: Arc<AtomicU64>,
}

impl LeaveCounts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn remember(&self, roll_number: &str, generation: u64, value: Option<i64>) {
        self.cache
            .insert(roll_number.to_string(), (generation, value))
            .await;
    }

    async fn cached<S: LeaveCountStore>(
        &self,
        store: &S,
        roll_number: &str,
    ) -> Result<Option<i64>, AttendanceError> {
        let generation = self.generation();
        if let Some((seen, hit)) = self.cache.get(roll_number).await {
            if seen == generation {
                return Ok(hit);
            }
        }
        let value = store.leave_count(roll_number).await?;
        self.remember(roll_number, generation, value).await;
        Ok(value)
    }

    pub async fn lookup<S: LeaveCountStore>(
        &self,
        store: &S,
        roll_number: &str,
    ) -> Result<LeaveLookup, AttendanceError> {
        let roll_number = normalize_roll_number(roll_number);
        if roll_number.is_empty() {
            return Err(AttendanceError::InvalidRollNumber);
        }

        let count = self.cached(store, &roll_number).await?;
        let total_count = self.cached(store, TOTAL_COUNT_KEY).await?;

        Ok(LeaveLookup {
            roll_number,
            count: count.unwrap_or(UNKNOWN_COUNT),
            total_count: total_count.unwrap_or(UNKNOWN_COUNT),
        })
    }

    pub async fn import<S: LeaveCountStore>(
        &self,
        store: &S,
        rows: Vec<LeaveCountRow>,
    ) -> ImportReport {
        let mut report = ImportReport::default();

        for row in rows {
            let roll_number = normalize_roll_number(&row.roll_number);

            if !is_importable_roll_number(&roll_number) {
                report.push(ImportOutcome {
                    roll_number,
                    count: Some(row.count),
                    status: ImportStatus::Skipped,
                    error: Some("invalid roll number".to_string()),
                });
                continue;
            }

            if row.count < 0 {
                report.push(ImportOutcome {
                    roll_number,
                    count: Some(row.count),
                    status: ImportStatus::Failed,
                    error: Some("count must not be negative".to_string()),
                });
                continue;
            }

            let outcome = match store.upsert_leave_count(&roll_number, row.count).await {
                Ok(()) => ImportOutcome {
                    roll_number,
                    count: Some(row.count),
                    status: ImportStatus::Updated,
                    error: None,
                },
                Err(e) => ImportOutcome {
                    roll_number,
                    count: Some(row.count),
                    status: ImportStatus::Failed,
                    error: Some(e.to_string()),
                },
            };
            report.push(outcome);
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
        info!(
            updated = report.updated,
            failed = report.failed,
            skipped = report.skipped,
            "Leave count import complete"
        );
        report
    }
}

/* =========================
Google Sheets roster
========================= */

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreviewRow {
    pub roll_number: Option<String>,
    pub count: Option<String>,
    pub raw_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
    pub sheet_name: String,
    pub total_rows: usize,
    pub preview: Vec<SheetPreviewRow>,
}

/// Rows parsed from the sheet, plus rows whose count cell was unreadable.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SheetRows {
    pub rows: Vec<LeaveCountRow>,
    pub rejected: Vec<ImportOutcome>,
}

struct Columns {
    roll_number: usize,
    count: Option<usize>,
}

fn locate_columns(header: &[String]) -> Result<Columns, AttendanceError> {
    let find = |names: &[&str]| {
        header
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
    };

    let roll_number = find(&ROLL_NUMBER_HEADERS)
        .ok_or_else(|| AttendanceError::SheetSync("no roll number column in sheet".to_string()))?;

    Ok(Columns {
        roll_number,
        count: find(&COUNT_HEADERS),
    })
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|c| c.trim()).filter(|c| !c.is_empty())
}

/// First row is the header. Rows without a roll number are ignored and a
/// blank count reads as zero.
pub fn rows_from_sheet(values: &[Vec<String>]) -> Result<SheetRows, AttendanceError> {
    let Some((header, body)) = values.split_first() else {
        return Ok(SheetRows::default());
    };
    let columns = locate_columns(header)?;

    let mut parsed = SheetRows::default();
    for row in body {
        let Some(roll_number) = cell(row, columns.roll_number) else {
            continue;
        };

        let raw_count = columns.count.and_then(|idx| cell(row, idx));
        match raw_count.map(str::parse::<i64>) {
            None => parsed.rows.push(LeaveCountRow {
                roll_number: roll_number.to_string(),
                count: 0,
            }),
            Some(Ok(count)) => parsed.rows.push(LeaveCountRow {
                roll_number: roll_number.to_string(),
                count,
            }),
            Some(Err(_)) => parsed.rejected.push(ImportOutcome {
                roll_number: normalize_roll_number(roll_number),
                count: None,
                status: ImportStatus::Failed,
                error: Some(format!("unreadable count {:?}", raw_count.unwrap_or_default())),
            }),
        }
    }
    Ok(parsed)
}

pub fn preview_from_sheet(
    sheet_name: &str,
    values: &[Vec<String>],
) -> Result<SheetPreview, AttendanceError> {
    let Some((header, body)) = values.split_first() else {
        return Ok(SheetPreview {
            sheet_name: sheet_name.to_string(),
            total_rows: 0,
            preview: Vec::new(),
        });
    };
    let columns = locate_columns(header)?;

    Ok(SheetPreview {
        sheet_name: sheet_name.to_string(),
        total_rows: body.len(),
        preview: body
            .iter()
            .take(PREVIEW_ROWS)
            .map(|row| SheetPreviewRow {
                roll_number: cell(row, columns.roll_number).map(str::to_string),
                count: columns
                    .count
                    .and_then(|idx| cell(row, idx))
                    .map(str::to_string),
                raw_data: row.clone(),
            })
            .collect(),
    })
}

/// Reads the roster through the Google Sheets values API.
#[derive(Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    sheet_id: Option<String>,
    pub sheet_name: String,
    api_key: Option<String>,
}

impl SheetClient {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            sheet_id: config.sheet_id.clone(),
            sheet_name: config.sheet_name.clone(),
            api_key: config.google_api_key.clone(),
        }
    }

    pub async fn fetch_values(&self) -> Result<Vec<Vec<String>>, AttendanceError> {
        let (Some(sheet_id), Some(api_key)) = (&self.sheet_id, &self.api_key) else {
            warn!("Sheet sync requested but GOOGLE_SHEET_ID or GOOGLE_API_KEY is not set");
            return Err(AttendanceError::SheetSync(
                "roster sheet is not configured".to_string(),
            ));
        };

        let mut url = reqwest::Url::parse("https://sheets.googleapis.com/v4/spreadsheets/")
            .map_err(|e| AttendanceError::SheetSync(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AttendanceError::SheetSync("invalid sheets url".to_string()))?
            .pop_if_empty()
            .push(sheet_id)
            .push("values")
            .push(&self.sheet_name);

        let response = self
            .http
            .get(url)
            .query(&[("key", api_key.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                // The request url carries the API key
                error!(error = %e.without_url(), "Roster sheet request failed");
                AttendanceError::SheetSync("could not read the roster sheet".to_string())
            })?;

        let range: ValueRange = response.json().await.map_err(|e| {
            error!(error = %e.without_url(), "Roster sheet response was not a value range");
            AttendanceError::SheetSync("unexpected roster sheet response".to_string())
        })?;

        Ok(range.values)
    }

    pub async fn sync<S: LeaveCountStore>(
        &self,
        leave_counts: &LeaveCounts,
        store: &S,
    ) -> Result<ImportReport, AttendanceError> {
        let values = self.fetch_values().await?;
        let SheetRows { rows, rejected } = rows_from_sheet(&values)?;

        let mut report = leave_counts.import(store, rows).await;
        for outcome in rejected {
            report.push(outcome);
        }
        info!(
            sheet = %self.sheet_name,
            processed = report.results.len(),
            "Sheet sync complete"
        );
        Ok(report)
    }

    pub async fn preview(&self) -> Result<SheetPreview, AttendanceError> {
        let values = self.fetch_values().await?;
        preview_from_sheet(&self.sheet_name, &values)
    }
}
