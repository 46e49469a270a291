use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::warn;

/// Optional predicates for the search endpoint.
///
/// Only populated filters become query parameters. Match semantics (exact vs.
/// substring, case sensitivity) are defined by the server; no local
/// validation of filter values is performed.
#[derive(Debug, Default, Clone)]
pub struct SearchFilters {
    pub file_id: Option<String>,
    pub research_project_id: Option<String>,
    pub author: Option<String>,
    pub file_type: Option<String>,
    pub experiment_type: Option<String>,
    pub tags_contain: Option<String>,
    /// Records conducted on or after this date.
    pub date_after: Option<NaiveDate>,
    /// Records conducted on or before this date.
    pub date_before: Option<NaiveDate>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_id(mut self, v: impl Into<String>) -> Self {
        self.file_id = Some(v.into());
        self
    }

    pub fn research_project_id(mut self, v: impl Into<String>) -> Self {
        self.research_project_id = Some(v.into());
        self
    }

    pub fn author(mut self, v: impl Into<String>) -> Self {
        self.author = Some(v.into());
        self
    }

    pub fn file_type(mut self, v: impl Into<String>) -> Self {
        self.file_type = Some(v.into());
        self
    }

    pub fn experiment_type(mut self, v: impl Into<String>) -> Self {
        self.experiment_type = Some(v.into());
        self
    }

    pub fn tags_contain(mut self, v: impl Into<String>) -> Self {
        self.tags_contain = Some(v.into());
        self
    }

    pub fn date_after(mut self, v: NaiveDate) -> Self {
        self.date_after = Some(v);
        self
    }

    pub fn date_before(mut self, v: NaiveDate) -> Self {
        self.date_before = Some(v);
        self
    }

    /// Query parameters for the populated filters, in a stable order.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let text = [
            ("file_id", &self.file_id),
            ("research_project_id", &self.research_project_id),
            ("author", &self.author),
            ("file_type", &self.file_type),
            ("experiment_type", &self.experiment_type),
            ("tags_contain", &self.tags_contain),
        ];
        for (k, v) in text {
            if let Some(v) = v {
                params.push((k, v.clone()));
            }
        }
        if let Some(d) = self.date_after {
            params.push(("date_after", d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.date_before {
            params.push(("date_before", d.format("%Y-%m-%d").to_string()));
        }
        params
    }
}

/// One row of a search result: the metadata fields plus the server-assigned
/// identifier and upload timestamp.
///
/// The two timestamp-bearing fields are coerced to [`NaiveDateTime`];
/// unparsable values degrade to `None` instead of failing the search.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Server-issued file identifier, usable with download.
    pub id: Option<String>,
    pub file_name: Option<String>,
    pub research_project_id: Option<String>,
    pub author: Option<String>,
    pub file_type: Option<String>,
    pub experiment_type: Option<String>,
    pub custom_tags: Option<String>,
    pub date_conducted: Option<NaiveDateTime>,
    pub upload_timestamp: Option<NaiveDateTime>,
    /// Fields the client does not model, kept as raw JSON.
    pub extra: BTreeMap<String, Value>,
}

impl FileRecord {
    fn from_map(mut map: Map<String, Value>, invalid_dates: &mut usize) -> Self {
        let id = take_string(&mut map, "id");
        let file_name = take_string(&mut map, "file_name");
        let research_project_id = take_string(&mut map, "research_project_id");
        let author = take_string(&mut map, "author");
        let file_type = take_string(&mut map, "file_type");
        let experiment_type = take_string(&mut map, "experiment_type");
        let custom_tags = take_string(&mut map, "custom_tags");
        let date_conducted = take_datetime(&mut map, "date_conducted", invalid_dates);
        let upload_timestamp = take_datetime(&mut map, "upload_timestamp", invalid_dates);

        Self {
            id,
            file_name,
            research_project_id,
            author,
            file_type,
            experiment_type,
            custom_tags,
            date_conducted,
            upload_timestamp,
            extra: map.into_iter().collect(),
        }
    }
}

/// An ordered search result set.
#[derive(Debug, Default)]
pub struct SearchResults {
    pub records: Vec<FileRecord>,
    /// Number of date values that failed coercion and were degraded to null.
    pub invalid_dates: usize,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }
}

impl IntoIterator for SearchResults {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

pub(crate) fn results_from_rows(rows: Vec<Map<String, Value>>) -> SearchResults {
    let mut invalid_dates = 0;
    let records = rows
        .into_iter()
        .map(|m| FileRecord::from_map(m, &mut invalid_dates))
        .collect();
    SearchResults {
        records,
        invalid_dates,
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    }
}

fn take_datetime(
    map: &mut Map<String, Value>,
    key: &str,
    invalid_dates: &mut usize,
) -> Option<NaiveDateTime> {
    let value = map.remove(key)?;
    if value.is_null() {
        return None;
    }
    let raw = match &value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match parse_datetime(&raw) {
        Some(dt) => Some(dt),
        None => {
            *invalid_dates += 1;
            warn!("field '{key}' contains an invalid date '{raw}'; converted to null");
            None
        }
    }
}

/// Tolerant datetime parsing: RFC 3339, naive `T`/space-separated
/// datetimes (with or without fractional seconds), and bare dates.
pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_filters_produce_no_params() {
        assert!(SearchFilters::new().to_query().is_empty());
    }

    #[test]
    fn only_populated_filters_are_sent() {
        let filters = SearchFilters::new()
            .author("wkm2109")
            .date_after(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let query = filters.to_query();
        assert_eq!(
            query,
            vec![
                ("author", "wkm2109".to_string()),
                ("date_after", "2025-01-15".to_string()),
            ]
        );
    }

    #[test]
    fn parse_datetime_accepts_common_shapes() {
        assert!(parse_datetime("2025-01-15T10:30:00Z").is_some());
        assert!(parse_datetime("2025-01-15T10:30:00+02:00").is_some());
        assert!(parse_datetime("2025-01-15T10:30:00.123456").is_some());
        assert!(parse_datetime("2025-01-15 10:30:00").is_some());
        assert_eq!(
            parse_datetime("2025-01-15"),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(0, 0, 0)
        );
    }

    #[test]
    fn parse_datetime_rejects_garbage() {
        assert!(parse_datetime("not-a-date").is_none());
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("2025-13-99").is_none());
    }

    #[test]
    fn invalid_dates_degrade_to_null_and_are_counted() {
        let results = results_from_rows(vec![row(
            r#"{"id": "abc", "author": "x", "date_conducted": "not-a-date", "upload_timestamp": "2025-01-15T10:30:00Z"}"#,
        )]);
        assert_eq!(results.len(), 1);
        assert_eq!(results.invalid_dates, 1);
        let record = &results.records[0];
        assert_eq!(record.date_conducted, None);
        assert!(record.upload_timestamp.is_some());
    }

    #[test]
    fn unknown_fields_are_kept_in_extra() {
        let results = results_from_rows(vec![row(
            r#"{"id": 7, "author": "x", "size_bytes": 1024}"#,
        )]);
        let record = &results.records[0];
        // Numeric identifiers are coerced to text.
        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.extra["size_bytes"], Value::from(1024));
    }

    #[test]
    fn null_dates_are_not_counted_as_invalid() {
        let results = results_from_rows(vec![row(
            r#"{"id": "abc", "date_conducted": null}"#,
        )]);
        assert_eq!(results.invalid_dates, 0);
        assert_eq!(results.records[0].date_conducted, None);
    }
}
