//! Output shaping for command results.
//!
//! Every payload printed on stdout passes through [`OutputShaper`]: empty
//! values are pruned, then (in managed mode) oversized strings are truncated.
//! List results are wrapped in an `{items, pagination?}` envelope.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::errors::{AppError, AppResult};

/// Appended to truncated strings.
pub const ELLIPSIS: char = '\u{2026}';

/// Which shaping stages apply to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Prune and truncate. Used for query and discovery results.
    Managed,
    /// Prune only. Used for admin listings where full values matter.
    Raw,
}

/// Pagination information for list responses.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Always `true`; the block is omitted when nothing remains.
    pub has_more: bool,

    /// Cursor for the next page (the next skip offset).
    pub next_cursor: Option<String>,
}

/// Outcome of slicing a result list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl PageInfo {
    /// Page info for an offset-based page that returned `returned` items.
    pub fn from_offset(skip: u64, returned: usize, has_more: bool) -> Self {
        Self {
            has_more,
            next_cursor: has_more.then(|| (skip + returned as u64).to_string()),
        }
    }

    fn pagination(&self) -> Option<Pagination> {
        self.has_more.then(|| Pagination {
            has_more: true,
            next_cursor: self.next_cursor.clone(),
        })
    }
}

/// Slices an already-ordered list to `[skip, skip + limit)`.
pub fn paginate<T>(items: Vec<T>, skip: u64, limit: u64) -> (Vec<T>, PageInfo) {
    let total = items.len();
    let start = usize::try_from(skip).unwrap_or(usize::MAX).min(total);
    let end = start.saturating_add(usize::try_from(limit).unwrap_or(usize::MAX)).min(total);
    let page: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
    let info = PageInfo::from_offset(skip, page.len(), end < total);
    (page, info)
}

/// Removes null, blank strings, empty arrays and empty objects, recursively.
///
/// `0` and `false` are kept. An empty root yields `{}` (or `[]` for an array
/// root), never `null`.
pub fn prune(value: Value) -> Value {
    let is_array = value.is_array();
    match prune_value(value) {
        Some(pruned) => pruned,
        None if is_array => Value::Array(Vec::new()),
        None => Value::Object(Map::new()),
    }
}

fn prune_value(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(prune_value).collect();
            (!items.is_empty()).then_some(Value::Array(items))
        }
        Value::Object(map) => {
            let map: Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, value)| prune_value(value).map(|value| (key, value)))
                .collect();
            (!map.is_empty()).then_some(Value::Object(map))
        }
        other => Some(other),
    }
}

/// Fields exempt from truncation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExpandMode {
    #[default]
    None,
    /// Lowercased field names.
    Fields(HashSet<String>),
    All,
}

impl ExpandMode {
    /// Builds the mode from `--expand a,b` and `--full`. `--full` wins.
    pub fn from_flags(expand: Option<&str>, full: bool) -> Self {
        if full {
            return ExpandMode::All;
        }
        match expand {
            Some(list) => {
                let fields: HashSet<String> = list
                    .split(',')
                    .map(|field| field.trim().to_lowercase())
                    .filter(|field| !field.is_empty())
                    .collect();
                if fields.is_empty() {
                    ExpandMode::None
                } else {
                    ExpandMode::Fields(fields)
                }
            }
            None => ExpandMode::None,
        }
    }

    fn expands(&self, field: &str) -> bool {
        match self {
            ExpandMode::None => false,
            ExpandMode::Fields(fields) => fields.contains(&field.to_lowercase()),
            ExpandMode::All => true,
        }
    }
}

/// Truncates string fields longer than `max_length` characters.
#[derive(Debug, Clone)]
pub struct Truncator {
    max_length: usize,
    expand: ExpandMode,
}

impl Truncator {
    pub fn new(max_length: usize, expand: ExpandMode) -> Self {
        Self { max_length, expand }
    }

    /// Walks objects and arrays. An over-limit field `f` always gets an
    /// `fLength` sibling; its content is cut unless `f` is expanded.
    pub fn truncate(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, value) in map {
                    match value {
                        Value::String(s) => {
                            let length = s.chars().count();
                            if length > self.max_length {
                                out.insert(format!("{}Length", key), Value::from(length));
                                let content = if self.expand.expands(&key) {
                                    s
                                } else {
                                    self.cut(&s)
                                };
                                out.insert(key, Value::String(content));
                            } else {
                                out.insert(key, Value::String(s));
                            }
                        }
                        other => {
                            out.insert(key, self.truncate(other));
                        }
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.truncate(item)).collect())
            }
            other => other,
        }
    }

    fn cut(&self, s: &str) -> String {
        let mut out: String = s.chars().take(self.max_length).collect();
        out.push(ELLIPSIS);
        out
    }
}

/// Applies the prune/truncate chain and renders JSON text.
#[derive(Debug, Clone)]
pub struct OutputShaper {
    truncator: Truncator,
}

impl OutputShaper {
    pub fn new(truncator: Truncator) -> Self {
        Self { truncator }
    }

    /// Prunes, then truncates in managed mode.
    pub fn shape(&self, value: Value, mode: OutputMode) -> Value {
        let pruned = prune(value);
        match mode {
            OutputMode::Managed => self.truncator.truncate(pruned),
            OutputMode::Raw => pruned,
        }
    }

    /// Shapes any serializable payload and renders it pretty-printed.
    pub fn render<T: Serialize>(&self, data: &T, mode: OutputMode) -> AppResult<String> {
        let value = serde_json::to_value(data).map_err(anyhow::Error::from)?;
        pretty(&self.shape(value, mode))
    }

    /// Renders a list result.
    ///
    /// `context` fields (database, counts, ...) come first, then `items`, then
    /// `pagination` when more results exist. Items are shaped one by one so
    /// an empty page still prints `"items": []`.
    pub fn render_page(
        &self,
        context: Value,
        items: Vec<Value>,
        page: &PageInfo,
        mode: OutputMode,
    ) -> AppResult<String> {
        let mut envelope = match self.shape(context, mode) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let items: Vec<Value> = items
            .into_iter()
            .map(|item| self.shape(item, mode))
            .collect();
        envelope.insert("items".to_string(), Value::Array(items));
        if let Some(pagination) = page.pagination() {
            envelope.insert(
                "pagination".to_string(),
                serde_json::to_value(pagination).map_err(anyhow::Error::from)?,
            );
        }
        pretty(&Value::Object(envelope))
    }
}

fn pretty(value: &Value) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Internal(e.into()))
}

/// Single-line `{"error": "..."}` envelope for stderr.
pub fn error_envelope(err: &AppError) -> String {
    json!({ "error": err.to_string() }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truncator(max: usize, expand: ExpandMode) -> Truncator {
        Truncator::new(max, expand)
    }

    #[test]
    fn test_prune_removes_empty_values() {
        let input = json!({
            "a": 1, "b": null, "d": "", "e": "  ", "f": "hello",
            "g": [], "h": {}, "i": { "x": 1 },
            "j": { "nested": null, "keep": "ok" },
            "k": [null, "", 2, { "z": "" }, { "z": "a" }],
            "l": 0, "m": false, "n": true
        });
        assert_eq!(
            prune(input),
            json!({
                "a": 1, "f": "hello", "i": { "x": 1 }, "j": { "keep": "ok" },
                "k": [2, { "z": "a" }], "l": 0, "m": false, "n": true
            })
        );
    }

    #[test]
    fn test_prune_empty_root_is_empty_object() {
        assert_eq!(prune(json!({ "a": null, "c": "" })), json!({}));
        assert_eq!(prune(Value::Null), json!({}));
        assert_eq!(prune(json!([null])), json!([]));
    }

    #[test]
    fn test_prune_is_idempotent() {
        let inputs = [
            json!({ "a": { "b": { "c": [ {}, [], "" ] } }, "d": [[null], [1]] }),
            json!([{ "x": " " }, 0, false]),
            json!({ "keep": { "deep": [ { "v": "x" } ] } }),
        ];
        for input in inputs {
            let once = prune(input);
            assert_eq!(prune(once.clone()), once);
        }
    }

    #[test]
    fn test_truncate_at_and_under_limit_is_untouched() {
        let t = truncator(50, ExpandMode::None);
        let s = "x".repeat(50);
        assert_eq!(t.truncate(json!({ "f": s })), json!({ "f": s }));
    }

    #[test]
    fn test_truncate_over_limit_adds_length_regardless_of_expand() {
        let s = "y".repeat(60);
        let cut = format!("{}{}", "y".repeat(50), ELLIPSIS);
        let modes = [
            ExpandMode::None,
            ExpandMode::from_flags(Some("F"), false),
            ExpandMode::from_flags(None, true),
        ];
        let expected = [cut.clone(), s.clone(), s.clone()];
        for (mode, content) in modes.into_iter().zip(expected) {
            let out = truncator(50, mode).truncate(json!({ "f": s }));
            assert_eq!(out["fLength"], json!(60));
            assert_eq!(out["f"], json!(content));
        }
    }

    #[test]
    fn test_truncate_recurses_and_counts_chars() {
        let t = truncator(50, ExpandMode::None);
        let wide = "\u{00e9}".repeat(51);
        let out = t.truncate(json!({ "items": [{ "note": wide }], "n": 3 }));
        assert_eq!(out["items"][0]["noteLength"], json!(51));
        assert_eq!(out["items"][0]["note"].as_str().unwrap().chars().count(), 51);
        assert_eq!(out["n"], json!(3));
    }

    #[test]
    fn test_raw_mode_skips_truncation() {
        let shaper = OutputShaper::new(truncator(50, ExpandMode::None));
        let uri = format!("mongodb://{}", "h".repeat(80));
        let out = shaper.shape(json!({ "uri": uri, "empty": "" }), OutputMode::Raw);
        assert_eq!(out, json!({ "uri": uri }));
    }

    #[test]
    fn test_render_page_envelope() {
        let shaper = OutputShaper::new(truncator(200, ExpandMode::None));
        let empty = shaper
            .render_page(json!({ "database": "shop" }), vec![], &PageInfo::default(), OutputMode::Managed)
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&empty).unwrap(),
            json!({ "database": "shop", "items": [] })
        );

        let page = PageInfo::from_offset(10, 2, true);
        let more = shaper
            .render_page(json!({}), vec![json!({ "a": 1 }), json!({ "b": null })], &page, OutputMode::Managed)
            .unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&more).unwrap(),
            json!({
                "items": [{ "a": 1 }, {}],
                "pagination": { "hasMore": true, "nextCursor": "12" }
            })
        );
    }

    #[test]
    fn test_paginate_slices_and_reports_cursor() {
        let (page, info) = paginate(vec![1, 2, 3, 4, 5], 1, 2);
        assert_eq!(page, vec![2, 3]);
        assert_eq!(info.next_cursor.as_deref(), Some("3"));

        let (page, info) = paginate(vec![1, 2, 3], 2, 5);
        assert_eq!(page, vec![3]);
        assert!(!info.has_more);

        let (page, info) = paginate(vec![1, 2], 5, 5);
        assert!(page.is_empty());
        assert!(!info.has_more);
    }

    #[test]
    fn test_error_envelope() {
        let err = AppError::Validation("bad".into());
        assert_eq!(error_envelope(&err), r#"{"error":"bad"}"#);
    }
}
