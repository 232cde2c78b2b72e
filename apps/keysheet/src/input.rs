//! Input document parsing and validation.
//!
//! The document is one sheet object or an array of them. Per sheet:
//! `title.left`/`title.right`, `table.width`, and three objects keyed
//! identically — `data_headers` (whose key order defines block processing
//! order), `data`, and `margins`. Integers are accepted as JSON numbers or
//! as strings that parse completely as integers.
//!
//! serde_json's `preserve_order` feature is required here: block order is
//! the `data_headers` insertion order, nothing else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::SheetError;
use crate::layout::block::BlockSpec;

/// A fully validated sheet, ready for the block model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetDoc {
    pub title_left: String,
    pub title_right: String,
    pub table_width: usize,
    pub blocks: Vec<BlockSpec>,
}

/// Parses the whole input document into its sheets.
pub fn parse_document(text: &str) -> Result<Vec<SheetDoc>, SheetError> {
    let root: Value = serde_json::from_str(text)?;
    match root {
        Value::Array(items) => items.iter().map(parse_sheet).collect(),
        Value::Object(_) => Ok(vec![parse_sheet(&root)?]),
        _ => Err(SheetError::validation(
            "document root must be an object or an array of objects",
        )),
    }
}

fn parse_sheet(value: &Value) -> Result<SheetDoc, SheetError> {
    let sheet = as_object(value, "sheet")?;

    let title = as_object(require(sheet, "title")?, "title")?;
    let title_left = as_str(require(title, "title.left")?, "title.left")?.to_string();
    let title_right = as_str(require(title, "title.right")?, "title.right")?.to_string();

    let table = as_object(require(sheet, "table")?, "table")?;
    let width = parse_int(require(table, "table.width")?, "table.width")?;
    if width <= 0 {
        return Err(SheetError::validation(format!(
            "table.width must be a positive integer, got {width}"
        )));
    }
    let table_width = width as usize;

    let headers = as_object(require(sheet, "data_headers")?, "data_headers")?;
    let data = as_object(require(sheet, "data")?, "data")?;
    let margins = as_object(require(sheet, "margins")?, "margins")?;

    let mut blocks = Vec::with_capacity(headers.len());
    for (key, header_value) in headers {
        let header = as_str(header_value, &format!("data_headers.{key}"))?;

        let data_value = data.get(key).ok_or_else(|| {
            SheetError::validation(format!("data_headers key '{key}' is missing from data"))
        })?;
        let data_str = as_str(data_value, &format!("data.{key}"))?;

        let margin_value = margins.get(key).ok_or_else(|| {
            SheetError::validation(format!("data_headers key '{key}' is missing from margins"))
        })?;
        let margin_obj = as_object(margin_value, &format!("margins.{key}"))?;
        let margin_left = parse_margin(margin_obj, key, "left")?;
        let margin_right = parse_margin(margin_obj, key, "right")?;

        blocks.push(BlockSpec {
            key: key.clone(),
            header: header.to_string(),
            data: data_str.to_string(),
            margin_left,
            margin_right,
        });
    }

    Ok(SheetDoc {
        title_left,
        title_right,
        table_width,
        blocks,
    })
}

/// Reads an optional margin side, defaulting to 0, rejecting negatives.
fn parse_margin(obj: &Map<String, Value>, key: &str, side: &str) -> Result<usize, SheetError> {
    let Some(value) = obj.get(side) else {
        return Ok(0);
    };
    let what = format!("margins.{key}.{side}");
    let margin = parse_int(value, &what)?;
    if margin < 0 {
        return Err(SheetError::validation(format!(
            "{what} must be non-negative, got {margin}"
        )));
    }
    Ok(margin as usize)
}

/// Accepts a JSON integer or a string that parses completely as one.
fn parse_int(value: &Value, what: &str) -> Result<i64, SheetError> {
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    if let Some(s) = value.as_str() {
        return s.parse::<i64>().map_err(|_| {
            SheetError::validation(format!("{what} must be an integer, got '{s}'"))
        });
    }
    Err(SheetError::validation(format!(
        "{what} must be an integer or integer string"
    )))
}

fn require<'a>(obj: &'a Map<String, Value>, path: &str) -> Result<&'a Value, SheetError> {
    let key = path.rsplit('.').next().unwrap_or(path);
    obj.get(key)
        .ok_or_else(|| SheetError::validation(format!("missing required field '{path}'")))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, SheetError> {
    value
        .as_object()
        .ok_or_else(|| SheetError::validation(format!("{what} must be an object")))
}

fn as_str<'a>(value: &'a Value, what: &str) -> Result<&'a str, SheetError> {
    value
        .as_str()
        .ok_or_else(|| SheetError::validation(format!("{what} must be a string")))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
