use lazy_static::lazy_static;
use regex::Regex;

use crate::core::{DbError, Result};

lazy_static! {
    static ref SELECT_RE: Regex = Regex::new(
        r#"(?is)^\s*select\s+(?P<columns>.+?)\s+from\s+"(?P<table>[^"]+)"\s+where\s+"(?P<key>[^"]+)"\s*=\s*(?P<param>\S+?)\s*;?\s*$"#
    )
    .expect("select pattern is valid");
    static ref INSERT_RE: Regex = Regex::new(
        r#"(?is)^\s*insert\s+into\s+"(?P<table>[^"]+)"\s*\((?P<columns>[^)]*)\)\s*values\s*\((?P<params>[^)]*)\)\s*;?\s*$"#
    )
    .expect("insert pattern is valid");
    static ref COLUMN_RE: Regex =
        Regex::new(r#"(?i)^(?P<source>"[^"]+"|[^\s"]+)(?:\s+as\s+"(?P<alias>[^"]+)")?$"#)
            .expect("column pattern is valid");
    static ref PARAM_RE: Regex =
        Regex::new(r#"^[^\w\s",()]+(?P<name>\w+)$"#).expect("parameter pattern is valid");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Column {
    pub source: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Select {
    pub columns: Vec<Column>,
    pub table: String,
    pub key: String,
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Insert {
    pub table: String,
    pub columns: Vec<String>,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Statement {
    Select(Select),
    Insert(Insert),
}

impl Statement {
    pub fn parse(sql: &str) -> Result<Self> {
        if let Some(caps) = SELECT_RE.captures(sql) {
            let columns = split_list(&caps["columns"])
                .map(parse_column)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Select(Select {
                columns,
                table: caps["table"].to_string(),
                key: caps["key"].to_string(),
                parameter: parse_parameter(&caps["param"])?,
            }));
        }

        if let Some(caps) = INSERT_RE.captures(sql) {
            let columns = split_list(&caps["columns"])
                .map(|item| parse_column(item).map(|column| column.source))
                .collect::<Result<Vec<_>>>()?;
            let parameters = split_list(&caps["params"])
                .map(parse_parameter)
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::Insert(Insert {
                table: caps["table"].to_string(),
                columns,
                parameters,
            }));
        }

        Err(DbError::UnsupportedOperation(format!(
            "statement not recognised: {}",
            sql
        )))
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim)
}

fn parse_column(item: &str) -> Result<Column> {
    let caps = COLUMN_RE
        .captures(item)
        .ok_or_else(|| DbError::UnsupportedOperation(format!("column expression '{}'", item)))?;

    let source = unquote(&caps["source"]).to_string();
    let label = caps
        .name("alias")
        .map(|alias| alias.as_str().to_string())
        .unwrap_or_else(|| source.clone());

    Ok(Column { source, label })
}

fn parse_parameter(item: &str) -> Result<String> {
    PARAM_RE
        .captures(item.trim())
        .map(|caps| caps["name"].to_string())
        .ok_or_else(|| DbError::UnsupportedOperation(format!("parameter placeholder '{}'", item)))
}

fn unquote(identifier: &str) -> &str {
    identifier
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(identifier)
}
