use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::archetype::{Archetype, CleanupRule, ExtraField};
use crate::error::{Result, StatsError};

/// Sub-mode name -> field name -> raw cell text.
pub type StatTable = BTreeMap<String, BTreeMap<String, String>>;

const OVERALL: &str = "Overall";
const LEVEL_FIELD: &str = "Level";
const LEVEL_PREFIX: &str = "Level:";

fn selector(css: &str, category: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|err| StatsError::malformed(category, format!("bad selector {css}: {err}")))
}

pub fn parse_stat_table(document: &str, archetype: &Archetype) -> Result<StatTable> {
    let category = archetype.category;
    let html = Html::parse_document(document);
    let panel_selector = selector(&format!("div#{}", archetype.panel_id()), category)?;
    let container = html.select(&panel_selector).next().ok_or_else(|| {
        StatsError::malformed(category, format!("no #{} container", archetype.panel_id()))
    })?;

    let rows = extract_rows(&container, category)?;
    let rows = apply_cleanup(rows, archetype.cleanup);
    let mut table = key_rows(&rows)
        .ok_or_else(|| StatsError::malformed(category, "stat table has no header row"))?;

    match archetype.extra {
        ExtraField::None => {}
        ExtraField::BadgeLevel => {
            let level = badge_level(&container, category)?.unwrap_or_else(|| "0".to_string());
            table
                .entry(OVERALL.to_string())
                .or_default()
                .insert(LEVEL_FIELD.to_string(), level);
        }
    }

    debug!(category, sub_modes = table.len(), "parsed stat table");
    Ok(table)
}

/// Non-blank text of every `tr` under the panel's first table. Empty rows are skipped.
fn extract_rows(container: &ElementRef, category: &str) -> Result<Vec<Vec<String>>> {
    let table_selector = selector("table", category)?;
    let row_selector = selector("tr", category)?;
    let table = container
        .select(&table_selector)
        .next()
        .ok_or_else(|| StatsError::malformed(category, "panel has no table"))?;

    Ok(table
        .select(&row_selector)
        .map(|row| {
            row.text()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect())
}

fn apply_cleanup(mut rows: Vec<Vec<String>>, rule: CleanupRule) -> Vec<Vec<String>> {
    match rule {
        CleanupRule::None => rows,
        CleanupRule::DropLeadingRow => {
            if !rows.is_empty() {
                rows.remove(0);
            }
            rows
        }
    }
}

/// First row is the header; every other row is keyed by its first cell.
/// A field seen twice in one row lands under `Final <field>` the second time.
pub fn key_rows(rows: &[Vec<String>]) -> Option<StatTable> {
    let (header, body) = rows.split_first()?;
    let mut table = StatTable::new();
    for row in body {
        let mut cells = header.iter().zip(row.iter());
        let Some((_, sub_mode)) = cells.next() else {
            continue;
        };
        let mut current = BTreeMap::new();
        for (field, value) in cells {
            if current.contains_key(field) {
                current.insert(format!("Final {field}"), value.clone());
            } else {
                current.insert(field.clone(), value.clone());
            }
        }
        table.insert(sub_mode.clone(), current);
    }
    Some(table)
}

fn badge_level(container: &ElementRef, category: &str) -> Result<Option<String>> {
    let item_selector = selector("ul.list-unstyled > li", category)?;
    for item in container.select(&item_selector) {
        let text = item.text().collect::<String>();
        let Some(rest) = text.trim().strip_prefix(LEVEL_PREFIX) else {
            continue;
        };
        let value = rest.trim();
        if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit() || c == ',') {
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}
