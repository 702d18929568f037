//! Entry points used by the host: view query filtering and field visibility
//!
//! Both run the same stages: normalize → augment → prune, then either
//! compile (query) or evaluate (one entry).

use crate::config::Config;
use crate::error::FilterError;
use crate::filter::augment::{augment, AugmentContext};
use crate::filter::compile::compile;
use crate::filter::evaluate::evaluate;
use crate::filter::normalize::{normalize, normalize_str};
use crate::filter::prune::prune;
use crate::filter::tree::Condition;
use crate::models::{Entry, Form, ViewerContext};
use crate::query::EntryQuery;
use crate::repo::{FormRepo, SqliteDirectory, ViewRepo};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

/// Augment and prune a normalized tree for the current request
pub fn prepare_tree(tree: Condition, ctx: &AugmentContext) -> Result<Condition, FilterError> {
    if tree.is_absent() {
        return Ok(Condition::Absent);
    }
    let tree = prune(augment(tree, ctx)?);
    log::debug!("Prepared filter tree: {}", tree.to_json());
    Ok(tree)
}

/// Primary form of a view followed by its joined forms
pub fn load_view_forms(conn: &Connection, form_id: i64, joined_form_ids: &[i64]) -> Result<Vec<Form>, FilterError> {
    let primary = FormRepo::get_by_id(conn, form_id)?.ok_or(FilterError::FormNotFound(form_id))?;
    let mut forms = vec![primary];
    for id in joined_form_ids {
        match FormRepo::get_by_id(conn, *id)? {
            Some(form) => forms.push(form),
            None => log::warn!("Joined form {} no longer exists; skipped", id),
        }
    }
    Ok(forms)
}

/// Merge a view's stored filters into an entry query (logical AND with
/// whatever the query already has). Views without filters leave it untouched.
pub fn apply_view_filter(
    conn: &Connection,
    query: &mut EntryQuery,
    view_id: i64,
    viewer: &ViewerContext,
    config: &Config,
) -> Result<(), FilterError> {
    let view = ViewRepo::get_by_id(conn, view_id)?.ok_or(FilterError::ViewNotFound(view_id))?;
    let Some(raw) = view.filters.as_deref() else {
        return Ok(());
    };
    let tree = normalize_str(raw);
    if tree.is_absent() {
        return Ok(());
    }

    let forms = load_view_forms(conn, view.form_id, &view.joined_form_ids)?;
    let directory = SqliteDirectory::new(conn);
    let ctx = AugmentContext {
        forms: &forms,
        viewer,
        directory: &directory,
        admin_capabilities: &config.admin_capabilities,
        utc_offset: config.utc_offset,
        now: chrono::Utc::now(),
    };

    let tree = prepare_tree(tree, &ctx)?;
    if tree.is_absent() {
        log::debug!("View {} filters reduced to nothing for this viewer", view_id);
        return Ok(());
    }

    if let Some(condition) = compile(&tree, &forms) {
        query.and_where(condition);
    }
    Ok(())
}

/// Result of the field-visibility check
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutput {
    Show,
    /// Hide the field and output this text instead (substituted by the host)
    Fallback(String),
}

#[derive(Debug, Default, Deserialize)]
struct FieldLogicConfig {
    #[serde(default)]
    conditional_logic: Value,
    #[serde(default)]
    conditional_logic_fallback: Option<String>,
}

/// Decide whether a field is shown for `entry`, given the field's stored
/// settings `{"conditional_logic": <filters>, "conditional_logic_fallback": "..."}`.
/// Settings that cannot be read show the field.
pub fn field_visibility(
    entry: &Entry,
    form: &Form,
    field_config: &str,
    ctx: &AugmentContext,
) -> Result<FieldOutput, FilterError> {
    let config: FieldLogicConfig = match serde_json::from_str(field_config) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Field conditional logic settings are not valid JSON ({}); field shown", e);
            return Ok(FieldOutput::Show);
        }
    };

    // The filters may themselves be stored as encoded JSON text
    let tree = match &config.conditional_logic {
        Value::String(encoded) => normalize_str(encoded),
        other => normalize(other),
    };
    if tree.is_absent() {
        return Ok(FieldOutput::Show);
    }

    let tree = prepare_tree(tree, ctx)?;
    if evaluate(&tree, entry, form) {
        Ok(FieldOutput::Show)
    } else {
        Ok(FieldOutput::Fallback(config.conditional_logic_fallback.unwrap_or_default()))
    }
}
