//! Viewer- and schema-aware rewriting of a normalized filter tree
//!
//! Augmentation runs once per request, after normalization and before
//! pruning. It never mutates the stored tree: every node is mapped to a new
//! [`Condition`], and a node that must be dropped becomes
//! [`Condition::Absent`].
//!
//! Rewrites performed on each node:
//!
//! - nodes without a key are dropped
//! - a `:disabled_admin` value suffix is stripped; for admins the node is dropped
//! - merge tags in the value are resolved (`{user:ID}`, `{form_id}`, ...)
//! - date properties resolve relative expressions (`-7 days`, `yesterday`)
//! - `created_by` symbolic values resolve to the viewer (or the lock filter)
//! - `created_by_user_role` resolves to the ids of users holding the role
//! - field-type preparation: `entry_id`, `date` fields, post categories,
//!   `workflow_timestamp`, multi-file uploads

use crate::filter::merge_tags::resolve_merge_tags;
use crate::filter::tree::{lock_filter, Condition, FilterGroup, FilterNode, NodeValue, Operator};
use crate::models::{is_date_property, Field, FieldType, Form, ViewerContext};
use crate::utils::date::{resolve_date_value, DateFormat};
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};

/// Suffix marking a condition that admins bypass
pub const DISABLED_ADMIN_SUFFIX: &str = ":disabled_admin";

/// Meta key of the workflow status timestamp (stored as a Unix epoch)
pub const WORKFLOW_TIMESTAMP_KEY: &str = "workflow_timestamp";

/// Symbolic `created_by_user_role` value: any role of the viewer
pub const CURRENT_USER_ROLE: &str = "current_user";

/// User and taxonomy lookups needed while augmenting
pub trait Directory {
    /// Ids of users holding any of `roles`
    fn user_ids_with_roles(&self, roles: &[String]) -> Result<Vec<i64>>;

    /// Name of a taxonomy term
    fn term_name(&self, term_id: i64) -> Result<Option<String>>;
}

/// Everything augmentation reads besides the tree itself
pub struct AugmentContext<'a> {
    /// Primary form first, then joined forms
    pub forms: &'a [Form],
    pub viewer: &'a ViewerContext,
    pub directory: &'a dyn Directory,
    pub admin_capabilities: &'a [String],
    pub utc_offset: FixedOffset,
    pub now: DateTime<Utc>,
}

impl AugmentContext<'_> {
    fn primary_form(&self) -> Option<&Form> {
        self.forms.first()
    }

    fn viewer_is_admin(&self) -> bool {
        self.viewer.has_any_capability(self.admin_capabilities)
    }

    /// Field a key names, in the node's form when it has one
    fn field_for(&self, key: &str, form_id: Option<i64>) -> Option<&Field> {
        match form_id {
            Some(id) => self.forms.iter().find(|f| f.id == id)?.field(key),
            None => self.forms.iter().find_map(|f| f.field(key)),
        }
    }

    fn resolve_date(&self, expr: &str, format: DateFormat) -> String {
        resolve_date_value(expr, format, self.now, self.utc_offset)
    }
}

/// Rewrite a tree for the current viewer and forms
pub fn augment(condition: Condition, ctx: &AugmentContext) -> Result<Condition> {
    match condition {
        Condition::Absent => Ok(Condition::Absent),
        Condition::Group(group) => {
            let conditions = group
                .conditions
                .into_iter()
                .map(|c| augment(c, ctx))
                .collect::<Result<Vec<_>>>()?;
            Ok(Condition::Group(FilterGroup { conditions, ..group }))
        }
        Condition::Node(node) => augment_node(node, ctx),
    }
}

fn augment_node(mut node: FilterNode, ctx: &AugmentContext) -> Result<Condition> {
    let Some(key) = node.key.clone() else {
        return Ok(Condition::Absent);
    };

    if let NodeValue::Text(value) = &node.value {
        if !value.is_empty() {
            let (stripped, disabled_for_admin) = match value.strip_suffix(DISABLED_ADMIN_SUFFIX) {
                Some(rest) => (rest, true),
                None => (value.as_str(), false),
            };
            let today = ctx.now.with_timezone(&ctx.utc_offset).date_naive();
            let resolved = resolve_merge_tags(stripped, ctx.primary_form(), ctx.viewer, today);
            if disabled_for_admin && ctx.viewer_is_admin() {
                log::debug!("Condition on '{}' bypassed for admin viewer", key);
                return Ok(Condition::Absent);
            }
            node.value = NodeValue::Text(resolved);
        }
    }

    match key.as_str() {
        k if is_date_property(k) => {
            prepare_date(&mut node, ctx, DateFormat::Sql);
            Ok(Condition::Node(node))
        }
        "created_by" => Ok(resolve_created_by(node, ctx)),
        "created_by_user_role" => resolve_user_role(node, ctx),
        _ => {
            prepare_field_value(&mut node, &key, ctx)?;
            Ok(Condition::Node(node))
        }
    }
}

/// Resolve a date expression in place; virtual operators and empty values are left alone
fn prepare_date(node: &mut FilterNode, ctx: &AugmentContext, format: DateFormat) {
    if node.operator.is_virtual() {
        return;
    }
    if let NodeValue::Text(value) = &node.value {
        if !value.is_empty() {
            node.value = NodeValue::Text(ctx.resolve_date(value, format));
        }
    }
}

fn viewer_id_condition(mut node: FilterNode, viewer: &ViewerContext) -> Condition {
    match viewer.user_id {
        Some(id) => {
            node.value = NodeValue::Text(id.to_string());
            Condition::Node(node)
        }
        None => lock_filter(),
    }
}

fn resolve_created_by(node: FilterNode, ctx: &AugmentContext) -> Condition {
    if node.operator.is_virtual() {
        return Condition::Node(node);
    }
    match node.value.as_text() {
        Some("created_by") => viewer_id_condition(node, ctx.viewer),
        Some("created_by_or_admin") => {
            if ctx.viewer_is_admin() {
                Condition::Absent
            } else {
                viewer_id_condition(node, ctx.viewer)
            }
        }
        Some("") => lock_filter(),
        _ => Condition::Node(node),
    }
}

fn resolve_user_role(mut node: FilterNode, ctx: &AugmentContext) -> Result<Condition> {
    let roles = match node.value.as_text() {
        Some(CURRENT_USER_ROLE) => ctx.viewer.roles.clone(),
        _ => node.value.items().into_iter().map(str::to_string).collect(),
    };
    let negative = node.operator == Operator::IsNot;
    let mut ids = ctx.directory.user_ids_with_roles(&roles)?;

    node.key = Some("created_by".to_string());
    Ok(match ids.len() {
        0 if negative => Condition::Absent,
        0 => lock_filter(),
        1 => {
            node.value = NodeValue::Text(ids.remove(0).to_string());
            Condition::Node(node)
        }
        _ => {
            node.operator = if negative { Operator::NotIn } else { Operator::In };
            node.value = NodeValue::List(ids.into_iter().map(|id| id.to_string()).collect());
            Condition::Node(node)
        }
    })
}

fn prepare_field_value(node: &mut FilterNode, key: &str, ctx: &AugmentContext) -> Result<()> {
    match key {
        "entry_id" => {
            node.key = Some("id".to_string());
            return Ok(());
        }
        WORKFLOW_TIMESTAMP_KEY => {
            prepare_date(node, ctx, DateFormat::Unix);
            return Ok(());
        }
        _ => {}
    }

    let Some(field) = ctx.field_for(key, node.form_id) else {
        return Ok(());
    };

    match &field.field_type {
        FieldType::Date => prepare_date(node, ctx, DateFormat::Local),
        FieldType::PostCategory => {
            if let Some(term_id) = node.value.as_text().and_then(|v| v.trim().parse::<i64>().ok()) {
                if let Some(name) = ctx.directory.term_name(term_id)? {
                    node.value = NodeValue::Text(format!("{}:{}", name, term_id));
                }
            }
        }
        FieldType::Fileupload if field.multiple_files => {
            if let Some(target) = node.operator.proxy_target() {
                node.operator = target;
                node.value = NodeValue::text("[]");
            }
        }
        _ => {}
    }
    Ok(())
}
