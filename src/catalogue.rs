//! Field catalogue for the filter configuration UI
//!
//! Lists every key a condition can compare for one form (fields and their
//! sub-inputs, entry properties and entry meta) with the operators and
//! choices the UI offers for it. Requests are checked before anything is
//! looked up: token first, then capability, then parameters.

use crate::error::FilterError;
use crate::filter::tree::Operator;
use crate::models::{Choice, Field, FieldType, Form, ViewerContext};
use serde::Serialize;

/// Incoming catalogue request parameters
#[derive(Debug, Clone, Default)]
pub struct CatalogueRequest {
    pub form_id: Option<String>,
    pub token: Option<String>,
}

/// Authenticated session the request arrives on
#[derive(Debug, Clone)]
pub struct Session {
    /// Token the session issued; requests must echo it
    pub token: String,
    pub viewer: ViewerContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogueEntry {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub operators: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalogue {
    pub form_id: i64,
    pub fields: Vec<CatalogueEntry>,
}

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Is,
    Operator::IsNot,
    Operator::Contains,
    Operator::DoesNotContain,
    Operator::StartsWith,
    Operator::EndsWith,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];
const NUMBER_OPERATORS: &[Operator] =
    &[Operator::Is, Operator::IsNot, Operator::Gt, Operator::Lt, Operator::IsEmpty, Operator::IsNotEmpty];
const DATE_OPERATORS: &[Operator] = &[
    Operator::Is,
    Operator::IsNot,
    Operator::On,
    Operator::NotOn,
    Operator::Before,
    Operator::After,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];
const CHOICE_OPERATORS: &[Operator] =
    &[Operator::Is, Operator::IsNot, Operator::In, Operator::NotIn, Operator::IsEmpty, Operator::IsNotEmpty];
const MULTI_CHOICE_OPERATORS: &[Operator] = &[
    Operator::Is,
    Operator::IsNot,
    Operator::Contains,
    Operator::DoesNotContain,
    Operator::IsEmpty,
    Operator::IsNotEmpty,
];
const UPLOAD_OPERATORS: &[Operator] =
    &[Operator::Contains, Operator::DoesNotContain, Operator::IsEmpty, Operator::IsNotEmpty];
const EQUALITY_OPERATORS: &[Operator] = &[Operator::Is, Operator::IsNot];

const ROLES: &[&str] = &["administrator", "editor", "author", "contributor", "subscriber"];
const PAYMENT_STATUSES: &[&str] =
    &["Paid", "Processing", "Pending", "Failed", "Active", "Cancelled", "Refunded", "Voided"];

/// Build the catalogue for the requested form. `load_form` is only called
/// once the request has been authorized.
pub fn field_catalogue<F>(
    request: &CatalogueRequest,
    session: &Session,
    admin_capabilities: &[String],
    load_form: F,
) -> Result<Catalogue, FilterError>
where
    F: FnOnce(i64) -> anyhow::Result<Option<Form>>,
{
    if request.token.as_deref() != Some(session.token.as_str()) || session.token.is_empty() {
        return Err(FilterError::InvalidToken);
    }
    if !session.viewer.has_any_capability(admin_capabilities) {
        return Err(FilterError::Forbidden);
    }
    let raw_id = match request.form_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(FilterError::MissingParameter("form_id".to_string())),
    };
    let form_id: i64 = raw_id.parse().map_err(|_| FilterError::InvalidParameter {
        name: "form_id".to_string(),
        value: raw_id.to_string(),
    })?;
    let form = load_form(form_id)?.ok_or(FilterError::FormNotFound(form_id))?;

    let mut fields = Vec::new();
    for field in &form.fields {
        fields.extend(field_entries(field));
    }
    fields.extend(property_entries());

    Ok(Catalogue { form_id, fields })
}

fn entry(key: &str, label: &str, field_type: &str, operators: &[Operator], choices: Vec<Choice>) -> CatalogueEntry {
    CatalogueEntry {
        key: key.to_string(),
        label: label.to_string(),
        field_type: field_type.to_string(),
        operators: operators.iter().map(Operator::as_str).collect(),
        choices,
    }
}

fn operators_for(field_type: &FieldType) -> &'static [Operator] {
    match field_type {
        FieldType::Number | FieldType::Total => NUMBER_OPERATORS,
        FieldType::Date => DATE_OPERATORS,
        FieldType::Select | FieldType::Radio => CHOICE_OPERATORS,
        FieldType::Checkbox | FieldType::Multiselect => MULTI_CHOICE_OPERATORS,
        FieldType::Fileupload => UPLOAD_OPERATORS,
        FieldType::PostCategory => EQUALITY_OPERATORS,
        _ => TEXT_OPERATORS,
    }
}

/// The field itself, then one entry per sub-input
fn field_entries(field: &Field) -> Vec<CatalogueEntry> {
    let type_name = field.field_type.as_str();
    let mut entries = vec![entry(
        &field.id.to_string(),
        &field.label,
        type_name,
        operators_for(&field.field_type),
        field.choices.clone(),
    )];

    for (i, input) in field.inputs.iter().enumerate() {
        // Checkbox inputs hold one choice each
        let choices = match field.field_type {
            FieldType::Checkbox => field.choices.get(i).cloned().into_iter().collect(),
            _ => Vec::new(),
        };
        entries.push(entry(
            &input.id,
            &format!("{} ({})", field.label, input.label),
            type_name,
            TEXT_OPERATORS,
            choices,
        ));
    }
    entries
}

fn choice(text: &str, value: &str) -> Choice {
    Choice { text: text.to_string(), value: value.to_string() }
}

fn property_entries() -> Vec<CatalogueEntry> {
    let yes_no = || vec![choice("Yes", "1"), choice("No", "0")];
    let mut roles = vec![choice("Any Role of Current User", "current_user")];
    roles.extend(ROLES.iter().map(|r| choice(r, r)));

    vec![
        entry("0", "Any form field", "text", TEXT_OPERATORS, Vec::new()),
        entry("entry_id", "Entry ID", "number", NUMBER_OPERATORS, Vec::new()),
        entry("date_created", "Date Created", "date", DATE_OPERATORS, Vec::new()),
        entry("date_updated", "Date Updated", "date", DATE_OPERATORS, Vec::new()),
        entry(
            "created_by",
            "Created By",
            "created_by",
            EQUALITY_OPERATORS,
            vec![
                choice("Currently Logged-in User", "created_by"),
                choice("Currently Logged-in User (Disabled for Administrators)", "created_by_or_admin"),
            ],
        ),
        entry("created_by_user_role", "Created By User Role", "select", EQUALITY_OPERATORS, roles),
        entry(
            "is_approved",
            "Approval Status",
            "select",
            EQUALITY_OPERATORS,
            vec![choice("Approved", "1"), choice("Disapproved", "2"), choice("Unapproved", "3")],
        ),
        entry("is_starred", "Is Starred", "select", EQUALITY_OPERATORS, yes_no()),
        entry("is_read", "Is Read", "select", EQUALITY_OPERATORS, yes_no()),
        entry(
            "payment_status",
            "Payment Status",
            "select",
            CHOICE_OPERATORS,
            PAYMENT_STATUSES.iter().map(|s| choice(s, s)).collect(),
        ),
        entry("payment_date", "Payment Date", "date", DATE_OPERATORS, Vec::new()),
        entry("ip", "User IP", "text", TEXT_OPERATORS, Vec::new()),
        entry("source_url", "Source URL", "text", TEXT_OPERATORS, Vec::new()),
    ]
}
