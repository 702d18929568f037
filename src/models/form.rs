use serde::{Deserialize, Serialize};

/// Field type (closed set with a fallback for types this crate does not know)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Name,
    Address,
    Number,
    Total,
    Date,
    Select,
    Radio,
    Checkbox,
    Multiselect,
    Fileupload,
    PostCategory,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Name => "name",
            FieldType::Address => "address",
            FieldType::Number => "number",
            FieldType::Total => "total",
            FieldType::Date => "date",
            FieldType::Select => "select",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Multiselect => "multiselect",
            FieldType::Fileupload => "fileupload",
            FieldType::PostCategory => "post_category",
            FieldType::Other(name) => name.as_str(),
        }
    }

    /// Types whose stored value the query engine compares as a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Total)
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "email" => FieldType::Email,
            "name" => FieldType::Name,
            "address" => FieldType::Address,
            "number" => FieldType::Number,
            "total" => FieldType::Total,
            "date" => FieldType::Date,
            "select" => FieldType::Select,
            "radio" => FieldType::Radio,
            "checkbox" => FieldType::Checkbox,
            "multiselect" => FieldType::Multiselect,
            "fileupload" => FieldType::Fileupload,
            "post_category" => FieldType::PostCategory,
            _ => FieldType::Other(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

/// Sub-input of a multi-part field (e.g. "3.2" for a name field's last name)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInput {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// Discrete choice of a select/radio/checkbox field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    #[serde(default)]
    pub value: String,
}

impl Choice {
    /// Stored value of the choice; falls back to the label when no value is set
    pub fn stored_value(&self) -> &str {
        if self.value.is_empty() {
            &self.text
        } else {
            &self.value
        }
    }
}

/// Form field schema entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: i64,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub inputs: Vec<FieldInput>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, rename = "multipleFiles")]
    pub multiple_files: bool,
}

impl Field {
    pub fn new(id: i64, label: &str, field_type: FieldType) -> Self {
        Self {
            id,
            label: label.to_string(),
            field_type,
            inputs: Vec::new(),
            choices: Vec::new(),
            multiple_files: false,
        }
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices
            .iter()
            .map(|c| Choice { text: c.to_string(), value: c.to_string() })
            .collect();
        self
    }

    /// Add one sub-input per choice ("<id>.1", "<id>.2", ...), as checkbox fields store them
    pub fn with_choice_inputs(mut self) -> Self {
        self.inputs = self
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| FieldInput {
                id: format!("{}.{}", self.id, i + 1),
                label: c.text.clone(),
            })
            .collect();
        self
    }

    pub fn is_date(&self) -> bool {
        self.field_type == FieldType::Date
    }
}

/// A form: the record source whose schema filter keys resolve against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Form {
    pub fn new(id: i64, title: &str) -> Self {
        Self { id, title: title.to_string(), fields: Vec::new() }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up the field a key refers to; "3.2" resolves to field 3
    pub fn field(&self, key: &str) -> Option<&Field> {
        let base = key.split('.').next()?;
        let id: i64 = base.parse().ok()?;
        self.fields.iter().find(|f| f.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_conversion() {
        assert_eq!(FieldType::from("post_category".to_string()), FieldType::PostCategory);
        assert_eq!(FieldType::from("signature".to_string()), FieldType::Other("signature".to_string()));
        assert_eq!(FieldType::Other("signature".to_string()).as_str(), "signature");
        assert!(FieldType::Total.is_numeric());
        assert!(!FieldType::Text.is_numeric());
    }

    #[test]
    fn test_form_field_lookup_by_sub_input() {
        let form = Form::new(1, "Contact")
            .with_field(Field::new(3, "Name", FieldType::Name))
            .with_field(Field::new(31, "Notes", FieldType::Textarea));
        assert_eq!(form.field("3.2").map(|f| f.id), Some(3));
        assert_eq!(form.field("31").map(|f| f.id), Some(31));
        assert!(form.field("4").is_none());
        assert!(form.field("date_created").is_none());
    }

    #[test]
    fn test_form_deserializes_from_json() {
        let json = r#"{"id": 2, "title": "Order", "fields": [
            {"id": 1, "label": "Files", "type": "fileupload", "multipleFiles": true},
            {"id": 2, "label": "Colors", "type": "checkbox",
             "choices": [{"text": "Red", "value": "red"}],
             "inputs": [{"id": "2.1", "label": "Red"}]}
        ]}"#;
        let form: Form = serde_json::from_str(json).unwrap();
        assert!(form.fields[0].multiple_files);
        assert_eq!(form.fields[1].field_type, FieldType::Checkbox);
        assert_eq!(form.fields[1].choices[0].stored_value(), "red");
    }

    #[test]
    fn test_choice_inputs_follow_choice_order() {
        let field = Field::new(5, "Colors", FieldType::Checkbox)
            .with_choices(&["Red", "Blue"])
            .with_choice_inputs();
        assert_eq!(field.inputs[1].id, "5.2");
    }
}
