use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const TITLE_FIELD: &str = "submission.$title";
const LEGACY_TITLE_FIELD: &str = "meta.title";
const PLAIN_TEXT_COMPONENT: &str = "TextField";

/// The host's configured submission form, reduced to what the importer reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionForm {
    #[serde(default)]
    pub structure: FormStructure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormStructure {
    #[serde(default)]
    pub children: Vec<FormField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormField {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Whether imported titles must lose their markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleFormat {
    PlainText,
    Rich,
}

impl SubmissionForm {
    /// `submission.$title`, falling back to the legacy `meta.title` field.
    pub fn title_field(&self) -> Option<&FormField> {
        let children = &self.structure.children;
        children
            .iter()
            .find(|f| f.name == TITLE_FIELD)
            .or_else(|| children.iter().find(|f| f.name == LEGACY_TITLE_FIELD))
    }

    pub fn title_format(&self) -> TitleFormat {
        match self.title_field().and_then(|f| f.component.as_deref()) {
            Some(PLAIN_TEXT_COMPONENT) => TitleFormat::PlainText,
            _ => TitleFormat::Rich,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(children: Value) -> SubmissionForm {
        serde_json::from_value(json!({"structure": {"children": children}})).unwrap()
    }

    #[test]
    fn test_text_field_title_is_plain() {
        let form = form(json!([
            {"name": "submission.$abstract", "component": "AbstractEditor"},
            {"name": "submission.$title", "component": "TextField"}
        ]));
        assert_eq!(form.title_format(), TitleFormat::PlainText);
    }

    #[test]
    fn test_rich_editor_title_is_rich() {
        let form = form(json!([{"name": "submission.$title", "component": "FullWaxField"}]));
        assert_eq!(form.title_format(), TitleFormat::Rich);
    }

    #[test]
    fn test_legacy_meta_title_is_honoured() {
        let form = form(json!([{"name": "meta.title", "component": "TextField"}]));
        assert_eq!(form.title_field().unwrap().name, "meta.title");
        assert_eq!(form.title_format(), TitleFormat::PlainText);
    }

    #[test]
    fn test_current_field_wins_over_legacy() {
        let form = form(json!([
            {"name": "meta.title", "component": "TextField"},
            {"name": "submission.$title", "component": "FullWaxField"}
        ]));
        assert_eq!(form.title_format(), TitleFormat::Rich);
    }

    #[test]
    fn test_missing_title_field_is_rich() {
        assert_eq!(SubmissionForm::default().title_format(), TitleFormat::Rich);
    }
}
