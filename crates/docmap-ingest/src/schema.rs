//! Structural validation of a docmap index payload.
//!
//! The validator walks the raw JSON and records every violation it finds
//! rather than stopping at the first, so one failed run reports the whole
//! damage. Only a payload with zero violations is handed to the typed model.

use std::fmt;

use chrono::DateTime;
use docmap_ingest_core::DocmapIndex;
use serde_json::{Map, Value};
use url::Url;

use crate::error::{ImportError, Result};

const DOCMAP_KEYS: &[&str] = &[
    "@context",
    "type",
    "id",
    "created",
    "updated",
    "publisher",
    "first-step",
    "steps",
];
const STEP_KEYS: &[&str] = &["actions", "assertions", "inputs", "next-step", "previous-step"];
const ACTION_KEYS: &[&str] = &["participants", "outputs"];
const PARTICIPANT_KEYS: &[&str] = &["actor", "role"];
const AFFILIATION_KEYS: &[&str] = &["type", "name", "location"];
const OUTPUT_KEYS: &[&str] = &[
    "type",
    "identifier",
    "doi",
    "versionIdentifier",
    "license",
    "content",
];
const CONTENT_KEYS: &[&str] = &["type", "url"];
const ASSERTION_KEYS: &[&str] = &["item", "status", "happened"];
const INPUT_KEYS: &[&str] = &["type", "doi"];

const DOCMAP_TYPES: &[&str] = &["docmap"];
const ITEM_TYPES: &[&str] = &["preprint"];
const OUTPUT_TYPES: &[&str] = &["preprint", "evaluation-summary", "review-article"];
const CONTENT_TYPES: &[&str] = &["web-page"];
const ASSERTION_STATUSES: &[&str] = &["under-review", "draft", "peer-reviewed", "revised"];
const PARTICIPANT_ROLES: &[&str] = &["editor", "senior-editor", "peer-reviewer"];
const ACTOR_TYPES: &[&str] = &["person"];

/// One schema violation, located by a JSON-pointer-style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Validate a raw index payload, returning it unchanged when it conforms.
pub fn validate(value: Value) -> Result<Value> {
    let violations = collect_violations(&value);
    if violations.is_empty() {
        Ok(value)
    } else {
        Err(ImportError::SchemaValidation(violations))
    }
}

/// Validate, then decode into the typed docmap model.
pub fn parse_index(value: Value) -> Result<DocmapIndex> {
    let value = validate(value)?;
    serde_json::from_value(value).map_err(|e| ImportError::Parse(e.to_string()))
}

pub fn collect_violations(value: &Value) -> Vec<Violation> {
    let mut validator = Validator::default();
    validator.index(value);
    validator.violations
}

#[derive(Default)]
struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    fn report(&mut self, path: &str, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.to_string(),
            message: message.into(),
        });
    }

    fn index(&mut self, value: &Value) {
        let Some(root) = self.object("", value) else {
            return;
        };
        match root.get("docmaps") {
            Some(Value::Array(docmaps)) => {
                for (i, docmap) in docmaps.iter().enumerate() {
                    self.docmap(&format!("/docmaps/{i}"), docmap);
                }
            }
            Some(_) => self.report("/docmaps", "must be an array"),
            None => self.report("", "missing required property `docmaps`"),
        }
    }

    fn docmap(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, DOCMAP_KEYS);
        self.require(path, map, &["id", "created", "first-step", "steps"]);

        self.uri_field(path, map, "@context");
        self.enum_field(path, map, "type", DOCMAP_TYPES);
        self.string_field(path, map, "id");
        self.date_time_field(path, map, "created");
        self.date_time_field(path, map, "updated");
        self.string_field(path, map, "first-step");
        if let Some(publisher) = map.get("publisher") {
            self.publisher(&format!("{path}/publisher"), publisher);
        }

        let steps_path = format!("{path}/steps");
        let Some(steps) = map.get("steps").and_then(|s| self.object(&steps_path, s)) else {
            return;
        };
        for (id, step) in steps {
            self.step(&format!("{steps_path}/{id}"), step);
        }
        self.links(path, map, steps);
    }

    /// Every step named by `first-step`, `next-step` or `previous-step` must exist.
    fn links(&mut self, path: &str, docmap: &Map<String, Value>, steps: &Map<String, Value>) {
        if let Some(first) = docmap.get("first-step").and_then(Value::as_str)
            && !steps.contains_key(first)
        {
            self.report(
                &format!("{path}/first-step"),
                format!("references unknown step `{first}`"),
            );
        }

        for (id, step) in steps {
            for link in ["next-step", "previous-step"] {
                if let Some(target) = step.get(link).and_then(Value::as_str)
                    && !steps.contains_key(target)
                {
                    self.report(
                        &format!("{path}/steps/{id}/{link}"),
                        format!("references unknown step `{target}`"),
                    );
                }
            }
        }
    }

    fn publisher(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        if let Some(account) = map.get("account") {
            let account_path = format!("{path}/account");
            if let Some(account) = self.object(&account_path, account) {
                self.uri_field(&account_path, account, "id");
                self.uri_field(&account_path, account, "service");
            }
        }
        for key in ["homepage", "id", "logo"] {
            self.uri_field(path, map, key);
        }
        self.string_field(path, map, "name");
    }

    fn step(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, STEP_KEYS);
        self.require(path, map, &["actions", "assertions", "inputs"]);
        self.string_field(path, map, "next-step");
        self.string_field(path, map, "previous-step");

        self.each(path, map, "actions", Self::action);
        self.each(path, map, "assertions", Self::assertion);
        self.each(path, map, "inputs", Self::input);
    }

    fn action(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, ACTION_KEYS);
        self.require(path, map, &["participants", "outputs"]);
        self.each(path, map, "participants", Self::participant);
        self.each(path, map, "outputs", Self::output);
    }

    fn participant(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, PARTICIPANT_KEYS);
        self.require(path, map, &["role"]);
        self.enum_field(path, map, "role", PARTICIPANT_ROLES);

        let Some(actor) = map.get("actor") else {
            return;
        };
        let actor_path = format!("{path}/actor");
        let Some(actor) = self.object(&actor_path, actor) else {
            return;
        };
        self.enum_field(&actor_path, actor, "type", ACTOR_TYPES);
        for key in ["name", "firstName", "surname", "_relatesToOrganization"] {
            self.string_field(&actor_path, actor, key);
        }
        if let Some(affiliation) = actor.get("affiliation") {
            let aff_path = format!("{actor_path}/affiliation");
            if let Some(aff) = self.object(&aff_path, affiliation) {
                self.allow_only(&aff_path, aff, AFFILIATION_KEYS);
                for key in AFFILIATION_KEYS {
                    self.string_field(&aff_path, aff, key);
                }
            }
        }
    }

    fn output(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, OUTPUT_KEYS);
        self.require(path, map, &["type"]);
        self.enum_field(path, map, "type", OUTPUT_TYPES);
        for key in ["identifier", "doi", "versionIdentifier"] {
            self.string_field(path, map, key);
        }
        self.uri_field(path, map, "license");
        self.each(path, map, "content", Self::content);
    }

    fn content(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, CONTENT_KEYS);
        self.require(path, map, &["url"]);
        self.enum_field(path, map, "type", CONTENT_TYPES);
        self.uri_field(path, map, "url");
    }

    fn assertion(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, ASSERTION_KEYS);
        self.require(path, map, &["item", "status"]);
        self.enum_field(path, map, "status", ASSERTION_STATUSES);
        self.date_time_field(path, map, "happened");

        if let Some(item) = map.get("item") {
            let item_path = format!("{path}/item");
            if let Some(item) = self.object(&item_path, item) {
                self.require(&item_path, item, &["type", "doi"]);
                self.enum_field(&item_path, item, "type", ITEM_TYPES);
                self.string_field(&item_path, item, "doi");
            }
        }
    }

    fn input(&mut self, path: &str, value: &Value) {
        let Some(map) = self.object(path, value) else {
            return;
        };
        self.allow_only(path, map, INPUT_KEYS);
        self.require(path, map, &["type", "doi"]);
        self.enum_field(path, map, "type", ITEM_TYPES);
        self.string_field(path, map, "doi");
    }

    // ─── helpers ─────────────────────────────────────────────────────────────

    fn object<'v>(&mut self, path: &str, value: &'v Value) -> Option<&'v Map<String, Value>> {
        let map = value.as_object();
        if map.is_none() {
            self.report(path, "must be an object");
        }
        map
    }

    fn allow_only(&mut self, path: &str, map: &Map<String, Value>, allowed: &[&str]) {
        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                self.report(path, format!("unexpected property `{key}`"));
            }
        }
    }

    fn require(&mut self, path: &str, map: &Map<String, Value>, required: &[&str]) {
        for key in required {
            if !map.contains_key(*key) {
                self.report(path, format!("missing required property `{key}`"));
            }
        }
    }

    fn each(
        &mut self,
        path: &str,
        map: &Map<String, Value>,
        key: &str,
        check: fn(&mut Self, &str, &Value),
    ) {
        match map.get(key) {
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    check(self, &format!("{path}/{key}/{i}"), item);
                }
            }
            Some(_) => self.report(&format!("{path}/{key}"), "must be an array"),
            None => {}
        }
    }

    fn string_field<'v>(
        &mut self,
        path: &str,
        map: &'v Map<String, Value>,
        key: &str,
    ) -> Option<&'v str> {
        match map.get(key) {
            Some(Value::String(s)) => Some(s),
            Some(_) => {
                self.report(&format!("{path}/{key}"), "must be a string");
                None
            }
            None => None,
        }
    }

    fn enum_field(&mut self, path: &str, map: &Map<String, Value>, key: &str, allowed: &[&str]) {
        if let Some(value) = self.string_field(path, map, key)
            && !allowed.contains(&value)
        {
            self.report(
                &format!("{path}/{key}"),
                format!("`{value}` is not one of {}", allowed.join(", ")),
            );
        }
    }

    fn date_time_field(&mut self, path: &str, map: &Map<String, Value>, key: &str) {
        if let Some(value) = self.string_field(path, map, key)
            && DateTime::parse_from_rfc3339(value).is_err()
        {
            self.report(
                &format!("{path}/{key}"),
                format!("`{value}` is not an RFC 3339 date-time"),
            );
        }
    }

    fn uri_field(&mut self, path: &str, map: &Map<String, Value>, key: &str) {
        if let Some(value) = self.string_field(path, map, key)
            && !is_uri_reference(value)
        {
            self.report(
                &format!("{path}/{key}"),
                format!("`{value}` is not a URI reference"),
            );
        }
    }
}

/// Absolute URIs must parse; relative references only need to be free of
/// whitespace and control characters.
fn is_uri_reference(value: &str) -> bool {
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    match Url::parse(value) {
        Ok(_) => true,
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_index() -> Value {
        json!({
            "docmaps": [{
                "type": "docmap",
                "id": "https://example.org/docmaps/84154",
                "created": "2023-02-10T09:00:00Z",
                "publisher": {"name": "eLife", "homepage": "https://elifesciences.org/"},
                "first-step": "_:b0",
                "steps": {
                    "_:b0": {
                        "inputs": [{"type": "preprint", "doi": "10.1101/2022.11.08.515698"}],
                        "actions": [{
                            "participants": [],
                            "outputs": [{"type": "preprint", "identifier": "84154", "doi": "10.7554/eLife.84154.1"}]
                        }],
                        "assertions": [{"item": {"type": "preprint", "doi": "10.1101/2022.11.08.515698"}, "status": "under-review", "happened": "2023-01-01T00:00:00Z"}],
                        "next-step": "_:b1"
                    },
                    "_:b1": {
                        "inputs": [{"type": "preprint", "doi": "10.1101/2022.11.08.515698"}],
                        "actions": [{
                            "participants": [{"role": "peer-reviewer", "actor": {"type": "person", "name": "anonymous"}}],
                            "outputs": [{"type": "review-article", "content": [{"type": "web-page", "url": "https://sciety.org/evaluations/hypothesis:abc/content"}]}]
                        }],
                        "assertions": [{"item": {"type": "preprint", "doi": "10.1101/2022.11.08.515698"}, "status": "peer-reviewed"}],
                        "previous-step": "_:b0"
                    }
                }
            }]
        })
    }

    #[test]
    fn accepts_conforming_index_unchanged() {
        let value = valid_index();
        let validated = validate(value.clone()).unwrap();
        assert_eq!(validated, value);
    }

    #[test]
    fn parses_into_typed_model() {
        let index = parse_index(valid_index()).unwrap();
        assert_eq!(index.docmaps.len(), 1);
        assert_eq!(index.docmaps[0].steps.len(), 2);
    }

    #[test]
    fn collects_every_violation() {
        let mut value = valid_index();
        let step = &mut value["docmaps"][0]["steps"]["_:b0"];
        step["assertions"][0]["status"] = json!("published");
        step["actions"][0]["outputs"][0]["type"] = json!("journal-article");
        value["docmaps"][0]["created"] = json!("yesterday");

        let violations = collect_violations(&value);
        assert_eq!(violations.len(), 3, "{violations:?}");
        assert!(violations
            .iter()
            .any(|v| v.path == "/docmaps/0/steps/_:b0/assertions/0/status"));
        assert!(violations
            .iter()
            .any(|v| v.path == "/docmaps/0/steps/_:b0/actions/0/outputs/0/type"));
        assert!(violations.iter().any(|v| v.path == "/docmaps/0/created"));

        match validate(value) {
            Err(ImportError::SchemaValidation(found)) => assert_eq!(found.len(), 3),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_required_and_unknown_properties() {
        let mut value = valid_index();
        let docmap = value["docmaps"][0].as_object_mut().unwrap();
        docmap.remove("id");
        docmap.insert("extra".to_string(), json!(true));

        let violations = collect_violations(&value);
        assert!(violations
            .iter()
            .any(|v| v.message.contains("missing required property `id`")));
        assert!(violations
            .iter()
            .any(|v| v.message.contains("unexpected property `extra`")));
    }

    #[test]
    fn rejects_dangling_step_links() {
        let mut value = valid_index();
        value["docmaps"][0]["steps"]["_:b1"]["previous-step"] = json!("_:b9");
        value["docmaps"][0]["first-step"] = json!("_:nope");

        let violations = collect_violations(&value);
        assert_eq!(violations.len(), 2, "{violations:?}");
        assert!(violations
            .iter()
            .any(|v| v.path == "/docmaps/0/steps/_:b1/previous-step"));
        assert!(violations.iter().any(|v| v.path == "/docmaps/0/first-step"));
    }

    #[test]
    fn rejects_bad_uri_reference() {
        let mut value = valid_index();
        value["docmaps"][0]["steps"]["_:b1"]["actions"][0]["outputs"][0]["content"][0]["url"] =
            json!("not a url");
        let violations = collect_violations(&value);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("URI reference"));
    }

    #[test]
    fn requires_docmaps_array() {
        assert_eq!(collect_violations(&json!({})).len(), 1);
        assert_eq!(collect_violations(&json!({"docmaps": {}})).len(), 1);
        assert_eq!(collect_violations(&json!([])).len(), 1);
        assert!(collect_violations(&json!({"docmaps": []})).is_empty());
    }

    #[test]
    fn relative_references_are_uri_references() {
        assert!(is_uri_reference("/evaluations/1"));
        assert!(is_uri_reference("https://creativecommons.org/licenses/by/4.0/"));
        assert!(!is_uri_reference("two words"));
    }
}
