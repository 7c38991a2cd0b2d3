use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Payload served by the docmap index endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocmapIndex {
    #[serde(default)]
    pub docmaps: Vec<Docmap>,
}

/// One preprint's publication lifecycle as a chain of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Docmap {
    pub id: String,

    pub created: DateTime<FixedOffset>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<FixedOffset>>,

    #[serde(rename = "first-step")]
    pub first_step: String,

    pub steps: Steps,

    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<Value>,
}

/// Steps keyed by id, in the order the docmap declares them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Steps(Vec<(String, Step)>);

impl Steps {
    pub fn new(steps: Vec<(String, Step)>) -> Self {
        Self(steps)
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.0
            .iter()
            .find_map(|(key, step)| (key == id).then_some(step))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Step)> {
        self.0.iter().map(|(key, step)| (key.as_str(), step))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Steps {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, step) in &self.0 {
            map.serialize_entry(key, step)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Steps {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StepsVisitor;

        impl<'de> Visitor<'de> for StepsVisitor {
            type Value = Steps;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of step id to step")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Steps, A::Error> {
                let mut steps = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, step)) = access.next_entry::<String, Step>()? {
                    steps.push((key, step));
                }
                Ok(Steps(steps))
            }
        }

        deserializer.deserialize_map(StepsVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub inputs: Vec<Input>,

    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub assertions: Vec<Assertion>,

    #[serde(rename = "next-step", default, skip_serializing_if = "Option::is_none")]
    pub next_step: Option<String>,

    #[serde(rename = "previous-step", default, skip_serializing_if = "Option::is_none")]
    pub previous_step: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemType {
    Preprint,
}

/// External work a step operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub doi: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionStatus {
    UnderReview,
    Draft,
    PeerReviewed,
    Revised,
}

impl fmt::Display for AssertionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnderReview => "under-review",
            Self::Draft => "draft",
            Self::PeerReviewed => "peer-reviewed",
            Self::Revised => "revised",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionItem {
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub doi: String,
}

/// Claim about the state of the work at this step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub item: AssertionItem,
    pub status: AssertionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub happened: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantRole {
    Editor,
    SeniorEditor,
    PeerReviewer,
}

/// Editors and reviewers are carried through but never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Value>,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    Preprint,
    EvaluationSummary,
    ReviewArticle,
}

impl OutputType {
    /// Review-bearing outputs: their content links point at review text.
    pub fn is_review(self) -> bool {
        matches!(self, Self::EvaluationSummary | Self::ReviewArticle)
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Preprint => "preprint",
            Self::EvaluationSummary => "evaluation-summary",
            Self::ReviewArticle => "review-article",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "type")]
    pub kind: OutputType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(rename = "versionIdentifier", default, skip_serializing_if = "Option::is_none")]
    pub version_identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default)]
    pub content: Vec<Content>,
}

impl Output {
    /// First content link, where review text lives.
    pub fn content_url(&self) -> Option<&str> {
        self.content.first().map(|c| c.url.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    WebPage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContentType>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCMAP: &str = r#"{
        "id": "https://example.org/docmap/1",
        "created": "2023-03-01T10:00:00Z",
        "first-step": "_:b1",
        "steps": {
            "_:b1": {
                "inputs": [{"type": "preprint", "doi": "10.1101/2023.01.01"}],
                "actions": [{
                    "participants": [{"role": "editor", "actor": {"type": "person", "name": "A"}}],
                    "outputs": [{"type": "preprint", "identifier": "84154", "versionIdentifier": "1"}]
                }],
                "assertions": [{"item": {"type": "preprint", "doi": "10.1101/2023.01.01"}, "status": "under-review"}],
                "next-step": "_:b0"
            },
            "_:b0": {
                "inputs": [],
                "actions": [{
                    "participants": [],
                    "outputs": [{"type": "evaluation-summary", "content": [{"type": "web-page", "url": "https://example.org/e"}]}]
                }],
                "assertions": [{"item": {"type": "preprint", "doi": "10.1101/2023.01.01"}, "status": "peer-reviewed", "happened": "2023-04-01T00:00:00+02:00"}],
                "previous-step": "_:b1"
            }
        }
    }"#;

    #[test]
    fn test_steps_keep_declaration_order() {
        let docmap: Docmap = serde_json::from_str(DOCMAP).unwrap();
        let ids: Vec<&str> = docmap.steps.ids().collect();
        assert_eq!(ids, vec!["_:b1", "_:b0"]);
    }

    #[test]
    fn test_closed_enums_decode() {
        let docmap: Docmap = serde_json::from_str(DOCMAP).unwrap();
        let review = docmap.steps.get("_:b0").unwrap();
        assert_eq!(review.assertions[0].status, AssertionStatus::PeerReviewed);
        assert_eq!(review.actions[0].outputs[0].kind, OutputType::EvaluationSummary);
        assert_eq!(
            review.actions[0].outputs[0].content_url(),
            Some("https://example.org/e")
        );
        assert_eq!(review.previous_step.as_deref(), Some("_:b1"));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let raw = r#"{"item": {"type": "preprint", "doi": "10.1/x"}, "status": "published"}"#;
        assert!(serde_json::from_str::<Assertion>(raw).is_err());
    }

    #[test]
    fn test_steps_serialize_in_order() {
        let docmap: Docmap = serde_json::from_str(DOCMAP).unwrap();
        let out = serde_json::to_string(&docmap.steps).unwrap();
        let first = out.find("_:b1").unwrap();
        let second = out.find("_:b0").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_output_type_is_review() {
        assert!(OutputType::EvaluationSummary.is_review());
        assert!(OutputType::ReviewArticle.is_review());
        assert!(!OutputType::Preprint.is_review());
        assert_eq!(OutputType::ReviewArticle.to_string(), "review-article");
    }
}
