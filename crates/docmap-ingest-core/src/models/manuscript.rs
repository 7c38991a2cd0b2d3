use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Manuscript record in the shape the host's importer interface accepts.
///
/// Fields the importer does not touch are carried through `extra`, so a host
/// blueprint survives a round-trip untouched apart from what we stamp on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manuscript {
    #[serde(default)]
    pub is_imported: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default)]
    pub submission: Submission,

    #[serde(default)]
    pub meta: Meta,

    #[serde(default)]
    pub reviews: Vec<Review>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(rename = "articleId", default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,

    #[serde(rename = "$doi", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(rename = "$sourceUri", default, skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,

    #[serde(rename = "$title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "$abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewData {
    pub comment: String,
}

/// Review or decision text attached to one manuscript version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub json_data: ReviewData,
    pub is_decision: bool,
}

impl Review {
    pub fn new(comment: impl Into<String>, is_decision: bool) -> Self {
        Self {
            json_data: ReviewData {
                comment: comment.into(),
            },
            is_decision,
        }
    }
}

/// What one docmap turns into: a single manuscript, or every version of a
/// multi-version preprint in step order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportedRecord {
    Single(Manuscript),
    Versions(Vec<Manuscript>),
}

impl ImportedRecord {
    pub fn from_manuscripts(mut manuscripts: Vec<Manuscript>) -> Self {
        if manuscripts.len() == 1
            && let Some(single) = manuscripts.pop()
        {
            return Self::Single(single);
        }
        Self::Versions(manuscripts)
    }

    pub fn manuscripts(&self) -> &[Manuscript] {
        match self {
            Self::Single(m) => std::slice::from_ref(m),
            Self::Versions(v) => v,
        }
    }
}
