//! Docmap fixtures shared by the unit tests.

use docmap_ingest_core::Docmap;
use serde_json::{Value, json};

/// A step that creates a manuscript version of `doi`.
pub fn creation_step(doi: &str, identifier: &str) -> Value {
    json!({
        "inputs": [{"type": "preprint", "doi": doi}],
        "assertions": [{
            "item": {"type": "preprint", "doi": doi},
            "status": "under-review",
            "happened": "2023-01-10T00:00:00+00:00"
        }],
        "actions": [{
            "participants": [],
            "outputs": [{
                "type": "preprint",
                "identifier": identifier,
                "doi": format!("10.7554/eLife.{identifier}.1"),
                "versionIdentifier": "1"
            }]
        }]
    })
}

/// A peer-reviewed step with one review output per `(type, url)` pair.
pub fn review_step(doi: &str, outputs: &[(&str, &str)]) -> Value {
    let outputs: Vec<Value> = outputs
        .iter()
        .map(|(kind, url)| {
            json!({
                "type": kind,
                "content": [{"type": "web-page", "url": url}]
            })
        })
        .collect();
    json!({
        "inputs": [{"type": "preprint", "doi": doi}],
        "assertions": [{
            "item": {"type": "preprint", "doi": doi},
            "status": "peer-reviewed"
        }],
        "actions": [{"participants": [], "outputs": outputs}]
    })
}

/// Link `steps` in the given order through `next-step`/`previous-step`.
pub fn chain(steps: Vec<(&str, Value)>) -> Value {
    let ids: Vec<String> = steps.iter().map(|(id, _)| id.to_string()).collect();
    let mut map = serde_json::Map::new();
    for (i, (id, mut step)) in steps.into_iter().enumerate() {
        if i > 0 {
            step["previous-step"] = json!(ids[i - 1]);
        }
        if let Some(next) = ids.get(i + 1) {
            step["next-step"] = json!(next);
        }
        map.insert(id.to_string(), step);
    }
    Value::Object(map)
}

/// Raw docmap JSON that passes schema validation.
pub fn docmap_json(id: &str, created: &str, first_step: &str, steps: Value) -> Value {
    json!({
        "@context": "https://w3id.org/docmaps/context.jsonld",
        "type": "docmap",
        "id": id,
        "created": created,
        "updated": created,
        "first-step": first_step,
        "steps": steps
    })
}

pub fn docmap(id: &str, first_step: &str, steps: Value) -> Docmap {
    serde_json::from_value(docmap_json(id, "2023-02-01T00:00:00+00:00", first_step, steps))
        .unwrap()
}

/// Step `_:b0` creates the manuscript, `_:b1` reviews it with one decision.
pub fn reviewed_docmap_json(id: &str, doi: &str, identifier: &str, review_url: &str) -> Value {
    docmap_json(
        id,
        "2023-02-01T00:00:00+00:00",
        "_:b0",
        chain(vec![
            ("_:b0", creation_step(doi, identifier)),
            ("_:b1", review_step(doi, &[("evaluation-summary", review_url)])),
        ]),
    )
}
