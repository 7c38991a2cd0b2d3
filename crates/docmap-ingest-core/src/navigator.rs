//! Read-only accessors over a docmap's step graph.
//!
//! Nothing here performs I/O. The only failures are lookups of step ids that
//! a validated docmap never contains.

use std::collections::HashSet;

use crate::error::{CoreError, Result};
use crate::models::docmap::{
    Assertion, AssertionStatus, Docmap, ItemType, Output, OutputType, Step,
};

impl Docmap {
    pub fn first_step(&self) -> Result<&Step> {
        self.step(&self.first_step)
    }

    pub fn step(&self, id: &str) -> Result<&Step> {
        self.steps.get(id).ok_or_else(|| CoreError::StepNotFound {
            docmap: self.id.clone(),
            step: id.to_string(),
        })
    }

    /// Every step id in declaration order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.ids().collect()
    }

    /// Steps reachable from the first step through `next-step` links.
    ///
    /// Stops at a dangling link or at the first step visited twice.
    pub fn chain(&self) -> Vec<(&str, &Step)> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut cursor = Some(self.first_step.as_str());

        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            let Some(step) = self.steps.get(id) else {
                break;
            };
            chain.push((id, step));
            cursor = step.next_step.as_deref();
        }

        chain
    }

    /// DOI of the preprint the first step takes as input.
    pub fn first_step_preprint_doi(&self) -> Result<Option<&str>> {
        Ok(self.first_step()?.preprint_input_doi())
    }
}

impl Step {
    /// First assertion with `status`, in declaration order.
    pub fn assertion(&self, status: AssertionStatus) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.status == status)
    }

    pub fn asserts(&self, status: AssertionStatus) -> bool {
        self.assertion(status).is_some()
    }

    /// Whether any action of this step outputs something of `kind`.
    pub fn has_output(&self, kind: OutputType) -> bool {
        self.actions
            .iter()
            .any(|action| action.outputs.iter().any(|o| o.kind == kind))
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> {
        self.actions.iter().flat_map(|action| action.outputs.iter())
    }

    pub fn preprint_input_doi(&self) -> Option<&str> {
        self.inputs
            .iter()
            .find(|input| input.kind == ItemType::Preprint)
            .map(|input| input.doi.as_str())
    }

    /// Preprint output of the last action that carries one.
    pub fn preprint_output(&self) -> Option<&Output> {
        self.actions
            .iter()
            .filter_map(|action| {
                action
                    .outputs
                    .iter()
                    .find(|o| o.kind == OutputType::Preprint)
            })
            .last()
    }

    pub fn preprint_identifier(&self) -> Option<&str> {
        self.preprint_output()
            .and_then(|output| output.identifier.as_deref())
    }
}
