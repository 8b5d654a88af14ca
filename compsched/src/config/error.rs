/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Structural errors raised while validating a case file.
//!
//! Every variant is fatal for the dataset: analysis never starts on a
//! workload that failed validation.  Each one names the record kind, the
//! record id and the offending field so the message can be acted on without
//! opening the file.

use std::fmt;

use thiserror::Error;

/// Kind of input record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Task,
    Component,
    Core,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Task => write!(f, "task"),
            RecordKind::Component => write!(f, "component"),
            RecordKind::Core => write!(f, "core"),
        }
    }
}

/// Fatal schema / reference error in the input model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A required field is absent, e.g. an RM task without `priority` or a
    /// component without `core_id`.
    #[error("{record} '{id}' is missing required field '{field}'")]
    MissingField {
        record: RecordKind,
        id: String,
        field: &'static str,
    },

    /// A record references an id that no record of `target` kind defines.
    #[error("{record} '{id}' references undefined {target} '{reference}'")]
    UnresolvedReference {
        record: RecordKind,
        id: String,
        target: RecordKind,
        reference: String,
    },

    /// A field is present but outside its domain (non-positive WCET, zero
    /// period, duplicate id, ...).
    #[error("{record} '{id}' has invalid field '{field}': {reason}")]
    InvalidField {
        record: RecordKind,
        id: String,
        field: &'static str,
        reason: String,
    },
}

impl ModelError {
    /// Name of the field the error is about (`"core_id"` for an unresolved
    /// core reference).
    pub fn field(&self) -> &str {
        match self {
            ModelError::MissingField { field, .. } | ModelError::InvalidField { field, .. } => {
                field
            }
            ModelError::UnresolvedReference { target, .. } => match target {
                RecordKind::Core => "core_id",
                RecordKind::Component => "component_id",
                RecordKind::Task => "task",
            },
        }
    }
}
