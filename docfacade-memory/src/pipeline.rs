//! Aggregation pipeline execution over in-memory documents.
//!
//! Supported stages: `$match`, `$sort`, `$skip`, `$limit`, `$project` and
//! `$count`. Stages run in order over a snapshot of the collection.

use std::cmp::Ordering;

use bson::{Bson, Document};

use docfacade_core::error::{FacadeError, FacadeResult};

use crate::{
    evaluator::{DocumentEvaluator, compare_values, lookup},
    update::{remove_path, set_path},
};

pub(crate) fn run_pipeline(documents: Vec<Document>, pipeline: &[Document]) -> FacadeResult<Vec<Document>> {
    pipeline.iter().try_fold(documents, apply_stage)
}

fn apply_stage(documents: Vec<Document>, stage: &Document) -> FacadeResult<Vec<Document>> {
    let mut fields = stage.iter();
    let (Some((name, spec)), None) = (fields.next(), fields.next()) else {
        return Err(FacadeError::Query(
            "A pipeline stage specification object must contain exactly one field.".into(),
        ));
    };

    match name.as_str() {
        "$match" => {
            let filter = stage_document(name, spec)?;
            let mut matched = Vec::with_capacity(documents.len());

            for document in documents {
                let keep = DocumentEvaluator::new(&document).matches(filter)?;
                if keep {
                    matched.push(document);
                }
            }

            Ok(matched)
        }
        "$sort" => sort(documents, stage_document(name, spec)?),
        "$skip" => Ok(documents
            .into_iter()
            .skip(count_argument(name, spec)?)
            .collect()),
        "$limit" => match count_argument(name, spec)? {
            0 => Err(FacadeError::Query("the limit must be positive".into())),
            limit => Ok(documents.into_iter().take(limit).collect()),
        },
        "$project" => project(documents, stage_document(name, spec)?),
        "$count" => count(documents, spec),
        other => Err(FacadeError::Query(format!("Unrecognized pipeline stage name: '{other}'"))),
    }
}

fn stage_document<'s>(name: &str, spec: &'s Bson) -> FacadeResult<&'s Document> {
    spec.as_document()
        .ok_or_else(|| FacadeError::Query(format!("the {name} stage specification must be an object")))
}

fn count_argument(name: &str, spec: &Bson) -> FacadeResult<usize> {
    let count = match spec {
        Bson::Int32(n) => usize::try_from(*n).ok(),
        Bson::Int64(n) => usize::try_from(*n).ok(),
        Bson::Double(n) if n.fract() == 0.0 && *n >= 0.0 => Some(*n as usize),
        _ => None,
    };

    count.ok_or_else(|| FacadeError::Query(format!("{name} requires a non-negative integer, found {spec}")))
}

fn sort(mut documents: Vec<Document>, spec: &Document) -> FacadeResult<Vec<Document>> {
    if spec.is_empty() {
        return Err(FacadeError::Query("$sort stage must have at least one sort key".into()));
    }

    let keys = spec
        .iter()
        .map(|(path, direction)| match direction {
            Bson::Int32(1) | Bson::Int64(1) => Ok((path.as_str(), false)),
            Bson::Int32(-1) | Bson::Int64(-1) => Ok((path.as_str(), true)),
            Bson::Double(d) if *d == 1.0 || *d == -1.0 => Ok((path.as_str(), *d < 0.0)),
            other => Err(FacadeError::Query(format!("$sort key ordering must be 1 or -1, found {other} for '{path}'"))),
        })
        .collect::<FacadeResult<Vec<_>>>()?;

    documents.sort_by(|a, b| {
        keys.iter()
            .map(|(path, descending)| {
                let ordering = compare_values(lookup(a, path), lookup(b, path));
                if *descending { ordering.reverse() } else { ordering }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    Ok(documents)
}

fn project(documents: Vec<Document>, spec: &Document) -> FacadeResult<Vec<Document>> {
    let mut include_id = true;
    let mut fields = Vec::with_capacity(spec.len());

    for (path, value) in spec {
        let included = match value {
            Bson::Boolean(flag) => *flag,
            Bson::Int32(n) => *n != 0,
            Bson::Int64(n) => *n != 0,
            Bson::Double(n) => *n != 0.0,
            other => {
                return Err(FacadeError::Query(format!(
                    "unsupported $project expression {other} for field '{path}'"
                )));
            }
        };

        if path == "_id" {
            include_id = included;
        } else {
            fields.push((path.as_str(), included));
        }
    }

    let inclusion = match fields.first() {
        Some((_, included)) => *included,
        None if spec.is_empty() => {
            return Err(FacadeError::Query("$project requires at least one output field".into()));
        }
        None => include_id,
    };
    if let Some((path, _)) = fields.iter().find(|(_, included)| *included != inclusion) {
        return Err(FacadeError::Query(format!(
            "Invalid $project: cannot mix inclusion and exclusion, found '{path}'"
        )));
    }

    documents
        .into_iter()
        .map(|document| {
            if inclusion {
                let mut projected = Document::new();
                if let Some(id) = document.get("_id").filter(|_| include_id) {
                    projected.insert("_id", id.clone());
                }
                for (path, _) in &fields {
                    if let Some(value) = lookup(&document, path) {
                        set_path(&mut projected, path, value.clone()).map_err(FacadeError::Query)?;
                    }
                }
                Ok(projected)
            } else {
                let mut projected = document;
                for (path, _) in &fields {
                    remove_path(&mut projected, path);
                }
                if !include_id {
                    projected.remove("_id");
                }
                Ok(projected)
            }
        })
        .collect()
}

fn count(documents: Vec<Document>, spec: &Bson) -> FacadeResult<Vec<Document>> {
    let field = match spec {
        Bson::String(field) if !field.is_empty() && !field.starts_with('$') && !field.contains('.') => field,
        _ => {
            return Err(FacadeError::Query(
                "the count field must be a non-empty string that does not start with '$' or contain '.'".into(),
            ));
        }
    };

    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let total = match i32::try_from(documents.len()) {
        Ok(total) => Bson::Int32(total),
        Err(_) => Bson::Int64(documents.len() as i64),
    };
    let mut output = Document::new();
    output.insert(field.as_str(), total);

    Ok(vec![output])
}
