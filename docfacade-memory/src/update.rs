//! Update operators for in-memory documents: `$set`, `$unset` and `$inc`.

use bson::{Bson, Document};

use docfacade_core::error::{FacadeError, FacadeResult};

use crate::evaluator::{is_operator_document, lookup};

/// Applies `update` to a copy of `document`.
///
/// The original is left untouched on error, so a failed update never leaves a
/// half-applied document behind.
pub(crate) fn apply_update(document: &Document, update: &Document) -> FacadeResult<Document> {
    if update.is_empty() {
        return Err(FacadeError::write("update document must not be empty"));
    }

    let mut updated = document.clone();

    for (operator, fields) in update {
        if !operator.starts_with('$') {
            return Err(FacadeError::write(format!(
                "update document requires atomic operators, found field '{operator}'"
            )));
        }
        let Bson::Document(fields) = fields else {
            return Err(FacadeError::write(format!("{operator} expects a document of fields")));
        };

        match operator.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(&mut updated, path, value.clone()).map_err(FacadeError::write)?;
                }
            }
            "$unset" => {
                for path in fields.keys() {
                    remove_path(&mut updated, path);
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let current = lookup(&updated, path)
                        .cloned()
                        .unwrap_or(Bson::Int32(0));
                    let next = increment(&current, delta).ok_or_else(|| {
                        FacadeError::write(format!("cannot apply $inc of {delta} to field '{path}' holding {current}"))
                    })?;

                    set_path(&mut updated, path, next).map_err(FacadeError::write)?;
                }
            }
            other => return Err(FacadeError::write(format!("unknown update operator: {other}"))),
        }
    }

    if document.contains_key("_id") && updated.get("_id") != document.get("_id") {
        return Err(FacadeError::write(
            "Performing an update on the path '_id' would modify the immutable field '_id'",
        ));
    }

    Ok(updated)
}

/// Builds the base document for an upsert from the filter's equality fields.
pub(crate) fn upsert_seed(filter: &Document) -> FacadeResult<Document> {
    let mut seed = Document::new();

    for (path, condition) in filter {
        if path.starts_with('$') {
            continue;
        }

        let value = match condition {
            Bson::Document(operators) if is_operator_document(operators) => match operators.get("$eq") {
                Some(value) => value.clone(),
                None => continue,
            },
            value => value.clone(),
        };

        set_path(&mut seed, path, value).map_err(FacadeError::write)?;
    }

    Ok(seed)
}

/// Sets a dotted path, creating intermediate documents as needed.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> Result<(), String> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    if !document.contains_key(head) {
        document.insert(head, Document::new());
    }

    match document.get_mut(head) {
        Some(Bson::Document(inner)) => set_path(inner, rest, value),
        _ => Err(format!("cannot create field '{rest}' in non-document field '{head}'")),
    }
}

pub(crate) fn remove_path(document: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => document.remove(path),
        Some((head, rest)) => match document.get_mut(head) {
            Some(Bson::Document(inner)) => remove_path(inner, rest),
            _ => None,
        },
    }
}

fn increment(current: &Bson, delta: &Bson) -> Option<Bson> {
    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Some(
            a.checked_add(*b)
                .map_or(Bson::Int64(i64::from(*a) + i64::from(*b)), Bson::Int32),
        ),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            as_i64(current)?.checked_add(as_i64(delta)?).map(Bson::Int64)
        }
        _ => Some(Bson::Double(as_f64(current)? + as_f64(delta)?)),
    }
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(value) => Some(i64::from(*value)),
        Bson::Int64(value) => Some(*value),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(value) => Some(f64::from(*value)),
        Bson::Int64(value) => Some(*value as f64),
        Bson::Double(value) => Some(*value),
        _ => None,
    }
}
