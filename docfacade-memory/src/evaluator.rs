//! Filter evaluation for in-memory documents.
//!
//! Supports implicit equality, the comparison operators `$eq $ne $gt $gte $lt
//! $lte $in $nin`, `$exists`, `$not`, the top-level combinators `$and $or $nor`
//! and dotted field paths. Anything else is rejected with a query error rather
//! than silently matching nothing.

use std::cmp::Ordering;

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docfacade_core::error::{FacadeError, FacadeResult};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so `Int32(1)` equals `Double(1.0)`, as
/// in the server's query engine. Embedded documents keep their field order,
/// which is significant for equality.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Binary(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Binary(binary) => Comparable::Binary(&binary.bytes),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    /// Position in the server's cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Binary(_) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(_) => 10,
        }
    }

    /// Total order used by `$sort`: by type first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Binary(a), Comparable::Binary(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Binary(a), Comparable::Binary(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Resolves a dotted path such as `"address.city"` or `"tags.0"`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Every value a filter path can reach. A non-numeric segment applied to an
/// array descends into each embedded document of that array, so
/// `"items.sku"` reaches the `sku` of every element of `items`.
pub(crate) fn resolve<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut values = Vec::new();
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if let Some(value) = document.get(head) {
        descend(value, rest, &mut values);
    }

    values
}

fn descend<'a>(value: &'a Bson, path: Option<&str>, values: &mut Vec<&'a Bson>) {
    let Some(path) = path else {
        values.push(value);
        return;
    };

    match value {
        Bson::Document(inner) => values.extend(resolve(inner, path)),
        Bson::Array(items) => {
            let (head, rest) = match path.split_once('.') {
                Some((head, rest)) => (head, Some(rest)),
                None => (path, None),
            };

            match head.parse::<usize>() {
                Ok(index) => {
                    if let Some(item) = items.get(index) {
                        descend(item, rest, values);
                    }
                }
                Err(_) => {
                    for item in items {
                        if let Bson::Document(inner) = item {
                            values.extend(resolve(inner, path));
                        }
                    }
                }
            }
        }
        _ => {}
    }
}

/// Orders two possibly-missing field values the way `$sort` does. Missing
/// sorts with null.
pub(crate) fn compare_values(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    let left = left.map(Comparable::from).unwrap_or(Comparable::Null);
    let right = right.map(Comparable::from).unwrap_or(Comparable::Null);

    left.sort_cmp(&right)
}

/// True if `document` is an operator expression like `{ "$gt": 5 }`.
pub(crate) fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn matches(&self, filter: &Document) -> FacadeResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        if !self.matches(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" | "$nor" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        if self.matches(clause)? {
                            any = true;
                            break;
                        }
                    }
                    any == (key == "$or")
                }
                operator if operator.starts_with('$') => {
                    return Err(FacadeError::Query(format!("unknown top level operator: {operator}")));
                }
                path => {
                    let values = resolve(self.document, path);

                    match condition {
                        Bson::Document(operators) if is_operator_document(operators) => {
                            field_operators(&values, operators)?
                        }
                        target => equals(&values, target),
                    }
                }
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> FacadeResult<Vec<Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document.clone());
            }
        }

        Ok(matched)
    }
}

fn clauses<'f>(operator: &str, condition: &'f Bson) -> FacadeResult<Vec<&'f Document>> {
    let invalid = || FacadeError::Query(format!("{operator} argument must be a non-empty array of documents"));

    match condition {
        Bson::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_document().ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

fn field_operators(values: &[&Bson], operators: &Document) -> FacadeResult<bool> {
    for (operator, operand) in operators {
        let matched = match operator.as_str() {
            "$eq" => equals(values, operand),
            "$ne" => !equals(values, operand),
            "$gt" | "$gte" | "$lt" | "$lte" => compare(values, operator, operand),
            "$in" => in_list(values, operator, operand)?,
            "$nin" => !in_list(values, operator, operand)?,
            "$exists" => !values.is_empty() == truthy(operand),
            "$not" => match operand {
                Bson::Document(inner) if is_operator_document(inner) => !field_operators(values, inner)?,
                _ => return Err(FacadeError::Query("$not needs a document of operators".into())),
            },
            other => return Err(FacadeError::Query(format!("unknown operator: {other}"))),
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Equality with the server's array semantics: a scalar target matches an
/// array field containing it, and a null target matches a missing field.
fn equals(values: &[&Bson], target: &Bson) -> bool {
    if values.is_empty() {
        return matches!(target, Bson::Null);
    }

    values.iter().any(|value| match value {
        Bson::Array(items) if !matches!(target, Bson::Array(_)) => items
            .iter()
            .any(|item| Comparable::from(item) == Comparable::from(target)),
        value => Comparable::from(*value) == Comparable::from(target),
    })
}

/// Range comparison. A missing field compares as null, so `$gte: null` and
/// `$lte: null` match it.
fn compare(values: &[&Bson], operator: &str, operand: &Bson) -> bool {
    let satisfies = |candidate: &Bson| match Comparable::from(candidate).partial_cmp(&Comparable::from(operand)) {
        Some(ordering) => match operator {
            "$gt" => ordering.is_gt(),
            "$gte" => ordering.is_ge(),
            "$lt" => ordering.is_lt(),
            _ => ordering.is_le(),
        },
        None => false,
    };

    if values.is_empty() {
        return satisfies(&Bson::Null);
    }

    values.iter().any(|value| match value {
        Bson::Array(items) => items.iter().any(|item| satisfies(item)),
        value => satisfies(*value),
    })
}

fn in_list(values: &[&Bson], operator: &str, operand: &Bson) -> FacadeResult<bool> {
    match operand {
        Bson::Array(candidates) => Ok(candidates.iter().any(|candidate| equals(values, candidate))),
        _ => Err(FacadeError::Query(format!("{operator} needs an array"))),
    }
}

fn truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(value) => *value,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Double(value) => *value != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}
