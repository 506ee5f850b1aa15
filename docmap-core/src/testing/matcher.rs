//! Filter evaluation and update application for the in-memory engine.
//!
//! Only top-level fields are addressed; dotted paths are treated as plain
//! keys. `$regex` runs through `regex-lite`, honoring the `i`, `m`, `s` and
//! `x` options. Unknown query operators never match.

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex_lite::Regex;

/// Whether `doc` satisfies `filter`.
pub(crate) fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => sub_filters(condition).iter().all(|f| matches(doc, f)),
        "$or" => sub_filters(condition).iter().any(|f| matches(doc, f)),
        "$nor" => !sub_filters(condition).iter().any(|f| matches(doc, f)),
        _ => matches_condition(doc.get(key), condition),
    })
}

fn sub_filters(condition: &Bson) -> Vec<&Document> {
    match condition {
        Bson::Array(items) => items.iter().filter_map(Bson::as_document).collect(),
        _ => Vec::new(),
    }
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(doc) if !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')) => {
            Some(doc)
        }
        _ => None,
    }
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> bool {
    let Some(operators) = is_operator_document(condition) else {
        return equals(value, condition);
    };

    operators.iter().all(|(op, operand)| match op.as_str() {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$in" => operand
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(value, item))),
        "$nin" => operand
            .as_array()
            .is_some_and(|items| !items.iter().any(|item| equals(value, item))),
        "$exists" => value.is_some() == operand.as_bool().unwrap_or(true),
        "$gt" => compare(value, operand) == Some(Ordering::Greater),
        "$gte" => matches!(compare(value, operand), Some(Ordering::Greater | Ordering::Equal)),
        "$lt" => compare(value, operand) == Some(Ordering::Less),
        "$lte" => matches!(compare(value, operand), Some(Ordering::Less | Ordering::Equal)),
        "$regex" => matches_regex(value, operand, operators.get_str("$options").unwrap_or("")),
        "$options" => operators.contains_key("$regex"),
        _ => false,
    })
}

/// A string field, or any string element of an array field, matches the pattern.
fn matches_regex(value: Option<&Bson>, operand: &Bson, options: &str) -> bool {
    let (pattern, options) = match operand {
        Bson::String(pattern) => (pattern.as_str(), options),
        Bson::RegularExpression(regex) => (regex.pattern.as_str(), regex.options.as_str()),
        _ => return false,
    };
    let flags: String = options.chars().filter(|c| "imsx".contains(*c)).collect();
    let compiled = if flags.is_empty() {
        Regex::new(pattern)
    } else {
        Regex::new(&format!("(?{flags}){pattern}"))
    };
    let Ok(re) = compiled else {
        return false;
    };
    match value {
        Some(Bson::String(s)) => re.is_match(s),
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| matches!(item, Bson::String(s) if re.is_match(s))),
        _ => false,
    }
}

/// Field equality; an array field also matches any of its elements.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| bson_eq(item, expected))
        }
        (Some(actual), expected) => bson_eq(actual, expected),
    }
}

fn bson_eq(a: &Bson, b: &Bson) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Orders two values of the same kind; mixed kinds are incomparable.
pub(crate) fn compare(value: Option<&Bson>, other: &Bson) -> Option<Ordering> {
    let value = value?;
    if let (Some(x), Some(y)) = (as_number(value), as_number(other)) {
        return x.partial_cmp(&y);
    }
    match (value, other) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Applies an operator update in place, returning whether the document changed.
///
/// `$setOnInsert` only takes effect when `inserting` is set.
pub(crate) fn apply_update(doc: &mut Document, update: &Document, inserting: bool) -> bool {
    let before = doc.clone();

    for (op, fields) in update {
        let Some(fields) = fields.as_document() else {
            continue;
        };
        for (key, value) in fields {
            match op.as_str() {
                "$set" => {
                    doc.insert(key.clone(), value.clone());
                }
                "$setOnInsert" if inserting => {
                    doc.insert(key.clone(), value.clone());
                }
                "$unset" => {
                    doc.remove(key);
                }
                "$inc" => {
                    let total = increment(doc.get(key), value);
                    doc.insert(key.clone(), total);
                }
                "$push" => match doc.get_mut(key) {
                    Some(Bson::Array(items)) => items.push(value.clone()),
                    _ => {
                        doc.insert(key.clone(), Bson::Array(vec![value.clone()]));
                    }
                },
                "$rename" => {
                    if let (Some(moved), Some(target)) = (doc.remove(key), value.as_str()) {
                        doc.insert(target, moved);
                    }
                }
                _ => {}
            }
        }
    }

    *doc != before
}

fn increment(current: Option<&Bson>, by: &Bson) -> Bson {
    match (current, by) {
        (None, by) => by.clone(),
        (Some(Bson::Int32(a)), Bson::Int32(b)) => match a.checked_add(*b) {
            Some(sum) => Bson::Int32(sum),
            None => Bson::Int64(i64::from(*a) + i64::from(*b)),
        },
        (Some(Bson::Int32(a)), Bson::Int64(b)) => add_i64(i64::from(*a), *b),
        (Some(Bson::Int64(a)), Bson::Int32(b)) => add_i64(*a, i64::from(*b)),
        (Some(Bson::Int64(a)), Bson::Int64(b)) => add_i64(*a, *b),
        (Some(current), by) => match (as_number(current), as_number(by)) {
            (Some(a), Some(b)) => Bson::Double(a + b),
            _ => current.clone(),
        },
    }
}

/// 64-bit sum; overflow falls back to a double.
fn add_i64(a: i64, b: i64) -> Bson {
    match a.checked_add(b) {
        Some(sum) => Bson::Int64(sum),
        None => Bson::Double(a as f64 + b as f64),
    }
}

/// The document an upsert starts from: the filter's equality fields.
pub(crate) fn seed_from_filter(filter: &Document) -> Document {
    let mut seed = Document::new();
    for (key, condition) in filter {
        if key.starts_with('$') {
            continue;
        }
        match is_operator_document(condition) {
            Some(operators) => {
                if let Some(value) = operators.get("$eq") {
                    seed.insert(key.clone(), value.clone());
                }
            }
            None => {
                seed.insert(key.clone(), condition.clone());
            }
        }
    }
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    fn dave() -> Document {
        doc! { "firstname": "Dave", "lastname": "Matthews", "age": 55, "tags": ["music"] }
    }

    #[test]
    fn test_equality_and_operators() {
        let doc = dave();
        assert!(matches(&doc, &doc! {}));
        assert!(matches(&doc, &doc! { "firstname": "Dave" }));
        assert!(!matches(&doc, &doc! { "firstname": "Carter" }));
        assert!(matches(&doc, &doc! { "age": { "$gt": 50, "$lte": 55 } }));
        assert!(matches(&doc, &doc! { "age": 55_i64 }));
        assert!(matches(&doc, &doc! { "lastname": { "$in": ["Grohl", "Matthews"] } }));
        assert!(matches(&doc, &doc! { "lastname": { "$nin": ["Grohl"] } }));
        assert!(matches(&doc, &doc! { "nickname": { "$exists": false } }));
        assert!(matches(&doc, &doc! { "tags": "music" }));
        assert!(!matches(&doc, &doc! { "age": { "$regex": "5" } }));
    }

    #[test]
    fn test_regex_operator() {
        let doc = dave();
        assert!(matches(&doc, &doc! { "lastname": { "$regex": "^Mat" } }));
        assert!(!matches(&doc, &doc! { "lastname": { "$regex": "^mat" } }));
        assert!(matches(
            &doc,
            &doc! { "lastname": { "$regex": "^mat", "$options": "i" } }
        ));
        assert!(matches(&doc, &doc! { "tags": { "$regex": "us" } }));
        let insensitive = bson::Regex {
            pattern: "^d".into(),
            options: "i".into(),
        };
        assert!(matches(&doc, &doc! { "firstname": { "$regex": insensitive } }));
        assert!(!matches(&doc, &doc! { "nickname": { "$regex": "." } }));
        assert!(!matches(&doc, &doc! { "lastname": { "$regex": "(" } }));
        assert!(!matches(&doc, &doc! { "lastname": { "$options": "i" } }));
    }

    #[test]
    fn test_logical_operators() {
        let doc = dave();
        assert!(matches(
            &doc,
            &doc! { "$or": [{ "firstname": "Carter" }, { "lastname": "Matthews" }] }
        ));
        assert!(!matches(
            &doc,
            &doc! { "$and": [{ "firstname": "Dave" }, { "lastname": "Grohl" }] }
        ));
        assert!(matches(&doc, &doc! { "$nor": [{ "firstname": "Carter" }] }));
    }

    #[test]
    fn test_apply_update() {
        let mut doc = dave();
        let changed = apply_update(
            &mut doc,
            &doc! {
                "$set": { "lastname": "Grohl" },
                "$inc": { "age": 1 },
                "$push": { "tags": "drums" },
                "$unset": { "firstname": "" },
                "$setOnInsert": { "created": true }
            },
            false,
        );

        assert!(changed);
        assert_eq!(
            doc,
            doc! { "lastname": "Grohl", "age": 56, "tags": ["music", "drums"] }
        );
    }

    #[test]
    fn test_inc_overflow_widens() {
        let mut doc = doc! { "small": i32::MAX, "big": i64::MAX, "mixed": i64::MAX };
        apply_update(
            &mut doc,
            &doc! { "$inc": { "small": 1, "big": 1_i64, "mixed": 1 } },
            false,
        );

        assert_eq!(doc.get("small"), Some(&Bson::Int64(i64::from(i32::MAX) + 1)));
        assert_eq!(doc.get("big"), Some(&Bson::Double(i64::MAX as f64 + 1.0)));
        assert_eq!(doc.get("mixed"), Some(&Bson::Double(i64::MAX as f64 + 1.0)));
    }

    #[test]
    fn test_apply_update_reports_no_change() {
        let mut doc = dave();
        assert!(!apply_update(&mut doc, &doc! { "$set": { "firstname": "Dave" } }, false));
    }

    #[test]
    fn test_rename() {
        let mut doc = dave();
        apply_update(&mut doc, &doc! { "$rename": { "lastname": "surname" } }, false);
        assert_eq!(doc.get_str("surname").unwrap(), "Matthews");
        assert!(!doc.contains_key("lastname"));
    }

    #[test]
    fn test_seed_from_filter() {
        let seed = seed_from_filter(&doc! {
            "firstname": "Luke",
            "age": { "$eq": 19 },
            "height": { "$gt": 1 },
            "$or": [{ "a": 1 }]
        });
        assert_eq!(seed, doc! { "firstname": "Luke", "age": 19 });
    }
}
