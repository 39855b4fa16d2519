//! Flattening of TVDB response objects into plain field records.
//!
//! Every response type describes itself through [`Attributes`]: an ordered list
//! of its own attribute names and values. [`normalize`] walks that list and
//! renames attributes through a static [`FieldMap`]:
//!
//! - null and empty values are dropped
//! - lists of strings are joined with a separator (`|` by default)
//! - lists of objects are normalized element by element
//! - an attribute mapped to a nested table has its object value flattened one
//!   level deep; children without an entry in the nested table are dropped
//!
//! A value that can't be represented is logged and skipped, the rest of the
//! record is still produced.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::warn;

pub const DEFAULT_SEPARATOR: &str = "|";

/// A normalized record: destination field name to value.
pub type Record = BTreeMap<String, Field>;

/// One attribute as exposed by a response object.
pub type Attribute = (Cow<'static, str>, AttrValue);

/// Raw attribute value before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<AttrValue>),
    Object(Vec<Attribute>),
}

/// A response object that can enumerate its own attributes.
pub trait Attributes {
    fn attributes(&self) -> Vec<Attribute>;
}

/// Conversion of a single typed value into an [`AttrValue`].
pub trait ToAttr {
    fn to_attr(&self) -> AttrValue;
}

pub fn attr(name: &'static str, value: &impl ToAttr) -> Attribute {
    (Cow::Borrowed(name), value.to_attr())
}

impl ToAttr for String {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Text(self.clone())
    }
}

impl ToAttr for i64 {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Int(*self)
    }
}

impl ToAttr for u32 {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Int(i64::from(*self))
    }
}

impl ToAttr for u64 {
    fn to_attr(&self) -> AttrValue {
        match i64::try_from(*self) {
            Ok(v) => AttrValue::Int(v),
            Err(_) => AttrValue::Text(self.to_string()),
        }
    }
}

impl ToAttr for f64 {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Float(*self)
    }
}

impl ToAttr for bool {
    fn to_attr(&self) -> AttrValue {
        AttrValue::Bool(*self)
    }
}

impl<T: ToAttr> ToAttr for Option<T> {
    fn to_attr(&self) -> AttrValue {
        self.as_ref().map_or(AttrValue::Null, ToAttr::to_attr)
    }
}

impl<T: ToAttr> ToAttr for Vec<T> {
    fn to_attr(&self) -> AttrValue {
        AttrValue::List(self.iter().map(ToAttr::to_attr).collect())
    }
}

/// Loosely typed JSON values, for fields the API sends as numbers or strings
/// depending on the record.
impl ToAttr for serde_json::Value {
    fn to_attr(&self) -> AttrValue {
        use serde_json::Value;

        match self {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => n.as_f64().map_or(AttrValue::Null, AttrValue::Float),
            },
            Value::String(s) => AttrValue::Text(s.clone()),
            Value::Array(items) => AttrValue::List(items.iter().map(ToAttr::to_attr).collect()),
            Value::Object(map) => AttrValue::Object(
                map.iter()
                    .map(|(k, v)| (Cow::Owned(k.clone()), v.to_attr()))
                    .collect(),
            ),
        }
    }
}

/// A normalized value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Record(Record),
    Records(Vec<Record>),
}

impl Field {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the field. Text is parsed as a float, so `"2.0"` yields `2.0`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Int(i) => Some(*i as f64),
            Field::Float(f) => Some(*f),
            Field::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Field::Text(s) => s.is_empty(),
            Field::Record(r) => r.is_empty(),
            Field::Records(r) => r.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(s) => f.write_str(s),
            Field::Int(i) => write!(f, "{}", i),
            Field::Float(v) => write!(f, "{}", v),
            Field::Bool(b) => write!(f, "{}", b),
            Field::Record(r) => write!(f, "{:?}", r),
            Field::Records(r) => write!(f, "{:?}", r),
        }
    }
}

/// A normalized record reads back as attributes, so normalizing it again with
/// an empty map is a no-op.
impl Attributes for Record {
    fn attributes(&self) -> Vec<Attribute> {
        self.iter()
            .map(|(k, v)| (Cow::Owned(k.clone()), field_to_attr(v)))
            .collect()
    }
}

fn field_to_attr(field: &Field) -> AttrValue {
    match field {
        Field::Text(s) => AttrValue::Text(s.clone()),
        Field::Int(i) => AttrValue::Int(*i),
        Field::Float(f) => AttrValue::Float(*f),
        Field::Bool(b) => AttrValue::Bool(*b),
        Field::Record(r) => AttrValue::Object(r.attributes()),
        Field::Records(rs) => {
            AttrValue::List(rs.iter().map(|r| AttrValue::Object(r.attributes())).collect())
        }
    }
}

/// Where a source attribute ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Rename(&'static str),
    /// Child attribute name to destination name, applied one level deep.
    Nested(&'static [(&'static str, &'static str)]),
}

/// Static rename table from API attribute names to record field names.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entries: &'static [(&'static str, FieldTarget)],
}

impl FieldMap {
    pub const EMPTY: FieldMap = FieldMap { entries: &[] };

    pub const fn new(entries: &'static [(&'static str, FieldTarget)]) -> Self {
        Self { entries }
    }

    pub fn target(&self, attribute: &str) -> Option<FieldTarget> {
        self.entries
            .iter()
            .find(|(name, _)| *name == attribute)
            .map(|(_, target)| *target)
    }

    /// Every destination name this map can produce.
    pub fn destinations(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().flat_map(|(_, target)| match target {
            FieldTarget::Rename(dest) => vec![*dest],
            FieldTarget::Nested(children) => children.iter().map(|(_, dest)| *dest).collect(),
        })
    }
}

/// Result of normalizing a batch: one record for a single object, otherwise a
/// list in input order.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    One(Record),
    Many(Vec<Record>),
}

impl Normalized {
    pub fn into_records(self) -> Vec<Record> {
        match self {
            Normalized::One(record) => vec![record],
            Normalized::Many(records) => records,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum NormalizeError {
    #[error("nested field map needs an object value")]
    NotAnObject,
    #[error("list mixes strings, objects or other scalars")]
    UnsupportedList,
    #[error("non-finite number")]
    NonFinite,
}

pub fn normalize<A: Attributes + ?Sized>(object: &A, map: &FieldMap, separator: &str) -> Record {
    normalize_attributes(object.attributes(), map, separator)
}

pub fn normalize_all<A: Attributes>(objects: &[A], map: &FieldMap, separator: &str) -> Normalized {
    let mut records: Vec<Record> = objects
        .iter()
        .map(|object| normalize(object, map, separator))
        .collect();

    if records.len() == 1 {
        Normalized::One(records.remove(0))
    } else {
        Normalized::Many(records)
    }
}

fn normalize_attributes(attributes: Vec<Attribute>, map: &FieldMap, separator: &str) -> Record {
    let mut record = Record::new();

    for (name, value) in attributes {
        if let Err(e) = apply_attribute(&mut record, &name, value, map, separator) {
            warn!(attribute = %name, "Could not parse attribute: {}", e);
        }
    }

    record
}

fn apply_attribute(
    record: &mut Record,
    name: &str,
    value: AttrValue,
    map: &FieldMap,
    separator: &str,
) -> Result<(), NormalizeError> {
    if value == AttrValue::Null {
        return Ok(());
    }

    match map.target(name) {
        Some(FieldTarget::Nested(children)) => {
            // Only one level deep: children without an entry are dropped.
            let AttrValue::Object(child_attributes) = value else {
                return Err(NormalizeError::NotAnObject);
            };
            for (child, child_value) in child_attributes {
                let Some((_, dest)) = children.iter().find(|(k, _)| *k == child) else {
                    continue;
                };
                if child_value == AttrValue::Null {
                    continue;
                }
                let field = convert(child_value, map, separator)?;
                if !field.is_empty() {
                    record.insert((*dest).to_string(), field);
                }
            }
        }
        target => {
            let field = convert(value, map, separator)?;
            if field.is_empty() {
                return Ok(());
            }
            let dest = match target {
                Some(FieldTarget::Rename(dest)) => dest,
                _ => name,
            };
            record.insert(dest.to_string(), field);
        }
    }

    Ok(())
}

fn convert(value: AttrValue, map: &FieldMap, separator: &str) -> Result<Field, NormalizeError> {
    match value {
        AttrValue::Text(s) => Ok(Field::Text(s)),
        AttrValue::Int(i) => Ok(Field::Int(i)),
        AttrValue::Float(f) if f.is_finite() => Ok(Field::Float(f)),
        AttrValue::Float(_) => Err(NormalizeError::NonFinite),
        AttrValue::Bool(b) => Ok(Field::Bool(b)),
        AttrValue::Object(children) => Ok(Field::Record(normalize_attributes(children, map, separator))),
        AttrValue::List(items) => convert_list(items, map, separator),
        AttrValue::Null => Err(NormalizeError::UnsupportedList),
    }
}

fn convert_list(items: Vec<AttrValue>, map: &FieldMap, separator: &str) -> Result<Field, NormalizeError> {
    if items.iter().all(|item| matches!(item, AttrValue::Text(_))) {
        let parts: Vec<String> = items
            .into_iter()
            .filter_map(|item| match item {
                AttrValue::Text(s) => Some(s),
                _ => None,
            })
            .collect();
        return Ok(Field::Text(parts.join(separator)));
    }

    if items.iter().all(|item| matches!(item, AttrValue::Object(_))) {
        let records = items
            .into_iter()
            .filter_map(|item| match item {
                AttrValue::Object(children) => {
                    Some(normalize_attributes(children, map, DEFAULT_SEPARATOR))
                }
                _ => None,
            })
            .collect();
        return Ok(Field::Records(records));
    }

    Err(NormalizeError::UnsupportedList)
}
