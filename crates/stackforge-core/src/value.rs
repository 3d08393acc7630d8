//! CloudFormation values: JSON scalars, lists and objects, plus the
//! intrinsic functions this project's stacks rely on.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// CloudFormation pseudo parameters referenced by the stacks in this project.
pub mod pseudo {
    pub const ACCOUNT_ID: &str = "AWS::AccountId";
    pub const REGION: &str = "AWS::Region";
    pub const PARTITION: &str = "AWS::Partition";
    pub const URL_SUFFIX: &str = "AWS::URLSuffix";
}

/// Property bag for resource properties and nested property objects.
///
/// Backed by a `BTreeMap` so synthesized templates keep a stable key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(BTreeMap<String, CfnValue>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the bag for chained building.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<CfnValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a key only when the value is present.
    pub fn set_opt<V: Into<CfnValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CfnValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&CfnValue> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CfnValue)> {
        self.0.iter()
    }
}

impl Serialize for Props {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// A value in a CloudFormation template.
///
/// Intrinsic functions serialize to their tagged single-key object form,
/// e.g. `CfnValue::Ref("Vpc")` becomes `{"Ref": "Vpc"}`. Only the intrinsics
/// actually emitted by this project are modeled.
#[derive(Debug, Clone, PartialEq)]
pub enum CfnValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<CfnValue>),
    Object(Props),
    /// `{"Ref": "<logical id or pseudo parameter>"}`
    Ref(String),
    /// `{"Fn::GetAtt": ["<logical id>", "<attribute>"]}`
    GetAtt(String, String),
    /// `{"Fn::ImportValue": <export name>}`
    ImportValue(Box<CfnValue>),
    /// `{"Fn::Join": ["<delimiter>", [<parts>...]]}`
    Join(String, Vec<CfnValue>),
}

impl CfnValue {
    pub fn string(value: impl Into<String>) -> Self {
        CfnValue::Str(value.into())
    }

    pub fn ref_to(target: impl Into<String>) -> Self {
        CfnValue::Ref(target.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        CfnValue::GetAtt(logical_id.into(), attribute.into())
    }

    pub fn import_value(export_name: impl Into<CfnValue>) -> Self {
        CfnValue::ImportValue(Box::new(export_name.into()))
    }

    pub fn join(delimiter: impl Into<String>, parts: Vec<CfnValue>) -> Self {
        CfnValue::Join(delimiter.into(), parts)
    }

    /// `Fn::Join` with an empty delimiter, the usual string-concat form.
    pub fn concat(parts: Vec<CfnValue>) -> Self {
        CfnValue::Join(String::new(), parts)
    }

    /// Borrow the inner string when this value is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CfnValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl Serialize for CfnValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CfnValue::Str(value) => serializer.serialize_str(value),
            CfnValue::Int(value) => serializer.serialize_i64(*value),
            CfnValue::Bool(value) => serializer.serialize_bool(*value),
            CfnValue::List(items) => items.serialize(serializer),
            CfnValue::Object(props) => props.serialize(serializer),
            CfnValue::Ref(target) => tagged(serializer, "Ref", target),
            CfnValue::GetAtt(logical_id, attribute) => {
                tagged(serializer, "Fn::GetAtt", &[logical_id, attribute])
            }
            CfnValue::ImportValue(name) => tagged(serializer, "Fn::ImportValue", name),
            CfnValue::Join(delimiter, parts) => {
                tagged(serializer, "Fn::Join", &(delimiter, parts))
            }
        }
    }
}

fn tagged<S: Serializer, V: Serialize + ?Sized>(
    serializer: S,
    tag: &'static str,
    value: &V,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(tag, value)?;
    map.end()
}

impl From<&str> for CfnValue {
    fn from(value: &str) -> Self {
        CfnValue::Str(value.to_string())
    }
}

impl From<String> for CfnValue {
    fn from(value: String) -> Self {
        CfnValue::Str(value)
    }
}

impl From<&String> for CfnValue {
    fn from(value: &String) -> Self {
        CfnValue::Str(value.clone())
    }
}

impl From<i64> for CfnValue {
    fn from(value: i64) -> Self {
        CfnValue::Int(value)
    }
}

impl From<u32> for CfnValue {
    fn from(value: u32) -> Self {
        CfnValue::Int(i64::from(value))
    }
}

impl From<u16> for CfnValue {
    fn from(value: u16) -> Self {
        CfnValue::Int(i64::from(value))
    }
}

impl From<bool> for CfnValue {
    fn from(value: bool) -> Self {
        CfnValue::Bool(value)
    }
}

impl From<Vec<CfnValue>> for CfnValue {
    fn from(items: Vec<CfnValue>) -> Self {
        CfnValue::List(items)
    }
}

impl From<Props> for CfnValue {
    fn from(props: Props) -> Self {
        CfnValue::Object(props)
    }
}
