//! Template documents: parameters, resources and their JSON rendering.

use crate::value::{CfnValue, Props};
use serde::Serialize;
use std::collections::BTreeMap;

const FORMAT_VERSION: &str = "2010-09-09";

/// Deletion and update-replace behavior for a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeletionPolicy {
    Delete,
    Retain,
}

/// A declared template parameter.
///
/// Every parameter in this project is a `String`; overrides supplied at
/// deploy time must name one of these.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    #[serde(rename = "Type")]
    param_type: String,
    #[serde(rename = "Default", skip_serializing_if = "Option::is_none")]
    default: Option<CfnValue>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl Parameter {
    pub fn string() -> Self {
        Parameter {
            param_type: "String".to_string(),
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<CfnValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(&self) -> Option<&CfnValue> {
        self.default.as_ref()
    }
}

/// A single declared resource.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(rename = "Properties", skip_serializing_if = "Props::is_empty")]
    properties: Props,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    depends_on: Vec<String>,
    #[serde(rename = "DeletionPolicy", skip_serializing_if = "Option::is_none")]
    deletion_policy: Option<DeletionPolicy>,
    #[serde(rename = "UpdateReplacePolicy", skip_serializing_if = "Option::is_none")]
    update_replace_policy: Option<DeletionPolicy>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, properties: Props) -> Self {
        Resource {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        }
    }

    /// Apply one removal policy to both deletion and update-replace.
    pub fn with_removal_policy(mut self, policy: DeletionPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    pub fn with_depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &Props {
        &self.properties
    }

    pub fn removal_policy(&self) -> Option<DeletionPolicy> {
        self.deletion_policy
    }
}

/// A whole CloudFormation template.
///
/// Sections are `BTreeMap`s so repeated synthesis of the same declarations
/// produces byte-identical documents.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "Parameters", skip_serializing_if = "BTreeMap::is_empty")]
    parameters: BTreeMap<String, Parameter>,
    #[serde(rename = "Resources")]
    resources: BTreeMap<String, Resource>,
}

impl Template {
    pub fn new() -> Self {
        Template {
            format_version: FORMAT_VERSION.to_string(),
            description: None,
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Insert a parameter, returning any previous declaration under the id.
    pub fn insert_parameter(&mut self, logical_id: impl Into<String>, parameter: Parameter) -> Option<Parameter> {
        self.parameters.insert(logical_id.into(), parameter)
    }

    /// Insert a resource, returning any previous declaration under the id.
    pub fn insert_resource(&mut self, logical_id: impl Into<String>, resource: Resource) -> Option<Resource> {
        self.resources.insert(logical_id.into(), resource)
    }

    pub fn parameter(&self, logical_id: &str) -> Option<&Parameter> {
        self.parameters.get(logical_id)
    }

    pub fn has_parameter(&self, logical_id: &str) -> bool {
        self.parameters.contains_key(logical_id)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&String, &Resource)> {
        self.resources.iter()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Render the template as pretty-printed JSON, the on-disk form the
    /// deployment service consumes.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}
