//! Cross-stack export lookup.
//!
//! The network stacks that publish load balancer and security group ids are
//! deployed separately from this app. Their `Export` names and current values
//! are registered here up front, so a stack that consumes one either gets a
//! [`ResolvedExport`] or a [`SynthError::MissingExport`] at synthesis time
//! instead of a deploy-time failure inside CloudFormation.

use crate::error::SynthError;
use stackforge_core::CfnValue;
use std::collections::BTreeMap;

/// Registry of export name to currently published value.
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    exports: BTreeMap<String, String>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.exports.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    /// Look up an export by name. The name must have been registered even
    /// though templates bind to it by name only; a missing entry means the
    /// producing stack is not deployed in the target environment.
    pub fn resolve(&self, name: &str) -> Result<ResolvedExport, SynthError> {
        match self.exports.get(name) {
            Some(value) => Ok(ResolvedExport {
                name: name.to_string(),
                value: value.clone(),
            }),
            None => Err(SynthError::MissingExport {
                name: name.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExportRegistry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut registry = ExportRegistry::new();
        for (name, value) in iter {
            registry.register(name, value);
        }
        registry
    }
}

/// An export that was present in the registry at synthesis time.
///
/// Templates reference the export by name via `Fn::ImportValue`, so the
/// rendered document stays valid when the published value changes. The
/// resolved value is kept for validation and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExport {
    name: String,
    value: String,
}

impl ResolvedExport {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The intrinsic a template embeds to consume this export.
    pub fn import_value(&self) -> CfnValue {
        CfnValue::import_value(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_returns_registered_value() {
        let mut registry = ExportRegistry::new();
        registry.register("dev-SafeListenerApi", "arn:aws:elasticloadbalancing:us-west-2:111122223333:listener/app/x/y/z");

        let export = registry.resolve("dev-SafeListenerApi").unwrap();
        assert_eq!(export.name(), "dev-SafeListenerApi");
        assert!(export.value().starts_with("arn:aws:elasticloadbalancing"));
    }

    #[test]
    fn resolve_missing_export_names_the_key() {
        let registry = ExportRegistry::new();
        let err = registry.resolve("dev-SafeFargateSecurityGroup").unwrap_err();
        match err {
            SynthError::MissingExport { name } => {
                assert_eq!(name, "dev-SafeFargateSecurityGroup");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn import_value_binds_by_name_not_value() {
        let registry: ExportRegistry = [("dev-SafeFargateSecurityGroup", "sg-0abc")].into_iter().collect();
        let export = registry.resolve("dev-SafeFargateSecurityGroup").unwrap();

        let rendered = serde_json::to_value(export.import_value()).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({"Fn::ImportValue": "dev-SafeFargateSecurityGroup"})
        );
    }
}
