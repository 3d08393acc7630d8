//! Amazon Resource Name parsing.
//!
//! Role bindings arrive as raw strings from configuration; malformed ones
//! must fail synthesis immediately rather than surface at deploy time.

use std::fmt;
use thiserror::Error;

/// A structurally validated ARN.
///
/// Validation is shape-only: `arn:<partition>:<service>:<region>:<account>:
/// <resource>`, where region and account may be empty (IAM ARNs have no
/// region) and placeholder account ids are accepted. No existence check is
/// performed; that belongs to the deployment service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arn {
    raw: String,
    partition: String,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl Arn {
    pub fn parse(input: &str) -> Result<Self, ArnError> {
        let mut sections = input.splitn(6, ':');

        let prefix = sections.next().unwrap_or_default();
        if prefix != "arn" {
            return Err(ArnError::MissingPrefix {
                input: input.to_string(),
            });
        }

        let partition = sections.next();
        let service = sections.next();
        let region = sections.next();
        let account = sections.next();
        let resource = sections.next();

        let (partition, service, region, account, resource) =
            match (partition, service, region, account, resource) {
                (Some(p), Some(s), Some(r), Some(a), Some(res)) => (p, s, r, a, res),
                _ => {
                    return Err(ArnError::TooFewSections {
                        input: input.to_string(),
                    })
                }
            };

        for (section, value) in [
            ("partition", partition),
            ("service", service),
            ("resource", resource),
        ] {
            if value.is_empty() {
                return Err(ArnError::EmptySection {
                    section,
                    input: input.to_string(),
                });
            }
        }

        Ok(Arn {
            raw: input.to_string(),
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArnError {
    #[error("ARN must start with 'arn:': '{input}'")]
    MissingPrefix { input: String },

    #[error("ARN has too few sections (expected arn:partition:service:region:account:resource): '{input}'")]
    TooFewSections { input: String },

    #[error("ARN {section} must not be empty: '{input}'")]
    EmptySection {
        section: &'static str,
        input: String,
    },
}
