//! Configuration validation. Structural problems fail fast here; values that
//! are placeholders by convention (`<>`) pass with a warning, since synthesis
//! itself never talks to AWS.

use crate::AppConfig;
use anyhow::{bail, Result};
use tracing::warn;

pub fn validate(config: &AppConfig) -> Result<()> {
    if config.environment.name.is_empty() {
        bail!("environment.name must not be empty; it prefixes every export key");
    }
    if config.environment.region.is_empty() {
        bail!("environment.region must not be empty");
    }
    if config.environment.account.is_empty() {
        bail!("environment.account must not be empty");
    }
    if config.network.isolated_subnet_ids.is_empty() {
        bail!("network.isolated_subnet_ids must list at least one subnet for the service");
    }
    if config.network.availability_zones.is_empty() {
        bail!("network.availability_zones must not be empty");
    }
    if config.service.cluster_name.is_empty() {
        bail!("service.cluster_name must not be empty");
    }
    if config.service.image_uri.is_empty() {
        bail!("service.image_uri must not be empty");
    }
    if config.pipeline.repository.is_empty() {
        bail!("pipeline.repository must not be empty");
    }
    if config.pipeline.branch.is_empty() {
        bail!("pipeline.branch must not be empty");
    }

    let promotion = &config.pipeline.promotion;
    if promotion.enabled {
        if !promotion.notify_email.contains('@') {
            bail!(
                "pipeline.promotion.notify_email `{}` is not an email address",
                promotion.notify_email
            );
        }
        if promotion.qa.is_none() {
            bail!("pipeline.promotion.enabled is set but [pipeline.promotion.qa] is missing");
        }
        if promotion.staging.is_none() {
            bail!("pipeline.promotion.enabled is set but [pipeline.promotion.staging] is missing");
        }
    }

    if config.environment.account == "<>" {
        warn!("environment.account is the placeholder `<>`; templates stay deployable but policies will name no real account");
    }

    Ok(())
}
