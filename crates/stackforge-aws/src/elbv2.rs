//! Application load balancer references.

use crate::ec2::SecurityGroupRef;
use stackforge_core::CfnValue;

/// An existing ALB listener bound by attributes. The listener itself lives in
/// the network stack; this app only holds the reference and the security
/// group that fronts it.
#[derive(Debug, Clone)]
pub struct ApplicationListenerRef {
    listener_arn: CfnValue,
    security_group: SecurityGroupRef,
}

impl ApplicationListenerRef {
    pub fn from_attributes(listener_arn: CfnValue, security_group: SecurityGroupRef) -> Self {
        ApplicationListenerRef {
            listener_arn,
            security_group,
        }
    }

    pub fn listener_arn(&self) -> CfnValue {
        self.listener_arn.clone()
    }

    pub fn security_group(&self) -> &SecurityGroupRef {
        &self.security_group
    }
}
