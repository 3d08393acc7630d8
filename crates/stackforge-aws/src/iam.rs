//! IAM principals, policy documents and roles.

use stackforge_core::{pseudo, Arn, ArnError, CfnValue, Props, Resource};

/// Who may assume a role or act through a resource policy.
#[derive(Debug, Clone)]
pub enum Principal {
    /// An AWS service, e.g. `ecs-tasks.amazonaws.com`.
    Service(String),
    /// Every identity in an account, rendered as the account root ARN.
    Account(String),
}

impl Principal {
    pub fn service(name: impl Into<String>) -> Self {
        Principal::Service(name.into())
    }

    pub fn account(account_id: impl Into<String>) -> Self {
        Principal::Account(account_id.into())
    }

    fn key(&self) -> &'static str {
        match self {
            Principal::Service(_) => "Service",
            Principal::Account(_) => "AWS",
        }
    }

    fn to_value(&self) -> CfnValue {
        match self {
            Principal::Service(name) => CfnValue::string(name),
            Principal::Account(account) => CfnValue::concat(vec![
                "arn:".into(),
                CfnValue::ref_to(pseudo::PARTITION),
                ":iam::".into(),
                account.as_str().into(),
                ":root".into(),
            ]),
        }
    }
}

/// One allow statement. Single-element action/resource lists collapse to a
/// scalar in the rendered document, matching how the deployment service
/// normalizes policies.
#[derive(Debug, Clone, Default)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<CfnValue>,
    principals: Vec<Principal>,
}

impl PolicyStatement {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn resource(mut self, resource: impl Into<CfnValue>) -> Self {
        self.resources.push(resource.into());
        self
    }

    pub fn resources<I, V>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CfnValue>,
    {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn principal(mut self, principal: Principal) -> Self {
        self.principals.push(principal);
        self
    }

    pub fn to_value(&self) -> CfnValue {
        let mut props = Props::new()
            .set("Action", scalar_or_list(self.actions.iter().map(CfnValue::string).collect()))
            .set("Effect", "Allow");
        if !self.principals.is_empty() {
            props = props.set("Principal", self.principal_map());
        }
        if !self.resources.is_empty() {
            props = props.set("Resource", scalar_or_list(self.resources.clone()));
        }
        props.into()
    }

    // Principals sharing a key ("AWS", "Service") merge into one entry.
    fn principal_map(&self) -> Props {
        let mut grouped: Vec<(&'static str, Vec<CfnValue>)> = Vec::new();
        for principal in &self.principals {
            let key = principal.key();
            match grouped.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(principal.to_value()),
                None => grouped.push((key, vec![principal.to_value()])),
            }
        }
        let mut map = Props::new();
        for (key, values) in grouped {
            map.insert(key, scalar_or_list(values));
        }
        map
    }
}

fn scalar_or_list(mut values: Vec<CfnValue>) -> CfnValue {
    if values.len() == 1 {
        values.remove(0)
    } else {
        CfnValue::List(values)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(statements: Vec<PolicyStatement>) -> Self {
        PolicyDocument { statements }
    }

    pub fn push(&mut self, statement: PolicyStatement) {
        self.statements.push(statement);
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn to_value(&self) -> CfnValue {
        Props::new()
            .set(
                "Statement",
                CfnValue::List(self.statements.iter().map(PolicyStatement::to_value).collect()),
            )
            .set("Version", "2012-10-17")
            .into()
    }
}

/// ARN of an AWS-managed policy: `arn:<partition>:iam::aws:policy/<name>`.
pub fn aws_managed_policy(name: &str) -> CfnValue {
    CfnValue::concat(vec![
        "arn:".into(),
        CfnValue::ref_to(pseudo::PARTITION),
        ":iam::aws:policy/".into(),
        name.into(),
    ])
}

/// A role declared by this template.
#[derive(Debug, Clone)]
pub struct Role {
    assumed_by: Principal,
    managed_policy_arns: Vec<CfnValue>,
}

impl Role {
    pub fn assumed_by(principal: Principal) -> Self {
        Role {
            assumed_by: principal,
            managed_policy_arns: Vec::new(),
        }
    }

    pub fn with_managed_policy(mut self, policy_arn: CfnValue) -> Self {
        self.managed_policy_arns.push(policy_arn);
        self
    }

    pub fn into_resource(self) -> Resource {
        let assume_document = PolicyDocument::new(vec![PolicyStatement::allow()
            .action("sts:AssumeRole")
            .principal(self.assumed_by)]);
        let mut props = Props::new().set("AssumeRolePolicyDocument", assume_document.to_value());
        if !self.managed_policy_arns.is_empty() {
            props = props.set("ManagedPolicyArns", CfnValue::List(self.managed_policy_arns));
        }
        Resource::new("AWS::IAM::Role", props)
    }
}

/// `AWS::IAM::Policy` attaching an inline document to declared roles.
pub fn inline_policy(policy_name: &str, document: &PolicyDocument, role_refs: Vec<CfnValue>) -> Resource {
    Resource::new(
        "AWS::IAM::Policy",
        Props::new()
            .set("PolicyDocument", document.to_value())
            .set("PolicyName", policy_name)
            .set("Roles", CfnValue::List(role_refs)),
    )
}

/// A role the stack consumes: either an existing one bound by ARN (no
/// resource emitted, never mutated) or one declared in this template.
#[derive(Debug, Clone)]
pub enum RoleReference {
    Imported(Arn),
    Declared { logical_id: String },
}

impl RoleReference {
    pub fn imported(role_arn: &str) -> Result<Self, ArnError> {
        Ok(RoleReference::Imported(Arn::parse(role_arn)?))
    }

    pub fn declared(logical_id: impl Into<String>) -> Self {
        RoleReference::Declared {
            logical_id: logical_id.into(),
        }
    }

    pub fn is_imported(&self) -> bool {
        matches!(self, RoleReference::Imported(_))
    }

    pub fn arn_value(&self) -> CfnValue {
        match self {
            RoleReference::Imported(arn) => CfnValue::string(arn.as_str()),
            RoleReference::Declared { logical_id } => CfnValue::get_att(logical_id, "Arn"),
        }
    }
}
