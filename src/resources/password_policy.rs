//! `pingone_password_policy`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{body, decode, env_path, finish, required, unwrap_single, Resource};
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::ImportComponent;
use crate::schema::{Attribute, Block, NestedBlock, PlanModifier, Schema, Validator};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const NUMERIC: &str = "0123456789";
const SPECIAL: &str = "~!@#$%^&*()-_=+[]{}|;:,.<>/?";

state_model! {
    /// Password reuse limits.
    pub struct PasswordHistoryModel {
        prior_password_count: TriState<i64>,
        retention_days: TriState<i64>,
    }
}

state_model! {
    /// Password length limits.
    pub struct PasswordLengthModel {
        min: TriState<i64>,
        max: TriState<i64>,
    }
}

state_model! {
    /// Lockout after repeated failures.
    pub struct AccountLockoutModel {
        duration_seconds: TriState<i64>,
        fail_count: TriState<i64>,
    }
}

state_model! {
    /// Minimum occurrences of each character class.
    pub struct MinCharactersModel {
        alphabetical_uppercase: TriState<i64>,
        alphabetical_lowercase: TriState<i64>,
        numeric: TriState<i64>,
        special_characters: TriState<i64>,
    }
}

state_model! {
    /// State of a password policy.
    pub struct PasswordPolicyModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        environment_default: TriState<bool>,
        bypass_policy: TriState<bool>,
        exclude_commonly_used_passwords: TriState<bool>,
        exclude_profile_data: TriState<bool>,
        not_similar_to_current: TriState<bool>,
        password_history: TriState<PasswordHistoryModel>,
        password_length: TriState<PasswordLengthModel>,
        account_lockout: TriState<AccountLockoutModel>,
        min_characters: TriState<MinCharactersModel>,
        password_age_max: TriState<i64>,
        password_age_min: TriState<i64>,
        max_repeated_characters: TriState<i64>,
        min_complexity: TriState<i64>,
        min_unique_characters: TriState<i64>,
        population_count: TriState<i64>,
    }
}

/// Password history on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_days: Option<i64>,
}

/// Password length on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Length {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

/// Account lockout on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Lockout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<i64>,
}

/// Character classes keyed by the characters they contain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct MinCharacters {
    #[serde(rename = "ABCDEFGHIJKLMNOPQRSTUVWXYZ", default, skip_serializing_if = "Option::is_none")]
    pub uppercase: Option<i64>,
    #[serde(rename = "abcdefghijklmnopqrstuvwxyz", default, skip_serializing_if = "Option::is_none")]
    pub lowercase: Option<i64>,
    #[serde(rename = "0123456789", default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<i64>,
    #[serde(rename = "~!@#$%^&*()-_=+[]{}|;:,.<>/?", default, skip_serializing_if = "Option::is_none")]
    pub special: Option<i64>,
}

/// A password policy as the API sends and receives it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PasswordPolicy {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub bypass_policy: bool,
    #[serde(default)]
    pub excludes_commonly_used: bool,
    #[serde(default)]
    pub excludes_profile_data: bool,
    #[serde(default)]
    pub not_similar_to_current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<History>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Length>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockout: Option<Lockout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_characters: Option<MinCharacters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_age_days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_repeated_characters: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_complexity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_unique_characters: Option<i64>,
    #[serde(default, skip_serializing)]
    pub population_count: Option<i64>,
}

impl PasswordPolicyModel {
    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<PasswordPolicy> {
        let set = |v: &TriState<bool>| v.cloned_known().unwrap_or(false);
        Some(PasswordPolicy {
            id: None,
            name: required(self.name.as_deref(), "name", diagnostics)?,
            description: self.description.cloned_known(),
            default: set(&self.environment_default),
            bypass_policy: set(&self.bypass_policy),
            excludes_commonly_used: set(&self.exclude_commonly_used_passwords),
            excludes_profile_data: set(&self.exclude_profile_data),
            not_similar_to_current: set(&self.not_similar_to_current),
            history: self.password_history.known().map(|h| History {
                count: h.prior_password_count.cloned_known(),
                retention_days: h.retention_days.cloned_known(),
            }),
            length: self.password_length.known().map(|l| Length {
                min: l.min.cloned_known(),
                max: l.max.cloned_known(),
            }),
            lockout: self.account_lockout.known().map(|l| Lockout {
                duration_seconds: l.duration_seconds.cloned_known(),
                failure_count: l.fail_count.cloned_known(),
            }),
            min_characters: self.min_characters.known().map(|m| MinCharacters {
                uppercase: m.alphabetical_uppercase.cloned_known(),
                lowercase: m.alphabetical_lowercase.cloned_known(),
                numeric: m.numeric.cloned_known(),
                special: m.special_characters.cloned_known(),
            }),
            max_age_days: self.password_age_max.cloned_known(),
            min_age_days: self.password_age_min.cloned_known(),
            max_repeated_characters: self.max_repeated_characters.cloned_known(),
            min_complexity: self.min_complexity.cloned_known(),
            min_unique_characters: self.min_unique_characters.cloned_known(),
            population_count: None,
        })
    }

    fn flatten(environment_id: &str, policy: PasswordPolicy) -> Self {
        Self {
            id: policy.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(policy.name),
            description: policy.description.into(),
            environment_default: TriState::Known(policy.default),
            bypass_policy: TriState::Known(policy.bypass_policy),
            exclude_commonly_used_passwords: TriState::Known(policy.excludes_commonly_used),
            exclude_profile_data: TriState::Known(policy.excludes_profile_data),
            not_similar_to_current: TriState::Known(policy.not_similar_to_current),
            password_history: policy
                .history
                .map(|h| PasswordHistoryModel {
                    prior_password_count: h.count.into(),
                    retention_days: h.retention_days.into(),
                })
                .into(),
            password_length: policy
                .length
                .map(|l| PasswordLengthModel {
                    min: l.min.into(),
                    max: l.max.into(),
                })
                .into(),
            account_lockout: policy
                .lockout
                .map(|l| AccountLockoutModel {
                    duration_seconds: l.duration_seconds.into(),
                    fail_count: l.failure_count.into(),
                })
                .into(),
            min_characters: policy
                .min_characters
                .map(|m| MinCharactersModel {
                    alphabetical_uppercase: m.uppercase.into(),
                    alphabetical_lowercase: m.lowercase.into(),
                    numeric: m.numeric.into(),
                    special_characters: m.special.into(),
                })
                .into(),
            password_age_max: policy.max_age_days.into(),
            password_age_min: policy.min_age_days.into(),
            max_repeated_characters: policy.max_repeated_characters.into(),
            min_complexity: policy.min_complexity.into(),
            min_unique_characters: policy.min_unique_characters.into(),
            population_count: TriState::Known(policy.population_count.unwrap_or(0)),
        }
    }
}

fn character_count(characters: &str) -> Attribute {
    Attribute::optional_int64()
        .with_description(format!(
            "How many of `{}` must appear in the password. Fixed value of 1.",
            characters
        ))
        .with_validator(Validator::IntBetween { min: 1, max: 1 })
}

fn flag(description: &str) -> Attribute {
    Attribute::optional_bool()
        .with_description(description)
        .with_default(json!(false))
}

/// Handler for `pingone_password_policy`.
pub struct PasswordPolicyResource;

#[async_trait]
impl Resource for PasswordPolicyResource {
    fn type_name(&self) -> &'static str {
        "pingone_password_policy"
    }

    fn schema(&self) -> Schema {
        let at_least_one = || Attribute::optional_int64().with_validator(Validator::IntAtLeast(1));

        Schema::v1()
            .with_description("Resource to create and manage password policies in a PingOne environment.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the password policy in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the password policy.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "environment_default",
                flag("Whether this is the default policy of the environment."),
            )
            .with_attribute("bypass_policy", flag("Whether the policy is bypassed."))
            .with_attribute(
                "exclude_commonly_used_passwords",
                flag("Whether commonly used passwords are rejected."),
            )
            .with_attribute(
                "exclude_profile_data",
                flag("Whether passwords containing the user's profile data are rejected."),
            )
            .with_attribute(
                "not_similar_to_current",
                flag("Whether a new password must differ from the current one."),
            )
            .with_block(
                "password_history",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "prior_password_count",
                            at_least_one().with_description("How many prior passwords to remember."),
                        )
                        .with_attribute(
                            "retention_days",
                            at_least_one().with_description("How long prior passwords are remembered."),
                        ),
                ),
            )
            .with_block(
                "password_length",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "min",
                            Attribute::optional_int64()
                                .with_description("The minimum password length.")
                                .with_validator(Validator::IntBetween { min: 8, max: 255 }),
                        )
                        .with_attribute(
                            "max",
                            Attribute::optional_int64()
                                .with_description("The maximum password length.")
                                .with_validator(Validator::IntBetween { min: 255, max: 255 }),
                        ),
                ),
            )
            .with_block(
                "account_lockout",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("duration_seconds", at_least_one())
                        .with_attribute(
                            "fail_count",
                            at_least_one().with_description("Failed attempts before the account is locked."),
                        ),
                ),
            )
            .with_block(
                "min_characters",
                NestedBlock::single(
                    Block::new()
                        .with_attribute("alphabetical_uppercase", character_count(UPPERCASE))
                        .with_attribute("alphabetical_lowercase", character_count(LOWERCASE))
                        .with_attribute("numeric", character_count(NUMERIC))
                        .with_attribute("special_characters", character_count(SPECIAL)),
                ),
            )
            .with_attribute("password_age_max", at_least_one())
            .with_attribute("password_age_min", at_least_one())
            .with_attribute("max_repeated_characters", Attribute::optional_int64())
            .with_attribute("min_complexity", Attribute::optional_int64())
            .with_attribute("min_unique_characters", Attribute::optional_int64())
            .with_attribute(
                "population_count",
                Attribute::computed_int64().with_plan_modifier(PlanModifier::UseStateForUnknown),
            )
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("password_policy_id").primary(),
        ]
    }

    fn upgrade_state(&self, version: u64, mut state: Value) -> Result<Value, Diagnostic> {
        match version {
            0 => {
                let Some(object) = state.as_object_mut() else {
                    return Err(Diagnostic::error("Unable to upgrade resource state")
                        .with_detail("The stored pingone_password_policy state is not an object."));
                };
                for key in ["password_history", "password_length", "account_lockout", "min_characters"] {
                    unwrap_single(object, key);
                }
                unwrap_single(object, "password_age");
                let age = object.remove("password_age").unwrap_or(Value::Null);
                object.insert("password_age_max".to_string(), age.get("max").cloned().unwrap_or(Value::Null));
                object.insert("password_age_min".to_string(), age.get("min").cloned().unwrap_or(Value::Null));
                Ok(state)
            },
            1 => Ok(state),
            other => Err(Diagnostic::error("Unable to upgrade resource state")
                .with_detail(format!("pingone_password_policy has no upgrade from schema version {}.", other))),
        }
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PasswordPolicyModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|p| body(&p, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) =
            ApiCall::post("CreatePasswordPolicy", env_path(&environment_id, "passwordPolicies"))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .with_retryable(&DefaultCreateRead)
                .send::<PasswordPolicy>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(created.map(|p| PasswordPolicyModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PasswordPolicyModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (policy, call_diagnostics) = ApiCall::get(
            "ReadOnePasswordPolicy",
            env_path(&environment_id, &format!("passwordPolicies/{}", id)),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<PasswordPolicy>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(policy.map(|p| PasswordPolicyModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<PasswordPolicyModel>(plan, &mut diagnostics),
            decode::<PasswordPolicyModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|p| body(&p, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::put(
            "UpdatePasswordPolicy",
            env_path(&environment_id, &format!("passwordPolicies/{}", id)),
        )
        .with_body(request)
        .with_classifier(&InvalidValue)
        .send::<PasswordPolicy>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(updated.map(|p| PasswordPolicyModel::flatten(&environment_id, p)), diagnostics)
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<PasswordPolicyModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) = ApiCall::delete(
            "DeletePasswordPolicy",
            env_path(&environment_id, &format!("passwordPolicies/{}", id)),
        )
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}
