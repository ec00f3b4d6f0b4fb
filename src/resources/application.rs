//! `pingone_application`, an OIDC, SAML or external link application.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{
    body, decode, env_path, expand_icon, finish, flatten_icon, icon_block, required, Icon, IconModel, ObjectRef,
    Resource,
};
use crate::bridge::{select_variant, string_set};
use crate::client::{ApiCall, DefaultCreateRead, InvalidValue, NotFoundWarning, RequestContext};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::import::ImportComponent;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, BlockValidator, NestedBlock, PlanModifier, Schema, Validator,
};
use crate::state_model;
use crate::types::ApplyResult;
use crate::value::TriState;

const OPENID_CONNECT: &str = "OPENID_CONNECT";
const SAML: &str = "SAML";
const EXTERNAL_LINK: &str = "EXTERNAL_LINK";

/// Application types created by PingOne itself.
const SYSTEM_TYPES: &[&str] = &["PING_ONE_PORTAL", "PING_ONE_SELF_SERVICE", "PING_ONE_ADMIN_CONSOLE"];

const OIDC_TYPES: &[&str] = &["WEB_APP", "NATIVE_APP", "SINGLE_PAGE_APP", "WORKER", "SERVICE", "CUSTOM_APP"];
const GRANT_TYPES: &[&str] = &["AUTHORIZATION_CODE", "IMPLICIT", "REFRESH_TOKEN", "CLIENT_CREDENTIALS", "DEVICE_CODE"];
const RESPONSE_TYPES: &[&str] = &["TOKEN", "ID_TOKEN", "CODE"];
const TOKEN_AUTH_METHODS: &[&str] = &[
    "NONE",
    "CLIENT_SECRET_BASIC",
    "CLIENT_SECRET_POST",
    "CLIENT_SECRET_JWT",
    "PRIVATE_KEY_JWT",
];
const ENFORCEMENT: &[&str] = &["OPTIONAL", "REQUIRED"];

/// Which kind of application a response describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationVariant {
    /// OpenID Connect client.
    Oidc,
    /// SAML service provider.
    Saml,
    /// A link shown in the application portal.
    ExternalLink,
    /// Built-in PingOne application.
    System,
}

impl ApplicationVariant {
    /// Classify by wire `protocol` and `type`.
    pub fn of(protocol: &str, kind: &str) -> Self {
        if SYSTEM_TYPES.contains(&kind) {
            return Self::System;
        }
        match protocol {
            SAML => Self::Saml,
            EXTERNAL_LINK => Self::ExternalLink,
            _ => Self::Oidc,
        }
    }
}

state_model! {
    /// Who may sign on to the application.
    pub struct AccessControlGroupOptionsModel {
        #[attr = "type"]
        kind: TriState<String>,
        groups: TriState<Vec<String>>,
    }
}

state_model! {
    /// OpenID Connect settings.
    pub struct OidcOptionsModel {
        #[attr = "type"]
        kind: TriState<String>,
        grant_types: TriState<Vec<String>>,
        response_types: TriState<Vec<String>>,
        token_endpoint_auth_method: TriState<String>,
        home_page_url: TriState<String>,
        initiate_login_uri: TriState<String>,
        target_link_uri: TriState<String>,
        redirect_uris: TriState<Vec<String>>,
        post_logout_redirect_uris: TriState<Vec<String>>,
        pkce_enforcement: TriState<String>,
        par_requirement: TriState<String>,
        par_timeout: TriState<i64>,
        refresh_token_duration: TriState<i64>,
        refresh_token_rolling_duration: TriState<i64>,
        jwks: TriState<String>,
        jwks_url: TriState<String>,
        allow_wildcard_in_redirect_uris: TriState<bool>,
        client_id: TriState<String>,
    }
}

state_model! {
    /// Key used to sign assertions.
    pub struct IdpSigningKeyModel {
        algorithm: TriState<String>,
        key_id: TriState<String>,
    }
}

state_model! {
    /// Verification of signed authentication requests.
    pub struct SpVerificationModel {
        authn_request_signed: TriState<bool>,
        certificate_ids: TriState<Vec<String>>,
    }
}

state_model! {
    /// SAML settings.
    pub struct SamlOptionsModel {
        #[attr = "type"]
        kind: TriState<String>,
        acs_urls: TriState<Vec<String>>,
        assertion_duration: TriState<i64>,
        sp_entity_id: TriState<String>,
        assertion_signed_enabled: TriState<bool>,
        response_is_signed: TriState<bool>,
        nameid_format: TriState<String>,
        home_page_url: TriState<String>,
        default_target_url: TriState<String>,
        slo_binding: TriState<String>,
        slo_endpoint: TriState<String>,
        slo_response_endpoint: TriState<String>,
        slo_window: TriState<i64>,
        idp_signing_key: TriState<IdpSigningKeyModel>,
        sp_verification: TriState<SpVerificationModel>,
    }
}

state_model! {
    /// External link settings.
    pub struct ExternalLinkOptionsModel {
        home_page_url: TriState<String>,
    }
}

state_model! {
    /// State of an application.
    pub struct ApplicationModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        enabled: TriState<bool>,
        tags: TriState<Vec<String>>,
        login_page_url: TriState<String>,
        hidden_from_app_portal: TriState<bool>,
        access_control_role_type: TriState<String>,
        icon: TriState<IconModel>,
        access_control_group_options: TriState<AccessControlGroupOptionsModel>,
        oidc_options: TriState<OidcOptionsModel>,
        saml_options: TriState<SamlOptionsModel>,
        external_link_options: TriState<ExternalLinkOptionsModel>,
    }
}

/// A `{type}` wrapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct TypeRef {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Group membership requirement on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct GroupAccess {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub groups: Vec<ObjectRef>,
}

/// Access control on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AccessControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<TypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupAccess>,
}

/// Assertion signing on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct IdpSigning {
    pub key: ObjectRef,
    pub algorithm: String,
}

/// Request verification on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SpVerification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authn_request_signed: Option<bool>,
    #[serde(default)]
    pub certificates: Vec<ObjectRef>,
}

/// An application as the API sends and receives it.
///
/// `protocol` and `type` select which of the remaining fields are meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct ApplicationDto {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    pub protocol: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_from_app_portal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<AccessControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiate_login_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce_enforcement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub par_requirement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub par_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_rolling_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_wildcard_in_redirect_uris: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acs_urls: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_id_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_response_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_window: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_signing: Option<IdpSigning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_verification: Option<SpVerification>,
}

impl ApplicationDto {
    /// The variant this application belongs to.
    pub fn variant(&self) -> ApplicationVariant {
        ApplicationVariant::of(&self.protocol, &self.kind)
    }
}

fn sorted(values: Option<Vec<String>>) -> TriState<Vec<String>> {
    string_set(values.into()).into()
}

fn refs(ids: &TriState<Vec<String>>) -> Vec<ObjectRef> {
    string_set(ids.clone())
        .unwrap_or_default()
        .into_iter()
        .map(ObjectRef::new)
        .collect()
}

impl ApplicationModel {
    fn variant_candidates(&self) -> [(&'static str, bool); 3] {
        [
            ("oidc_options", self.oidc_options.is_known()),
            ("saml_options", self.saml_options.is_known()),
            ("external_link_options", self.external_link_options.is_known()),
        ]
    }

    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<ApplicationDto> {
        let name = required(self.name.as_deref(), "name", diagnostics)?;
        let variant = match select_variant(&self.variant_candidates()) {
            Ok(variant) => variant,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return None;
            },
        };

        let role = self.access_control_role_type.cloned_known().map(|kind| TypeRef { kind });
        let group = self.access_control_group_options.known().and_then(|g| {
            Some(GroupAccess {
                kind: g.kind.cloned_known()?,
                groups: refs(&g.groups),
            })
        });

        let mut dto = ApplicationDto {
            name,
            description: self.description.cloned_known(),
            enabled: self.enabled.cloned_known().unwrap_or(false),
            tags: string_set(self.tags.clone()),
            login_page_url: self.login_page_url.cloned_known(),
            hidden_from_app_portal: self.hidden_from_app_portal.cloned_known(),
            access_control: (role.is_some() || group.is_some()).then_some(AccessControl { role, group }),
            icon: expand_icon(&self.icon),
            ..Default::default()
        };

        match variant {
            "oidc_options" => {
                let oidc = self.oidc_options.known()?;
                dto.protocol = OPENID_CONNECT.to_string();
                dto.kind = required(oidc.kind.as_deref(), "oidc_options.type", diagnostics)?;
                dto.grant_types = string_set(oidc.grant_types.clone());
                dto.response_types = string_set(oidc.response_types.clone());
                dto.token_endpoint_auth_method = oidc.token_endpoint_auth_method.cloned_known();
                dto.home_page_url = oidc.home_page_url.cloned_known();
                dto.initiate_login_uri = oidc.initiate_login_uri.cloned_known();
                dto.target_link_uri = oidc.target_link_uri.cloned_known();
                dto.redirect_uris = string_set(oidc.redirect_uris.clone());
                dto.post_logout_redirect_uris = string_set(oidc.post_logout_redirect_uris.clone());
                dto.pkce_enforcement = oidc.pkce_enforcement.cloned_known();
                dto.par_requirement = oidc.par_requirement.cloned_known();
                dto.par_timeout = oidc.par_timeout.cloned_known();
                dto.refresh_token_duration = oidc.refresh_token_duration.cloned_known();
                dto.refresh_token_rolling_duration = oidc.refresh_token_rolling_duration.cloned_known();
                dto.jwks = oidc.jwks.cloned_known();
                dto.jwks_url = oidc.jwks_url.cloned_known();
                dto.allow_wildcard_in_redirect_uris = oidc.allow_wildcard_in_redirect_uris.cloned_known();
            },
            "saml_options" => {
                let saml = self.saml_options.known()?;
                dto.protocol = SAML.to_string();
                dto.kind = saml.kind.cloned_known().unwrap_or_else(|| "WEB_APP".to_string());
                dto.acs_urls = string_set(saml.acs_urls.clone());
                dto.assertion_duration = saml.assertion_duration.cloned_known();
                dto.sp_entity_id = saml.sp_entity_id.cloned_known();
                dto.assertion_signed = saml.assertion_signed_enabled.cloned_known();
                dto.response_signed = saml.response_is_signed.cloned_known();
                dto.name_id_format = saml.nameid_format.cloned_known();
                dto.home_page_url = saml.home_page_url.cloned_known();
                dto.default_target_url = saml.default_target_url.cloned_known();
                dto.slo_binding = saml.slo_binding.cloned_known();
                dto.slo_endpoint = saml.slo_endpoint.cloned_known();
                dto.slo_response_endpoint = saml.slo_response_endpoint.cloned_known();
                dto.slo_window = saml.slo_window.cloned_known();
                dto.idp_signing = saml.idp_signing_key.known().and_then(|k| {
                    Some(IdpSigning {
                        key: ObjectRef::new(k.key_id.cloned_known()?),
                        algorithm: k.algorithm.cloned_known()?,
                    })
                });
                dto.sp_verification = saml.sp_verification.known().map(|v| SpVerification {
                    authn_request_signed: v.authn_request_signed.cloned_known(),
                    certificates: refs(&v.certificate_ids),
                });
            },
            _ => {
                let link = self.external_link_options.known()?;
                dto.protocol = EXTERNAL_LINK.to_string();
                dto.kind = "PORTAL_LINK_APP".to_string();
                dto.home_page_url = Some(required(link.home_page_url.as_deref(), "external_link_options.home_page_url", diagnostics)?);
            },
        }
        Some(dto)
    }

    /// Build state from an API response.
    ///
    /// Only the block matching the response's variant is set. Built-in
    /// applications set none.
    pub fn flatten(environment_id: &str, app: ApplicationDto) -> Self {
        let variant = app.variant();
        let (role, group) = match app.access_control {
            Some(access) => (access.role, access.group),
            None => (None, None),
        };
        let mut model = Self {
            id: app.id.clone().into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(app.name),
            description: app.description.into(),
            enabled: TriState::Known(app.enabled),
            tags: sorted(app.tags),
            login_page_url: app.login_page_url.into(),
            hidden_from_app_portal: TriState::Known(app.hidden_from_app_portal.unwrap_or(false)),
            access_control_role_type: role.map(|r| r.kind).into(),
            icon: flatten_icon(app.icon),
            access_control_group_options: group
                .map(|g| AccessControlGroupOptionsModel {
                    kind: TriState::Known(g.kind),
                    groups: sorted(Some(g.groups.into_iter().map(|r| r.id).collect())),
                })
                .into(),
            ..Default::default()
        };

        match variant {
            ApplicationVariant::Oidc => {
                model.oidc_options = TriState::Known(OidcOptionsModel {
                    kind: TriState::Known(app.kind),
                    grant_types: sorted(app.grant_types),
                    response_types: sorted(app.response_types),
                    token_endpoint_auth_method: app.token_endpoint_auth_method.into(),
                    home_page_url: app.home_page_url.into(),
                    initiate_login_uri: app.initiate_login_uri.into(),
                    target_link_uri: app.target_link_uri.into(),
                    redirect_uris: sorted(app.redirect_uris),
                    post_logout_redirect_uris: sorted(app.post_logout_redirect_uris),
                    pkce_enforcement: app.pkce_enforcement.into(),
                    par_requirement: app.par_requirement.into(),
                    par_timeout: app.par_timeout.into(),
                    refresh_token_duration: app.refresh_token_duration.into(),
                    refresh_token_rolling_duration: app.refresh_token_rolling_duration.into(),
                    jwks: app.jwks.into(),
                    jwks_url: app.jwks_url.into(),
                    allow_wildcard_in_redirect_uris: TriState::Known(
                        app.allow_wildcard_in_redirect_uris.unwrap_or(false),
                    ),
                    client_id: app.id.into(),
                });
            },
            ApplicationVariant::Saml => {
                model.saml_options = TriState::Known(SamlOptionsModel {
                    kind: TriState::Known(app.kind),
                    acs_urls: sorted(app.acs_urls),
                    assertion_duration: app.assertion_duration.into(),
                    sp_entity_id: app.sp_entity_id.into(),
                    assertion_signed_enabled: TriState::Known(app.assertion_signed.unwrap_or(true)),
                    response_is_signed: TriState::Known(app.response_signed.unwrap_or(false)),
                    nameid_format: app.name_id_format.into(),
                    home_page_url: app.home_page_url.into(),
                    default_target_url: app.default_target_url.into(),
                    slo_binding: app.slo_binding.into(),
                    slo_endpoint: app.slo_endpoint.into(),
                    slo_response_endpoint: app.slo_response_endpoint.into(),
                    slo_window: app.slo_window.into(),
                    idp_signing_key: app
                        .idp_signing
                        .map(|s| IdpSigningKeyModel {
                            algorithm: TriState::Known(s.algorithm),
                            key_id: TriState::Known(s.key.id),
                        })
                        .into(),
                    sp_verification: app
                        .sp_verification
                        .map(|v| SpVerificationModel {
                            authn_request_signed: TriState::Known(v.authn_request_signed.unwrap_or(false)),
                            certificate_ids: sorted(Some(v.certificates.into_iter().map(|c| c.id).collect())),
                        })
                        .into(),
                });
            },
            ApplicationVariant::ExternalLink => {
                model.external_link_options = TriState::Known(ExternalLinkOptionsModel {
                    home_page_url: app.home_page_url.into(),
                });
            },
            ApplicationVariant::System => {},
        }
        model
    }
}

fn unsupported(id: &str, kind: &str) -> Diagnostic {
    Diagnostic::error("Unsupported application type").with_detail(format!(
        "The application {} is of type {}, which is managed by PingOne and cannot be managed here.",
        id, kind
    ))
}

fn string_set_attribute(flags: AttributeFlags) -> Attribute {
    Attribute::new(AttributeType::set(AttributeType::String), flags)
}

fn options_block(block: Block) -> NestedBlock {
    NestedBlock::single(block).with_plan_modifier(PlanModifier::RequiresReplaceIfExistenceChanges)
}

/// Schema shared by the resource and the data source: everything but the
/// lifecycle-specific modifiers and validators.
pub(crate) fn oidc_options_block() -> Block {
    Block::new()
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_validator(Validator::one_of(OIDC_TYPES))
                .with_force_new(),
        )
        .with_attribute(
            "grant_types",
            string_set_attribute(AttributeFlags::required())
                .with_validator(Validator::SizeAtLeast(1))
                .with_validator(Validator::one_of(GRANT_TYPES)),
        )
        .with_attribute(
            "response_types",
            string_set_attribute(AttributeFlags::optional()).with_validator(Validator::one_of(RESPONSE_TYPES)),
        )
        .with_attribute(
            "token_endpoint_auth_method",
            Attribute::required_string().with_validator(Validator::one_of(TOKEN_AUTH_METHODS)),
        )
        .with_attribute("home_page_url", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute("initiate_login_uri", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute("target_link_uri", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute("redirect_uris", string_set_attribute(AttributeFlags::optional()))
        .with_attribute("post_logout_redirect_uris", string_set_attribute(AttributeFlags::optional()))
        .with_attribute(
            "pkce_enforcement",
            Attribute::optional_string()
                .with_default(json!("OPTIONAL"))
                .with_validator(Validator::one_of(&["OPTIONAL", "REQUIRED", "S256_REQUIRED"])),
        )
        .with_attribute(
            "par_requirement",
            Attribute::optional_string()
                .with_default(json!("OPTIONAL"))
                .with_validator(Validator::one_of(ENFORCEMENT)),
        )
        .with_attribute(
            "par_timeout",
            Attribute::optional_int64()
                .with_default(json!(60))
                .with_validator(Validator::IntBetween { min: 1, max: 600 }),
        )
        .with_attribute(
            "refresh_token_duration",
            Attribute::optional_int64()
                .with_default(json!(2_592_000))
                .with_validator(Validator::IntBetween { min: 60, max: 2_147_483_647 }),
        )
        .with_attribute(
            "refresh_token_rolling_duration",
            Attribute::optional_int64()
                .with_default(json!(15_552_000))
                .with_validator(Validator::IntBetween { min: 60, max: 2_147_483_647 }),
        )
        .with_attribute(
            "jwks",
            Attribute::optional_string().with_validator(Validator::conflicts_with(&["jwks_url"])),
        )
        .with_attribute("jwks_url", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute(
            "allow_wildcard_in_redirect_uris",
            Attribute::optional_bool().with_default(json!(false)),
        )
        .with_attribute(
            "client_id",
            Attribute::computed_string()
                .with_description("The OAuth client id, equal to the application id.")
                .with_plan_modifier(PlanModifier::UseStateForUnknown),
        )
}

pub(crate) fn saml_options_block() -> Block {
    let bindings = &["HTTP_POST", "HTTP_REDIRECT"];
    Block::new()
        .with_attribute(
            "type",
            Attribute::optional_string()
                .with_default(json!("WEB_APP"))
                .with_validator(Validator::one_of(&["WEB_APP", "CUSTOM_APP"]))
                .with_force_new(),
        )
        .with_attribute(
            "acs_urls",
            string_set_attribute(AttributeFlags::required()).with_validator(Validator::SizeAtLeast(1)),
        )
        .with_attribute(
            "assertion_duration",
            Attribute::required_int64().with_validator(Validator::IntAtLeast(1)),
        )
        .with_attribute("sp_entity_id", Attribute::required_string())
        .with_attribute(
            "assertion_signed_enabled",
            Attribute::optional_bool().with_default(json!(true)),
        )
        .with_attribute("response_is_signed", Attribute::optional_bool().with_default(json!(false)))
        .with_attribute("nameid_format", Attribute::optional_computed_string())
        .with_attribute("home_page_url", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute("default_target_url", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute(
            "slo_binding",
            Attribute::optional_string()
                .with_default(json!("HTTP_POST"))
                .with_validator(Validator::one_of(bindings)),
        )
        .with_attribute("slo_endpoint", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute("slo_response_endpoint", Attribute::optional_string().with_validator(Validator::Url))
        .with_attribute(
            "slo_window",
            Attribute::optional_int64().with_validator(Validator::IntBetween { min: 0, max: 24 }),
        )
        .with_block(
            "idp_signing_key",
            NestedBlock::single(
                Block::new()
                    .with_attribute(
                        "algorithm",
                        Attribute::required_string()
                            .with_validator(Validator::one_of(&["SHA256withRSA", "SHA384withRSA", "SHA512withRSA"])),
                    )
                    .with_attribute(
                        "key_id",
                        Attribute::required_string().with_validator(Validator::ResourceId),
                    ),
            ),
        )
        .with_block(
            "sp_verification",
            NestedBlock::single(
                Block::new()
                    .with_attribute(
                        "authn_request_signed",
                        Attribute::optional_bool().with_default(json!(false)),
                    )
                    .with_attribute(
                        "certificate_ids",
                        string_set_attribute(AttributeFlags::required()).with_validator(Validator::ResourceId),
                    ),
            ),
        )
}

pub(crate) fn external_link_options_block() -> Block {
    Block::new().with_attribute(
        "home_page_url",
        Attribute::required_string().with_validator(Validator::Url),
    )
}

/// Handler for `pingone_application`.
pub struct ApplicationResource;

#[async_trait]
impl Resource for ApplicationResource {
    fn type_name(&self) -> &'static str {
        "pingone_application"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Resource to create and manage OIDC, SAML and external link applications in a PingOne environment.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the application in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the application.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("enabled", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute(
                "tags",
                string_set_attribute(AttributeFlags::optional())
                    .with_validator(Validator::one_of(&["PING_FED_CONNECTION_INTEGRATION"]))
                    .with_validator(Validator::conflicts_with(&["saml_options", "external_link_options"])),
            )
            .with_attribute("login_page_url", Attribute::optional_string().with_validator(Validator::Url))
            .with_attribute(
                "hidden_from_app_portal",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute(
                "access_control_role_type",
                Attribute::optional_string().with_validator(Validator::one_of(&["ADMIN_USERS_ONLY"])),
            )
            .with_block("icon", icon_block())
            .with_block(
                "access_control_group_options",
                NestedBlock::single(
                    Block::new()
                        .with_attribute(
                            "type",
                            Attribute::required_string().with_validator(Validator::one_of(&["ANY_GROUP", "ALL_GROUPS"])),
                        )
                        .with_attribute(
                            "groups",
                            string_set_attribute(AttributeFlags::required())
                                .with_validator(Validator::SizeAtLeast(1))
                                .with_validator(Validator::ResourceId),
                        ),
                ),
            )
            .with_block("oidc_options", options_block(oidc_options_block()))
            .with_block("saml_options", options_block(saml_options_block()))
            .with_block("external_link_options", options_block(external_link_options_block()))
            .with_validator(BlockValidator::exactly_one_of(&[
                "oidc_options",
                "saml_options",
                "external_link_options",
            ]))
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("application_id").primary(),
        ]
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) = ApiCall::post("CreateApplication", env_path(&environment_id, "applications"))
            .with_body(request)
            .with_classifier(&InvalidValue)
            .with_retryable(&DefaultCreateRead)
            .send::<ApplicationDto>(&ctx)
            .await;
        diagnostics.append(call_diagnostics);

        finish(created.map(|a| ApplicationModel::flatten(&environment_id, a)), diagnostics)
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (application, call_diagnostics) =
            ApiCall::get("ReadOneApplication", env_path(&environment_id, &format!("applications/{}", id)))
                .with_classifier(&NotFoundWarning)
                .with_retryable(&DefaultCreateRead)
                .send::<ApplicationDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        if let Some(app) = &application {
            if app.variant() == ApplicationVariant::System {
                diagnostics.push(unsupported(&id, &app.kind));
                return ApplyResult::new(None, diagnostics);
            }
        }

        finish(application.map(|a| ApplicationModel::flatten(&environment_id, a)), diagnostics)
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<ApplicationModel>(plan, &mut diagnostics),
            decode::<ApplicationModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|a| body(&a, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) =
            ApiCall::put("UpdateApplication", env_path(&environment_id, &format!("applications/{}", id)))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .send::<ApplicationDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(updated.map(|a| ApplicationModel::flatten(&environment_id, a)), diagnostics)
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<ApplicationModel>(state, &mut diagnostics) else {
            return diagnostics;
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return diagnostics;
        };

        let ctx = ctx.for_environment(&environment_id);
        let (_, call_diagnostics) =
            ApiCall::delete("DeleteApplication", env_path(&environment_id, &format!("applications/{}", id)))
                .with_classifier(&NotFoundWarning)
                .send::<Value>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";
    const GROUP: &str = "4f1c2d3e-5a6b-4c7d-8e9f-0a1b2c3d4e5f";

    fn oidc_config() -> Value {
        json!({
            "environment_id": ENV,
            "name": "Portal",
            "oidc_options": {
                "type": "WEB_APP",
                "grant_types": ["AUTHORIZATION_CODE", "REFRESH_TOKEN"],
                "response_types": ["CODE"],
                "token_endpoint_auth_method": "CLIENT_SECRET_BASIC",
                "redirect_uris": ["https://app.example.com/callback"]
            }
        })
    }

    #[test]
    fn test_variant_classification() {
        assert_eq!(ApplicationVariant::of("OPENID_CONNECT", "WORKER"), ApplicationVariant::Oidc);
        assert_eq!(ApplicationVariant::of("SAML", "WEB_APP"), ApplicationVariant::Saml);
        assert_eq!(
            ApplicationVariant::of("EXTERNAL_LINK", "PORTAL_LINK_APP"),
            ApplicationVariant::ExternalLink
        );
        assert_eq!(
            ApplicationVariant::of("OPENID_CONNECT", "PING_ONE_SELF_SERVICE"),
            ApplicationVariant::System
        );
    }

    #[test]
    fn test_expand_oidc() {
        let model: ApplicationModel = crate::bridge::from_state(&oidc_config()).unwrap();
        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(model.expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(request["protocol"], json!("OPENID_CONNECT"));
        assert_eq!(request["type"], json!("WEB_APP"));
        assert_eq!(request["grantTypes"], json!(["AUTHORIZATION_CODE", "REFRESH_TOKEN"]));
        assert!(request.get("acsUrls").is_none());
        assert!(request.get("accessControl").is_none());
    }

    #[test]
    fn test_flatten_sets_only_matching_block() {
        let response: ApplicationDto = serde_json::from_value(json!({
            "id": "app-1",
            "protocol": "SAML",
            "type": "WEB_APP",
            "name": "Payroll",
            "enabled": true,
            "acsUrls": ["https://sp.example.com/acs"],
            "assertionDuration": 3600,
            "spEntityId": "payroll",
            "idpSigning": {"key": {"id": "k1"}, "algorithm": "SHA256withRSA"},
            "accessControl": {"group": {"type": "ANY_GROUP", "groups": [{"id": GROUP}]}}
        }))
        .unwrap();
        let model = ApplicationModel::flatten(ENV, response);
        assert!(model.oidc_options.is_null());
        assert!(model.external_link_options.is_null());
        let saml = model.saml_options.known().unwrap();
        assert_eq!(saml.assertion_duration, TriState::Known(3600));
        assert_eq!(
            saml.idp_signing_key.known().unwrap().key_id,
            TriState::Known("k1".to_string())
        );
        assert_eq!(
            model.access_control_group_options.known().unwrap().groups,
            TriState::Known(vec![GROUP.to_string()])
        );
        assert!(model.access_control_role_type.is_null());
    }

    #[test]
    fn test_oidc_client_id_is_application_id() {
        let response: ApplicationDto = serde_json::from_value(json!({
            "id": "app-2", "protocol": "OPENID_CONNECT", "type": "WORKER", "name": "Worker",
            "grantTypes": ["CLIENT_CREDENTIALS"], "tokenEndpointAuthMethod": "CLIENT_SECRET_BASIC"
        }))
        .unwrap();
        let model = ApplicationModel::flatten(ENV, response);
        assert_eq!(
            model.oidc_options.known().unwrap().client_id,
            TriState::Known("app-2".to_string())
        );
    }

    #[test]
    fn test_system_application_flattens_without_blocks() {
        let response: ApplicationDto = serde_json::from_value(json!({
            "id": "app-3", "protocol": "OPENID_CONNECT", "type": "PING_ONE_PORTAL", "name": "Application Portal"
        }))
        .unwrap();
        assert_eq!(response.variant(), ApplicationVariant::System);
        let model = ApplicationModel::flatten(ENV, response);
        assert!(model.oidc_options.is_null() && model.saml_options.is_null());
        assert_eq!(unsupported("app-3", "PING_ONE_PORTAL").summary, "Unsupported application type");
    }

    #[test]
    fn test_schema_rules() {
        let schema = ApplicationResource.schema();
        assert!(validate(&schema, &oidc_config()).is_empty());

        let mut both = oidc_config();
        both["external_link_options"] = json!({"home_page_url": "https://example.com"});
        assert!(!validate(&schema, &both).is_empty());

        let mut jwks = oidc_config();
        jwks["oidc_options"]["jwks"] = json!("{}");
        jwks["oidc_options"]["jwks_url"] = json!("https://example.com/jwks");
        assert_eq!(validate(&schema, &jwks).len(), 1);

        let mut tags = json!({
            "environment_id": ENV,
            "name": "Link",
            "tags": ["PING_FED_CONNECTION_INTEGRATION"],
            "external_link_options": {"home_page_url": "https://example.com"}
        });
        assert_eq!(validate(&schema, &tags).len(), 1);
        tags["tags"] = json!(["SOMETHING_ELSE"]);
        assert_eq!(validate(&schema, &tags).len(), 2);
    }
}
