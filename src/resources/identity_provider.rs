//! `pingone_identity_provider`, an external identity provider.
//!
//! Exactly one provider block is configured. The API reports the provider
//! kind in a flat `type` field and never returns client secrets, so secrets
//! are carried over from the plan or prior state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{
    body, decode, env_path, expand_icon, finish, flatten_icon, icon_block, required, unwrap_single, Icon, IconModel,
    ObjectRef, Resource,
};
use crate::api_enum;
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

api_enum! {
    /// Provider kind as reported by the API.
    pub enum IdentityProviderVariant {
        Facebook => "FACEBOOK",
        Google => "GOOGLE",
        LinkedIn => "LINKEDIN",
        Yahoo => "YAHOO",
        Amazon => "AMAZON",
        Twitter => "TWITTER",
        Apple => "APPLE",
        Paypal => "PAYPAL",
        Microsoft => "MICROSOFT",
        Github => "GITHUB",
        OpenIdConnect => "OPENID_CONNECT",
        Saml => "SAML",
    }
}

/// Provider blocks and the wire type each one maps to.
const VARIANTS: &[(&str, IdentityProviderVariant)] = &[
    ("facebook", IdentityProviderVariant::Facebook),
    ("google", IdentityProviderVariant::Google),
    ("linkedin", IdentityProviderVariant::LinkedIn),
    ("yahoo", IdentityProviderVariant::Yahoo),
    ("amazon", IdentityProviderVariant::Amazon),
    ("twitter", IdentityProviderVariant::Twitter),
    ("apple", IdentityProviderVariant::Apple),
    ("paypal", IdentityProviderVariant::Paypal),
    ("microsoft", IdentityProviderVariant::Microsoft),
    ("github", IdentityProviderVariant::Github),
    ("openid_connect", IdentityProviderVariant::OpenIdConnect),
    ("saml", IdentityProviderVariant::Saml),
];

state_model! {
    /// A bare `{id}` reference.
    pub struct IdRefModel {
        id: TriState<String>,
    }
}

state_model! {
    /// Facebook app credentials.
    pub struct FacebookModel {
        app_id: TriState<String>,
        app_secret: TriState<String>,
    }
}

state_model! {
    /// OAuth client credentials shared by most social providers.
    pub struct ClientCredentialsModel {
        client_id: TriState<String>,
        client_secret: TriState<String>,
    }
}

state_model! {
    /// Microsoft credentials.
    pub struct MicrosoftModel {
        client_id: TriState<String>,
        client_secret: TriState<String>,
        tenant_id: TriState<String>,
    }
}

state_model! {
    /// Sign in with Apple.
    pub struct AppleModel {
        client_id: TriState<String>,
        client_secret_signing_key: TriState<String>,
        key_id: TriState<String>,
        team_id: TriState<String>,
    }
}

state_model! {
    /// PayPal credentials.
    pub struct PaypalModel {
        client_id: TriState<String>,
        client_secret: TriState<String>,
        client_environment: TriState<String>,
    }
}

state_model! {
    /// A generic OpenID Connect provider.
    pub struct OpenIdConnectModel {
        authorization_endpoint: TriState<String>,
        client_id: TriState<String>,
        client_secret: TriState<String>,
        discovery_endpoint: TriState<String>,
        issuer: TriState<String>,
        jwks_endpoint: TriState<String>,
        scopes: TriState<Vec<String>>,
        token_endpoint: TriState<String>,
        token_endpoint_auth_method: TriState<String>,
        userinfo_endpoint: TriState<String>,
    }
}

state_model! {
    /// Certificates used to verify the IdP's signatures.
    pub struct IdpVerificationModel {
        certificates: TriState<Vec<IdRefModel>>,
    }
}

state_model! {
    /// Key used to sign requests to the IdP.
    pub struct SpSigningModel {
        key: TriState<IdRefModel>,
        algorithm: TriState<String>,
    }
}

state_model! {
    /// A SAML provider.
    pub struct SamlModel {
        authentication_request_signed: TriState<bool>,
        idp_entity_id: TriState<String>,
        sp_entity_id: TriState<String>,
        idp_verification: TriState<IdpVerificationModel>,
        sp_signing: TriState<SpSigningModel>,
        sso_binding: TriState<String>,
        sso_endpoint: TriState<String>,
        slo_binding: TriState<String>,
        slo_endpoint: TriState<String>,
        slo_response_endpoint: TriState<String>,
        slo_window: TriState<i64>,
    }
}

state_model! {
    /// State of an identity provider.
    pub struct IdentityProviderModel {
        id: TriState<String>,
        environment_id: TriState<String>,
        name: TriState<String>,
        description: TriState<String>,
        enabled: TriState<bool>,
        registration_population_id: TriState<String>,
        icon: TriState<IconModel>,
        login_button_icon: TriState<IconModel>,
        facebook: TriState<FacebookModel>,
        google: TriState<ClientCredentialsModel>,
        linkedin: TriState<ClientCredentialsModel>,
        yahoo: TriState<ClientCredentialsModel>,
        amazon: TriState<ClientCredentialsModel>,
        twitter: TriState<ClientCredentialsModel>,
        apple: TriState<AppleModel>,
        paypal: TriState<PaypalModel>,
        microsoft: TriState<MicrosoftModel>,
        github: TriState<ClientCredentialsModel>,
        openid_connect: TriState<OpenIdConnectModel>,
        saml: TriState<SamlModel>,
    }
}

/// Where users registered through the provider are created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Registration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<ObjectRef>,
}

/// IdP signature verification on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct IdpVerification {
    #[serde(default)]
    pub certificates: Vec<ObjectRef>,
}

/// SP request signing on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct SpSigning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
}

/// An identity provider as the API sends and receives it.
///
/// Fields outside the selected `type` are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct IdentityProviderDto {
    #[serde(default, skip_serializing)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: IdentityProviderVariant,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration: Option<Registration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_button_icon: Option<Icon>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_signing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_environment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authn_request_signed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_verification: Option<IdpVerification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sp_signing: Option<SpSigning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_response_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_window: Option<i64>,
}

impl IdentityProviderDto {
    fn new(kind: IdentityProviderVariant, name: String) -> Self {
        Self {
            id: None,
            kind,
            name,
            description: None,
            enabled: false,
            registration: None,
            icon: None,
            login_button_icon: None,
            app_id: None,
            app_secret: None,
            client_id: None,
            client_secret: None,
            tenant_id: None,
            client_secret_signing_key: None,
            key_id: None,
            team_id: None,
            client_environment: None,
            authorization_endpoint: None,
            discovery_endpoint: None,
            issuer: None,
            jwks_endpoint: None,
            scopes: None,
            token_endpoint: None,
            token_endpoint_auth_method: None,
            user_info_endpoint: None,
            authn_request_signed: None,
            idp_entity_id: None,
            sp_entity_id: None,
            idp_verification: None,
            sp_signing: None,
            sso_binding: None,
            sso_endpoint: None,
            slo_binding: None,
            slo_endpoint: None,
            slo_response_endpoint: None,
            slo_window: None,
        }
    }
}

fn client_credentials(dto: &mut IdentityProviderDto, credentials: &ClientCredentialsModel) {
    dto.client_id = credentials.client_id.cloned_known();
    dto.client_secret = credentials.client_secret.cloned_known();
}

/// Secret from the plan or prior state for a provider block that is still present.
fn kept_secret<T>(block: &TriState<T>, secret: impl Fn(&T) -> &TriState<String>) -> TriState<String> {
    block.known().map(|b| secret(b).clone()).unwrap_or_default()
}

impl IdentityProviderModel {
    fn variant_candidates(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("facebook", self.facebook.is_known()),
            ("google", self.google.is_known()),
            ("linkedin", self.linkedin.is_known()),
            ("yahoo", self.yahoo.is_known()),
            ("amazon", self.amazon.is_known()),
            ("twitter", self.twitter.is_known()),
            ("apple", self.apple.is_known()),
            ("paypal", self.paypal.is_known()),
            ("microsoft", self.microsoft.is_known()),
            ("github", self.github.is_known()),
            ("openid_connect", self.openid_connect.is_known()),
            ("saml", self.saml.is_known()),
        ]
    }

    fn expand(&self, diagnostics: &mut Diagnostics) -> Option<IdentityProviderDto> {
        let name = required(self.name.as_deref(), "name", diagnostics)?;
        let variant = match select_variant(&self.variant_candidates()) {
            Ok(variant) => variant,
            Err(diagnostic) => {
                diagnostics.push(diagnostic);
                return None;
            },
        };
        let kind = VARIANTS
            .iter()
            .find(|(block, _)| *block == variant)
            .map(|(_, kind)| kind.clone())?;

        let mut dto = IdentityProviderDto::new(kind, name);
        dto.description = self.description.cloned_known();
        dto.enabled = self.enabled.cloned_known().unwrap_or(false);
        dto.registration = self.registration_population_id.cloned_known().map(|id| Registration {
            population: Some(ObjectRef::new(id)),
        });
        dto.icon = expand_icon(&self.icon);
        dto.login_button_icon = expand_icon(&self.login_button_icon);

        if let Some(facebook) = self.facebook.known() {
            dto.app_id = facebook.app_id.cloned_known();
            dto.app_secret = facebook.app_secret.cloned_known();
        }
        for social in [&self.google, &self.linkedin, &self.yahoo, &self.amazon, &self.twitter, &self.github] {
            if let Some(credentials) = social.known() {
                client_credentials(&mut dto, credentials);
            }
        }
        if let Some(microsoft) = self.microsoft.known() {
            dto.client_id = microsoft.client_id.cloned_known();
            dto.client_secret = microsoft.client_secret.cloned_known();
            dto.tenant_id = microsoft.tenant_id.cloned_known();
        }
        if let Some(apple) = self.apple.known() {
            dto.client_id = apple.client_id.cloned_known();
            dto.client_secret_signing_key = apple.client_secret_signing_key.cloned_known();
            dto.key_id = apple.key_id.cloned_known();
            dto.team_id = apple.team_id.cloned_known();
        }
        if let Some(paypal) = self.paypal.known() {
            dto.client_id = paypal.client_id.cloned_known();
            dto.client_secret = paypal.client_secret.cloned_known();
            dto.client_environment = paypal.client_environment.cloned_known();
        }
        if let Some(oidc) = self.openid_connect.known() {
            dto.authorization_endpoint = oidc.authorization_endpoint.cloned_known();
            dto.client_id = oidc.client_id.cloned_known();
            dto.client_secret = oidc.client_secret.cloned_known();
            dto.discovery_endpoint = oidc.discovery_endpoint.cloned_known();
            dto.issuer = oidc.issuer.cloned_known();
            dto.jwks_endpoint = oidc.jwks_endpoint.cloned_known();
            dto.scopes = string_set(oidc.scopes.clone());
            dto.token_endpoint = oidc.token_endpoint.cloned_known();
            dto.token_endpoint_auth_method = oidc.token_endpoint_auth_method.cloned_known();
            dto.user_info_endpoint = oidc.userinfo_endpoint.cloned_known();
        }
        if let Some(saml) = self.saml.known() {
            dto.authn_request_signed = saml.authentication_request_signed.cloned_known();
            dto.idp_entity_id = saml.idp_entity_id.cloned_known();
            dto.sp_entity_id = saml.sp_entity_id.cloned_known();
            dto.idp_verification = saml.idp_verification.known().map(|v| IdpVerification {
                certificates: v
                    .certificates
                    .known()
                    .map(|certs| certs.iter().filter_map(|c| c.id.cloned_known()).map(ObjectRef::new).collect())
                    .unwrap_or_default(),
            });
            dto.sp_signing = saml.sp_signing.known().map(|s| SpSigning {
                key: s.key.known().and_then(|k| k.id.cloned_known()).map(ObjectRef::new),
                algorithm: s.algorithm.cloned_known(),
            });
            dto.sso_binding = saml.sso_binding.cloned_known();
            dto.sso_endpoint = saml.sso_endpoint.cloned_known();
            dto.slo_binding = saml.slo_binding.cloned_known();
            dto.slo_endpoint = saml.slo_endpoint.cloned_known();
            dto.slo_response_endpoint = saml.slo_response_endpoint.cloned_known();
            dto.slo_window = saml.slo_window.cloned_known();
        }
        Some(dto)
    }

    /// Build state from the API response. `source` is the plan or prior state
    /// that secrets are copied from.
    fn flatten(environment_id: &str, idp: IdentityProviderDto, source: &IdentityProviderModel) -> Self {
        let mut model = Self {
            id: idp.id.into(),
            environment_id: TriState::Known(environment_id.to_string()),
            name: TriState::Known(idp.name),
            description: idp.description.into(),
            enabled: TriState::Known(idp.enabled),
            registration_population_id: idp.registration.and_then(|r| r.population).map(|p| p.id).into(),
            icon: flatten_icon(idp.icon),
            login_button_icon: flatten_icon(idp.login_button_icon),
            ..Default::default()
        };

        let credentials = |block: &TriState<ClientCredentialsModel>| {
            TriState::Known(ClientCredentialsModel {
                client_id: idp.client_id.clone().into(),
                client_secret: kept_secret(block, |b| &b.client_secret),
            })
        };

        match idp.kind {
            IdentityProviderVariant::Facebook => {
                model.facebook = TriState::Known(FacebookModel {
                    app_id: idp.app_id.into(),
                    app_secret: kept_secret(&source.facebook, |b| &b.app_secret),
                });
            },
            IdentityProviderVariant::Google => model.google = credentials(&source.google),
            IdentityProviderVariant::LinkedIn => model.linkedin = credentials(&source.linkedin),
            IdentityProviderVariant::Yahoo => model.yahoo = credentials(&source.yahoo),
            IdentityProviderVariant::Amazon => model.amazon = credentials(&source.amazon),
            IdentityProviderVariant::Twitter => model.twitter = credentials(&source.twitter),
            IdentityProviderVariant::Github => model.github = credentials(&source.github),
            IdentityProviderVariant::Microsoft => {
                model.microsoft = TriState::Known(MicrosoftModel {
                    client_id: idp.client_id.into(),
                    client_secret: kept_secret(&source.microsoft, |b| &b.client_secret),
                    tenant_id: idp.tenant_id.into(),
                });
            },
            IdentityProviderVariant::Apple => {
                model.apple = TriState::Known(AppleModel {
                    client_id: idp.client_id.into(),
                    client_secret_signing_key: kept_secret(&source.apple, |b| &b.client_secret_signing_key),
                    key_id: idp.key_id.into(),
                    team_id: idp.team_id.into(),
                });
            },
            IdentityProviderVariant::Paypal => {
                model.paypal = TriState::Known(PaypalModel {
                    client_id: idp.client_id.into(),
                    client_secret: kept_secret(&source.paypal, |b| &b.client_secret),
                    client_environment: idp.client_environment.into(),
                });
            },
            IdentityProviderVariant::OpenIdConnect => {
                model.openid_connect = TriState::Known(OpenIdConnectModel {
                    authorization_endpoint: idp.authorization_endpoint.into(),
                    client_id: idp.client_id.into(),
                    client_secret: kept_secret(&source.openid_connect, |b| &b.client_secret),
                    discovery_endpoint: idp.discovery_endpoint.into(),
                    issuer: idp.issuer.into(),
                    jwks_endpoint: idp.jwks_endpoint.into(),
                    scopes: string_set(idp.scopes.into()).into(),
                    token_endpoint: idp.token_endpoint.into(),
                    token_endpoint_auth_method: idp.token_endpoint_auth_method.into(),
                    userinfo_endpoint: idp.user_info_endpoint.into(),
                });
            },
            IdentityProviderVariant::Saml => {
                model.saml = TriState::Known(SamlModel {
                    authentication_request_signed: TriState::Known(idp.authn_request_signed.unwrap_or(false)),
                    idp_entity_id: idp.idp_entity_id.into(),
                    sp_entity_id: idp.sp_entity_id.into(),
                    idp_verification: idp
                        .idp_verification
                        .map(|v| {
                            let mut certificates: Vec<IdRefModel> = v
                                .certificates
                                .into_iter()
                                .map(|c| IdRefModel { id: TriState::Known(c.id) })
                                .collect();
                            certificates.sort_by(|a, b| a.id.known().cmp(&b.id.known()));
                            IdpVerificationModel {
                                certificates: TriState::Known(certificates),
                            }
                        })
                        .into(),
                    sp_signing: idp
                        .sp_signing
                        .map(|s| SpSigningModel {
                            key: s.key.map(|k| IdRefModel { id: TriState::Known(k.id) }).into(),
                            algorithm: s.algorithm.into(),
                        })
                        .into(),
                    sso_binding: idp.sso_binding.into(),
                    sso_endpoint: idp.sso_endpoint.into(),
                    slo_binding: idp.slo_binding.into(),
                    slo_endpoint: idp.slo_endpoint.into(),
                    slo_response_endpoint: idp.slo_response_endpoint.into(),
                    slo_window: idp.slo_window.into(),
                });
            },
            IdentityProviderVariant::Other(_) => {},
        }
        model
    }
}

fn secret() -> Attribute {
    Attribute::required_string()
        .with_validator(Validator::LengthAtLeast(1))
        .sensitive()
}

fn client_credentials_block() -> Block {
    Block::new()
        .with_attribute("client_id", Attribute::required_string().with_validator(Validator::LengthAtLeast(1)))
        .with_attribute("client_secret", secret())
}

fn variant(block: Block) -> NestedBlock {
    NestedBlock::single(block).with_plan_modifier(PlanModifier::RequiresReplaceIfExistenceChanges)
}

fn id_ref_block() -> Block {
    Block::new().with_attribute("id", Attribute::required_string().with_validator(Validator::ResourceId))
}

/// Handler for `pingone_identity_provider`.
pub struct IdentityProviderResource;

#[async_trait]
impl Resource for IdentityProviderResource {
    fn type_name(&self) -> &'static str {
        "pingone_identity_provider"
    }

    fn schema(&self) -> Schema {
        let variant_names: Vec<&str> = VARIANTS.iter().map(|(name, _)| *name).collect();

        let oidc = Block::new()
            .with_attribute("authorization_endpoint", Attribute::required_string().with_validator(Validator::Url))
            .with_attribute("client_id", Attribute::required_string())
            .with_attribute("client_secret", secret())
            .with_attribute("discovery_endpoint", Attribute::optional_string().with_validator(Validator::Url))
            .with_attribute("issuer", Attribute::required_string())
            .with_attribute("jwks_endpoint", Attribute::required_string().with_validator(Validator::Url))
            .with_attribute(
                "scopes",
                Attribute::new(AttributeType::set(AttributeType::String), AttributeFlags::required())
                    .with_validator(Validator::SizeAtLeast(1)),
            )
            .with_attribute("token_endpoint", Attribute::required_string().with_validator(Validator::Url))
            .with_attribute(
                "token_endpoint_auth_method",
                Attribute::optional_string()
                    .with_default(json!("CLIENT_SECRET_BASIC"))
                    .with_validator(Validator::one_of(&["CLIENT_SECRET_BASIC", "CLIENT_SECRET_POST", "NONE"])),
            )
            .with_attribute("userinfo_endpoint", Attribute::optional_string().with_validator(Validator::Url));

        let bindings = &["HTTP_POST", "HTTP_REDIRECT"];
        let saml = Block::new()
            .with_attribute(
                "authentication_request_signed",
                Attribute::optional_bool().with_default(json!(false)),
            )
            .with_attribute("idp_entity_id", Attribute::required_string())
            .with_attribute("sp_entity_id", Attribute::required_string())
            .with_block(
                "idp_verification",
                NestedBlock::single(Block::new().with_block(
                    "certificates",
                    NestedBlock::set(id_ref_block()).with_min_items(1).required(),
                ))
                .required(),
            )
            .with_block(
                "sp_signing",
                NestedBlock::single(
                    Block::new()
                        .with_block("key", NestedBlock::single(id_ref_block()).required())
                        .with_attribute(
                            "algorithm",
                            Attribute::optional_computed_string()
                                .with_validator(Validator::one_of(&["SHA256withRSA", "SHA384withRSA", "SHA512withRSA"])),
                        ),
                ),
            )
            .with_attribute("sso_binding", Attribute::required_string().with_validator(Validator::one_of(bindings)))
            .with_attribute("sso_endpoint", Attribute::required_string().with_validator(Validator::Url))
            .with_attribute("slo_binding", Attribute::optional_string().with_validator(Validator::one_of(bindings)))
            .with_attribute("slo_endpoint", Attribute::optional_string().with_validator(Validator::Url))
            .with_attribute("slo_response_endpoint", Attribute::optional_string().with_validator(Validator::Url))
            .with_attribute(
                "slo_window",
                Attribute::optional_int64().with_validator(Validator::IntBetween { min: 0, max: 24 }),
            );

        Schema::v1()
            .with_description("Resource to create and manage external identity providers in a PingOne environment.")
            .with_attribute("id", Attribute::id())
            .with_attribute(
                "environment_id",
                Attribute::parent_id("The ID of the environment to create the identity provider in."),
            )
            .with_attribute(
                "name",
                Attribute::required_string()
                    .with_description("The name of the identity provider.")
                    .with_validator(Validator::LengthAtLeast(1)),
            )
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("enabled", Attribute::optional_bool().with_default(json!(false)))
            .with_attribute(
                "registration_population_id",
                Attribute::optional_string()
                    .with_description("The population new users are created in when they register through this provider.")
                    .with_validator(Validator::ResourceId),
            )
            .with_block("icon", icon_block())
            .with_block("login_button_icon", icon_block())
            .with_block(
                "facebook",
                variant(
                    Block::new()
                        .with_attribute("app_id", Attribute::required_string())
                        .with_attribute("app_secret", secret()),
                ),
            )
            .with_block("google", variant(client_credentials_block()))
            .with_block("linkedin", variant(client_credentials_block()))
            .with_block("yahoo", variant(client_credentials_block()))
            .with_block("amazon", variant(client_credentials_block()))
            .with_block("twitter", variant(client_credentials_block()))
            .with_block("github", variant(client_credentials_block()))
            .with_block(
                "microsoft",
                variant(client_credentials_block().with_attribute("tenant_id", Attribute::optional_string())),
            )
            .with_block(
                "apple",
                variant(
                    Block::new()
                        .with_attribute(
                            "client_id",
                            Attribute::required_string().with_validator(Validator::LengthAtLeast(1)),
                        )
                        .with_attribute("client_secret_signing_key", secret())
                        .with_attribute(
                            "key_id",
                            Attribute::required_string().with_validator(Validator::LengthBetween { min: 10, max: 10 }),
                        )
                        .with_attribute(
                            "team_id",
                            Attribute::required_string().with_validator(Validator::LengthBetween { min: 10, max: 10 }),
                        ),
                ),
            )
            .with_block(
                "paypal",
                variant(client_credentials_block().with_attribute(
                    "client_environment",
                    Attribute::required_string().with_validator(Validator::one_of(&["sandbox", "live"])),
                )),
            )
            .with_block("openid_connect", variant(oidc))
            .with_block("saml", variant(saml))
            .with_validator(BlockValidator::exactly_one_of(&variant_names))
    }

    fn import_components(&self) -> Vec<ImportComponent> {
        vec![
            ImportComponent::resource_id("environment_id"),
            ImportComponent::resource_id("identity_provider_id").primary(),
        ]
    }

    fn upgrade_state(&self, version: u64, mut state: Value) -> Result<Value, Diagnostic> {
        match version {
            0 => {
                let Some(object) = state.as_object_mut() else {
                    return Err(Diagnostic::error("Unable to upgrade resource state")
                        .with_detail("The stored pingone_identity_provider state is not an object."));
                };
                unwrap_single(object, "icon");
                unwrap_single(object, "login_button_icon");
                for (name, _) in VARIANTS {
                    unwrap_single(object, name);
                }
                if let Some(Value::Object(saml)) = object.get_mut("saml") {
                    upgrade_saml_v0(saml);
                }
                Ok(state)
            },
            1 => Ok(state),
            other => Err(Diagnostic::error("Unable to upgrade resource state")
                .with_detail(format!("pingone_identity_provider has no upgrade from schema version {}.", other))),
        }
    }

    async fn create(&self, ctx: &RequestContext, plan: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<IdentityProviderModel>(plan, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(environment_id) = required(model.environment_id.as_deref(), "environment_id", &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|i| body(&i, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (created, call_diagnostics) =
            ApiCall::post("CreateIdentityProvider", env_path(&environment_id, "identityProviders"))
                .with_body(request)
                .with_classifier(&InvalidValue)
                .with_retryable(&DefaultCreateRead)
                .send::<IdentityProviderDto>(&ctx)
                .await;
        diagnostics.append(call_diagnostics);

        finish(
            created.map(|i| IdentityProviderModel::flatten(&environment_id, i, &model)),
            diagnostics,
        )
    }

    async fn read(&self, ctx: &RequestContext, state: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<IdentityProviderModel>(state, &mut diagnostics) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(model.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (idp, call_diagnostics) = ApiCall::get(
            "ReadOneIdentityProvider",
            env_path(&environment_id, &format!("identityProviders/{}", id)),
        )
        .with_classifier(&NotFoundWarning)
        .with_retryable(&DefaultCreateRead)
        .send::<IdentityProviderDto>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            idp.map(|i| IdentityProviderModel::flatten(&environment_id, i, &model)),
            diagnostics,
        )
    }

    async fn update(&self, ctx: &RequestContext, plan: &Value, prior: &Value) -> ApplyResult {
        let mut diagnostics = Diagnostics::new();
        let (Some(model), Some(prior)) = (
            decode::<IdentityProviderModel>(plan, &mut diagnostics),
            decode::<IdentityProviderModel>(prior, &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let (Some(environment_id), Some(id)) = (
            required(model.environment_id.as_deref(), "environment_id", &mut diagnostics),
            required(prior.id.as_deref(), "id", &mut diagnostics),
        ) else {
            return ApplyResult::new(None, diagnostics);
        };
        let Some(request) = model.expand(&mut diagnostics).and_then(|i| body(&i, &mut diagnostics)) else {
            return ApplyResult::new(None, diagnostics);
        };

        let ctx = ctx.for_environment(&environment_id);
        let (updated, call_diagnostics) = ApiCall::put(
            "UpdateIdentityProvider",
            env_path(&environment_id, &format!("identityProviders/{}", id)),
        )
        .with_body(request)
        .with_classifier(&InvalidValue)
        .send::<IdentityProviderDto>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);

        finish(
            updated.map(|i| IdentityProviderModel::flatten(&environment_id, i, &model)),
            diagnostics,
        )
    }

    async fn delete(&self, ctx: &RequestContext, state: &Value) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let Some(model) = decode::<IdentityProviderModel>(state, &mut diagnostics) else {
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
            "DeleteIdentityProvider",
            env_path(&environment_id, &format!("identityProviders/{}", id)),
        )
        .with_classifier(&NotFoundWarning)
        .send::<Value>(&ctx)
        .await;
        diagnostics.append(call_diagnostics);
        diagnostics
    }
}

/// Nest the flat v0 SAML certificate and signing key ids.
fn upgrade_saml_v0(saml: &mut Map<String, Value>) {
    if let Some(ids) = saml.remove("idp_verification_certificate_ids") {
        let verification = match ids {
            Value::Array(ids) => json!({
                "certificates": ids.into_iter().map(|id| json!({"id": id})).collect::<Vec<_>>()
            }),
            _ => Value::Null,
        };
        saml.insert("idp_verification".to_string(), verification);
    }
    if let Some(key_id) = saml.remove("sp_signing_key_id") {
        let signing = match key_id {
            Value::Null => Value::Null,
            id => json!({"key": {"id": id}, "algorithm": null}),
        };
        saml.insert("sp_signing".to_string(), signing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_resource;
    use crate::validation::validate;

    const ENV: &str = "9c052a8a-14be-44e4-8f07-2662569994ce";

    fn google() -> IdentityProviderModel {
        IdentityProviderModel {
            environment_id: TriState::Known(ENV.to_string()),
            name: TriState::Known("Google".to_string()),
            google: TriState::Known(ClientCredentialsModel {
                client_id: TriState::Known("client".to_string()),
                client_secret: TriState::Known("secret".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_expand_sets_type_from_block() {
        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(google().expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(
            request,
            json!({
                "type": "GOOGLE",
                "name": "Google",
                "enabled": false,
                "clientId": "client",
                "clientSecret": "secret"
            })
        );
    }

    #[test]
    fn test_two_blocks_are_rejected() {
        let mut model = google();
        model.github = model.google.clone();
        let mut diagnostics = Diagnostics::new();
        assert!(model.expand(&mut diagnostics).is_none());
        assert_eq!(diagnostics.errors().next().unwrap().summary, "Invalid variant configuration");
    }

    #[test]
    fn test_flatten_keeps_secret_from_plan() {
        let response: IdentityProviderDto = serde_json::from_value(json!({
            "id": "idp-1",
            "type": "GOOGLE",
            "name": "Google",
            "enabled": true,
            "clientId": "client"
        }))
        .unwrap();
        let model = IdentityProviderModel::flatten(ENV, response, &google());
        let google = model.google.known().unwrap();
        assert_eq!(google.client_secret, TriState::Known("secret".to_string()));
        assert!(model.github.is_null());

        let imported: IdentityProviderDto = serde_json::from_value(json!({
            "id": "idp-1", "type": "GOOGLE", "name": "Google", "clientId": "client"
        }))
        .unwrap();
        let model = IdentityProviderModel::flatten(ENV, imported, &IdentityProviderModel::default());
        assert!(model.google.known().unwrap().client_secret.is_null());
    }

    #[test]
    fn test_saml_wire_shape() {
        let response: IdentityProviderDto = serde_json::from_value(json!({
            "id": "idp-2",
            "type": "SAML",
            "name": "Corp",
            "idpEntityId": "https://idp.example.com",
            "spEntityId": "pingone",
            "idpVerification": {"certificates": [{"id": "c2"}, {"id": "c1"}]},
            "spSigning": {"key": {"id": "k1"}},
            "ssoBinding": "HTTP_POST",
            "ssoEndpoint": "https://idp.example.com/sso"
        }))
        .unwrap();
        let model = IdentityProviderModel::flatten(ENV, response, &IdentityProviderModel::default());
        let saml = model.saml.known().unwrap();
        let certificates = saml.idp_verification.known().unwrap().certificates.known().unwrap();
        assert_eq!(certificates[0].id, TriState::Known("c1".to_string()));
        assert_eq!(
            saml.sp_signing.known().unwrap().key.known().unwrap().id,
            TriState::Known("k1".to_string())
        );

        let mut diagnostics = Diagnostics::new();
        let request = serde_json::to_value(model.expand(&mut diagnostics).unwrap()).unwrap();
        assert_eq!(request["idpVerification"], json!({"certificates": [{"id": "c1"}, {"id": "c2"}]}));
        assert_eq!(request["authnRequestSigned"], json!(false));
    }

    #[test]
    fn test_exactly_one_block_required() {
        let schema = IdentityProviderResource.schema();
        let none = json!({"environment_id": ENV, "name": "x"});
        assert_eq!(validate(&schema, &none)[0].summary, "Invalid Attribute Combination");
    }

    #[test]
    fn test_switching_provider_replaces() {
        let schema = IdentityProviderResource.schema();
        let prior = json!({
            "id": "idp-1",
            "environment_id": ENV,
            "name": "Social",
            "description": null,
            "enabled": false,
            "registration_population_id": null,
            "google": {"client_id": "a", "client_secret": "b"}
        });
        let config = json!({
            "environment_id": ENV,
            "name": "Social",
            "github": {"client_id": "a", "client_secret": "b"}
        });
        let result = plan_resource(&schema, Some(&prior), &config);
        assert!(result.requires_replace);
        assert!(result.replace_paths.contains(&"github".to_string()));
        assert!(result.replace_paths.contains(&"google".to_string()));
    }

    #[test]
    fn test_upgrade_from_v0() {
        let v0 = json!({
            "id": "idp-2",
            "environment_id": ENV,
            "name": "Corp",
            "icon": [],
            "google": [],
            "saml": [{
                "idp_entity_id": "https://idp.example.com",
                "idp_verification_certificate_ids": ["c1"],
                "sp_signing_key_id": "k1",
                "sso_binding": "HTTP_POST"
            }]
        });
        let upgraded = IdentityProviderResource.upgrade_state(0, v0).unwrap();
        assert_eq!(upgraded["icon"], Value::Null);
        assert_eq!(upgraded["google"], Value::Null);
        assert_eq!(
            upgraded["saml"]["idp_verification"],
            json!({"certificates": [{"id": "c1"}]})
        );
        assert_eq!(
            upgraded["saml"]["sp_signing"],
            json!({"key": {"id": "k1"}, "algorithm": null})
        );
        assert!(upgraded["saml"].get("sp_signing_key_id").is_none());
    }
}
