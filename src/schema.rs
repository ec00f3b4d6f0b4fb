//! Typed description of the provider block, managed objects and data sources.
//!
//! A [`Schema`] is a versioned tree of [`Attribute`] leaves and [`NestedBlock`]
//! objects. Beside the type and cardinality, every node carries the plan
//! modifiers and validators that drive [`crate::plan`] and
//! [`crate::validation`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use crate::diagnostics::{Diagnostic, DiagnosticSeverity};

/// Semantic type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
    /// Floating point number.
    Float64,
    /// A boolean value.
    Bool,
    /// Ordered sequence; order is significant.
    List(Box<AttributeType>),
    /// Unordered collection without duplicates.
    Set(Box<AttributeType>),
    /// String-keyed mapping.
    Map(Box<AttributeType>),
    /// Any JSON value.
    Dynamic,
}

impl AttributeType {
    /// Ordered collection of `element`.
    pub fn list(element: AttributeType) -> Self {
        Self::List(Box::new(element))
    }

    /// Unordered collection of `element`.
    pub fn set(element: AttributeType) -> Self {
        Self::Set(Box::new(element))
    }

    /// String-keyed collection of `element`.
    pub fn map(element: AttributeType) -> Self {
        Self::Map(Box::new(element))
    }

    /// Whether values of this type compare without regard to order.
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

/// Cardinality of an attribute: who may set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Filled in from the API.
    pub computed: bool,
    /// Secret; redacted from change lists and logs.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Required in configuration.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Optional in configuration.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Read-only, set from API responses.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Optional; the API supplies a value when unset.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Also secret.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Whether the attribute is set only by the provider.
    pub fn computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }
}

/// Adjusts the planned value of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModifier {
    /// Keep the prior known value for an unchanged computed attribute.
    UseStateForUnknown,
    /// Any change destroys and re-creates the object.
    RequiresReplace,
    /// Only the transition from null to a value destroys and re-creates.
    RequiresReplaceIfPreviouslyNull,
    /// A transition between null and non-null, either way, destroys and re-creates.
    RequiresReplaceIfExistenceChanges,
}

/// A constraint checked against a configured value.
///
/// Scalar validators apply element-wise to lists and sets. Cross-field
/// validators name sibling attributes in the same block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// String length at least `n`.
    LengthAtLeast(usize),
    /// String length within `min..=max`.
    LengthBetween {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// String matches `pattern`; `message` explains the expected shape.
    Regex {
        /// The pattern to match.
        pattern: String,
        /// Human-readable expectation.
        message: String,
    },
    /// String is one of the listed values.
    OneOf(Vec<String>),
    /// String does not contain any listed value, compared case-insensitively.
    NoneOfSubstrings(Vec<String>),
    /// Integer at least `n`.
    IntAtLeast(i64),
    /// Integer within `min..=max`.
    IntBetween {
        /// Minimum value.
        min: i64,
        /// Maximum value.
        max: i64,
    },
    /// Collection contains at least `n` elements.
    SizeAtLeast(usize),
    /// A PingOne resource identifier.
    ResourceId,
    /// A DaVinci resource identifier.
    DavinciId,
    /// An RFC 3339 timestamp.
    Rfc3339,
    /// An absolute `http` or `https` URL.
    Url,
    /// None of the named siblings may be set alongside this attribute.
    ConflictsWith(Vec<String>),
    /// Each named sibling must be set when this attribute is set.
    AlsoRequires(Vec<String>),
    /// This attribute must be null when `attribute` holds one of `values`.
    ForbiddenWhen {
        /// The sibling attribute inspected.
        attribute: String,
        /// Values of the sibling that forbid this attribute.
        values: Vec<String>,
    },
}

impl Validator {
    /// Shorthand for a [`Validator::OneOf`] from string slices.
    pub fn one_of(values: &[&str]) -> Self {
        Self::OneOf(values.iter().map(|v| v.to_string()).collect())
    }

    /// Shorthand for a [`Validator::ConflictsWith`] from string slices.
    pub fn conflicts_with(names: &[&str]) -> Self {
        Self::ConflictsWith(names.iter().map(|v| v.to_string()).collect())
    }

    /// Shorthand for a [`Validator::AlsoRequires`] from string slices.
    pub fn also_requires(names: &[&str]) -> Self {
        Self::AlsoRequires(names.iter().map(|v| v.to_string()).collect())
    }

    /// Shorthand for a [`Validator::ForbiddenWhen`].
    pub fn forbidden_when(attribute: &str, values: &[&str]) -> Self {
        Self::ForbiddenWhen {
            attribute: attribute.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Shorthand for a [`Validator::Regex`].
    pub fn regex(pattern: &str, message: &str) -> Self {
        Self::Regex {
            pattern: pattern.to_string(),
            message: message.to_string(),
        }
    }
}

/// A constraint over several attributes of the same block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockValidator {
    /// Exactly one of the named attributes or blocks must be set.
    ExactlyOneOf(Vec<String>),
    /// At most one of the named attributes or blocks may be set.
    AtMostOneOf(Vec<String>),
}

impl BlockValidator {
    /// Shorthand for [`BlockValidator::ExactlyOneOf`].
    pub fn exactly_one_of(names: &[&str]) -> Self {
        Self::ExactlyOneOf(names.iter().map(|v| v.to_string()).collect())
    }

    /// Shorthand for [`BlockValidator::AtMostOneOf`].
    pub fn at_most_one_of(names: &[&str]) -> Self {
        Self::AtMostOneOf(names.iter().map(|v| v.to_string()).collect())
    }
}

/// One leaf of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Semantic type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Cardinality and sensitivity.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value applied when the attribute is absent from configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Plan modifiers, evaluated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifier>,
    /// Validators applied to configured values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    /// An attribute with no description, modifiers, validators or default.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            default: None,
            plan_modifiers: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Computed string.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create an optional+computed string attribute.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// Required integer.
    pub fn required_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::required())
    }

    /// Optional integer.
    pub fn optional_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional())
    }

    /// Computed integer.
    pub fn computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::computed())
    }

    /// Optional bool.
    pub fn optional_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::optional())
    }

    /// Computed bool.
    pub fn computed_bool() -> Self {
        Self::new(AttributeType::Bool, AttributeFlags::computed())
    }

    /// The computed `id` attribute every managed object carries.
    pub fn id() -> Self {
        Self::computed_string()
            .with_description("The ID of the resource.")
            .with_plan_modifier(PlanModifier::UseStateForUnknown)
    }

    /// A required PingOne identifier whose change forces replacement.
    pub fn parent_id(description: impl Into<String>) -> Self {
        Self::required_string()
            .with_description(description)
            .with_validator(Validator::ResourceId)
            .with_force_new()
    }

    /// Attach user-facing documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Any change destroys and re-creates the object.
    pub fn with_force_new(self) -> Self {
        self.with_plan_modifier(PlanModifier::RequiresReplace)
    }

    /// Value planned when configuration leaves the attribute unset.
    ///
    /// A default implies the attribute is computed when not configured.
    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self.flags.computed = true;
        self
    }

    /// Append a plan modifier.
    pub fn with_plan_modifier(mut self, modifier: PlanModifier) -> Self {
        self.plan_modifiers.push(modifier);
        self
    }

    /// Append a validator.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Treat the value as a secret.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }

    /// Whether any change to this attribute forces replacement.
    pub fn force_new(&self) -> bool {
        self.plan_modifiers.contains(&PlanModifier::RequiresReplace)
    }
}

/// How a nested block holds its objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlockNestingMode {
    /// A single nested object (at most one).
    #[default]
    Single,
    /// A list of nested objects (zero or more, ordered).
    List,
    /// A set of nested objects (zero or more, unordered, unique).
    Set,
    /// A map of nested objects keyed by string.
    Map,
}

/// A block of attributes and nested blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Leaf attributes by name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Child blocks by name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub blocks: HashMap<String, NestedBlock>,
    /// Cross-attribute validators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<BlockValidator>,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// An empty block.
    pub fn new() -> Self {
        Self {
            attributes: HashMap::new(),
            blocks: HashMap::new(),
            validators: Vec::new(),
            description: None,
        }
    }

    /// Add a leaf attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Add a child block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.blocks.insert(name.into(), block);
        self
    }

    /// Add a cross-attribute validator.
    pub fn with_validator(mut self, validator: BlockValidator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Attach user-facing documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether any attribute, at any depth, is sensitive.
    pub fn has_sensitive(&self) -> bool {
        self.attributes.values().any(|a| a.flags.sensitive)
            || self.blocks.values().any(|b| b.block.has_sensitive())
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// A nested block with its nesting mode, constraints, and plan behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// Single object or collection of objects.
    #[serde(default)]
    pub nesting_mode: BlockNestingMode,
    /// Minimum number of items required; `1` on a single block means required.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of items allowed (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
    /// The whole block is set by the provider.
    #[serde(default)]
    pub computed: bool,
    /// Plan modifiers applied to the block as a whole.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifier>,
}

impl NestedBlock {
    fn with_mode(block: Block, nesting_mode: BlockNestingMode, max_items: u32) -> Self {
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items,
            computed: false,
            plan_modifiers: Vec::new(),
        }
    }

    /// Create a single nested object (0 or 1 allowed).
    pub fn single(block: Block) -> Self {
        Self::with_mode(block, BlockNestingMode::Single, 1)
    }

    /// Create a list of nested objects.
    pub fn list(block: Block) -> Self {
        Self::with_mode(block, BlockNestingMode::List, 0)
    }

    /// Create a set of nested objects.
    pub fn set(block: Block) -> Self {
        Self::with_mode(block, BlockNestingMode::Set, 0)
    }

    /// Create a map of nested objects.
    pub fn map(block: Block) -> Self {
        Self::with_mode(block, BlockNestingMode::Map, 0)
    }

    /// Set the minimum number of items required.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of items allowed.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }

    /// Require a single nested object.
    pub fn required(self) -> Self {
        self.with_min_items(1)
    }

    /// Mark the whole block as computed by the provider.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Append a plan modifier.
    pub fn with_plan_modifier(mut self, modifier: PlanModifier) -> Self {
        self.plan_modifiers.push(modifier);
        self
    }
}

/// Versioned schema of a managed object or data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Bumped when the state layout changes; older states are upgraded.
    #[serde(default)]
    pub version: u64,
    /// Top-level attributes and blocks.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// An empty schema at `version`.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            block: Block::new(),
        }
    }

    /// An empty schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Create a schema at version 1.
    pub fn v1() -> Self {
        Self::new(1)
    }

    /// Add a top-level attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.block.attributes.insert(name.into(), attribute);
        self
    }

    /// Add a top-level block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block.blocks.insert(name.into(), block);
        self
    }

    /// Add a cross-attribute validator to the root block.
    pub fn with_validator(mut self, validator: BlockValidator) -> Self {
        self.block.validators.push(validator);
        self
    }

    /// Set the description of the root block.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.block.description = Some(description.into());
        self
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schema for the provider configuration, resources, and data sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// The provider configuration block.
    #[serde(default)]
    pub provider: Schema,
    /// Managed object schemas by type name.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
    /// Data source schemas by type name.
    #[serde(default)]
    pub data_sources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// No schemas registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration block.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Register a managed object type.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }

    /// Register a data source type.
    pub fn with_data_source(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.data_sources.insert(name.into(), schema);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_types_and_cardinality() {
        let redirect_uris = Attribute::new(
            AttributeType::set(AttributeType::String),
            AttributeFlags::optional(),
        );
        assert!(redirect_uris.attr_type.is_set());
        assert!(!AttributeType::list(AttributeType::Int64).is_set());
        assert!(matches!(
            AttributeType::map(AttributeType::String),
            AttributeType::Map(_)
        ));

        assert!(Attribute::computed_string().flags.computed_only());
        assert!(!Attribute::required_string().flags.computed_only());

        let enabled = AttributeFlags::optional_computed();
        assert!(enabled.optional && enabled.computed);
        assert!(!enabled.computed_only());

        let secret = AttributeFlags::computed().sensitive();
        assert!(secret.sensitive && secret.computed_only());
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::required_string()
            .with_description("The ID of the environment.")
            .with_validator(Validator::ResourceId)
            .with_force_new();

        assert_eq!(attr.attr_type, AttributeType::String);
        assert!(attr.flags.required);
        assert!(attr.force_new());
        assert_eq!(attr.validators, vec![Validator::ResourceId]);
    }

    #[test]
    fn test_default_marks_computed() {
        let attr = Attribute::optional_bool().with_default(json!(false));
        assert!(attr.flags.optional);
        assert!(attr.flags.computed);
        assert_eq!(attr.default, Some(json!(false)));
    }

    #[test]
    fn test_id_and_parent_id_helpers() {
        let id = Attribute::id();
        assert!(id.flags.computed_only());
        assert_eq!(id.plan_modifiers, vec![PlanModifier::UseStateForUnknown]);

        let env = Attribute::parent_id("The ID of the environment.");
        assert!(env.flags.required);
        assert!(env.force_new());
        assert!(env.validators.contains(&Validator::ResourceId));
    }

    #[test]
    fn test_schema_builder() {
        let schema = Schema::v1()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("id", Attribute::id())
            .with_block(
                "oidc_options",
                NestedBlock::single(
                    Block::new().with_attribute("type", Attribute::required_string()),
                )
                .with_plan_modifier(PlanModifier::RequiresReplaceIfExistenceChanges),
            )
            .with_validator(BlockValidator::exactly_one_of(&["oidc_options", "saml_options"]));

        assert_eq!(schema.version, 1);
        assert!(schema.block.attributes.contains_key("name"));
        assert!(schema.block.blocks.contains_key("oidc_options"));
        assert_eq!(schema.block.validators.len(), 1);
    }

    #[test]
    fn test_provider_schema() {
        let provider_schema = ProviderSchema::new()
            .with_provider_config(
                Schema::v0()
                    .with_attribute("client_secret", Attribute::optional_string().sensitive()),
            )
            .with_resource(
                "pingone_group",
                Schema::v0()
                    .with_attribute("name", Attribute::required_string())
                    .with_attribute("id", Attribute::id()),
            )
            .with_data_source(
                "pingone_role",
                Schema::v0().with_attribute("name", Attribute::optional_string()),
            );

        assert!(provider_schema.provider.block.has_sensitive());
        assert!(provider_schema.resources.contains_key("pingone_group"));
        assert!(provider_schema.data_sources.contains_key("pingone_role"));
    }

    #[test]
    fn test_nested_block_modes() {
        let single = NestedBlock::single(Block::new()).required();
        assert_eq!(single.nesting_mode, BlockNestingMode::Single);
        assert_eq!(single.min_items, 1);
        assert_eq!(single.max_items, 1);

        let set = NestedBlock::set(Block::new()).with_min_items(1).computed();
        assert_eq!(set.nesting_mode, BlockNestingMode::Set);
        assert!(set.computed);
    }
}
