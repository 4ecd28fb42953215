//! Package schema model.
//!
//! A closed set of node kinds describing a provider package: resources,
//! functions, and complex types, plus the property and type-reference nodes
//! they are built from. Every node serializes to the package schema JSON
//! layout (`camelCase` keys, `$ref` for references, empty collections
//! omitted).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;

use crate::Token;

/// Prefix shared by all references that point inside the package document.
pub const INTERNAL_REF_PREFIX: &str = "#/";

fn is_false(value: &bool) -> bool {
    !*value
}

/// A type node: a primitive, a reference, an array, a map, or a union.
///
/// # Examples
///
/// ```
/// use provider_schema_core::{Token, TypeSpec};
///
/// let cidr = Token::parse("pkg:vpc:CidrBlock").unwrap();
/// let list = TypeSpec::array_of(TypeSpec::reference_to(&cidr));
/// assert_eq!(
///     list.items.unwrap().reference.as_deref(),
///     Some("#/types/pkg:vpc:CidrBlock"),
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpec {
    /// Primitive type name (`string`, `integer`, `array`, `object`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    /// Reference to another schema entry or to an external document.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Element type when `type` is `array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<TypeSpec>>,
    /// Value type when `type` is `object` and used as a map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<TypeSpec>>,
    /// Union alternatives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<TypeSpec>,
    /// How a union value selects its alternative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<DiscriminatorSpec>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub plain: bool,
}

impl TypeSpec {
    /// A primitive type such as `string` or `integer`.
    pub fn primitive(name: &str) -> Self {
        Self {
            r#type: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// A raw `$ref`, internal or external.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    /// An internal reference to the `types` entry for `token`.
    pub fn reference_to(token: &Token) -> Self {
        Self::reference(format!("{INTERNAL_REF_PREFIX}types/{token}"))
    }

    pub fn array_of(items: TypeSpec) -> Self {
        Self {
            r#type: Some("array".to_string()),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    pub fn map_of(values: TypeSpec) -> Self {
        Self {
            r#type: Some("object".to_string()),
            additional_properties: Some(Box::new(values)),
            ..Self::default()
        }
    }

    pub fn one_of(alternatives: Vec<TypeSpec>) -> Self {
        Self {
            one_of: alternatives,
            ..Self::default()
        }
    }
}

/// Union discriminator: the property holding the tag, and tag value to
/// `$ref` of the alternative it selects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatorSpec {
    pub property_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
}

/// Where a property's default comes from when the user leaves it unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultSpec {
    /// Environment variables consulted in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Value>,
}

/// A named member of an object, resource, or function signature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(flatten)]
    pub type_spec: TypeSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The only value the property may take.
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_info: Option<DefaultSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
    /// Per-language overrides, passed through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub replace_on_changes: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub will_replace_on_changes: bool,
}

impl PropertySpec {
    pub fn new(type_spec: TypeSpec) -> Self {
        Self {
            type_spec,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }
}

/// An object shape: named properties plus the names that are required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectTypeSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plain: Vec<String>,
    /// Per-language overrides, passed through verbatim. Resources and
    /// complex types carry theirs here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_overlay: bool,
}

impl ObjectTypeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Adds an optional property.
    pub fn with_property(mut self, name: &str, property: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// Adds a property and lists it in `required`.
    pub fn with_required(mut self, name: &str, property: PropertySpec) -> Self {
        self.properties.insert(name.to_string(), property);
        self.required.push(name.to_string());
        self
    }
}

/// One member of an enum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
}

impl EnumValueSpec {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            description: None,
            value: value.into(),
            deprecation_message: None,
        }
    }

    pub fn named(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new(value)
        }
    }
}

/// An entry of the `types` map: an object type, or an enum when `enum` is
/// non-empty.
///
/// # Examples
///
/// ```
/// use provider_schema_core::{ComplexTypeSpec, EnumValueSpec};
///
/// let tier = ComplexTypeSpec::enumeration(
///     "string",
///     vec![EnumValueSpec::named("Free", "free"), EnumValueSpec::named("Pro", "pro")],
/// );
/// assert!(tier.is_enum());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexTypeSpec {
    #[serde(flatten)]
    pub object: ObjectTypeSpec,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<EnumValueSpec>,
}

impl ComplexTypeSpec {
    /// An object type.
    pub fn object(object: ObjectTypeSpec) -> Self {
        Self {
            object: ObjectTypeSpec {
                r#type: Some("object".to_string()),
                ..object
            },
            enum_values: Vec::new(),
        }
    }

    /// An enum over the primitive `underlying` type.
    pub fn enumeration(underlying: &str, values: Vec<EnumValueSpec>) -> Self {
        Self {
            object: ObjectTypeSpec {
                r#type: Some(underlying.to_string()),
                ..ObjectTypeSpec::default()
            },
            enum_values: values,
        }
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_values.is_empty()
    }
}

/// Alternative identity under which a resource was previously known.
///
/// Alias types are plain token strings, not `$ref`s, and are never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

/// A resource: its output shape, its inputs, and lifecycle metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// Output properties.
    #[serde(flatten)]
    pub object: ObjectTypeSpec,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_properties: BTreeMap<String, PropertySpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plain_inputs: Vec<String>,
    /// Shape accepted when looking up existing resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_inputs: Option<ObjectTypeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<AliasSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_component: bool,
    /// Method name to function token.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub methods: BTreeMap<String, String>,
}

impl ResourceSpec {
    pub fn new(description: &str) -> Self {
        Self {
            object: ObjectTypeSpec::new().with_description(description),
            ..Self::default()
        }
    }

    /// Adds a property that is both an input and an output.
    pub fn with_input(mut self, name: &str, property: PropertySpec, required: bool) -> Self {
        if required {
            self.required_inputs.push(name.to_string());
            self.object.required.push(name.to_string());
        }
        self.input_properties
            .insert(name.to_string(), property.clone());
        self.object.properties.insert(name.to_string(), property);
        self
    }

    /// Adds an output-only property.
    pub fn with_output(mut self, name: &str, property: PropertySpec) -> Self {
        self.object.required.push(name.to_string());
        self.object.properties.insert(name.to_string(), property);
        self
    }
}

/// An invocable function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<ObjectTypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<ObjectTypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_overlay: bool,
}

impl FunctionSpec {
    pub fn new(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
            ..Self::default()
        }
    }

    pub fn with_inputs(mut self, inputs: ObjectTypeSpec) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn with_outputs(mut self, outputs: ObjectTypeSpec) -> Self {
        self.outputs = Some(outputs);
        self
    }
}

/// The composed package schema document.
///
/// `resources`, `functions`, and `types` are keyed by token string. Maps are
/// ordered so serialization is deterministic. `language` holds per-language
/// settings that are passed through verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(
        rename = "pluginDownloadURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub plugin_download_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, ComplexTypeSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ResourceSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, FunctionSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Box<RawValue>>,
}

impl PackageSpec {
    /// Creates an empty package with the two fields a host must supply.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }
}
