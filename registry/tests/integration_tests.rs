use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use provider_schema_core::*;
use provider_schema_registry::{
    BoxError, ComposeManifest, Contributor, RegistryError, RuntimeInformation, SchemaRegistry,
    StaticContributor, TypeRegistrar,
};
use serde_json::{Value, json};

fn runtime() -> RuntimeInformation {
    RuntimeInformation::new("cloud", "2.0.0")
}

fn parse(schema: &str) -> Value {
    serde_json::from_str(schema).unwrap()
}

fn vpc_map() -> ModuleMap {
    [("vpc", "networking")].into_iter().collect()
}

/// A resource whose schema call walks a two-level type graph, stopping at
/// already-registered types.
struct Subnet {
    calls: Arc<AtomicUsize>,
}

impl Contributor for Subnet {
    type Fragment = ResourceSpec;

    fn token(&self) -> Result<Token, BoxError> {
        Ok(Token::parse("upstream:vpc:Subnet")?)
    }

    fn schema(&self, registrar: &mut TypeRegistrar<'_>) -> Result<ResourceSpec, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let cidr = Token::parse("upstream:vpc:CidrBlock")?;
        let route = Token::parse("upstream:vpc:Route")?;
        let cidr_spec = ComplexTypeSpec::object(
            ObjectTypeSpec::new()
                .with_property("route", PropertySpec::new(TypeSpec::reference_to(&route))),
        );
        if !registrar.register(&cidr, cidr_spec) {
            let route_spec = ComplexTypeSpec::object(
                ObjectTypeSpec::new()
                    .with_property("back", PropertySpec::new(TypeSpec::reference_to(&cidr))),
            );
            registrar.register(&route, route_spec);
        }

        Ok(ResourceSpec::new("A subnet")
            .with_input("cidr", PropertySpec::new(TypeSpec::reference_to(&cidr)), true)
            .with_input(
                "tags",
                PropertySpec::new(TypeSpec::map_of(TypeSpec::primitive("string"))),
                false,
            ))
    }
}

struct BrokenFunction;

impl Contributor for BrokenFunction {
    type Fragment = FunctionSpec;

    fn token(&self) -> Result<Token, BoxError> {
        Ok(Token::parse("upstream:index:getBroken")?)
    }

    fn schema(&self, _registrar: &mut TypeRegistrar<'_>) -> Result<FunctionSpec, BoxError> {
        Err("backend offline".into())
    }
}

#[test]
fn test_module_remap_reaches_tokens_and_references() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = SchemaRegistry::builder()
        .with_resource(Subnet {
            calls: Arc::clone(&calls),
        })
        .with_module_map(vpc_map())
        .build();

    let schema = parse(&registry.get_schema(&runtime()).unwrap());

    let subnet = &schema["resources"]["cloud:networking:Subnet"];
    assert_eq!(
        subnet["inputProperties"]["cidr"]["$ref"],
        "#/types/cloud:networking:CidrBlock"
    );
    assert_eq!(
        subnet["inputProperties"]["tags"]["additionalProperties"]["type"],
        "string"
    );
    assert_eq!(subnet["requiredInputs"], json!(["cidr"]));

    let types = schema["types"].as_object().unwrap();
    assert_eq!(types.len(), 2);
    assert_eq!(
        types["cloud:networking:CidrBlock"]["properties"]["route"]["$ref"],
        "#/types/cloud:networking:Route"
    );
    assert_eq!(
        types["cloud:networking:Route"]["properties"]["back"]["$ref"],
        "#/types/cloud:networking:CidrBlock"
    );
    assert!(registry.diagnostics().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_later_duplicate_overwrites_earlier() {
    let registry = SchemaRegistry::builder()
        .with_resource(StaticContributor::new("a:vpc:Subnet", ResourceSpec::new("first")))
        .with_resource(StaticContributor::new("b:networking:Subnet", ResourceSpec::new("second")))
        .with_module_map(vpc_map())
        .build();

    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    let resources = schema["resources"].as_object().unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources["cloud:networking:Subnet"]["description"], "second");
    assert_eq!(
        registry.diagnostics(),
        vec![Diagnostic::DuplicateToken {
            collection: Collection::Resources,
            token: "cloud:networking:Subnet".into(),
        }]
    );
}

#[test]
fn test_cache_is_invalidated_by_configuration_changes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = SchemaRegistry::builder()
        .with_resource(Subnet {
            calls: Arc::clone(&calls),
        })
        .build();

    let first = registry.get_schema(&runtime()).unwrap();
    let again = registry.get_schema(&runtime()).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(first.contains("cloud:vpc:Subnet"));

    registry.merge_module_map(vpc_map());
    assert!(!registry.is_cached());

    let remapped = registry.get_schema(&runtime()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(remapped.contains("cloud:networking:Subnet"));
    assert!(!remapped.contains("cloud:vpc:Subnet"));
}

#[test]
fn test_contributor_failures_are_aggregated() {
    let registry = SchemaRegistry::builder()
        .with_resource(StaticContributor::new("NotAToken", ResourceSpec::default()))
        .with_function(BrokenFunction)
        .with_function(StaticContributor::new("upstream:index:getOk", FunctionSpec::new("ok")))
        .build();

    let err = registry.get_schema(&runtime()).unwrap_err();
    let RegistryError::Contributions(errors) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(errors.len(), 2);

    let message = err.to_string();
    assert!(message.starts_with("2 errors occurred:\n"));
    assert!(message.contains("\t* failed to resolve token: "));
    assert!(message.contains(
        "\t* failed to get schema for 'cloud:index:getBroken': backend offline"
    ));
    assert!(!registry.is_cached());
}

#[test]
fn test_retry_after_fix_succeeds() {
    let registry = SchemaRegistry::builder()
        .with_provider_resource(StaticContributor::new("bad", ResourceSpec::default()))
        .build();
    assert!(registry.get_schema(&runtime()).is_err());

    registry.set_provider_resource(StaticContributor::new(
        "upstream:index:Provider",
        ResourceSpec::new("provider"),
    ));
    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    assert_eq!(schema["provider"]["description"], "provider");
}

#[test]
fn test_provider_fragment_is_rewritten() {
    let provider = StaticContributor::new(
        "upstream:index:Provider",
        ResourceSpec::new("provider").with_input(
            "region",
            PropertySpec::new(TypeSpec::reference("#/types/upstream:config:Region")),
            false,
        ),
    )
    .with_type(
        "upstream:config:Region",
        ComplexTypeSpec::enumeration(
            "string",
            vec![EnumValueSpec::new(json!("us-east-1")), EnumValueSpec::new(json!("eu-west-1"))],
        ),
    );

    let registry = SchemaRegistry::builder()
        .with_provider_resource(provider)
        .with_module_map([("config", "index")].into_iter().collect::<ModuleMap>())
        .build();

    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    assert_eq!(
        schema["provider"]["inputProperties"]["region"]["$ref"],
        "#/types/cloud:index:Region"
    );
    assert_eq!(schema["types"]["cloud:index:Region"]["enum"][1]["value"], "eu-west-1");
}

#[test]
fn test_foreign_and_malformed_references() {
    let resource = StaticContributor::new(
        "upstream:index:Bucket",
        ResourceSpec::new("bucket")
            .with_input(
                "archive",
                PropertySpec::new(TypeSpec::reference("pulumi.json#/Archive")),
                false,
            )
            .with_input(
                "policy",
                PropertySpec::new(TypeSpec::reference(
                    "/aws/v6.0.0/schema.json#/types/aws:iam:Policy",
                )),
                false,
            )
            .with_input(
                "broken",
                PropertySpec::new(TypeSpec::reference("#/types/onlytwo:parts")),
                false,
            )
            .with_input("owner", PropertySpec::new(TypeSpec::reference("#/provider")), false),
    );

    let registry = SchemaRegistry::builder().with_resource(resource).build();
    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    let inputs = &schema["resources"]["cloud:index:Bucket"]["inputProperties"];
    assert_eq!(inputs["archive"]["$ref"], "pulumi.json#/Archive");
    assert_eq!(
        inputs["policy"]["$ref"],
        "/aws/v6.0.0/schema.json#/types/aws:iam:Policy"
    );
    assert_eq!(inputs["broken"]["$ref"], "#/types/onlytwo:parts");
    assert_eq!(inputs["owner"]["$ref"], "#/provider");

    let diagnostics = registry.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        &diagnostics[0],
        Diagnostic::MalformedReference { reference, .. } if reference == "#/types/onlytwo:parts"
    ));
}

#[test]
fn test_namespacing_is_idempotent() {
    let registry = SchemaRegistry::builder()
        .with_function(StaticContributor::new(
            "cloud:networking:getSubnet",
            FunctionSpec::new("lookup").with_outputs(ObjectTypeSpec::new().with_property(
                "subnet",
                PropertySpec::new(TypeSpec::reference("#/resources/cloud:networking:Subnet")),
            )),
        ))
        .with_module_map(vpc_map())
        .build();

    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    let function = &schema["functions"]["cloud:networking:getSubnet"];
    assert_eq!(
        function["outputs"]["properties"]["subnet"]["$ref"],
        "#/resources/cloud:networking:Subnet"
    );
}

#[test]
fn test_language_map_passes_through_and_merges() {
    let mut nodejs = BTreeMap::new();
    nodejs.insert("nodejs".to_string(), json!({ "packageName": "@cloud/sdk" }));
    let mut python = BTreeMap::new();
    python.insert("python".to_string(), json!({ "packageName": "cloud_sdk" }));
    let mut override_nodejs = BTreeMap::new();
    override_nodejs.insert("nodejs".to_string(), json!({ "packageName": "@cloud/next" }));

    let registry = SchemaRegistry::builder()
        .with_language_map(nodejs)
        .with_language_map(python)
        .build();
    registry.merge_language_map(override_nodejs);

    let schema = parse(&registry.get_schema(&runtime()).unwrap());
    assert_eq!(schema["language"]["nodejs"]["packageName"], "@cloud/next");
    assert_eq!(schema["language"]["python"]["packageName"], "cloud_sdk");
}

#[test]
fn test_generated_schema_validates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = SchemaRegistry::builder()
        .with_resource(Subnet { calls })
        .with_module_map(vpc_map())
        .build();

    let schema = registry.get_schema(&runtime()).unwrap();
    let package: PackageSpec = serde_json::from_str(&schema).unwrap();
    assert!(validate_package(&package).is_empty());
}

#[test]
fn test_concurrent_readers_see_one_generation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(
        SchemaRegistry::builder()
            .with_resource(Subnet {
                calls: Arc::clone(&calls),
            })
            .build(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.get_schema(&runtime()).unwrap())
        })
        .collect();
    let schemas: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(schemas.windows(2).all(|w| w[0] == w[1]));
}

fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_compose_manifest_from_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "compose.yaml",
        r#"
display_name: Cloud
description: Cloud resources
keywords: [category/cloud]
module_map:
  vpc: networking
languages:
  go:
    importBasePath: example.com/cloud
resources:
  - fragments/subnet.json
functions:
  - fragments/get_subnet.json
provider: fragments/provider.json
"#,
    );
    write(
        dir.path(),
        "fragments/subnet.json",
        r##"{
            "token": "upstream:vpc:Subnet",
            "schema": {
                "description": "A subnet",
                "inputProperties": { "cidr": { "$ref": "#/types/upstream:vpc:CidrBlock" } }
            },
            "types": { "upstream:vpc:CidrBlock": { "type": "object" } }
        }"##,
    );
    write(
        dir.path(),
        "fragments/get_subnet.json",
        r##"{
            "token": "upstream:vpc:getSubnet",
            "schema": {
                "outputs": {
                    "properties": { "subnet": { "$ref": "#/resources/upstream:vpc:Subnet" } }
                }
            }
        }"##,
    );
    write(
        dir.path(),
        "fragments/provider.json",
        r#"{ "token": "upstream:index:Provider", "schema": { "description": "The provider" } }"#,
    );

    let manifest = ComposeManifest::load(dir.path().join("compose.yaml")).unwrap();
    let registry = manifest.into_builder(dir.path()).unwrap().build();
    let schema = parse(&registry.get_schema(&runtime()).unwrap());

    assert_eq!(schema["displayName"], "Cloud");
    assert_eq!(schema["keywords"], json!(["category/cloud"]));
    assert_eq!(schema["language"]["go"]["importBasePath"], "example.com/cloud");
    assert_eq!(
        schema["resources"]["cloud:networking:Subnet"]["inputProperties"]["cidr"]["$ref"],
        "#/types/cloud:networking:CidrBlock"
    );
    assert_eq!(
        schema["functions"]["cloud:networking:getSubnet"]["outputs"]["properties"]["subnet"]["$ref"],
        "#/resources/cloud:networking:Subnet"
    );
    assert_eq!(schema["provider"]["description"], "The provider");
}

#[test]
fn test_fragment_pass_through_fields_survive_composition() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "compose.yaml",
        "resources:\n  - fragments/subnet.json\n",
    );
    write(
        dir.path(),
        "fragments/subnet.json",
        r##"{
            "token": "upstream:vpc:Subnet",
            "schema": {
                "description": "A subnet",
                "language": { "csharp": { "name": "SubnetResource" } },
                "inputProperties": {
                    "kind": { "type": "string", "const": "subnet" },
                    "net": {
                        "oneOf": [{ "$ref": "#/types/upstream:vpc:Net" }],
                        "discriminator": {
                            "propertyName": "kind",
                            "mapping": { "net": "#/types/upstream:vpc:Net" }
                        }
                    }
                }
            },
            "types": { "upstream:vpc:Net": { "type": "object" } }
        }"##,
    );

    let manifest = ComposeManifest::load(dir.path().join("compose.yaml")).unwrap();
    let registry = manifest.into_builder(dir.path()).unwrap().build();
    let schema = parse(&registry.get_schema(&runtime()).unwrap());

    let subnet = &schema["resources"]["cloud:vpc:Subnet"];
    assert_eq!(subnet["language"]["csharp"]["name"], "SubnetResource");
    assert_eq!(subnet["inputProperties"]["kind"]["const"], "subnet");
    assert_eq!(
        subnet["inputProperties"]["net"]["discriminator"],
        json!({ "propertyName": "kind", "mapping": { "net": "#/types/cloud:vpc:Net" } })
    );
    assert!(registry.diagnostics().is_empty());
}

#[test]
fn test_forgotten_type_registration_is_reported() {
    let resource = StaticContributor::new(
        "upstream:vpc:Subnet",
        ResourceSpec::new("A subnet")
            .with_input(
                "net",
                PropertySpec::new(TypeSpec::reference("#/types/upstream:vpc:Net")),
                true,
            )
            .with_input(
                "peer",
                PropertySpec::new(TypeSpec::reference("#/types/upstream:vpc:Net")),
                false,
            ),
    );

    let registry = SchemaRegistry::builder()
        .with_resource(resource)
        .with_module_map(vpc_map())
        .build();

    assert!(registry.get_schema(&runtime()).is_ok());
    assert_eq!(
        registry.diagnostics(),
        vec![Diagnostic::DanglingReference {
            reference: "#/types/cloud:networking:Net".into(),
        }]
    );
}
