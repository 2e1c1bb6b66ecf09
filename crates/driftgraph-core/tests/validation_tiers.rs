//! # Validation Tier Tests (T0-T5)
//!
//! If ANY tier fails, the codec is INVALID.
//!
//! ## Tiers
//! - T0: Value Fidelity
//! - T1: Reference Identity
//! - T2: Schema Evolution
//! - T3: Type Removal
//! - T4: Format Integrity
//! - T5: Sessions

use driftgraph_core::{
    Classification, Collection, CustomSerialization, DriftError, EmittedProperty, EnumValue,
    Instance, ManifestEntry, ObjectGraph, ObjectHandle, ObjectId, PrimitiveKind, Serializer,
    SerializerConfig, TypeDefinition, TypeDescriptor, TypeRegistry, Value, from_bytes, to_bytes,
};
use driftgraph_core::constants::DEFAULT_MAX_DEPTH;
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// FIXTURES
// =============================================================================

fn person() -> TypeDescriptor {
    TypeDescriptor::new("app", "Person")
}

fn money() -> TypeDescriptor {
    TypeDescriptor::new("app", "Money")
}

fn color() -> TypeDescriptor {
    TypeDescriptor::enumeration("app", "Color", Some(PrimitiveKind::U8.descriptor())).expect("enum")
}

fn person_v1() -> TypeDefinition {
    TypeDefinition::new(person())
        .with_primitive("name", PrimitiveKind::String)
        .with_primitive("age", PrimitiveKind::I32)
        .with_property("friend", person())
}

fn registry_of(definitions: Vec<TypeDefinition>) -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    for definition in definitions {
        registry.register(definition).expect("register");
    }
    registry
}

fn new_person(graph: &mut ObjectGraph, name: &str, age: i32) -> ObjectHandle {
    graph.alloc(
        Instance::new(person())
            .with("name", name)
            .with("age", age)
            .with("friend", Value::Null),
    )
}

/// `Specified`-mode type: emits `amount` and, when set, `currency`.
struct MoneyHook;

impl CustomSerialization for MoneyHook {
    fn emit_properties(&self, instance: &Instance) -> Vec<EmittedProperty> {
        let mut emitted = vec![EmittedProperty::new(
            "amount",
            PrimitiveKind::I64.descriptor(),
            instance.get("amount").cloned().unwrap_or_default(),
        )];
        if let Some(currency) = instance.get("currency") {
            emitted.push(EmittedProperty::new(
                "currency",
                PrimitiveKind::String.descriptor(),
                currency.clone(),
            ));
        }
        emitted
    }

    fn construct(
        &self,
        descriptor: &TypeDescriptor,
        mut properties: BTreeMap<String, Value>,
    ) -> Result<Instance, DriftError> {
        let amount = properties
            .remove("amount")
            .ok_or_else(|| DriftError::Format("amount is required".to_string()))?;
        let currency = properties
            .remove("currency")
            .unwrap_or_else(|| Value::from("EUR"));
        Ok(Instance::new(descriptor.clone())
            .with("amount", amount)
            .with("currency", currency))
    }
}

fn money_definition(slots: &[(&str, PrimitiveKind)], hook: bool) -> TypeDefinition {
    let mut definition = TypeDefinition::new(money());
    for (name, kind) in slots {
        definition = definition.with_primitive(*name, *kind);
    }
    if hook {
        definition = definition.with_custom(Arc::new(MoneyHook));
    }
    definition
}

fn money_v1() -> TypeDefinition {
    money_definition(
        &[("amount", PrimitiveKind::I64), ("currency", PrimitiveKind::String)],
        true,
    )
}

fn usd_graph() -> ObjectGraph {
    let mut graph = ObjectGraph::new();
    let price = graph.alloc(
        Instance::new(money())
            .with("amount", 1999i64)
            .with("currency", "USD"),
    );
    graph.set_root(price);
    graph
}

// =============================================================================
// TIER T0: VALUE FIDELITY
// =============================================================================

mod t0_value_fidelity {
    use super::*;

    /// T0.1: Every primitive kind survives inside an untyped list.
    #[test]
    fn primitives_roundtrip() {
        let mut registry = TypeRegistry::new();
        registry.register_enum(color()).expect("enum");

        let values = vec![
            Value::from(true),
            Value::from(-5i8),
            Value::from(i16::MIN),
            Value::from(123_456i32),
            Value::from(i64::MAX),
            Value::from(200u8),
            Value::from(u16::MAX),
            Value::from(7u32),
            Value::from(u64::MAX),
            Value::from(0.25f32),
            Value::from(1e300f64),
            Value::from('ß'),
            Value::from("text with ünïcode"),
            Value::from(EnumValue::new(color(), 2)),
            Value::Null,
        ];
        let graph = ObjectGraph::with_root(Collection::list(TypeDescriptor::any(), values));

        let bytes = to_bytes(&graph, &registry).expect("serialize");
        let decoded = from_bytes(&bytes, &registry).expect("deserialize");
        assert_eq!(decoded.graph.root(), graph.root());
    }

    /// T0.2: Primitive arrays keep their element kind and order.
    #[test]
    fn primitive_arrays_roundtrip() {
        let registry = TypeRegistry::new();
        let values = vec![
            Value::from(vec![1u8, 2, 3]),
            Value::from(vec![-1i64, 0, 1]),
            Value::from(vec![0.5f64, 2.0]),
            Value::from(vec!["a".to_string(), "b".to_string()]),
            Value::from(Vec::<i32>::new()),
        ];
        let graph = ObjectGraph::with_root(Collection::array(TypeDescriptor::any(), values));

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        assert_eq!(decoded.graph.root(), graph.root());
    }

    /// T0.3: Nested collections keep kind and declared element type.
    #[test]
    fn nested_collections_roundtrip() {
        let registry = TypeRegistry::new();
        let inner = PrimitiveKind::String.descriptor();
        let rows = vec![
            Value::from(Collection::list(inner.clone(), vec![Value::from("x")])),
            Value::from(Collection::list(inner.clone(), Vec::new())),
            Value::Null,
        ];
        let graph = ObjectGraph::with_root(Collection::array(TypeDescriptor::list_of(inner), rows));

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        assert_eq!(decoded.graph.root(), graph.root());
    }

    /// T0.4: Null in a primitive slot stays null; unset slots get defaults.
    #[test]
    fn nulls_and_defaults() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let anonymous = graph.alloc(Instance::new(person()).with("name", Value::Null));
        graph.set_root(anonymous);

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        let restored = decoded.graph.follow(decoded.graph.root()).expect("root object");
        assert_eq!(restored.get("name"), Some(&Value::Null));
        assert_eq!(restored.get("age"), Some(&Value::from(0i32)));
        assert_eq!(restored.get("friend"), Some(&Value::Null));
    }

    /// T0.5: A null root survives.
    #[test]
    fn null_root() {
        let registry = TypeRegistry::new();
        let decoded = from_bytes(&to_bytes(&ObjectGraph::new(), &registry).expect("serialize"), &registry)
            .expect("deserialize");
        assert!(decoded.graph.root().is_null());
        assert!(decoded.graph.is_empty());
    }
}

// =============================================================================
// TIER T1: REFERENCE IDENTITY
// =============================================================================

mod t1_reference_identity {
    use super::*;

    /// T1.1: An object referenced twice is decoded once.
    #[test]
    fn shared_object_decoded_once() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let bob = new_person(&mut graph, "Bob", 40);
        graph.set_root(Collection::list(person(), vec![Value::from(bob), Value::from(bob)]));

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        let list = decoded.graph.root().as_collection().expect("list");
        assert_eq!(list.items()[0], list.items()[1]);
        assert_eq!(decoded.graph.len(), 1);
    }

    /// T1.2: Two equal copies stay two objects.
    #[test]
    fn copies_stay_distinct() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let first = new_person(&mut graph, "Twin", 20);
        let second = new_person(&mut graph, "Twin", 20);
        graph.set_root(Collection::list(person(), vec![Value::from(first), Value::from(second)]));

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        let list = decoded.graph.root().as_collection().expect("list");
        assert_ne!(list.items()[0], list.items()[1]);
        assert!(decoded.graph.structurally_eq(&graph));
    }

    /// T1.3: Self reference and mutual references terminate and survive.
    #[test]
    fn cycles_survive() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let narcissus = new_person(&mut graph, "Narcissus", 16);
        graph.set_property(narcissus, "friend", narcissus).expect("self");
        let castor = new_person(&mut graph, "Castor", 30);
        let pollux = new_person(&mut graph, "Pollux", 30);
        graph.set_property(castor, "friend", pollux).expect("link");
        graph.set_property(pollux, "friend", castor).expect("link");
        graph.set_root(Collection::array(
            person(),
            vec![Value::from(narcissus), Value::from(castor)],
        ));

        let decoded = from_bytes(&to_bytes(&graph, &registry).expect("serialize"), &registry)
            .expect("deserialize");
        assert!(decoded.graph.structurally_eq(&graph));
        assert_eq!(decoded.graph.len(), 3);

        let items = decoded.graph.root().as_collection().expect("array").items();
        let restored = decoded.graph.follow(&items[0]).expect("narcissus");
        assert_eq!(restored.get("friend"), Some(&items[0]));
    }

    /// T1.4: A chain as deep as the default limit round-trips; one more
    /// level is refused.
    #[test]
    fn long_chain() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        // The first person's null friend sits at depth `length`.
        let mut head = new_person(&mut graph, "p0", 0);
        for i in 1..DEFAULT_MAX_DEPTH {
            let next = new_person(&mut graph, &format!("p{}", i), i as i32);
            graph.set_property(next, "friend", head).expect("link");
            head = next;
        }
        graph.set_root(head);

        let bytes = to_bytes(&graph, &registry).expect("serialize");
        let decoded = from_bytes(&bytes, &registry).expect("deserialize");
        assert!(decoded.graph.structurally_eq(&graph));

        let deeper = new_person(&mut graph, "one too many", 0);
        graph.set_property(deeper, "friend", head).expect("link");
        graph.set_root(deeper);
        assert!(matches!(
            to_bytes(&graph, &registry),
            Err(DriftError::DepthExceeded(DEFAULT_MAX_DEPTH))
        ));
    }
}

// =============================================================================
// TIER T2: SCHEMA EVOLUTION
// =============================================================================

mod t2_schema_evolution {
    use super::*;

    fn alice_bytes() -> Vec<u8> {
        let mut graph = ObjectGraph::new();
        let alice = new_person(&mut graph, "Alice", 30);
        graph.set_root(alice);
        to_bytes(&graph, &registry_of(vec![person_v1()])).expect("serialize")
    }

    /// T2.1: An added property keeps its default and is reported.
    #[test]
    fn added_property_defaults() {
        let v2 = registry_of(vec![person_v1().with_primitive("email", PrimitiveKind::String)]);
        let mut serializer = Serializer::new(Arc::new(v2), SerializerConfig::default());
        let graph = serializer.deserialize(alice_bytes().as_slice()).expect("deserialize");

        let alice = graph.follow(graph.root()).expect("alice");
        assert_eq!(alice.get("name"), Some(&Value::from("Alice")));
        assert_eq!(alice.get("email"), Some(&Value::from("")));

        let resolution = serializer.last_decode().expect("resolution");
        assert_eq!(resolution.classification(ObjectId(0)), Some(Classification::Modified));
        let manifest = serializer.build_manifest().expect("manifest");
        assert!(manifest.entries.contains(&ManifestEntry::AddedProperty {
            type_name: "app::Person".to_string(),
            property: "email".to_string(),
            declared: "core::string".to_string(),
            objects: 1,
        }));
    }

    /// T2.2: A removed property is skipped; its value is previewed on request.
    #[test]
    fn removed_property_skipped_and_previewed() {
        let v3 = registry_of(vec![
            TypeDefinition::new(person())
                .with_primitive("name", PrimitiveKind::String)
                .with_property("friend", person()),
        ]);
        let config = SerializerConfig::default().preview_removed_properties(true);
        let mut serializer = Serializer::new(Arc::new(v3), config);
        let graph = serializer.deserialize(alice_bytes().as_slice()).expect("deserialize");

        let alice = graph.follow(graph.root()).expect("alice");
        assert_eq!(alice.get("age"), None);
        assert_eq!(alice.get("name"), Some(&Value::from("Alice")));

        let resolution = serializer.last_decode().expect("resolution");
        let modified = resolution.modified().get(&ObjectId(0)).expect("modified");
        assert_eq!(modified.preview.get("age"), Some(&Value::from(30i32)));

        let manifest = serializer.build_manifest().expect("manifest");
        assert!(manifest.entries.iter().any(|entry| matches!(
            entry,
            ManifestEntry::RemovedProperty { property, objects: 1, .. } if property == "age"
        )));
    }

    /// T2.3: Without preview, removed values are not retained.
    #[test]
    fn removed_property_not_retained_by_default() {
        let v3 = registry_of(vec![TypeDefinition::new(person()).with_primitive("name", PrimitiveKind::String)]);
        for ignore in [true, false] {
            let config = SerializerConfig::default().ignore_removed_properties(ignore);
            let mut serializer = Serializer::new(Arc::new(v3.clone()), config);
            serializer.deserialize(alice_bytes().as_slice()).expect("deserialize");
            let modified = serializer
                .last_decode()
                .and_then(|resolution| resolution.modified().get(&ObjectId(0)).cloned())
                .expect("modified");
            assert!(modified.preview.is_empty());
        }
    }

    /// T2.4: A retyped property is removed and re-added with its default.
    #[test]
    fn retyped_property_resets() {
        let retyped = registry_of(vec![
            TypeDefinition::new(person())
                .with_primitive("name", PrimitiveKind::String)
                .with_primitive("age", PrimitiveKind::I64)
                .with_property("friend", person()),
        ]);
        let decoded = from_bytes(&alice_bytes(), &retyped).expect("deserialize");
        let alice = decoded.graph.follow(decoded.graph.root()).expect("alice");
        assert_eq!(alice.get("age"), Some(&Value::from(0i64)));
    }

    /// T2.5: Specified mode resolves when every stored slot is accepted.
    #[test]
    fn specified_mode_roundtrip() {
        let registry = registry_of(vec![money_v1()]);
        let decoded = from_bytes(&to_bytes(&usd_graph(), &registry).expect("serialize"), &registry)
            .expect("deserialize");
        assert!(decoded.graph.structurally_eq(&usd_graph()));
        assert!(decoded.resolution.is_clean());
    }

    /// T2.6: Specified mode hands only accepted properties to the hook.
    #[test]
    fn specified_mode_drops_unaccepted() {
        let bytes = to_bytes(&usd_graph(), &registry_of(vec![money_v1()])).expect("serialize");
        let narrowed = registry_of(vec![money_definition(&[("amount", PrimitiveKind::I64)], true)]);

        let decoded = from_bytes(&bytes, &narrowed).expect("deserialize");
        let price = decoded.graph.follow(decoded.graph.root()).expect("price");
        assert_eq!(price.get("amount"), Some(&Value::from(1999i64)));
        assert_eq!(price.get("currency"), Some(&Value::from("EUR")));
        assert_eq!(
            decoded.resolution.classification(ObjectId(0)),
            Some(Classification::Modified)
        );
        let outcome = decoded.resolution.specification(0).expect("spec");
        assert!(outcome.added().is_empty());
    }
}

// =============================================================================
// TIER T3: TYPE REMOVAL
// =============================================================================

mod t3_type_removal {
    use super::*;

    fn owner() -> TypeDescriptor {
        TypeDescriptor::new("app", "Owner")
    }

    fn pet() -> TypeDescriptor {
        TypeDescriptor::new("app", "Pet")
    }

    fn owner_definition() -> TypeDefinition {
        TypeDefinition::new(owner())
            .with_primitive("name", PrimitiveKind::String)
            .with_property("pet", pet())
    }

    fn pet_definition() -> TypeDefinition {
        TypeDefinition::new(pet())
            .with_primitive("name", PrimitiveKind::String)
            .with_property("owner", owner())
    }

    /// T3.1: A missing object decodes to null; its children are consumed and
    /// the surrounding object still decodes.
    #[test]
    fn missing_object_becomes_null() {
        let mut graph = ObjectGraph::new();
        let jon = graph.alloc(Instance::new(owner()).with("name", "Jon"));
        let garfield = graph.alloc(Instance::new(pet()).with("name", "Garfield").with("owner", jon));
        graph.set_property(jon, "pet", garfield).expect("link");
        graph.set_root(Collection::list(
            TypeDescriptor::any(),
            vec![Value::from(jon), Value::from(garfield), Value::from("tail")],
        ));
        let bytes = to_bytes(&graph, &registry_of(vec![owner_definition(), pet_definition()]))
            .expect("serialize");

        let mut serializer = Serializer::new(
            Arc::new(registry_of(vec![owner_definition()])),
            SerializerConfig::default(),
        );
        let decoded = serializer.deserialize(bytes.as_slice()).expect("deserialize");

        let items = decoded.root().as_collection().expect("list").items();
        let jon = decoded.follow(&items[0]).expect("jon");
        assert_eq!(jon.get("name"), Some(&Value::from("Jon")));
        assert_eq!(jon.get("pet"), Some(&Value::Null));
        // Reference to the missing pet.
        assert!(items[1].is_null());
        // Stream position survived the skipped object.
        assert_eq!(items[2], Value::from("tail"));

        let resolution = serializer.last_decode().expect("resolution");
        assert_eq!(resolution.classification(ObjectId(0)), Some(Classification::Resolved));
        assert_eq!(resolution.classification(ObjectId(1)), Some(Classification::Missing));

        let manifest = serializer.build_manifest().expect("manifest");
        assert_eq!(manifest.missing_types().collect::<Vec<_>>(), vec!["app::Pet"]);
        assert_eq!(manifest.objects.missing, 1);
    }

    /// T3.2: Polymorphic elements of a removed subtype become null.
    #[test]
    fn removed_subtype_in_polymorphic_list() {
        let shape = TypeDescriptor::new("geo", "Shape");
        let circle = TypeDescriptor::new("geo", "Circle");
        let square = TypeDescriptor::new("geo", "Square");
        let base = || TypeDefinition::new(shape.clone());
        let circle_definition = || TypeDefinition::new(circle.clone()).with_primitive("radius", PrimitiveKind::F64);
        let square_definition = TypeDefinition::new(square.clone()).with_primitive("side", PrimitiveKind::F64);

        let mut graph = ObjectGraph::new();
        let c = graph.alloc(Instance::new(circle.clone()).with("radius", 1.5f64));
        let s = graph.alloc(Instance::new(square.clone()).with("side", 2.0f64));
        graph.set_root(Collection::list(shape.clone(), vec![Value::from(c), Value::from(s)]));
        let bytes = to_bytes(
            &graph,
            &registry_of(vec![base(), circle_definition(), square_definition]),
        )
        .expect("serialize");

        let decoded = from_bytes(&bytes, &registry_of(vec![base(), circle_definition()]))
            .expect("deserialize");
        let items = decoded.graph.root().as_collection().expect("list").items();
        let restored = decoded.graph.follow(&items[0]).expect("circle");
        assert_eq!(restored.type_descriptor(), &circle);
        assert_eq!(restored.get("radius"), Some(&Value::from(1.5f64)));
        assert!(items[1].is_null());
    }

    /// T3.3: A missing enum type decodes its values to null.
    #[test]
    fn missing_enum_value_becomes_null() {
        let mut with_enum = TypeRegistry::new();
        with_enum.register_enum(color()).expect("enum");
        let graph = ObjectGraph::with_root(Collection::list(
            TypeDescriptor::any(),
            vec![Value::from(EnumValue::new(color(), 1)), Value::from(5i32)],
        ));
        let bytes = to_bytes(&graph, &with_enum).expect("serialize");

        let decoded = from_bytes(&bytes, &TypeRegistry::new()).expect("deserialize");
        let items = decoded.graph.root().as_collection().expect("list").items();
        assert!(items[0].is_null());
        assert_eq!(items[1], Value::from(5i32));
    }
}

// =============================================================================
// TIER T4: FORMAT INTEGRITY
// =============================================================================

mod t4_format_integrity {
    use super::*;
    use driftgraph_core::constants::FORMAT_VERSION;
    use driftgraph_core::formats::header::{
        Preamble, WireDefinition, WireGroup, WireHeader, WireSpecification, WireType,
    };

    fn null_root_bytes() -> Vec<u8> {
        to_bytes(&ObjectGraph::new(), &TypeRegistry::new()).expect("serialize")
    }

    fn assert_format_error(bytes: &[u8]) {
        let result = from_bytes(bytes, &TypeRegistry::new());
        assert!(
            matches!(result, Err(DriftError::Format(_))),
            "expected format error, got {:?}",
            result.map(|decoded| decoded.nodes)
        );
    }

    /// T4.1: Bad magic bytes are rejected.
    #[test]
    fn bad_magic() {
        let mut bytes = null_root_bytes();
        bytes[0] = b'X';
        assert_format_error(&bytes);
    }

    /// T4.2: Unsupported versions are rejected.
    #[test]
    fn bad_version() {
        let mut bytes = null_root_bytes();
        bytes[4] = FORMAT_VERSION.wrapping_add(1);
        assert_format_error(&bytes);
    }

    /// T4.3: Every truncation point is a format error.
    #[test]
    fn truncation() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let alice = new_person(&mut graph, "Alice", 30);
        graph.set_root(alice);
        let bytes = to_bytes(&graph, &registry).expect("serialize");

        for len in 0..bytes.len() {
            let result = from_bytes(&bytes[..len], &registry);
            assert!(
                matches!(result, Err(DriftError::Format(_))),
                "truncation at {} not detected",
                len
            );
        }
    }

    /// T4.4: An unknown node tag is rejected.
    #[test]
    fn unknown_tag() {
        let mut bytes = null_root_bytes();
        let node = bytes.len() - 10;
        bytes[node] = 0x7f;
        assert_format_error(&bytes);
    }

    /// T4.5: A reference to an object never written is rejected.
    #[test]
    fn dangling_reference() {
        let mut bytes = null_root_bytes();
        bytes.truncate(bytes.len() - 10);
        bytes.extend_from_slice(&[4, 0]);
        bytes.extend_from_slice(&[0; 8]);
        bytes.extend_from_slice(&5u32.to_le_bytes());
        assert_format_error(&bytes);
    }

    /// T4.6: Every object the header declares must be written.
    #[test]
    fn declared_object_never_written() {
        let mut graph = ObjectGraph::new();
        let alice = new_person(&mut graph, "Alice", 30);
        graph.set_root(alice);
        let mut bytes = to_bytes(&graph, &registry_of(vec![person_v1()])).expect("serialize");

        // Keep the header, replace the node stream with a lone null root.
        let header_len = u32::from_le_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) as usize;
        bytes.truncate(9 + header_len);
        bytes.extend_from_slice(&[0; 10]);

        let result = from_bytes(&bytes, &registry_of(vec![person_v1()]));
        assert!(matches!(result, Err(DriftError::Format(_))));
    }

    /// T4.7: Two groups claiming one object id are rejected.
    #[test]
    fn duplicate_specification() {
        let int = PrimitiveKind::I32.descriptor();
        let wire = WireHeader {
            types: vec![WireType::from(&person()), WireType::from(&int)],
            specifications: vec![WireSpecification {
                declaring: person().hash().value(),
                implementing: person().hash().value(),
                user_defined: false,
                definitions: vec![WireDefinition {
                    name: "age".to_string(),
                    declaring: int.hash().value(),
                    implementing: int.hash().value(),
                }],
            }],
            groups: vec![
                WireGroup {
                    specification: 0,
                    objects: vec![0],
                },
                WireGroup {
                    specification: 0,
                    objects: vec![0],
                },
            ],
        };
        let payload = postcard::to_stdvec(&wire).expect("encode");
        let mut bytes = Preamble::new().to_bytes().to_vec();
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);

        let result = from_bytes(&bytes, &TypeRegistry::new());
        assert!(matches!(
            result,
            Err(DriftError::DuplicateSpecification(ObjectId(0)))
        ));
    }

    /// T4.8: A hook that cannot construct reports a construction error.
    #[test]
    fn specified_construction_failure() {
        let bytes = to_bytes(&usd_graph(), &registry_of(vec![money_v1()])).expect("serialize");
        let without_amount =
            registry_of(vec![money_definition(&[("currency", PrimitiveKind::String)], true)]);

        let result = from_bytes(&bytes, &without_amount);
        assert!(matches!(
            result,
            Err(DriftError::Construction {
                object: ObjectId(0),
                ..
            })
        ));
    }

    /// T4.9: Specified data for a type that lost its hook cannot be built.
    #[test]
    fn specified_without_hook() {
        let bytes = to_bytes(&usd_graph(), &registry_of(vec![money_v1()])).expect("serialize");
        let plain = registry_of(vec![money_definition(
            &[("amount", PrimitiveKind::I64), ("currency", PrimitiveKind::String)],
            false,
        )]);
        assert!(matches!(
            from_bytes(&bytes, &plain),
            Err(DriftError::Construction { .. })
        ));
    }

    /// T4.10: The writer rejects instances of unregistered types.
    #[test]
    fn unknown_type_on_write() {
        let mut graph = ObjectGraph::new();
        let ghost = graph.alloc(Instance::new(TypeDescriptor::new("app", "Ghost")));
        graph.set_root(ghost);
        assert!(matches!(
            to_bytes(&graph, &TypeRegistry::new()),
            Err(DriftError::UnknownType(_))
        ));
    }
}

// =============================================================================
// TIER T5: SESSIONS
// =============================================================================

mod t5_sessions {
    use super::*;
    use std::fs::File;

    /// T5.1: Same graph, same registry, same bytes.
    #[test]
    fn encoding_deterministic() {
        let registry = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let a = new_person(&mut graph, "A", 1);
        let b = new_person(&mut graph, "B", 2);
        graph.set_property(a, "friend", b).expect("link");
        graph.set_root(a);

        assert_eq!(
            to_bytes(&graph, &registry).expect("first"),
            to_bytes(&graph, &registry).expect("second")
        );
    }

    /// T5.2: Independent serializers share one registry across threads.
    #[test]
    fn parallel_sessions() {
        let registry = Arc::new(registry_of(vec![person_v1(), money_v1()]));

        std::thread::scope(|scope| {
            for worker in 0..4i32 {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    let mut serializer = Serializer::new(registry, SerializerConfig::default());
                    for round in 0..10 {
                        let mut graph = ObjectGraph::new();
                        let p = new_person(&mut graph, &format!("w{}r{}", worker, round), round);
                        graph.set_property(p, "friend", p).expect("self");
                        graph.set_root(p);

                        let mut bytes = Vec::new();
                        serializer.serialize(&mut bytes, &graph).expect("serialize");
                        let restored = serializer.deserialize(bytes.as_slice()).expect("deserialize");
                        assert!(restored.structurally_eq(&graph));
                    }
                });
            }
        });
    }

    /// T5.3: Round trip through a real file.
    #[test]
    fn file_roundtrip() {
        let registry = Arc::new(registry_of(vec![person_v1()]));
        let mut graph = ObjectGraph::new();
        let carol = new_person(&mut graph, "Carol", 52);
        graph.set_root(Collection::list(person(), vec![Value::from(carol); 3]));

        let file = tempfile::NamedTempFile::new().expect("temp file");
        let mut serializer = Serializer::new(registry, SerializerConfig::default());
        serializer
            .serialize(File::create(file.path()).expect("create"), &graph)
            .expect("serialize");
        let restored = serializer
            .deserialize(File::open(file.path()).expect("open"))
            .expect("deserialize");

        assert!(restored.structurally_eq(&graph));
        assert_eq!(restored.len(), 1);
    }

    /// T5.4: The manifest reflects the latest deserialization only.
    #[test]
    fn manifest_tracks_last_decode() {
        let v1 = registry_of(vec![person_v1()]);
        let mut graph = ObjectGraph::new();
        let dave = new_person(&mut graph, "Dave", 33);
        graph.set_root(dave);
        let bytes = to_bytes(&graph, &v1).expect("serialize");

        let mut serializer = Serializer::new(Arc::new(TypeRegistry::new()), SerializerConfig::default());
        assert!(matches!(
            serializer.build_manifest(),
            Err(DriftError::NoDeserialization)
        ));

        serializer.deserialize(bytes.as_slice()).expect("missing types");
        assert_eq!(serializer.build_manifest().expect("manifest").objects.missing, 1);

        let clean = ObjectGraph::with_root(Value::from(1i32));
        let clean_bytes = to_bytes(&clean, &v1).expect("serialize");
        serializer.deserialize(clean_bytes.as_slice()).expect("clean");
        assert!(serializer.build_manifest().expect("manifest").is_empty());
    }
}
