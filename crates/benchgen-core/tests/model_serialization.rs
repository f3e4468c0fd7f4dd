use benchgen_core::{
    AttributeSpec, Cardinality, Distribution, EntityModel, EntitySpec, FanOut, RelationSpec,
    ValueDomain,
};

#[test]
fn serializes_model_deterministically() {
    let model = EntityModel::new()
        .with_entity(EntitySpec::new("Customer").attribute(AttributeSpec::new(
            "region",
            ValueDomain::enumerated(["north", "south"]),
        )))
        .and_then(|model| {
            model.with_entity(EntitySpec::new("Order").relation(RelationSpec::one_to_many(
                "Customer",
                FanOut::Fixed { count: 2 },
            )))
        })
        .expect("model");

    let json = serde_json::to_string_pretty(&model).expect("serialize model");
    let expected = r#"{
  "entities": [
    {
      "name": "Customer",
      "attributes": [
        {
          "name": "region",
          "domain": {
            "kind": "enumerated",
            "values": [
              "north",
              "south"
            ]
          },
          "distribution": {
            "kind": "uniform"
          },
          "nullable": false
        }
      ]
    },
    {
      "name": "Order",
      "attributes": [],
      "relations": [
        {
          "target": "Customer",
          "cardinality": {
            "kind": "one_to_many",
            "fan_out": {
              "kind": "fixed",
              "count": 2
            }
          },
          "denormalize": true
        }
      ]
    }
  ]
}"#;
    assert_eq!(json, expected);

    let parsed: EntityModel = serde_json::from_str(&json).expect("parse model");
    assert_eq!(parsed, model);
}

#[test]
fn parses_toml_with_forward_references() {
    let source = r#"
[[entities]]
name = "Order"

[[entities.attributes]]
name = "amount"
domain = { kind = "float_range", min = 1.0, max = 99.5 }

[[entities.relations]]
target = "Customer"
cardinality = { kind = "one_to_many", fan_out = { kind = "poisson", mean = 5.0 } }

[[entities]]
name = "Customer"

[[entities.attributes]]
name = "region"
domain = { kind = "enumerated", values = ["north", "south", "east"] }
distribution = { kind = "zipf", exponent = 1.1 }
nullable = true
null_rate = 0.2
"#;

    let model: EntityModel = toml::from_str(source).expect("parse toml model");
    model.validate().expect("valid model");
    assert_eq!(
        model.topological_order().expect("order"),
        vec!["Customer", "Order"]
    );

    let region = &model.entity("Customer").expect("customer").attributes[0];
    assert_eq!(region.distribution, Distribution::Zipf { exponent: 1.1 });
    assert_eq!(region.effective_null_rate(), 0.2);

    let relation = &model.entity("Order").expect("order").relations[0];
    assert!(relation.denormalize);
    assert_eq!(
        relation.cardinality,
        Cardinality::OneToMany {
            fan_out: FanOut::Poisson { mean: 5.0 }
        }
    );
}

#[test]
fn rejects_duplicate_entities_on_parse() {
    let json = r#"{ "entities": [ { "name": "A" }, { "name": "A" } ] }"#;
    let err = serde_json::from_str::<EntityModel>(json).unwrap_err();
    assert!(err.to_string().contains("duplicate entity: A"));
}

#[test]
fn cyclic_file_parses_but_fails_validation() {
    let json = r#"{
      "entities": [
        { "name": "A", "relations": [ { "target": "B", "cardinality": { "kind": "one_to_many", "fan_out": { "kind": "fixed", "count": 1 } } } ] },
        { "name": "B", "relations": [ { "target": "A", "cardinality": { "kind": "many_to_many", "density": { "kind": "fixed", "count": 1 } } } ] }
      ]
    }"#;
    let model: EntityModel = serde_json::from_str(json).expect("parse model");
    let err = model.validate().unwrap_err();
    assert_eq!(err.kind(), "CyclicReferenceError");
}
