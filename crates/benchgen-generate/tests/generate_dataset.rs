use std::collections::{BTreeMap, BTreeSet};

use benchgen_core::{
    AttributeSpec, ConceptOptions, EntityModel, EntitySpec, FanOut, RelationSpec, ValueDomain,
    concepts, retail,
};
use benchgen_generate::{
    GeneratedDataset, GeneratedValue, GenerationConfig, GenerationEngine, GenerationError,
    generate,
};

fn customer_order_model() -> EntityModel {
    EntityModel::new()
        .with_entity(EntitySpec::new("Customer").attribute(AttributeSpec::new(
            "region",
            ValueDomain::enumerated(["north", "south", "east", "west"]),
        )))
        .and_then(|model| {
            model.with_entity(
                EntitySpec::new("Order")
                    .attribute(AttributeSpec::new(
                        "amount",
                        ValueDomain::FloatRange {
                            min: 1.0,
                            max: 100.0,
                        },
                    ))
                    .relation(RelationSpec::one_to_many(
                        "Customer",
                        FanOut::Poisson { mean: 5.0 },
                    )),
            )
        })
        .expect("customer/order model")
}

fn namespaced_columns(dataset: &GeneratedDataset) -> BTreeSet<String> {
    dataset
        .tables()
        .iter()
        .flat_map(|table| table.columns.iter())
        .filter(|column| column.contains('.'))
        .cloned()
        .collect()
}

#[test]
fn generation_is_deterministic() {
    let model = retail().expect("retail");
    let config = GenerationConfig::new(300, 0.6, 7);

    let first = GenerationEngine::new(config.clone()).run(&model).expect("run A");
    let second = GenerationEngine::new(config).run(&model).expect("run B");

    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.report.fingerprint, second.report.fingerprint);

    let other = GenerationEngine::new(GenerationConfig::new(300, 0.6, 8))
        .run(&model)
        .expect("run C");
    assert_ne!(first.report.fingerprint, other.report.fingerprint);
}

#[test]
fn customer_order_scenario() {
    let model = customer_order_model();
    let config = GenerationConfig::new(10, 1.0, 42).with_override("Customer", 2);
    let result = GenerationEngine::new(config).run(&model).expect("run");

    let fact = result.dataset.fact().expect("denormalized fact table");
    assert_eq!(fact.name, "Order");
    assert_eq!(
        fact.columns,
        vec!["key", "amount", "Customer.key", "Customer.region"]
    );
    assert_eq!(result.dataset.tables().len(), 1);
    assert_eq!(result.report.entity_rows("Customer"), Some(2));
    assert_eq!(result.report.entity_rows("Order"), Some(fact.len() as u64));

    let mut regions: BTreeMap<i64, &GeneratedValue> = BTreeMap::new();
    for row in 0..fact.len() {
        let customer = fact
            .value(row, "Customer.key")
            .and_then(GeneratedValue::as_i64)
            .expect("customer key");
        assert!((0..2).contains(&customer));
        let region = fact.value(row, "Customer.region").expect("region");
        let seen = regions.entry(customer).or_insert(region);
        assert_eq!(*seen, region, "customer {customer} must keep one region");
    }
}

#[test]
fn dependent_rows_equal_sum_of_fan_out() {
    let model = EntityModel::new()
        .with_entity(EntitySpec::new("Customer"))
        .and_then(|model| {
            model.with_entity(EntitySpec::new("Order").relation(RelationSpec::one_to_many(
                "Customer",
                FanOut::Fixed { count: 3 },
            )))
        })
        .expect("model");

    let config = GenerationConfig::new(50, 0.0, 1).with_override("Customer", 7);
    let dataset = generate(&model, &config).expect("run");
    assert_eq!(dataset.table("Customer").expect("customers").len(), 7);

    let orders = dataset.table("Order").expect("orders");
    assert_eq!(orders.len(), 21);

    let mut per_customer: BTreeMap<i64, usize> = BTreeMap::new();
    for value in orders.column("Customer_key").expect("fk") {
        *per_customer.entry(value.as_i64().expect("key")).or_default() += 1;
    }
    assert_eq!(per_customer.len(), 7);
    assert!(per_customer.values().all(|count| *count == 3));
}

#[test]
fn fixed_chain_hits_requested_rows() {
    let model = concepts(ConceptOptions::default()).expect("concepts");
    let result = GenerationEngine::new(GenerationConfig::new(100, 0.0, 3))
        .run(&model)
        .expect("run");
    assert_eq!(result.report.entity_rows("subc0"), Some(50));
    assert_eq!(result.report.entity_rows("data"), Some(100));
}

#[test]
fn zero_factor_is_fully_normalized() {
    let model = retail().expect("retail");
    let dataset = generate(&model, &GenerationConfig::new(200, 0.0, 11)).expect("run");

    assert!(dataset.is_normalized());
    assert!(namespaced_columns(&dataset).is_empty());

    let names: Vec<&str> = dataset.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Customer",
            "Product",
            "Promotion",
            "Order",
            "LineItem",
            "LineItem__Promotion"
        ]
    );
}

#[test]
fn full_factor_yields_one_wide_table() {
    let model = retail().expect("retail");
    let dataset = generate(&model, &GenerationConfig::new(200, 1.0, 11)).expect("run");

    assert_eq!(dataset.tables().len(), 1);
    let fact = dataset.fact().expect("fact");
    assert_eq!(fact.name, "LineItem");

    for entity in model.entities() {
        if entity.name == "LineItem" {
            continue;
        }
        for attribute in &entity.attributes {
            let column = format!("{}.{}", entity.name, attribute.name);
            assert!(fact.has_column(&column), "missing {column}");
        }
    }
    assert!(!fact.has_column("Order_key"));
    assert!(!fact.has_column("Product_key"));
}

#[test]
fn denormalization_is_monotonic() {
    let model = retail().expect("retail");
    let mut previous_inlined: Vec<String> = Vec::new();
    let mut previous_columns: BTreeSet<String> = BTreeSet::new();

    for step in 0..=4 {
        let factor = step as f64 / 4.0;
        let dataset = generate(&model, &GenerationConfig::new(120, factor, 5)).expect("run");

        let inlined = dataset.inlined().to_vec();
        assert!(inlined.starts_with(&previous_inlined), "factor {factor}");

        let columns = namespaced_columns(&dataset);
        assert!(previous_columns.is_subset(&columns), "factor {factor}");

        previous_inlined = inlined;
        previous_columns = columns;
    }
    assert_eq!(previous_inlined.len(), 4);
}

#[test]
fn many_to_many_inlining_multiplies_rows() {
    let model = EntityModel::new()
        .with_entity(EntitySpec::new("Tag").attribute(AttributeSpec::new(
            "label",
            ValueDomain::text(6),
        )))
        .and_then(|model| {
            model.with_entity(
                EntitySpec::new("Post")
                    .attribute(AttributeSpec::new(
                        "views",
                        ValueDomain::IntRange { min: 0, max: 1000 },
                    ))
                    .relation(RelationSpec::many_to_many("Tag", FanOut::Fixed { count: 3 })),
            )
        })
        .expect("model");

    let config = GenerationConfig::new(10, 1.0, 2).with_override("Tag", 8);
    let dataset = generate(&model, &config).expect("run");
    let fact = dataset.fact().expect("fact");
    assert_eq!(fact.len(), 30);
    assert!(fact.has_column("Tag.label"));

    let mut per_post: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
    for row in 0..fact.len() {
        let post = fact.value(row, "key").and_then(GeneratedValue::as_i64).expect("post");
        let tag = fact.value(row, "Tag.key").and_then(GeneratedValue::as_i64).expect("tag");
        per_post.entry(post).or_default().insert(tag);
    }
    assert_eq!(per_post.len(), 10);
    assert!(per_post.values().all(|tags| tags.len() == 3));
}

#[test]
fn variable_density_matches_link_table() {
    let model = retail().expect("retail");
    let normalized = generate(&model, &GenerationConfig::new(150, 0.0, 21)).expect("normalized");
    let links = normalized.table("LineItem__Promotion").expect("link table").len();

    let wide = generate(&model, &GenerationConfig::new(150, 1.0, 21)).expect("wide");
    assert_eq!(wide.fact().expect("fact").len(), links);
}

#[test]
fn invalid_configs_are_rejected() {
    let model = customer_order_model();

    let err = generate(&model, &GenerationConfig::new(10, 1.5, 1)).unwrap_err();
    assert_eq!(err.kind(), "InvalidConfigError");

    let err = generate(&model, &GenerationConfig::new(10, 0.5, 1).with_override("Order", 4))
        .unwrap_err();
    assert!(matches!(err, GenerationError::InvalidConfig(_)));

    let err = generate(&model, &GenerationConfig::new(10, 0.5, 1).with_fact_entity("Invoice"))
        .unwrap_err();
    assert!(err.to_string().contains("Invoice"));
}

#[test]
fn cyclic_models_are_rejected() {
    let model = EntityModel::from_entities([
        EntitySpec::new("A").relation(RelationSpec::one_to_many("B", FanOut::Fixed { count: 1 })),
        EntitySpec::new("B").relation(RelationSpec::one_to_many("A", FanOut::Fixed { count: 1 })),
    ])
    .expect("declare");

    let err = generate(&model, &GenerationConfig::default()).unwrap_err();
    assert_eq!(err.kind(), "CyclicReferenceError");
}

fn column_values(dataset: &GeneratedDataset, table: &str, column: &str) -> Vec<GeneratedValue> {
    dataset
        .table(table)
        .and_then(|table| table.column(column))
        .expect("column")
        .into_iter()
        .cloned()
        .collect()
}

#[test]
fn added_attribute_leaves_other_columns_unchanged() {
    let qty = AttributeSpec::new("qty", ValueDomain::IntRange { min: 0, max: 10_000 });
    let narrow = EntityModel::new()
        .with_entity(EntitySpec::new("Item").attribute(qty.clone()))
        .expect("narrow model");
    let wide = EntityModel::new()
        .with_entity(
            EntitySpec::new("Item")
                .attribute(AttributeSpec::new("aaa", ValueDomain::text(8)))
                .attribute(qty),
        )
        .expect("wide model");

    let config = GenerationConfig::new(60, 0.0, 17);
    let narrow = generate(&narrow, &config).expect("narrow run");
    let wide = generate(&wide, &config).expect("wide run");

    assert_eq!(
        column_values(&narrow, "Item", "qty"),
        column_values(&wide, "Item", "qty")
    );
}

fn visit_model(extra_attributes: bool) -> EntityModel {
    let mut customer = EntitySpec::new("Customer").attribute(AttributeSpec::new(
        "region",
        ValueDomain::enumerated(["north", "south", "east"]),
    ));
    let mut visit = EntitySpec::new("Visit")
        .attribute(AttributeSpec::new(
            "minutes",
            ValueDomain::IntRange { min: 1, max: 90 },
        ))
        .relation(RelationSpec::one_to_many(
            "Customer",
            FanOut::Poisson { mean: 3.0 },
        ))
        .relation(RelationSpec::one_to_many(
            "Store",
            FanOut::Uniform { min: 0, max: 4 },
        ));
    if extra_attributes {
        customer = customer.attribute(AttributeSpec::new("score", ValueDomain::FloatRange {
            min: 0.0,
            max: 1.0,
        }));
        visit = visit.attribute(AttributeSpec::new("note", ValueDomain::text(12)).nullable(0.3));
    }

    EntityModel::new()
        .with_entity(customer)
        .and_then(|model| model.with_entity(EntitySpec::new("Store")))
        .and_then(|model| model.with_entity(visit))
        .expect("visit model")
}

#[test]
fn added_attributes_leave_relation_keys_unchanged() {
    let config = GenerationConfig::new(80, 0.0, 23).with_override("Store", 6);
    let base = generate(&visit_model(false), &config).expect("base run");
    let extended = generate(&visit_model(true), &config).expect("extended run");

    for column in ["Customer_key", "Store_key", "minutes"] {
        assert_eq!(
            column_values(&base, "Visit", column),
            column_values(&extended, "Visit", column),
            "column {column}"
        );
    }
    assert_eq!(
        column_values(&base, "Customer", "region"),
        column_values(&extended, "Customer", "region")
    );
}

#[test]
fn diamond_inlining_qualifies_repeated_columns() {
    let model = EntityModel::new()
        .with_entity(EntitySpec::new("Root").attribute(AttributeSpec::new(
            "r",
            ValueDomain::IntRange { min: 0, max: 99 },
        )))
        .and_then(|model| {
            model.with_entity(
                EntitySpec::new("Mid")
                    .relation(
                        RelationSpec::one_to_many("Root", FanOut::Fixed { count: 1 }).named("a"),
                    )
                    .relation(
                        RelationSpec::one_to_many("Root", FanOut::Fixed { count: 1 }).named("b"),
                    ),
            )
        })
        .and_then(|model| {
            model.with_entity(
                EntitySpec::new("Fact")
                    .relation(
                        RelationSpec::one_to_many("Mid", FanOut::Fixed { count: 1 }).named("m"),
                    )
                    .relation(
                        RelationSpec::one_to_many("Root", FanOut::Fixed { count: 1 }).named("b"),
                    ),
            )
        })
        .expect("diamond model");

    let dataset = generate(&model, &GenerationConfig::new(12, 1.0, 4)).expect("run");
    assert_eq!(dataset.tables().len(), 1);

    let fact = dataset.fact().expect("fact");
    assert_eq!(fact.len(), 12);
    assert_eq!(
        fact.columns,
        vec![
            "key",
            "Mid.key",
            "Root.key",
            "Root.r",
            "b.Root.key",
            "b.Root.r",
            "b.b.Root.key",
            "b.b.Root.r"
        ]
    );
}
