use std::collections::BTreeSet;

use crate::entity::{AttributeSpec, EntitySpec, KEY_COLUMN, NAMESPACE_SEPARATOR};
use crate::error::{ModelError, Result};
use crate::model::EntityModel;
use crate::types::{Distribution, MAX_ZIPF_SUPPORT, ValueDomain};

/// Validate internal consistency of an entity model.
///
/// This checks:
/// - the relation graph is acyclic
/// - names are unique, non-empty and free of the namespace separator
/// - attribute domains are non-empty and distribution parameters are usable
/// - relation count distributions are well-formed
pub fn validate_model(model: &EntityModel) -> Result<()> {
    if let Some(path) = model.graph().find_cycle() {
        return Err(ModelError::CyclicReference { path });
    }

    for entity in model.entities() {
        check_name(&entity.name, &entity.name)?;
        validate_attributes(entity)?;
        validate_relations(entity)?;
    }

    Ok(())
}

fn validate_attributes(entity: &EntitySpec) -> Result<()> {
    let mut seen = BTreeSet::new();

    for attribute in &entity.attributes {
        let path = format!("{}.{}", entity.name, attribute.name);
        check_name(&path, &attribute.name)?;

        if attribute.name == KEY_COLUMN {
            return Err(ModelError::invalid(
                path,
                format!("'{KEY_COLUMN}' is reserved for the row key column"),
            ));
        }
        if !seen.insert(attribute.name.as_str()) {
            return Err(ModelError::invalid(path, "duplicate attribute name"));
        }

        if let Some(reason) = attribute.domain.emptiness() {
            return Err(ModelError::EmptyDomain {
                entity: entity.name.clone(),
                attribute: attribute.name.clone(),
                reason,
            });
        }

        validate_attribute_rules(&path, attribute)?;
    }

    Ok(())
}

fn validate_attribute_rules(path: &str, attribute: &AttributeSpec) -> Result<()> {
    if let Some(rate) = attribute.null_rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(ModelError::invalid(
                path,
                format!("null_rate must be within [0, 1], got {rate}"),
            ));
        }
    }

    if attribute.mangle && !attribute.domain.is_text() {
        return Err(ModelError::invalid(
            path,
            "mangle requires a text-producing domain",
        ));
    }

    match &attribute.distribution {
        Distribution::Uniform => {}
        Distribution::Zipf { exponent } => {
            if !exponent.is_finite() || *exponent <= 0.0 {
                return Err(ModelError::invalid(
                    path,
                    format!("zipf exponent must be > 0, got {exponent}"),
                ));
            }
            if let ValueDomain::IntRange { .. } = attribute.domain {
                let size = attribute.domain.finite_size().unwrap_or(u64::MAX);
                if size > MAX_ZIPF_SUPPORT {
                    return Err(ModelError::invalid(
                        path,
                        format!(
                            "zipf over {size} integers exceeds the supported {MAX_ZIPF_SUPPORT} ranks"
                        ),
                    ));
                }
            }
        }
        Distribution::Categorical { cardinality } => {
            if *cardinality == 0 {
                return Err(ModelError::invalid(path, "categorical cardinality must be > 0"));
            }
            if *cardinality as u64 > MAX_ZIPF_SUPPORT {
                return Err(ModelError::invalid(
                    path,
                    format!("categorical cardinality {cardinality} exceeds {MAX_ZIPF_SUPPORT}"),
                ));
            }
            if let Some(size) = attribute.domain.finite_size() {
                if *cardinality as u64 > size {
                    return Err(ModelError::invalid(
                        path,
                        format!(
                            "categorical cardinality {cardinality} exceeds the {size} values of the domain"
                        ),
                    ));
                }
            }
        }
    }

    Ok(())
}

fn validate_relations(entity: &EntitySpec) -> Result<()> {
    let attributes: BTreeSet<&str> = entity
        .attributes
        .iter()
        .map(|attribute| attribute.name.as_str())
        .collect();
    let mut seen = BTreeSet::new();

    for relation in &entity.relations {
        let path = format!("{}.{}", entity.name, relation.name());
        check_name(&path, relation.name())?;

        if !seen.insert(relation.name()) {
            return Err(ModelError::invalid(
                path,
                "duplicate relation name; name one of the relations explicitly",
            ));
        }

        let key_column = relation.key_column();
        if attributes.contains(key_column.as_str()) {
            return Err(ModelError::invalid(
                path,
                format!("foreign key column '{key_column}' collides with an attribute"),
            ));
        }

        if let Some(problem) = relation.cardinality.counts().problem() {
            return Err(ModelError::invalid(path, problem));
        }
    }

    Ok(())
}

fn check_name(path: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ModelError::invalid(path, "name must not be empty"));
    }
    if name.contains(NAMESPACE_SEPARATOR) {
        return Err(ModelError::invalid(
            path,
            format!("name must not contain '{NAMESPACE_SEPARATOR}'"),
        ));
    }
    Ok(())
}
