/// Conversions between driver types and SDK types

use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::primitives::{Blob, DateTimeFormat};
use aws_sdk_dynamodb::types as sdk;
use bytes::Bytes;
use dynoql_core::schema::{
    AttributeDefinition, BillingMode, BillingModeSummary, IndexDescriptor, KeySchemaElement,
    KeyType, LocalSecondaryIndex, Projection, ProjectionType, ProvisionedThroughput, ScalarType,
    TableClass, TableClassSummary, TableDescriptor, ThroughputUpdate,
};
use dynoql_core::store::{ConsumedCapacity, StoreResult};
use dynoql_core::{AttributeValue, Item, StoreError};
use std::collections::HashMap;

pub(crate) fn invalid_request(err: BuildError) -> StoreError {
    StoreError::Validation(err.to_string())
}

// ============================================================================
// Attribute values
// ============================================================================

pub fn to_sdk_value(value: &AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::N(n) => sdk::AttributeValue::N(n.clone()),
        AttributeValue::S(s) => sdk::AttributeValue::S(s.clone()),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(*b),
        AttributeValue::Null => sdk::AttributeValue::Null(true),
        AttributeValue::L(items) => sdk::AttributeValue::L(items.iter().map(to_sdk_value).collect()),
        AttributeValue::M(map) => sdk::AttributeValue::M(to_sdk_item(map)),
        AttributeValue::Ss(items) => sdk::AttributeValue::Ss(items.clone()),
        AttributeValue::Ns(items) => sdk::AttributeValue::Ns(items.clone()),
        AttributeValue::Bs(items) => {
            sdk::AttributeValue::Bs(items.iter().map(|b| Blob::new(b.to_vec())).collect())
        }
    }
}

pub fn to_sdk_item(item: &Item) -> HashMap<String, sdk::AttributeValue> {
    item.iter().map(|(k, v)| (k.clone(), to_sdk_value(v))).collect()
}

pub fn from_sdk_value(value: &sdk::AttributeValue) -> StoreResult<AttributeValue> {
    Ok(match value {
        sdk::AttributeValue::N(n) => AttributeValue::N(n.clone()),
        sdk::AttributeValue::S(s) => AttributeValue::S(s.clone()),
        sdk::AttributeValue::B(b) => AttributeValue::B(Bytes::copy_from_slice(b.as_ref())),
        sdk::AttributeValue::Bool(b) => AttributeValue::Bool(*b),
        sdk::AttributeValue::Null(_) => AttributeValue::Null,
        sdk::AttributeValue::L(items) => AttributeValue::L(
            items.iter().map(from_sdk_value).collect::<StoreResult<Vec<_>>>()?,
        ),
        sdk::AttributeValue::M(map) => AttributeValue::M(from_sdk_item(map)?),
        sdk::AttributeValue::Ss(items) => AttributeValue::Ss(items.clone()),
        sdk::AttributeValue::Ns(items) => AttributeValue::Ns(items.clone()),
        sdk::AttributeValue::Bs(items) => AttributeValue::Bs(
            items.iter().map(|b| Bytes::copy_from_slice(b.as_ref())).collect(),
        ),
        other => {
            return Err(StoreError::Transport(format!(
                "unsupported attribute value in response: {:?}",
                other
            )))
        }
    })
}

pub fn from_sdk_item(item: &HashMap<String, sdk::AttributeValue>) -> StoreResult<Item> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_sdk_value(v)?)))
        .collect()
}

pub(crate) fn from_sdk_capacity(c: &sdk::ConsumedCapacity) -> ConsumedCapacity {
    ConsumedCapacity {
        table_name: c.table_name().map(String::from),
        capacity_units: c.capacity_units(),
        read_capacity_units: c.read_capacity_units(),
        write_capacity_units: c.write_capacity_units(),
    }
}

// ============================================================================
// Schema: driver -> SDK
// ============================================================================

fn scalar_type(t: ScalarType) -> sdk::ScalarAttributeType {
    match t {
        ScalarType::S => sdk::ScalarAttributeType::S,
        ScalarType::N => sdk::ScalarAttributeType::N,
        ScalarType::B => sdk::ScalarAttributeType::B,
    }
}

fn key_type(t: KeyType) -> sdk::KeyType {
    match t {
        KeyType::Hash => sdk::KeyType::Hash,
        KeyType::Range => sdk::KeyType::Range,
    }
}

pub(crate) fn billing_mode(m: BillingMode) -> sdk::BillingMode {
    match m {
        BillingMode::PayPerRequest => sdk::BillingMode::PayPerRequest,
        BillingMode::Provisioned => sdk::BillingMode::Provisioned,
    }
}

pub(crate) fn table_class(c: TableClass) -> sdk::TableClass {
    match c {
        TableClass::Standard => sdk::TableClass::Standard,
        TableClass::StandardInfrequentAccess => sdk::TableClass::StandardInfrequentAccess,
    }
}

pub(crate) fn attribute_definitions(
    defs: &[AttributeDefinition],
) -> StoreResult<Vec<sdk::AttributeDefinition>> {
    defs.iter()
        .map(|d| {
            sdk::AttributeDefinition::builder()
                .attribute_name(&d.attribute_name)
                .attribute_type(scalar_type(d.attribute_type))
                .build()
                .map_err(invalid_request)
        })
        .collect()
}

pub(crate) fn key_schema(keys: &[KeySchemaElement]) -> StoreResult<Vec<sdk::KeySchemaElement>> {
    keys.iter()
        .map(|k| {
            sdk::KeySchemaElement::builder()
                .attribute_name(&k.attribute_name)
                .key_type(key_type(k.key_type))
                .build()
                .map_err(invalid_request)
        })
        .collect()
}

pub(crate) fn projection(p: &Projection) -> sdk::Projection {
    let projection_type = match p.projection_type {
        ProjectionType::All => sdk::ProjectionType::All,
        ProjectionType::KeysOnly => sdk::ProjectionType::KeysOnly,
        ProjectionType::Include => sdk::ProjectionType::Include,
    };
    let non_key = (!p.non_key_attributes.is_empty()).then(|| p.non_key_attributes.clone());
    sdk::Projection::builder()
        .projection_type(projection_type)
        .set_non_key_attributes(non_key)
        .build()
}

pub(crate) fn throughput(t: &ProvisionedThroughput) -> StoreResult<sdk::ProvisionedThroughput> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(t.read_capacity_units)
        .write_capacity_units(t.write_capacity_units)
        .build()
        .map_err(invalid_request)
}

/// The SDK requires both capacities, so a partial update fails here.
pub(crate) fn throughput_update(t: &ThroughputUpdate) -> StoreResult<sdk::ProvisionedThroughput> {
    sdk::ProvisionedThroughput::builder()
        .set_read_capacity_units(t.read_capacity_units)
        .set_write_capacity_units(t.write_capacity_units)
        .build()
        .map_err(invalid_request)
}

pub(crate) fn local_indexes(
    indexes: &[LocalSecondaryIndex],
) -> StoreResult<Option<Vec<sdk::LocalSecondaryIndex>>> {
    if indexes.is_empty() {
        return Ok(None);
    }
    indexes
        .iter()
        .map(|idx| {
            sdk::LocalSecondaryIndex::builder()
                .index_name(&idx.index_name)
                .set_key_schema(Some(key_schema(&idx.key_schema)?))
                .projection(projection(&idx.projection))
                .build()
                .map_err(invalid_request)
        })
        .collect::<StoreResult<Vec<_>>>()
        .map(Some)
}

// ============================================================================
// Schema: SDK -> driver
// ============================================================================

fn from_key_schema(keys: &[sdk::KeySchemaElement]) -> Vec<KeySchemaElement> {
    keys.iter()
        .map(|k| match k.key_type() {
            sdk::KeyType::Range => KeySchemaElement::range(k.attribute_name()),
            _ => KeySchemaElement::hash(k.attribute_name()),
        })
        .collect()
}

fn from_projection(p: &sdk::Projection) -> Option<Projection> {
    let projection_type = match p.projection_type()? {
        sdk::ProjectionType::All => ProjectionType::All,
        sdk::ProjectionType::Include => ProjectionType::Include,
        _ => ProjectionType::KeysOnly,
    };
    Some(Projection {
        projection_type,
        non_key_attributes: p.non_key_attributes().to_vec(),
    })
}

fn from_throughput(t: &sdk::ProvisionedThroughputDescription) -> ProvisionedThroughput {
    ProvisionedThroughput {
        read_capacity_units: t.read_capacity_units().unwrap_or_default(),
        write_capacity_units: t.write_capacity_units().unwrap_or_default(),
    }
}

fn from_global_index(idx: &sdk::GlobalSecondaryIndexDescription) -> IndexDescriptor {
    IndexDescriptor {
        index_name: idx.index_name().unwrap_or_default().to_string(),
        index_status: idx.index_status().map(|s| s.as_str().to_string()),
        key_schema: from_key_schema(idx.key_schema()),
        projection: idx.projection().and_then(from_projection),
        provisioned_throughput: idx.provisioned_throughput().map(from_throughput),
        index_size_bytes: idx.index_size_bytes(),
        item_count: idx.item_count(),
        index_arn: idx.index_arn().map(String::from),
        backfilling: idx.backfilling(),
    }
}

fn from_local_index(idx: &sdk::LocalSecondaryIndexDescription) -> IndexDescriptor {
    IndexDescriptor {
        index_name: idx.index_name().unwrap_or_default().to_string(),
        key_schema: from_key_schema(idx.key_schema()),
        projection: idx.projection().and_then(from_projection),
        index_size_bytes: idx.index_size_bytes(),
        item_count: idx.item_count(),
        index_arn: idx.index_arn().map(String::from),
        ..Default::default()
    }
}

pub(crate) fn from_table_description(t: &sdk::TableDescription) -> TableDescriptor {
    TableDescriptor {
        table_name: t.table_name().unwrap_or_default().to_string(),
        table_status: t.table_status().map(|s| s.as_str().to_string()),
        table_arn: t.table_arn().map(String::from),
        attribute_definitions: t
            .attribute_definitions()
            .iter()
            .filter_map(|d| {
                ScalarType::parse(d.attribute_type().as_str())
                    .map(|ty| AttributeDefinition::new(d.attribute_name(), ty))
            })
            .collect(),
        key_schema: from_key_schema(t.key_schema()),
        billing_mode_summary: t
            .billing_mode_summary()
            .and_then(|s| s.billing_mode())
            .map(|m| BillingModeSummary {
                billing_mode: match m {
                    sdk::BillingMode::PayPerRequest => BillingMode::PayPerRequest,
                    _ => BillingMode::Provisioned,
                },
            }),
        provisioned_throughput: t.provisioned_throughput().map(from_throughput),
        table_class_summary: t
            .table_class_summary()
            .and_then(|s| s.table_class())
            .and_then(|c| TableClass::parse(c.as_str()))
            .map(|table_class| TableClassSummary { table_class }),
        global_secondary_indexes: t
            .global_secondary_indexes()
            .iter()
            .map(from_global_index)
            .collect(),
        local_secondary_indexes: t
            .local_secondary_indexes()
            .iter()
            .map(from_local_index)
            .collect(),
        item_count: t.item_count(),
        table_size_bytes: t.table_size_bytes(),
        creation_date_time: t
            .creation_date_time()
            .and_then(|dt| dt.fmt(DateTimeFormat::DateTime).ok()),
    }
}
