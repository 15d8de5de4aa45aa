//! Routing of attribute names to typed columns
//!
//! Some attribute names have their own column in the block instead of a
//! row in the generic attribute table: the static well-known set below,
//! plus any dedicated columns configured in the block meta. Conditions on
//! these names become native predicates on the typed column when the
//! operand type agrees; otherwise the condition falls through to the
//! generic table.

use std::collections::HashMap;

use storage::{BlockMeta, DedicatedColumnScope};
use traceql::{AttributeScope, Error, Result, StaticType};
use tracing::warn;

use crate::schema;

/// Where an attribute's column lives and what it stores.
#[derive(Debug, Clone)]
pub struct ColumnEntry {
    pub column_path: String,
    pub scope: AttributeScope,
    pub static_type: StaticType,
}

const WELL_KNOWN: &[(&str, &str, AttributeScope, StaticType)] = &[
    // Resource-level columns
    (
        "service.name",
        schema::resource::SERVICE_NAME,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "cluster",
        schema::resource::CLUSTER,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "namespace",
        schema::resource::NAMESPACE,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "pod",
        schema::resource::POD,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "container",
        schema::resource::CONTAINER,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "k8s.cluster.name",
        schema::resource::K8S_CLUSTER_NAME,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "k8s.namespace.name",
        schema::resource::K8S_NAMESPACE_NAME,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "k8s.pod.name",
        schema::resource::K8S_POD_NAME,
        AttributeScope::Resource,
        StaticType::String,
    ),
    (
        "k8s.container.name",
        schema::resource::K8S_CONTAINER_NAME,
        AttributeScope::Resource,
        StaticType::String,
    ),
    // Span-level columns
    (
        "http.status_code",
        schema::span::HTTP_STATUS_CODE,
        AttributeScope::Span,
        StaticType::Int,
    ),
    (
        "http.method",
        schema::span::HTTP_METHOD,
        AttributeScope::Span,
        StaticType::String,
    ),
    (
        "http.url",
        schema::span::HTTP_URL,
        AttributeScope::Span,
        StaticType::String,
    ),
];

/// Attribute-name → typed-column routing for one block: the static
/// well-known set plus the block's dedicated columns.
#[derive(Debug)]
pub struct ColumnMapping {
    entries: HashMap<String, ColumnEntry>,
}

impl ColumnMapping {
    /// Builds the routing table for one block. Fails on a dedicated column
    /// of a type the format does not store; this runs before any I/O on
    /// the data file.
    pub fn for_block(meta: &BlockMeta) -> Result<Self> {
        let mut entries = HashMap::with_capacity(WELL_KNOWN.len() + meta.dedicated_columns.len());
        for (name, path, scope, static_type) in WELL_KNOWN {
            entries.insert(
                (*name).to_string(),
                ColumnEntry {
                    column_path: (*path).to_string(),
                    scope: *scope,
                    static_type: *static_type,
                },
            );
        }

        // Dedicated columns are assigned slots by position within their
        // scope. Only string values are stored.
        let mut resource_slot = 0usize;
        let mut span_slot = 0usize;
        for dc in &meta.dedicated_columns {
            if !dc.column_type.is_string() {
                return Err(Error::Validation(format!(
                    "unsupported dedicated column type '{}' for attribute {}",
                    dc.column_type.as_str(),
                    dc.name
                )));
            }
            let (slot, scope, path) = match dc.scope {
                DedicatedColumnScope::Resource => {
                    let s = resource_slot;
                    resource_slot += 1;
                    (
                        s,
                        AttributeScope::Resource,
                        schema::dedicated_attrs::resource_column_path(s),
                    )
                }
                DedicatedColumnScope::Span => {
                    let s = span_slot;
                    span_slot += 1;
                    (s, AttributeScope::Span, schema::dedicated_attrs::span_column_path(s))
                }
            };
            if slot >= schema::dedicated_attrs::COLUMNS_PER_SCOPE {
                warn!(name = %dc.name, "dedicated column overflows available slots, ignoring");
                continue;
            }
            entries.insert(
                dc.name.clone(),
                ColumnEntry {
                    column_path: path,
                    scope,
                    static_type: StaticType::String,
                },
            );
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, name: &str) -> Option<&ColumnEntry> {
        self.entries.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::{DedicatedColumn, DedicatedColumnType};
    use uuid::Uuid;

    #[test]
    fn test_well_known_routing() {
        let meta = BlockMeta::new("t", Uuid::new_v4(), schema::VERSION);
        let mapping = ColumnMapping::for_block(&meta).unwrap();

        let entry = mapping.lookup("service.name").unwrap();
        assert_eq!(entry.column_path, schema::resource::SERVICE_NAME);
        assert_eq!(entry.scope, AttributeScope::Resource);
        assert_eq!(entry.static_type, StaticType::String);

        let entry = mapping.lookup("http.status_code").unwrap();
        assert_eq!(entry.scope, AttributeScope::Span);
        assert_eq!(entry.static_type, StaticType::Int);

        assert!(mapping.lookup("foo").is_none());
    }

    #[test]
    fn test_dedicated_columns_assign_slots_per_scope() {
        let meta = BlockMeta::new("t", Uuid::new_v4(), schema::VERSION).with_dedicated_columns(
            vec![
                DedicatedColumn {
                    scope: DedicatedColumnScope::Span,
                    name: "db.statement".into(),
                    column_type: DedicatedColumnType::string(),
                },
                DedicatedColumn {
                    scope: DedicatedColumnScope::Resource,
                    name: "region".into(),
                    column_type: DedicatedColumnType::string(),
                },
                DedicatedColumn {
                    scope: DedicatedColumnScope::Span,
                    name: "db.system".into(),
                    column_type: DedicatedColumnType::string(),
                },
            ],
        );
        let mapping = ColumnMapping::for_block(&meta).unwrap();

        assert_eq!(
            mapping.lookup("db.statement").unwrap().column_path,
            "rs.ils.Spans.DedicatedAttributes.String01"
        );
        assert_eq!(
            mapping.lookup("db.system").unwrap().column_path,
            "rs.ils.Spans.DedicatedAttributes.String02"
        );
        assert_eq!(
            mapping.lookup("region").unwrap().column_path,
            "rs.Resource.DedicatedAttributes.String01"
        );
    }

    #[test]
    fn test_non_string_dedicated_column_rejected() {
        let meta = BlockMeta::new("t", Uuid::new_v4(), schema::VERSION).with_dedicated_columns(
            vec![DedicatedColumn {
                scope: DedicatedColumnScope::Span,
                name: "retries".into(),
                column_type: DedicatedColumnType::new("int"),
            }],
        );

        let err = ColumnMapping::for_block(&meta).unwrap_err();
        match err {
            Error::Validation(msg) => {
                assert!(msg.contains("int"));
                assert!(msg.contains("retries"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
