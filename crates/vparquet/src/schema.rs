//! Column paths and definition levels of the vParquet block schema
//!
//! The block is one Parquet file with a nested schema: trace →
//! resource-spans (`rs`) → instrumentation-library-spans (`ils`) → spans,
//! plus one generic key/typed-value attribute table under the resource and
//! under the span. Columns are addressed by dotted path.

/// Block format version this engine reads. A block whose meta carries a
/// different version string is refused before any I/O on the data file.
pub const VERSION: &str = "vParquet";

/// Trace-level column paths
pub mod trace {
    /// Binary trace ID (16 bytes)
    pub const TRACE_ID: &str = "TraceID";

    /// Start time in nanoseconds since Unix epoch
    pub const START_TIME_UNIX_NANO: &str = "StartTimeUnixNano";

    /// Duration in nanoseconds
    pub const DURATION_NANOS: &str = "DurationNanos";

    /// Root span name (first span's name)
    pub const ROOT_SPAN_NAME: &str = "RootSpanName";

    /// Root service name (first span's service)
    pub const ROOT_SERVICE_NAME: &str = "RootServiceName";
}

/// Resource-level column paths
pub mod resource {
    /// Service name (service.name attribute)
    pub const SERVICE_NAME: &str = "rs.Resource.ServiceName";

    /// Cluster name
    pub const CLUSTER: &str = "rs.Resource.Cluster";

    /// Namespace
    pub const NAMESPACE: &str = "rs.Resource.Namespace";

    /// Pod name
    pub const POD: &str = "rs.Resource.Pod";

    /// Container name
    pub const CONTAINER: &str = "rs.Resource.Container";

    /// Kubernetes cluster name (k8s.cluster.name)
    pub const K8S_CLUSTER_NAME: &str = "rs.Resource.K8sClusterName";

    /// Kubernetes namespace name (k8s.namespace.name)
    pub const K8S_NAMESPACE_NAME: &str = "rs.Resource.K8sNamespaceName";

    /// Kubernetes pod name (k8s.pod.name)
    pub const K8S_POD_NAME: &str = "rs.Resource.K8sPodName";

    /// Kubernetes container name (k8s.container.name)
    pub const K8S_CONTAINER_NAME: &str = "rs.Resource.K8sContainerName";

    /// Generic attribute table: key
    pub const ATTR_KEY: &str = "rs.Resource.Attrs.Key";

    /// Generic attribute table: string value
    pub const ATTR_STRING: &str = "rs.Resource.Attrs.Value";

    /// Generic attribute table: integer value
    pub const ATTR_INT: &str = "rs.Resource.Attrs.ValueInt";

    /// Generic attribute table: double value
    pub const ATTR_DOUBLE: &str = "rs.Resource.Attrs.ValueDouble";

    /// Generic attribute table: boolean value
    pub const ATTR_BOOL: &str = "rs.Resource.Attrs.ValueBool";
}

/// Span-level column paths
pub mod span {
    /// Binary span ID (8 bytes)
    pub const ID: &str = "rs.ils.Spans.ID";

    /// Span name
    pub const NAME: &str = "rs.ils.Spans.Name";

    /// Start time in nanoseconds since Unix epoch
    pub const START_UNIX_NANOS: &str = "rs.ils.Spans.StartUnixNanos";

    /// End time in nanoseconds since Unix epoch
    pub const END_UNIX_NANOS: &str = "rs.ils.Spans.EndUnixNanos";

    /// Status code (UNSET=0, OK=1, ERROR=2)
    pub const STATUS_CODE: &str = "rs.ils.Spans.StatusCode";

    /// HTTP status code (well-known column)
    pub const HTTP_STATUS_CODE: &str = "rs.ils.Spans.HttpStatusCode";

    /// HTTP method (well-known column)
    pub const HTTP_METHOD: &str = "rs.ils.Spans.HttpMethod";

    /// HTTP URL (well-known column)
    pub const HTTP_URL: &str = "rs.ils.Spans.HttpUrl";

    /// Generic attribute table: key
    pub const ATTR_KEY: &str = "rs.ils.Spans.Attrs.Key";

    /// Generic attribute table: string value
    pub const ATTR_STRING: &str = "rs.ils.Spans.Attrs.Value";

    /// Generic attribute table: integer value
    pub const ATTR_INT: &str = "rs.ils.Spans.Attrs.ValueInt";

    /// Generic attribute table: double value
    pub const ATTR_DOUBLE: &str = "rs.ils.Spans.Attrs.ValueDouble";

    /// Generic attribute table: boolean value
    pub const ATTR_BOOL: &str = "rs.ils.Spans.Attrs.ValueBool";
}

/// Dedicated attribute column slots
pub mod dedicated_attrs {
    /// Number of dedicated attribute column slots per scope.
    pub const COLUMNS_PER_SCOPE: usize = 10;

    /// Path of the n-th (0-based) dedicated string column at resource
    /// level.
    pub fn resource_column_path(slot: usize) -> String {
        format!("rs.Resource.DedicatedAttributes.String{:02}", slot + 1)
    }

    /// Path of the n-th (0-based) dedicated string column at span level.
    pub fn span_column_path(slot: usize) -> String {
        format!("rs.ils.Spans.DedicatedAttributes.String{:02}", slot + 1)
    }
}

// Definition levels at which the iterator combinators group. These mirror
// the nesting depth of the repeated groups in the schema.
pub const DEFINITION_LEVEL_TRACE: usize = 0;
pub const DEFINITION_LEVEL_RESOURCE_SPANS: usize = 1;
pub const DEFINITION_LEVEL_RESOURCE_ATTRS: usize = 2;
pub const DEFINITION_LEVEL_RESOURCE_SPANS_ILS_SPAN: usize = 3;
pub const DEFINITION_LEVEL_RESOURCE_SPANS_ILS_SPAN_ATTRS: usize = 4;
