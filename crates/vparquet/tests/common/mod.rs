//! Test fixture: builds real vParquet blocks from an in-memory trace model
//!
//! The shredder computes definition/repetition levels per leaf column the
//! same way a block producer would: one entry per leaf position, nulls and
//! empty lists encoded by definition level. Each trace carries one
//! resource-spans entry with one scope entry holding all its spans, which
//! is enough nesting to exercise every definition level the engine groups
//! on.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use parquet::data_type::{BoolType, ByteArray, ByteArrayType, DoubleType, Int64Type};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::schema::parser::parse_message_type;
use storage::{BlockMeta, DedicatedColumn};
use uuid::Uuid;

const MESSAGE_TYPE: &str = "
message Trace {
  REQUIRED BYTE_ARRAY TraceID;
  REQUIRED INT64 StartTimeUnixNano;
  REQUIRED INT64 DurationNanos;
  REQUIRED BYTE_ARRAY RootSpanName (UTF8);
  REQUIRED BYTE_ARRAY RootServiceName (UTF8);
  REPEATED GROUP rs {
    REQUIRED GROUP Resource {
      OPTIONAL BYTE_ARRAY ServiceName (UTF8);
      REPEATED GROUP Attrs {
        REQUIRED BYTE_ARRAY Key (UTF8);
        OPTIONAL BYTE_ARRAY Value (UTF8);
        OPTIONAL INT64 ValueInt;
        OPTIONAL DOUBLE ValueDouble;
        OPTIONAL BOOLEAN ValueBool;
      }
      REQUIRED GROUP DedicatedAttributes {
        OPTIONAL BYTE_ARRAY String01 (UTF8);
      }
    }
    REPEATED GROUP ils {
      REPEATED GROUP Spans {
        REQUIRED BYTE_ARRAY ID;
        REQUIRED BYTE_ARRAY Name (UTF8);
        REQUIRED INT64 StartUnixNanos;
        REQUIRED INT64 EndUnixNanos;
        REQUIRED INT64 StatusCode;
        OPTIONAL INT64 HttpStatusCode;
        OPTIONAL BYTE_ARRAY HttpMethod (UTF8);
        OPTIONAL BYTE_ARRAY HttpUrl (UTF8);
        REPEATED GROUP Attrs {
          REQUIRED BYTE_ARRAY Key (UTF8);
          OPTIONAL BYTE_ARRAY Value (UTF8);
          OPTIONAL INT64 ValueInt;
          OPTIONAL DOUBLE ValueDouble;
          OPTIONAL BOOLEAN ValueBool;
        }
        REQUIRED GROUP DedicatedAttributes {
          OPTIONAL BYTE_ARRAY String01 (UTF8);
        }
      }
    }
  }
}
";

#[derive(Debug, Clone)]
pub enum TestAttrValue {
    Str(&'static str),
    Int(i64),
    Double(f64),
    Bool(bool),
}

#[derive(Debug, Clone)]
pub struct TestAttr {
    pub key: &'static str,
    pub value: TestAttrValue,
}

pub fn attr(key: &'static str, value: TestAttrValue) -> TestAttr {
    TestAttr { key, value }
}

#[derive(Debug, Clone)]
pub struct TestSpan {
    pub id: [u8; 8],
    pub name: &'static str,
    pub start: u64,
    pub end: u64,
    pub status_code: i64,
    pub http_status_code: Option<i64>,
    pub http_method: Option<&'static str>,
    pub http_url: Option<&'static str>,
    pub attrs: Vec<TestAttr>,
    /// Value of the first span-level dedicated column slot.
    pub dedicated_01: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct TestTrace {
    pub trace_id: [u8; 16],
    pub start_time: u64,
    pub duration: u64,
    pub root_span_name: &'static str,
    pub root_service_name: &'static str,
    pub service_name: Option<&'static str>,
    pub resource_attrs: Vec<TestAttr>,
    /// Value of the first resource-level dedicated column slot.
    pub dedicated_01: Option<&'static str>,
    pub spans: Vec<TestSpan>,
}

/// The canonical two-trace fixture used by the end-to-end scenarios:
/// T1 has two spans under service "shop" with `resource.foo=bar`,
/// T2 has one span under service "cart" with `span.foo=bar`. The first
/// dedicated slot at each scope is populated so blocks whose meta
/// configures dedicated columns can route conditions to them.
pub fn two_trace_fixture() -> Vec<TestTrace> {
    vec![
        TestTrace {
            trace_id: [0x01; 16],
            start_time: 1_000_000_000,
            duration: 20_000_000,
            root_span_name: "db.query",
            root_service_name: "shop",
            service_name: Some("shop"),
            resource_attrs: vec![
                attr("foo", TestAttrValue::Str("bar")),
                attr("deployed", TestAttrValue::Bool(true)),
            ],
            dedicated_01: Some("us-east-1"),
            spans: vec![
                TestSpan {
                    id: [0xA1; 8],
                    name: "db.query",
                    start: 1_000_000_000,
                    end: 1_020_000_000,
                    status_code: 1,
                    http_status_code: None,
                    http_method: None,
                    http_url: None,
                    attrs: Vec::new(),
                    dedicated_01: Some("SELECT * FROM inventory"),
                },
                TestSpan {
                    id: [0xA2; 8],
                    name: "http.request",
                    start: 1_005_000_000,
                    end: 1_010_000_000,
                    status_code: 2,
                    http_status_code: Some(500),
                    http_method: Some("GET"),
                    http_url: Some("http://shop/checkout"),
                    attrs: vec![attr("latency.ms", TestAttrValue::Double(5.5))],
                    dedicated_01: None,
                },
            ],
        },
        TestTrace {
            trace_id: [0x02; 16],
            start_time: 2_000_000_000,
            duration: 15_000_000,
            root_span_name: "checkout",
            root_service_name: "cart",
            service_name: Some("cart"),
            resource_attrs: Vec::new(),
            dedicated_01: Some("eu-west-1"),
            spans: vec![TestSpan {
                id: [0xB1; 8],
                name: "checkout",
                start: 2_000_000_000,
                end: 2_015_000_000,
                status_code: 0,
                http_status_code: None,
                http_method: None,
                http_url: None,
                attrs: vec![attr("foo", TestAttrValue::Str("bar"))],
                dedicated_01: None,
            }],
        },
    ]
}

struct Shredded<T> {
    defs: Vec<i16>,
    reps: Vec<i16>,
    values: Vec<T>,
}

impl<T> Shredded<T> {
    fn new() -> Self {
        Self {
            defs: Vec::new(),
            reps: Vec::new(),
            values: Vec::new(),
        }
    }

    fn push(&mut self, rep: i16, def: i16, value: Option<T>) {
        self.reps.push(rep);
        self.defs.push(def);
        if let Some(v) = value {
            self.values.push(v);
        }
    }
}

/// One leaf under `rs.Resource` (one resource-spans entry per trace).
fn shred_resource_leaf<T>(
    traces: &[TestTrace],
    max_def: i16,
    extract: impl Fn(&TestTrace) -> Option<T>,
) -> Shredded<T> {
    let mut out = Shredded::new();
    for trace in traces {
        match extract(trace) {
            Some(v) => out.push(0, max_def, Some(v)),
            None => out.push(0, max_def - 1, None),
        }
    }
    out
}

/// One leaf under `rs.Resource.Attrs`. An empty attribute list encodes as a
/// single position at the resource-spans definition level.
fn shred_resource_attrs<T>(
    traces: &[TestTrace],
    max_def: i16,
    extract: impl Fn(&TestAttr) -> Option<T>,
) -> Shredded<T> {
    let mut out = Shredded::new();
    for trace in traces {
        if trace.resource_attrs.is_empty() {
            out.push(0, 1, None);
            continue;
        }
        for (j, a) in trace.resource_attrs.iter().enumerate() {
            let rep = if j == 0 { 0 } else { 2 };
            match extract(a) {
                Some(v) => out.push(rep, max_def, Some(v)),
                None => out.push(rep, max_def - 1, None),
            }
        }
    }
    out
}

/// One leaf under `rs.ils.Spans` (all spans share one rs/ils per trace).
fn shred_span_leaf<T>(
    traces: &[TestTrace],
    max_def: i16,
    extract: impl Fn(&TestSpan) -> Option<T>,
) -> Shredded<T> {
    let mut out = Shredded::new();
    for trace in traces {
        for (i, span) in trace.spans.iter().enumerate() {
            let rep = if i == 0 { 0 } else { 3 };
            match extract(span) {
                Some(v) => out.push(rep, max_def, Some(v)),
                None => out.push(rep, max_def - 1, None),
            }
        }
    }
    out
}

/// One leaf under `rs.ils.Spans.Attrs`. An empty attribute list encodes as
/// a single position at the span definition level.
fn shred_span_attrs<T>(
    traces: &[TestTrace],
    max_def: i16,
    extract: impl Fn(&TestAttr) -> Option<T>,
) -> Shredded<T> {
    let mut out = Shredded::new();
    for trace in traces {
        for (i, span) in trace.spans.iter().enumerate() {
            let span_rep = if i == 0 { 0 } else { 3 };
            if span.attrs.is_empty() {
                out.push(span_rep, 3, None);
                continue;
            }
            for (j, a) in span.attrs.iter().enumerate() {
                let rep = if j == 0 { span_rep } else { 4 };
                match extract(a) {
                    Some(v) => out.push(rep, max_def, Some(v)),
                    None => out.push(rep, max_def - 1, None),
                }
            }
        }
    }
    out
}

fn attr_key(a: &TestAttr) -> Option<ByteArray> {
    Some(ByteArray::from(a.key))
}

fn attr_string(a: &TestAttr) -> Option<ByteArray> {
    match a.value {
        TestAttrValue::Str(s) => Some(ByteArray::from(s)),
        _ => None,
    }
}

fn attr_int(a: &TestAttr) -> Option<i64> {
    match a.value {
        TestAttrValue::Int(v) => Some(v),
        _ => None,
    }
}

fn attr_double(a: &TestAttr) -> Option<f64> {
    match a.value {
        TestAttrValue::Double(v) => Some(v),
        _ => None,
    }
}

fn attr_bool(a: &TestAttr) -> Option<bool> {
    match a.value {
        TestAttrValue::Bool(v) => Some(v),
        _ => None,
    }
}

fn write_byte_array(
    rg: &mut SerializedRowGroupWriter<'_, File>,
    values: &[ByteArray],
    defs: Option<&[i16]>,
    reps: Option<&[i16]>,
) {
    let mut col = rg.next_column().unwrap().expect("column writer");
    col.typed::<ByteArrayType>()
        .write_batch(values, defs, reps)
        .unwrap();
    col.close().unwrap();
}

fn write_int64(
    rg: &mut SerializedRowGroupWriter<'_, File>,
    values: &[i64],
    defs: Option<&[i16]>,
    reps: Option<&[i16]>,
) {
    let mut col = rg.next_column().unwrap().expect("column writer");
    col.typed::<Int64Type>()
        .write_batch(values, defs, reps)
        .unwrap();
    col.close().unwrap();
}

fn write_double(
    rg: &mut SerializedRowGroupWriter<'_, File>,
    values: &[f64],
    defs: Option<&[i16]>,
    reps: Option<&[i16]>,
) {
    let mut col = rg.next_column().unwrap().expect("column writer");
    col.typed::<DoubleType>()
        .write_batch(values, defs, reps)
        .unwrap();
    col.close().unwrap();
}

fn write_bool(
    rg: &mut SerializedRowGroupWriter<'_, File>,
    values: &[bool],
    defs: Option<&[i16]>,
    reps: Option<&[i16]>,
) {
    let mut col = rg.next_column().unwrap().expect("column writer");
    col.typed::<BoolType>()
        .write_batch(values, defs, reps)
        .unwrap();
    col.close().unwrap();
}

fn write_row_group(rg: &mut SerializedRowGroupWriter<'_, File>, traces: &[TestTrace]) {
    // Trace-level columns, in schema leaf order.
    let trace_ids: Vec<ByteArray> = traces
        .iter()
        .map(|t| ByteArray::from(t.trace_id.to_vec()))
        .collect();
    write_byte_array(rg, &trace_ids, None, None);

    let starts: Vec<i64> = traces.iter().map(|t| t.start_time as i64).collect();
    write_int64(rg, &starts, None, None);

    let durations: Vec<i64> = traces.iter().map(|t| t.duration as i64).collect();
    write_int64(rg, &durations, None, None);

    let root_names: Vec<ByteArray> = traces
        .iter()
        .map(|t| ByteArray::from(t.root_span_name))
        .collect();
    write_byte_array(rg, &root_names, None, None);

    let root_services: Vec<ByteArray> = traces
        .iter()
        .map(|t| ByteArray::from(t.root_service_name))
        .collect();
    write_byte_array(rg, &root_services, None, None);

    // rs.Resource.ServiceName
    let s = shred_resource_leaf(traces, 2, |t| t.service_name.map(ByteArray::from));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));

    // rs.Resource.Attrs.{Key, Value, ValueInt, ValueDouble, ValueBool}
    let s = shred_resource_attrs(traces, 2, attr_key);
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_resource_attrs(traces, 3, attr_string);
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_resource_attrs(traces, 3, attr_int);
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_resource_attrs(traces, 3, attr_double);
    write_double(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_resource_attrs(traces, 3, attr_bool);
    write_bool(rg, &s.values, Some(&s.defs), Some(&s.reps));

    // rs.Resource.DedicatedAttributes.String01
    let s = shred_resource_leaf(traces, 2, |t| t.dedicated_01.map(ByteArray::from));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));

    // rs.ils.Spans leaves
    let s = shred_span_leaf(traces, 3, |sp| Some(ByteArray::from(sp.id.to_vec())));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 3, |sp| Some(ByteArray::from(sp.name)));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 3, |sp| Some(sp.start as i64));
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 3, |sp| Some(sp.end as i64));
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 3, |sp| Some(sp.status_code));
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 4, |sp| sp.http_status_code);
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 4, |sp| sp.http_method.map(ByteArray::from));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_leaf(traces, 4, |sp| sp.http_url.map(ByteArray::from));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));

    // rs.ils.Spans.Attrs.{Key, Value, ValueInt, ValueDouble, ValueBool}
    let s = shred_span_attrs(traces, 4, attr_key);
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_attrs(traces, 5, attr_string);
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_attrs(traces, 5, attr_int);
    write_int64(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_attrs(traces, 5, attr_double);
    write_double(rg, &s.values, Some(&s.defs), Some(&s.reps));
    let s = shred_span_attrs(traces, 5, attr_bool);
    write_bool(rg, &s.values, Some(&s.defs), Some(&s.reps));

    // rs.ils.Spans.DedicatedAttributes.String01
    let s = shred_span_leaf(traces, 4, |sp| sp.dedicated_01.map(ByteArray::from));
    write_byte_array(rg, &s.values, Some(&s.defs), Some(&s.reps));
}

/// Writes one block data file with one row group per trace batch.
pub fn write_fixture_file(path: &Path, row_groups: &[&[TestTrace]]) {
    let schema = Arc::new(parse_message_type(MESSAGE_TYPE).expect("fixture schema"));
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).expect("create fixture file");
    let mut writer = SerializedFileWriter::new(file, schema, props).expect("fixture writer");

    for traces in row_groups {
        let mut rg = writer.next_row_group().unwrap();
        write_row_group(&mut rg, traces);
        rg.close().unwrap();
    }
    writer.close().unwrap();
}

/// Lays out a block under `<root>/<tenant>/<block_id>/` and returns its
/// meta.
pub fn build_block(root: &Path, tenant: &str, row_groups: &[&[TestTrace]]) -> BlockMeta {
    build_block_with_columns(root, tenant, row_groups, Vec::new())
}

/// Like [`build_block`], with dedicated columns configured in the meta.
pub fn build_block_with_columns(
    root: &Path,
    tenant: &str,
    row_groups: &[&[TestTrace]],
    dedicated_columns: Vec<DedicatedColumn>,
) -> BlockMeta {
    let block_id = Uuid::new_v4();
    let block_dir = root.join(tenant).join(block_id.to_string());
    std::fs::create_dir_all(&block_dir).unwrap();

    write_fixture_file(&block_dir.join("data.parquet"), row_groups);

    let meta = BlockMeta::new(tenant, block_id, vparquet::VERSION)
        .with_dedicated_columns(dedicated_columns);
    storage::write_block_meta(&block_dir, &meta).unwrap();
    meta
}
