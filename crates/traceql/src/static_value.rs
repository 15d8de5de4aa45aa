/// Static (literal) values in TraceQL conditions
///
/// A `Static` is a tagged value as it appears on the right-hand side of a
/// condition: `span.http.status_code = 500` carries `Static::Int(500)`.
/// Comparisons are only defined between values of the same type; mixing
/// types in one condition is rejected at plan time.
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// The type tag of a [`Static`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticType {
    Nil,
    String,
    Int,
    Float,
    Boolean,
    Duration,
    Status,
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Nil => write!(f, "nil"),
            StaticType::String => write!(f, "string"),
            StaticType::Int => write!(f, "int"),
            StaticType::Float => write!(f, "float"),
            StaticType::Boolean => write!(f, "bool"),
            StaticType::Duration => write!(f, "duration"),
            StaticType::Status => write!(f, "status"),
        }
    }
}

/// Span status values.
///
/// The first three map to the OTLP status-code ordinals 0/1/2. Any other
/// ordinal read from a block passes through as `Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unset,
    Ok,
    Error,
    Code(i64),
}

impl Status {
    /// The OTLP integer ordinal for this status.
    pub fn as_code(&self) -> i64 {
        match self {
            Status::Unset => 0,
            Status::Ok => 1,
            Status::Error => 2,
            Status::Code(c) => *c,
        }
    }

    /// Maps an OTLP integer ordinal back to a status.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Status::Unset,
            1 => Status::Ok,
            2 => Status::Error,
            other => Status::Code(other),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unset => write!(f, "unset"),
            Status::Ok => write!(f, "ok"),
            Status::Error => write!(f, "error"),
            Status::Code(c) => write!(f, "{}", c),
        }
    }
}

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Static {
    Nil,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Status(Status),
}

impl Static {
    /// The type tag of this value.
    pub fn static_type(&self) -> StaticType {
        match self {
            Static::Nil => StaticType::Nil,
            Static::String(_) => StaticType::String,
            Static::Int(_) => StaticType::Int,
            Static::Float(_) => StaticType::Float,
            Static::Bool(_) => StaticType::Boolean,
            Static::Duration(_) => StaticType::Duration,
            Static::Status(_) => StaticType::Status,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Static::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Static::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Static::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Static::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Static::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Duration in nanoseconds, for predicates over the duration intrinsic.
    pub fn as_duration_nanos(&self) -> Option<i64> {
        match self {
            Static::Duration(d) => Some(d.as_nanos() as i64),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<Status> {
        match self {
            Static::Status(s) => Some(*s),
            _ => None,
        }
    }
}

impl PartialOrd for Static {
    /// Ordering is defined per tag only; comparing across tags yields `None`.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Static::String(a), Static::String(b)) => a.partial_cmp(b),
            (Static::Int(a), Static::Int(b)) => a.partial_cmp(b),
            (Static::Float(a), Static::Float(b)) => a.partial_cmp(b),
            (Static::Bool(a), Static::Bool(b)) => a.partial_cmp(b),
            (Static::Duration(a), Static::Duration(b)) => a.partial_cmp(b),
            (Static::Status(a), Static::Status(b)) => a.as_code().partial_cmp(&b.as_code()),
            _ => None,
        }
    }
}

impl fmt::Display for Static {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Static::Nil => write!(f, "nil"),
            Static::String(s) => write!(f, "\"{}\"", s),
            Static::Int(n) => write!(f, "{}", n),
            Static::Float(v) => write!(f, "{}", v),
            Static::Bool(b) => write!(f, "{}", b),
            Static::Duration(d) => write!(f, "{}ns", d.as_nanos()),
            Static::Status(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_round_trip() {
        assert_eq!(Status::from_code(0), Status::Unset);
        assert_eq!(Status::from_code(1), Status::Ok);
        assert_eq!(Status::from_code(2), Status::Error);
        assert_eq!(Status::from_code(7), Status::Code(7));
        assert_eq!(Status::Code(7).as_code(), 7);
        assert_eq!(Status::Error.as_code(), 2);
    }

    #[test]
    fn test_static_type_tags() {
        assert_eq!(Static::Nil.static_type(), StaticType::Nil);
        assert_eq!(Static::String("a".into()).static_type(), StaticType::String);
        assert_eq!(Static::Int(1).static_type(), StaticType::Int);
        assert_eq!(
            Static::Duration(Duration::from_millis(10)).static_type(),
            StaticType::Duration
        );
    }

    #[test]
    fn test_ordering_same_tag_only() {
        assert_eq!(
            Static::Int(1).partial_cmp(&Static::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Static::String("a".into()).partial_cmp(&Static::String("a".into())),
            Some(Ordering::Equal)
        );
        // Cross-tag comparison is undefined
        assert_eq!(Static::Int(1).partial_cmp(&Static::Float(1.0)), None);
        assert_eq!(Static::Nil.partial_cmp(&Static::Nil), None);
    }

    #[test]
    fn test_duration_nanos() {
        let s = Static::Duration(Duration::from_millis(10));
        assert_eq!(s.as_duration_nanos(), Some(10_000_000));
        assert_eq!(Static::Int(5).as_duration_nanos(), None);
    }
}
