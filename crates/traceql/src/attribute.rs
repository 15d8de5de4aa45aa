/// Attribute references in TraceQL conditions
///
/// An attribute names either an intrinsic (a built-in span property with its
/// own column), or a key in the span- or resource-scoped attribute tables.
/// Scope `None` means "either scope": the engine plans such a condition at
/// both levels.
use std::fmt;

/// The scope of an attribute reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeScope {
    /// Unscoped: `.foo` matches at span or resource level.
    None,
    /// `resource.foo`
    Resource,
    /// `span.foo`
    Span,
}

impl fmt::Display for AttributeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeScope::None => write!(f, "none"),
            AttributeScope::Resource => write!(f, "resource"),
            AttributeScope::Span => write!(f, "span"),
        }
    }
}

/// Built-in span properties not stored in the generic attribute tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Name,
    Status,
    Duration,
}

impl Intrinsic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intrinsic::Name => "name",
            Intrinsic::Status => "status",
            Intrinsic::Duration => "duration",
        }
    }
}

impl fmt::Display for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to a span, resource, or intrinsic attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub scope: AttributeScope,
    pub intrinsic: Option<Intrinsic>,
    pub name: String,
}

impl Attribute {
    /// A scoped (or unscoped) non-intrinsic attribute.
    pub fn scoped(scope: AttributeScope, name: impl Into<String>) -> Self {
        Self {
            scope,
            intrinsic: None,
            name: name.into(),
        }
    }

    /// An intrinsic attribute. Intrinsics carry their canonical name so that
    /// distinct-name counting treats them like any other condition.
    pub fn intrinsic(intrinsic: Intrinsic) -> Self {
        Self {
            scope: AttributeScope::None,
            intrinsic: Some(intrinsic),
            name: intrinsic.as_str().to_string(),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.intrinsic, self.scope) {
            (Some(i), _) => write!(f, "{}", i),
            (None, AttributeScope::Span) => write!(f, "span.{}", self.name),
            (None, AttributeScope::Resource) => write!(f, "resource.{}", self.name),
            (None, AttributeScope::None) => write!(f, ".{}", self.name),
        }
    }
}
