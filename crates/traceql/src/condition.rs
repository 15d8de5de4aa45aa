/// Conditions: one attribute, one operator, and its operands.
use std::fmt;

use crate::attribute::Attribute;
use crate::static_value::Static;

/// Condition operators.
///
/// `None` selects the attribute without filtering on it (the attribute's
/// value is still collected onto matching spans).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    None,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Regex,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::None => write!(f, "none"),
            Operator::Equal => write!(f, "="),
            Operator::NotEqual => write!(f, "!="),
            Operator::Greater => write!(f, ">"),
            Operator::GreaterEqual => write!(f, ">="),
            Operator::Less => write!(f, "<"),
            Operator::LessEqual => write!(f, "<="),
            Operator::Regex => write!(f, "=~"),
        }
    }
}

/// A single filter condition pushed down to the block scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub attribute: Attribute,
    pub op: Operator,
    pub operands: Vec<Static>,
}

impl Condition {
    pub fn new(attribute: Attribute, op: Operator, operands: Vec<Static>) -> Self {
        Self {
            attribute,
            op,
            operands,
        }
    }

    /// Selects an attribute without filtering.
    pub fn select(attribute: Attribute) -> Self {
        Self::new(attribute, Operator::None, Vec::new())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Operator::None => write!(f, "{}", self.attribute),
            _ => {
                write!(f, "{} {}", self.attribute, self.op)?;
                for operand in &self.operands {
                    write!(f, " {}", operand)?;
                }
                Ok(())
            }
        }
    }
}
