use serde::{Deserialize, Serialize};

use super::SelectorName;
use crate::error::Result;
use crate::value::{PropertyType, Value};

/// A value computed from the entry being evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicOperand {
    PropertyValue(PropertyValue),
    Length(Length),
    NodeName(NodeName),
    NodeLocalName(NodeLocalName),
    NodeDepth(NodeDepth),
    FullTextSearchScore(FullTextSearchScore),
    UpperCase(UpperCase),
    LowerCase(LowerCase),
}

impl DynamicOperand {
    /// Selector this operand reads from, looking through function wrappers.
    #[must_use]
    pub fn selector_name(&self) -> Option<&SelectorName> {
        match self {
            Self::PropertyValue(op) => op.selector_name.as_ref(),
            Self::Length(op) => op.property_value.selector_name.as_ref(),
            Self::NodeName(op) => op.selector_name.as_ref(),
            Self::NodeLocalName(op) => op.selector_name.as_ref(),
            Self::NodeDepth(op) => op.selector_name.as_ref(),
            Self::FullTextSearchScore(op) => op.selector_name.as_ref(),
            Self::UpperCase(op) => op.operand.selector_name(),
            Self::LowerCase(op) => op.operand.selector_name(),
        }
    }

    /// Short kind name used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PropertyValue(_) => "property value",
            Self::Length(_) => "LENGTH",
            Self::NodeName(_) => "NAME",
            Self::NodeLocalName(_) => "LOCALNAME",
            Self::NodeDepth(_) => "DEPTH",
            Self::FullTextSearchScore(_) => "SCORE",
            Self::UpperCase(_) => "UPPER",
            Self::LowerCase(_) => "LOWER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector_name: Option<SelectorName>,
    pub property_name: String,
}

impl PropertyValue {
    #[must_use]
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector_name: Some(selector.into()),
            property_name: property.into(),
        }
    }

    /// A property reference without an explicit selector.
    #[must_use]
    pub fn unqualified(property: impl Into<String>) -> Self {
        Self {
            selector_name: None,
            property_name: property.into(),
        }
    }
}

impl From<PropertyValue> for DynamicOperand {
    fn from(value: PropertyValue) -> Self {
        Self::PropertyValue(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Length {
    pub property_value: PropertyValue,
}

impl Length {
    #[must_use]
    pub const fn new(property_value: PropertyValue) -> Self {
        Self { property_value }
    }
}

impl From<Length> for DynamicOperand {
    fn from(value: Length) -> Self {
        Self::Length(value)
    }
}

macro_rules! define_selector_operand {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub selector_name: Option<SelectorName>,
        }

        impl $name {
            #[must_use]
            pub fn new(selector: impl Into<SelectorName>) -> Self {
                Self {
                    selector_name: Some(selector.into()),
                }
            }

            #[must_use]
            pub const fn unqualified() -> Self {
                Self {
                    selector_name: None,
                }
            }
        }

        impl From<$name> for DynamicOperand {
            fn from(value: $name) -> Self {
                Self::$name(value)
            }
        }
    };
}

define_selector_operand!(NodeName, "The (possibly prefixed) name of the entry.");
define_selector_operand!(NodeLocalName, "The name of the entry without any namespace prefix.");
define_selector_operand!(NodeDepth, "The depth of the entry; the root has depth zero.");
define_selector_operand!(FullTextSearchScore, "The full-text score of the row.");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpperCase {
    pub operand: Box<DynamicOperand>,
}

impl UpperCase {
    #[must_use]
    pub fn new(operand: impl Into<DynamicOperand>) -> Self {
        Self {
            operand: Box::new(operand.into()),
        }
    }
}

impl From<UpperCase> for DynamicOperand {
    fn from(value: UpperCase) -> Self {
        Self::UpperCase(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LowerCase {
    pub operand: Box<DynamicOperand>,
}

impl LowerCase {
    #[must_use]
    pub fn new(operand: impl Into<DynamicOperand>) -> Self {
        Self {
            operand: Box::new(operand.into()),
        }
    }
}

impl From<LowerCase> for DynamicOperand {
    fn from(value: LowerCase) -> Self {
        Self::LowerCase(value)
    }
}

/// A value fixed when the query is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticOperand {
    Literal(Literal),
    BindVariable(BindVariableName),
}

impl From<Literal> for StaticOperand {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<BindVariableName> for StaticOperand {
    fn from(value: BindVariableName) -> Self {
        Self::BindVariable(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    pub value: Value,
    pub declared_type: PropertyType,
}

impl Literal {
    /// A literal whose declared type is the value's own type.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            declared_type: value.property_type(),
            value,
        }
    }

    /// A literal cast to `declared_type`; fails when the cast is impossible.
    pub fn typed(value: impl Into<Value>, declared_type: PropertyType) -> Result<Self> {
        let value = value.into().cast(declared_type)?;
        Ok(Self {
            value,
            declared_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindVariableName {
    pub name: String,
}

impl BindVariableName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
