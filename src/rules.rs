//! The rule registry: a closed set of operators, each knowing its
//! applicability class, its failure expression, and its error message.
//!
//! Operators only produce an expression for kinds they apply to; anything
//! else yields `None` and the rule is skipped for that field, which is not
//! an error. `required` is a presence rule: guards and recursive validator
//! calls are the synthesizer's job, so it never emits an expression here.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::kind::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    NotEmpty,
    Required,
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Max,
    Min,
    Uuid3,
    Uuid4,
    Uuid5,
    Uuid,
    Email,
    Base64,
    Latitude,
    Longitude,
    Phone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// Comparison against a numeric bound.
    Numeric,
    /// String length bound.
    Length,
    /// Fixed regular-expression check.
    Pattern,
    /// Non-empty string.
    Existence,
    /// Presence of a nilable field; expressed as guards, not expressions.
    Presence,
}

const ALL: &[Operator] = &[
    Operator::NotEmpty,
    Operator::Required,
    Operator::Eq,
    Operator::Ne,
    Operator::Lt,
    Operator::Gt,
    Operator::Lte,
    Operator::Gte,
    Operator::Max,
    Operator::Min,
    Operator::Uuid3,
    Operator::Uuid4,
    Operator::Uuid5,
    Operator::Uuid,
    Operator::Email,
    Operator::Base64,
    Operator::Latitude,
    Operator::Longitude,
    Operator::Phone,
];

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        ALL.iter().copied().find(|op| op.token() == token)
    }

    pub const fn token(self) -> &'static str {
        match self {
            Operator::NotEmpty => "notEmpty",
            Operator::Required => "required",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Lte => "lte",
            Operator::Gte => "gte",
            Operator::Max => "max",
            Operator::Min => "min",
            Operator::Uuid3 => "uuid3",
            Operator::Uuid4 => "uuid4",
            Operator::Uuid5 => "uuid5",
            Operator::Uuid => "uuid",
            Operator::Email => "email",
            Operator::Base64 => "base64",
            Operator::Latitude => "latitude",
            Operator::Longitude => "longitude",
            Operator::Phone => "phone",
        }
    }

    pub const fn class(self) -> Class {
        match self {
            Operator::NotEmpty => Class::Existence,
            Operator::Required => Class::Presence,
            Operator::Eq
            | Operator::Ne
            | Operator::Lt
            | Operator::Gt
            | Operator::Lte
            | Operator::Gte => Class::Numeric,
            Operator::Max | Operator::Min => Class::Length,
            Operator::Uuid3
            | Operator::Uuid4
            | Operator::Uuid5
            | Operator::Uuid
            | Operator::Email
            | Operator::Base64
            | Operator::Latitude
            | Operator::Longitude
            | Operator::Phone => Class::Pattern,
        }
    }

    /// Inverted comparison used in the *failure* expression.
    const fn inverted(self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("!="),
            Operator::Ne => Some("=="),
            Operator::Lt => Some(">="),
            Operator::Gt => Some("<="),
            Operator::Lte => Some(">"),
            Operator::Gte => Some("<"),
            _ => None,
        }
    }

    pub const fn pattern(self) -> Option<&'static str> {
        match self {
            Operator::Uuid3 => {
                Some(r"^[0-9a-f]{8}-[0-9a-f]{4}-3[0-9a-f]{3}-[0-9a-f]{4}-[0-9a-f]{12}$")
            }
            Operator::Uuid4 => {
                Some(r"^[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            }
            Operator::Uuid5 => {
                Some(r"^[0-9a-f]{8}-[0-9a-f]{4}-5[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            }
            Operator::Uuid => {
                Some(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
            }
            Operator::Email => Some(
                r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
            ),
            Operator::Base64 => Some(
                r"^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{2}==|[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{4})$",
            ),
            Operator::Latitude => Some(r"^[-+]?([1-8]?\d(\.\d+)?|90(\.0+)?)$"),
            Operator::Longitude => {
                Some(r"^[-+]?(180(\.0+)?|((1[0-7]\d)|([1-9]?\d))(\.\d+)?)$")
            }
            Operator::Phone => Some(r"^1[3456789]\d{9}$"),
            _ => None,
        }
    }

    /// Compiled form of [`Operator::pattern`], shared process-wide.
    pub fn regex(self) -> Option<&'static Regex> {
        static COMPILED: Lazy<HashMap<Operator, Regex>> = Lazy::new(|| {
            ALL.iter()
                .filter_map(|op| {
                    op.pattern()
                        .map(|p| (*op, Regex::new(p).expect("registry patterns compile")))
                })
                .collect()
        });
        COMPILED.get(&self)
    }

    /// The boolean failure expression to embed, or `None` when this rule
    /// does not apply to the field's kind. `star` is the dereference
    /// marker: `Some("*")` for boxed fields, `Some("")` for plain ones,
    /// `None` when no total dereference exists (`Option`-wrapped fields).
    pub fn failure_expr(
        self,
        field: &str,
        star: Option<&str>,
        value: Option<&str>,
        real: Kind,
    ) -> Option<String> {
        let star = star?;
        match self.class() {
            Class::Existence => {
                if real == Kind::Str {
                    Some(format!("self.{field}.is_empty()"))
                } else {
                    None
                }
            }
            Class::Length => {
                let value = value?;
                if real != Kind::Str {
                    return None;
                }
                match self {
                    Operator::Max => Some(format!("self.{field}.len() >= {value}")),
                    Operator::Min => Some(format!("self.{field}.len() < {value}")),
                    _ => None,
                }
            }
            Class::Numeric => {
                let value = value?;
                if !real.is_numeric() {
                    return None;
                }
                let inverted = self.inverted()?;
                Some(format!("{star}self.{field} {inverted} {value}"))
            }
            Class::Pattern => {
                if real != Kind::Str {
                    return None;
                }
                let pattern = self.pattern()?;
                Some(format!(
                    "!Regex::new(r#\"{pattern}\"#).unwrap().is_match(&self.{field})"
                ))
            }
            Class::Presence => None,
        }
    }

    /// The error message embedded next to the failure expression.
    pub fn message(self, field: &str, value: Option<&str>) -> String {
        match self.class() {
            Class::Existence => format!("{field} must not be empty"),
            Class::Pattern => format!("{field} does not match the {} format", self.token()),
            Class::Presence => format!("{field} must not be none"),
            Class::Numeric | Class::Length => {
                format!("{field} must be {} {}", self.token(), value.unwrap_or(""))
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
