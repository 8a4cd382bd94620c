//! Query engine
//!
//! `search` filters the direct children of a container by comparing one
//! field of each child against an operand. Children that are not Dict-like
//! containers, that lack the field, or whose field value does not compare
//! with the operand are skipped without error. Results keep the parent's
//! member order.
//!
//! `search_path` generalizes the field to a `.`-delimited path in which a
//! `*` segment matches every member at that level.

use crate::database::{Database, Session};
use crate::path::{segment_key, split_path, DEFAULT_SEPARATOR};
use pongo_core::{ContainerHandle, Key, PongoError, PongoResult, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Path segment matching every member
pub const WILDCARD: &str = "*";

/// Comparison operator for `search`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Operator {
    /// Operator symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    /// Apply the operator; values of incomparable types never match
    pub fn evaluate(self, lhs: &Value, rhs: &Value) -> bool {
        let Some(ord) = lhs.compare(rhs) else {
            return false;
        };
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Le => ord != Ordering::Greater,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Ge => ord != Ordering::Less,
        }
    }
}

impl FromStr for Operator {
    type Err = PongoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(PongoError::InvalidOperator {
                op: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl<'a> Session<'a> {
    pub(crate) fn search(
        &mut self,
        h: ContainerHandle,
        field: &str,
        op: Operator,
        operand: &Value,
    ) -> PongoResult<Vec<(Key, ContainerHandle)>> {
        let field = Key::from(field);
        let mut hits = Vec::new();
        for (key, value) in self.items(h)? {
            let Value::Ref(child) = value else { continue };
            if !child.kind.is_dict_like() {
                continue;
            }
            if let Some(v) = self.lookup(child, &field)? {
                if op.evaluate(&v, operand) {
                    hits.push((key, child));
                }
            }
        }
        Ok(hits)
    }

    pub(crate) fn search_path(
        &mut self,
        h: ContainerHandle,
        path: &str,
        op: Operator,
        operand: &Value,
    ) -> PongoResult<Vec<(Key, ContainerHandle)>> {
        let segments = split_path(path, DEFAULT_SEPARATOR)?;
        let mut hits = Vec::new();
        for (key, value) in self.items(h)? {
            let Value::Ref(child) = value else { continue };
            if self.path_matches(child, &segments, path, op, operand)? {
                hits.push((key, child));
            }
        }
        Ok(hits)
    }

    /// True if any value reached by `segments` from `h` satisfies the operator
    fn path_matches(
        &mut self,
        h: ContainerHandle,
        segments: &[&str],
        path: &str,
        op: Operator,
        operand: &Value,
    ) -> PongoResult<bool> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(false);
        };
        let candidates: Vec<Value> = if *first == WILDCARD {
            self.items(h)?.into_iter().map(|(_, v)| v).collect()
        } else {
            match segment_key(h.kind, first, path) {
                Ok(key) => self.lookup(h, &key)?.into_iter().collect(),
                Err(_) => Vec::new(),
            }
        };

        for value in candidates {
            let matched = match (rest.is_empty(), value) {
                (true, v) => op.evaluate(&v, operand),
                (false, Value::Ref(child)) => self.path_matches(child, rest, path, op, operand)?,
                (false, _) => false,
            };
            if matched {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn parse_field(field: Key) -> PongoResult<String> {
    match field {
        Key::Str(s) => Ok(s),
        other => Err(PongoError::InvalidFieldType {
            found: other.type_name().to_string(),
        }),
    }
}

impl Database {
    /// Children of `h` whose `field` compares true against `operand`
    ///
    /// `op` is one of `== != < <= > >=`. Returns `(key, child)` pairs in the
    /// order of `h`'s members.
    ///
    /// # Errors
    ///
    /// * `InvalidOperator` - `op` is not a known operator
    /// * `InvalidFieldType` - `field` is not a string
    ///
    /// # Example
    ///
    /// ```text
    /// let adults = db.search(people, "age", ">=", 18)?;
    /// ```
    pub fn search(
        &self,
        h: ContainerHandle,
        field: impl Into<Key>,
        op: &str,
        operand: impl Into<Value>,
    ) -> PongoResult<Vec<(Key, ContainerHandle)>> {
        let op: Operator = op.parse()?;
        let field = parse_field(field.into())?;
        self.session()?.search(h, &field, op, &operand.into())
    }

    /// Like [`search`](Self::search) with a `.`-delimited field path;
    /// `*` segments match any member
    pub fn search_path(
        &self,
        h: ContainerHandle,
        path: &str,
        op: &str,
        operand: impl Into<Value>,
    ) -> PongoResult<Vec<(Key, ContainerHandle)>> {
        let op: Operator = op.parse()?;
        self.session()?.search_path(h, path, op, &operand.into())
    }
}
