//! Boolean condition expressions evaluated against a run context.
//!
//! Conditions are a closed tagged-variant AST rather than an embedded
//! expression interpreter: the authoring surface serializes them as JSON
//! and the engine evaluates them with a pure function. The engine never
//! lets an evaluation error escape — a bad expression downgrades to
//! `false` (the run takes the `no` branch or dead-ends), it does not crash
//! event processing.
//!
//! Lookups are single-level key access into the context object; there is
//! no path traversal.
//!
//! # Examples
//!
//! ```
//! use eventweave::condition::{CmpOp, Condition};
//! use serde_json::json;
//!
//! let cond = Condition::All {
//!     terms: vec![
//!         Condition::Exists { key: "amount".into() },
//!         Condition::Cmp {
//!             key: "amount".into(),
//!             cmp: CmpOp::Gte,
//!             value: json!(100),
//!         },
//!     ],
//! };
//! assert!(cond.holds(&json!({"amount": 250})));
//! assert!(!cond.holds(&json!({"amount": 12})));
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Comparison operator for [`Condition::Cmp`].
///
/// `Eq`/`Ne` compare JSON values structurally; the ordering operators
/// require numeric operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Errors surfaced by [`Condition::evaluate`].
///
/// Callers inside the engine use [`Condition::holds`], which logs these
/// and returns `false`.
#[derive(Debug, Error, Diagnostic)]
pub enum ConditionError {
    #[error("context is not an object")]
    #[diagnostic(
        code(eventweave::condition::context_shape),
        help("Conditions evaluate against the run's JSON object context.")
    )]
    ContextNotObject,

    #[error("missing context key: {key}")]
    #[diagnostic(code(eventweave::condition::missing_key))]
    MissingKey { key: String },

    #[error("operands for {op:?} on key {key} are not comparable")]
    #[diagnostic(
        code(eventweave::condition::not_comparable),
        help("Ordering comparisons require numbers on both sides.")
    )]
    NotComparable { key: String, op: CmpOp },
}

/// Boolean-logic expression tree over single-level context keys.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    /// True iff every term is true. Empty terms evaluate to true.
    All { terms: Vec<Condition> },
    /// True iff at least one term is true. Empty terms evaluate to false.
    Any { terms: Vec<Condition> },
    /// Negation.
    Not { term: Box<Condition> },
    /// True iff the key is present (and not `null`) in the context.
    Exists { key: String },
    /// Compare `context[key]` against a literal value.
    Cmp {
        key: String,
        cmp: CmpOp,
        value: Value,
    },
}

impl Condition {
    /// Pure evaluation against a context object.
    pub fn evaluate(&self, context: &Value) -> Result<bool, ConditionError> {
        match self {
            Condition::All { terms } => {
                for term in terms {
                    if !term.evaluate(context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Any { terms } => {
                for term in terms {
                    if term.evaluate(context)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not { term } => Ok(!term.evaluate(context)?),
            Condition::Exists { key } => {
                let obj = context
                    .as_object()
                    .ok_or(ConditionError::ContextNotObject)?;
                Ok(obj.get(key).is_some_and(|v| !v.is_null()))
            }
            Condition::Cmp { key, cmp, value } => {
                let obj = context
                    .as_object()
                    .ok_or(ConditionError::ContextNotObject)?;
                let actual = obj.get(key).ok_or_else(|| ConditionError::MissingKey {
                    key: key.clone(),
                })?;
                compare(key, *cmp, actual, value)
            }
        }
    }

    /// Evaluate, treating any error as `false`.
    ///
    /// The error is logged at `warn` so a misauthored expression is
    /// observable without failing the traversal.
    #[must_use]
    pub fn holds(&self, context: &Value) -> bool {
        match self.evaluate(context) {
            Ok(verdict) => verdict,
            Err(error) => {
                tracing::warn!(%error, "condition evaluation failed; treating as false");
                false
            }
        }
    }
}

fn compare(key: &str, op: CmpOp, actual: &Value, expected: &Value) -> Result<bool, ConditionError> {
    match op {
        CmpOp::Eq => Ok(actual == expected),
        CmpOp::Ne => Ok(actual != expected),
        CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte => {
            let (a, b) = match (actual.as_f64(), expected.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    return Err(ConditionError::NotComparable {
                        key: key.to_string(),
                        op,
                    });
                }
            };
            Ok(match op {
                CmpOp::Gt => a > b,
                CmpOp::Gte => a >= b,
                CmpOp::Lt => a < b,
                CmpOp::Lte => a <= b,
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}
