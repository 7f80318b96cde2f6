//! Derived Expressions
//!
//! A small interpreter for `derived` bindings. Source text is tokenized,
//! parsed into an [`Expr`] tree and evaluated against the props and the
//! state scopes. Reads of state go through the store's signals, so an
//! expression evaluated inside an effect or memo tracks exactly the entries
//! it touched.

mod eval;
mod lexer;
mod parser;

pub use eval::{loose_eq, number, strict_eq, to_display_string, to_number, truthy, Env};
pub use parser::{BinaryOp, Expr, Root, UnaryOp, MAX_DEPTH};

pub(crate) use eval::lookup_state;

use serde_json::Value;

use crate::context::Context;
use crate::error::ExprError;
use crate::state::Store;

/// Parse and evaluate `source`.
pub fn evaluate(source: &str, ctx: &Context, store: &Store) -> Result<Value, ExprError> {
    let expr = Expr::parse(source)?;
    Ok(eval::evaluate(&expr, &Env { ctx, store }))
}

/// Evaluate an already parsed expression.
pub fn evaluate_expr(expr: &Expr, ctx: &Context, store: &Store) -> Value {
    eval::evaluate(expr, &Env { ctx, store })
}
