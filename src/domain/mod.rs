// Domain module: model vocabulary, expression parsing and the engine contract

pub mod engine;
pub mod expression;
pub mod models;
pub mod value_objects;

pub use engine::*;
pub use expression::{parse_linear_expression, ExpressionError, LinearExpr};
pub use models::*;
pub use value_objects::*;
