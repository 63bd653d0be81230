//! Linear expressions written as text.
//!
//! Model files describe constraints and objectives as `+`-separated sums of
//! terms, where each term is either a bare variable name or
//! `coefficient*variable`:
//!
//! ```
//! use std::collections::HashMap;
//! use letsopt::domain::expression::parse_linear_expression;
//!
//! let vars = HashMap::from([("x".to_string(), 0usize), ("y".to_string(), 1usize)]);
//! let expr = parse_linear_expression("2*x + y", &vars).unwrap();
//!
//! let values = [3.0, 4.0];
//! assert_eq!(expr.evaluate(|var| values[*var]), 10.0);
//! ```
//!
//! Subtraction is written as a negative coefficient (`x + -1*y`).

use std::collections::HashMap;

/// Error produced while parsing a textual linear expression
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Malformed term '{term}': {reason}")]
    MalformedTerm { term: String, reason: String },
}

impl ExpressionError {
    fn malformed(term: &str, reason: impl Into<String>) -> Self {
        ExpressionError::MalformedTerm {
            term: term.to_string(),
            reason: reason.into(),
        }
    }
}

/// Weighted sum `Σ coefficient × variable` over engine-side handles.
///
/// Each handle appears at most once; adding a term for a handle that is
/// already present accumulates its coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearExpr<H> {
    terms: Vec<(H, f64)>,
}

impl<H> Default for LinearExpr<H> {
    fn default() -> Self {
        Self { terms: Vec::new() }
    }
}

impl<H: Copy + PartialEq> LinearExpr<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, handle: H, coefficient: f64) {
        match self.terms.iter_mut().find(|(h, _)| *h == handle) {
            Some((_, existing)) => *existing += coefficient,
            None => self.terms.push((handle, coefficient)),
        }
    }

    pub fn with_term(mut self, handle: H, coefficient: f64) -> Self {
        self.add_term(handle, coefficient);
        self
    }

    /// Coefficient of `handle`, or `None` when it does not appear.
    pub fn coefficient(&self, handle: H) -> Option<f64> {
        self.terms
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|&(_, c)| c)
    }

    pub fn terms(&self) -> &[(H, f64)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Value of the expression under an assignment of its handles.
    pub fn evaluate<F>(&self, mut value_of: F) -> f64
    where
        F: FnMut(&H) -> f64,
    {
        self.terms.iter().map(|(h, c)| c * value_of(h)).sum()
    }

    /// Re-key the expression onto another handle type.
    pub fn map_handles<G, F>(&self, mut f: F) -> LinearExpr<G>
    where
        G: Copy + PartialEq,
        F: FnMut(H) -> G,
    {
        let mut mapped = LinearExpr::new();
        for &(h, c) in &self.terms {
            mapped.add_term(f(h), c);
        }
        mapped
    }
}

/// Parse `text` against the declared variables.
///
/// A blank expression is the empty sum. Fails with
/// [`ExpressionError::UnknownVariable`] for undeclared names and
/// [`ExpressionError::MalformedTerm`] for empty terms, terms with more than
/// one `*`, or coefficients that are not finite numbers.
pub fn parse_linear_expression<H>(
    text: &str,
    variables: &HashMap<String, H>,
) -> Result<LinearExpr<H>, ExpressionError>
where
    H: Copy + PartialEq,
{
    let mut expr = LinearExpr::new();
    if text.trim().is_empty() {
        return Ok(expr);
    }

    for raw in text.split('+') {
        let term = raw.trim();
        let (coefficient, name) = parse_term(term)?;
        let handle = variables
            .get(name)
            .copied()
            .ok_or_else(|| ExpressionError::UnknownVariable(name.to_string()))?;
        expr.add_term(handle, coefficient);
    }

    Ok(expr)
}

fn parse_term(term: &str) -> Result<(f64, &str), ExpressionError> {
    if term.is_empty() {
        return Err(ExpressionError::malformed(term, "empty term"));
    }

    let mut parts = term.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(second) = parts.next() else {
        return Ok((1.0, term));
    };
    if parts.next().is_some() {
        return Err(ExpressionError::malformed(
            term,
            "expected exactly one '*' between coefficient and variable",
        ));
    }

    let literal = first.trim();
    let coefficient: f64 = literal.parse().map_err(|_| {
        ExpressionError::malformed(term, format!("coefficient '{literal}' is not a number"))
    })?;
    if !coefficient.is_finite() {
        return Err(ExpressionError::malformed(
            term,
            format!("coefficient '{literal}' is not finite"),
        ));
    }

    let name = second.trim();
    if name.is_empty() {
        return Err(ExpressionError::malformed(term, "missing variable name"));
    }

    Ok((coefficient, name))
}
