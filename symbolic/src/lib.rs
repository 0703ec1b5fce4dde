mod expr;
mod table;

pub use expr::{Expr, Func, Number, Symbol};
pub use num_traits::{One, Zero};
pub use table::{Assignment, Substitute, SymbolTable};

use nalgebra::SMatrix;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolicErrors {
    #[error("symbol {0} has no value")]
    UnboundSymbol(String),
}

/// Evaluates every entry of a symbolic matrix.
pub fn eval_matrix<const R: usize, const C: usize>(
    matrix: &SMatrix<Expr, R, C>,
    env: &HashMap<Symbol, f64>,
) -> Result<SMatrix<f64, R, C>, SymbolicErrors> {
    let mut out = SMatrix::<f64, R, C>::zeros();
    for r in 0..R {
        for c in 0..C {
            out[(r, c)] = matrix[(r, c)].eval(env)?;
        }
    }
    Ok(out)
}
