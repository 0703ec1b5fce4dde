use crate::{Expr, Symbol, SymbolicErrors};
use nalgebra::SMatrix;
use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
};

/// Turns expressions into named intermediates.
///
/// Implementors decide when a name is warranted; callers only hand over the
/// expression and a tag. Final outputs are requested with `forced` so they
/// always show up as a visible assignment.
pub trait Substitute {
    fn assign(&mut self, expr: Expr, name: String, forced: bool) -> Expr;

    fn substitute_scalar(&mut self, expr: Expr, tag: &str, index: usize, forced: bool) -> Expr {
        self.assign(expr, format!("{tag}{index}"), forced)
    }

    /// Names every entry of `matrix`. Column vectors are named `{tag}{row}{index}`,
    /// matrices `{tag}{row}{col}{index}` (1-based). With `symmetric` only the upper
    /// triangle is named and mirrored.
    fn substitute_matrix<const R: usize, const C: usize>(
        &mut self,
        matrix: SMatrix<Expr, R, C>,
        tag: &str,
        index: usize,
        symmetric: bool,
    ) -> SMatrix<Expr, R, C> {
        let mut named = matrix.clone();
        for r in 0..R {
            for c in 0..C {
                if symmetric && c < r {
                    named[(r, c)] = named[(c, r)].clone();
                    continue;
                }
                let name = if C == 1 {
                    format!("{tag}{}{index}", r + 1)
                } else {
                    format!("{tag}{}{}{index}", r + 1, c + 1)
                };
                named[(r, c)] = self.assign(matrix[(r, c)].clone(), name, false);
            }
        }
        named
    }
}

#[derive(Clone, Debug)]
pub struct Assignment {
    pub symbol: Symbol,
    pub expr: Expr,
}

impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.symbol, self.expr)
    }
}

/// Ordered list of named intermediates with common-subexpression reuse.
#[derive(Debug, Default)]
pub struct SymbolTable {
    assignments: Vec<Assignment>,
    known: HashMap<Expr, Symbol>,
    taken: HashSet<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks names that belong to model inputs so no intermediate shadows them.
    pub fn reserve<I: IntoIterator<Item = Symbol>>(&mut self, symbols: I) {
        self.taken.extend(symbols);
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn definition(&self, name: &str) -> Option<&Expr> {
        self.assignments
            .iter()
            .find(|a| a.symbol.name() == name)
            .map(|a| &a.expr)
    }

    /// Replays every assignment in registration order on top of `inputs`.
    pub fn evaluate(
        &self,
        inputs: &HashMap<Symbol, f64>,
    ) -> Result<HashMap<Symbol, f64>, SymbolicErrors> {
        let mut values = inputs.clone();
        for assignment in &self.assignments {
            let value = assignment.expr.eval(&values)?;
            values.insert(assignment.symbol.clone(), value);
        }
        Ok(values)
    }

    fn unique(&mut self, name: &str) -> Symbol {
        let mut symbol = Symbol::new(name);
        let mut suffix = 2;
        while self.taken.contains(&symbol) {
            symbol = Symbol::new(&format!("{name}_{suffix}"));
            suffix += 1;
        }
        self.taken.insert(symbol.clone());
        symbol
    }
}

impl Substitute for SymbolTable {
    fn assign(&mut self, expr: Expr, name: String, forced: bool) -> Expr {
        if !forced {
            if expr.is_trivial() {
                return expr;
            }
            if let Some(symbol) = self.known.get(&expr) {
                return Expr::Sym(symbol.clone());
            }
            if let Some(symbol) = self.known.get(&-expr.clone()) {
                return -Expr::Sym(symbol.clone());
            }
        }

        let symbol = self.unique(&name);
        if !expr.is_trivial() && !self.known.contains_key(&expr) {
            self.known.insert(expr.clone(), symbol.clone());
        }
        tracing::trace!(%symbol, %expr, "named");
        self.assignments.push(Assignment {
            symbol: symbol.clone(),
            expr,
        });
        Expr::Sym(symbol)
    }
}
