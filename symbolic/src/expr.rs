use crate::SymbolicErrors;
use num_traits::{One, Zero};
use std::{
    borrow::Borrow,
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    sync::Arc,
};

/// A numeric literal. Equality and hashing are bitwise so literals can key a map.
#[derive(Clone, Copy, Debug)]
pub struct Number(f64);

impl Number {
    pub fn new(value: f64) -> Self {
        // -0.0 + 0.0 == +0.0, keeps the two zeros from hashing differently
        Self(value + 0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A named scalar. Either a model input (`M1`, `QP2`, ...) or an intermediate
/// registered with a [`crate::SymbolTable`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Func {
    Sin,
    Cos,
    Sign,
}

impl Func {
    fn apply(self, x: f64) -> f64 {
        match self {
            Func::Sin => x.sin(),
            Func::Cos => x.cos(),
            Func::Sign => {
                if x == 0.0 {
                    0.0
                } else {
                    x.signum()
                }
            }
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Sign => "sign",
        }
    }
}

/// Immutable symbolic expression.
///
/// Every constructor returns the canonical form: sums and products are flat,
/// literals are folded, like terms and like bases are collected and operands
/// are sorted. Two expressions that only differ by operand order therefore
/// compare (and hash) equal, which is what lets the substitution engine reuse
/// names instead of re-expanding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expr {
    Num(Number),
    Sym(Symbol),
    Add(Arc<[Expr]>),
    Mul(Arc<[Expr]>),
    Pow(Arc<Expr>, i32),
    Func(Func, Arc<Expr>),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(Number::new(value))
    }

    pub fn symbol(name: &str) -> Self {
        Expr::Sym(Symbol::new(name))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Num(n) => Some(n.value()),
            _ => None,
        }
    }

    /// Literal, symbol or negated symbol. These never get a name of their own.
    pub fn is_trivial(&self) -> bool {
        match self {
            Expr::Num(_) | Expr::Sym(_) => true,
            Expr::Mul(factors) => {
                matches!(&factors[..], [Expr::Num(n), Expr::Sym(_)] if n.value() == -1.0)
            }
            _ => false,
        }
    }

    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut constant = 0.0;
        let mut collected: Vec<(Expr, f64)> = Vec::new();
        let mut pending: Vec<Expr> = terms.into_iter().collect();

        while let Some(term) = pending.pop() {
            match term {
                Expr::Num(n) => constant += n.value(),
                Expr::Add(inner) => pending.extend(inner.iter().cloned()),
                other => {
                    let (coefficient, rest) = other.split_coefficient();
                    match collected.iter_mut().find(|(existing, _)| *existing == rest) {
                        Some((_, c)) => *c += coefficient,
                        None => collected.push((rest, coefficient)),
                    }
                }
            }
        }

        let mut out: Vec<Expr> = collected
            .into_iter()
            .filter(|(_, c)| *c != 0.0)
            .map(|(term, c)| term.scaled(c))
            .collect();
        out.sort();
        if constant != 0.0 {
            out.insert(0, Expr::num(constant));
        }

        match out.len() {
            0 => Expr::zero(),
            1 => out.swap_remove(0),
            _ => Expr::Add(out.into()),
        }
    }

    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut coefficient = 1.0;
        let mut bases: Vec<(Expr, i32)> = Vec::new();
        let mut pending: Vec<(Expr, i32)> = factors.into_iter().map(|f| (f, 1)).collect();

        while let Some((factor, exponent)) = pending.pop() {
            match factor {
                Expr::Num(n) => coefficient *= n.value().powi(exponent),
                Expr::Mul(inner) => pending.extend(inner.iter().cloned().map(|f| (f, exponent))),
                Expr::Pow(base, n) => pending.push(((*base).clone(), n * exponent)),
                other => match bases.iter_mut().find(|(b, _)| *b == other) {
                    Some((_, e)) => *e += exponent,
                    None => bases.push((other, exponent)),
                },
            }
        }

        if coefficient == 0.0 {
            return Expr::zero();
        }

        let mut out: Vec<Expr> = bases
            .into_iter()
            .filter(|(_, e)| *e != 0)
            .map(|(b, e)| if e == 1 { b } else { Expr::Pow(Arc::new(b), e) })
            .collect();
        out.sort();
        if coefficient != 1.0 || out.is_empty() {
            out.insert(0, Expr::num(coefficient));
        }

        match out.len() {
            1 => out.swap_remove(0),
            _ => Expr::Mul(out.into()),
        }
    }

    pub fn powi(&self, n: i32) -> Expr {
        match (self, n) {
            (_, 0) => Expr::one(),
            (_, 1) => self.clone(),
            (Expr::Num(v), _) => Expr::num(v.value().powi(n)),
            (Expr::Pow(base, m), _) => base.powi(m * n),
            (Expr::Mul(factors), _) => Expr::product(factors.iter().map(|f| f.powi(n))),
            _ => Expr::Pow(Arc::new(self.clone()), n),
        }
    }

    pub fn recip(&self) -> Expr {
        self.powi(-1)
    }

    pub fn sin(&self) -> Expr {
        self.apply(Func::Sin)
    }

    pub fn cos(&self) -> Expr {
        self.apply(Func::Cos)
    }

    pub fn sign(&self) -> Expr {
        self.apply(Func::Sign)
    }

    fn apply(&self, func: Func) -> Expr {
        match self {
            Expr::Num(v) => Expr::num(func.apply(v.value())),
            _ => Expr::Func(func, Arc::new(self.clone())),
        }
    }

    /// Splits `c * rest` into its numeric coefficient and the remaining term.
    fn split_coefficient(self) -> (f64, Expr) {
        if let Expr::Mul(factors) = &self {
            if let Some((Expr::Num(n), rest)) = factors.split_first() {
                let rest = match rest {
                    [single] => single.clone(),
                    _ => Expr::Mul(Arc::from(rest)),
                };
                return (n.value(), rest);
            }
        }
        (1.0, self)
    }

    fn scaled(self, coefficient: f64) -> Expr {
        if coefficient == 1.0 {
            self
        } else {
            Expr::product([Expr::num(coefficient), self])
        }
    }

    pub fn eval(&self, env: &HashMap<Symbol, f64>) -> Result<f64, SymbolicErrors> {
        Ok(match self {
            Expr::Num(n) => n.value(),
            Expr::Sym(s) => *env
                .get(s)
                .ok_or_else(|| SymbolicErrors::UnboundSymbol(s.to_string()))?,
            Expr::Add(terms) => terms
                .iter()
                .map(|t| t.eval(env))
                .sum::<Result<f64, SymbolicErrors>>()?,
            Expr::Mul(factors) => factors
                .iter()
                .map(|f| f.eval(env))
                .product::<Result<f64, SymbolicErrors>>()?,
            Expr::Pow(base, n) => base.eval(env)?.powi(*n),
            Expr::Func(func, arg) => func.apply(arg.eval(env)?),
        })
    }

    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    pub(crate) fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(s) => {
                symbols.insert(s.clone());
            }
            Expr::Add(operands) | Expr::Mul(operands) => {
                operands.iter().for_each(|o| o.collect_symbols(symbols))
            }
            Expr::Pow(base, _) => base.collect_symbols(symbols),
            Expr::Func(_, arg) => arg.collect_symbols(symbols),
        }
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::zero()
    }
}

impl Zero for Expr {
    fn zero() -> Self {
        Expr::num(0.0)
    }

    fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(n) if n.value() == 0.0)
    }
}

impl One for Expr {
    fn one() -> Self {
        Expr::num(1.0)
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::num(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::num(value as f64)
    }
}

impl From<Symbol> for Expr {
    fn from(symbol: Symbol) -> Self {
        Expr::Sym(symbol)
    }
}

impl Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::sum([self, rhs])
    }
}

impl Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::sum([self, -rhs])
    }
}

impl Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs])
    }
}

impl Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs.recip()])
    }
}

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::product([Expr::num(-1.0), self])
    }
}

impl AddAssign for Expr {
    fn add_assign(&mut self, rhs: Expr) {
        let lhs = std::mem::take(self);
        *self = lhs + rhs;
    }
}

impl SubAssign for Expr {
    fn sub_assign(&mut self, rhs: Expr) {
        let lhs = std::mem::take(self);
        *self = lhs - rhs;
    }
}

impl MulAssign for Expr {
    fn mul_assign(&mut self, rhs: Expr) {
        let lhs = std::mem::take(self);
        *self = lhs * rhs;
    }
}

impl DivAssign for Expr {
    fn div_assign(&mut self, rhs: Expr) {
        let lhs = std::mem::take(self);
        *self = lhs / rhs;
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let (coefficient, rest) = term.clone().split_coefficient();
                    if i == 0 {
                        write!(f, "{term}")?;
                    } else if coefficient < 0.0 {
                        write!(f, " - {}", rest.scaled(-coefficient))?;
                    } else {
                        write!(f, " + {term}")?;
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => fmt_product(factors, f),
            Expr::Pow(base, n) => {
                fmt_factor(base, f)?;
                write!(f, "**{n}")
            }
            Expr::Func(func, arg) => write!(f, "{}({arg})", func.name()),
        }
    }
}

fn fmt_product(factors: &[Expr], f: &mut Formatter<'_>) -> fmt::Result {
    let mut coefficient = 1.0;
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for factor in factors {
        match factor {
            Expr::Num(n) => coefficient = n.value(),
            Expr::Pow(base, n) if *n < 0 => denominator.push(base.powi(-n)),
            other => numerator.push(other.clone()),
        }
    }

    if coefficient == -1.0 {
        write!(f, "-")?;
    } else if coefficient != 1.0 {
        numerator.insert(0, Expr::num(coefficient));
    }
    if numerator.is_empty() {
        write!(f, "1")?;
    }
    for (i, factor) in numerator.iter().enumerate() {
        if i > 0 {
            write!(f, "*")?;
        }
        fmt_factor(factor, f)?;
    }

    match denominator.as_slice() {
        [] => Ok(()),
        [single] => {
            write!(f, "/")?;
            fmt_factor(single, f)
        }
        many => {
            write!(f, "/(")?;
            for (i, factor) in many.iter().enumerate() {
                if i > 0 {
                    write!(f, "*")?;
                }
                fmt_factor(factor, f)?;
            }
            write!(f, ")")
        }
    }
}

fn fmt_factor(e: &Expr, f: &mut Formatter<'_>) -> fmt::Result {
    match e {
        Expr::Add(_) | Expr::Mul(_) => write!(f, "({e})"),
        Expr::Num(n) if n.value() < 0.0 => write!(f, "({e})"),
        _ => write!(f, "{e}"),
    }
}
