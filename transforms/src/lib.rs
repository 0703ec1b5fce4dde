use nalgebra::{Matrix3, Vector3};
use std::ops::Mul;
use symbolic::{Expr, One, Substitute, Zero};

/// Rigid transform `parent_from_child`: a point `p` in the child frame maps to
/// `rotation * p + translation` in the parent frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub rotation: Matrix3<Expr>,
    pub translation: Vector3<Expr>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(rotation: Matrix3<Expr>, translation: Vector3<Expr>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::from_fn(|r, c| if r == c { Expr::one() } else { Expr::zero() }),
            translation: Vector3::from_element(Expr::zero()),
        }
    }

    /// Rotation about x given the sine and cosine of the angle.
    pub fn rot_x(s: Expr, c: Expr) -> Self {
        let (o, l) = (Expr::zero(), Expr::one());
        Self::new(
            Matrix3::new(
                l,
                o.clone(),
                o.clone(),
                o.clone(),
                c.clone(),
                -s.clone(),
                o,
                s,
                c,
            ),
            Vector3::from_element(Expr::zero()),
        )
    }

    /// Rotation about z given the sine and cosine of the angle.
    pub fn rot_z(s: Expr, c: Expr) -> Self {
        let (o, l) = (Expr::zero(), Expr::one());
        Self::new(
            Matrix3::new(
                c.clone(),
                -s.clone(),
                o.clone(),
                s,
                c,
                o.clone(),
                o.clone(),
                o,
                l,
            ),
            Vector3::from_element(Expr::zero()),
        )
    }

    pub fn trans_x(d: Expr) -> Self {
        let mut t = Self::identity();
        t.translation[0] = d;
        t
    }

    pub fn trans_z(d: Expr) -> Self {
        let mut t = Self::identity();
        t.translation[2] = d;
        t
    }

    pub fn inv(&self) -> Self {
        let rotation = self.rotation.transpose();
        let translation = -(&rotation * &self.translation);
        Self {
            rotation,
            translation,
        }
    }
}

impl Mul<Transform> for Transform {
    type Output = Transform;
    fn mul(self, rhs: Transform) -> Transform {
        let translation = &self.rotation * &rhs.translation + &self.translation;
        Transform {
            rotation: self.rotation * rhs.rotation,
            translation,
        }
    }
}

/// Modified Denavit-Hartenberg geometry of one joint, with the extra `gamma`/`b`
/// pair used for tree structures.
#[derive(Debug, Clone, PartialEq)]
pub struct DhParameters {
    pub gamma: Expr,
    pub b: Expr,
    pub alpha: Expr,
    pub d: Expr,
    pub theta: Expr,
    pub r: Expr,
}

impl Default for DhParameters {
    fn default() -> Self {
        Self {
            gamma: Expr::zero(),
            b: Expr::zero(),
            alpha: Expr::zero(),
            d: Expr::zero(),
            theta: Expr::zero(),
            r: Expr::zero(),
        }
    }
}

impl DhParameters {
    /// `parent_from_joint = Rz(gamma) Tz(b) Rx(alpha) Tx(d) Rz(theta) Tz(r)`.
    ///
    /// Sines and cosines that are not literals are named `S{j}`/`C{j}` (theta),
    /// `SA{j}`/`CA{j}` (alpha) and `SG{j}`/`CG{j}` (gamma).
    pub fn transform<S: Substitute>(&self, symbols: &mut S, j: usize) -> Transform {
        let (sg, cg) = sin_cos(symbols, &self.gamma, "SG", "CG", j);
        let (sa, ca) = sin_cos(symbols, &self.alpha, "SA", "CA", j);
        let (st, ct) = sin_cos(symbols, &self.theta, "S", "C", j);
        Transform::rot_z(sg, cg)
            * Transform::trans_z(self.b.clone())
            * Transform::rot_x(sa, ca)
            * Transform::trans_x(self.d.clone())
            * Transform::rot_z(st, ct)
            * Transform::trans_z(self.r.clone())
    }
}

fn sin_cos<S: Substitute>(
    symbols: &mut S,
    angle: &Expr,
    sin_tag: &str,
    cos_tag: &str,
    j: usize,
) -> (Expr, Expr) {
    let s = symbols.substitute_scalar(angle.sin(), sin_tag, j, false);
    let c = symbols.substitute_scalar(angle.cos(), cos_tag, j, false);
    (s, c)
}
