use nalgebra::Vector6;
use serde::{Deserialize, Serialize};
use symbolic::{Expr, One, Zero};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("unsupported joint kind {0}")]
pub struct UnsupportedJointKind(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointKind {
    Revolute,
    Prismatic,
    Fixed,
}

impl JointKind {
    pub fn is_fixed(&self) -> bool {
        matches!(self, JointKind::Fixed)
    }

    /// Direction of the joint degree of freedom, `[linear; angular]` along the joint z axis.
    pub fn motion_subspace(&self) -> Vector6<Expr> {
        let mut a = Vector6::from_element(Expr::zero());
        match self {
            JointKind::Revolute => a[5] = Expr::one(),
            JointKind::Prismatic => a[2] = Expr::one(),
            JointKind::Fixed => {}
        }
        a
    }
}

impl TryFrom<u8> for JointKind {
    type Error = UnsupportedJointKind;
    fn try_from(sigma: u8) -> Result<Self, Self::Error> {
        match sigma {
            0 => Ok(JointKind::Revolute),
            1 => Ok(JointKind::Prismatic),
            2 => Ok(JointKind::Fixed),
            _ => Err(UnsupportedJointKind(sigma)),
        }
    }
}

/// Coulomb plus viscous joint friction.
#[derive(Debug, Clone, PartialEq)]
pub struct Friction {
    pub coulomb: Expr,
    pub viscous: Expr,
}

impl Friction {
    pub fn symbolic(j: usize) -> Self {
        Self {
            coulomb: Expr::symbol(&format!("FS{j}")),
            viscous: Expr::symbol(&format!("FV{j}")),
        }
    }

    pub fn none() -> Self {
        Self {
            coulomb: Expr::zero(),
            viscous: Expr::zero(),
        }
    }

    /// `FS sign(qdot) + FV qdot`, zero for a fixed joint.
    pub fn torque(&self, kind: JointKind, qdot: &Expr) -> Expr {
        if kind.is_fixed() {
            return Expr::zero();
        }
        self.coulomb.clone() * qdot.sign() + self.viscous.clone() * qdot.clone()
    }
}
