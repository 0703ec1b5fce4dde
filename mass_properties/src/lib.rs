use nalgebra::{Matrix3, Vector3};
use symbolic::{Expr, Zero};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MassPropertiesErrors {
    #[error("Ixx cant be less than zero")]
    IxxLessThanZero,
    #[error("Iyy cant be less than zero")]
    IyyLessThanZero,
    #[error("Izz cant be less than zero")]
    IzzLessThanZero,
    #[error("mass cannot be less than zero")]
    MassLessThanZero,
}

/// Rotational inertia tensor about the link frame origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Inertia {
    pub ixx: Expr,
    pub ixy: Expr,
    pub ixz: Expr,
    pub iyy: Expr,
    pub iyz: Expr,
    pub izz: Expr,
}

impl Inertia {
    /// Only diagonal entries that are already numbers are checked.
    pub fn new(
        ixx: Expr,
        iyy: Expr,
        izz: Expr,
        ixy: Expr,
        ixz: Expr,
        iyz: Expr,
    ) -> Result<Self, MassPropertiesErrors> {
        if ixx.as_number().is_some_and(|v| v < 0.0) {
            return Err(MassPropertiesErrors::IxxLessThanZero);
        }
        if iyy.as_number().is_some_and(|v| v < 0.0) {
            return Err(MassPropertiesErrors::IyyLessThanZero);
        }
        if izz.as_number().is_some_and(|v| v < 0.0) {
            return Err(MassPropertiesErrors::IzzLessThanZero);
        }
        Ok(Self {
            ixx,
            ixy,
            ixz,
            iyy,
            iyz,
            izz,
        })
    }

    /// `XX{j} XY{j} XZ{j} YY{j} YZ{j} ZZ{j}`
    pub fn symbolic(j: usize) -> Self {
        let s = |name: &str| Expr::symbol(&format!("{name}{j}"));
        Self {
            ixx: s("XX"),
            ixy: s("XY"),
            ixz: s("XZ"),
            iyy: s("YY"),
            iyz: s("YZ"),
            izz: s("ZZ"),
        }
    }

    pub fn zero() -> Self {
        Self {
            ixx: Expr::zero(),
            ixy: Expr::zero(),
            ixz: Expr::zero(),
            iyy: Expr::zero(),
            iyz: Expr::zero(),
            izz: Expr::zero(),
        }
    }

    pub fn matrix(&self) -> Matrix3<Expr> {
        Matrix3::new(
            self.ixx.clone(),
            self.ixy.clone(),
            self.ixz.clone(),
            self.ixy.clone(),
            self.iyy.clone(),
            self.iyz.clone(),
            self.ixz.clone(),
            self.iyz.clone(),
            self.izz.clone(),
        )
    }
}

/// Represents the mass properties of a link
/// Mass, first moment of mass (mass times center of mass), Inertia
#[derive(Debug, Clone, PartialEq)]
pub struct MassProperties {
    pub mass: Expr,
    pub first_moment: Vector3<Expr>,
    pub inertia: Inertia,
}

impl MassProperties {
    pub fn new(
        mass: Expr,
        first_moment: Vector3<Expr>,
        inertia: Inertia,
    ) -> Result<Self, MassPropertiesErrors> {
        if mass.as_number().is_some_and(|v| v < 0.0) {
            return Err(MassPropertiesErrors::MassLessThanZero);
        }
        Ok(Self {
            mass,
            first_moment,
            inertia,
        })
    }

    /// Fully symbolic parameters of link `j`: `M{j}`, `MX{j} MY{j} MZ{j}` and [`Inertia::symbolic`].
    pub fn symbolic(j: usize) -> Self {
        let s = |name: &str| Expr::symbol(&format!("{name}{j}"));
        Self {
            mass: s("M"),
            first_moment: Vector3::new(s("MX"), s("MY"), s("MZ")),
            inertia: Inertia::symbolic(j),
        }
    }

    /// Massless link, used for bases that never take part in aggregation.
    pub fn zero() -> Self {
        Self {
            mass: Expr::zero(),
            first_moment: Vector3::from_element(Expr::zero()),
            inertia: Inertia::zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_names() {
        let mp = MassProperties::symbolic(3);
        assert_eq!(mp.mass, Expr::symbol("M3"));
        assert_eq!(mp.first_moment[1], Expr::symbol("MY3"));
        assert_eq!(mp.inertia.matrix()[(2, 1)], Expr::symbol("YZ3"));
        assert_eq!(mp.inertia.matrix()[(1, 2)], Expr::symbol("YZ3"));
    }

    #[test]
    fn test_negative_mass() {
        let result = MassProperties::new(
            Expr::from(-1.0),
            Vector3::from_element(Expr::zero()),
            Inertia::zero(),
        );
        assert_eq!(result, Err(MassPropertiesErrors::MassLessThanZero));
    }

    #[test]
    fn test_negative_inertia() {
        let result = Inertia::new(
            Expr::from(1.0),
            Expr::from(-1.0),
            Expr::from(1.0),
            Expr::zero(),
            Expr::zero(),
            Expr::zero(),
        );
        assert_eq!(result, Err(MassPropertiesErrors::IyyLessThanZero));
    }

    #[test]
    fn test_symbolic_values_are_not_checked() {
        let result = MassProperties::new(
            -Expr::symbol("m"),
            Vector3::from_element(Expr::zero()),
            Inertia::zero(),
        );
        assert!(result.is_ok());
    }
}
