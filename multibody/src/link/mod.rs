use crate::joint::{Friction, JointKind};
use mass_properties::MassProperties;
use nalgebra::Vector3;
use std::collections::BTreeSet;
use symbolic::{Expr, Symbol, Zero};
use transforms::DhParameters;

/// Force and torque applied by the environment on a link, expressed in the link frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalWrench {
    pub force: Vector3<Expr>,
    pub torque: Vector3<Expr>,
}

impl ExternalWrench {
    /// `FX{j} FY{j} FZ{j}`, `CX{j} CY{j} CZ{j}`
    pub fn symbolic(j: usize) -> Self {
        let s = |name: &str| Expr::symbol(&format!("{name}{j}"));
        Self {
            force: Vector3::new(s("FX"), s("FY"), s("FZ")),
            torque: Vector3::new(s("CX"), s("CY"), s("CZ")),
        }
    }

    pub fn zero() -> Self {
        Self {
            force: Vector3::from_element(Expr::zero()),
            torque: Vector3::from_element(Expr::zero()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub ant: Option<usize>,
    pub joint: JointKind,
    /// Joint geometry without the joint variable, see [`Link::dh_parameters`].
    pub geometry: DhParameters,
    pub mass_properties: MassProperties,
    pub actuator_inertia: Expr,
    pub friction: Friction,
    pub external: ExternalWrench,
    pub q: Expr,
    pub qdot: Expr,
    pub qddot: Expr,
    pub torque: Expr,
}

impl Link {
    /// Link `j` with every dynamic parameter and joint variable left symbolic.
    pub fn symbolic(j: usize, ant: usize, joint: JointKind) -> Self {
        let s = |name: &str| Expr::symbol(&format!("{name}{j}"));
        let moving = !joint.is_fixed();
        let var = |name: &str| if moving { s(name) } else { Expr::zero() };
        Self {
            ant: Some(ant),
            joint,
            geometry: DhParameters::default(),
            mass_properties: MassProperties::symbolic(j),
            actuator_inertia: var("IA"),
            friction: if moving {
                Friction::symbolic(j)
            } else {
                Friction::none()
            },
            external: ExternalWrench::symbolic(j),
            q: var("q"),
            qdot: var("QP"),
            qddot: var("QDP"),
            torque: var("GAM"),
        }
    }

    /// Link 0. Its inertial parameters only matter for a floating base.
    pub fn base() -> Self {
        Self {
            ant: None,
            joint: JointKind::Fixed,
            geometry: DhParameters::default(),
            mass_properties: MassProperties::symbolic(0),
            actuator_inertia: Expr::zero(),
            friction: Friction::none(),
            external: ExternalWrench::symbolic(0),
            q: Expr::zero(),
            qdot: Expr::zero(),
            qddot: Expr::zero(),
            torque: Expr::zero(),
        }
    }

    /// Geometry with the joint variable added to `theta` (revolute) or `r` (prismatic).
    pub fn dh_parameters(&self) -> DhParameters {
        let mut dh = self.geometry.clone();
        match self.joint {
            JointKind::Revolute => dh.theta = dh.theta + self.q.clone(),
            JointKind::Prismatic => dh.r = dh.r + self.q.clone(),
            JointKind::Fixed => {}
        }
        dh
    }

    pub fn friction_torque(&self) -> Expr {
        self.friction.torque(self.joint, &self.qdot)
    }

    /// Symbols this link feeds into either recursion, except its torque and joint acceleration.
    pub(crate) fn parameter_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
        let geometry = &self.geometry;
        let mp = &self.mass_properties;
        let inertia = &mp.inertia;
        let exprs = [
            &geometry.gamma,
            &geometry.b,
            &geometry.alpha,
            &geometry.d,
            &geometry.theta,
            &geometry.r,
            &mp.mass,
            &inertia.ixx,
            &inertia.ixy,
            &inertia.ixz,
            &inertia.iyy,
            &inertia.iyz,
            &inertia.izz,
            &self.actuator_inertia,
            &self.friction.coulomb,
            &self.friction.viscous,
            &self.q,
            &self.qdot,
        ];
        let vectors = [&mp.first_moment, &self.external.force, &self.external.torque];
        exprs
            .into_iter()
            .chain(vectors.into_iter().flat_map(|v| v.iter()))
            .for_each(|e| symbols.extend(e.free_symbols()));
    }
}
