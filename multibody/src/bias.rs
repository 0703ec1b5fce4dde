//! Velocity dependent terms of sweep B.

use crate::{
    algorithms::scheduler::TraversalOrder, joint::JointKind, kinematics::LinkKinematics,
    link::ExternalWrench, robot::Robot,
};
use nalgebra::{Vector3, Vector6};
use spatial_algebra::{cross, join, SpatialInertia};
use symbolic::{Expr, Substitute, Zero};

#[derive(Debug, Clone, PartialEq)]
pub struct LinkBias {
    /// Acceleration bias, present even with zero joint acceleration.
    pub gyroscopic: Vector6<Expr>,
    /// Wrench bias from external loads and centrifugal and gyroscopic effects.
    pub wrench: Vector6<Expr>,
}

/// `[-F - w x (w x MS); -N - w x (J w)]`
pub fn build_wrench_bias<S: Substitute>(
    symbols: &mut S,
    j: usize,
    omega: &Vector3<Expr>,
    inertia: &SpatialInertia,
    external: &ExternalWrench,
) -> Vector6<Expr> {
    let jw = symbols.substitute_matrix(&inertia.inertia * omega, "JW", j, false);
    let kw = symbols.substitute_matrix(cross(omega, &jw), "KW", j, false);
    let sw = cross(omega, &cross(omega, &inertia.first_moment));
    let sw = symbols.substitute_matrix(sw, "SW", j, false);
    let beta = join(&(-&external.force - sw), &(-&external.torque - kw));
    symbols.substitute_matrix(beta, "BETA", j, false)
}

/// Linear part: the parent rotation acting through the joint offset, plus the
/// Coriolis term `2 wi x qdot z` for a prismatic joint. Angular part: `wi x qdot z`
/// for a revolute joint only.
pub fn build_gyroscopic_accel<S: Substitute>(
    symbols: &mut S,
    j: usize,
    kinematics: &LinkKinematics,
    parent_omega: &Vector3<Expr>,
    qdot: &Expr,
    kind: JointKind,
) -> Vector6<Expr> {
    let zero = Vector3::from_element(Expr::zero());
    let axis_rate = Vector3::new(Expr::zero(), Expr::zero(), qdot.clone());
    let wq = match kind {
        JointKind::Fixed => zero.clone(),
        JointKind::Revolute | JointKind::Prismatic => {
            symbols.substitute_matrix(cross(&kinematics.parent_omega, &axis_rate), "WQ", j, false)
        }
    };

    let translation = &kinematics.transform.translation;
    let centripetal = cross(parent_omega, &cross(parent_omega, translation));
    let lw = kinematics.transform.rotation.transpose() * centripetal;
    let lw = symbols.substitute_matrix(lw, "LW", j, false);

    let (linear, angular) = match kind {
        JointKind::Revolute => (lw, wq),
        JointKind::Prismatic => (lw + wq.map(|e| Expr::from(2) * e), zero),
        JointKind::Fixed => (lw, zero),
    };
    symbols.substitute_matrix(join(&linear, &angular), "GYACC", j, false)
}

/// `gamma + qddot a`, named `ZETA`.
pub fn build_relative_accel<S: Substitute>(
    symbols: &mut S,
    j: usize,
    gyroscopic: &Vector6<Expr>,
    qddot: &Expr,
    motion_subspace: &Vector6<Expr>,
) -> Vector6<Expr> {
    let zeta = gyroscopic + motion_subspace.map(|a| a * qddot.clone());
    symbols.substitute_matrix(zeta, "ZETA", j, false)
}

/// Sweep B. The base wrench bias is only built when the base is aggregated.
pub fn link_bias<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
    order: &TraversalOrder,
    kinematics: &[LinkKinematics],
) -> Vec<LinkBias> {
    let zero = Vector6::from_element(Expr::zero());
    let mut bias = vec![
        LinkBias {
            gyroscopic: zero.clone(),
            wrench: zero,
        };
        robot.num_links()
    ];
    for j in order.pre_order() {
        let link = &robot.links[j];
        let kin = &kinematics[j];
        let parent = match link.ant {
            Some(parent) => parent,
            None if order.aggregates_base() => {
                let inertia = SpatialInertia::from(&link.mass_properties);
                bias[j].wrench = build_wrench_bias(symbols, j, &kin.omega, &inertia, &link.external);
                continue;
            }
            None => continue,
        };
        bias[j].gyroscopic = build_gyroscopic_accel(
            symbols,
            j,
            kin,
            &kinematics[parent].omega,
            &link.qdot,
            link.joint,
        );
        let inertia = SpatialInertia::from(&link.mass_properties);
        bias[j].wrench = build_wrench_bias(symbols, j, &kin.omega, &inertia, &link.external);
    }
    bias
}
