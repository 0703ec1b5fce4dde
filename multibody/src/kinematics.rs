use crate::{algorithms::scheduler::TraversalOrder, joint::JointKind, robot::Robot};
use nalgebra::{Matrix6, Vector3, Vector6};
use spatial_algebra::SpatialTransform;
use symbolic::{Expr, One, Substitute, Zero};
use transforms::Transform;

/// Sweep K result for one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkKinematics {
    /// `parent_from_link` as the pair (R, P).
    pub transform: Transform,
    /// Screw transform `link_from_parent`.
    pub screw: Matrix6<Expr>,
    pub motion_subspace: Vector6<Expr>,
    /// Parent angular velocity expressed in this link's frame.
    pub parent_omega: Vector3<Expr>,
    pub omega: Vector3<Expr>,
}

/// `(R, P)` of every link from its modified DH geometry. The base gets the identity.
pub fn rotation_and_translation<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
    order: &TraversalOrder,
) -> Vec<Transform> {
    let mut transforms = vec![Transform::identity(); robot.num_links()];
    for j in order.links() {
        transforms[j] = robot.links[j].dh_parameters().transform(symbols, j);
    }
    transforms
}

/// Named `TS{row}{col}{j}`.
pub fn screw_transform<S: Substitute>(symbols: &mut S, transform: &Transform, j: usize) -> Matrix6<Expr> {
    let screw = SpatialTransform::from(transform.clone()).matrix();
    symbols.substitute_matrix(screw, "TS", j, false)
}

/// `(parent_omega, omega)` of every link in its own frame, named `WI` and `W`.
pub fn angular_velocities<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
    transforms: &[Transform],
    order: &TraversalOrder,
) -> Vec<(Vector3<Expr>, Vector3<Expr>)> {
    let w0 = robot.base.angular_velocity.clone();
    let mut omegas = vec![(w0.clone(), w0); robot.num_links()];
    for j in order.links() {
        let link = &robot.links[j];
        let Some(parent) = link.ant else { continue };
        let parent_omega = transforms[j].rotation.transpose() * &omegas[parent].1;
        let parent_omega = symbols.substitute_matrix(parent_omega, "WI", j, false);
        let omega = match link.joint {
            JointKind::Revolute => {
                let mut w = parent_omega.clone();
                w[2] += link.qdot.clone();
                symbols.substitute_matrix(w, "W", j, false)
            }
            JointKind::Prismatic | JointKind::Fixed => parent_omega.clone(),
        };
        omegas[j] = (parent_omega, omega);
    }
    omegas
}

/// Sweep K: transforms, screw transforms, motion subspaces and angular velocities.
pub fn link_kinematics<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
    order: &TraversalOrder,
) -> Vec<LinkKinematics> {
    let transforms = rotation_and_translation(robot, symbols, order);
    let mut screws = vec![Matrix6::from_fn(|r, c| if r == c { Expr::one() } else { Expr::zero() }); robot.num_links()];
    for j in order.links() {
        screws[j] = screw_transform(symbols, &transforms[j], j);
    }
    let omegas = angular_velocities(robot, symbols, &transforms, order);

    transforms
        .into_iter()
        .zip(screws)
        .zip(omegas)
        .zip(&robot.links)
        .map(|(((transform, screw), (parent_omega, omega)), link)| LinkKinematics {
            transform,
            screw,
            motion_subspace: link.joint.motion_subspace(),
            parent_omega,
            omega,
        })
        .collect()
}
