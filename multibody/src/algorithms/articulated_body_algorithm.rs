use super::{
    base_acceleration::{prescribed_base_acceleration, solve_base_acceleration},
    name_acceleration, reaction_wrench,
    scheduler::{Accumulator, TraversalOrder},
};
use crate::{
    bias::{link_bias, LinkBias},
    kinematics::{link_kinematics, LinkKinematics},
    link::Link,
    robot::Robot,
    MultibodyErrors,
};
use nalgebra::{Matrix6, Vector6};
use spatial_algebra::build_spatial_inertia;
use symbolic::{Expr, Substitute, Zero};

#[derive(Debug, Clone)]
struct StarTotal {
    inertia: Matrix6<Expr>,
    bias: Vector6<Expr>,
}

/// A link's articulated inertia with its own joint eliminated.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticulatedLink {
    /// `I*`, named `MJE`.
    pub inertia: Matrix6<Expr>,
    /// `beta*`, named `VBE`.
    pub bias: Vector6<Expr>,
    /// `I* a`, named `JA`.
    pub projected_inertia: Vector6<Expr>,
    /// `1 / (a^T I* a + IA)`, named `JD`.
    pub inverse_inertia: Expr,
    /// `JA JD`, named `JU`.
    pub gain: Vector6<Expr>,
    /// `a^T beta* + torque - friction`, named `GW`.
    pub torque: Expr,
    /// `I* - JU JA^T`, named `GK`.
    pub reduced_inertia: Matrix6<Expr>,
}

impl ArticulatedLink {
    fn eliminate<S: Substitute>(
        symbols: &mut S,
        j: usize,
        link: &Link,
        motion_subspace: &Vector6<Expr>,
        star: StarTotal,
    ) -> Result<Self, MultibodyErrors> {
        let zero = Vector6::from_element(Expr::zero());
        if link.joint.is_fixed() {
            return Ok(Self {
                reduced_inertia: star.inertia.clone(),
                inertia: star.inertia,
                bias: star.bias,
                projected_inertia: zero.clone(),
                inverse_inertia: Expr::zero(),
                gain: zero,
                torque: Expr::zero(),
            });
        }

        let a = motion_subspace;
        let ja = symbols.substitute_matrix(&star.inertia * a, "JA", j, false);
        let h = a.dot(&ja) + link.actuator_inertia.clone();
        if h.is_zero() {
            tracing::warn!(link = j, "zero effective joint inertia");
            return Err(MultibodyErrors::SingularJointInertia { link: j });
        }
        let jd = symbols.substitute_scalar(h.recip(), "JD", j, false);
        let ju = symbols.substitute_matrix(ja.map(|e| e * jd.clone()), "JU", j, false);
        let gw = a.dot(&star.bias) + link.torque.clone() - link.friction_torque();
        let gw = symbols.substitute_scalar(gw, "GW", j, false);
        let gk = symbols.substitute_matrix(&star.inertia - &ju * ja.transpose(), "GK", j, true);
        Ok(Self {
            inertia: star.inertia,
            bias: star.bias,
            projected_inertia: ja,
            inverse_inertia: jd,
            gain: ju,
            torque: gw,
            reduced_inertia: gk,
        })
    }

    /// Share of this link in its parent's articulated totals.
    fn transfer<S: Substitute>(
        &self,
        symbols: &mut S,
        j: usize,
        kinematics: &LinkKinematics,
        gyroscopic: &Vector6<Expr>,
    ) -> StarTotal {
        let ng = symbols.substitute_matrix(&self.reduced_inertia * gyroscopic, "NG", j, false);
        let vs = ng + self.gain.map(|e| e * self.torque.clone());
        let vs = symbols.substitute_matrix(vs, "VS", j, false);
        let ap = symbols.substitute_matrix(vs - &self.bias, "AP", j, false);

        let screw_t = kinematics.screw.transpose();
        let gx = symbols.substitute_matrix(&screw_t * &self.reduced_inertia, "GX", j, false);
        let tkt = symbols.substitute_matrix(gx * &kinematics.screw, "TKT", j, true);
        StarTotal {
            inertia: tkt,
            bias: -(screw_t * ap),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectDynamics {
    pub kinematics: Vec<LinkKinematics>,
    pub bias: Vec<LinkBias>,
    /// `None` for the base when it is fixed.
    pub articulated: Vec<Option<ArticulatedLink>>,
    pub acceleration: Vec<Vector6<Expr>>,
    pub reaction: Vec<Vector6<Expr>>,
    /// Named `QDP{j}`.
    pub joint_acceleration: Vec<Expr>,
}

/// Joint accelerations produced by the robot's joint torques, by articulated inertias.
pub fn direct_dynamics<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
) -> Result<DirectDynamics, MultibodyErrors> {
    let order = TraversalOrder::new(robot)?;
    let n = robot.num_links();
    tracing::info!(robot = %robot.name, links = n, "articulated direct dynamics");
    let zero = Vector6::from_element(Expr::zero());

    let kinematics = link_kinematics(robot, symbols, &order);
    tracing::debug!("kinematic sweep done");
    let bias = link_bias(robot, symbols, &order, &kinematics);
    tracing::debug!("bias sweep done");

    let seeds = robot
        .links
        .iter()
        .zip(&bias)
        .map(|(link, b)| {
            let mp = &link.mass_properties;
            StarTotal {
                inertia: build_spatial_inertia(&mp.inertia.matrix(), &mp.first_moment, &mp.mass),
                bias: b.wrench.clone(),
            }
        })
        .collect();
    let mut totals = Accumulator::new(&order, seeds);
    let mut articulated: Vec<Option<ArticulatedLink>> = vec![None; n];
    for j in order.post_order() {
        if j == 0 && !order.aggregates_base() {
            continue;
        }
        let star = totals
            .seal(j, |t| StarTotal {
                inertia: symbols.substitute_matrix(t.inertia, "MJE", j, true),
                bias: symbols.substitute_matrix(t.bias, "VBE", j, false),
            })?
            .clone();
        tracing::debug!(link = j, "articulated inertia sealed");
        if j == 0 {
            continue;
        }

        let link = &robot.links[j];
        let eliminated =
            ArticulatedLink::eliminate(symbols, j, link, &kinematics[j].motion_subspace, star)?;
        if let Some(parent) = order.aggregation_target(j) {
            let share = eliminated.transfer(symbols, j, &kinematics[j], &bias[j].gyroscopic);
            totals.contribute(j, parent, |t| {
                t.inertia += share.inertia;
                t.bias += share.bias;
            })?;
        }
        articulated[j] = Some(eliminated);
    }

    let base_acceleration = match prescribed_base_acceleration(&robot.base) {
        Some(accel) => accel,
        None => {
            let root = totals
                .sealed(0)
                .ok_or(MultibodyErrors::AggregationOrder { link: 0, parent: 0 })?;
            let accel = solve_base_acceleration(symbols, &root.inertia, &root.bias)?;
            articulated[0] = Some(ArticulatedLink {
                inertia: root.inertia.clone(),
                bias: root.bias.clone(),
                projected_inertia: zero.clone(),
                inverse_inertia: Expr::zero(),
                gain: zero.clone(),
                torque: Expr::zero(),
                reduced_inertia: root.inertia.clone(),
            });
            accel
        }
    };

    let mut acceleration = vec![zero.clone(); n];
    let mut reaction = vec![zero; n];
    let mut joint_acceleration = vec![Expr::zero(); n];
    acceleration[0] = name_acceleration(symbols, 0, base_acceleration);
    for j in order.links() {
        let Some(parent) = order.parent(j) else { continue };
        let kin = &kinematics[j];
        let art = articulated[j]
            .as_ref()
            .ok_or(MultibodyErrors::AggregationOrder { link: j, parent })?;

        let vr = &kin.screw * &acceleration[parent] + &bias[j].gyroscopic;
        let vr = symbols.substitute_matrix(vr, "VR", j, false);
        let qdp = if robot.links[j].joint.is_fixed() {
            Expr::zero()
        } else {
            let gu = symbols.substitute_scalar(art.gain.dot(&vr), "GU", j, false);
            art.inverse_inertia.clone() * art.torque.clone() - gu
        };
        let qdp = symbols.substitute_scalar(qdp, "QDP", j, true);

        let accel = vr + kin.motion_subspace.map(|e| e * qdp.clone());
        acceleration[j] = name_acceleration(symbols, j, accel);
        reaction[j] = reaction_wrench(symbols, j, &art.inertia, &art.bias, &acceleration[j]);
        joint_acceleration[j] = qdp;
    }
    tracing::debug!("propagation sweep done");

    Ok(DirectDynamics {
        kinematics,
        bias,
        articulated,
        acceleration,
        reaction,
        joint_acceleration,
    })
}
