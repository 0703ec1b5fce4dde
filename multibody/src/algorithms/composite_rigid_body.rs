use super::{
    base_acceleration::{prescribed_base_acceleration, solve_base_acceleration},
    name_acceleration, reaction_wrench,
    scheduler::{Accumulator, TraversalOrder},
};
use crate::{
    bias::{build_relative_accel, link_bias, LinkBias},
    kinematics::{link_kinematics, LinkKinematics},
    robot::Robot,
    MultibodyErrors,
};
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use spatial_algebra::{build_spatial_inertia, skew};
use symbolic::{Expr, Substitute, Zero};

/// Running subtree totals. Inertia is kept as mass, first moment and 3x3 tensor
/// so moving it into the parent frame never needs a 6x6 product.
#[derive(Debug, Clone)]
struct CompositeTotal {
    mass: Expr,
    first_moment: Vector3<Expr>,
    inertia: Matrix3<Expr>,
    bias: Vector6<Expr>,
}

impl CompositeTotal {
    fn spatial(&self) -> Matrix6<Expr> {
        build_spatial_inertia(&self.inertia, &self.first_moment, &self.mass)
    }

    /// Names the sealed totals `MJE` (symmetric) and `VBE` and reads the parts
    /// back from the named matrix.
    fn named<S: Substitute>(self, symbols: &mut S, j: usize) -> Self {
        let spatial = symbols.substitute_matrix(self.spatial(), "MJE", j, true);
        let bias = symbols.substitute_matrix(self.bias, "VBE", j, false);
        Self {
            mass: spatial[(0, 0)].clone(),
            first_moment: Vector3::new(
                spatial[(5, 1)].clone(),
                spatial[(3, 2)].clone(),
                spatial[(4, 0)].clone(),
            ),
            inertia: spatial.fixed_view::<3, 3>(3, 3).into_owned(),
            bias,
        }
    }

    fn add(&mut self, share: CompositeTotal) {
        self.mass += share.mass;
        self.first_moment += share.first_moment;
        self.inertia += share.inertia;
        self.bias += share.bias;
    }
}

/// Share of a sealed child `j` in its parent's totals.
fn transfer<S: Substitute>(
    symbols: &mut S,
    j: usize,
    child: &CompositeTotal,
    kinematics: &LinkKinematics,
    zeta: &Vector6<Expr>,
) -> CompositeTotal {
    let rotation = &kinematics.transform.rotation;
    let translation = &kinematics.transform.translation;
    let mass = &child.mass;

    let as_ = symbols.substitute_matrix(rotation * &child.first_moment, "AS", j, false);
    let aj = symbols.substitute_matrix(rotation * &child.inertia, "AJ", j, false);
    let aja = symbols.substitute_matrix(aj * rotation.transpose(), "AJA", j, true);
    let sp = skew(translation);
    let pas = symbols.substitute_matrix(&sp * skew(&as_), "PAS", j, false);

    // parallel axis: R J R^T - (PAS + PAS^T) + M skew(P) skew(P)^T
    let inertia = aja - (&pas + pas.transpose()) + (&sp * sp.transpose()).map(|e| e * mass.clone());
    let first_moment = &as_ + translation.map(|e| e * mass.clone());

    let iz = symbols.substitute_matrix(child.spatial() * zeta, "IZ", j, false);
    let siz = symbols.substitute_matrix(kinematics.screw.transpose() * iz, "SIZ", j, false);
    let sbe = symbols.substitute_matrix(kinematics.screw.transpose() * &child.bias, "SBE", j, false);

    CompositeTotal {
        mass: mass.clone(),
        first_moment,
        inertia,
        bias: sbe - siz,
    }
}

/// Sealed composite inertia and bias of the subtree rooted at a link.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeLink {
    pub inertia: Matrix6<Expr>,
    pub bias: Vector6<Expr>,
}

#[derive(Debug, Clone)]
pub struct InverseDynamics {
    pub kinematics: Vec<LinkKinematics>,
    pub bias: Vec<LinkBias>,
    /// `gamma + qddot a` of every link.
    pub relative_acceleration: Vec<Vector6<Expr>>,
    /// `None` for a fixed base, which is never aggregated.
    pub composite: Vec<Option<CompositeLink>>,
    pub acceleration: Vec<Vector6<Expr>>,
    pub reaction: Vec<Vector6<Expr>>,
    /// Named `GAM{j}`.
    pub torque: Vec<Expr>,
}

/// Joint torques realizing the robot's joint accelerations, by composite inertias.
pub fn inverse_dynamics<S: Substitute>(
    robot: &Robot,
    symbols: &mut S,
) -> Result<InverseDynamics, MultibodyErrors> {
    let order = TraversalOrder::new(robot)?;
    let n = robot.num_links();
    tracing::info!(robot = %robot.name, links = n, "composite inverse dynamics");
    let zero = Vector6::from_element(Expr::zero());

    let kinematics = link_kinematics(robot, symbols, &order);
    tracing::debug!("kinematic sweep done");
    let bias = link_bias(robot, symbols, &order, &kinematics);
    let mut relative_acceleration = vec![zero.clone(); n];
    for j in order.links() {
        relative_acceleration[j] = build_relative_accel(
            symbols,
            j,
            &bias[j].gyroscopic,
            &robot.links[j].qddot,
            &kinematics[j].motion_subspace,
        );
    }
    tracing::debug!("bias sweep done");

    let seeds = robot
        .links
        .iter()
        .zip(&bias)
        .map(|(link, b)| CompositeTotal {
            mass: link.mass_properties.mass.clone(),
            first_moment: link.mass_properties.first_moment.clone(),
            inertia: link.mass_properties.inertia.matrix(),
            bias: b.wrench.clone(),
        })
        .collect();
    let mut totals = Accumulator::new(&order, seeds);
    for j in order.post_order() {
        if j == 0 && !order.aggregates_base() {
            continue;
        }
        let sealed = totals.seal(j, |t| t.named(symbols, j))?.clone();
        tracing::debug!(link = j, "composite sealed");
        if let Some(parent) = order.aggregation_target(j) {
            let share = transfer(symbols, j, &sealed, &kinematics[j], &relative_acceleration[j]);
            totals.contribute(j, parent, |t| t.add(share))?;
        }
    }

    let base_acceleration = match prescribed_base_acceleration(&robot.base) {
        Some(accel) => accel,
        None => {
            let root = totals
                .sealed(0)
                .ok_or(MultibodyErrors::AggregationOrder { link: 0, parent: 0 })?;
            solve_base_acceleration(symbols, &root.spatial(), &root.bias)?
        }
    };
    let composite: Vec<Option<CompositeLink>> = totals
        .into_sealed()
        .into_iter()
        .map(|t| {
            t.map(|t| CompositeLink {
                inertia: t.spatial(),
                bias: t.bias,
            })
        })
        .collect();

    let mut acceleration = vec![zero.clone(); n];
    let mut reaction = vec![zero; n];
    let mut torque = vec![Expr::zero(); n];
    acceleration[0] = name_acceleration(symbols, 0, base_acceleration);
    for j in order.links() {
        let Some(parent) = order.parent(j) else { continue };
        let link = &robot.links[j];
        let kin = &kinematics[j];
        let subtree = composite[j]
            .as_ref()
            .ok_or(MultibodyErrors::AggregationOrder { link: j, parent })?;

        let accel = &kin.screw * &acceleration[parent] + &relative_acceleration[j];
        acceleration[j] = name_acceleration(symbols, j, accel);
        reaction[j] = reaction_wrench(symbols, j, &subtree.inertia, &subtree.bias, &acceleration[j]);

        let gam = if link.joint.is_fixed() {
            Expr::zero()
        } else {
            kin.motion_subspace.dot(&reaction[j])
                + link.friction_torque()
                + link.actuator_inertia.clone() * link.qddot.clone()
        };
        torque[j] = symbols.substitute_scalar(gam, "GAM", j, true);
    }
    tracing::debug!("propagation sweep done");

    Ok(InverseDynamics {
        kinematics,
        bias,
        relative_acceleration,
        composite,
        acceleration,
        reaction,
        torque,
    })
}
