pub mod articulated_body_algorithm;
pub mod base_acceleration;
pub mod composite_rigid_body;
pub mod scheduler;

use crate::{robot::Robot, MultibodyErrors};
use articulated_body_algorithm::direct_dynamics;
use composite_rigid_body::inverse_dynamics;
use nalgebra::{Matrix6, Vector6};
use serde::{Deserialize, Serialize};
use spatial_algebra::{join, split};
use symbolic::{Expr, Substitute, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultibodyAlgorithm {
    /// Direct dynamics, torques in and joint accelerations out.
    ArticulatedBody,
    /// Inverse dynamics, joint accelerations in and torques out.
    CompositeRigidBody,
}

/// Runs `algorithm` on `robot` and returns the named equations in evaluation order.
pub fn equations_of_motion(
    robot: &Robot,
    algorithm: MultibodyAlgorithm,
) -> Result<SymbolTable, MultibodyErrors> {
    let mut symbols = SymbolTable::new();
    symbols.reserve(robot.consumed_symbols(algorithm));
    match algorithm {
        MultibodyAlgorithm::ArticulatedBody => {
            direct_dynamics(robot, &mut symbols)?;
        }
        MultibodyAlgorithm::CompositeRigidBody => {
            inverse_dynamics(robot, &mut symbols)?;
        }
    }
    tracing::info!(equations = symbols.len(), ?algorithm, "equations generated");
    Ok(symbols)
}

/// Spatial acceleration of link `j`, named `VP` (linear) and `WP` (angular).
pub(crate) fn name_acceleration<S: Substitute>(
    symbols: &mut S,
    j: usize,
    acceleration: Vector6<Expr>,
) -> Vector6<Expr> {
    let (linear, angular) = split(&acceleration);
    let linear = symbols.substitute_matrix(linear, "VP", j, false);
    let angular = symbols.substitute_matrix(angular, "WP", j, false);
    join(&linear, &angular)
}

/// `inertia * acceleration - bias` through `DY`, named `E` (force) and `N` (moment).
pub(crate) fn reaction_wrench<S: Substitute>(
    symbols: &mut S,
    j: usize,
    inertia: &Matrix6<Expr>,
    bias: &Vector6<Expr>,
    acceleration: &Vector6<Expr>,
) -> Vector6<Expr> {
    let dy = symbols.substitute_matrix(inertia * acceleration, "DY", j, false);
    let (force, moment) = split(&(dy - bias));
    let force = symbols.substitute_matrix(force, "E", j, false);
    let moment = symbols.substitute_matrix(moment, "N", j, false);
    join(&force, &moment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{base::Base, link::Link};
    use approx::assert_abs_diff_eq;
    use mass_properties::{Inertia, MassProperties};
    use nalgebra::Vector3;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use spatial_algebra::SpatialInertia;
    use std::collections::HashMap;
    use symbolic::{eval_matrix, Symbol, Zero};

    /// 1 <- 0, 2 <- 4, 3 <- 1, 4 <- 1, 5 <- 3 with a prismatic link 2 and a fixed link 4.
    fn tree(base: Base) -> Robot {
        let mut robot =
            Robot::from_tables("tree", base, &[0, 4, 1, 1, 3], &[0, 1, 0, 2, 0]).unwrap();
        for j in 1..robot.num_links() {
            let geometry = &mut robot.links[j].geometry;
            geometry.alpha = Expr::symbol(&format!("AL{j}"));
            geometry.d = Expr::symbol(&format!("D{j}"));
            geometry.r = Expr::symbol(&format!("RL{j}"));
        }
        robot.links[4].geometry.gamma = Expr::symbol("GA4");
        robot.links[4].geometry.b = Expr::symbol("B4");
        robot.links[4].geometry.theta = Expr::symbol("TH4");
        robot
    }

    /// Values that keep every spatial inertia positive definite.
    fn random_inputs(
        symbols: impl IntoIterator<Item = Symbol>,
        rng: &mut SmallRng,
    ) -> HashMap<Symbol, f64> {
        symbols
            .into_iter()
            .map(|s| {
                let value = match s.name().trim_end_matches(|c: char| c.is_ascii_digit()) {
                    "M" => rng.random_range(1.0..2.0),
                    "XX" | "YY" | "ZZ" => rng.random_range(2.0..3.0),
                    "XY" | "XZ" | "YZ" | "MX" | "MY" | "MZ" => rng.random_range(-0.1..0.1),
                    "IA" => rng.random_range(0.0..0.5),
                    _ => rng.random_range(-1.0..1.0),
                };
                (s, value)
            })
            .collect()
    }

    fn table_for(robot: &Robot, algorithm: MultibodyAlgorithm) -> SymbolTable {
        let mut table = SymbolTable::new();
        table.reserve(robot.consumed_symbols(algorithm));
        table
    }

    fn assert_round_trip(robot: &Robot, seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut inputs = random_inputs(robot.input_symbols(), &mut rng);

        let mut inverse_table = table_for(robot, MultibodyAlgorithm::CompositeRigidBody);
        let inverse = inverse_dynamics(robot, &mut inverse_table).unwrap();
        let inverse_values = inverse_table.evaluate(&inputs).unwrap();
        for j in 1..robot.num_links() {
            if let Expr::Sym(torque) = &robot.links[j].torque {
                let value = inverse.torque[j].eval(&inverse_values).unwrap();
                inputs.insert(torque.clone(), value);
            }
        }

        let mut direct_table = table_for(robot, MultibodyAlgorithm::ArticulatedBody);
        let direct = direct_dynamics(robot, &mut direct_table).unwrap();
        let direct_values = direct_table.evaluate(&inputs).unwrap();
        for j in 1..robot.num_links() {
            let expected = robot.links[j].qddot.eval(&inputs).unwrap();
            let actual = direct.joint_acceleration[j].eval(&direct_values).unwrap();
            assert_abs_diff_eq!(actual, expected, epsilon = 1e-8);

            let f_inverse = eval_matrix(&inverse.reaction[j], &inverse_values).unwrap();
            let f_direct = eval_matrix(&direct.reaction[j], &direct_values).unwrap();
            assert_abs_diff_eq!(f_inverse, f_direct, epsilon = 1e-8);
        }
        for j in 0..robot.num_links() {
            let a_inverse = eval_matrix(&inverse.acceleration[j], &inverse_values).unwrap();
            let a_direct = eval_matrix(&direct.acceleration[j], &direct_values).unwrap();
            assert_abs_diff_eq!(a_inverse, a_direct, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_round_trip_fixed_base() {
        assert_round_trip(&tree(Base::fixed()), 42);
    }

    #[test]
    fn test_round_trip_floating_base() {
        assert_round_trip(&tree(Base::floating()), 43);
    }

    #[test]
    fn test_round_trip_serial_chain() {
        let robot = Robot::from_tables("rpr", Base::fixed(), &[0, 1, 2], &[0, 1, 0]).unwrap();
        assert_round_trip(&robot, 44);
    }

    #[test]
    fn test_round_trip_without_actuators_or_friction() {
        let mut robot = tree(Base::fixed());
        for link in robot.links.iter_mut().skip(1) {
            link.actuator_inertia = Expr::zero();
            link.friction = crate::joint::Friction::none();
        }
        assert_round_trip(&robot, 45);
    }

    #[test]
    fn test_composite_inertias_are_sums_of_transformed_inertias() {
        let robot = tree(Base::floating());
        let mut rng = SmallRng::seed_from_u64(5);
        let inputs = random_inputs(robot.input_symbols(), &mut rng);
        let mut table = table_for(&robot, MultibodyAlgorithm::CompositeRigidBody);
        let inverse = inverse_dynamics(&robot, &mut table).unwrap();
        let values = table.evaluate(&inputs).unwrap();

        let n = robot.num_links();
        let mut order = robot.validate().unwrap();
        let mut inertias = vec![Matrix6::<f64>::zeros(); n];
        let mut screws = vec![Matrix6::<f64>::identity(); n];
        for &j in &order {
            let inertia = SpatialInertia::from(&robot.links[j].mass_properties).matrix();
            inertias[j] = eval_matrix(&inertia, &inputs).unwrap();
            screws[j] = eval_matrix(&inverse.kinematics[j].screw, &values).unwrap();
        }

        // whole tree seen from the base: sum of X_k0^T I_k X_k0
        let mut from_base = vec![Matrix6::<f64>::identity(); n];
        let mut whole_tree = Matrix6::<f64>::zeros();
        for &j in &order {
            if let Some(parent) = robot.links[j].ant {
                from_base[j] = screws[j] * from_base[parent];
            }
            whole_tree += from_base[j].transpose() * inertias[j] * from_base[j];
        }

        // every subtree, children first
        order.reverse();
        let mut subtree = inertias.clone();
        for &j in &order {
            let actual = eval_matrix(&inverse.composite[j].as_ref().unwrap().inertia, &values).unwrap();
            assert_abs_diff_eq!(actual, subtree[j], epsilon = 1e-9);
            if let Some(parent) = robot.links[j].ant {
                let share = screws[j].transpose() * subtree[j] * screws[j];
                subtree[parent] += share;
            }
        }
        assert_abs_diff_eq!(subtree[0], whole_tree, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_joint_inertia_is_reported() {
        let mut robot = Robot::from_tables("massless", Base::fixed(), &[0, 1], &[0, 0]).unwrap();
        robot.links[2].mass_properties = MassProperties::zero();
        robot.links[2].actuator_inertia = Expr::zero();
        let result = equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody);
        assert!(matches!(
            result,
            Err(MultibodyErrors::SingularJointInertia { link: 2 })
        ));

        // an actuator alone keeps the joint solvable
        robot.links[2].actuator_inertia = Expr::symbol("IA2");
        assert!(equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody).is_ok());
    }

    #[test]
    fn test_articulated_inertias_match_numeric_recursion() {
        let robot = tree(Base::fixed());
        let mut rng = SmallRng::seed_from_u64(11);
        let inputs = random_inputs(robot.input_symbols(), &mut rng);
        let mut table = table_for(&robot, MultibodyAlgorithm::ArticulatedBody);
        let direct = direct_dynamics(&robot, &mut table).unwrap();
        let values = table.evaluate(&inputs).unwrap();
        assert!(direct.articulated[0].is_none());

        let mut order = robot.validate().unwrap();
        order.reverse();
        let mut star = vec![Matrix6::<f64>::zeros(); robot.num_links()];
        for &j in order.iter().filter(|&&j| j != 0) {
            let link = &robot.links[j];
            let inertia = SpatialInertia::from(&link.mass_properties).matrix();
            let mut total = eval_matrix(&inertia, &inputs).unwrap();
            for child in robot.children(j) {
                total += star[child];
            }
            let actual = eval_matrix(&direct.articulated[j].as_ref().unwrap().inertia, &values).unwrap();
            assert_abs_diff_eq!(actual, total, epsilon = 1e-9);
            assert_abs_diff_eq!(actual, actual.transpose(), epsilon = 1e-12);

            let reduced = if link.joint.is_fixed() {
                total
            } else {
                let a = eval_matrix(&direct.kinematics[j].motion_subspace, &values).unwrap();
                let ja = total * a;
                let h = a.dot(&ja) + link.actuator_inertia.eval(&inputs).unwrap();
                total - ja * ja.transpose() / h
            };
            let screw = eval_matrix(&direct.kinematics[j].screw, &values).unwrap();
            star[j] = screw.transpose() * reduced * screw;
        }
    }

    fn pendulum(mass: f64, offset: f64, inertia: f64) -> (Robot, HashMap<Symbol, f64>) {
        let gravity = Vector3::new(Expr::zero(), Expr::symbol("GY"), Expr::zero());
        let mut robot = Robot::from_tables("pendulum", Base::stationary(gravity), &[0], &[0]).unwrap();
        let link = &mut robot.links[1];
        link.mass_properties = MassProperties::new(
            Expr::num(mass),
            Vector3::new(Expr::num(mass * offset), Expr::zero(), Expr::zero()),
            Inertia::new(
                Expr::zero(),
                Expr::zero(),
                Expr::num(inertia + mass * offset * offset),
                Expr::zero(),
                Expr::zero(),
                Expr::zero(),
            )
            .unwrap(),
        )
        .unwrap();
        link.actuator_inertia = Expr::zero();
        link.friction = crate::joint::Friction::none();
        link.external = crate::link::ExternalWrench::zero();

        let inputs = HashMap::from([
            (Symbol::new("GY"), -9.81),
            (Symbol::new("q1"), 0.4),
            (Symbol::new("QP1"), 0.7),
            (Symbol::new("QDP1"), -1.2),
            (Symbol::new("GAM1"), 1.5),
        ]);
        (robot, inputs)
    }

    #[test]
    fn test_pendulum_closed_form() {
        let (m, d, i) = (2.0, 0.3, 0.1);
        let (robot, inputs) = pendulum(m, d, i);
        let gravity_torque = m * 9.81 * d * 0.4f64.cos();

        let table = equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody).unwrap();
        let values = table.evaluate(&inputs).unwrap();
        let expected = (1.5 - gravity_torque) / (i + m * d * d);
        assert_abs_diff_eq!(values["QDP1"], expected, epsilon = 1e-10);

        let table = equations_of_motion(&robot, MultibodyAlgorithm::CompositeRigidBody).unwrap();
        let values = table.evaluate(&inputs).unwrap();
        let expected = (i + m * d * d) * -1.2 + gravity_torque;
        assert_abs_diff_eq!(values["GAM1"], expected, epsilon = 1e-10);
    }

    fn free_body(mass_properties: MassProperties) -> Robot {
        let mut base = Base::floating();
        base.angular_velocity = Vector3::from_element(Expr::zero());
        let mut link = Link::base();
        link.mass_properties = mass_properties;
        link.external = crate::link::ExternalWrench::zero();
        Robot::new("free", base, vec![link]).unwrap()
    }

    #[test]
    fn test_unloaded_free_body_does_not_accelerate() {
        let robot = free_body(MassProperties::symbolic(0));
        let mut table = table_for(&robot, MultibodyAlgorithm::CompositeRigidBody);
        let inverse = inverse_dynamics(&robot, &mut table).unwrap();
        assert!(inverse.acceleration[0].iter().all(|e| e.is_zero()));

        let mut table = table_for(&robot, MultibodyAlgorithm::ArticulatedBody);
        let direct = direct_dynamics(&robot, &mut table).unwrap();
        assert!(direct.acceleration[0].iter().all(|e| e.is_zero()));
    }

    #[test]
    fn test_massless_free_body_is_singular() {
        let robot = free_body(MassProperties::zero());
        let result = equations_of_motion(&robot, MultibodyAlgorithm::CompositeRigidBody);
        assert!(matches!(
            result,
            Err(MultibodyErrors::SingularBaseInertia { column: 0 })
        ));
        let result = equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody);
        assert!(matches!(
            result,
            Err(MultibodyErrors::SingularBaseInertia { column: 0 })
        ));
    }

    #[test]
    fn test_fixed_joint_outputs_are_zero() {
        let robot = tree(Base::fixed());
        let table = equations_of_motion(&robot, MultibodyAlgorithm::CompositeRigidBody).unwrap();
        assert!(table.definition("GAM4").unwrap().is_zero());
        assert!(table.definition("GAM1").is_some());

        let table = equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody).unwrap();
        assert!(table.definition("QDP4").unwrap().is_zero());
        assert!(table.definition("QDP5").is_some());
    }

    #[test]
    fn test_invalid_tree_is_reported_before_any_equation() {
        let mut robot = tree(Base::fixed());
        robot.links[2].ant = Some(9);
        let result = equations_of_motion(&robot, MultibodyAlgorithm::ArticulatedBody);
        assert!(matches!(
            result,
            Err(MultibodyErrors::Model(crate::ModelErrors::DanglingParent { link: 2, parent: 9 }))
        ));
    }
}
