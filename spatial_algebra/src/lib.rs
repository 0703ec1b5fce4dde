//! Spatial (6D) algebra over symbolic scalars.
//!
//! Spatial vectors are ordered `[linear; angular]` for both motions and forces.

use mass_properties::MassProperties;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use symbolic::{Expr, Zero};
use transforms::Transform;

/// `skew(v) * u == v.cross(u)`
pub fn skew(v: &Vector3<Expr>) -> Matrix3<Expr> {
    let o = Expr::zero();
    Matrix3::new(
        o.clone(),
        -v[2].clone(),
        v[1].clone(),
        v[2].clone(),
        o.clone(),
        -v[0].clone(),
        -v[1].clone(),
        v[0].clone(),
        o,
    )
}

pub fn cross(a: &Vector3<Expr>, b: &Vector3<Expr>) -> Vector3<Expr> {
    skew(a) * b
}

/// Stacks the 3x3 blocks `[[a, b], [c, d]]`.
pub fn from_blocks(
    a: &Matrix3<Expr>,
    b: &Matrix3<Expr>,
    c: &Matrix3<Expr>,
    d: &Matrix3<Expr>,
) -> Matrix6<Expr> {
    Matrix6::from_fn(|r, col| match (r < 3, col < 3) {
        (true, true) => a[(r, col)].clone(),
        (true, false) => b[(r, col - 3)].clone(),
        (false, true) => c[(r - 3, col)].clone(),
        (false, false) => d[(r - 3, col - 3)].clone(),
    })
}

pub fn join(linear: &Vector3<Expr>, angular: &Vector3<Expr>) -> Vector6<Expr> {
    Vector6::from_fn(|r, _| {
        if r < 3 {
            linear[r].clone()
        } else {
            angular[r - 3].clone()
        }
    })
}

/// Returns `(linear, angular)`.
pub fn split(v: &Vector6<Expr>) -> (Vector3<Expr>, Vector3<Expr>) {
    (
        Vector3::from_fn(|r, _| v[r].clone()),
        Vector3::from_fn(|r, _| v[r + 3].clone()),
    )
}

/// `[[M 1, skew(MS)^T], [skew(MS), J]]`
pub fn build_spatial_inertia(
    inertia: &Matrix3<Expr>,
    first_moment: &Vector3<Expr>,
    mass: &Expr,
) -> Matrix6<Expr> {
    let ms = skew(first_moment);
    let m = Matrix3::from_fn(|r, c| if r == c { mass.clone() } else { Expr::zero() });
    from_blocks(&m, &ms.transpose(), &ms, inertia)
}

/// Inertial parameters of a rigid body (or an aggregate of bodies) expressed at a frame origin.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialInertia {
    pub mass: Expr,
    pub first_moment: Vector3<Expr>,
    pub inertia: Matrix3<Expr>,
}

impl SpatialInertia {
    pub fn matrix(&self) -> Matrix6<Expr> {
        build_spatial_inertia(&self.inertia, &self.first_moment, &self.mass)
    }
}

impl From<&MassProperties> for SpatialInertia {
    fn from(mp: &MassProperties) -> Self {
        Self {
            mass: mp.mass.clone(),
            first_moment: mp.first_moment.clone(),
            inertia: mp.inertia.matrix(),
        }
    }
}

// wraps Transform so the screw form lives next to the rest of the spatial algebra
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialTransform(pub Transform);

impl SpatialTransform {
    /// Screw transform `child_from_parent` for the pair `parent_from_child = (R, P)`:
    /// `[[R^T, -R^T skew(P)], [0, R^T]]`.
    ///
    /// Its transpose carries child forces (and inertias, as `X^T I X`) back to the parent.
    pub fn matrix(&self) -> Matrix6<Expr> {
        // child_from_parent is (R^T, -R^T P) and -R^T skew(P) = skew(-R^T P) R^T
        let child = self.0.inv();
        let coupling = skew(&child.translation) * &child.rotation;
        let zero = Matrix3::from_element(Expr::zero());
        from_blocks(&child.rotation, &coupling, &zero, &child.rotation)
    }
}

impl From<Transform> for SpatialTransform {
    fn from(value: Transform) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;
    use symbolic::{eval_matrix, Symbol};

    fn symbols(names: &[&str]) -> Vector3<Expr> {
        Vector3::from_fn(|r, _| Expr::symbol(names[r]))
    }

    #[test]
    fn test_skew_is_cross() {
        let a = symbols(&["a1", "a2", "a3"]);
        let b = symbols(&["b1", "b2", "b3"]);
        let env = HashMap::from([
            (Symbol::new("a1"), 1.0),
            (Symbol::new("a2"), -2.0),
            (Symbol::new("a3"), 0.5),
            (Symbol::new("b1"), 3.0),
            (Symbol::new("b2"), 0.25),
            (Symbol::new("b3"), -1.0),
        ]);
        let out = eval_matrix(&cross(&a, &b), &env).unwrap();
        let expected = Vector3::new(1.0, -2.0, 0.5).cross(&Vector3::new(3.0, 0.25, -1.0));
        assert_abs_diff_eq!(out, expected, epsilon = 1e-12);
        assert!(cross(&a, &a).iter().all(|e| e.is_zero()));
    }

    #[test]
    fn test_spatial_inertia_blocks() {
        let mp = MassProperties::symbolic(2);
        let i = SpatialInertia::from(&mp).matrix();
        assert_eq!(i[(0, 0)], Expr::symbol("M2"));
        assert!(i[(0, 1)].is_zero());
        assert_eq!(i[(4, 0)], Expr::symbol("MZ2"));
        assert_eq!(i[(0, 4)], Expr::symbol("MZ2"));
        assert_eq!(i[(3, 1)], -Expr::symbol("MZ2"));
        assert_eq!(i[(5, 4)], Expr::symbol("YZ2"));
        assert_eq!(i, i.transpose());
    }

    #[test]
    fn test_spatial_inertia_of_point_mass() {
        // point mass m at c: f = m (a + wd x c)
        let i = build_spatial_inertia(
            &Matrix3::from_element(Expr::zero()),
            &Vector3::new(Expr::from(2.0), Expr::zero(), Expr::zero()),
            &Expr::from(2.0),
        );
        let env = HashMap::new();
        let i = eval_matrix(&i, &env).unwrap();
        let accel = Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let f = i * accel;
        assert_abs_diff_eq!(f, Vector6::new(0.0, 2.0, 0.0, 0.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_split_join() {
        let v = join(&symbols(&["x", "y", "z"]), &symbols(&["u", "v", "w"]));
        assert_eq!(v[4], Expr::symbol("v"));
        let (l, a) = split(&v);
        assert_eq!(l[2], Expr::symbol("z"));
        assert_eq!(a[0], Expr::symbol("u"));
    }

    #[test]
    fn test_screw_transform_inverse() {
        let angle = 0.6f64;
        let transform = Transform::rot_x(Expr::from(angle.sin()), Expr::from(angle.cos()))
            * Transform::trans_x(Expr::from(0.3))
            * Transform::rot_z(Expr::from((2.0 * angle).sin()), Expr::from((2.0 * angle).cos()))
            * Transform::trans_z(Expr::from(-0.7));
        let x = SpatialTransform::from(transform.clone()).matrix();
        let x_inv = SpatialTransform::from(transform.inv()).matrix();
        let env = HashMap::new();
        let product = eval_matrix(&(x * x_inv), &env).unwrap();
        assert_abs_diff_eq!(product, Matrix6::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_screw_transform_moves_velocity() {
        // child frame offset by p along x, same orientation: v_child = v + w x p
        let transform = Transform::trans_x(Expr::symbol("p"));
        let x = SpatialTransform::from(transform).matrix();
        let v = join(&symbols(&["vx", "vy", "vz"]), &symbols(&["wx", "wy", "wz"]));
        let (linear, angular) = split(&(x * v));
        assert_eq!(linear[1], Expr::symbol("vy") + Expr::symbol("p") * Expr::symbol("wz"));
        assert_eq!(linear[2], Expr::symbol("vz") - Expr::symbol("p") * Expr::symbol("wy"));
        assert_eq!(angular[0], Expr::symbol("wx"));
    }
}
