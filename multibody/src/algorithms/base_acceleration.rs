use crate::{
    base::{Base, BaseMotion},
    MultibodyErrors,
};
use nalgebra::{Matrix6, Vector6};
use spatial_algebra::join;
use symbolic::{Expr, Substitute, Zero};

/// Prescribed apparent base acceleration `[vdot0 - g; wdot0]`, or `None` for a floating base.
pub fn prescribed_base_acceleration(base: &Base) -> Option<Vector6<Expr>> {
    match &base.motion {
        BaseMotion::Fixed {
            linear_acceleration,
            angular_acceleration,
        } => Some(join(&(linear_acceleration - &base.gravity), angular_acceleration)),
        BaseMotion::Floating => None,
    }
}

/// Solves `inertia * x = bias` by Gaussian elimination over symbolic entries.
///
/// Pivots are picked among structurally non-zero entries, preferring the diagonal.
/// Eliminated entries are named `BS`, pivot reciprocals `PV` and the unknowns `BX`.
pub fn solve_base_acceleration<S: Substitute>(
    symbols: &mut S,
    inertia: &Matrix6<Expr>,
    bias: &Vector6<Expr>,
) -> Result<Vector6<Expr>, MultibodyErrors> {
    let mut a = inertia.clone();
    let mut b = bias.clone();
    let mut pivots: Vec<Expr> = Vec::with_capacity(6);

    for k in 0..6 {
        let row = (k..6)
            .find(|&r| !a[(r, k)].is_zero())
            .ok_or(MultibodyErrors::SingularBaseInertia { column: k })?;
        if row != k {
            tracing::warn!(column = k, row, "zero pivot in base inertia, swapping rows");
            a.swap_rows(k, row);
            b.swap_rows(k, row);
        }
        let pivot = symbols.substitute_scalar(a[(k, k)].clone().recip(), "PV", k + 1, false);

        for i in (k + 1)..6 {
            if a[(i, k)].is_zero() {
                continue;
            }
            let factor = a[(i, k)].clone() * pivot.clone();
            for c in (k + 1)..6 {
                let entry = a[(i, c)].clone() - factor.clone() * a[(k, c)].clone();
                a[(i, c)] = symbols.substitute_scalar(entry, &format!("BS{}{}", i + 1, c + 1), k + 1, false);
            }
            let entry = b[i].clone() - factor * b[k].clone();
            b[i] = symbols.substitute_scalar(entry, &format!("BS{}", i + 1), k + 1, false);
            a[(i, k)] = Expr::zero();
        }
        pivots.push(pivot);
    }

    let mut x = Vector6::from_element(Expr::zero());
    for k in (0..6).rev() {
        let mut rhs = b[k].clone();
        for c in (k + 1)..6 {
            rhs -= a[(k, c)].clone() * x[c].clone();
        }
        x[k] = symbols.substitute_scalar(rhs * pivots[k].clone(), "BX", k + 1, false);
    }
    Ok(x)
}
