use nalgebra::Vector3;
use symbolic::{Expr, Zero};

#[derive(Debug, Clone, PartialEq)]
pub enum BaseMotion {
    /// Base acceleration is prescribed.
    Fixed {
        linear_acceleration: Vector3<Expr>,
        angular_acceleration: Vector3<Expr>,
    },
    /// Base acceleration is solved for from the aggregated tree.
    Floating,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub motion: BaseMotion,
    pub gravity: Vector3<Expr>,
    pub angular_velocity: Vector3<Expr>,
}

fn symbols(names: [&str; 3]) -> Vector3<Expr> {
    Vector3::new(
        Expr::symbol(names[0]),
        Expr::symbol(names[1]),
        Expr::symbol(names[2]),
    )
}

impl Base {
    /// `GX GY GZ` gravity, `VDX0..` / `WDX0..` prescribed acceleration and `WX0..` angular velocity.
    pub fn fixed() -> Self {
        Self {
            motion: BaseMotion::Fixed {
                linear_acceleration: symbols(["VDX0", "VDY0", "VDZ0"]),
                angular_acceleration: symbols(["WDX0", "WDY0", "WDZ0"]),
            },
            gravity: symbols(["GX", "GY", "GZ"]),
            angular_velocity: symbols(["WX0", "WY0", "WZ0"]),
        }
    }

    pub fn floating() -> Self {
        Self {
            motion: BaseMotion::Floating,
            gravity: symbols(["GX", "GY", "GZ"]),
            angular_velocity: symbols(["WX0", "WY0", "WZ0"]),
        }
    }

    /// Fixed, motionless base under gravity `g`.
    pub fn stationary(gravity: Vector3<Expr>) -> Self {
        Self {
            motion: BaseMotion::Fixed {
                linear_acceleration: Vector3::from_element(Expr::zero()),
                angular_acceleration: Vector3::from_element(Expr::zero()),
            },
            gravity,
            angular_velocity: Vector3::from_element(Expr::zero()),
        }
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.motion, BaseMotion::Floating)
    }
}
