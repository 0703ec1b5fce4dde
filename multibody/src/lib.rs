pub mod algorithms;
pub mod base;
pub mod bias;
pub mod joint;
pub mod kinematics;
pub mod link;
pub mod robot;

pub use algorithms::{
    articulated_body_algorithm::{direct_dynamics, ArticulatedLink, DirectDynamics},
    composite_rigid_body::{inverse_dynamics, CompositeLink, InverseDynamics},
    equations_of_motion, MultibodyAlgorithm,
};
pub use base::{Base, BaseMotion};
pub use joint::{Friction, JointKind};
pub use link::{ExternalWrench, Link};
pub use robot::{
    builder::{Param, RobotBuilder},
    Robot,
};

use mass_properties::MassPropertiesErrors;
use symbolic::SymbolicErrors;
use thiserror::Error;

/// Problems with the tree itself. Always reported before any recursion starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelErrors {
    #[error("robot has no links")]
    Empty,
    #[error("link 0 is the base and cannot have a parent")]
    BaseHasParent,
    #[error("link {0} does not have a parent")]
    MissingParent(usize),
    #[error("link {link} has parent {parent} which does not exist")]
    DanglingParent { link: usize, parent: usize },
    #[error("link {0} is part of a cycle and cannot be reached from the base")]
    Cycle(usize),
    #[error("link {link} has joint kind {sigma}, expected 0 (revolute), 1 (prismatic) or 2 (fixed)")]
    UnsupportedJointKind { link: usize, sigma: u8 },
    #[error("link {0} has negative mass")]
    NegativeMass(usize),
    #[error("ant table has {ant} entries but sigma table has {sigma}")]
    TableLength { ant: usize, sigma: usize },
}

#[derive(Debug, Error)]
pub enum MultibodyErrors {
    #[error("links {link} and {parent} were aggregated out of order")]
    AggregationOrder { link: usize, parent: usize },
    #[error("{0}")]
    MassProperties(#[from] MassPropertiesErrors),
    #[error("{0}")]
    Model(#[from] ModelErrors),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Ron(#[from] ron::Error),
    #[error("{0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("base inertia is singular, no non-zero pivot for column {column}")]
    SingularBaseInertia { column: usize },
    #[error("link {link} has zero effective joint inertia")]
    SingularJointInertia { link: usize },
    #[error("{0}")]
    Symbolic(#[from] SymbolicErrors),
}
