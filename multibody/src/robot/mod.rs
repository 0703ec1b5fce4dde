pub mod builder;

use crate::{
    algorithms::MultibodyAlgorithm,
    base::{Base, BaseMotion},
    joint::JointKind,
    link::Link,
    ModelErrors,
};
use std::{
    cmp::Reverse,
    collections::{BTreeSet, BinaryHeap},
};
use symbolic::Symbol;

/// A kinematic tree. `links[0]` is the base link, every other link names its parent in `ant`.
#[derive(Debug, Clone, PartialEq)]
pub struct Robot {
    pub name: String,
    pub base: Base,
    pub links: Vec<Link>,
}

impl Robot {
    pub fn new(name: &str, base: Base, links: Vec<Link>) -> Result<Self, ModelErrors> {
        let robot = Self {
            name: name.to_string(),
            base,
            links,
        };
        robot.validate()?;
        Ok(robot)
    }

    /// Fully symbolic robot from the parent table `ant` and joint-kind table `sigma`.
    /// Entry `k` of both tables describes link `k + 1`; parents refer to link indices
    /// with 0 being the base.
    pub fn from_tables(
        name: &str,
        base: Base,
        ant: &[usize],
        sigma: &[u8],
    ) -> Result<Self, ModelErrors> {
        if ant.len() != sigma.len() {
            return Err(ModelErrors::TableLength {
                ant: ant.len(),
                sigma: sigma.len(),
            });
        }
        let mut links = vec![Link::base()];
        for (k, (&parent, &s)) in ant.iter().zip(sigma).enumerate() {
            let j = k + 1;
            let joint = JointKind::try_from(s)
                .map_err(|e| ModelErrors::UnsupportedJointKind { link: j, sigma: e.0 })?;
            links.push(Link::symbolic(j, parent, joint));
        }
        Self::new(name, base, links)
    }

    /// Number of links including the base.
    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn children(&self, link: usize) -> impl Iterator<Item = usize> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(move |(_, l)| l.ant == Some(link))
            .map(|(j, _)| j)
    }

    /// Checks the tree and returns an order where every parent precedes its children.
    ///
    /// Among the links whose parent is already placed the lowest index goes first,
    /// so a robot numbered parent-before-child keeps its index order.
    pub fn validate(&self) -> Result<Vec<usize>, ModelErrors> {
        let n = self.links.len();
        if n == 0 {
            return Err(ModelErrors::Empty);
        }
        if self.links[0].ant.is_some() {
            return Err(ModelErrors::BaseHasParent);
        }

        let mut children = vec![Vec::new(); n];
        for (j, link) in self.links.iter().enumerate().skip(1) {
            match link.ant {
                None => return Err(ModelErrors::MissingParent(j)),
                Some(parent) if parent >= n => {
                    return Err(ModelErrors::DanglingParent { link: j, parent });
                }
                Some(parent) => children[parent].push(j),
            }
        }
        // the base counts too, its mass is aggregated for a floating base
        if let Some(j) = self
            .links
            .iter()
            .position(|link| link.mass_properties.mass.as_number().is_some_and(|m| m < 0.0))
        {
            return Err(ModelErrors::NegativeMass(j));
        }

        let mut order = Vec::with_capacity(n);
        let mut ready = BinaryHeap::from([Reverse(0)]);
        while let Some(Reverse(j)) = ready.pop() {
            order.push(j);
            ready.extend(children[j].iter().map(|&c| Reverse(c)));
        }

        if order.len() < n {
            let mut placed = vec![false; n];
            order.iter().for_each(|&j| placed[j] = true);
            if let Some(j) = placed.iter().position(|p| !p) {
                return Err(ModelErrors::Cycle(j));
            }
        }
        Ok(order)
    }

    /// Every symbol the model refers to, joint accelerations and torques included.
    pub fn input_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = self.consumed_symbols(MultibodyAlgorithm::CompositeRigidBody);
        for link in &self.links {
            symbols.extend(link.torque.free_symbols());
        }
        symbols
    }

    /// Symbols one of the recursions reads. Joint accelerations are inputs of the
    /// composite path only and torques of the articulated path only.
    pub fn consumed_symbols(&self, algorithm: MultibodyAlgorithm) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        let base = &self.base;
        let mut vectors = vec![&base.gravity, &base.angular_velocity];
        if let BaseMotion::Fixed {
            linear_acceleration,
            angular_acceleration,
        } = &base.motion
        {
            vectors.push(linear_acceleration);
            vectors.push(angular_acceleration);
        }
        vectors
            .into_iter()
            .flat_map(|v| v.iter())
            .for_each(|e| symbols.extend(e.free_symbols()));

        for link in &self.links {
            link.parameter_symbols(&mut symbols);
            let output_side = match algorithm {
                MultibodyAlgorithm::CompositeRigidBody => &link.qddot,
                MultibodyAlgorithm::ArticulatedBody => &link.torque,
            };
            symbols.extend(output_side.free_symbols());
        }
        symbols
    }
}
