use crate::{robot::Robot, ModelErrors, MultibodyErrors};

/// Parent-before-child order of a validated robot.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalOrder {
    order: Vec<usize>,
    parents: Vec<Option<usize>>,
    floating: bool,
}

impl TraversalOrder {
    pub fn new(robot: &Robot) -> Result<Self, ModelErrors> {
        let order = robot.validate()?;
        Ok(Self {
            order,
            parents: robot.links.iter().map(|l| l.ant).collect(),
            floating: robot.base.is_floating(),
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn parent(&self, link: usize) -> Option<usize> {
        self.parents[link]
    }

    /// Base first, every parent before its children.
    pub fn pre_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }

    /// Every child before its parent, base last.
    pub fn post_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().rev().copied()
    }

    /// Pre-order without the base.
    pub fn links(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().skip(1).copied()
    }

    /// The accumulator `link` contributes to. A fixed base is never aggregated since
    /// its acceleration is prescribed.
    pub fn aggregation_target(&self, link: usize) -> Option<usize> {
        match self.parents[link] {
            Some(0) if !self.floating => None,
            parent => parent,
        }
    }

    /// Whether the base itself is aggregated and solved for.
    pub fn aggregates_base(&self) -> bool {
        self.floating
    }
}

/// Per-link running totals for a post-order sweep.
///
/// A link is seeded with its own quantities, receives one contribution from each
/// child and is then sealed. Sealed values never change: a late contribution or a
/// seal with children still outstanding is an [`MultibodyErrors::AggregationOrder`].
#[derive(Debug)]
pub struct Accumulator<T> {
    open: Vec<Option<T>>,
    sealed: Vec<Option<T>>,
    contributed: Vec<bool>,
    targets: Vec<Option<usize>>,
}

impl<T> Accumulator<T> {
    pub fn new(order: &TraversalOrder, seeds: Vec<T>) -> Self {
        let n = seeds.len();
        Self {
            open: seeds.into_iter().map(Some).collect(),
            sealed: (0..n).map(|_| None).collect(),
            contributed: vec![false; n],
            targets: (0..n).map(|j| order.aggregation_target(j)).collect(),
        }
    }

    /// Adds `link`'s share into `parent`'s running total.
    pub fn contribute(
        &mut self,
        link: usize,
        parent: usize,
        add: impl FnOnce(&mut T),
    ) -> Result<(), MultibodyErrors> {
        let order_error = MultibodyErrors::AggregationOrder { link, parent };
        if self.contributed[link] || self.targets[link] != Some(parent) {
            return Err(order_error);
        }
        let total = self.open[parent].as_mut().ok_or(order_error)?;
        add(total);
        self.contributed[link] = true;
        Ok(())
    }

    /// Closes `link`'s total, letting `finish` name it, and returns the sealed value.
    pub fn seal(&mut self, link: usize, finish: impl FnOnce(T) -> T) -> Result<&T, MultibodyErrors> {
        if let Some(child) =
            (0..self.targets.len()).find(|&c| self.targets[c] == Some(link) && !self.contributed[c])
        {
            return Err(MultibodyErrors::AggregationOrder {
                link: child,
                parent: link,
            });
        }
        let total = self.open[link]
            .take()
            .ok_or(MultibodyErrors::AggregationOrder { link, parent: link })?;
        Ok(self.sealed[link].insert(finish(total)))
    }

    pub fn sealed(&self, link: usize) -> Option<&T> {
        self.sealed[link].as_ref()
    }

    pub fn into_sealed(self) -> Vec<Option<T>> {
        self.sealed
    }
}
