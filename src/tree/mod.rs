//! Barnes-Hut quadtree: spatial decomposition, mass aggregation, and multipole force evaluation.
//!
//! Nodes live in a flat arena (`Vec<Node>`) addressed by [`NodeId`], rather than as an owning
//! tree of `Box`ed children with a non-owning parent back-pointer. This sidesteps the
//! back-reference entirely: there is no `Node::is_root` to get wrong, because [`reset`] and
//! [`clear_statistics`] are operations on the whole [`Quadtree`], not methods one could
//! accidentally call on an interior node.
//!
//! [`reset`]: Quadtree::reset
//! [`clear_statistics`]: Quadtree::clear_statistics

mod bbox;

pub use bbox::{BoundingBox, Quadrant};

use crate::error::{Error, Result};
use crate::particle::{ParticleParameters, ParticleState};
use crate::vector::Vector2;
use std::sync::atomic::{AtomicBool, Ordering};

/// Index of a node within a [`Quadtree`]'s arena. The root is always `0`.
pub type NodeId = usize;

struct Node {
    bbox: BoundingBox,
    children: [Option<NodeId>; 4],
    /// Index into the particle slice. Valid only while `count == 1`.
    resident: Option<usize>,
    mass: f64,
    mass_center: Vector2,
    count: u32,
    /// Whether the last force query subdivided this node. Read by the renderer; written under a
    /// logically `&self` query, hence the atomic rather than a plain `bool`.
    subdivided: AtomicBool,
}

impl Node {
    fn new(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            children: [None; 4],
            resident: None,
            mass: 0.0,
            mass_center: Vector2::ZERO,
            count: 0,
            subdivided: AtomicBool::new(false),
        }
    }
}

/// A Barnes-Hut quadtree over 2D point masses.
///
/// One instance is created per simulation and [`reset`](Quadtree::reset) at the start of every
/// derivative evaluation; particles are re-inserted from scratch rather than the tree being
/// incrementally updated across time steps.
pub struct Quadtree {
    nodes: Vec<Node>,
    theta: f64,
    softening_sq: f64,
    g: f64,
    /// Particles whose position exactly coincides with an already-placed leaf. Contribute to
    /// forces by direct summation outside the tree, which is what keeps [`insert`](Self::insert)
    /// from recursing forever on duplicate positions.
    coincident: Vec<usize>,
}

impl Quadtree {
    /// Default opening angle for the 2D tree.
    pub const DEFAULT_THETA: f64 = 1.0;

    /// Default Plummer softening squared.
    pub const DEFAULT_SOFTENING_SQ: f64 = 0.01;

    /// Creates a new tree rooted at `[min, max]`.
    pub fn new(min: Vector2, max: Vector2, theta: f64, softening_sq: f64, g: f64) -> Self {
        Self {
            nodes: vec![Node::new(BoundingBox::new(min, max))],
            theta,
            softening_sq,
            g,
            coincident: Vec::new(),
        }
    }

    /// Frees every node, resets the root to `[min, max]`, and clears the coincident side-list.
    ///
    /// Called at the start of every derivative evaluation, i.e. multiple times per integrator
    /// step.
    pub fn reset(&mut self, min: Vector2, max: Vector2) {
        self.nodes.clear();
        self.nodes.push(Node::new(BoundingBox::new(min, max)));
        self.coincident.clear();
    }

    /// Opening angle used to decide whether a node's mass distribution may be approximated as a
    /// single point mass.
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Sets the opening angle; live-tunable by the driver.
    pub fn set_theta(&mut self, theta: f64) {
        self.theta = theta;
    }

    /// Root bounding box.
    pub fn bounds(&self) -> BoundingBox {
        self.nodes[0].bbox
    }

    /// Mass-weighted center of the whole point-mass distribution, valid after
    /// [`compute_mass_distribution`](Self::compute_mass_distribution).
    pub fn mass_center(&self) -> Vector2 {
        self.nodes[0].mass_center
    }

    /// Total mass, valid after [`compute_mass_distribution`](Self::compute_mass_distribution).
    pub fn total_mass(&self) -> f64 {
        self.nodes[0].mass
    }

    /// Number of `insert` calls that descended through the root, i.e. the number of particles
    /// accepted into the tree so far.
    pub fn particle_count(&self) -> u32 {
        self.nodes[0].count
    }

    /// Number of particles on the coincident side-list.
    pub fn coincident_count(&self) -> usize {
        self.coincident.len()
    }

    /// Whether the force query that last ran opened (recursed into the children of) `node`.
    pub fn is_subdivided(&self, node: NodeId) -> bool {
        self.nodes[node].subdivided.load(Ordering::Relaxed)
    }

    /// Bounding box of `node`.
    pub fn node_bounds(&self, node: NodeId) -> BoundingBox {
        self.nodes[node].bbox
    }

    /// Children of `node`, for traversal by a renderer.
    pub fn node_children(&self, node: NodeId) -> [Option<NodeId>; 4] {
        self.nodes[node].children
    }

    /// Inserts the particle at `index` of `particles` into the tree.
    ///
    /// Fails if the particle's position lies outside the root's bounding box; the caller (the
    /// model) is expected to drop the particle for this step rather than propagate the error.
    pub fn insert(&mut self, particles: &[ParticleState], index: usize) -> Result<()> {
        let position = particles[index].position;
        let root_bbox = self.nodes[0].bbox;
        if !root_bbox.contains(position) {
            return Err(Error::OutOfBounds {
                position,
                min: root_bbox.min(),
                max: root_bbox.max(),
            });
        }

        self.insert_at(0, particles, index);
        Ok(())
    }

    fn insert_at(&mut self, node: NodeId, particles: &[ParticleState], index: usize) {
        match self.nodes[node].count {
            0 => {
                self.nodes[node].resident = Some(index);
            }
            1 => {
                let resident = self.nodes[node].resident.expect("leaf without a resident");
                let resident_position = particles[resident].position;
                let position = particles[index].position;

                if resident_position == position {
                    self.coincident.push(index);
                } else {
                    self.nodes[node].resident = None;
                    let bbox = self.nodes[node].bbox;

                    let resident_quadrant = bbox.quadrant(resident_position);
                    let resident_child = self.child_or_create(node, resident_quadrant);
                    self.insert_at(resident_child, particles, resident);

                    let quadrant = bbox.quadrant(position);
                    let child = self.child_or_create(node, quadrant);
                    self.insert_at(child, particles, index);
                }
            }
            _ => {
                let bbox = self.nodes[node].bbox;
                let quadrant = bbox.quadrant(particles[index].position);
                let child = self.child_or_create(node, quadrant);
                self.insert_at(child, particles, index);
            }
        }

        self.nodes[node].count += 1;
    }

    fn child_or_create(&mut self, node: NodeId, quadrant: Quadrant) -> NodeId {
        let slot = quadrant.index();
        if let Some(child) = self.nodes[node].children[slot] {
            return child;
        }

        let bbox = self.nodes[node].bbox.child(quadrant);
        let id = self.nodes.len();
        self.nodes.push(Node::new(bbox));
        self.nodes[node].children[slot] = Some(id);
        id
    }

    /// Post-order recursion that aggregates each internal node's mass and mass-weighted center
    /// from its children. Must run after every batch of [`insert`](Self::insert) calls and
    /// before [`calculate_force`](Self::calculate_force).
    pub fn compute_mass_distribution(
        &mut self,
        particles: &[ParticleState],
        parameters: &[ParticleParameters],
    ) {
        self.compute_mass_distribution_at(0, particles, parameters);
    }

    fn compute_mass_distribution_at(
        &mut self,
        node: NodeId,
        particles: &[ParticleState],
        parameters: &[ParticleParameters],
    ) {
        match self.nodes[node].count {
            0 => {}
            1 => {
                let resident = self.nodes[node].resident.expect("leaf without a resident");
                self.nodes[node].mass = parameters[resident].mass;
                self.nodes[node].mass_center = particles[resident].position;
            }
            _ => {
                let children = self.nodes[node].children;
                let mut mass = 0.0;
                let mut mass_center = Vector2::ZERO;

                for child in children.into_iter().flatten() {
                    self.compute_mass_distribution_at(child, particles, parameters);
                    let child_mass = self.nodes[child].mass;
                    mass += child_mass;
                    mass_center += self.nodes[child].mass_center * child_mass;
                }

                if mass > 0.0 {
                    mass_center /= mass;
                }

                self.nodes[node].mass = mass;
                self.nodes[node].mass_center = mass_center;
            }
        }
    }

    /// Clears every node's `subdivided` flag.
    ///
    /// Called once per physical step (not per integrator stage) so that a renderer observes the
    /// cells opened for the final stage's particle-0 query.
    pub fn clear_statistics(&self) {
        for node in &self.nodes {
            node.subdivided.store(false, Ordering::Relaxed);
        }
    }

    /// Acceleration on the particle at `target` from the whole mass distribution: the tree
    /// approximation plus the direct contribution of every coincident particle.
    pub fn calculate_force(
        &self,
        target: usize,
        particles: &[ParticleState],
        parameters: &[ParticleParameters],
    ) -> Vector2 {
        let mut acceleration = self.tree_force_at(0, target, particles, parameters);

        for &source in &self.coincident {
            acceleration += self.direct_acceleration(target, source, particles, parameters);
        }

        acceleration
    }

    fn tree_force_at(
        &self,
        node: NodeId,
        target: usize,
        particles: &[ParticleState],
        parameters: &[ParticleParameters],
    ) -> Vector2 {
        match self.nodes[node].count {
            0 => Vector2::ZERO,
            1 => {
                let resident = self.nodes[node].resident.expect("leaf without a resident");
                self.direct_acceleration(target, resident, particles, parameters)
            }
            _ => {
                let position = particles[target].position;
                let mass_center = self.nodes[node].mass_center;
                let r = (position - mass_center).length();
                let d = self.nodes[node].bbox.width();

                if d / r <= self.theta {
                    self.nodes[node].subdivided.store(false, Ordering::Relaxed);
                    point_mass_acceleration(self.g, position, mass_center, self.nodes[node].mass)
                } else {
                    self.nodes[node].subdivided.store(true, Ordering::Relaxed);
                    self.nodes[node]
                        .children
                        .into_iter()
                        .flatten()
                        .fold(Vector2::ZERO, |acceleration, child| {
                            acceleration + self.tree_force_at(child, target, particles, parameters)
                        })
                }
            }
        }
    }

    fn direct_acceleration(
        &self,
        target: usize,
        source: usize,
        particles: &[ParticleState],
        parameters: &[ParticleParameters],
    ) -> Vector2 {
        if target == source {
            return Vector2::ZERO;
        }

        let delta = particles[source].position - particles[target].position;
        let r = (delta.length_squared() + self.softening_sq).sqrt();
        if r > 0.0 {
            delta * (self.g * parameters[source].mass / (r * r * r))
        } else {
            Vector2::ZERO
        }
    }
}

/// Treats `mass` as a single point mass at `mass_center` and returns its (unsoftened)
/// acceleration on a body at `position`.
fn point_mass_acceleration(g: f64, position: Vector2, mass_center: Vector2, mass: f64) -> Vector2 {
    let delta = mass_center - position;
    let r = delta.length();
    if r > 0.0 {
        delta * (g * mass / (r * r * r))
    } else {
        Vector2::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: f64 = 1.0;

    fn particle(x: f64, y: f64, mass: f64) -> (ParticleState, ParticleParameters) {
        (
            ParticleState::new(Vector2::new(x, y), Vector2::ZERO),
            ParticleParameters::new(mass, 0.0),
        )
    }

    fn build_tree(
        bodies: &[(ParticleState, ParticleParameters)],
        theta: f64,
        softening_sq: f64,
    ) -> (Quadtree, Vec<ParticleState>, Vec<ParticleParameters>) {
        let states: Vec<_> = bodies.iter().map(|(s, _)| *s).collect();
        let params: Vec<_> = bodies.iter().map(|(_, p)| *p).collect();

        let mut tree = Quadtree::new(Vector2::new(-100.0, -100.0), Vector2::new(100.0, 100.0), theta, softening_sq, G);
        for i in 0..states.len() {
            tree.insert(&states, i).unwrap();
        }
        tree.compute_mass_distribution(&states, &params);

        (tree, states, params)
    }

    #[test]
    fn mass_distribution_matches_weighted_average() {
        let bodies = vec![
            particle(1.0, 1.0, 2.0),
            particle(-1.0, 1.0, 3.0),
            particle(-1.0, -1.0, 1.0),
            particle(1.0, -1.0, 4.0),
        ];
        let (tree, _, _) = build_tree(&bodies, 1.0, 0.0);

        let total_mass: f64 = bodies.iter().map(|(_, p)| p.mass).sum();
        assert!((tree.total_mass() - total_mass).abs() < 1e-9);

        let expected_center = bodies
            .iter()
            .fold(Vector2::ZERO, |acc, (s, p)| acc + s.position * p.mass)
            / total_mass;
        assert!((tree.mass_center() - expected_center).length() < 1e-9);
    }

    #[test]
    fn root_particle_count_matches_successful_inserts() {
        let bodies = vec![particle(1.0, 1.0, 1.0), particle(-1.0, -1.0, 1.0), particle(5.0, 5.0, 1.0)];
        let (tree, _, _) = build_tree(&bodies, 1.0, 0.0);
        assert_eq!(tree.particle_count(), 3);
    }

    #[test]
    fn coincident_particles_do_not_recurse_forever() {
        let bodies = vec![particle(1.0, 1.0, 2.0), particle(1.0, 1.0, 3.0), particle(1.0, 1.0, 5.0)];
        let (tree, _, _) = build_tree(&bodies, 1.0, 0.0);

        assert_eq!(tree.particle_count(), 3);
        assert_eq!(tree.coincident_count(), 2);
    }

    #[test]
    fn coincident_pair_force_is_zero_with_softening() {
        let bodies = vec![particle(2.0, 2.0, 4.0), particle(2.0, 2.0, 6.0)];
        let (tree, states, params) = build_tree(&bodies, 1.0, 0.01);

        let force = tree.calculate_force(0, &states, &params);
        assert!(force.length() < 1e-12);
    }

    #[test]
    fn newtons_third_law_holds_for_direct_pairs() {
        let bodies = vec![particle(0.0, 0.0, 3.0), particle(2.0, 0.0, 5.0)];
        let (tree, states, params) = build_tree(&bodies, 0.0, 0.0);

        let a1 = tree.direct_acceleration(0, 1, &states, &params);
        let a2 = tree.direct_acceleration(1, 0, &states, &params);

        assert!((params[0].mass * a1 + params[1].mass * a2).length() < 1e-12);
    }

    #[test]
    fn theta_zero_matches_direct_sum() {
        let bodies = vec![
            particle(1.0, 2.0, 3.0),
            particle(-3.0, 1.0, 2.0),
            particle(4.0, -2.0, 6.0),
            particle(-1.0, -4.0, 1.0),
        ];
        let (tree, states, params) = build_tree(&bodies, 0.0, 0.0);

        for target in 0..states.len() {
            let tree_force = tree.calculate_force(target, &states, &params);

            let direct: Vector2 = (0..states.len())
                .filter(|&i| i != target)
                .map(|i| tree.direct_acceleration(target, i, &states, &params))
                .fold(Vector2::ZERO, |acc, a| acc + a);

            assert!((tree_force - direct).length() < 1e-9, "mismatch at {target}");
        }
    }

    #[test]
    fn insert_outside_bounds_errors() {
        let states = [ParticleState::new(Vector2::new(1000.0, 1000.0), Vector2::ZERO)];
        let mut tree = Quadtree::new(Vector2::new(-1.0, -1.0), Vector2::new(1.0, 1.0), 1.0, 0.01, G);

        assert!(tree.insert(&states, 0).is_err());
    }

    #[test]
    fn opening_angle_increases_force_error_monotonically() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        let bodies: Vec<_> = (0..120)
            .map(|_| {
                particle(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(0.1..10.0),
                )
            })
            .collect();

        let (mut tree, states, params) = build_tree(&bodies, 0.0, 0.0);
        let exact = tree.calculate_force(0, &states, &params);

        let mut previous_error = 0.0;
        for &theta in &[0.25, 0.5, 1.0, 2.0] {
            tree.set_theta(theta);
            let approx = tree.calculate_force(0, &states, &params);
            let error = (approx - exact).length();
            assert!(
                error + 1e-12 >= previous_error,
                "approximation error decreased going to theta={theta}: {error} < {previous_error}"
            );
            previous_error = error;
        }
    }

    #[test]
    fn reset_clears_coincident_list_and_counts() {
        let bodies = vec![particle(1.0, 1.0, 2.0), particle(1.0, 1.0, 3.0)];
        let (mut tree, _, _) = build_tree(&bodies, 1.0, 0.0);
        assert_eq!(tree.coincident_count(), 1);

        tree.reset(Vector2::new(-1.0, -1.0), Vector2::new(1.0, 1.0));
        assert_eq!(tree.coincident_count(), 0);
        assert_eq!(tree.particle_count(), 0);
    }
}
