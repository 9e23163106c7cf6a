//! # Point Graph
//!
//! The weighted point graph that the solvers search.
//!
//! Points live in an arena of generation-checked slots, indexed by id through
//! a `BTreeMap`. Edges are stored once per unordered pair of endpoints as a
//! [`Segment`] carrying a direction bitmask, so `a -> b`, `b -> a` and
//! `a <-> b` all collapse into a single entry.
//!
//! All collections iterate in ascending id order, which keeps neighbor
//! expansion, closest-point tie-breaks and segment scans deterministic.

use crate::events::{EventJournal, GraphEvent, GraphLink, GraphSubscription};
use crate::fixed::Fixed;
use crate::geometry::{FVec2, IVec2, closest_point_to_segment};
use crate::types::{GraphError, PointHandle, PointId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// SEGMENTS
// =============================================================================

/// Traversable directions of a segment, relative to its canonical
/// `(low, high)` endpoint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    None = 0,
    /// `low -> high` is traversable.
    Forward = 1,
    /// `high -> low` is traversable.
    Backward = 2,
    Bidirectional = 3,
}

impl Direction {
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::None,
            1 => Self::Forward,
            2 => Self::Backward,
            _ => Self::Bidirectional,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self::from_bits(self.bits() | other.bits())
    }

    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self::from_bits(self.bits() & !other.bits())
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.bits() & other.bits() == other.bits()
    }
}

/// A canonical edge between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub low: PointId,
    pub high: PointId,
    pub direction: Direction,
}

impl Segment {
    /// The directed segment `from -> to` in canonical form.
    #[must_use]
    pub fn directed(from: PointId, to: PointId) -> Self {
        if from < to {
            Self {
                low: from,
                high: to,
                direction: Direction::Forward,
            }
        } else {
            Self {
                low: to,
                high: from,
                direction: Direction::Backward,
            }
        }
    }

    #[must_use]
    pub fn key(&self) -> (PointId, PointId) {
        (self.low, self.high)
    }

    /// Whether `from -> to` may be traversed along this segment.
    #[must_use]
    pub fn allows(&self, from: PointId, to: PointId) -> bool {
        let probe = Self::directed(from, to);
        probe.key() == self.key() && self.direction.contains(probe.direction)
    }
}

// =============================================================================
// POINTS
// =============================================================================

/// A node of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    id: PointId,
    position: IVec2,
    weight_scale: Fixed,
    enabled: bool,
    /// Points reachable over a segment traversable away from this point.
    neighbors: BTreeSet<PointId>,
    /// Points joined by a segment this point can't traverse outward.
    unlinked_neighbors: BTreeSet<PointId>,
}

impl Point {
    fn new(id: PointId, position: IVec2, weight_scale: Fixed) -> Self {
        Self {
            id,
            position,
            weight_scale,
            enabled: true,
            neighbors: BTreeSet::new(),
            unlinked_neighbors: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PointId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> IVec2 {
        self.position
    }

    /// Multiplier applied to the cost of every edge entering this point.
    #[must_use]
    pub fn weight_scale(&self) -> Fixed {
        self.weight_scale
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Outgoing neighbors in ascending id order.
    pub fn neighbors(&self) -> impl DoubleEndedIterator<Item = PointId> + '_ {
        self.neighbors.iter().copied()
    }

    /// Neighbors joined by a segment that is only traversable towards this point.
    pub fn unlinked_neighbors(&self) -> impl Iterator<Item = PointId> + '_ {
        self.unlinked_neighbors.iter().copied()
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    point: Option<Point>,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Log a rejected operation and hand the error back to the caller.
fn reject<T>(operation: &'static str, error: GraphError) -> Result<T, GraphError> {
    tracing::warn!(target: "pointpath_core::graph", operation, %error, "graph operation rejected");
    Err(error)
}

/// The owned point graph.
///
/// Every public mutator either leaves the structure fully consistent or
/// rejects the call without touching it.
pub struct Graph {
    slots: Vec<Slot>,
    /// Vacant slots, reused lowest first.
    free_slots: BTreeSet<u32>,
    index: BTreeMap<PointId, PointHandle>,
    segments: BTreeMap<(PointId, PointId), Direction>,
    /// Weight scales of enabled points, with multiplicity.
    enabled_weights: BTreeMap<Fixed, usize>,
    next_generation: u64,
    last_free_id: u64,
    journal: EventJournal,
    link: Arc<GraphLink>,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: BTreeSet::new(),
            index: BTreeMap::new(),
            segments: BTreeMap::new(),
            enabled_weights: BTreeMap::new(),
            next_generation: 1,
            last_free_id: 0,
            journal: EventJournal::default(),
            link: GraphLink::new(),
        }
    }
}

impl Clone for Graph {
    /// Deep copy with a fresh identity: subscriptions to `self` do not follow
    /// the clone.
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            free_slots: self.free_slots.clone(),
            index: self.index.clone(),
            segments: self.segments.clone(),
            enabled_weights: self.enabled_weights.clone(),
            next_generation: self.next_generation,
            last_free_id: self.last_free_id,
            journal: EventJournal::default(),
            link: GraphLink::new(),
        }
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.link.id())
            .field("points", &self.index.len())
            .field("segments", &self.segments.len())
            .field("capacity", &self.slots.capacity())
            .finish()
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        tracing::debug!(graph = self.link.id(), "graph destroyed");
    }
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-unique id of this graph instance.
    #[must_use]
    pub fn graph_id(&self) -> u64 {
        self.link.id()
    }

    /// Start observing this graph's invalidation events.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self) -> GraphSubscription {
        GraphSubscription::new(&self.link, self.journal.next_seq())
    }

    pub(crate) fn link(&self) -> &Arc<GraphLink> {
        &self.link
    }

    pub(crate) fn journal(&self) -> &EventJournal {
        &self.journal
    }

    fn track_weight(&mut self, weight_scale: Fixed) {
        *self.enabled_weights.entry(weight_scale).or_insert(0) += 1;
    }

    fn untrack_weight(&mut self, weight_scale: Fixed) {
        if let Some(count) = self.enabled_weights.get_mut(&weight_scale) {
            *count -= 1;
            if *count == 0 {
                self.enabled_weights.remove(&weight_scale);
            }
        }
    }

    fn publish(&mut self, event: GraphEvent) {
        tracing::trace!(graph = self.link.id(), ?event, "graph event");
        self.journal.push(event);
    }

    // =========================================================================
    // POINT LOOKUP
    // =========================================================================

    /// Look up a point by id.
    #[must_use]
    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.index.get(&id).and_then(|&handle| self.resolve(handle))
    }

    /// Storage handle of a point.
    #[must_use]
    pub fn handle(&self, id: PointId) -> Option<PointHandle> {
        self.index.get(&id).copied()
    }

    /// Resolve a handle; stale handles resolve to `None`.
    #[must_use]
    pub fn resolve(&self, handle: PointHandle) -> Option<&Point> {
        let slot = self.slots.get(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.point.as_ref()
    }

    fn point_mut(&mut self, id: PointId) -> Option<&mut Point> {
        let handle = *self.index.get(&id)?;
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.point.as_mut()
    }

    fn existing_mut(
        &mut self,
        operation: &'static str,
        id: PointId,
    ) -> Result<&mut Point, GraphError> {
        match self.point_mut(id) {
            Some(point) => Ok(point),
            None => reject(operation, GraphError::PointNotFound(id)),
        }
    }

    fn existing(&self, operation: &'static str, id: PointId) -> Result<&Point, GraphError> {
        match self.point(id) {
            Some(point) => Ok(point),
            None => reject(operation, GraphError::PointNotFound(id)),
        }
    }

    #[must_use]
    pub fn has_point(&self, id: PointId) -> bool {
        self.index.contains_key(&id)
    }

    /// All points in ascending id order.
    pub fn points(&self) -> impl Iterator<Item = &Point> {
        self.index.values().filter_map(|&handle| self.resolve(handle))
    }

    /// All point ids in ascending order.
    #[must_use]
    pub fn get_point_ids(&self) -> Vec<PointId> {
        self.index.keys().copied().collect()
    }

    /// Outgoing neighbors of a point in ascending id order.
    ///
    /// A missing point yields an empty list (and a logged error).
    #[must_use]
    pub fn get_point_connections(&self, id: PointId) -> Vec<PointId> {
        self.existing("get_point_connections", id)
            .map(|point| point.neighbors().collect())
            .unwrap_or_default()
    }

    /// Smallest id, starting from the most recently freed one, that is not in use.
    #[must_use]
    pub fn available_point_id(&self) -> PointId {
        let mut candidate = self.last_free_id;
        while self.index.contains_key(&PointId(candidate)) {
            candidate = candidate.saturating_add(1);
        }
        PointId(candidate)
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Smallest weight scale among enabled points, `None` if there are none.
    #[must_use]
    pub fn min_weight_scale(&self) -> Option<Fixed> {
        self.enabled_weights.keys().next().copied()
    }

    /// Number of point slots the storage can hold without reallocating.
    #[must_use]
    pub fn point_capacity(&self) -> usize {
        self.slots.capacity()
    }

    // =========================================================================
    // POINT MUTATION
    // =========================================================================

    /// Create or update a point and connect it bidirectionally to `adjacent`.
    ///
    /// Updating an existing point replaces its position and weight scale but
    /// keeps its connections and enabled flag. Adjacent ids that don't exist
    /// are logged and skipped.
    pub fn add_point(
        &mut self,
        id: PointId,
        position: IVec2,
        weight_scale: Fixed,
        adjacent: &[PointId],
    ) -> Result<(), GraphError> {
        if weight_scale.is_negative() {
            return reject("add_point", GraphError::NegativeWeightScale(weight_scale));
        }

        match self.point_mut(id) {
            Some(point) => {
                let previous = std::mem::replace(&mut point.weight_scale, weight_scale);
                point.position = position;
                if point.enabled {
                    self.untrack_weight(previous);
                    self.track_weight(weight_scale);
                }
            }
            None => self.insert_point(Point::new(id, position, weight_scale))?,
        }

        self.connect_adjacent(id, adjacent);
        Ok(())
    }

    /// Like [`Graph::add_point`], but leaves an existing point untouched.
    ///
    /// Returns `Ok(false)` when a point with this id already exists.
    pub fn try_add_point(
        &mut self,
        id: PointId,
        position: IVec2,
        weight_scale: Fixed,
        adjacent: &[PointId],
    ) -> Result<bool, GraphError> {
        if weight_scale.is_negative() {
            return reject("try_add_point", GraphError::NegativeWeightScale(weight_scale));
        }
        if self.has_point(id) {
            return Ok(false);
        }

        self.insert_point(Point::new(id, position, weight_scale))?;
        self.connect_adjacent(id, adjacent);
        Ok(true)
    }

    fn connect_adjacent(&mut self, id: PointId, adjacent: &[PointId]) {
        for &adjacent_id in adjacent {
            // Rejections are logged by connect_points itself.
            let _ = self.connect_points(id, adjacent_id, true);
        }
    }

    fn insert_point(&mut self, point: Point) -> Result<(), GraphError> {
        let id = point.id;
        let generation = self.next_generation;
        let slot = match self.free_slots.pop_first() {
            Some(slot) => slot,
            None => {
                let slot = match u32::try_from(self.slots.len()) {
                    Ok(slot) => slot,
                    Err(_) => return reject("add_point", GraphError::StorageExhausted(self.slots.len())),
                };
                let previous_capacity = self.slots.capacity();
                self.slots.push(Slot {
                    generation,
                    point: None,
                });
                if self.slots.capacity() != previous_capacity {
                    self.publish(GraphEvent::StorageInvalidated);
                }
                slot
            }
        };

        self.next_generation = self.next_generation.saturating_add(1);
        self.track_weight(point.weight_scale);
        self.slots[slot as usize] = Slot {
            generation,
            point: Some(point),
        };
        self.index.insert(id, PointHandle { slot, generation });
        Ok(())
    }

    /// Remove a point together with every segment touching it.
    pub fn remove_point(&mut self, id: PointId) -> Result<(), GraphError> {
        let Some(handle) = self.index.remove(&id) else {
            return reject("remove_point", GraphError::PointNotFound(id));
        };

        let removed = self
            .slots
            .get_mut(handle.slot as usize)
            .and_then(|slot| slot.point.take());
        self.free_slots.insert(handle.slot);

        if let Some(point) = removed {
            if point.enabled {
                self.untrack_weight(point.weight_scale);
            }
            for neighbor_id in point.neighbors.iter().chain(&point.unlinked_neighbors) {
                self.segments.remove(&Segment::directed(id, *neighbor_id).key());
                if let Some(neighbor) = self.point_mut(*neighbor_id) {
                    neighbor.neighbors.remove(&id);
                    neighbor.unlinked_neighbors.remove(&id);
                }
            }
        }

        self.last_free_id = id.0;
        self.publish(GraphEvent::PointRemoved(id));
        Ok(())
    }

    #[must_use]
    pub fn point_position(&self, id: PointId) -> Option<IVec2> {
        self.existing("point_position", id).ok().map(Point::position)
    }

    pub fn set_point_position(&mut self, id: PointId, position: IVec2) -> Result<(), GraphError> {
        self.existing_mut("set_point_position", id)?.position = position;
        Ok(())
    }

    #[must_use]
    pub fn point_weight_scale(&self, id: PointId) -> Option<Fixed> {
        self.existing("point_weight_scale", id)
            .ok()
            .map(Point::weight_scale)
    }

    pub fn set_point_weight_scale(
        &mut self,
        id: PointId,
        weight_scale: Fixed,
    ) -> Result<(), GraphError> {
        let point = self.existing_mut("set_point_weight_scale", id)?;
        if weight_scale.is_negative() {
            return reject(
                "set_point_weight_scale",
                GraphError::NegativeWeightScale(weight_scale),
            );
        }
        let previous = std::mem::replace(&mut point.weight_scale, weight_scale);
        if point.enabled {
            self.untrack_weight(previous);
            self.track_weight(weight_scale);
        }
        Ok(())
    }

    /// Mark a point as unusable by solvers without removing it.
    pub fn set_point_disabled(&mut self, id: PointId, disabled: bool) -> Result<(), GraphError> {
        let point = self.existing_mut("set_point_disabled", id)?;
        let was_enabled = std::mem::replace(&mut point.enabled, !disabled);
        let weight_scale = point.weight_scale;
        match (was_enabled, disabled) {
            (true, true) => self.untrack_weight(weight_scale),
            (false, false) => self.track_weight(weight_scale),
            _ => {}
        }
        Ok(())
    }

    /// A missing point reports `false` (and a logged error).
    #[must_use]
    pub fn is_point_disabled(&self, id: PointId) -> bool {
        self.existing("is_point_disabled", id)
            .map(|point| !point.enabled)
            .unwrap_or(false)
    }

    // =========================================================================
    // SEGMENTS
    // =========================================================================

    /// Connect `id -> with_id`, and `with_id -> id` too when `bidirectional`.
    ///
    /// Connecting over an existing segment widens its direction.
    pub fn connect_points(
        &mut self,
        id: PointId,
        with_id: PointId,
        bidirectional: bool,
    ) -> Result<(), GraphError> {
        if id == with_id {
            return reject("connect_points", GraphError::SelfConnection(id));
        }
        self.existing("connect_points", id)?;
        self.existing("connect_points", with_id)?;

        let mut segment = Segment::directed(id, with_id);
        if bidirectional {
            segment.direction = Direction::Bidirectional;
        }
        if let Some(&existing) = self.segments.get(&segment.key()) {
            segment.direction = segment.direction.union(existing);
        }

        let both_ways = segment.direction == Direction::Bidirectional;
        if let Some(from) = self.point_mut(id) {
            from.neighbors.insert(with_id);
            if both_ways {
                from.unlinked_neighbors.remove(&with_id);
            }
        }
        if let Some(to) = self.point_mut(with_id) {
            if both_ways {
                to.neighbors.insert(id);
                to.unlinked_neighbors.remove(&id);
            } else {
                to.unlinked_neighbors.insert(id);
            }
        }

        self.segments.insert(segment.key(), segment.direction);
        Ok(())
    }

    /// Remove `id -> with_id`, and `with_id -> id` too when `bidirectional`.
    ///
    /// A segment left with no direction is removed entirely.
    pub fn disconnect_points(
        &mut self,
        id: PointId,
        with_id: PointId,
        bidirectional: bool,
    ) -> Result<(), GraphError> {
        self.existing("disconnect_points", id)?;
        self.existing("disconnect_points", with_id)?;

        let probe = Segment::directed(id, with_id);
        let Some(&existing) = self.segments.get(&probe.key()) else {
            return Ok(());
        };
        let removed = if bidirectional {
            Direction::Bidirectional
        } else {
            probe.direction
        };
        let remaining = existing.difference(removed);

        if let Some(from) = self.point_mut(id) {
            from.neighbors.remove(&with_id);
            if bidirectional {
                from.unlinked_neighbors.remove(&with_id);
            } else if remaining != Direction::None {
                from.unlinked_neighbors.insert(with_id);
            }
        }
        if let Some(to) = self.point_mut(with_id) {
            if bidirectional {
                to.neighbors.remove(&id);
                to.unlinked_neighbors.remove(&id);
            } else if remaining == Direction::None {
                to.unlinked_neighbors.remove(&id);
            }
        }

        if remaining == Direction::None {
            self.segments.remove(&probe.key());
        } else {
            self.segments.insert(probe.key(), remaining);
        }
        Ok(())
    }

    /// With `bidirectional` any segment between the points counts; otherwise
    /// `id -> with_id` must be traversable.
    #[must_use]
    pub fn are_points_connected(&self, id: PointId, with_id: PointId, bidirectional: bool) -> bool {
        let probe = Segment::directed(id, with_id);
        self.segments
            .get(&probe.key())
            .is_some_and(|&direction| bidirectional || direction.contains(probe.direction))
    }

    /// All segments in ascending `(low, high)` order.
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.segments
            .iter()
            .map(|(&(low, high), &direction)| Segment {
                low,
                high,
                direction,
            })
    }

    // =========================================================================
    // STORAGE
    // =========================================================================

    /// Grow point storage to hold at least `num_points` slots.
    pub fn reserve_space(&mut self, num_points: usize) -> Result<(), GraphError> {
        let current = self.slots.capacity();
        if num_points <= current {
            return reject(
                "reserve_space",
                GraphError::CapacityNotIncreased {
                    current,
                    requested: num_points,
                },
            );
        }
        self.slots.reserve_exact(num_points - self.slots.len());
        self.publish(GraphEvent::StorageInvalidated);
        Ok(())
    }

    /// Compact point storage, dropping vacant slots.
    ///
    /// Live points move to new slots, so every outstanding handle goes stale.
    pub fn shrink_to_fit(&mut self) {
        let mut slots = Vec::with_capacity(self.index.len());
        let mut index = BTreeMap::new();
        let old_slots = std::mem::take(&mut self.slots);
        let mut points: Vec<Point> = old_slots.into_iter().filter_map(|slot| slot.point).collect();
        points.sort_by_key(|point| point.id);

        for (slot, point) in points.into_iter().enumerate() {
            let generation = self.next_generation;
            self.next_generation = self.next_generation.saturating_add(1);
            index.insert(
                point.id,
                PointHandle {
                    slot: slot as u32,
                    generation,
                },
            );
            slots.push(Slot {
                generation,
                point: Some(point),
            });
        }

        slots.shrink_to_fit();
        self.slots = slots;
        self.index = index;
        self.free_slots.clear();
        self.publish(GraphEvent::StorageInvalidated);
    }

    /// Remove every point and segment.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.index.clear();
        self.segments.clear();
        self.enabled_weights.clear();
        self.last_free_id = 0;
        self.publish(GraphEvent::StorageInvalidated);
    }

    // =========================================================================
    // SPATIAL QUERIES
    // =========================================================================

    /// Point with the smallest squared distance to `position`.
    ///
    /// Ties resolve to the smallest id. Returns `None` if no point qualifies.
    #[must_use]
    pub fn get_closest_point(&self, position: IVec2, include_disabled: bool) -> Option<PointId> {
        let mut closest: Option<(i64, PointId)> = None;
        // Ascending id order: a strict comparison keeps the lowest id on ties.
        for point in self.points() {
            if !include_disabled && !point.enabled {
                continue;
            }
            let d = position.distance_squared(point.position);
            if closest.is_none_or(|(best, _)| d < best) {
                closest = Some((d, point.id));
            }
        }
        closest.map(|(_, id)| id)
    }

    /// Closest position on any segment whose endpoints are both enabled.
    #[must_use]
    pub fn get_closest_position_in_segment(&self, position: FVec2) -> Option<FVec2> {
        let mut closest: Option<(Fixed, FVec2)> = None;
        for segment in self.segments() {
            let (Some(low), Some(high)) = (self.point(segment.low), self.point(segment.high))
            else {
                continue;
            };
            if !(low.enabled && high.enabled) {
                continue;
            }

            let projected = closest_point_to_segment(position, low.position, high.position);
            let d = position.distance_squared(projected);
            if closest.is_none_or(|(best, _)| d < best) {
                closest = Some((d, projected));
            }
        }
        closest.map(|(_, projected)| projected)
    }
}

// =============================================================================
// TESTS
// =============================================================================
