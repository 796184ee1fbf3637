//! Road-constrained motion engine
//!
//! A [`Navigator`] anchors one dog to a road of its map and integrates the
//! dog's motion one tick at a time. Motion along the current road is clamped
//! to the road's extent widened by [`HALF_WIDTH`]; motion across it is only
//! possible where another road crosses, otherwise the dog stays within the
//! half-width of the road's centre line.
//!
//! Every call to [`Navigator::advance`] leaves the position inside the
//! widened bounding box of the road the navigator is anchored to.

use rand::Rng;
use std::time::Duration;

use crate::game::constants::road::HALF_WIDTH;
use crate::game::dog::Direction;
use crate::game::map::{Map, Orientation, Road};
use crate::util::vec2::Vec2;

/// Full motion state of one dog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigatorState {
    /// Index into the map's road list
    pub road: usize,
    pub position: Vec2,
    pub velocity: Vec2,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    state: NavigatorState,
}

impl Navigator {
    /// Place a navigator on the map.
    ///
    /// Without `randomize` the dog starts at the start point of road 0.
    /// With it, a road is picked uniformly by index and then a point
    /// uniformly along that road. Every road is equally likely regardless of
    /// its length, so short roads are denser in spawns than long ones.
    pub fn spawn<R: Rng + ?Sized>(
        map: &Map,
        randomize: bool,
        rng: &mut R,
    ) -> Result<Self, NavigatorError> {
        let mut navigator = Self::at(0, Vec2::ZERO);
        navigator.place(map, randomize, rng)?;
        Ok(navigator)
    }

    /// Navigator anchored to `road` at an explicit position, at rest
    pub fn at(road: usize, position: Vec2) -> Self {
        Self {
            state: NavigatorState {
                road,
                position,
                velocity: Vec2::ZERO,
            },
        }
    }

    /// Move to a spawn point, keeping nothing of the previous state
    fn place<R: Rng + ?Sized>(
        &mut self,
        map: &Map,
        randomize: bool,
        rng: &mut R,
    ) -> Result<(), NavigatorError> {
        let roads = map.roads();
        if roads.is_empty() {
            return Err(NavigatorError::UnknownRoad(0));
        }

        let (road, position) = if randomize {
            let index = rng.gen_range(0..roads.len());
            (index, random_point_on(&roads[index], rng))
        } else {
            (0, roads[0].start().to_vec2())
        };

        self.state = NavigatorState {
            road,
            position,
            velocity: Vec2::ZERO,
        };
        Ok(())
    }

    /// Velocity for a movement command. `Stop` yields zero velocity.
    pub fn set_velocity(direction: Direction, speed: f64) -> Vec2 {
        direction.unit() * speed
    }

    pub fn state(&self) -> NavigatorState {
        self.state
    }

    pub fn road(&self) -> usize {
        self.state.road
    }

    pub fn position(&self) -> Vec2 {
        self.state.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.state.velocity
    }

    /// Apply a new commanded velocity without moving
    pub fn set_speed(&mut self, velocity: Vec2) {
        self.state.velocity = velocity;
    }

    /// Integrate one tick of motion.
    ///
    /// On error the state is left untouched.
    pub fn advance(
        &mut self,
        map: &Map,
        direction: Direction,
        velocity: Vec2,
        dt: Duration,
    ) -> Result<(), NavigatorError> {
        let road = *map
            .roads()
            .get(self.state.road)
            .ok_or(NavigatorError::UnknownRoad(self.state.road))?;

        let candidate = self.state.position + velocity * dt.as_secs_f64();
        if !candidate.is_finite() {
            return Err(NavigatorError::NonFinitePosition);
        }

        self.state.velocity = velocity;

        match direction.axis() {
            Some(axis) if axis != road.orientation() => {
                self.turn(map, &road, direction, candidate);
            }
            _ => self.move_along(map, candidate),
        }

        Ok(())
    }

    /// Motion parallel to the current road (or no motion at all).
    ///
    /// Leaving the road past an endpoint shared with a collinear road that
    /// extends further moves the anchor onto that road first.
    fn move_along(&mut self, map: &Map, candidate: Vec2) {
        let roads = map.roads();
        let mut current = self.state.road;

        // Each step strictly extends the reachable span, so this terminates.
        loop {
            let road = &roads[current];
            let along = along_coord(candidate, road.orientation());
            let (lo, hi) = road.span();

            let next = if along > hi as f64 + HALF_WIDTH {
                map.adjacency().adjacent(current).find(|&n| {
                    let (n_lo, n_hi) = roads[n].span();
                    n_lo == hi && n_hi > hi
                })
            } else if along < lo as f64 - HALF_WIDTH {
                map.adjacency().adjacent(current).find(|&n| {
                    let (n_lo, n_hi) = roads[n].span();
                    n_hi == lo && n_lo < lo
                })
            } else {
                None
            };

            match next {
                Some(n) => current = n,
                None => break,
            }
        }

        let road = &roads[current];
        let (lo, hi) = road.span();
        let along = along_coord(candidate, road.orientation());
        let clamped = along.clamp(lo as f64 - HALF_WIDTH, hi as f64 + HALF_WIDTH);

        if clamped != along {
            self.state.velocity = Vec2::ZERO;
        }

        self.state.road = current;
        self.state.position = with_along(candidate, road.orientation(), clamped);
    }

    /// Motion perpendicular to the current road: switch onto a crossing road
    /// if one is within reach, otherwise stay within the road's half-width.
    fn turn(&mut self, map: &Map, road: &Road, direction: Direction, candidate: Vec2) {
        if let Some(next) = self
            .crossing_ahead(map, road, direction, candidate)
            .or_else(|| self.crossing_at(map, road, candidate))
        {
            self.switch_to(map, next, candidate);
            return;
        }

        let travel_axis = road.orientation().perpendicular();
        let fixed = road.fixed_coord() as f64;
        let travel = along_coord(candidate, travel_axis);
        let limited = travel.clamp(fixed - HALF_WIDTH, fixed + HALF_WIDTH);

        if limited != travel {
            self.state.velocity = Vec2::ZERO;
        }
        self.state.position = with_along(candidate, travel_axis, limited);
    }

    /// Crossing road at the dog's spot that lies entirely on the side the
    /// dog is heading to, so the turn continues straight onto it.
    fn crossing_ahead(
        &self,
        map: &Map,
        road: &Road,
        direction: Direction,
        candidate: Vec2,
    ) -> Option<usize> {
        let roads = map.roads();
        let fixed = road.fixed_coord();
        let cross = along_coord(candidate, road.orientation());
        let forward = direction.is_positive();

        map.adjacency().crossings(self.state.road).find(|&c| {
            let other = &roads[c];
            let (lo, hi) = other.span();
            let ahead = if forward { lo >= fixed } else { hi <= fixed };
            ahead && (other.fixed_coord() as f64 - cross).abs() <= HALF_WIDTH
        })
    }

    /// Any crossing road whose span contains the candidate and whose centre
    /// line is within reach.
    fn crossing_at(&self, map: &Map, road: &Road, candidate: Vec2) -> Option<usize> {
        let roads = map.roads();
        let cross = along_coord(candidate, road.orientation());
        let travel = along_coord(candidate, road.orientation().perpendicular());

        map.adjacency().crossings(self.state.road).find(|&c| {
            let other = &roads[c];
            let (lo, hi) = other.span();
            (lo as f64..=hi as f64).contains(&travel)
                && (other.fixed_coord() as f64 - cross).abs() <= HALF_WIDTH
        })
    }

    fn switch_to(&mut self, map: &Map, road: usize, candidate: Vec2) {
        let (position, clamped) = map.roads()[road].clamp(candidate);
        if clamped {
            self.state.velocity = Vec2::ZERO;
        }
        self.state.road = road;
        self.state.position = position;
    }
}

/// Coordinate of `pos` along `axis`
fn along_coord(pos: Vec2, axis: Orientation) -> f64 {
    match axis {
        Orientation::Horizontal => pos.x,
        Orientation::Vertical => pos.y,
    }
}

/// `pos` with its coordinate along `axis` replaced
fn with_along(pos: Vec2, axis: Orientation, value: f64) -> Vec2 {
    match axis {
        Orientation::Horizontal => Vec2::new(value, pos.y),
        Orientation::Vertical => Vec2::new(pos.x, value),
    }
}

fn random_point_on<R: Rng + ?Sized>(road: &Road, rng: &mut R) -> Vec2 {
    let (lo, hi) = road.span();
    let t = rng.gen_range(lo as f64..=hi as f64);
    let fixed = road.fixed_coord() as f64;
    match road.orientation() {
        Orientation::Horizontal => Vec2::new(t, fixed),
        Orientation::Vertical => Vec2::new(fixed, t),
    }
}

/// Navigation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigatorError {
    #[error("invalid direction {0:?}")]
    InvalidDirection(String),
    #[error("road {0} does not exist on this map")]
    UnknownRoad(usize),
    #[error("movement produced a non-finite position")]
    NonFinitePosition,
}
