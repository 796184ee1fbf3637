//! Dogs: the actors players steer around the road grid

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::game::map::{Map, Orientation};
use crate::game::navigator::{Navigator, NavigatorError, NavigatorState};
use crate::util::vec2::Vec2;

/// Movement command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    North,
    South,
    East,
    West,
    Stop,
}

impl Direction {
    /// Axis of travel, `None` for `Stop`
    pub fn axis(self) -> Option<Orientation> {
        match self {
            Direction::East | Direction::West => Some(Orientation::Horizontal),
            Direction::North | Direction::South => Some(Orientation::Vertical),
            Direction::Stop => None,
        }
    }

    pub fn unit(self) -> Vec2 {
        match self {
            Direction::North => Vec2::UP,
            Direction::South => Vec2::DOWN,
            Direction::East => Vec2::RIGHT,
            Direction::West => Vec2::LEFT,
            Direction::Stop => Vec2::ZERO,
        }
    }

    /// Whether travel increases the coordinate on its axis
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::South | Direction::East)
    }

    /// Wire code: `U`, `D`, `R`, `L`, or empty for `Stop`
    pub fn code(self) -> &'static str {
        match self {
            Direction::North => "U",
            Direction::South => "D",
            Direction::East => "R",
            Direction::West => "L",
            Direction::Stop => "",
        }
    }

    /// Code reported in state queries. A stopped dog reads as `U`.
    pub fn state_code(self) -> &'static str {
        match self {
            Direction::Stop => Direction::North.code(),
            moving => moving.code(),
        }
    }
}

impl FromStr for Direction {
    type Err = NavigatorError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "U" => Ok(Direction::North),
            "D" => Ok(Direction::South),
            "R" => Ok(Direction::East),
            "L" => Ok(Direction::West),
            "" => Ok(Direction::Stop),
            other => Err(NavigatorError::InvalidDirection(other.to_string())),
        }
    }
}

/// Point-in-time view of a dog for state queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DogSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub direction: Direction,
}

/// A dog bound to one map's road network
#[derive(Debug, Clone)]
pub struct Dog {
    direction: Direction,
    /// Commanded velocity, re-applied every tick
    velocity: Vec2,
    navigator: Navigator,
}

impl Dog {
    pub fn spawn<R: Rng + ?Sized>(
        map: &Map,
        randomize: bool,
        rng: &mut R,
    ) -> Result<Self, NavigatorError> {
        Ok(Self::with_navigator(Navigator::spawn(map, randomize, rng)?))
    }

    pub fn with_navigator(navigator: Navigator) -> Self {
        Self {
            direction: Direction::North,
            velocity: Vec2::ZERO,
            navigator,
        }
    }

    /// Record a movement command and the velocity it implies
    pub fn set_speed(&mut self, direction: Direction, speed: f64) {
        self.direction = direction;
        self.velocity = Navigator::set_velocity(direction, speed);
        self.navigator.set_speed(self.velocity);
    }

    /// Advance by one tick using the current command
    pub fn move_by(&mut self, map: &Map, dt: Duration) -> Result<(), NavigatorError> {
        self.navigator.advance(map, self.direction, self.velocity, dt)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn position(&self) -> Vec2 {
        self.navigator.position()
    }

    /// Effective velocity after the last tick's clamping
    pub fn velocity(&self) -> Vec2 {
        self.navigator.velocity()
    }

    pub fn navigator_state(&self) -> NavigatorState {
        self.navigator.state()
    }

    pub fn snapshot(&self) -> DogSnapshot {
        DogSnapshot {
            position: self.position(),
            velocity: self.velocity(),
            direction: self.direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{MapId, Point, Road};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn map() -> Map {
        Map::new(
            MapId::new("town"),
            "Town".into(),
            vec![Road::horizontal(Point::new(0, 0), 10)],
            vec![],
            vec![],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_direction_codes() {
        for direction in [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Stop,
        ] {
            assert_eq!(direction.code().parse::<Direction>(), Ok(direction));
        }
        assert_eq!(
            "X".parse::<Direction>(),
            Err(NavigatorError::InvalidDirection("X".into()))
        );
        assert!("u".parse::<Direction>().is_err());
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(Direction::East.state_code(), "R");
        assert_eq!(Direction::West.state_code(), "L");
        assert_eq!(Direction::South.state_code(), "D");
        assert_eq!(Direction::North.state_code(), "U");
        assert_eq!(Direction::Stop.state_code(), "U");
    }

    #[test]
    fn test_direction_axis() {
        assert_eq!(Direction::East.axis(), Some(Orientation::Horizontal));
        assert_eq!(Direction::North.axis(), Some(Orientation::Vertical));
        assert_eq!(Direction::Stop.axis(), None);
        assert!(Direction::South.is_positive());
        assert!(!Direction::West.is_positive());
    }

    #[test]
    fn test_new_dog_faces_north_at_rest() {
        let dog = Dog::spawn(&map(), false, &mut StdRng::seed_from_u64(0)).unwrap();
        let snap = dog.snapshot();
        assert_eq!(snap.position, Vec2::ZERO);
        assert_eq!(snap.velocity, Vec2::ZERO);
        assert_eq!(snap.direction, Direction::North);
        assert_eq!(snap.direction.state_code(), "U");
    }

    #[test]
    fn test_set_speed_and_move() {
        let map = map();
        let mut dog = Dog::with_navigator(Navigator::at(0, Vec2::new(5.0, 0.0)));
        dog.set_speed(Direction::East, 2.0);
        assert_eq!(dog.velocity(), Vec2::new(2.0, 0.0));

        dog.move_by(&map, Duration::from_millis(1000)).unwrap();
        assert!(dog.position().approx_eq(Vec2::new(7.0, 0.0), 1e-9));
        assert_eq!(dog.direction(), Direction::East);
    }

    #[test]
    fn test_stop_zeroes_velocity() {
        let mut dog = Dog::with_navigator(Navigator::at(0, Vec2::new(5.0, 0.0)));
        dog.set_speed(Direction::West, 4.0);
        dog.set_speed(Direction::Stop, 4.0);
        assert_eq!(dog.velocity(), Vec2::ZERO);
        assert_eq!(dog.direction(), Direction::Stop);
        assert_eq!(dog.snapshot().direction, Direction::Stop);
        assert_eq!(dog.snapshot().direction.state_code(), "U");
    }

    #[test]
    fn test_pushing_against_road_end_keeps_stopped() {
        let map = map();
        let mut dog = Dog::with_navigator(Navigator::at(0, Vec2::new(9.0, 0.0)));
        dog.set_speed(Direction::East, 5.0);
        for _ in 0..3 {
            dog.move_by(&map, Duration::from_millis(1000)).unwrap();
            assert!(dog.position().approx_eq(Vec2::new(10.4, 0.0), 1e-9));
            assert_eq!(dog.velocity(), Vec2::ZERO);
        }
    }
}
