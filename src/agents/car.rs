use crate::geom::{Coordinate, Direction};
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Probability that a sampled path step is flipped to the other axis.
pub const NOISE_CAR_PATH: f64 = 0.03;

/// Shared handle to a car.
///
/// A car is owned by its city for its whole lifetime; junctions hold these
/// shared handles keyed by the car's id.
pub type CarRef = Rc<RefCell<Car>>;

/// Alias for a car's identity.
pub type CarID = String;

/// Represents a single car travelling from a residential source tile to an
/// industrial destination tile.
///
/// The path is sampled once when the car is built and never mutated. The
/// car's only moving parts are its index into the path and its arrival
/// flag. While the car has not yet been inserted into the grid the index
/// stays `0`; once inserted, `current_location() == path[index]`.
#[derive(Debug, Clone)]
pub struct Car {
    /// Unique identifier.
    id: CarID,
    /// First cell of the path.
    source: Coordinate,
    /// Last cell of the path.
    destination: Coordinate,
    /// Tick at which the car enters the grid at its source.
    start_time: i32,
    /// Unit-step route from source to destination, fixed at construction.
    path: Vec<Coordinate>,
    /// Index of the car's current cell within `path`.
    location_index: usize,
    /// Whether the car has reached its destination and left the grid.
    arrived: bool,
}

impl Car {
    /// Constructs a new `CarBuilder` for building a `Car` object.
    ///
    /// # Arguments
    /// * `id` - A unique identifier for the car.
    ///
    /// # Returns
    /// A `CarBuilder` struct which is used to configure and build the `Car` object.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::agents::Car;
    /// use traffic_phase_optim::geom::Coordinate;
    /// let car = Car::new("car_1")
    ///     .with_source(Coordinate::new(0, 0))
    ///     .with_destination(Coordinate::new(0, 2))
    ///     .with_path(vec![
    ///         Coordinate::new(0, 0),
    ///         Coordinate::new(0, 1),
    ///         Coordinate::new(0, 2),
    ///     ])
    ///     .build();
    /// assert_eq!(car.current_location(), Coordinate::new(0, 0));
    /// ```
    pub fn new(id: impl Into<CarID>) -> CarBuilder {
        CarBuilder {
            car: Car {
                id: id.into(),
                source: Coordinate::none(),
                destination: Coordinate::none(),
                start_time: 0,
                path: Vec::new(),
                location_index: 0,
                arrived: false,
            },
            path_noise: NOISE_CAR_PATH,
        }
    }

    /// Returns the car's identifier.
    pub fn id(&self) -> &CarID {
        &self.id
    }

    /// Returns the source cell.
    pub fn source(&self) -> Coordinate {
        self.source
    }

    /// Returns the destination cell.
    pub fn destination(&self) -> Coordinate {
        self.destination
    }

    /// Returns the tick at which the car departs.
    pub fn start_time(&self) -> i32 {
        self.start_time
    }

    /// Returns the full prebuilt path.
    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    /// Returns the cell the car currently occupies (or would occupy at
    /// departure, while it has not entered the grid yet).
    pub fn current_location(&self) -> Coordinate {
        self.path[self.location_index]
    }

    /// Returns the direction of the car's next step.
    ///
    /// A car that has exhausted its path reports the horizontal default;
    /// such cars are removed before they could be selected as movers.
    pub fn current_direction(&self) -> Direction {
        if self.location_index >= self.path.len().saturating_sub(1) {
            return Direction::Horizontal;
        }
        let current = self.path[self.location_index];
        let next = self.path[self.location_index + 1];
        if current.x == next.x {
            Direction::Horizontal
        } else {
            Direction::Vertical
        }
    }

    /// Returns whether the car has arrived.
    pub fn did_arrive(&self) -> bool {
        self.arrived
    }

    /// Sets the arrival flag.
    pub fn set_did_arrive(&mut self, arrived: bool) {
        self.arrived = arrived;
    }

    /// Advances the car one step along its path, never past the end.
    pub fn advance(&mut self) {
        if self.location_index < self.path.len() - 1 {
            self.location_index += 1;
        }
    }

    /// Puts the car back to its pre-departure state: path index `0`,
    /// not arrived. The path itself is reused.
    pub fn reset(&mut self) {
        self.arrived = false;
        self.location_index = 0;
    }
}

/// A builder pattern implementation for constructing `Car` objects.
///
/// The route is either supplied explicitly via [`CarBuilder::with_path`]
/// (tests, replays) or sampled by [`CarBuilder::build_with_route`] from the
/// grid's highway layout.
pub struct CarBuilder {
    car: Car,
    path_noise: f64,
}

impl CarBuilder {
    /// Sets the source cell for the car.
    ///
    /// # Arguments
    /// * `source` - The cell the car departs from.
    ///
    /// # Returns
    /// A `CarBuilder` instance for further method chaining.
    pub fn with_source(mut self, source: Coordinate) -> Self {
        self.car.source = source;
        self
    }

    /// Sets the destination cell for the car.
    ///
    /// # Arguments
    /// * `destination` - The cell the car drives to.
    ///
    /// # Returns
    /// A `CarBuilder` instance for further method chaining.
    pub fn with_destination(mut self, destination: Coordinate) -> Self {
        self.car.destination = destination;
        self
    }

    /// Sets the departure tick for the car.
    ///
    /// # Arguments
    /// * `start_time` - The tick at which the car enters the grid.
    ///
    /// # Returns
    /// A `CarBuilder` instance for further method chaining.
    pub fn with_start_time(mut self, start_time: i32) -> Self {
        self.car.start_time = start_time;
        self
    }

    /// Sets the probability of a path step being flipped to the other axis.
    ///
    /// Defaults to [`NOISE_CAR_PATH`]. Set to `0.0` for fully deterministic
    /// monotone routes.
    pub fn with_path_noise(mut self, noise: f64) -> Self {
        self.path_noise = noise;
        self
    }

    /// Supplies an explicit path instead of sampling one.
    ///
    /// The first element must be the source and the last the destination;
    /// the builder derives both endpoints from the path.
    pub fn with_path(mut self, path: Vec<Coordinate>) -> Self {
        if let (Some(first), Some(last)) = (path.first(), path.last()) {
            self.car.source = *first;
            self.car.destination = *last;
        }
        self.car.path = path;
        self
    }

    /// Builds the final `Car` object with the configured properties.
    ///
    /// If no explicit path was supplied the car sits on a single-cell path
    /// at its source; use [`CarBuilder::build_with_route`] to sample a real
    /// route.
    pub fn build(mut self) -> Car {
        if self.car.path.is_empty() {
            self.car.path = vec![self.car.source];
        }
        self.car
    }

    /// Samples the car's route and builds the final `Car` object.
    ///
    /// # Arguments
    /// * `highway_directions` - Lookup returning the directions a cell
    ///   forces (see
    ///   [`Grid::check_highway_direction`](crate::grid::Grid::check_highway_direction)):
    ///   a single direction on one-way highway cells, both otherwise.
    /// * `rng` - Randomness source.
    ///
    /// # Returns
    /// The fully constructed `Car` with a monotone unit-step path from
    /// source to destination.
    pub fn build_with_route<R, F>(mut self, highway_directions: F, rng: &mut R) -> Car
    where
        R: Rng + ?Sized,
        F: Fn(Coordinate) -> Vec<Direction>,
    {
        self.car.path = self.sample_path(&highway_directions, rng);
        self.car
    }

    /// Builds a shared handle to the `Car` object with a sampled route.
    pub fn build_ref_with_route<R, F>(self, highway_directions: F, rng: &mut R) -> CarRef
    where
        R: Rng + ?Sized,
        F: Fn(Coordinate) -> Vec<Direction>,
    {
        Rc::new(RefCell::new(self.build_with_route(highway_directions, rng)))
    }

    fn sample_path<R, F>(&self, highway_directions: &F, rng: &mut R) -> Vec<Coordinate>
    where
        R: Rng + ?Sized,
        F: Fn(Coordinate) -> Vec<Direction>,
    {
        let mut path = vec![self.car.source];
        let mut current = self.car.source;

        while current != self.car.destination {
            let mut next_step = self.choose_next_step(current, highway_directions, rng);
            if rng.random::<f64>() < self.path_noise {
                next_step = self.flip_next_step(current, next_step);
            }
            path.push(next_step);
            current = next_step;
        }
        path
    }

    fn choose_next_step<R, F>(
        &self,
        current: Coordinate,
        highway_directions: &F,
        rng: &mut R,
    ) -> Coordinate
    where
        R: Rng + ?Sized,
        F: Fn(Coordinate) -> Vec<Direction>,
    {
        let highway_step = self.highway_next_step(current, highway_directions);
        if self.valid_step(highway_step) {
            return highway_step;
        }
        self.probabilistic_step(current, rng)
    }

    /// Returns the cell the highway flow leads to, if `current` sits on a
    /// one-direction highway cell; the "no candidate" sentinel otherwise.
    fn highway_next_step<F>(&self, current: Coordinate, highway_directions: &F) -> Coordinate
    where
        F: Fn(Coordinate) -> Vec<Direction>,
    {
        let allowed = highway_directions(current);
        if allowed.len() == 1 {
            return current.step(allowed[0]);
        }
        Coordinate::none()
    }

    /// Draws the step axis with probability proportional to the remaining
    /// distance per axis.
    fn probabilistic_step<R: Rng + ?Sized>(&self, current: Coordinate, rng: &mut R) -> Coordinate {
        let steps_x = self.car.destination.x - current.x;
        let steps_y = self.car.destination.y - current.y;
        let total_steps = steps_x.abs() + steps_y.abs();
        if total_steps == 0 {
            return current;
        }

        let prob_x = steps_x.abs() as f64 / total_steps as f64;
        if rng.random::<f64>() < prob_x {
            Coordinate::new(current.x + steps_x.signum(), current.y)
        } else {
            Coordinate::new(current.x, current.y + steps_y.signum())
        }
    }

    /// Swaps a horizontal step for a vertical one (and vice-versa), keeping
    /// the original step if the flipped cell would overshoot the
    /// destination.
    fn flip_next_step(&self, current: Coordinate, next_step: Coordinate) -> Coordinate {
        let flipped = if (current.x - next_step.x).abs() == 1 {
            Coordinate::new(current.x, current.y + 1)
        } else {
            Coordinate::new(current.x + 1, current.y)
        };
        if flipped.x > self.car.destination.x || flipped.y > self.car.destination.y {
            return next_step;
        }
        flipped
    }

    /// A candidate step is valid when it exists and does not overshoot the
    /// destination on either axis.
    fn valid_step(&self, coordinate: Coordinate) -> bool {
        if coordinate.is_none() {
            return false;
        }
        coordinate.x <= self.car.destination.x && coordinate.y <= self.car.destination.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn no_highways(_: Coordinate) -> Vec<Direction> {
        vec![Direction::Horizontal, Direction::Vertical]
    }

    #[test]
    fn test_path_is_monotone_unit_steps() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(17 + seed);
            let car = Car::new(format!("car_{}", seed))
                .with_source(Coordinate::new(0, 1))
                .with_destination(Coordinate::new(7, 6))
                .build_with_route(no_highways, &mut rng);

            let path = car.path();
            assert_eq!(path[0], car.source());
            assert_eq!(*path.last().unwrap(), car.destination());
            for window in path.windows(2) {
                let [from, to] = window else { unreachable!() };
                assert_eq!(from.manhattan_distance_to(to), 1, "non-unit step");
                assert!(to.x >= from.x && to.y >= from.y, "backtracking step");
            }
        }
    }

    #[test]
    fn test_highway_cell_forces_direction() {
        let mut rng = StdRng::seed_from_u64(3);
        // Every cell on row x=0 is a vertical one-way highway.
        let lookup = |coordinate: Coordinate| {
            if coordinate.x == 0 {
                vec![Direction::Vertical]
            } else {
                vec![Direction::Horizontal, Direction::Vertical]
            }
        };
        let car = Car::new("car_hw")
            .with_source(Coordinate::new(0, 0))
            .with_destination(Coordinate::new(2, 2))
            .with_path_noise(0.0)
            .build_with_route(lookup, &mut rng);

        // The first step must follow the highway down to x=1.
        assert_eq!(car.path()[1], Coordinate::new(1, 0));
    }

    #[test]
    fn test_current_direction_follows_path() {
        let car = Car::new("car_dir")
            .with_path(vec![
                Coordinate::new(0, 0),
                Coordinate::new(1, 0),
                Coordinate::new(1, 1),
            ])
            .build();
        assert_eq!(car.current_direction(), Direction::Vertical);
        let mut car = car;
        car.advance();
        assert_eq!(car.current_direction(), Direction::Horizontal);
        car.advance();
        // Path complete: defaults to horizontal.
        assert_eq!(car.current_direction(), Direction::Horizontal);
    }

    #[test]
    fn test_advance_clamps_at_path_end() {
        let mut car = Car::new("car_end")
            .with_path(vec![Coordinate::new(0, 0), Coordinate::new(0, 1)])
            .build();
        car.advance();
        car.advance();
        car.advance();
        assert_eq!(car.current_location(), Coordinate::new(0, 1));
    }

    #[test]
    fn test_reset_restores_departure_state() {
        let mut car = Car::new("car_reset")
            .with_path(vec![Coordinate::new(0, 0), Coordinate::new(0, 1)])
            .build();
        car.advance();
        car.set_did_arrive(true);
        car.reset();
        assert!(!car.did_arrive());
        assert_eq!(car.current_location(), Coordinate::new(0, 0));
    }
}
