use crate::agents::CarRef;
use crate::city::CityError;
use crate::geom::Direction;
use crate::grid::Grid;
use crate::traffic_lights::{new_light_matrix, Assignment, TrafficLightRef, TrafficSystem};
use std::cell::RefCell;
use std::rc::Rc;

/// An independently simulable copy of a rectangular city window.
///
/// A neighborhood is a short-lived rollout sandbox for the policy
/// optimizer: created from a city via
/// [`City::get_neighborhood`](crate::city::City::get_neighborhood), rolled
/// forward a handful of ticks, evaluated, discarded. Its cars are copies -
/// the source city is never touched.
///
/// Copied cars keep their city-global paths; `(shift_x, shift_y)` maps the
/// window's top-left into the city, and every junction lookup translates
/// through it. A car whose path leads outside the window "escapes" and is
/// treated as arrived for the window's purposes.
pub struct Neighborhood {
    /// Number of cars in the window at copy time.
    original_num_of_cars: usize,
    /// The copied cars, including ones that escaped since.
    cars: Vec<CarRef>,
    /// The window's own light matrix.
    traffic_lights: Vec<Vec<TrafficLightRef>>,
    /// Applies per-tick assignments to the window's lights.
    traffic_system: TrafficSystem,
    /// Window-sized grid with inherited highway flags.
    grid: Grid,
    /// Row of the window's top-left cell in the city.
    shift_x: i32,
    /// Column of the window's top-left cell in the city.
    shift_y: i32,
    /// Window rows.
    n: usize,
    /// Window columns.
    m: usize,
}

impl Neighborhood {
    /// Assembles a neighborhood from already-copied parts.
    ///
    /// Callers normally go through
    /// [`City::get_neighborhood`](crate::city::City::get_neighborhood).
    pub fn new(
        cars: Vec<CarRef>,
        grid: Grid,
        traffic_lights: Vec<Vec<TrafficLightRef>>,
        traffic_system: TrafficSystem,
        shift_x: i32,
        shift_y: i32,
    ) -> Self {
        let (n, m) = grid.dimensions();
        Neighborhood {
            original_num_of_cars: cars.len(),
            cars,
            traffic_lights,
            traffic_system,
            grid,
            shift_x,
            shift_y,
            n,
            m,
        }
    }

    /// Forwards the neighborhood state by one tick of time.
    ///
    /// Applies the assignment to the window's lights, finalizes cars that
    /// escaped the window or reached their destination, then resolves
    /// movement with the sub-grid variant (movers whose target lies
    /// outside the window are dropped at the boundary).
    pub fn update_neighborhood(&mut self, assignment: &Assignment) -> Result<(), CityError> {
        self.traffic_system.apply(assignment)?;
        self.remove_cars_from_grid();
        self.grid.resolve_sub_grid();
        Ok(())
    }

    /// Per-junction four-channel state encoding, flattened row-major.
    ///
    /// Channels per junction: cars whose own next step is vertical, cars
    /// whose own next step is horizontal, the vertical highway flag, the
    /// horizontal highway flag. Length `4 * rows * cols`.
    pub fn state(&self) -> Vec<i64> {
        let mut state = Vec::with_capacity(4 * self.n * self.m);
        for row in self.grid.junction_rows() {
            for junction in row {
                state.push(junction.cars_in_direction(Direction::Vertical) as i64);
                state.push(junction.cars_in_direction(Direction::Horizontal) as i64);
                state.push(junction.is_vertical_highway() as i64);
                state.push(junction.is_horizontal_highway() as i64);
            }
        }
        state
    }

    /// Total number of cars currently across the window's junctions.
    pub fn active_cars_amount(&self) -> usize {
        self.grid.junctions().map(|junction| junction.cars_amount()).sum()
    }

    /// Number of cars in the window at copy time.
    pub fn original_num_of_cars(&self) -> usize {
        self.original_num_of_cars
    }

    /// The window's grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The window's light matrix.
    pub fn traffic_lights(&self) -> &[Vec<TrafficLightRef>] {
        &self.traffic_lights
    }

    /// Returns `(rows, columns)` of the window.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.n, self.m)
    }

    /// The window's offset into the source city.
    pub fn shift(&self) -> (i32, i32) {
        (self.shift_x, self.shift_y)
    }

    /// Builds a fresh neighborhood with copied cars, fresh default lights,
    /// the same highway layout and wait history, and an identical shift.
    ///
    /// Used when the evaluator needs a rollout fork: the fork can be
    /// advanced without disturbing this neighborhood.
    pub fn deep_copy(&self) -> Neighborhood {
        let lights = new_light_matrix(self.n, self.m);
        let mut grid = self.grid.clone_structure(&lights);
        let traffic_system = TrafficSystem::new(lights.clone());

        let cars: Vec<CarRef> = self
            .cars
            .iter()
            .map(|car| Rc::new(RefCell::new(car.borrow().clone())))
            .collect();
        for car in &cars {
            let local = car
                .borrow()
                .current_location()
                .shifted_by(self.shift_x, self.shift_y);
            if !grid.out_of_grid(local) {
                grid.add_car_to_junction(car.clone(), local);
            }
        }

        let mut copy = Neighborhood::new(
            cars,
            grid,
            lights,
            traffic_system,
            self.shift_x,
            self.shift_y,
        );
        copy.original_num_of_cars = self.original_num_of_cars;
        copy
    }

    /// Finalizes cars that left the window or reached their destination.
    ///
    /// Escaped cars are only flagged (the sub-grid resolution already
    /// dropped them from their junction); cars standing on an in-window
    /// destination are removed from their junction, which sets the flag.
    fn remove_cars_from_grid(&mut self) {
        for car in &self.cars {
            let (arrived, location, at_destination) = {
                let car = car.borrow();
                (
                    car.did_arrive(),
                    car.current_location(),
                    car.current_location() == car.destination(),
                )
            };
            if arrived {
                continue;
            }
            let local = location.shifted_by(self.shift_x, self.shift_y);
            if self.grid.out_of_grid(local) {
                car.borrow_mut().set_did_arrive(true);
            } else if at_destination {
                self.grid.remove_car_from_junction(car, local);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::City;
    use crate::geom::Coordinate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn populated_city() -> (City, StdRng) {
        let mut rng = StdRng::seed_from_u64(33);
        let mut city = City::generate_city(8, 8, 100, &mut rng).unwrap();
        // A few warm-up ticks so cars spread over the grid.
        for _ in 0..6 {
            let assignment = Assignment::random(8, 8, &mut rng);
            city.update_city(&assignment, false).unwrap();
        }
        (city, rng)
    }

    #[test]
    fn test_window_copy_is_isolated() {
        let (city, _rng) = populated_city();
        let before: usize = city.grid().junctions().map(|j| j.cars_amount()).sum();

        let mut neighborhood = city.get_neighborhood(
            Coordinate::new(0, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 0),
        );
        let assignment = Assignment::filled(3, 3, Direction::Vertical);
        for _ in 0..4 {
            neighborhood.update_neighborhood(&assignment).unwrap();
        }

        // Rolling the window forward must not touch the source city.
        let after: usize = city.grid().junctions().map(|j| j.cars_amount()).sum();
        assert_eq!(before, after);
    }

    #[test]
    fn test_state_encoding_shape_and_flags() {
        let (city, _rng) = populated_city();
        // Window over rows 2..=4, columns 1..=3: cell (2, 3) of the city is
        // on the horizontal highway stripe.
        let neighborhood = city.get_neighborhood(
            Coordinate::new(2, 1),
            Coordinate::new(2, 3),
            Coordinate::new(4, 1),
        );
        let state = neighborhood.state();
        assert_eq!(state.len(), 4 * 9);
        // Local cell (0, 2) == city (2, 3): horizontal highway flag set.
        let base = 2 * 4;
        assert_eq!(state[base + 3], 1);
        assert!(state.iter().all(|&channel| channel >= 0));
    }

    #[test]
    fn test_car_counts_match_queues() {
        let (city, _rng) = populated_city();
        let neighborhood = city.get_neighborhood(
            Coordinate::new(0, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 0),
        );
        let state = neighborhood.state();
        let total_from_state: i64 = (0..9).map(|cell| state[cell * 4] + state[cell * 4 + 1]).sum();
        assert_eq!(total_from_state as usize, neighborhood.active_cars_amount());
    }

    #[test]
    fn test_deep_copy_forks_cars_and_waits() {
        let (city, _rng) = populated_city();
        let neighborhood = city.get_neighborhood(
            Coordinate::new(0, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 0),
        );
        let mut fork = neighborhood.deep_copy();
        assert_eq!(
            fork.active_cars_amount(),
            neighborhood.active_cars_amount()
        );
        assert_eq!(
            fork.original_num_of_cars(),
            neighborhood.original_num_of_cars()
        );
        assert_eq!(
            fork.grid().total_car_movements(),
            neighborhood.grid().total_car_movements()
        );

        // Advancing the fork leaves the source window unchanged.
        let before = neighborhood.active_cars_amount();
        let assignment = Assignment::filled(3, 3, Direction::Vertical);
        for _ in 0..3 {
            fork.update_neighborhood(&assignment).unwrap();
        }
        assert_eq!(neighborhood.active_cars_amount(), before);
    }

    #[test]
    fn test_escaped_cars_are_marked_arrived() {
        let (city, _rng) = populated_city();
        let mut neighborhood = city.get_neighborhood(
            Coordinate::new(0, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 0),
        );
        // Push everything out with enough alternating ticks.
        let all_v = Assignment::filled(3, 3, Direction::Vertical);
        let all_h = Assignment::filled(3, 3, Direction::Horizontal);
        for t in 0..30 {
            let assignment = if t % 2 == 0 { &all_v } else { &all_h };
            neighborhood.update_neighborhood(assignment).unwrap();
        }
        assert_eq!(neighborhood.active_cars_amount(), 0);
    }
}
