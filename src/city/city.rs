use crate::agents::{Car, CarRef};
use crate::city::Neighborhood;
use crate::geom::{Coordinate, Direction};
use crate::grid::Grid;
use crate::log_detailed;
use crate::traffic_lights::{
    new_light_matrix, Assignment, TrafficLightRef, TrafficSystem, TrafficSystemError,
};
use crate::verbose::{EVENT_CITY_CREATE, EVENT_CITY_RESET, EVENT_CITY_TICK};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;
use uuid::Uuid;

/// Side length of the residential corner (top-left).
pub const RESIDENTIAL_SIZE: usize = 2;
/// Side length of the industrial corner (bottom-right).
pub const INDUSTRIAL_SIZE: usize = 2;
/// Latest possible departure tick.
pub const MAX_TIME_TO_START: i32 = 4;
/// Sentinel for "not all cars have arrived within the horizon".
pub const ALL_CARS_ARRIVED_INF: i32 = 10_000;

/// Custom error types for `City`.
#[derive(Debug)]
pub enum CityError {
    /// A residential or industrial coordinate set was empty.
    EmptyCoordinateSet { which: &'static str },
    /// The applied assignment did not match the grid shape.
    TrafficSystem(TrafficSystemError),
}

impl fmt::Display for CityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CityError::EmptyCoordinateSet { which } => {
                write!(f, "City requires at least one {} coordinate", which)
            }
            CityError::TrafficSystem(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CityError {}

impl From<TrafficSystemError> for CityError {
    fn from(err: TrafficSystemError) -> Self {
        CityError::TrafficSystem(err)
    }
}

/// The owning simulation state machine: cars, lights, grid and clock.
///
/// Cars are built once at construction with prebuilt paths; they enter the
/// grid at their departure tick and leave it when they reach their
/// destination. [`City::reset_city`] re-arms the same cars for another
/// run, so repeated schedule evaluations compare like with like.
pub struct City {
    /// Instance identifier, for log correlation.
    id: Uuid,
    /// Number of grid rows.
    n: usize,
    /// Number of grid columns.
    m: usize,
    /// Current tick.
    time: i32,
    /// Every car of the city, arrived or not.
    cars: Vec<CarRef>,
    /// Departure tiles, subset of the top-left corner.
    residential_coords: Vec<Coordinate>,
    /// Destination tiles, subset of the bottom-right corner.
    industrial_coords: Vec<Coordinate>,
    /// Light handles shared with the grid and the traffic system.
    traffic_lights: Vec<Vec<TrafficLightRef>>,
    /// The junction grid.
    grid: Grid,
    /// Applies per-tick assignments to the lights.
    traffic_system: TrafficSystem,
    /// Cars that have departed and not yet arrived, plus cars still to
    /// depart.
    num_of_active_cars: usize,
    /// First tick at which every car had arrived, or the sentinel.
    all_cars_arrived_time: i32,
}

impl City {
    /// Creates a city with `num_cars` cars drawn between the given
    /// residential and industrial tiles.
    ///
    /// Cars are not placed on the grid here; each enters at its departure
    /// tick during [`City::update_city`].
    ///
    /// # Arguments
    /// * `n` - Number of grid rows.
    /// * `m` - Number of grid columns.
    /// * `num_cars` - Size of the car fleet.
    /// * `residential_coords` - Candidate departure tiles (non-empty).
    /// * `industrial_coords` - Candidate destination tiles (non-empty).
    /// * `rng` - Randomness source for endpoints, departures and paths.
    ///
    /// # Errors
    /// [`CityError::EmptyCoordinateSet`] when either candidate set is
    /// empty.
    pub fn new<R: Rng + ?Sized>(
        n: usize,
        m: usize,
        num_cars: usize,
        residential_coords: Vec<Coordinate>,
        industrial_coords: Vec<Coordinate>,
        rng: &mut R,
    ) -> Result<Self, CityError> {
        if residential_coords.is_empty() {
            return Err(CityError::EmptyCoordinateSet {
                which: "residential",
            });
        }
        if industrial_coords.is_empty() {
            return Err(CityError::EmptyCoordinateSet { which: "industrial" });
        }

        let traffic_lights = new_light_matrix(n, m);
        let grid = Grid::new(&traffic_lights);
        let traffic_system = TrafficSystem::new(traffic_lights.clone());

        let mut cars = Vec::with_capacity(num_cars);
        for k in 0..num_cars {
            let source = sample_normal_location(&residential_coords, rng);
            let destination = sample_normal_location(&industrial_coords, rng);
            let start_time = sample_departure_time(rng);
            let car = Car::new(format!("car_{}", k))
                .with_source(source)
                .with_destination(destination)
                .with_start_time(start_time)
                .build_ref_with_route(|c| grid.check_highway_direction(c), rng);
            cars.push(car);
        }

        let num_of_active_cars = cars.len();
        log_detailed!(
            EVENT_CITY_CREATE,
            "City generated",
            rows = n,
            cols = m,
            cars = num_of_active_cars
        );
        Ok(City {
            id: Uuid::new_v4(),
            n,
            m,
            time: 0,
            cars,
            residential_coords,
            industrial_coords,
            traffic_lights,
            grid,
            traffic_system,
            num_of_active_cars,
            all_cars_arrived_time: ALL_CARS_ARRIVED_INF,
        })
    }

    /// Generates a city with random non-empty subsets of the 2×2
    /// residential (top-left) and industrial (bottom-right) corners.
    ///
    /// # Example
    /// ```
    /// use rand::SeedableRng;
    /// use traffic_phase_optim::city::City;
    /// let mut rng = rand::rngs::StdRng::seed_from_u64(9);
    /// let city = City::generate_city(8, 8, 350, &mut rng).unwrap();
    /// assert_eq!(city.active_cars_amount(), 350);
    /// ```
    pub fn generate_city<R: Rng + ?Sized>(
        n: usize,
        m: usize,
        num_cars: usize,
        rng: &mut R,
    ) -> Result<Self, CityError> {
        let mut possible_residential = Vec::new();
        for i in 0..RESIDENTIAL_SIZE {
            for j in 0..RESIDENTIAL_SIZE {
                possible_residential.push(Coordinate::new(i as i32, j as i32));
            }
        }

        let mut possible_industrial = Vec::new();
        for i in 0..INDUSTRIAL_SIZE {
            for j in 0..INDUSTRIAL_SIZE {
                possible_industrial.push(Coordinate::new(
                    n as i32 - 1 - i as i32,
                    m as i32 - 1 - j as i32,
                ));
            }
        }

        let residential_coords = sample_subset(&possible_residential, rng);
        let industrial_coords = sample_subset(&possible_industrial, rng);

        City::new(n, m, num_cars, residential_coords, industrial_coords, rng)
    }

    /// Generates `num_cities` independent random cities.
    pub fn generate_cities<R: Rng + ?Sized>(
        n: usize,
        m: usize,
        num_cars: usize,
        num_cities: usize,
        rng: &mut R,
    ) -> Result<Vec<Self>, CityError> {
        (0..num_cities)
            .map(|_| City::generate_city(n, m, num_cars, rng))
            .collect()
    }

    /// Forwards the city state by one tick of time.
    ///
    /// Order within the tick: apply the assignment to the lights, remove
    /// cars that landed on their destination last tick, resolve movement
    /// in two phases, insert cars whose departure tick is now, update the
    /// all-arrived sentinel, advance the clock.
    ///
    /// # Arguments
    /// * `assignment` - Light directions for this tick.
    /// * `debug` - When `true`, prints an ASCII snapshot to stdout.
    ///
    /// # Errors
    /// [`CityError::TrafficSystem`] when the assignment shape does not
    /// match the grid.
    pub fn update_city(&mut self, assignment: &Assignment, debug: bool) -> Result<(), CityError> {
        self.traffic_system.apply(assignment)?;
        if debug {
            self.print_layout(assignment);
        }
        self.remove_arrived_cars();
        self.grid.resolve_all_moves();
        self.insert_departing_cars();
        if self.num_of_active_cars == 0 && self.all_cars_arrived_time > self.time {
            self.all_cars_arrived_time = self.time;
        }
        self.time += 1;
        log_detailed!(
            EVENT_CITY_TICK,
            "City advanced one tick",
            tick = self.time,
            active_cars = self.num_of_active_cars
        );
        Ok(())
    }

    /// Number of cars that have not yet arrived.
    pub fn active_cars_amount(&self) -> usize {
        self.num_of_active_cars
    }

    /// Current tick.
    pub fn time(&self) -> i32 {
        self.time
    }

    /// First tick at which every car had arrived, or
    /// [`ALL_CARS_ARRIVED_INF`].
    pub fn all_cars_arrived_time(&self) -> i32 {
        self.all_cars_arrived_time
    }

    /// Returns `(rows, columns)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.n, self.m)
    }

    /// The city's cars.
    pub fn cars(&self) -> &[CarRef] {
        &self.cars
    }

    /// The city's grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Instance identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sum of accumulated wait counters divided by the junction count.
    pub fn total_avg_wait_time(&self) -> f64 {
        self.grid.total_avg_wait_time()
    }

    /// Cars transferred between cells over the run.
    pub fn total_car_movements(&self) -> u64 {
        self.grid.total_car_movements()
    }

    /// Sum of squared wait counters across all junctions.
    pub fn wait_time_punishment(&self) -> f64 {
        self.grid.wait_time_punishment()
    }

    /// Puts the city back to tick zero: cars re-armed with their prebuilt
    /// paths, junctions cleared, movement counter and arrival sentinel
    /// reset.
    pub fn reset_city(&mut self) {
        for car in &self.cars {
            car.borrow_mut().reset();
        }
        self.grid.reset();
        self.time = 0;
        self.num_of_active_cars = self.cars.len();
        self.all_cars_arrived_time = ALL_CARS_ARRIVED_INF;
        log_detailed!(EVENT_CITY_RESET, "City reset", cars = self.cars.len());
    }

    /// Creates a [`Neighborhood`] copy of the rectangular window spanned
    /// by the given corners.
    ///
    /// The window gets fresh lights seeded from the city's current light
    /// directions, inherits the highway flags of the covered cells
    /// (window-translated), and deep-copies every car currently at a
    /// window cell. The copies keep their city-global paths; only their
    /// junction placement is translated.
    pub fn get_neighborhood(
        &self,
        top_left: Coordinate,
        top_right: Coordinate,
        bottom_left: Coordinate,
    ) -> Neighborhood {
        let rows = (bottom_left.x - top_left.x + 1) as usize;
        let cols = (top_right.y - top_left.y + 1) as usize;
        let lights = new_light_matrix(rows, cols);

        let mut vertical_highways = Vec::new();
        let mut horizontal_highways = Vec::new();
        let mut window_cars: Vec<CarRef> = Vec::new();

        for i in top_left.x..=bottom_left.x {
            for j in top_left.y..=top_right.y {
                let global = Coordinate::new(i, j);
                let Some(junction) = self.grid.get_junction(global) else {
                    continue;
                };
                let local = global.shifted_by(top_left.x, top_left.y);
                lights[local.x as usize][local.y as usize]
                    .borrow_mut()
                    .set_direction(
                        self.traffic_lights[i as usize][j as usize]
                            .borrow()
                            .get_direction(),
                    );
                if junction.is_vertical_highway() {
                    vertical_highways.push(local);
                }
                if junction.is_horizontal_highway() {
                    horizontal_highways.push(local);
                }
                for car in junction.cars().values() {
                    window_cars.push(std::rc::Rc::new(std::cell::RefCell::new(
                        car.borrow().clone(),
                    )));
                }
            }
        }

        let mut grid = Grid::with_highways(&lights, vertical_highways, horizontal_highways);
        let traffic_system = TrafficSystem::new(lights.clone());
        for car in &window_cars {
            let local = car
                .borrow()
                .current_location()
                .shifted_by(top_left.x, top_left.y);
            grid.add_car_to_junction(car.clone(), local);
        }

        Neighborhood::new(
            window_cars,
            grid,
            lights,
            traffic_system,
            top_left.x,
            top_left.y,
        )
    }

    /// Prints a visual representation of the city to stdout.
    ///
    /// One bracket per junction: applied light direction, the number of
    /// vertically and horizontally oriented cars queued there, and the
    /// cell index marked `R`/`I` on residential/industrial tiles.
    pub fn print_layout(&self, assignment: &Assignment) {
        println!("{}", "-".repeat(77));
        println!("City layout:");
        for i in 0..self.n {
            for j in 0..self.m {
                let coordinate = Coordinate::new(i as i32, j as i32);
                let junction = match self.grid.get_junction(coordinate) {
                    Some(junction) => junction,
                    None => continue,
                };
                let light = match assignment.get(i, j) {
                    Direction::Horizontal => 'H',
                    Direction::Vertical => 'V',
                };
                let vertical_cars = junction.cars_in_direction(Direction::Vertical);
                let horizontal_cars = junction.cars_in_direction(Direction::Horizontal);
                let marker = if self.residential_coords.contains(&coordinate) {
                    "R"
                } else if self.industrial_coords.contains(&coordinate) {
                    "I"
                } else {
                    " "
                };
                print!(
                    "[D:{}, V:{:2}, H:{:2}, ({},{}){}]",
                    light, vertical_cars, horizontal_cars, i, j, marker
                );
                if j < self.m - 1 {
                    print!(" -- ");
                }
            }
            println!();
            if i < self.n - 1 {
                for j in 0..self.m {
                    print!("          |          ");
                    if j < self.m - 1 {
                        print!("    ");
                    }
                }
                println!();
            }
        }
    }

    /// Removes every car that landed on its destination last tick and
    /// marks it arrived. Runs before movement so the previous tick's
    /// landings are finalized first.
    fn remove_arrived_cars(&mut self) {
        for car in &self.cars {
            let (arrived, at_destination, destination) = {
                let car = car.borrow();
                (
                    car.did_arrive(),
                    car.current_location() == car.destination(),
                    car.destination(),
                )
            };
            if at_destination && !arrived {
                self.grid.remove_car_from_junction(car, destination);
                self.num_of_active_cars -= 1;
            }
        }
    }

    /// Inserts every car whose departure tick equals the current time at
    /// its source junction.
    fn insert_departing_cars(&mut self) {
        for car in &self.cars {
            let (start_time, source) = {
                let car = car.borrow();
                (car.start_time(), car.source())
            };
            if start_time == self.time {
                self.grid.add_car_to_junction(car.clone(), source);
            }
        }
    }
}

/// Selects a location by a Normal draw over the candidate list: index
/// `round(Normal(len/2, len/6))` clamped into range.
fn sample_normal_location<R: Rng + ?Sized>(coords: &[Coordinate], rng: &mut R) -> Coordinate {
    let len = coords.len();
    let mean = len as f64 / 2.0;
    let std_dev = len as f64 / 6.0;
    let value = match Normal::new(mean, std_dev) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => mean,
    };
    let index = (value.round() as i64).clamp(0, len as i64 - 1) as usize;
    coords[index]
}

/// Draws a departure tick `round(Normal(2, 2))` clamped into
/// `[0, MAX_TIME_TO_START]`.
fn sample_departure_time<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    let mean = MAX_TIME_TO_START as f64 / 2.0;
    let std_dev = MAX_TIME_TO_START as f64 / 2.0;
    let value = match Normal::new(mean, std_dev) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => mean,
    };
    (value.round() as i64).clamp(0, MAX_TIME_TO_START as i64) as i32
}

/// Draws a uniformly sized, uniformly chosen non-empty subset.
fn sample_subset<R: Rng + ?Sized>(coords: &[Coordinate], rng: &mut R) -> Vec<Coordinate> {
    let amount = rng.random_range(1..=coords.len());
    rand::seq::index::sample(rng, coords.len(), amount)
        .iter()
        .map(|index| coords[index])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_city_construction_defers_insertion() {
        let mut rng = StdRng::seed_from_u64(4);
        let city = City::generate_city(8, 8, 20, &mut rng).unwrap();
        // Cars exist but none sit on the grid before their departure tick.
        let queued: usize = city.grid().junctions().map(|j| j.cars_amount()).sum();
        assert_eq!(queued, 0);
        assert_eq!(city.active_cars_amount(), 20);
    }

    #[test]
    fn test_departure_times_within_window() {
        let mut rng = StdRng::seed_from_u64(4);
        let city = City::generate_city(8, 8, 100, &mut rng).unwrap();
        for car in city.cars() {
            let start_time = car.borrow().start_time();
            assert!((0..=MAX_TIME_TO_START).contains(&start_time));
        }
    }

    #[test]
    fn test_endpoints_come_from_corners() {
        let mut rng = StdRng::seed_from_u64(12);
        let city = City::generate_city(8, 8, 50, &mut rng).unwrap();
        for car in city.cars() {
            let car = car.borrow();
            assert!(car.source().x <= 1 && car.source().y <= 1);
            assert!(car.destination().x >= 6 && car.destination().y >= 6);
        }
    }

    #[test]
    fn test_empty_coordinate_set_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = City::new(
            4,
            4,
            1,
            Vec::new(),
            vec![Coordinate::new(3, 3)],
            &mut rng,
        );
        assert!(matches!(
            result,
            Err(CityError::EmptyCoordinateSet { which: "residential" })
        ));
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut city = City::generate_city(4, 4, 1, &mut rng).unwrap();
        let wrong = Assignment::filled(3, 3, Direction::Horizontal);
        assert!(matches!(
            city.update_city(&wrong, false),
            Err(CityError::TrafficSystem(_))
        ));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut city = City::generate_city(8, 8, 30, &mut rng).unwrap();
        let all_h = Assignment::filled(8, 8, Direction::Horizontal);
        let all_v = Assignment::filled(8, 8, Direction::Vertical);
        for t in 0..20 {
            let assignment = if t % 2 == 0 { &all_h } else { &all_v };
            city.update_city(assignment, false).unwrap();
        }
        city.reset_city();
        assert_eq!(city.time(), 0);
        assert_eq!(city.active_cars_amount(), 30);
        assert_eq!(city.total_car_movements(), 0);
        assert_eq!(city.all_cars_arrived_time(), ALL_CARS_ARRIVED_INF);
        let queued: usize = city.grid().junctions().map(|j| j.cars_amount()).sum();
        assert_eq!(queued, 0);
        for car in city.cars() {
            assert!(!car.borrow().did_arrive());
        }
    }

    #[test]
    fn test_arrival_sentinel_records_first_empty_tick() {
        let mut rng = StdRng::seed_from_u64(21);
        // Single car on a tiny grid arrives quickly under alternating lights.
        let mut city = City::new(
            3,
            3,
            1,
            vec![Coordinate::new(0, 0)],
            vec![Coordinate::new(2, 2)],
            &mut rng,
        )
        .unwrap();
        let all_h = Assignment::filled(3, 3, Direction::Horizontal);
        let all_v = Assignment::filled(3, 3, Direction::Vertical);
        for t in 0..20 {
            let assignment = if t % 2 == 0 { &all_h } else { &all_v };
            city.update_city(assignment, false).unwrap();
        }
        assert_eq!(city.active_cars_amount(), 0);
        assert!(city.all_cars_arrived_time() < ALL_CARS_ARRIVED_INF);
    }
}
