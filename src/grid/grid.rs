use crate::agents::CarRef;
use crate::geom::{Coordinate, Direction};
use crate::grid::{horizontal_highway_cells, vertical_highway_cells, Junction};
use crate::log_additional;
use crate::traffic_lights::TrafficLightRef;
use crate::verbose::EVENT_CAR_DROPPED;
use std::collections::HashSet;

/// The 2D junction array together with the highway layout and the global
/// movement counter.
///
/// The grid does not own the cars - it moves shared handles between its
/// junctions. It also does not own the lights: junctions read the same
/// handles the traffic system writes.
#[derive(Debug)]
pub struct Grid {
    /// Number of rows.
    n: usize,
    /// Number of columns.
    m: usize,
    /// Junctions, row-major.
    junctions: Vec<Vec<Junction>>,
    /// Cells on a vertical highway stripe.
    vertical_highways: Vec<Coordinate>,
    /// Cells on a horizontal highway stripe.
    horizontal_highways: Vec<Coordinate>,
    /// Cars transferred to a next cell (or out of a sub-window) over the
    /// grid's life.
    total_car_movements: u64,
}

impl Grid {
    /// Creates a grid over the given light matrix with the highway layout
    /// derived from the grid dimensions.
    ///
    /// # Arguments
    /// * `traffic_lights` - One shared light handle per junction, row-major.
    ///
    /// # Example
    /// ```
    /// use traffic_phase_optim::grid::Grid;
    /// use traffic_phase_optim::traffic_lights::new_light_matrix;
    /// let lights = new_light_matrix(8, 8);
    /// let grid = Grid::new(&lights);
    /// assert_eq!(grid.dimensions(), (8, 8));
    /// ```
    pub fn new(traffic_lights: &[Vec<TrafficLightRef>]) -> Self {
        let n = traffic_lights.len();
        let m = traffic_lights.first().map_or(0, |row| row.len());
        Grid::with_highways(
            traffic_lights,
            vertical_highway_cells(n, m),
            horizontal_highway_cells(n, m),
        )
    }

    /// Creates a grid with an explicit highway layout.
    ///
    /// Used for neighborhood windows, whose highway cells are inherited
    /// from the source city rather than derived from the window size.
    pub fn with_highways(
        traffic_lights: &[Vec<TrafficLightRef>],
        vertical_highways: Vec<Coordinate>,
        horizontal_highways: Vec<Coordinate>,
    ) -> Self {
        let n = traffic_lights.len();
        let m = traffic_lights.first().map_or(0, |row| row.len());
        let vertical_set: HashSet<Coordinate> = vertical_highways.iter().copied().collect();
        let horizontal_set: HashSet<Coordinate> = horizontal_highways.iter().copied().collect();

        let junctions = traffic_lights
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, light)| {
                        let coordinate = Coordinate::new(i as i32, j as i32);
                        Junction::new(
                            light.clone(),
                            horizontal_set.contains(&coordinate),
                            vertical_set.contains(&coordinate),
                        )
                    })
                    .collect()
            })
            .collect();

        Grid {
            n,
            m,
            junctions,
            vertical_highways,
            horizontal_highways,
            total_car_movements: 0,
        }
    }

    /// Returns `(rows, columns)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.n, self.m)
    }

    /// Resolves one tick of movement over the whole grid.
    ///
    /// Phase A collects movers from every junction in row-major order and
    /// translates the green direction into a target cell; cars at the last
    /// row (vertical green) or last column (horizontal green) cannot move
    /// and are not collected. Phase B commits the transfers. The split
    /// keeps a car from being moved twice in one tick.
    pub fn resolve_all_moves(&mut self) {
        let mut moves: Vec<(CarRef, Coordinate, Coordinate)> = Vec::new();

        for i in 0..self.n {
            for j in 0..self.m {
                let (direction, movers) = self.junctions[i][j].resolve_moving_cars();
                let source = Coordinate::new(i as i32, j as i32);
                for car in movers {
                    match direction {
                        Direction::Vertical if i + 1 < self.n => {
                            moves.push((car, source, source.step(Direction::Vertical)));
                        }
                        Direction::Horizontal if j + 1 < self.m => {
                            moves.push((car, source, source.step(Direction::Horizontal)));
                        }
                        _ => {}
                    }
                }
            }
        }

        for (car, source, target) in moves {
            self.junction_mut(source).remove_car(&car);
            self.junction_mut(target).add_car(car.clone());
            car.borrow_mut().advance();
            self.total_car_movements += 1;
        }
    }

    /// Resolves one tick of movement inside a neighborhood window.
    ///
    /// Identical to [`Grid::resolve_all_moves`] except that movers whose
    /// target lies outside the window are dropped from their source cell
    /// without being re-added: the car has escaped the window. Escaped
    /// cars still advance and still count as movements.
    pub fn resolve_sub_grid(&mut self) {
        let mut moves: Vec<(CarRef, Coordinate, Coordinate)> = Vec::new();

        for i in 0..self.n {
            for j in 0..self.m {
                let (direction, movers) = self.junctions[i][j].resolve_moving_cars();
                let source = Coordinate::new(i as i32, j as i32);
                for car in movers {
                    moves.push((car, source, source.step(direction)));
                }
            }
        }

        for (car, source, target) in moves {
            self.junction_mut(source).remove_car(&car);
            if !self.out_of_grid(target) {
                self.junction_mut(target).add_car(car.clone());
            }
            car.borrow_mut().advance();
            self.total_car_movements += 1;
        }
    }

    /// Adds a car to the junction at `coordinate`.
    ///
    /// An out-of-range coordinate is not fatal: the insertion is logged
    /// and dropped.
    pub fn add_car_to_junction(&mut self, car: CarRef, coordinate: Coordinate) {
        if self.out_of_grid(coordinate) {
            log_additional!(
                EVENT_CAR_DROPPED,
                "Dropping car insertion at out-of-range coordinate",
                car_id = car.borrow().id().as_str(),
                x = coordinate.x,
                y = coordinate.y
            );
            return;
        }
        self.junction_mut(coordinate).add_car(car);
    }

    /// Removes a car from the junction at `coordinate`, setting its
    /// arrival flag when it stands on its destination. Out-of-range
    /// coordinates are ignored.
    pub fn remove_car_from_junction(&mut self, car: &CarRef, coordinate: Coordinate) {
        if self.out_of_grid(coordinate) {
            return;
        }
        self.junction_mut(coordinate).remove_car(car);
    }

    /// Returns `true` when `coordinate` lies outside the grid.
    pub fn out_of_grid(&self, coordinate: Coordinate) -> bool {
        coordinate.x < 0
            || coordinate.y < 0
            || coordinate.x >= self.n as i32
            || coordinate.y >= self.m as i32
    }

    /// Sum of all accumulated wait counters across the grid, divided by
    /// the number of junctions.
    pub fn total_avg_wait_time(&self) -> f64 {
        let total: u64 = self
            .junctions
            .iter()
            .flatten()
            .map(|junction| junction.total_wait_time())
            .sum();
        total as f64 / (self.n * self.m) as f64
    }

    /// Sum of squared wait counters across the grid.
    pub fn wait_time_punishment(&self) -> f64 {
        self.junctions
            .iter()
            .flatten()
            .map(|junction| junction.wait_time_punishment())
            .sum()
    }

    /// The directions a cell forces on passing cars.
    ///
    /// Cells on exactly one highway stripe force that stripe's direction;
    /// every other cell (including cells on both stripes) leaves both
    /// directions open.
    pub fn check_highway_direction(&self, coordinate: Coordinate) -> Vec<Direction> {
        let on_vertical = self.vertical_highways.contains(&coordinate);
        let on_horizontal = self.horizontal_highways.contains(&coordinate);
        match (on_vertical, on_horizontal) {
            (true, true) => vec![Direction::Horizontal, Direction::Vertical],
            (true, false) => vec![Direction::Vertical],
            (false, true) => vec![Direction::Horizontal],
            (false, false) => vec![Direction::Horizontal, Direction::Vertical],
        }
    }

    /// Vertical highway cells of this grid.
    pub fn vertical_highways(&self) -> &[Coordinate] {
        &self.vertical_highways
    }

    /// Horizontal highway cells of this grid.
    pub fn horizontal_highways(&self) -> &[Coordinate] {
        &self.horizontal_highways
    }

    /// Returns the junction at `coordinate`, if inside the grid.
    pub fn get_junction(&self, coordinate: Coordinate) -> Option<&Junction> {
        if self.out_of_grid(coordinate) {
            return None;
        }
        Some(&self.junctions[coordinate.x as usize][coordinate.y as usize])
    }

    /// Iterates over all junctions row-major.
    pub fn junctions(&self) -> impl Iterator<Item = &Junction> {
        self.junctions.iter().flatten()
    }

    /// Iterates over the junction rows.
    pub fn junction_rows(&self) -> &[Vec<Junction>] {
        &self.junctions
    }

    /// Cars transferred over the grid's life.
    pub fn total_car_movements(&self) -> u64 {
        self.total_car_movements
    }

    /// Clears every junction and the movement counter.
    pub fn reset(&mut self) {
        for junction in self.junctions.iter_mut().flatten() {
            junction.reset();
        }
        self.total_car_movements = 0;
    }

    /// Clones the grid's layout, wait history and movement counter onto a
    /// fresh light matrix, without any cars. Used when forking a
    /// neighborhood.
    pub(crate) fn clone_structure(&self, traffic_lights: &[Vec<TrafficLightRef>]) -> Grid {
        let junctions = self
            .junctions
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, junction)| junction.clone_with_light(traffic_lights[i][j].clone()))
                    .collect()
            })
            .collect();
        Grid {
            n: self.n,
            m: self.m,
            junctions,
            vertical_highways: self.vertical_highways.clone(),
            horizontal_highways: self.horizontal_highways.clone(),
            total_car_movements: self.total_car_movements,
        }
    }

    fn junction_mut(&mut self, coordinate: Coordinate) -> &mut Junction {
        &mut self.junctions[coordinate.x as usize][coordinate.y as usize]
    }
}
