use crate::agents::{CarID, CarRef};
use crate::geom::Direction;
use crate::traffic_lights::TrafficLightRef;
use indexmap::IndexMap;

/// Cars a junction lets through per tick when its green direction does not
/// match a highway flag.
pub const REGULAR_JUNCTION_LIMIT: usize = 10;
/// Cars a junction lets through per tick when its green direction matches
/// one of its highway flags.
pub const HIGHWAY_JUNCTION_LIMIT: usize = 20;

/// A single grid cell: a traffic light, the cars currently queued at the
/// cell and their accumulated wait counters.
///
/// The wait counter of a car is its lifetime total of ticks spent waiting
/// at any junction. It is not reset when the car leaves the cell - the map
/// keeps entries for departed cars so reporting can read them after the
/// run.
#[derive(Debug)]
pub struct Junction {
    /// The light gating this cell, shared with the traffic system.
    traffic_light: TrafficLightRef,
    /// Cars currently at this cell, in insertion order.
    cars: IndexMap<CarID, CarRef>,
    /// Accumulated wait ticks per car that ever queued here.
    wait_times: IndexMap<CarID, u32>,
    /// Raised capacity for horizontally green ticks.
    is_horizontal_highway: bool,
    /// Raised capacity for vertically green ticks.
    is_vertical_highway: bool,
}

impl Junction {
    /// Creates a junction around a shared light handle.
    ///
    /// # Arguments
    /// * `traffic_light` - The light gating this cell.
    /// * `is_horizontal_highway` - Whether the cell lies on a horizontal highway stripe.
    /// * `is_vertical_highway` - Whether the cell lies on a vertical highway stripe.
    pub fn new(
        traffic_light: TrafficLightRef,
        is_horizontal_highway: bool,
        is_vertical_highway: bool,
    ) -> Self {
        Junction {
            traffic_light,
            cars: IndexMap::new(),
            wait_times: IndexMap::new(),
            is_horizontal_highway,
            is_vertical_highway,
        }
    }

    /// Returns whether the cell lies on a horizontal highway stripe.
    pub fn is_horizontal_highway(&self) -> bool {
        self.is_horizontal_highway
    }

    /// Returns whether the cell lies on a vertical highway stripe.
    pub fn is_vertical_highway(&self) -> bool {
        self.is_vertical_highway
    }

    /// Adds a single car to the junction.
    ///
    /// A car id seen for the first time gets a zero wait counter; an id
    /// that queued here before keeps its accumulated counter. Re-adding a
    /// present id overwrites the handle.
    pub fn add_car(&mut self, car: CarRef) {
        let id = car.borrow().id().clone();
        self.wait_times.entry(id.clone()).or_insert(0);
        self.cars.insert(id, car);
    }

    /// Removes a single car from the junction.
    ///
    /// If the car stands on its destination cell its arrival flag is set.
    /// The wait counter entry is kept for reporting.
    pub fn remove_car(&mut self, car: &CarRef) {
        let id = car.borrow().id().clone();
        self.cars.shift_remove(&id);
        let mut car = car.borrow_mut();
        if car.current_location() == car.destination() {
            car.set_did_arrive(true);
        }
    }

    /// Selects the cars allowed to move out of this junction this tick and
    /// charges one wait tick to every car present.
    ///
    /// The movers are the cars whose own next-step direction equals the
    /// light's green direction, ordered by descending accumulated wait
    /// (ties keep insertion order), cut at the junction's capacity for
    /// that direction. The junction's car set is left untouched - the
    /// physical transfer is the grid's job.
    ///
    /// # Returns
    /// The green direction and the selected movers.
    pub fn resolve_moving_cars(&mut self) -> (Direction, Vec<CarRef>) {
        let current_direction = self.traffic_light.borrow().get_direction();

        let mut movers: Vec<CarRef> = self
            .cars
            .values()
            .filter(|car| car.borrow().current_direction() == current_direction)
            .cloned()
            .collect();

        // Stable: equal waits stay in insertion order.
        movers.sort_by(|a, b| {
            let wait_a = self.wait_times.get(a.borrow().id()).copied().unwrap_or(0);
            let wait_b = self.wait_times.get(b.borrow().id()).copied().unwrap_or(0);
            wait_b.cmp(&wait_a)
        });

        movers.truncate(self.capacity(current_direction));

        for id in self.cars.keys() {
            if let Some(wait) = self.wait_times.get_mut(id) {
                *wait += 1;
            }
        }

        (current_direction, movers)
    }

    /// Per-tick movement capacity for the given green direction.
    pub fn capacity(&self, direction: Direction) -> usize {
        let on_highway = match direction {
            Direction::Horizontal => self.is_horizontal_highway,
            Direction::Vertical => self.is_vertical_highway,
        };
        if on_highway {
            HIGHWAY_JUNCTION_LIMIT
        } else {
            REGULAR_JUNCTION_LIMIT
        }
    }

    /// Cars currently queued at the junction, in insertion order.
    pub fn cars(&self) -> &IndexMap<CarID, CarRef> {
        &self.cars
    }

    /// Number of cars currently queued at the junction.
    pub fn cars_amount(&self) -> usize {
        self.cars.len()
    }

    /// Accumulated wait counters, including entries of departed cars.
    pub fn wait_times(&self) -> &IndexMap<CarID, u32> {
        &self.wait_times
    }

    /// Sum of all accumulated wait counters at this junction.
    pub fn total_wait_time(&self) -> u64 {
        self.wait_times.values().map(|&w| w as u64).sum()
    }

    /// Sum of squared wait counters at this junction.
    pub fn wait_time_punishment(&self) -> f64 {
        self.wait_times
            .values()
            .map(|&w| (w as f64) * (w as f64))
            .sum()
    }

    /// Counts queued cars whose own next step goes in `direction`.
    pub fn cars_in_direction(&self, direction: Direction) -> usize {
        self.cars
            .values()
            .filter(|car| car.borrow().current_direction() == direction)
            .count()
    }

    /// Clears all cars and wait counters.
    pub fn reset(&mut self) {
        self.cars.clear();
        self.wait_times.clear();
    }

    /// Clones the junction's layout and wait history onto a fresh light
    /// handle, without any cars. Used when forking a neighborhood.
    pub(crate) fn clone_with_light(&self, traffic_light: TrafficLightRef) -> Junction {
        Junction {
            traffic_light,
            cars: IndexMap::new(),
            wait_times: self.wait_times.clone(),
            is_horizontal_highway: self.is_horizontal_highway,
            is_vertical_highway: self.is_vertical_highway,
        }
    }
}
