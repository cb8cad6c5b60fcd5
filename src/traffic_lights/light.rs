use crate::geom::Direction;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a traffic light.
///
/// Lights are referenced from three places at once (the owning city, the
/// junction that reads them, and the traffic system that writes them), so
/// they live behind `Rc<RefCell<_>>`.
pub type TrafficLightRef = Rc<RefCell<TrafficLight>>;

/// Represents a single two-state traffic light at a junction.
///
/// The light holds the direction that is currently green. Lights start
/// horizontal and are rewritten wholesale every tick by
/// [`TrafficSystem::apply`](crate::traffic_lights::TrafficSystem::apply).
#[derive(Debug, Clone)]
pub struct TrafficLight {
    /// Direction that is currently green.
    direction: Direction,
}

impl TrafficLight {
    /// Creates a new traffic light with the default horizontal direction.
    ///
    /// # Example
    ///
    /// ```
    /// use traffic_phase_optim::geom::Direction;
    /// use traffic_phase_optim::traffic_lights::TrafficLight;
    /// let light = TrafficLight::new();
    /// assert_eq!(light.get_direction(), Direction::Horizontal);
    /// ```
    pub fn new() -> Self {
        TrafficLight {
            direction: Direction::Horizontal,
        }
    }

    /// Creates a new shared handle to a default traffic light.
    pub fn new_ref() -> TrafficLightRef {
        Rc::new(RefCell::new(TrafficLight::new()))
    }

    /// Returns the direction that is currently green.
    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    /// Sets the green direction.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }
}

impl Default for TrafficLight {
    fn default() -> Self {
        TrafficLight::new()
    }
}

/// Builds an `n` × `m` matrix of fresh traffic light handles, all
/// defaulting to horizontal.
///
/// # Example
///
/// ```
/// use traffic_phase_optim::traffic_lights::new_light_matrix;
/// let lights = new_light_matrix(3, 4);
/// assert_eq!(lights.len(), 3);
/// assert_eq!(lights[0].len(), 4);
/// ```
pub fn new_light_matrix(n: usize, m: usize) -> Vec<Vec<TrafficLightRef>> {
    (0..n)
        .map(|_| (0..m).map(|_| TrafficLight::new_ref()).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_direction() {
        let light = TrafficLight::new();
        assert_eq!(light.get_direction(), Direction::Horizontal);
    }

    #[test]
    fn test_set_direction() {
        let light = TrafficLight::new_ref();
        light.borrow_mut().set_direction(Direction::Vertical);
        assert_eq!(light.borrow().get_direction(), Direction::Vertical);
    }
}
