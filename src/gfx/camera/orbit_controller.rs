use std::f32::consts::PI;

use cgmath::*;

use crate::config::ControlsConfig;

use super::camera_rig::CameraRig;
use super::input::{InputEvent, PointerButton};

/// Margin keeping polar bounds strictly inside (0, π)
const POLE_EPSILON: f32 = 1e-6;

/// Per-notch dolly scale at zoom speed 1
const ZOOM_STEP: f32 = 0.95;

/// Spherical coordinates of the camera around the orbit target.
///
/// `theta` is the azimuth around +Y measured from +Z, `phi` the polar angle from +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub theta: f32,
    pub phi: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius: 0.0,
                theta: 0.0,
                phi: PI / 2.0,
            };
        }
        Self {
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(self) -> Vector3<f32> {
        let sin_phi = self.phi.sin();
        Vector3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }
}

/// Distance and polar-angle limits of the orbit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitConstraints {
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar: f32,
    pub max_polar: f32,
}

impl OrbitConstraints {
    /// Sanitized limits: polar bounds inside (0, π), every min no larger than its max
    pub fn new(min_distance: f32, max_distance: f32, min_polar: f32, max_polar: f32) -> Self {
        let min_distance = min_distance.max(0.0);
        let max_distance = max_distance.max(min_distance);
        let min_polar = min_polar.clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let max_polar = max_polar.clamp(min_polar, PI - POLE_EPSILON);
        Self {
            min_distance,
            max_distance,
            min_polar,
            max_polar,
        }
    }

    fn clamp(&self, mut spherical: Spherical) -> Spherical {
        spherical.radius = spherical
            .radius
            .clamp(self.min_distance, self.max_distance);
        spherical.phi = spherical.phi.clamp(self.min_polar, self.max_polar);
        spherical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
}

/// Orbits the camera rig around a target under distance and polar constraints.
///
/// Input moves a goal position; every [`update`](OrbitController::update) moves the current
/// position `damping_factor` of the remaining way towards it. Panning and auto-rotation are
/// permanently off, so the target only changes through [`set_target`](OrbitController::set_target).
#[derive(Debug, Clone)]
pub struct OrbitController {
    constraints: OrbitConstraints,
    damping_factor: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    enable_pan: bool,
    auto_rotate: bool,
    target: Vector3<f32>,
    current: Spherical,
    goal: Spherical,
    drag: Option<DragMode>,
    disposed: bool,
}

impl OrbitController {
    /// Binds a controller to the rig's current pose
    pub fn new(config: &ControlsConfig, rig: &CameraRig) -> Self {
        if config.enable_pan || config.auto_rotate {
            log::warn!("Panning and auto-rotation are not supported; both stay disabled");
        }

        let constraints = OrbitConstraints::new(
            config.min_distance,
            config.max_distance,
            config.min_polar,
            config.max_polar,
        );
        let damping_factor = if config.damping_factor.is_finite() {
            config.damping_factor.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        };

        let start = constraints.clamp(Spherical::from_offset(rig.position() - rig.target()));

        Self {
            constraints,
            damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            enable_pan: false,
            auto_rotate: false,
            target: rig.target(),
            current: start,
            goal: start,
            drag: None,
            disposed: false,
        }
    }

    pub fn constraints(&self) -> &OrbitConstraints {
        &self.constraints
    }

    pub fn damping_factor(&self) -> f32 {
        self.damping_factor
    }

    pub fn is_pan_enabled(&self) -> bool {
        self.enable_pan
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.auto_rotate
    }

    pub fn target(&self) -> Vector3<f32> {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.current.radius
    }

    pub fn polar_angle(&self) -> f32 {
        self.current.phi
    }

    pub fn azimuth(&self) -> f32 {
        self.current.theta
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Applies one pointer or wheel event. `viewport_height` is in logical pixels.
    pub fn handle_input(&mut self, event: &InputEvent, viewport_height: f32) {
        if self.disposed {
            return;
        }

        match *event {
            InputEvent::PointerDown(PointerButton::Primary) => {
                self.drag = Some(DragMode::Rotate);
            }
            InputEvent::PointerDown(_) => {
                log::trace!("Ignoring pan gesture, panning is disabled");
            }
            InputEvent::PointerUp(_) => {
                self.drag = None;
            }
            InputEvent::PointerMove { dx, dy } => {
                if self.drag == Some(DragMode::Rotate) {
                    let height = viewport_height.max(1.0);
                    self.rotate_left(2.0 * PI * dx / height * self.rotate_speed);
                    self.rotate_up(2.0 * PI * dy / height * self.rotate_speed);
                }
            }
            InputEvent::Wheel { delta_y } => {
                let scale = ZOOM_STEP.powf(self.zoom_speed);
                if delta_y < 0.0 {
                    self.dolly(scale);
                } else if delta_y > 0.0 {
                    self.dolly(1.0 / scale);
                }
            }
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.goal.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.goal.phi = (self.goal.phi - angle)
            .clamp(self.constraints.min_polar, self.constraints.max_polar);
    }

    /// Scales the goal distance; factors below 1 move closer
    pub fn dolly(&mut self, factor: f32) {
        self.goal.radius = (self.goal.radius * factor)
            .clamp(self.constraints.min_distance, self.constraints.max_distance);
    }

    /// Raises the maximum distance; a lower value than the current maximum is ignored.
    ///
    /// Returns the maximum in effect afterwards.
    pub fn set_max_distance(&mut self, max_distance: f32) -> f32 {
        if max_distance > self.constraints.max_distance {
            self.constraints.max_distance = max_distance;
        }
        self.constraints.max_distance
    }

    /// Jumps to `distance` (clamped) without damping
    pub fn set_distance(&mut self, distance: f32) {
        let distance = distance.clamp(
            self.constraints.min_distance,
            self.constraints.max_distance,
        );
        self.current.radius = distance;
        self.goal.radius = distance;
    }

    /// Moves the orbit target
    pub fn set_target(&mut self, target: Vector3<f32>) {
        self.target = target;
    }

    /// Advances damping by one tick and writes the resulting pose into the rig.
    ///
    /// Returns whether the rig's pose changed.
    pub fn update(&mut self, rig: &mut CameraRig) -> bool {
        let d = self.damping_factor;
        self.current.radius += (self.goal.radius - self.current.radius) * d;
        self.current.theta += (self.goal.theta - self.current.theta) * d;
        self.current.phi += (self.goal.phi - self.current.phi) * d;

        self.current = self.constraints.clamp(self.current);
        self.goal = self.constraints.clamp(self.goal);

        let position = self.target + self.current.to_offset();
        let changed = position != rig.position() || self.target != rig.target();
        rig.set_pose(position, self.target);
        changed
    }

    /// Detaches from input; later events are ignored
    pub fn dispose(&mut self) {
        self.drag = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn setup() -> (OrbitController, CameraRig) {
        let rig = CameraRig::new(&CameraConfig::default(), 1.5);
        let controller = OrbitController::new(&ControlsConfig::default(), &rig);
        (controller, rig)
    }

    fn assert_within_bounds(controller: &OrbitController) {
        let c = controller.constraints();
        assert!(controller.distance() >= c.min_distance && controller.distance() <= c.max_distance);
        assert!(controller.polar_angle() >= c.min_polar && controller.polar_angle() <= c.max_polar);
    }

    #[test]
    fn test_starts_from_rig_pose() {
        let (controller, rig) = setup();
        assert!((controller.distance() - 5.0).abs() < 1e-5);
        assert!((controller.polar_angle() - PI / 2.0).abs() < 1e-5);
        assert_eq!(controller.target(), rig.target());
        assert!(!controller.is_pan_enabled());
        assert!(!controller.is_auto_rotating());
    }

    #[test]
    fn test_polar_bounds_stay_inside_poles() {
        let c = OrbitConstraints::new(1.0, 20.0, PI * 0.2, PI * 1.9);
        assert!(c.max_polar < PI);
        assert!(c.min_polar > 0.0);

        let c = OrbitConstraints::new(1.0, 20.0, -1.0, 0.5);
        assert!(c.min_polar > 0.0);
        assert!(c.max_polar >= c.min_polar);
    }

    #[test]
    fn test_damping_applies_five_percent_per_tick() {
        let (mut controller, mut rig) = setup();
        controller.dolly(2.0);

        controller.update(&mut rig);
        // 5 + (10 - 5) * 0.05
        assert!((controller.distance() - 5.25).abs() < 1e-4);

        for _ in 0..1000 {
            controller.update(&mut rig);
        }
        assert!((controller.distance() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_update_without_input_still_settles_motion() {
        let (mut controller, mut rig) = setup();
        controller.handle_input(&InputEvent::PointerDown(PointerButton::Primary), 800.0);
        controller.handle_input(&InputEvent::PointerMove { dx: 100.0, dy: 0.0 }, 800.0);
        controller.handle_input(&InputEvent::PointerUp(PointerButton::Primary), 800.0);

        let first = controller.update(&mut rig);
        let azimuth_after_first = controller.azimuth();
        let second = controller.update(&mut rig);

        assert!(first && second);
        assert!(controller.azimuth() < azimuth_after_first);
    }

    #[test]
    fn test_move_without_drag_does_nothing() {
        let (mut controller, mut rig) = setup();
        controller.update(&mut rig);
        let before = rig.position();

        controller.handle_input(&InputEvent::PointerMove { dx: 50.0, dy: 50.0 }, 800.0);
        for _ in 0..10 {
            controller.update(&mut rig);
        }
        assert!((rig.position() - before).magnitude() < 1e-5);
    }

    #[test]
    fn test_secondary_drag_does_not_pan() {
        let (mut controller, mut rig) = setup();
        let target = controller.target();

        controller.handle_input(&InputEvent::PointerDown(PointerButton::Secondary), 800.0);
        controller.handle_input(&InputEvent::PointerMove { dx: 40.0, dy: 40.0 }, 800.0);
        controller.update(&mut rig);

        assert_eq!(controller.target(), target);
        assert_eq!(rig.target(), target);
    }

    #[test]
    fn test_max_distance_never_decreases() {
        let (mut controller, _) = setup();
        assert_eq!(controller.set_max_distance(40.0), 40.0);
        assert_eq!(controller.set_max_distance(10.0), 40.0);
    }

    #[test]
    fn test_disposed_controller_ignores_input() {
        let (mut controller, mut rig) = setup();
        controller.dispose();
        controller.handle_input(&InputEvent::Wheel { delta_y: 1.0 }, 800.0);
        for _ in 0..100 {
            controller.update(&mut rig);
        }
        assert!((controller.distance() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_random_zoom_sequences_respect_distance_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let (mut controller, mut rig) = setup();
            let mut max_seen = controller.constraints().max_distance;

            for _ in 0..200 {
                match rng.random_range(0..4) {
                    0 => {
                        let delta = rng.random_range(-5.0..5.0);
                        controller.handle_input(&InputEvent::Wheel { delta_y: delta }, 800.0);
                    }
                    1 => {
                        let widened = rng.random_range(0.0..60.0);
                        let max = controller.set_max_distance(widened);
                        assert!(max >= max_seen);
                        max_seen = max;
                    }
                    _ => {
                        controller.update(&mut rig);
                        assert_within_bounds(&controller);
                    }
                }
            }
        }
    }

    #[test]
    fn test_random_vertical_drags_respect_polar_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let (mut controller, mut rig) = setup();
        controller.handle_input(&InputEvent::PointerDown(PointerButton::Primary), 600.0);

        for _ in 0..2000 {
            let dy = rng.random_range(-400.0..400.0);
            controller.handle_input(&InputEvent::PointerMove { dx: 0.0, dy }, 600.0);
            controller.update(&mut rig);
            assert_within_bounds(&controller);

            let offset = rig.position() - rig.target();
            assert!(offset.x.is_finite() && offset.y.is_finite() && offset.z.is_finite());
        }
    }
}
