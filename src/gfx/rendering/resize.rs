//! Viewport resize handling
//!
//! Each event is applied synchronously: rig aspect first, then the output surface. There is
//! no debouncing, so a burst of events produces one surface resize per event.

use crate::gfx::{camera::camera_rig::CameraRig, rendering::backend::RenderBackend};

/// Viewport dimensions in logical pixels plus the device pixel density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
    pub pixel_density: f64,
}

impl ViewportSize {
    pub fn new(width: f64, height: f64, pixel_density: f64) -> Self {
        Self {
            width,
            height,
            pixel_density,
        }
    }

    /// Builds a logical size from a physical one reported by the windowing system
    pub fn from_physical(width: u32, height: u32, pixel_density: f64) -> Self {
        let density = if pixel_density > 0.0 { pixel_density } else { 1.0 };
        Self::new(width as f64 / density, height as f64 / density, density)
    }

    pub fn aspect(&self) -> f32 {
        (self.width / self.height) as f32
    }

    /// Output surface size: logical size scaled by pixel density
    pub fn physical(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_density).round() as u32,
            (self.height * self.pixel_density).round() as u32,
        )
    }

    /// Minimized windows report zero; nothing can be drawn at that size
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0 && self.pixel_density > 0.0)
    }
}

#[derive(Debug, Default)]
pub struct ResizeCoordinator {
    registered: bool,
    last: Option<ViewportSize>,
}

impl ResizeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) {
        self.registered = true;
    }

    /// Removes the listener; later events are ignored
    pub fn unregister(&mut self) {
        self.registered = false;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn last_size(&self) -> Option<ViewportSize> {
        self.last
    }

    /// Applies one size-change event; returns whether anything changed
    pub fn handle<B: RenderBackend + ?Sized>(
        &mut self,
        size: ViewportSize,
        rig: &mut CameraRig,
        renderer: &mut B,
    ) -> bool {
        if !self.registered {
            return false;
        }
        if size.is_empty() {
            log::debug!("Ignoring empty viewport {}x{}", size.width, size.height);
            return false;
        }

        rig.set_aspect(size.aspect());
        let (width, height) = size.physical();
        renderer.resize(width, height);
        self.last = Some(size);

        log::debug!(
            "Viewport resized to {}x{} (x{})",
            size.width,
            size.height,
            size.pixel_density
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{CameraConfig, RendererSettings},
        gfx::rendering::headless::{HeadlessBackend, HeadlessSurface},
    };

    fn setup() -> (ResizeCoordinator, CameraRig, HeadlessBackend, HeadlessSurface) {
        let surface = HeadlessSurface::new(1);
        let backend =
            HeadlessBackend::create(surface.clone(), (100, 100), &RendererSettings::default())
                .unwrap();
        let rig = CameraRig::new(&CameraConfig::default(), 1.0);
        let mut coordinator = ResizeCoordinator::new();
        coordinator.register();
        (coordinator, rig, backend, surface)
    }

    #[test]
    fn test_resize_updates_aspect_and_surface() {
        let (mut coordinator, mut rig, mut backend, surface) = setup();

        assert!(coordinator.handle(ViewportSize::new(1024.0, 768.0, 2.0), &mut rig, &mut backend));

        assert_eq!(rig.aspect(), (1024.0f64 / 768.0) as f32);
        assert!(rig.is_projection_dirty());
        assert_eq!(surface.journal().resizes(), vec![(2048, 1536)]);
    }

    #[test]
    fn test_each_event_applied_once() {
        let (mut coordinator, mut rig, mut backend, surface) = setup();
        for width in [800.0, 801.0, 802.0] {
            coordinator.handle(ViewportSize::new(width, 600.0, 1.0), &mut rig, &mut backend);
        }
        assert_eq!(
            surface.journal().resizes(),
            vec![(800, 600), (801, 600), (802, 600)]
        );
        assert_eq!(backend.surface_size(), (802, 600));
    }

    #[test]
    fn test_unregistered_and_empty_events_ignored() {
        let (mut coordinator, mut rig, mut backend, surface) = setup();
        assert!(!coordinator.handle(ViewportSize::new(0.0, 600.0, 1.0), &mut rig, &mut backend));

        coordinator.unregister();
        assert!(!coordinator.handle(ViewportSize::new(640.0, 480.0, 1.0), &mut rig, &mut backend));
        assert!(surface.journal().resizes().is_empty());
        assert_eq!(rig.aspect(), 1.0);
    }

    #[test]
    fn test_physical_round_trip() {
        let size = ViewportSize::from_physical(1921, 1081, 1.5);
        assert_eq!(size.physical(), (1921, 1081));
    }
}
