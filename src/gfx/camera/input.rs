//! Host-independent pointer input routed to the orbit controller

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(PointerButton),
    PointerUp(PointerButton),
    /// Pointer motion in logical pixels since the previous move
    PointerMove { dx: f32, dy: f32 },
    /// Wheel motion; negative scrolls up (zoom in), positive scrolls down (zoom out)
    Wheel { delta_y: f32 },
}

impl InputEvent {
    /// Translates a winit wheel delta, treating one line as one notch
    pub fn from_wheel(delta: &winit::event::MouseScrollDelta) -> Self {
        let delta_y = match delta {
            winit::event::MouseScrollDelta::LineDelta(_, lines) => -*lines,
            winit::event::MouseScrollDelta::PixelDelta(position) => -position.y as f32,
        };
        Self::Wheel { delta_y }
    }
}

impl PointerButton {
    pub fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        match button {
            winit::event::MouseButton::Left => Some(Self::Primary),
            winit::event::MouseButton::Right => Some(Self::Secondary),
            winit::event::MouseButton::Middle => Some(Self::Middle),
            _ => None,
        }
    }
}
