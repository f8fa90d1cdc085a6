//! Simulcast layer selection and frame-delay/clock-recovery calculation.

pub mod error;
pub mod frame_delay;
pub mod listener;

pub use error::{Result, SimulcastError};
pub use frame_delay::{FrameDelayCalculator, FrameDelayConfig};
pub use listener::{SimulcastConfig, SimulcastMediaFrameListener};
