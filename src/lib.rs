//! Frame-rate monitor and adaptive degradation controller.
//!
//! The host render loop calls [`PerformanceMonitor::update`] once per
//! frame. The monitor derives FPS from the call cadence and, with
//! hysteresis, decides whether collaborating subsystems should shed load.

pub mod config;
pub mod degradation;
pub mod error;
pub mod fps_history;
pub mod frame_sampler;
pub mod logging;
pub mod monitor;
pub mod stats;

pub use config::{ConfigManager, ConfigUpdate, MonitorConfig};
pub use degradation::{DegradationController, DegradationPhase, Transition};
pub use error::{ConfigError, LoggingError};
pub use fps_history::{FpsHistory, DEFAULT_FPS};
pub use frame_sampler::{FrameSampler, SAMPLE_WINDOW};
pub use monitor::{DegradationState, MonitorCallbacks, PerformanceMonitor};
pub use stats::TransitionStats;
