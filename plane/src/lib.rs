pub mod config;
pub mod controller;
pub mod display;
pub mod geometry;
pub mod rotation;
pub mod scene;

pub use config::{Overrides, ViewerConfig};
pub use controller::{Command, ConnectionState, Controller};
pub use display::{DisplaySink, TerminalSink, Update};
pub use geometry::{Component, Model, Point, Shape};
pub use plane_traits::{AttitudeReader, AxisMapping, Channel, Inversion, LinkEvent, Orientation, PlaneError, Sample};
pub use rotation::Rotation;
pub use scene::{PosedComponent, PosedModel, Scene};
