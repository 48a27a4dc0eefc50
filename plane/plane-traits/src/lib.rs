pub mod mapping;

pub use mapping::{AxisMapping, Inversion, SharedMapping};

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{EnumIter, EnumString};
use thiserror::Error;

// --- Basic Types ---

/// One of the three attitude channels reported by the sensor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, strum_macros::Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Pitch,
    Roll,
    Yaw,
}

/// Orientation in degrees. No wraparound is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl Orientation {
    pub fn new(pitch: f64, roll: f64, yaw: f64) -> Self {
        Orientation { pitch, roll, yaw }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Pitch => self.pitch,
            Channel::Roll => self.roll,
            Channel::Yaw => self.yaw,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pitch={:.1}°\nRoll={:.1}°\nYaw={:.1}°",
            self.pitch, self.roll, self.yaw
        )
    }
}

/// A parsed frame as received and after axis mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    pub raw: Orientation,
    pub mapped: Orientation,
}

/// Messages handed from a reader thread to the foreground.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Sample(Sample),
    /// The reader stopped on its own (stream closed or I/O failure).
    Disconnected(String),
}

// --- Standard Error Type ---
#[derive(Debug, Error)]
pub enum PlaneError {
    /// Error opening or configuring the serial port
    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),
    /// Error reading from or writing to the device
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No port selected!")]
    NoPortSelected,
    #[error("Not connected to the sensor!")]
    NotConnected,
    /// Mapping text could not be parsed
    #[error("Invalid axis mapping: {0}")]
    InvalidMapping(String),
    /// Error related to multithreading locks (e.g., poisoned)
    #[error("Lock error: {0}")]
    LockError(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),
}

impl<T> From<std::sync::PoisonError<T>> for PlaneError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        PlaneError::LockError(format!("Lock poisoned: {}", err))
    }
}

pub trait AttitudeReader {
    /// Takes every event queued since the last call, oldest first.
    fn drain(&self) -> Vec<LinkEvent>;

    /// Asks the sensor to start its calibration routine.
    fn calibrate(&self) -> Result<(), PlaneError>;

    fn stop(&self) -> Result<(), PlaneError>;

    fn is_running(&self) -> bool;
}
