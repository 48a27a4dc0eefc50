use crate::config::ViewerConfig;
use crate::display::{DisplaySink, Update};
use crate::scene::Scene;
use plane_traits::{AttitudeReader, AxisMapping, LinkEvent, PlaneError, SharedMapping};
use serial_attitude::{port, Link};
use std::str::FromStr;
use tracing::{info, warn};

pub const STATUS_DISCONNECTED: &str = "Disconnected";
pub const STATUS_CONNECTION_FAILED: &str = "Connection failed";
pub const STATUS_CALIBRATING: &str = "Calibrating... keep sensor flat and still";

pub enum ConnectionState {
    Disconnected,
    Connected(Box<dyn AttitudeReader>),
}

/// User actions typed into the viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Calibrate,
    Toggle,
    RefreshPorts,
    Map(AxisMapping),
    Quit,
}

impl FromStr for Command {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "c" | "calibrate" => Ok(Command::Calibrate),
            "t" | "toggle" => Ok(Command::Toggle),
            "r" | "refresh" => Ok(Command::RefreshPorts),
            "q" | "quit" => Ok(Command::Quit),
            _ => match s.strip_prefix("map ") {
                Some(mapping) => Ok(Command::Map(mapping.parse()?)),
                None => Err(PlaneError::UnknownCommand(s.to_string())),
            },
        }
    }
}

/// Owns the connection state, the shared axis mapping and the status line.
///
/// All methods run on the foreground thread; the reader thread only sees the
/// mapping and its own link.
pub struct Controller {
    config: ViewerConfig,
    state: ConnectionState,
    mapping: SharedMapping,
    port: Option<String>,
    scene: Scene,
    status: String,
}

impl Controller {
    pub fn new(config: ViewerConfig) -> Self {
        let mapping = config.mapping.shared();
        let port = config.port.clone();
        Controller {
            config,
            state: ConnectionState::Disconnected,
            mapping,
            port,
            scene: Scene::default(),
            status: STATUS_DISCONNECTED.to_string(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn select_port(&mut self, port: Option<String>) {
        self.port = port;
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn mapping(&self) -> Result<AxisMapping, PlaneError> {
        Ok(*self.mapping.read()?)
    }

    /// Lists host ports and selects the first one if nothing is selected yet.
    pub fn refresh_ports(&mut self) -> Result<Vec<String>, PlaneError> {
        let ports = port::available_ports()?;
        if self.port.as_deref().map_or(true, str::is_empty) {
            self.port = ports.first().cloned();
        }
        Ok(ports)
    }

    pub fn connect(&mut self) -> Result<(), PlaneError> {
        if self.is_connected() {
            return Ok(());
        }

        let port = self
            .port
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or(PlaneError::NoPortSelected)?;

        let settings = self.config.serial_settings(&port);
        match Link::open(&settings, self.mapping.clone(), self.config.link_options()) {
            Ok(link) => {
                self.attach(&port, Box::new(link));
                Ok(())
            }
            Err(e) => {
                warn!("Failed to connect to {}: {}", port, e);
                self.status = STATUS_CONNECTION_FAILED.to_string();
                Err(e)
            }
        }
    }

    /// Takes over an already running reader.
    pub fn attach(&mut self, name: &str, reader: Box<dyn AttitudeReader>) {
        self.disconnect();
        self.state = ConnectionState::Connected(reader);
        self.status = format!("Connected to {}", name);
    }

    pub fn disconnect(&mut self) {
        if let ConnectionState::Connected(reader) =
            std::mem::replace(&mut self.state, ConnectionState::Disconnected)
        {
            if let Err(e) = reader.stop() {
                warn!("Failed to stop reader: {}", e);
            }
            info!("Disconnected");
        }
        self.status = STATUS_DISCONNECTED.to_string();
    }

    pub fn toggle(&mut self) -> Result<(), PlaneError> {
        if self.is_connected() {
            self.disconnect();
            Ok(())
        } else {
            self.connect()
        }
    }

    pub fn calibrate(&mut self) -> Result<(), PlaneError> {
        match &self.state {
            ConnectionState::Connected(reader) => {
                reader.calibrate()?;
                self.status = STATUS_CALIBRATING.to_string();
                Ok(())
            }
            ConnectionState::Disconnected => Err(PlaneError::NotConnected),
        }
    }

    /// Replaces the mapping in one step; later frames use the new value.
    pub fn apply_mapping(&mut self, mapping: AxisMapping) -> Result<(), PlaneError> {
        *self.mapping.write()? = mapping;
        info!("Applied axis mapping {}", mapping);
        Ok(())
    }

    /// Drains the reader and poses the model for every sample, oldest first.
    pub fn tick(&mut self) -> Vec<Update> {
        let events = match &self.state {
            ConnectionState::Connected(reader) => reader.drain(),
            ConnectionState::Disconnected => return Vec::new(),
        };

        let mut updates = Vec::with_capacity(events.len());
        for event in events {
            match event {
                LinkEvent::Sample(sample) => updates.push(Update {
                    sample,
                    model: self.scene.pose(&sample.mapped),
                }),
                LinkEvent::Disconnected(reason) => {
                    self.disconnect();
                    self.status = format!("{}: {}", STATUS_DISCONNECTED, reason);
                }
            }
        }
        updates
    }

    /// Runs one user command. Returns false when the viewer should exit.
    pub fn execute(&mut self, command: Command, sink: &mut dyn DisplaySink) -> bool {
        let result = match command {
            Command::Quit => {
                self.disconnect();
                return false;
            }
            Command::Calibrate => self.calibrate().map_err(|e| ("Error", e)),
            Command::Toggle => self.toggle().map_err(|e| ("Connection Error", e)),
            Command::RefreshPorts => match self.refresh_ports() {
                Ok(ports) => {
                    sink.notice("Ports", &ports.join(", "));
                    Ok(())
                }
                Err(e) => Err(("Error", e)),
            },
            Command::Map(mapping) => match self.apply_mapping(mapping) {
                Ok(()) => {
                    sink.notice("Settings Updated", &format!("New settings applied:\n{}", mapping.summary()));
                    Ok(())
                }
                Err(e) => Err(("Error", e)),
            },
        };

        if let Err((title, e)) = result {
            sink.notice(title, &e.to_string());
        }
        sink.status(&self.status);
        true
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.disconnect();
    }
}
