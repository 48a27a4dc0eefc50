use crate::{Channel, Orientation, PlaneError};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

bitflags! {
    /// Output channels whose value is negated after selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Inversion: u8 {
        const PITCH = 0x01;
        const ROLL = 0x02;
        const YAW = 0x04;
    }
}

impl Inversion {
    pub fn for_channel(channel: Channel) -> Self {
        match channel {
            Channel::Pitch => Inversion::PITCH,
            Channel::Roll => Inversion::ROLL,
            Channel::Yaw => Inversion::YAW,
        }
    }
}

impl Default for Inversion {
    fn default() -> Self {
        Inversion::empty()
    }
}

/// Chooses, for each output channel, which raw channel feeds it and whether
/// the value is negated. Two outputs may read the same raw channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisMapping {
    pub pitch: Channel,
    pub roll: Channel,
    pub yaw: Channel,
    pub invert: Inversion,
}

/// Mapping shared between the foreground and a reader thread.
pub type SharedMapping = Arc<RwLock<AxisMapping>>;

impl Default for AxisMapping {
    fn default() -> Self {
        AxisMapping {
            pitch: Channel::Pitch,
            roll: Channel::Roll,
            yaw: Channel::Yaw,
            invert: Inversion::empty(),
        }
    }
}

impl AxisMapping {
    pub fn shared(self) -> SharedMapping {
        Arc::new(RwLock::new(self))
    }

    pub fn source(&self, output: Channel) -> Channel {
        match output {
            Channel::Pitch => self.pitch,
            Channel::Roll => self.roll,
            Channel::Yaw => self.yaw,
        }
    }

    pub fn is_inverted(&self, output: Channel) -> bool {
        self.invert.contains(Inversion::for_channel(output))
    }

    fn resolve(&self, raw: &Orientation, output: Channel) -> f64 {
        let value = raw.get(self.source(output));
        if self.is_inverted(output) {
            -value
        } else {
            value
        }
    }

    pub fn apply(&self, raw: &Orientation) -> Orientation {
        Orientation {
            pitch: self.resolve(raw, Channel::Pitch),
            roll: self.resolve(raw, Channel::Roll),
            yaw: self.resolve(raw, Channel::Yaw),
        }
    }

    /// Multi-line summary shown after the mapping is applied.
    pub fn summary(&self) -> String {
        [Channel::Pitch, Channel::Roll, Channel::Yaw]
            .iter()
            .map(|&output| {
                let label = match output {
                    Channel::Pitch => "Pitch",
                    Channel::Roll => "Roll",
                    Channel::Yaw => "Yaw",
                };
                let marker = if self.is_inverted(output) { " (inverted)" } else { "" };
                format!("{}: {}{}", label, self.source(output), marker)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for AxisMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [Channel::Pitch, Channel::Roll, Channel::Yaw]
            .iter()
            .map(|&output| {
                let sign = if self.is_inverted(output) { "-" } else { "" };
                format!("{}{}", sign, self.source(output))
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Parses `"<src>,<src>,<src>"` for outputs pitch, roll, yaw; a leading `-`
/// inverts that output, e.g. `roll,-pitch,yaw`.
impl FromStr for AxisMapping {
    type Err = PlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(PlaneError::InvalidMapping(format!(
                "expected three channels, got {:?}",
                s
            )));
        }

        let mut sources = [Channel::Pitch; 3];
        let mut invert = Inversion::empty();
        let outputs = [Channel::Pitch, Channel::Roll, Channel::Yaw];

        for (i, part) in parts.iter().enumerate() {
            let (negated, name) = match part.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, *part),
            };
            sources[i] = Channel::from_str(name)
                .map_err(|_| PlaneError::InvalidMapping(format!("unknown channel {:?}", name)))?;
            if negated {
                invert |= Inversion::for_channel(outputs[i]);
            }
        }

        Ok(AxisMapping {
            pitch: sources[0],
            roll: sources[1],
            yaw: sources[2],
            invert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn all_mappings() -> Vec<AxisMapping> {
        let mut out = Vec::new();
        for pitch in Channel::iter() {
            for roll in Channel::iter() {
                for yaw in Channel::iter() {
                    for bits in 0..8u8 {
                        out.push(AxisMapping {
                            pitch,
                            roll,
                            yaw,
                            invert: Inversion::from_bits_truncate(bits),
                        });
                    }
                }
            }
        }
        out
    }

    #[test]
    fn default_is_identity() {
        let raw = Orientation::new(12.5, -3.0, 270.0);
        assert_eq!(AxisMapping::default().apply(&raw), raw);
    }

    #[test]
    fn each_output_is_signed_selection_of_its_source() {
        let raw = Orientation::new(1.25, -7.5, 42.0);
        for mapping in all_mappings() {
            let mapped = mapping.apply(&raw);
            for output in Channel::iter() {
                let expected = raw.get(mapping.source(output));
                let expected = if mapping.is_inverted(output) { -expected } else { expected };
                assert_eq!(mapped.get(output), expected, "{} -> {:?}", mapping, output);
            }
        }
    }

    #[test]
    fn output_ignores_other_channels_configuration() {
        let raw = Orientation::new(5.0, 6.0, 7.0);
        let base = AxisMapping {
            pitch: Channel::Yaw,
            roll: Channel::Roll,
            yaw: Channel::Pitch,
            invert: Inversion::PITCH,
        };
        let other = AxisMapping {
            roll: Channel::Pitch,
            yaw: Channel::Yaw,
            invert: Inversion::PITCH | Inversion::ROLL | Inversion::YAW,
            ..base
        };
        assert_eq!(base.apply(&raw).pitch, -7.0);
        assert_eq!(other.apply(&raw).pitch, -7.0);
    }

    #[test]
    fn non_bijective_mapping_is_allowed() {
        let mapping: AxisMapping = "roll,roll,-roll".parse().unwrap();
        let mapped = mapping.apply(&Orientation::new(1.0, 2.0, 3.0));
        assert_eq!(mapped, Orientation::new(2.0, 2.0, -2.0));
    }

    #[test]
    fn parses_text_form() {
        let mapping: AxisMapping = " roll , -pitch,yaw".parse().unwrap();
        assert_eq!(mapping.pitch, Channel::Roll);
        assert_eq!(mapping.roll, Channel::Pitch);
        assert_eq!(mapping.yaw, Channel::Yaw);
        assert_eq!(mapping.invert, Inversion::ROLL);
        assert_eq!(mapping.to_string(), "roll,-pitch,yaw");
    }

    #[test]
    fn rejects_bad_text() {
        assert!("pitch,roll".parse::<AxisMapping>().is_err());
        assert!("pitch,roll,heading".parse::<AxisMapping>().is_err());
        assert!("pitch,roll,yaw,pitch".parse::<AxisMapping>().is_err());
    }

    #[test]
    fn summary_marks_inverted_outputs() {
        let mapping: AxisMapping = "pitch,-yaw,roll".parse().unwrap();
        assert_eq!(
            mapping.summary(),
            "Pitch: pitch\nRoll: yaw (inverted)\nYaw: roll"
        );
    }

    #[test]
    fn deserializes_from_toml() {
        let mapping: AxisMapping = toml::from_str(
            r#"
            pitch = "roll"
            invert = "PITCH | YAW"
            "#,
        )
        .unwrap();
        assert_eq!(mapping.pitch, Channel::Roll);
        assert_eq!(mapping.roll, Channel::Roll);
        assert_eq!(mapping.yaw, Channel::Yaw);
        assert_eq!(mapping.invert, Inversion::PITCH | Inversion::YAW);
    }
}
