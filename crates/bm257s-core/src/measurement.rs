//! Interpretation of a decoded frame as a physical reading.

use bm257s_decode::{frame::parse_reading, DecodeError, Frame, Symbol};
use serde::Serialize;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("neither AC nor DC is shown")]
    MissingCurrentKind,
    #[error("unsupported display mode (symbols: {0})")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Prefix {
    None,
    Nano,
    Micro,
    Milli,
    Kilo,
    Mega,
}

impl Prefix {
    fn from_frame(frame: &Frame) -> Self {
        if frame.has(Symbol::Kilo) {
            Prefix::Kilo
        } else if frame.has(Symbol::Mega) {
            Prefix::Mega
        } else if frame.has(Symbol::Milli) {
            Prefix::Milli
        } else if frame.has(Symbol::Micro) {
            Prefix::Micro
        } else if frame.has(Symbol::Nano) {
            Prefix::Nano
        } else {
            Prefix::None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prefix::None => "",
            Prefix::Nano => "n",
            Prefix::Micro => "µ",
            Prefix::Milli => "m",
            Prefix::Kilo => "k",
            Prefix::Mega => "M",
        }
    }

    pub fn factor(&self) -> f64 {
        match self {
            Prefix::None => 1.0,
            Prefix::Nano => 1e-9,
            Prefix::Micro => 1e-6,
            Prefix::Milli => 1e-3,
            Prefix::Kilo => 1e3,
            Prefix::Mega => 1e6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentKind {
    Ac,
    Dc,
}

impl CurrentKind {
    fn from_frame(frame: &Frame) -> Result<Self, ClassifyError> {
        if frame.has(Symbol::Ac) {
            Ok(CurrentKind::Ac)
        } else if frame.has(Symbol::Dc) {
            Ok(CurrentKind::Dc)
        } else {
            Err(ClassifyError::MissingCurrentKind)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

/// A reading as the meter presents it. `value` is `None` when the display
/// shows no number, e.g. on overload or with no sensor connected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    Voltage {
        value: Option<f64>,
        current: CurrentKind,
        prefix: Prefix,
    },
    Current {
        value: Option<f64>,
        current: CurrentKind,
        prefix: Prefix,
    },
    Resistance {
        value: Option<f64>,
        prefix: Prefix,
    },
    Temperature {
        value: Option<f64>,
        unit: TemperatureUnit,
    },
}

impl Measurement {
    pub fn from_frame(frame: &Frame) -> Result<Self, ClassifyError> {
        let prefix = Prefix::from_frame(frame);

        if frame.has(Symbol::Volt) {
            return Ok(Measurement::Voltage {
                value: frame.value()?,
                current: CurrentKind::from_frame(frame)?,
                prefix,
            });
        }
        if frame.has(Symbol::Ampere) {
            return Ok(Measurement::Current {
                value: frame.value()?,
                current: CurrentKind::from_frame(frame)?,
                prefix,
            });
        }
        if frame.has(Symbol::Ohm) {
            return Ok(Measurement::Resistance {
                value: frame.value()?,
                prefix,
            });
        }

        let digits: Vec<char> = frame.segment_string()?.chars().collect();
        let unit = match digits.last() {
            Some('C') => Some(TemperatureUnit::Celsius),
            Some('F') => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        };
        let status_only = frame.symbols().iter().all(is_status_indicator);
        if let (Some(unit), true) = (unit, status_only) {
            let reading: String = digits[..digits.len() - 1].iter().collect();
            return Ok(Measurement::Temperature {
                value: parse_reading(&reading, frame.sign()),
                unit,
            });
        }

        let symbols: Vec<&str> = frame.symbols().iter().map(Symbol::as_str).collect();
        Err(ClassifyError::Unsupported(symbols.join(" ")))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Measurement::Voltage { value, .. }
            | Measurement::Current { value, .. }
            | Measurement::Resistance { value, .. }
            | Measurement::Temperature { value, .. } => *value,
        }
    }

    /// Value in base units (volts, amperes, ohms, degrees).
    pub fn base_value(&self) -> Option<f64> {
        let factor = match self {
            Measurement::Voltage { prefix, .. }
            | Measurement::Current { prefix, .. }
            | Measurement::Resistance { prefix, .. } => prefix.factor(),
            Measurement::Temperature { .. } => 1.0,
        };
        self.value().map(|v| v * factor)
    }
}

/// Symbols that say nothing about the measured quantity.
fn is_status_indicator(symbol: &Symbol) -> bool {
    matches!(symbol, Symbol::Auto | Symbol::Hold | Symbol::Battery)
}

fn write_value(f: &mut fmt::Formatter<'_>, value: Option<f64>, missing: &str) -> fmt::Result {
    match value {
        Some(v) => write!(f, "{v}"),
        None => f.write_str(missing),
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Voltage {
                value,
                current,
                prefix,
            }
            | Measurement::Current {
                value,
                current,
                prefix,
            } => {
                let unit = if matches!(self, Measurement::Voltage { .. }) { "V" } else { "A" };
                let kind = match current {
                    CurrentKind::Ac => "AC",
                    CurrentKind::Dc => "DC",
                };
                write!(f, "{kind} ")?;
                write_value(f, *value, "OL")?;
                write!(f, " {}{unit}", prefix.as_str())
            }
            Measurement::Resistance { value, prefix } => {
                write_value(f, *value, "OL")?;
                write!(f, " {}Ohm", prefix.as_str())
            }
            Measurement::Temperature { value, unit } => {
                write_value(f, *value, "--")?;
                match unit {
                    TemperatureUnit::Celsius => f.write_str(" °C"),
                    TemperatureUnit::Fahrenheit => f.write_str(" °F"),
                }
            }
        }
    }
}
