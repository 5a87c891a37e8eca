//! Temperature unit handling. Everything is stored in Celsius; visitors may
//! submit and view in either unit.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => value,
            TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        }
    }

    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Render a Celsius value in this unit with one decimal, e.g. `"203.0°F"`.
    pub fn format(self, celsius: f64) -> String {
        format!("{:.1}{}", self.from_celsius(celsius), self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_known_points() {
        let f = TemperatureUnit::Fahrenheit;
        assert_eq!(f.from_celsius(100.0), 212.0);
        assert_eq!(f.to_celsius(212.0), 100.0);
        assert_eq!(f.to_celsius(32.0), 0.0);
        assert_eq!(TemperatureUnit::Celsius.to_celsius(95.0), 95.0);
    }

    #[test]
    fn formats_with_one_decimal() {
        assert_eq!(TemperatureUnit::Celsius.format(7.0), "7.0°C");
        assert_eq!(TemperatureUnit::Fahrenheit.format(95.0), "203.0°F");
    }
}
