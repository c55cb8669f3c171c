use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Boarding time preselected in the passenger form.
pub const DEFAULT_BOARDING_TIME: (u32, u32) = (7, 30);

pub fn default_boarding_time() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_BOARDING_TIME.0, DEFAULT_BOARDING_TIME.1, 0)
        .unwrap_or(NaiveTime::MIN)
}

/// A registered ride request. Only lives in the session that created it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassengerRequest {
    pub name: String,
    /// Origin stop name
    pub start: String,
    /// Destination stop name
    pub end: String,
    #[serde(with = "hh_mm")]
    pub time: NaiveTime,
}

/// Raw form input, before any validation.
///
/// Shared between the HTML form (`application/x-www-form-urlencoded`) and the JSON API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PassengerForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    /// `HH:MM`, falls back to the form default when absent or blank
    #[serde(default)]
    pub time: Option<String>,
}

/// `HH:MM` (de)serialization for times of day.
///
/// Browsers send `HH:MM` from `<input type="time">`, some also append seconds.
pub mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(s: &str) -> Result<NaiveTime, chrono::ParseError> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, FORMAT).or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
    }

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_times() {
        assert_eq!(
            hh_mm::parse("07:30").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert_eq!(
            hh_mm::parse(" 18:05:00 ").unwrap(),
            NaiveTime::from_hms_opt(18, 5, 0).unwrap()
        );
        assert!(hh_mm::parse("7h30").is_err());
    }

    #[test]
    fn serializes_time_as_hh_mm() {
        let p = PassengerRequest {
            name: "Jihoon".to_string(),
            start: "StopA".to_string(),
            end: "StopB".to_string(),
            time: default_boarding_time(),
        };

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["time"], "07:30");
        assert_eq!(json["start"], "StopA");
    }
}
