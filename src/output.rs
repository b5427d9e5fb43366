use anyhow::Result;
use serde_json::{Map, Value, json};
use shed_lib::Reading;
use shed_lib::points::{Point, RELAY_POINT};

/// Writes readings to stdout, either as `name = value` lines or one JSON
/// object per reading.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn reading(&self, reading: &Reading, points: &[Point]) -> Result<()> {
        if self.json {
            let mut values = Map::new();
            for point in points {
                values.insert(point.name.to_string(), serde_json::to_value(&point.value)?);
            }
            let line = json!({
                "kind": reading.kind().as_char().to_string(),
                "points": Value::Object(values),
            });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            println!("# {}", reading);
            for point in points {
                println!("{}", point);
            }
        }
        Ok(())
    }
}

/// Suppresses `state.relay` unless it differs from the last published value.
#[derive(Debug, Default)]
pub struct RelayTracker {
    last: Option<bool>,
}

impl RelayTracker {
    pub fn filter(&mut self, reading: &Reading) -> Vec<Point> {
        let mut points = reading.points();
        if let Reading::Info(info) = reading {
            if self.last == Some(info.relay) {
                points.retain(|p| p.name != RELAY_POINT);
            } else {
                self.last = Some(info.relay);
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shed_lib::decode_packet;

    fn info(flags: u16) -> Reading {
        let mut bytes = vec![40, b'E'];
        bytes.extend_from_slice(&flags.to_le_bytes());
        bytes.resize(40, 0);
        decode_packet(&bytes).unwrap()
    }

    fn has_relay(points: &[Point]) -> bool {
        points.iter().any(|p| p.name == RELAY_POINT)
    }

    #[test]
    fn test_relay_only_published_on_change() {
        let mut tracker = RelayTracker::default();
        assert!(has_relay(&tracker.filter(&info(1))));
        assert!(!has_relay(&tracker.filter(&info(1))));
        assert!(!has_relay(&tracker.filter(&info(3))));
        assert!(has_relay(&tracker.filter(&info(0))));
        assert!(has_relay(&tracker.filter(&info(1))));
    }

    #[test]
    fn test_other_kinds_pass_through() {
        let mut tracker = RelayTracker::default();
        let mut bytes = vec![34, b'c'];
        bytes.resize(34, 0);
        let counters = decode_packet(&bytes).unwrap();
        assert_eq!(tracker.filter(&counters).len(), 8);
        // Counters do not reset the relay edge detection
        assert!(has_relay(&tracker.filter(&info(0))));
        assert!(!has_relay(&tracker.filter(&info(0))));
    }
}
