//! Flattening of readings into the named points a host publishes.
//!
//! Point names follow the `<group>.<field>` tree used by the home-automation
//! adapter the controller was built for (`state.*`, `counter.*`, `persist.*`).

use crate::reading::{CountersReading, InfoReading, PersistedReading, Reading};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PointValue {
    Bool(bool),
    Number(f64),
    Counter(u64),
    Text(String),
}

impl fmt::Display for PointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointValue::Bool(v) => write!(f, "{}", v),
            PointValue::Number(v) => write!(f, "{:.2}", v),
            PointValue::Counter(v) => write!(f, "{}", v),
            PointValue::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// A single named value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub name: &'static str,
    pub value: PointValue,
}

impl Point {
    fn new(name: &'static str, value: PointValue) -> Self {
        Self { name, value }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

pub const RELAY_POINT: &str = "state.relay";

impl InfoReading {
    pub fn points(&self) -> Vec<Point> {
        use PointValue::{Bool, Counter, Number};
        vec![
            Point::new(RELAY_POINT, Bool(self.relay)),
            Point::new("state.flags", Counter(self.flags.into())),
            Point::new("state.insideTemp", Number(self.inside_temp.into())),
            Point::new("state.pressure", Number(self.pressure.into())),
            Point::new("state.humidity", Number(self.humidity.into())),
            Point::new("state.outsideTemp", Number(self.outside_temp.into())),
            Point::new("state.light", Number(self.light.into())),
            Point::new("state.lightOn", Bool(self.light_on)),
            Point::new("state.laserInletTemp", Number(self.laser_inlet_temp.into())),
            Point::new("state.laserOutletTemp", Number(self.laser_outlet_temp.into())),
            Point::new("state.laserTubeTemp", Number(self.laser_tube_temp.into())),
            Point::new("state.laserCaseTemp", Number(self.laser_case_temp.into())),
        ]
    }
}

impl CountersReading {
    pub fn points(&self) -> Vec<Point> {
        use PointValue::Counter;
        vec![
            Point::new("counter.goodpackets", Counter(self.good_packets.into())),
            Point::new("counter.junk", Counter(self.junk.into())),
            Point::new("counter.csumerrs", Counter(self.checksum_errors.into())),
            Point::new("counter.linklost", Counter(self.link_lost.into())),
            Point::new("counter.overflows", Counter(self.overflows.into())),
            Point::new("counter.eth_packets", Counter(self.eth_packets.into())),
            Point::new("counter.relay_operations", Counter(self.relay_operations.into())),
            Point::new("counter.restarts", Counter(self.restarts.into())),
        ]
    }
}

impl PersistedReading {
    pub fn points(&self) -> Vec<Point> {
        use PointValue::{Counter, Text};
        vec![
            Point::new("persist.restarts", Counter(self.restarts.into())),
            Point::new("persist.exceptions", Counter(self.exceptions.into())),
            Point::new("persist.exc_addr", Counter(self.exception_address.into())),
            Point::new("persist.exc_type", Counter(self.exception_type.into())),
            Point::new("persist.exc_task", Text(self.exception_task.clone())),
        ]
    }
}

impl Reading {
    pub fn points(&self) -> Vec<Point> {
        match self {
            Reading::Info(r) => r.points(),
            Reading::Counters(r) => r.points(),
            Reading::Persisted(r) => r.points(),
        }
    }
}
