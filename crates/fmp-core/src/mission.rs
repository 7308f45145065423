//! Mission data model produced by the parser and consumed by the compiler.

use serde::Serialize;

/// A coordinate as written in mission text. Geographic coordinates are
/// reprojected to the planar system before any geometric test runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "system", rename_all = "lowercase")]
pub enum Coordinate {
    Projected { x: f64, y: f64, z: f64, line: u32 },
    Geographic { lon: f64, lat: f64, z: f64, line: u32 },
}

impl Coordinate {
    /// 1-based source line the coordinate was parsed from.
    pub fn line(&self) -> u32 {
        match *self {
            Coordinate::Projected { line, .. } | Coordinate::Geographic { line, .. } => line,
        }
    }

    pub fn z(&self) -> f64 {
        match *self {
            Coordinate::Projected { z, .. } | Coordinate::Geographic { z, .. } => z,
        }
    }
}

/// One statement of the mission body. Consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Point { coordinate: Coordinate, line: u32 },
    Path { waypoints: Vec<Coordinate>, line: u32 },
    Dwell { seconds: f64, line: u32 },
    Surface { line: u32 },
}

impl Command {
    pub fn line(&self) -> u32 {
        match *self {
            Command::Point { line, .. }
            | Command::Path { line, .. }
            | Command::Dwell { line, .. }
            | Command::Surface { line } => line,
        }
    }
}

/// A parsed mission: header metadata plus the ordered command stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionDefinition {
    pub name: String,
    pub speed_mps: Option<f64>,
    pub commands: Vec<Command>,
}
