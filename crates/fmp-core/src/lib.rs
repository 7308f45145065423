pub mod compile;
pub mod error;
pub mod export;
pub mod grid;
pub mod mission;
pub mod parser;
pub mod projection;
pub mod region;

pub use compile::{
    compile_mission, CentroidLookup, CompileOptions, CompileResult, DwellEvent, MissionPoint,
    NoCentroids,
};
pub use error::{CompileError, GridError, ParseError, RegionError, Violation};
pub use export::{compile_report, path_feature, waypoint_rows, CompileReport, WaypointRow};
pub use grid::{build_grid, cell_size_key, Centroid, CentroidIndex, GridBuild, GridCell};
pub use mission::{Command, Coordinate, MissionDefinition};
pub use parser::parse_mission;
pub use region::{PreparedRegion, RegionSnapshot};
