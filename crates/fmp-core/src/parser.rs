//! Line-oriented mission DSL parser.
//!
//! Keywords are case-insensitive, `#` and `;` start comments, blank lines are
//! ignored. The first offending line aborts parsing with a [`ParseError`]
//! carrying the 1-based line number.

use crate::error::ParseError;
use crate::mission::{Command, Coordinate, MissionDefinition};

fn strip_comments(line: &str) -> &str {
    let mut end = line.len();
    for marker in ['#', ';'] {
        if let Some(pos) = line.find(marker) {
            end = end.min(pos);
        }
    }
    line[..end].trim()
}

fn parse_float(token: &str, line_no: u32) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .map_err(|_| ParseError::new(format!("Invalid numeric literal '{token}'"), line_no))
}

/// Shared coordinate grammar for POINT, POINTLL, and PATH groups. Dispatches
/// on the leading `X`/`LAT` token and enforces strict keyword order and count.
fn parse_coordinate(tokens: &[&str], line_no: u32) -> Result<Coordinate, ParseError> {
    let first = tokens.first().map(|t| t.to_uppercase());
    match first.as_deref() {
        Some("X") => {
            if tokens.len() != 6 {
                return Err(ParseError::new("POINT requires X Y Z components", line_no));
            }
            let x = parse_float(tokens[1], line_no)?;
            if !tokens[2].eq_ignore_ascii_case("Y") {
                return Err(ParseError::new("POINT missing Y component", line_no));
            }
            let y = parse_float(tokens[3], line_no)?;
            if !tokens[4].eq_ignore_ascii_case("Z") {
                return Err(ParseError::new("POINT missing Z component", line_no));
            }
            let z = parse_float(tokens[5], line_no)?;
            Ok(Coordinate::Projected {
                x,
                y,
                z,
                line: line_no,
            })
        }
        Some("LAT") => {
            if tokens.len() != 6 {
                return Err(ParseError::new(
                    "POINTLL requires LAT LON Z components",
                    line_no,
                ));
            }
            let lat = parse_float(tokens[1], line_no)?;
            if !tokens[2].eq_ignore_ascii_case("LON") {
                return Err(ParseError::new("POINTLL missing LON component", line_no));
            }
            let lon = parse_float(tokens[3], line_no)?;
            if !tokens[4].eq_ignore_ascii_case("Z") {
                return Err(ParseError::new("POINTLL missing Z component", line_no));
            }
            let z = parse_float(tokens[5], line_no)?;
            Ok(Coordinate::Geographic {
                lon,
                lat,
                z,
                line: line_no,
            })
        }
        _ => Err(ParseError::new("Unknown coordinate format", line_no)),
    }
}

/// Parse mission text into a [`MissionDefinition`].
///
/// MISSION, CRS, and UNITS are required; their absence at end of input is
/// reported at line 1. `END` stops parsing early.
pub fn parse_mission(text: &str) -> Result<MissionDefinition, ParseError> {
    let mut mission_name: Option<String> = None;
    let mut speed_mps: Option<f64> = None;
    let mut seen_crs = false;
    let mut seen_units = false;
    let mut commands: Vec<Command> = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx as u32 + 1;
        let line = strip_comments(raw_line);
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let keyword = parts[0].to_uppercase();

        match keyword.as_str() {
            "MISSION" => {
                if mission_name.is_some() {
                    return Err(ParseError::new("MISSION declared multiple times", line_no));
                }
                if parts.len() < 2 {
                    return Err(ParseError::new("MISSION must include an identifier", line_no));
                }
                mission_name = Some(parts[1].to_string());
            }
            "CRS" => {
                if parts.len() != 2 {
                    return Err(ParseError::new(
                        "CRS must be in format 'CRS EPSG:26917'",
                        line_no,
                    ));
                }
                if !parts[1].eq_ignore_ascii_case("EPSG:26917") {
                    return Err(ParseError::new("CRS must be EPSG:26917", line_no));
                }
                seen_crs = true;
            }
            "UNITS" => {
                if parts.len() != 2 || !parts[1].eq_ignore_ascii_case("M") {
                    return Err(ParseError::new("UNITS must be 'UNITS M'", line_no));
                }
                seen_units = true;
            }
            "SPEED" => {
                if parts.len() != 3 || !parts[2].eq_ignore_ascii_case("mps") {
                    return Err(ParseError::new("SPEED must be '<value> mps'", line_no));
                }
                let value = parse_float(parts[1], line_no)?;
                if value <= 0.0 {
                    return Err(ParseError::new("SPEED must be a positive value", line_no));
                }
                // Repeated declarations are last-write-wins.
                speed_mps = Some(value);
            }
            "POINT" | "POINTLL" => {
                let coordinate = parse_coordinate(&parts[1..], line_no)?;
                commands.push(Command::Point {
                    coordinate,
                    line: line_no,
                });
            }
            "PATH" => {
                let path_str = line[parts[0].len()..].trim();
                let mut waypoints: Vec<Coordinate> = Vec::new();
                for segment in path_str.split("->") {
                    let segment = segment.trim();
                    if !(segment.starts_with('(') && segment.ends_with(')')) {
                        return Err(ParseError::new(
                            "PATH waypoints must be wrapped in parentheses",
                            line_no,
                        ));
                    }
                    let inner = segment[1..segment.len() - 1].trim();
                    let tokens: Vec<&str> = inner.split_whitespace().collect();
                    waypoints.push(parse_coordinate(&tokens, line_no)?);
                }
                if waypoints.len() < 2 {
                    return Err(ParseError::new(
                        "PATH requires at least two waypoints",
                        line_no,
                    ));
                }
                commands.push(Command::Path {
                    waypoints,
                    line: line_no,
                });
            }
            "DWELL" => {
                if parts.len() != 3 || !parts[2].eq_ignore_ascii_case("s") {
                    return Err(ParseError::new("DWELL must be '<seconds> s'", line_no));
                }
                let seconds = parse_float(parts[1], line_no)?;
                if seconds < 0.0 {
                    return Err(ParseError::new(
                        "DWELL duration must be non-negative",
                        line_no,
                    ));
                }
                commands.push(Command::Dwell {
                    seconds,
                    line: line_no,
                });
            }
            "SURFACE" => {
                commands.push(Command::Surface { line: line_no });
            }
            "END" => break,
            _ => {
                return Err(ParseError::new(
                    format!("Unknown statement '{}'", parts[0]),
                    line_no,
                ));
            }
        }
    }

    let name = mission_name.ok_or_else(|| ParseError::new("MISSION header is required", 1))?;
    if !seen_crs {
        return Err(ParseError::new("CRS EPSG:26917 is required", 1));
    }
    if !seen_units {
        return Err(ParseError::new("UNITS M is required", 1));
    }

    Ok(MissionDefinition {
        name,
        speed_mps,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_mission() {
        let text = "\nMISSION SAMPLE\nCRS EPSG:26917\nUNITS M\nPOINT X 100 Y 200 Z 5\nEND\n";
        let mission = parse_mission(text).unwrap();
        assert_eq!(mission.name, "SAMPLE");
        assert_eq!(mission.commands.len(), 1);
        assert!(mission.speed_mps.is_none());
    }

    #[test]
    fn missing_crs_reports_line_one() {
        let text = "MISSION SAMPLE\nUNITS M\nEND\n";
        let err = parse_mission(text).unwrap_err();
        assert!(err.message.contains("CRS"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn missing_units_reports_line_one() {
        let text = "MISSION SAMPLE\nCRS EPSG:26917\nEND\n";
        let err = parse_mission(text).unwrap_err();
        assert!(err.message.contains("UNITS"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn duplicate_mission_header_is_rejected() {
        let text = "MISSION A\nMISSION B\nCRS EPSG:26917\nUNITS M\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "MISSION declared multiple times");
    }

    #[test]
    fn unknown_statement_carries_source_line() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nHOVER 5 s\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.message, "Unknown statement 'HOVER'");
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "# header comment\nMISSION A ; trailing\n\nCRS EPSG:26917\nUNITS M\nPOINT X 1 Y 2 Z 3 # inline\n";
        let mission = parse_mission(text).unwrap();
        assert_eq!(mission.commands.len(), 1);
        assert_eq!(mission.commands[0].line(), 6);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let text = "mission lower\ncrs epsg:26917\nunits m\npoint x 1 y 2 z 3\n";
        let mission = parse_mission(text).unwrap();
        assert_eq!(mission.name, "lower");
        assert_eq!(mission.commands.len(), 1);
    }

    #[test]
    fn pointll_yields_geographic_coordinate() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINTLL LAT 27.5 LON -81.5 Z 2\n";
        let mission = parse_mission(text).unwrap();
        match &mission.commands[0] {
            Command::Point { coordinate, .. } => {
                assert_eq!(
                    *coordinate,
                    Coordinate::Geographic {
                        lon: -81.5,
                        lat: 27.5,
                        z: 2.0,
                        line: 4
                    }
                );
            }
            other => panic!("expected point command, got {other:?}"),
        }
    }

    #[test]
    fn path_parses_parenthesized_groups() {
        let text =
            "MISSION A\nCRS EPSG:26917\nUNITS M\nPATH (X 0 Y 0 Z 0) -> (X 10 Y 0 Z 0) -> (LAT 27.0 LON -81.0 Z 1)\n";
        let mission = parse_mission(text).unwrap();
        match &mission.commands[0] {
            Command::Path { waypoints, .. } => assert_eq!(waypoints.len(), 3),
            other => panic!("expected path command, got {other:?}"),
        }
    }

    #[test]
    fn path_rejects_unwrapped_waypoints() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPATH X 0 Y 0 Z 0 -> (X 1 Y 1 Z 1)\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.message, "PATH waypoints must be wrapped in parentheses");
    }

    #[test]
    fn path_requires_two_waypoints() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPATH (X 0 Y 0 Z 0)\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.message, "PATH requires at least two waypoints");
    }

    #[test]
    fn point_enforces_keyword_order() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINT X 1 Z 2 Y 3\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.message, "POINT missing Y component");
    }

    #[test]
    fn bad_numeric_literal_is_reported() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINT X abc Y 2 Z 3\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.message, "Invalid numeric literal 'abc'");
    }

    #[test]
    fn dwell_requires_seconds_suffix() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINT X 1 Y 2 Z 3\nDWELL 30\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.line, 5);
        assert_eq!(err.message, "DWELL must be '<seconds> s'");
    }

    #[test]
    fn negative_dwell_is_rejected() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINT X 1 Y 2 Z 3\nDWELL -1 s\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.message, "DWELL duration must be non-negative");
    }

    #[test]
    fn repeated_speed_is_last_write_wins() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nSPEED 1.5 mps\nSPEED 2.5 mps\nPOINT X 1 Y 2 Z 3\n";
        let mission = parse_mission(text).unwrap();
        assert_eq!(mission.speed_mps, Some(2.5));
    }

    #[test]
    fn non_positive_speed_is_rejected() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nSPEED 0 mps\n";
        let err = parse_mission(text).unwrap_err();
        assert_eq!(err.message, "SPEED must be a positive value");
    }

    #[test]
    fn end_stops_parsing_before_bad_input() {
        let text = "MISSION A\nCRS EPSG:26917\nUNITS M\nPOINT X 1 Y 2 Z 3\nEND\nGARBAGE LINE\n";
        let mission = parse_mission(text).unwrap();
        assert_eq!(mission.commands.len(), 1);
    }
}
