// crates/geodata-core/src/runtime/geometry.rs
// ============================================================================
// Module: Geometry Validator
// Description: Structural GeoJSON validation against dataset geometry metadata.
// Purpose: Accept only well-formed geometries of the declared family and
//          dimension, and resolve the source SRID for the store write.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Geometry validation is purely structural: coordinate arrays must be
//! well-formed and finite, the GeoJSON type must match the declared family
//! (unless the dataset declares the wildcard type), the coordinate dimension
//! must match the declared Z-flag, and line strings and rings must not repeat
//! consecutive vertices. The engine never reprojects; when the payload CRS
//! differs from the stored SRID the resulting write instructs the store to
//! reproject.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::ConstraintViolation;
use crate::core::FeaturePayload;
use crate::core::GeometryDef;
use crate::interfaces::GeometryWrite;

// ============================================================================
// SECTION: SRID Resolution
// ============================================================================

/// Resolves the source SRID of a payload's geometry.
///
/// A payload without a CRS object inherits the dataset SRID. A CRS object
/// that is not a recognized named CRS is rejected.
///
/// # Errors
///
/// Returns [`ConstraintViolation::InvalidGeometry`] for unsupported CRS
/// objects.
pub fn resolve_source_srid(
    def: &GeometryDef,
    payload: &FeaturePayload,
) -> Result<i32, ConstraintViolation> {
    match &payload.crs {
        None => Ok(def.srid),
        Some(crs) => crs.srid().ok_or_else(|| ConstraintViolation::InvalidGeometry {
            reason: format!("unsupported CRS '{}'", crs.properties.name),
        }),
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a geometry value against the dataset's geometry metadata.
///
/// `value` is the payload's geometry member; JSON null writes a NULL
/// geometry when the dataset allows it.
///
/// # Errors
///
/// Returns [`ConstraintViolation::NullGeometryNotAllowed`] or
/// [`ConstraintViolation::InvalidGeometry`].
pub fn validate_geometry(
    def: &GeometryDef,
    value: &Value,
    source_srid: i32,
) -> Result<GeometryWrite, ConstraintViolation> {
    if value.is_null() {
        if !def.allow_null {
            return Err(ConstraintViolation::NullGeometryNotAllowed);
        }
        return Ok(GeometryWrite {
            geojson: Value::Null,
            source_srid,
            target_srid: def.srid,
        });
    }

    let object = value.as_object().ok_or_else(|| invalid("geometry is not an object"))?;
    let geometry_type = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("geometry has no type"))?;

    if let Some(family) = def.geometry_type.geojson_family()
        && geometry_type != family
    {
        return Err(invalid(&format!("expected {family}, got {geometry_type}")));
    }

    let dimension = check_structure(geometry_type, value)?;
    let expected_dimension = if def.geometry_type.has_z() { 3 } else { 2 };
    if dimension != expected_dimension {
        return Err(invalid(&format!(
            "expected {expected_dimension}-dimensional coordinates, got {dimension}-dimensional"
        )));
    }

    Ok(GeometryWrite {
        geojson: value.clone(),
        source_srid,
        target_srid: def.srid,
    })
}

/// Checks the structure of one GeoJSON geometry and returns its coordinate
/// dimension.
fn check_structure(geometry_type: &str, value: &Value) -> Result<u8, ConstraintViolation> {
    if geometry_type == "GeometryCollection" {
        return check_collection(value);
    }
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| invalid("geometry has no coordinates"))?;
    let mut dimension = None;
    match geometry_type {
        "Point" => check_position(coordinates, &mut dimension)?,
        "MultiPoint" => {
            for position in member_array(coordinates)? {
                check_position(position, &mut dimension)?;
            }
        }
        "LineString" => check_linestring(coordinates, &mut dimension)?,
        "MultiLineString" => {
            for line in member_array(coordinates)? {
                check_linestring(line, &mut dimension)?;
            }
        }
        "Polygon" => check_polygon(coordinates, &mut dimension)?,
        "MultiPolygon" => {
            for polygon in member_array(coordinates)? {
                check_polygon(polygon, &mut dimension)?;
            }
        }
        other => return Err(invalid(&format!("unknown geometry type {other}"))),
    }
    dimension.ok_or_else(|| invalid("geometry has no coordinates"))
}

/// Checks a geometry collection's members recursively.
///
/// All members must share one coordinate dimension.
fn check_collection(value: &Value) -> Result<u8, ConstraintViolation> {
    let members = value
        .get("geometries")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("geometry collection has no geometries"))?;
    if members.is_empty() {
        return Err(invalid("geometry collection is empty"));
    }
    let mut dimension = None;
    for member in members {
        let member_type = member
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("geometry has no type"))?;
        if member_type == "GeometryCollection" {
            return Err(invalid("nested geometry collections are not supported"));
        }
        let member_dimension = check_structure(member_type, member)?;
        if *dimension.get_or_insert(member_dimension) != member_dimension {
            return Err(invalid("mixed coordinate dimensions"));
        }
    }
    dimension.ok_or_else(|| invalid("geometry collection is empty"))
}

/// Checks one position: an array of 2 or 3 finite numbers, with a dimension
/// consistent across the whole geometry.
fn check_position(value: &Value, dimension: &mut Option<u8>) -> Result<(), ConstraintViolation> {
    let ordinates = value.as_array().ok_or_else(|| invalid("position is not an array"))?;
    let len = match ordinates.len() {
        2 => 2_u8,
        3 => 3_u8,
        other => return Err(invalid(&format!("position has {other} ordinates"))),
    };
    for ordinate in ordinates {
        let number = ordinate.as_f64().ok_or_else(|| invalid("ordinate is not a number"))?;
        if !number.is_finite() {
            return Err(invalid("ordinate is not finite"));
        }
    }
    if *dimension.get_or_insert(len) != len {
        return Err(invalid("mixed coordinate dimensions"));
    }
    Ok(())
}

/// Checks a line string: at least two positions, no consecutive duplicates.
fn check_linestring(value: &Value, dimension: &mut Option<u8>) -> Result<(), ConstraintViolation> {
    let positions = member_array(value)?;
    if positions.len() < 2 {
        return Err(invalid("line string has fewer than two vertices"));
    }
    for position in positions {
        check_position(position, dimension)?;
    }
    check_no_duplicate_vertices(positions)
}

/// Checks a polygon: rings of at least four positions, closed, with no
/// consecutive duplicates.
fn check_polygon(value: &Value, dimension: &mut Option<u8>) -> Result<(), ConstraintViolation> {
    let rings = member_array(value)?;
    if rings.is_empty() {
        return Err(invalid("polygon has no rings"));
    }
    for ring in rings {
        let positions = member_array(ring)?;
        if positions.len() < 4 {
            return Err(invalid("ring has fewer than four vertices"));
        }
        for position in positions {
            check_position(position, dimension)?;
        }
        if positions.first() != positions.last() {
            return Err(invalid("ring is not closed"));
        }
        check_no_duplicate_vertices(positions)?;
    }
    Ok(())
}

/// Rejects consecutive identical vertices.
fn check_no_duplicate_vertices(positions: &[Value]) -> Result<(), ConstraintViolation> {
    for pair in positions.windows(2) {
        if pair[0] == pair[1] {
            return Err(invalid("duplicate consecutive vertices"));
        }
    }
    Ok(())
}

/// Reads a value as a JSON array.
fn member_array(value: &Value) -> Result<&Vec<Value>, ConstraintViolation> {
    value.as_array().ok_or_else(|| invalid("coordinates are not an array"))
}

/// Builds an invalid-geometry violation.
fn invalid(reason: &str) -> ConstraintViolation {
    ConstraintViolation::InvalidGeometry {
        reason: reason.to_string(),
    }
}
