use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geom::PointGrid;

/// How the bottom face of a solid is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BasePolicy {
    /// Stay on the xy-plane unless the surface dips below `-offset`; then sit
    /// `offset` from the lowest point.
    #[default]
    #[serde(rename = "Automatic")]
    Automatic,
    /// The plane `z = offset`.
    #[serde(rename = "xy-plane")]
    FixedPlane,
    /// `offset` from the lowest point of the surface.
    #[serde(rename = "Minimum Value")]
    MinimumValuePlusOffset,
}

impl BasePolicy {
    pub const ALL: [Self; 3] = [
        Self::Automatic,
        Self::FixedPlane,
        Self::MinimumValuePlusOffset,
    ];

    /// The name shown to users and used in requests.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Automatic => "Automatic",
            Self::FixedPlane => "xy-plane",
            Self::MinimumValuePlusOffset => "Minimum Value",
        }
    }

    /// Elevation of the base plane for a surface whose lowest point is `min_z`.
    #[must_use]
    pub fn base_level(self, min_z: f64, offset: f64) -> f64 {
        match self {
            Self::Automatic => {
                if min_z < -offset {
                    min_z + offset
                } else {
                    0.0
                }
            }
            Self::FixedPlane => offset,
            Self::MinimumValuePlusOffset => min_z + offset,
        }
    }
}

impl fmt::Display for BasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown base type `{0}`; expected Automatic, xy-plane or Minimum Value")]
pub struct UnknownBasePolicy(pub String);

impl FromStr for BasePolicy {
    type Err = UnknownBasePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|policy| policy.label().eq_ignore_ascii_case(wanted))
            .or(match wanted.to_ascii_lowercase().as_str() {
                "fixed" | "fixedplane" | "plane" => Some(Self::FixedPlane),
                "minimum" | "min" | "minimumvalueplusoffset" => Some(Self::MinimumValuePlusOffset),
                "auto" => Some(Self::Automatic),
                _ => None,
            })
            .ok_or_else(|| UnknownBasePolicy(s.to_owned()))
    }
}

/// Close every row down to `base_level`.
///
/// Appends the last point and then the first point of each row, projected to
/// the base plane, so that each row outlines a closed profile.
pub fn add_base_points(grid: &mut PointGrid, base_level: f64) {
    for row in grid.rows_mut() {
        let (Some(&first), Some(&last)) = (row.first(), row.last()) else {
            continue;
        };
        row.push(last.with_z(base_level));
        row.push(first.with_z(base_level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Point3;

    #[test]
    fn automatic_stays_on_xy_plane_above_offset() {
        assert_eq!(BasePolicy::Automatic.base_level(0.0, -1.0), 0.0);
        assert_eq!(BasePolicy::Automatic.base_level(2.5, -1.0), 0.0);
        assert_eq!(BasePolicy::Automatic.base_level(0.0, 0.0), 0.0);
    }

    #[test]
    fn automatic_follows_surface_below_offset() {
        assert_eq!(BasePolicy::Automatic.base_level(-3.0, 1.0), -2.0);
        assert_eq!(BasePolicy::Automatic.base_level(0.5, -1.0), -0.5);
        assert_eq!(BasePolicy::Automatic.base_level(-1.0, 0.0), -1.0);
    }

    #[test]
    fn fixed_plane_ignores_surface() {
        assert_eq!(BasePolicy::FixedPlane.base_level(-50.0, -1.0), -1.0);
        assert_eq!(BasePolicy::FixedPlane.base_level(50.0, 3.0), 3.0);
    }

    #[test]
    fn minimum_value_adds_offset() {
        assert_eq!(BasePolicy::MinimumValuePlusOffset.base_level(-2.0, -1.0), -3.0);
        assert_eq!(BasePolicy::MinimumValuePlusOffset.base_level(4.0, 0.0), 4.0);
    }

    #[test]
    fn base_points_close_each_row() {
        let mut grid = PointGrid::from_rows(vec![vec![
            Point3::new(1.0, -2.0, 5.0),
            Point3::new(1.0, 0.0, 6.0),
            Point3::new(1.0, 2.0, 7.0),
        ]]);
        add_base_points(&mut grid, -1.0);
        assert_eq!(
            &grid.rows()[0][3..],
            &[Point3::new(1.0, 2.0, -1.0), Point3::new(1.0, -2.0, -1.0)]
        );
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for policy in BasePolicy::ALL {
            assert_eq!(policy.label().parse::<BasePolicy>(), Ok(policy));
        }
        assert_eq!("minimum".parse::<BasePolicy>(), Ok(BasePolicy::MinimumValuePlusOffset));
        assert!("sideways".parse::<BasePolicy>().is_err());
    }
}
