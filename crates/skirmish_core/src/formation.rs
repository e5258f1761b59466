//! Formation layouts for group move orders.
//!
//! Layouts are pure functions of their inputs: the same arguments always
//! produce the same positions in the same order.

use serde::{Deserialize, Serialize};

use crate::math::{cos, fixed_sqrt, sin, Fixed, Vec2Fixed, TAU};

/// Arrangement used when a group receives a move order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FormationShape {
    /// Evenly spaced on a ring around the anchor.
    #[default]
    Circle,
    /// A single rank across the direction of travel.
    Line,
    /// Rows widening behind the anchor, narrowest in front.
    Wedge,
}

/// Positions for `count` units around `center`, facing +Y.
///
/// Returns an empty list when `count <= 0`.
#[must_use]
pub fn compute_formation_positions(
    center: Vec2Fixed,
    count: i32,
    shape: FormationShape,
    spacing: Fixed,
) -> Vec<Vec2Fixed> {
    compute_oriented_formation(center, count, shape, spacing, Vec2Fixed::from_ints(0, 1))
}

/// Positions for `count` units around `center`, oriented along `forward`.
///
/// A zero `forward` falls back to +Y. Slot order is stable: for a line,
/// slot 0 is the leftmost unit; for a wedge, slot 0 is the tip.
#[must_use]
pub fn compute_oriented_formation(
    center: Vec2Fixed,
    count: i32,
    shape: FormationShape,
    spacing: Fixed,
    forward: Vec2Fixed,
) -> Vec<Vec2Fixed> {
    let Ok(count) = usize::try_from(count) else {
        return Vec::new();
    };
    if count == 0 {
        return Vec::new();
    }

    let forward = if forward == Vec2Fixed::ZERO {
        Vec2Fixed::from_ints(0, 1)
    } else {
        forward.normalize()
    };
    // Clockwise perpendicular: +X when facing +Y.
    let right = -forward.perpendicular();
    let place =
        |local_x: Fixed, local_y: Fixed| center + right.scale(local_x) + forward.scale(local_y);

    let local = match shape {
        FormationShape::Circle => circle_slots(count, spacing),
        FormationShape::Line => line_slots(count, spacing),
        FormationShape::Wedge => wedge_slots(count, spacing),
    };
    local.into_iter().map(|(x, y)| place(x, y)).collect()
}

fn circle_slots(count: usize, spacing: Fixed) -> Vec<(Fixed, Fixed)> {
    if count == 1 {
        return vec![(Fixed::ZERO, Fixed::ZERO)];
    }

    let n = Fixed::from_num(count);
    let radius = (spacing * fixed_sqrt(n) / 2).max(spacing / 2);
    (0..count)
        .map(|i| {
            let angle = TAU * Fixed::from_num(i) / n;
            // Slot 0 straight ahead, then clockwise.
            (sin(angle) * radius, cos(angle) * radius)
        })
        .collect()
}

/// Offsets across a rank of `count` units centered on zero.
fn rank_offsets(count: usize, spacing: Fixed) -> impl Iterator<Item = Fixed> {
    let half_width = spacing * Fixed::from_num(count - 1) / 2;
    (0..count).map(move |i| spacing * Fixed::from_num(i) - half_width)
}

fn line_slots(count: usize, spacing: Fixed) -> Vec<(Fixed, Fixed)> {
    rank_offsets(count, spacing).map(|x| (x, Fixed::ZERO)).collect()
}

fn wedge_slots(count: usize, spacing: Fixed) -> Vec<(Fixed, Fixed)> {
    let mut slots = Vec::with_capacity(count);
    let mut row = 0usize;
    while slots.len() < count {
        let in_row = (row + 1).min(count - slots.len());
        let depth = -(spacing * Fixed::from_num(row));
        slots.extend(rank_offsets(in_row, spacing).map(|x| (x, depth)));
        row += 1;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spacing() -> Fixed {
        Fixed::from_num(2)
    }

    #[test]
    fn test_empty_for_non_positive_count() {
        let center = Vec2Fixed::from_ints(5, 5);
        for shape in [FormationShape::Circle, FormationShape::Line, FormationShape::Wedge] {
            assert!(compute_formation_positions(center, 0, shape, spacing()).is_empty());
            assert!(compute_formation_positions(center, -3, shape, spacing()).is_empty());
        }
    }

    #[test]
    fn test_single_unit_sits_on_anchor() {
        let center = Vec2Fixed::from_ints(3, -4);
        for shape in [FormationShape::Circle, FormationShape::Line, FormationShape::Wedge] {
            assert_eq!(compute_formation_positions(center, 1, shape, spacing()), vec![center]);
        }
    }

    #[test]
    fn test_line_is_centered_left_to_right() {
        let positions =
            compute_formation_positions(Vec2Fixed::ZERO, 3, FormationShape::Line, spacing());
        assert_eq!(
            positions,
            vec![
                Vec2Fixed::from_ints(-2, 0),
                Vec2Fixed::from_ints(0, 0),
                Vec2Fixed::from_ints(2, 0),
            ]
        );
    }

    #[test]
    fn test_line_turns_with_forward() {
        // Facing +X, left is +Y.
        let positions = compute_oriented_formation(
            Vec2Fixed::ZERO,
            2,
            FormationShape::Line,
            spacing(),
            Vec2Fixed::from_ints(4, 0),
        );
        assert_eq!(positions, vec![Vec2Fixed::from_ints(0, 1), Vec2Fixed::from_ints(0, -1)]);
    }

    #[test]
    fn test_wedge_rows_widen_behind_tip() {
        let positions =
            compute_formation_positions(Vec2Fixed::ZERO, 6, FormationShape::Wedge, spacing());
        assert_eq!(
            positions,
            vec![
                Vec2Fixed::from_ints(0, 0),
                Vec2Fixed::from_ints(-1, -2),
                Vec2Fixed::from_ints(1, -2),
                Vec2Fixed::from_ints(-2, -4),
                Vec2Fixed::from_ints(0, -4),
                Vec2Fixed::from_ints(2, -4),
            ]
        );
    }

    #[test]
    fn test_wedge_partial_row_is_centered() {
        let positions =
            compute_formation_positions(Vec2Fixed::ZERO, 4, FormationShape::Wedge, spacing());
        assert_eq!(positions[3], Vec2Fixed::from_ints(0, -4));
    }

    #[test]
    fn test_circle_radius_grows_with_count() {
        let circle = |count| {
            compute_formation_positions(Vec2Fixed::ZERO, count, FormationShape::Circle, spacing())
        };
        let small = circle(4);
        let large = circle(16);
        assert!(large[0].length() > small[0].length());
        // sqrt(4) * 2 / 2 = 2
        assert!((small[0].length() - Fixed::from_num(2)).abs() < Fixed::from_num(0.001));
    }

    proptest! {
        #[test]
        fn prop_formation_is_deterministic(
            count in -5i32..64,
            x in -100i32..100,
            y in -100i32..100,
            shape in prop_oneof![
                Just(FormationShape::Circle),
                Just(FormationShape::Line),
                Just(FormationShape::Wedge),
            ],
        ) {
            let center = Vec2Fixed::from_ints(x, y);
            let first = compute_formation_positions(center, count, shape, spacing());
            let second = compute_formation_positions(center, count, shape, spacing());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), usize::try_from(count).unwrap_or(0));
        }

        #[test]
        fn prop_circle_points_are_equidistant(count in 2i32..64, x in -50i32..50, y in -50i32..50) {
            let center = Vec2Fixed::from_ints(x, y);
            let positions =
                compute_formation_positions(center, count, FormationShape::Circle, spacing());
            let reference = positions[0].distance(center);
            for position in &positions {
                let error = (position.distance(center) - reference).abs();
                prop_assert!(error < Fixed::from_num(0.001));
            }
        }
    }
}
