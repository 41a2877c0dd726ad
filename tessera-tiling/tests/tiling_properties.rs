// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! End-to-end properties of flat lattice tilings
//!
//! Exercises bounds, lattice setup, enumeration and nearest-template
//! queries together through the public API:
//! 1. Counting is idempotent and leaves the tiling restartable
//! 2. Points along one axis follow the increment and padding
//! 3. Elliptical tilings stay inside the padded ellipse
//! 4. Shared bound handles are released exactly once
//! 5. Random points inside a box are covered within the mismatch
//!
//! Run with: `cargo test -p tessera-tiling --test tiling_properties`

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tessera_math::LatticeKind;
use tessera_tiling::{
    EllipticalBounds, NearestBuffers, ParamBound, Tiling, TilingConfig, TilingStatus,
};

// ═══════════════════════════════════════════════════════════
// Counting
// ═══════════════════════════════════════════════════════════

#[test]
fn test_count_total_points_idempotent() {
    for (name, config) in TilingConfig::presets() {
        let mut tiling = config.build().unwrap();
        let first = tiling.count_total_points().unwrap();
        assert_eq!(tiling.status(), TilingStatus::Initialised, "{}", name);
        let second = tiling.count_total_points().unwrap();
        assert_eq!(first, second, "{}", name);
        assert!(first > 0, "{}", name);
        assert_eq!(tiling.status(), TilingStatus::Initialised, "{}", name);
        assert_eq!(tiling.point_count(), 0);
    }
}

#[test]
fn test_count_matches_iteration() {
    let mut tiling = TilingConfig::unit_disk().build().unwrap();
    let total = tiling.count_total_points().unwrap();
    let iterated = tiling.points().unwrap().count() as u64;
    assert_eq!(total, iterated);
    assert_eq!(tiling.point_count(), total);
}

#[test]
fn test_unit_interval_count() {
    let mut tiling = TilingConfig::unit_interval().build().unwrap();
    let incr = tiling.axis_increments()[0];
    assert!((incr - 2.0 * 0.01f64.sqrt()).abs() < 1e-12);
    let expected = (1.0 / incr).ceil() as u64;
    let count = tiling.count_total_points().unwrap();
    // Padding on both ends adds a boundary template
    assert!(count >= expected && count <= expected + 2, "count {}", count);
}

// ═══════════════════════════════════════════════════════════
// Axis spacing
// ═══════════════════════════════════════════════════════════

#[test]
fn test_points_along_axis_follow_padding() {
    let (lo, hi) = (0.0, 2.3);
    let mut tiling = Tiling::new(2).unwrap();
    tiling.set_constant_bound(0, -1.0, 1.0).unwrap();
    tiling.set_constant_bound(1, lo, hi).unwrap();
    tiling.set_lattice(LatticeKind::Cubic).unwrap();
    tiling.set_metric(&DMatrix::identity(2, 2), 0.02).unwrap();

    let incr = tiling.axis_increments()[1];
    let pad = tiling.bounding_box()[1];

    // Group the y values of each column by x
    let mut columns: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (_, p) in tiling.points().unwrap() {
        columns
            .entry((p[0] * 1e6).round() as i64)
            .or_default()
            .push(p[1]);
    }
    assert!(columns.len() > 1);

    // Cubic rows share the y lattice, which starts exactly at lo - pad
    let span = (hi + pad) - (lo - pad);
    let per_axis = (span / incr).ceil() as usize;
    for (x, ys) in &columns {
        assert_eq!(ys.len(), per_axis, "column at x = {}e-6", x);
        assert!((ys[0] - (lo - pad)).abs() < 1e-9, "column starts at {}", ys[0]);
        let last = ys[ys.len() - 1];
        assert!(last <= hi + pad + 1e-9 && last > hi + pad - incr);
        for pair in ys.windows(2) {
            assert!((pair[1] - pair[0] - incr).abs() < 1e-9);
        }
    }
}

#[test]
fn test_lower_dimension_changes_during_enumeration() {
    let mut tiling = TilingConfig::box_3d().build().unwrap();
    let mut seen = [false; 3];
    let mut first = true;
    for (changed, _) in tiling.points().unwrap() {
        if first {
            assert_eq!(changed, 0);
            first = false;
        } else {
            seen[changed] = true;
        }
    }
    assert!(seen.iter().all(|&s| s));
}

// ═══════════════════════════════════════════════════════════
// Elliptical bounds
// ═══════════════════════════════════════════════════════════

#[test]
fn test_unit_disk_points_inside_padded_ellipse() {
    let mut tiling = TilingConfig::unit_disk().build().unwrap();
    let bx = tiling.bounding_box()[0];
    let by = tiling.bounding_box()[1];
    let limit = 1.0 + bx + by + 1e-9;

    let mut inside = 0;
    let mut total = 0;
    for (_, p) in tiling.points().unwrap() {
        let r = (p[0] * p[0] + p[1] * p[1]).sqrt();
        assert!(r <= limit, "point ({}, {}) at radius {}", p[0], p[1], r);
        inside += usize::from(r <= 1.0);
        total += 1;
    }
    assert!(inside > total / 2);
}

#[test]
fn test_shifted_ellipse_in_higher_dimensions() {
    let mut tiling = Tiling::new(3).unwrap();
    tiling.set_constant_bound(0, 0.0, 0.0).unwrap();
    tiling.set_elliptical_bounds(1, 2.0, -1.0, 0.5, 1.5).unwrap();
    tiling.set_lattice(LatticeKind::Anstar).unwrap();
    tiling.set_metric(&DMatrix::identity(3, 3), 0.02).unwrap();
    assert_eq!(tiling.tiled_dimensions(), 2);

    let bx = tiling.bounding_box()[1];
    let by = tiling.bounding_box()[2];
    for (_, p) in tiling.points().unwrap() {
        assert_eq!(p[0], 0.0);
        assert!((p[1] - 2.0).abs() <= 0.5 + bx + 1e-9);
        assert!((p[2] + 1.0).abs() <= 1.5 + by + 1.5 + 1e-9);
    }
}

// ═══════════════════════════════════════════════════════════
// Shared bound ownership
// ═══════════════════════════════════════════════════════════

#[test]
fn test_shared_bounds_released_once() {
    let shared = Arc::new(EllipticalBounds::new(0, 0.0, 0.0, 1.0, 2.0).unwrap());
    for _ in 0..1000 {
        let mut tiling = Tiling::new(2).unwrap();
        let handle: Arc<dyn ParamBound> = shared.clone();
        tiling.set_bound(0, false, Arc::clone(&handle)).unwrap();
        tiling.set_bound(1, false, handle).unwrap();
        tiling.set_lattice(LatticeKind::Anstar).unwrap();
        tiling.set_metric(&DMatrix::identity(2, 2), 0.5).unwrap();
        assert_eq!(Arc::strong_count(&shared), 3);
    }
    assert_eq!(Arc::strong_count(&shared), 1);
}

#[test]
fn test_many_elliptical_tilings() {
    for i in 0..1000 {
        let mut tiling = Tiling::new(2).unwrap();
        tiling
            .set_elliptical_bounds(0, i as f64, 0.0, 1.0, 1.0)
            .unwrap();
        drop(tiling);
    }
}

// ═══════════════════════════════════════════════════════════
// Nearest-template coverage
// ═══════════════════════════════════════════════════════════

#[test]
fn test_box_covered_within_mismatch() {
    let config = TilingConfig::box_3d();
    let mut tiling = config.build().unwrap();
    let total = tiling.count_total_points().unwrap();

    let mut rng = StdRng::seed_from_u64(2026);
    let mut buffers = NearestBuffers::new();
    tiling
        .nearest_to_random_points(&mut rng, 300, &mut buffers)
        .unwrap();
    assert_eq!(tiling.status(), TilingStatus::Finished);

    let worst = buffers.max_distance().unwrap();
    assert!(worst <= config.max_mismatch * (1.0 + 1e-9), "worst {}", worst);
    assert!(buffers.nearest_indices.iter().all(|&i| i < total));

    // A restart is enough to enumerate again
    tiling.restart().unwrap();
    assert_eq!(tiling.count_total_points().unwrap(), total);
}
