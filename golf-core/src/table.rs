//! Banded lookup tables.
//!
//! A [`StepTable`] is an ordered list of `(threshold, value)` bands. A lookup
//! returns the value of the first band whose threshold is `>= x`; inputs past
//! the last threshold (and NaN) get the overflow value.

/// Ordered `(threshold, value)` bands with an overflow value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTable {
    bands: &'static [(f64, f64)],
    overflow: f64,
}

impl StepTable {
    /// `bands` must be sorted by ascending threshold.
    pub const fn new(bands: &'static [(f64, f64)], overflow: f64) -> Self {
        Self { bands, overflow }
    }

    pub fn lookup(&self, x: f64) -> f64 {
        self.value(self.band(x))
    }

    /// Index of the band `x` falls in. `bands().len()` means the overflow band.
    pub fn band(&self, x: f64) -> usize {
        self.bands
            .iter()
            .position(|(threshold, _)| x <= *threshold)
            .unwrap_or(self.bands.len())
    }

    /// Value of band `index`, or the overflow value past the last band.
    pub fn value(&self, index: usize) -> f64 {
        self.bands.get(index).map_or(self.overflow, |&(_, value)| value)
    }

    pub fn bands(&self) -> &'static [(f64, f64)] {
        self.bands
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }
}

/// Drag coefficient by Reynolds number.
pub const DRAG_BY_REYNOLDS: StepTable = StepTable::new(
    &[
        (110_000.0, 0.235),
        (120_000.0, 0.230),
        (130_000.0, 0.225),
        (140_000.0, 0.220),
        (150_000.0, 0.215),
        (160_000.0, 0.210),
        (170_000.0, 0.200),
    ],
    0.200,
);

/// Vortex-shedding factor by speed.
pub const VORTEX_BY_SPEED: StepTable =
    StepTable::new(&[(120.0, 1.00), (140.0, 0.75), (160.0, 0.50)], 0.25);

/// Circulation strength by spin rate (rpm).
pub const CIRCULATION_BY_RPM: StepTable = StepTable::new(
    &[
        (2000.0, 1.00),
        (2500.0, 1.25),
        (3000.0, 1.50),
        (3500.0, 1.75),
    ],
    2.00,
);
