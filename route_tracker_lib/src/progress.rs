/// Fraction of a route that has been traversed. Always in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Progress(f64);

impl Progress {
    pub const START: Progress = Progress(0.);
    pub const COMPLETE: Progress = Progress(1.);

    /// Clamps into [0, 1]. NaN is treated as the start of the route.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::START;
        }
        Self(value.clamp(0., 1.))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Moves forward by `increment`, saturating at exactly 1.0. Negative increments are ignored.
    pub fn advance(self, increment: f64) -> Self {
        if !(increment > 0.) {
            return self;
        }
        Self::new(self.0 + increment)
    }

    pub fn is_complete(self) -> bool {
        self.0 >= 1.
    }
}

impl From<Progress> for f64 {
    fn from(progress: Progress) -> Self {
        progress.0
    }
}
