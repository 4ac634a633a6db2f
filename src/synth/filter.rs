//! Biquad filter
//!
//! Shapes noise bursts: high-pass for hi-hats, band-pass for claps and
//! cymbals. RBJ cookbook coefficients, Direct Form II transposed.

use std::f64::consts::PI;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    HighPass,
    BandPass,
}

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

/// Biquad filter for a single voice
#[derive(Debug, Clone)]
pub struct Filter {
    kind: FilterKind,
    sample_rate: f64,
    cutoff: f64,
    q: f64,
    coeffs: Coefficients,
    z1: f64,
    z2: f64,
}

impl Filter {
    /// Create a filter; cutoff and Q are clamped to stable ranges
    pub fn new(kind: FilterKind, sample_rate: f64, cutoff: f64, q: f64) -> Self {
        let mut filter = Self {
            kind,
            sample_rate,
            cutoff: 0.0,
            q: 0.0,
            coeffs: Coefficients { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 },
            z1: 0.0,
            z2: 0.0,
        };
        filter.cutoff = filter.clamp_cutoff(cutoff);
        filter.q = q.clamp(0.1, 20.0);
        filter.update();
        filter
    }

    /// Butterworth high-pass
    pub fn high_pass(sample_rate: f64, cutoff: f64) -> Self {
        Self::new(FilterKind::HighPass, sample_rate, cutoff, 0.707)
    }

    /// Band-pass centred on `center` with quality `q`
    pub fn band_pass(sample_rate: f64, center: f64, q: f64) -> Self {
        Self::new(FilterKind::BandPass, sample_rate, center, q)
    }

    fn clamp_cutoff(&self, hz: f64) -> f64 {
        hz.clamp(20.0, self.sample_rate * 0.45)
    }

    fn update(&mut self) {
        let omega = 2.0 * PI * self.cutoff / self.sample_rate;
        let (sin_w, cos_w) = omega.sin_cos();
        let alpha = sin_w / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::HighPass => ((1.0 + cos_w) / 2.0, -(1.0 + cos_w), (1.0 + cos_w) / 2.0),
            // Constant 0 dB peak gain
            FilterKind::BandPass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w;
        let a2 = 1.0 - alpha;

        self.coeffs = Coefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        };
    }

    /// Filter one sample
    pub fn process(&mut self, input: f64) -> f64 {
        let c = &self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}
