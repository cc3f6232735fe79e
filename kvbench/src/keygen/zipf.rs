use rand::Rng;
use rand_distr::Distribution;

/// Zipf distribution over `[0, imax]` with `P(k) ∝ (v + k)^-s`.
///
/// Sampled with rejection-inversion (Hörmann & Derflinger), the same generator older
/// benchmark configurations were tuned against. Unlike `rand_distr::Zipf` it supports the
/// `v` offset and starts at zero.
#[derive(Debug, Clone, Copy)]
pub struct Zipf {
    imax: f64,
    v: f64,
    q: f64,
    s: f64,
    one_minus_q: f64,
    one_minus_q_inv: f64,
    hxm: f64,
    hx0_minus_hxm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZipfError {
    /// `s` must be greater than one.
    Exponent,
    /// `v` must be at least one.
    Offset,
}

impl Zipf {
    pub fn new(s: f64, v: f64, imax: u64) -> Result<Self, ZipfError> {
        if !(s > 1.) {
            return Err(ZipfError::Exponent);
        }
        if !(v >= 1.) {
            return Err(ZipfError::Offset);
        }

        let mut zipf = Self {
            imax: imax as f64,
            v,
            q: s,
            s: 0.,
            one_minus_q: 1. - s,
            one_minus_q_inv: 1. / (1. - s),
            hxm: 0.,
            hx0_minus_hxm: 0.,
        };
        zipf.hxm = zipf.h(zipf.imax + 0.5);
        zipf.hx0_minus_hxm = zipf.h(0.5) - (zipf.v.ln() * -zipf.q).exp() - zipf.hxm;
        zipf.s = 1. - zipf.hinv(zipf.h(1.5) - (-zipf.q * (zipf.v + 1.).ln()).exp());
        Ok(zipf)
    }

    fn h(&self, x: f64) -> f64 {
        (self.one_minus_q * (self.v + x).ln()).exp() * self.one_minus_q_inv
    }

    fn hinv(&self, x: f64) -> f64 {
        (self.one_minus_q_inv * (self.one_minus_q * x).ln()).exp() - self.v
    }
}

impl Distribution<u64> for Zipf {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        loop {
            let r: f64 = rng.gen();
            let ur = self.hxm + r * self.hx0_minus_hxm;
            let x = self.hinv(ur);
            let k = (x + 0.5).floor();
            if k - x <= self.s {
                return k as u64;
            }
            if ur >= self.h(k + 0.5) - (-(k + self.v).ln() * self.q).exp() {
                return k as u64;
            }
        }
    }
}
