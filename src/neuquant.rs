// neuquant.rs
//
// Copyright (c) 2023  Douglas Lau
//
//! Neural-net color quantization.
//!
//! A self-organizing map of 256 neurons learns a palette from a sample of
//! canonical (BGR24) pixels.  After learning, the network is sorted by green
//! so that nearest-color lookups only scan neurons near the pixel's green
//! value.
use crate::convert::CANONICAL_BPP;
use crate::error::{Error, Result};
use crate::palette::{Palette, PALETTE_LEN};
use pix::rgb::SRgb8;

/// Number of neurons (palette entries)
const NET_SIZE: usize = PALETTE_LEN;

/// Primes near 500, used for sample stride
const PRIMES: [usize; 4] = [499, 491, 487, 503];

/// Inputs smaller than this many bytes are sampled fully
const MIN_PICTURE_BYTES: usize = CANONICAL_BPP * 503;

/// Number of learning cycles (alpha / radius decay steps)
const N_CYCLES: usize = 100;

/// Fractional bits for neuron color values
const NET_BIAS_SHIFT: u32 = 4;

/// Fractional bits for frequency and bias
const INT_BIAS_SHIFT: u32 = 16;
const INT_BIAS: i32 = 1 << INT_BIAS_SHIFT;
const GAMMA_SHIFT: u32 = 10;
const BETA_SHIFT: u32 = 10;
const BETA: i32 = INT_BIAS >> BETA_SHIFT;
const BETA_GAMMA: i32 = INT_BIAS << (GAMMA_SHIFT - BETA_SHIFT);

/// Radius decay: radius is kept with 6 fractional bits
const INIT_RAD: i32 = (NET_SIZE >> 3) as i32;
const RADIUS_BIAS_SHIFT: u32 = 6;
const RADIUS_BIAS: i32 = 1 << RADIUS_BIAS_SHIFT;
const INIT_RADIUS: i32 = INIT_RAD * RADIUS_BIAS;
const RADIUS_DEC: i32 = 30;

/// Alpha (learning rate) with 10 fractional bits
const ALPHA_BIAS_SHIFT: u32 = 10;
const INIT_ALPHA: i32 = 1 << ALPHA_BIAS_SHIFT;

/// Neighbor weights with 8 fractional bits
const RAD_BIAS_SHIFT: u32 = 8;
const RAD_BIAS: i32 = 1 << RAD_BIAS_SHIFT;
const ALPHA_RAD_BIAS: i32 = 1 << (ALPHA_BIAS_SHIFT + RAD_BIAS_SHIFT);

/// Lowest (finest) quality value
pub const QUALITY_MIN: u8 = 1;

/// Highest (coarsest) quality value
pub const QUALITY_MAX: u8 = 30;

/// One neuron: a color in BGR order, plus its palette index
#[derive(Clone, Copy, Debug, Default)]
struct Neuron {
    /// Blue, green, red
    bgr: [i32; 3],
    /// Palette index (set by unbias)
    index: u8,
}

impl Neuron {
    /// Get squared distance to a color
    fn dist_sq(&self, bgr: [i32; 3]) -> i32 {
        let db = self.bgr[0] - bgr[0];
        let dg = self.bgr[1] - bgr[1];
        let dr = self.bgr[2] - bgr[2];
        db * db + dg * dg + dr * dr
    }

    /// Move toward a color by `weight / scale`
    fn pull(&mut self, bgr: [i32; 3], weight: i32, scale: i32) {
        for (n, c) in self.bgr.iter_mut().zip(bgr.iter()) {
            *n -= (weight * (*n - *c)) / scale;
        }
    }
}

/// Learning state, discarded after the network is built
struct Learner {
    /// Sample factor (1-30)
    sample_fac: usize,
    /// Neuron frequency
    freq: [i32; NET_SIZE],
    /// Neuron bias
    bias: [i32; NET_SIZE],
    /// Neighbor weights for current radius
    rad_power: [i32; INIT_RAD as usize],
}

/// Neural-net color quantizer
#[derive(Clone, Debug)]
pub struct NeuQuant {
    /// Neurons, sorted by green after building the index
    network: Vec<Neuron>,
    /// Starting network position for each green value
    net_index: [usize; 256],
}

impl Learner {
    /// Create learning state
    fn new(sample_fac: usize) -> Self {
        Learner {
            sample_fac,
            freq: [INT_BIAS / NET_SIZE as i32; NET_SIZE],
            bias: [0; NET_SIZE],
            rad_power: [0; INIT_RAD as usize],
        }
    }

    /// Compute neighbor weights for a radius
    fn set_radius(&mut self, alpha: i32, rad: i32) {
        let rad_sq = rad * rad;
        for i in 0..rad {
            self.rad_power[i as usize] =
                alpha * (((rad_sq - i * i) * RAD_BIAS) / rad_sq);
        }
    }

    /// Find the winning neuron for a color.
    ///
    /// The closest neuron's frequency is boosted; the returned neuron is the
    /// closest after subtracting bias, so rarely chosen neurons get a chance
    /// to learn.
    fn contest(&mut self, network: &[Neuron], bgr: [i32; 3]) -> usize {
        let mut best_d = i32::MAX;
        let mut best_bias_d = i32::MAX;
        let mut best_pos = 0;
        let mut best_bias_pos = 0;
        for (i, n) in network.iter().enumerate() {
            // squared distance in 8-bit color units
            let dist = n.dist_sq(bgr) >> (2 * NET_BIAS_SHIFT);
            if dist < best_d {
                best_d = dist;
                best_pos = i;
            }
            let bias_dist =
                dist - (self.bias[i] >> (INT_BIAS_SHIFT - NET_BIAS_SHIFT));
            if bias_dist < best_bias_d {
                best_bias_d = bias_dist;
                best_bias_pos = i;
            }
            let beta_freq = self.freq[i] >> BETA_SHIFT;
            self.freq[i] -= beta_freq;
            self.bias[i] += beta_freq << GAMMA_SHIFT;
        }
        self.freq[best_pos] += BETA;
        self.bias[best_pos] -= BETA_GAMMA;
        best_bias_pos
    }

    /// Move neighbors of neuron `i` toward a color
    fn alter_neighbors(&self, network: &mut [Neuron], rad: i32, i: usize,
        bgr: [i32; 3])
    {
        let i = i as i32;
        let lo = (i - rad).max(-1);
        let hi = (i + rad).min(NET_SIZE as i32);
        let mut j = i + 1;
        let mut k = i - 1;
        let mut m = 1;
        while j < hi || k > lo {
            let a = self.rad_power[m];
            m += 1;
            if j < hi {
                network[j as usize].pull(bgr, a, ALPHA_RAD_BIAS);
                j += 1;
            }
            if k > lo {
                network[k as usize].pull(bgr, a, ALPHA_RAD_BIAS);
                k -= 1;
            }
        }
    }

    /// Get the sample stride (in bytes) for a population
    fn step(len: usize) -> usize {
        let prime = PRIMES.iter()
            .copied()
            .find(|p| len % p != 0)
            .unwrap_or(PRIMES[3]);
        CANONICAL_BPP * prime
    }

    /// Train the network on sampled pixels
    fn learn(&mut self, network: &mut [Neuron], pixels: &[u8]) {
        let len = pixels.len();
        let alpha_dec = 30 + ((self.sample_fac as i32 - 1) / 3);
        let n_samples = len / (CANONICAL_BPP * self.sample_fac);
        let delta = (n_samples / N_CYCLES).max(1);
        let step = Self::step(len);
        let mut alpha = INIT_ALPHA;
        let mut radius = INIT_RADIUS;
        let mut rad = radius >> RADIUS_BIAS_SHIFT;
        if rad <= 1 {
            rad = 0;
        }
        self.set_radius(alpha, rad);
        trace!("learn: {} samples, step {}, alpha dec {}", n_samples, step,
            alpha_dec);
        let mut pos = 0;
        for i in 1..=n_samples {
            let p = &pixels[pos..pos + CANONICAL_BPP];
            let bgr = [
                i32::from(p[0]) << NET_BIAS_SHIFT,
                i32::from(p[1]) << NET_BIAS_SHIFT,
                i32::from(p[2]) << NET_BIAS_SHIFT,
            ];
            let j = self.contest(network, bgr);
            network[j].pull(bgr, alpha, INIT_ALPHA);
            if rad > 0 {
                self.alter_neighbors(network, rad, j, bgr);
            }
            pos = (pos + step) % len;
            if i % delta == 0 {
                alpha -= alpha / alpha_dec;
                radius -= radius / RADIUS_DEC;
                rad = radius >> RADIUS_BIAS_SHIFT;
                if rad <= 1 {
                    rad = 0;
                }
                self.set_radius(alpha, rad);
            }
        }
        trace!("learn: final alpha {}, radius {}", alpha, rad);
    }
}

impl NeuQuant {
    /// Learn a palette from canonical BGR24 pixels.
    ///
    /// * `quality` Sample factor, 1 (best, slowest) to 30 (fastest).
    /// * `pixels` Pixel population; must not be empty.
    pub fn new(quality: u8, pixels: &[u8]) -> Result<Self> {
        let len = pixels.len() / CANONICAL_BPP * CANONICAL_BPP;
        if len == 0 {
            return Err(Error::EmptyInput);
        }
        let pixels = &pixels[..len];
        let quality = quality.max(QUALITY_MIN).min(QUALITY_MAX);
        let sample_fac = if len < MIN_PICTURE_BYTES {
            1
        } else {
            usize::from(quality)
        };
        let mut network = Self::init_network();
        Learner::new(sample_fac).learn(&mut network, pixels);
        let mut nq = NeuQuant {
            network,
            net_index: [0; 256],
        };
        nq.unbias();
        nq.build_index();
        debug!("neuquant: {} pixels, sample factor {}", len / CANONICAL_BPP,
            sample_fac);
        Ok(nq)
    }

    /// Create neurons along the gray ramp
    fn init_network() -> Vec<Neuron> {
        (0..NET_SIZE)
            .map(|i| {
                let v = ((i << (NET_BIAS_SHIFT + 8)) / NET_SIZE) as i32;
                Neuron {
                    bgr: [v, v, v],
                    index: 0,
                }
            })
            .collect()
    }

    /// Remove fixed-point bias and record palette indices
    fn unbias(&mut self) {
        for (i, n) in self.network.iter_mut().enumerate() {
            for c in n.bgr.iter_mut() {
                let v = (*c + (1 << (NET_BIAS_SHIFT - 1))) >> NET_BIAS_SHIFT;
                *c = v.max(0).min(255);
            }
            n.index = i as u8;
        }
    }

    /// Sort network by green and build the green index
    fn build_index(&mut self) {
        let max_pos = NET_SIZE - 1;
        let mut previous = 0;
        let mut start = 0;
        for i in 0..NET_SIZE {
            let mut small_pos = i;
            let mut small_val = self.network[i].bgr[1];
            for j in (i + 1)..NET_SIZE {
                if self.network[j].bgr[1] < small_val {
                    small_pos = j;
                    small_val = self.network[j].bgr[1];
                }
            }
            self.network.swap(i, small_pos);
            let small_val = small_val as usize;
            if small_val != previous {
                self.net_index[previous] = (start + i) >> 1;
                for g in (previous + 1)..small_val {
                    self.net_index[g] = i;
                }
                previous = small_val;
                start = i;
            }
        }
        self.net_index[previous] = (start + max_pos) >> 1;
        for g in (previous + 1)..256 {
            self.net_index[g] = max_pos;
        }
    }

    /// Get the learned palette
    pub fn palette(&self) -> Palette {
        let mut colors = [SRgb8::new(0, 0, 0); NET_SIZE];
        for n in &self.network {
            colors[usize::from(n.index)] =
                SRgb8::new(n.bgr[2] as u8, n.bgr[1] as u8, n.bgr[0] as u8);
        }
        Palette::with_colors(colors.iter().copied())
    }

    /// Find the palette index closest to a color.
    ///
    /// Distance is squared Euclidean; ties go to the lowest index.
    pub fn index_of(&self, b: u8, g: u8, r: u8) -> u8 {
        let bgr = [i32::from(b), i32::from(g), i32::from(r)];
        let mut best_d = i32::MAX;
        let mut best = u8::MAX;
        let mut consider = |n: &Neuron, best_d: &mut i32| {
            let dist = n.dist_sq(bgr);
            if dist < *best_d || (dist == *best_d && n.index < best) {
                *best_d = dist;
                best = n.index;
            }
        };
        let start = self.net_index[usize::from(g)];
        // search upward from start
        for n in &self.network[start..] {
            let dg = n.bgr[1] - bgr[1];
            if dg > 0 && dg * dg > best_d {
                break;
            }
            consider(n, &mut best_d);
        }
        // search downward from start
        for n in self.network[..start].iter().rev() {
            let dg = bgr[1] - n.bgr[1];
            if dg > 0 && dg * dg > best_d {
                break;
            }
            consider(n, &mut best_d);
        }
        best
    }

    /// Map canonical BGR24 pixels to palette indices
    pub fn map_pixels(&self, pixels: &[u8], indices: &mut [u8]) {
        for (idx, p) in indices.iter_mut().zip(pixels.chunks_exact(3)) {
            *idx = self.index_of(p[0], p[1], p[2]);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pix::rgb::Rgb;

    /// Gradient image covering a wide range of colors
    fn gradient(width: usize, height: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                buf.push((x * 255 / (width - 1)) as u8);
                buf.push((y * 255 / (height - 1)) as u8);
                buf.push(((x + y) * 255 / (width + height - 2)) as u8);
            }
        }
        buf
    }

    /// Brute-force nearest index, lowest index on ties
    fn nearest(palette: &Palette, b: u8, g: u8, r: u8) -> u8 {
        let mut best = (i32::MAX, 0);
        for (i, c) in palette.colors().iter().enumerate() {
            let db = i32::from(u8::from(Rgb::blue(*c))) - i32::from(b);
            let dg = i32::from(u8::from(Rgb::green(*c))) - i32::from(g);
            let dr = i32::from(u8::from(Rgb::red(*c))) - i32::from(r);
            let d = db * db + dg * dg + dr * dr;
            if d < best.0 {
                best = (d, i);
            }
        }
        best.1 as u8
    }

    /// Mean squared error of quantized pixels
    fn mean_error(nq: &NeuQuant, pixels: &[u8]) -> f64 {
        let palette = nq.palette();
        let mut total = 0.0;
        for p in pixels.chunks_exact(3) {
            let c = palette.entry(nq.index_of(p[0], p[1], p[2]));
            let db = f64::from(u8::from(Rgb::blue(c))) - f64::from(p[0]);
            let dg = f64::from(u8::from(Rgb::green(c))) - f64::from(p[1]);
            let dr = f64::from(u8::from(Rgb::red(c))) - f64::from(p[2]);
            total += db * db + dg * dg + dr * dr;
        }
        total / (pixels.len() / 3) as f64
    }

    #[test]
    fn empty_input() {
        assert!(matches!(NeuQuant::new(10, &[]), Err(Error::EmptyInput)));
        assert!(matches!(NeuQuant::new(10, &[1, 2]), Err(Error::EmptyInput)));
    }

    #[test]
    fn solid_color() {
        let pixels = [0x10, 0x80, 0xF0].repeat(64);
        let nq = NeuQuant::new(10, &pixels).unwrap();
        let idx = nq.index_of(0x10, 0x80, 0xF0);
        assert_eq!(nq.palette().entry(idx), SRgb8::new(0xF0, 0x80, 0x10));
    }

    #[test]
    fn palette_len() {
        let nq = NeuQuant::new(10, &gradient(32, 32)).unwrap();
        assert_eq!(nq.palette().len(), 256);
    }

    #[test]
    fn lookup_matches_brute_force() {
        let nq = NeuQuant::new(5, &gradient(64, 64)).unwrap();
        let palette = nq.palette();
        for b in (0..=255).step_by(17) {
            for g in (0..=255).step_by(15) {
                for r in (0..=255).step_by(51) {
                    assert_eq!(nq.index_of(b, g, r),
                        nearest(&palette, b, g, r), "{} {} {}", b, g, r);
                }
            }
        }
    }

    #[test]
    fn map_pixels() {
        let pixels = gradient(16, 8);
        let nq = NeuQuant::new(1, &pixels).unwrap();
        let mut indices = vec![0; 16 * 8];
        nq.map_pixels(&pixels, &mut indices);
        for (i, p) in indices.iter().zip(pixels.chunks_exact(3)) {
            assert_eq!(*i, nq.index_of(p[0], p[1], p[2]));
        }
    }

    #[test]
    fn quality_error() {
        let pixels = gradient(128, 128);
        let fine = NeuQuant::new(1, &pixels).unwrap();
        let coarse = NeuQuant::new(30, &pixels).unwrap();
        let fine_err = mean_error(&fine, &pixels);
        let coarse_err = mean_error(&coarse, &pixels);
        assert!(fine_err < coarse_err, "{} >= {}", fine_err, coarse_err);
    }

    #[test]
    fn sample_step() {
        assert_eq!(Learner::step(3 * 1000), 3 * 499);
        assert_eq!(Learner::step(499 * 3), 3 * 491);
    }
}
