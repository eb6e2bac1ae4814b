//! Rectangular (signal, idler) sampling regions.
//!
//! Each axis is a [`Steps`]: `n` evenly spaced samples from `start` to `end`
//! inclusive. Bounds are kept in ascending order, so converting a frequency space
//! to wavelengths swaps which bound is which, and converting back restores them.
//!
//! A single sample (`n == 1`) sits at the midpoint of the bounds and is given the
//! full interval as its width.

use itertools::Itertools;

use crate::error::{Result, SpdcError};
use crate::units::{frequency_from_wavelength, wavelength_from_frequency};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steps {
    start: f64,
    end: f64,
    n: usize,
}

impl Steps {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if the bounds are not finite, are equal, or
    /// if `n` is zero. Reversed bounds are reordered.
    pub fn new(start: f64, end: f64, n: usize) -> Result<Self> {
        if !(start.is_finite() && end.is_finite()) {
            return Err(SpdcError::Domain(format!(
                "range bounds must be finite, got ({start}, {end})"
            )));
        }
        if start == end {
            return Err(SpdcError::Domain(format!(
                "range bounds must be distinct, got ({start}, {end})"
            )));
        }
        if n == 0 {
            return Err(SpdcError::Domain("resolution must be at least 1".to_owned()));
        }
        Ok(Steps {
            start: start.min(end),
            end: start.max(end),
            n,
        })
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        (self.start, self.end)
    }

    /// Spacing between consecutive samples
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn division_width(&self) -> f64 {
        if self.n == 1 {
            self.end - self.start
        } else {
            (self.end - self.start) / (self.n - 1) as f64
        }
    }

    #[allow(clippy::cast_precision_loss)]
    #[inline]
    #[must_use]
    pub fn value(&self, index: usize) -> f64 {
        if self.n == 1 {
            return 0.5 * (self.start + self.end);
        }
        if index + 1 == self.n {
            return self.end;
        }
        self.start + (index as f64) * self.division_width()
    }

    /// Same bounds, `n` samples
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `n` is zero.
    pub fn with_len(&self, n: usize) -> Result<Self> {
        Steps::new(self.start, self.end, n)
    }

    #[must_use]
    pub fn iter(&self) -> StepsIter {
        StepsIter {
            steps: *self,
            index: 0,
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct StepsIter {
    steps: Steps,
    index: usize,
}

impl Iterator for StepsIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.steps.n {
            return None;
        }
        let value = self.steps.value(self.index);
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.steps.n - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StepsIter {}

impl IntoIterator for Steps {
    type Item = f64;
    type IntoIter = StepsIter;

    fn into_iter(self) -> StepsIter {
        self.iter()
    }
}

/// A pair of sample axes, iterated row major (first axis outer).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steps2D(pub Steps, pub Steps);

impl Steps2D {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if either axis is invalid.
    pub fn new(x: (f64, f64, usize), y: (f64, f64, usize)) -> Result<Self> {
        Ok(Steps2D(Steps::new(x.0, x.1, x.2)?, Steps::new(y.0, y.1, y.2)?))
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.0.len(), self.1.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len() * self.1.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `n` is zero.
    pub fn with_resolution(&self, n: usize) -> Result<Self> {
        Ok(Steps2D(self.0.with_len(n)?, self.1.with_len(n)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + Clone {
        self.0.iter().cartesian_product(self.1.iter())
    }
}

/// Anything that can be walked as `(signal, idler)` angular frequency pairs (rad/s).
pub trait IntoSignalIdlerIterator {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)>;

    fn into_signal_idler_vec(self) -> Vec<(f64, f64)>
    where
        Self: Sized,
    {
        self.into_signal_idler_iterator().collect()
    }
}

/// Signal and idler angular frequency ranges (rad/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencySpace(Steps2D);

impl FrequencySpace {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] for non-positive frequencies.
    pub fn new(signal: Steps, idler: Steps) -> Result<Self> {
        ensure_positive_axis("signal frequency", &signal)?;
        ensure_positive_axis("idler frequency", &idler)?;
        Ok(FrequencySpace(Steps2D(signal, idler)))
    }

    /// Square space of `n` x `n` samples spanning `center ± half_width` on each axis.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if a range is degenerate or reaches zero frequency.
    pub fn from_center(
        signal: (f64, f64),
        idler: (f64, f64),
        n: usize,
    ) -> Result<Self> {
        FrequencySpace::new(
            Steps::new(signal.0 - signal.1, signal.0 + signal.1, n)?,
            Steps::new(idler.0 - idler.1, idler.0 + idler.1, n)?,
        )
    }

    #[must_use]
    pub fn signal(&self) -> Steps {
        self.0 .0
    }

    #[must_use]
    pub fn idler(&self) -> Steps {
        self.0 .1
    }

    #[must_use]
    pub fn steps(&self) -> Steps2D {
        self.0
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.0.shape()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same bounds with `n` samples per axis
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `n` is zero.
    pub fn set_resolution(&self, n: usize) -> Result<Self> {
        Ok(FrequencySpace(self.0.with_resolution(n)?))
    }

    /// The space with the signal and idler axes exchanged
    #[must_use]
    pub fn swapped(&self) -> Self {
        FrequencySpace(Steps2D(self.idler(), self.signal()))
    }

    /// The same region expressed as vacuum wavelengths (bounds map exactly).
    #[must_use]
    pub fn to_wavelength_space(&self) -> WavelengthSpace {
        WavelengthSpace(Steps2D(
            invert_axis(self.signal(), wavelength_from_frequency),
            invert_axis(self.idler(), wavelength_from_frequency),
        ))
    }

    /// Rectangle in (sum, difference) frequency enclosing this space.
    #[must_use]
    pub fn to_sum_diff_frequency_space(&self) -> SumDiffFrequencySpace {
        let (s0, s1) = self.signal().bounds();
        let (i0, i1) = self.idler().bounds();
        let sum = Steps {
            start: s0 + i0,
            end: s1 + i1,
            n: self.signal().len(),
        };
        let diff = Steps {
            start: s0 - i1,
            end: s1 - i0,
            n: self.idler().len(),
        };
        SumDiffFrequencySpace(Steps2D(sum, diff))
    }
}

impl IntoSignalIdlerIterator for FrequencySpace {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0.iter()
    }
}

impl IntoSignalIdlerIterator for &FrequencySpace {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0.iter()
    }
}

/// Signal and idler vacuum wavelength ranges (m).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthSpace(Steps2D);

impl WavelengthSpace {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] for non-positive wavelengths.
    pub fn new(signal: Steps, idler: Steps) -> Result<Self> {
        ensure_positive_axis("signal wavelength", &signal)?;
        ensure_positive_axis("idler wavelength", &idler)?;
        Ok(WavelengthSpace(Steps2D(signal, idler)))
    }

    #[must_use]
    pub fn signal(&self) -> Steps {
        self.0 .0
    }

    #[must_use]
    pub fn idler(&self) -> Steps {
        self.0 .1
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.0.shape()
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `n` is zero.
    pub fn set_resolution(&self, n: usize) -> Result<Self> {
        Ok(WavelengthSpace(self.0.with_resolution(n)?))
    }

    #[must_use]
    pub fn to_frequency_space(&self) -> FrequencySpace {
        FrequencySpace(Steps2D(
            invert_axis(self.signal(), frequency_from_wavelength),
            invert_axis(self.idler(), frequency_from_wavelength),
        ))
    }
}

impl IntoSignalIdlerIterator for WavelengthSpace {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0
            .iter()
            .map(|(ls, li)| (frequency_from_wavelength(ls), frequency_from_wavelength(li)))
    }
}

/// Sum and difference angular frequency ranges, `(ws + wi, ws - wi)` (rad/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SumDiffFrequencySpace(Steps2D);

impl SumDiffFrequencySpace {
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if the sum range is not positive.
    pub fn new(sum: Steps, diff: Steps) -> Result<Self> {
        ensure_positive_axis("sum frequency", &sum)?;
        Ok(SumDiffFrequencySpace(Steps2D(sum, diff)))
    }

    #[must_use]
    pub fn sum(&self) -> Steps {
        self.0 .0
    }

    #[must_use]
    pub fn diff(&self) -> Steps {
        self.0 .1
    }

    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if `n` is zero.
    pub fn set_resolution(&self, n: usize) -> Result<Self> {
        Ok(SumDiffFrequencySpace(self.0.with_resolution(n)?))
    }

    /// Rectangle in (signal, idler) frequency enclosing this space.
    ///
    /// # Errors
    ///
    /// Returns [`SpdcError::Domain`] if the enclosing idler range reaches zero frequency.
    pub fn to_frequency_space(&self) -> Result<FrequencySpace> {
        let (sum0, sum1) = self.sum().bounds();
        let (diff0, diff1) = self.diff().bounds();
        FrequencySpace::new(
            Steps::new(0.5 * (sum0 + diff0), 0.5 * (sum1 + diff1), self.sum().len())?,
            Steps::new(0.5 * (sum0 - diff1), 0.5 * (sum1 - diff0), self.diff().len())?,
        )
    }
}

impl IntoSignalIdlerIterator for SumDiffFrequencySpace {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0
            .iter()
            .map(|(sum, diff)| (0.5 * (sum + diff), 0.5 * (sum - diff)))
    }
}

/// Explicit `(signal, idler)` angular frequency pairs (rad/s).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalIdlerFrequencyArray(pub Vec<(f64, f64)>);

impl IntoSignalIdlerIterator for SignalIdlerFrequencyArray {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0.into_iter()
    }
}

/// Explicit `(signal, idler)` vacuum wavelength pairs (m).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalIdlerWavelengthArray(pub Vec<(f64, f64)>);

impl IntoSignalIdlerIterator for SignalIdlerWavelengthArray {
    fn into_signal_idler_iterator(self) -> impl Iterator<Item = (f64, f64)> {
        self.0
            .into_iter()
            .map(|(ls, li)| (frequency_from_wavelength(ls), frequency_from_wavelength(li)))
    }
}

fn ensure_positive_axis(quantity: &str, steps: &Steps) -> Result<()> {
    if steps.start > 0.0 {
        Ok(())
    } else {
        Err(SpdcError::Domain(format!(
            "{quantity} range must be positive, got ({}, {})",
            steps.start, steps.end
        )))
    }
}

/// Map an axis through a decreasing conversion, keeping ascending bounds.
fn invert_axis(steps: Steps, convert: fn(f64) -> f64) -> Steps {
    Steps {
        start: convert(steps.end),
        end: convert(steps.start),
        n: steps.n,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::units::NANO;

    fn get_frequency_space() -> FrequencySpace {
        WavelengthSpace::new(
            Steps::new(1500.0 * NANO, 1600.0 * NANO, 11).unwrap(),
            Steps::new(1520.0 * NANO, 1580.0 * NANO, 7).unwrap(),
        )
        .unwrap()
        .to_frequency_space()
    }

    #[test]
    fn test_steps_values() {
        let steps = Steps::new(1.0, 2.0, 5).unwrap();
        assert_eq!(steps.to_vec(), vec![1.0, 1.25, 1.5, 1.75, 2.0]);
        assert_relative_eq!(steps.division_width(), 0.25);

        let reversed = Steps::new(2.0, 1.0, 5).unwrap();
        assert_eq!(reversed, steps);
    }

    #[test]
    fn test_single_step_is_midpoint() {
        let steps = Steps::new(1.0, 3.0, 1).unwrap();
        assert_eq!(steps.to_vec(), vec![2.0]);
        assert_relative_eq!(steps.division_width(), 2.0);
    }

    #[test]
    fn test_invalid_steps() {
        assert!(matches!(Steps::new(1.0, 1.0, 3), Err(SpdcError::Domain(_))));
        assert!(matches!(Steps::new(1.0, 2.0, 0), Err(SpdcError::Domain(_))));
        assert!(matches!(
            Steps::new(f64::NAN, 2.0, 3),
            Err(SpdcError::Domain(_))
        ));
        assert!(FrequencySpace::new(
            Steps::new(-1.0, 2.0, 3).unwrap(),
            Steps::new(1.0, 2.0, 3).unwrap()
        )
        .is_err());
    }

    #[test]
    fn test_wavelength_round_trip() {
        let space = get_frequency_space();
        let round_trip = space.to_wavelength_space().to_frequency_space();
        for (a, b) in [
            (space.signal(), round_trip.signal()),
            (space.idler(), round_trip.idler()),
        ] {
            assert_relative_eq!(a.start(), b.start(), max_relative = 1e-14);
            assert_relative_eq!(a.end(), b.end(), max_relative = 1e-14);
            assert_eq!(a.len(), b.len());
        }
    }

    #[test]
    fn test_set_resolution_keeps_bounds() {
        let space = get_frequency_space();
        let resized = space.set_resolution(101).unwrap();
        assert_eq!(resized.shape(), (101, 101));
        assert_eq!(resized.signal().bounds(), space.signal().bounds());
        assert_eq!(resized.idler().bounds(), space.idler().bounds());
        assert!(space.set_resolution(0).is_err());
    }

    #[test]
    fn test_iteration_is_row_major() {
        let space = get_frequency_space();
        let points = space.into_signal_idler_vec();
        assert_eq!(points.len(), 11 * 7);
        assert_eq!(points[0], (space.signal().value(0), space.idler().value(0)));
        assert_eq!(points[1], (space.signal().value(0), space.idler().value(1)));
        assert_eq!(points[7], (space.signal().value(1), space.idler().value(0)));
    }

    #[test]
    fn test_wavelength_iteration_yields_frequencies() {
        let space = WavelengthSpace::new(
            Steps::new(1500.0 * NANO, 1600.0 * NANO, 3).unwrap(),
            Steps::new(1500.0 * NANO, 1600.0 * NANO, 3).unwrap(),
        )
        .unwrap();
        let (ws, wi) = space.into_signal_idler_iterator().next().unwrap();
        assert_relative_eq!(ws, frequency_from_wavelength(1500.0 * NANO));
        assert_relative_eq!(wi, frequency_from_wavelength(1500.0 * NANO));
    }

    #[test]
    fn test_sum_diff_iteration() {
        let space = SumDiffFrequencySpace::new(
            Steps::new(4.0, 6.0, 3).unwrap(),
            Steps::new(-1.0, 1.0, 3).unwrap(),
        )
        .unwrap();
        let points = space.into_signal_idler_vec();
        assert_eq!(points[0], (1.5, 2.5));
        assert_eq!(points[4], (2.5, 2.5));

        let enclosing = space.to_frequency_space().unwrap();
        assert_eq!(enclosing.signal().bounds(), (1.5, 3.5));
        assert_eq!(enclosing.idler().bounds(), (1.5, 3.5));
        assert!(points.iter().all(|&(ws, wi)| (1.5..=3.5).contains(&ws)
            && (1.5..=3.5).contains(&wi)));
    }

    #[test]
    fn test_sum_diff_encloses_frequency_space() {
        let space = get_frequency_space();
        let enclosing = space
            .to_sum_diff_frequency_space()
            .to_frequency_space()
            .unwrap();
        let (s0, s1) = space.signal().bounds();
        let (e0, e1) = enclosing.signal().bounds();
        assert!(e0 <= s0 && e1 >= s1);
        let (i0, i1) = space.idler().bounds();
        let (e0, e1) = enclosing.idler().bounds();
        assert!(e0 <= i0 && e1 >= i1);
    }
}
