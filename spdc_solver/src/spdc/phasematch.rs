use num_complex::Complex;

use crate::{integrator::Integrator, units::C};

use super::SPDC;

/// One of the three beams taking part in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamRole {
    Pump,
    Signal,
    Idler,
}

#[inline]
fn scale(v: [f64; 3], s: f64) -> [f64; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

/// The Gaussian mode parameters of a beam at a given frequency
#[derive(Debug, Clone, Copy)]
struct Mode {
    k: f64,
    rayleigh_range: f64,
    waist_position: f64,
}

impl Mode {
    /// Complex beam parameter `q(z) = (z - z0) + i z_R`
    #[inline]
    fn q(&self, z: f64) -> Complex<f64> {
        Complex::new(z - self.waist_position, self.rayleigh_range)
    }
}

impl SPDC {
    /// Propagation direction of a beam inside the crystal.
    ///
    /// With counter-propagation the signal travels back along `-z`.
    #[must_use]
    pub fn direction(&self, role: BeamRole) -> [f64; 3] {
        let mut direction = self.beam(role).direction();
        if role == BeamRole::Signal && self.crystal.counter_propagation {
            direction[2] = -direction[2];
        }
        direction
    }

    /// Refractive index seen by a beam at angular frequency `omega`
    #[inline]
    #[must_use]
    pub fn refractive_index(&self, role: BeamRole, omega: f64) -> f64 {
        let (pump, signal, idler) = self.polarizations();
        let polarization = match role {
            BeamRole::Pump => pump,
            BeamRole::Signal => signal,
            BeamRole::Idler => idler,
        };
        self.crystal.index_along(
            crate::units::wavelength_from_frequency(omega),
            polarization,
            &self.direction(role),
        )
    }

    /// Magnitude of the wavevector `n omega / c` (rad/m)
    #[inline]
    #[must_use]
    pub fn wavenumber(&self, role: BeamRole, omega: f64) -> f64 {
        self.refractive_index(role, omega) * omega / C
    }

    #[inline]
    fn wavevector(&self, role: BeamRole, omega: f64) -> [f64; 3] {
        scale(self.direction(role), self.wavenumber(role, omega))
    }

    /// Wavevector mismatch for an explicit pump frequency, which need not
    /// satisfy energy conservation.
    ///
    /// ```latex
    /// \Delta k = k_p - k_s - k_i - \frac{2\pi}{\Lambda} \hat{z}
    /// ```
    #[must_use]
    pub fn delta_k_vector_with_pump(
        &self,
        omega_p: f64,
        omega_s: f64,
        omega_i: f64,
    ) -> [f64; 3] {
        let kp = self.wavevector(BeamRole::Pump, omega_p);
        let ks = self.wavevector(BeamRole::Signal, omega_s);
        let ki = self.wavevector(BeamRole::Idler, omega_i);
        [
            kp[0] - ks[0] - ki[0],
            kp[1] - ks[1] - ki[1],
            kp[2] - ks[2] - ki[2] - self.poling.grating_wavevector(),
        ]
    }

    /// Wavevector mismatch with the pump photon `omega_s + omega_i`
    #[inline]
    #[must_use]
    pub fn delta_k_vector(&self, omega_s: f64, omega_i: f64) -> [f64; 3] {
        self.delta_k_vector_with_pump(omega_s + omega_i, omega_s, omega_i)
    }

    /// Longitudinal wavevector mismatch (rad/m) with the pump photon `omega_s + omega_i`
    #[inline]
    #[must_use]
    pub fn delta_k(&self, omega_s: f64, omega_i: f64) -> f64 {
        self.delta_k_vector(omega_s, omega_i)[2]
    }

    #[inline]
    #[must_use]
    pub fn delta_k_with_pump(&self, omega_p: f64, omega_s: f64, omega_i: f64) -> f64 {
        self.delta_k_vector_with_pump(omega_p, omega_s, omega_i)[2]
    }

    fn mode(&self, role: BeamRole, omega: f64) -> Mode {
        let beam = self.beam(role);
        let k = self.wavenumber(role, omega);
        Mode {
            k,
            rayleigh_range: beam.rayleigh_range(k),
            waist_position: beam.waist_position,
        }
    }

    /// Plane wave phase matching `sinc(Delta k L / 2)`
    #[must_use]
    pub fn phasematch_collinear_sinc(&self, omega_s: f64, omega_i: f64) -> f64 {
        let x = 0.5 * self.delta_k(omega_s, omega_i) * self.crystal.length;
        if x.abs() < 1e-12 {
            1.0
        } else {
            x.sin() / x
        }
    }

    /// Phase matching amplitude of the pair (`omega_s`, `omega_i`) with
    /// Gaussian pump, signal and idler modes.
    ///
    /// ```latex
    /// \Phi = \frac{1}{L} \int_{-L/2}^{L/2} a(z) O(z) e^{i \Delta k_z z} dz
    /// ```
    /// where `O(z)` is the transverse overlap of the three modes, normalised
    /// to one at a common focus with no transverse mismatch.
    #[must_use]
    pub fn phasematch<I: Integrator>(&self, omega_s: f64, omega_i: f64, integrator: &I) -> Complex<f64> {
        let omega_p = omega_s + omega_i;
        let delta_k = self.delta_k_vector(omega_s, omega_i);
        let transverse = delta_k[0] * delta_k[0] + delta_k[1] * delta_k[1];
        let modes = [
            self.mode(BeamRole::Pump, omega_p),
            self.mode(BeamRole::Signal, omega_s),
            self.mode(BeamRole::Idler, omega_i),
        ];
        let focus = 1.0 / (self.pump.waist * self.pump.waist)
            + 1.0 / (self.signal.waist * self.signal.waist)
            + 1.0 / (self.idler.waist * self.idler.waist);
        self.longitudinal_integral(delta_k[2], integrator, |z| {
            overlap(&modes, focus, transverse, z)
        })
    }

    /// Phase matching amplitude for signal singles, where the idler is
    /// collected without any spatial filtering.
    #[must_use]
    pub fn phasematch_singles<I: Integrator>(
        &self,
        omega_s: f64,
        omega_i: f64,
        integrator: &I,
    ) -> Complex<f64> {
        let omega_p = omega_s + omega_i;
        let modes = [
            self.mode(BeamRole::Pump, omega_p),
            self.mode(BeamRole::Signal, omega_s),
        ];
        let focus = 1.0 / (self.pump.waist * self.pump.waist)
            + 1.0 / (self.signal.waist * self.signal.waist);
        self.longitudinal_integral(self.delta_k(omega_s, omega_i), integrator, |z| {
            overlap(&modes, focus, 0.0, z)
        })
    }

    fn longitudinal_integral<I: Integrator, F: Fn(f64) -> Complex<f64>>(
        &self,
        delta_kz: f64,
        integrator: &I,
        overlap: F,
    ) -> Complex<f64> {
        let length = self.crystal.length;
        let apodization = &self.apodization;
        let integral = integrator.integrate(
            |z| {
                let a = apodization.value(z, length);
                if a == 0.0 {
                    return Complex::new(0.0, 0.0);
                }
                overlap(z) * Complex::from_polar(a, delta_kz * z)
            },
            -0.5 * length,
            0.5 * length,
        );
        integral / length
    }

    /// Group index `c dk/d omega` of a beam, by central differences
    #[must_use]
    pub fn group_index(&self, role: BeamRole, omega: f64) -> f64 {
        let h = 1e-4 * omega;
        let dk = self.wavenumber(role, omega + h) - self.wavenumber(role, omega - h);
        C * dk / (2.0 * h)
    }

    /// Group velocity (m/s) of a beam
    #[must_use]
    pub fn group_velocity(&self, role: BeamRole, omega: f64) -> f64 {
        C / self.group_index(role, omega)
    }
}

/// Overlap of the pump mode (first) with the conjugates of the generated modes.
///
/// ```latex
/// O(z) = \prod_j \left(\pm i z_{R,j} / q_j\right) \frac{S_0}{S(z)} e^{-|\Delta k_\perp|^2 / 4S(z)}
/// ```
#[inline]
fn overlap(modes: &[Mode], focus: f64, transverse: f64, z: f64) -> Complex<f64> {
    let i = Complex::<f64>::i();
    let mut s = Complex::new(0.0, 0.0);
    let mut prefactor = Complex::new(1.0, 0.0);
    for (index, mode) in modes.iter().enumerate() {
        if index == 0 {
            let q = mode.q(z);
            s += i * mode.k / (2.0 * q);
            prefactor *= i * mode.rayleigh_range / q;
        } else {
            let q = mode.q(z).conj();
            s -= i * mode.k / (2.0 * q);
            prefactor *= -i * mode.rayleigh_range / q;
        }
    }
    prefactor * (focus / s) * (-transverse / (4.0 * s)).exp()
}
