//! Euler–Maruyama scheme.

use ndarray::{Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use super::Integrator;
use crate::error::SimError;
use crate::population::{Diffusion, Population};

/// `x ← clamp(x + drift·dt + g(noise)·√dt)`.
///
/// One standard-normal matrix shaped like `x` is drawn per population per
/// step, whether or not the population is stochastic, so the noise stream
/// does not depend on which models are present.
#[derive(Debug)]
pub struct EulerMaruyama {
    dt: f64,
    rng: StdRng,
}

impl EulerMaruyama {
    /// Creates an integrator with timestep `dt`; entropy-seeded when `seed`
    /// is `None`.
    pub fn new(dt: f64, seed: Option<u64>) -> Result<Self, SimError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SimError::InvalidTimestep(dt));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self { dt, rng })
    }

    fn stochastic_term(
        population: &Population,
        diffusion: Diffusion,
        noise: &Array2<f64>,
    ) -> Result<Option<Array2<f64>>, SimError> {
        let (n, d) = noise.dim();
        let mismatch = |found: (usize, usize)| SimError::ShapeMismatch {
            population: population.name().to_string(),
            what: "diffusion",
            expected: (n, d),
            found,
        };
        match diffusion {
            Diffusion::None => Ok(None),
            Diffusion::Diagonal(g) => {
                if g.dim() != (n, d) {
                    return Err(mismatch(g.dim()));
                }
                Ok(Some(g * noise))
            }
            Diffusion::Correlated(g) => {
                let (gn, ga, gb) = g.dim();
                if (gn, ga, gb) != (n, d, d) {
                    return Err(mismatch((gn, ga * gb)));
                }
                let mut term = Array2::<f64>::zeros((n, d));
                for (i, mut row) in term.axis_iter_mut(Axis(0)).enumerate() {
                    row.assign(&g.index_axis(Axis(0), i).dot(&noise.row(i)));
                }
                Ok(Some(term))
            }
        }
    }
}

fn standard_normal(shape: (usize, usize), rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_simple_fn(shape, || rng.sample(StandardNormal))
}

impl Integrator for EulerMaruyama {
    fn name(&self) -> &str {
        "EulerMaruyama"
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn step(&mut self, populations: &mut [Population]) -> Result<(), SimError> {
        let dt = self.dt;
        let sqrt_dt = dt.sqrt();

        let mut next = Vec::with_capacity(populations.len());
        for population in populations.iter() {
            let noise = standard_normal(population.state().dim(), &mut self.rng);
            let drift = population.drift()?;
            let stochastic = Self::stochastic_term(population, population.diffusion()?, &noise)?;

            let mut x = population.state().clone();
            Zip::from(&mut x).and(&drift).for_each(|x, &a| *x += a * dt);
            if let Some(term) = stochastic {
                x.scaled_add(sqrt_dt, &term);
            }
            next.push(x);
        }

        for (population, x) in populations.iter_mut().zip(next) {
            population.set_state(x)?;
            population.clamp_state();
            population.latch_input();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSpec;
    use crate::population::{ModelConfig, PopulationConfig};
    use ndarray::array;

    fn driven(states: Vec<Vec<f64>>, u: Array2<f64>) -> Population {
        let mut pop = Population::new(PopulationConfig::explicit(
            "driven",
            states,
            ModelConfig::Fixed,
        ))
        .unwrap();
        pop.reset().unwrap();
        pop.set_input(u).unwrap();
        pop
    }

    fn brownian(correlated: bool, d: f64) -> Population {
        let mut config = PopulationConfig::explicit(
            "brownian",
            vec![vec![0.0, 0.0]; 3],
            ModelConfig::BrownianMotion { correlated },
        );
        config.parameters = Some(ParameterSpec::constants([("mu", 1.0), ("D", d)]));
        let mut pop = Population::new(config).unwrap();
        pop.reset().unwrap();
        pop
    }

    #[test]
    fn rejects_bad_timestep() {
        assert!(matches!(
            EulerMaruyama::new(0.0, None),
            Err(SimError::InvalidTimestep(_))
        ));
        assert!(EulerMaruyama::new(f64::NAN, None).is_err());
    }

    #[test]
    fn zero_diffusion_is_plain_euler() {
        let mut pops = vec![driven(
            vec![vec![1.0, 2.0], vec![0.0, 0.0]],
            array![[1.0, -1.0], [10.0, 0.0]],
        )];
        let mut integrator = EulerMaruyama::new(0.1, None).unwrap();
        integrator.step(&mut pops).unwrap();
        let x = pops[0].state();
        assert!((x[[0, 0]] - 1.1).abs() < 1e-12);
        assert!((x[[0, 1]] - 1.9).abs() < 1e-12);
        assert!((x[[1, 0]] - 1.0).abs() < 1e-12);
        assert_eq!(x[[1, 1]], 0.0);
    }

    #[test]
    fn zero_noise_amplitude_is_deterministic_across_seeds() {
        let mut a = vec![brownian(false, 0.0)];
        let mut b = vec![brownian(false, 0.0)];
        EulerMaruyama::new(0.5, Some(1)).unwrap().step(&mut a).unwrap();
        EulerMaruyama::new(0.5, Some(2)).unwrap().step(&mut b).unwrap();
        assert_eq!(a[0].state(), b[0].state());
        assert!(a[0].state().iter().all(|v| (*v - 0.5).abs() < 1e-12));
    }

    #[test]
    fn same_seed_reproduces_noise() {
        for correlated in [false, true] {
            let mut a = vec![brownian(correlated, 1.0)];
            let mut b = vec![brownian(correlated, 1.0)];
            let mut ia = EulerMaruyama::new(0.01, Some(9)).unwrap();
            let mut ib = EulerMaruyama::new(0.01, Some(9)).unwrap();
            for _ in 0..5 {
                ia.step(&mut a).unwrap();
                ib.step(&mut b).unwrap();
            }
            assert_eq!(a[0].state(), b[0].state());
            assert!(a[0].state().iter().any(|v| (*v - 0.05).abs() > 1e-9));
        }
    }

    #[test]
    fn diagonal_matrix_matches_vector_diffusion() {
        let mut diag = vec![brownian(false, 0.7)];
        let mut corr = vec![brownian(true, 0.7)];
        EulerMaruyama::new(0.01, Some(3)).unwrap().step(&mut diag).unwrap();
        EulerMaruyama::new(0.01, Some(3)).unwrap().step(&mut corr).unwrap();
        for (a, b) in diag[0].state().iter().zip(corr[0].state().iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn correlated_diffusion_multiplies_matrix_by_noise() {
        let mut config = PopulationConfig::explicit(
            "sheared",
            vec![vec![0.0, 0.0]; 2],
            ModelConfig::BrownianMotion { correlated: true },
        );
        config.parameters = Some(
            serde_json::from_str(
                r#"{"mode": "generate", "generate": {"mu": 0.0, "D": [[1.0, 2.0], [0.0, 1.0]]}}"#,
            )
            .unwrap(),
        );
        let mut pop = Population::new(config).unwrap();
        pop.reset().unwrap();
        let mut pops = vec![pop];
        EulerMaruyama::new(1.0, Some(21)).unwrap().step(&mut pops).unwrap();

        let noise = standard_normal((2, 2), &mut StdRng::seed_from_u64(21));
        let x = pops[0].state();
        for i in 0..2 {
            assert!((x[[i, 0]] - (noise[[i, 0]] + 2.0 * noise[[i, 1]])).abs() < 1e-12);
            assert!((x[[i, 1]] - noise[[i, 1]]).abs() < 1e-12);
        }
    }

    #[test]
    fn input_step_kicks_walker_once() {
        let mut config = PopulationConfig::explicit(
            "walker",
            vec![vec![0.0; 5]],
            ModelConfig::PersistentTurningWalker { dt: 0.5 },
        );
        config.input_dim = Some(1);
        config.parameters = Some(ParameterSpec::constants(
            [
                "theta_s", "mu_s", "alpha_s", "gamma_s", "sigma_s", "theta_w", "mu_w", "alpha_w",
                "beta_w", "gamma_w", "sigma_w",
            ]
            .into_iter()
            .map(|name| (name, 0.0))
            .chain([("beta_s", 1.0)]),
        ));
        let mut pop = Population::new(config).unwrap();
        pop.reset().unwrap();
        pop.set_input(array![[1.0]]).unwrap();
        let mut pops = vec![pop];
        let mut integrator = EulerMaruyama::new(0.1, Some(0)).unwrap();

        integrator.step(&mut pops).unwrap();
        assert!((pops[0].state()[[0, 2]] - 0.2).abs() < 1e-12);
        assert_eq!(pops[0].previous_input(), &array![[1.0]]);

        integrator.step(&mut pops).unwrap();
        let x = pops[0].state();
        assert!((x[[0, 2]] - 0.2).abs() < 1e-12);
        assert!((x[[0, 0]] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn clamp_bounds_hold_under_large_drift() {
        let mut config = PopulationConfig::explicit(
            "walled",
            vec![vec![0.0, 0.0], vec![1.0, -1.0]],
            ModelConfig::Fixed,
        );
        config.lim_i = Some(vec![-1.0, -2.0]);
        config.lim_s = Some(vec![1.0, 2.0]);
        let mut pop = Population::new(config).unwrap();
        pop.reset().unwrap();
        pop.set_input(array![[1e6, -1e6], [-1e6, 1e6]]).unwrap();
        let mut pops = vec![pop];
        EulerMaruyama::new(1.0, Some(0)).unwrap().step(&mut pops).unwrap();
        assert_eq!(pops[0].state(), &array![[1.0, -2.0], [-1.0, 2.0]]);
    }
}
