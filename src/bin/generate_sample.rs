use std::path::Path;

use anyhow::{Context, Result};

use cubefind::data::loader::write_cube;
use cubefind::data::model::{Cube, Shape};

/// A compact emission source: centre, spatial and spectral width, peak flux.
struct Source {
    x: f64,
    y: f64,
    z: f64,
    sigma_xy: f64,
    sigma_z: f64,
    peak: f64,
}

impl Source {
    fn flux(&self, x: f64, y: f64, z: f64) -> f64 {
        let r2 = ((x - self.x).powi(2) + (y - self.y).powi(2)) / (2.0 * self.sigma_xy.powi(2));
        let s2 = (z - self.z).powi(2) / (2.0 * self.sigma_z.powi(2));
        self.peak * (-(r2 + s2)).exp()
    }
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const OPTIONS: &str = "\
# Sample pipeline options for sample_cube.parquet

steps.doFlag        = true
steps.doThreshold   = true
steps.doWriteMask   = true

import.inFile       = sample_cube.parquet

flag.regions        = [[0, 4, 0, 4, 0, 64]]   # noisy corner

threshold.threshold  = 4.0
threshold.clipMethod = relative
threshold.rmsMode    = mad
threshold.fluxRange  = negative

writeCat.overwrite  = true
";

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let shape = Shape::new(48, 48, 64);
    let noise = 1.0;
    let sources = [
        Source { x: 12.0, y: 30.0, z: 20.0, sigma_xy: 2.0, sigma_z: 3.0, peak: 12.0 },
        Source { x: 35.0, y: 10.0, z: 40.0, sigma_xy: 1.5, sigma_z: 5.0, peak: 8.0 },
        Source { x: 30.0, y: 36.0, z: 50.0, sigma_xy: 3.0, sigma_z: 2.0, peak: 6.0 },
    ];

    let mut cube = Cube::filled(shape, 0.0);
    for z in 0..shape.nz {
        for y in 0..shape.ny {
            for x in 0..shape.nx {
                let (fx, fy, fz) = (x as f64, y as f64, z as f64);
                let signal: f64 = sources.iter().map(|s| s.flux(fx, fy, fz)).sum();
                cube.set(x, y, z, signal + rng.gauss(0.0, noise));
            }
        }
    }

    // Blank a few spectral channels at one edge, as a bad-channel mask would.
    for z in 0..3 {
        for y in 0..shape.ny {
            cube.set(shape.nx - 1, y, z, f64::NAN);
        }
    }

    let cube_path = Path::new("sample_cube.parquet");
    write_cube(cube_path, &cube, true).context("writing sample cube")?;
    std::fs::write("pipeline.options", OPTIONS).context("writing pipeline.options")?;

    println!(
        "Wrote {shape} cube ({} sources, {} NaN voxels) to {} and pipeline.options",
        sources.len(),
        cube.nan_count(),
        cube_path.display()
    );
    Ok(())
}
