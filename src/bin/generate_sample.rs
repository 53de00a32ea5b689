use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

/// Write a synthetic two-channel Digital Wave capture and its time file.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Capture file to write; the time file lands next to it as `<stem>_time.txt`
    #[clap(long, default_value = "sample_capture.txt")]
    output: PathBuf,

    /// Number of events
    #[clap(long, default_value = "20")]
    events: usize,

    /// Samples per waveform
    #[clap(long, default_value = "1024")]
    samples: usize,

    /// Sampling frequency in MHz
    #[clap(long, default_value = "10")]
    fs_mhz: u32,

    /// Every n-th event is background noise only
    #[clap(long, default_value = "4")]
    noise_every: usize,

    #[clap(long, default_value = "42")]
    seed: u64,
}

/// Decaying burst starting at `onset_us`.
fn burst(t_us: f64, onset_us: f64, freq_mhz: f64, amplitude: f64, decay_us: f64) -> f64 {
    if t_us < onset_us {
        return 0.0;
    }
    let dt = t_us - onset_us;
    amplitude * (-dt / decay_us).exp() * (2.0 * std::f64::consts::PI * freq_mhz * dt).sin()
}

fn waveform(
    samples: usize,
    period_us: f64,
    hit: Option<(f64, f64)>,
    noise_level: f64,
    rng: &mut Noise,
) -> Vec<f64> {
    (0..samples)
        .map(|i| {
            let t = i as f64 * period_us;
            let signal = hit.map_or(0.0, |(onset, amp)| burst(t, onset, 0.3, amp, 15.0));
            signal + rng.gauss(noise_level)
        })
        .collect()
}

/// Seeded noise source: splitmix64 draws, normal samples by the polar method.
struct Noise {
    state: u64,
    spare: Option<f64>,
}

impl Noise {
    fn seeded(seed: u64) -> Self {
        Self { state: seed, spare: None }
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        ((z ^ (z >> 31)) >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    fn gauss(&mut self, std_dev: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return std_dev * z;
        }
        loop {
            let u = 2.0 * self.unit() - 1.0;
            let v = 2.0 * self.unit() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let scale = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * scale);
                return std_dev * u * scale;
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut rng = Noise::seeded(cli.seed);
    let period_us = 1.0 / f64::from(cli.fs_mhz);
    let window_us = cli.samples as f64 * period_us;

    let mut channels: [Vec<Vec<f64>>; 2] = [Vec::new(), Vec::new()];
    let mut times = Vec::with_capacity(cli.events);
    let mut clock = 0.0;

    for n in 0..cli.events {
        let is_noise = cli.noise_every > 0 && (n + 1) % cli.noise_every == 0;
        // Sensor 2 sits further from the source: later and weaker.
        let onset = rng.uniform(0.1, 0.3) * window_us;
        let amplitude = rng.uniform(0.05, 0.5);
        let hits = if is_noise {
            [None, None]
        } else {
            [
                Some((onset, amplitude)),
                Some((onset + rng.uniform(1.0, 8.0), amplitude * 0.7)),
            ]
        };
        for (channel, hit) in channels.iter_mut().zip(hits) {
            channel.push(waveform(cli.samples, period_us, hit, 0.002, &mut rng));
        }
        clock += rng.uniform(0.01, 2.0);
        times.push(clock);
    }

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{} 0 {} 2", cli.fs_mhz, cli.samples)?;
    for n in 0..cli.events {
        for i in 0..cli.samples {
            writeln!(out, "{:.6e} {:.6e}", channels[0][n][i], channels[1][n][i])?;
        }
    }
    out.flush()?;

    let stem = cli
        .output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sample_capture".to_string());
    let time_path = cli.output.with_file_name(format!("{stem}_time.txt"));
    let mut out = BufWriter::new(
        File::create(&time_path).with_context(|| format!("creating {}", time_path.display()))?,
    );
    writeln!(out, "id time_s")?;
    for (n, t) in times.iter().enumerate() {
        writeln!(out, "{} {t:.6}", n + 1)?;
    }
    out.flush()?;

    println!(
        "Wrote {} events ({} samples, 2 channels) to {} and {}",
        cli.events,
        cli.samples,
        cli.output.display(),
        time_path.display()
    );
    Ok(())
}
