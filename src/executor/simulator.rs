//! Built-in state-vector simulator.
//!
//! Applies the circuit's gates to a dense amplitude vector, then samples the
//! measured qubits `shots` times. All measurements are terminal (the parser
//! rejects gates after a measurement), so sampling the final state is exact.

use std::collections::HashMap;
use std::f64::consts::FRAC_1_SQRT_2;
use std::ops::{Add, Mul};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::ExecutorError;
use crate::executor::CircuitExecutor;
use crate::executor::qasm::{self, Circuit, Gate, Op};
use crate::tasks::model::Counts;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Self = Self::new(0.0, 0.0);
    const ONE: Self = Self::new(1.0, 0.0);
    const I: Self = Self::new(0.0, 1.0);

    const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }
}

impl Add for Complex {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

/// Row-major 2x2 unitary.
type Matrix = [[Complex; 2]; 2];

fn single_qubit_matrix(gate: Gate) -> Option<Matrix> {
    use Complex as C;
    let h = C::new(FRAC_1_SQRT_2, 0.0);
    let t = C::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2);
    let t_dg = C::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2);

    Some(match gate {
        Gate::H => [[h, h], [h, C::new(-FRAC_1_SQRT_2, 0.0)]],
        Gate::X => [[C::ZERO, C::ONE], [C::ONE, C::ZERO]],
        Gate::Y => [[C::ZERO, C::new(0.0, -1.0)], [C::I, C::ZERO]],
        Gate::Z => [[C::ONE, C::ZERO], [C::ZERO, C::new(-1.0, 0.0)]],
        Gate::S => [[C::ONE, C::ZERO], [C::ZERO, C::I]],
        Gate::Sdg => [[C::ONE, C::ZERO], [C::ZERO, C::new(0.0, -1.0)]],
        Gate::T => [[C::ONE, C::ZERO], [C::ZERO, t]],
        Gate::Tdg => [[C::ONE, C::ZERO], [C::ZERO, t_dg]],
        Gate::Id | Gate::Cx | Gate::Cz | Gate::Swap => return None,
    })
}

struct StateVector {
    amps: Vec<Complex>,
}

impl StateVector {
    fn zero(num_qubits: usize) -> Self {
        let mut amps = vec![Complex::ZERO; 1usize << num_qubits];
        amps[0] = Complex::ONE;
        Self { amps }
    }

    fn apply(&mut self, gate: Gate, qubits: &[usize]) {
        match (gate, qubits) {
            (Gate::Id, _) => {}
            (Gate::Cx, &[control, target]) => {
                let (c, t) = (1usize << control, 1usize << target);
                for i in 0..self.amps.len() {
                    if i & c != 0 && i & t == 0 {
                        self.amps.swap(i, i | t);
                    }
                }
            }
            (Gate::Cz, &[a, b]) => {
                let mask = (1usize << a) | (1usize << b);
                for (i, amp) in self.amps.iter_mut().enumerate() {
                    if i & mask == mask {
                        *amp = Complex::new(-amp.re, -amp.im);
                    }
                }
            }
            (Gate::Swap, &[a, b]) => {
                let (ma, mb) = (1usize << a, 1usize << b);
                for i in 0..self.amps.len() {
                    if i & ma != 0 && i & mb == 0 {
                        self.amps.swap(i, i ^ ma ^ mb);
                    }
                }
            }
            (gate, &[qubit]) => {
                if let Some(m) = single_qubit_matrix(gate) {
                    let bit = 1usize << qubit;
                    for i in 0..self.amps.len() {
                        if i & bit == 0 {
                            let (a0, a1) = (self.amps[i], self.amps[i | bit]);
                            self.amps[i] = m[0][0] * a0 + m[0][1] * a1;
                            self.amps[i | bit] = m[1][0] * a0 + m[1][1] * a1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Draw `shots` basis-state indices from the Born distribution.
    fn sample(&self, shots: u32, rng: &mut impl Rng) -> HashMap<usize, u64> {
        let mut cumulative = Vec::with_capacity(self.amps.len());
        let mut acc = 0.0;
        for amp in &self.amps {
            acc += amp.norm_sqr();
            cumulative.push(acc);
        }

        let mut hits = HashMap::new();
        for _ in 0..shots {
            let r = rng.r#gen::<f64>() * acc;
            let idx = cumulative
                .partition_point(|&c| c <= r)
                .min(self.amps.len() - 1);
            *hits.entry(idx).or_insert(0) += 1;
        }
        hits
    }
}

/// Simulate `circuit` and return the measurement histogram.
fn run(circuit: &Circuit, shots: u32, rng: &mut impl Rng) -> Counts {
    let mut state = StateVector::zero(circuit.num_qubits());
    let mut measures = Vec::new();
    for op in circuit.ops() {
        match op {
            Op::Gate { gate, qubits } => state.apply(*gate, qubits),
            Op::Measure { qubit, bit } => measures.push((*qubit, *bit)),
        }
    }

    let mut counts = Counts::new();
    for (idx, n) in state.sample(shots, rng) {
        let mut bits = vec![false; circuit.num_clbits()];
        for &(qubit, bit) in &measures {
            bits[bit] = (idx >> qubit) & 1 == 1;
        }
        counts.record(circuit.format_bits(&bits), n);
    }
    counts
}

/// In-process executor backed by the state-vector simulator.
#[derive(Debug, Clone)]
pub struct StatevectorExecutor {
    max_qubits: usize,
    seed: Option<u64>,
}

impl StatevectorExecutor {
    pub fn new(max_qubits: usize) -> Self {
        Self {
            max_qubits,
            seed: None,
        }
    }

    /// Fix the sampling seed (reproducible counts).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[async_trait]
impl CircuitExecutor for StatevectorExecutor {
    fn name(&self) -> &str {
        "statevector"
    }

    fn parse(&self, source: &str) -> Result<Circuit, ExecutorError> {
        qasm::parse(source)
    }

    async fn execute(&self, circuit: &Circuit, shots: u32) -> Result<Counts, ExecutorError> {
        if circuit.num_qubits() > self.max_qubits {
            return Err(ExecutorError::permanent(format!(
                "circuit uses {} qubits, simulator supports at most {}",
                circuit.num_qubits(),
                self.max_qubits
            )));
        }
        if !circuit.has_measurements() {
            return Err(ExecutorError::permanent("circuit has no measurements"));
        }

        let circuit = circuit.clone();
        let seed = self.seed;
        let counts = tokio::task::spawn_blocking(move || {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            run(&circuit, shots, &mut rng)
        })
        .await
        .map_err(|e| ExecutorError::transient(format!("simulation job failed: {e}")))?;

        debug!(outcomes = counts.num_outcomes(), shots, "Simulation finished");
        Ok(counts)
    }
}
