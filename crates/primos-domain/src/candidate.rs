// candidate.rs
use crate::errors::Result;
use crate::request::validate_digitos;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Rango cerrado `[10^(d-1), 10^d - 1]` acotado a `u64`.
///
/// Con 20 dígitos el máximo teórico (10^20 - 1) no cabe en u64, así que el
/// límite superior queda en `u64::MAX` (que también es impar).
pub fn digit_bounds(digitos: u32) -> Result<(u64, u64)> {
  let digitos = validate_digitos(digitos as i64)?;
  let low = 10u64.pow(digitos - 1);
  let high = 10u64.checked_pow(digitos).map(|v| v - 1).unwrap_or(u64::MAX);
  Ok((low, high))
}

/// Número de dígitos decimales de `n`.
pub fn decimal_digits(n: u64) -> u32 {
  n.checked_ilog10().map(|l| l + 1).unwrap_or(1)
}

/// Generador de candidatos impares con distribución uniforme por rango.
///
/// Cada bucle de worker posee su propia instancia; la semilla se fija una
/// sola vez al construirla.
pub struct CandidateGenerator {
  rng: StdRng,
}

impl CandidateGenerator {
  /// Semilla no determinista: tiempo actual mezclado con el pid del proceso.
  pub fn new() -> Self {
    Self::with_seed(process_seed())
  }

  /// Semilla explícita, útil para reproducir una secuencia en pruebas.
  pub fn with_seed(seed: u64) -> Self {
    Self { rng: StdRng::seed_from_u64(seed) }
  }

  /// Genera un impar en `[10^(d-1), 10^d - 1]`. Los pares se descartan de
  /// antemano forzando el bit bajo a 1; como el límite superior siempre es
  /// impar el resultado no se sale del rango.
  pub fn generate(&mut self, digitos: u32) -> Result<u64> {
    let (low, high) = digit_bounds(digitos)?;
    let value = self.rng.random_range(low..=high);
    Ok(value | 1)
  }
}

impl Default for CandidateGenerator {
  fn default() -> Self {
    Self::new()
  }
}

fn process_seed() -> u64 {
  let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0);
  let pid = std::process::id() as u64;
  // splitmix64 sobre la mezcla para que pids y tiempos cercanos no den
  // semillas correlacionadas.
  let mut z = nanos ^ pid.rotate_left(32);
  z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}
