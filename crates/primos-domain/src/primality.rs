// primality.rs
//
// Miller–Rabin determinista para todo el rango de u64.

/// Primos usados para la división de prueba previa.
const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Base de testigos de Jim Sinclair: determinista para n < 2^64.
pub const WITNESSES: [u64; 7] = [2, 325, 9375, 28178, 450775, 9780504, 1795265022];

#[inline]
fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
  ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
  let mut acc = 1 % m;
  base %= m;
  while exp > 0 {
    if exp & 1 == 1 {
      acc = mul_mod(acc, base, m);
    }
    base = mul_mod(base, base, m);
    exp >>= 1;
  }
  acc
}

/// Devuelve `true` si `n` es primo.
///
/// Rechaza `n < 2`, aplica división de prueba por los primos hasta 37 y luego
/// Miller–Rabin con `WITNESSES`. Cada testigo se reduce módulo `n`; un testigo
/// que resulte 0 no aporta información y se omite.
pub fn is_probable_prime(n: u64) -> bool {
  if n < 2 {
    return false;
  }
  for &p in SMALL_PRIMES.iter() {
    if n == p {
      return true;
    }
    if n % p == 0 {
      return false;
    }
  }
  // n impar y mayor que 37: n - 1 = d * 2^s con d impar.
  let n_minus_one = n - 1;
  let s = n_minus_one.trailing_zeros();
  let d = n_minus_one >> s;
  'witness: for &w in WITNESSES.iter() {
    let a = w % n;
    if a == 0 {
      continue;
    }
    let mut x = pow_mod(a, d, n);
    if x == 1 || x == n_minus_one {
      continue;
    }
    for _ in 1..s {
      x = mul_mod(x, x, n);
      if x == n_minus_one {
        continue 'witness;
      }
    }
    return false;
  }
  true
}
