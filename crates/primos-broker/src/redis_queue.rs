// Archivo: redis_queue.rs
// Propósito: implementación de `FastQueue` sobre Redis con un pool r2d2 de
// conexiones síncronas; cada operación toma su propia conexión.
use primos_domain::{FastQueue, JobError, JobMessage, Result};
use r2d2::{Pool, PooledConnection};
use std::time::Duration;

/// Lista compartida con productores y workers ya desplegados.
pub const DEFAULT_QUEUE_KEY: &str = "primes:queue";

/// Espera mínima enviada a `BLPOP`: un timeout de 0 bloquearía sin límite.
const MIN_BLOCK_SECS: f64 = 0.01;

fn broker_err(context: &str, e: impl std::fmt::Display) -> JobError {
  JobError::Broker(format!("{}: {}", context, e))
}

pub struct RedisFastQueue {
  pool: Pool<redis::Client>,
  key: String,
}

impl RedisFastQueue {
  pub fn new(url: &str, key: &str, pool_size: u32) -> Result<Self> {
    let client = redis::Client::open(url).map_err(|e| broker_err("url de redis inválida", e))?;
    let pool = Pool::builder().max_size(pool_size.max(1))
                              .connection_timeout(Duration::from_secs(5))
                              .build(client)
                              .map_err(|e| broker_err("no se pudo crear el pool de redis", e))?;
    log::debug!("primos-broker: conectado a {} (clave '{}')", url, key);
    Ok(Self { pool, key: key.to_string() })
  }

  fn conn(&self) -> Result<PooledConnection<redis::Client>> {
    self.pool.get().map_err(|e| broker_err("pool", e))
  }

  /// Longitud actual de la lista (`LLEN`).
  pub fn len(&self) -> Result<usize> {
    let mut conn = self.conn()?;
    redis::cmd("LLEN").arg(&self.key).query::<usize>(&mut *conn).map_err(|e| broker_err("LLEN", e))
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }

  /// Publica texto arbitrario; sirve para inyectar mensajes mal formados.
  pub fn push_raw(&self, raw: &str) -> Result<()> {
    let mut conn = self.conn()?;
    redis::cmd("RPUSH").arg(&self.key).arg(raw).query::<i64>(&mut *conn).map_err(|e| broker_err("RPUSH", e))?;
    Ok(())
  }

  /// Borra la lista completa.
  pub fn purge(&self) -> Result<()> {
    let mut conn = self.conn()?;
    redis::cmd("DEL").arg(&self.key).query::<i64>(&mut *conn).map_err(|e| broker_err("DEL", e))?;
    Ok(())
  }
}

impl FastQueue for RedisFastQueue {
  fn publish(&self, message: &JobMessage) -> Result<()> {
    self.push_raw(&message.to_string())
  }

  fn pop(&self, timeout: Duration) -> Result<Option<String>> {
    let mut conn = self.conn()?;
    let secs = timeout.as_secs_f64().max(MIN_BLOCK_SECS);
    // BLPOP responde nil al vencer la espera o (clave, valor).
    let popped = redis::cmd("BLPOP").arg(&self.key)
                                    .arg(secs)
                                    .query::<Option<(String, String)>>(&mut *conn)
                                    .map_err(|e| broker_err("BLPOP", e))?;
    Ok(popped.map(|(_, raw)| raw))
  }
}
