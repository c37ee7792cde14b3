//! Cola rápida de la cola de primos: una lista de Redis con `RPUSH` para
//! publicar y `BLPOP` para consumir, lo que da orden FIFO.
//!
//! Los mensajes viajan como texto `"<solicitud-id>:<cantidad>:<digitos>"`;
//! el parseo ocurre del lado del worker.

mod redis_queue;

pub use redis_queue::{RedisFastQueue, DEFAULT_QUEUE_KEY};
