// message.rs
//
// Formato de la cola rápida: una sola cadena `"<solicitud-id>:<cantidad>:<digitos>"`.
use crate::errors::JobError;
use crate::request::{validate_cantidad, validate_digitos, Job, NewRequest};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DELIMITER: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobMessage {
  pub solicitud_id: Uuid,
  pub cantidad: u32,
  pub digitos: u32,
}

impl JobMessage {
  pub fn new(solicitud_id: Uuid, params: &NewRequest) -> Self {
    Self { solicitud_id, cantidad: params.cantidad(), digitos: params.digitos() }
  }

  /// Un mensaje de la cola rápida no trae handle: la propiedad se confirma
  /// después contra la cola durable.
  pub fn into_job(self) -> Job {
    Job { handle: None, solicitud_id: self.solicitud_id, cantidad: self.cantidad, digitos: self.digitos }
  }
}

impl fmt::Display for JobMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}{}{}", self.solicitud_id, DELIMITER, self.cantidad, DELIMITER, self.digitos)
  }
}

impl FromStr for JobMessage {
  type Err = JobError;

  /// Se lee de derecha a izquierda: los dos últimos campos son numéricos y
  /// todo lo anterior es el identificador.
  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let trimmed = raw.trim();
    let mut parts = trimmed.rsplitn(3, DELIMITER);
    let (digitos_s, cantidad_s, id_s) = match (parts.next(), parts.next(), parts.next()) {
      (Some(d), Some(c), Some(id)) => (d, c, id),
      _ => return Err(JobError::Protocol(format!("se esperaban 3 campos en '{}'", trimmed))),
    };
    let solicitud_id = Uuid::parse_str(id_s.trim()).map_err(|e| {
                                                      JobError::Protocol(format!("id inválido '{}': {}", id_s, e))
                                                    })?;
    let cantidad = cantidad_s.trim()
                             .parse::<i64>()
                             .map_err(|e| JobError::Protocol(format!("cantidad inválida '{}': {}", cantidad_s, e)))?;
    let digitos = digitos_s.trim()
                           .parse::<i64>()
                           .map_err(|e| JobError::Protocol(format!("digitos inválidos '{}': {}", digitos_s, e)))?;
    // Un mensaje con parámetros fuera de rango tampoco es procesable.
    let cantidad = validate_cantidad(cantidad).map_err(|e| JobError::Protocol(e.to_string()))?;
    let digitos = validate_digitos(digitos).map_err(|e| JobError::Protocol(e.to_string()))?;
    Ok(Self { solicitud_id, cantidad, digitos })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_uses_colon_triple() {
    let id = Uuid::new_v4();
    let params = NewRequest::new(3, 4).unwrap();
    let msg = JobMessage::new(id, &params);
    assert_eq!(msg.to_string(), format!("{}:3:4", id));
  }

  #[test]
  fn parse_tolerates_surrounding_whitespace() {
    let id = Uuid::new_v4();
    let msg: JobMessage = format!("  {}:10:12\n", id).parse().unwrap();
    assert_eq!(msg.solicitud_id, id);
    assert_eq!(msg.cantidad, 10);
    assert_eq!(msg.digitos, 12);
  }

  #[test]
  fn malformed_messages_are_protocol_errors() {
    let id = Uuid::new_v4();
    let samples = vec!["".to_string(),
                       "sin-separadores".to_string(),
                       "a:b".to_string(),
                       format!("{}:x:4", id),
                       format!("{}:3", id),
                       "no-uuid:3:4".to_string(),
                       format!("{}:0:4", id),
                       format!("{}:3:21", id)];
    for raw in &samples {
      match raw.parse::<JobMessage>() {
        Err(JobError::Protocol(_)) => {}
        other => panic!("'{}' debería ser error de protocolo, fue {:?}", raw, other),
      }
    }
  }

  #[test]
  fn fast_message_job_has_no_handle() {
    let id = Uuid::new_v4();
    let job = format!("{}:5:6", id).parse::<JobMessage>().unwrap().into_job();
    assert!(job.handle.is_none());
    assert_eq!(job.solicitud_id, id);
  }
}
