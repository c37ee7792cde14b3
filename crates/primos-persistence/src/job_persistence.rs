// Archivo: job_persistence.rs
// Propósito: implementación Diesel/Postgres de `JobRepository`. Cada método
// toma su propia conexión del pool y encierra su trabajo en una transacción.
use crate::schema;
use crate::schema::cola::dsl as cola_dsl;
use crate::schema::resultados::dsl as res_dsl;
use crate::schema::solicitudes::dsl as sol_dsl;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use primos_domain::{CommitOutcome, JobError, JobRepository, NewRequest, PrimeRequest, QueueEntry, Result};
use std::sync::Arc;
use uuid::Uuid;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Repo Diesel que implementa `JobRepository` sobre Postgres.
#[derive(Clone)]
pub struct DieselJobRepository {
  pool: Arc<DbPool>,
}

impl DieselJobRepository {
  /// Crea el pool y aplica las migraciones pendientes.
  pub fn new(database_url: &str, pool_size: u32) -> Result<Self> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().max_size(pool_size.max(1))
                              .build(manager)
                              .map_err(|e| JobError::Store(format!("no se pudo crear el pool de conexiones: {}", e)))?;
    let repo = DieselJobRepository { pool: Arc::new(pool) };
    let mut c = repo.conn()?;
    c.run_pending_migrations(MIGRATIONS).map_err(|e| JobError::Store(format!("migraciones: {}", e)))?;
    log::debug!("primos-persistence: pool listo (max_size={})", pool_size.max(1));
    Ok(repo)
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>> {
    self.pool.get().map_err(|e| JobError::Store(format!("pool: {}", e)))
  }

  fn claim(&self, solicitud: Option<Uuid>) -> Result<Option<QueueEntry>> {
    let mut pooled = self.conn()?;
    let conn: &mut PgConnection = &mut pooled;
    let claimed = map_db_err(conn.transaction::<_, DieselError, _>(|conn| {
      let base = cola_dsl::cola.select(ColaRow::as_select()).filter(cola_dsl::procesado.eq(false));
      let found = match solicitud {
        Some(sid) => base.filter(cola_dsl::solicitud_id.eq(sid))
                         .order(cola_dsl::created_at.asc())
                         .limit(1)
                         .for_update()
                         .skip_locked()
                         .get_result::<ColaRow>(conn)
                         .optional()?,
        None => base.order(cola_dsl::created_at.asc())
                    .limit(1)
                    .for_update()
                    .skip_locked()
                    .get_result::<ColaRow>(conn)
                    .optional()?,
      };
      if let Some(row) = &found {
        diesel::update(cola_dsl::cola.find(row.id)).set(cola_dsl::procesado.eq(true)).execute(conn)?;
      }
      Ok(found)
    }))?;
    match claimed {
      Some(row) => {
        let mut entry = row.into_entry()?;
        entry.procesado = true;
        Ok(Some(entry))
      }
      None => Ok(None),
    }
  }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::solicitudes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct SolicitudRow {
  id: Uuid,
  cantidad: i32,
  digitos: i32,
  generados: i32,
  created_at: DateTime<Utc>,
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::cola)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct ColaRow {
  id: Uuid,
  solicitud_id: Uuid,
  cantidad: i32,
  digitos: i32,
  procesado: bool,
  created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = schema::resultados)]
struct NewResultadoRow<'a> {
  solicitud_id: Uuid,
  primo: &'a str,
}

fn to_u32(column: &str, value: i32) -> Result<u32> {
  u32::try_from(value).map_err(|_| JobError::Store(format!("valor negativo en {}: {}", column, value)))
}

impl SolicitudRow {
  fn into_request(self) -> Result<PrimeRequest> {
    Ok(PrimeRequest { id:         self.id,
                      cantidad:   to_u32("cantidad", self.cantidad)?,
                      digitos:    to_u32("digitos", self.digitos)?,
                      generados:  to_u32("generados", self.generados)?,
                      created_at: self.created_at, })
  }
}

impl ColaRow {
  fn into_entry(self) -> Result<QueueEntry> {
    Ok(QueueEntry { id:           self.id,
                    solicitud_id: self.solicitud_id,
                    cantidad:     to_u32("cantidad", self.cantidad)?,
                    digitos:      to_u32("digitos", self.digitos)?,
                    procesado:    self.procesado,
                    created_at:   self.created_at, })
  }
}

/// Error interno de la transacción de commit: `Complete` fuerza el rollback
/// cuando la solicitud ya alcanzó su cantidad.
enum CommitTx {
  Db(DieselError),
  Complete,
}

impl From<DieselError> for CommitTx {
  fn from(e: DieselError) -> Self {
    CommitTx::Db(e)
  }
}

fn map_db_err<T>(res: std::result::Result<T, DieselError>) -> Result<T> {
  res.map_err(|e| JobError::Store(format!("db: {}", e)))
}

impl JobRepository for DieselJobRepository {
  fn create_request(&self, params: &NewRequest) -> Result<Uuid> {
    let mut pooled = self.conn()?;
    let conn: &mut PgConnection = &mut pooled;
    let now = Utc::now();
    let sol = SolicitudRow { id:         Uuid::new_v4(),
                             cantidad:   params.cantidad() as i32,
                             digitos:    params.digitos() as i32,
                             generados:  0,
                             created_at: now, };
    let entry = ColaRow { id:           Uuid::new_v4(),
                          solicitud_id: sol.id,
                          cantidad:     sol.cantidad,
                          digitos:      sol.digitos,
                          procesado:    false,
                          created_at:   now, };
    map_db_err(conn.transaction::<_, DieselError, _>(|conn| {
                     diesel::insert_into(sol_dsl::solicitudes).values(&sol).execute(conn)?;
                     diesel::insert_into(cola_dsl::cola).values(&entry).execute(conn)?;
                     Ok(())
                   }))?;
    log::debug!("solicitud {} creada (cantidad={}, digitos={})", sol.id, sol.cantidad, sol.digitos);
    Ok(sol.id)
  }

  fn claim_next(&self) -> Result<Option<QueueEntry>> {
    self.claim(None)
  }

  fn claim_for_request(&self, solicitud_id: &Uuid) -> Result<Option<QueueEntry>> {
    self.claim(Some(*solicitud_id))
  }

  fn mark_done(&self, entry_id: &Uuid) -> Result<()> {
    let mut conn = self.conn()?;
    map_db_err(diesel::delete(cola_dsl::cola.find(*entry_id)).execute(&mut conn))?;
    Ok(())
  }

  fn insert_result(&self, solicitud_id: &Uuid, primo: &str) -> Result<CommitOutcome> {
    let mut pooled = self.conn()?;
    let conn: &mut PgConnection = &mut pooled;
    let row = NewResultadoRow { solicitud_id: *solicitud_id, primo };
    let res = conn.transaction::<CommitOutcome, CommitTx, _>(|conn| {
                    let inserted = diesel::insert_into(res_dsl::resultados).values(&row)
                                                                           .on_conflict((res_dsl::solicitud_id,
                                                                                         res_dsl::primo))
                                                                           .do_nothing()
                                                                           .execute(conn)?;
                    if inserted == 0 {
                      return Ok(CommitOutcome::DuplicateRejected);
                    }
                    let updated = diesel::update(sol_dsl::solicitudes.filter(sol_dsl::id.eq(*solicitud_id))
                                                                     .filter(sol_dsl::generados.lt(sol_dsl::cantidad)))
                                  .set(sol_dsl::generados.eq(sol_dsl::generados + 1))
                                  .execute(conn)?;
                    if updated == 0 {
                      return Err(CommitTx::Complete);
                    }
                    Ok(CommitOutcome::Inserted)
                  });
    match res {
      Ok(outcome) => Ok(outcome),
      Err(CommitTx::Complete) => Ok(CommitOutcome::RequestComplete),
      Err(CommitTx::Db(e)) => Err(JobError::Store(format!("db: {}", e))),
    }
  }

  fn get_request(&self, id: &Uuid) -> Result<Option<PrimeRequest>> {
    let mut conn = self.conn()?;
    let row = map_db_err(sol_dsl::solicitudes.find(*id)
                                             .select(SolicitudRow::as_select())
                                             .first::<SolicitudRow>(&mut conn)
                                             .optional())?;
    row.map(SolicitudRow::into_request).transpose()
  }

  fn list_results(&self, solicitud_id: &Uuid) -> Result<Vec<String>> {
    let mut conn = self.conn()?;
    map_db_err(res_dsl::resultados.filter(res_dsl::solicitud_id.eq(*solicitud_id))
                                  .order(res_dsl::id.asc())
                                  .select(res_dsl::primo)
                                  .load::<String>(&mut conn))
  }

  fn count_results(&self, solicitud_id: &Uuid) -> Result<u32> {
    let mut conn = self.conn()?;
    let n = map_db_err(res_dsl::resultados.filter(res_dsl::solicitud_id.eq(*solicitud_id))
                                          .count()
                                          .get_result::<i64>(&mut conn))?;
    u32::try_from(n).map_err(|_| JobError::Store(format!("conteo fuera de rango: {}", n)))
  }
}

/// URL de conexión desde el entorno: `PRIMOS_DB_URL` y, en su defecto,
/// `DATABASE_URL`. El binario carga `.env` antes de llamarla.
pub fn database_url_from_env() -> Result<String> {
  let url = std::env::var("PRIMOS_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| JobError::Store("PRIMOS_DB_URL / DATABASE_URL no definidas".into()))?;
  if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
    return Err(JobError::Store("primos-persistence: la URL no parece de Postgres".into()));
  }
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  // Única prueba de este binario que toca el entorno del proceso.
  #[test]
  fn database_url_prefers_primos_variable_and_requires_postgres() {
    std::env::set_var("DATABASE_URL", "postgres://otro@localhost/otro");
    std::env::set_var("PRIMOS_DB_URL", "postgresql://primos@localhost/primos");
    assert_eq!(database_url_from_env().unwrap(), "postgresql://primos@localhost/primos");

    std::env::remove_var("PRIMOS_DB_URL");
    assert_eq!(database_url_from_env().unwrap(), "postgres://otro@localhost/otro");

    std::env::set_var("DATABASE_URL", "mysql://x");
    assert!(matches!(database_url_from_env(), Err(JobError::Store(_))));

    std::env::remove_var("DATABASE_URL");
    assert!(database_url_from_env().is_err());
  }
}
