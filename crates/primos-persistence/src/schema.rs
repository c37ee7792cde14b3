// Esquema Diesel de las tablas de la cola de primos (Postgres).
// Tablas: solicitudes, cola, resultados
diesel::table! {
    solicitudes (id) {
        id -> Uuid,
        cantidad -> Int4,
        digitos -> Int4,
        generados -> Int4,
        created_at -> Timestamptz,
    }
}
diesel::table! {
    cola (id) {
        id -> Uuid,
        solicitud_id -> Uuid,
        cantidad -> Int4,
        digitos -> Int4,
        procesado -> Bool,
        created_at -> Timestamptz,
    }
}
diesel::table! {
    resultados (id) {
        id -> Int8,
        solicitud_id -> Uuid,
        primo -> Text,
        created_at -> Timestamptz,
    }
}
diesel::joinable!(cola -> solicitudes (solicitud_id));
diesel::joinable!(resultados -> solicitudes (solicitud_id));
diesel::allow_tables_to_appear_in_same_query!(solicitudes, cola, resultados);
