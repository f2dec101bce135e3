use sqlx::PgPool;
use uuid::Uuid;

pub async fn setup(pool: &PgPool) {
    db::run_migrations(pool).await.unwrap();
}

pub async fn user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("user-{}", id))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn program(pool: &PgPool, difficulty: &str) -> Uuid {
    let coach = user(pool, "coach").await;
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO programs (id, coach_id, title, difficulty_level) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(coach)
    .bind("Test Program")
    .bind(difficulty)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn unit(pool: &PgPool, program_id: Uuid, day_number: i32, minutes: i32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO workout_units (id, program_id, day_number, duration_minutes) VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(program_id)
    .bind(day_number)
    .bind(minutes)
    .execute(pool)
    .await
    .unwrap();
    id
}
