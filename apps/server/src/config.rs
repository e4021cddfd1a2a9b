/// Runtime configuration, read from the environment.
pub struct Config {
    pub port: String,
    pub db_path: String,
    pub workers: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "finance.db".to_string());
        let workers = std::env::var("WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        Self {
            port,
            db_path,
            workers,
        }
    }
}
