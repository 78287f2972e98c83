/// Initializes the process-wide logger: `env_logger` seeded from
/// `RUST_LOG`, defaulting to `info` so a gateway started with no
/// environment still logs request and job activity.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
