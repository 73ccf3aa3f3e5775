use planner_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run(AppConfig::default()) {
        tracing::error!(%err, "planner exited with an error");
        eprintln!("Failed to start planner: {err:#}");
    }
}
