/// Entry point for the cgroup metrics validator.
///
/// Compares a metrics provider's snapshot against the cgroup files of the inspected
/// process and exits with an error on the first configuration mismatch.
///
/// # Examples
///
/// ```bash
/// METRICS_SNAPSHOT_PATH=metrics.json RUST_LOG=info cargo run
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    cgroup_metrics_validator::run()
}
