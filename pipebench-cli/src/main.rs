//! Pipebench binary entry point.

fn main() -> anyhow::Result<()> {
    pipebench_cli::run()
}
