use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use lopsided::{BenchConfig, Benchmark};

fn main() {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                ),
        )
        .init();

    let config = BenchConfig::from_env();

    let report = Benchmark::new(config).and_then(|benchmark| benchmark.run());
    match report {
        Ok(report) => println!("{}", report),
        Err(err) => {
            tracing::error!(%err, "benchmark aborted");
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}
