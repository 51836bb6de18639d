use std::io::Read;

use log::info;
use ssacli_exporter_core::{MetricStore, parse_report};

pub fn run(path: &str) {
    let report = match read_report(path) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    };

    match render(&report) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("Error encoding metrics: {e}");
            std::process::exit(1);
        }
    }
}

fn read_report(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
    }
}

/// Parse one report into a fresh store and return its exposition text.
fn render(report: &str) -> prometheus::Result<String> {
    let store = MetricStore::new()?;
    let summary = parse_report(report, &store);
    info!(
        "parsed {} drive(s), dropped {}",
        summary.published, summary.dropped
    );
    store.encode()
}
