//! Audit Page - Built-in ACT Rules Against a Sample Page
//!
//! Registers every built-in rule, attaches the console reporter and the
//! metrics plugin, and audits a small page with a few deliberate defects.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=act_runner=debug cargo run --example audit_page -p act-runner
//! ```

#![allow(clippy::uninlined_format_args, clippy::unwrap_used)]

use act_runner::prelude::*;
use act_runner::{init_tracing, rules, BoundingBox};

const PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <title>Checkout</title>
  <meta name="viewport" content="width=device-width, maximum-scale=1">
</head>
<body>
  <img id="logo" src="logo.png" alt="Acme">
  <img id="banner" src="banner.png">
  <a id="home" href="/">Home</a>
  <a id="cart" href="/cart"><img src="cart.svg"></a>
  <form>
    <label for="email">Email</label>
    <input id="email" type="email">
    <input id="coupon" type="text">
    <button id="pay" type="submit">Pay</button>
    <button id="close" type="button"></button>
  </form>
  <p id="fine-print" style="color: #999; background-color: #fff">Terms apply</p>
</body>
</html>"##;

fn main() {
    init_tracing();

    let mut page = Document::parse(PAGE)
        .with_viewport(1280.0, 720.0)
        .with_url("https://shop.example.test/checkout");
    page.set_layout("img, a, input, button", BoundingBox::new(0.0, 0.0, 120.0, 32.0))
        .unwrap();
    page.set_layout("p", BoundingBox::new(0.0, 400.0, 600.0, 20.0))
        .unwrap();

    let mut runner = Runner::new(RunnerConfig::builder().timeout_ms(2_000).build());
    rules::register_all(runner.registry_mut());

    let metrics = MetricsPlugin::new();
    let handle = metrics.metrics();
    runner.plugin(metrics);
    runner.reporter(ConsoleReporter::new(true, true));

    let results = runner.run_blocking(&page).unwrap();

    let summary = RunSummary::from_results(&results);
    println!();
    println!("=== Audit of {} ===", page.url().unwrap_or("<inline>"));
    println!(
        "{} rules, {} checks, {:.1}% passing",
        results.len(),
        summary.total,
        summary.pass_rate() * 100.0
    );
    let run = handle.snapshot();
    println!("run wall time: {:?}", run.last_wall);
    if let Some(slow) = &run.slowest {
        println!("slowest check: {} / {} ({:?})", slow.suite, slow.name, slow.duration);
    }

    let payload = DatabasePayload::from_results(
        page.url().unwrap_or_default(),
        "accessibility",
        &results,
    );
    println!("\n{}", serde_json::to_string_pretty(&payload.summary).unwrap());
}
