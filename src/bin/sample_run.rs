use step_telemetry::config;
use step_telemetry::{ReportRenderer, ScenarioHooks, StepObservation};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut hooks = ScenarioHooks::default();
    let platform = config::DEFAULT_PLATFORM;

    hooks.before_scenario("Listen to the live stream", platform);
    hooks.step(StepObservation::new("Listen to the live stream", "I am on the home page").passed());
    hooks.step(
        StepObservation::new("Listen to the live stream", "I click on Play")
            .expected("Player starts")
            .actual("Player started")
            .passed(),
    );
    hooks.after_scenario("Listen to the live stream", false, Some("https://www.radiofrance.fr/franceculture"), None);

    hooks.before_scenario("Search a programme", platform);
    hooks.step(StepObservation::new("Search a programme", "I am on the home page").passed());
    hooks.step(
        StepObservation::new("Search a programme", "I search for 'jazz'")
            .expected("Results for 'jazz' are displayed")
            .failed("element not found: //input[@name='q']"),
    );
    hooks.after_scenario("Search a programme", true, None, Some("Search field missing"));

    let summary = hooks.summary();
    println!(
        "Sample run: {} steps, {} passed, {} failed",
        summary.total, summary.passed, summary.failed
    );

    match hooks.after_run(&ReportRenderer::default(), &config::default_run_name()) {
        Some(path) => println!("Report: {}", path.display()),
        None => eprintln!("Report generation failed, see log output"),
    }
}
