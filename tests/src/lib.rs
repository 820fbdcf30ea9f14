//! Live contract tests against a deployed BI platform.
//!
//! Skipped unless `CONTRACT_HARNESS_BASE_URL` (or a per-subsystem
//! `CONTRACT_HARNESS_BASE_URL_<SUBSYSTEM>`) is set.

#[cfg(test)]
mod tests {
    use bi_contract_suite::{expressions, link_types, project_explorer};
    use contract_harness::{contract_test, HarnessConfiguration, Scenario, ScenarioReport};
    use std::time::Duration;

    fn configure_live_run(config: &mut HarnessConfiguration) {
        if config.scenario_timeout().is_none() {
            config.set_scenario_timeout(Duration::from_secs(120));
        }
    }

    async fn run_all(config: &HarnessConfiguration, subsystem: &str, scenarios: Vec<Scenario>) {
        let runner = config
            .runner_for(subsystem)
            .expect("Couldn't build a runner");
        let reports = runner.run_all(&scenarios).await;

        let failed: Vec<&ScenarioReport> =
            reports.iter().filter(|report| !report.passed()).collect();
        assert!(
            failed.is_empty(),
            "{}",
            failed
                .iter()
                .map(|report| report.to_string())
                .collect::<Vec<_>>()
                .join("\n\n")
        );
    }

    #[contract_test(configure_live_run)]
    async fn link_types_contract(config: HarnessConfiguration) {
        let scenarios = link_types::scenarios().expect("Couldn't build link type scenarios");
        run_all(&config, link_types::SUBSYSTEM, scenarios).await;
    }

    #[contract_test(configure_live_run)]
    async fn expressions_contract(config: HarnessConfiguration) {
        let scenarios = expressions::scenarios().expect("Couldn't build expression scenarios");
        run_all(&config, expressions::SUBSYSTEM, scenarios).await;
    }

    #[contract_test]
    async fn project_explorer_contract(config: HarnessConfiguration) {
        let scenarios =
            project_explorer::scenarios().expect("Couldn't build project explorer scenarios");
        run_all(&config, project_explorer::SUBSYSTEM, scenarios).await;
    }
}
