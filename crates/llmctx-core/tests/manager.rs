//! Integration tests for the context manager built from configuration.

use std::sync::Arc;

use llmctx_config::AppConfig;
use llmctx_core::{AsanaProvider, ContextManager, ContextProvider, Environment, ProviderRegistry, Status};
use llmctx_test_utils::config::{TempConfigFile, TestConfigBuilder};
use llmctx_test_utils::fake_asana::{
    Call, FakeAsanaApi, project, registry_with_fake, story, task, test_env,
};
use pretty_assertions::assert_eq;

fn demo_api() -> Arc<FakeAsanaApi> {
    Arc::new(
        FakeAsanaApi::new()
            .with_project(project("P1", "Demo"))
            .with_task(task("T1", "T1"), Vec::new()),
    )
}

fn demo_config() -> AppConfig {
    TestConfigBuilder::new()
        .provider(
            "asana",
            true,
            r#"
project_id = "P1"
retry_delay_ms = 0
fields = { Task = "name" }
"#,
        )
        .build()
}

#[test_log::test(tokio::test)]
async fn test_configured_asana_end_to_end() {
    let api = demo_api();
    let registry = registry_with_fake(api.clone());
    let manager = ContextManager::new(&demo_config(), &registry, &test_env());

    assert_eq!(manager.provider_names(), vec!["asana"]);
    let failures = manager.fetch_contexts(None).await;
    assert!(failures.is_empty());

    let combined = manager.get_combined_context(None);
    assert!(combined.contains("# Project: Demo"));
    assert!(combined.contains("### Task: T1"));
    assert!(combined.ends_with("\n\n"));

    let status = manager.get_status(None);
    assert_eq!(status["asana"].status, Status::Fresh);
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["asana"]["status"], "fresh");
}

#[test_log::test(tokio::test)]
async fn test_failed_provider_is_collected_not_raised() {
    let api = demo_api();
    api.fail_busy(Call::GetTasksForProject, 3);
    let registry = registry_with_fake(api.clone());
    let manager = ContextManager::new(&demo_config(), &registry, &test_env());

    let failures = manager.fetch_contexts(Some(&["asana"][..])).await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, "asana");
    assert_eq!(api.calls(Call::GetTasksForProject), 3);
    assert_eq!(manager.get_status(None)["asana"].status, Status::Stale);
    assert_eq!(manager.get_combined_context(None), "");
}

#[test]
fn test_disabled_entries_never_construct() {
    let config = TestConfigBuilder::new()
        .provider("asana", false, r#"project_id = "P1""#)
        .build();
    let mut registry = ProviderRegistry::new();
    registry.register("asana", |_setup| panic!("disabled provider was constructed"));

    let manager = ContextManager::new(&config, &registry, &test_env());

    assert!(manager.is_empty());
    assert!(manager.skipped().is_empty());
}

#[test]
fn test_unregistered_entries_are_skipped() {
    let config = TestConfigBuilder::new()
        .provider("jira", true, r#"board = "B1""#)
        .provider("asana", true, r#"project_id = "P1""#)
        .build();
    let registry = registry_with_fake(demo_api());

    let manager = ContextManager::new(&config, &registry, &test_env());

    assert_eq!(manager.provider_names(), vec!["asana"]);
    assert_eq!(manager.skipped().len(), 1);
    assert_eq!(manager.skipped()[0].name, "jira");
}

#[test]
fn test_construction_errors_are_isolated() {
    let config = TestConfigBuilder::new()
        .provider("asana", true, r#"project_id = "P1""#)
        .build();
    let registry = registry_with_fake(demo_api());

    // No token in the environment.
    let manager = ContextManager::new(&config, &registry, &Environment::empty());

    assert!(manager.is_empty());
    assert_eq!(manager.skipped()[0].name, "asana");
    assert!(
        manager.skipped()[0]
            .reason
            .contains("ASANA_PERSONAL_ACCESS_TOKEN")
    );
}

#[test]
fn test_global_settings_fill_provider_gaps() {
    let config = TestConfigBuilder::new()
        .global("timezone", "UTC")
        .global("project_id", "GLOBAL")
        .provider("asana", true, r#"project_id = "P1""#)
        .build();
    let api = Arc::new(
        FakeAsanaApi::new()
            .with_project(project("P1", "Demo"))
            .with_task(
                task("T1", "T1"),
                vec![story("Ada", "2024-07-07T11:00:00Z", "hi")],
            ),
    );
    let registry = registry_with_fake(api);
    let manager = ContextManager::new(&config, &registry, &test_env());

    let settings = config.provider_settings("asana").unwrap();
    assert_eq!(settings["project_id"].as_str(), Some("P1"));
    assert_eq!(settings["timezone"].as_str(), Some("UTC"));
    assert!(config.context_providers.get("asana").unwrap().settings.get("timezone").is_none());

    let failures = manager.fetch_contexts_blocking(None);
    assert!(failures.is_empty());

    // UTC from [global]; Toronto would render 7:00 AM.
    let combined = manager.get_combined_context(None);
    assert!(combined.contains("- July 7th, 2024 11:00 AM by Ada: hi"));
}

#[tokio::test]
async fn test_one_level_one_heading_per_fresh_provider() {
    let config = TestConfigBuilder::new()
        .provider("asana", true, "project_id = \"P1\"\nretry_delay_ms = 0")
        .provider("backlog", true, "project_id = \"P2\"\nretry_delay_ms = 0")
        .provider("archive", true, "project_id = \"P3\"\nretry_delay_ms = 0")
        .build();
    let healthy = demo_api();
    let busy = demo_api();
    busy.fail_busy(Call::GetProject, 3);
    let mut registry = ProviderRegistry::new();
    for (name, api) in [("asana", healthy.clone()), ("backlog", busy), ("archive", healthy)] {
        registry.register(name, move |setup| {
            let provider: Box<dyn ContextProvider> =
                Box::new(AsanaProvider::from_setup_with_api(setup, api.clone())?);
            Ok(provider)
        });
    }
    let manager = ContextManager::new(&config, &registry, &test_env());
    assert_eq!(manager.len(), 3);

    // Before any fetch: nothing rendered.
    assert_eq!(manager.get_combined_context(None), "");

    let failures = manager.fetch_contexts(None).await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].provider, "backlog");

    let combined = manager.get_combined_context(None);
    let level_one = combined.lines().filter(|l| l.starts_with("# ")).count();
    assert_eq!(level_one, 2);
}

#[tokio::test]
async fn test_manager_from_config_file() {
    let toml = TestConfigBuilder::new()
        .provider("asana", true, "project_id = 42\nretry_delay_ms = 0")
        .to_toml();
    let file = TempConfigFile::with_toml(&toml).await;
    let config = file.load().await;

    let manager = ContextManager::new(&config, &registry_with_fake(demo_api()), &test_env());

    assert_eq!(manager.provider_names(), vec!["asana"]);
    assert!(manager.fetch_contexts(None).await.is_empty());
}
