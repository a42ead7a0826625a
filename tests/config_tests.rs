//! Unit tests for configuration validation and loading.

use std::time::Duration;

use esxcloud::config::{CloudConfig, ConfigError};
use esxcloud::test_support::{EnvGuard, loopback_config};
use rstest::*;

#[fixture]
fn valid_config() -> CloudConfig {
    CloudConfig {
        mq_host: String::from("mq.example.internal"),
        esxmgr_host: String::from("esxmgr.example.internal"),
        ..loopback_config(9090)
    }
}

#[rstest]
fn valid_config_passes_validation(valid_config: CloudConfig) {
    assert_eq!(valid_config.validate(), Ok(()));
}

/// Validation errors mention both the environment variable and the
/// configuration file key for each required field.
#[rstest]
#[case::mq_host(|cfg: &mut CloudConfig| cfg.mq_host.clear(), "ESXCLOUD_MQ_HOST", "mq_host")]
#[case::esxmgr_host(
    |cfg: &mut CloudConfig| cfg.esxmgr_host = String::from("  "),
    "ESXCLOUD_ESXMGR_HOST",
    "esxmgr_host"
)]
fn missing_fields_produce_actionable_errors(
    valid_config: CloudConfig,
    #[case] mutate: fn(&mut CloudConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(message.contains(env_var), "error should mention env var: {message}");
    assert!(message.contains("esxcloud.toml"), "error should mention config file: {message}");
    assert!(message.contains(toml_key), "error should mention TOML key: {message}");
}

#[rstest]
#[case::request(
    |cfg: &mut CloudConfig| cfg.request_timeout_secs = 0,
    "ESXCLOUD_REQUEST_TIMEOUT_SECS"
)]
#[case::stemcell(
    |cfg: &mut CloudConfig| cfg.stemcell_timeout_secs = 0,
    "ESXCLOUD_STEMCELL_TIMEOUT_SECS"
)]
fn zero_timeouts_are_rejected(
    valid_config: CloudConfig,
    #[case] mutate: fn(&mut CloudConfig),
    #[case] env_var: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("zero timeout");
    assert!(
        matches!(error, ConfigError::Invalid(ref message) if message.contains(env_var)),
        "unexpected error: {error}"
    );
}

#[rstest]
fn credentials_must_be_paired(valid_config: CloudConfig) {
    let cfg = CloudConfig {
        mq_user: Some(String::from("director")),
        ..valid_config
    };
    assert_eq!(cfg.validate(), Err(ConfigError::Credentials));
    assert_eq!(cfg.mq_credentials(), None);
}

#[rstest]
fn paired_credentials_are_exposed(valid_config: CloudConfig) {
    let cfg = CloudConfig {
        mq_user: Some(String::from("director")),
        mq_password: Some(String::from("s3cret")),
        ..valid_config
    };
    cfg.validate().expect("paired credentials are valid");

    let credentials = cfg.mq_credentials().expect("credentials");
    assert_eq!(credentials.user, "director");
    assert!(!format!("{credentials:?}").contains("s3cret"));
}

#[rstest]
fn derived_values_follow_fields(valid_config: CloudConfig) {
    let cfg = CloudConfig {
        mq_port: 4333,
        upload_settle_secs: 2,
        request_timeout_secs: 30,
        stemcell_timeout_secs: 900,
        ..valid_config
    };
    assert_eq!(cfg.mq_endpoint(), "mq.example.internal:4333");
    assert_eq!(cfg.upload_settle_time(), Duration::from_secs(2));
    assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.stemcell_timeout(), Duration::from_secs(900));
}

#[tokio::test]
async fn environment_variables_populate_configuration() {
    let workdir = tempfile::TempDir::new().expect("tempdir");
    let home = workdir.path().to_str().expect("utf8 tempdir");
    let _guard = EnvGuard::set_vars(&[
        ("HOME", home),
        ("XDG_CONFIG_HOME", home),
        ("ESXCLOUD_MQ_HOST", "mq.local"),
        ("ESXCLOUD_ESXMGR_HOST", "esxmgr.local"),
        ("ESXCLOUD_REQUEST_TIMEOUT_SECS", "15"),
    ])
    .await;

    let cfg = CloudConfig::load_without_cli_args().expect("configuration loads");

    assert_eq!(cfg.mq_host, "mq.local");
    assert_eq!(cfg.esxmgr_host, "esxmgr.local");
    assert_eq!(cfg.mq_port, 4222);
    assert_eq!(cfg.file_upload_port, 9090);
    assert_eq!(cfg.request_timeout(), Duration::from_secs(15));
    assert_eq!(cfg.stemcell_timeout(), Duration::from_secs(3600));
    assert_eq!(cfg.validate(), Ok(()));
}
