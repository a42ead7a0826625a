//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn cli_without_arguments_prints_usage() {
    let mut cmd = cargo_bin_cmd!("esxcloud");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_every_lifecycle_subcommand() {
    let mut cmd = cargo_bin_cmd!("esxcloud");
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("create-stemcell")
            .and(predicate::str::contains("delete-stemcell"))
            .and(predicate::str::contains("create-vm"))
            .and(predicate::str::contains("delete-vm")),
    );
}

#[test]
fn missing_configuration_is_reported() {
    let workdir = tempfile::TempDir::new().expect("tempdir");
    let mut cmd = cargo_bin_cmd!("esxcloud");
    cmd.current_dir(workdir.path())
        .env_remove("ESXCLOUD_MQ_HOST")
        .env_remove("ESXCLOUD_ESXMGR_HOST")
        .env_remove("ESXCLOUD_CONFIG_PATH")
        .env("HOME", workdir.path())
        .env("XDG_CONFIG_HOME", workdir.path())
        .args(["delete-vm", "vm-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}
