//! Unit tests for the `esxcloud` CLI binary implementation.

use super::*;
use clap::CommandFactory;
use rstest::rstest;
use std::io::Write as _;

fn create_vm_args(networks_file: Option<String>) -> CreateVmCommand {
    CreateVmCommand {
        agent_id: String::from("agent-1"),
        stemcell: String::from("sc-1"),
        cpu: 2,
        ram: 2048,
        networks_file,
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[rstest]
#[case(&["esxcloud", "create-stemcell", "/tmp/image.tgz"])]
#[case(&["esxcloud", "delete-stemcell", "sc-1"])]
#[case(&["esxcloud", "create-vm", "--agent-id", "a", "--stemcell", "sc-1"])]
#[case(&["esxcloud", "delete-vm", "vm-1"])]
fn subcommands_parse(#[case] argv: &[&str]) {
    assert!(Cli::try_parse_from(argv).is_ok(), "failed to parse {argv:?}");
}

#[test]
fn create_vm_requires_agent_id() {
    let result = Cli::try_parse_from(["esxcloud", "create-vm", "--stemcell", "sc-1"]);
    assert!(result.is_err());
}

#[test]
fn vm_request_without_networks_file_has_no_networks() {
    let request = vm_request(create_vm_args(None)).expect("request");
    assert!(request.networks.is_empty());
    assert_eq!(request.resource_pool.cpu, 2);
    assert_eq!(request.stemcell.as_str(), "sc-1");
}

#[test]
fn vm_request_reads_networks_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(br#"{ "default": { "cloud_properties": { "name": "VM Network" } } }"#)
        .expect("write networks");
    let path = file.path().to_str().expect("utf8 path").to_owned();

    let request = vm_request(create_vm_args(Some(path))).expect("request");

    assert!(request.networks.contains_key("default"));
}

#[test]
fn vm_request_rejects_zero_cpu() {
    let args = CreateVmCommand {
        cpu: 0,
        ..create_vm_args(None)
    };
    let err = vm_request(args).expect_err("cpu is required");
    assert!(matches!(err, CliError::Request(_)), "unexpected: {err}");
}

#[test]
fn write_error_writes_cli_error() {
    let mut buf = Vec::new();
    write_error(&mut buf, &CliError::Config(String::from("missing mq_host")));
    let rendered = String::from_utf8(buf).expect("utf8");
    assert_eq!(rendered, "configuration error: missing mq_host\n");
}
