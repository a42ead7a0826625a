//! Binary entry point for the `esxcloud` CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use esxcloud::agent_env::{EnvironmentError, load_networks};
use esxcloud::{
    Cloud, CloudConfig, EsxCloud, EsxCloudError, Networks, RequestError, StemcellId,
    TcpTransport, VmId, VmRequest,
};

mod cli;

use cli::{Cli, CreateStemcellCommand, CreateVmCommand, DeleteStemcellCommand, DeleteVmCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("{0}")]
    Networks(#[from] EnvironmentError),
    #[error(transparent)]
    Cloud(#[from] EsxCloudError),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::CreateStemcell(args) => create_stemcell(args).await,
        Cli::DeleteStemcell(args) => delete_stemcell(args).await,
        Cli::CreateVm(args) => create_vm(args).await,
        Cli::DeleteVm(args) => delete_vm(args).await,
    }
}

async fn connect() -> Result<EsxCloud<TcpTransport>, CliError> {
    let config =
        CloudConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    Ok(EsxCloud::from_config(&config).await?)
}

async fn create_stemcell(args: CreateStemcellCommand) -> Result<(), CliError> {
    let cloud = connect().await?;
    let stemcell = cloud.create_stemcell(Utf8Path::new(&args.image)).await?;
    print_id(stemcell.as_str());
    Ok(())
}

async fn delete_stemcell(args: DeleteStemcellCommand) -> Result<(), CliError> {
    let cloud = connect().await?;
    cloud
        .delete_stemcell(&StemcellId::from(args.stemcell))
        .await?;
    Ok(())
}

async fn create_vm(args: CreateVmCommand) -> Result<(), CliError> {
    let request = vm_request(args)?;
    let cloud = connect().await?;
    let vm = cloud.create_vm(&request).await?;
    print_id(vm.as_str());
    Ok(())
}

async fn delete_vm(args: DeleteVmCommand) -> Result<(), CliError> {
    let cloud = connect().await?;
    cloud.delete_vm(&VmId::from(args.vm)).await?;
    Ok(())
}

fn vm_request(args: CreateVmCommand) -> Result<VmRequest, CliError> {
    let networks = match args.networks_file.as_deref() {
        Some(path) => load_networks(Utf8Path::new(path))?,
        None => Networks::new(),
    };
    Ok(VmRequest::builder()
        .agent_id(args.agent_id)
        .stemcell(args.stemcell)
        .cpu(args.cpu)
        .ram(args.ram)
        .networks(networks)
        .build()?)
}

fn print_id(id: &str) {
    writeln!(io::stdout(), "{id}").ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod main_tests;
