//! Single-node contract ledger.
//!
//! Starts a ledger, records a sample transfer, deploys a demo contract and
//! keeps running until Ctrl+C.
//!
//! # Usage
//! ```text
//! contract-ledger [OPTIONS]
//! ```
//!
//! # Options
//! - `--difficulty <bits>`: Proof-of-work difficulty in leading zero bits
//! - `--step-limit <n>`: Instructions a single contract call may execute
//! - `--memory <bytes>`: Memory given to each contract call
//! - `--store <dir>`: Persist contract records as JSON files under `dir`
//! - `--solc <path>`: Compiler binary used for source deployments

use contract_ledger::contracts::compiler::{CompiledContract, SolcCompiler};
use contract_ledger::core::config::LedgerConfig;
use contract_ledger::core::transaction::Transaction;
use contract_ledger::node::server::{Node, NodeOptions};
use contract_ledger::storage::file_store::FileContractStore;
use contract_ledger::storage::memory_store::MemoryContractStore;
use contract_ledger::storage::storage_trait::ContractStore;
use contract_ledger::utils::log;
use contract_ledger::{error, info, warn};
use std::env;
use std::process;
use std::str::FromStr;
use std::sync::Arc;

/// Bytecode of the demo contract: `PUSH1 1, PUSH1 2, ADD, STOP`.
const DEMO_BYTECODE: &str = "600160020100";
const DEMO_ABI: &str = r#"[{"type":"function","name":"set","inputs":[{"name":"x","type":"uint256"}],"outputs":[]}]"#;

#[tokio::main]
async fn main() {
    log::init_from_env();
    let args: Vec<String> = env::args().collect();

    let mut config = LedgerConfig::default();
    let mut store_dir: Option<String> = None;
    let mut solc = String::from("solc");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            "--difficulty" => config.difficulty_bits = flag_value(&args, &mut i),
            "--step-limit" => config.limits.step_limit = flag_value(&args, &mut i),
            "--memory" => config.limits.memory_size = flag_value(&args, &mut i),
            "--store" => store_dir = Some(flag_value(&args, &mut i)),
            "--solc" => solc = flag_value(&args, &mut i),
            other => {
                eprintln!("Unexpected argument: {}\n", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        process::exit(1);
    }

    let store: Arc<dyn ContractStore> = match store_dir {
        Some(dir) => match FileContractStore::open(&dir) {
            Ok(store) => {
                info!("persisting contract records under {dir}");
                Arc::new(store)
            }
            Err(e) => {
                error!("{e}");
                process::exit(1);
            }
        },
        None => Arc::new(MemoryContractStore::new()),
    };

    let node = match Node::new(NodeOptions {
        config,
        store,
        compiler: Arc::new(SolcCompiler::new(solc)),
    })
    .await
    {
        Ok(node) => Arc::new(node),
        Err(e) => {
            error!("failed to start ledger: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = node
        .submit_transaction(Transaction::transfer("Alice", "Bob", "10"))
        .await
    {
        warn!("sample transfer rejected: {e}");
    }
    match node.seal_block().await {
        Ok(block) => info!("sample transfer sealed in block {}", block.index),
        Err(e) => warn!("failed to seal sample transfer: {e}"),
    }

    let demo = CompiledContract {
        name: "Adder".to_string(),
        abi: DEMO_ABI.to_string(),
        bytecode: DEMO_BYTECODE.to_string(),
    };
    match node.deploy_compiled("Alice", "// PUSH1 1 PUSH1 2 ADD STOP", demo).await {
        Ok(record) => {
            info!("demo contract deployed at {}", record.address);
            match node
                .call_contract(&record.address.to_string(), "set", &["42".to_string()])
                .await
            {
                Ok(outcome) => info!(
                    "demo call finished in {} steps, stack {:?}",
                    outcome.steps, outcome.stack
                ),
                Err(e) => warn!("demo call failed: {e}"),
            }
        }
        Err(e) => warn!("demo deployment failed: {e}"),
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to setup Ctrl+C handler: {}", e);
        return;
    }
    info!("Ctrl+C received, shutting down...");
    node.shutdown();
}

/// Reads the value following the flag at `args[*i]` and advances past both.
fn flag_value<T: FromStr>(args: &[String], i: &mut usize) -> T {
    let flag = &args[*i];
    let Some(raw) = args.get(*i + 1) else {
        eprintln!("{flag} requires an argument");
        process::exit(1);
    };
    let Ok(value) = raw.parse() else {
        eprintln!("Invalid value for {flag}: {raw}");
        process::exit(1);
    };
    *i += 2;
    value
}

const USAGE: &str = "\
Contract Ledger Node

USAGE:
    {program} [OPTIONS]

OPTIONS:
    --difficulty <bits>    Proof-of-work difficulty in leading zero bits (default 24)
    --step-limit <n>       Instructions per contract call (default 1000000)
    --memory <bytes>       Memory per contract call (default 4096)
    --store <dir>          Persist contract records as JSON files under <dir>
    --solc <path>          Compiler used for source deployments (default solc)
    -h, --help             Print this help message

ENVIRONMENT:
    LEDGER_LOG    Minimum log level: debug, info, warn or error (default info)

EXAMPLES:
    # Start with a low difficulty for local testing
    {program} --difficulty 12

    # Keep contract records across restarts
    {program} --store ./contracts
";

/// Prints usage information to stderr.
fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
