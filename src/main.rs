//! Binary entry point for side-cli.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::debug;

use sidechain_cli::config::Config;
use sidechain_cli::contract::program::op;
use sidechain_cli::contract::{parameter_types_from_bytes, Contract};
use sidechain_cli::crypto::{address_from_program_hash, KeyPair, ScriptTable};
use sidechain_cli::error::{EXIT_BUILD_FAILED, EXIT_WALLET_OPEN};
use sidechain_cli::rpc::RpcClient;
use sidechain_cli::wallet::keystore::Keystore;
use sidechain_cli::wallet::local::account_program_hash;
use sidechain_cli::wallet::signer::{
    read_transaction_content, send_transaction, sign_transaction, transaction_progress,
};
use sidechain_cli::wallet::{
    output, CliPassword, LocalWallet, PasswordSource, PromptSelector, TransactionOptions,
    TransactionResolver, Wallet,
};

#[derive(Parser)]
#[command(name = "side-cli", version, about = "Side chain wallet command line client")]
struct Cli {
    /// Keystore file, overrides `wallet.keystore` from the config.
    #[arg(short = 'w', long, global = true)]
    wallet: Option<PathBuf>,
    /// Keystore password; prompted for when absent.
    #[arg(short = 'm', long, global = true)]
    password: Option<String>,
    /// Config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keystore management.
    Wallet {
        #[command(subcommand)]
        action: WalletCommand,
    },
    /// Build, sign and send transactions.
    Tx {
        #[command(subcommand)]
        action: TxCommand,
    },
    /// Deploy or invoke a smart contract.
    Contract(ContractArgs),
    /// Query the node.
    Info {
        #[command(subcommand)]
        action: InfoCommand,
    },
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Generate an account and write a new keystore.
    Create,
    /// List the wallet's addresses.
    List,
    /// Register a contract address with the keystore.
    AddContract {
        /// Contract code (avm file).
        #[arg(short, long)]
        file: PathBuf,
        /// Parameter type bytes, hex.
        #[arg(short, long, default_value = "")]
        params: String,
    },
}

#[derive(Subcommand)]
enum TxCommand {
    /// Build an unsigned transaction.
    Create(CreateArgs),
    /// Add this wallet's signatures.
    Sign(ContentArgs),
    /// Broadcast a signed transaction.
    Send(ContentArgs),
}

#[derive(Args)]
struct CreateArgs {
    /// Deploy a smart contract.
    #[arg(short, long)]
    deploy: bool,
    /// Invoke a smart contract.
    #[arg(short, long)]
    invoke: bool,
    /// Contract code (deploy) or contract code hash (invoke), hex.
    #[arg(long)]
    hex: Option<String>,
    /// Contract code (deploy) or invocation program (invoke), avm file.
    #[arg(long)]
    avm: Option<PathBuf>,
    /// Parameter JSON; parameter type names for deploy.
    #[arg(short, long)]
    params: Option<String>,
    /// Contract return type name.
    #[arg(long = "returntype")]
    return_type: Option<String>,
    /// Contract description JSON (name, version, author, email, desc).
    #[arg(long = "msg")]
    message: Option<String>,
    #[arg(long)]
    fee: Option<String>,
    #[arg(long)]
    gas: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long)]
    amount: Option<String>,
    /// Block height before which the outputs cannot be spent.
    #[arg(long)]
    lock: Option<String>,
    /// Side chain receiver of a main chain deposit.
    #[arg(long)]
    deposit: Option<String>,
    /// Main chain receiver of a withdrawal.
    #[arg(long)]
    withdraw: Option<String>,
    /// Multi-output file of `address,amount` lines.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl From<CreateArgs> for TransactionOptions {
    fn from(args: CreateArgs) -> Self {
        TransactionOptions {
            fee: args.fee,
            deploy: args.deploy,
            invoke: args.invoke,
            hex: args.hex,
            avm: args.avm,
            params: args.params,
            return_type: args.return_type,
            message: args.message,
            gas: args.gas,
            from: args.from,
            to: args.to,
            amount: args.amount,
            lock: args.lock,
            deposit: args.deposit,
            withdraw: args.withdraw,
            file: args.file,
        }
    }
}

#[derive(Args)]
struct ContentArgs {
    /// Transaction hex; takes precedence over --file.
    #[arg(long)]
    hex: Option<String>,
    /// File holding the transaction hex.
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct ContractArgs {
    #[arg(short, long)]
    deploy: bool,
    #[arg(short, long)]
    invoke: bool,
    /// Contract code to deploy, hex.
    #[arg(short, long)]
    code: Option<String>,
    /// Contract code to deploy, avm file.
    #[arg(short, long)]
    file: Option<PathBuf>,
    #[arg(short, long)]
    params: Option<String>,
    /// Contract code hash to invoke, hex.
    #[arg(short = 'a', long = "hex", alias = "codeHash")]
    code_hash: Option<String>,
    #[arg(long = "returntype")]
    return_type: Option<String>,
    #[arg(long = "msg")]
    message: Option<String>,
    #[arg(long)]
    fee: Option<String>,
    #[arg(long)]
    gas: Option<String>,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    #[arg(long, default_value = "0")]
    amount: String,
}

#[derive(Subcommand)]
enum InfoCommand {
    /// Current chain height.
    Height,
    /// Block at a height.
    Block {
        #[arg(long)]
        height: u32,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(path) = cli.wallet {
        config.wallet.keystore = path;
    }
    init_logging(&config.logging.level);
    debug!("network {}, rpc {}", config.network.name(), config.rpc_url());

    let rpc = RpcClient::new(&config.rpc).context("failed to set up the rpc client")?;
    let passwords = CliPassword::new(cli.password);

    match cli.command {
        Commands::Wallet { action } => wallet_command(action, &config, rpc, &passwords),
        Commands::Tx { action } => tx_command(action, &config, rpc, &passwords),
        Commands::Contract(args) => contract_command(args, &config, rpc),
        Commands::Info { action } => info_command(action, &rpc),
    }
}

/// Prints the failure and yields `None`; callers exit with `EXIT_WALLET_OPEN`.
fn open_wallet(path: &Path, rpc: RpcClient) -> Option<LocalWallet<RpcClient>> {
    match LocalWallet::open(path, rpc) {
        Ok(wallet) => Some(wallet),
        Err(e) => {
            eprintln!("error: open wallet failed, {}", e);
            None
        }
    }
}

fn wallet_command(
    action: WalletCommand,
    config: &Config,
    rpc: RpcClient,
    passwords: &dyn PasswordSource,
) -> anyhow::Result<i32> {
    let path = &config.wallet.keystore;
    match action {
        WalletCommand::Create => {
            let password = passwords.password()?;
            let keystore = Keystore::create(&password, &KeyPair::generate())?;
            let hash = account_program_hash(&keystore)?;
            LocalWallet::create(path, keystore, rpc)
                .with_context(|| format!("failed to create {}", path.display()))?;
            println!("Wallet created: {}", path.display());
            println!("Address: {}", address_from_program_hash(&hash));
        }
        WalletCommand::List => {
            let Some(wallet) = open_wallet(path, rpc) else {
                return Ok(EXIT_WALLET_OPEN);
            };
            for info in wallet.get_addresses()? {
                println!("{}  {}  {:?}", info.address, info.program_hash, info.kind);
            }
        }
        WalletCommand::AddContract { file, params } => {
            let Some(mut wallet) = open_wallet(path, rpc) else {
                return Ok(EXIT_WALLET_OPEN);
            };
            let mut code = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if code.last() != Some(&op::SMARTCONTRACT) {
                code.push(op::SMARTCONTRACT);
            }
            let parameters = parameter_types_from_bytes(&hex::decode(params.trim())?)?;
            let contract = Contract::new(code, parameters)?;
            let address = address_from_program_hash(&contract.program_hash);
            wallet.add_contract_address(contract)?;
            println!("Contract address: {}", address);
        }
    }
    Ok(0)
}

fn tx_command(
    action: TxCommand,
    config: &Config,
    rpc: RpcClient,
    passwords: &dyn PasswordSource,
) -> anyhow::Result<i32> {
    match action {
        TxCommand::Create(args) => {
            let Some(mut wallet) = open_wallet(&config.wallet.keystore, rpc) else {
                return Ok(EXIT_WALLET_OPEN);
            };
            Ok(build(&mut wallet, config, &args.into()))
        }
        TxCommand::Sign(args) => {
            let content = read_transaction_content(args.hex.as_deref(), args.file.as_deref())?;
            let Some(wallet) = open_wallet(&config.wallet.keystore, rpc) else {
                return Ok(EXIT_WALLET_OPEN);
            };
            sign_transaction(
                &wallet,
                &ScriptTable,
                passwords,
                &content,
                &config.wallet.output_dir,
            )?;
            Ok(0)
        }
        TxCommand::Send(args) => {
            let content = read_transaction_content(args.hex.as_deref(), args.file.as_deref())?;
            let txid = send_transaction(&rpc, &content)?;
            println!("{}", txid);
            Ok(0)
        }
    }
}

/// Resolve, build and write the unsigned transaction. Failures map to
/// `EXIT_BUILD_FAILED`.
fn build(wallet: &mut dyn Wallet, config: &Config, opts: &TransactionOptions) -> i32 {
    let result = TransactionResolver::new(wallet, &config.params, &PromptSelector)
        .resolve(opts)
        .and_then(|resolution| {
            if let Some((contract, addresses)) = &resolution.deployed {
                println!(
                    "Contract address: {}",
                    address_from_program_hash(&contract.program_hash)
                );
                for info in addresses {
                    println!("{}  {}  {:?}", info.address, info.program_hash, info.kind);
                }
            }
            let progress = transaction_progress(&ScriptTable, &resolution.transaction)?;
            output(&resolution.transaction, progress, &config.wallet.output_dir)
        });
    match result {
        Ok(_) => 0,
        Err(e) => {
            println!("error: {}", e);
            EXIT_BUILD_FAILED
        }
    }
}

fn contract_command(args: ContractArgs, config: &Config, rpc: RpcClient) -> anyhow::Result<i32> {
    if !args.deploy && !args.invoke {
        println!("missing --deploy -d or --invoke -i");
        return Ok(0);
    }
    if args.deploy && args.code.is_none() && args.file.is_none() {
        println!("missing args [--code] or [--file]");
        return Ok(0);
    }
    if args.deploy && args.code.is_some() && args.file.is_some() {
        println!("too many input args");
        return Ok(0);
    }
    if args.invoke && args.code_hash.is_none() && args.file.is_none() {
        println!("missing args [--hex] or [--file]");
        return Ok(0);
    }

    let Some(mut wallet) = open_wallet(&config.wallet.keystore, rpc) else {
        return Ok(EXIT_WALLET_OPEN);
    };
    let opts = TransactionOptions {
        fee: args.fee,
        deploy: args.deploy,
        invoke: args.invoke,
        hex: if args.deploy { args.code } else { args.code_hash },
        avm: args.file,
        params: args.params,
        return_type: args.return_type,
        message: args.message,
        gas: args.gas,
        from: args.from,
        to: args.to,
        amount: Some(args.amount),
        ..TransactionOptions::default()
    };
    Ok(build(&mut wallet, config, &opts))
}

fn info_command(action: InfoCommand, rpc: &RpcClient) -> anyhow::Result<i32> {
    match action {
        InfoCommand::Height => {
            println!("{}", rpc.get_chain_height()?);
        }
        InfoCommand::Block { height } => {
            let hash = rpc.get_block_hash(height)?;
            let block = rpc.get_block(&hash)?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
    }
    Ok(0)
}
