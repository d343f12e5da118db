use std::path::Path;

use sidechain_cli::config::NetworkParams;
use sidechain_cli::crypto::keys::{verify, SIGNATURE_LEN};
use sidechain_cli::crypto::{address_from_program_hash, KeyPair, ScriptTable, SigningProgress};
use sidechain_cli::types::{Fixed64, OutPoint, Payload, Uint168, Uint256};
use sidechain_cli::wallet::keystore::{KdfParams, Keystore};
use sidechain_cli::wallet::signer::{read_transaction_content, sign_transaction, transaction_progress};
use sidechain_cli::wallet::{
    output, parse_transaction_hex, render, LocalWallet, PromptSelector, StaticPassword,
    TransactionOptions, TransactionResolver, Utxo, UtxoSource,
};
use sidechain_cli::{Result, WalletCliError};
use tempfile::tempdir;
use zeroize::Zeroizing;

struct Funded;

impl UtxoSource for Funded {
    fn list_unspent(&self, _address: &str) -> Result<Vec<Utxo>> {
        Ok(vec![Utxo {
            outpoint: OutPoint {
                txid: Uint256([7; 32]),
                index: 0,
            },
            amount: Fixed64(500_000_000),
            output_lock: 0,
        }])
    }
}

fn cheap_kdf() -> KdfParams {
    KdfParams {
        time: 1,
        mem_kib: 64,
        lanes: 1,
    }
}

fn new_wallet(dir: &Path, password: &[u8]) -> (LocalWallet<Funded>, KeyPair) {
    let pair = KeyPair::generate();
    let keystore = Keystore::create_with_params(password, &pair, cheap_kdf()).unwrap();
    let wallet = LocalWallet::create(&dir.join("keystore.dat"), keystore, Funded).unwrap();
    (wallet, pair)
}

#[test]
fn build_sign_and_rerender() {
    let dir = tempdir().unwrap();
    let (mut wallet, pair) = new_wallet(dir.path(), b"secret");
    let receiver = address_from_program_hash(&Uint168([0x21; 21]));

    let opts = TransactionOptions {
        fee: Some("0.001".into()),
        to: Some(receiver),
        amount: Some("1.25".into()),
        ..Default::default()
    };
    let network = NetworkParams::default();
    let resolution = TransactionResolver::new(&mut wallet, &network, &PromptSelector)
        .resolve(&opts)
        .unwrap();
    assert!(resolution.deployed.is_none());

    let txn = resolution.transaction;
    assert!(matches!(txn.payload, Payload::TransferAsset));
    assert_eq!(txn.inputs.len(), 1);
    assert_eq!(txn.outputs.len(), 2);
    assert_eq!(txn.outputs[0].value, Fixed64(125_000_000));
    assert_eq!(
        txn.outputs[1].value,
        Fixed64(500_000_000 - 125_000_000 - 100_000)
    );

    let progress = transaction_progress(&ScriptTable, &txn).unwrap();
    assert_eq!(progress, SigningProgress::new(0, 1));
    let unsigned = output(&txn, progress, dir.path()).unwrap();
    assert_eq!(unsigned.file_name, "to_be_signed.txn");

    let content = read_transaction_content(None, Some(&dir.path().join("to_be_signed.txn"))).unwrap();
    assert_eq!(content, unsigned.hex);

    let password = StaticPassword(Zeroizing::new(b"secret".to_vec()));
    let (progress, signed) =
        sign_transaction(&wallet, &ScriptTable, &password, &content, dir.path()).unwrap();
    assert_eq!(progress, SigningProgress::new(1, 1));
    assert_eq!(signed.file_name, "ready_to_send.txn");

    let parsed = parse_transaction_hex(&signed.hex).unwrap();
    let parameter = &parsed.programs[0].parameter;
    assert_eq!(parameter[0] as usize, SIGNATURE_LEN);
    assert!(verify(
        &pair.public_key_bytes(),
        &parsed.serialize_unsigned(),
        &parameter[1..]
    ));

    let again = render(&parsed, transaction_progress(&ScriptTable, &parsed).unwrap());
    assert_eq!(again, signed);

    let err = sign_transaction(&wallet, &ScriptTable, &password, &signed.hex, dir.path())
        .unwrap_err();
    assert_eq!(err.to_string(), "transaction was fully signed, no need more sign");
}

#[test]
fn wrong_password_leaves_files_untouched() {
    let dir = tempdir().unwrap();
    let (mut wallet, _) = new_wallet(dir.path(), b"secret");
    let opts = TransactionOptions {
        fee: Some("0.001".into()),
        to: Some(address_from_program_hash(&Uint168([0x21; 21]))),
        amount: Some("1".into()),
        ..Default::default()
    };
    let network = NetworkParams::default();
    let txn = TransactionResolver::new(&mut wallet, &network, &PromptSelector)
        .resolve(&opts)
        .unwrap()
        .transaction;
    let content = hex::encode(txn.serialize());

    let password = StaticPassword(Zeroizing::new(b"nope".to_vec()));
    assert!(sign_transaction(&wallet, &ScriptTable, &password, &content, dir.path()).is_err());
    assert!(!dir.path().join("ready_to_send.txn").exists());
}

#[test]
fn deploy_registers_contract_in_keystore() {
    let dir = tempdir().unwrap();
    let (mut wallet, _) = new_wallet(dir.path(), b"secret");
    let opts = TransactionOptions {
        fee: Some("0.001".into()),
        deploy: true,
        hex: Some("00ac".into()),
        gas: Some("1".into()),
        params: Some(r#"["signature"]"#.into()),
        return_type: Some("boolean".into()),
        ..Default::default()
    };
    let network = NetworkParams::default();
    let resolution = TransactionResolver::new(&mut wallet, &network, &PromptSelector)
        .resolve(&opts)
        .unwrap();

    let (contract, addresses) = resolution.deployed.unwrap();
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[1].program_hash, contract.program_hash);

    let reopened = Keystore::load(&dir.path().join("keystore.dat")).unwrap();
    assert_eq!(reopened.contracts().unwrap(), vec![contract]);
}

#[test]
fn negative_amount_builds_nothing() {
    let dir = tempdir().unwrap();
    let (mut wallet, _) = new_wallet(dir.path(), b"secret");
    let network = NetworkParams::default();
    for (amount, fee) in [("-5", "0.001"), ("1", "-0.001"), ("0", "0.001")] {
        let opts = TransactionOptions {
            fee: Some(fee.into()),
            to: Some(address_from_program_hash(&Uint168([0x21; 21]))),
            amount: Some(amount.into()),
            ..Default::default()
        };
        let err = TransactionResolver::new(&mut wallet, &network, &PromptSelector)
            .resolve(&opts)
            .unwrap_err();
        assert!(matches!(err, WalletCliError::UserInput(_)), "{} / {}: {}", amount, fee, err);
    }
}
