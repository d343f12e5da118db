//! JSON-RPC client for the side chain node.

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::RpcConfig;
use crate::error::{Result, WalletCliError};
use crate::types::{Fixed64, OutPoint, Uint256};
use crate::wallet::{Utxo, UtxoSource};

#[derive(Debug, Serialize)]
struct Request<'a> {
    method: &'a str,
    params: Value,
}

/// `{id, jsonrpc, error, result}`; only `error` and `result` are read.
#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    error: Option<RpcError>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Subset of `getblock` verbosity 2 the CLI prints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockInfo {
    pub hash: String,
    pub confirmations: u32,
    pub size: u32,
    pub height: u32,
    pub version: u32,
    pub merkleroot: String,
    pub time: u32,
    pub nonce: u32,
    pub bits: u32,
    pub previousblockhash: String,
    pub nextblockhash: String,
    pub tx: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnspentOutput {
    pub txid: String,
    pub vout: u16,
    #[serde(default)]
    pub address: String,
    pub amount: String,
    #[serde(default)]
    pub outputlock: u32,
}

impl UnspentOutput {
    pub fn to_utxo(&self) -> Result<Utxo> {
        let amount: Fixed64 = self
            .amount
            .parse()
            .map_err(|_| WalletCliError::format(format!("bad utxo amount {:?}", self.amount)))?;
        Ok(Utxo {
            outpoint: OutPoint {
                txid: Uint256::from_reversed_hex(&self.txid)?,
                index: self.vout,
            },
            amount,
            output_lock: self.outputlock,
        })
    }
}

/// Decode a response envelope. A populated `error` becomes its message; a
/// body that is not an envelope is returned verbatim.
pub fn decode_response(body: &str) -> Result<Value> {
    let response: Response =
        serde_json::from_str(body).map_err(|_| WalletCliError::Transport(body.to_string()))?;
    if let Some(error) = response.error {
        debug!("rpc error {}: {}", error.code, error.message);
        return Err(WalletCliError::Transport(error.message));
    }
    Ok(response.result)
}

fn param(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

pub struct RpcClient {
    url: String,
    username: String,
    password: String,
    http: Client,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        Ok(RpcClient {
            url: format!("http://{}", config.host),
            username: config.username.clone(),
            password: config.password.clone(),
            http: builder.build()?,
        })
    }

    pub fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!("rpc call {} -> {}", method, self.url);
        let body = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&Request { method, params })
            .send()?
            .text()?;
        decode_response(&body)
    }

    /// Broadcast a serialized transaction; returns the node's txid.
    pub fn send_raw_transaction(&self, data: &str) -> Result<String> {
        let result = self.call("sendrawtransaction", param("data", json!(data)))?;
        Ok(match result {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    pub fn get_block_count(&self) -> Result<u32> {
        let result = self.call("getblockcount", Value::Null)?;
        result
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| WalletCliError::format(format!("unexpected block count {}", result)))
    }

    pub fn get_chain_height(&self) -> Result<u32> {
        let count = self.get_block_count()?;
        count
            .checked_sub(1)
            .ok_or_else(|| WalletCliError::format("node reports an empty chain"))
    }

    pub fn get_block_hash(&self, height: u32) -> Result<Uint256> {
        let result = self.call("getblockhash", param("height", json!(height)))?;
        let hash = result
            .as_str()
            .ok_or_else(|| WalletCliError::format(format!("unexpected block hash {}", result)))?;
        Uint256::from_reversed_hex(hash)
    }

    pub fn get_block(&self, hash: &Uint256) -> Result<BlockInfo> {
        let result = self.call(
            "getblock",
            json!({ "blockhash": hash.to_string(), "verbosity": 2 }),
        )?;
        serde_json::from_value(result)
            .map_err(|e| WalletCliError::format(format!("unexpected block: {}", e)))
    }

    pub fn list_unspent(&self, address: &str) -> Result<Vec<UnspentOutput>> {
        let result = self.call("listunspent", json!({ "addresses": [address] }))?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(result)
            .map_err(|e| WalletCliError::format(format!("unexpected utxo list: {}", e)))
    }
}

impl UtxoSource for RpcClient {
    fn list_unspent(&self, address: &str) -> Result<Vec<Utxo>> {
        RpcClient::list_unspent(self, address)?
            .iter()
            .map(UnspentOutput::to_utxo)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Answer one HTTP request with `body` and hand back the request body.
    fn serve_once(body: &'static str) -> (RpcConfig, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = RpcConfig {
            host: listener.local_addr().unwrap().to_string(),
            username: "user".into(),
            password: "pass".into(),
            timeout_secs: 5,
        };
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let (header_end, content_length) = loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).to_string();
                if let Some(pos) = text.find("\r\n\r\n") {
                    let length = text[..pos]
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
            };
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8(buf[header_end..].to_vec()).unwrap()
        });
        (config, handle)
    }

    #[test]
    fn decode_envelopes() {
        let ok = decode_response(r#"{"id":1,"jsonrpc":"2.0","error":null,"result":42}"#).unwrap();
        assert_eq!(ok, json!(42));

        let err = decode_response(
            r#"{"id":1,"jsonrpc":"2.0","error":{"id":1,"code":-32603,"message":"double spend"},"result":null}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "double spend");

        match decode_response("404 page not found") {
            Err(WalletCliError::Transport(body)) => assert_eq!(body, "404 page not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chain_height_is_count_minus_one() {
        let (config, server) = serve_once(r#"{"id":null,"jsonrpc":"2.0","error":null,"result":120}"#);
        let client = RpcClient::new(&config).unwrap();
        assert_eq!(client.get_chain_height().unwrap(), 119);

        let request: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(request["method"], "getblockcount");
    }

    #[test]
    fn send_raw_transaction_posts_data() {
        let (config, server) = serve_once(r#"{"error":null,"result":"abcd"}"#);
        let client = RpcClient::new(&config).unwrap();
        assert_eq!(client.send_raw_transaction("0200").unwrap(), "abcd");

        let request: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(request, json!({"method": "sendrawtransaction", "params": {"data": "0200"}}));
    }

    #[test]
    fn unspent_outputs_become_utxos() {
        let (config, server) = serve_once(
            r#"{"error":null,"result":[{"txid":"00000000000000000000000000000000000000000000000000000000000000ff","vout":1,"address":"E1","amount":"1.5","outputlock":0}]}"#,
        );
        let client = RpcClient::new(&config).unwrap();
        let utxos = UtxoSource::list_unspent(&client, "E1").unwrap();
        assert_eq!(utxos.len(), 1);
        assert_eq!(utxos[0].amount, Fixed64(150_000_000));
        assert_eq!(utxos[0].outpoint.index, 1);
        assert_eq!(utxos[0].outpoint.txid.0[0], 0xff);

        let request: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(request["params"]["addresses"], json!(["E1"]));
    }

    #[test]
    fn block_hash_round_trips_into_get_block() {
        let hex = "11".repeat(31) + "22";
        let hash = Uint256::from_reversed_hex(&hex).unwrap();
        assert_eq!(hash.to_string(), hex);
    }

    #[test]
    fn unreachable_node_is_transport_error() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = RpcConfig {
            host: format!("127.0.0.1:{}", port),
            timeout_secs: 2,
            ..RpcConfig::default()
        };
        let client = RpcClient::new(&config).unwrap();
        assert!(matches!(
            client.get_block_count(),
            Err(WalletCliError::Transport(_))
        ));
    }
}
