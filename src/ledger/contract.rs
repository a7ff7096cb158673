//! Calls against the credential registry contract shared by the JSON-RPC variants.

use super::abi::{self, Token};
use super::error::{LedgerError, LedgerResult};
use super::rpc::RpcClient;
use super::types::OnChainRecord;
use crate::credential::CertType;

const ZERO_ADDRESS: [u8; 20] = [0u8; 20];

pub fn issue_calldata(record: &OnChainRecord, content_cid: &str) -> LedgerResult<Vec<u8>> {
    let wallet = abi::parse_address(&record.student_wallet)?;
    Ok(abi::encode_call(
        abi::ISSUE_CERTIFICATE,
        &[
            Token::Str(&record.cert_id),
            Token::Str(&record.student_id),
            Token::Str(record.cert_type.as_str()),
            Token::Str(content_cid),
            Token::Str(&record.credential_hash),
            Token::Str(&record.metadata_hash),
            Token::Address(wallet),
        ],
    ))
}

pub fn revoke_calldata(cert_id: &str) -> Vec<u8> {
    abi::encode_call(abi::REVOKE_CERTIFICATE, &[Token::Str(cert_id)])
}

pub fn register_wallet_calldata(identity_id: &str, address: &str) -> LedgerResult<Vec<u8>> {
    let wallet = abi::parse_address(address)?;
    Ok(abi::encode_call(
        abi::REGISTER_STUDENT_WALLET,
        &[Token::Str(identity_id), Token::Address(wallet)],
    ))
}

pub async fn verify_certificate(rpc: &RpcClient, contract: &str, cert_id: &str) -> LedgerResult<bool> {
    let data = abi::encode_call(abi::VERIFY_CERTIFICATE, &[Token::Str(cert_id)]);
    let ret = rpc.eth_call(contract, &data).await?;
    abi::decode_bool(&ret, 0)
}

pub async fn get_certificate(
    rpc: &RpcClient,
    contract: &str,
    cert_id: &str,
) -> LedgerResult<Option<OnChainRecord>> {
    let data = abi::encode_call(abi::GET_CERTIFICATE, &[Token::Str(cert_id)]);
    let ret = rpc.eth_call(contract, &data).await?;
    if ret.is_empty() {
        return Ok(None);
    }

    let stored_id = abi::decode_string(&ret, 0)?;
    if stored_id.is_empty() {
        return Ok(None);
    }
    let cert_type_raw = abi::decode_string(&ret, 6)?;
    let cert_type: CertType = serde_json::from_value(serde_json::Value::String(cert_type_raw.clone()))
        .map_err(|_| LedgerError::Decode(format!("unknown certificate type {cert_type_raw:?}")))?;

    Ok(Some(OnChainRecord {
        cert_id: stored_id,
        student_id: abi::decode_string(&ret, 1)?,
        credential_hash: abi::decode_string(&ret, 2)?,
        metadata_hash: abi::decode_string(&ret, 3)?,
        issuer_address: abi::format_address(&abi::decode_address(&ret, 4)?),
        student_wallet: abi::format_address(&abi::decode_address(&ret, 5)?),
        cert_type,
        timestamp: i64::try_from(abi::decode_uint(&ret, 7)?)
            .map_err(|_| LedgerError::Decode("certificate timestamp exceeds i64".into()))?,
    }))
}

pub async fn get_student_wallet(
    rpc: &RpcClient,
    contract: &str,
    identity_id: &str,
) -> LedgerResult<Option<String>> {
    let data = abi::encode_call(abi::GET_STUDENT_WALLET, &[Token::Str(identity_id)]);
    let ret = rpc.eth_call(contract, &data).await?;
    if ret.is_empty() {
        return Ok(None);
    }
    let addr = abi::decode_address(&ret, 0)?;
    if addr == ZERO_ADDRESS {
        Ok(None)
    } else {
        Ok(Some(abi::format_address(&addr)))
    }
}
