//! Minimal Solidity ABI encoding for the credential registry contract.
//!
//! Only the shapes the registry uses are supported: `string`, `address`,
//! `bool` and `uint256` (read as u64), in flat argument lists and flat
//! return tuples.

use sha3::{Digest, Keccak256};

use super::error::{LedgerError, LedgerResult};

const WORD: usize = 32;

pub const ISSUE_CERTIFICATE: &str =
    "issueCertificate(string,string,string,string,string,string,address)";
pub const REVOKE_CERTIFICATE: &str = "revokeCertificate(string)";
pub const REGISTER_STUDENT_WALLET: &str = "registerStudentWallet(string,address)";
pub const VERIFY_CERTIFICATE: &str = "verifyCertificate(string)";
/// Returns `(string,string,string,string,address,address,string,uint256)`:
/// certId, studentId, credentialHash, metadataHash, issuer, studentWallet, certType, timestamp.
pub const GET_CERTIFICATE: &str = "getCertificate(string)";
pub const GET_STUDENT_WALLET: &str = "getStudentWallet(string)";

#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Str(&'a str),
    Address([u8; 20]),
}

pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Selector followed by head/tail encoded arguments.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();
    let head_len = args.len() * WORD;

    for arg in args {
        match arg {
            Token::Address(addr) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(addr);
                head.extend_from_slice(&word);
            }
            Token::Str(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(s.len() as u64));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(pad));
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

fn word(data: &[u8], index: usize) -> LedgerResult<&[u8]> {
    let start = index * WORD;
    data.get(start..start + WORD)
        .ok_or_else(|| LedgerError::Decode(format!("return data too short for word {index}")))
}

fn word_as_u64(w: &[u8]) -> LedgerResult<u64> {
    if w[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode("integer does not fit in u64".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&w[24..]);
    Ok(u64::from_be_bytes(buf))
}

pub fn decode_uint(data: &[u8], index: usize) -> LedgerResult<u64> {
    word_as_u64(word(data, index)?)
}

pub fn decode_bool(data: &[u8], index: usize) -> LedgerResult<bool> {
    Ok(decode_uint(data, index)? != 0)
}

pub fn decode_address(data: &[u8], index: usize) -> LedgerResult<[u8; 20]> {
    let w = word(data, index)?;
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&w[12..]);
    Ok(addr)
}

pub fn decode_string(data: &[u8], index: usize) -> LedgerResult<String> {
    let offset = as_index(decode_uint(data, index)?)?;
    let body_start = offset
        .checked_add(WORD)
        .ok_or_else(|| LedgerError::Decode("string offset out of range".into()))?;
    let len_word = data
        .get(offset..body_start)
        .ok_or_else(|| LedgerError::Decode("string offset out of range".into()))?;
    let len = as_index(word_as_u64(len_word)?)?;
    let bytes = body_start
        .checked_add(len)
        .and_then(|end| data.get(body_start..end))
        .ok_or_else(|| LedgerError::Decode("string body out of range".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| LedgerError::Decode(e.to_string()))
}

fn as_index(value: u64) -> LedgerResult<usize> {
    usize::try_from(value).map_err(|_| LedgerError::Decode(format!("offset {value} exceeds address space")))
}

pub fn parse_address(s: &str) -> LedgerResult<[u8; 20]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    if trimmed.len() != 40 {
        return Err(LedgerError::InvalidAddress(s.to_string()));
    }
    let bytes = hex::decode(trimmed).map_err(|_| LedgerError::InvalidAddress(s.to_string()))?;
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

pub fn format_address(addr: &[u8; 20]) -> String {
    format!("0x{}", hex::encode(addr))
}
