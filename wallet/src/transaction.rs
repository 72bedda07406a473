//! Transaction envelope model and its XDR wire encoding.
//!
//! Only the subset the payment flow produces is modelled: an ed25519 source,
//! time-bound preconditions, an optional text memo and native-asset
//! `CreateAccount`/`Payment` operations. Anything else decodes to an error.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

use crate::blockchain::{Address, Amount};
use crate::errors::{WalletError, WalletResult};

const ENVELOPE_TYPE_TX: i32 = 2;
const KEY_TYPE_ED25519: i32 = 0;
const PUBLIC_KEY_TYPE_ED25519: i32 = 0;
const PRECOND_NONE: i32 = 0;
const PRECOND_TIME: i32 = 1;
const MEMO_NONE: i32 = 0;
const MEMO_TEXT: i32 = 1;
const OP_CREATE_ACCOUNT: i32 = 0;
const OP_PAYMENT: i32 = 1;
const ASSET_TYPE_NATIVE: i32 = 0;

pub const MAX_MEMO_TEXT_BYTES: usize = 28;
pub const MAX_OPERATIONS: usize = 100;
pub const MAX_SIGNATURES: usize = 20;
const MAX_SIGNATURE_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min_time: u64,
    /// Zero means unbounded.
    pub max_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Memo {
    #[default]
    None,
    Text(String),
}

impl Memo {
    pub fn text(text: impl Into<String>) -> WalletResult<Self> {
        let text = text.into();
        if text.len() > MAX_MEMO_TEXT_BYTES {
            return Err(WalletError::InvalidMemo(format!(
                "Memo must be at most {} bytes",
                MAX_MEMO_TEXT_BYTES
            )));
        }
        Ok(Memo::Text(text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Creates `destination` funded with `starting_balance`.
    CreateAccount {
        destination: Address,
        starting_balance: Amount,
    },
    /// Native-asset transfer to an existing account.
    Payment { destination: Address, amount: Amount },
}

impl Operation {
    pub fn destination(&self) -> &Address {
        match self {
            Operation::CreateAccount { destination, .. } => destination,
            Operation::Payment { destination, .. } => destination,
        }
    }

    pub fn amount(&self) -> Amount {
        match self {
            Operation::CreateAccount {
                starting_balance, ..
            } => *starting_balance,
            Operation::Payment { amount, .. } => *amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub source: Address,
    pub fee: u32,
    pub sequence: i64,
    pub time_bounds: Option<TimeBounds>,
    pub memo: Memo,
    pub operations: Vec<Operation>,
}

impl Transaction {
    pub fn to_xdr(&self) -> Vec<u8> {
        let mut writer = XdrWriter::default();
        write_transaction(&mut writer, self);
        writer.into_bytes()
    }

    /// Bytes the extension signs: network id, envelope tag, transaction.
    pub fn signature_payload(&self, network_id: &[u8; 32]) -> Vec<u8> {
        let mut writer = XdrWriter::default();
        writer.write_fixed(network_id);
        writer.write_i32(ENVELOPE_TYPE_TX);
        write_transaction(&mut writer, self);
        writer.into_bytes()
    }

    pub fn hash(&self, network_id: &[u8; 32]) -> [u8; 32] {
        let digest = Sha256::digest(self.signature_payload(network_id));
        let mut output = [0u8; 32];
        output.copy_from_slice(&digest);
        output
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEnvelope {
    pub tx: Transaction,
    pub signatures: Vec<DecoratedSignature>,
}

impl TransactionEnvelope {
    pub fn to_xdr(&self) -> Vec<u8> {
        let mut writer = XdrWriter::default();
        writer.write_i32(ENVELOPE_TYPE_TX);
        write_transaction(&mut writer, &self.tx);
        writer.write_u32(self.signatures.len() as u32);
        for signature in &self.signatures {
            writer.write_fixed(&signature.hint);
            writer.write_var_opaque(&signature.signature);
        }
        writer.into_bytes()
    }

    pub fn to_xdr_base64(&self) -> String {
        STANDARD.encode(self.to_xdr())
    }

    pub fn from_xdr(bytes: &[u8]) -> WalletResult<Self> {
        let mut reader = XdrReader::new(bytes);
        let envelope_type = reader.read_i32()?;
        if envelope_type != ENVELOPE_TYPE_TX {
            return Err(unsupported("envelope type", envelope_type));
        }
        let tx = read_transaction(&mut reader)?;

        let count = reader.read_len(MAX_SIGNATURES, "signatures")?;
        let mut signatures = Vec::with_capacity(count);
        for _ in 0..count {
            let mut hint = [0u8; 4];
            hint.copy_from_slice(reader.read_fixed(4)?);
            let signature = reader.read_var_opaque(MAX_SIGNATURE_BYTES)?.to_vec();
            signatures.push(DecoratedSignature { hint, signature });
        }

        reader.finish()?;
        Ok(TransactionEnvelope { tx, signatures })
    }

    pub fn from_xdr_base64(encoded: &str) -> WalletResult<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| WalletError::InvalidResponse(format!("Envelope is not base64: {}", e)))?;
        Self::from_xdr(&bytes)
    }
}

/// Freshly built envelope awaiting a signature.
///
/// Consumed by [`UnsignedEnvelope::into_signed`]; a rebuilt envelope (new
/// sequence number) is required to pay again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEnvelope {
    envelope: TransactionEnvelope,
    network_id: [u8; 32],
}

impl UnsignedEnvelope {
    pub fn new(tx: Transaction, network_id: [u8; 32]) -> Self {
        Self {
            envelope: TransactionEnvelope {
                tx,
                signatures: Vec::new(),
            },
            network_id,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.envelope.tx
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.envelope.tx.hash(&self.network_id))
    }

    pub fn to_xdr_base64(&self) -> String {
        self.envelope.to_xdr_base64()
    }

    /// Accept the extension's signed XDR after checking it signs this body.
    pub fn into_signed(self, signed_xdr: &str) -> WalletResult<SignedEnvelope> {
        let decoded = TransactionEnvelope::from_xdr_base64(signed_xdr)?;
        if decoded.tx != self.envelope.tx {
            return Err(WalletError::SigningFailed(
                "Signed transaction does not match the requested transaction".to_string(),
            ));
        }
        if decoded.signatures.is_empty() {
            return Err(WalletError::SigningFailed(
                "No signature returned from wallet".to_string(),
            ));
        }
        Ok(SignedEnvelope {
            xdr_base64: decoded.to_xdr_base64(),
            envelope: decoded,
            network_id: self.network_id,
        })
    }
}

/// Envelope carrying at least one signature, ready for a single submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    envelope: TransactionEnvelope,
    network_id: [u8; 32],
    xdr_base64: String,
}

impl SignedEnvelope {
    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn xdr_base64(&self) -> &str {
        &self.xdr_base64
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.envelope.tx.hash(&self.network_id))
    }
}

#[derive(Debug, Default)]
struct XdrWriter {
    buffer: Vec<u8>,
}

impl XdrWriter {
    fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn write_i64(&mut self, value: i64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    fn write_fixed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        self.pad(bytes.len());
    }

    fn write_var_opaque(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_fixed(bytes);
    }

    fn pad(&mut self, len: usize) {
        let padding = (4 - len % 4) % 4;
        self.buffer.extend(std::iter::repeat(0u8).take(padding));
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

struct XdrReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> XdrReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn take(&mut self, len: usize) -> WalletResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| WalletError::InvalidResponse("Truncated XDR".to_string()))?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_i32(&mut self) -> WalletResult<i32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(i32::from_be_bytes(raw))
    }

    fn read_u32(&mut self) -> WalletResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    fn read_i64(&mut self) -> WalletResult<i64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(i64::from_be_bytes(raw))
    }

    fn read_u64(&mut self) -> WalletResult<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    fn read_len(&mut self, max: usize, what: &str) -> WalletResult<usize> {
        let len = self.read_u32()? as usize;
        if len > max {
            return Err(WalletError::InvalidResponse(format!(
                "Too many {}: {} > {}",
                what, len, max
            )));
        }
        Ok(len)
    }

    fn read_fixed(&mut self, len: usize) -> WalletResult<&'a [u8]> {
        let data = self.take(len)?;
        let padding = (4 - len % 4) % 4;
        if self.take(padding)?.iter().any(|b| *b != 0) {
            return Err(WalletError::InvalidResponse(
                "Non-zero XDR padding".to_string(),
            ));
        }
        Ok(data)
    }

    fn read_var_opaque(&mut self, max: usize) -> WalletResult<&'a [u8]> {
        let len = self.read_len(max, "bytes")?;
        self.read_fixed(len)
    }

    fn finish(&self) -> WalletResult<()> {
        if self.position != self.bytes.len() {
            return Err(WalletError::InvalidResponse(
                "Trailing bytes after envelope".to_string(),
            ));
        }
        Ok(())
    }
}

fn unsupported(what: &str, discriminant: i32) -> WalletError {
    WalletError::InvalidResponse(format!("Unsupported {} {}", what, discriminant))
}

fn write_muxed_account(writer: &mut XdrWriter, address: &Address) {
    writer.write_i32(KEY_TYPE_ED25519);
    writer.write_fixed(address.public_key());
}

fn read_muxed_account(reader: &mut XdrReader<'_>) -> WalletResult<Address> {
    let key_type = reader.read_i32()?;
    if key_type != KEY_TYPE_ED25519 {
        return Err(unsupported("account key type", key_type));
    }
    read_public_key_bytes(reader)
}

fn write_account_id(writer: &mut XdrWriter, address: &Address) {
    writer.write_i32(PUBLIC_KEY_TYPE_ED25519);
    writer.write_fixed(address.public_key());
}

fn read_account_id(reader: &mut XdrReader<'_>) -> WalletResult<Address> {
    let key_type = reader.read_i32()?;
    if key_type != PUBLIC_KEY_TYPE_ED25519 {
        return Err(unsupported("public key type", key_type));
    }
    read_public_key_bytes(reader)
}

fn read_public_key_bytes(reader: &mut XdrReader<'_>) -> WalletResult<Address> {
    let mut key = [0u8; 32];
    key.copy_from_slice(reader.read_fixed(32)?);
    Ok(Address::from_public_key(key))
}

fn read_amount(reader: &mut XdrReader<'_>) -> WalletResult<Amount> {
    Amount::from_stroops(reader.read_i64()?)
        .map_err(|_| WalletError::InvalidResponse("Negative amount in envelope".to_string()))
}

fn write_transaction(writer: &mut XdrWriter, tx: &Transaction) {
    write_muxed_account(writer, &tx.source);
    writer.write_u32(tx.fee);
    writer.write_i64(tx.sequence);

    match &tx.time_bounds {
        Some(bounds) => {
            writer.write_i32(PRECOND_TIME);
            writer.write_u64(bounds.min_time);
            writer.write_u64(bounds.max_time);
        }
        None => writer.write_i32(PRECOND_NONE),
    }

    match &tx.memo {
        Memo::None => writer.write_i32(MEMO_NONE),
        Memo::Text(text) => {
            writer.write_i32(MEMO_TEXT);
            writer.write_var_opaque(text.as_bytes());
        }
    }

    writer.write_u32(tx.operations.len() as u32);
    for operation in &tx.operations {
        // No per-operation source account.
        writer.write_u32(0);
        match operation {
            Operation::CreateAccount {
                destination,
                starting_balance,
            } => {
                writer.write_i32(OP_CREATE_ACCOUNT);
                write_account_id(writer, destination);
                writer.write_i64(starting_balance.stroops());
            }
            Operation::Payment {
                destination,
                amount,
            } => {
                writer.write_i32(OP_PAYMENT);
                write_muxed_account(writer, destination);
                writer.write_i32(ASSET_TYPE_NATIVE);
                writer.write_i64(amount.stroops());
            }
        }
    }

    // ext
    writer.write_i32(0);
}

fn read_transaction(reader: &mut XdrReader<'_>) -> WalletResult<Transaction> {
    let source = read_muxed_account(reader)?;
    let fee = reader.read_u32()?;
    let sequence = reader.read_i64()?;

    let time_bounds = match reader.read_i32()? {
        PRECOND_NONE => None,
        PRECOND_TIME => Some(TimeBounds {
            min_time: reader.read_u64()?,
            max_time: reader.read_u64()?,
        }),
        other => return Err(unsupported("precondition", other)),
    };

    let memo = match reader.read_i32()? {
        MEMO_NONE => Memo::None,
        MEMO_TEXT => {
            let raw = reader.read_var_opaque(MAX_MEMO_TEXT_BYTES)?;
            let text = String::from_utf8(raw.to_vec())
                .map_err(|_| WalletError::InvalidResponse("Memo is not UTF-8".to_string()))?;
            Memo::Text(text)
        }
        other => return Err(unsupported("memo type", other)),
    };

    let count = reader.read_len(MAX_OPERATIONS, "operations")?;
    let mut operations = Vec::with_capacity(count);
    for _ in 0..count {
        if reader.read_u32()? != 0 {
            return Err(WalletError::InvalidResponse(
                "Operation source accounts are not supported".to_string(),
            ));
        }
        let operation = match reader.read_i32()? {
            OP_CREATE_ACCOUNT => Operation::CreateAccount {
                destination: read_account_id(reader)?,
                starting_balance: read_amount(reader)?,
            },
            OP_PAYMENT => {
                let destination = read_muxed_account(reader)?;
                let asset_type = reader.read_i32()?;
                if asset_type != ASSET_TYPE_NATIVE {
                    return Err(unsupported("asset type", asset_type));
                }
                Operation::Payment {
                    destination,
                    amount: read_amount(reader)?,
                }
            }
            other => return Err(unsupported("operation type", other)),
        };
        operations.push(operation);
    }

    let ext = reader.read_i32()?;
    if ext != 0 {
        return Err(unsupported("transaction extension", ext));
    }

    Ok(Transaction {
        source,
        fee,
        sequence,
        time_bounds,
        memo,
        operations,
    })
}
