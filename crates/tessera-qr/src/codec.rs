//! Pairing URI encoder and decoder
//!
//! Layering, outermost first: URI query, percent-encoding, base64 (standard
//! alphabet), LZMA, protobuf [`PairingMessage`].

use std::io::{self, Cursor, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use prost::Message;
use tracing::{debug, warn};
use url::form_urlencoded;

use tessera_core::{CeremonyKind, Chain, PartyId, SessionId};

use crate::error::{QrError, Result};
use crate::payload::QrPairingPayload;
use crate::proto::{PairingKind, PairingMessage};

/// Scheme used when none is configured
pub const DEFAULT_SCHEME: &str = "tessera";

const PAYLOAD_TYPE: &str = "NewVault";
const DATA_PARAM: &str = "jsonData";

/// `tssType` is the same for every flow; the protobuf `kind` decides
const TSS_TYPE: &str = "Keygen";

/// Upper bound on a decompressed payload; real ones are a few hundred bytes
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// Encodes and decodes pairing URIs under a fixed scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCodec {
    scheme: String,
}

impl Default for PairingCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEME)
    }
}

impl PairingCodec {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Build the URI shown in the pairing QR code
    pub fn encode(&self, payload: &QrPairingPayload) -> Result<String> {
        let message = to_message(payload);
        let packed = pack(&message)?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("type", PAYLOAD_TYPE)
            .append_pair("tssType", TSS_TYPE)
            .append_pair(DATA_PARAM, &packed)
            .finish();

        let uri = format!("{}://?{}", self.scheme, query);
        debug!(
            "Encoded pairing URI for session {} ({} chars)",
            payload.session_id,
            uri.len()
        );
        Ok(uri)
    }

    /// Parse a scanned URI back into a payload
    ///
    /// Chain names unknown to this build are skipped with a warning.
    pub fn decode(&self, uri: &str) -> Result<QrPairingPayload> {
        let prefix = format!("{}://", self.scheme);
        let rest = uri
            .trim()
            .strip_prefix(&prefix)
            .ok_or_else(|| QrError::MissingScheme(self.scheme.clone()))?;

        let query = rest.split_once('?').map(|(_, q)| q).unwrap_or("");
        let data = form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == DATA_PARAM)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or(QrError::MissingData)?;

        let message = unpack(&data)?;
        from_message(message)
    }
}

fn to_message(payload: &QrPairingPayload) -> PairingMessage {
    let kind = match payload.kind {
        CeremonyKind::FreshKeygen => PairingKind::Keygen,
        CeremonyKind::KeyImport => PairingKind::KeyImport,
    };

    PairingMessage {
        session_id: payload.session_id.as_str().to_string(),
        hex_chain_code: payload.chain_code.clone(),
        initiator_party_id: payload.initiator_party_id.as_str().to_string(),
        encryption_key_hex: payload.encryption_key.clone(),
        use_relay: payload.use_relay,
        vault_name: payload.vault_name.clone(),
        kind: kind as i32,
        chains: payload.chains.iter().map(|c| c.name().to_string()).collect(),
    }
}

fn from_message(message: PairingMessage) -> Result<QrPairingPayload> {
    if message.session_id.is_empty() {
        return Err(QrError::InvalidField("session_id is empty".to_string()));
    }
    if message.encryption_key_hex.is_empty() {
        return Err(QrError::InvalidField(
            "encryption_key_hex is empty".to_string(),
        ));
    }

    let kind = match PairingKind::try_from(message.kind) {
        Ok(PairingKind::Keygen) => CeremonyKind::FreshKeygen,
        Ok(PairingKind::KeyImport) => CeremonyKind::KeyImport,
        Err(_) => {
            return Err(QrError::InvalidField(format!(
                "unknown ceremony kind {}",
                message.kind
            )))
        }
    };

    let chains = message
        .chains
        .iter()
        .filter_map(|name| match name.parse::<Chain>() {
            Ok(chain) => Some(chain),
            Err(e) => {
                warn!("Skipping chain from pairing payload: {}", e);
                None
            }
        })
        .collect();

    Ok(QrPairingPayload {
        session_id: SessionId::new(message.session_id),
        encryption_key: message.encryption_key_hex,
        chain_code: message.hex_chain_code,
        initiator_party_id: PartyId::new(message.initiator_party_id),
        vault_name: message.vault_name,
        chains,
        kind,
        use_relay: message.use_relay,
    })
}

/// protobuf -> LZMA -> base64
fn pack(message: &PairingMessage) -> Result<String> {
    let raw = message.encode_to_vec();
    let mut compressed = Vec::new();
    lzma_rs::lzma_compress(&mut Cursor::new(raw), &mut compressed)
        .map_err(|e| QrError::Compression(e.to_string()))?;
    Ok(STANDARD.encode(compressed))
}

/// base64 -> LZMA -> protobuf
fn unpack(data: &str) -> Result<PairingMessage> {
    // Producers that skip percent-encoding leave '+' to be read back as ' '
    let normalized: String = data
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();

    let compressed = STANDARD.decode(normalized.as_bytes())?;
    let options = lzma_rs::decompress::Options {
        memlimit: Some(MAX_PAYLOAD_SIZE),
        ..Default::default()
    };
    let mut raw = CappedBuffer::new(MAX_PAYLOAD_SIZE);
    lzma_rs::lzma_decompress_with_options(&mut Cursor::new(compressed), &mut raw, &options)
        .map_err(|e| QrError::Decompression(e.to_string()))?;

    Ok(PairingMessage::decode(raw.bytes.as_slice())?)
}

/// Output buffer that refuses to grow past `limit`
struct CappedBuffer {
    bytes: Vec<u8>,
    limit: usize,
}

impl CappedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
        }
    }
}

impl Write for CappedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.bytes.len() + buf.len() > self.limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("payload exceeds {} bytes", self.limit),
            ));
        }
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
