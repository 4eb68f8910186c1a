//! OSC packet encoding and decoding.

use rosc::{decoder, encoder, OscError, OscMessage, OscPacket, OscType};

use crate::error::TransportError;

/// Build a message from an address and its arguments.
pub fn message(address: impl Into<String>, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: address.into(),
        args,
    }
}

pub fn encode_message(message: &OscMessage) -> Result<Vec<u8>, TransportError> {
    if !message.addr.starts_with('/') {
        return Err(TransportError::EncodeFailed {
            address: message.addr.clone(),
            reason: "address must start with '/'".to_string(),
        });
    }
    encoder::encode(&OscPacket::Message(message.clone())).map_err(|e| {
        TransportError::EncodeFailed {
            address: message.addr.clone(),
            reason: format!("{:?}", e),
        }
    })
}

/// Decode a datagram into its messages. Bundles are flattened in order.
pub fn decode_datagram(bytes: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let (_, packet) = decoder::decode_udp(bytes)?;
    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}

/// Numeric value of an argument, if it has one.
pub fn numeric_value(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Int(v) => Some(f64::from(*v)),
        OscType::Float(v) => Some(f64::from(*v)),
        OscType::Long(v) => Some(*v as f64),
        OscType::Double(v) => Some(*v),
        _ => None,
    }
}
