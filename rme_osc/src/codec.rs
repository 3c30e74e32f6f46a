//! OSC 1.1 message/bundle encoding and decoding.

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use rme_core::{ErrorKind, Result, RmeError};

use crate::address::validate_address;

/// Maximum OSC packet size this system will encode or accept, per the wire
/// interface.
pub const MAX_PACKET_SIZE: usize = 8192;

/// Stateless OSC 1.1 codec: message framing and bundle flattening.
#[derive(Debug, Clone, Copy, Default)]
pub struct OscCodec;

impl OscCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a single OSC message.
    pub fn encode_message(self, address: &str, args: Vec<OscType>) -> Result<Vec<u8>> {
        validate_address(address)?;
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args,
        });
        self.encode_packet(&packet)
    }

    /// Encode a `#bundle` carrying several messages under one NTP timetag.
    pub fn encode_bundle(
        self,
        messages: Vec<(String, Vec<OscType>)>,
        timetag: (u32, u32),
    ) -> Result<Vec<u8>> {
        for (address, _) in &messages {
            validate_address(address)?;
        }
        let content = messages
            .into_iter()
            .map(|(addr, args)| OscPacket::Message(OscMessage { addr, args }))
            .collect();
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: timetag.0,
                fractional: timetag.1,
            },
            content,
        });
        self.encode_packet(&packet)
    }

    fn encode_packet(self, packet: &OscPacket) -> Result<Vec<u8>> {
        let bytes = rosc::encoder::encode(packet)
            .map_err(|e| RmeError::new(ErrorKind::Protocol, "OscCodec::encode", e.to_string()))?;
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "OscCodec::encode",
                "encoded packet exceeds the maximum packet size",
            ));
        }
        Ok(bytes)
    }

    /// Decode a wire packet into a flat list of messages, recursing into
    /// any bundle contents in depth-first order.
    pub fn decode(self, bytes: &[u8]) -> Result<Vec<OscMessage>> {
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(RmeError::new(
                ErrorKind::Protocol,
                "OscCodec::decode",
                "packet exceeds the maximum packet size",
            ));
        }
        let (_, packet) = rosc::decoder::decode_udp(bytes)
            .map_err(|e| RmeError::new(ErrorKind::Protocol, "OscCodec::decode", e.to_string()))?;
        let mut out = Vec::new();
        flatten(packet, &mut out);
        Ok(out)
    }
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => out.push(message),
        OscPacket::Bundle(bundle) => {
            for content in bundle.content {
                flatten(content, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_roundtrips_through_the_wire() {
        let codec = OscCodec::new();
        let wire = codec
            .encode_message("/input/3/gain", vec![OscType::Float(1.5)])
            .unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].addr, "/input/3/gain");
        assert_eq!(decoded[0].args, vec![OscType::Float(1.5)]);
    }

    #[test]
    fn bundle_flattens_to_its_messages_in_order() {
        let codec = OscCodec::new();
        let wire = codec
            .encode_bundle(
                vec![
                    ("/input/1/gain".into(), vec![OscType::Float(0.0)]),
                    ("/input/2/gain".into(), vec![OscType::Float(1.0)]),
                ],
                (0, 1),
            )
            .unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].addr, "/input/1/gain");
        assert_eq!(decoded[1].addr, "/input/2/gain");
    }

    #[test]
    fn encode_rejects_invalid_address() {
        let codec = OscCodec::new();
        assert!(codec.encode_message("no-leading-slash", vec![]).is_err());
    }

    #[test]
    fn decode_rejects_oversized_packet() {
        let codec = OscCodec::new();
        let oversized = vec![0u8; MAX_PACKET_SIZE + 1];
        assert!(codec.decode(&oversized).is_err());
    }

    #[test]
    fn supports_the_documented_type_tag_subset() {
        let codec = OscCodec::new();
        let args = vec![
            OscType::Int(7),
            OscType::Float(1.0),
            OscType::String("enum-name".into()),
            OscType::Blob(vec![1, 2, 3]),
            OscType::Bool(true),
            OscType::Bool(false),
            OscType::Nil,
            OscType::Inf,
        ];
        let wire = codec.encode_message("/echo", args.clone()).unwrap();
        let decoded = codec.decode(&wire).unwrap();
        assert_eq!(decoded[0].args, args);
    }
}
