//! Newline-delimited JSON framing with transparent content encryption.
//!
//! The codec is the only layer that ever sees ciphertext: `encode` encrypts
//! confidential content on the way out, `decode` decrypts it on the way in.
//! Everything above the codec works with plaintext packets.

use tracing::warn;

use cw_core::error::{ChatError, ChatResult};

use crate::crypto::AesCipher;
use crate::packet::Packet;

/// Encoder/decoder between [`Packet`]s and wire lines.
#[derive(Debug, Clone)]
pub struct Codec {
    passphrase: Option<String>,
}

impl Codec {
    /// Create a codec with an optional encryption passphrase.
    ///
    /// Without a passphrase all content travels in plaintext, which is only
    /// sensible against a server configured the same way.
    pub fn new(passphrase: Option<String>) -> Self {
        Self { passphrase }
    }

    /// A codec that performs no encryption.
    pub fn plaintext() -> Self {
        Self { passphrase: None }
    }

    /// Whether this codec encrypts confidential content.
    pub fn encrypts(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Serialize a packet into one wire line, newline terminator included.
    ///
    /// Confidential content (message text) is replaced by its ciphertext
    /// before serialization. An encryption failure aborts the encode: the
    /// caller observes an error and nothing reaches the wire. The JSON
    /// serializer escapes any embedded newlines in text fields, so the
    /// line framing cannot be corrupted by content.
    pub fn encode(&self, packet: &Packet) -> ChatResult<String> {
        let mut packet = packet.clone();

        if packet.packet_type.is_confidential() && !packet.content_str().is_empty() {
            if let Some(ref passphrase) = self.passphrase {
                let encrypted = AesCipher::encrypt(passphrase, packet.content_str())
                    .map_err(|e| ChatError::Crypto(format!("send suppressed: {e}")))?;
                packet.content = Some(encrypted);
            }
        }

        let mut line = serde_json::to_string(&packet)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one received line into a packet.
    ///
    /// Malformed JSON is an error (the receive loop treats it as fatal to
    /// the stream). A failed decrypt of confidential content degrades that
    /// field to `None` instead of rejecting the whole packet.
    pub fn decode(&self, line: &str) -> ChatResult<Packet> {
        let mut packet: Packet = serde_json::from_str(line.trim_end())
            .map_err(|e| ChatError::MalformedPacket(e.to_string()))?;

        if packet.packet_type.is_confidential() && !packet.content_str().is_empty() {
            if let Some(ref passphrase) = self.passphrase {
                match AesCipher::decrypt(passphrase, packet.content_str()) {
                    Ok(plaintext) => packet.content = Some(plaintext),
                    Err(e) => {
                        warn!(sender = %packet.sender, "content decrypt failed: {e}");
                        packet.content = None;
                    }
                }
            }
        }

        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketType;

    fn secure_codec() -> Codec {
        Codec::new(Some("test-passphrase".into()))
    }

    #[test]
    fn test_roundtrip_message_content_transparent() {
        let codec = secure_codec();
        let packet = Packet::new(PacketType::Message, "alice")
            .with_receiver("bob")
            .with_content("see you at 12");

        let line = codec.encode(&packet).unwrap();
        // Ciphertext on the wire, not the plaintext
        assert!(!line.contains("see you at 12"));
        assert!(line.ends_with('\n'));

        let decoded = codec.decode(&line).unwrap();
        assert_eq!(decoded.content_str(), "see you at 12");
        assert_eq!(decoded.sender, "alice");
        assert_eq!(decoded.receiver.as_deref(), Some("bob"));
    }

    #[test]
    fn test_roundtrip_non_confidential_untouched() {
        let codec = secure_codec();
        let packet = Packet::new(PacketType::Typing, "alice")
            .with_receiver("bob")
            .with_content("start");

        let line = codec.encode(&packet).unwrap();
        assert!(line.contains("start"));

        let decoded = codec.decode(&line).unwrap();
        assert_eq!(decoded.content_str(), "start");
    }

    #[test]
    fn test_single_line_even_with_newlines_in_content() {
        let codec = Codec::plaintext();
        let packet = Packet::new(PacketType::Typing, "alice").with_content("two\nlines");

        let line = codec.encode(&packet).unwrap();
        // Exactly one raw newline: the frame terminator
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));

        let decoded = codec.decode(&line).unwrap();
        assert_eq!(decoded.content_str(), "two\nlines");
    }

    #[test]
    fn test_decode_malformed_line() {
        let codec = Codec::plaintext();
        let result = codec.decode("{not json");
        assert!(matches!(result, Err(ChatError::MalformedPacket(_))));
    }

    #[test]
    fn test_decode_undecryptable_content_degrades_to_none() {
        let codec = secure_codec();
        let line = r#"{"type":"message","sender":"bob","content":"!!not-ciphertext!!"}"#;

        let packet = codec.decode(line).unwrap();
        assert_eq!(packet.packet_type, PacketType::Message);
        assert!(packet.content.is_none());
    }

    #[test]
    fn test_plaintext_codec_passes_content_through() {
        let codec = Codec::plaintext();
        let packet = Packet::new(PacketType::Message, "alice").with_content("hello");

        let line = codec.encode(&packet).unwrap();
        assert!(line.contains("hello"));

        let decoded = codec.decode(&line).unwrap();
        assert_eq!(decoded.content_str(), "hello");
    }

    #[test]
    fn test_empty_message_content_skips_encryption() {
        let codec = secure_codec();
        let packet = Packet::new(PacketType::Message, "alice");

        let line = codec.encode(&packet).unwrap();
        let decoded = codec.decode(&line).unwrap();
        assert!(decoded.content.is_none());
    }
}
