//! End-to-end message scenarios.

use std::io::{Read, Write};

use cutlass_openpgp as openpgp;

use openpgp::Packet;
use openpgp::PacketPile;
use openpgp::cert::{Cert, CertBuilder};
use openpgp::cert::builder::CipherSuite;
use openpgp::crypto::KeyPair;
use openpgp::parse::Parse;
use openpgp::parse::stream::Decryptor;
use openpgp::policy::Config;
use openpgp::serialize::MarshalInto;
use openpgp::serialize::stream::{
    Compressor, Encryptor, LiteralWriter, Message, Signer,
};
use openpgp::types::{CompressionAlgorithm, SymmetricAlgorithm};

fn signing_keypair(config: &Config, cert: &Cert) -> KeyPair {
    cert.keys().secret().for_signing()
        .with_policy(config, None)
        .next().expect("have a signing subkey")
        .key().clone()
        .parts_into_secret().unwrap()
        .into_keypair().unwrap()
}

fn decryption_keypair(config: &Config, cert: &Cert) -> KeyPair {
    cert.keys().secret().for_transport_encryption()
        .with_policy(config, None)
        .next().expect("have an encryption subkey")
        .key().clone()
        .parts_into_secret().unwrap()
        .into_keypair().unwrap()
}

/// Signs a binary message with Ed25519, serializes it as a one-pass
/// signed message, verifies it, then flips one byte of the payload
/// and checks that verification fails.
#[test]
fn one_pass_sign_then_verify_then_tamper() {
    let config = Config::default();
    let (cert, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Ed <ed@example.org>")
        .generate().unwrap();

    let msg: Vec<u8> = (0u8..=255).collect();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Signer::new(message, signing_keypair(&config, &cert))
        .build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(&msg).unwrap();
    message.finalize().unwrap();

    // Verification succeeds, and the payload survives.
    let mut v = Decryptor::verifier(&config, &sink, vec![cert.clone()])
        .unwrap();
    let mut payload = Vec::new();
    v.read_to_end(&mut payload).unwrap();
    assert_eq!(payload, msg);
    let results = v.verifications().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].good());

    // Mutate byte 17 of the payload.  The literal packet's body
    // starts after the one-pass signature packet and the literal
    // header; find it by locating the known payload.
    let offset = sink.windows(msg.len())
        .position(|w| w == &msg[..])
        .expect("payload is embedded verbatim");
    let mut tampered = sink.clone();
    tampered[offset + 17] ^= 1;

    let mut v = Decryptor::verifier(&config, &tampered, vec![cert])
        .unwrap();
    let mut payload = Vec::new();
    v.read_to_end(&mut payload).unwrap();
    let results = v.verifications().unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].good());
}

/// Builds a signed, compressed, encrypted message and processes it
/// back to the payload.
#[test]
fn sign_compress_encrypt_roundtrip() {
    let config = Config::default();
    let (alice, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Alice <alice@example.org>")
        .generate().unwrap();
    let (bob, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Bob <bob@example.org>")
        .generate().unwrap();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::for_recipients(message, &config, vec![&bob])
        .build().unwrap();
    let message = Compressor::new(message)
        .algo(CompressionAlgorithm::Zip)
        .build().unwrap();
    let message = Signer::new(message, signing_keypair(&config, &alice))
        .build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"onion layers").unwrap();
    message.finalize().unwrap();

    let mut d = Decryptor::from_bytes(
        &config, &sink, vec![alice],
        vec![decryption_keypair(&config, &bob)],
        Vec::new(), Vec::new()).unwrap();
    let mut payload = Vec::new();
    d.read_to_end(&mut payload).unwrap();
    assert_eq!(&payload, b"onion layers");

    let results = d.verifications().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].good());
}

/// AEAD messages decrypt; truncating or twiddling the stream is
/// detected.
#[test]
fn aead_message_integrity() {
    let config = Config::default().set_aead_protect(true);

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["squeamish ossifrage".into()])
        .build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"Hello, World!\n").unwrap();
    message.finalize().unwrap();

    let decrypt = |data: &[u8]| -> openpgp::Result<Vec<u8>> {
        let mut d = Decryptor::from_bytes(
            &config, data, Vec::new(), Vec::new(),
            vec!["squeamish ossifrage".into()], Vec::new())?;
        let mut payload = Vec::new();
        d.read_to_end(&mut payload)?;
        Ok(payload)
    };

    assert_eq!(decrypt(&sink).unwrap(), b"Hello, World!\n");

    // Changing the final tag byte causes an integrity error.
    let mut tampered = sink.clone();
    let n = tampered.len();
    tampered[n - 1] ^= 1;
    assert!(decrypt(&tampered).is_err());
}

/// Messages encrypted with a password decrypt with that password
/// only, and the payload structure is a valid message.
#[test]
fn password_message_structure() {
    let config = Config::default();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["p1".into(), "p2".into()])
        .build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"two locks, one door").unwrap();
    message.finalize().unwrap();

    // Both passwords work.
    for pw in ["p1", "p2"] {
        let mut d = Decryptor::from_bytes(
            &config, &sink, Vec::new(), Vec::new(),
            vec![pw.into()], Vec::new()).unwrap();
        let mut payload = Vec::new();
        d.read_to_end(&mut payload).unwrap();
        assert_eq!(&payload, b"two locks, one door");
    }

    // The serialized form is SKESK SKESK SEIP.
    let pile = PacketPile::from_bytes(&sink).unwrap();
    let tags: Vec<_> = pile.children().map(|p| p.tag()).collect();
    use openpgp::packet::Tag;
    assert_eq!(&tags, &[Tag::SKESK, Tag::SKESK, Tag::SEIP]);
}

/// The symmetric algorithm from the configuration is honored.
#[test]
fn preferred_symmetric_algorithm_is_used() {
    let config = Config::default()
        .set_preferred_symmetric_algorithm(SymmetricAlgorithm::AES128);

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["aes128".into()]).build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"small key").unwrap();
    message.finalize().unwrap();

    let pile = PacketPile::from_bytes(&sink).unwrap();
    match pile.path_ref(&[0]).unwrap() {
        Packet::SKESK(openpgp::packet::SKESK::V4(skesk)) => {
            assert_eq!(skesk.symmetric_algo(), SymmetricAlgorithm::AES128);
        }
        p => panic!("unexpected packet: {:?}", p),
    }

    let mut d = Decryptor::from_bytes(
        &config, &sink, Vec::new(), Vec::new(),
        vec!["aes128".into()], Vec::new()).unwrap();
    let mut payload = Vec::new();
    d.read_to_end(&mut payload).unwrap();
    assert_eq!(&payload, b"small key");
}

/// Serialized messages round-trip through the packet pile bytewise.
#[test]
fn message_roundtrip_is_byte_exact() {
    let config = Config::default();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["roundtrip".into()]).build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"stable bytes").unwrap();
    message.finalize().unwrap();

    // Parsing and re-serializing an encrypted message (without
    // decrypting it) preserves the bytes.
    let pile = PacketPile::from_bytes(&sink).unwrap();
    assert_eq!(pile.to_vec().unwrap(), sink);
}
