//! Crate-internal integration tests.
//!
//! These tests exercise interactions that span modules; the
//! machinery-specific tests live next to the code they test, and the
//! public end-to-end scenarios live in `tests/`.

use std::io::{Read, Write};
use std::time::SystemTime;

use crate::{
    Packet,
    PacketPile,
    cert::{Cert, CertBuilder},
    cert::builder::CipherSuite,
    crypto::SessionKey,
    packet::prelude::*,
    parse::Parse,
    parse::stream,
    policy::Config,
    serialize::MarshalInto,
    serialize::stream::{Encryptor, LiteralWriter, Message, Signer},
    types::{DataFormat, SymmetricAlgorithm},
};

/// Returns a timestamp for the tests.
///
/// Freezing the time makes the expiration-related tests
/// deterministic.
#[allow(dead_code)]
pub(crate) fn frozen_time() -> SystemTime {
    crate::types::Timestamp::from(1554542220 - 1).into()
}

#[test]
fn fingerprint_is_stable_across_encodings() {
    // Property: the fingerprint of a parsed key equals the
    // fingerprint of the generated key, regardless of the encoding
    // path.
    let (cert, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Nadja <nadja@example.org>")
        .generate().unwrap();
    let fpr = cert.fingerprint();

    let buf = cert.to_vec().unwrap();
    let cert2 = Cert::from_bytes(&buf).unwrap();
    assert_eq!(cert2.fingerprint(), fpr);

    // Strip the secret key material; the fingerprint is a function of
    // the public material only.
    let public: Vec<Packet> = cert2.into_packets()
        .map(|p| match p {
            Packet::SecretKey(k) =>
                Packet::PublicKey(k.take_secret().0),
            Packet::SecretSubkey(k) =>
                Packet::PublicSubkey(k.take_secret().0),
            p => p,
        })
        .collect();
    let cert3 = Cert::try_from(public).unwrap();
    assert_eq!(cert3.fingerprint(), fpr);
}

#[test]
fn seip_tampered_mdc_yields_no_plaintext() {
    // An SEIPD whose MDC has been tampered with must not yield any
    // plaintext to the caller.
    let config = Config::default();
    let mut sink = Vec::new();

    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["integrity".into()]).build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"do not tamper").unwrap();
    message.finalize().unwrap();

    // Flip a bit towards the end of the SEIP ciphertext: this
    // corrupts the MDC trailer.
    let n = sink.len();
    let mut tampered = sink.clone();
    tampered[n - 2] ^= 0x04;

    let r = stream::Decryptor::from_bytes(
        &config, &tampered, Vec::new(), Vec::new(),
        vec!["integrity".into()], Vec::new());
    assert!(r.is_err());

    // The untampered message still decrypts.
    let mut d = stream::Decryptor::from_bytes(
        &config, &sink, Vec::new(), Vec::new(),
        vec!["integrity".into()], Vec::new()).unwrap();
    let mut plaintext = Vec::new();
    d.read_to_end(&mut plaintext).unwrap();
    assert_eq!(&plaintext, b"do not tamper");
}

#[test]
fn aead_roundtrip_with_differing_chunk_sizes() {
    // Encrypting with two different chunk size octets produces
    // different ciphertexts that both decrypt to the same plaintext.
    let config = Config::default().set_aead_protect(true);
    let c1 = config.clone().set_aead_chunk_size_byte(6).unwrap();
    let c2 = config.set_aead_chunk_size_byte(14).unwrap();

    let mut encrypt = |config: &Config| -> Vec<u8> {
        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let message = Encryptor::with_passwords(
            message, config, vec!["chunky".into()]).build().unwrap();
        let mut message = LiteralWriter::new(message).build().unwrap();
        message.write_all(b"Hello, World!\n").unwrap();
        message.finalize().unwrap();
        sink
    };

    let m1 = encrypt(&c1);
    let m2 = encrypt(&c2);
    assert!(m1 != m2);

    for (config, m) in [(&c1, &m1), (&c2, &m2)] {
        let mut d = stream::Decryptor::from_bytes(
            config, m, Vec::new(), Vec::new(),
            vec!["chunky".into()], Vec::new()).unwrap();
        let mut plaintext = Vec::new();
        d.read_to_end(&mut plaintext).unwrap();
        assert_eq!(&plaintext, b"Hello, World!\n");
    }
}

#[test]
fn pkesk_roundtrip_via_cert() {
    let config = Config::default();
    let (cert, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Ren <ren@example.org>")
        .generate().unwrap();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::for_recipients(
        message, &config, vec![&cert]).build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"for your eyes only").unwrap();
    message.finalize().unwrap();

    // Decrypt with the encryption subkey.
    let keypair = cert.keys().secret()
        .with_policy(&config, None)
        .for_transport_encryption()
        .next().expect("have an encryption key")
        .key().clone()
        .parts_into_secret().unwrap()
        .into_keypair().unwrap();

    let mut d = stream::Decryptor::from_bytes(
        &config, &sink, Vec::new(), vec![keypair], Vec::new(),
        Vec::new()).unwrap();
    let mut plaintext = Vec::new();
    d.read_to_end(&mut plaintext).unwrap();
    assert_eq!(&plaintext, b"for your eyes only");
}

#[test]
fn session_key_only_decryption() {
    // Given a known session key, the message decrypts without any
    // ESK packet being usable.
    let config = Config::default();
    let sk = SessionKey::new(32);

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Encryptor::with_passwords(
        message, &config, vec!["irrelevant".into()])
        .session_key(sk.clone())
        .build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(b"known session key").unwrap();
    message.finalize().unwrap();

    let mut d = stream::Decryptor::from_bytes(
        &config, &sink, Vec::new(), Vec::new(), Vec::new(),
        vec![(Some(SymmetricAlgorithm::AES256), sk)]).unwrap();
    let mut plaintext = Vec::new();
    d.read_to_end(&mut plaintext).unwrap();
    assert_eq!(&plaintext, b"known session key");
}

#[test]
fn one_pass_signed_message_structure() {
    // The serialized one-pass signed message has the right packet
    // structure: OPS, Literal, Signature.
    let config = Config::default();
    let (cert, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Sig <sig@example.org>")
        .generate().unwrap();
    let keypair = cert.keys().secret().for_signing()
        .with_policy(&config, None)
        .next().unwrap()
        .key().clone()
        .parts_into_secret().unwrap()
        .into_keypair().unwrap();

    let mut sink = Vec::new();
    let message = Message::new(&mut sink);
    let message = Signer::new(message, keypair).build().unwrap();
    let mut message = LiteralWriter::new(message).build().unwrap();
    message.write_all(&(0u8..=255).collect::<Vec<_>>()).unwrap();
    message.finalize().unwrap();

    let pile = PacketPile::from_bytes(&sink).unwrap();
    let tags: Vec<Tag> = pile.children().map(|p| p.tag()).collect();
    assert_eq!(&tags, &[Tag::OnePassSig, Tag::Literal, Tag::Signature]);

    // And it validates as a message.
    use std::convert::TryFrom;
    assert!(crate::Message::try_from(pile).is_ok());
}

#[test]
fn literal_roundtrips_bytewise() {
    let mut l = Literal::new(DataFormat::Binary);
    l.set_body((0u8..=255).collect());
    let p: Packet = l.into();
    let buf = p.to_vec().unwrap();

    let q = Packet::from_bytes(&buf).unwrap();
    let buf2 = q.to_vec().unwrap();
    assert_eq!(buf, buf2);
}

#[test]
fn secret_key_protection_roundtrip_via_serialization() {
    // Generate a key, encrypt its secrets with a passphrase,
    // serialize, parse, decrypt, and compare the serialization of
    // the decrypted key with the original.
    use crate::packet::key::SecretKeyMaterial;

    let (cert, _) = CertBuilder::new()
        .add_userid("Tsurezure <tsu@example.org>")
        .generate().unwrap();

    let original = cert.to_vec().unwrap();

    let packets: Vec<Packet> = cert.into_packets()
        .map(|p| match p {
            Packet::SecretKey(k) => Packet::SecretKey(
                k.encrypt_secret(&"hello world".into()).unwrap()),
            p => p,
        })
        .collect();
    let protected = Cert::try_from(packets).unwrap();
    let buf = protected.to_vec().unwrap();

    // Parse and decrypt the secret material again.
    let parsed = Cert::from_bytes(&buf).unwrap();
    let packets: Vec<Packet> = parsed.into_packets()
        .map(|p| match p {
            Packet::SecretKey(k) => {
                assert!(matches!(k.secret(),
                                 SecretKeyMaterial::Encrypted(_)));
                Packet::SecretKey(
                    k.decrypt_secret(&"hello world".into()).unwrap())
            }
            p => p,
        })
        .collect();
    let recovered = Cert::try_from(packets).unwrap();

    assert_eq!(recovered.to_vec().unwrap(), original);
}
