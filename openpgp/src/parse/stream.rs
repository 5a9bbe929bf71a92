//! Streaming decryption and verification.
//!
//! This module handles OpenPGP messages as they flow by: encrypted
//! session key packets are collected and tried against the available
//! secret keys and passwords, one-pass signature packets register
//! running hash contexts before the literal data streams through, and
//! the trailing signature packets are checked once the payload has
//! been fully consumed.
//!
//! Plaintext protected by the SEIP packet's MDC is buffered and
//! validated before any of it is surfaced; AEAD-protected plaintext
//! is surfaced chunk by chunk, each chunk only after its tag has been
//! validated.

use std::io::{self, Read};

use crate::{
    Error,
    KeyHandle,
    KeyID,
    Packet,
    Result,
    cert::Cert,
    crypto::{KeyPair, Password, SessionKey},
    crypto::hash,
    packet::prelude::*,
    packet::key,
    packet::Key,
    parse::{
        PacketParser,
        PacketParserResult,
        Parse,
    },
    policy::Config,
    types::{
        SignatureType,
        SymmetricAlgorithm,
    },
};

/// The result of a signature verification.
#[derive(Debug)]
pub struct VerificationResult {
    /// The signature.
    pub sig: Signature,
    /// The signature's issuer.
    pub keyid: KeyID,
    /// The verification result.
    ///
    /// `Ok` if the signature is good and made by a key of one of the
    /// given certificates; an error describing the failure otherwise.
    pub result: Result<()>,
}

impl VerificationResult {
    /// Returns whether the signature verified successfully.
    pub fn good(&self) -> bool {
        self.result.is_ok()
    }
}

/// A pending verification: the hash context that the payload feeds,
/// and the mode it is hashed in.
struct PendingVerification {
    hash: hash::Context,
    /// Text-mode signatures canonicalize line endings.
    text: bool,
    /// Canonicalization state: the last processed byte was a CR.
    pending_cr: bool,
    /// The issuer announced by the one-pass signature packet, if any.
    issuer: Option<KeyID>,
}

impl PendingVerification {
    fn update(&mut self, buf: &[u8]) {
        if self.text {
            let mut start = 0;
            for (i, &b) in buf.iter().enumerate() {
                if b == b'\n' && !self.pending_cr {
                    self.hash.update(&buf[start..i]);
                    self.hash.update(b"\r\n");
                    start = i + 1;
                }
                self.pending_cr = b == b'\r';
            }
            self.hash.update(&buf[start..]);
        } else {
            self.hash.update(buf);
        }
    }
}

/// Decrypts and verifies an OpenPGP message.
///
/// To verify a plain signed message, use [`Decryptor::verifier`]: the
/// decryption layers are simply absent, and only the signature
/// machinery engages.
///
///   [`Decryptor::verifier`]: #method.verifier
///
/// The `Decryptor` implements `io::Read`; the message's payload is
/// pulled through it.  After the payload has been fully read, the
/// per-signature results are available from
/// [`Decryptor::verifications`].
///
///   [`Decryptor::verifications`]: #method.verifications
pub struct Decryptor<'a> {
    config: Config,
    certs: Vec<Cert>,

    /// The parser, positioned at the literal data packet.  `None`
    /// once the payload has been consumed (or if the plaintext was
    /// buffered eagerly).
    ppr: Option<PacketParser<'a>>,

    /// Eagerly buffered plaintext (SEIP), and the read cursor.
    buffered: Option<Vec<u8>>,
    cursor: usize,

    /// The literal data packet's metadata.
    literal: Option<Literal>,

    /// Hash contexts fed by the payload, in one-pass signature order
    /// (outermost first).
    pending: Vec<PendingVerification>,

    /// The results, available after the payload has been consumed.
    results: Vec<VerificationResult>,

    /// Set once the trailing packets have been processed.
    done: bool,
}

impl<'a> Decryptor<'a> {
    /// Starts decrypting an OpenPGP message.
    ///
    /// `certs` are used to verify any signatures; `keypairs` and
    /// `passwords` are tried against the message's PKESK and SKESK
    /// packets; `session_keys` are tried directly.
    pub fn from_bytes<D>(config: &Config, data: &'a D,
                         certs: Vec<Cert>,
                         keypairs: Vec<KeyPair>,
                         passwords: Vec<Password>,
                         session_keys: Vec<(Option<SymmetricAlgorithm>,
                                            SessionKey)>)
                         -> Result<Decryptor<'a>>
        where D: AsRef<[u8]> + ?Sized + Send + Sync,
    {
        let ppr = PacketParser::from_bytes(data)?;
        Self::from_packet_parser(config, ppr, certs, keypairs, passwords,
                                 session_keys)
    }

    /// Starts verifying a signed, unencrypted OpenPGP message.
    pub fn verifier<D>(config: &Config, data: &'a D, certs: Vec<Cert>)
                       -> Result<Decryptor<'a>>
        where D: AsRef<[u8]> + ?Sized + Send + Sync,
    {
        Self::from_bytes(config, data, certs, Vec::new(), Vec::new(),
                         Vec::new())
    }

    fn from_packet_parser(config: &Config, ppr: PacketParserResult<'a>,
                          certs: Vec<Cert>,
                          keypairs: Vec<KeyPair>,
                          passwords: Vec<Password>,
                          session_keys: Vec<(Option<SymmetricAlgorithm>,
                                             SessionKey)>)
                          -> Result<Decryptor<'a>> {
        let mut decryptor = Decryptor {
            config: config.clone(),
            certs,
            ppr: None,
            buffered: None,
            cursor: 0,
            literal: None,
            pending: Vec::new(),
            results: Vec::new(),
            done: false,
        };

        let mut keypairs = keypairs;
        let mut pkesks: Vec<PKESK3> = Vec::new();
        let mut skesks: Vec<SKESK> = Vec::new();
        let mut session_keys = session_keys;
        let mut in_seip = false;

        let mut ppr = ppr;
        loop {
            let mut pp = match ppr {
                PacketParserResult::Some(pp) => pp,
                PacketParserResult::EOF(_) =>
                    return Err(Error::MalformedMessage(
                        "Premature EOF: no literal data packet".into())
                               .into()),
            };

            match &pp.packet {
                Packet::PKESK(PKESK::V3(p)) => {
                    pkesks.push(p.clone());
                    ppr = pp.recurse()?.1;
                }

                Packet::SKESK(s) => {
                    skesks.push(s.clone());
                    ppr = pp.recurse()?.1;
                }

                Packet::SED(_) | Packet::SEIP(_) | Packet::AED(_) => {
                    match &pp.packet {
                        Packet::SED(_) => {
                            if !decryptor.config
                                .allow_unauthenticated_messages()
                            {
                                return Err(Error::PolicyViolation(
                                    "Message is not integrity protected"
                                        .into(), None).into());
                            }
                        }
                        Packet::AED(aed) => {
                            decryptor.config.check_aead(aed.aead())?;
                        }
                        Packet::SEIP(_) => in_seip = true,
                        _ => unreachable!(),
                    }

                    decryptor.decrypt_container(
                        &mut pp, &pkesks, &skesks, &mut keypairs,
                        &passwords, &mut session_keys)?;
                    ppr = pp.recurse()?.1;
                }

                Packet::CompressedData(_) => {
                    ppr = pp.recurse()?.1;
                }

                Packet::OnePassSig(OnePassSig::V3(ops)) => {
                    decryptor.config.check_hash(ops.hash_algo(), true)?;
                    decryptor.pending.push(PendingVerification {
                        hash: ops.hash_algo().context()?,
                        text: ops.typ() == SignatureType::Text,
                        pending_cr: false,
                        issuer: Some(ops.issuer().clone()),
                    });
                    ppr = pp.recurse()?.1;
                }

                Packet::Signature(sig) => {
                    // A prefix signature (Signature, Message).  Hash
                    // the upcoming payload for it.
                    decryptor.config.check_hash(sig.hash_algo(), true)?;
                    decryptor.pending.push(PendingVerification {
                        hash: sig.hash_algo().context()?,
                        text: sig.typ() == SignatureType::Text,
                        pending_cr: false,
                        issuer: sig.issuers().next().cloned(),
                    });
                    // Keep the signature to check later.
                    decryptor.results.push(VerificationResult {
                        keyid: sig.issuers().next().cloned()
                            .unwrap_or_else(|| KeyID::wildcard()),
                        sig: sig.clone(),
                        result: Err(Error::BadSignature(
                            "not yet checked".into()).into()),
                    });
                    ppr = pp.recurse()?.1;
                }

                Packet::Marker(_) => {
                    ppr = pp.recurse()?.1;
                }

                Packet::Literal(l) => {
                    decryptor.literal = Some(l.clone());

                    if in_seip {
                        // Buffer the whole payload so that the MDC is
                        // validated before any plaintext is handed
                        // out.
                        let mut plaintext = Vec::new();
                        pp.read_to_end(&mut plaintext)?;
                        decryptor.feed(&plaintext);
                        decryptor.buffered = Some(plaintext);
                        decryptor.finish(pp)?;
                    } else {
                        decryptor.ppr = Some(pp);
                    }

                    return Ok(decryptor);
                }

                p => return Err(Error::MalformedMessage(
                    format!("Unexpected packet in message: {}", p.tag()))
                                .into()),
            }
        }
    }

    /// Collects candidate session keys and decrypts the encrypted
    /// container.
    fn decrypt_container(&self, pp: &mut PacketParser,
                         pkesks: &[PKESK3], skesks: &[SKESK],
                         keypairs: &mut [KeyPair],
                         passwords: &[Password],
                         session_keys: &mut Vec<(
                             Option<SymmetricAlgorithm>, SessionKey)>)
                         -> Result<()> {
        let config = &self.config;

        let mut candidates: Vec<(Option<SymmetricAlgorithm>, SessionKey)> =
            std::mem::take(session_keys);

        for pkesk in pkesks {
            for keypair in keypairs.iter_mut() {
                let keyid = KeyHandle::from(keypair.public().keyid());
                if !(pkesk.recipient().is_wildcard()
                     || KeyHandle::from(pkesk.recipient()).aliases(&keyid))
                {
                    continue;
                }

                if let Some((algo, sk)) = pkesk.decrypt(keypair, None) {
                    candidates.push((Some(algo), sk));
                } else if config.constant_time_pkcs1_decryption() {
                    // Do not leak the reason for the failure: proceed
                    // with random session keys; decryption will fail
                    // in constant time downstream.
                    for algo in config
                        .constant_time_pkcs1_decryption_supported_symmetric_algorithms()
                    {
                        candidates.push((
                            Some(*algo),
                            SessionKey::new(algo.key_size()?)));
                    }
                }
            }
        }

        for skesk in skesks {
            for password in passwords {
                let r = match skesk {
                    SKESK::V4(s) => s.decrypt(password),
                    SKESK::V5(s) => s.decrypt(password),
                };
                if let Ok((algo, sk)) = r {
                    let algo = match algo {
                        SymmetricAlgorithm::Unencrypted => None,
                        a => Some(a),
                    };
                    candidates.push((algo, sk));
                }
            }
        }

        if candidates.is_empty() {
            return Err(Error::MissingSessionKey(
                "no session key candidate; \
                 wrong password or no matching secret key".into()).into());
        }

        // The symmetric algorithm comes from the ESK, or, for the
        // AED packet, from the packet itself.
        let packet_algo = match &pp.packet {
            Packet::AED(aed) => Some(aed.symmetric_algo()),
            _ => None,
        };

        let mut last_error = None;
        for (algo, sk) in candidates {
            let algo = match packet_algo.or(algo) {
                Some(a) => a,
                None => continue,
            };
            if config.check_symmetric(algo).is_err() {
                continue;
            }

            match pp.decrypt(algo, &sk) {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(
            || Error::MissingSessionKey(
                "no usable session key".into()).into()))
    }

    /// Feeds payload bytes to the pending verifications.
    fn feed(&mut self, buf: &[u8]) {
        for p in &mut self.pending {
            p.update(buf);
        }
    }

    /// Processes the packets after the literal data packet and checks
    /// the signatures.
    fn finish(&mut self, pp: PacketParser<'a>) -> Result<()> {
        self.done = true;

        let mut trailing: Vec<Signature> = Vec::new();
        let mut ppr = pp.next()?.1;
        while let PacketParserResult::Some(pp) = ppr {
            match &pp.packet {
                Packet::Signature(sig) => trailing.push(sig.clone()),
                Packet::MDC(_) | Packet::Marker(_) => (),
                p => return Err(Error::MalformedMessage(
                    format!("Unexpected trailing packet: {}", p.tag()))
                                .into()),
            }
            ppr = pp.next()?.1;
        }

        // Prefix signatures were registered in order; their pending
        // contexts are the first `self.results.len()` ones.
        let prefix_sigs = self.results.len();
        for i in 0..prefix_sigs {
            let sig = self.results[i].sig.clone();
            let hash = self.pending[i].hash.clone();
            let result = self.check_signature(sig, hash);
            self.results[i] = result;
        }

        // The i-th one-pass signature corresponds to the i-th
        // signature from the end.
        let ops_contexts = self.pending.len() - prefix_sigs;
        if trailing.len() != ops_contexts {
            return Err(Error::MalformedMessage(
                format!("{} one-pass signature packets, \
                         but {} trailing signatures",
                        ops_contexts, trailing.len())).into());
        }

        for (j, sig) in trailing.into_iter().enumerate() {
            let pending_index =
                prefix_sigs + (ops_contexts - 1 - j);
            let hash = self.pending[pending_index].hash.clone();
            let result = self.check_signature(sig, hash);
            self.results.push(result);
        }

        Ok(())
    }

    /// Checks one signature against the given hash context.
    fn check_signature(&self, sig: Signature, hash: hash::Context)
                       -> VerificationResult {
        let keyid = sig.issuers().next().cloned()
            .unwrap_or_else(KeyID::wildcard);

        if let Err(e) = self.config.check_signature(&sig, true) {
            return VerificationResult {
                keyid,
                sig,
                result: Err(e),
            };
        }

        // Find the issuing key among the given certificates.
        let mut issuer: Option<&Key<key::PublicParts,
                                    key::UnspecifiedRole>> = None;
        'search: for cert in &self.certs {
            for ka in cert.keys() {
                let h = KeyHandle::from(ka.key().fingerprint());
                if sig.issuers().any(
                    |i| h.aliases(&KeyHandle::from(i.clone())))
                    || sig.issuer_fingerprints().any(
                        |f| h.aliases(&KeyHandle::from(f.clone())))
                {
                    issuer = Some(ka.key());
                    break 'search;
                }
            }
        }

        let issuer = match issuer {
            Some(k) => k,
            None => return VerificationResult {
                keyid,
                sig,
                result: Err(Error::InvalidKey(
                    "no certificate for issuer".into()).into()),
            },
        };

        let mut sig = sig;
        let result = sig.verify_hash(issuer, hash);
        VerificationResult {
            keyid,
            sig,
            result,
        }
    }

    /// Returns the literal data packet's metadata.
    pub fn literal(&self) -> Option<&Literal> {
        self.literal.as_ref()
    }

    /// Returns the verification results.
    ///
    /// The results are only available after the payload has been
    /// fully consumed; this function returns an error before that.
    /// There is one result per signature, prefix signatures first,
    /// then the one-pass signatures in the order of their trailing
    /// signature packets.
    pub fn verifications(&self) -> Result<&[VerificationResult]> {
        if self.done {
            Ok(&self.results)
        } else {
            Err(Error::InvalidOperation(
                "the payload has not been fully consumed yet".into())
                .into())
        }
    }
}

impl<'a> io::Read for Decryptor<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // Serve eagerly buffered plaintext, if any.
        if let Some(b) = &self.buffered {
            let n = std::cmp::min(buf.len(), b.len() - self.cursor);
            buf[..n].copy_from_slice(&b[self.cursor..self.cursor + n]);
            self.cursor += n;
            return Ok(n);
        }

        let pp = match &mut self.ppr {
            Some(pp) => pp,
            None => return Ok(0),
        };

        let n = pp.read(buf)?;
        if n > 0 {
            let data = &buf[..n];
            for p in &mut self.pending {
                p.update(data);
            }
            return Ok(n);
        }

        // The payload is exhausted: process the trailing packets.
        let pp = self.ppr.take().expect("checked above");
        self.finish(pp)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use crate::cert::CertBuilder;
    use crate::cert::builder::CipherSuite;
    use crate::serialize::stream::{
        Encryptor, LiteralWriter, Message, Signer,
    };

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn password_encrypt_decrypt() {
        let config = config();
        let mut sink = Vec::new();

        let message = Message::new(&mut sink);
        let message = Encryptor::with_passwords(
            message, &config, vec!["sesame".into()]).build().unwrap();
        let mut message = LiteralWriter::new(message).build().unwrap();
        message.write_all(b"streaming secrets").unwrap();
        message.finalize().unwrap();

        let mut d = Decryptor::from_bytes(
            &config, &sink, Vec::new(), Vec::new(),
            vec!["sesame".into()], Vec::new()).unwrap();
        let mut plaintext = Vec::new();
        d.read_to_end(&mut plaintext).unwrap();
        assert_eq!(&plaintext, b"streaming secrets");

        // The wrong password fails.
        assert!(Decryptor::from_bytes(
            &config, &sink, Vec::new(), Vec::new(),
            vec!["sesame?".into()], Vec::new()).is_err());
    }

    #[test]
    fn sign_and_verify() {
        let config = config();
        let (cert, _) = CertBuilder::general_purpose(
            CipherSuite::Cv25519, "Jan <jan@example.org>")
            .generate().unwrap();

        let signer = cert.keys().secret().for_signing()
            .with_policy(&config, None)
            .next().expect("have a signing key")
            .key().clone()
            .parts_into_secret().unwrap()
            .into_keypair().unwrap();

        let mut sink = Vec::new();
        let message = Message::new(&mut sink);
        let message = Signer::new(message, signer).build().unwrap();
        let mut message = LiteralWriter::new(message).build().unwrap();
        message.write_all(b"important business").unwrap();
        message.finalize().unwrap();

        let mut v = Decryptor::verifier(&config, &sink,
                                        vec![cert.clone()]).unwrap();
        let mut content = Vec::new();
        v.read_to_end(&mut content).unwrap();
        assert_eq!(&content, b"important business");

        let results = v.verifications().unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].good());

        // A bit flip in the content breaks the signature.
        let mut tampered = sink.clone();
        let idx = tampered.len() - 70;
        tampered[idx] ^= 1;
        if let Ok(mut v) = Decryptor::verifier(&config, &tampered,
                                               vec![cert]) {
            let mut content = Vec::new();
            if v.read_to_end(&mut content).is_ok() {
                let results = v.verifications().unwrap();
                assert!(!results[0].good());
            }
        }
    }
}
