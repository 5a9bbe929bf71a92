//! End-to-end certificate scenarios.

use std::time::SystemTime;

use cutlass_openpgp as openpgp;

use openpgp::Packet;
use openpgp::cert::{Cert, CertBuilder};
use openpgp::cert::builder::CipherSuite;
use openpgp::packet::{SignatureBuilder, UserID};
use openpgp::packet::signature::subpacket::{Subpacket, SubpacketValue};
use openpgp::parse::Parse;
use openpgp::policy::Config;
use openpgp::serialize::MarshalInto;
use openpgp::types::{ReasonForRevocation, RevocationStatus, SignatureType};

/// Builds a certificate with one primary key, one encryption subkey,
/// one signing subkey (with back signature), and two user ids, then
/// revokes one user id.  Checks the selection functions.
#[test]
fn key_selection_with_revoked_userid() {
    let config = Config::default();
    let t = SystemTime::now();

    let (cert, _) = CertBuilder::new()
        .add_userid("Keeper <keeper@example.org>")
        .add_userid("Bygone <bygone@example.org>")
        .add_signing_subkey()
        .add_transport_encryption_subkey()
        .generate().unwrap();

    assert_eq!(cert.userids().count(), 2);
    assert_eq!(cert.subkeys().count(), 2);
    assert!(cert.bad_signatures().is_empty());

    // Revoke the second user id.
    let revoked_uid = UserID::from("Bygone <bygone@example.org>");
    let mut signer = cert.keys().secret().for_certification()
        .with_policy(&config, None)
        .next().expect("the primary key certifies")
        .key().clone()
        .parts_into_secret().unwrap()
        .into_keypair().unwrap();

    let primary = cert.primary_key().clone();
    let mut sb = SignatureBuilder::new(
        SignatureType::CertificationRevocation);
    sb.hashed_area_mut().add(Subpacket::new(
        SubpacketValue::ReasonForRevocation {
            code: ReasonForRevocation::UIDRetired,
            reason: b"moved on".to_vec(),
        }, false).unwrap()).unwrap();
    let revocation = sb.sign_userid_binding(
        &mut signer, &primary, &revoked_uid).unwrap();

    // Splice the revocation right after the revoked user id's
    // section.
    let mut packets: Vec<Packet> = cert.into_packets().collect();
    let uid_index = packets.iter()
        .position(|p| match p {
            Packet::UserID(u) => u == &revoked_uid,
            _ => false,
        })
        .expect("user id is present");
    let mut insert_at = uid_index + 1;
    while insert_at < packets.len()
        && matches!(packets[insert_at], Packet::Signature(_))
    {
        insert_at += 1;
    }
    packets.insert(insert_at, revocation.into());

    let cert = Cert::try_from(packets).unwrap();
    assert!(cert.bad_signatures().is_empty());

    // Exactly the non-revoked user id is listed as valid.
    let valid: Vec<String> = cert.valid_userids(t)
        .map(|u| u.component().to_string())
        .collect();
    assert_eq!(valid, vec!["Keeper <keeper@example.org>".to_string()]);

    // The revoked one reports its status.
    let bygone = cert.userids()
        .find(|u| u.component() == &revoked_uid)
        .unwrap();
    assert!(matches!(bygone.revocation_status(t),
                     RevocationStatus::Revoked(_)));

    // getSigningKey returns the signing subkey, getEncryptionKey the
    // encryption subkey, and they are distinct non-primary keys.
    let signing = cert.signing_key(&config, t, None).unwrap();
    assert!(!signing.primary());
    assert!(signing.key_flags().unwrap().for_signing());

    let encryption = cert.encryption_key(&config, t, None).unwrap();
    assert!(!encryption.primary());
    assert!(encryption.key_flags().unwrap().for_transport_encryption());

    assert!(signing.key().fingerprint() != encryption.key().fingerprint());
}

/// Without subkeys, the signing-capable primary key is selected as a
/// fallback.
#[test]
fn primary_key_fallback() {
    let config = Config::default();
    let t = SystemTime::now();

    let (cert, _) = CertBuilder::new()
        .add_userid("Solo <solo@example.org>")
        .generate().unwrap();

    let signing = cert.signing_key(&config, t, None).unwrap();
    assert!(signing.primary());

    // There is no encryption-capable key at all.
    assert!(cert.encryption_key(&config, t, None).is_err());
}

/// Merging two copies of a certificate unions their components.
#[test]
fn merge_is_a_union() {
    let (cert, _) = CertBuilder::new()
        .add_userid("Left <left@example.org>")
        .add_transport_encryption_subkey()
        .generate().unwrap();

    // Split the certificate into two overlapping halves: one without
    // the subkey, one with.
    let packets: Vec<Packet> = cert.clone().into_packets().collect();
    let without_subkey: Vec<Packet> = packets.iter()
        .take_while(|p| !matches!(p, Packet::SecretSubkey(_)))
        .cloned()
        .collect();

    let half = Cert::try_from(without_subkey).unwrap();
    assert_eq!(half.subkeys().count(), 0);

    let merged = half.merge(cert.clone()).unwrap();
    assert_eq!(merged.subkeys().count(), 1);
    assert_eq!(merged.fingerprint(), cert.fingerprint());

    // Merging is idempotent.
    let again = merged.clone().merge(cert.clone()).unwrap();
    assert_eq!(again.userids().count(), merged.userids().count());
    assert_eq!(again.subkeys().count(), merged.subkeys().count());

    // Different certificates cannot be merged.
    let (other, _) = CertBuilder::new()
        .add_userid("Right <right@example.org>")
        .generate().unwrap();
    assert!(cert.merge(other).is_err());
}

/// A certificate round-trips through its serialized form with the
/// same fingerprint and the same set of valid bindings.
#[test]
fn serialization_preserves_bindings() {
    let (cert, _) = CertBuilder::general_purpose(
        CipherSuite::Cv25519, "Ferry <ferry@example.org>")
        .generate().unwrap();

    let buf = cert.to_vec().unwrap();
    let cert2 = Cert::from_bytes(&buf).unwrap();

    assert_eq!(cert.fingerprint(), cert2.fingerprint());
    assert!(cert2.bad_signatures().is_empty());
    assert_eq!(cert.userids().count(), cert2.userids().count());
    assert_eq!(cert.subkeys().count(), cert2.subkeys().count());

    let t = SystemTime::now();
    for (a, b) in cert.subkeys().zip(cert2.subkeys()) {
        assert_eq!(a.component().fingerprint(),
                   b.component().fingerprint());
        assert_eq!(a.binding_signature(t).is_some(),
                   b.binding_signature(t).is_some());
    }
}

/// The back signature of a signing subkey is required: removing it
/// invalidates the binding.
#[test]
fn signing_subkey_requires_backsig() {
    use openpgp::packet::signature::subpacket::SubpacketTag;

    let config = Config::default();
    let t = SystemTime::now();

    let (cert, _) = CertBuilder::new()
        .add_userid("Backsig <backsig@example.org>")
        .add_signing_subkey()
        .generate().unwrap();

    // Sanity: the signing subkey is usable.
    assert!(!cert.signing_key(&config, t, None).unwrap().primary());

    // Strip the embedded signature from the subkey binding.  The
    // binding signature is now cryptographically broken (the hashed
    // area changed), so the subkey loses its binding entirely.
    let packets: Vec<Packet> = cert.into_packets()
        .filter(|p| match p {
            Packet::Signature(sig) =>
                sig.typ() != SignatureType::SubkeyBinding
                || sig.hashed_area()
                    .subpacket(SubpacketTag::EmbeddedSignature)
                    .is_none(),
            _ => true,
        })
        .collect();

    let cert = Cert::try_from(packets).unwrap();
    // The subkey has no valid binding, so the primary key is the
    // only signing-capable key left.
    assert!(cert.signing_key(&config, t, None).unwrap().primary());
}
