//! Certificates and transferable keys.
//!
//! A certificate (or "transferable key") is the combination of a
//! primary key, any number of user IDs and user attributes with their
//! certification signatures, and any number of subkeys with their
//! binding signatures ([Section 11.1 of RFC 4880]).  This module
//! turns a packet sequence into a [`Cert`], validating every binding
//! cryptographically in the process, and exposes the queries needed
//! to select keys for signing and encryption.
//!
//!   [Section 11.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-11.1
//!   [`Cert`]: struct.Cert.html

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::io;
use std::time::SystemTime;

use crate::{
    Error,
    Fingerprint,
    KeyHandle,
    KeyID,
    Packet,
    PacketPile,
    Result,
    packet::{Signature, Tag, UserAttribute, UserID},
    packet::key,
    packet::Key,
    parse::Parse,
    policy::Config,
    serialize::{Marshal, MarshalInto},
    types::{
        KeyFlags,
        RevocationStatus,
        RevocationType,
        SignatureType,
    },
};

mod builder;
pub use builder::CertBuilder;

/// A collection of components and their associated signatures.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentBundle<C> {
    component: C,

    /// Self signatures.
    self_signatures: Vec<Signature>,

    /// Third-party certifications.  (Not verified.)
    certifications: Vec<Signature>,

    /// Self revocations.
    self_revocations: Vec<Signature>,

    /// Third-party revocations (e.g., designated revokers).  (Not
    /// verified.)
    other_revocations: Vec<Signature>,
}

/// A user ID and any associated signatures.
pub type UserIDBundle = ComponentBundle<UserID>;

/// A user attribute and any associated signatures.
pub type UserAttributeBundle = ComponentBundle<UserAttribute>;

/// A subkey and any associated signatures.
pub type SubkeyBundle =
    ComponentBundle<Key<key::PublicParts, key::SubordinateRole>>;

impl<C> ComponentBundle<C> {
    fn new(component: C) -> Self {
        ComponentBundle {
            component,
            self_signatures: Vec::new(),
            certifications: Vec::new(),
            self_revocations: Vec::new(),
            other_revocations: Vec::new(),
        }
    }

    /// Returns a reference to the component.
    pub fn component(&self) -> &C {
        &self.component
    }

    /// The component's self-signatures, newest first.
    pub fn self_signatures(&self) -> &[Signature] {
        &self.self_signatures
    }

    /// The component's third-party certifications.
    pub fn certifications(&self) -> &[Signature] {
        &self.certifications
    }

    /// The component's revocations issued by the certificate holder.
    pub fn self_revocations(&self) -> &[Signature] {
        &self.self_revocations
    }

    /// The component's revocations issued by other parties.
    pub fn other_revocations(&self) -> &[Signature] {
        &self.other_revocations
    }

    /// Returns the active binding signature at time `t`.
    ///
    /// The active binding signature is the newest self-signature that
    /// was created before `t` and is not expired at `t`.
    pub fn binding_signature(&self, t: SystemTime) -> Option<&Signature> {
        self.self_signatures.iter()
            .filter(|s| {
                s.signature_alive(
                    t, std::time::Duration::new(0, 0)).is_ok()
            })
            .max_by(|a, b| {
                cmp_creation(a, b)
            })
    }

    /// Returns the component's revocation status at time `t`.
    pub fn revocation_status(&self, t: SystemTime) -> RevocationStatus {
        revocation_status(&self.self_revocations,
                          &self.other_revocations, t)
    }

    fn sort_and_dedup(&mut self) {
        sig_sort_and_dedup(&mut self.self_signatures);
        sig_sort_and_dedup(&mut self.certifications);
        sig_sort_and_dedup(&mut self.self_revocations);
        sig_sort_and_dedup(&mut self.other_revocations);
    }
}

fn cmp_creation(a: &Signature, b: &Signature) -> Ordering {
    a.signature_creation_time().cmp(&b.signature_creation_time())
}

fn sig_sort_and_dedup(sigs: &mut Vec<Signature>) {
    sigs.sort_by(|a, b| cmp_creation(b, a));
    sigs.dedup_by(|a, b| a.normalized_eq(b));
}

/// Computes a component's revocation status from its revocation
/// certificates.
fn revocation_status<'a>(self_revocations: &'a [Signature],
                         other_revocations: &'a [Signature],
                         t: SystemTime)
                         -> RevocationStatus<'a> {
    let mut revs = Vec::new();
    for rev in self_revocations {
        let effective = match rev.reason_for_revocation() {
            Some((code, _)) =>
                code.revocation_type() == RevocationType::Hard
                || rev.signature_alive(
                    t, std::time::Duration::new(0, 0)).is_ok(),
            // Without a reason, play it safe.
            None => true,
        };
        if effective {
            revs.push(rev);
        }
    }

    if !revs.is_empty() {
        RevocationStatus::Revoked(revs)
    } else if !other_revocations.is_empty() {
        RevocationStatus::CouldBe(other_revocations.iter().collect())
    } else {
        RevocationStatus::NotAsFarAsWeKnow
    }
}

/// A transferable public key (a certificate).
///
/// A certificate is the combination of a primary key, any number of
/// user IDs and user attributes with certification signatures, and
/// any number of subkeys with binding signatures.  All self
/// signatures are verified when a `Cert` is created from a packet
/// sequence; a component without a valid binding is kept, but is
/// never returned by the key selection functions.
#[derive(Debug, Clone, PartialEq)]
pub struct Cert {
    primary: Key<key::PublicParts, key::PrimaryRole>,

    /// Direct key signatures.
    primary_self_signatures: Vec<Signature>,
    /// Primary key revocations.
    primary_self_revocations: Vec<Signature>,
    /// Third-party direct signatures and revocations.  (Not
    /// verified.)
    primary_other_revocations: Vec<Signature>,

    userids: Vec<UserIDBundle>,
    user_attributes: Vec<UserAttributeBundle>,
    subkeys: Vec<SubkeyBundle>,

    /// Packets we could not make sense of: unknown packets, and
    /// signatures that did not verify or did not apply to any
    /// component.
    bad: Vec<Packet>,
}
assert_send_and_sync!(Cert);

impl fmt::Display for Cert {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

impl<'a> Parse<'a, Cert> for Cert {
    fn from_reader<R: 'a + io::Read + Send + Sync>(reader: R)
                                                   -> Result<Cert> {
        Self::try_from(PacketPile::from_reader(reader)?)
    }

    fn from_bytes<D: AsRef<[u8]> + ?Sized + Send + Sync>(data: &'a D)
                                                         -> Result<Cert> {
        Self::try_from(PacketPile::from_bytes(data)?)
    }
}

impl TryFrom<PacketPile> for Cert {
    type Error = anyhow::Error;

    fn try_from(pile: PacketPile) -> Result<Self> {
        Self::from_packets(pile.into_children())
    }
}

impl TryFrom<Vec<Packet>> for Cert {
    type Error = anyhow::Error;

    fn try_from(packets: Vec<Packet>) -> Result<Self> {
        Self::from_packets(packets.into_iter())
    }
}

/// The component a signature was seen next to.
enum Position {
    Primary,
    UserID(usize),
    UserAttribute(usize),
    Subkey(usize),
}

impl Cert {
    /// Builds a `Cert` from a packet sequence, validating the
    /// bindings.
    pub fn from_packets(packets: impl Iterator<Item = Packet>)
                        -> Result<Self> {
        let mut packets = packets.peekable();

        // The first packet must be the primary key.
        let primary: Key<key::PublicParts, key::PrimaryRole> =
            match packets.next() {
                Some(Packet::PublicKey(k)) => k,
                Some(Packet::SecretKey(k)) => k.parts_into_public(),
                Some(Packet::Unknown(u))
                    if u.tag() == Tag::PublicKey
                    || u.tag() == Tag::SecretKey =>
                    return Err(Error::UnsupportedCert(
                        format!("Unsupported primary key: {}",
                                u.error())).into()),
                Some(p) => return Err(Error::MalformedCert(
                    format!("A certificate does not start with a {}",
                            p.tag())).into()),
                None => return Err(Error::MalformedCert(
                    "Empty packet sequence".into()).into()),
            };

        let mut cert = Cert {
            primary,
            primary_self_signatures: Vec::new(),
            primary_self_revocations: Vec::new(),
            primary_other_revocations: Vec::new(),
            userids: Vec::new(),
            user_attributes: Vec::new(),
            subkeys: Vec::new(),
            bad: Vec::new(),
        };

        let mut position = Position::Primary;

        for p in packets {
            match p {
                Packet::UserID(u) => {
                    position = Position::UserID(
                        insert_component(&mut cert.userids, u));
                }
                Packet::UserAttribute(u) => {
                    position = Position::UserAttribute(
                        insert_component(&mut cert.user_attributes, u));
                }
                Packet::PublicSubkey(k) => {
                    position = Position::Subkey(
                        insert_component(&mut cert.subkeys, k));
                }
                Packet::SecretSubkey(k) => {
                    position = Position::Subkey(
                        insert_component(&mut cert.subkeys,
                                         k.parts_into_public()));
                }
                Packet::Signature(sig) => {
                    cert.insert_signature(&position, sig);
                }
                Packet::Trust(_) | Packet::Marker(_) => {
                    // Trust packets are never exported and are
                    // ignored on import; markers are always ignored.
                }
                p @ Packet::Unknown(_) => {
                    cert.bad.push(p);
                }
                p => return Err(Error::MalformedCert(
                    format!("A certificate cannot contain a {}",
                            p.tag())).into()),
            }
        }

        cert.canonicalize();
        Ok(cert)
    }

    /// Files the signature with the component it applies to,
    /// verifying it if it claims to be a self signature.
    fn insert_signature(&mut self, position: &Position, sig: Signature) {
        let mut sig = sig;
        let selfsig = self.issued_by_primary(&sig);
        let primary = self.primary.clone();

        let verified: Option<bool> = match (position, sig.typ()) {
            (Position::Primary, SignatureType::DirectKey) if selfsig =>
                Some(sig.verify_direct_key(&primary, &primary).is_ok()),
            (Position::Primary, SignatureType::KeyRevocation)
                if selfsig =>
                Some(sig.verify_primary_key_revocation(
                    &primary, &primary).is_ok()),

            (Position::UserID(i), t)
                if t.is_certification() && selfsig =>
            {
                let uid = self.userids[*i].component.clone();
                Some(sig.verify_userid_binding(
                    &primary, &primary, &uid).is_ok())
            }
            (Position::UserID(_), t) if t.is_certification() =>
                // A third-party certification; we cannot verify it
                // without the other certificate.
                None,
            (Position::UserID(i), SignatureType::CertificationRevocation)
                if selfsig =>
            {
                let uid = self.userids[*i].component.clone();
                Some(sig.verify_userid_binding(
                    &primary, &primary, &uid).is_ok())
            }

            (Position::UserAttribute(i), t)
                if t.is_certification() && selfsig =>
            {
                let ua = self.user_attributes[*i].component.clone();
                Some(sig.verify_user_attribute_binding(
                    &primary, &primary, &ua).is_ok())
            }
            (Position::UserAttribute(_), t) if t.is_certification() =>
                None,
            (Position::UserAttribute(i),
             SignatureType::CertificationRevocation) if selfsig =>
            {
                let ua = self.user_attributes[*i].component.clone();
                Some(sig.verify_user_attribute_binding(
                    &primary, &primary, &ua).is_ok())
            }

            (Position::Subkey(i), SignatureType::SubkeyBinding)
                if selfsig =>
            {
                let subkey = self.subkeys[*i].component.clone();
                Some(sig.verify_subkey_binding(
                    &primary, &primary, &subkey).is_ok())
            }
            (Position::Subkey(i), SignatureType::SubkeyRevocation)
                if selfsig =>
            {
                let subkey = self.subkeys[*i].component.clone();
                Some(sig.verify_subkey_revocation(
                    &primary, &primary, &subkey).is_ok())
            }

            _ => None,
        };

        match (position, sig.typ(), verified) {
            // Verified self signatures.
            (Position::Primary, SignatureType::DirectKey, Some(true)) =>
                self.primary_self_signatures.push(sig),
            (Position::Primary, SignatureType::KeyRevocation,
             Some(true)) =>
                self.primary_self_revocations.push(sig),
            (Position::UserID(i), t, Some(true))
                if t.is_certification() =>
                self.userids[*i].self_signatures.push(sig),
            (Position::UserID(i), SignatureType::CertificationRevocation,
             Some(true)) =>
                self.userids[*i].self_revocations.push(sig),
            (Position::UserAttribute(i), t, Some(true))
                if t.is_certification() =>
                self.user_attributes[*i].self_signatures.push(sig),
            (Position::UserAttribute(i),
             SignatureType::CertificationRevocation, Some(true)) =>
                self.user_attributes[*i].self_revocations.push(sig),
            (Position::Subkey(i), SignatureType::SubkeyBinding,
             Some(true)) =>
                self.subkeys[*i].self_signatures.push(sig),
            (Position::Subkey(i), SignatureType::SubkeyRevocation,
             Some(true)) =>
                self.subkeys[*i].self_revocations.push(sig),

            // Unverifiable third-party signatures.
            (Position::UserID(i), t, None) if t.is_certification() =>
                self.userids[*i].certifications.push(sig),
            (Position::UserAttribute(i), t, None)
                if t.is_certification() =>
                self.user_attributes[*i].certifications.push(sig),
            (Position::UserID(i), SignatureType::CertificationRevocation,
             None) =>
                self.userids[*i].other_revocations.push(sig),
            (Position::UserAttribute(i),
             SignatureType::CertificationRevocation, None) =>
                self.user_attributes[*i].other_revocations.push(sig),
            (Position::Primary, SignatureType::KeyRevocation, None) =>
                self.primary_other_revocations.push(sig),
            (Position::Subkey(i), SignatureType::SubkeyRevocation, None) =>
                self.subkeys[*i].other_revocations.push(sig),

            // Everything else is noise: a self signature that did not
            // verify, or a signature type that does not fit its
            // position.
            _ => self.bad.push(sig.into()),
        }
    }

    /// Returns whether the signature claims to be issued by the
    /// primary key.
    fn issued_by_primary(&self, sig: &Signature) -> bool {
        let keyid = self.primary.keyid();
        let fpr = self.primary.fingerprint();

        let mut has_issuer_info = false;
        for i in sig.issuers() {
            has_issuer_info = true;
            if *i == keyid {
                return true;
            }
        }
        for f in sig.issuer_fingerprints() {
            has_issuer_info = true;
            if *f == fpr {
                return true;
            }
        }

        // No issuer information: optimistically try to verify as a
        // self signature.
        !has_issuer_info
    }

    fn canonicalize(&mut self) {
        self.primary_self_signatures.sort_by(|a, b| cmp_creation(b, a));
        self.primary_self_signatures.dedup_by(|a, b| a.normalized_eq(b));
        self.primary_self_revocations.sort_by(|a, b| cmp_creation(b, a));
        self.primary_self_revocations.dedup_by(|a, b| a.normalized_eq(b));
        self.primary_other_revocations.sort_by(|a, b| cmp_creation(b, a));
        self.primary_other_revocations.dedup_by(
            |a, b| a.normalized_eq(b));

        for u in &mut self.userids {
            u.sort_and_dedup();
        }
        for u in &mut self.user_attributes {
            u.sort_and_dedup();
        }
        for k in &mut self.subkeys {
            k.sort_and_dedup();
        }
    }

    /// Returns the primary key.
    pub fn primary_key(&self)
                       -> &Key<key::PublicParts, key::PrimaryRole> {
        &self.primary
    }

    /// Returns the certificate's fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.primary.fingerprint()
    }

    /// Returns the certificate's key ID.
    pub fn keyid(&self) -> KeyID {
        self.primary.keyid()
    }

    /// Returns an iterator over the certificate's user id bundles.
    pub fn userids(&self) -> impl Iterator<Item = &UserIDBundle> {
        self.userids.iter()
    }

    /// Returns an iterator over the certificate's user attribute
    /// bundles.
    pub fn user_attributes(&self)
                           -> impl Iterator<Item = &UserAttributeBundle> {
        self.user_attributes.iter()
    }

    /// Returns an iterator over the certificate's subkey bundles.
    pub fn subkeys(&self) -> impl Iterator<Item = &SubkeyBundle> {
        self.subkeys.iter()
    }

    /// Returns the direct key signatures.
    pub fn direct_key_signatures(&self) -> &[Signature] {
        &self.primary_self_signatures
    }

    /// Returns packets that could not be used: unknown packets and
    /// signatures that did not verify.
    pub fn bad_signatures(&self) -> &[Packet] {
        &self.bad
    }

    /// Returns the active binding signature of the primary key at
    /// `t`.
    ///
    /// This is the binding signature of the primary user ID, or the
    /// newest direct key signature if no user ID is marked primary
    /// (or there are no user IDs at all).
    pub fn primary_key_signature(&self, t: SystemTime)
                                 -> Option<&Signature> {
        if let Some(uid) = self.primary_userid(t) {
            return uid.binding_signature(t);
        }

        self.primary_self_signatures.iter()
            .filter(|s| s.signature_alive(
                t, std::time::Duration::new(0, 0)).is_ok())
            .max_by(|a, b| cmp_creation(a, b))
    }

    /// Returns the primary user id at `t`, if any.
    ///
    /// The primary user id is the one whose active binding signature
    /// carries the primary user id flag; in case of a tie or absence,
    /// the user id with the newest binding signature wins.  Revoked
    /// user ids are skipped.
    pub fn primary_userid(&self, t: SystemTime) -> Option<&UserIDBundle> {
        self.userids.iter()
            .filter(|u| u.binding_signature(t).is_some())
            .filter(|u| !matches!(u.revocation_status(t),
                                  RevocationStatus::Revoked(_)))
            .max_by_key(|u| {
                let sig = u.binding_signature(t).expect("filtered");
                (sig.primary_userid().unwrap_or(false),
                 sig.signature_creation_time())
            })
    }

    /// Returns the user ids that are valid (bound and not revoked) at
    /// `t`.
    pub fn valid_userids(&self, t: SystemTime)
                         -> impl Iterator<Item = &UserIDBundle> {
        self.userids.iter()
            .filter(move |u| u.binding_signature(t).is_some())
            .filter(move |u| !matches!(u.revocation_status(t),
                                       RevocationStatus::Revoked(_)))
    }

    /// Returns the certificate's revocation status at `t`.
    pub fn revocation_status(&self, t: SystemTime) -> RevocationStatus {
        revocation_status(&self.primary_self_revocations,
                          &self.primary_other_revocations, t)
    }

    /// Checks whether the certificate is usable at `t`.
    ///
    /// The certificate is usable if the primary key is not revoked,
    /// the primary key is live (neither expired nor created in the
    /// future), and the primary key passes the configured policy.
    pub fn verify_primary_key(&self, config: &Config, t: SystemTime)
                              -> Result<()> {
        config.check_key(&self.primary)?;

        if let RevocationStatus::Revoked(_) = self.revocation_status(t) {
            return Err(Error::InvalidKey(
                "primary key is revoked".into()).into());
        }

        if self.primary.creation_time() > t + config.clock_skew_tolerance()
        {
            return Err(Error::NotYetLive(
                self.primary.creation_time()).into());
        }

        if let Some(e) = self.primary_key_expiration_time() {
            if e <= t {
                return Err(Error::Expired(e).into());
            }
        }

        Ok(())
    }

    /// Returns the primary key's expiration time, if any.
    pub fn primary_key_expiration_time(&self) -> Option<SystemTime> {
        let t = SystemTime::now();
        self.primary_key_signature(t)
            .and_then(|sig| sig.key_validity_period())
            .map(|d| self.primary.creation_time() + d)
    }

    /// Verifies the binding of `userid` at time `t`.
    ///
    /// Returns the active binding signature on success.
    pub fn verify_userid_binding(&self, config: &Config, userid: &UserID,
                                 t: SystemTime)
                                 -> Result<&Signature> {
        let bundle = self.userids.iter()
            .find(|u| u.component() == userid)
            .ok_or_else(|| Error::InvalidArgument(
                "no such user id".into()))?;

        if let RevocationStatus::Revoked(_) = bundle.revocation_status(t) {
            return Err(Error::InvalidKey(
                "user id is revoked".into()).into());
        }

        let sig = bundle.binding_signature(t)
            .ok_or(Error::NoBindingSignature(t))?;
        config.check_signature(sig, false)?;
        Ok(sig)
    }

    /// Verifies the binding of `subkey` at time `t`.
    ///
    /// Returns the active binding signature on success.
    pub fn verify_subkey_binding<P>(
        &self, config: &Config,
        subkey: &Key<P, key::SubordinateRole>,
        t: SystemTime)
        -> Result<&Signature>
        where P: key::KeyParts,
    {
        let fpr = subkey.fingerprint();
        let bundle = self.subkeys.iter()
            .find(|b| b.component().fingerprint() == fpr)
            .ok_or_else(|| Error::InvalidArgument(
                "no such subkey".into()))?;

        if let RevocationStatus::Revoked(_) = bundle.revocation_status(t) {
            return Err(Error::InvalidKey(
                "subkey is revoked".into()).into());
        }

        let sig = bundle.binding_signature(t)
            .ok_or(Error::NoBindingSignature(t))?;
        config.check_signature(sig, false)?;
        config.check_key(bundle.component())?;
        Ok(sig)
    }

    /// Returns an iterator over all of the certificate's keys.
    ///
    /// The iterator yields the primary key first.  Use the filter
    /// methods to select keys for a task, e.g.:
    ///
    /// ```ignore
    /// let key = cert.keys().with_policy(&config, None)
    ///     .alive().revoked(false).for_signing().next();
    /// ```
    pub fn keys(&self) -> KeyIter {
        KeyIter::new(self)
    }

    /// Returns the best signing-capable key at time `t`.
    ///
    /// The most recently created, non-revoked, live subkey with the
    /// signing flag and a valid binding signature is preferred; the
    /// primary key is used as a fallback if it carries the signing
    /// flag.  If `handle` is given, only matching keys are
    /// considered.
    pub fn signing_key(&self, config: &Config, t: SystemTime,
                       handle: Option<KeyHandle>)
                       -> Result<KeyAmalgamation> {
        self.select_key(config, t, handle,
                        KeyFlags::empty().set_signing())
    }

    /// Returns the best encryption-capable key at time `t`.
    ///
    /// Analogous to [`signing_key`], with the transport and storage
    /// encryption flags.
    ///
    ///   [`signing_key`]: #method.signing_key
    pub fn encryption_key(&self, config: &Config, t: SystemTime,
                          handle: Option<KeyHandle>)
                          -> Result<KeyAmalgamation> {
        self.select_key(config, t, handle,
                        KeyFlags::empty()
                        .set_transport_encryption()
                        .set_storage_encryption())
    }

    fn select_key(&self, config: &Config, t: SystemTime,
                  handle: Option<KeyHandle>, flags: KeyFlags)
                  -> Result<KeyAmalgamation> {
        let mut best: Option<KeyAmalgamation> = None;

        for ka in self.keys().with_policy(config, t)
            .key_flags(flags).alive().revoked(false)
        {
            if let Some(h) = &handle {
                if !h.aliases(KeyHandle::from(ka.key().fingerprint())) {
                    continue;
                }
            }

            // Prefer subkeys over the primary key, and newer keys
            // over older ones.
            let better = match &best {
                None => true,
                Some(b) => {
                    (b.primary() && !ka.primary())
                        || (b.primary() == ka.primary()
                            && ka.key().creation_time()
                               > b.key().creation_time())
                }
            };
            if better {
                best = Some(ka);
            }
        }

        best.ok_or_else(|| Error::InvalidOperation(
            "no suitable key found".into()).into())
    }

    /// Merges `other` into `self`, returning the merged certificate.
    ///
    /// The user ids, user attributes, subkeys, and signatures are
    /// unioned, deduplicated by their signed content.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if the primary key
    /// fingerprints differ.
    pub fn merge(self, other: Cert) -> Result<Self> {
        if self.fingerprint() != other.fingerprint() {
            return Err(Error::InvalidArgument(
                "Primary key mismatch".into()).into());
        }

        // Recreating the certificate from the union of the packets
        // re-verifies and deduplicates everything.
        let mut packets: Vec<Packet> = self.into_packets().collect();
        packets.extend(other.into_packets());
        Cert::from_packets(packets.into_iter())
    }

    /// Converts the certificate into its constituent packets, in the
    /// order specified by [Section 11.1 of RFC 4880]: the primary
    /// key, its revocations and direct signatures, the user ids with
    /// their signatures, the user attributes with their signatures,
    /// and the subkeys with their bindings.
    ///
    /// Keys holding secret material are emitted as secret key
    /// packets.  Packets that could not be validated
    /// ([`bad_signatures`]) are not emitted.
    ///
    ///   [Section 11.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-11.1
    ///   [`bad_signatures`]: #method.bad_signatures
    pub fn into_packets(self) -> impl Iterator<Item = Packet> {
        let mut p: Vec<Packet> = Vec::new();

        if self.primary.has_secret() {
            p.push(Packet::SecretKey(
                self.primary.parts_into_secret().expect("has secret")));
        } else {
            p.push(Packet::PublicKey(self.primary));
        }

        for sig in self.primary_self_revocations {
            p.push(sig.into());
        }
        for sig in self.primary_self_signatures {
            p.push(sig.into());
        }
        for sig in self.primary_other_revocations {
            p.push(sig.into());
        }

        for u in self.userids {
            p.push(u.component.into());
            for sig in u.self_signatures {
                p.push(sig.into());
            }
            for sig in u.self_revocations {
                p.push(sig.into());
            }
            for sig in u.certifications {
                p.push(sig.into());
            }
            for sig in u.other_revocations {
                p.push(sig.into());
            }
        }

        for u in self.user_attributes {
            p.push(u.component.into());
            for sig in u.self_signatures {
                p.push(sig.into());
            }
            for sig in u.self_revocations {
                p.push(sig.into());
            }
            for sig in u.certifications {
                p.push(sig.into());
            }
            for sig in u.other_revocations {
                p.push(sig.into());
            }
        }

        for k in self.subkeys {
            if k.component.has_secret() {
                p.push(Packet::SecretSubkey(
                    k.component.parts_into_secret().expect("has secret")));
            } else {
                p.push(Packet::PublicSubkey(k.component));
            }
            for sig in k.self_signatures {
                p.push(sig.into());
            }
            for sig in k.self_revocations {
                p.push(sig.into());
            }
            for sig in k.certifications {
                p.push(sig.into());
            }
            for sig in k.other_revocations {
                p.push(sig.into());
            }
        }

        p.into_iter()
    }
}

impl Marshal for Cert {
    /// Serializes the certificate as a flat packet sequence.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        for p in self.clone().into_packets() {
            p.serialize(o)?;
        }
        Ok(())
    }
}

impl MarshalInto for Cert {
    fn serialized_len(&self) -> usize {
        self.clone().into_packets()
            .map(|p| p.serialized_len())
            .sum()
    }

    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        let v = self.to_vec()?;
        if buf.len() < v.len() {
            return Err(Error::InvalidArgument(
                format!("Invalid buffer size, expected {}, got {}",
                        v.len(), buf.len())).into());
        }
        buf[..v.len()].copy_from_slice(&v);
        Ok(v.len())
    }

    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut v = Vec::new();
        Marshal::serialize(self, &mut v)?;
        Ok(v)
    }
}

fn insert_component<C: PartialEq>(components: &mut Vec<ComponentBundle<C>>,
                                  c: C) -> usize {
    if let Some(i) = components.iter()
        .position(|b| b.component == c)
    {
        i
    } else {
        components.push(ComponentBundle::new(c));
        components.len() - 1
    }
}

/// A key, its role, and the signature binding it to the certificate.
#[derive(Debug, Clone)]
pub struct KeyAmalgamation<'a> {
    key: &'a Key<key::PublicParts, key::UnspecifiedRole>,
    binding: Option<&'a Signature>,
    revocation: RevocationStatus<'a>,
    primary: bool,
}

impl<'a> KeyAmalgamation<'a> {
    /// Returns the key.
    pub fn key(&self) -> &'a Key<key::PublicParts, key::UnspecifiedRole> {
        self.key
    }

    /// Returns the key's binding signature, if any.
    ///
    /// The primary key has no binding signature of its own; its
    /// properties come from the primary user id's binding signature
    /// or the direct key signature.
    pub fn binding_signature(&self) -> Option<&'a Signature> {
        self.binding
    }

    /// Returns whether this is the primary key.
    pub fn primary(&self) -> bool {
        self.primary
    }

    /// Returns the key flags from the binding signature.
    pub fn key_flags(&self) -> Option<KeyFlags> {
        self.binding.and_then(|s| s.key_flags())
    }

    /// Returns the key's revocation status.
    pub fn revocation_status(&self) -> &RevocationStatus<'a> {
        &self.revocation
    }

    /// Returns the key's expiration time, if any.
    pub fn key_expiration_time(&self) -> Option<SystemTime> {
        self.binding
            .and_then(|s| s.key_validity_period())
            .map(|d| self.key.creation_time() + d)
    }

    /// Returns whether the key is alive at `t`.
    pub fn alive(&self, t: SystemTime) -> bool {
        if self.key.creation_time() > t {
            return false;
        }
        match self.key_expiration_time() {
            Some(e) => t < e,
            None => true,
        }
    }
}

/// An iterator over the keys in a certificate.
///
/// Returned by [`Cert::keys`].
///
///   [`Cert::keys`]: struct.Cert.html#method.keys
pub struct KeyIter<'a> {
    cert: &'a Cert,
    /// 0 is the primary key; i + 1 is subkey i.
    pos: usize,

    // Filters.
    config_at: Option<(&'a Config, SystemTime)>,
    flags: Option<KeyFlags>,
    alive: bool,
    revoked: Option<bool>,
    secret: bool,
    unencrypted_secret: bool,
}

impl<'a> KeyIter<'a> {
    fn new(cert: &'a Cert) -> Self {
        KeyIter {
            cert,
            pos: 0,
            config_at: None,
            flags: None,
            alive: false,
            revoked: None,
            secret: false,
            unencrypted_secret: false,
        }
    }

    /// Applies the configuration's policy checks, and evaluates
    /// bindings at time `t`.
    ///
    /// This is required for the `key_flags`, `alive`, and `revoked`
    /// filters.
    pub fn with_policy<T>(mut self, config: &'a Config, t: T) -> Self
        where T: Into<Option<SystemTime>>,
    {
        self.config_at =
            Some((config, t.into().unwrap_or_else(SystemTime::now)));
        self
    }

    /// Selects keys with at least one of the given key flags.
    pub fn key_flags(mut self, flags: KeyFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Selects signing-capable keys.
    pub fn for_signing(self) -> Self {
        self.key_flags(KeyFlags::empty().set_signing())
    }

    /// Selects certification-capable keys.
    pub fn for_certification(self) -> Self {
        self.key_flags(KeyFlags::empty().set_certification())
    }

    /// Selects transport-encryption-capable keys.
    pub fn for_transport_encryption(self) -> Self {
        self.key_flags(KeyFlags::empty().set_transport_encryption())
    }

    /// Selects storage-encryption-capable keys.
    pub fn for_storage_encryption(self) -> Self {
        self.key_flags(KeyFlags::empty().set_storage_encryption())
    }

    /// Selects keys that are alive at the policy time.
    pub fn alive(mut self) -> Self {
        self.alive = true;
        self
    }

    /// Selects keys based on their revocation status.
    pub fn revoked<T>(mut self, revoked: T) -> Self
        where T: Into<Option<bool>>,
    {
        self.revoked = revoked.into();
        self
    }

    /// Selects keys with secret key material.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Selects keys with unencrypted secret key material.
    pub fn unencrypted_secret(mut self) -> Self {
        self.unencrypted_secret = true;
        self
    }
}

impl<'a> Iterator for KeyIter<'a> {
    type Item = KeyAmalgamation<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let i = self.pos;
            if i > self.cert.subkeys.len() {
                return None;
            }
            self.pos += 1;

            let (t, config) = match self.config_at {
                Some((c, t)) => (t, Some(c)),
                None => (SystemTime::now(), None),
            };

            let ka = if i == 0 {
                KeyAmalgamation {
                    key: self.cert.primary.role_as_unspecified(),
                    binding: self.cert.primary_key_signature(t),
                    revocation: self.cert.revocation_status(t),
                    primary: true,
                }
            } else {
                let bundle = &self.cert.subkeys[i - 1];
                let binding = bundle.binding_signature(t);
                if binding.is_none() {
                    // A subkey without a valid binding signature is
                    // unusable.
                    continue;
                }
                KeyAmalgamation {
                    key: bundle.component().role_as_unspecified(),
                    binding,
                    revocation: bundle.revocation_status(t),
                    primary: false,
                }
            };

            // Apply the filters.
            if let Some(config) = config {
                if config.check_key(ka.key()).is_err() {
                    continue;
                }
                if let Some(sig) = ka.binding_signature() {
                    if config.check_signature(sig, false).is_err() {
                        continue;
                    }
                }
            }

            if let Some(want) = &self.flags {
                match ka.key_flags() {
                    Some(have) => {
                        let overlap =
                            (want.for_certification()
                             && have.for_certification())
                            || (want.for_signing() && have.for_signing())
                            || (want.for_transport_encryption()
                                && have.for_transport_encryption())
                            || (want.for_storage_encryption()
                                && have.for_storage_encryption())
                            || (want.for_authentication()
                                && have.for_authentication());
                        if !overlap {
                            continue;
                        }
                    }
                    None => continue,
                }
            }

            if self.alive && !ka.alive(t) {
                continue;
            }

            if let Some(want_revoked) = self.revoked {
                let is_revoked = matches!(
                    ka.revocation_status(),
                    RevocationStatus::Revoked(_));
                if is_revoked != want_revoked {
                    continue;
                }
            }

            if self.secret && !ka.key().has_secret() {
                continue;
            }

            if self.unencrypted_secret
                && !ka.key().has_unencrypted_secret()
            {
                continue;
            }

            return Some(ka);
        }
    }
}
